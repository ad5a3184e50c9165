//! Domain types shared by the scanner and resolver.

pub mod errors;
pub mod model;
