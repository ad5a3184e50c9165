//! Application layer: marker scanning, folder resolution, rendering, and the triggers that
//! drive them.

pub mod linker;
pub mod render;
pub mod resolve;
pub mod scan;
pub mod sweep;
