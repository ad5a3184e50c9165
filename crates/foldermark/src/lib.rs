pub mod app;
pub mod cli;
pub mod domain;
pub mod infra;

pub use infra::logging::LogStyle;

pub fn init(verbosity: u8, style: LogStyle) -> anyhow::Result<()> {
    infra::logging::init(verbosity, style)
}
