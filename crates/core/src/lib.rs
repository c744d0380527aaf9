pub mod config;
pub mod error;
pub mod logging;

pub use config::{ConfigHint, Configuration};
pub use error::*;
pub use logging::init_logging;
