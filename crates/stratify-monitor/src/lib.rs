//! Logging setup for the simulator binary.

mod logging;

pub use logging::{setup_logging, LoggingError};
