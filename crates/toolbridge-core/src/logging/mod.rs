//! Logging abstractions shared by every component

mod traits;
mod noop;
mod console;

pub use traits::Logger;
pub use noop::NoOpLogger;
pub use console::{ConsoleLogger, LogLevel};
