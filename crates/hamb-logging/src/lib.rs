//! Logging for the Matter bridge
//!
//! Components log through `tracing`. This crate adds:
//!
//! - [`LogLevel`]: the bridge's numeric log levels (DEBUG=0 .. FATAL=5)
//! - [`LogBuffer`]: a fixed-capacity ring buffer of [`LogEntry`] values
//! - [`LogCapture`]: a thread-safe capture service used by status/log readers
//! - [`CaptureLayer`]: a `tracing_subscriber` layer writing into a `LogCapture`
//! - [`init_logging`]: installs the global subscriber from [`LoggingOptions`]
//!
//! The capture service is handed to the layer explicitly; nothing looks it
//! up through process-global state.

mod buffer;
mod capture;
mod init;
mod layer;
mod level;

pub use buffer::{LogBuffer, LogEntry, LogQuery, ZeroCapacity};
pub use capture::{LogCapture, DEFAULT_BUFFER_SIZE};
pub use init::{env_filter, init_logging, LoggingError, LoggingOptions};
pub use layer::CaptureLayer;
pub use level::{LogLevel, ParseLogLevelError};
