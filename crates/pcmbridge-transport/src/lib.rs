//! Local transport layer for pcmbridge.
//!
//! Provides the byte-stream endpoints every other layer builds on:
//! - Unix domain sockets standing in for named duplex channels
//! - Named-channel to filesystem path resolution
//! - FIFO open/create helpers
//! - Bounded connect retry for clients that start before their server
//!
//! Everything here is blocking. Higher layers own the streams they get back.

pub mod error;
pub mod name;
pub mod retry;
pub mod traits;

#[cfg(unix)]
pub mod fifo;
#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use name::{default_pipe_dir, PipeName, PIPE_PREFIX};
pub use retry::RetryPolicy;
pub use traits::IpcStream;

#[cfg(unix)]
pub use fifo::{create_fifo, is_fifo, open_fifo_read, open_fifo_write, DEFAULT_FIFO_MODE};
#[cfg(unix)]
pub use retry::connect_with_retry;
#[cfg(unix)]
pub use uds::UnixDomainSocket;
