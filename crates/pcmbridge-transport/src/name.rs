//! Named channel resolution.
//!
//! Services on the other end of a pcmbridge channel address each other by a
//! short well-known name such as `CavernPipe`. On Unix, .NET maps a pipe named
//! `N` to the socket `$TMPDIR/CoreFxPipe_N`; we resolve names the same way so
//! both sides meet at the same path.

use std::fmt;
use std::path::{Path, PathBuf};

/// Prefix .NET prepends to named pipe sockets on Unix.
pub const PIPE_PREFIX: &str = "CoreFxPipe_";

/// A channel name or an explicit socket path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipeName {
    /// Short well-known name, resolved under a pipe directory.
    Named(String),
    /// Explicit filesystem path, used as-is.
    Path(PathBuf),
}

impl PipeName {
    /// Parse a user-supplied channel reference.
    ///
    /// Anything containing a path separator is taken as a literal path.
    pub fn parse(value: &str) -> Self {
        if value.contains('/') {
            Self::Path(PathBuf::from(value))
        } else {
            Self::Named(value.to_string())
        }
    }

    /// Resolve to the socket path under `pipe_dir`.
    pub fn resolve(&self, pipe_dir: &Path) -> PathBuf {
        match self {
            Self::Named(name) => pipe_dir.join(format!("{PIPE_PREFIX}{name}")),
            Self::Path(path) => path.clone(),
        }
    }
}

impl From<&str> for PipeName {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl fmt::Display for PipeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Directory that bare channel names resolve under.
pub fn default_pipe_dir() -> PathBuf {
    std::env::temp_dir()
}
