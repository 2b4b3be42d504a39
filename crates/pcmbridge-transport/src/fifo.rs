use std::ffi::CString;
use std::fs::{File, OpenOptions};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::FileTypeExt;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{Result, TransportError};

/// Default permission mode for FIFOs created by pcmbridge.
pub const DEFAULT_FIFO_MODE: u32 = 0o660;

/// Returns true if `path` exists and is a FIFO.
pub fn is_fifo(path: impl AsRef<Path>) -> bool {
    std::fs::metadata(path)
        .map(|m| m.file_type().is_fifo())
        .unwrap_or(false)
}

/// Create a FIFO at `path` unless one already exists.
///
/// Fails if something other than a FIFO occupies the path.
pub fn create_fifo(path: impl AsRef<Path>, mode: u32) -> Result<()> {
    let path = path.as_ref();
    let fifo_error = |source| TransportError::Fifo {
        path: path.to_path_buf(),
        source,
    };

    match std::fs::symlink_metadata(path) {
        Ok(metadata) if metadata.file_type().is_fifo() => {
            debug!(?path, "fifo already exists");
            return Ok(());
        }
        Ok(_) => {
            return Err(fifo_error(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "existing path is not a fifo",
            )));
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(fifo_error(err)),
    }

    let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|_| {
        fifo_error(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "path contains an interior nul byte",
        ))
    })?;

    // SAFETY: `c_path` is a valid nul-terminated string that outlives the call.
    let rc = unsafe { libc::mkfifo(c_path.as_ptr(), mode as libc::mode_t) };
    if rc != 0 {
        return Err(fifo_error(std::io::Error::last_os_error()));
    }

    info!(?path, mode = format_args!("{mode:o}"), "created fifo");
    Ok(())
}

/// Open a FIFO for reading.
///
/// Blocks until a writer opens the other end.
pub fn open_fifo_read(path: impl AsRef<Path>) -> Result<File> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| TransportError::Fifo {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(?path, "opened fifo for reading");
    Ok(file)
}

/// Open a FIFO for writing.
///
/// Blocks until a reader opens the other end.
pub fn open_fifo_write(path: impl AsRef<Path>) -> Result<File> {
    let path = path.as_ref();
    let file = OpenOptions::new()
        .write(true)
        .open(path)
        .map_err(|source| TransportError::Fifo {
            path: path.to_path_buf(),
            source,
        })?;
    debug!(?path, "opened fifo for writing");
    Ok(file)
}
