//! Owned, single-instance Unix socket for the daemon.
//!
//! Binding a Unix socket path that already exists fails at the OS level,
//! which is what keeps a second `qkdisplays show` from starting.  A path
//! can also be left behind by a daemon that crashed, so on `AddrInUse` the
//! path is probed: if it is a socket and nothing accepts the connection,
//! the file is stale and is replaced.  Anything that is not a socket is
//! left alone.

use log::{info, warn};
use std::io;
use std::os::unix::fs::FileTypeExt;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

/// File name of the daemon socket.
pub const SOCKET_FILE_NAME: &str = "qkdisplays.sock";

/// `$XDG_RUNTIME_DIR/qkdisplays.sock`, or `/tmp/qkdisplays.sock`.
pub fn default_socket_path() -> PathBuf {
    let runtime = std::env::var_os("XDG_RUNTIME_DIR")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/tmp"));
    runtime.join(SOCKET_FILE_NAME)
}

/// Errors produced while acquiring the daemon socket.
#[derive(Debug, thiserror::Error)]
pub enum SocketError {
    /// Another daemon is accepting connections on the path.
    #[error("qkdisplays is already running (socket {})", .0.display())]
    AlreadyRunning(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// The bound daemon socket.
///
/// Acquired with [`acquire`](Self::acquire) and released exactly once,
/// either explicitly with [`release`](Self::release) or when dropped.
/// Releasing closes the listener and unlinks the path.
#[derive(Debug)]
pub struct DaemonSocket {
    path: PathBuf,
    listener: Option<UnixListener>,
}

impl DaemonSocket {
    /// Bind `path`, replacing it only if it is a stale leftover.
    pub fn acquire(path: impl AsRef<Path>) -> Result<Self, SocketError> {
        let path = path.as_ref().to_path_buf();
        let listener = match UnixListener::bind(&path) {
            Ok(listener) => listener,
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                if UnixStream::connect(&path).is_ok() {
                    return Err(SocketError::AlreadyRunning(path));
                }
                if !std::fs::symlink_metadata(&path)?.file_type().is_socket() {
                    return Err(e.into());
                }
                warn!("removing stale socket {}", path.display());
                std::fs::remove_file(&path)?;
                UnixListener::bind(&path)?
            }
            Err(e) => return Err(e.into()),
        };
        info!("listening on {}", path.display());
        Ok(Self {
            path,
            listener: Some(listener),
        })
    }

    /// The filesystem path of the socket.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the socket is still bound.
    pub fn is_acquired(&self) -> bool {
        self.listener.is_some()
    }

    /// Block until the next client connects.
    pub fn accept(&self) -> io::Result<UnixStream> {
        match &self.listener {
            Some(listener) => listener.accept().map(|(stream, _)| stream),
            None => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "daemon socket already released",
            )),
        }
    }

    /// Close the listener and remove the socket file.  Later calls do
    /// nothing.
    pub fn release(&mut self) {
        if let Some(listener) = self.listener.take() {
            drop(listener);
            if let Err(e) = std::fs::remove_file(&self.path) {
                warn!("failed to remove {}: {}", self.path.display(), e);
            }
            info!("released {}", self.path.display());
        }
    }
}

impl Drop for DaemonSocket {
    fn drop(&mut self) {
        self.release();
    }
}

//  Tests
