//! Client side of the daemon protocol.
//!
//! `move`, `place` and `focus` change the compositor's state on their own;
//! the daemon only needs to hear about it to redraw its indicators.  So a
//! command sent while no daemon is running is dropped rather than treated
//! as an error.  A socket file that refuses connections counts as no
//! daemon.

use crate::command::{DaemonCommand, SUCCESS};
use log::debug;
use std::io::{self, Read, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::path::Path;

/// Errors produced when talking to the daemon.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// The daemon answered with something other than success.
    #[error("got error from daemon: {0}")]
    Rejected(String),
}

/// Connect to the daemon, treating "nobody listening" as `None`.
fn connect(path: &Path) -> io::Result<Option<UnixStream>> {
    match UnixStream::connect(path) {
        Ok(stream) => Ok(Some(stream)),
        Err(e)
            if matches!(
                e.kind(),
                io::ErrorKind::NotFound | io::ErrorKind::ConnectionRefused
            ) =>
        {
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Whether a daemon is accepting connections on `path`.
///
/// This opens (and immediately closes) a connection; the daemon ignores
/// empty requests.
pub fn is_running(path: &Path) -> bool {
    matches!(connect(path), Ok(Some(_)))
}

/// Send `command` to the daemon listening on `path`.
///
/// Does nothing if no daemon is running.  Otherwise waits for the single
/// response and fails with [`ClientError::Rejected`] carrying the daemon's
/// message verbatim unless it is [`SUCCESS`].
pub fn send(path: &Path, command: DaemonCommand) -> Result<(), ClientError> {
    send_raw(path, command.as_str())
}

/// Send an arbitrary request token.  See [`send`].
pub fn send_raw(path: &Path, request: &str) -> Result<(), ClientError> {
    let Some(mut stream) = connect(path)? else {
        debug!("no daemon on {}, dropping {:?}", path.display(), request);
        return Ok(());
    };

    stream.write_all(request.as_bytes())?;
    stream.shutdown(Shutdown::Write)?;

    let mut response = Vec::new();
    stream.read_to_end(&mut response)?;
    let response = String::from_utf8_lossy(&response);
    debug!("daemon replied {:?} to {:?}", response, request);

    if response == SUCCESS {
        Ok(())
    } else {
        Err(ClientError::Rejected(response.into_owned()))
    }
}

//  Tests
