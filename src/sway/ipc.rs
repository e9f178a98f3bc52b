//! [`Compositor`] implementation backed by sway IPC.
//!
//! Communicates directly with sway through the socket named by `$SWAYSOCK`
//! (or `$I3SOCK`), speaking the binary i3-ipc framing:
//!
//! ```text
//! "i3-ipc" | payload length: u32 | message type: u32 | payload
//! ```
//!
//! Integers are in native byte order.  Replies use the same framing and
//! carry a JSON payload.

use crate::command::OutputInfo;
use crate::traits::Compositor;
use serde::Deserialize;
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};

const MAGIC: &[u8; 6] = b"i3-ipc";
const HEADER_LEN: usize = MAGIC.len() + 8;

/// `RUN_COMMAND`: run the payload as sway commands.
const RUN_COMMAND: u32 = 0;
/// `GET_OUTPUTS`: list outputs as JSON.
const GET_OUTPUTS: u32 = 3;

/// Sway-backed compositor.
///
/// Every method call opens a short-lived connection to the IPC socket.
/// No child processes are spawned.
#[derive(Debug, Clone)]
pub struct SwayIpc {
    socket: PathBuf,
}

/// Errors that can occur when talking to sway.
#[derive(Debug, thiserror::Error)]
#[error("sway IPC error: {0}")]
pub struct SwayIpcError(String);

impl SwayIpc {
    /// Talk to sway through the socket at `socket`.
    pub fn new(socket: impl AsRef<Path>) -> Self {
        Self {
            socket: socket.as_ref().to_path_buf(),
        }
    }

    /// Locate the socket from `$SWAYSOCK`, falling back to `$I3SOCK`.
    pub fn from_env() -> Result<Self, SwayIpcError> {
        ["SWAYSOCK", "I3SOCK"]
            .iter()
            .filter_map(|name| std::env::var_os(name))
            .find(|v| !v.is_empty())
            .map(Self::new)
            .ok_or_else(|| SwayIpcError("neither SWAYSOCK nor I3SOCK is set".into()))
    }

    /// The filesystem path of the IPC socket.
    pub fn socket(&self) -> &Path {
        &self.socket
    }

    /// Send one message and return the reply payload.
    fn request(&self, msg_type: u32, payload: &str) -> Result<String, SwayIpcError> {
        let mut stream = UnixStream::connect(&self.socket).map_err(|e| {
            SwayIpcError(format!("connect to {}: {}", self.socket.display(), e))
        })?;

        stream
            .write_all(&encode_message(msg_type, payload))
            .map_err(|e| SwayIpcError(format!("write: {}", e)))?;

        let mut header = [0u8; HEADER_LEN];
        stream
            .read_exact(&mut header)
            .map_err(|e| SwayIpcError(format!("read header: {}", e)))?;
        let (len, reply_type) = decode_header(&header)?;
        if reply_type != msg_type {
            return Err(SwayIpcError(format!(
                "expected reply type {}, got {}",
                msg_type, reply_type
            )));
        }

        let mut body = vec![0u8; len];
        stream
            .read_exact(&mut body)
            .map_err(|e| SwayIpcError(format!("read body: {}", e)))?;
        String::from_utf8(body).map_err(|e| SwayIpcError(format!("utf-8: {}", e)))
    }

    /// Run a sway command and check every result for success.
    fn run_command(&self, command: &str) -> Result<(), SwayIpcError> {
        let json = self.request(RUN_COMMAND, command)?;
        check_command_reply(&json)
    }
}

//  Framing

/// Frame `payload` as an i3-ipc message of type `msg_type`.
fn encode_message(msg_type: u32, payload: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&(payload.len() as u32).to_ne_bytes());
    buf.extend_from_slice(&msg_type.to_ne_bytes());
    buf.extend_from_slice(payload.as_bytes());
    buf
}

/// Parse a reply header into `(payload length, message type)`.
fn decode_header(header: &[u8; HEADER_LEN]) -> Result<(usize, u32), SwayIpcError> {
    if &header[..MAGIC.len()] != MAGIC {
        return Err(SwayIpcError("bad magic in reply header".into()));
    }
    let mut len = [0u8; 4];
    len.copy_from_slice(&header[6..10]);
    let mut msg_type = [0u8; 4];
    msg_type.copy_from_slice(&header[10..14]);
    Ok((u32::from_ne_bytes(len) as usize, u32::from_ne_bytes(msg_type)))
}

//  Minimal serde structs for the JSON we care about

/// Subset of one entry of the `GET_OUTPUTS` reply.
#[derive(Deserialize)]
struct OutputJson {
    name: String,
    #[serde(default)]
    active: bool,
    #[serde(default)]
    focused: bool,
    rect: RectJson,
}

#[derive(Deserialize)]
struct RectJson {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
}

/// One entry of the `RUN_COMMAND` reply.
#[derive(Deserialize)]
struct CommandResultJson {
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Parse a `GET_OUTPUTS` reply, keeping only active outputs.
fn parse_outputs(json: &str) -> Result<Vec<OutputInfo>, SwayIpcError> {
    let outputs: Vec<OutputJson> =
        serde_json::from_str(json).map_err(|e| SwayIpcError(format!("parse: {}", e)))?;
    Ok(outputs
        .into_iter()
        .filter(|o| o.active)
        .map(|o| OutputInfo {
            name: o.name,
            x: o.rect.x,
            y: o.rect.y,
            width: o.rect.width,
            height: o.rect.height,
            focused: o.focused,
        })
        .collect())
}

/// Fail with the first error in a `RUN_COMMAND` reply.
fn check_command_reply(json: &str) -> Result<(), SwayIpcError> {
    let results: Vec<CommandResultJson> =
        serde_json::from_str(json).map_err(|e| SwayIpcError(format!("parse: {}", e)))?;
    match results.into_iter().find(|r| !r.success) {
        Some(r) => Err(SwayIpcError(format!(
            "command failed: {}",
            r.error.unwrap_or_else(|| "unknown error".into())
        ))),
        None => Ok(()),
    }
}

/// Quote an output name for use in a sway command.
fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
}

//  Compositor implementation

impl Compositor for SwayIpc {
    type Error = SwayIpcError;

    fn active_outputs(&self) -> Result<Vec<OutputInfo>, Self::Error> {
        let json = self.request(GET_OUTPUTS, "")?;
        parse_outputs(&json)
    }

    fn set_output_position(&self, name: &str, x: i32, y: i32) -> Result<(), Self::Error> {
        self.run_command(&format!("output {} pos {} {}", quote(name), x, y))
    }

    fn focus_output(&self, name: &str) -> Result<(), Self::Error> {
        self.run_command(&format!("focus output {}", quote(name)))
    }
}

//  Tests
