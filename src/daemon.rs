//! The `show` daemon.
//!
//! Owns the [`DaemonSocket`], a live [`Arrangement`] and the
//! [`IndicatorHandle`] of the surface that numbers the outputs.  Accepts
//! one connection at a time, so commands are handled in a strict total
//! order.
//!
//! # Wire format
//!
//! Each connection carries exactly one request and one response:
//!
//! ```text
//! client → daemon   notify | close          (at most 1024 bytes)
//! daemon → client   success | <error message>
//! ```
//!
//! The request is taken from a single read; the client does not have to
//! half-close its end first.  The daemon closes the connection right after
//! replying.  A bad or failing request only fails that one connection.
//!
//! # Shutdown
//!
//! `close` is acknowledged first, then the accept loop ends, the indicator
//! surface is stopped and joined, and finally the socket is released.

use crate::arrangement::{Arrangement, ArrangementError};
use crate::command::{DaemonCommand, ProtocolError, MAX_MESSAGE_LEN, SUCCESS};
use crate::config::ArrangementOptions;
use crate::indicator::{IndicatorError, IndicatorHandle};
use crate::ipc::socket::{DaemonSocket, SocketError};
use crate::traits::{Compositor, IndicatorSurface};
use log::{debug, error, info, warn};
use std::io::{self, Read, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;

/// Pause after a failed `accept` before trying again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(20);
/// Consecutive `accept` failures after which the daemon gives up.
const MAX_ACCEPT_ERRORS: u32 = 10;

/// Errors that keep the daemon from starting.
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error(transparent)]
    Socket(#[from] SocketError),
    #[error(transparent)]
    Indicator(#[from] IndicatorError),
    #[error(transparent)]
    Arrangement(#[from] ArrangementError),
}

/// Why a single request failed.  The message is sent back to the client
/// as-is.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Arrangement(#[from] ArrangementError),
}

/// What the accept loop does after a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Shutdown,
}

/// A running `show` daemon.
pub struct Daemon<C: Compositor> {
    socket: DaemonSocket,
    arrangement: Arrangement<C>,
    indicators: IndicatorHandle,
}

impl<C: Compositor> Daemon<C> {
    /// Bind the socket, start `surface` on its own thread, compute the
    /// arrangement and ask the surface to show the first indicators.
    ///
    /// If anything fails, whatever was already started is stopped and
    /// released again.
    pub fn start<S: IndicatorSurface>(
        socket_path: &Path,
        compositor: C,
        options: ArrangementOptions,
        surface: S,
    ) -> Result<Self, DaemonError> {
        let socket = DaemonSocket::acquire(socket_path)?;
        let indicators = IndicatorHandle::spawn(surface)?;
        let arrangement = Arrangement::new(compositor, options)?;
        indicators.show(arrangement.sorted_positions().collect());
        info!("daemon started with {} output(s)", arrangement.len());

        Ok(Self {
            socket,
            arrangement,
            indicators,
        })
    }

    /// The filesystem path of the daemon socket.
    pub fn socket_path(&self) -> &Path {
        self.socket.path()
    }

    /// Accept and handle connections until a `close` request arrives, then
    /// shut down.  Also shuts down after `MAX_ACCEPT_ERRORS` failed
    /// accepts in a row.
    ///
    /// This method **blocks**.
    pub fn run(mut self) {
        let mut accept_errors = 0;
        loop {
            let stream = match self.socket.accept() {
                Ok(stream) => {
                    accept_errors = 0;
                    stream
                }
                Err(e) => {
                    accept_errors += 1;
                    error!("accept error ({}/{}): {}", accept_errors, MAX_ACCEPT_ERRORS, e);
                    if accept_errors >= MAX_ACCEPT_ERRORS {
                        error!("giving up on the daemon socket");
                        break;
                    }
                    std::thread::sleep(ACCEPT_BACKOFF);
                    continue;
                }
            };
            if self.handle_connection(stream) == Flow::Shutdown {
                break;
            }
        }
        self.shutdown();
    }

    fn shutdown(mut self) {
        info!("shutting down");
        self.indicators.stop();
        self.socket.release();
    }

    fn handle_connection(&mut self, mut stream: UnixStream) -> Flow {
        let request = match read_request(&mut stream) {
            Ok(request) => request,
            Err(e) => {
                warn!("read error: {}", e);
                return Flow::Continue;
            }
        };
        if request.is_empty() {
            // A liveness probe connects and hangs up without a request.
            debug!("empty request, ignoring");
            return Flow::Continue;
        }

        debug!("received {:?}", request);
        let (reply, flow) = match self.dispatch(&request) {
            Ok(flow) => (SUCCESS.to_string(), flow),
            Err(e) => {
                error!("command {:?} failed: {}", request, e);
                (e.to_string(), Flow::Continue)
            }
        };

        if let Err(e) = stream.write_all(reply.as_bytes()) {
            warn!("failed to reply: {}", e);
        }
        flow
    }

    fn dispatch(&mut self, request: &str) -> Result<Flow, CommandError> {
        match request.parse::<DaemonCommand>()? {
            DaemonCommand::Notify => {
                self.arrangement.calculate_outputs()?;
                self.indicators
                    .refresh(self.arrangement.sorted_positions().collect());
                Ok(Flow::Continue)
            }
            DaemonCommand::Close => Ok(Flow::Shutdown),
        }
    }
}

/// Read one request with a single read of at most [`MAX_MESSAGE_LEN`]
/// bytes.  Surrounding whitespace is dropped so a trailing newline from a
/// shell pipe is accepted.  A client that hangs up without writing yields
/// an empty request.
fn read_request(stream: &mut UnixStream) -> io::Result<String> {
    let mut buf = [0u8; MAX_MESSAGE_LEN];
    let n = stream.read(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf[..n]).trim().to_string())
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{OutputInfo, Position};
    use crate::ipc::client::{self, ClientError};
    use crate::traits::IndicatorEvent;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{mpsc, Arc, Mutex};
    use std::time::Duration;

    static TEST_ID: AtomicU32 = AtomicU32::new(0);

    fn tmp_socket_path() -> PathBuf {
        let id = TEST_ID.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!(
            "qkdisplays-daemon-test-{}-{}.sock",
            std::process::id(),
            id
        ))
    }

    //  Shared compositor double

    /// Outputs shared with the test so it can rearrange them while the
    /// daemon is running.
    #[derive(Clone, Default)]
    struct SharedCompositor {
        outputs: Arc<Mutex<Vec<OutputInfo>>>,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("shared compositor error")]
    struct SharedError;

    impl Compositor for SharedCompositor {
        type Error = SharedError;

        fn active_outputs(&self) -> Result<Vec<OutputInfo>, SharedError> {
            Ok(self.outputs.lock().unwrap().clone())
        }

        fn set_output_position(&self, name: &str, x: i32, y: i32) -> Result<(), SharedError> {
            if let Some(o) = self.outputs.lock().unwrap().iter_mut().find(|o| o.name == name) {
                o.x = x;
                o.y = y;
            }
            Ok(())
        }

        fn focus_output(&self, _name: &str) -> Result<(), SharedError> {
            Ok(())
        }
    }

    fn output(name: &str, x: i32) -> OutputInfo {
        OutputInfo {
            name: name.into(),
            x,
            y: 0,
            width: 100,
            height: 100,
            focused: x == 0,
        }
    }

    //  Forwarding surface

    /// A surface that forwards every event to the test.
    struct ForwardingSurface {
        tx: mpsc::Sender<IndicatorEvent>,
    }

    impl IndicatorSurface for ForwardingSurface {
        fn run(self, events: mpsc::Receiver<IndicatorEvent>) {
            for event in events {
                let stop = event == IndicatorEvent::Stop;
                let _ = self.tx.send(event);
                if stop {
                    break;
                }
            }
        }
    }

    struct Harness {
        path: PathBuf,
        compositor: SharedCompositor,
        events: mpsc::Receiver<IndicatorEvent>,
        daemon: std::thread::JoinHandle<()>,
    }

    /// Start a daemon with two contiguous outputs on a background thread.
    fn start_daemon() -> Harness {
        start_daemon_with(ArrangementOptions::default())
    }

    fn start_daemon_with(options: ArrangementOptions) -> Harness {
        let path = tmp_socket_path();
        let compositor = SharedCompositor::default();
        *compositor.outputs.lock().unwrap() = vec![output("A", 0), output("B", 100)];

        let (tx, events) = mpsc::channel();
        let daemon = Daemon::start(&path, compositor.clone(), options, ForwardingSurface { tx })
            .unwrap();
        assert_eq!(daemon.socket_path(), path.as_path());
        let daemon = std::thread::spawn(move || daemon.run());

        Harness {
            path,
            compositor,
            events,
            daemon,
        }
    }

    fn next_event(events: &mpsc::Receiver<IndicatorEvent>) -> IndicatorEvent {
        events
            .recv_timeout(Duration::from_secs(5))
            .expect("indicator event")
    }

    fn p(x: i32) -> Position {
        Position { x, y: 0 }
    }

    #[test]
    fn request_without_half_close_gets_reply() {
        let h = start_daemon();
        next_event(&h.events);

        let mut stream = UnixStream::connect(&h.path).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        stream.write_all(b"notify").unwrap();
        let mut reply = String::new();
        stream.read_to_string(&mut reply).unwrap();
        assert_eq!(reply, SUCCESS);
        assert_eq!(next_event(&h.events), IndicatorEvent::Refresh(vec![p(0), p(100)]));

        // The open connection does not hold up later clients.
        client::send(&h.path, DaemonCommand::Close).unwrap();
        h.daemon.join().unwrap();
        drop(stream);
    }

    #[test]
    fn start_shows_initial_indicators() {
        let h = start_daemon();
        assert_eq!(next_event(&h.events), IndicatorEvent::Show(vec![p(0), p(100)]));

        client::send(&h.path, DaemonCommand::Close).unwrap();
        h.daemon.join().unwrap();
    }

    #[test]
    fn notify_recomputes_and_refreshes() {
        let h = start_daemon();
        next_event(&h.events);

        // Another tool moved A to the right of B.
        h.compositor.outputs.lock().unwrap()[0].x = 100;
        h.compositor.outputs.lock().unwrap()[1].x = 0;

        client::send(&h.path, DaemonCommand::Notify).unwrap();
        assert_eq!(next_event(&h.events), IndicatorEvent::Refresh(vec![p(0), p(100)]));

        client::send(&h.path, DaemonCommand::Close).unwrap();
        h.daemon.join().unwrap();
    }

    #[test]
    fn unknown_request_is_rejected_and_daemon_survives() {
        let h = start_daemon();
        next_event(&h.events);

        let err = client::send_raw(&h.path, "reboot").unwrap_err();
        match err {
            ClientError::Rejected(msg) => {
                assert_ne!(msg, SUCCESS);
                assert!(msg.contains("reboot"));
            }
            other => panic!("unexpected error: {other}"),
        }

        // Still serving.
        client::send(&h.path, DaemonCommand::Notify).unwrap();
        client::send(&h.path, DaemonCommand::Close).unwrap();
        h.daemon.join().unwrap();
    }

    #[test]
    fn failing_notify_reports_error_and_keeps_running() {
        let h = start_daemon_with(ArrangementOptions {
            allow_reorg: false,
            strict_y: true,
        });
        next_event(&h.events);

        h.compositor.outputs.lock().unwrap()[1].x = 500;
        let err = client::send(&h.path, DaemonCommand::Notify).unwrap_err();
        assert!(err.to_string().contains("not contiguous"));

        // Fixing the layout makes the next notify succeed.
        h.compositor.outputs.lock().unwrap()[1].x = 100;
        client::send(&h.path, DaemonCommand::Notify).unwrap();
        assert_eq!(next_event(&h.events), IndicatorEvent::Refresh(vec![p(0), p(100)]));

        client::send(&h.path, DaemonCommand::Close).unwrap();
        h.daemon.join().unwrap();
    }

    #[test]
    fn notify_with_no_outputs_clears_indicators() {
        let h = start_daemon();
        next_event(&h.events);

        h.compositor.outputs.lock().unwrap().clear();
        client::send(&h.path, DaemonCommand::Notify).unwrap();
        assert_eq!(next_event(&h.events), IndicatorEvent::Refresh(vec![]));

        client::send(&h.path, DaemonCommand::Close).unwrap();
        h.daemon.join().unwrap();
    }

    #[test]
    fn close_stops_surface_then_releases_socket() {
        let h = start_daemon();
        next_event(&h.events);
        assert!(client::is_running(&h.path));

        client::send(&h.path, DaemonCommand::Close).unwrap();
        h.daemon.join().unwrap();

        assert_eq!(next_event(&h.events), IndicatorEvent::Stop);
        assert!(!h.path.exists());
        assert!(!client::is_running(&h.path));
        // Commands to a stopped daemon are dropped.
        client::send(&h.path, DaemonCommand::Notify).unwrap();
    }

    #[test]
    fn second_daemon_cannot_start() {
        let h = start_daemon();
        next_event(&h.events);

        let (tx, _events) = mpsc::channel();
        let err = Daemon::start(
            &h.path,
            h.compositor.clone(),
            ArrangementOptions::default(),
            ForwardingSurface { tx },
        )
        .err()
        .unwrap();
        assert!(matches!(err, DaemonError::Socket(SocketError::AlreadyRunning(_))));

        // The first daemon is unaffected.
        client::send(&h.path, DaemonCommand::Notify).unwrap();
        client::send(&h.path, DaemonCommand::Close).unwrap();
        h.daemon.join().unwrap();
    }

    #[test]
    fn layout_error_at_start_releases_everything() {
        let path = tmp_socket_path();
        let compositor = SharedCompositor::default();
        *compositor.outputs.lock().unwrap() = vec![output("A", 0), output("B", 500)];

        let (tx, events) = mpsc::channel();
        let err = Daemon::start(
            &path,
            compositor,
            ArrangementOptions {
                allow_reorg: false,
                strict_y: true,
            },
            ForwardingSurface { tx },
        )
        .err()
        .unwrap();

        assert!(matches!(err, DaemonError::Arrangement(_)));
        assert_eq!(next_event(&events), IndicatorEvent::Stop);
        assert!(!path.exists());
    }

    /// A surface that cannot open its display.
    struct NoDisplaySurface;

    impl IndicatorSurface for NoDisplaySurface {
        fn init(&mut self) -> Result<(), IndicatorError> {
            Err(IndicatorError("cannot open display".into()))
        }

        fn run(self, _events: mpsc::Receiver<IndicatorEvent>) {}
    }

    #[test]
    fn indicator_failure_at_start_fails_and_releases_socket() {
        let path = tmp_socket_path();
        let compositor = SharedCompositor::default();
        *compositor.outputs.lock().unwrap() = vec![output("A", 0)];

        let err = Daemon::start(
            &path,
            compositor,
            ArrangementOptions::default(),
            NoDisplaySurface,
        )
        .err()
        .unwrap();

        assert!(matches!(err, DaemonError::Indicator(_)));
        assert!(err.to_string().contains("cannot open display"));
        assert!(!path.exists());
    }

    #[test]
    fn repeated_accept_errors_end_the_loop() {
        let path = tmp_socket_path();
        let compositor = SharedCompositor::default();
        *compositor.outputs.lock().unwrap() = vec![output("A", 0)];
        let (tx, events) = mpsc::channel();
        let mut daemon = Daemon::start(
            &path,
            compositor,
            ArrangementOptions::default(),
            ForwardingSurface { tx },
        )
        .unwrap();
        next_event(&events);

        // Every accept on a released socket fails.
        daemon.socket.release();
        let runner = std::thread::spawn(move || daemon.run());
        runner.join().unwrap();

        assert_eq!(next_event(&events), IndicatorEvent::Stop);
    }
}
