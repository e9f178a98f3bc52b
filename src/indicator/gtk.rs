//! GTK4 + layer-shell indicators, one overlay window per output.
//!
//! # Widget tree
//!
//! ```text
//! window.qkdisplays-indicator    (layer-shell overlay, pinned to a monitor)
//! └ label                        (the display number)
//! ```
//!
//! GTK objects must only be touched from the thread that initialised GTK,
//! so everything here runs on the surface thread.  Events from the daemon
//! are drained from the queue by a GLib timeout on that same thread.

use super::{describe, IndicatorError};
use crate::command::Position;
use crate::traits::{IndicatorEvent, IndicatorSurface};
use gtk4::prelude::*;
use gtk4::{gdk, glib};
use gtk4_layer_shell::LayerShell;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

/// How often the event queue is polled.
const POLL_INTERVAL: Duration = Duration::from_millis(16);

//  Default CSS

const DEFAULT_CSS: &str = r#"
window.qkdisplays-indicator {
    background-color: rgba(255, 255, 255, 0.6);
    border: 5px solid rgba(200, 200, 200, 0.6);
    color: black;
    font-size: 100px;
}

window.qkdisplays-indicator label {
    padding: 30px;
    min-width: 100px;
}
"#;

/// Numbered overlay windows drawn with GTK4.
#[derive(Debug, Default)]
pub struct GtkIndicators {
    css_path: Option<PathBuf>,
}

impl GtkIndicators {
    /// Style the indicators with the stylesheet at `css_path`, falling back
    /// to the built-in one.
    pub fn new(css_path: Option<PathBuf>) -> Self {
        Self { css_path }
    }
}

impl IndicatorSurface for GtkIndicators {
    fn init(&mut self) -> Result<(), IndicatorError> {
        gtk4::init().map_err(|e| IndicatorError(format!("failed to initialise GTK4: {}", e)))?;
        info!("GTK4 initialised on indicator thread");

        load_css(self.css_path.as_deref());
        Ok(())
    }

    fn run(self, events: mpsc::Receiver<IndicatorEvent>) {
        let main_loop = glib::MainLoop::new(None, false);
        let quit = main_loop.clone();
        let mut windows: Vec<gtk4::Window> = Vec::new();

        glib::timeout_add_local(POLL_INTERVAL, move || {
            loop {
                match events.try_recv() {
                    Ok(IndicatorEvent::Show(positions)) => {
                        show_indicators(&mut windows, &positions);
                    }
                    Ok(IndicatorEvent::Refresh(positions)) => {
                        close_indicators(&mut windows);
                        show_indicators(&mut windows, &positions);
                    }
                    Ok(IndicatorEvent::Stop) | Err(mpsc::TryRecvError::Disconnected) => {
                        close_indicators(&mut windows);
                        quit.quit();
                        return glib::ControlFlow::Break;
                    }
                    Err(mpsc::TryRecvError::Empty) => break,
                }
            }
            glib::ControlFlow::Continue
        });

        info!("entering GLib main loop");
        main_loop.run();
        info!("GLib main loop exited");
    }
}

//  Windows

/// GDK monitors keyed by the top-left corner of their geometry.
fn monitors_by_origin() -> HashMap<(i32, i32), gdk::Monitor> {
    let Some(display) = gdk::Display::default() else {
        warn!("no GDK display");
        return HashMap::new();
    };
    let monitors = display.monitors();
    (0..monitors.n_items())
        .filter_map(|i| monitors.item(i).and_downcast::<gdk::Monitor>())
        .map(|monitor| {
            let geometry = monitor.geometry();
            ((geometry.x(), geometry.y()), monitor)
        })
        .collect()
}

fn show_indicators(windows: &mut Vec<gtk4::Window>, positions: &[Position]) {
    debug!("show {}", describe(positions));
    let monitors = monitors_by_origin();
    for (i, position) in positions.iter().enumerate() {
        let Some(monitor) = monitors.get(&(position.x, position.y)) else {
            warn!("no monitor at {}, skipping indicator {}", position, i + 1);
            continue;
        };
        windows.push(indicator_window(monitor, &(i + 1).to_string()));
    }
}

fn indicator_window(monitor: &gdk::Monitor, text: &str) -> gtk4::Window {
    let window = gtk4::Window::new();
    window.init_layer_shell();
    window.set_layer(gtk4_layer_shell::Layer::Overlay);
    window.set_monitor(Some(monitor));
    window.set_namespace("qkdisplays");
    window.set_keyboard_mode(gtk4_layer_shell::KeyboardMode::None);
    window.set_decorated(false);
    window.add_css_class("qkdisplays-indicator");

    let label = gtk4::Label::new(Some(text));
    window.set_child(Some(&label));
    window.present();
    window
}

fn close_indicators(windows: &mut Vec<gtk4::Window>) {
    if !windows.is_empty() {
        debug!("closing {} indicator(s)", windows.len());
    }
    for window in windows.drain(..) {
        window.close();
    }
}

//  CSS loading

fn load_css(css_path: Option<&Path>) {
    let provider = gtk4::CssProvider::new();

    let css_content = match css_path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(content) => {
                info!("user CSS: {} ({} bytes)", p.display(), content.len());
                content
            }
            Err(e) => {
                warn!("CSS read failed ({}): {}, using built-in", p.display(), e);
                DEFAULT_CSS.to_string()
            }
        },
        None => {
            debug!("no user CSS, using built-in default");
            DEFAULT_CSS.to_string()
        }
    };

    #[allow(deprecated)]
    provider.load_from_data(&css_content);

    if let Some(display) = gdk::Display::default() {
        gtk4::style_context_add_provider_for_display(
            &display,
            &provider,
            gtk4::STYLE_PROVIDER_PRIORITY_APPLICATION,
        );
    } else {
        warn!("no GDK display, CSS will not be applied");
    }
}
