//! A surface that logs indicator events instead of drawing them.
//!
//! Used when qkdisplays is built without the `indicator-gtk` feature, so
//! `show` still keeps the arrangement fresh and answers commands.

use super::describe;
use crate::traits::{IndicatorEvent, IndicatorSurface};
use log::info;
use std::sync::mpsc;

/// Logs every [`IndicatorEvent`] at `info` level.
#[derive(Debug, Default)]
pub struct HeadlessIndicators;

impl IndicatorSurface for HeadlessIndicators {
    fn run(self, events: mpsc::Receiver<IndicatorEvent>) {
        for event in events {
            match event {
                IndicatorEvent::Show(positions) => {
                    info!("indicators: {}", describe(&positions));
                }
                IndicatorEvent::Refresh(positions) => {
                    info!("indicators refreshed: {}", describe(&positions));
                }
                IndicatorEvent::Stop => break,
            }
        }
        info!("headless indicators stopped");
    }
}
