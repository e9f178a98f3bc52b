//! Manual check for the GTK indicators without a running daemon.
//!
//! Shows a numbered indicator at every given output origin, waits, shows
//! them again numbered in reverse order, waits, then closes them.
//!
//! Run with:
//!     cargo run --bin qkdisplays-test-indicators -- 0,0 1920,0
//!
//! Positions must match the top-left corner of real monitors, otherwise
//! the indicator is skipped with a warning (set `RUST_LOG=debug`).

use clap::Parser;
use qkdisplays::command::Position;
use qkdisplays::config;
use qkdisplays::indicator::gtk::GtkIndicators;
use qkdisplays::indicator::IndicatorHandle;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "qkdisplays-test-indicators")]
struct Args {
    /// How long each set of indicators stays up, in milliseconds.
    #[arg(long, default_value_t = 2000)]
    hold_ms: u64,

    /// Output origins as `x,y`, left to right.
    #[arg(required = true)]
    positions: Vec<Position>,
}

fn main() {
    env_logger::init();

    let args = Args::parse();
    let hold = Duration::from_millis(args.hold_ms);

    let mut indicators = match IndicatorHandle::spawn(GtkIndicators::new(config::find_css_file())) {
        Ok(indicators) => indicators,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    indicators.show(args.positions.clone());
    std::thread::sleep(hold);

    let mut reversed = args.positions;
    reversed.reverse();
    indicators.refresh(reversed);
    std::thread::sleep(hold);

    indicators.stop();
}
