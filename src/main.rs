//! Entry point for the **qkdisplays** command.
//!
//! Every subcommand except `show` runs once and exits.  `show` starts the
//! daemon: the indicator surface runs on its own thread and the command
//! loop blocks the main thread until `qkdisplays close`.

use clap::{Parser, Subcommand, ValueEnum};
use log::debug;
use qkdisplays::arrangement::Arrangement;
use qkdisplays::command::{DaemonCommand, Direction};
use qkdisplays::config::{self, ArrangementOptions, PartialOptions};
use qkdisplays::daemon::Daemon;
use qkdisplays::ipc::client;
use qkdisplays::ipc::socket::default_socket_path;
use qkdisplays::sway::ipc::SwayIpc;
use std::error::Error;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "qkdisplays", version, about = "Number, move and focus displays from left to right")]
struct Cli {
    /// Move displays to be contiguous from left to right if they are not
    /// already.  Without it, misplaced displays make qkdisplays fail.
    #[arg(long, overrides_with = "no_allow_reorg")]
    allow_reorg: bool,
    #[arg(long, overrides_with = "allow_reorg", hide = true)]
    no_allow_reorg: bool,

    /// All displays must share the same position on the y axis.  If they do
    /// not, they are moved (with --allow-reorg) or qkdisplays fails.
    #[arg(long, overrides_with = "no_strict_y")]
    strict_y: bool,
    #[arg(long, overrides_with = "strict_y", hide = true)]
    no_strict_y: bool,

    /// Path to the config JSON file.  Defaults to the first of
    /// $XDG_CONFIG_HOME/qkdisplays.json, $HOME/.config/qkdisplays.json and
    /// /etc/qkdisplays.json that exists.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Show a number on each display, counting from 1 on the left.  Keeps
    /// running until `qkdisplays close`.
    Show,
    /// Close a running `qkdisplays show`.
    Close,
    /// Move the focused display one place to the left or right.
    Move {
        #[arg(value_enum)]
        direction: DirectionArg,
    },
    /// Focus the display with the given number.
    Focus {
        #[arg(allow_negative_numbers = true)]
        display_number: i64,
    },
    /// Swap the focused display with the display with the given number.
    Place {
        #[arg(allow_negative_numbers = true)]
        display_number: i64,
    },
    /// Ask a running `qkdisplays show` to redraw, e.g. after moving
    /// displays with another tool.
    Refresh,
}

#[derive(Clone, Copy, ValueEnum)]
enum DirectionArg {
    Left,
    Right,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Left => Direction::Left,
            DirectionArg::Right => Direction::Right,
        }
    }
}

/// `Some(true)` for `--flag`, `Some(false)` for `--no-flag`, `None` for
/// neither.  clap keeps only the last of the pair.
fn tri_state(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

impl Cli {
    fn flag_options(&self) -> PartialOptions {
        PartialOptions {
            allow_reorg: tri_state(self.allow_reorg, self.no_allow_reorg),
            strict_y: tri_state(self.strict_y, self.no_strict_y),
        }
    }
}

//  Main

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let socket = default_socket_path();

    match cli.command {
        Cmd::Close => client::send(&socket, DaemonCommand::Close)?,
        Cmd::Refresh => client::send(&socket, DaemonCommand::Notify)?,
        Cmd::Show => {
            let options = resolve_options(&cli)?;
            let daemon = Daemon::start(&socket, SwayIpc::from_env()?, options, indicator_surface())?;
            daemon.run();
        }
        Cmd::Move { direction } => {
            if arrangement(&cli)?.move_focused(direction.into())? {
                client::send(&socket, DaemonCommand::Notify)?;
            }
        }
        Cmd::Place { display_number } => {
            if arrangement(&cli)?.place(display_number)? {
                client::send(&socket, DaemonCommand::Notify)?;
            }
        }
        Cmd::Focus { display_number } => {
            arrangement(&cli)?.focus(display_number)?;
        }
    }
    Ok(())
}

fn resolve_options(cli: &Cli) -> Result<ArrangementOptions, Box<dyn Error>> {
    let options = config::load_options(cli.flag_options(), cli.config.as_deref())?;
    debug!("options: {:?}", options);
    Ok(options)
}

fn arrangement(cli: &Cli) -> Result<Arrangement<SwayIpc>, Box<dyn Error>> {
    let options = resolve_options(cli)?;
    Ok(Arrangement::new(SwayIpc::from_env()?, options)?)
}

#[cfg(feature = "indicator-gtk")]
fn indicator_surface() -> qkdisplays::indicator::gtk::GtkIndicators {
    qkdisplays::indicator::gtk::GtkIndicators::new(config::find_css_file())
}

#[cfg(not(feature = "indicator-gtk"))]
fn indicator_surface() -> qkdisplays::indicator::headless::HeadlessIndicators {
    qkdisplays::indicator::headless::HeadlessIndicators
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("qkdisplays").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn flags_absent_are_none() {
        let cli = parse(&["refresh"]);
        assert_eq!(cli.flag_options(), PartialOptions::default());
    }

    #[test]
    fn negated_flags_are_false() {
        let cli = parse(&["--no-allow-reorg", "--strict-y", "show"]);
        assert_eq!(
            cli.flag_options(),
            PartialOptions {
                allow_reorg: Some(false),
                strict_y: Some(true),
            }
        );
    }

    #[test]
    fn last_flag_of_a_pair_wins() {
        let cli = parse(&["--allow-reorg", "--no-allow-reorg", "close"]);
        assert_eq!(cli.flag_options().allow_reorg, Some(false));
        let cli = parse(&["--no-strict-y", "--strict-y", "close"]);
        assert_eq!(cli.flag_options().strict_y, Some(true));
    }

    #[test]
    fn subcommand_arguments() {
        assert!(matches!(
            parse(&["move", "left"]).command,
            Cmd::Move {
                direction: DirectionArg::Left
            }
        ));
        assert!(matches!(
            parse(&["place", "3"]).command,
            Cmd::Place { display_number: 3 }
        ));
        assert!(Cli::try_parse_from(["qkdisplays", "move", "up"]).is_err());
    }

    #[test]
    fn negative_display_numbers_parse() {
        assert!(matches!(
            parse(&["place", "-1"]).command,
            Cmd::Place { display_number: -1 }
        ));
        assert!(matches!(
            parse(&["focus", "-3"]).command,
            Cmd::Focus { display_number: -3 }
        ));
    }

    #[test]
    fn config_path_is_optional() {
        let cli = parse(&["--config", "/tmp/q.json", "focus", "2"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/q.json")));
        assert!(matches!(cli.command, Cmd::Focus { display_number: 2 }));
    }
}
