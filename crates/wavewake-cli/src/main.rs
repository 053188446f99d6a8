mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use wavewake_core::{
    config::get_data_dir, daemon_control::DaemonControl, DisplayState, GestureSet,
};

#[derive(Parser)]
#[command(name = "wavewake")]
#[command(about = "Proximity gesture doze-pulse daemon", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the gesture daemon
    Start,
    /// (Internal) Run the daemon process
    #[command(hide = true)]
    DaemonInternalStart,
    /// Stop the gesture daemon
    Stop,
    /// Show daemon and sensor status
    Status,
    /// Report a display state change to the daemon
    Display {
        #[arg(value_enum)]
        state: Switch,
    },
    /// Gesture preferences
    Prefs {
        #[command(subcommand)]
        action: PrefsAction,
    },
    /// Turn the system-wide doze switch on or off
    Doze {
        #[arg(value_enum)]
        state: Switch,
    },
    /// Run the classifier over recorded readings
    Replay {
        /// JSON array of readings ({"value", "max_range", "timestamp_ns"})
        file: PathBuf,
        /// Enable the hand wave gesture
        #[arg(long)]
        hand_wave: bool,
        /// Enable the pocket gesture
        #[arg(long)]
        pocket: bool,
    },
}

#[derive(Subcommand, Debug)]
enum PrefsAction {
    /// Show one preference
    Get {
        /// hand_wave or pocket
        key: String,
    },
    /// Turn a gesture on or off
    Set {
        /// hand_wave or pocket
        key: String,
        #[arg(value_enum)]
        state: Switch,
    },
    /// List all preferences
    List,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Switch {
    On,
    Off,
}

impl Switch {
    const fn enabled(self) -> bool {
        matches!(self, Self::On)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if !matches!(cli.command, Commands::DaemonInternalStart) {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .format_timestamp_secs()
            .init();
    }

    let data_dir = get_data_dir()?;
    let control = DaemonControl::new(&data_dir);

    match cli.command {
        Commands::Start => commands::daemon::start_daemon(&control),
        Commands::DaemonInternalStart => commands::daemon::run_daemon_process(&control).await,
        Commands::Stop => commands::daemon::stop_daemon(&control).await,
        Commands::Status => commands::daemon::show_status(&control).await,
        Commands::Display { state } => {
            let state = DisplayState::from_interactive(state.enabled());
            commands::daemon::send_display(&control, state).await
        }
        Commands::Prefs { action } => match action {
            PrefsAction::Get { key } => commands::prefs::get_preference(&key),
            PrefsAction::Set { key, state } => {
                commands::prefs::set_preference(&control, &key, state.enabled()).await
            }
            PrefsAction::List => commands::prefs::list_preferences(),
        },
        Commands::Doze { state } => commands::prefs::set_doze(state.enabled()),
        Commands::Replay {
            file,
            hand_wave,
            pocket,
        } => commands::replay::replay_command(
            &file,
            GestureSet {
                handwave: hand_wave,
                pocket,
            },
        ),
    }
}
