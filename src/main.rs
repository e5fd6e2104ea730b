//! Binary entry point that wires environment bootstrap, logging and the
//! command line, then launches the gesture companion.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use gesture_companion::config::{load_app_config, CONFIG_PATH};
use gesture_companion::reactions::load_reactions;
use gesture_companion::session::{
    connect_face, cycle_emotions, react_to_reply, watch_gestures, WatchOptions, EMOTION_TEST_PAUSE,
};

/// Hand gesture companion that reacts to waves and gun poses with a face.
#[derive(Parser, Debug)]
#[command(name = "gesture-companion", version, about)]
struct Cli {
    /// Configuration file.
    #[arg(long, default_value = CONFIG_PATH)]
    config: PathBuf,

    /// Serial device of the face controller, overriding the config.
    #[arg(long)]
    serial: Option<String>,

    /// Run without the face controller.
    #[arg(long)]
    no_face: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Detect gestures in a landmark recording.
    Watch {
        /// JSON-lines landmark recording.
        #[arg(long)]
        frames: PathBuf,

        /// Replay frames at their recorded pace.
        #[arg(long)]
        realtime: bool,

        /// Ignore keyboard controls on stdin.
        #[arg(long)]
        no_keyboard: bool,
    },
    /// Show the emotion matching a reply.
    Emote {
        /// Reply text to react to.
        text: String,
    },
    /// Cycle the face through every emotion.
    TestFace,
}

#[tokio::main]
/// Bootstraps environment variables and logging, then dispatches the
/// requested command.
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_app_config(&cli.config)
        .with_env_overrides()
        .with_overrides(cli.serial, None);
    let mut face = connect_face(&config, !cli.no_face);

    match cli.command {
        Command::Watch {
            frames,
            realtime,
            no_keyboard,
        } => {
            let options = WatchOptions {
                frames,
                realtime,
                keyboard: !no_keyboard,
            };
            let (stats, state) = watch_gestures(&config, face, options).await?;
            info!(
                waves = stats.waves,
                guns = stats.guns,
                last = state.last_gesture(),
                "goodbye"
            );
        }
        Command::Emote { text } => {
            let reactions = load_reactions(&config.reactions_path);
            let emotion = react_to_reply(face.as_mut(), &reactions, &text);
            println!("{}", emotion);
        }
        Command::TestFace => {
            tokio::task::spawn_blocking(move || cycle_emotions(face.as_mut(), EMOTION_TEST_PAUSE))
                .await?;
        }
    }
    Ok(())
}
