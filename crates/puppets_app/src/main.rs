// SPDX-License-Identifier: MIT OR Apache-2.0
//! Puppets command-line tool.
//!
//! Inspects layered rigs and action libraries and bakes actions into
//! sprite sheets.

mod commands;
mod settings;

use clap::{Parser, Subcommand};
use commands::BakeOptions;
use settings::{PuppetSettings, SETTINGS_FILE_NAME};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "puppets", version, about = "Cut-out puppet rigging and animation tools")]
struct Cli {
    /// Settings file
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the layer tree of an OpenRaster archive
    Layers {
        /// Archive to read
        ora: PathBuf,
    },
    /// Resolve a rig's parts and joints
    Rig {
        /// Layered archive (.ora) or rig document (.ron, .json)
        path: PathBuf,
        /// Write the resolved rig as a document
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List the actions of a library
    Actions {
        /// Library file; the settings' library file when omitted
        file: Option<PathBuf>,
    },
    /// Bake an action into a sprite sheet
    Bake {
        /// Rig to pose
        rig: PathBuf,
        /// Action library file
        actions: PathBuf,
        /// Action name
        name: String,
        /// Output image; `<name>.png` when omitted
        #[arg(long)]
        out: Option<PathBuf>,
        /// Rig the action was authored on, for retargeting
        #[arg(long)]
        reference: Option<PathBuf>,
    },
    /// Play an action through the poser and print the final pose
    Play {
        /// Rig to pose
        rig: PathBuf,
        /// Action library file
        actions: PathBuf,
        /// Action name
        name: String,
    },
    /// Print the effective settings
    Settings {
        /// Also write them to the settings file
        #[arg(long)]
        write: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings_path = cli
        .settings
        .clone()
        .unwrap_or_else(|| PathBuf::from(SETTINGS_FILE_NAME));
    let settings = PuppetSettings::load_or_default(&settings_path)?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::debug!("Using settings from {}", settings_path.display());

    match cli.cmd {
        Command::Layers { ora } => commands::layers(&ora),
        Command::Rig { path, out } => commands::rig(&path, out.as_deref()),
        Command::Actions { file } => {
            let file = file.unwrap_or_else(|| settings.library.actions_file.clone());
            commands::actions(&file, &settings)
        }
        Command::Bake {
            rig,
            actions,
            name,
            out,
            reference,
        } => {
            let options = BakeOptions {
                rig,
                actions,
                name,
                reference,
                out,
            };
            commands::bake(&options, &settings)
        }
        Command::Play { rig, actions, name } => commands::play(&rig, &actions, &name, &settings),
        Command::Settings { write } => {
            println!("{}", settings.to_ron()?);
            if write {
                settings.save(&settings_path)?;
                tracing::info!("Wrote settings to {}", settings_path.display());
            }
            Ok(())
        }
    }
}
