//! patchbay CLI - run the patch engine against a sound card, stdout or a WAV
//! file.

mod commands;
mod patch;
mod settings;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "patchbay")]
#[command(author, version, about = "Live-patchable modular audio engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play the demo patch on a sound card
    Play(commands::play::PlayArgs),

    /// Stream the demo patch to stdout as raw stereo f32
    Stream(commands::stream::StreamArgs),

    /// Render the demo patch to a WAV file
    Render(commands::render::RenderArgs),

    /// List available unit types
    Units,

    /// List audio output devices
    Devices,
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so `stream` keeps stdout for audio.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play(args) => commands::play::run(args),
        Commands::Stream(args) => commands::stream::run(args),
        Commands::Render(args) => commands::render::run(args),
        Commands::Units => commands::units::run(),
        Commands::Devices => commands::devices::run(),
    }
}
