//! Sound-card playback.

use clap::Args;
use patchbay_io::{CpalBackend, CpalConfig};

use super::SessionArgs;
use super::session::{self, Until};

#[derive(Args)]
pub struct PlayArgs {
    /// Output device name (substring match, case-insensitive)
    #[arg(long)]
    device: Option<String>,

    #[command(flatten)]
    session: SessionArgs,
}

pub fn run(args: PlayArgs) -> anyhow::Result<()> {
    let settings = args.session.settings()?;
    let backend = CpalBackend::new(CpalConfig {
        sample_rate: settings.sample_rate,
        frame_size: settings.frame_size,
        channels: 2,
        device: args.device,
    });
    session::run(
        backend,
        &settings,
        args.session.record.as_deref(),
        Until::Interrupted,
    )
}
