//! Offline render to a WAV file.

use std::path::PathBuf;

use clap::Args;
use patchbay_io::WavBackend;

use super::SessionArgs;
use super::session::{self, Until};

#[derive(Args)]
pub struct RenderArgs {
    /// Output WAV file
    output: PathBuf,

    /// Length in seconds
    #[arg(long, default_value = "10")]
    seconds: f64,

    #[command(flatten)]
    session: SessionArgs,
}

pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    if !args.seconds.is_finite() || args.seconds < 0.0 {
        anyhow::bail!("--seconds must be a non-negative number");
    }
    let settings = args.session.settings()?;
    let backend = WavBackend::for_duration(
        &args.output,
        settings.sample_rate,
        settings.frame_size,
        args.seconds,
    );
    session::run(
        backend,
        &settings,
        args.session.record.as_deref(),
        Until::Finished,
    )?;
    println!("Wrote {}", args.output.display());
    Ok(())
}
