//! Raw stereo `f32` to stdout, e.g. `patchbay stream | aplay -f FLOAT_LE -c 2 -r 48000`.

use std::io::{self, BufWriter};

use clap::Args;
use patchbay_io::WriterBackend;

use super::SessionArgs;
use super::session::{self, Until};

#[derive(Args)]
pub struct StreamArgs {
    #[command(flatten)]
    session: SessionArgs,
}

pub fn run(args: StreamArgs) -> anyhow::Result<()> {
    let settings = args.session.settings()?;
    let backend = WriterBackend::new(
        BufWriter::new(io::stdout()),
        settings.sample_rate,
        settings.frame_size,
    );
    session::run(
        backend,
        &settings,
        args.session.record.as_deref(),
        Until::Interrupted,
    )
}
