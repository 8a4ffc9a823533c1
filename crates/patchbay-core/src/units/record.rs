//! Records its input to a raw `f64` PCM file while `record` is high.
//!
//! `position` reports the recorded length in milliseconds. A high `reset`
//! truncates the file and rewinds. The file is flushed and synced when the
//! unit leaves the graph. I/O failures while recording can't be reported
//! from the audio path, so the first one is kept and returned by `close`.

use std::fs::File;
use std::io::{self, Seek, SeekFrom};
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::UnitError;
use crate::pcm::PcmWriter;
use crate::port::{In, Out};
use crate::unit::{Capabilities, Io, Processor, Unit};

use super::Config;

#[derive(Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct RecordConfig {
    file_name: PathBuf,
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            file_name: PathBuf::from("out.pcm"),
        }
    }
}

pub(super) fn build(mut io: Io, config: &Config) -> Result<Unit, UnitError> {
    let RecordConfig { file_name } = config.decode()?;
    let file = File::create(&file_name)?;
    tracing::debug!(path = %file_name.display(), "record: created file");

    let record = Record {
        input: io.new_in("in", 0.0),
        record: io.new_in("record", 0.0),
        reset: io.new_in("reset", 0.0),
        out: io.new_out("out"),
        position: io.new_out("position"),
        writer: Some(PcmWriter::new(file, config.quantum())),
        ms_per_sample: 1000.0 / f64::from(config.sample_rate().max(1)),
        length: 0.0,
        failure: None,
    };
    Ok(Unit::new(io, record))
}

struct Record {
    input: In,
    record: In,
    reset: In,
    out: Out,
    position: Out,
    writer: Option<PcmWriter<File>>,
    ms_per_sample: f64,
    length: f64,
    failure: Option<io::Error>,
}

impl Record {
    fn rewind(writer: &mut PcmWriter<File>) -> io::Result<()> {
        writer.reset();
        let file = writer.get_mut();
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        Ok(())
    }

    fn note(&mut self, result: io::Result<()>) {
        if let Err(e) = result
            && self.failure.is_none()
        {
            tracing::warn!(error = %e, "record: write failed");
            self.failure = Some(e);
        }
    }
}

impl Processor for Record {
    fn process_sample(&mut self, i: usize) {
        if self.writer.is_none() {
            return;
        }
        if self.reset.read(i) > 0.0 {
            let result = self.writer.as_mut().map_or(Ok(()), Self::rewind);
            self.length = 0.0;
            self.note(result);
        }
        if self.record.read(i) <= 0.0 {
            return;
        }

        let sample = self.input.read(i);
        self.out.write(i, sample);
        self.position.write(i, self.length);
        self.length += self.ms_per_sample;
        let result = self
            .writer
            .as_mut()
            .map_or(Ok(()), |writer| writer.write_sample(sample));
        self.note(result);
    }

    fn close(&mut self) -> Result<(), UnitError> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(());
        };
        if let Some(e) = self.failure.take() {
            return Err(e.into());
        }
        writer.flush()?;
        writer.into_inner().sync_all()?;
        Ok(())
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            closes: true,
            ..Capabilities::SAMPLE
        }
    }
}
