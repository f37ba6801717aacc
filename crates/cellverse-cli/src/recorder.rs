use crate::error::{CliError, Result};
use cellverse::engine::recorder::{Snapshot, SnapshotRecorder};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::{debug, error};

const AXIS_NAMES: [&str; 3] = ["x", "y", "z"];

/// Writes one CSV row per live particle for every recorded step.
///
/// Columns are `step,time,id,name`, the position coordinates, the velocity
/// coordinates and the magnitude of the accumulated force. Write failures do
/// not stop the simulation: the first one is kept and returned by
/// [`CsvTrajectoryRecorder::into_inner`].
pub struct CsvTrajectoryRecorder<W: Write> {
    writer: csv::Writer<W>,
    dimension: usize,
    every: u64,
    header_written: bool,
    rows: u64,
    error: Option<csv::Error>,
}

impl CsvTrajectoryRecorder<File> {
    pub fn from_path(path: &Path, dimension: usize, every: u64) -> Result<Self> {
        debug!("Opening trajectory file {:?}", path);
        let writer = csv::Writer::from_path(path)?;
        Ok(Self::with_writer(writer, dimension, every))
    }
}

impl<W: Write> CsvTrajectoryRecorder<W> {
    pub fn new(inner: W, dimension: usize, every: u64) -> Self {
        Self::with_writer(csv::Writer::from_writer(inner), dimension, every)
    }

    fn with_writer(writer: csv::Writer<W>, dimension: usize, every: u64) -> Self {
        Self {
            writer,
            dimension: dimension.min(AXIS_NAMES.len()),
            every: every.max(1),
            header_written: false,
            rows: 0,
            error: None,
        }
    }

    pub fn rows_written(&self) -> u64 {
        self.rows
    }

    /// Flushes the writer and hands back the underlying sink, or the first
    /// error met while recording.
    pub fn into_inner(mut self) -> Result<W> {
        if let Some(e) = self.error.take() {
            return Err(CliError::Csv(e));
        }
        self.writer
            .into_inner()
            .map_err(|e| CliError::Io(e.into_error()))
    }

    fn header(&self) -> Vec<String> {
        let mut header: Vec<String> = ["step", "time", "id", "name"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        header.extend(AXIS_NAMES[..self.dimension].iter().map(|a| a.to_string()));
        header.extend(AXIS_NAMES[..self.dimension].iter().map(|a| format!("v{a}")));
        header.push("force".to_string());
        header
    }

    fn write_snapshot(&mut self, snapshot: &Snapshot<'_>) -> std::result::Result<(), csv::Error> {
        if !self.header_written {
            let header = self.header();
            self.writer.write_record(&header)?;
            self.header_written = true;
        }
        for particle in &snapshot.particles {
            let mut row = vec![
                snapshot.step.to_string(),
                snapshot.time.to_string(),
                particle.id().to_string(),
                particle.name().to_string(),
            ];
            row.extend(particle.position().iter().map(|x| x.to_string()));
            row.extend(particle.velocity().iter().map(|v| v.to_string()));
            row.push(particle.force().norm().to_string());
            self.writer.write_record(&row)?;
            self.rows += 1;
        }
        Ok(())
    }
}

impl<W: Write> SnapshotRecorder for CsvTrajectoryRecorder<W> {
    fn record(&mut self, snapshot: &Snapshot<'_>) {
        if self.error.is_some() || snapshot.step % self.every != 0 {
            return;
        }
        if let Err(e) = self.write_snapshot(snapshot) {
            error!("Failed to write trajectory rows: {}", e);
            self.error = Some(e);
        }
    }

    fn finish(&mut self) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self.writer.flush() {
            error!("Failed to flush trajectory file: {}", e);
            self.error = Some(e.into());
        }
        debug!(rows = self.rows, "Trajectory recording finished.");
    }
}
