use std::time::Instant;

use camino::Utf8PathBuf;
use tracing::info;

use crate::aggregate::aggregate;
use crate::archive::{ArchiveClient, fetch_window};
use crate::config::DigestConfig;
use crate::dataset::{Dataset, DatasetWriter};
use crate::error::DigestError;
use crate::scale::DisplayScaler;
use crate::window::DateWindow;

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub start_date: String,
    pub end_date: String,
    pub days: usize,
    pub keys: usize,
    pub max_value: u64,
    pub output_path: Utf8PathBuf,
}

/// One fetch → aggregate → scale → write pass over a window.
#[derive(Debug)]
pub struct App<C: ArchiveClient> {
    config: DigestConfig,
    client: C,
    scaler: DisplayScaler,
}

impl<C: ArchiveClient> App<C> {
    pub fn new(config: DigestConfig, client: C) -> Result<Self, DigestError> {
        let scaler = DisplayScaler::from_config(&config)?;
        Ok(Self {
            config,
            client,
            scaler,
        })
    }

    /// Fetches and processes the window without touching the filesystem.
    pub fn build_dataset(&self, window: &DateWindow) -> Result<(Dataset, u64), DigestError> {
        let days = window.days();
        info!(
            phase = "fetch",
            start = %window.start(),
            end = %window.end(),
            days = days.len(),
            "requesting daily snapshots"
        );
        let started = Instant::now();
        let snapshots = fetch_window(&self.client, &days, self.config.max_parallel_fetches)?;
        info!(
            phase = "fetch",
            elapsed_ms = started.elapsed().as_millis() as u64,
            "all snapshots received"
        );

        let matrix = aggregate(&snapshots);
        let max_value = matrix.max_value;
        info!(
            phase = "aggregate",
            keys = matrix.key_count(),
            max_value,
            "built key matrix"
        );

        let groups = self.scaler.scale_matrix(matrix);
        Ok((Dataset::new(window, self.config.date_format, groups), max_value))
    }

    pub fn run(&self, window: &DateWindow) -> Result<RunSummary, DigestError> {
        let (dataset, max_value) = self.build_dataset(window)?;
        DatasetWriter::write(&self.config.output_path, &dataset, self.config.pretty)?;
        info!(phase = "write", path = %self.config.output_path, "dataset written");

        Ok(RunSummary {
            start_date: dataset.start_date.clone(),
            end_date: dataset.end_date.clone(),
            days: window.day_count(),
            keys: dataset.groups.len(),
            max_value,
            output_path: self.config.output_path.clone(),
        })
    }
}
