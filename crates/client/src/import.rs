//! Spreadsheet import wizard.
//!
//! `Download → ColumnMatch → Processing`, strictly linear; the only way back
//! is `ColumnMatch → Download`. Processing runs as a server-side batch that
//! the wizard polls. [`ImportWizard::reset`] abandons the flow: any poll
//! result that comes back afterwards is dropped instead of applied.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::time::MissedTickBehavior;

use crate::api::BackofficeApi;
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStep {
    #[default]
    Download,
    ColumnMatch,
    Processing,
}

impl core::fmt::Display for ImportStep {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Download => "download",
            Self::ColumnMatch => "column match",
            Self::Processing => "processing",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("cannot {action} during the {step} step")]
    WrongStep { action: &'static str, step: ImportStep },

    #[error("unknown column heading: {0}")]
    UnknownHeading(String),

    #[error("row {0} is not part of the preview")]
    UnknownRow(usize),

    #[error("poll interval must be greater than zero")]
    ZeroInterval,

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Parsed upload: the file's headings and a sample of its rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportPreview {
    pub headings: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
    /// Server-side handle of the stored upload, echoed back on process.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

/// Body of `POST <entity>/import/process`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Heading → entity field.
    pub columns: BTreeMap<String, String>,
    pub skip_rows: BTreeSet<usize>,
}

/// Handle of the background batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportBatch {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportStatus {
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub total_jobs: u64,
    #[serde(default)]
    pub processed_jobs: u64,
    #[serde(default)]
    pub failed_jobs: u64,
    #[serde(default)]
    pub finished_at: Option<String>,
}

impl ImportStatus {
    pub fn new(total_jobs: u64, processed_jobs: u64, failed_jobs: u64) -> Self {
        Self {
            total_jobs,
            processed_jobs,
            failed_jobs,
            ..Self::default()
        }
    }

    /// Completion percentage; the server's own figure wins when it sends one.
    pub fn percent(&self) -> f64 {
        if let Some(progress) = self.progress {
            return progress.clamp(0.0, 100.0);
        }
        if self.total_jobs == 0 {
            return 0.0;
        }
        (self.processed_jobs as f64 / self.total_jobs as f64 * 100.0).min(100.0)
    }

    pub fn is_complete(&self) -> bool {
        self.finished_at.is_some() || (self.total_jobs > 0 && self.processed_jobs >= self.total_jobs)
    }
}

/// One record the batch could not import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportException {
    #[serde(default)]
    pub row: Option<u64>,
    #[serde(alias = "error", alias = "exception")]
    pub message: String,
}

/// Identifies which run of the wizard a poll belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollTicket {
    generation: u64,
    batch: ImportBatch,
}

impl PollTicket {
    pub fn batch(&self) -> &ImportBatch {
        &self.batch
    }

    pub async fn fetch<A>(&self, api: &A) -> Result<ImportStatus, ApiError>
    where
        A: BackofficeApi + ?Sized,
    {
        api.import_status(&self.batch).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PollOutcome {
    /// The wizard was reset since the ticket was issued.
    Discarded,
    Running(f64),
    Complete { percent: f64, failed: u64 },
}

#[derive(Debug, Default)]
pub struct ImportWizard {
    entity: String,
    step: ImportStep,
    generation: u64,
    preview: Option<ImportPreview>,
    columns: BTreeMap<String, String>,
    skip_rows: BTreeSet<usize>,
    batch: Option<ImportBatch>,
    status: Option<ImportStatus>,
    exceptions: Vec<ImportException>,
}

impl ImportWizard {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            ..Self::default()
        }
    }

    pub fn step(&self) -> ImportStep {
        self.step
    }

    pub fn preview(&self) -> Option<&ImportPreview> {
        self.preview.as_ref()
    }

    pub fn columns(&self) -> &BTreeMap<String, String> {
        &self.columns
    }

    pub fn skipped_rows(&self) -> &BTreeSet<usize> {
        &self.skip_rows
    }

    pub fn batch(&self) -> Option<&ImportBatch> {
        self.batch.as_ref()
    }

    pub fn status(&self) -> Option<&ImportStatus> {
        self.status.as_ref()
    }

    pub fn progress(&self) -> f64 {
        self.status.as_ref().map_or(0.0, ImportStatus::percent)
    }

    pub fn is_complete(&self) -> bool {
        self.status.as_ref().is_some_and(ImportStatus::is_complete)
    }

    pub fn exceptions(&self) -> &[ImportException] {
        &self.exceptions
    }

    fn expect_step(&self, step: ImportStep, action: &'static str) -> Result<(), ImportError> {
        if self.step == step {
            Ok(())
        } else {
            Err(ImportError::WrongStep { action, step: self.step })
        }
    }

    /// Upload the file and move on to column matching.
    pub async fn upload<A>(&mut self, api: &A, file_name: &str, bytes: Vec<u8>) -> Result<(), ImportError>
    where
        A: BackofficeApi + ?Sized,
    {
        self.expect_step(ImportStep::Download, "upload")?;
        let preview = api.import_upload(&self.entity, file_name, bytes).await?;
        tracing::debug!(entity = %self.entity, headings = preview.headings.len(), "import file parsed");

        self.preview = Some(preview);
        self.columns.clear();
        self.skip_rows.clear();
        self.step = ImportStep::ColumnMatch;
        Ok(())
    }

    /// `ColumnMatch → Download`; the upload is discarded.
    pub fn back(&mut self) -> Result<(), ImportError> {
        self.expect_step(ImportStep::ColumnMatch, "go back")?;
        self.preview = None;
        self.columns.clear();
        self.skip_rows.clear();
        self.step = ImportStep::Download;
        Ok(())
    }

    /// Map a heading to a field, or unmap it with `None`.
    pub fn map_column(&mut self, heading: &str, field: Option<&str>) -> Result<(), ImportError> {
        self.expect_step(ImportStep::ColumnMatch, "map columns")?;
        let known = self
            .preview
            .as_ref()
            .is_some_and(|p| p.headings.iter().any(|h| h == heading));
        if !known {
            return Err(ImportError::UnknownHeading(heading.to_string()));
        }

        match field {
            Some(field) => self.columns.insert(heading.to_string(), field.to_string()),
            None => self.columns.remove(heading),
        };
        Ok(())
    }

    /// Toggle whether a preview row is skipped. Returns the new state.
    pub fn skip_row(&mut self, index: usize) -> Result<bool, ImportError> {
        self.expect_step(ImportStep::ColumnMatch, "skip rows")?;
        if self.preview.as_ref().is_none_or(|p| index >= p.rows.len()) {
            return Err(ImportError::UnknownRow(index));
        }
        if self.skip_rows.remove(&index) {
            Ok(false)
        } else {
            self.skip_rows.insert(index);
            Ok(true)
        }
    }

    /// Submit the mapping and start the background batch.
    pub async fn process<A>(&mut self, api: &A) -> Result<&ImportBatch, ImportError>
    where
        A: BackofficeApi + ?Sized,
    {
        self.expect_step(ImportStep::ColumnMatch, "process")?;
        let request = ImportRequest {
            file: self.preview.as_ref().and_then(|p| p.file.clone()),
            columns: self.columns.clone(),
            skip_rows: self.skip_rows.clone(),
        };

        let batch = api.import_process(&self.entity, &request).await?;
        tracing::info!(entity = %self.entity, batch = %batch.id, "import batch started");

        self.status = None;
        self.exceptions.clear();
        self.step = ImportStep::Processing;
        Ok(&*self.batch.insert(batch))
    }

    /// Ticket for polling the current batch outside of `&mut self`.
    pub fn poll_ticket(&self) -> Result<PollTicket, ImportError> {
        self.expect_step(ImportStep::Processing, "poll")?;
        let batch = self.batch.clone().ok_or(ImportError::WrongStep {
            action: "poll",
            step: self.step,
        })?;
        Ok(PollTicket {
            generation: self.generation,
            batch,
        })
    }

    /// Apply a status fetched with `ticket`, unless the wizard moved on.
    pub fn apply_status(&mut self, ticket: &PollTicket, status: ImportStatus) -> PollOutcome {
        if ticket.generation != self.generation || self.step != ImportStep::Processing {
            tracing::debug!(batch = %ticket.batch.id, "discarding poll result after reset");
            return PollOutcome::Discarded;
        }

        let percent = status.percent();
        let outcome = if status.is_complete() {
            PollOutcome::Complete {
                percent,
                failed: status.failed_jobs,
            }
        } else {
            PollOutcome::Running(percent)
        };
        self.status = Some(status);
        outcome
    }

    /// One status round trip. On completion with failures the exception
    /// list is fetched as well.
    pub async fn poll_once<A>(&mut self, api: &A) -> Result<PollOutcome, ImportError>
    where
        A: BackofficeApi + ?Sized,
    {
        let ticket = self.poll_ticket()?;
        let status = ticket.fetch(api).await?;
        let outcome = self.apply_status(&ticket, status);

        if let PollOutcome::Complete { failed, .. } = outcome {
            tracing::info!(batch = %ticket.batch.id, failed, "import batch finished");
            if failed > 0 {
                self.exceptions = api.import_exceptions(&ticket.batch).await?;
            }
        }
        Ok(outcome)
    }

    /// Poll at a fixed cadence until the batch completes.
    pub async fn run_polling<A>(&mut self, api: &A, interval: Duration) -> Result<PollOutcome, ImportError>
    where
        A: BackofficeApi + ?Sized,
    {
        if interval.is_zero() {
            return Err(ImportError::ZeroInterval);
        }
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match self.poll_once(api).await? {
                PollOutcome::Running(percent) => tracing::debug!(percent, "import running"),
                done => return Ok(done),
            }
        }
    }

    /// Abandon the flow and start over at `Download`.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.step = ImportStep::Download;
        self.preview = None;
        self.columns.clear();
        self.skip_rows.clear();
        self.batch = None;
        self.status = None;
        self.exceptions.clear();
    }
}
