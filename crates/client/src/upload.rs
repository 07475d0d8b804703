//! Chunked media upload.
//!
//! The file is sliced into fixed-size chunks, each posted as its own
//! multipart request tagged with its index, the chunk count and a generated
//! file name the server reassembles under.

use std::ops::Range;
use std::path::Path;

use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use backoffice_core::{DomainError, DomainResult};

use crate::api::BackofficeApi;
use crate::error::ApiError;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Plan(#[from] DomainError),

    #[error("chunk {index} of {total} failed: {source}")]
    Chunk {
        index: u64,
        total: u64,
        #[source]
        source: ApiError,
    },
}

/// One multipart request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadChunk {
    pub index: u64,
    pub total: u64,
    pub file_name: String,
    pub data: Vec<u8>,
}

/// How a file of `len` bytes is split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    len: u64,
    chunk_size: u64,
    file_name: String,
}

impl ChunkPlan {
    pub fn new(len: u64, chunk_size: u64, original_name: &str) -> DomainResult<Self> {
        if chunk_size == 0 {
            return Err(DomainError::validation("chunk size must be positive"));
        }
        Ok(Self {
            len,
            chunk_size,
            file_name: unique_file_name(original_name),
        })
    }

    /// Server-side name shared by every chunk.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// An empty file is still sent as one (empty) chunk.
    pub fn chunk_count(&self) -> u64 {
        self.len.div_ceil(self.chunk_size).max(1)
    }

    pub fn range(&self, index: u64) -> Range<u64> {
        let start = (index * self.chunk_size).min(self.len);
        let end = (start + self.chunk_size).min(self.len);
        start..end
    }
}

/// `<uuid v4>.<original extension>`, or just the uuid without one.
pub fn unique_file_name(original_name: &str) -> String {
    let id = Uuid::new_v4();
    match Path::new(original_name).extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{id}.{ext}"),
        None => id.to_string(),
    }
}

/// Send `bytes` chunk by chunk, in order.
///
/// `on_progress(sent, total)` runs after each accepted chunk. The first
/// failed chunk stops the upload. Returns the server's reply to the last
/// chunk.
pub async fn upload_chunked<A, F>(
    api: &A,
    endpoint: &str,
    bytes: &[u8],
    original_name: &str,
    chunk_size: u64,
    mut on_progress: F,
) -> Result<Value, UploadError>
where
    A: BackofficeApi + ?Sized,
    F: FnMut(u64, u64),
{
    let plan = ChunkPlan::new(bytes.len() as u64, chunk_size, original_name)?;
    let total = plan.chunk_count();
    tracing::debug!(file = plan.file_name(), total, "starting chunked upload");

    let mut last = Value::Null;
    for index in 0..total {
        let range = plan.range(index);
        let chunk = UploadChunk {
            index,
            total,
            file_name: plan.file_name().to_string(),
            data: bytes[range.start as usize..range.end as usize].to_vec(),
        };

        last = api
            .upload_chunk(endpoint, chunk)
            .await
            .map_err(|source| {
                tracing::warn!(index, total, error = %source, "chunk upload failed");
                UploadError::Chunk { index, total, source }
            })?;
        on_progress(index + 1, total);
    }
    Ok(last)
}
