//! Scripted in-memory [`BackofficeApi`] for tests, behind the `test-util` feature.
//!
//! Records every call. Responses are scripted per endpoint; anything not
//! scripted answers with an empty success where that makes sense and
//! `NotFound` where it does not.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::{Value, json};

use backoffice_core::RowId;

use crate::api::BackofficeApi;
use crate::common_data::Descriptors;
use crate::error::ApiError;
use crate::import::{ImportBatch, ImportException, ImportPreview, ImportRequest, ImportStatus};
use crate::types::ListResponse;
use crate::upload::UploadChunk;

type ListHandler = Box<dyn Fn(&str) -> Result<ListResponse, ApiError> + Send + Sync>;

/// A recorded request.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List(String),
    Create { entity: String, body: Value },
    Update { entity: String, id: RowId, body: Value },
    Delete { entity: String, ids: Vec<RowId> },
    /// Requested block names.
    CommonData(Vec<String>),
    ImportUpload { entity: String, file_name: String },
    ImportProcess { entity: String, request: ImportRequest },
    ImportStatus { name: String, id: String },
    ImportExceptions { name: String },
    UploadChunk {
        endpoint: String,
        index: u64,
        total: u64,
        file_name: String,
        len: usize,
    },
    Export(String),
}

#[derive(Default)]
struct Script {
    calls: Vec<Call>,
    list: Option<ListHandler>,
    writes: VecDeque<Result<Value, ApiError>>,
    blocks: BTreeMap<String, Value>,
    preview: Option<ImportPreview>,
    batch: Option<ImportBatch>,
    statuses: VecDeque<ImportStatus>,
    exceptions: Vec<ImportException>,
    fail_chunk: Option<u64>,
    export: Vec<u8>,
}

#[derive(Default)]
pub struct MockApi {
    script: Mutex<Script>,
}

impl core::fmt::Debug for MockApi {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MockApi")
            .field("calls", &self.script().calls.len())
            .finish()
    }
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: Call) {
        self.script().calls.push(call);
    }

    /// Answer list requests by path (`<entity>?<query string>`).
    pub fn on_list<F>(&self, handler: F)
    where
        F: Fn(&str) -> Result<ListResponse, ApiError> + Send + Sync + 'static,
    {
        self.script().list = Some(Box::new(handler));
    }

    /// Result of the next create/update/delete. Unscripted writes succeed.
    pub fn push_write(&self, result: Result<Value, ApiError>) {
        self.script().writes.push_back(result);
    }

    pub fn set_block(&self, key: impl Into<String>, value: Value) {
        self.script().blocks.insert(key.into(), value);
    }

    pub fn set_import_preview(&self, preview: ImportPreview) {
        self.script().preview = Some(preview);
    }

    pub fn set_import_batch(&self, batch: ImportBatch) {
        self.script().batch = Some(batch);
    }

    /// Statuses are served in order; the last one repeats.
    pub fn push_import_status(&self, status: ImportStatus) {
        self.script().statuses.push_back(status);
    }

    pub fn set_import_exceptions(&self, exceptions: Vec<ImportException>) {
        self.script().exceptions = exceptions;
    }

    /// Reject the chunk with this index.
    pub fn fail_chunk(&self, index: u64) {
        self.script().fail_chunk = Some(index);
    }

    pub fn set_export_bytes(&self, bytes: Vec<u8>) {
        self.script().export = bytes;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script().calls.clone()
    }

    /// Paths of every list request so far.
    pub fn list_calls(&self) -> Vec<String> {
        self.script()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::List(path) => Some(path.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.script().calls.clear();
    }

    fn next_write(&self, fallback: Value) -> Result<Value, ApiError> {
        self.script().writes.pop_front().unwrap_or(Ok(fallback))
    }
}

#[async_trait]
impl BackofficeApi for MockApi {
    async fn list(&self, path: &str) -> Result<ListResponse, ApiError> {
        self.record(Call::List(path.to_string()));
        match &self.script().list {
            Some(handler) => handler(path),
            None => Ok(ListResponse::new(Vec::new(), 0)),
        }
    }

    async fn create(&self, entity: &str, body: &Value) -> Result<Value, ApiError> {
        self.record(Call::Create {
            entity: entity.to_string(),
            body: body.clone(),
        });
        self.next_write(body.clone())
    }

    async fn update(&self, entity: &str, id: RowId, body: &Value) -> Result<Value, ApiError> {
        self.record(Call::Update {
            entity: entity.to_string(),
            id,
            body: body.clone(),
        });
        self.next_write(body.clone())
    }

    async fn delete(&self, entity: &str, ids: &[RowId]) -> Result<(), ApiError> {
        self.record(Call::Delete {
            entity: entity.to_string(),
            ids: ids.to_vec(),
        });
        self.next_write(Value::Null).map(drop)
    }

    async fn common_data(&self, descriptors: &Descriptors) -> Result<BTreeMap<String, Value>, ApiError> {
        self.record(Call::CommonData(descriptors.keys().cloned().collect()));
        let script = self.script();
        Ok(descriptors
            .keys()
            .filter_map(|key| script.blocks.get(key).map(|v| (key.clone(), v.clone())))
            .collect())
    }

    async fn import_upload(
        &self,
        entity: &str,
        file_name: &str,
        _bytes: Vec<u8>,
    ) -> Result<ImportPreview, ApiError> {
        self.record(Call::ImportUpload {
            entity: entity.to_string(),
            file_name: file_name.to_string(),
        });
        self.script().preview.clone().ok_or(ApiError::NotFound)
    }

    async fn import_process(&self, entity: &str, request: &ImportRequest) -> Result<ImportBatch, ApiError> {
        self.record(Call::ImportProcess {
            entity: entity.to_string(),
            request: request.clone(),
        });
        self.script().batch.clone().ok_or(ApiError::NotFound)
    }

    async fn import_status(&self, batch: &ImportBatch) -> Result<ImportStatus, ApiError> {
        self.record(Call::ImportStatus {
            name: batch.name.clone(),
            id: batch.id.clone(),
        });
        let mut script = self.script();
        let status = if script.statuses.len() > 1 {
            script.statuses.pop_front()
        } else {
            script.statuses.front().cloned()
        };
        status.ok_or(ApiError::NotFound)
    }

    async fn import_exceptions(&self, batch: &ImportBatch) -> Result<Vec<ImportException>, ApiError> {
        self.record(Call::ImportExceptions {
            name: batch.name.clone(),
        });
        Ok(self.script().exceptions.clone())
    }

    async fn upload_chunk(&self, endpoint: &str, chunk: UploadChunk) -> Result<Value, ApiError> {
        self.record(Call::UploadChunk {
            endpoint: endpoint.to_string(),
            index: chunk.index,
            total: chunk.total,
            file_name: chunk.file_name.clone(),
            len: chunk.data.len(),
        });
        if self.script().fail_chunk == Some(chunk.index) {
            return Err(ApiError::Api(500, "chunk rejected".to_string()));
        }
        Ok(json!({ "chunk_index": chunk.index, "file_name": chunk.file_name }))
    }

    async fn export(&self, path: &str) -> Result<Vec<u8>, ApiError> {
        self.record(Call::Export(path.to_string()));
        Ok(self.script().export.clone())
    }
}
