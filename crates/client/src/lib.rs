//! `backoffice-client` — list screens, forms and background flows of the
//! back-office over its REST API.
//!
//! Screens are plain state machines driven by explicit inputs (and an
//! explicit clock), talking to the server only through [`BackofficeApi`].

pub mod api;
pub mod cache;
pub mod common_data;
pub mod config;
pub mod error;
pub mod export;
pub mod forms;
pub mod import;
pub mod list;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod mutation;
pub mod notify;
pub mod query;
pub mod store;
pub mod types;
pub mod upload;
pub mod view;

pub use api::{BackofficeApi, HttpApi};
pub use cache::{QueryCache, SharedCache};
pub use common_data::{BlockSource, CommonData, CommonDataCache, Descriptors, RealtimeCachePatcher};
pub use config::{ClientConfig, ConfigError};
pub use error::{ApiError, FieldErrors};
pub use export::{download_export, export_path};
pub use forms::{ActionsState, DeleteState, Drawer, FormLayout, FormMode, FormState};
pub use import::{ImportError, ImportStep, ImportWizard, PollOutcome};
pub use list::{FetchPlan, FetchRequest, FetchResponse, ListScreen, StalePolicy, execute};
pub use mutation::{Mutation, MutationOutcome, confirm_delete, submit_form};
pub use notify::{Level, Notification, Notifier};
pub use store::{Action, AppStore, StoreHandle, UserChannelListener};
pub use types::{ListResponse, ListResult, Row};
pub use upload::{ChunkPlan, UploadError, upload_chunked};
pub use view::{CardAccumulator, SentinelGuard, ViewMode, ViewSwitch};
