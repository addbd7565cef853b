//! Persistence layer backed by ScyllaDB
//!
//! One store trait per entity, each with a Scylla implementation and a shared
//! in-memory implementation for tests and local runs. `StateStore` bundles
//! the stores the rest of the system works against.

pub mod answers;
pub mod calls;
pub mod client;
mod cql;
pub mod error;
pub mod history;
pub mod memory;
pub mod phone_numbers;
pub mod questions;
pub mod recordings;
pub mod schema;
pub mod settings_store;
pub mod transcriptions;

use std::sync::Arc;

pub use answers::{AnswerStore, ScyllaAnswerStore};
pub use calls::{CallStore, ScyllaCallStore};
pub use client::{ScyllaClient, ScyllaConfig};
pub use error::PersistenceError;
pub use history::{CallDetail, CallHistoryEntry, NumberDetail, TranscriptionSummary};
pub use memory::MemoryStateStore;
pub use phone_numbers::{PhoneNumberStore, ScyllaPhoneNumberStore};
pub use questions::{QuestionStore, ScyllaQuestionStore};
pub use recordings::{RecordingStore, ScyllaRecordingStore};
pub use settings_store::{ScyllaSettingsStore, SettingsStore, REDIRECT_NUMBER};
pub use transcriptions::{ScyllaTranscriptionStore, TranscriptionStore};

/// Bundle of all entity stores.
///
/// Cheap to clone; every handler and worker holds one.
#[derive(Clone)]
pub struct StateStore {
    pub phone_numbers: Arc<dyn PhoneNumberStore>,
    pub calls: Arc<dyn CallStore>,
    pub recordings: Arc<dyn RecordingStore>,
    pub transcriptions: Arc<dyn TranscriptionStore>,
    pub questions: Arc<dyn QuestionStore>,
    pub answers: Arc<dyn AnswerStore>,
    pub settings: Arc<dyn SettingsStore>,
}

impl StateStore {
    /// Connect to ScyllaDB, ensure the schema and build the store bundle.
    pub async fn scylla(config: ScyllaConfig) -> Result<Self, PersistenceError> {
        let client = ScyllaClient::connect(config).await?;
        client.ensure_schema().await?;

        Ok(Self {
            phone_numbers: Arc::new(ScyllaPhoneNumberStore::new(client.clone())),
            calls: Arc::new(ScyllaCallStore::new(client.clone())),
            recordings: Arc::new(ScyllaRecordingStore::new(client.clone())),
            transcriptions: Arc::new(ScyllaTranscriptionStore::new(client.clone())),
            questions: Arc::new(ScyllaQuestionStore::new(client.clone())),
            answers: Arc::new(ScyllaAnswerStore::new(client.clone())),
            settings: Arc::new(ScyllaSettingsStore::new(client)),
        })
    }

    /// A store bundle over a single shared in-memory state.
    pub fn in_memory() -> Self {
        let memory = MemoryStateStore::new();
        Self {
            phone_numbers: Arc::new(memory.clone()),
            calls: Arc::new(memory.clone()),
            recordings: Arc::new(memory.clone()),
            transcriptions: Arc::new(memory.clone()),
            questions: Arc::new(memory.clone()),
            answers: Arc::new(memory.clone()),
            settings: Arc::new(memory),
        }
    }
}
