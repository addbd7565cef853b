//! Pipeline orchestration over carrier webhook events

use std::sync::Arc;

use chrono::Utc;
use metrics::counter;

use callscribe_analysis::AnalysisQueue;
use callscribe_core::{Call, Recording, Transcription};
use callscribe_persistence::{PersistenceError, StateStore};
use callscribe_storage::ObjectStore;
use callscribe_transcription::Transcriber;

use crate::download::RecordingFetcher;
use crate::events::{CallEvent, CallStatusEvent, RecordingEvent};
use crate::PipelineError;

/// Drives a recording from carrier callback to analyzed transcription.
#[derive(Clone)]
pub struct Pipeline {
    store: StateStore,
    objects: Arc<dyn ObjectStore>,
    transcriber: Arc<dyn Transcriber>,
    fetcher: Arc<dyn RecordingFetcher>,
    analysis: AnalysisQueue,
    key_prefix: String,
}

impl Pipeline {
    pub fn new(
        store: StateStore,
        objects: Arc<dyn ObjectStore>,
        transcriber: Arc<dyn Transcriber>,
        fetcher: Arc<dyn RecordingFetcher>,
        analysis: AnalysisQueue,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            store,
            objects,
            transcriber,
            fetcher,
            analysis,
            key_prefix: key_prefix.into(),
        }
    }

    /// First callback for a call: track the number and create the call row.
    ///
    /// Duplicate delivery is absorbed; the number's call count increments
    /// only when the call row is actually created.
    pub async fn handle_call_event(&self, event: CallEvent) -> Result<(), PipelineError> {
        let mut call = Call::new(&event.call_sid, event.remote_number(), event.direction);
        call.status = event.status;

        let created = self.store.calls.create_if_absent(&call).await?;
        if !created {
            tracing::debug!(call_sid = %event.call_sid, "Duplicate call event ignored");
            return Ok(());
        }

        self.store
            .phone_numbers
            .touch(event.remote_number(), call.start_time)
            .await?;

        counter!("calls_tracked_total").increment(1);
        tracing::info!(
            call_sid = %event.call_sid,
            number = %event.remote_number(),
            direction = %event.direction,
            "Call tracked"
        );
        Ok(())
    }

    /// Status callback: advance the call's lifecycle.
    pub async fn handle_status_event(&self, event: CallStatusEvent) -> Result<(), PipelineError> {
        let end_time = event.status.is_terminal().then(Utc::now);

        self.store
            .calls
            .update_status(&event.call_sid, event.status, event.duration_secs, end_time)
            .await
            .map_err(|e| match e {
                PersistenceError::CallNotFound(sid) => PipelineError::UnknownCall(sid),
                other => other.into(),
            })?;

        tracing::info!(call_sid = %event.call_sid, status = %event.status, "Call status updated");
        Ok(())
    }

    /// Recording callback: download, store, transcribe, queue analysis.
    ///
    /// The recording row is only created after the audio is durably uploaded;
    /// an upload failure halts here and the carrier's retry starts over. A
    /// speech-to-text failure still creates the transcription row, FAILED, so
    /// the outcome is visible.
    pub async fn handle_recording_event(&self, event: RecordingEvent) -> Result<(), PipelineError> {
        if self.store.calls.get(&event.call_sid).await?.is_none() {
            return Err(PipelineError::UnknownCall(event.call_sid));
        }

        if self.store.recordings.get_by_call(&event.call_sid).await?.is_some() {
            counter!("recordings_duplicate_total").increment(1);
            tracing::info!(
                call_sid = %event.call_sid,
                recording_sid = %event.recording_sid,
                "Recording already processed, ignoring duplicate callback"
            );
            return Ok(());
        }

        // Carrier media URLs take a format extension
        let media_url = format!("{}.mp3", event.recording_url);
        let audio = self.fetcher.fetch(&media_url).await?;
        let file_size = audio.as_file().metadata()?.len() as i64;

        let key = format!("{}/{}.mp3", self.key_prefix, event.recording_sid);
        let file_url = self.objects.put(&key, audio.path(), "audio/mpeg").await?;

        let recording = Recording::new(
            &event.call_sid,
            &event.recording_sid,
            file_url,
            file_size,
            event.duration_secs,
        );
        let created = self.store.recordings.create_if_absent(&recording).await?;
        if !created {
            // Lost a race with a concurrent duplicate callback
            tracing::info!(call_sid = %event.call_sid, "Recording created concurrently, ignoring");
            return Ok(());
        }

        self.store
            .calls
            .set_duration(&event.call_sid, event.duration_secs)
            .await?;

        let transcription = match self.transcriber.transcribe(audio.path()).await {
            Ok(text) => Transcription::pending(recording.id, &event.call_sid, text),
            Err(e) => {
                counter!("transcriptions_failed_total").increment(1);
                tracing::error!(
                    call_sid = %event.call_sid,
                    recording_sid = %event.recording_sid,
                    error = %e,
                    "Transcription failed"
                );
                Transcription::failed(recording.id, &event.call_sid)
            }
        };

        self.store.transcriptions.create(&transcription).await?;
        self.store
            .recordings
            .set_transcription_id(&event.call_sid, transcription.id)
            .await?;

        if transcription.status == callscribe_core::TranscriptionStatus::Pending {
            if let Err(e) = self.analysis.enqueue(transcription.id) {
                tracing::warn!(
                    transcription_id = %transcription.id,
                    error = %e,
                    "Could not queue analysis"
                );
            }
        }

        counter!("recordings_processed_total").increment(1);
        tracing::info!(
            call_sid = %event.call_sid,
            recording_sid = %event.recording_sid,
            bytes = file_size,
            transcription_id = %transcription.id,
            "Recording processed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use callscribe_analysis::{QuestionEngine, ScriptedAnswerModel};
    use callscribe_core::{CallDirection, CallStatus, TranscriptionStatus};
    use callscribe_storage::{ByteRange, FetchedObject, MemoryObjectStore, StorageError};
    use callscribe_transcription::ScriptedTranscriber;
    use parking_lot::Mutex;
    use std::io::Write as _;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    struct ScriptedFetcher {
        body: Vec<u8>,
        calls: Mutex<usize>,
    }

    impl ScriptedFetcher {
        fn new(body: &[u8]) -> Self {
            Self {
                body: body.to_vec(),
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl RecordingFetcher for ScriptedFetcher {
        async fn fetch(&self, _url: &str) -> Result<NamedTempFile, PipelineError> {
            *self.calls.lock() += 1;
            let mut file = NamedTempFile::new()?;
            file.as_file_mut().write_all(&self.body)?;
            Ok(file)
        }
    }

    struct FailingObjectStore;

    #[async_trait]
    impl ObjectStore for FailingObjectStore {
        async fn put(&self, key: &str, _path: &Path, _ct: &str) -> Result<String, StorageError> {
            Err(StorageError::UnexpectedStatus {
                status: 503,
                key: key.to_string(),
            })
        }

        async fn get(&self, key: &str, _r: Option<ByteRange>) -> Result<FetchedObject, StorageError> {
            Err(StorageError::NotFound(key.to_string()))
        }
    }

    struct Setup {
        store: StateStore,
        objects: Arc<MemoryObjectStore>,
        fetcher: Arc<ScriptedFetcher>,
        pipeline: Pipeline,
    }

    fn setup(transcriber: ScriptedTranscriber) -> Setup {
        let store = StateStore::in_memory();
        let objects = Arc::new(MemoryObjectStore::new());
        let fetcher = Arc::new(ScriptedFetcher::new(b"mp3 audio bytes"));
        let engine = QuestionEngine::new(store.clone(), Arc::new(ScriptedAnswerModel::always("answered")));
        let (queue, _worker) = AnalysisQueue::start(engine, 8);

        let pipeline = Pipeline::new(
            store.clone(),
            objects.clone(),
            Arc::new(transcriber),
            fetcher.clone(),
            queue,
            "recordings",
        );

        Setup { store, objects, fetcher, pipeline }
    }

    fn recording_event() -> RecordingEvent {
        RecordingEvent {
            call_sid: "CA1".to_string(),
            recording_sid: "RE1".to_string(),
            recording_url: "https://carrier.example.com/media/RE1".to_string(),
            duration_secs: 42,
        }
    }

    async fn track_call(pipeline: &Pipeline) {
        pipeline
            .handle_call_event(CallEvent {
                call_sid: "CA1".to_string(),
                from: "+15550000001".to_string(),
                to: "+15551234567".to_string(),
                direction: CallDirection::Outbound,
                status: CallStatus::Initiated,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_recording_event_end_to_end() {
        let s = setup(ScriptedTranscriber::always("We agreed on $50 per month."));
        track_call(&s.pipeline).await;
        s.store.questions.create("What price was quoted?").await.unwrap();

        s.pipeline.handle_recording_event(recording_event()).await.unwrap();

        let recording = s.store.recordings.get_by_call("CA1").await.unwrap().unwrap();
        assert_eq!(recording.recording_sid, "RE1");
        assert!(recording.file_size > 0);
        assert!(s.objects.contains("recordings/RE1.mp3"));

        let call = s.store.calls.get("CA1").await.unwrap().unwrap();
        assert_eq!(call.duration_secs, Some(42));

        // The analysis worker finishes asynchronously
        let transcription_id = recording.transcription_id.unwrap();
        let mut status = TranscriptionStatus::Pending;
        for _ in 0..50 {
            status = s.store.transcriptions.get(transcription_id).await.unwrap().unwrap().status;
            if status != TranscriptionStatus::Pending {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(status, TranscriptionStatus::Completed);

        let answers = s.store.answers.list_for_transcription(transcription_id).await.unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].answer, "answered");
    }

    #[tokio::test]
    async fn test_duplicate_recording_callback_downloads_once() {
        let s = setup(ScriptedTranscriber::always("hello"));
        track_call(&s.pipeline).await;

        s.pipeline.handle_recording_event(recording_event()).await.unwrap();
        s.pipeline.handle_recording_event(recording_event()).await.unwrap();

        assert_eq!(*s.fetcher.calls.lock(), 1);
    }

    #[tokio::test]
    async fn test_recording_for_unknown_call_is_rejected() {
        let s = setup(ScriptedTranscriber::always("hello"));

        let err = s.pipeline.handle_recording_event(recording_event()).await.unwrap_err();
        assert!(matches!(err, PipelineError::UnknownCall(_)));
        assert!(s.store.recordings.get_by_call("CA1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upload_failure_halts_without_recording_row() {
        let store = StateStore::in_memory();
        let fetcher = Arc::new(ScriptedFetcher::new(b"mp3 audio bytes"));
        let engine = QuestionEngine::new(store.clone(), Arc::new(ScriptedAnswerModel::always("x")));
        let (queue, _worker) = AnalysisQueue::start(engine, 8);
        let pipeline = Pipeline::new(
            store.clone(),
            Arc::new(FailingObjectStore),
            Arc::new(ScriptedTranscriber::always("hello")),
            fetcher,
            queue,
            "recordings",
        );
        track_call(&pipeline).await;

        let err = pipeline.handle_recording_event(recording_event()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Storage(_)));
        assert!(store.recordings.get_by_call("CA1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_transcription_failure_is_recorded_as_failed() {
        let s = setup(ScriptedTranscriber::failing("model overloaded"));
        track_call(&s.pipeline).await;

        s.pipeline.handle_recording_event(recording_event()).await.unwrap();

        let recording = s.store.recordings.get_by_call("CA1").await.unwrap().unwrap();
        let transcription = s
            .store
            .transcriptions
            .get(recording.transcription_id.unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(transcription.status, TranscriptionStatus::Failed);
        assert!(transcription.text.is_empty());
    }

    #[tokio::test]
    async fn test_call_event_is_idempotent() {
        let s = setup(ScriptedTranscriber::always("hello"));
        track_call(&s.pipeline).await;
        track_call(&s.pipeline).await;

        let number = s.store.phone_numbers.get("+15551234567").await.unwrap().unwrap();
        assert_eq!(number.call_count, 1);
    }

    #[tokio::test]
    async fn test_status_event_sets_terminal_state() {
        let s = setup(ScriptedTranscriber::always("hello"));
        track_call(&s.pipeline).await;

        s.pipeline
            .handle_status_event(CallStatusEvent {
                call_sid: "CA1".to_string(),
                status: CallStatus::Completed,
                duration_secs: Some(61),
            })
            .await
            .unwrap();

        let call = s.store.calls.get("CA1").await.unwrap().unwrap();
        assert_eq!(call.status, CallStatus::Completed);
        assert_eq!(call.duration_secs, Some(61));
        assert!(call.end_time.is_some());
    }

    #[tokio::test]
    async fn test_status_event_for_unknown_call() {
        let s = setup(ScriptedTranscriber::always("hello"));
        let err = s
            .pipeline
            .handle_status_event(CallStatusEvent {
                call_sid: "CA404".to_string(),
                status: CallStatus::Ringing,
                duration_secs: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::UnknownCall(_)));
    }
}
