//! Carrier webhook handlers
//!
//! The carrier posts form-encoded callbacks with PascalCase field names. The
//! voice and status webhooks always answer 200 so the carrier does not retry
//! what cannot be retried; the recording webhook answers 404 for calls this
//! system never tracked and 5xx when the synchronous pipeline portion fails,
//! which the carrier retries.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Form;
use serde::Deserialize;

use callscribe_core::{CallDirection, CallStatus};
use callscribe_persistence::settings_store::REDIRECT_NUMBER;
use callscribe_pipeline::{CallEvent, CallStatusEvent, RecordingEvent};

use crate::{markup, AppState, ServerError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VoiceWebhook {
    pub call_sid: String,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub direction: String,
    #[serde(default)]
    pub call_status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatusWebhook {
    pub call_sid: String,
    pub call_status: String,
    pub call_duration: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RecordingWebhook {
    pub call_sid: String,
    pub recording_sid: String,
    pub recording_url: String,
    #[serde(default)]
    pub recording_duration: i32,
    pub recording_status: Option<String>,
}

fn xml(body: String) -> Response {
    ([(header::CONTENT_TYPE, "application/xml")], body).into_response()
}

/// `POST /webhooks/voice` — a call has connected.
///
/// Tracks the call and, for inbound calls, answers with dial markup bridging
/// the caller to the stored redirect number.
pub async fn voice(State(state): State<AppState>, Form(form): Form<VoiceWebhook>) -> Response {
    let direction = CallDirection::from_carrier(&form.direction);
    let event = CallEvent {
        call_sid: form.call_sid.clone(),
        from: form.from.clone(),
        to: form.to.clone(),
        direction,
        status: CallStatus::from_carrier(&form.call_status),
    };

    if let Err(e) = state.pipeline.handle_call_event(event).await {
        tracing::error!(call_sid = %form.call_sid, error = %e, "Voice webhook processing failed");
    }

    if direction != CallDirection::Inbound {
        return xml(markup::reject());
    }

    let redirect = match state.store.settings.get(REDIRECT_NUMBER).await {
        Ok(stored) => stored.or_else(|| state.carrier.default_redirect_number.clone()),
        Err(e) => {
            tracing::error!(error = %e, "Redirect number lookup failed");
            state.carrier.default_redirect_number.clone()
        }
    };

    match redirect {
        Some(number) => xml(markup::dial(&number, &form.to)),
        None => {
            tracing::warn!(call_sid = %form.call_sid, "No redirect number configured, rejecting call");
            xml(markup::reject())
        }
    }
}

/// `POST /webhooks/status` — call lifecycle callback. Always 200.
pub async fn status(State(state): State<AppState>, Form(form): Form<StatusWebhook>) -> StatusCode {
    let event = CallStatusEvent {
        call_sid: form.call_sid.clone(),
        status: CallStatus::from_carrier(&form.call_status),
        duration_secs: form.call_duration,
    };

    if let Err(e) = state.pipeline.handle_status_event(event).await {
        tracing::warn!(call_sid = %form.call_sid, error = %e, "Status webhook ignored");
    }

    StatusCode::OK
}

/// `POST /webhooks/recording` — recording media is ready.
///
/// Runs the download/store/transcribe stages synchronously; analysis is
/// queued. 200 means the recording is durably stored and will not be
/// reprocessed on a duplicate callback.
pub async fn recording(
    State(state): State<AppState>,
    Form(form): Form<RecordingWebhook>,
) -> Result<StatusCode, ServerError> {
    if let Some(status) = form.recording_status.as_deref() {
        if status != "completed" {
            tracing::debug!(
                recording_sid = %form.recording_sid,
                status = %status,
                "Ignoring non-terminal recording callback"
            );
            return Ok(StatusCode::OK);
        }
    }

    state
        .pipeline
        .handle_recording_event(RecordingEvent {
            call_sid: form.call_sid,
            recording_sid: form.recording_sid,
            recording_url: form.recording_url,
            duration_secs: form.recording_duration,
        })
        .await?;

    Ok(StatusCode::OK)
}
