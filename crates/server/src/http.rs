//! Router and REST API handlers

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use callscribe_core::{MoveDirection, PhoneNumberStatus};
use callscribe_persistence::settings_store::REDIRECT_NUMBER;
use callscribe_storage::{content_range, ByteRange};

use crate::{webhooks, AppState, ServerError};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/webhooks/voice", post(webhooks::voice))
        .route("/webhooks/status", post(webhooks::status))
        .route("/webhooks/recording", post(webhooks::recording))
        .route("/api/calls", get(list_calls))
        .route("/api/numbers", get(list_numbers))
        .route("/api/numbers/:number", patch(patch_number))
        .route("/api/numbers/:number/calls", get(number_calls))
        .route("/api/recordings/:recording_sid/audio", get(recording_audio))
        .route("/api/transcriptions/:id/reprocess", post(reprocess))
        .route("/api/questions", get(list_questions).post(create_question))
        .route("/api/questions/:id", axum::routing::delete(delete_question))
        .route("/api/questions/:id/move", post(move_question))
        .route("/api/redirect-number", get(get_redirect_number).put(put_redirect_number))
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Deserialize)]
struct HistoryQuery {
    limit: Option<i32>,
}

async fn list_calls(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, ServerError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let history = state.store.call_history(limit).await?;
    Ok(Json(history))
}

async fn list_numbers(State(state): State<AppState>) -> Result<impl IntoResponse, ServerError> {
    Ok(Json(state.store.phone_numbers.list().await?))
}

#[derive(Deserialize)]
struct NumberPatch {
    status: PhoneNumberStatus,
}

async fn patch_number(
    State(state): State<AppState>,
    Path(number): Path<String>,
    Json(body): Json<NumberPatch>,
) -> Result<StatusCode, ServerError> {
    if state.store.phone_numbers.get(&number).await?.is_none() {
        return Err(ServerError::NotFound(format!("phone number {number}")));
    }
    state.store.phone_numbers.set_status(&number, body.status).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn number_calls(
    State(state): State<AppState>,
    Path(number): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
    let detail = state
        .store
        .number_detail(&number)
        .await?
        .ok_or_else(|| ServerError::NotFound(format!("phone number {number}")))?;
    Ok(Json(detail))
}

/// Streams recording audio with byte-range support, so browser audio players
/// can seek without downloading the whole file.
async fn recording_audio(
    State(state): State<AppState>,
    Path(recording_sid): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ServerError> {
    let recording = state
        .store
        .recordings
        .get_by_sid(&recording_sid)
        .await?
        .ok_or_else(|| ServerError::NotFound(format!("recording {recording_sid}")))?;

    let requested = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(ByteRange::parse);

    let key = format!("{}/{}.mp3", state.recording_key_prefix, recording.recording_sid);
    let fetched = state.objects.get(&key, requested).await?;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    response_headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("audio/mpeg"));
    if let Ok(length) = HeaderValue::from_str(&fetched.content_length.to_string()) {
        response_headers.insert(header::CONTENT_LENGTH, length);
    }

    let status = match fetched.range {
        Some((start, end)) => {
            let value = content_range(start, end, fetched.total_size);
            if let Ok(value) = HeaderValue::from_str(&value) {
                response_headers.insert(header::CONTENT_RANGE, value);
            }
            StatusCode::PARTIAL_CONTENT
        }
        None => StatusCode::OK,
    };

    Ok((status, response_headers, Body::from_stream(fetched.stream)).into_response())
}

async fn reprocess(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServerError> {
    if state.store.transcriptions.get(id).await?.is_none() {
        return Err(ServerError::NotFound(format!("transcription {id}")));
    }

    state.analysis.enqueue(id)?;
    tracing::info!(transcription_id = %id, "Reprocess queued");
    Ok((StatusCode::ACCEPTED, Json(json!({ "transcription_id": id, "queued": true }))))
}

async fn list_questions(State(state): State<AppState>) -> Result<impl IntoResponse, ServerError> {
    Ok(Json(state.store.questions.list_ordered().await?))
}

#[derive(Deserialize)]
struct QuestionBody {
    text: String,
}

async fn create_question(
    State(state): State<AppState>,
    Json(body): Json<QuestionBody>,
) -> Result<impl IntoResponse, ServerError> {
    let text = body.text.trim();
    if text.is_empty() {
        return Err(ServerError::BadRequest("question text must not be empty".to_string()));
    }
    let question = state.store.questions.create(text).await?;
    Ok((StatusCode::CREATED, Json(question)))
}

async fn delete_question(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.store.questions.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct MoveBody {
    direction: MoveDirection,
}

async fn move_question(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<MoveBody>,
) -> Result<impl IntoResponse, ServerError> {
    state.store.questions.move_question(id, body.direction).await?;
    Ok(Json(state.store.questions.list_ordered().await?))
}

async fn get_redirect_number(State(state): State<AppState>) -> Result<impl IntoResponse, ServerError> {
    let number = state
        .store
        .settings
        .get(REDIRECT_NUMBER)
        .await?
        .or_else(|| state.carrier.default_redirect_number.clone());
    Ok(Json(json!({ "redirect_number": number })))
}

#[derive(Deserialize)]
struct RedirectBody {
    redirect_number: String,
}

async fn put_redirect_number(
    State(state): State<AppState>,
    Json(body): Json<RedirectBody>,
) -> Result<impl IntoResponse, ServerError> {
    let number = body.redirect_number.trim();
    if number.is_empty() {
        return Err(ServerError::BadRequest("redirect number must not be empty".to_string()));
    }
    state.store.settings.set(REDIRECT_NUMBER, number).await?;
    Ok(Json(json!({ "redirect_number": number })))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn ready(State(state): State<AppState>) -> Result<impl IntoResponse, ServerError> {
    // A cheap store round trip proves the backend is reachable
    state.store.questions.list_ordered().await?;
    Ok(Json(json!({ "status": "ready" })))
}

async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    use callscribe_analysis::{AnalysisQueue, QuestionEngine, ScriptedAnswerModel};
    use callscribe_config::CarrierConfig;
    use callscribe_core::{Call, CallDirection, Recording};
    use callscribe_persistence::StateStore;
    use callscribe_pipeline::{HttpRecordingFetcher, Pipeline};
    use callscribe_storage::MemoryObjectStore;
    use callscribe_transcription::ScriptedTranscriber;

    fn test_state() -> (AppState, Arc<MemoryObjectStore>) {
        let store = StateStore::in_memory();
        let objects = Arc::new(MemoryObjectStore::new());
        let engine = QuestionEngine::new(store.clone(), Arc::new(ScriptedAnswerModel::always("x")));
        let (analysis, _worker) = AnalysisQueue::start(engine, 8);
        let fetcher =
            HttpRecordingFetcher::new("ACtest", "secret", Duration::from_secs(5)).unwrap();
        let pipeline = Pipeline::new(
            store.clone(),
            objects.clone(),
            Arc::new(ScriptedTranscriber::always("hello")),
            Arc::new(fetcher),
            analysis.clone(),
            "recordings",
        );

        let carrier = CarrierConfig {
            default_redirect_number: Some("+15559876543".to_string()),
            ..CarrierConfig::default()
        };

        let state = AppState {
            store,
            objects: objects.clone(),
            pipeline,
            analysis,
            carrier,
            recording_key_prefix: "recordings".to_string(),
            metrics: None,
        };
        (state, objects)
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
        (status, headers, body)
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (state, _) = test_state();
        let (status, _, body) = send(router(state), get_request("/health")).await;
        assert_eq!(status, StatusCode::OK);
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_question_crud_and_move() {
        let (state, _) = test_state();
        let app = router(state);

        for text in ["q0", "q1", "q2"] {
            let (status, _, _) = send(
                app.clone(),
                json_request("POST", "/api/questions", json!({ "text": text })),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (_, _, body) = send(app.clone(), get_request("/api/questions")).await;
        let questions: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(questions.as_array().unwrap().len(), 3);
        let q2_id = questions[2]["id"].as_str().unwrap().to_string();

        // Move the last question up
        let (status, _, body) = send(
            app.clone(),
            json_request("POST", &format!("/api/questions/{q2_id}/move"), json!({ "direction": "up" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let questions: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(questions[1]["text"], "q2");
        assert_eq!(questions[1]["display_order"], 1);

        // Delete it; survivors stay contiguous
        let (status, _, _) = send(
            app.clone(),
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/questions/{q2_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, _, body) = send(app, get_request("/api/questions")).await;
        let questions: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(questions.as_array().unwrap().len(), 2);
        assert_eq!(questions[0]["display_order"], 0);
        assert_eq!(questions[1]["display_order"], 1);
    }

    #[tokio::test]
    async fn test_create_question_rejects_blank_text() {
        let (state, _) = test_state();
        let (status, _, _) = send(
            router(state),
            json_request("POST", "/api/questions", json!({ "text": "   " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    async fn seed_recording(state: &AppState, objects: &MemoryObjectStore) {
        let call = Call::new("CA1", "+15551234567", CallDirection::Outbound);
        state.store.calls.create_if_absent(&call).await.unwrap();
        let recording = Recording::new("CA1", "RE1", "https://store/call-recordings/recordings/RE1.mp3", 1000, 30);
        state.store.recordings.create_if_absent(&recording).await.unwrap();
        objects.insert("recordings/RE1.mp3", vec![9u8; 1000]);
    }

    #[tokio::test]
    async fn test_audio_full_fetch() {
        let (state, objects) = test_state();
        seed_recording(&state, &objects).await;

        let (status, headers, body) = send(router(state), get_request("/api/recordings/RE1/audio")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::ACCEPT_RANGES], "bytes");
        assert_eq!(headers[header::CONTENT_TYPE], "audio/mpeg");
        assert_eq!(body.len(), 1000);
    }

    #[tokio::test]
    async fn test_audio_range_fetch() {
        let (state, objects) = test_state();
        seed_recording(&state, &objects).await;

        let request = Request::builder()
            .uri("/api/recordings/RE1/audio")
            .header(header::RANGE, "bytes=100-199")
            .body(Body::empty())
            .unwrap();
        let (status, headers, body) = send(router(state), request).await;

        assert_eq!(status, StatusCode::PARTIAL_CONTENT);
        assert_eq!(headers[header::CONTENT_RANGE], "bytes 100-199/1000");
        assert_eq!(headers[header::CONTENT_LENGTH], "100");
        assert_eq!(body.len(), 100);
    }

    #[tokio::test]
    async fn test_audio_unsatisfiable_range() {
        let (state, objects) = test_state();
        seed_recording(&state, &objects).await;

        let request = Request::builder()
            .uri("/api/recordings/RE1/audio")
            .header(header::RANGE, "bytes=5000-")
            .body(Body::empty())
            .unwrap();
        let (status, headers, _) = send(router(state), request).await;

        assert_eq!(status, StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(headers[header::CONTENT_RANGE], "bytes */1000");
    }

    #[tokio::test]
    async fn test_audio_unknown_recording() {
        let (state, _) = test_state();
        let (status, _, _) = send(router(state), get_request("/api/recordings/RE404/audio")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_reprocess_unknown_transcription() {
        let (state, _) = test_state();
        let uri = format!("/api/transcriptions/{}/reprocess", Uuid::new_v4());
        let (status, _, _) = send(
            router(state),
            Request::builder().method("POST").uri(uri).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_redirect_number_round_trip() {
        let (state, _) = test_state();
        let app = router(state);

        // Falls back to the carrier default before anything is stored
        let (_, _, body) = send(app.clone(), get_request("/api/redirect-number")).await;
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["redirect_number"], "+15559876543");

        let (status, _, _) = send(
            app.clone(),
            json_request("PUT", "/api/redirect-number", json!({ "redirect_number": "+15550001111" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, _, body) = send(app, get_request("/api/redirect-number")).await;
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["redirect_number"], "+15550001111");
    }

    #[tokio::test]
    async fn test_voice_webhook_answers_with_dial_markup() {
        let (state, _) = test_state();
        let request = Request::builder()
            .method("POST")
            .uri("/webhooks/voice")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(
                "CallSid=CA1&From=%2B15550000001&To=%2B15551230000&Direction=inbound&CallStatus=ringing",
            ))
            .unwrap();
        let (status, headers, body) = send(router(state.clone()), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "application/xml");
        let xml = String::from_utf8(body).unwrap();
        assert!(xml.contains(">+15559876543</Dial>"));

        // The call was tracked against the caller's number
        let call = state.store.calls.get("CA1").await.unwrap().unwrap();
        assert_eq!(call.phone_number, "+15550000001");
    }

    #[tokio::test]
    async fn test_recording_webhook_unknown_call_is_404() {
        let (state, _) = test_state();
        let request = Request::builder()
            .method("POST")
            .uri("/webhooks/recording")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(
                "CallSid=CA404&RecordingSid=RE1&RecordingUrl=https%3A%2F%2Fcarrier%2Fmedia%2FRE1&RecordingDuration=30&RecordingStatus=completed",
            ))
            .unwrap();
        let (status, _, _) = send(router(state), request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_patch_number_status() {
        let (state, _) = test_state();
        state
            .store
            .phone_numbers
            .touch("+15551234567", chrono::Utc::now())
            .await
            .unwrap();

        let (status, _, _) = send(
            router(state.clone()),
            json_request("PATCH", "/api/numbers/%2B15551234567", json!({ "status": "INACTIVE" })),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let number = state.store.phone_numbers.get("+15551234567").await.unwrap().unwrap();
        assert_eq!(number.status, callscribe_core::PhoneNumberStatus::Inactive);
    }

    #[tokio::test]
    async fn test_list_calls_empty() {
        let (state, _) = test_state();
        let (status, _, body) = send(router(state), get_request("/api/calls")).await;
        assert_eq!(status, StatusCode::OK);
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body.as_array().unwrap().len(), 0);
    }
}
