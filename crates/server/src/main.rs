//! Binary entry point

use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing_subscriber::EnvFilter;

use callscribe_analysis::{AnalysisQueue, AnswerModel, AnswerModelConfig, HttpAnswerModel, QuestionEngine};
use callscribe_config::{load_settings, ObservabilityConfig, ServerConfig, Settings};
use callscribe_persistence::{ScyllaConfig, StateStore};
use callscribe_pipeline::{HttpRecordingFetcher, Pipeline};
use callscribe_storage::{HttpObjectStore, HttpStorageConfig, MemoryObjectStore, ObjectStore};
use callscribe_transcription::{HttpTranscriber, Transcriber, TranscriberConfig};

use callscribe_server::{http, metrics, AppState};

fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    if config.log_json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origin = if config.cors_origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(
            config
                .cors_origins
                .iter()
                .filter_map(|o| o.parse::<HeaderValue>().ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn build_state(settings: &Settings) -> Result<AppState, Box<dyn std::error::Error>> {
    let store = if settings.database.in_memory {
        tracing::warn!("Using the in-memory state store; nothing will survive a restart");
        StateStore::in_memory()
    } else {
        StateStore::scylla(ScyllaConfig {
            hosts: settings.database.hosts.clone(),
            keyspace: settings.database.keyspace.clone(),
            replication_factor: settings.database.replication_factor,
        })
        .await?
    };

    let objects: Arc<dyn ObjectStore> = if settings.storage.in_memory {
        tracing::warn!("Using the in-memory object store; recordings will not persist");
        Arc::new(MemoryObjectStore::new())
    } else {
        Arc::new(HttpObjectStore::new(HttpStorageConfig {
            base_url: settings.storage.base_url.clone(),
            bucket: settings.storage.bucket.clone(),
            api_token: settings.storage.api_token.clone(),
            timeout: Duration::from_secs(settings.storage.timeout_secs),
        })?)
    };

    let transcriber: Arc<dyn Transcriber> = Arc::new(HttpTranscriber::new(TranscriberConfig {
        base_url: settings.transcription.base_url.clone(),
        api_key: settings.transcription.api_key.clone(),
        model: settings.transcription.model.clone(),
        timeout: Duration::from_secs(settings.transcription.timeout_secs),
    })?);

    let model: Arc<dyn AnswerModel> = Arc::new(HttpAnswerModel::new(AnswerModelConfig {
        base_url: settings.analysis.base_url.clone(),
        api_key: settings.analysis.api_key.clone(),
        model: settings.analysis.model.clone(),
        timeout: Duration::from_secs(settings.analysis.timeout_secs),
    })?);

    let engine = QuestionEngine::new(store.clone(), model);
    let (analysis, _worker) = AnalysisQueue::start(engine, settings.analysis.queue_depth);

    let fetcher = Arc::new(HttpRecordingFetcher::new(
        &settings.carrier.account_sid,
        &settings.carrier.auth_token,
        Duration::from_secs(settings.carrier.download_timeout_secs),
    )?);

    let pipeline = Pipeline::new(
        store.clone(),
        objects.clone(),
        transcriber,
        fetcher,
        analysis.clone(),
        settings.storage.key_prefix.clone(),
    );

    let metrics_handle = if settings.observability.metrics_enabled {
        Some(metrics::init_metrics()?)
    } else {
        None
    };

    Ok(AppState {
        store,
        objects,
        pipeline,
        analysis,
        carrier: settings.carrier.clone(),
        recording_key_prefix: settings.storage.key_prefix.clone(),
        metrics: metrics_handle,
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "Failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env = std::env::var("CALLSCRIBE_ENV").ok();
    let settings = load_settings(env.as_deref())?;
    init_tracing(&settings.observability);

    let state = build_state(&settings).await?;

    let mut app = http::router(state);
    if settings.server.cors_enabled {
        app = app.layer(cors_layer(&settings.server));
    }

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
