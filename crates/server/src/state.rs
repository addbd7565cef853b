//! Shared handler state

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use callscribe_analysis::AnalysisQueue;
use callscribe_config::settings::CarrierConfig;
use callscribe_persistence::StateStore;
use callscribe_pipeline::Pipeline;
use callscribe_storage::ObjectStore;

/// Everything the HTTP handlers need, cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub store: StateStore,
    pub objects: Arc<dyn ObjectStore>,
    pub pipeline: Pipeline,
    pub analysis: AnalysisQueue,
    pub carrier: CarrierConfig,
    /// Object-store key prefix recordings were uploaded under
    pub recording_key_prefix: String,
    /// Present when the Prometheus endpoint is enabled
    pub metrics: Option<PrometheusHandle>,
}
