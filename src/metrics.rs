use actix_web::HttpResponse;
use prometheus::{
    register_histogram, register_int_counter_vec, register_int_gauge_vec, Histogram, IntCounterVec, IntGaugeVec,
};

const TRANSFER_LABELS: &[&str] = &["source_chain", "target_chain", "asset", "transaction_id"];

// Defines Prometheus metrics for monitoring the bridge watcher
lazy_static::lazy_static! {
    // Counter for blocks covered by successfully processed log ranges, per watcher
    pub static ref BLOCKS_PROCESSED: IntCounterVec = register_int_counter_vec!(
        "bridgewatch_blocks_processed_total",
        "Total blocks processed by a router watcher",
        &["watcher"]
    ).expect("register bridgewatch_blocks_processed_total");

    // Counter for router logs received, per watcher
    pub static ref LOGS_PROCESSED: IntCounterVec = register_int_counter_vec!(
        "bridgewatch_logs_processed_total",
        "Total router logs received by a router watcher",
        &["watcher"]
    ).expect("register bridgewatch_logs_processed_total");

    // Counter for transfers pushed to the queue, per topic
    pub static ref TRANSFERS_DISPATCHED: IntCounterVec = register_int_counter_vec!(
        "bridgewatch_transfers_dispatched_total",
        "Total transfers pushed to the queue",
        &["topic"]
    ).expect("register bridgewatch_transfers_dispatched_total");

    // Histogram for measuring log range processing time in seconds
    pub static ref BATCH_PROCESS_TIME: Histogram = register_histogram!(
        "bridgewatch_batch_process_seconds",
        "Log range processing time in seconds"
    ).expect("register bridgewatch_batch_process_seconds");

    // Per-transfer gauge: 1 once validators reached signature majority
    pub static ref MAJORITY_REACHED: IntGaugeVec = register_int_gauge_vec!(
        "bridgewatch_majority_reached",
        "Signature majority reached for a transfer",
        TRANSFER_LABELS
    ).expect("register bridgewatch_majority_reached");

    // Per-transfer gauge: 1 once fees were transferred on the settlement chain
    pub static ref FEE_TRANSFERRED: IntGaugeVec = register_int_gauge_vec!(
        "bridgewatch_fee_transferred",
        "Fee transferred for a transfer",
        TRANSFER_LABELS
    ).expect("register bridgewatch_fee_transferred");

    // Per-transfer gauge: 1 once the receiver got the tokens on the target chain
    pub static ref USER_GET_HIS_TOKENS: IntGaugeVec = register_int_gauge_vec!(
        "bridgewatch_user_get_his_tokens",
        "Receiver got the bridged tokens",
        TRANSFER_LABELS
    ).expect("register bridgewatch_user_get_his_tokens");
}

// Label set identifying one transfer in the per-transfer gauges
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferLabels {
    pub source_chain: u64,
    pub target_chain: u64,
    pub asset: String,
    pub transaction_id: String,
}

impl TransferLabels {
    fn values(&self) -> [String; 4] {
        [
            self.source_chain.to_string(),
            self.target_chain.to_string(),
            self.asset.clone(),
            self.transaction_id.clone(),
        ]
    }
}

// Optional completion-tracking sink; never affects correctness
pub trait TransferMetrics: Send + Sync {
    fn is_monitoring_enabled(&self) -> bool;
    fn create_majority_reached_if_not_exists(&self, labels: &TransferLabels);
    fn create_fee_transferred_if_not_exists(&self, labels: &TransferLabels);
    fn create_user_get_his_tokens_if_not_exists(&self, labels: &TransferLabels);
    fn set_user_get_his_tokens(&self, labels: &TransferLabels);
}

// Sink backed by the process-wide Prometheus registry
pub struct PrometheusMetrics {
    enabled: bool,
}

impl PrometheusMetrics {
    pub fn new(enabled: bool) -> Self {
        PrometheusMetrics { enabled }
    }
}

impl TransferMetrics for PrometheusMetrics {
    fn is_monitoring_enabled(&self) -> bool {
        self.enabled
    }

    // `with_label_values` creates the series at 0 and keeps an existing value untouched
    fn create_majority_reached_if_not_exists(&self, labels: &TransferLabels) {
        let values = labels.values();
        MAJORITY_REACHED.with_label_values(&values.each_ref().map(String::as_str));
    }

    fn create_fee_transferred_if_not_exists(&self, labels: &TransferLabels) {
        let values = labels.values();
        FEE_TRANSFERRED.with_label_values(&values.each_ref().map(String::as_str));
    }

    fn create_user_get_his_tokens_if_not_exists(&self, labels: &TransferLabels) {
        let values = labels.values();
        USER_GET_HIS_TOKENS.with_label_values(&values.each_ref().map(String::as_str));
    }

    fn set_user_get_his_tokens(&self, labels: &TransferLabels) {
        let values = labels.values();
        USER_GET_HIS_TOKENS
            .with_label_values(&values.each_ref().map(String::as_str))
            .set(1);
    }
}

// Handles GET /metrics requests to expose Prometheus metrics
pub async fn metrics() -> HttpResponse {
    // Create a Prometheus text encoder for formatting metrics
    let encoder = prometheus::TextEncoder::new();

    // Gather all registered metric families
    let metric_families = prometheus::gather();

    // Encode the metrics to a text string, defaulting to empty if encoding fails
    let encoded = encoder.encode_to_string(&metric_families).unwrap_or_default();

    HttpResponse::Ok().content_type("text/plain; version=0.0.4").body(encoded)
}
