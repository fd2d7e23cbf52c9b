use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::store::AlertStore;

/// Installs the global Prometheus recorder. The handle renders `/metrics`.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

pub async fn init_metrics(alerts: &dyn AlertStore) {
    // A failed count only leaves the gauge at zero.
    let alert_count = alerts.count_alerts().await.unwrap_or(0);
    metrics::gauge!("careconnect_sos_alerts_total").set(alert_count as f64);

    tracing::info!("Initialized metrics: SOS alerts={}", alert_count);
}

pub fn increment_sos_alerts() {
    metrics::counter!("careconnect_sos_alerts_triggered_total").increment(1);
    metrics::gauge!("careconnect_sos_alerts_total").increment(1.0);
}

pub fn decrement_sos_alerts() {
    metrics::gauge!("careconnect_sos_alerts_total").decrement(1.0);
}

pub fn increment_status_changes(status: &str) {
    metrics::counter!("careconnect_alert_status_changes_total", "status" => status.to_string())
        .increment(1);
}

pub fn increment_notifications_sent(channel: &str) {
    metrics::counter!("careconnect_notifications_sent_total", "channel" => channel.to_string())
        .increment(1);
}

pub fn increment_notifications_failed(channel: &str) {
    metrics::counter!("careconnect_notifications_failed_total", "channel" => channel.to_string())
        .increment(1);
}

pub fn record_fan_out_duration(seconds: f64) {
    metrics::histogram!("careconnect_fan_out_duration_seconds").record(seconds);
}

pub fn increment_http_requests(status: u16) {
    metrics::counter!("careconnect_http_requests_total", "status" => status.to_string())
        .increment(1);
}
