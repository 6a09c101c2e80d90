//! Metrics collection for tenant-service.
//!
//! Lifecycle outcomes and per back-end role operations, rendered in the
//! Prometheus text format.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the Prometheus recorder. Later calls are no-ops.
pub fn init_metrics() {
    if METRICS_HANDLE.get().is_some() {
        return;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = METRICS_HANDLE.set(handle);
        }
        Err(e) => tracing::warn!("Failed to install Prometheus recorder: {}", e),
    }
}

/// Get metrics output in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

fn status_label(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "failure"
    }
}

/// Record the outcome of a tenant create or delete.
pub fn record_lifecycle(operation: &'static str, success: bool) {
    metrics::counter!(
        "tenant_lifecycle_total",
        "operation" => operation,
        "status" => status_label(success)
    )
    .increment(1);
}

/// Record one role apply or delete against one back-end.
pub fn record_role_operation(backend: &str, operation: &'static str, success: bool) {
    metrics::counter!(
        "tenant_role_operations_total",
        "backend" => backend.to_string(),
        "operation" => operation,
        "status" => status_label(success)
    )
    .increment(1);
}
