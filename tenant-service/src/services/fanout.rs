//! Spawn one task per (back-end, template) pair, await all, fold the outcomes.
//!
//! A failing pair never cancels its siblings; every pair runs to completion
//! before the report is produced.

use super::metrics::record_role_operation;
use super::outcome::{log_failure, Outcome, ServiceError};
use super::roles::RoleService;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleOperation {
    Apply,
    Delete,
}

impl RoleOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleOperation::Apply => "apply",
            RoleOperation::Delete => "delete",
        }
    }
}

/// One failed pair.
#[derive(Debug)]
pub struct PairFailure {
    pub backend: String,
    pub template: String,
    pub error: ServiceError,
}

#[derive(Debug)]
pub struct FanoutReport {
    pub tenant: String,
    pub operation: RoleOperation,
    pub total: usize,
    pub failures: Vec<PairFailure>,
}

impl FanoutReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// One aggregate failure when any pair failed. Individual failures are
    /// already logged and are not enumerated to the caller.
    pub fn into_outcome(self) -> Outcome<()> {
        if self.failures.is_empty() {
            return Ok(());
        }
        Err(ServiceError::message(format!(
            "{} of {} role {} operations failed for tenant {}",
            self.failures.len(),
            self.total,
            self.operation.as_str(),
            self.tenant
        )))
    }
}

/// Runs `call` for every pair of `backends` × `templates` concurrently.
pub async fn fan_out<F, Fut>(
    tenant: &str,
    operation: RoleOperation,
    backends: &[Arc<dyn RoleService>],
    templates: &[String],
    call: F,
) -> FanoutReport
where
    F: Fn(Arc<dyn RoleService>, String) -> Fut,
    Fut: Future<Output = Outcome<()>> + Send + 'static,
{
    let pairs: Vec<(Arc<dyn RoleService>, String)> = backends
        .iter()
        .flat_map(|backend| {
            templates
                .iter()
                .map(move |template| (Arc::clone(backend), template.clone()))
        })
        .collect();

    let mut join_set = JoinSet::new();
    for (idx, (backend, template)) in pairs.iter().cloned().enumerate() {
        let task = call(backend, template);
        join_set.spawn(async move { (idx, task.await) });
    }

    let mut slots: Vec<Option<Outcome<()>>> = pairs.iter().map(|_| None).collect();
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((idx, outcome)) => slots[idx] = Some(outcome),
            // The slot stays empty and is reported below.
            Err(e) => tracing::error!(tenant, error = %e, "Role operation task aborted"),
        }
    }

    let mut failures = Vec::new();
    for ((backend, template), slot) in pairs.iter().zip(slots) {
        let outcome = slot.unwrap_or_else(|| {
            Err(ServiceError::exception(anyhow::anyhow!(
                "role {} task did not complete",
                operation.as_str()
            )))
        });
        record_role_operation(backend.backend(), operation.as_str(), outcome.is_ok());

        if let Err(error) = outcome {
            let span = tracing::error_span!(
                "role_operation",
                tenant,
                backend = backend.backend(),
                template = template.as_str(),
                operation = operation.as_str(),
            );
            let _entered = span.enter();
            log_failure(&error, "Role operation failed");

            failures.push(PairFailure {
                backend: backend.backend().to_string(),
                template: template.clone(),
                error,
            });
        }
    }

    FanoutReport {
        tenant: tenant.to_string(),
        operation,
        total: pairs.len(),
        failures,
    }
}
