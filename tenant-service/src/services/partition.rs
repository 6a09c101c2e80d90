//! Tenant-scoped data partition.

use super::outcome::{Outcome, ServiceError};
use async_trait::async_trait;
use mongodb::{bson::doc, Client};
use service_core::error::AppError;
use std::sync::atomic::{AtomicU64, Ordering};

#[async_trait]
pub trait DataPartition: Send + Sync {
    /// Drops everything stored under `tenant`.
    async fn purge(&self, tenant: &str) -> Outcome<()>;
    async fn health_check(&self) -> Outcome<()>;
}

/// MongoDB system databases; never dropped as tenant data.
const RESERVED_DATABASES: [&str; 3] = ["admin", "local", "config"];

pub fn is_reserved_database(name: &str) -> bool {
    RESERVED_DATABASES.contains(&name)
}

/// One MongoDB database per tenant, named after it.
#[derive(Clone)]
pub struct MongoPartition {
    client: Client,
}

impl MongoPartition {
    pub async fn connect(uri: &str) -> Result<Self, AppError> {
        let client = Client::with_uri_str(uri).await?;
        tracing::info!("Connected to MongoDB");
        Ok(Self { client })
    }
}

#[async_trait]
impl DataPartition for MongoPartition {
    async fn purge(&self, tenant: &str) -> Outcome<()> {
        if is_reserved_database(tenant) {
            tracing::warn!(tenant, "Refusing to drop reserved database");
            return Ok(());
        }
        tracing::info!(tenant, "Dropping tenant database");
        self.client.database(tenant).drop(None).await?;
        Ok(())
    }

    async fn health_check(&self) -> Outcome<()> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await?;
        Ok(())
    }
}

/// Partition that stores nothing; counts purge requests.
#[derive(Default)]
pub struct NoopPartition {
    purges: AtomicU64,
    fail: bool,
}

impl NoopPartition {
    pub fn new() -> Self {
        Self::default()
    }

    /// A partition whose purges always fail.
    pub fn failing() -> Self {
        Self {
            purges: AtomicU64::new(0),
            fail: true,
        }
    }

    pub fn purge_count(&self) -> u64 {
        self.purges.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataPartition for NoopPartition {
    async fn purge(&self, tenant: &str) -> Outcome<()> {
        self.purges.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ServiceError::message(format!(
                "purge of {} rejected",
                tenant
            )));
        }
        tracing::debug!(tenant, "[NOOP] Tenant data would be dropped");
        Ok(())
    }

    async fn health_check(&self) -> Outcome<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_databases_are_reserved() {
        for name in ["admin", "local", "config"] {
            assert!(is_reserved_database(name));
        }
        assert!(!is_reserved_database("4f1c-77"));
        assert!(!is_reserved_database("Admin"));
    }

    #[tokio::test]
    async fn test_reserved_database_is_never_dropped() {
        // The driver connects lazily; an unreachable host proves no command is sent.
        let partition = MongoPartition::connect("mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=100")
            .await
            .unwrap();

        for name in ["admin", "local", "config"] {
            partition.purge(name).await.unwrap();
        }
    }
}
