//! Lease manager collaborator.
//!
//! A lease wraps an issued secret with an id and a TTL. Enrollment only
//! creates leases; the TTL is set by the caller after creation.

use crate::errors::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// A leased secret.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lease {
    pub lease_id: String,
    /// Kind of secret behind the lease, e.g. `certificate`
    pub secret_type: String,
    /// Time to live; may be negative for already-expired secrets
    #[serde(rename = "lease_duration", serialize_with = "serialize_seconds")]
    pub ttl: TimeDelta,
    pub renewable: bool,
    pub issued_at: DateTime<Utc>,
    /// Data kept with the lease for later revocation, never returned to callers
    #[serde(skip)]
    pub internal_data: Value,
}

impl Lease {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.issued_at + self.ttl
    }
}

fn serialize_seconds<S: Serializer>(ttl: &TimeDelta, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_i64(ttl.num_seconds())
}

#[async_trait]
pub trait LeaseManager: Send + Sync + std::fmt::Debug {
    /// Create a lease for a secret issued under `role`.
    async fn create_lease(&self, role: &str, secret_type: &str, internal_data: Value)
        -> Result<Lease>;

    /// Record the final state of a lease after its TTL has been set.
    async fn commit(&self, lease: &Lease) -> Result<()>;
}

/// Keeps leases in process memory. Lease ids are `<mount>/issue/<role>/<uuid>`.
///
/// Expired leases are dropped whenever a new lease is committed.
#[derive(Debug, Clone)]
pub struct LocalLeaseManager {
    mount: String,
    leases: Arc<DashMap<String, Lease>>,
}

impl LocalLeaseManager {
    pub fn new(mount: impl Into<String>) -> Self {
        Self { mount: mount.into().trim_matches('/').to_string(), leases: Arc::default() }
    }

    pub fn lookup(&self, lease_id: &str) -> Option<Lease> {
        self.leases.get(lease_id).map(|lease| lease.clone())
    }

    pub fn revoke(&self, lease_id: &str) -> Option<Lease> {
        self.leases.remove(lease_id).map(|(_, lease)| lease)
    }

    pub fn active(&self) -> usize {
        self.leases.len()
    }

    /// Drop leases whose TTL ran out before `now`. Returns how many were removed.
    pub fn prune_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.leases.len();
        self.leases.retain(|_, lease| lease.expires_at() >= now);
        let pruned = before.saturating_sub(self.leases.len());
        if pruned > 0 {
            debug!(pruned, "Pruned expired leases");
        }
        pruned
    }
}

#[async_trait]
impl LeaseManager for LocalLeaseManager {
    async fn create_lease(
        &self,
        role: &str,
        secret_type: &str,
        internal_data: Value,
    ) -> Result<Lease> {
        let lease = Lease {
            lease_id: format!("{}/issue/{}/{}", self.mount, role, Uuid::new_v4()),
            secret_type: secret_type.to_string(),
            ttl: TimeDelta::zero(),
            renewable: false,
            issued_at: Utc::now(),
            internal_data,
        };
        debug!(lease_id = %lease.lease_id, "Created lease");
        Ok(lease)
    }

    async fn commit(&self, lease: &Lease) -> Result<()> {
        self.prune_expired(Utc::now());
        self.leases.insert(lease.lease_id.clone(), lease.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_lease_id_format() {
        let manager = LocalLeaseManager::new("/pki/");
        let lease = manager
            .create_lease("web", "certificate", json!({"serial_number": "01:02"}))
            .await
            .unwrap();
        assert!(lease.lease_id.starts_with("pki/issue/web/"));
        let uuid = lease.lease_id.rsplit('/').next().unwrap();
        assert!(Uuid::parse_str(uuid).is_ok());
        assert_eq!(lease.internal_data["serial_number"], "01:02");
    }

    #[tokio::test]
    async fn test_commit_lookup_revoke() {
        let manager = LocalLeaseManager::new("pki");
        let mut lease = manager.create_lease("web", "certificate", json!({})).await.unwrap();
        lease.ttl = TimeDelta::hours(1);
        manager.commit(&lease).await.unwrap();

        assert_eq!(manager.lookup(&lease.lease_id).unwrap().ttl, TimeDelta::hours(1));
        assert_eq!(manager.active(), 1);
        assert!(manager.revoke(&lease.lease_id).is_some());
        assert!(manager.lookup(&lease.lease_id).is_none());
    }

    #[tokio::test]
    async fn test_commit_prunes_expired_leases() {
        let manager = LocalLeaseManager::new("pki");

        let mut expired = manager.create_lease("web", "certificate", json!({})).await.unwrap();
        expired.ttl = TimeDelta::seconds(-60);
        manager.commit(&expired).await.unwrap();
        assert_eq!(manager.active(), 1);

        let mut live = manager.create_lease("web", "certificate", json!({})).await.unwrap();
        live.ttl = TimeDelta::days(30);
        manager.commit(&live).await.unwrap();

        assert!(manager.lookup(&expired.lease_id).is_none());
        assert!(manager.lookup(&live.lease_id).is_some());
        assert_eq!(manager.active(), 1);
        assert_eq!(manager.prune_expired(Utc::now() + TimeDelta::days(31)), 1);
        assert_eq!(manager.active(), 0);
    }

    #[test]
    fn test_lease_serialization_hides_internal_data() {
        let lease = Lease {
            lease_id: "pki/issue/web/x".into(),
            secret_type: "certificate".into(),
            ttl: TimeDelta::seconds(-30),
            renewable: false,
            issued_at: Utc::now(),
            internal_data: json!({"serial_number": "01"}),
        };
        let value = serde_json::to_value(&lease).unwrap();
        assert_eq!(value["lease_duration"], -30);
        assert!(value.get("internal_data").is_none());
    }
}
