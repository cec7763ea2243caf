use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use etcd_client::{Client, Compare, CompareOp, LeaseGrantOptions, PutOptions, Txn, TxnOp};
use tokio::sync::Mutex;

use crate::error::TrackerError;
use crate::lock::LockBackend;
use crate::types::LeaderId;

/// etcd-backed lock using a lease for expiry and a create-revision
/// transaction for set-if-absent.
pub struct EtcdLockBackend {
    client: Arc<Mutex<Client>>,
    prefix: String,
    /// Lease attached to each key this process currently holds, revoked on
    /// release so the server drops it immediately instead of at expiry.
    leases: parking_lot::Mutex<HashMap<String, i64>>,
}

impl EtcdLockBackend {
    /// Create a new etcd lock backend.
    ///
    /// - `client`: Connected etcd client.
    /// - `prefix`: Key prefix for lock keys (e.g., "/livetrack/").
    pub fn new(client: Client, prefix: impl Into<String>) -> Self {
        Self {
            client: Arc::new(Mutex::new(client)),
            prefix: prefix.into(),
            leases: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    fn lock_key(&self, key: &str) -> String {
        format!("{}locks/{}", self.prefix, key)
    }

    /// etcd leases have whole-second granularity.
    fn lease_secs(ttl: Duration) -> i64 {
        let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
        i64::try_from(secs.max(1)).unwrap_or(i64::MAX)
    }

    fn map_err(e: etcd_client::Error) -> TrackerError {
        TrackerError::CoordinationError {
            reason: e.to_string(),
            source: Some(Box::new(e)),
        }
    }

    async fn revoke(&self, lease_id: i64) {
        let mut client = self.client.lock().await;
        if let Err(e) = client.lease_revoke(lease_id).await {
            tracing::debug!(lease_id, error = %e, "failed to revoke lock lease, it will expire via TTL");
        }
    }
}

#[async_trait]
impl LockBackend for EtcdLockBackend {
    async fn try_acquire(
        &self,
        key: &str,
        holder: &LeaderId,
        ttl: Duration,
    ) -> Result<bool, TrackerError> {
        let full_key = self.lock_key(key);

        let lease_id = {
            let mut client = self.client.lock().await;
            client
                .lease_grant(Self::lease_secs(ttl), None::<LeaseGrantOptions>)
                .await
                .map_err(Self::map_err)?
                .id()
        };

        // Create the key only if it does not exist; an expired key is gone
        // together with its lease.
        let txn = Txn::new()
            .when([Compare::create_revision(
                full_key.as_bytes(),
                CompareOp::Equal,
                0,
            )])
            .and_then([TxnOp::put(
                full_key.as_bytes(),
                holder.as_ref().as_bytes(),
                Some(PutOptions::new().with_lease(lease_id)),
            )]);

        let result = {
            let mut client = self.client.lock().await;
            client.txn(txn).await
        };

        match result {
            Ok(resp) if resp.succeeded() => {
                self.leases.lock().insert(key.to_string(), lease_id);
                Ok(true)
            }
            Ok(_) => {
                self.revoke(lease_id).await;
                Ok(false)
            }
            Err(e) => {
                self.revoke(lease_id).await;
                Err(Self::map_err(e))
            }
        }
    }

    async fn release(&self, key: &str) -> Result<(), TrackerError> {
        let full_key = self.lock_key(key);
        {
            let mut client = self.client.lock().await;
            client
                .delete(full_key.as_bytes(), None)
                .await
                .map_err(Self::map_err)?;
        }
        let lease_id = self.leases.lock().remove(key);
        if let Some(lease_id) = lease_id {
            self.revoke(lease_id).await;
        }
        Ok(())
    }
}
