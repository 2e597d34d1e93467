//! Auth attempt log.

use crate::storage::AuthLogStore;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Appends one `auth_logs` row per issuance attempt without blocking the
/// response.
#[derive(Clone)]
pub struct AuthLogWriter {
    store: Arc<dyn AuthLogStore>,
}

impl AuthLogWriter {
    /// Create a writer over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn AuthLogStore>) -> Self {
        Self { store }
    }

    /// Queue a log row. Failures are logged and dropped.
    ///
    /// The returned handle may be awaited by callers that need the row to
    /// be visible, tests mostly.
    pub fn record(&self, request_ip: impl Into<String>, user_id: Option<i64>) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let request_ip = request_ip.into();

        tokio::spawn(async move {
            match store.append_auth_log(&request_ip, user_id).await {
                Ok(id) => debug!(id, request_ip = %request_ip, ?user_id, "Auth attempt logged"),
                Err(e) => warn!(error = %e, request_ip = %request_ip, "Failed to write auth log"),
            }
        })
    }
}
