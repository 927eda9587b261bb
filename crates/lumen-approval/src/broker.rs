//! Confirmation broker.
//!
//! Holds outstanding confirmation requests keyed by their opaque ID. A run
//! registers a request and then waits; an independent responder resolves it
//! through [`ConfirmationBroker::respond`]. Whichever side removes the pending
//! entry first (the responder or the deadline) owns the resolution, so every
//! request is resolved exactly once.

use lumen_core::{ConfirmationId, RunId};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::request::{
    ConfirmationOutcome, ConfirmationRequest, ConfirmationResponse, ConfirmationResult,
};

/// Default deadline for a confirmation (120 seconds).
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);

struct PendingEntry {
    request: ConfirmationRequest,
    sender: oneshot::Sender<ConfirmationResult>,
}

/// Registry of outstanding confirmation requests.
pub struct ConfirmationBroker {
    pending: Mutex<HashMap<ConfirmationId, PendingEntry>>,
    timeout: Duration,
}

/// Handle returned by [`ConfirmationBroker::register`], consumed by
/// [`ConfirmationBroker::wait`].
#[must_use = "a registered confirmation must be awaited"]
pub struct PendingConfirmation {
    id: ConfirmationId,
    receiver: oneshot::Receiver<ConfirmationResult>,
}

impl PendingConfirmation {
    /// ID of the registered request.
    #[must_use]
    pub fn id(&self) -> &ConfirmationId {
        &self.id
    }
}

/// Removes the pending entry if the waiting future is dropped mid-wait.
struct Deregister<'a> {
    broker: &'a ConfirmationBroker,
    id: &'a ConfirmationId,
}

impl Drop for Deregister<'_> {
    fn drop(&mut self) {
        self.broker.deregister(self.id);
    }
}

impl ConfirmationBroker {
    /// Create a broker with the default 120 second deadline.
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_CONFIRMATION_TIMEOUT)
    }

    /// Create a broker with a custom deadline.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    /// The deadline applied to every request.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ConfirmationId, PendingEntry>> {
        self.pending.lock().unwrap_or_else(|e| {
            warn!("ConfirmationBroker lock poisoned, recovering");
            e.into_inner()
        })
    }

    fn deregister(&self, id: &ConfirmationId) -> Option<PendingEntry> {
        self.lock().remove(id)
    }

    /// Register a request so responses can find it.
    ///
    /// Announce the request to observers only after registering it, so a fast
    /// responder cannot miss it.
    pub fn register(&self, request: ConfirmationRequest) -> PendingConfirmation {
        let (sender, receiver) = oneshot::channel();
        let id = request.id.clone();
        debug!(
            confirm_id = %id,
            run_id = %request.run_id,
            tool = %request.tool_name,
            "Registering confirmation request"
        );
        self.lock().insert(id.clone(), PendingEntry { request, sender });
        PendingConfirmation { id, receiver }
    }

    /// Wait for a response or the deadline, whichever comes first.
    pub async fn wait(&self, pending: PendingConfirmation) -> ConfirmationOutcome {
        let PendingConfirmation { id, mut receiver } = pending;
        let _guard = Deregister {
            broker: self,
            id: &id,
        };

        match tokio::time::timeout(self.timeout, &mut receiver).await {
            Ok(Ok(result)) => ConfirmationOutcome::from(result),
            Ok(Err(_)) => {
                warn!(confirm_id = %id, "Confirmation channel closed without a response");
                ConfirmationOutcome::TimedOut
            },
            Err(_) => {
                if self.deregister(&id).is_some() {
                    info!(
                        confirm_id = %id,
                        timeout_secs = self.timeout.as_secs(),
                        "Confirmation timed out"
                    );
                    return ConfirmationOutcome::TimedOut;
                }
                // A responder removed the entry first; its result is in flight.
                match receiver.await {
                    Ok(result) => ConfirmationOutcome::from(result),
                    Err(_) => ConfirmationOutcome::TimedOut,
                }
            },
        }
    }

    /// Register and wait in one step.
    pub async fn request(&self, request: ConfirmationRequest) -> ConfirmationOutcome {
        let pending = self.register(request);
        self.wait(pending).await
    }

    /// Resolve a pending request.
    ///
    /// Returns `false` if no request with that ID is pending (unknown,
    /// already answered, or timed out).
    pub fn respond(&self, response: &ConfirmationResponse) -> bool {
        let Some(entry) = self.deregister(&response.confirm_id) else {
            warn!(confirm_id = %response.confirm_id, "Response for unknown confirmation");
            return false;
        };
        info!(
            confirm_id = %response.confirm_id,
            tool = %entry.request.tool_name,
            approved = response.approved,
            "Confirmation answered"
        );
        entry.sender.send(response.result()).is_ok()
    }

    /// Snapshot of all pending requests.
    #[must_use]
    pub fn pending(&self) -> Vec<ConfirmationRequest> {
        let mut requests: Vec<_> = self.lock().values().map(|e| e.request.clone()).collect();
        requests.sort_by_key(|r| r.created_at);
        requests
    }

    /// Pending requests belonging to one run.
    #[must_use]
    pub fn pending_for_run(&self, run_id: &RunId) -> Vec<ConfirmationRequest> {
        self.pending()
            .into_iter()
            .filter(|r| &r.run_id == run_id)
            .collect()
    }

    /// Whether a request is still pending.
    #[must_use]
    pub fn is_pending(&self, id: &ConfirmationId) -> bool {
        self.lock().contains_key(id)
    }

    /// Number of pending requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ConfirmationBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConfirmationBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfirmationBroker")
            .field("pending", &self.len())
            .field("timeout", &self.timeout)
            .finish()
    }
}
