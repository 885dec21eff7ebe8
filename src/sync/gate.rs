use std::future::Future;
use std::sync::Arc;

use log::debug;
use tokio::sync::Mutex;

#[derive(Default)]
struct GateState {
    running: bool,
    queued: bool,
}

/// Single-flight coalescing for reconciliation passes: at most one pass
/// runs and at most one follow-up is queued behind it. A trigger arriving
/// while a pass is in flight marks the follow-up and returns immediately;
/// the in-flight runner re-runs once before going idle, so the remote
/// mirror always converges on the latest local state without a pile-up of
/// redundant passes.
#[derive(Clone, Default)]
pub struct SyncGate {
    state: Arc<Mutex<GateState>>,
}

impl SyncGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a pass through the gate. Returns the outcome of the last pass
    /// executed by this caller, or `None` when the trigger was coalesced
    /// into a pass already in flight.
    pub async fn run<T, F, Fut>(&self, mut pass: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = T>,
    {
        {
            let mut state = self.state.lock().await;
            if state.running {
                state.queued = true;
                debug!("sync already in flight, queued a follow-up pass");
                return None;
            }
            state.running = true;
        }

        loop {
            let result = pass().await;
            let mut state = self.state.lock().await;
            if state.queued {
                state.queued = false;
                debug!("running queued follow-up sync pass");
            } else {
                state.running = false;
                return Some(result);
            }
        }
    }
}
