//! One-shot readiness gate for the native bridge.

use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq)]
enum GateState {
    Pending,
    Open,
    Failed(String),
}

/// Gate that all native access waits on.
///
/// The gate settles once: the first call to [`open`](Self::open) or
/// [`fail`](Self::fail) wins and later calls are ignored.
#[derive(Debug)]
pub struct ReadinessGate {
    state: watch::Sender<GateState>,
}

impl ReadinessGate {
    /// Create a gate that is still pending.
    pub fn new() -> Self {
        let (state, _) = watch::channel(GateState::Pending);
        Self { state }
    }

    /// Create a gate that is already open.
    pub fn opened() -> Self {
        let gate = Self::new();
        gate.open();
        gate
    }

    /// Open the gate, releasing all waiters.
    pub fn open(&self) {
        self.settle(GateState::Open);
    }

    /// Fail the gate, rejecting all waiters with `reason`.
    pub fn fail(&self, reason: impl Into<String>) {
        self.settle(GateState::Failed(reason.into()));
    }

    fn settle(&self, next: GateState) {
        self.state.send_if_modified(|state| {
            if *state == GateState::Pending {
                tracing::debug!(?next, "Readiness gate settled");
                *state = next;
                true
            } else {
                false
            }
        });
    }

    /// Whether the gate has opened.
    pub fn is_open(&self) -> bool {
        *self.state.borrow() == GateState::Open
    }

    /// Wait until the gate settles.
    pub async fn wait(&self) -> Result<(), String> {
        let mut rx = self.state.subscribe();
        let state = rx
            .wait_for(|state| *state != GateState::Pending)
            .await
            .map_err(|_| "readiness gate dropped".to_string())?;

        match &*state {
            GateState::Open => Ok(()),
            GateState::Failed(reason) => Err(reason.clone()),
            GateState::Pending => Err("readiness gate still pending".to_string()),
        }
    }
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}
