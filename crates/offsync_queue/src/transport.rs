//! Transport and connectivity abstractions.

use crate::action::SyncAction;
use crate::error::{QueueError, QueueResult};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// The injected network call that delivers one mutation.
///
/// Implementations own everything about the wire (endpoints,
/// serialization, auth). The queue only sees success bytes or an error,
/// and honors `timeout` by passing it through to the implementation.
pub trait SyncTransport: Send + Sync {
    /// Delivers one mutation, returning the remote response bytes.
    fn call(&self, action: &SyncAction, timeout: Duration) -> QueueResult<Vec<u8>>;
}

/// Host-reported connectivity signal.
pub trait Connectivity: Send + Sync {
    /// Returns true if the host believes the network is reachable.
    fn is_connected(&self) -> bool;
}

/// A connectivity flag the host toggles from its network callbacks.
#[derive(Debug)]
pub struct SharedConnectivity {
    connected: AtomicBool,
}

impl SharedConnectivity {
    /// Creates the flag with an initial state.
    pub fn new(connected: bool) -> Self {
        Self {
            connected: AtomicBool::new(connected),
        }
    }

    /// Updates the flag.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }
}

impl Connectivity for SharedConnectivity {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// Scripted outcome for one mock call.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    /// The call succeeds with these response bytes.
    Success(Vec<u8>),
    /// The call fails.
    Failure {
        /// Error message.
        message: String,
        /// Whether the failure counts as retryable.
        retryable: bool,
    },
}

impl MockOutcome {
    fn into_result(self) -> QueueResult<Vec<u8>> {
        match self {
            MockOutcome::Success(bytes) => Ok(bytes),
            MockOutcome::Failure { message, retryable } => {
                Err(QueueError::Transport { message, retryable })
            }
        }
    }
}

/// A mock transport for testing.
///
/// Outcomes can be scripted per mutation kind; calls with no script
/// fall back to the default outcome. Every call is logged.
#[derive(Debug)]
pub struct MockTransport {
    scripted: Mutex<HashMap<&'static str, VecDeque<MockOutcome>>>,
    default_outcome: Mutex<MockOutcome>,
    calls: Mutex<Vec<SyncAction>>,
}

impl MockTransport {
    /// Creates a transport where every call succeeds with empty bytes.
    pub fn new() -> Self {
        Self {
            scripted: Mutex::new(HashMap::new()),
            default_outcome: Mutex::new(MockOutcome::Success(Vec::new())),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Creates a transport where every call fails with a retryable error.
    pub fn always_failing(message: impl Into<String>) -> Self {
        let transport = Self::new();
        transport.set_default(MockOutcome::Failure {
            message: message.into(),
            retryable: true,
        });
        transport
    }

    /// Sets the outcome for calls with no remaining script.
    pub fn set_default(&self, outcome: MockOutcome) {
        *self.default_outcome.lock() = outcome;
    }

    /// Scripts the next outcome for one mutation kind; repeated calls
    /// enqueue further outcomes in order.
    pub fn script(&self, kind: &'static str, outcome: MockOutcome) {
        self.scripted.lock().entry(kind).or_default().push_back(outcome);
    }

    /// Returns a copy of every action passed to `call`.
    pub fn calls(&self) -> Vec<SyncAction> {
        self.calls.lock().clone()
    }

    /// Returns how many calls were made.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncTransport for MockTransport {
    fn call(&self, action: &SyncAction, _timeout: Duration) -> QueueResult<Vec<u8>> {
        self.calls.lock().push(action.clone());

        let scripted = self
            .scripted
            .lock()
            .get_mut(action.kind())
            .and_then(VecDeque::pop_front);
        match scripted {
            Some(outcome) => outcome.into_result(),
            None => self.default_outcome.lock().clone().into_result(),
        }
    }
}
