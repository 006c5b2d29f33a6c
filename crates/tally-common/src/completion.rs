//! Write-once completion signal for asynchronous operations
//!
//! A [`CompletionToken`] starts out pending and transitions exactly once to
//! succeeded or failed. Clones share the same underlying state, so the
//! producer keeps one handle and hands the other to the caller.
//!
//! Waiting is supported three ways:
//! - callbacks registered with [`CompletionToken::when_complete`]
//! - blocking with [`CompletionToken::join`] (condition variable)
//! - async with [`CompletionToken::wait`] (oneshot bridge)

use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

/// Point-in-time state of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Pending,
    Succeeded,
    Failed,
}

/// Terminal state delivered to callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Failed,
}

impl Outcome {
    pub fn is_success(self) -> bool {
        matches!(self, Outcome::Succeeded)
    }
}

impl From<Outcome> for TokenState {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Succeeded => TokenState::Succeeded,
            Outcome::Failed => TokenState::Failed,
        }
    }
}

type Callback = Box<dyn FnOnce(Outcome) + Send + 'static>;

struct Slot {
    state: TokenState,
    callbacks: Vec<Callback>,
}

struct Inner {
    slot: Mutex<Slot>,
    completed: Condvar,
}

/// Shared, single-assignment success/failure signal
#[derive(Clone)]
pub struct CompletionToken {
    inner: Arc<Inner>,
}

impl CompletionToken {
    /// Create a pending token
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                slot: Mutex::new(Slot {
                    state: TokenState::Pending,
                    callbacks: Vec::new(),
                }),
                completed: Condvar::new(),
            }),
        }
    }

    /// Create an already-succeeded token
    pub fn succeeded() -> Self {
        let token = Self::new();
        token.succeed();
        token
    }

    /// Create an already-failed token
    pub fn failed() -> Self {
        let token = Self::new();
        token.fail();
        token
    }

    /// Combine tokens into one that succeeds once all of them succeeded.
    ///
    /// The combined token fails as soon as every input is terminal and at
    /// least one failed. An empty input succeeds immediately.
    pub fn of_all<I>(tokens: I) -> Self
    where
        I: IntoIterator<Item = CompletionToken>,
    {
        let tokens: Vec<CompletionToken> = tokens.into_iter().collect();
        let combined = Self::new();
        if tokens.is_empty() {
            combined.succeed();
            return combined;
        }

        let remaining = Arc::new(AtomicUsize::new(tokens.len()));
        let any_failed = Arc::new(AtomicBool::new(false));

        for token in &tokens {
            let remaining = remaining.clone();
            let any_failed = any_failed.clone();
            let combined = combined.clone();
            token.when_complete(move |outcome| {
                if !outcome.is_success() {
                    any_failed.store(true, Ordering::Release);
                }
                if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                    if any_failed.load(Ordering::Acquire) {
                        combined.fail();
                    } else {
                        combined.succeed();
                    }
                }
            });
        }

        combined
    }

    /// Mark as succeeded. Returns `false` if the token was already terminal.
    pub fn succeed(&self) -> bool {
        self.complete(Outcome::Succeeded)
    }

    /// Mark as failed. Returns `false` if the token was already terminal.
    pub fn fail(&self) -> bool {
        self.complete(Outcome::Failed)
    }

    fn complete(&self, outcome: Outcome) -> bool {
        let callbacks = {
            let mut slot = self.inner.slot.lock();
            if slot.state != TokenState::Pending {
                return false;
            }
            slot.state = outcome.into();
            std::mem::take(&mut slot.callbacks)
        };

        self.inner.completed.notify_all();
        // Callbacks run outside the lock so they may touch this token again
        for callback in callbacks {
            callback(outcome);
        }
        true
    }

    /// Current state without blocking
    pub fn state(&self) -> TokenState {
        self.inner.slot.lock().state
    }

    pub fn is_done(&self) -> bool {
        self.state() != TokenState::Pending
    }

    pub fn is_success(&self) -> bool {
        self.state() == TokenState::Succeeded
    }

    /// Run `callback` once with the terminal outcome.
    ///
    /// Runs on the calling thread right away if the token is already
    /// terminal, otherwise on whichever thread completes the token.
    pub fn when_complete<F>(&self, callback: F) -> &Self
    where
        F: FnOnce(Outcome) + Send + 'static,
    {
        let outcome = {
            let mut slot = self.inner.slot.lock();
            match slot.state {
                TokenState::Pending => {
                    slot.callbacks.push(Box::new(callback));
                    return self;
                }
                TokenState::Succeeded => Outcome::Succeeded,
                TokenState::Failed => Outcome::Failed,
            }
        };
        callback(outcome);
        self
    }

    /// Block until terminal or until `timeout` elapses.
    ///
    /// Returns the state at that point, which is still `Pending` on timeout.
    /// Timing out does not cancel the underlying operation.
    pub fn join(&self, timeout: Duration) -> TokenState {
        let mut slot = self.inner.slot.lock();
        match Instant::now().checked_add(timeout) {
            Some(deadline) => {
                while slot.state == TokenState::Pending {
                    if self
                        .inner
                        .completed
                        .wait_until(&mut slot, deadline)
                        .timed_out()
                    {
                        break;
                    }
                }
            }
            None => {
                while slot.state == TokenState::Pending {
                    self.inner.completed.wait(&mut slot);
                }
            }
        }
        slot.state
    }

    /// Wait asynchronously for the terminal outcome
    pub async fn wait(&self) -> Outcome {
        let (tx, rx) = oneshot::channel();
        self.when_complete(move |outcome| {
            let _ = tx.send(outcome);
        });
        rx.await.unwrap_or(Outcome::Failed)
    }
}

impl Default for CompletionToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CompletionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionToken")
            .field("state", &self.state())
            .finish()
    }
}
