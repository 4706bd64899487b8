// src/heartbeat/buffer.rs
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// Content-free liveness signal. Only its occurrence matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat;

/// Single-slot hand-off between heartbeat producers and monitor probes.
///
/// The slot is one bit wide: depositing into a full slot drops the signal and
/// withdrawing empties it. Both transitions are a single compare-exchange, so
/// concurrent depositors never both win and a deposited signal satisfies at
/// most one withdrawer.
///
/// Blocking withdrawers park on a [`Notify`] and re-check the slot when woken.
/// A wake-up is only a hint; the signal itself is always taken from the slot.
#[derive(Debug, Default)]
pub struct HeartbeatBuffer {
    pending: AtomicBool,
    available: Notify,
}

impl HeartbeatBuffer {
    pub fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
            available: Notify::new(),
        }
    }

    /// Places a signal into the slot without waiting.
    ///
    /// Returns `false` when a signal was already pending; the new one is dropped.
    pub fn try_deposit(&self) -> bool {
        let accepted = self
            .pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();

        if accepted {
            self.available.notify_one();
        }

        accepted
    }

    /// Takes the pending signal if there is one. Never waits.
    pub fn try_withdraw(&self) -> bool {
        self.pending
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Takes a signal, waiting for a depositor if the slot is empty.
    ///
    /// There is no internal deadline; callers that need one wrap this future.
    /// Dropping the future before it resolves leaves the slot untouched.
    pub async fn withdraw_blocking(&self) -> Heartbeat {
        loop {
            let notified = self.available.notified();
            tokio::pin!(notified);
            // Register as a waiter before looking at the slot, otherwise a
            // deposit landing between the check and the await is missed.
            notified.as_mut().enable();

            if self.try_withdraw() {
                return Heartbeat;
            }

            notified.await;
        }
    }

    /// Whether a signal is waiting to be withdrawn. Racy by nature, for diagnostics only.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}
