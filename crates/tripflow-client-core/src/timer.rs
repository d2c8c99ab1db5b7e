//! Send-code trigger and its cooldown countdown.
//!
//! The countdown runs as its own tokio task. Each start bumps an epoch held
//! under the same lock the task publishes through, so a tick from a cancelled
//! countdown can never reach the trigger state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

pub const DEFAULT_COOLDOWN_SECS: u32 = 60;
pub const SEND_CODE_PROMPT: &str = "Send code";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerConfig {
    pub cooldown_secs: u32,
    pub tick: Duration,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: DEFAULT_COOLDOWN_SECS,
            tick: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    Idle,
    Cooldown { remaining: u32 },
}

/// What the send-code button shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeTrigger {
    pub phase: TimerPhase,
    pub enabled: bool,
    pub label: String,
}

impl CodeTrigger {
    #[must_use]
    pub fn idle() -> Self {
        Self {
            phase: TimerPhase::Idle,
            enabled: true,
            label: SEND_CODE_PROMPT.to_string(),
        }
    }

    #[must_use]
    pub fn cooling(remaining: u32) -> Self {
        Self {
            phase: TimerPhase::Cooldown { remaining },
            enabled: false,
            label: format!("Retry in {remaining}s"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownEpoch(u64);

struct TriggerSlot {
    epoch: u64,
    tx: watch::Sender<CodeTrigger>,
}

impl TriggerSlot {
    fn publish(&self, trigger: CodeTrigger) {
        self.tx.send_replace(trigger);
    }
}

struct CountdownHandle {
    epoch: CountdownEpoch,
    task: JoinHandle<()>,
}

impl Drop for CountdownHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub struct VerificationTimer {
    config: TimerConfig,
    slot: Arc<Mutex<TriggerSlot>>,
    rx: watch::Receiver<CodeTrigger>,
    handle: Option<CountdownHandle>,
}

impl VerificationTimer {
    #[must_use]
    pub fn new(config: TimerConfig) -> Self {
        let (tx, rx) = watch::channel(CodeTrigger::idle());
        Self {
            config,
            slot: Arc::new(Mutex::new(TriggerSlot { epoch: 0, tx })),
            rx,
            handle: None,
        }
    }

    #[must_use]
    pub fn trigger(&self) -> CodeTrigger {
        self.rx.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CodeTrigger> {
        self.rx.clone()
    }

    #[must_use]
    pub fn is_cooling_down(&self) -> bool {
        matches!(self.rx.borrow().phase, TimerPhase::Cooldown { .. })
    }

    /// Disables the trigger and starts a fresh countdown, cancelling any live one.
    ///
    /// A zero-length cooldown leaves the trigger enabled. Must be called from
    /// within a tokio runtime.
    pub fn start(&mut self) -> CountdownEpoch {
        let cooldown = self.config.cooldown_secs;
        let tick = self.config.tick;
        let epoch = {
            let mut slot = lock_slot(&self.slot);
            slot.epoch += 1;
            if cooldown == 0 {
                slot.publish(CodeTrigger::idle());
            } else {
                slot.publish(CodeTrigger::cooling(cooldown));
            }
            slot.epoch
        };

        if cooldown == 0 {
            self.handle = None;
            debug!(epoch, "verification cooldown disabled");
            return CountdownEpoch(epoch);
        }

        let slot = Arc::clone(&self.slot);
        let task = tokio::spawn(async move {
            let mut remaining = cooldown;
            while remaining > 0 {
                tokio::time::sleep(tick).await;
                let slot = lock_slot(&slot);
                if slot.epoch != epoch {
                    return;
                }
                remaining -= 1;
                if remaining == 0 {
                    slot.publish(CodeTrigger::idle());
                } else {
                    slot.publish(CodeTrigger::cooling(remaining));
                }
            }
        });

        // Dropping the previous handle aborts its task; the epoch bump above
        // already silenced it.
        self.handle = Some(CountdownHandle {
            epoch: CountdownEpoch(epoch),
            task,
        });
        debug!(epoch, cooldown, "verification countdown started");
        CountdownEpoch(epoch)
    }

    /// Cancels the countdown identified by `epoch` and re-enables the trigger.
    ///
    /// Returns `false` when that countdown already finished or was replaced.
    pub fn cancel(&mut self, epoch: CountdownEpoch) -> bool {
        if self.handle.as_ref().map(|handle| handle.epoch) != Some(epoch) {
            return false;
        }
        self.handle = None;

        let mut slot = lock_slot(&self.slot);
        if slot.epoch != epoch.0 {
            return false;
        }
        let was_cooling = matches!(slot.tx.borrow().phase, TimerPhase::Cooldown { .. });
        slot.epoch += 1;
        slot.publish(CodeTrigger::idle());
        drop(slot);

        if was_cooling {
            debug!(epoch = epoch.0, "verification countdown cancelled");
        }
        was_cooling
    }

    /// Stops any countdown and restores the initial trigger.
    pub fn reset(&mut self) {
        let mut slot = lock_slot(&self.slot);
        slot.epoch += 1;
        slot.publish(CodeTrigger::idle());
        drop(slot);
        self.handle = None;
    }
}

impl Default for VerificationTimer {
    fn default() -> Self {
        Self::new(TimerConfig::default())
    }
}

impl std::fmt::Debug for VerificationTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationTimer")
            .field("config", &self.config)
            .field("trigger", &*self.rx.borrow())
            .finish_non_exhaustive()
    }
}

fn lock_slot(slot: &Mutex<TriggerSlot>) -> MutexGuard<'_, TriggerSlot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}
