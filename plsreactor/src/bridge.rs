use std::time::Duration;

use tokio::{
    sync::mpsc::{self, error::TrySendError},
    time::Instant,
};
use tracing::{debug, trace, warn};

/// Backing service entry point driven by the bridge.
pub trait EventProcessor {
    type Notification;

    /// Processes pending work, appending state notifications to `out`.
    ///
    /// Returns the delay before the next call; `Duration::ZERO` asks to be
    /// called again immediately.
    fn process_events(&mut self, out: &mut Vec<Self::Notification>) -> Duration;
}

/// Cross-thread "events are pending" signal.
///
/// Level-triggered and payload-free: notifications sent while one is
/// already queued coalesce.
#[derive(Debug, Clone)]
pub struct WakeSignal {
    tx: mpsc::Sender<()>,
}

impl WakeSignal {
    /// Returns `false` once the bridge is gone.
    pub fn notify(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => true,
            Err(TrySendError::Closed(())) => false,
        }
    }
}

/// Why [`EventLoopBridge::wait`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    Signal,
    Timer,
    /// Every [`WakeSignal`] was dropped. Reported once; later waits only
    /// follow the timer.
    Closed,
}

/// Couples the wake signal and the processing timer of one reactor.
pub struct EventLoopBridge {
    wake_rx: mpsc::Receiver<()>,
    deadline: Option<Instant>,
    max_drain_rounds: usize,
    signal_closed: bool,
}

impl EventLoopBridge {
    pub fn new(max_drain_rounds: usize) -> (Self, WakeSignal) {
        let (tx, wake_rx) = mpsc::channel(1);
        let bridge = Self {
            wake_rx,
            deadline: None,
            max_drain_rounds: max_drain_rounds.max(1),
            signal_closed: false,
        };
        (bridge, WakeSignal { tx })
    }

    /// Deadline of the armed timer, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Drains the processor until it reports a non-zero delay, then arms the
    /// timer with that delay.
    ///
    /// When `max_drain_rounds` calls all asked for more, the timer is armed
    /// at zero so the reactor handles its other inputs before resuming.
    pub fn drain<P: EventProcessor>(
        &mut self,
        processor: &mut P,
        out: &mut Vec<P::Notification>,
    ) -> Duration {
        self.deadline = None;
        // Les signaux déjà en file sont couverts par ce drainage
        while let Ok(()) = self.wake_rx.try_recv() {}

        let mut rounds = 0;
        let delay = loop {
            let delay = processor.process_events(out);
            rounds += 1;
            if !delay.is_zero() {
                break delay;
            }
            if rounds >= self.max_drain_rounds {
                warn!(rounds, "event processing still busy, yielding");
                break Duration::ZERO;
            }
        };

        trace!(rounds, ?delay, notifications = out.len(), "events drained");
        self.deadline = Some(Instant::now() + delay);
        delay
    }

    /// Waits for the wake signal or the armed timer.
    ///
    /// Cancel-safe: it can be raced against other branches of a
    /// `tokio::select!`.
    pub async fn wait(&mut self) -> Wake {
        if self.signal_closed {
            return match self.deadline {
                Some(deadline) => {
                    tokio::time::sleep_until(deadline).await;
                    self.deadline = None;
                    Wake::Timer
                }
                None => std::future::pending().await,
            };
        }

        let received = match self.deadline {
            Some(deadline) => tokio::select! {
                received = self.wake_rx.recv() => received,
                _ = tokio::time::sleep_until(deadline) => {
                    self.deadline = None;
                    return Wake::Timer;
                }
            },
            None => self.wake_rx.recv().await,
        };

        match received {
            Some(()) => Wake::Signal,
            None => {
                debug!("wake signal closed");
                self.signal_closed = true;
                Wake::Closed
            }
        }
    }
}
