use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

/// Paces a periodic capture loop.
///
/// Injectable so snapshot cadence can be driven manually in tests instead of
/// depending on the wall clock.
pub trait Ticker: Send {
    /// Block until the next tick. Returns false when the loop should stop.
    fn wait(&mut self) -> bool;
}

/// Wall-clock ticker: one tick per interval, interruptible by a stop signal.
pub struct IntervalTicker {
    interval: Duration,
    stop_rx: Receiver<()>,
}

impl IntervalTicker {
    pub fn new(interval: Duration, stop_rx: Receiver<()>) -> Self {
        Self { interval, stop_rx }
    }
}

impl Ticker for IntervalTicker {
    fn wait(&mut self) -> bool {
        match self.stop_rx.recv_timeout(self.interval) {
            Err(RecvTimeoutError::Timeout) => true,
            // Stop signal or the controlling side went away.
            Ok(()) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }
}

/// Manually driven ticker: each received message is one tick; disconnecting
/// the sender stops the loop.
pub struct ManualTicker {
    ticks: Receiver<()>,
}

impl ManualTicker {
    pub fn new(ticks: Receiver<()>) -> Self {
        Self { ticks }
    }
}

impl Ticker for ManualTicker {
    fn wait(&mut self) -> bool {
        self.ticks.recv().is_ok()
    }
}
