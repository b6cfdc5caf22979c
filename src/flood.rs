//! Burst-then-sleep send loop.
//!
//! Time is cut into one-second windows. At the top of each window the loop
//! checks the stop flag and the job deadline, then emits the job's `rate`
//! packets back to back and sleeps for whatever is left of the window. When a
//! burst takes longer than a window the sleep is clamped to zero, so an
//! unachievable rate makes the job run past its nominal duration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use crate::constants::WINDOW;
use crate::error::FloodError;
use crate::factory::PacketFactory;
use crate::hextools::format_hexdump;
use crate::transport::Transport;
use crate::types::FloodJob;

/// Time source for the pacing loop.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Cooperative cancellation, observed between windows.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// The shared flag, e.g. for `signal_hook::flag::register`.
    pub fn as_atomic(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloodState {
    Idle,
    Running,
    Completed,
    Cancelled,
    Aborted,
}

/// Snapshot emitted after every window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub window: u64,
    pub packets_sent: u64,
    pub elapsed: Duration,
}

/// Result of a job that ran to its end without a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloodReport {
    /// `Completed` or `Cancelled`.
    pub state: FloodState,
    pub packets_sent: u64,
    pub windows: u64,
    pub elapsed: Duration,
}

pub struct FloodScheduler<C = SystemClock> {
    clock: C,
    stop: StopFlag,
    state: FloodState,
}

impl FloodScheduler<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for FloodScheduler<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> FloodScheduler<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            stop: StopFlag::new(),
            state: FloodState::Idle,
        }
    }

    pub fn with_stop_flag(mut self, stop: StopFlag) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_flag(&self) -> StopFlag {
        self.stop.clone()
    }

    pub fn state(&self) -> FloodState {
        self.state
    }

    /// Runs `job` to completion on the calling thread.
    ///
    /// The transport is acquired before the factory is prepared and is always
    /// released before returning once acquired. Setup failures leave the
    /// scheduler `Idle`.
    #[tracing::instrument(skip_all, fields(target = %job.target(), rate = job.rate(), duration = ?job.duration()))]
    pub fn launch<F, T>(
        &mut self,
        job: &FloodJob,
        factory: &mut F,
        transport: &mut T,
        mut progress: impl FnMut(Progress),
    ) -> Result<FloodReport, FloodError>
    where
        F: PacketFactory + ?Sized,
        T: Transport + ?Sized,
    {
        let target = job.target();

        transport.acquire()?;
        if let Err(e) = factory.prepare(&target) {
            transport.release();
            return Err(e.into());
        }

        self.state = FloodState::Running;
        info!("job running");

        let start = self.clock.now();
        let mut packets_sent: u64 = 0;
        let mut windows: u64 = 0;

        let state = loop {
            let elapsed = self.clock.now().duration_since(start);
            if self.stop.is_stopped() {
                info!(packets_sent, "stop requested");
                break FloodState::Cancelled;
            }
            if elapsed >= job.duration() {
                break FloodState::Completed;
            }

            let window_start = self.clock.now();
            for _ in 0..job.rate() {
                let packet = factory.next_packet(&target);
                if packets_sent == 0 {
                    trace!("first packet:\n{}", format_hexdump(packet.as_bytes()));
                }
                if let Err(source) = transport.send(&packet, &target) {
                    warn!(packets_sent, error = %source, "send failed, aborting");
                    transport.release();
                    self.state = FloodState::Aborted;
                    return Err(FloodError::Aborted {
                        packets_sent,
                        source,
                    });
                }
                packets_sent += 1;
            }
            windows += 1;

            let burst = self.clock.now().duration_since(window_start);
            let rest = WINDOW.saturating_sub(burst);
            if rest.is_zero() {
                debug!(window = windows, ?burst, "burst overran the window");
            } else {
                self.clock.sleep(rest);
            }

            let elapsed = self.clock.now().duration_since(start);
            debug!(window = windows, packets_sent, ?elapsed, "window done");
            progress(Progress {
                window: windows,
                packets_sent,
                elapsed,
            });
        };

        transport.release();
        self.state = state;
        let elapsed = self.clock.now().duration_since(start);
        info!(packets_sent, windows, ?elapsed, ?state, "job finished");

        Ok(FloodReport {
            state,
            packets_sent,
            windows,
            elapsed,
        })
    }
}
