// Tick scheduling and timing control
//
// Decouples logical updates (fixed rate, with catch-up) from render
// passes (gated, no catch-up). The scheduler consumes wall-clock deltas
// and decides what work the current sample owes; it never runs the work
// itself, so the `Game` stays the single owner of scene state.

use std::time::Duration;

use log::trace;

/// One logical update owed by the current sample.
///
/// `elapsed` is always the exact tick period when the tick rate is
/// limited, regardless of how the real frame delivery stuttered. That
/// determinism is what makes gameplay reproducible independent of the
/// achieved frame rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickStep {
    /// Tick number, wrapping at the tick rate
    pub number: u64,
    /// Logical duration of this update
    pub elapsed: Duration,
}

/// Work owed for one real-time sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramePlan {
    /// Logical updates to run, in order
    pub ticks: Vec<TickStep>,
    /// Whether a render pass is due
    pub render: bool,
}

/// Fixed-timestep scheduler state.
///
/// Rates of 0 mean unlimited: one logical update per sample consuming
/// the entire accumulator, and a render pass on every sample.
#[derive(Debug)]
pub struct Scheduler {
    /// Logical updates per second (0 = unlimited)
    tick_rate: u32,

    /// Render passes per second (0 = unlimited)
    frame_rate: u32,

    /// Accumulated time not yet applied to logical updates
    tick_accumulator: Duration,

    /// Accumulated time since the last render pass
    render_accumulator: Duration,

    /// Next tick number to hand out; wraps at `tick_rate` when limited
    tick_counter: u64,

    /// Total updates scheduled
    update_count: u64,

    /// Total render passes scheduled
    render_count: u64,
}

impl Scheduler {
    pub fn new(tick_rate: u32, frame_rate: u32) -> Self {
        Self {
            tick_rate,
            frame_rate,
            tick_accumulator: Duration::ZERO,
            render_accumulator: Duration::ZERO,
            tick_counter: 0,
            update_count: 0,
            render_count: 0,
        }
    }

    /// Logical tick period, or `None` when the tick rate is unlimited
    pub fn tick_period(&self) -> Option<Duration> {
        (self.tick_rate > 0).then(|| Duration::from_secs(1) / self.tick_rate)
    }

    /// Render period, or `None` when the frame rate is unlimited
    pub fn render_period(&self) -> Option<Duration> {
        (self.frame_rate > 0).then(|| Duration::from_secs(1) / self.frame_rate)
    }

    /// Consume one wall-clock delta and return the work it owes.
    ///
    /// Multiple logical updates may be owed for a single sample: the
    /// catch-up loop keeps the number of updates per unit wall-clock
    /// time as close as possible to the tick rate even when frame
    /// delivery stutters. Renders never catch up - a render brings the
    /// scene fully up to date, so queued "missed" renders would be
    /// pointless - and the render accumulator is hard-reset to zero
    /// whenever a render is scheduled.
    pub fn advance(&mut self, wall_delta: Duration) -> FramePlan {
        self.tick_accumulator += wall_delta;
        self.render_accumulator += wall_delta;

        let mut ticks = Vec::new();

        match self.tick_period() {
            Some(period) => {
                while self.tick_accumulator >= period {
                    self.tick_accumulator -= period;
                    ticks.push(TickStep {
                        number: self.next_tick_number(),
                        elapsed: period,
                    });
                }
            }
            None => {
                // Unlimited: one update per sample, consuming everything
                let elapsed = self.tick_accumulator;
                self.tick_accumulator = Duration::ZERO;
                ticks.push(TickStep {
                    number: self.next_tick_number(),
                    elapsed,
                });
            }
        }

        self.update_count += ticks.len() as u64;

        let render = match self.render_period() {
            Some(period) => {
                if self.render_accumulator >= period {
                    self.render_accumulator = Duration::ZERO;
                    true
                } else {
                    false
                }
            }
            None => {
                self.render_accumulator = Duration::ZERO;
                true
            }
        };

        if render {
            self.render_count += 1;
        }

        trace!(
            "scheduled {} update(s), render: {}, {}us left in tick accumulator",
            ticks.len(),
            render,
            self.tick_accumulator.as_micros()
        );

        FramePlan { ticks, render }
    }

    fn next_tick_number(&mut self) -> u64 {
        let number = self.tick_counter;
        self.tick_counter += 1;
        if self.tick_rate > 0 {
            self.tick_counter %= self.tick_rate as u64;
        }
        number
    }

    /// Time accumulated towards the next logical update
    pub fn tick_accumulator(&self) -> Duration {
        self.tick_accumulator
    }

    /// Time accumulated towards the next render pass
    pub fn render_accumulator(&self) -> Duration {
        self.render_accumulator
    }

    /// Total logical updates scheduled so far
    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    /// Total render passes scheduled so far
    pub fn render_count(&self) -> u64 {
        self.render_count
    }
}
