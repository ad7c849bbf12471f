//! Value types shared by the timer registry and its subscribers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default tick interval for new timers.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(1000);

/// Direction a timer counts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimerMode {
    /// Counts down to zero and completes.
    #[default]
    Countdown,
    /// Counts up forever.
    Elapsed,
}

/// Lifecycle state of a timer.
///
/// Transitions are `Idle -> Running -> {Paused <-> Running} -> Completed`,
/// and any state returns to `Idle` through a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimerStatus {
    /// Created or reset, not ticking.
    Idle,
    /// Ticking.
    Running,
    /// Frozen, keeps its value.
    Paused,
    /// Countdown reached zero.
    Completed,
}

impl fmt::Display for TimerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TimerStatus::Idle => "idle",
            TimerStatus::Running => "running",
            TimerStatus::Paused => "paused",
            TimerStatus::Completed => "completed",
        };
        f.write_str(label)
    }
}

/// Notification delivered to timer subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent<'a> {
    /// The timer published a new value in whole seconds.
    Tick {
        /// Timer id.
        id: &'a str,
        /// Remaining seconds (countdown) or elapsed seconds.
        seconds: u64,
    },
    /// A countdown reached zero. Delivered once per lifecycle.
    Completed {
        /// Timer id.
        id: &'a str,
    },
}

impl TimerEvent<'_> {
    /// Id of the timer that produced the event.
    pub fn id(&self) -> &str {
        match self {
            TimerEvent::Tick { id, .. } | TimerEvent::Completed { id } => id,
        }
    }
}

pub(crate) type TickCallback = Box<dyn FnMut(u64) + Send>;
pub(crate) type CompleteCallback = Box<dyn FnMut() + Send>;

/// Options accepted by [`super::TimerRegistry::create`].
///
/// ```rust
/// use auction_display::timer::{TimerMode, TimerOptions};
/// use std::time::Duration;
///
/// let options = TimerOptions::new()
///     .with_mode(TimerMode::Elapsed)
///     .with_tick_interval(Duration::from_millis(500));
/// assert_eq!(options.mode, TimerMode::Elapsed);
/// ```
pub struct TimerOptions {
    /// Counting direction.
    pub mode: TimerMode,
    /// Delay between ticks.
    pub tick_interval: Duration,
    pub(crate) on_tick: Option<TickCallback>,
    pub(crate) on_complete: Option<CompleteCallback>,
}

impl TimerOptions {
    /// Countdown options with a one second interval.
    pub fn new() -> Self {
        Self {
            mode: TimerMode::Countdown,
            tick_interval: DEFAULT_TICK_INTERVAL,
            on_tick: None,
            on_complete: None,
        }
    }

    /// Shorthand for elapsed-mode options.
    pub fn elapsed() -> Self {
        Self::new().with_mode(TimerMode::Elapsed)
    }

    /// Sets the counting direction.
    pub fn with_mode(mut self, mode: TimerMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the tick interval.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Registers a callback receiving every published value.
    pub fn on_tick(mut self, callback: impl FnMut(u64) + Send + 'static) -> Self {
        self.on_tick = Some(Box::new(callback));
        self
    }

    /// Registers a callback fired when a countdown completes.
    pub fn on_complete(mut self, callback: impl FnMut() + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }
}

impl Default for TimerOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TimerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerOptions")
            .field("mode", &self.mode)
            .field("tick_interval", &self.tick_interval)
            .field("on_tick", &self.on_tick.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

/// Message delivered by a timer's tick command.
///
/// The tag identifies the loop that scheduled the message. Pausing, resetting,
/// re-syncing or destroying a timer retires its tag, so a message that was
/// already in flight is dropped when it arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickMsg {
    /// Timer id.
    pub id: String,
    pub(crate) tag: u64,
}

/// Point-in-time copy of a timer's public state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    /// Timer id.
    pub id: String,
    /// Counting direction.
    pub mode: TimerMode,
    /// Lifecycle state.
    pub status: TimerStatus,
    /// Last published value in seconds.
    pub seconds: u64,
    /// Tick interval in milliseconds.
    pub tick_interval_ms: u64,
}
