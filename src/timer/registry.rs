//! The timer registry: named countdown/elapsed state machines and their tick loops.

use super::subscription::{EventCallback, SubscriptionToken, Subscribers};
use super::types::{TickMsg, TimerEvent, TimerMode, TimerOptions, TimerSnapshot, TimerStatus};
use crate::clock::{Clock, SystemClock};
use crate::error::TimerError;
use bubbletea_rs::{tick as bubbletea_tick, Cmd, Model as BubbleTeaModel, Msg};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

struct TimerEntry {
    mode: TimerMode,
    status: TimerStatus,
    interval: Duration,
    /// Duration used by `reset` when no new duration is given.
    initial_ms: i64,
    /// Countdown length of the current lifecycle.
    duration_ms: i64,
    /// Remaining (countdown) or elapsed milliseconds while not running.
    frozen_ms: i64,
    /// Wall-clock time the running value is derived from.
    anchor_ms: i64,
    /// Last published value.
    seconds: u64,
    /// Tag of the armed loop, 0 when none is armed.
    tag: u64,
    subscribers: Subscribers,
}

impl TimerEntry {
    fn live_ms(&self, now: i64) -> i64 {
        if self.status != TimerStatus::Running {
            return self.frozen_ms;
        }
        match self.mode {
            TimerMode::Countdown => (self.duration_ms - (now - self.anchor_ms)).max(0),
            TimerMode::Elapsed => (now - self.anchor_ms).max(0),
        }
    }

    fn anchor_for(&self, now: i64) -> i64 {
        match self.mode {
            TimerMode::Countdown => now - (self.duration_ms - self.frozen_ms),
            TimerMode::Elapsed => now - self.frozen_ms,
        }
    }

    fn snapshot(&self, id: &str) -> TimerSnapshot {
        TimerSnapshot {
            id: id.to_string(),
            mode: self.mode,
            status: self.status,
            seconds: self.seconds,
            tick_interval_ms: u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Whole seconds shown for a millisecond value.
///
/// Countdowns round up so that zero is shown exactly when the end has passed;
/// elapsed timers round down.
fn seconds_for(mode: TimerMode, ms: i64) -> u64 {
    let ms = u64::try_from(ms.max(0)).unwrap_or(0);
    match mode {
        TimerMode::Countdown => ms.div_ceil(1000),
        TimerMode::Elapsed => ms / 1000,
    }
}

/// Marks the timer running from its frozen value and arms a loop under `tag`.
fn arm(id: &str, entry: &mut TimerEntry, tag: u64, now: i64) -> Cmd {
    entry.anchor_ms = entry.anchor_for(now);
    entry.status = TimerStatus::Running;
    entry.tag = tag;
    tick(id, tag, entry.interval)
}

fn tick(id: &str, tag: u64, interval: Duration) -> Cmd {
    let id = id.to_string();
    bubbletea_tick(interval, move |_| {
        Box::new(TickMsg {
            id: id.clone(),
            tag,
        }) as Msg
    })
}

/// Owns every timer of an application session.
///
/// The registry is the only place that schedules ticks. Operations that arm a
/// loop return the [`Cmd`] delivering the next [`TickMsg`]; the host runs it
/// and feeds the message back through [`TimerRegistry::update`]. Each armed
/// loop carries a fresh tag, so at most one loop per timer is ever honoured
/// and cancelling a loop invalidates ticks already in flight.
///
/// # Examples
///
/// ```rust
/// use auction_display::clock::ManualClock;
/// use auction_display::timer::{TimerOptions, TimerRegistry, TimerStatus};
/// use std::sync::Arc;
///
/// let clock = ManualClock::at(0);
/// let mut timers = TimerRegistry::new(Arc::new(clock.clone()));
/// timers.create("round", 60, TimerOptions::new()).unwrap();
/// let cmd = timers.start("round").unwrap();
/// assert!(cmd.is_some());
///
/// clock.advance(1_000);
/// let msg = timers.tick_msg("round").unwrap();
/// timers.update(Box::new(msg));
/// assert_eq!(timers.value("round"), Some(59));
/// assert_eq!(timers.status("round"), Some(TimerStatus::Running));
/// ```
pub struct TimerRegistry {
    clock: Arc<dyn Clock>,
    timers: BTreeMap<String, TimerEntry>,
    next_tag: u64,
    next_key: u64,
}

impl TimerRegistry {
    /// Creates an empty registry reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            timers: BTreeMap::new(),
            next_tag: 0,
            next_key: 0,
        }
    }

    /// Creates an empty registry on the system clock.
    pub fn with_system_clock() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    fn now(&self) -> i64 {
        self.clock.now_ms()
    }

    fn fresh_tag(&mut self) -> u64 {
        self.next_tag += 1;
        self.next_tag
    }

    fn fresh_key(&mut self) -> u64 {
        self.next_key += 1;
        self.next_key
    }

    fn entry_mut(&mut self, id: &str) -> Result<&mut TimerEntry, TimerError> {
        match self.timers.get_mut(id) {
            Some(entry) => Ok(entry),
            None => {
                tracing::warn!(timer = id, "operation on unknown timer");
                Err(TimerError::UnknownTimer(id.to_string()))
            }
        }
    }

    /// Registers a timer in the idle state.
    ///
    /// An existing timer with the same id is torn down first; ticks it had in
    /// flight are dropped. Subscribers receive the initial value right away.
    pub fn create(
        &mut self,
        id: &str,
        initial_seconds: i64,
        options: TimerOptions,
    ) -> Result<(), TimerError> {
        if initial_seconds < 0 {
            tracing::warn!(timer = id, seconds = initial_seconds, "negative timer duration");
            return Err(TimerError::NegativeDuration {
                id: id.to_string(),
                seconds: initial_seconds,
            });
        }
        if options.tick_interval.is_zero() {
            tracing::warn!(timer = id, "zero tick interval");
            return Err(TimerError::ZeroInterval(id.to_string()));
        }
        if self.timers.remove(id).is_some() {
            tracing::debug!(timer = id, "replacing existing timer");
        }

        let TimerOptions {
            mode,
            tick_interval,
            on_tick,
            on_complete,
        } = options;

        let mut subscribers = Subscribers::default();
        if let Some(mut on_tick) = on_tick {
            let key = self.fresh_key();
            subscribers.insert(
                key,
                Box::new(move |event: &TimerEvent<'_>| {
                    if let TimerEvent::Tick { seconds, .. } = event {
                        on_tick(*seconds);
                    }
                }),
            );
        }
        if let Some(mut on_complete) = on_complete {
            let key = self.fresh_key();
            subscribers.insert(
                key,
                Box::new(move |event: &TimerEvent<'_>| {
                    if let TimerEvent::Completed { .. } = event {
                        on_complete();
                    }
                }),
            );
        }

        let ms = initial_seconds.saturating_mul(1000);
        let mut entry = TimerEntry {
            mode,
            status: TimerStatus::Idle,
            interval: tick_interval,
            initial_ms: ms,
            duration_ms: ms,
            frozen_ms: ms,
            anchor_ms: self.now(),
            seconds: seconds_for(mode, ms),
            tag: 0,
            subscribers,
        };
        let seconds = entry.seconds;
        entry.subscribers.notify(&TimerEvent::Tick { id, seconds });
        self.timers.insert(id.to_string(), entry);
        tracing::debug!(timer = id, seconds, ?mode, "timer created");
        Ok(())
    }

    /// Starts an idle or paused timer.
    ///
    /// Returns the command delivering the first tick, or `None` when the timer
    /// was already running (no second loop is armed). A countdown that has
    /// completed must be reset first; a countdown idling at zero completes on
    /// the spot.
    pub fn start(&mut self, id: &str) -> Result<Option<Cmd>, TimerError> {
        let now = self.now();
        let tag = self.fresh_tag();
        let entry = self.entry_mut(id)?;
        match (entry.status, entry.mode) {
            (TimerStatus::Running, _) => {
                tracing::debug!(timer = id, "start ignored, timer already running");
                return Ok(None);
            }
            (TimerStatus::Completed, TimerMode::Countdown) => {
                tracing::warn!(timer = id, "start refused, timer already completed");
                return Err(TimerError::AlreadyCompleted(id.to_string()));
            }
            _ => {}
        }
        if entry.mode == TimerMode::Countdown && entry.frozen_ms <= 0 {
            Self::complete(id, entry);
            return Ok(None);
        }
        Ok(Some(arm(id, entry, tag, now)))
    }

    fn complete(id: &str, entry: &mut TimerEntry) {
        entry.status = TimerStatus::Completed;
        entry.tag = 0;
        entry.frozen_ms = 0;
        entry.seconds = 0;
        entry.subscribers.notify(&TimerEvent::Completed { id });
        tracing::debug!(timer = id, "timer completed");
    }

    /// Freezes a running timer. Ticks already scheduled are invalidated.
    ///
    /// A countdown whose end has already passed completes instead of pausing.
    pub fn pause(&mut self, id: &str) -> Result<(), TimerError> {
        let now = self.now();
        let entry = self.entry_mut(id)?;
        if entry.status != TimerStatus::Running {
            tracing::warn!(timer = id, status = %entry.status, "pause refused");
            return Err(TimerError::NotRunning(id.to_string()));
        }
        let live = entry.live_ms(now);
        if entry.mode == TimerMode::Countdown && live == 0 {
            entry.seconds = 0;
            entry.subscribers.notify(&TimerEvent::Tick { id, seconds: 0 });
            Self::complete(id, entry);
            return Ok(());
        }
        entry.frozen_ms = live;
        entry.seconds = match entry.mode {
            TimerMode::Countdown => seconds_for(entry.mode, live).min(entry.seconds),
            TimerMode::Elapsed => seconds_for(entry.mode, live).max(entry.seconds),
        };
        entry.status = TimerStatus::Paused;
        entry.tag = 0;
        Ok(())
    }

    /// Resumes a paused timer from its frozen value.
    pub fn resume(&mut self, id: &str) -> Result<Option<Cmd>, TimerError> {
        let now = self.now();
        let tag = self.fresh_tag();
        let entry = self.entry_mut(id)?;
        if entry.status != TimerStatus::Paused {
            tracing::warn!(timer = id, status = %entry.status, "resume refused");
            return Err(TimerError::NotPaused(id.to_string()));
        }
        Ok(Some(arm(id, entry, tag, now)))
    }

    /// Returns the timer to idle with its original or a new duration.
    ///
    /// A new duration replaces the one later resets fall back to. With
    /// `auto_start` the timer starts right away and the first tick command is
    /// returned.
    pub fn reset(
        &mut self,
        id: &str,
        new_duration: Option<i64>,
        auto_start: bool,
    ) -> Result<Option<Cmd>, TimerError> {
        if let Some(seconds) = new_duration.filter(|s| *s < 0) {
            tracing::warn!(timer = id, seconds, "negative reset duration");
            return Err(TimerError::NegativeDuration {
                id: id.to_string(),
                seconds,
            });
        }
        let now = self.now();
        let entry = self.entry_mut(id)?;
        if let Some(seconds) = new_duration {
            entry.initial_ms = seconds.saturating_mul(1000);
        }
        entry.duration_ms = entry.initial_ms;
        entry.frozen_ms = entry.initial_ms;
        entry.anchor_ms = now;
        entry.status = TimerStatus::Idle;
        entry.tag = 0;
        entry.seconds = seconds_for(entry.mode, entry.initial_ms);
        let seconds = entry.seconds;
        entry.subscribers.notify(&TimerEvent::Tick { id, seconds });

        if auto_start {
            return self.start(id);
        }
        Ok(None)
    }

    /// Re-anchors a countdown on the server's absolute end time.
    ///
    /// The new value always overrides whatever the previous anchor produced;
    /// the latest call wins. A running timer gets a fresh loop (the old one is
    /// invalidated), idle and paused timers keep their state with the new
    /// value. An end time in the past completes the countdown; a later end
    /// time revives a completed countdown and sets it running again.
    pub fn sync_with_server(
        &mut self,
        id: &str,
        server_end_ms: i64,
    ) -> Result<Option<Cmd>, TimerError> {
        let now = self.now();
        let tag = self.fresh_tag();
        let entry = self.entry_mut(id)?;
        if entry.mode != TimerMode::Countdown {
            tracing::warn!(timer = id, "server sync requires a countdown timer");
            return Err(TimerError::ModeMismatch(id.to_string()));
        }
        let remaining = (server_end_ms - now).max(0);
        let previous = entry.status;
        entry.tag = 0;
        entry.duration_ms = remaining;
        entry.frozen_ms = remaining;
        entry.anchor_ms = now;
        entry.seconds = seconds_for(TimerMode::Countdown, remaining);
        let seconds = entry.seconds;
        tracing::debug!(timer = id, seconds, %previous, "synced with server end time");

        if remaining == 0 {
            if previous == TimerStatus::Completed {
                return Ok(None);
            }
            entry.status = TimerStatus::Running;
            entry.subscribers.notify(&TimerEvent::Tick { id, seconds });
            Self::complete(id, entry);
            return Ok(None);
        }

        entry.subscribers.notify(&TimerEvent::Tick { id, seconds });
        match previous {
            TimerStatus::Running | TimerStatus::Completed => Ok(Some(arm(id, entry, tag, now))),
            TimerStatus::Idle | TimerStatus::Paused => Ok(None),
        }
    }

    /// Re-anchors an elapsed timer on the server's start time.
    pub fn sync_elapsed(&mut self, id: &str, start_ms: i64) -> Result<Option<Cmd>, TimerError> {
        let now = self.now();
        let tag = self.fresh_tag();
        let entry = self.entry_mut(id)?;
        if entry.mode != TimerMode::Elapsed {
            tracing::warn!(timer = id, "elapsed sync requires an elapsed timer");
            return Err(TimerError::ModeMismatch(id.to_string()));
        }
        let elapsed = (now - start_ms).max(0);
        let running = entry.status == TimerStatus::Running;
        entry.tag = 0;
        entry.frozen_ms = elapsed;
        entry.seconds = seconds_for(TimerMode::Elapsed, elapsed);
        let seconds = entry.seconds;
        entry.subscribers.notify(&TimerEvent::Tick { id, seconds });
        if running {
            return Ok(Some(arm(id, entry, tag, now)));
        }
        Ok(None)
    }

    /// Unregisters a timer. Its subscribers are dropped and pending ticks
    /// become no-ops.
    pub fn destroy(&mut self, id: &str) -> bool {
        let removed = self.timers.remove(id).is_some();
        if removed {
            tracing::debug!(timer = id, "timer destroyed");
        }
        removed
    }

    /// Destroys every timer.
    pub fn clear(&mut self) {
        self.timers.clear();
    }

    /// Subscribes to tick and completion events of a timer.
    pub fn subscribe(
        &mut self,
        id: &str,
        callback: impl FnMut(&TimerEvent<'_>) + Send + 'static,
    ) -> Result<SubscriptionToken, TimerError> {
        let key = self.fresh_key();
        let entry = self.entry_mut(id)?;
        let callback: EventCallback = Box::new(callback);
        entry.subscribers.insert(key, callback);
        Ok(SubscriptionToken {
            timer: id.to_string(),
            key,
        })
    }

    /// Stops deliveries for `token`. Returns `false` when it was already
    /// inactive (unsubscribed before, or the timer is gone).
    pub fn unsubscribe(&mut self, token: &SubscriptionToken) -> bool {
        self.timers
            .get_mut(&token.timer)
            .is_some_and(|entry| entry.subscribers.remove(token.key))
    }

    /// The message the current loop of a running timer expects next.
    ///
    /// Hosts that run their own scheduler can deliver this message instead of
    /// executing the returned commands.
    pub fn tick_msg(&self, id: &str) -> Option<TickMsg> {
        self.timers
            .get(id)
            .filter(|entry| entry.status == TimerStatus::Running)
            .map(|entry| TickMsg {
                id: id.to_string(),
                tag: entry.tag,
            })
    }

    /// Processes a tick and returns the command for the next one.
    ///
    /// Ticks for unknown timers, retired loops or timers that are not running
    /// are dropped.
    pub fn update(&mut self, msg: Msg) -> Option<Cmd> {
        let tick_msg = msg.downcast_ref::<TickMsg>()?;
        self.handle_tick(tick_msg)
    }

    pub(crate) fn handle_tick(&mut self, msg: &TickMsg) -> Option<Cmd> {
        let now = self.now();
        let entry = self.timers.get_mut(&msg.id)?;
        if entry.status != TimerStatus::Running || msg.tag == 0 || msg.tag != entry.tag {
            return None;
        }

        let live = entry.live_ms(now);
        let computed = seconds_for(entry.mode, live);
        // Wall clock stepping backwards must not move the display backwards.
        entry.seconds = match entry.mode {
            TimerMode::Countdown => computed.min(entry.seconds),
            TimerMode::Elapsed => computed.max(entry.seconds),
        };
        let seconds = entry.seconds;
        let id = msg.id.as_str();
        entry.subscribers.notify(&TimerEvent::Tick { id, seconds });

        if entry.mode == TimerMode::Countdown && live == 0 {
            Self::complete(id, entry);
            return None;
        }
        Some(tick(id, entry.tag, entry.interval))
    }

    /// Lifecycle state of a timer.
    pub fn status(&self, id: &str) -> Option<TimerStatus> {
        self.timers.get(id).map(|entry| entry.status)
    }

    /// Counting direction of a timer.
    pub fn mode(&self, id: &str) -> Option<TimerMode> {
        self.timers.get(id).map(|entry| entry.mode)
    }

    /// Last published value in seconds.
    pub fn value(&self, id: &str) -> Option<u64> {
        self.timers.get(id).map(|entry| entry.seconds)
    }

    /// Value computed from the clock right now, without publishing it.
    pub fn current_value(&self, id: &str) -> Option<u64> {
        let now = self.now();
        self.timers
            .get(id)
            .map(|entry| seconds_for(entry.mode, entry.live_ms(now)))
    }

    /// Copy of a timer's public state.
    pub fn snapshot(&self, id: &str) -> Option<TimerSnapshot> {
        self.timers.get(id).map(|entry| entry.snapshot(id))
    }

    /// Whether a timer is registered under `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.timers.contains_key(id)
    }

    /// Whether the timer is ticking.
    pub fn is_running(&self, id: &str) -> bool {
        self.status(id) == Some(TimerStatus::Running)
    }

    /// Whether the timer is paused.
    pub fn is_paused(&self, id: &str) -> bool {
        self.status(id) == Some(TimerStatus::Paused)
    }

    /// Whether the countdown has completed.
    pub fn is_completed(&self, id: &str) -> bool {
        self.status(id) == Some(TimerStatus::Completed)
    }

    /// Registered ids in lexical order.
    pub fn ids(&self) -> Vec<String> {
        self.timers.keys().cloned().collect()
    }

    /// Number of registered timers.
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// Whether no timer is registered.
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Number of subscribers attached to a timer, including the callbacks
    /// given at creation.
    pub fn subscriber_count(&self, id: &str) -> usize {
        self.timers
            .get(id)
            .map_or(0, |entry| entry.subscribers.len())
    }

    /// One line per timer: `id mode status seconds`.
    pub fn view(&self) -> String {
        let mut out = String::new();
        for (id, entry) in &self.timers {
            let _ = writeln!(out, "{id} {:?} {} {}s", entry.mode, entry.status, entry.seconds);
        }
        out
    }
}

impl std::fmt::Debug for TimerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshots: Vec<_> = self
            .timers
            .iter()
            .map(|(id, entry)| entry.snapshot(id))
            .collect();
        f.debug_struct("TimerRegistry")
            .field("timers", &snapshots)
            .finish()
    }
}

impl Default for TimerRegistry {
    fn default() -> Self {
        Self::with_system_clock()
    }
}

impl BubbleTeaModel for TimerRegistry {
    fn init() -> (Self, Option<Cmd>) {
        (Self::with_system_clock(), None)
    }

    fn update(&mut self, msg: Msg) -> Option<Cmd> {
        self.update(msg)
    }

    fn view(&self) -> String {
        self.view()
    }
}
