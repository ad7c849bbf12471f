//! Presentation adapter for a single timer.
//!
//! A [`TimerView`] subscribes to one timer of a [`TimerRegistry`] and keeps
//! the latest published value. Everything it shows is derived from that value
//! and static configuration; it never runs a clock of its own.
//!
//! # Basic Usage
//!
//! ```rust
//! use auction_display::timer::{TimerOptions, TimerRegistry};
//! use auction_display::timer_view::{TimerView, TimerViewConfig, UrgencyBand};
//!
//! let mut timers = TimerRegistry::with_system_clock();
//! timers.create("round", 25, TimerOptions::new()).unwrap();
//!
//! let view = TimerView::attach(&mut timers, "round", TimerViewConfig::default()).unwrap();
//! assert_eq!(view.display(), "00:25");
//! assert_eq!(view.band(), UrgencyBand::Caution);
//! view.detach(&mut timers);
//! ```

use crate::error::TimerError;
use crate::timer::{SubscriptionToken, TimerEvent, TimerMode, TimerRegistry};
use lipgloss_extras::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};

/// Formats seconds as `MM:SS`. Minutes are not wrapped at one hour.
///
/// ```rust
/// use auction_display::timer_view::format_countdown;
///
/// assert_eq!(format_countdown(0), "00:00");
/// assert_eq!(format_countdown(75), "01:15");
/// assert_eq!(format_countdown(3_725), "62:05");
/// ```
pub fn format_countdown(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Formats seconds as `HH:MM:SS`.
///
/// ```rust
/// use auction_display::timer_view::format_elapsed;
///
/// assert_eq!(format_elapsed(3_725), "01:02:05");
/// ```
pub fn format_elapsed(seconds: u64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// Spells a duration out, e.g. `2 hours 30 minutes 15 seconds`.
///
/// Zero components are skipped, except that an all-zero duration reads
/// `0 seconds`.
pub fn format_duration_words(seconds: u64) -> String {
    fn unit(value: u64, singular: &str, plural: &str) -> String {
        format!("{} {}", value, if value == 1 { singular } else { plural })
    }

    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(unit(hours, "hour", "hours"));
    }
    if minutes > 0 {
        parts.push(unit(minutes, "minute", "minutes"));
    }
    if secs > 0 || parts.is_empty() {
        parts.push(unit(secs, "second", "seconds"));
    }
    parts.join(" ")
}

/// Visual urgency of a countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyBand {
    /// Plenty of time left, or an elapsed timer.
    Normal,
    /// At or below the caution threshold.
    Caution,
    /// At or below the critical threshold.
    Critical,
    /// The countdown has completed.
    Complete,
}

/// Thresholds and labels of a [`TimerView`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerViewConfig {
    /// Seconds at or below which a countdown shows [`UrgencyBand::Caution`].
    pub caution_threshold: u64,
    /// Seconds at or below which a countdown shows [`UrgencyBand::Critical`].
    pub critical_threshold: u64,
    /// Optional label rendered before the time.
    pub label: Option<String>,
}

impl Default for TimerViewConfig {
    fn default() -> Self {
        Self {
            caution_threshold: 30,
            critical_threshold: 10,
            label: None,
        }
    }
}

impl TimerViewConfig {
    /// Sets both thresholds.
    pub fn with_thresholds(mut self, caution: u64, critical: u64) -> Self {
        self.caution_threshold = caution;
        self.critical_threshold = critical;
        self
    }

    /// Sets the label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Band for a value, given the timer mode and completion state.
    pub fn band(&self, mode: TimerMode, seconds: u64, completed: bool) -> UrgencyBand {
        match mode {
            TimerMode::Elapsed => UrgencyBand::Normal,
            TimerMode::Countdown if completed => UrgencyBand::Complete,
            TimerMode::Countdown if seconds <= self.critical_threshold => UrgencyBand::Critical,
            TimerMode::Countdown if seconds <= self.caution_threshold => UrgencyBand::Caution,
            TimerMode::Countdown => UrgencyBand::Normal,
        }
    }
}

/// Styles applied per urgency band.
#[derive(Debug, Clone)]
pub struct TimerViewStyles {
    /// Label style.
    pub label: Style,
    /// Time style for [`UrgencyBand::Normal`].
    pub normal: Style,
    /// Time style for [`UrgencyBand::Caution`].
    pub caution: Style,
    /// Time style for [`UrgencyBand::Critical`].
    pub critical: Style,
    /// Time style for [`UrgencyBand::Complete`].
    pub complete: Style,
}

impl Default for TimerViewStyles {
    fn default() -> Self {
        Self {
            label: Style::new().foreground(Color::from("245")),
            normal: Style::new().foreground(Color::from("#28a745")).bold(true),
            caution: Style::new().foreground(Color::from("#ffc107")).bold(true),
            critical: Style::new().foreground(Color::from("#dc3545")).bold(true),
            complete: Style::new().foreground(Color::from("#6c757d")),
        }
    }
}

impl TimerViewStyles {
    /// Style for `band`.
    pub fn for_band(&self, band: UrgencyBand) -> &Style {
        match band {
            UrgencyBand::Normal => &self.normal,
            UrgencyBand::Caution => &self.caution,
            UrgencyBand::Critical => &self.critical,
            UrgencyBand::Complete => &self.complete,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Latest {
    seconds: u64,
    completed: bool,
}

/// A subscribed, formatted view of one timer.
#[derive(Debug)]
pub struct TimerView {
    token: SubscriptionToken,
    mode: TimerMode,
    config: TimerViewConfig,
    /// Styles used by [`TimerView::view`].
    pub styles: TimerViewStyles,
    latest: Arc<Mutex<Latest>>,
}

impl TimerView {
    /// Subscribes to `id` and seeds the view with the timer's current value.
    pub fn attach(
        registry: &mut TimerRegistry,
        id: &str,
        config: TimerViewConfig,
    ) -> Result<Self, TimerError> {
        let mode = registry
            .mode(id)
            .ok_or_else(|| TimerError::UnknownTimer(id.to_string()))?;
        let latest = Arc::new(Mutex::new(Latest {
            seconds: registry.value(id).unwrap_or(0),
            completed: registry.is_completed(id),
        }));

        let sink = Arc::clone(&latest);
        let token = registry.subscribe(id, move |event| {
            let mut latest = sink.lock().unwrap_or_else(PoisonError::into_inner);
            match event {
                TimerEvent::Tick { seconds, .. } => {
                    latest.seconds = *seconds;
                    // A tick after completion means the countdown was revived.
                    latest.completed = false;
                }
                TimerEvent::Completed { .. } => {
                    latest.seconds = 0;
                    latest.completed = true;
                }
            }
        })?;

        Ok(Self {
            token,
            mode,
            config,
            styles: TimerViewStyles::default(),
            latest,
        })
    }

    /// Unsubscribes. Returns `false` if the timer was already gone.
    pub fn detach(self, registry: &mut TimerRegistry) -> bool {
        registry.unsubscribe(&self.token)
    }

    fn latest(&self) -> Latest {
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Id of the observed timer.
    pub fn timer_id(&self) -> &str {
        self.token.timer_id()
    }

    /// Latest published value in seconds.
    pub fn seconds(&self) -> u64 {
        self.latest().seconds
    }

    /// Whether the observed countdown has completed.
    pub fn is_complete(&self) -> bool {
        self.latest().completed
    }

    /// Current urgency band.
    pub fn band(&self) -> UrgencyBand {
        let latest = self.latest();
        self.config.band(self.mode, latest.seconds, latest.completed)
    }

    /// Unstyled time string: `MM:SS` for countdowns, `HH:MM:SS` for elapsed.
    pub fn display(&self) -> String {
        let seconds = self.seconds();
        match self.mode {
            TimerMode::Countdown => format_countdown(seconds),
            TimerMode::Elapsed => format_elapsed(seconds),
        }
    }

    /// Styled time, prefixed by the label when one is configured.
    pub fn view(&self) -> String {
        let time = self.styles.for_band(self.band()).render(&self.display());
        match &self.config.label {
            Some(label) => format!("{} {}", self.styles.label.render(label), time),
            None => time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::timer::TimerOptions;
    use lipgloss_extras::lipgloss;

    fn setup(seconds: i64, options: TimerOptions) -> (TimerRegistry, ManualClock) {
        let clock = ManualClock::at(0);
        let mut timers = TimerRegistry::new(Arc::new(clock.clone()));
        timers.create("t", seconds, options).unwrap();
        (timers, clock)
    }

    fn tick(timers: &mut TimerRegistry) {
        if let Some(msg) = timers.tick_msg("t") {
            timers.update(Box::new(msg));
        }
    }

    #[test]
    fn test_format_duration_words() {
        assert_eq!(format_duration_words(0), "0 seconds");
        assert_eq!(format_duration_words(1), "1 second");
        assert_eq!(format_duration_words(61), "1 minute 1 second");
        assert_eq!(
            format_duration_words(2 * 3600 + 30 * 60 + 15),
            "2 hours 30 minutes 15 seconds"
        );
        assert_eq!(format_duration_words(3600), "1 hour");
    }

    #[test]
    fn test_bands_follow_thresholds() {
        let config = TimerViewConfig::default();
        let countdown = TimerMode::Countdown;
        assert_eq!(config.band(countdown, 31, false), UrgencyBand::Normal);
        assert_eq!(config.band(countdown, 30, false), UrgencyBand::Caution);
        assert_eq!(config.band(countdown, 10, false), UrgencyBand::Critical);
        assert_eq!(config.band(countdown, 0, true), UrgencyBand::Complete);
        assert_eq!(config.band(TimerMode::Elapsed, 3, false), UrgencyBand::Normal);

        let tight = TimerViewConfig::default().with_thresholds(15, 5);
        assert_eq!(tight.band(countdown, 20, false), UrgencyBand::Normal);
        assert_eq!(tight.band(countdown, 15, false), UrgencyBand::Caution);
    }

    #[test]
    fn test_view_tracks_ticks() {
        let (mut timers, clock) = setup(12, TimerOptions::new());
        let view = TimerView::attach(&mut timers, "t", TimerViewConfig::default()).unwrap();
        assert_eq!(view.seconds(), 12);
        assert_eq!(view.band(), UrgencyBand::Caution);

        timers.start("t").unwrap();
        clock.advance(2_000);
        tick(&mut timers);
        assert_eq!(view.seconds(), 10);
        assert_eq!(view.band(), UrgencyBand::Critical);

        clock.advance(1_000);
        tick(&mut timers);
        assert_eq!(view.display(), "00:09");

        clock.advance(9_000);
        tick(&mut timers);
        assert!(view.is_complete());
        assert_eq!(view.band(), UrgencyBand::Complete);
        assert_eq!(view.display(), "00:00");
    }

    #[test]
    fn test_elapsed_view_format() {
        let (mut timers, clock) = setup(3_599, TimerOptions::elapsed());
        let view = TimerView::attach(&mut timers, "t", TimerViewConfig::default()).unwrap();
        timers.start("t").unwrap();
        clock.advance(1_000);
        tick(&mut timers);
        assert_eq!(view.display(), "01:00:00");
    }

    #[test]
    fn test_detach_stops_updates() {
        let (mut timers, clock) = setup(60, TimerOptions::new());
        let view = TimerView::attach(&mut timers, "t", TimerViewConfig::default()).unwrap();
        let probe = TimerView::attach(&mut timers, "t", TimerViewConfig::default()).unwrap();
        assert!(view.detach(&mut timers));

        timers.start("t").unwrap();
        clock.advance(5_000);
        tick(&mut timers);
        assert_eq!(probe.seconds(), 55);
        assert_eq!(timers.subscriber_count("t"), 1);
    }

    #[test]
    fn test_attach_unknown_timer_fails() {
        let mut timers = TimerRegistry::with_system_clock();
        let err = TimerView::attach(&mut timers, "nope", TimerViewConfig::default()).unwrap_err();
        assert_eq!(err, TimerError::UnknownTimer("nope".to_string()));
    }

    #[test]
    fn test_view_includes_label() {
        let (mut timers, _clock) = setup(90, TimerOptions::new());
        let config = TimerViewConfig::default().with_label("Time left");
        let view = TimerView::attach(&mut timers, "t", config).unwrap();
        assert_eq!(lipgloss::strip_ansi(&view.view()), "Time left 01:30");
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: TimerViewConfig =
            serde_json::from_str(r#"{ "critical_threshold": 5 }"#).unwrap();
        assert_eq!(config.caution_threshold, 30);
        assert_eq!(config.critical_threshold, 5);
        assert_eq!(config.label, None);
    }
}
