#![warn(missing_docs)]

//! # auction-display
//!
//! Countdown synchronisation and cross-window display for live auctions,
//! built on the Elm architecture of [bubbletea-rs](https://github.com/joshka/bubbletea-rs).
//!
//! ## Overview
//!
//! A live auction shows its countdown on the operator's screen and on a public
//! popup window. The popup lives on a platform the application does not
//! control: it may be blocked, closed by the user or have its document
//! replaced at any time, and the countdown must keep following the server's
//! end time no matter how late the local ticks arrive.
//!
//! The crate is split into small components, leaves first:
//!
//! | Module | Role |
//! |--------|------|
//! | [`timer`] | Named countdown/elapsed timers recomputed from the wall clock |
//! | [`timer_view`] | Subscribed, formatted view of one timer with urgency bands |
//! | [`popup`] | Named popup windows on a pluggable [`popup::WindowHost`] |
//! | [`renderer`] | One UI root per popup document, bounded mount retries |
//! | [`display`] | The auction display phase machine tying everything together |
//!
//! ## Scheduling
//!
//! Nothing in the crate spawns threads or timers. Every recurring operation
//! (timer ticks, close polling, mount retries) is returned as a
//! [`bubbletea_rs::Cmd`] and comes back as a message through an `update`
//! method. Each loop carries a tag; cancelling a loop changes the tag so a
//! message already in flight is ignored on arrival.
//!
//! ## Integration with bubbletea-rs
//!
//! ```rust
//! use auction_display::prelude::*;
//! use bubbletea_rs::{Cmd, Msg};
//!
//! struct App {
//!     timers: TimerRegistry,
//!     popups: PopupManager,
//!     display: AuctionDisplayController,
//! }
//!
//! impl App {
//!     fn new() -> Self {
//!         Self {
//!             timers: TimerRegistry::with_system_clock(),
//!             popups: PopupManager::new(HeadlessHost::new()),
//!             display: AuctionDisplayController::new("42", DisplayConfig::default()),
//!         }
//!     }
//!
//!     fn update(&mut self, msg: Msg) -> Option<Cmd> {
//!         let mut ctx = DisplayContext::new(&mut self.timers, &mut self.popups);
//!         self.display.update(&mut ctx, msg)
//!     }
//!
//!     fn view(&self) -> String {
//!         self.display.view()
//!     }
//! }
//! ```
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events (`timer`, `popup` and `auction` fields)
//! and never installs a subscriber; that is left to the application.

pub mod clock;
pub mod display;
pub mod error;
pub mod popup;
pub mod renderer;
pub mod timer;
pub mod timer_view;

pub use clock::{Clock, ManualClock, SystemClock};
pub use display::{
    AuctionDisplayController, AuctionResults, AuctionSnapshot, DisplayConfig, DisplayContext,
    Phase,
};
pub use error::{DisplayError, HostError, MountError, PopupError, TimerError};
pub use popup::{HeadlessHost, PopupConfig, PopupHandle, PopupManager, WindowHost, WindowId};
pub use renderer::{CrossWindowRenderer, MountOutcome, PopupView, RendererConfig, StyleSheet};
pub use timer::{
    SubscriptionToken, TickMsg as TimerTickMsg, TimerEvent, TimerMode, TimerOptions,
    TimerRegistry, TimerStatus,
};
pub use timer_view::{TimerView, TimerViewConfig, UrgencyBand};

/// Prelude module for convenient imports.
///
/// ```rust
/// use auction_display::prelude::*;
///
/// let mut timers = TimerRegistry::with_system_clock();
/// timers.create("round", 60, TimerOptions::new()).unwrap();
/// assert_eq!(timers.status("round"), Some(TimerStatus::Idle));
/// ```
pub mod prelude {
    pub use crate::clock::{Clock, ManualClock, SystemClock};
    pub use crate::display::{
        AuctionDisplayController, AuctionResults, AuctionSnapshot, DisplayConfig, DisplayContext,
        Phase,
    };
    pub use crate::error::{DisplayError, HostError, MountError, PopupError, TimerError};
    pub use crate::popup::{
        ClosePollMsg, HeadlessHost, PopupClosedMsg, PopupConfig, PopupHandle, PopupManager,
        WindowHost, WindowId,
    };
    pub use crate::renderer::{
        CrossWindowRenderer, MountFailedMsg, MountOutcome, MountRetryMsg, MountStatus,
        PopupView, RendererConfig, StyleSheet,
    };
    pub use crate::timer::{
        SubscriptionToken, TickMsg as TimerTickMsg, TimerEvent, TimerMode, TimerOptions,
        TimerRegistry, TimerStatus,
    };
    pub use crate::timer_view::{
        format_countdown, format_duration_words, format_elapsed, TimerView, TimerViewConfig,
        UrgencyBand,
    };
}
