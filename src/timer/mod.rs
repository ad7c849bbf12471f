//! Named countdown and elapsed timers with drift-free ticking.
//!
//! A [`TimerRegistry`] owns every timer of a session. Values are never
//! decremented per tick: each tick recomputes the value from an absolute
//! anchor and the injected [`crate::clock::Clock`], so throttled or late ticks
//! cannot make the display lag behind the server. The server's absolute end
//! time is applied through [`TimerRegistry::sync_with_server`].
//!
//! # bubbletea-rs Integration
//!
//! ```rust
//! use auction_display::timer::{TimerOptions, TimerRegistry};
//! use bubbletea_rs::{Cmd, Msg};
//!
//! struct App {
//!     timers: TimerRegistry,
//! }
//!
//! impl App {
//!     fn start_round(&mut self) -> Option<Cmd> {
//!         self.timers.create("round-1", 90, TimerOptions::new()).ok()?;
//!         self.timers.start("round-1").ok().flatten()
//!     }
//!
//!     fn update(&mut self, msg: Msg) -> Option<Cmd> {
//!         // Forward tick messages; stale ones are dropped by the registry.
//!         self.timers.update(msg)
//!     }
//! }
//! ```

mod registry;
mod subscription;
mod types;


pub use registry::TimerRegistry;
pub use subscription::SubscriptionToken;
pub use types::{
    TickMsg, TimerEvent, TimerMode, TimerOptions, TimerSnapshot, TimerStatus,
    DEFAULT_TICK_INTERVAL,
};
