//! Named popup windows on a pluggable windowing platform.
//!
//! The platform is reached through the [`WindowHost`] trait. [`PopupManager`]
//! keeps the registry of named windows, opening and closing them and noticing
//! when the user closes one. [`HeadlessHost`] is an in-memory platform for
//! tests and headless embedding.

mod config;
mod headless;
mod host;
mod manager;

#[cfg(test)]
mod tests;

pub use config::PopupConfig;
pub use headless::HeadlessHost;
pub use host::{RootId, WindowHost, WindowId};
pub use manager::{
    ClosePollMsg, DocumentAccess, OpenedPopup, PopupClosedMsg, PopupHandle, PopupManager,
    CLOSE_POLL_INTERVAL,
};
