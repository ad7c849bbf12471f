//! The public auction display: a popup driven through setup, bidding and
//! results.
//!
//! [`AuctionDisplayController`] coordinates a countdown in the
//! [`crate::timer::TimerRegistry`], a window tracked by the
//! [`crate::popup::PopupManager`] and the content mounted into it. It owns
//! neither the registry nor the manager; every call borrows both through a
//! [`DisplayContext`].

mod controller;
mod views;


pub use controller::{AuctionDisplayController, DisplayContext};
pub use views::{
    AuctionBoardView, AuctionResultView, AuctionResults, AuctionSnapshot, DisplayStyles,
    BOARD_STYLES, RESULT_STYLES,
};

use crate::popup::PopupConfig;
use crate::renderer::RendererConfig;
use crate::timer_view::TimerViewConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle phase of an auction display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// Waiting for the auction to start.
    #[default]
    Setup,
    /// Bidding is open and the countdown runs.
    Active,
    /// Results are shown. Terminal.
    Ended,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Setup => "in setup",
            Phase::Active => "active",
            Phase::Ended => "ended",
        };
        f.write_str(name)
    }
}

/// Settings of an auction display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Name the popup window is tracked under.
    pub popup_name: String,
    /// URL the popup is opened with before its document is written.
    pub url: String,
    /// Base window title.
    pub title: String,
    /// Company shown at the top of every view.
    pub company_name: String,
    /// Popup width in pixels.
    pub width: u32,
    /// Popup height in pixels.
    pub height: u32,
    /// Keep the popup out of automatic closing and close polling.
    pub protected: bool,
    /// Countdown presentation.
    pub timer: TimerViewConfig,
    /// Mounting behaviour.
    pub renderer: RendererConfig,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            popup_name: "auction_display".to_string(),
            url: "about:blank".to_string(),
            title: "Auction Information".to_string(),
            company_name: String::new(),
            width: 800,
            height: 700,
            protected: true,
            timer: TimerViewConfig::default().with_label("Time remaining"),
            renderer: RendererConfig::default(),
        }
    }
}

impl DisplayConfig {
    /// Sets the company name.
    pub fn with_company(mut self, company_name: impl Into<String>) -> Self {
        self.company_name = company_name.into();
        self
    }

    /// Sets the base window title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the popup name.
    pub fn with_popup_name(mut self, name: impl Into<String>) -> Self {
        self.popup_name = name.into();
        self
    }

    /// Sets whether the popup is protected from automatic closing.
    pub fn with_protected(mut self, protected: bool) -> Self {
        self.protected = protected;
        self
    }

    /// Sets the renderer settings.
    pub fn with_renderer(mut self, renderer: RendererConfig) -> Self {
        self.renderer = renderer;
        self
    }

    /// Window configuration derived from these settings.
    pub fn popup_config(&self) -> PopupConfig {
        let config = PopupConfig::default()
            .with_size(self.width, self.height)
            .with_resizable(true);
        if self.protected {
            config.protected()
        } else {
            config
        }
    }

    /// Window title for a phase.
    pub fn title_for(&self, phase: Phase) -> String {
        match phase {
            Phase::Setup => self.title.clone(),
            Phase::Active => format!("{} | Live", self.title),
            Phase::Ended => format!("{} | Results", self.title),
        }
    }
}
