//! Popup window configuration.

use serde::{Deserialize, Serialize};

/// Geometry and chrome of a popup window.
///
/// ```rust
/// use auction_display::popup::PopupConfig;
///
/// let config = PopupConfig::default().with_size(800, 700).protected();
/// assert!(config.prevent_auto_close);
/// assert!(config.features((1920, 1080)).starts_with("width=800,height=700,top=190,left=560"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopupConfig {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Distance from the top of the screen; centred when unset.
    pub top: Option<i32>,
    /// Distance from the left of the screen; centred when unset.
    pub left: Option<i32>,
    /// Whether the user may resize the window.
    pub resizable: bool,
    /// Whether scrollbars are shown.
    pub scrollbars: bool,
    /// Whether the toolbar is shown.
    pub toolbar: bool,
    /// Skip close polling and survive [`super::PopupManager::close_all`]
    /// unless protected popups are explicitly included.
    pub prevent_auto_close: bool,
}

impl Default for PopupConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            top: None,
            left: None,
            resizable: true,
            scrollbars: true,
            toolbar: false,
            prevent_auto_close: false,
        }
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

impl PopupConfig {
    /// Sets the window size.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Places the window at a fixed position.
    pub fn with_position(mut self, top: i32, left: i32) -> Self {
        self.top = Some(top);
        self.left = Some(left);
        self
    }

    /// Sets whether the window is resizable.
    pub fn with_resizable(mut self, resizable: bool) -> Self {
        self.resizable = resizable;
        self
    }

    /// Sets whether scrollbars are shown.
    pub fn with_scrollbars(mut self, scrollbars: bool) -> Self {
        self.scrollbars = scrollbars;
        self
    }

    /// Sets whether the toolbar is shown.
    pub fn with_toolbar(mut self, toolbar: bool) -> Self {
        self.toolbar = toolbar;
        self
    }

    /// Marks the popup as protected from automatic closing.
    pub fn protected(mut self) -> Self {
        self.prevent_auto_close = true;
        self
    }

    /// Window feature string for a screen of the given size.
    pub fn features(&self, screen: (u32, u32)) -> String {
        let centre = |screen: u32, size: u32| {
            let offset = i64::from(screen) / 2 - i64::from(size) / 2;
            i32::try_from(offset.max(0)).unwrap_or(0)
        };
        let top = self.top.unwrap_or_else(|| centre(screen.1, self.height));
        let left = self.left.unwrap_or_else(|| centre(screen.0, self.width));
        [
            format!("width={}", self.width),
            format!("height={}", self.height),
            format!("top={top}"),
            format!("left={left}"),
            format!("toolbar={}", yes_no(self.toolbar)),
            format!("scrollbars={}", yes_no(self.scrollbars)),
            format!("resizable={}", yes_no(self.resizable)),
            "status=no".to_string(),
            "menubar=no".to_string(),
            "location=no".to_string(),
        ]
        .join(",")
    }
}
