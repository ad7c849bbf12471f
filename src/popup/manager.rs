//! Tracks named popup windows and watches for user-initiated closes.

use super::config::PopupConfig;
use super::host::{RootId, WindowHost, WindowId};
use crate::error::{HostError, PopupError};
use bubbletea_rs::{tick as bubbletea_tick, Cmd, Msg};
use std::collections::BTreeMap;
use std::time::Duration;

/// How often unprotected popups are checked for a user-initiated close.
pub const CLOSE_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Scheduled check of whether a popup is still open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosePollMsg {
    /// Popup name.
    pub name: String,
    tag: u64,
}

/// Delivered once when a tracked popup was found closed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupClosedMsg {
    /// Popup name.
    pub name: String,
}

/// Reference to one specific opening of a named popup.
///
/// Reopening a name produces a new handle; old handles stop validating even
/// though the name is the same.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupHandle {
    name: String,
    window: WindowId,
    epoch: u64,
}

impl PopupHandle {
    /// Name the popup was opened under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Host window id.
    pub fn window(&self) -> WindowId {
        self.window
    }
}

/// Result of a successful [`PopupManager::open`].
pub struct OpenedPopup {
    /// Handle to the new window.
    pub handle: PopupHandle,
    /// First close poll, absent for protected popups.
    pub watch: Option<Cmd>,
}

impl std::fmt::Debug for OpenedPopup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedPopup")
            .field("handle", &self.handle)
            .field("watch", &self.watch.is_some())
            .finish()
    }
}

struct Tracked {
    window: WindowId,
    epoch: u64,
    protected: bool,
    /// Tag of the armed close poll, 0 when none.
    watch: u64,
}

fn poll(name: &str, tag: u64, interval: Duration) -> Cmd {
    let name = name.to_string();
    bubbletea_tick(interval, move |_| {
        Box::new(ClosePollMsg {
            name: name.clone(),
            tag,
        }) as Msg
    })
}

fn closed(name: &str) -> Cmd {
    let name = name.to_string();
    bubbletea_tick(Duration::from_nanos(1), move |_| {
        Box::new(PopupClosedMsg { name: name.clone() }) as Msg
    })
}

/// Opens, tracks and closes named secondary windows.
///
/// At most one window is tracked per name: opening a name that is already
/// tracked closes the previous window first. Windows the user closes are
/// noticed by a close poll every [`CLOSE_POLL_INTERVAL`] and deregistered,
/// after which a [`PopupClosedMsg`] is delivered.
///
/// # Examples
///
/// ```rust
/// use auction_display::popup::{HeadlessHost, PopupConfig, PopupManager};
///
/// let host = HeadlessHost::new();
/// let mut popups = PopupManager::new(host.clone());
/// let opened = popups.open("about:blank", "board", &PopupConfig::default()).unwrap();
/// assert!(popups.is_open("board"));
/// assert!(opened.watch.is_some());
///
/// assert!(popups.close("board"));
/// assert!(!popups.close("board"));
/// ```
pub struct PopupManager {
    host: Box<dyn WindowHost>,
    popups: BTreeMap<String, Tracked>,
    next_epoch: u64,
    poll_interval: Duration,
}

impl std::fmt::Debug for PopupManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PopupManager")
            .field("popups", &self.popups.keys().collect::<Vec<_>>())
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

impl PopupManager {
    /// Creates a manager driving `host`.
    pub fn new(host: impl WindowHost + 'static) -> Self {
        Self {
            host: Box::new(host),
            popups: BTreeMap::new(),
            next_epoch: 0,
            poll_interval: CLOSE_POLL_INTERVAL,
        }
    }

    /// Overrides the close poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Opens a window under `name`, closing any window already tracked under it.
    pub fn open(
        &mut self,
        url: &str,
        name: &str,
        config: &PopupConfig,
    ) -> Result<OpenedPopup, PopupError> {
        if self.close(name) {
            tracing::debug!(popup = name, "closed previous window before reopening");
        }

        let features = config.features(self.host.screen_size());
        let Some(window) = self.host.open_window(url, name, &features) else {
            tracing::warn!(popup = name, "popup blocked by the platform");
            return Err(PopupError::Blocked(name.to_string()));
        };

        self.next_epoch += 1;
        let epoch = self.next_epoch;
        let watch = (!config.prevent_auto_close).then(|| poll(name, epoch, self.poll_interval));
        self.popups.insert(
            name.to_string(),
            Tracked {
                window,
                epoch,
                protected: config.prevent_auto_close,
                watch: if watch.is_some() { epoch } else { 0 },
            },
        );
        tracing::info!(popup = name, window = window.0, "popup opened");

        Ok(OpenedPopup {
            handle: PopupHandle {
                name: name.to_string(),
                window,
                epoch,
            },
            watch,
        })
    }

    /// Closes and deregisters the popup.
    ///
    /// Returns `false` when nothing was tracked under `name` or the window was
    /// already closed; a stale entry is still deregistered in that case.
    pub fn close(&mut self, name: &str) -> bool {
        let Some(tracked) = self.popups.remove(name) else {
            return false;
        };
        if self.host.is_closed(tracked.window) {
            tracing::debug!(popup = name, "popup was already closed");
            return false;
        }
        self.host.close_window(tracked.window);
        tracing::info!(popup = name, "popup closed");
        true
    }

    /// Closes every popup, skipping protected ones unless `include_protected`.
    ///
    /// Returns how many windows were actually closed.
    pub fn close_all(&mut self, include_protected: bool) -> usize {
        let names: Vec<String> = self
            .popups
            .iter()
            .filter(|(_, tracked)| include_protected || !tracked.protected)
            .map(|(name, _)| name.clone())
            .collect();
        names.iter().filter(|name| self.close(name)).count()
    }

    /// Session teardown: closes every unprotected popup.
    pub fn teardown(&mut self) -> usize {
        self.close_all(false)
    }

    /// Whether a live window is tracked under `name`.
    pub fn is_open(&self, name: &str) -> bool {
        self.popups
            .get(name)
            .is_some_and(|tracked| !self.host.is_closed(tracked.window))
    }

    /// Number of tracked popups.
    pub fn count(&self) -> usize {
        self.popups.len()
    }

    /// Names of the tracked popups.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.popups.keys().map(String::as_str)
    }

    /// Handle of the popup tracked under `name`.
    pub fn handle(&self, name: &str) -> Option<PopupHandle> {
        self.popups.get(name).map(|tracked| PopupHandle {
            name: name.to_string(),
            window: tracked.window,
            epoch: tracked.epoch,
        })
    }

    /// Whether `handle` still refers to the live, tracked window.
    pub fn is_valid(&self, handle: &PopupHandle) -> bool {
        self.popups.get(&handle.name).is_some_and(|tracked| {
            tracked.epoch == handle.epoch && !self.host.is_closed(tracked.window)
        })
    }

    /// Like [`PopupManager::is_valid`], but deregisters the popup when its
    /// window turns out to be closed.
    pub fn validate(&mut self, handle: &PopupHandle) -> bool {
        let Some(tracked) = self.popups.get(&handle.name) else {
            return false;
        };
        if tracked.epoch != handle.epoch {
            return false;
        }
        if self.host.is_closed(tracked.window) {
            self.popups.remove(&handle.name);
            tracing::info!(popup = handle.name.as_str(), "popup found closed, deregistered");
            return false;
        }
        true
    }

    /// Close poll for `name` matching the armed one, if any.
    pub fn poll_msg(&self, name: &str) -> Option<ClosePollMsg> {
        self.popups
            .get(name)
            .filter(|tracked| tracked.watch != 0)
            .map(|tracked| ClosePollMsg {
                name: name.to_string(),
                tag: tracked.watch,
            })
    }

    /// Handles a [`ClosePollMsg`]; other messages are ignored.
    ///
    /// Polls left over from a closed or reopened popup are dropped.
    pub fn update(&mut self, msg: Msg) -> Option<Cmd> {
        let poll_msg = msg.downcast_ref::<ClosePollMsg>()?;
        let tracked = self.popups.get(&poll_msg.name)?;
        if tracked.watch == 0 || tracked.watch != poll_msg.tag {
            return None;
        }
        if self.host.is_closed(tracked.window) {
            self.popups.remove(&poll_msg.name);
            tracing::info!(popup = poll_msg.name.as_str(), "popup closed by the user");
            return Some(closed(&poll_msg.name));
        }
        Some(poll(&poll_msg.name, poll_msg.tag, self.poll_interval))
    }

    /// Document access for a live popup.
    ///
    /// A handle whose window has closed is deregistered and reported as gone.
    pub fn document(&mut self, handle: &PopupHandle) -> Result<DocumentAccess<'_>, PopupError> {
        if !self.validate(handle) {
            return Err(PopupError::WindowGone(handle.name.clone()));
        }
        Ok(DocumentAccess {
            host: self.host.as_mut(),
            window: handle.window,
        })
    }
}

/// Borrowed access to the current document of one popup.
pub struct DocumentAccess<'a> {
    host: &'a mut (dyn WindowHost + 'static),
    window: WindowId,
}

impl std::fmt::Debug for DocumentAccess<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentAccess")
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

impl DocumentAccess<'_> {
    /// Window the document belongs to.
    pub fn window(&self) -> WindowId {
        self.window
    }

    /// Generation of the current document.
    pub fn generation(&self) -> Result<u64, HostError> {
        self.host.document_generation(self.window)
    }

    /// Replaces the document.
    pub fn write(&mut self, html: &str) -> Result<(), HostError> {
        self.host.write_document(self.window, html)
    }

    /// Whether the document has an element with this id.
    pub fn has_element(&self, element_id: &str) -> bool {
        self.host.has_element(self.window, element_id)
    }

    /// Sets the document title.
    pub fn set_title(&mut self, title: &str) -> Result<(), HostError> {
        self.host.set_title(self.window, title)
    }

    /// Whether a style with this key is present.
    pub fn has_style(&self, key: &str) -> bool {
        self.host.has_style(self.window, key)
    }

    /// Adds a style to the document head.
    pub fn inject_style(&mut self, key: &str, css: &str) -> Result<(), HostError> {
        self.host.inject_style(self.window, key, css)
    }

    /// Creates a UI root on `element_id`.
    pub fn create_root(&mut self, element_id: &str) -> Result<RootId, HostError> {
        self.host.create_root(self.window, element_id)
    }

    /// Renders `content` into `root`.
    pub fn render_root(&mut self, root: RootId, content: &str) -> Result<(), HostError> {
        self.host.render_root(self.window, root, content)
    }

    /// Tears `root` down.
    pub fn unmount_root(&mut self, root: RootId) -> Result<(), HostError> {
        self.host.unmount_root(self.window, root)
    }
}
