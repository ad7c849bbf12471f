//! Mounting views into popup documents.
//!
//! A [`CrossWindowRenderer`] keeps at most one UI root per popup document.
//! The first [`CrossWindowRenderer::mount`] waits for the mount point with a
//! bounded number of short retries, later mounts re-render into the same root.
//! Documents the renderer prepared itself are re-initialized when the platform
//! replaces them, and roots attached to a replaced document are never reused.
//!
//! # bubbletea-rs Integration
//!
//! ```rust
//! use auction_display::popup::PopupManager;
//! use auction_display::renderer::{CrossWindowRenderer, MountFailedMsg};
//! use bubbletea_rs::{Cmd, Msg};
//!
//! struct App {
//!     popups: PopupManager,
//!     renderer: CrossWindowRenderer,
//! }
//!
//! impl App {
//!     fn update(&mut self, msg: Msg) -> Option<Cmd> {
//!         if let Some(failed) = msg.downcast_ref::<MountFailedMsg>() {
//!             eprintln!("display unavailable: {}", failed.error);
//!             return None;
//!         }
//!         self.renderer.update(&mut self.popups, msg)
//!     }
//! }
//! ```

use crate::error::{HostError, MountError};
use crate::popup::{DocumentAccess, PopupHandle, PopupManager, RootId};
use bubbletea_rs::{tick as bubbletea_tick, Cmd, Msg};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Element id the popup shell provides for the UI root.
pub const DEFAULT_MOUNT_POINT: &str = "auction-popup-root";

/// Styles every popup document receives.
pub static POPUP_BASE_STYLES: Lazy<StyleSheet> = Lazy::new(|| {
    StyleSheet::new(
        "popup-base",
        "body { margin: 0; padding: 0; font-family: Arial, sans-serif; \
         background-color: #f5f5f5; }\n\
         #auction-popup-root { height: 100vh; overflow-y: auto; }",
    )
});

/// Something that can be rendered into a popup.
pub trait PopupView {
    /// Current content of the view.
    fn view(&self) -> String;
}

impl PopupView for String {
    fn view(&self) -> String {
        self.clone()
    }
}

impl PopupView for &str {
    fn view(&self) -> String {
        (*self).to_string()
    }
}

/// A named style resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleSheet {
    /// Key used to detect the sheet in a document.
    pub key: String,
    /// Style rules.
    pub css: String,
}

impl StyleSheet {
    /// Creates a style sheet.
    pub fn new(key: impl Into<String>, css: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            css: css.into(),
        }
    }
}

/// Renderer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Element id the root is attached to.
    pub mount_point: String,
    /// Checks made for the mount point before giving up.
    pub max_attempts: u32,
    /// Delay between checks, in milliseconds.
    pub retry_backoff_ms: u64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            mount_point: DEFAULT_MOUNT_POINT.to_string(),
            max_attempts: 20,
            retry_backoff_ms: 50,
        }
    }
}

impl RendererConfig {
    /// Sets the mount point id.
    pub fn with_mount_point(mut self, mount_point: impl Into<String>) -> Self {
        self.mount_point = mount_point.into();
        self
    }

    /// Sets the retry budget.
    pub fn with_retries(mut self, max_attempts: u32, backoff: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Delay between mount point checks.
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// Scheduled re-check of a popup's mount point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountRetryMsg {
    /// Popup name.
    pub name: String,
    tag: u64,
}

/// Delivered when a pending mount gives up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountFailedMsg {
    /// Popup name.
    pub name: String,
    /// Why the mount failed.
    pub error: MountError,
}

/// Mount state of one popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountStatus {
    /// Waiting for the mount point.
    Pending {
        /// Checks made so far.
        attempts: u32,
    },
    /// A root is attached and rendered.
    Mounted,
    /// The mount point never appeared.
    Failed {
        /// Checks made before giving up.
        attempts: u32,
    },
}

/// Result of [`CrossWindowRenderer::mount`].
pub enum MountOutcome {
    /// The view was rendered.
    Rendered {
        /// Renders performed into this popup so far.
        renders: u64,
    },
    /// The mount point is not ready yet.
    Pending {
        /// Retry loop to run, absent when one is already armed.
        retry: Option<Cmd>,
    },
}

impl MountOutcome {
    /// Whether the view was rendered.
    pub fn is_rendered(&self) -> bool {
        matches!(self, MountOutcome::Rendered { .. })
    }

    /// The command to hand to the runtime, if any.
    pub fn into_cmd(self) -> Option<Cmd> {
        match self {
            MountOutcome::Rendered { .. } => None,
            MountOutcome::Pending { retry } => retry,
        }
    }
}

impl std::fmt::Debug for MountOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MountOutcome::Rendered { renders } => f
                .debug_struct("Rendered")
                .field("renders", renders)
                .finish(),
            MountOutcome::Pending { retry } => f
                .debug_struct("Pending")
                .field("retry", &retry.is_some())
                .finish(),
        }
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Minimal popup document: a title and an empty mount point.
pub fn popup_shell_html(title: &str, mount_point: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n  <meta charset=\"UTF-8\">\n  \
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n  \
         <title>{}</title>\n</head>\n<body>\n  <div id=\"{}\"></div>\n</body>\n</html>\n",
        escape(title),
        escape(mount_point)
    )
}

struct Mount {
    handle: PopupHandle,
    /// Title of the shell this renderer wrote, if it wrote one.
    title: Option<String>,
    /// Generation of the shell this renderer wrote.
    shell: Option<u64>,
    /// Sheets to restore when the document is re-initialized.
    sheets: Vec<StyleSheet>,
    /// Generation the current sheets were verified against.
    styled: Option<u64>,
    root: Option<(RootId, u64)>,
    content: String,
    attempts: u32,
    /// Tag of the armed retry loop, 0 when none.
    tag: u64,
    failed: bool,
    renders: u64,
}

impl Mount {
    fn new(handle: PopupHandle) -> Self {
        Self {
            handle,
            title: None,
            shell: None,
            sheets: Vec::new(),
            styled: None,
            root: None,
            content: String::new(),
            attempts: 0,
            tag: 0,
            failed: false,
            renders: 0,
        }
    }

    fn status(&self) -> MountStatus {
        if self.failed {
            MountStatus::Failed {
                attempts: self.attempts,
            }
        } else if self.tag != 0 || self.root.is_none() {
            MountStatus::Pending {
                attempts: self.attempts,
            }
        } else {
            MountStatus::Mounted
        }
    }

    fn remember(&mut self, sheets: &[StyleSheet]) {
        for sheet in sheets {
            match self.sheets.iter_mut().find(|s| s.key == sheet.key) {
                Some(existing) => *existing = sheet.clone(),
                None => self.sheets.push(sheet.clone()),
            }
        }
    }
}

enum Attempt {
    Rendered,
    NotReady,
}

fn inject_missing(doc: &mut DocumentAccess<'_>, sheets: &[StyleSheet]) -> Result<usize, HostError> {
    let mut injected = 0;
    for sheet in sheets {
        if !doc.has_style(&sheet.key) {
            doc.inject_style(&sheet.key, &sheet.css)?;
            injected += 1;
        }
    }
    Ok(injected)
}

/// Writes the shell and restores the remembered styles.
fn initialize(
    config: &RendererConfig,
    mount: &mut Mount,
    doc: &mut DocumentAccess<'_>,
    title: &str,
) -> Result<u64, HostError> {
    doc.write(&popup_shell_html(title, &config.mount_point))?;
    doc.set_title(title)?;
    let generation = doc.generation()?;
    inject_missing(doc, &mount.sheets)?;
    mount.shell = Some(generation);
    mount.styled = Some(generation);
    mount.root = None;
    Ok(generation)
}

fn attempt(
    config: &RendererConfig,
    mount: &mut Mount,
    doc: &mut DocumentAccess<'_>,
) -> Result<Attempt, MountError> {
    let mut generation = doc.generation()?;

    if let (Some(shell), Some(title)) = (mount.shell, mount.title.clone()) {
        if shell != generation {
            tracing::warn!(
                popup = mount.handle.name(),
                "popup document was replaced, re-initializing"
            );
            generation = initialize(config, mount, doc, &title)?;
        }
    }

    if let Some((root, root_generation)) = mount.root {
        if root_generation == generation {
            match doc.render_root(root, &mount.content) {
                Ok(()) => {
                    mount.renders += 1;
                    return Ok(Attempt::Rendered);
                }
                Err(HostError::UnknownRoot(_)) => {}
                Err(err) => return Err(err.into()),
            }
        }
        tracing::debug!(popup = mount.handle.name(), "dropping root of a stale document");
        mount.root = None;
    }

    if !doc.has_element(&config.mount_point) {
        return Ok(Attempt::NotReady);
    }

    let root = doc.create_root(&config.mount_point).map_err(|err| match err {
        HostError::RootExists(_) => MountError::RootConflict(mount.handle.name().to_string()),
        err => MountError::Host(err),
    })?;
    mount.root = Some((root, generation));
    doc.render_root(root, &mount.content)?;
    mount.renders += 1;
    tracing::debug!(popup = mount.handle.name(), "root mounted");
    Ok(Attempt::Rendered)
}

fn retry(name: &str, tag: u64, backoff: Duration) -> Cmd {
    let name = name.to_string();
    bubbletea_tick(backoff, move |_| {
        Box::new(MountRetryMsg {
            name: name.clone(),
            tag,
        }) as Msg
    })
}

fn failed(name: &str, error: MountError) -> Cmd {
    let name = name.to_string();
    bubbletea_tick(Duration::from_nanos(1), move |_| {
        Box::new(MountFailedMsg {
            name: name.clone(),
            error: error.clone(),
        }) as Msg
    })
}

/// Mounts views into popup documents, one root per document.
///
/// The renderer never owns the windows: every operation goes through the
/// [`PopupManager`], which re-validates the handle first. A handle that no
/// longer validates makes the renderer forget the popup.
///
/// # Examples
///
/// ```rust
/// use auction_display::popup::{HeadlessHost, PopupConfig, PopupManager};
/// use auction_display::renderer::{CrossWindowRenderer, RendererConfig};
///
/// let host = HeadlessHost::new();
/// let mut popups = PopupManager::new(host.clone());
/// let handle = popups
///     .open("about:blank", "board", &PopupConfig::default())
///     .unwrap()
///     .handle;
///
/// let mut renderer = CrossWindowRenderer::new(RendererConfig::default());
/// renderer.prepare(&mut popups, &handle, "Board").unwrap();
/// assert!(renderer.mount(&mut popups, &handle, &"Lot 7").unwrap().is_rendered());
/// assert!(renderer.mount(&mut popups, &handle, &"Lot 8").unwrap().is_rendered());
///
/// assert_eq!(host.roots_created(handle.window()), 1);
/// assert_eq!(host.content(handle.window(), "auction-popup-root").as_deref(), Some("Lot 8"));
/// ```
pub struct CrossWindowRenderer {
    config: RendererConfig,
    mounts: BTreeMap<String, Mount>,
    next_tag: u64,
}

impl std::fmt::Debug for CrossWindowRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrossWindowRenderer")
            .field("config", &self.config)
            .field("mounts", &self.mounts.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for CrossWindowRenderer {
    fn default() -> Self {
        Self::new(RendererConfig::default())
    }
}

impl CrossWindowRenderer {
    /// Creates a renderer.
    pub fn new(config: RendererConfig) -> Self {
        Self {
            config,
            mounts: BTreeMap::new(),
            next_tag: 0,
        }
    }

    /// Renderer settings.
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    fn fresh_tag(&mut self) -> u64 {
        self.next_tag += 1;
        self.next_tag
    }

    /// State for `handle`, replacing state left by an earlier opening.
    fn entry(&mut self, handle: &PopupHandle) -> &mut Mount {
        let mount = self
            .mounts
            .entry(handle.name().to_string())
            .or_insert_with(|| Mount::new(handle.clone()));
        if mount.handle != *handle {
            *mount = Mount::new(handle.clone());
        }
        mount
    }

    fn gone(&mut self, handle: &PopupHandle, err: impl Into<MountError>) -> MountError {
        let err = err.into();
        if matches!(err, MountError::WindowGone(_)) {
            tracing::warn!(popup = handle.name(), "popup is gone, forgetting its mount");
            self.mounts.remove(handle.name());
        }
        err
    }

    /// Writes the popup shell document with `title`, the mount point and the
    /// base styles.
    ///
    /// A prepared document that the platform later replaces is re-initialized
    /// by the next mount.
    pub fn prepare(
        &mut self,
        popups: &mut PopupManager,
        handle: &PopupHandle,
        title: &str,
    ) -> Result<(), MountError> {
        let mut doc = match popups.document(handle) {
            Ok(doc) => doc,
            Err(err) => return Err(self.gone(handle, err)),
        };
        let config = self.config.clone();
        let mount = self.entry(handle);
        mount.title = Some(title.to_string());
        mount.remember(std::slice::from_ref(&*POPUP_BASE_STYLES));
        initialize(&config, mount, &mut doc, title)?;
        tracing::debug!(popup = handle.name(), "popup document prepared");
        Ok(())
    }

    /// Updates the popup title. A re-initialized document gets the new title.
    pub fn set_title(
        &mut self,
        popups: &mut PopupManager,
        handle: &PopupHandle,
        title: &str,
    ) -> Result<(), MountError> {
        let mut doc = match popups.document(handle) {
            Ok(doc) => doc,
            Err(err) => return Err(self.gone(handle, err)),
        };
        doc.set_title(title)?;
        let mount = self.entry(handle);
        if mount.title.is_some() {
            mount.title = Some(title.to_string());
        }
        Ok(())
    }

    /// Renders `view` into the popup.
    ///
    /// Creates the root on first use and reuses it afterwards. When the mount
    /// point is not there yet a retry loop is armed; it delivers
    /// [`MountRetryMsg`]s to [`CrossWindowRenderer::update`] and, once the
    /// budget is spent, a [`MountFailedMsg`]. Calls made while a loop is armed
    /// only replace the content it will render.
    pub fn mount(
        &mut self,
        popups: &mut PopupManager,
        handle: &PopupHandle,
        view: &dyn PopupView,
    ) -> Result<MountOutcome, MountError> {
        let mut doc = match popups.document(handle) {
            Ok(doc) => doc,
            Err(err) => return Err(self.gone(handle, err)),
        };
        let config = self.config.clone();
        let tag = self.fresh_tag();
        let mount = self.entry(handle);
        mount.content = view.view();

        if mount.tag != 0 {
            return Ok(MountOutcome::Pending { retry: None });
        }

        match attempt(&config, mount, &mut doc)? {
            Attempt::Rendered => {
                mount.failed = false;
                mount.attempts = 0;
                Ok(MountOutcome::Rendered {
                    renders: mount.renders,
                })
            }
            Attempt::NotReady if config.max_attempts <= 1 => {
                mount.failed = true;
                mount.attempts = 1;
                tracing::warn!(popup = handle.name(), attempts = 1, "mount point never appeared");
                Err(MountError::Timeout {
                    name: handle.name().to_string(),
                    attempts: 1,
                })
            }
            Attempt::NotReady => {
                mount.failed = false;
                mount.attempts = 1;
                mount.tag = tag;
                tracing::debug!(popup = handle.name(), "mount point not ready, retrying");
                Ok(MountOutcome::Pending {
                    retry: Some(retry(handle.name(), tag, config.retry_backoff())),
                })
            }
        }
    }

    /// Handles a [`MountRetryMsg`]; other messages are ignored.
    pub fn update(&mut self, popups: &mut PopupManager, msg: Msg) -> Option<Cmd> {
        let retry_msg = msg.downcast_ref::<MountRetryMsg>()?;
        let mount = self.mounts.get(&retry_msg.name)?;
        if mount.tag == 0 || mount.tag != retry_msg.tag {
            return None;
        }
        let handle = mount.handle.clone();
        let name = retry_msg.name.as_str();

        let mut doc = match popups.document(&handle) {
            Ok(doc) => doc,
            Err(err) => {
                let err = self.gone(&handle, err);
                return Some(failed(name, err));
            }
        };
        let config = self.config.clone();
        let mount = self.mounts.get_mut(name)?;
        mount.attempts += 1;

        match attempt(&config, mount, &mut doc) {
            Ok(Attempt::Rendered) => {
                mount.tag = 0;
                tracing::debug!(popup = name, attempts = mount.attempts, "mounted after retry");
                None
            }
            Ok(Attempt::NotReady) if mount.attempts >= config.max_attempts => {
                mount.tag = 0;
                mount.failed = true;
                tracing::warn!(popup = name, attempts = mount.attempts, "mount point never appeared");
                Some(failed(
                    name,
                    MountError::Timeout {
                        name: name.to_string(),
                        attempts: mount.attempts,
                    },
                ))
            }
            Ok(Attempt::NotReady) => Some(retry(name, mount.tag, config.retry_backoff())),
            Err(err) => {
                mount.tag = 0;
                mount.failed = true;
                tracing::warn!(popup = name, error = %err, "mount failed");
                Some(failed(name, err))
            }
        }
    }

    /// Retry message matching the armed loop for `name`, if any.
    pub fn retry_msg(&self, name: &str) -> Option<MountRetryMsg> {
        self.mounts
            .get(name)
            .filter(|mount| mount.tag != 0)
            .map(|mount| MountRetryMsg {
                name: name.to_string(),
                tag: mount.tag,
            })
    }

    /// Tears the popup's root down and forgets the popup.
    ///
    /// Returns `false` when nothing was mounted, including on repeated calls.
    pub fn unmount(&mut self, popups: &mut PopupManager, handle: &PopupHandle) -> bool {
        if self
            .mounts
            .get(handle.name())
            .map_or(true, |mount| mount.handle != *handle)
        {
            return false;
        }
        let Some((root, generation)) = self
            .mounts
            .remove(handle.name())
            .and_then(|mount| mount.root)
        else {
            return false;
        };
        let Ok(mut doc) = popups.document(handle) else {
            return false;
        };
        if doc.generation().ok() != Some(generation) {
            return false;
        }
        match doc.unmount_root(root) {
            Ok(()) => {
                tracing::debug!(popup = handle.name(), "root unmounted");
                true
            }
            Err(err) => {
                tracing::warn!(popup = handle.name(), error = %err, "unmount failed");
                false
            }
        }
    }

    /// Drops every piece of state kept for `name` without touching its window.
    pub fn forget(&mut self, name: &str) -> bool {
        self.mounts.remove(name).is_some()
    }

    /// Injects the sheets that are missing from the popup's document.
    ///
    /// Sheets are remembered and restored whenever the renderer re-initializes
    /// the document. Without `force`, a document already checked since its
    /// last replacement is not checked again; with `force` every key is
    /// re-checked. A sheet whose key is present is never injected twice.
    /// Returns how many sheets were injected.
    pub fn apply_styles(
        &mut self,
        popups: &mut PopupManager,
        handle: &PopupHandle,
        sheets: &[StyleSheet],
        force: bool,
    ) -> Result<usize, MountError> {
        let mut doc = match popups.document(handle) {
            Ok(doc) => doc,
            Err(err) => return Err(self.gone(handle, err)),
        };
        let generation = doc.generation()?;
        let mount = self.entry(handle);
        let known = sheets
            .iter()
            .all(|sheet| mount.sheets.iter().any(|s| s.key == sheet.key));
        mount.remember(sheets);
        if !force && known && mount.styled == Some(generation) {
            return Ok(0);
        }
        let injected = inject_missing(&mut doc, sheets)?;
        mount.styled = Some(generation);
        if injected > 0 {
            tracing::debug!(popup = handle.name(), injected, "styles applied");
        }
        Ok(injected)
    }

    /// Mount state of `name`.
    pub fn status(&self, name: &str) -> Option<MountStatus> {
        self.mounts.get(name).map(Mount::status)
    }

    /// Renders performed into `name` since it was first mounted.
    pub fn renders(&self, name: &str) -> u64 {
        self.mounts.get(name).map_or(0, |mount| mount.renders)
    }

    /// Number of popups with an attached root.
    pub fn root_count(&self) -> usize {
        self.mounts
            .values()
            .filter(|mount| mount.root.is_some())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::popup::{HeadlessHost, PopupConfig, WindowHost};

    fn setup() -> (HeadlessHost, PopupManager, PopupHandle, CrossWindowRenderer) {
        let host = HeadlessHost::new();
        let mut popups = PopupManager::new(host.clone());
        let handle = popups
            .open("about:blank", "board", &PopupConfig::default().protected())
            .unwrap()
            .handle;
        (host, popups, handle, CrossWindowRenderer::default())
    }

    fn content(host: &HeadlessHost, handle: &PopupHandle) -> Option<String> {
        host.content(handle.window(), DEFAULT_MOUNT_POINT)
    }

    #[test]
    fn test_mount_reuses_single_root() {
        let (host, mut popups, handle, mut renderer) = setup();
        renderer.prepare(&mut popups, &handle, "Board").unwrap();

        for lot in 1..=3 {
            let view = format!("Lot {lot}");
            let outcome = renderer.mount(&mut popups, &handle, &view).unwrap();
            assert!(outcome.is_rendered());
        }

        assert_eq!(host.roots_created(handle.window()), 1);
        assert_eq!(host.live_roots(handle.window()), 1);
        assert_eq!(renderer.renders("board"), 3);
        assert_eq!(renderer.root_count(), 1);
        assert_eq!(renderer.status("board"), Some(MountStatus::Mounted));
        assert_eq!(content(&host, &handle).as_deref(), Some("Lot 3"));
        assert_eq!(host.title(handle.window()).as_deref(), Some("Board"));
    }

    #[test]
    fn test_waits_for_mount_point() {
        let (host, mut popups, handle, mut renderer) = setup();
        renderer.prepare(&mut popups, &handle, "Board").unwrap();
        host.defer_ready(handle.window(), 3);

        let outcome = renderer.mount(&mut popups, &handle, &"first").unwrap();
        assert!(outcome.into_cmd().is_some());
        assert_eq!(renderer.status("board"), Some(MountStatus::Pending { attempts: 1 }));

        // A second mount while waiting only swaps the content.
        let outcome = renderer.mount(&mut popups, &handle, &"second").unwrap();
        assert!(matches!(outcome, MountOutcome::Pending { retry: None }));

        let mut retries = 0;
        while let Some(msg) = renderer.retry_msg("board") {
            renderer.update(&mut popups, Box::new(msg));
            retries += 1;
        }

        assert_eq!(retries, 3);
        assert_eq!(renderer.status("board"), Some(MountStatus::Mounted));
        assert_eq!(host.roots_created(handle.window()), 1);
        assert_eq!(content(&host, &handle).as_deref(), Some("second"));
    }

    #[test]
    fn test_mount_times_out_after_budget() {
        let (host, mut popups, handle, mut renderer) = setup();
        host.defer_ready(handle.window(), 100);

        renderer.mount(&mut popups, &handle, &"board").unwrap();
        let mut retries = 0;
        while let Some(msg) = renderer.retry_msg("board") {
            assert!(renderer.update(&mut popups, Box::new(msg)).is_some());
            retries += 1;
        }

        assert_eq!(retries, 19);
        assert_eq!(
            renderer.status("board"),
            Some(MountStatus::Failed { attempts: 20 })
        );
        assert_eq!(host.roots_created(handle.window()), 0);
    }

    #[test]
    fn test_stale_retry_is_ignored() {
        let (host, mut popups, handle, mut renderer) = setup();
        host.defer_ready(handle.window(), 100);
        renderer.mount(&mut popups, &handle, &"board").unwrap();
        let msg = renderer.retry_msg("board").unwrap();

        assert!(!renderer.unmount(&mut popups, &handle));
        assert!(renderer.update(&mut popups, Box::new(msg)).is_none());
        assert_eq!(renderer.status("board"), None);
    }

    #[test]
    fn test_unmount_is_idempotent() {
        let (host, mut popups, handle, mut renderer) = setup();
        renderer.prepare(&mut popups, &handle, "Board").unwrap();
        renderer.mount(&mut popups, &handle, &"board").unwrap();

        assert!(renderer.unmount(&mut popups, &handle));
        assert!(!renderer.unmount(&mut popups, &handle));
        assert_eq!(host.live_roots(handle.window()), 0);
        assert_eq!(renderer.root_count(), 0);

        // The freed mount point accepts a new root.
        assert!(renderer
            .mount(&mut popups, &handle, &"again")
            .unwrap()
            .is_rendered());
        assert_eq!(host.live_roots(handle.window()), 1);
    }

    #[test]
    fn test_replaced_document_is_reinitialized() {
        let (host, mut popups, handle, mut renderer) = setup();
        renderer.prepare(&mut popups, &handle, "Board").unwrap();
        renderer.mount(&mut popups, &handle, &"before").unwrap();

        host.replace_document(handle.window());
        assert!(host.styles(handle.window()).is_empty());

        let outcome = renderer.mount(&mut popups, &handle, &"after").unwrap();
        assert!(outcome.is_rendered());
        assert_eq!(host.roots_created(handle.window()), 2);
        assert_eq!(host.live_roots(handle.window()), 1);
        assert_eq!(host.title(handle.window()).as_deref(), Some("Board"));
        assert_eq!(host.styles(handle.window()), vec!["popup-base".to_string()]);
        assert_eq!(content(&host, &handle).as_deref(), Some("after"));
    }

    #[test]
    fn test_closed_popup_is_forgotten() {
        let (host, mut popups, handle, mut renderer) = setup();
        renderer.prepare(&mut popups, &handle, "Board").unwrap();
        renderer.mount(&mut popups, &handle, &"board").unwrap();
        host.simulate_user_close(handle.window());

        let err = renderer.mount(&mut popups, &handle, &"board").unwrap_err();
        assert_eq!(err, MountError::WindowGone("board".to_string()));
        assert_eq!(renderer.status("board"), None);
        assert_eq!(renderer.root_count(), 0);
        assert!(!renderer.unmount(&mut popups, &handle));
    }

    #[test]
    fn test_closed_popup_fails_pending_mount() {
        let (host, mut popups, handle, mut renderer) = setup();
        host.defer_ready(handle.window(), 100);
        renderer.mount(&mut popups, &handle, &"board").unwrap();
        let msg = renderer.retry_msg("board").unwrap();

        host.simulate_user_close(handle.window());
        assert!(renderer.update(&mut popups, Box::new(msg)).is_some());
        assert_eq!(renderer.status("board"), None);
    }

    #[test]
    fn test_foreign_root_is_a_conflict() {
        let (_host, mut popups, handle, mut renderer) = setup();
        renderer.prepare(&mut popups, &handle, "Board").unwrap();
        popups
            .document(&handle)
            .unwrap()
            .create_root(DEFAULT_MOUNT_POINT)
            .unwrap();

        let err = renderer.mount(&mut popups, &handle, &"board").unwrap_err();
        assert_eq!(err, MountError::RootConflict("board".to_string()));
    }

    #[test]
    fn test_styles_are_not_duplicated() {
        let (host, mut popups, handle, mut renderer) = setup();
        renderer.prepare(&mut popups, &handle, "Board").unwrap();
        let board = StyleSheet::new("board", ".board { color: #333; }");
        let sheets = [POPUP_BASE_STYLES.clone(), board];

        assert_eq!(renderer.apply_styles(&mut popups, &handle, &sheets, false).unwrap(), 1);
        assert_eq!(renderer.apply_styles(&mut popups, &handle, &sheets, false).unwrap(), 0);
        assert_eq!(renderer.apply_styles(&mut popups, &handle, &sheets, true).unwrap(), 0);

        host.drop_styles(handle.window());
        assert_eq!(renderer.apply_styles(&mut popups, &handle, &sheets, false).unwrap(), 0);
        assert_eq!(renderer.apply_styles(&mut popups, &handle, &sheets, true).unwrap(), 2);
        assert_eq!(
            host.styles(handle.window()),
            vec!["popup-base".to_string(), "board".to_string()]
        );
    }

    #[test]
    fn test_reopened_popup_starts_fresh() {
        let (host, mut popups, handle, mut renderer) = setup();
        renderer.prepare(&mut popups, &handle, "Board").unwrap();
        renderer.mount(&mut popups, &handle, &"old").unwrap();

        let reopened = popups
            .open("about:blank", "board", &PopupConfig::default().protected())
            .unwrap()
            .handle;
        assert!(host.is_closed(handle.window()));

        renderer.prepare(&mut popups, &reopened, "Board").unwrap();
        renderer.mount(&mut popups, &reopened, &"new").unwrap();
        assert_eq!(renderer.renders("board"), 1);
        assert_eq!(host.live_roots(reopened.window()), 1);
        assert!(!renderer.unmount(&mut popups, &handle));
    }

    #[test]
    fn test_shell_html_has_mount_point_and_escaped_title() {
        let html = popup_shell_html("Lot <7> & co", DEFAULT_MOUNT_POINT);
        assert!(html.contains("<title>Lot &lt;7&gt; &amp; co</title>"));
        assert!(html.contains("<div id=\"auction-popup-root\"></div>"));
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: RendererConfig = serde_json::from_str(r#"{"max_attempts": 5}"#).unwrap();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.mount_point, DEFAULT_MOUNT_POINT);
        assert_eq!(config.retry_backoff(), Duration::from_millis(50));
    }
}
