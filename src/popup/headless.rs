//! An in-memory [`WindowHost`] for tests and headless embedding.

use super::host::{RootId, WindowHost, WindowId};
use crate::error::HostError;
use lipgloss_extras::lipgloss;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Root {
    element: String,
    content: String,
    renders: u64,
}

#[derive(Debug, Default)]
struct Document {
    generation: u64,
    title: String,
    elements: BTreeSet<String>,
    styles: Vec<String>,
    roots: BTreeMap<RootId, Root>,
}

impl Document {
    fn parse(generation: u64, html: &str) -> Self {
        Self {
            generation,
            title: between(html, "<title>", "</title>").unwrap_or_default().to_string(),
            elements: element_ids(html),
            ..Self::default()
        }
    }
}

#[derive(Debug)]
struct Window {
    name: String,
    url: String,
    features: String,
    closed: bool,
    close_requests: u32,
    /// Upcoming `has_element` checks that report the element missing.
    deferred_checks: u32,
    roots_created: u64,
    document: Document,
}

#[derive(Debug)]
struct State {
    screen: (u32, u32),
    blocked: bool,
    next_window: u64,
    next_root: u64,
    next_generation: u64,
    windows: BTreeMap<WindowId, Window>,
}

impl State {
    fn window(&self, id: WindowId) -> Result<&Window, HostError> {
        match self.windows.get(&id) {
            Some(window) if !window.closed => Ok(window),
            Some(_) => Err(HostError::WindowClosed(id)),
            None => Err(HostError::UnknownWindow(id)),
        }
    }

    fn window_mut(&mut self, id: WindowId) -> Result<&mut Window, HostError> {
        match self.windows.get_mut(&id) {
            Some(window) if !window.closed => Ok(window),
            Some(_) => Err(HostError::WindowClosed(id)),
            None => Err(HostError::UnknownWindow(id)),
        }
    }

    fn generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }
}

fn between<'a>(text: &'a str, open: &str, close: &str) -> Option<&'a str> {
    let start = text.find(open)? + open.len();
    let end = text[start..].find(close)? + start;
    Some(&text[start..end])
}

fn element_ids(html: &str) -> BTreeSet<String> {
    let mut ids = BTreeSet::new();
    let mut rest = html;
    while let Some(pos) = rest.find("id=\"") {
        rest = &rest[pos + 4..];
        if let Some(end) = rest.find('"') {
            ids.insert(rest[..end].to_string());
            rest = &rest[end..];
        }
    }
    ids
}

/// A scriptable, in-memory window platform.
///
/// Clones share state: keep one clone for inspection and hand the other to a
/// [`super::PopupManager`]. Besides implementing [`WindowHost`] it lets tests
/// act as the platform or the user: block popups, close windows, replace
/// documents and delay mount points.
///
/// ```rust
/// use auction_display::popup::{HeadlessHost, WindowHost};
///
/// let mut host = HeadlessHost::new();
/// let window = host.open_window("about:blank", "board", "width=800").unwrap();
/// host.simulate_user_close(window);
/// assert!(host.is_closed(window));
/// ```
#[derive(Debug, Clone)]
pub struct HeadlessHost {
    state: Arc<Mutex<State>>,
}

impl Default for HeadlessHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessHost {
    /// Creates a host with a 1920x1080 screen.
    pub fn new() -> Self {
        Self::with_screen(1920, 1080)
    }

    /// Creates a host with the given screen size.
    pub fn with_screen(width: u32, height: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                screen: (width, height),
                blocked: false,
                next_window: 0,
                next_root: 0,
                next_generation: 0,
                windows: BTreeMap::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes subsequent opens fail as if a popup blocker intervened.
    pub fn set_blocked(&self, blocked: bool) {
        self.lock().blocked = blocked;
    }

    /// Closes the window the way a user would, without telling anyone.
    pub fn simulate_user_close(&self, window: WindowId) {
        if let Some(window) = self.lock().windows.get_mut(&window) {
            window.closed = true;
        }
    }

    /// Navigates the window to a blank document, dropping every element,
    /// style and root of the current one.
    pub fn replace_document(&self, window: WindowId) {
        let mut state = self.lock();
        let generation = state.generation();
        if let Some(window) = state.windows.get_mut(&window) {
            window.document = Document {
                generation,
                ..Document::default()
            };
        }
    }

    /// Makes the next `checks` element lookups in the window fail.
    pub fn defer_ready(&self, window: WindowId, checks: u32) {
        if let Some(window) = self.lock().windows.get_mut(&window) {
            window.deferred_checks = checks;
        }
    }

    /// Removes every injected style from the window's document.
    pub fn drop_styles(&self, window: WindowId) {
        if let Some(window) = self.lock().windows.get_mut(&window) {
            window.document.styles.clear();
        }
    }

    /// Number of windows ever opened.
    pub fn opened(&self) -> usize {
        self.lock().windows.len()
    }

    /// The most recently opened, still open window with this name.
    pub fn window_named(&self, name: &str) -> Option<WindowId> {
        self.lock()
            .windows
            .iter()
            .rev()
            .find(|(_, window)| !window.closed && window.name == name)
            .map(|(id, _)| *id)
    }

    /// URL the window was opened with.
    pub fn url(&self, window: WindowId) -> Option<String> {
        self.lock().windows.get(&window).map(|w| w.url.clone())
    }

    /// Feature string the window was opened with.
    pub fn features(&self, window: WindowId) -> Option<String> {
        self.lock().windows.get(&window).map(|w| w.features.clone())
    }

    /// How many times the application asked the window to close.
    pub fn close_requests(&self, window: WindowId) -> u32 {
        self.lock()
            .windows
            .get(&window)
            .map_or(0, |w| w.close_requests)
    }

    /// Title of the window's current document.
    pub fn title(&self, window: WindowId) -> Option<String> {
        self.lock()
            .windows
            .get(&window)
            .map(|w| w.document.title.clone())
    }

    /// Keys of the styles present in the window's current document.
    pub fn styles(&self, window: WindowId) -> Vec<String> {
        self.lock()
            .windows
            .get(&window)
            .map(|w| w.document.styles.clone())
            .unwrap_or_default()
    }

    /// Number of live roots in the window's current document.
    pub fn live_roots(&self, window: WindowId) -> usize {
        self.lock()
            .windows
            .get(&window)
            .map_or(0, |w| w.document.roots.len())
    }

    /// Number of roots ever created in the window.
    pub fn roots_created(&self, window: WindowId) -> u64 {
        self.lock()
            .windows
            .get(&window)
            .map_or(0, |w| w.roots_created)
    }

    /// Total renders performed by the window's live roots.
    pub fn render_count(&self, window: WindowId) -> u64 {
        self.lock()
            .windows
            .get(&window)
            .map_or(0, |w| w.document.roots.values().map(|r| r.renders).sum())
    }

    /// Plain text shown by the live root bound to `element_id`.
    pub fn content(&self, window: WindowId, element_id: &str) -> Option<String> {
        let state = self.lock();
        let window = state.windows.get(&window)?;
        window
            .document
            .roots
            .values()
            .find(|root| root.element == element_id)
            .map(|root| lipgloss::strip_ansi(&root.content))
    }
}

impl WindowHost for HeadlessHost {
    fn screen_size(&self) -> (u32, u32) {
        self.lock().screen
    }

    fn open_window(&mut self, url: &str, name: &str, features: &str) -> Option<WindowId> {
        let mut state = self.lock();
        if state.blocked {
            return None;
        }
        state.next_window += 1;
        let id = WindowId(state.next_window);
        let generation = state.generation();
        state.windows.insert(
            id,
            Window {
                name: name.to_string(),
                url: url.to_string(),
                features: features.to_string(),
                closed: false,
                close_requests: 0,
                deferred_checks: 0,
                roots_created: 0,
                document: Document {
                    generation,
                    ..Document::default()
                },
            },
        );
        Some(id)
    }

    fn close_window(&mut self, window: WindowId) {
        if let Some(window) = self.lock().windows.get_mut(&window) {
            window.close_requests += 1;
            window.closed = true;
            window.document.roots.clear();
        }
    }

    fn is_closed(&self, window: WindowId) -> bool {
        self.lock().windows.get(&window).map_or(true, |w| w.closed)
    }

    fn document_generation(&self, window: WindowId) -> Result<u64, HostError> {
        Ok(self.lock().window(window)?.document.generation)
    }

    fn write_document(&mut self, window: WindowId, html: &str) -> Result<(), HostError> {
        let mut state = self.lock();
        let generation = state.generation();
        state.window_mut(window)?.document = Document::parse(generation, html);
        Ok(())
    }

    fn has_element(&self, window: WindowId, element_id: &str) -> bool {
        let mut state = self.lock();
        let Ok(window) = state.window_mut(window) else {
            return false;
        };
        if window.deferred_checks > 0 {
            window.deferred_checks -= 1;
            return false;
        }
        window.document.elements.contains(element_id)
    }

    fn set_title(&mut self, window: WindowId, title: &str) -> Result<(), HostError> {
        self.lock().window_mut(window)?.document.title = title.to_string();
        Ok(())
    }

    fn has_style(&self, window: WindowId, key: &str) -> bool {
        self.lock()
            .window(window)
            .is_ok_and(|w| w.document.styles.iter().any(|s| s == key))
    }

    fn inject_style(&mut self, window: WindowId, key: &str, _css: &str) -> Result<(), HostError> {
        self.lock()
            .window_mut(window)?
            .document
            .styles
            .push(key.to_string());
        Ok(())
    }

    fn create_root(&mut self, window: WindowId, element_id: &str) -> Result<RootId, HostError> {
        let mut state = self.lock();
        state.next_root += 1;
        let id = RootId(state.next_root);
        let window = state.window_mut(window)?;
        if !window.document.elements.contains(element_id) {
            return Err(HostError::MissingElement(element_id.to_string()));
        }
        if window
            .document
            .roots
            .values()
            .any(|root| root.element == element_id)
        {
            return Err(HostError::RootExists(element_id.to_string()));
        }
        window.document.roots.insert(
            id,
            Root {
                element: element_id.to_string(),
                ..Root::default()
            },
        );
        window.roots_created += 1;
        Ok(id)
    }

    fn render_root(
        &mut self,
        window: WindowId,
        root: RootId,
        content: &str,
    ) -> Result<(), HostError> {
        let mut state = self.lock();
        let root = state
            .window_mut(window)?
            .document
            .roots
            .get_mut(&root)
            .ok_or(HostError::UnknownRoot(root.0))?;
        root.content = content.to_string();
        root.renders += 1;
        Ok(())
    }

    fn unmount_root(&mut self, window: WindowId, root: RootId) -> Result<(), HostError> {
        self.lock()
            .window_mut(window)?
            .document
            .roots
            .remove(&root)
            .map(|_| ())
            .ok_or(HostError::UnknownRoot(root.0))
    }
}
