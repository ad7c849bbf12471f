//! The platform seam: secondary windows and their documents.

use crate::error::HostError;

/// Host-issued identifier of a secondary window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub u64);

/// Host-issued identifier of a UI root inside a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RootId(pub u64);

/// A windowing platform able to open secondary windows.
///
/// The windows belong to the platform: the user may close them at any time,
/// the platform may refuse to open them, and their documents may be replaced
/// underneath the application. Implementations report those facts; they do
/// not try to hide them.
///
/// Document operations address the window's *current* document. The
/// generation returned by [`WindowHost::document_generation`] changes whenever
/// the document is replaced, which is how callers detect that state they
/// attached to an older document is stale.
pub trait WindowHost: Send {
    /// Screen size in pixels, used to centre new windows.
    fn screen_size(&self) -> (u32, u32);

    /// Opens a window. `None` means the platform blocked it.
    fn open_window(&mut self, url: &str, name: &str, features: &str) -> Option<WindowId>;

    /// Requests the window to close. Closing a closed window is a no-op.
    fn close_window(&mut self, window: WindowId);

    /// Whether the window is closed. Unknown windows count as closed.
    fn is_closed(&self, window: WindowId) -> bool;

    /// Generation of the window's current document.
    fn document_generation(&self, window: WindowId) -> Result<u64, HostError>;

    /// Replaces the window's document with `html`.
    fn write_document(&mut self, window: WindowId, html: &str) -> Result<(), HostError>;

    /// Whether the current document contains an element with this id.
    fn has_element(&self, window: WindowId, element_id: &str) -> bool;

    /// Sets the document title.
    fn set_title(&mut self, window: WindowId, title: &str) -> Result<(), HostError>;

    /// Whether a style resource with this key is present in the document.
    fn has_style(&self, window: WindowId, key: &str) -> bool;

    /// Adds a style resource to the document head.
    fn inject_style(&mut self, window: WindowId, key: &str, css: &str) -> Result<(), HostError>;

    /// Creates a UI root bound to `element_id`. Fails if the element already
    /// hosts a root.
    fn create_root(&mut self, window: WindowId, element_id: &str) -> Result<RootId, HostError>;

    /// Replaces the content rendered by `root`.
    fn render_root(&mut self, window: WindowId, root: RootId, content: &str)
        -> Result<(), HostError>;

    /// Tears `root` down and frees its element.
    fn unmount_root(&mut self, window: WindowId, root: RootId) -> Result<(), HostError>;
}
