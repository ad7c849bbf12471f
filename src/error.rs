//! Error types for the display engine.
//!
//! Every failure in this crate is recoverable. Operations return these errors
//! as status values and log them; none of them is allowed to unwind through a
//! scheduled callback.

use crate::popup::WindowId;

/// Failures reported by [`crate::timer::TimerRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimerError {
    /// No timer is registered under the given id.
    #[error("timer '{0}' not found")]
    UnknownTimer(String),
    /// A timer cannot be created or reset with a negative duration.
    #[error("timer '{id}' cannot use a negative duration ({seconds}s)")]
    NegativeDuration {
        /// Timer id.
        id: String,
        /// Rejected duration in seconds.
        seconds: i64,
    },
    /// Tick intervals must be strictly positive.
    #[error("timer '{0}' needs a positive tick interval")]
    ZeroInterval(String),
    /// A countdown that already completed has to be reset before it can start.
    #[error("timer '{0}' has already completed")]
    AlreadyCompleted(String),
    /// Pause was requested on a timer that is not ticking.
    #[error("timer '{0}' is not running")]
    NotRunning(String),
    /// Resume was requested on a timer that is not paused.
    #[error("timer '{0}' is not paused")]
    NotPaused(String),
    /// The operation only applies to the other timer mode.
    #[error("timer '{0}' does not support this operation in its current mode")]
    ModeMismatch(String),
}

/// Failures reported by a [`crate::popup::WindowHost`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    /// The host never issued this window id.
    #[error("unknown window {0:?}")]
    UnknownWindow(WindowId),
    /// The window exists but has been closed.
    #[error("window {0:?} is closed")]
    WindowClosed(WindowId),
    /// The document has no element with the requested id.
    #[error("element '{0}' not found in document")]
    MissingElement(String),
    /// A second root was requested for an element that already hosts one.
    #[error("element '{0}' already hosts a root")]
    RootExists(String),
    /// The root id does not belong to the live document.
    #[error("root {0} is not mounted in the live document")]
    UnknownRoot(u64),
}

/// Failures reported by [`crate::popup::PopupManager`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PopupError {
    /// The platform refused to open the window.
    #[error("popup '{0}' was blocked")]
    Blocked(String),
    /// Nothing is tracked under this name.
    #[error("popup '{0}' is not tracked")]
    NotTracked(String),
    /// The handle no longer refers to a live window.
    #[error("popup '{0}' is gone")]
    WindowGone(String),
    /// The host rejected a document operation.
    #[error(transparent)]
    Host(#[from] HostError),
}

/// Failures reported by [`crate::renderer::CrossWindowRenderer`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MountError {
    /// The popup closed or its handle was retired.
    #[error("popup '{0}' is gone")]
    WindowGone(String),
    /// The mount point never appeared within the retry budget.
    #[error("mount point in popup '{name}' not ready after {attempts} attempts")]
    Timeout {
        /// Popup name.
        name: String,
        /// Number of attempts made.
        attempts: u32,
    },
    /// The document already holds a root this renderer does not own.
    #[error("popup '{0}' already hosts a foreign root")]
    RootConflict(String),
    /// The host rejected a document operation.
    #[error(transparent)]
    Host(#[from] HostError),
}

impl From<PopupError> for MountError {
    fn from(err: PopupError) -> Self {
        match err {
            PopupError::Blocked(name)
            | PopupError::NotTracked(name)
            | PopupError::WindowGone(name) => MountError::WindowGone(name),
            PopupError::Host(err) => MountError::Host(err),
        }
    }
}

/// Failures reported by [`crate::display::AuctionDisplayController`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DisplayError {
    /// The display window could not be opened.
    #[error("display window '{0}' was blocked by the platform")]
    PopupBlocked(String),
    /// The requested phase change is not allowed from the current phase.
    #[error("cannot {action} while the auction is {phase}")]
    InvalidTransition {
        /// Requested action.
        action: &'static str,
        /// Current phase.
        phase: crate::display::Phase,
    },
    /// Timer registry failure.
    #[error(transparent)]
    Timer(#[from] TimerError),
    /// Popup lifecycle failure.
    #[error(transparent)]
    Popup(#[from] PopupError),
    /// Renderer failure.
    #[error(transparent)]
    Mount(#[from] MountError),
}
