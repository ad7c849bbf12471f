//! Phase machine coordinating the countdown, the popup and its content.

use super::views::{AuctionBoardView, AuctionResultView, AuctionResults, AuctionSnapshot, DisplayStyles};
use super::views::{BOARD_STYLES, RESULT_STYLES};
use super::{DisplayConfig, Phase};
use crate::error::{DisplayError, MountError, PopupError};
use crate::popup::{ClosePollMsg, PopupClosedMsg, PopupHandle, PopupManager};
use crate::renderer::{
    CrossWindowRenderer, MountFailedMsg, MountRetryMsg, PopupView, POPUP_BASE_STYLES,
};
use crate::timer::{TickMsg, TimerOptions, TimerRegistry};
use crate::timer_view::{format_countdown, TimerView};
use bubbletea_rs::{batch, Cmd, Msg};

const BLOCKED_NOTICE: &str =
    "The display window was blocked. Allow popups for this site and open it again.";
const CLOSED_NOTICE: &str = "The display window was closed.";
const WAITING: &str = "Waiting for the auction to start";

/// The shared state a controller call works on.
#[derive(Debug)]
pub struct DisplayContext<'a> {
    /// Timer registry of the session.
    pub timers: &'a mut TimerRegistry,
    /// Popup manager of the session.
    pub popups: &'a mut PopupManager,
}

impl<'a> DisplayContext<'a> {
    /// Borrows the registry and the manager for one call.
    pub fn new(timers: &'a mut TimerRegistry, popups: &'a mut PopupManager) -> Self {
        Self { timers, popups }
    }
}

fn merge(cmds: impl IntoIterator<Item = Option<Cmd>>) -> Option<Cmd> {
    let mut cmds: Vec<Cmd> = cmds.into_iter().flatten().collect();
    match cmds.len() {
        0 => None,
        1 => cmds.pop(),
        _ => Some(batch(cmds)),
    }
}

/// Drives the public display of one auction through
/// [`Phase::Setup`] → [`Phase::Active`] → [`Phase::Ended`].
///
/// Every transition updates the popup title, re-applies the phase styles and
/// mounts the phase content exactly once. The popup is optional: a blocked or
/// closed window leaves the controller running with an inline notice.
///
/// # Examples
///
/// ```rust
/// use auction_display::clock::ManualClock;
/// use auction_display::display::{
///     AuctionDisplayController, AuctionSnapshot, DisplayConfig, DisplayContext, Phase,
/// };
/// use auction_display::popup::{HeadlessHost, PopupManager};
/// use auction_display::timer::TimerRegistry;
/// use std::sync::Arc;
///
/// let clock = ManualClock::at(0);
/// let mut timers = TimerRegistry::new(Arc::new(clock.clone()));
/// let mut popups = PopupManager::new(HeadlessHost::new());
/// let mut ctx = DisplayContext::new(&mut timers, &mut popups);
///
/// let mut display = AuctionDisplayController::new("42", DisplayConfig::default());
/// display.open_display(&mut ctx).unwrap();
/// display.start(&mut ctx, 90_000, AuctionSnapshot::default()).unwrap();
/// assert_eq!(display.phase(), Phase::Active);
/// assert!(display.view().contains("01:30"));
/// ```
#[derive(Debug)]
pub struct AuctionDisplayController {
    auction_id: String,
    config: DisplayConfig,
    phase: Phase,
    /// Styles of the rendered views.
    pub styles: DisplayStyles,
    renderer: CrossWindowRenderer,
    handle: Option<PopupHandle>,
    timer_id: String,
    countdown: Option<TimerView>,
    final_seconds: u64,
    snapshot: AuctionSnapshot,
    results: Option<AuctionResults>,
    notice: Option<String>,
}

impl AuctionDisplayController {
    /// Creates a controller in [`Phase::Setup`].
    pub fn new(auction_id: impl Into<String>, config: DisplayConfig) -> Self {
        let auction_id = auction_id.into();
        Self {
            timer_id: format!("auction:{auction_id}:countdown"),
            renderer: CrossWindowRenderer::new(config.renderer.clone()),
            auction_id,
            config,
            phase: Phase::Setup,
            styles: DisplayStyles::default(),
            handle: None,
            countdown: None,
            final_seconds: 0,
            snapshot: AuctionSnapshot::default(),
            results: None,
            notice: None,
        }
    }

    /// Opens the display window, or keeps the one already open.
    ///
    /// A blocked window is reported and leaves an inline notice; the auction
    /// itself can proceed without a display.
    pub fn open_display(
        &mut self,
        ctx: &mut DisplayContext<'_>,
    ) -> Result<Option<Cmd>, DisplayError> {
        if let Some(handle) = &self.handle {
            if ctx.popups.is_valid(handle) {
                tracing::debug!(auction = %self.auction_id, "display already open, reusing it");
                return Ok(None);
            }
            self.release_popup();
        }

        let opened = match ctx.popups.open(
            &self.config.url,
            &self.config.popup_name,
            &self.config.popup_config(),
        ) {
            Ok(opened) => opened,
            Err(PopupError::Blocked(name)) => {
                self.notice = Some(BLOCKED_NOTICE.to_string());
                return Err(DisplayError::PopupBlocked(name));
            }
            Err(err) => return Err(err.into()),
        };
        self.notice = None;
        let handle = opened.handle.clone();
        self.handle = Some(handle.clone());

        let title = self.config.title_for(self.phase);
        if let Err(err) = self.renderer.prepare(ctx.popups, &handle, &title) {
            self.release_popup();
            return Err(err.into());
        }
        let shown = self.present(ctx, true);
        Ok(merge([opened.watch, shown]))
    }

    /// Starts the auction: creates the countdown, anchors it on the server's
    /// end time and starts it.
    pub fn start(
        &mut self,
        ctx: &mut DisplayContext<'_>,
        server_end_ms: i64,
        snapshot: AuctionSnapshot,
    ) -> Result<Option<Cmd>, DisplayError> {
        if self.phase != Phase::Setup {
            return Err(self.refuse("start"));
        }
        ctx.timers.create(&self.timer_id, 0, TimerOptions::new())?;
        let synced = ctx.timers.sync_with_server(&self.timer_id, server_end_ms)?;
        self.countdown = Some(TimerView::attach(
            ctx.timers,
            &self.timer_id,
            self.config.timer.clone(),
        )?);
        self.snapshot = snapshot;
        self.phase = Phase::Active;
        tracing::info!(auction = %self.auction_id, phase = %self.phase, "auction started");

        if ctx.timers.is_completed(&self.timer_id) {
            return Ok(merge([synced, self.finish(ctx, None)]));
        }
        let ticking = ctx.timers.start(&self.timer_id)?;
        let shown = self.present(ctx, true);
        Ok(merge([synced, ticking, shown]))
    }

    /// Applies a bid: new auction data and a new server end time for the same
    /// countdown.
    pub fn on_bid(
        &mut self,
        ctx: &mut DisplayContext<'_>,
        server_end_ms: i64,
        snapshot: AuctionSnapshot,
    ) -> Result<Option<Cmd>, DisplayError> {
        if self.phase != Phase::Active {
            return Err(self.refuse("record a bid"));
        }
        let synced = ctx.timers.sync_with_server(&self.timer_id, server_end_ms)?;
        self.snapshot = snapshot;
        tracing::debug!(
            auction = %self.auction_id,
            bid = self.snapshot.bid_number,
            "bid applied"
        );
        if ctx.timers.is_completed(&self.timer_id) {
            return Ok(merge([synced, self.finish(ctx, None)]));
        }
        let shown = self.present(ctx, true);
        Ok(merge([synced, shown]))
    }

    /// Ends the auction with the given results.
    pub fn end(
        &mut self,
        ctx: &mut DisplayContext<'_>,
        results: AuctionResults,
    ) -> Result<Option<Cmd>, DisplayError> {
        if self.phase != Phase::Active {
            return Err(self.refuse("end"));
        }
        Ok(self.finish(ctx, Some(results)))
    }

    /// Routes runtime messages: timer ticks, close polls, mount retries and
    /// their outcomes.
    pub fn update(&mut self, ctx: &mut DisplayContext<'_>, msg: Msg) -> Option<Cmd> {
        if let Some(tick) = msg.downcast_ref::<TickMsg>() {
            let ours = tick.id == self.timer_id;
            let next = ctx.timers.update(msg);
            if !ours || self.phase != Phase::Active {
                return next;
            }
            if ctx.timers.is_completed(&self.timer_id) {
                return merge([next, self.finish(ctx, None)]);
            }
            return merge([next, self.present(ctx, false)]);
        }
        if msg.is::<ClosePollMsg>() {
            return ctx.popups.update(msg);
        }
        if msg.is::<MountRetryMsg>() {
            return self.renderer.update(ctx.popups, msg);
        }
        if let Some(closed) = msg.downcast_ref::<PopupClosedMsg>() {
            if self.owns(&closed.name) {
                self.release_popup();
            }
            return None;
        }
        if let Some(failed) = msg.downcast_ref::<MountFailedMsg>() {
            if self.owns(&failed.name) {
                self.render_failed(&failed.error);
            }
        }
        None
    }

    /// Releases everything the display holds: the mounted content, the
    /// window, the countdown subscription and the countdown itself.
    pub fn teardown(&mut self, ctx: &mut DisplayContext<'_>) {
        if let Some(handle) = self.handle.take() {
            self.renderer.unmount(ctx.popups, &handle);
            self.renderer.forget(handle.name());
            ctx.popups.close(handle.name());
        }
        if let Some(view) = self.countdown.take() {
            view.detach(ctx.timers);
        }
        ctx.timers.destroy(&self.timer_id);
        tracing::info!(auction = %self.auction_id, phase = %self.phase, "display torn down");
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Inline notice for the main window, e.g. after a blocked popup.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Id of the countdown, once the auction has started.
    pub fn timer_id(&self) -> Option<&str> {
        (self.phase != Phase::Setup).then_some(self.timer_id.as_str())
    }

    /// Whether a display window is currently driven.
    pub fn is_driving_popup(&self) -> bool {
        self.handle.is_some()
    }

    /// Handle of the driven window.
    pub fn handle(&self) -> Option<&PopupHandle> {
        self.handle.as_ref()
    }

    /// Latest auction data.
    pub fn snapshot(&self) -> &AuctionSnapshot {
        &self.snapshot
    }

    /// Results, once ended.
    pub fn results(&self) -> Option<&AuctionResults> {
        self.results.as_ref()
    }

    /// Main-window rendering: the notice, if any, above the phase content.
    pub fn view(&self) -> String {
        let content = self.content();
        match &self.notice {
            Some(notice) => format!("{}\n\n{}", self.styles.notice.render(notice), content),
            None => content,
        }
    }

    fn content(&self) -> String {
        let company = self.config.company_name.as_str();
        match self.phase {
            Phase::Setup => AuctionBoardView {
                company,
                snapshot: &self.snapshot,
                timer: WAITING.to_string(),
                styles: &self.styles,
            }
            .view(),
            Phase::Active => AuctionBoardView {
                company,
                snapshot: &self.snapshot,
                timer: self.countdown.as_ref().map_or_else(
                    || format_countdown(self.final_seconds),
                    TimerView::view,
                ),
                styles: &self.styles,
            }
            .view(),
            Phase::Ended => {
                let fallback = AuctionResults::default();
                AuctionResultView {
                    company,
                    snapshot: &self.snapshot,
                    results: self.results.as_ref().unwrap_or(&fallback),
                    final_time: format_countdown(self.final_seconds),
                    styles: &self.styles,
                }
                .view()
            }
        }
    }

    fn refuse(&self, action: &'static str) -> DisplayError {
        tracing::warn!(auction = %self.auction_id, phase = %self.phase, action, "transition refused");
        DisplayError::InvalidTransition {
            action,
            phase: self.phase,
        }
    }

    fn owns(&self, name: &str) -> bool {
        self.handle.as_ref().is_some_and(|handle| handle.name() == name)
    }

    /// Stops the countdown, freezes its value and shows the results.
    fn finish(
        &mut self,
        ctx: &mut DisplayContext<'_>,
        results: Option<AuctionResults>,
    ) -> Option<Cmd> {
        if ctx.timers.is_running(&self.timer_id) {
            if let Err(err) = ctx.timers.pause(&self.timer_id) {
                tracing::warn!(auction = %self.auction_id, error = %err, "could not stop countdown");
            }
        }
        self.final_seconds = ctx.timers.value(&self.timer_id).unwrap_or(0);
        if let Some(view) = self.countdown.take() {
            view.detach(ctx.timers);
        }
        self.results =
            Some(results.unwrap_or_else(|| AuctionResults::from_snapshot(&self.snapshot)));
        self.phase = Phase::Ended;
        tracing::info!(auction = %self.auction_id, phase = %self.phase, "auction ended");
        self.present(ctx, true)
    }

    /// Pushes the current content to the popup. Transitions also update the
    /// title and re-apply the phase styles.
    fn present(&mut self, ctx: &mut DisplayContext<'_>, transition: bool) -> Option<Cmd> {
        let handle = self.handle.clone()?;
        match self.drive(ctx.popups, &handle, transition) {
            Ok(cmd) => cmd,
            Err(err) => {
                self.render_failed(&err);
                None
            }
        }
    }

    fn drive(
        &mut self,
        popups: &mut PopupManager,
        handle: &PopupHandle,
        transition: bool,
    ) -> Result<Option<Cmd>, MountError> {
        if transition {
            let title = self.config.title_for(self.phase);
            self.renderer.set_title(popups, handle, &title)?;
            let phase_styles = match self.phase {
                Phase::Setup | Phase::Active => BOARD_STYLES.clone(),
                Phase::Ended => RESULT_STYLES.clone(),
            };
            self.renderer.apply_styles(
                popups,
                handle,
                &[POPUP_BASE_STYLES.clone(), phase_styles],
                true,
            )?;
        }
        let content = self.content();
        Ok(self.renderer.mount(popups, handle, &content)?.into_cmd())
    }

    fn render_failed(&mut self, err: &MountError) {
        match err {
            MountError::WindowGone(_) => self.release_popup(),
            err => {
                tracing::warn!(auction = %self.auction_id, error = %err, "display render failed");
                self.notice = Some(format!("The display window could not be updated: {err}"));
            }
        }
    }

    fn release_popup(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.renderer.forget(handle.name());
            self.notice = Some(CLOSED_NOTICE.to_string());
            tracing::info!(
                auction = %self.auction_id,
                popup = handle.name(),
                "display window gone, continuing without it"
            );
        }
    }
}
