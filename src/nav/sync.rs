//! URL synchronizer.
//!
//! Mirrors the frame's location into the address bar with `replaceState`,
//! never `pushState`. Runs on every frame load, on the frame's own history
//! changes, and on a periodic backstop tick.

use std::time::Duration;

use crate::host::{Host, ReadyState, Timer, TimerHandle};
use crate::location::{Location, Routes};

/// Phase of the current navigation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPhase {
    #[default]
    Idle,
    /// The frame was told to go somewhere and has not loaded yet.
    Navigating,
    Loaded,
}

/// Result of one reconciliation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Frame internals could not be read.
    Inaccessible,
    /// Frame shows a document from another origin.
    ForeignOrigin,
    /// Frame location has no viewer counterpart.
    Untracked,
    InSync,
    /// Address bar was replaced with this URL.
    Replaced(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameLoad {
    /// Whether the loaded document could be inspected at all.
    pub accessible: bool,
    pub outcome: SyncOutcome,
}

#[derive(Debug, Default)]
pub struct UrlSynchronizer {
    phase: SyncPhase,
    resync: Option<TimerHandle>,
    probe: Option<TimerHandle>,
}

impl UrlSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    /// Carry the initial query and fragment into the frame, then schedule the
    /// spinner probe and the periodic backstop.
    pub fn start<H: Host>(
        &mut self,
        host: &mut H,
        routes: &Routes,
        probe_delay: Duration,
        resync_period: Duration,
    ) {
        self.propagate_initial_location(host, routes);
        self.probe = Some(host.set_timeout(Timer::SpinnerProbe, probe_delay));
        self.resync = Some(host.set_interval(Timer::Resync, resync_period));
    }

    pub fn stop<H: Host>(&mut self, host: &mut H) {
        for handle in [self.probe.take(), self.resync.take()].into_iter().flatten() {
            host.clear_timer(handle);
        }
    }

    pub fn begin_navigation(&mut self) {
        self.phase = SyncPhase::Navigating;
    }

    pub fn on_frame_load<H: Host>(&mut self, host: &mut H, routes: &Routes) -> FrameLoad {
        self.phase = SyncPhase::Loaded;
        host.set_spinner(false);

        let accessible = match host.frame_title() {
            Ok(title) => {
                let archive_title = host
                    .archive_title()
                    .unwrap_or_else(|| routes.archive().to_string());
                host.set_title(&format!("{} - {}", title, archive_title));
                if let Err(e) = host.observe_frame_document() {
                    log::debug!("cannot observe frame document: {}", e);
                }
                true
            }
            Err(e) => {
                log::debug!("cannot access frame document: {}", e);
                false
            }
        };

        FrameLoad {
            accessible,
            outcome: self.reconcile(host, routes),
        }
    }

    /// The frame changed its own location without a load: a fragment change
    /// or script-driven history. That settles any pending navigation.
    pub fn on_frame_history_change<H: Host>(
        &mut self,
        host: &mut H,
        routes: &Routes,
    ) -> SyncOutcome {
        if self.phase == SyncPhase::Navigating {
            self.phase = SyncPhase::Loaded;
            host.set_spinner(false);
        }
        self.reconcile(host, routes)
    }

    /// Periodic backstop. Skipped mid-navigation so it never reverts a
    /// freshly pushed entry to the previous page.
    pub fn on_tick<H: Host>(&mut self, host: &mut H, routes: &Routes) -> Option<SyncOutcome> {
        if self.phase == SyncPhase::Navigating {
            return None;
        }
        Some(self.reconcile(host, routes))
    }

    /// Replace the address bar with the translation of the frame location,
    /// when it is readable, same-origin, translatable and different.
    pub fn reconcile<H: Host>(&mut self, host: &mut H, routes: &Routes) -> SyncOutcome {
        let frame = match host.frame_url() {
            Ok(url) => url,
            Err(e) => {
                log::debug!("skipping reconciliation: {}", e);
                return SyncOutcome::Inaccessible;
            }
        };
        if frame.origin() != host.url().origin() {
            return SyncOutcome::ForeignOrigin;
        }
        let Some(target) = routes.inner_to_outer(&Location::from_url(&frame)) else {
            return SyncOutcome::Untracked;
        };
        if super::shows(host, &target) {
            return SyncOutcome::InSync;
        }
        host.replace_state(&target);
        SyncOutcome::Replaced(target)
    }

    /// Frame URL the address bar stands for after outer history moved.
    pub fn restore_target<H: Host>(&self, host: &H, routes: &Routes) -> Option<String> {
        routes.outer_to_inner(&host.location())
    }

    /// One-shot start-up check: a frame that is still loading, or cannot be
    /// inspected, gets the spinner.
    pub fn probe_spinner<H: Host>(&mut self, host: &mut H) {
        self.probe = None;
        if self.phase == SyncPhase::Loaded {
            return;
        }
        match host.frame_ready_state() {
            Ok(ReadyState::Complete) => {}
            Ok(_) | Err(_) => host.set_spinner(true),
        }
    }

    fn propagate_initial_location<H: Host>(&mut self, host: &mut H, routes: &Routes) {
        let outer = host.location();
        if !outer.path.starts_with(routes.viewer_prefix()) {
            return;
        }
        if outer.search.is_empty() && outer.hash.is_empty() {
            return;
        }
        let Some(src) = host.frame_src().filter(|s| !s.is_empty()) else {
            return;
        };

        let mut next = src.clone();
        if !outer.search.is_empty() && !next.contains('?') {
            next.push_str(&outer.search);
        }
        if !outer.hash.is_empty() && !next.contains('#') {
            next.push_str(&outer.hash);
        }
        if next != src {
            log::debug!("initial frame src {} -> {}", src, next);
            self.begin_navigation();
            host.set_frame_src(&next);
        }
    }
}
