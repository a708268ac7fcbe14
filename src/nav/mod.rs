//! Navigation controller.
//!
//! The single funnel through which the content frame's location is ever
//! changed. Every navigation bumps an epoch, so responses that were requested
//! before it (random entries) can tell they have been superseded.

pub mod links;
pub mod sync;

use crate::error::ApiError;
use crate::host::{Host, RandomTicket};
use crate::location::{Location, Routes};
use crate::net::RandomEntry;

use self::sync::UrlSynchronizer;

/// Where a click or history event wants the frame to go. Consumed at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationIntent {
    /// Archive-relative path, possibly with query and fragment.
    Page(String),
    /// Absolute off-archive URL, shown through the catch route.
    External(String),
}

/// How the frame was pointed at its new location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameNavigationMethod {
    /// `location.replace` inside the frame; no frame history entry.
    Replace,
    /// Fallback: the frame element's `src` attribute.
    Src,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameNavigation {
    pub url: String,
    pub method: FrameNavigationMethod,
}

#[derive(Debug, Default)]
pub struct Navigator {
    epoch: u64,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bumped by every frame navigation and random request.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn load_home<H: Host>(
        &mut self,
        host: &mut H,
        routes: &Routes,
        sync: &mut UrlSynchronizer,
    ) -> FrameNavigation {
        self.load_page(host, routes, sync, "")
    }

    /// Show an archive page. Pushes a history entry unless the address bar
    /// already shows the target.
    pub fn load_page<H: Host>(
        &mut self,
        host: &mut H,
        routes: &Routes,
        sync: &mut UrlSynchronizer,
        path: &str,
    ) -> FrameNavigation {
        let path = path.strip_prefix('/').unwrap_or(path);
        let outer = routes.viewer_url(path);
        push_if_changed(host, &outer);

        host.set_spinner(true);
        let nav = self.set_frame_location(host, sync, &routes.content_url(path));
        host.set_search_overlay(false);
        nav
    }

    /// Show an off-archive URL through the catch route.
    pub fn load_external<H: Host>(
        &mut self,
        host: &mut H,
        routes: &Routes,
        sync: &mut UrlSynchronizer,
        target: &str,
    ) -> FrameNavigation {
        push_if_changed(host, &routes.catch_outer(target));
        host.set_spinner(true);
        self.set_frame_location(host, sync, &Routes::catch_inner(target))
    }

    pub fn follow<H: Host>(
        &mut self,
        host: &mut H,
        routes: &Routes,
        sync: &mut UrlSynchronizer,
        intent: NavigationIntent,
    ) -> FrameNavigation {
        match intent {
            NavigationIntent::Page(path) => self.load_page(host, routes, sync, &path),
            NavigationIntent::External(target) => self.load_external(host, routes, sync, &target),
        }
    }

    /// Re-point the frame after outer history moved. Never touches history.
    pub fn restore<H: Host>(
        &mut self,
        host: &mut H,
        sync: &mut UrlSynchronizer,
        inner: &str,
    ) -> FrameNavigation {
        host.set_spinner(true);
        self.set_frame_location(host, sync, inner)
    }

    pub fn request_random<H: Host>(&mut self, host: &mut H) -> RandomTicket {
        self.epoch += 1;
        let ticket = RandomTicket { epoch: self.epoch };
        host.set_spinner(true);
        host.request_random(ticket);
        ticket
    }

    /// Handle the backend's answer to [`Navigator::request_random`].
    pub fn finish_random<H: Host>(
        &mut self,
        host: &mut H,
        routes: &Routes,
        sync: &mut UrlSynchronizer,
        ticket: RandomTicket,
        result: Result<RandomEntry, ApiError>,
    ) -> Option<FrameNavigation> {
        if ticket.epoch != self.epoch {
            log::debug!(
                "discarding random entry from epoch {} (now {})",
                ticket.epoch,
                self.epoch
            );
            return None;
        }
        match result {
            Ok(entry) if !entry.path.is_empty() => {
                Some(self.load_page(host, routes, sync, &entry.path))
            }
            Ok(_) => {
                log::warn!("random entry request returned no path");
                host.set_spinner(false);
                None
            }
            Err(e) => {
                log::error!("random entry request failed: {}", e);
                host.set_spinner(false);
                None
            }
        }
    }

    /// Prefer an in-place replace so the frame gains no history entry of its
    /// own; fall back to `src` once the frame is out of reach.
    fn set_frame_location<H: Host>(
        &mut self,
        host: &mut H,
        sync: &mut UrlSynchronizer,
        url: &str,
    ) -> FrameNavigation {
        self.epoch += 1;
        sync.begin_navigation();
        let method = match host.replace_frame_location(url) {
            Ok(()) => FrameNavigationMethod::Replace,
            Err(e) => {
                log::debug!("frame location.replace failed ({}), setting src", e);
                host.set_frame_src(url);
                FrameNavigationMethod::Src
            }
        };
        FrameNavigation {
            url: url.to_string(),
            method,
        }
    }
}

fn push_if_changed<H: Host>(host: &mut H, outer: &str) {
    if !shows(host, outer) {
        host.push_state(outer);
    }
}

/// Whether the address bar already shows `outer`. Both sides go through URL
/// parsing so percent-encoding differences do not count.
pub(crate) fn shows<H: Host>(host: &H, outer: &str) -> bool {
    let current = host.url();
    match current.join(outer) {
        Ok(target) => Location::from_url(&target) == Location::from_url(&current),
        Err(_) => host.location().to_string() == outer,
    }
}
