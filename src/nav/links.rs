//! Link interceptor.
//!
//! After every frame load each anchor gets one click handler. On click the
//! raw `href` is classified: archive links stay inside the viewer, off-site
//! links go through the catch route, and in-page or script links are left
//! alone.

use url::{Origin, Url};

use super::NavigationIntent;
use crate::error::FrameAccessError;
use crate::host::{Anchor, Host};
use crate::location::{Location, Routes};

/// What to do with a clicked link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkAction {
    /// Let the browser handle it.
    PassThrough,
    /// Let it through, but into a new window rather than the frame.
    NewWindow,
    Follow(NavigationIntent),
    /// Same origin but outside the archive: leave the viewer entirely.
    TopLevel(String),
}

/// Whether the click's default action must be suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickDisposition {
    Default,
    Prevented,
}

impl LinkAction {
    pub fn disposition(&self) -> ClickDisposition {
        match self {
            LinkAction::PassThrough | LinkAction::NewWindow => ClickDisposition::Default,
            LinkAction::Follow(_) | LinkAction::TopLevel(_) => ClickDisposition::Prevented,
        }
    }
}

/// Classify `href` as found in a document located at `base`.
pub fn classify(routes: &Routes, href: &str, base: &Url, origin: &Origin) -> LinkAction {
    // An empty href is as good as none.
    if href.is_empty() {
        return LinkAction::PassThrough;
    }
    if href.starts_with("http://") || href.starts_with("https://") {
        return LinkAction::Follow(NavigationIntent::External(href.to_string()));
    }
    if href.starts_with("mailto:") {
        return LinkAction::NewWindow;
    }
    if href.starts_with('#') || href.starts_with("javascript:") {
        return LinkAction::PassThrough;
    }

    let resolved = match base.join(href) {
        Ok(url) => url,
        Err(e) => {
            log::warn!("cannot resolve link {:?}: {}", href, e);
            return LinkAction::Follow(NavigationIntent::Page(href.to_string()));
        }
    };

    if resolved.origin() != *origin {
        return LinkAction::Follow(NavigationIntent::External(resolved.to_string()));
    }
    let loc = Location::from_url(&resolved);
    match routes.content_relative(&loc.path) {
        Some(relative) => LinkAction::Follow(NavigationIntent::Page(format!(
            "{}{}{}",
            relative, loc.search, loc.hash
        ))),
        None => LinkAction::TopLevel(resolved.to_string()),
    }
}

/// Attach the click handler to every anchor of the current frame document,
/// except error-page action buttons. Returns how many were newly armed.
pub fn arm<H: Host>(host: &mut H) -> Result<usize, FrameAccessError> {
    let mut armed = 0;
    for anchor in host.frame_anchors()? {
        if anchor.is_error_action() {
            continue;
        }
        if host.arm_anchor(&anchor)? {
            armed += 1;
        }
    }
    Ok(armed)
}

/// Decide what a click on `anchor` means, using the frame's live location as
/// the resolution base.
pub fn resolve_click<H: Host>(host: &H, routes: &Routes, anchor: &Anchor) -> LinkAction {
    let Some(href) = anchor.href.as_deref() else {
        return LinkAction::PassThrough;
    };
    let outer = host.url();
    let base = host.frame_url().unwrap_or_else(|e| {
        log::debug!("frame location unreadable ({}), resolving against content root", e);
        outer
            .join(routes.content_prefix())
            .unwrap_or_else(|_| outer.clone())
    });
    classify(routes, href, &base, &outer.origin())
}

/// `mailto:` links must not replace the frame.
pub fn open_in_new_window<H: Host>(host: &mut H, anchor: &Anchor) {
    let targets_self = match anchor.target.as_deref() {
        None | Some("") | Some("_self") => true,
        Some(_) => false,
    };
    if targets_self {
        if let Err(e) = host.set_anchor_target(anchor.id, "_blank") {
            log::debug!("cannot retarget anchor {}: {}", anchor.id, e);
        }
    }
}
