//! Host seams.
//!
//! The controller never touches a DOM directly. Everything it reads or
//! mutates goes through these traits, and everything asynchronous (frame
//! loads, timers, backend responses, clicks) is reported back by the host as
//! a call on [`crate::viewer::Viewer`]. On wasm32 the host is
//! [`crate::web::WebHost`]; [`crate::headless::HeadlessHost`] simulates one
//! deterministically for tests and the CLI.

use std::time::Duration;

use url::Url;

use crate::config::SearchLimit;
use crate::error::FrameAccessError;
use crate::location::Location;

/// Index of an anchor within the frame document it was listed from.
pub type AnchorId = usize;

/// Snapshot of one `<a>` element inside the content frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub id: AnchorId,
    /// Raw `href` attribute, unresolved.
    pub href: Option<String>,
    pub classes: Vec<String>,
    pub target: Option<String>,
}

impl Anchor {
    /// Class marking buttons on the content server's error pages, which
    /// already carry their own behavior.
    pub const ERROR_ACTION_CLASS: &'static str = "error-btn";

    pub fn new(id: AnchorId, href: Option<&str>) -> Self {
        Self {
            id,
            href: href.map(str::to_string),
            classes: Vec::new(),
            target: None,
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn is_error_action(&self) -> bool {
        self.has_class(Self::ERROR_ACTION_CLASS)
    }
}

/// Opaque identifier of a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(pub u64);

/// What a timer is for; handed back to [`crate::viewer::Viewer::on_timer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timer {
    SearchDebounce,
    /// Periodic URL reconciliation backstop.
    Resync,
    /// One-shot start-up check for a slow initial frame.
    SpinnerProbe,
}

/// Tag of a random-entry request: the navigation epoch it was issued in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomTicket {
    pub epoch: u64,
}

/// Tag of a dispatched search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTicket {
    /// Monotonic dispatch sequence number.
    pub seq: u64,
    pub query: String,
}

/// `document.readyState` of the frame document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Loading,
    Interactive,
    Complete,
}

/// The host page's own window: address bar, history, title.
pub trait OuterWindow {
    /// Absolute URL currently in the address bar.
    fn url(&self) -> Url;

    fn push_state(&mut self, url: &str);

    fn replace_state(&mut self, url: &str);

    /// Full top-level navigation away from the viewer.
    fn assign(&mut self, url: &str);

    fn set_title(&mut self, title: &str);

    /// Display name of the archive from the page header, if present.
    fn archive_title(&self) -> Option<String>;

    fn location(&self) -> Location {
        Location::from_url(&self.url())
    }
}

/// The embedded content frame. Every read can fail once the frame has
/// navigated to another origin.
pub trait ContentFrame {
    fn frame_url(&self) -> Result<Url, FrameAccessError>;

    fn frame_title(&self) -> Result<String, FrameAccessError>;

    fn frame_ready_state(&self) -> Result<ReadyState, FrameAccessError>;

    /// The frame element's `src` attribute.
    fn frame_src(&self) -> Option<String>;

    /// `contentWindow.location.replace(url)`, which adds no frame history entry.
    fn replace_frame_location(&mut self, url: &str) -> Result<(), FrameAccessError>;

    fn set_frame_src(&mut self, url: &str);

    /// List the anchors of the current frame document, in document order.
    fn frame_anchors(&mut self) -> Result<Vec<Anchor>, FrameAccessError>;

    /// Attach the click handler to an anchor. Returns `false` if it was
    /// already attached; repeated calls must never stack handlers.
    fn arm_anchor(&mut self, anchor: &Anchor) -> Result<bool, FrameAccessError>;

    fn set_anchor_target(&mut self, anchor: AnchorId, target: &str) -> Result<(), FrameAccessError>;

    /// Report the current frame document's own history changes
    /// (`pushState`, `replaceState`, `hashchange`, `popstate`) through
    /// [`crate::viewer::Viewer::on_frame_history_change`], and clicks inside
    /// it through [`crate::viewer::Viewer::on_frame_click`]. Called once per
    /// load. Best effort: hosts that cannot observe these return an error.
    fn observe_frame_document(&mut self) -> Result<(), FrameAccessError>;
}

/// Indicators and search widgets of the host page.
pub trait ViewerUi {
    fn set_spinner(&mut self, visible: bool);

    fn set_search_loading(&mut self, visible: bool);

    fn set_clear_button(&mut self, visible: bool);

    fn search_input(&self) -> String;

    fn set_search_input(&mut self, value: &str);

    fn render_search_results(&mut self, markup: &str);

    fn set_search_overlay(&mut self, visible: bool);
}

/// Timers. Firing is reported through [`crate::viewer::Viewer::on_timer`].
pub trait Scheduler {
    fn set_timeout(&mut self, timer: Timer, delay: Duration) -> TimerHandle;

    fn set_interval(&mut self, timer: Timer, period: Duration) -> TimerHandle;

    fn clear_timer(&mut self, handle: TimerHandle);
}

/// Archive backend. Requests are fire-and-forget; responses come back
/// through the viewer's `on_random_response` / `on_search_response`.
pub trait Backend {
    fn request_random(&mut self, ticket: RandomTicket);

    fn request_search(&mut self, ticket: SearchTicket, limit: SearchLimit);
}

/// Everything the viewer needs from its environment.
pub trait Host: OuterWindow + ContentFrame + ViewerUi + Scheduler + Backend {}

impl<T> Host for T where T: OuterWindow + ContentFrame + ViewerUi + Scheduler + Backend {}
