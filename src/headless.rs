//! Deterministic in-memory host.
//!
//! Simulates just enough of a browser to drive a [`Viewer`]: an outer
//! session history, a content frame that loads pre-registered HTML pages
//! (and loses script access when it leaves the origin), the search widgets,
//! a virtual clock, and a backend that records requests instead of sending
//! them. Nothing happens on its own; tests push events with the helpers on
//! `Viewer<HeadlessHost>`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

use url::Url;

use crate::config::SearchLimit;
use crate::dom::parser::parse_html;
use crate::dom::DomTree;
use crate::error::{ApiError, FrameAccessError};
use crate::host::{
    Anchor, AnchorId, Backend, ContentFrame, OuterWindow, RandomTicket, ReadyState, Scheduler,
    SearchTicket, Timer, TimerHandle, ViewerUi,
};
use crate::nav::links::ClickDisposition;
use crate::nav::sync::{FrameLoad, SyncOutcome};
use crate::nav::FrameNavigation;
use crate::net::{RandomEntry, SearchResponse};
use crate::viewer::Viewer;

/// Served for frame paths nobody registered, like the content server's 404.
const NOT_FOUND_PAGE: &str = r#"<html><head><title>Not Found</title></head>
<body><p>Entry not found.</p><a class="btn error-btn" href="/">Home</a></body></html>"#;

/// Outer history mutation, in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryOp {
    Push(String),
    Replace(String),
    Assign(String),
}

/// Linear session history with a cursor.
#[derive(Debug, Clone)]
struct SessionHistory {
    entries: Vec<Url>,
    current: usize,
}

impl SessionHistory {
    fn new(initial: Url) -> Self {
        Self {
            entries: vec![initial],
            current: 0,
        }
    }

    fn current(&self) -> &Url {
        &self.entries[self.current]
    }

    fn push(&mut self, url: Url) {
        // Drop forward entries
        self.entries.truncate(self.current + 1);
        self.entries.push(url);
        self.current = self.entries.len() - 1;
    }

    fn replace(&mut self, url: Url) {
        self.entries[self.current] = url;
    }

    fn back(&mut self) -> bool {
        if self.current > 0 {
            self.current -= 1;
            true
        } else {
            false
        }
    }

    fn forward(&mut self) -> bool {
        if self.current + 1 < self.entries.len() {
            self.current += 1;
            true
        } else {
            false
        }
    }
}

#[derive(Debug)]
struct HeadlessFrame {
    pages: HashMap<String, String>,
    src: Option<String>,
    url: Url,
    document: Option<DomTree>,
    ready: ReadyState,
    pending: Option<Url>,
    replace_blocked: bool,
    armed: HashSet<AnchorId>,
    targets: HashMap<AnchorId, String>,
    observed: bool,
}

#[derive(Debug, Clone, Copy)]
struct ScheduledTimer {
    timer: Timer,
    due: Duration,
    period: Option<Duration>,
}

#[derive(Debug, Default)]
struct VirtualClock {
    now: Duration,
    next_handle: u64,
    timers: BTreeMap<TimerHandle, ScheduledTimer>,
}

impl VirtualClock {
    fn schedule(&mut self, timer: Timer, delay: Duration, period: Option<Duration>) -> TimerHandle {
        self.next_handle += 1;
        let handle = TimerHandle(self.next_handle);
        self.timers.insert(
            handle,
            ScheduledTimer {
                timer,
                due: self.now + delay,
                period,
            },
        );
        handle
    }

    /// Earliest timer due by `deadline`; advances the clock to it.
    fn pop_due(&mut self, deadline: Duration) -> Option<Timer> {
        let (handle, scheduled) = self
            .timers
            .iter()
            .filter(|(_, t)| t.due <= deadline)
            .min_by_key(|(handle, t)| (t.due, **handle))
            .map(|(h, t)| (*h, *t))?;

        self.now = scheduled.due;
        match scheduled.period {
            Some(period) => {
                if let Some(entry) = self.timers.get_mut(&handle) {
                    entry.due += period;
                }
            }
            None => {
                self.timers.remove(&handle);
            }
        }
        Some(scheduled.timer)
    }
}

/// Visible state of the outer page's widgets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadlessUi {
    pub spinner: bool,
    pub search_loading: bool,
    pub clear_button: bool,
    pub search_input: String,
    pub results_markup: String,
    pub overlay: bool,
}

#[derive(Debug)]
pub struct HeadlessHost {
    history: SessionHistory,
    ops: Vec<HistoryOp>,
    title: String,
    archive_title: Option<String>,
    frame: HeadlessFrame,
    ui: HeadlessUi,
    clock: VirtualClock,
    random_requests: Vec<RandomTicket>,
    search_requests: Vec<(SearchTicket, SearchLimit)>,
}

impl HeadlessHost {
    /// Host whose address bar shows `outer`, with an empty frame.
    pub fn new(outer: Url) -> Self {
        let blank = Url::parse("about:blank").unwrap_or_else(|_| outer.clone());
        Self {
            history: SessionHistory::new(outer),
            ops: Vec::new(),
            title: String::new(),
            archive_title: None,
            frame: HeadlessFrame {
                pages: HashMap::new(),
                src: None,
                document: Some(DomTree::blank(blank.as_str())),
                url: blank,
                ready: ReadyState::Complete,
                pending: None,
                replace_blocked: false,
                armed: HashSet::new(),
                targets: HashMap::new(),
                observed: false,
            },
            ui: HeadlessUi::default(),
            clock: VirtualClock::default(),
            random_requests: Vec::new(),
            search_requests: Vec::new(),
        }
    }

    /// Serve `html` for frame navigations to `path` (query and fragment ignored).
    pub fn with_page(mut self, path: &str, html: &str) -> Self {
        self.frame.pages.insert(path.to_string(), html.to_string());
        self
    }

    /// Frame element's initial `src`, as rendered by the server. The frame
    /// starts loading it.
    pub fn with_frame_src(mut self, src: &str) -> Self {
        self.set_frame_src(src);
        self
    }

    /// Frame that already finished loading `src` before any viewer existed.
    pub fn with_loaded_frame(mut self, src: &str) -> Self {
        self.set_frame_src(src);
        self.commit_frame();
        self
    }

    pub fn with_archive_title(mut self, title: &str) -> Self {
        self.archive_title = Some(title.to_string());
        self
    }

    /// Make `location.replace` inside the frame throw.
    pub fn set_replace_blocked(&mut self, blocked: bool) {
        self.frame.replace_blocked = blocked;
    }

    pub fn history_ops(&self) -> &[HistoryOp] {
        &self.ops
    }

    pub fn push_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, HistoryOp::Push(_)))
            .count()
    }

    pub fn history_len(&self) -> usize {
        self.history.entries.len()
    }

    /// Address bar as path, query and fragment.
    pub fn outer_location(&self) -> String {
        self.location().to_string()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn ui(&self) -> &HeadlessUi {
        &self.ui
    }

    /// Type into the search input without firing any event.
    pub fn type_input(&mut self, value: &str) {
        self.ui.search_input = value.to_string();
    }

    pub fn now(&self) -> Duration {
        self.clock.now
    }

    pub fn active_timers(&self) -> usize {
        self.clock.timers.len()
    }

    /// Committed frame URL, readable or not.
    pub fn frame_location(&self) -> &Url {
        &self.frame.url
    }

    /// Navigation the frame has been told to make but not yet loaded.
    pub fn frame_pending(&self) -> Option<&Url> {
        self.frame.pending.as_ref()
    }

    pub fn frame_document(&self) -> Option<&DomTree> {
        self.frame.document.as_ref()
    }

    pub fn is_armed(&self, anchor: AnchorId) -> bool {
        self.frame.armed.contains(&anchor)
    }

    pub fn anchor_target(&self, anchor: AnchorId) -> Option<&str> {
        self.frame.targets.get(&anchor).map(|s| s.as_str())
    }

    pub fn is_observing_frame(&self) -> bool {
        self.frame.observed
    }

    pub fn random_requests(&self) -> &[RandomTicket] {
        &self.random_requests
    }

    pub fn search_requests(&self) -> &[(SearchTicket, SearchLimit)] {
        &self.search_requests
    }

    /// The outer page's scripts drive the frame, so relative URLs resolve
    /// against the address bar.
    fn resolve(&self, url: &str) -> Option<Url> {
        match self.history.current().join(url) {
            Ok(url) => Some(url),
            Err(e) => {
                log::warn!("headless: cannot resolve {:?}: {}", url, e);
                None
            }
        }
    }

    fn same_origin(&self, url: &Url) -> bool {
        url.scheme() == "about" || url.origin() == self.history.current().origin()
    }

    fn accessible(&self) -> Result<(), FrameAccessError> {
        if self.same_origin(&self.frame.url) {
            Ok(())
        } else {
            Err(FrameAccessError::CrossOrigin)
        }
    }

    fn start_frame_navigation(&mut self, url: Url) {
        self.frame.pending = Some(url);
        if self.accessible().is_ok() {
            self.frame.ready = ReadyState::Loading;
        }
    }

    /// Load the pending frame navigation. Returns whether a new document
    /// was committed.
    fn commit_frame(&mut self) -> bool {
        let Some(url) = self.frame.pending.take() else {
            return false;
        };
        let document = if self.same_origin(&url) {
            let html = self
                .frame
                .pages
                .get(url.path())
                .map(|s| s.as_str())
                .unwrap_or(NOT_FOUND_PAGE);
            Some(parse_html(html, url.as_str()))
        } else {
            None
        };
        self.frame.url = url;
        self.frame.document = document;
        self.frame.ready = ReadyState::Complete;
        self.frame.armed.clear();
        self.frame.targets.clear();
        self.frame.observed = false;
        true
    }
}

impl OuterWindow for HeadlessHost {
    fn url(&self) -> Url {
        self.history.current().clone()
    }

    fn push_state(&mut self, url: &str) {
        if let Ok(next) = self.history.current().join(url) {
            self.ops.push(HistoryOp::Push(url.to_string()));
            self.history.push(next);
        }
    }

    fn replace_state(&mut self, url: &str) {
        if let Ok(next) = self.history.current().join(url) {
            self.ops.push(HistoryOp::Replace(url.to_string()));
            self.history.replace(next);
        }
    }

    fn assign(&mut self, url: &str) {
        if let Ok(next) = self.history.current().join(url) {
            self.ops.push(HistoryOp::Assign(url.to_string()));
            self.history.push(next);
        }
    }

    fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    fn archive_title(&self) -> Option<String> {
        self.archive_title.clone()
    }
}

impl ContentFrame for HeadlessHost {
    fn frame_url(&self) -> Result<Url, FrameAccessError> {
        self.accessible()?;
        Ok(self.frame.url.clone())
    }

    fn frame_title(&self) -> Result<String, FrameAccessError> {
        self.accessible()?;
        Ok(self
            .frame
            .document
            .as_ref()
            .map(|d| d.title.clone())
            .unwrap_or_default())
    }

    fn frame_ready_state(&self) -> Result<ReadyState, FrameAccessError> {
        self.accessible()?;
        Ok(self.frame.ready)
    }

    fn frame_src(&self) -> Option<String> {
        self.frame.src.clone()
    }

    fn replace_frame_location(&mut self, url: &str) -> Result<(), FrameAccessError> {
        self.accessible()?;
        if self.frame.replace_blocked {
            return Err(FrameAccessError::Rejected("location.replace blocked".into()));
        }
        let target = self
            .resolve(url)
            .ok_or_else(|| FrameAccessError::Rejected(format!("invalid URL {url:?}")))?;
        self.start_frame_navigation(target);
        Ok(())
    }

    fn set_frame_src(&mut self, url: &str) {
        self.frame.src = Some(url.to_string());
        if let Some(target) = self.resolve(url) {
            self.start_frame_navigation(target);
        }
    }

    fn frame_anchors(&mut self) -> Result<Vec<Anchor>, FrameAccessError> {
        self.accessible()?;
        Ok(self
            .frame
            .document
            .as_ref()
            .map(|d| d.anchors().to_vec())
            .unwrap_or_default())
    }

    fn arm_anchor(&mut self, anchor: &Anchor) -> Result<bool, FrameAccessError> {
        self.accessible()?;
        Ok(self.frame.armed.insert(anchor.id))
    }

    fn set_anchor_target(&mut self, anchor: AnchorId, target: &str) -> Result<(), FrameAccessError> {
        self.accessible()?;
        self.frame.targets.insert(anchor, target.to_string());
        Ok(())
    }

    fn observe_frame_document(&mut self) -> Result<(), FrameAccessError> {
        self.accessible()?;
        self.frame.observed = true;
        Ok(())
    }
}

impl ViewerUi for HeadlessHost {
    fn set_spinner(&mut self, visible: bool) {
        self.ui.spinner = visible;
    }

    fn set_search_loading(&mut self, visible: bool) {
        self.ui.search_loading = visible;
    }

    fn set_clear_button(&mut self, visible: bool) {
        self.ui.clear_button = visible;
    }

    fn search_input(&self) -> String {
        self.ui.search_input.clone()
    }

    fn set_search_input(&mut self, value: &str) {
        self.ui.search_input = value.to_string();
    }

    fn render_search_results(&mut self, markup: &str) {
        self.ui.results_markup = markup.to_string();
    }

    fn set_search_overlay(&mut self, visible: bool) {
        self.ui.overlay = visible;
    }
}

impl Scheduler for HeadlessHost {
    fn set_timeout(&mut self, timer: Timer, delay: Duration) -> TimerHandle {
        self.clock.schedule(timer, delay, None)
    }

    fn set_interval(&mut self, timer: Timer, period: Duration) -> TimerHandle {
        // A zero period would never let the clock move.
        let period = period.max(Duration::from_millis(1));
        self.clock.schedule(timer, period, Some(period))
    }

    fn clear_timer(&mut self, handle: TimerHandle) {
        self.clock.timers.remove(&handle);
    }
}

impl Backend for HeadlessHost {
    fn request_random(&mut self, ticket: RandomTicket) {
        self.random_requests.push(ticket);
    }

    fn request_search(&mut self, ticket: SearchTicket, limit: SearchLimit) {
        self.search_requests.push((ticket, limit));
    }
}

/// Event drivers for tests and the CLI.
impl Viewer<HeadlessHost> {
    /// Let the frame finish its pending navigation and report the load.
    pub fn pump_frame(&mut self) -> Option<FrameLoad> {
        if self.host_mut().commit_frame() {
            Some(self.on_frame_load())
        } else {
            None
        }
    }

    /// Move the virtual clock forward, firing due timers in order. Returns
    /// how many fired.
    pub fn advance(&mut self, by: Duration) -> usize {
        let deadline = self.host().clock.now + by;
        let mut fired = 0;
        while let Some(timer) = self.host_mut().clock.pop_due(deadline) {
            self.on_timer(timer);
            fired += 1;
        }
        self.host_mut().clock.now = deadline;
        fired
    }

    /// Outer back button.
    pub fn go_back(&mut self) -> Option<FrameNavigation> {
        if self.host_mut().history.back() {
            self.on_outer_popstate()
        } else {
            None
        }
    }

    /// Outer forward button.
    pub fn go_forward(&mut self) -> Option<FrameNavigation> {
        if self.host_mut().history.forward() {
            self.on_outer_popstate()
        } else {
            None
        }
    }

    /// Click an anchor of the frame document. `None` when no handler is
    /// attached, i.e. the browser would act on its own.
    pub fn click(&mut self, anchor: AnchorId) -> Option<ClickDisposition> {
        let found = self
            .host()
            .frame
            .document
            .as_ref()
            .and_then(|d| d.anchor(anchor))
            .cloned();
        let anchor = found?;
        let observed = self.host().frame.observed;
        let disposition = if self.host().is_armed(anchor.id) {
            Some(self.on_link_click(&anchor))
        } else {
            None
        };
        // Bubbles up to the document after the anchor's own handler.
        if observed {
            self.on_frame_click();
        }
        disposition
    }

    /// Script inside the frame calls `history.pushState` (or changes the
    /// fragment). Reported only while the document is observed.
    pub fn frame_push_state(&mut self, url: &str) -> Option<SyncOutcome> {
        let next = match self.host().frame.url.join(url) {
            Ok(next) => next,
            Err(e) => {
                log::warn!("headless: frame cannot push {:?}: {}", url, e);
                return None;
            }
        };
        let host = self.host_mut();
        host.frame.url = next;
        if host.frame.observed {
            Some(self.on_frame_history_change())
        } else {
            None
        }
    }

    /// Answer the oldest outstanding random request.
    pub fn respond_random(
        &mut self,
        result: Result<RandomEntry, ApiError>,
    ) -> Option<FrameNavigation> {
        if self.host().random_requests.is_empty() {
            return None;
        }
        let ticket = self.host_mut().random_requests.remove(0);
        self.on_random_response(ticket, result)
    }

    /// Answer the oldest outstanding search request. Returns whether it was
    /// rendered.
    pub fn respond_search(&mut self, result: Result<SearchResponse, ApiError>) -> bool {
        if self.host().search_requests.is_empty() {
            return false;
        }
        let (ticket, _) = self.host_mut().search_requests.remove(0);
        self.on_search_response(&ticket, result)
    }

    /// Input event: set the field and run the search handler.
    pub fn type_query(&mut self, value: &str) {
        self.host_mut().type_input(value);
        self.search(value);
    }
}
