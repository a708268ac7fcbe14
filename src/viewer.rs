//! The viewer controller.
//!
//! [`Viewer`] owns the host, the session and every component. User actions
//! come in through the public operations; everything asynchronous comes in
//! through the `on_*` entry points, which the host calls from its event loop.
//! None of them return errors: failures are logged and the indicators are
//! left consistent.

use crate::config::ViewerConfig;
use crate::error::{ApiError, ConfigError};
use crate::host::{Anchor, Host, RandomTicket, ReadyState, SearchTicket, Timer};
use crate::nav::links::{self, ClickDisposition, LinkAction};
use crate::nav::sync::{FrameLoad, SyncOutcome, SyncPhase, UrlSynchronizer};
use crate::nav::{FrameNavigation, NavigationIntent, Navigator};
use crate::net::{RandomEntry, SearchResponse};
use crate::search::SearchController;
use crate::session::ViewerSession;

pub struct Viewer<H: Host> {
    host: H,
    config: ViewerConfig,
    session: ViewerSession,
    navigator: Navigator,
    sync: UrlSynchronizer,
    search: SearchController,
}

impl<H: Host> Viewer<H> {
    pub fn new(host: H, config: ViewerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            host,
            session: ViewerSession::new(&config.archive),
            navigator: Navigator::new(),
            sync: UrlSynchronizer::new(),
            search: SearchController::new(&config),
            config,
        })
    }

    /// Wire up start-up behavior: initial location propagation, the spinner
    /// probe and the periodic backstop. A frame whose first `load` fired
    /// before the host was listening is handled as if it had just loaded.
    pub fn start(&mut self) {
        log::info!("viewer started for archive {}", self.session.archive());
        self.sync.start(
            &mut self.host,
            self.session.routes(),
            self.config.spinner_probe(),
            self.config.resync_interval(),
        );
        if self.sync.phase() == SyncPhase::Idle && self.frame_already_loaded() {
            log::debug!("frame loaded before start");
            self.on_frame_load();
        }
    }

    fn frame_already_loaded(&self) -> bool {
        let complete = matches!(self.host.frame_ready_state(), Ok(ReadyState::Complete));
        complete
            && self
                .host
                .frame_url()
                .is_ok_and(|url| url.scheme() != "about")
    }

    /// Cancel the timers scheduled by [`Viewer::start`].
    pub fn stop(&mut self) {
        self.sync.stop(&mut self.host);
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn session(&self) -> &ViewerSession {
        &self.session
    }

    pub fn phase(&self) -> SyncPhase {
        self.sync.phase()
    }

    pub fn navigation_epoch(&self) -> u64 {
        self.navigator.epoch()
    }

    // ── navigation ──────────────────────────────────────────────

    pub fn load_home(&mut self) -> FrameNavigation {
        self.navigator
            .load_home(&mut self.host, self.session.routes(), &mut self.sync)
    }

    pub fn load_page(&mut self, path: &str) -> FrameNavigation {
        self.navigator
            .load_page(&mut self.host, self.session.routes(), &mut self.sync, path)
    }

    pub fn load_random(&mut self) -> RandomTicket {
        self.navigator.request_random(&mut self.host)
    }

    pub fn follow(&mut self, intent: NavigationIntent) -> FrameNavigation {
        self.navigator
            .follow(&mut self.host, self.session.routes(), &mut self.sync, intent)
    }

    // ── search ──────────────────────────────────────────────────

    pub fn search(&mut self, query: &str) {
        self.search.search(&mut self.host, &mut self.session, query);
    }

    pub fn clear_search(&mut self) {
        self.search.clear(&mut self.host, &mut self.session);
    }

    pub fn show_search_results(&mut self) -> bool {
        self.search.reopen(&mut self.host, &self.session)
    }

    /// A rendered result was picked.
    pub fn select_result(&mut self, path: &str) -> FrameNavigation {
        self.load_page(path)
    }

    // ── host events ─────────────────────────────────────────────

    /// The content frame fired `load`.
    pub fn on_frame_load(&mut self) -> FrameLoad {
        let load = self.sync.on_frame_load(&mut self.host, self.session.routes());
        if load.accessible {
            match links::arm(&mut self.host) {
                Ok(n) => log::debug!("armed {} links", n),
                Err(e) => log::debug!("cannot arm frame links: {}", e),
            }
        }
        load
    }

    /// The frame document changed its own location (fragment, history API).
    pub fn on_frame_history_change(&mut self) -> SyncOutcome {
        self.sync
            .on_frame_history_change(&mut self.host, self.session.routes())
    }

    /// Outer back/forward. Re-points the frame without touching history.
    pub fn on_outer_popstate(&mut self) -> Option<FrameNavigation> {
        let routes = self.session.routes();
        let Some(inner) = self.sync.restore_target(&self.host, routes) else {
            log::debug!("popstate to {} has no frame counterpart", self.host.location());
            return None;
        };
        Some(self.navigator.restore(&mut self.host, &mut self.sync, &inner))
    }

    pub fn on_timer(&mut self, timer: Timer) {
        match timer {
            Timer::SearchDebounce => {
                self.search.on_debounce(&mut self.host);
            }
            Timer::Resync => {
                self.sync.on_tick(&mut self.host, self.session.routes());
            }
            Timer::SpinnerProbe => self.sync.probe_spinner(&mut self.host),
        }
    }

    pub fn on_random_response(
        &mut self,
        ticket: RandomTicket,
        result: Result<RandomEntry, ApiError>,
    ) -> Option<FrameNavigation> {
        self.navigator.finish_random(
            &mut self.host,
            self.session.routes(),
            &mut self.sync,
            ticket,
            result,
        )
    }

    pub fn on_search_response(
        &mut self,
        ticket: &SearchTicket,
        result: Result<SearchResponse, ApiError>,
    ) -> bool {
        self.search
            .on_response(&mut self.host, &mut self.session, ticket, result)
    }

    /// An armed anchor in the frame was clicked. The host must suppress the
    /// default action when this returns [`ClickDisposition::Prevented`].
    pub fn on_link_click(&mut self, anchor: &Anchor) -> ClickDisposition {
        let action = links::resolve_click(&self.host, self.session.routes(), anchor);
        log::debug!("link {:?} -> {:?}", anchor.href, action);
        let disposition = action.disposition();
        match action {
            LinkAction::PassThrough => {}
            LinkAction::NewWindow => links::open_in_new_window(&mut self.host, anchor),
            LinkAction::Follow(intent) => {
                self.follow(intent);
            }
            LinkAction::TopLevel(url) => self.host.assign(&url),
        }
        disposition
    }

    /// Any click inside the frame document.
    pub fn on_frame_click(&mut self) {
        self.search.dismiss(&mut self.host);
    }

    /// A click on the outer page outside the search box and its results.
    pub fn on_outside_click(&mut self) {
        self.search.dismiss(&mut self.host);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use url::Url;

    use super::*;
    use crate::config::SearchLimit;
    use crate::headless::{HeadlessHost, HistoryOp};
    use crate::host::{ContentFrame, OuterWindow, ViewerUi};
    use crate::nav::FrameNavigationMethod;
    use crate::net::SearchHit;
    use crate::search::NO_RESULTS_MARKUP;

    const ORIGIN: &str = "http://localhost:8080";

    // anchor ids follow document order
    const INDEX: &str = r##"<html><head><title>Index</title></head><body>
        <a href="sub/page.html">Sub</a>
        <a href="https://example.com/x">Out</a>
        <a href="mailto:someone@example.com">Mail</a>
        <a href="#top">Top</a>
        <a href="/viewer/other/">Other archive</a>
        <a class="btn error-btn" href="/">Home</a>
        <a href="">Self</a>
    </body></html>"##;

    const SUB: usize = 0;
    const OUT: usize = 1;
    const MAIL: usize = 2;
    const TOP: usize = 3;
    const OTHER: usize = 4;
    const ERROR_BTN: usize = 5;
    const EMPTY: usize = 6;

    fn at(path: &str) -> Url {
        Url::parse(ORIGIN).unwrap().join(path).unwrap()
    }

    fn page(title: &str) -> String {
        format!("<html><head><title>{title}</title></head><body><p>{title}</p></body></html>")
    }

    fn host(outer: &str) -> HeadlessHost {
        HeadlessHost::new(at(outer))
            .with_archive_title("My Archive")
            .with_page("/content/myarchive/dir/index.html", INDEX)
            .with_page("/content/myarchive/dir/sub/page.html", &page("Sub Page"))
            .with_page("/content/myarchive/A/One", &page("One"))
            .with_page("/content/myarchive/A/Two", &page("Two"))
    }

    fn viewer(host: HeadlessHost) -> Viewer<HeadlessHost> {
        Viewer::new(host, ViewerConfig::new("myarchive")).unwrap()
    }

    /// Started viewer whose frame has loaded `path` from the server-rendered src.
    fn loaded(path: &str) -> Viewer<HeadlessHost> {
        let host = host(&format!("/viewer/myarchive/{path}"))
            .with_frame_src(&format!("/content/myarchive/{path}"));
        let mut v = viewer(host);
        v.start();
        v.pump_frame().unwrap();
        v
    }

    fn decode_error() -> ApiError {
        ApiError::Decode(serde_json::from_str::<RandomEntry>("<html>").unwrap_err())
    }

    fn hits(query: &str, titles: &[&str]) -> SearchResponse {
        SearchResponse::new(
            query,
            titles
                .iter()
                .map(|t| SearchHit::new(*t, format!("A/{t}")))
                .collect(),
        )
    }

    // ── navigation ──────────────────────────────────────────────

    #[test]
    fn rejects_invalid_config() {
        let err = Viewer::new(host("/"), ViewerConfig::new("")).err();
        assert_eq!(err, Some(ConfigError::EmptyArchive));
    }

    #[test]
    fn load_page_pushes_once_for_same_target() {
        let mut v = viewer(host("/viewer/myarchive/"));
        let nav = v.load_page("/A/One");
        assert_eq!(nav.url, "/content/myarchive/A/One");
        assert_eq!(nav.method, FrameNavigationMethod::Replace);
        assert_eq!(v.host().outer_location(), "/viewer/myarchive/A/One");
        assert!(v.host().ui().spinner);
        assert_eq!(v.phase(), SyncPhase::Navigating);

        v.load_page("A/One");
        assert_eq!(v.host().push_count(), 1);

        let load = v.pump_frame().unwrap();
        assert!(load.accessible);
        assert_eq!(load.outcome, SyncOutcome::InSync);
        assert!(!v.host().ui().spinner);
        assert_eq!(v.host().title(), "One - My Archive");
        assert_eq!(v.phase(), SyncPhase::Loaded);
    }

    #[test]
    fn encoded_paths_do_not_push_duplicates() {
        let mut v = viewer(host("/viewer/myarchive/"));
        v.load_page("A/Café");
        v.load_page("A/Café");
        assert_eq!(v.host().outer_location(), "/viewer/myarchive/A/Caf%C3%A9");
        v.load_page("A/Main Page");
        v.load_page("A/Main Page");
        assert_eq!(v.host().push_count(), 2);

        v.follow(NavigationIntent::External("https://example.com/a b".into()));
        v.follow(NavigationIntent::External("https://example.com/a b".into()));
        assert_eq!(v.host().push_count(), 3);
    }

    #[test]
    fn encoded_frame_location_is_in_sync() {
        let host = host("/viewer/myarchive/")
            .with_page("/content/myarchive/A/Caf%C3%A9", &page("Café"));
        let mut v = viewer(host);
        v.load_page("A/Café");
        let load = v.pump_frame().unwrap();
        assert_eq!(load.outcome, SyncOutcome::InSync);
        assert_eq!(v.host().title(), "Café - My Archive");
        assert_eq!(v.host().history_ops().len(), 1);
    }

    #[test]
    fn load_home_targets_archive_root() {
        let mut v = loaded("A/One");
        let nav = v.load_home();
        assert_eq!(nav.url, "/content/myarchive/");
        assert_eq!(v.host().outer_location(), "/viewer/myarchive/");
    }

    #[test]
    fn title_falls_back_to_archive_name() {
        let mut v = viewer(HeadlessHost::new(at("/viewer/myarchive/")).with_page(
            "/content/myarchive/A/One",
            &page("One"),
        ));
        v.load_page("A/One");
        v.pump_frame();
        assert_eq!(v.host().title(), "One - myarchive");
    }

    #[test]
    fn back_and_forward_restore_frame_without_new_entries() {
        let mut v = viewer(host("/viewer/myarchive/"));
        v.load_page("A/One");
        v.pump_frame();
        v.load_page("A/Two");
        v.pump_frame();
        let ops = v.host().history_ops().len();
        let entries = v.host().history_len();

        let nav = v.go_back().unwrap();
        assert_eq!(nav.url, "/content/myarchive/A/One");
        assert!(v.host().ui().spinner);
        v.pump_frame();
        assert_eq!(v.host().frame_location().path(), "/content/myarchive/A/One");
        assert_eq!(v.host().outer_location(), "/viewer/myarchive/A/One");

        let nav = v.go_forward().unwrap();
        assert_eq!(nav.url, "/content/myarchive/A/Two");
        v.pump_frame();
        assert_eq!(v.host().outer_location(), "/viewer/myarchive/A/Two");

        assert_eq!(v.host().history_ops().len(), ops);
        assert_eq!(v.host().history_len(), entries);
    }

    #[test]
    fn popstate_to_unknown_route_is_ignored() {
        let mut v = viewer(host("/about"));
        v.load_page("A/One");
        v.pump_frame();
        assert_eq!(v.go_back(), None);
        assert_eq!(v.host().frame_location().path(), "/content/myarchive/A/One");
    }

    #[test]
    fn falls_back_to_src_when_frame_is_out_of_reach() {
        let mut v = loaded("A/One");
        v.host_mut().set_frame_src("https://elsewhere.example/page");
        let load = v.pump_frame().unwrap();
        assert_eq!(
            load,
            FrameLoad {
                accessible: false,
                outcome: SyncOutcome::Inaccessible
            }
        );
        assert_eq!(v.host().outer_location(), "/viewer/myarchive/A/One");
        assert!(!v.host().ui().spinner);

        let nav = v.load_page("A/Two");
        assert_eq!(nav.method, FrameNavigationMethod::Src);
        assert_eq!(v.host().frame_src().as_deref(), Some("/content/myarchive/A/Two"));
        assert!(v.pump_frame().unwrap().accessible);
        assert_eq!(v.host().title(), "Two - My Archive");
    }

    #[test]
    fn blocked_replace_falls_back_to_src() {
        let mut v = loaded("A/One");
        v.host_mut().set_replace_blocked(true);
        let nav = v.load_page("A/Two");
        assert_eq!(nav.method, FrameNavigationMethod::Src);
        assert_eq!(
            v.host().frame_pending().map(|u| u.path()),
            Some("/content/myarchive/A/Two")
        );
    }

    // ── random ──────────────────────────────────────────────────

    #[test]
    fn random_entry_is_loaded() {
        let mut v = loaded("A/One");
        let ticket = v.load_random();
        assert!(v.host().ui().spinner);
        assert_eq!(v.host().random_requests(), &[ticket]);

        let nav = v.respond_random(Ok(RandomEntry {
            title: "Two".into(),
            path: "A/Two".into(),
        }));
        assert_eq!(nav.unwrap().url, "/content/myarchive/A/Two");
        assert_eq!(v.host().outer_location(), "/viewer/myarchive/A/Two");
    }

    #[test]
    fn random_without_result_hides_spinner() {
        let mut v = loaded("A/One");
        v.load_random();
        assert_eq!(v.respond_random(Ok(RandomEntry::default())), None);
        assert!(!v.host().ui().spinner);

        v.load_random();
        assert_eq!(v.respond_random(Err(decode_error())), None);
        assert!(!v.host().ui().spinner);
        assert_eq!(v.host().push_count(), 0);
    }

    #[test]
    fn superseded_random_is_discarded() {
        let mut v = loaded("A/One");
        v.load_random();
        v.load_page("A/Two");
        let nav = v.respond_random(Ok(RandomEntry {
            title: String::new(),
            path: "dir/index.html".into(),
        }));
        assert_eq!(nav, None);
        assert_eq!(v.host().outer_location(), "/viewer/myarchive/A/Two");
        assert_eq!(v.host().push_count(), 1);
    }

    // ── synchronization ─────────────────────────────────────────

    #[test]
    fn initial_query_and_hash_reach_the_frame() {
        let host = host("/viewer/myarchive/A/One?lang=en#History")
            .with_frame_src("/content/myarchive/A/One");
        let mut v = viewer(host);
        v.start();
        assert_eq!(
            v.host().frame_src().as_deref(),
            Some("/content/myarchive/A/One?lang=en#History")
        );
        v.pump_frame();
        assert_eq!(v.host().frame_location().fragment(), Some("History"));
        assert_eq!(
            v.host().outer_location(),
            "/viewer/myarchive/A/One?lang=en#History"
        );
        assert_eq!(v.host().push_count(), 0);
    }

    #[test]
    fn initial_src_keeps_its_own_query() {
        let host = host("/viewer/myarchive/A/One?lang=en#History")
            .with_frame_src("/content/myarchive/A/One?v=2");
        let mut v = viewer(host);
        v.start();
        assert_eq!(
            v.host().frame_src().as_deref(),
            Some("/content/myarchive/A/One?v=2#History")
        );
    }

    #[test]
    fn spinner_probe_catches_slow_initial_load() {
        let host = host("/viewer/myarchive/A/One").with_frame_src("/content/myarchive/A/One");
        let mut v = viewer(host);
        v.start();
        assert!(!v.host().ui().spinner);
        v.advance(Duration::from_millis(300));
        assert!(v.host().ui().spinner);
        v.pump_frame();
        assert!(!v.host().ui().spinner);
    }

    #[test]
    fn spinner_probe_is_quiet_after_load() {
        let mut v = loaded("A/One");
        v.advance(Duration::from_millis(300));
        assert!(!v.host().ui().spinner);
    }

    #[test]
    fn frame_history_changes_are_mirrored_with_replace() {
        let mut v = loaded("dir/index.html");
        let outcome = v.frame_push_state("other.html#sec");
        assert_eq!(
            outcome,
            Some(SyncOutcome::Replaced("/viewer/myarchive/dir/other.html#sec".into()))
        );
        assert_eq!(v.host().push_count(), 0);
        assert_eq!(
            v.host().history_ops().last(),
            Some(&HistoryOp::Replace("/viewer/myarchive/dir/other.html#sec".into()))
        );
    }

    #[test]
    fn history_change_settles_fragment_navigation() {
        let mut v = loaded("A/One");
        v.load_page("A/One#History");
        assert_eq!(v.phase(), SyncPhase::Navigating);
        // a fragment-only replace never fires load
        v.frame_push_state("#History");
        assert_eq!(v.phase(), SyncPhase::Loaded);
        assert!(!v.host().ui().spinner);
    }

    #[test]
    fn resync_repairs_drift_but_waits_for_navigation() {
        let mut v = loaded("A/One");
        v.host_mut().replace_state("/viewer/myarchive/stale");
        v.advance(Duration::from_millis(500));
        assert_eq!(v.host().outer_location(), "/viewer/myarchive/A/One");

        v.load_page("A/Two");
        v.advance(Duration::from_millis(2000));
        assert_eq!(v.host().outer_location(), "/viewer/myarchive/A/Two");
        v.pump_frame();
        v.advance(Duration::from_millis(500));
        assert_eq!(v.host().outer_location(), "/viewer/myarchive/A/Two");
    }

    #[test]
    fn stop_cancels_timers() {
        let mut v = loaded("A/One");
        assert!(v.host().active_timers() > 0);
        v.stop();
        assert_eq!(v.host().active_timers(), 0);
    }

    // ── links ───────────────────────────────────────────────────

    #[test]
    fn external_link_goes_through_catch() {
        let mut v = loaded("dir/index.html");
        assert_eq!(v.click(OUT), Some(ClickDisposition::Prevented));
        assert_eq!(
            v.host().outer_location(),
            "/catch?viewer=myarchive&url=https%3A%2F%2Fexample.com%2Fx"
        );
        assert_eq!(
            v.host().frame_pending().map(|u| u.as_str()),
            Some("http://localhost:8080/catch?url=https%3A%2F%2Fexample.com%2Fx")
        );
        assert!(v.host().ui().spinner);
        assert!(v
            .host()
            .history_ops()
            .iter()
            .all(|op| !matches!(op, HistoryOp::Push(u) if u.starts_with("/viewer/"))));

        // the catch page reconciles to the same outer URL
        let load = v.pump_frame().unwrap();
        assert_eq!(load.outcome, SyncOutcome::InSync);

        // and back returns to the archive page
        let nav = v.go_back().unwrap();
        assert_eq!(nav.url, "/content/myarchive/dir/index.html");
    }

    #[test]
    fn relative_link_resolves_under_content_prefix() {
        let mut v = loaded("dir/index.html");
        assert_eq!(v.click(SUB), Some(ClickDisposition::Prevented));
        assert_eq!(v.host().outer_location(), "/viewer/myarchive/dir/sub/page.html");
        assert_eq!(
            v.host().frame_pending().map(|u| u.path()),
            Some("/content/myarchive/dir/sub/page.html")
        );
        v.pump_frame();
        assert_eq!(v.host().title(), "Sub Page - My Archive");
    }

    #[test]
    fn mail_and_fragment_links_keep_default_behavior() {
        let mut v = loaded("dir/index.html");
        assert_eq!(v.click(MAIL), Some(ClickDisposition::Default));
        assert_eq!(v.host().anchor_target(MAIL), Some("_blank"));
        assert_eq!(v.click(TOP), Some(ClickDisposition::Default));
        assert!(v.host().history_ops().is_empty());
        assert_eq!(v.host().frame_pending(), None);
    }

    #[test]
    fn empty_href_keeps_default_behavior() {
        let mut v = loaded("dir/index.html");
        assert!(v.host().is_armed(EMPTY));
        assert_eq!(v.click(EMPTY), Some(ClickDisposition::Default));
        assert!(v.host().history_ops().is_empty());
        assert_eq!(v.host().frame_pending(), None);
    }

    #[test]
    fn frame_loaded_before_start_is_picked_up() {
        let host = host("/viewer/myarchive/dir/index.html")
            .with_loaded_frame("/content/myarchive/dir/index.html");
        let mut v = viewer(host);
        assert!(!v.host().is_armed(SUB));
        v.start();

        assert_eq!(v.phase(), SyncPhase::Loaded);
        assert!(v.host().is_armed(SUB));
        assert!(v.host().is_observing_frame());
        assert_eq!(v.host().title(), "Index - My Archive");

        assert_eq!(v.click(OUT), Some(ClickDisposition::Prevented));
        assert_eq!(
            v.host().outer_location(),
            "/catch?viewer=myarchive&url=https%3A%2F%2Fexample.com%2Fx"
        );
    }

    #[test]
    fn blank_frame_at_start_waits_for_load() {
        let mut v = viewer(host("/viewer/myarchive/"));
        v.start();
        assert_eq!(v.phase(), SyncPhase::Idle);
        assert_eq!(v.host().title(), "");
    }

    #[test]
    fn foreign_archive_link_leaves_viewer() {
        let mut v = loaded("dir/index.html");
        assert_eq!(v.click(OTHER), Some(ClickDisposition::Prevented));
        assert_eq!(
            v.host().history_ops(),
            &[HistoryOp::Assign("http://localhost:8080/viewer/other/".into())]
        );
    }

    #[test]
    fn error_buttons_are_not_armed() {
        let mut v = loaded("dir/index.html");
        assert!(!v.host().is_armed(ERROR_BTN));
        assert_eq!(v.click(ERROR_BTN), None);
    }

    #[test]
    fn rearming_is_idempotent() {
        let mut v = loaded("dir/index.html");
        assert!((0..ERROR_BTN).all(|id| v.host().is_armed(id)));
        assert_eq!(links::arm(v.host_mut()), Ok(0));
        v.on_frame_load();
        assert_eq!(links::arm(v.host_mut()), Ok(0));
    }

    #[test]
    fn frame_click_dismisses_overlay() {
        let mut v = loaded("dir/index.html");
        v.host_mut().set_search_overlay(true);
        v.click(TOP);
        assert!(!v.host().ui().overlay);
    }

    // ── search ──────────────────────────────────────────────────

    #[test]
    fn debounce_sends_only_the_latest_query() {
        let mut v = loaded("A/One");
        v.type_query("a");
        v.advance(Duration::from_millis(100));
        v.type_query("ab");
        v.advance(Duration::from_millis(150));
        v.type_query("abc");
        v.advance(Duration::from_millis(299));
        assert!(v.host().search_requests().is_empty());

        v.advance(Duration::from_millis(1));
        let requests = v.host().search_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0.query, "abc");
        assert_eq!(requests[0].1, SearchLimit::Unbounded);
        assert!(v.host().ui().search_loading);
        assert!(!v.host().ui().clear_button);
    }

    #[test]
    fn results_render_and_cache() {
        let mut v = loaded("A/One");
        v.type_query("te");
        v.advance(Duration::from_millis(300));
        assert!(v.respond_search(Ok(hits("te", &["Tea", "Tee"]))));

        let ui = v.host().ui();
        assert!(ui.overlay);
        assert!(!ui.search_loading);
        assert!(ui.clear_button);
        assert!(ui.results_markup.contains(">Tea</div>"));
        assert_eq!(v.session().last_search_results(), Some(ui.results_markup.as_str()));
    }

    #[test]
    fn short_query_never_searches_and_clears_results() {
        let mut v = loaded("A/One");
        v.type_query("te");
        v.advance(Duration::from_millis(300));
        v.respond_search(Ok(hits("te", &["Tea"])));

        v.type_query("t");
        assert!(!v.host().ui().overlay);
        assert_eq!(v.session().last_search_results(), None);
        assert!(v.host().ui().clear_button);
        v.advance(Duration::from_millis(1000));
        assert_eq!(v.host().search_requests().len(), 0);

        v.type_query("");
        assert!(!v.host().ui().clear_button);
    }

    #[test]
    fn stale_responses_are_dropped() {
        let mut v = loaded("A/One");
        v.type_query("te");
        v.advance(Duration::from_millis(300));
        v.type_query("tea");
        v.advance(Duration::from_millis(300));
        assert_eq!(v.host().search_requests().len(), 2);

        assert!(!v.respond_search(Ok(hits("te", &["Tee"]))));
        assert!(!v.host().ui().overlay);
        assert!(v.host().ui().search_loading);

        assert!(v.respond_search(Ok(hits("tea", &["Tea"]))));
        assert!(!v.host().ui().results_markup.contains("Tee"));
    }

    #[test]
    fn response_for_undispatched_edit_is_dropped() {
        let mut v = loaded("A/One");
        v.type_query("te");
        v.advance(Duration::from_millis(300));
        v.type_query("tea");
        assert!(!v.respond_search(Ok(hits("te", &["Tee"]))));
    }

    #[test]
    fn empty_and_failed_searches_show_placeholder() {
        let mut v = loaded("A/One");
        v.type_query("zz");
        v.advance(Duration::from_millis(300));
        assert!(v.respond_search(Ok(hits("zz", &[]))));
        assert_eq!(v.host().ui().results_markup, NO_RESULTS_MARKUP);
        assert!(v.session().last_search_results().is_some());

        v.type_query("zzz");
        v.advance(Duration::from_millis(300));
        assert!(v.respond_search(Err(decode_error())));
        assert_eq!(v.host().ui().results_markup, NO_RESULTS_MARKUP);
        assert!(!v.host().ui().search_loading);
        assert_eq!(v.session().last_search_results(), None);
    }

    #[test]
    fn clear_resets_everything() {
        let mut v = loaded("A/One");
        v.type_query("te");
        v.advance(Duration::from_millis(300));
        v.respond_search(Ok(hits("te", &["Tea"])));
        v.type_query("tea");
        v.clear_search();

        let ui = v.host().ui();
        assert_eq!(ui.search_input, "");
        assert_eq!(ui.results_markup, "");
        assert!(!ui.overlay && !ui.clear_button && !ui.search_loading);
        assert_eq!(v.session().last_search_results(), None);

        // the pending debounce for "tea" is gone
        v.advance(Duration::from_millis(1000));
        assert!(v.host().search_requests().is_empty());
    }

    #[test]
    fn overlay_reopens_without_requery() {
        let mut v = loaded("A/One");
        v.type_query("te");
        v.advance(Duration::from_millis(300));
        v.respond_search(Ok(hits("te", &["Tea"])));

        v.on_outside_click();
        assert!(!v.host().ui().overlay);
        assert!(v.show_search_results());
        assert!(v.host().ui().overlay);
        assert!(v.host().search_requests().is_empty());

        v.host_mut().type_input("t");
        v.on_outside_click();
        assert!(!v.show_search_results());
    }

    #[test]
    fn selecting_a_result_navigates_and_closes_overlay() {
        let mut v = loaded("A/One");
        v.type_query("tw");
        v.advance(Duration::from_millis(300));
        v.respond_search(Ok(hits("tw", &["Two"])));

        let nav = v.select_result("A/Two");
        assert_eq!(nav.url, "/content/myarchive/A/Two");
        assert_eq!(v.host().outer_location(), "/viewer/myarchive/A/Two");
        assert!(!v.host().ui().overlay);
        assert!(v.session().last_search_results().is_some());
    }
}
