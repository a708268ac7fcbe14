//! Search-as-you-type against the archive's title index.
//!
//! Keystrokes re-arm a single debounce timer. When it fires, the query is
//! dispatched with a fresh sequence number; a response is rendered only if
//! it carries the latest number *and* the query still matches the input.

use std::time::Duration;

use crate::config::{SearchLimit, ViewerConfig};
use crate::error::ApiError;
use crate::host::{Host, SearchTicket, Timer, TimerHandle};
use crate::net::{SearchHit, SearchResponse};
use crate::session::ViewerSession;

/// Placeholder rendered for an empty or failed search.
pub const NO_RESULTS_MARKUP: &str =
    r#"<div class="search-result-item no-results">No results found</div>"#;

/// Result list markup. Titles and paths are untrusted and escaped; the path
/// rides in `data-path` for the host to hand back on selection.
pub fn render_hits(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|hit| {
            format!(
                r#"<div class="search-result-item" data-path="{}">{}</div>"#,
                v_htmlescape::escape(&hit.path),
                v_htmlescape::escape(&hit.title)
            )
        })
        .collect()
}

#[derive(Debug)]
pub struct SearchController {
    debounce: Duration,
    min_chars: usize,
    limit: SearchLimit,
    pending: Option<TimerHandle>,
    /// Latest text typed, dispatched or not.
    query: String,
    /// Sequence number of the latest dispatch or invalidation.
    seq: u64,
}

impl SearchController {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            debounce: config.search_debounce(),
            min_chars: config.min_query_chars,
            limit: config.search_limit,
            pending: None,
            query: String::new(),
            seq: 0,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// An empty query never reaches the backend, whatever the minimum.
    fn long_enough(&self, query: &str) -> bool {
        !query.is_empty() && query.chars().count() >= self.min_chars
    }

    /// Input changed.
    pub fn search<H: Host>(&mut self, host: &mut H, session: &mut ViewerSession, query: &str) {
        self.cancel_pending(host);
        host.set_clear_button(!query.is_empty());
        self.query = query.to_string();

        if !self.long_enough(query) {
            // Whatever is still in flight no longer matters.
            self.seq += 1;
            host.set_search_overlay(false);
            host.set_search_loading(false);
            session.drop_search_results();
            return;
        }

        self.pending = Some(host.set_timeout(Timer::SearchDebounce, self.debounce));
    }

    /// Debounce timer fired: dispatch the latest query.
    pub fn on_debounce<H: Host>(&mut self, host: &mut H) -> Option<SearchTicket> {
        self.pending = None;
        if !self.long_enough(&self.query) {
            return None;
        }
        self.seq += 1;
        let ticket = SearchTicket {
            seq: self.seq,
            query: self.query.clone(),
        };
        host.set_clear_button(false);
        host.set_search_loading(true);
        log::debug!("search #{} for {:?}", ticket.seq, ticket.query);
        host.request_search(ticket.clone(), self.limit);
        Some(ticket)
    }

    /// Returns whether the response was rendered.
    pub fn on_response<H: Host>(
        &mut self,
        host: &mut H,
        session: &mut ViewerSession,
        ticket: &SearchTicket,
        result: Result<SearchResponse, ApiError>,
    ) -> bool {
        if ticket.seq != self.seq || ticket.query != self.query {
            log::debug!("dropping stale search #{} for {:?}", ticket.seq, ticket.query);
            return false;
        }

        host.set_search_loading(false);
        if !host.search_input().is_empty() {
            host.set_clear_button(true);
        }

        let markup = match result {
            Ok(response) if !response.results.is_empty() => {
                let markup = render_hits(&response.results);
                session.cache_search_results(markup.clone());
                markup
            }
            Ok(_) => {
                session.cache_search_results(NO_RESULTS_MARKUP.to_string());
                NO_RESULTS_MARKUP.to_string()
            }
            Err(e) => {
                log::error!("search for {:?} failed: {}", ticket.query, e);
                session.drop_search_results();
                NO_RESULTS_MARKUP.to_string()
            }
        };
        host.render_search_results(&markup);
        host.set_search_overlay(true);
        true
    }

    /// Reset the input and everything derived from it.
    pub fn clear<H: Host>(&mut self, host: &mut H, session: &mut ViewerSession) {
        self.cancel_pending(host);
        self.seq += 1;
        self.query.clear();
        host.set_search_input("");
        host.set_clear_button(false);
        host.set_search_overlay(false);
        host.render_search_results("");
        host.set_search_loading(false);
        session.drop_search_results();
    }

    /// Show the cached results again, without a request, if the input still
    /// holds a searchable query.
    pub fn reopen<H: Host>(&self, host: &mut H, session: &ViewerSession) -> bool {
        let reopen = self.long_enough(&host.search_input())
            && session.last_search_results().is_some_and(|m| !m.is_empty());
        if reopen {
            host.set_search_overlay(true);
        }
        reopen
    }

    /// Hide the overlay; results stay cached.
    pub fn dismiss<H: Host>(&self, host: &mut H) {
        host.set_search_overlay(false);
    }

    fn cancel_pending<H: Host>(&mut self, host: &mut H) {
        if let Some(handle) = self.pending.take() {
            host.clear_timer(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessHost;
    use pretty_assertions::assert_eq;
    use url::Url;

    #[test]
    fn hits_are_escaped() {
        let markup = render_hits(&[
            SearchHit::new("<b>Bold</b> & co", "A/It's \"quoted\""),
            SearchHit::new("Plain", "A/Plain"),
        ]);
        assert!(!markup.contains("<b>"));
        assert!(markup.contains("&lt;b&gt;Bold"));
        assert!(markup.contains("&amp; co"));
        assert!(markup.contains("&quot;quoted&quot;"));
        assert!(!markup.contains("It's"));
        assert_eq!(markup.matches("search-result-item").count(), 2);
    }

    #[test]
    fn empty_query_never_dispatches() {
        let config = ViewerConfig::new("wiki").with_min_query_chars(0);
        let outer = Url::parse("http://localhost:8080/viewer/wiki/").unwrap();
        let mut host = HeadlessHost::new(outer);
        let mut session = ViewerSession::new("wiki");
        let mut search = SearchController::new(&config);

        search.search(&mut host, &mut session, "");
        assert!(!search.is_pending());
        assert_eq!(search.on_debounce(&mut host), None);
        assert!(host.search_requests().is_empty());

        search.search(&mut host, &mut session, "a");
        assert!(search.is_pending());
        assert_eq!(search.on_debounce(&mut host).map(|t| t.query), Some("a".to_string()));
    }

    #[test]
    fn empty_hit_list_renders_nothing() {
        assert_eq!(render_hits(&[]), "");
    }
}
