//! Translation between outer (address bar) and inner (content frame) URLs.
//!
//! ```text
//! outer  /viewer/{archive}/{path}{?query}{#hash}
//! inner  /content/{archive}/{path}{?query}{#hash}
//!
//! outer  /catch?viewer={archive}&url={encoded}
//! inner  /catch?url={encoded}
//! ```
//!
//! Everything here is pure. A location matching neither shape translates to
//! `None`, which callers treat as "leave the address bar alone".

use std::fmt;

use url::Url;

/// Path prefix of the canonical, user-visible viewer route.
pub const VIEWER_ROOT: &str = "/viewer/";
/// Path prefix of the frame's actual source.
pub const CONTENT_ROOT: &str = "/content/";
/// Interstitial route for off-archive links, rendered inside the frame too.
pub const CATCH_ROUTE: &str = "/catch";

/// Same-origin location split the way `window.location` exposes it.
///
/// `search` and `hash` keep their leading `?` / `#` and are empty when
/// absent or empty, matching the DOM's `Location` accessors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    pub search: String,
    pub hash: String,
}

impl Location {
    pub fn new(
        path: impl Into<String>,
        search: impl Into<String>,
        hash: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            search: normalize_part(search.into()),
            hash: normalize_part(hash.into()),
        }
    }

    /// Split a path-absolute reference such as `/a/b?x=1#top`.
    pub fn parse(reference: &str) -> Self {
        let (rest, hash) = match reference.find('#') {
            Some(i) => reference.split_at(i),
            None => (reference, ""),
        };
        let (path, search) = match rest.find('?') {
            Some(i) => rest.split_at(i),
            None => (rest, ""),
        };
        Self::new(path, search, hash)
    }

    pub fn from_url(url: &Url) -> Self {
        Self::new(
            url.path(),
            url.query().map(|q| format!("?{q}")).unwrap_or_default(),
            url.fragment().map(|f| format!("#{f}")).unwrap_or_default(),
        )
    }

    /// First value of a query parameter, form-decoded like `URLSearchParams.get`.
    pub fn query_param(&self, key: &str) -> Option<String> {
        let query = self.search.strip_prefix('?').unwrap_or(&self.search);
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.path, self.search, self.hash)
    }
}

/// A lone `?` or `#` carries nothing; the DOM reports it as empty.
fn normalize_part(part: String) -> String {
    if part.len() == 1 {
        String::new()
    } else {
        part
    }
}

/// `encodeURIComponent`: `urlencoding` also escapes `!'()*`, which the
/// browser leaves alone.
fn encode_component(raw: &str) -> String {
    let mut encoded = urlencoding::encode(raw).into_owned();
    let kept = [
        ("%21", "!"),
        ("%27", "'"),
        ("%28", "("),
        ("%29", ")"),
        ("%2A", "*"),
    ];
    for (escaped, plain) in kept {
        encoded = encoded.replace(escaped, plain);
    }
    encoded
}

fn is_catch(path: &str) -> bool {
    path.starts_with(CATCH_ROUTE)
}

/// Route shapes for one archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routes {
    archive: String,
    viewer_prefix: String,
    content_prefix: String,
}

impl Routes {
    pub fn new(archive: &str) -> Self {
        Self {
            archive: archive.to_string(),
            viewer_prefix: format!("{VIEWER_ROOT}{archive}/"),
            content_prefix: format!("{CONTENT_ROOT}{archive}/"),
        }
    }

    pub fn archive(&self) -> &str {
        &self.archive
    }

    /// `/viewer/{archive}/`
    pub fn viewer_prefix(&self) -> &str {
        &self.viewer_prefix
    }

    /// `/content/{archive}/`
    pub fn content_prefix(&self) -> &str {
        &self.content_prefix
    }

    /// Outer URL for an archive-relative path (which may carry query/hash).
    pub fn viewer_url(&self, relative: &str) -> String {
        format!("{}{}", self.viewer_prefix, relative)
    }

    /// Frame URL for an archive-relative path (which may carry query/hash).
    pub fn content_url(&self, relative: &str) -> String {
        format!("{}{}", self.content_prefix, relative)
    }

    /// Outer catch URL for an off-archive target.
    pub fn catch_outer(&self, target: &str) -> String {
        format!(
            "{CATCH_ROUTE}?viewer={}&url={}",
            encode_component(&self.archive),
            encode_component(target)
        )
    }

    /// Frame catch URL for an off-archive target.
    pub fn catch_inner(target: &str) -> String {
        format!("{CATCH_ROUTE}?url={}", encode_component(target))
    }

    /// Archive-relative part of a frame path, if it lives under the content prefix.
    pub fn content_relative<'a>(&self, path: &'a str) -> Option<&'a str> {
        path.strip_prefix(self.content_prefix.as_str())
    }

    /// Frame URL the address bar location stands for.
    pub fn outer_to_inner(&self, outer: &Location) -> Option<String> {
        if let Some(relative) = outer.path.strip_prefix(self.viewer_prefix.as_str()) {
            return Some(format!(
                "{}{}{}",
                self.content_url(relative),
                outer.search,
                outer.hash
            ));
        }
        if is_catch(&outer.path) {
            return outer
                .query_param("url")
                .filter(|target| !target.is_empty())
                .map(|target| Self::catch_inner(&target));
        }
        None
    }

    /// Address bar URL mirroring a frame location.
    pub fn inner_to_outer(&self, inner: &Location) -> Option<String> {
        if let Some(relative) = self.content_relative(&inner.path) {
            return Some(format!(
                "{}{}{}",
                self.viewer_url(relative),
                inner.search,
                inner.hash
            ));
        }
        if is_catch(&inner.path) {
            return inner
                .query_param("url")
                .filter(|target| !target.is_empty())
                .map(|target| self.catch_outer(&target));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn routes() -> Routes {
        Routes::new("myarchive")
    }

    #[test]
    fn parse_splits_parts() {
        let loc = Location::parse("/viewer/myarchive/A/Page?x=1&y=2#sec");
        assert_eq!(
            loc,
            Location::new("/viewer/myarchive/A/Page", "?x=1&y=2", "#sec")
        );
        assert_eq!(loc.to_string(), "/viewer/myarchive/A/Page?x=1&y=2#sec");
    }

    #[test]
    fn bare_markers_are_empty() {
        let loc = Location::parse("/content/myarchive/A?#");
        assert_eq!(loc.search, "");
        assert_eq!(loc.hash, "");
        let url = Url::parse("http://localhost/content/myarchive/A?#").unwrap();
        assert_eq!(Location::from_url(&url), loc);
    }

    #[test]
    fn hash_may_contain_question_mark() {
        let loc = Location::parse("/a#frag?not-a-query");
        assert_eq!(loc.search, "");
        assert_eq!(loc.hash, "#frag?not-a-query");
    }

    #[test]
    fn viewer_round_trips_through_content() {
        let routes = routes();
        let cases = [
            ("", "", ""),
            ("A/Main_Page", "", ""),
            ("dir/sub/page.html", "?lang=en", ""),
            ("dir/page.html", "", "#History"),
            ("I/m/Logo.png", "?v=3&w=2", "#top"),
        ];
        for (path, query, hash) in cases {
            let outer = Location::new(routes.viewer_url(path), query, hash);
            let inner = routes.outer_to_inner(&outer).unwrap();
            let back = routes.inner_to_outer(&Location::parse(&inner)).unwrap();
            assert_eq!(back, outer.to_string());
        }
    }

    #[test]
    fn catch_routes_encode_target() {
        let routes = routes();
        let inner = Location::parse("/catch?url=https%3A%2F%2Fexample.com%2Fx");
        assert_eq!(
            routes.inner_to_outer(&inner).unwrap(),
            "/catch?viewer=myarchive&url=https%3A%2F%2Fexample.com%2Fx"
        );

        let outer = Location::parse("/catch?viewer=myarchive&url=https%3A%2F%2Fexample.com%2Fx");
        assert_eq!(
            routes.outer_to_inner(&outer).unwrap(),
            "/catch?url=https%3A%2F%2Fexample.com%2Fx"
        );
    }

    #[test]
    fn catch_without_target_is_untranslatable() {
        let routes = routes();
        assert_eq!(routes.inner_to_outer(&Location::parse("/catch")), None);
        assert_eq!(routes.inner_to_outer(&Location::parse("/catch?url=")), None);
        assert_eq!(routes.outer_to_inner(&Location::parse("/catch?viewer=myarchive")), None);
    }

    #[test]
    fn unknown_shapes_are_untranslatable() {
        let routes = routes();
        assert_eq!(routes.inner_to_outer(&Location::parse("/")), None);
        assert_eq!(routes.inner_to_outer(&Location::parse("/content/other/A")), None);
        assert_eq!(routes.inner_to_outer(&Location::parse("about:blank")), None);
        assert_eq!(routes.outer_to_inner(&Location::parse("/viewer/other/A")), None);
    }

    #[test]
    fn catch_encoding_matches_encode_uri_component() {
        let routes = routes();
        let target = "https://x.org/a(b)!*'~_.-?q=1&r=%";
        let outer = routes.catch_outer(target);
        assert_eq!(
            outer,
            "/catch?viewer=myarchive&url=https%3A%2F%2Fx.org%2Fa(b)!*'~_.-%3Fq%3D1%26r%3D%25"
        );
        let inner = routes.outer_to_inner(&Location::parse(&outer)).unwrap();
        assert_eq!(Location::parse(&inner).query_param("url").as_deref(), Some(target));
    }

    #[test]
    fn archive_names_are_encoded_in_catch_query() {
        let routes = Routes::new("my archive");
        assert_eq!(
            routes.catch_outer("http://a.b/"),
            "/catch?viewer=my%20archive&url=http%3A%2F%2Fa.b%2F"
        );
    }
}
