use scraper::{ElementRef, Html, Selector};

use crate::dom::DomTree;
use crate::host::Anchor;

/// Parse raw HTML into the title and link snapshot the viewer works from.
pub fn parse_html(html: &str, url: &str) -> DomTree {
    let document = Html::parse_document(html);

    let title = match Selector::parse("title") {
        Ok(sel) => {
            let first = document.select(&sel).next();
            first.map(|el| el.text().collect::<String>())
        }
        Err(_) => None,
    };

    let mut anchors = Vec::new();
    if let Ok(sel) = Selector::parse("a") {
        for (id, el) in document.select(&sel).enumerate() {
            anchors.push(anchor_from(id, el));
        }
    }

    DomTree::new(url, title.unwrap_or_default().trim(), anchors)
}

fn anchor_from(id: usize, el: ElementRef<'_>) -> Anchor {
    let element = el.value();
    Anchor {
        id,
        href: element.attr("href").map(str::to_string),
        classes: element.classes().map(str::to_string).collect(),
        target: element.attr("target").map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_title() {
        let html = r#"
        <html>
            <head><title> Main Page </title></head>
            <body><h1>Welcome</h1></body>
        </html>
        "#;

        let tree = parse_html(html, "http://localhost/content/wiki/A/Main_Page");
        assert_eq!(tree.title, "Main Page");
        assert_eq!(tree.url, "http://localhost/content/wiki/A/Main_Page");
        assert!(tree.anchors().is_empty());
    }

    #[test]
    fn lists_anchors_in_document_order() {
        let html = r##"
        <html><body>
            <a href="sub/page.html">Sub</a>
            <p><a href="https://example.com/x" target="_self">Out</a></p>
            <a class="btn error-btn" href="/">Home</a>
            <a name="no-href">Anchor</a>
            <script>document.write('<a href="ignored">x</a>')</script>
        </body></html>
        "##;

        let tree = parse_html(html, "http://localhost/");
        let anchors = tree.anchors();
        assert_eq!(anchors.len(), 4);
        assert_eq!(anchors[0].href.as_deref(), Some("sub/page.html"));
        assert_eq!(anchors[1].target.as_deref(), Some("_self"));
        assert!(anchors[2].is_error_action());
        assert_eq!(anchors[2].classes, vec!["btn", "error-btn"]);
        assert_eq!(anchors[3].href, None);
        assert_eq!(tree.anchor(3).map(|a| a.id), Some(3));
    }
}
