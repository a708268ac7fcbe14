#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use std::path::{Path, PathBuf};

    use anyhow::{bail, Context, Result};
    use clap::{Parser, Subcommand};
    use url::Url;

    use archive_viewer::config::SearchLimit;
    use archive_viewer::dom::parser::parse_html;
    use archive_viewer::location::{Location, Routes};
    use archive_viewer::nav::links::{classify, LinkAction};
    use archive_viewer::nav::NavigationIntent;
    use archive_viewer::net::BlockingArchiveApi;

    #[derive(Parser)]
    #[command(name = "archive-viewer")]
    #[command(about = "Inspect how the archive viewer maps URLs, links and searches")]
    #[command(version)]
    pub struct Cli {
        /// Archive (book) name
        #[arg(short, long, global = true, default_value = "")]
        archive: String,

        #[command(subcommand)]
        command: Commands,
    }

    #[derive(Subcommand)]
    enum Commands {
        /// Translate between address bar and frame URLs
        Translate {
            /// Absolute URL or path-absolute location, e.g. /viewer/wiki/A/Foo?x=1#top
            location: String,
        },

        /// Show what a click on each link of a saved page would do
        Links {
            /// HTML file to scan
            file: PathBuf,
            /// Frame URL the page was served from
            #[arg(long)]
            at: String,
            /// Origin of the viewer page, if it differs from the frame's
            #[arg(long)]
            origin: Option<String>,
        },

        /// Title search against a running server
        Search {
            query: String,
            #[arg(short, long, default_value = "http://localhost:8080")]
            server: String,
            /// Result cap; -1 for unbounded
            #[arg(short, long, default_value = "-1", allow_hyphen_values = true)]
            limit: i64,
        },

        /// Fetch a random entry from a running server
        Random {
            #[arg(short, long, default_value = "http://localhost:8080")]
            server: String,
        },
    }

    pub fn run() -> Result<()> {
        let cli = Cli::parse();
        if cli.archive.is_empty() {
            bail!("--archive is required");
        }
        let routes = Routes::new(&cli.archive);

        match cli.command {
            Commands::Translate { location } => translate(&routes, &location),
            Commands::Links { file, at, origin } => links(&routes, &file, &at, origin.as_deref()),
            Commands::Search {
                query,
                server,
                limit,
            } => {
                let api = BlockingArchiveApi::new(&server, &cli.archive)?;
                let response = api.search(&query, SearchLimit::from(limit))?;
                if response.results.is_empty() {
                    println!("No results for {:?}", response.query);
                }
                for hit in &response.results {
                    println!("{}\t{}", hit.path, hit.title);
                }
                Ok(())
            }
            Commands::Random { server } => {
                let api = BlockingArchiveApi::new(&server, &cli.archive)?;
                let entry = api.random()?;
                if entry.path.is_empty() {
                    bail!("server returned no entry");
                }
                println!("{}", routes.viewer_url(&entry.path));
                Ok(())
            }
        }
    }

    fn translate(routes: &Routes, location: &str) -> Result<()> {
        let loc = match Url::parse(location) {
            Ok(url) => Location::from_url(&url),
            Err(_) => Location::parse(location),
        };
        match (routes.outer_to_inner(&loc), routes.inner_to_outer(&loc)) {
            (Some(inner), _) => println!("frame  {inner}"),
            (None, Some(outer)) => println!("outer  {outer}"),
            (None, None) => println!("no translation"),
        }
        Ok(())
    }

    fn links(routes: &Routes, file: &Path, at: &str, origin: Option<&str>) -> Result<()> {
        let html = std::fs::read_to_string(file)
            .with_context(|| format!("reading {}", file.display()))?;
        let base = Url::parse(at).with_context(|| format!("invalid frame URL {at}"))?;
        let origin = match origin {
            Some(o) => Url::parse(o)
                .with_context(|| format!("invalid origin {o}"))?
                .origin(),
            None => base.origin(),
        };
        let tree = parse_html(&html, at);

        log::info!("{} anchors in {:?}", tree.anchors().len(), tree.title);
        for anchor in tree.anchors() {
            if anchor.is_error_action() {
                continue;
            }
            let Some(href) = anchor.href.as_deref() else {
                continue;
            };
            let outcome = match classify(routes, href, &base, &origin) {
                LinkAction::PassThrough => "default".to_string(),
                LinkAction::NewWindow => "new window".to_string(),
                LinkAction::Follow(NavigationIntent::Page(path)) => {
                    format!("page  {}", routes.viewer_url(&path))
                }
                LinkAction::Follow(NavigationIntent::External(target)) => {
                    format!("catch {}", routes.catch_outer(&target))
                }
                LinkAction::TopLevel(url) => format!("leave {url}"),
            };
            println!("{href}\t{outcome}");
        }
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    env_logger::init();
    cli::run()
}

#[cfg(target_arch = "wasm32")]
fn main() {}
