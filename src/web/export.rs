//! JavaScript entry point.
//!
//! ```js
//! import init, { ArchiveViewer } from "./archive_viewer.js";
//! await init();
//! const viewer = new ArchiveViewer("wikipedia_en", '{"search_limit": 50}');
//! viewer.loadRandom();
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use log::LevelFilter;
use wasm_bindgen::prelude::*;

use super::{bind_page_events, console, with_viewer, Listener, SharedViewer, WebHost};
use crate::config::ViewerConfig;
use crate::viewer::Viewer;

#[wasm_bindgen]
pub struct ArchiveViewer {
    shared: SharedViewer,
    _listeners: Vec<Listener>,
}

#[wasm_bindgen]
impl ArchiveViewer {
    /// Bind to the current page. `options` is an optional JSON object with
    /// the [`ViewerConfig`] fields.
    #[wasm_bindgen(constructor)]
    pub fn new(archive: &str, options: Option<String>) -> Result<ArchiveViewer, JsValue> {
        console::init(LevelFilter::Info);

        let config = ViewerConfig::from_json(archive, options.as_deref().unwrap_or(""))
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        let host = WebHost::from_document(&config)?;
        let viewer = Viewer::new(host, config)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;

        let shared: SharedViewer = Rc::new(RefCell::new(viewer));
        shared.borrow_mut().host_mut().attach(Rc::downgrade(&shared));
        let listeners = bind_page_events(&shared)?;
        shared.borrow_mut().start();

        Ok(ArchiveViewer {
            shared,
            _listeners: listeners,
        })
    }

    #[wasm_bindgen(js_name = loadPage)]
    pub fn load_page(&self, path: &str) {
        self.with(|v| {
            v.load_page(path);
        });
    }

    #[wasm_bindgen(js_name = loadHome)]
    pub fn load_home(&self) {
        self.with(|v| {
            v.load_home();
        });
    }

    #[wasm_bindgen(js_name = loadRandom)]
    pub fn load_random(&self) {
        self.with(|v| {
            v.load_random();
        });
    }

    pub fn search(&self, query: &str) {
        self.with(|v| v.search(query));
    }

    #[wasm_bindgen(js_name = clearSearch)]
    pub fn clear_search(&self) {
        self.with(|v| v.clear_search());
    }

    #[wasm_bindgen(js_name = showSearchResults)]
    pub fn show_search_results(&self) -> bool {
        self.with(|v| v.show_search_results()).unwrap_or(false)
    }

    /// `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"` or `"off"`.
    #[wasm_bindgen(js_name = setLogLevel)]
    pub fn set_log_level(&self, level: &str) -> Result<(), JsValue> {
        let level: LevelFilter = level
            .parse()
            .map_err(|_| JsValue::from_str(&format!("unknown log level {level:?}")))?;
        console::init(level);
        Ok(())
    }

    fn with<R>(&self, f: impl FnOnce(&mut Viewer<WebHost>) -> R) -> Option<R> {
        with_viewer(&Rc::downgrade(&self.shared), f)
    }
}

impl Drop for ArchiveViewer {
    fn drop(&mut self) {
        if let Ok(mut viewer) = self.shared.try_borrow_mut() {
            viewer.stop();
        }
    }
}
