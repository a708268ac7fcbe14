//! Browser host (wasm32 only).
//!
//! Binds the viewer to the real page: the `#contentFrame` iframe, the
//! `#spinner` indicator and the search widgets. Every DOM callback re-enters
//! the shared [`Viewer`] through [`with_viewer`], which refuses to nest.
//!
//! Objects from the frame document live in another JS realm, so they are
//! cast with `unchecked_*`; `instanceof` checks would reject them.

pub mod console;
mod export;

pub use export::ArchiveViewer;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::time::Duration;

use js_sys::{Function, Reflect};
use url::Url;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    Document, Element, Event, EventTarget, HtmlElement, HtmlIFrameElement, HtmlInputElement,
    Window,
};

use crate::config::{SearchLimit, ViewerConfig};
use crate::error::FrameAccessError;
use crate::host::{
    Anchor, AnchorId, Backend, ContentFrame, OuterWindow, RandomTicket, ReadyState, Scheduler,
    SearchTicket, Timer, TimerHandle, ViewerUi,
};
use crate::nav::links::ClickDisposition;
use crate::net::ArchiveApi;
use crate::viewer::Viewer;

pub(crate) type SharedViewer = Rc<RefCell<Viewer<WebHost>>>;
pub(crate) type WeakViewer = Weak<RefCell<Viewer<WebHost>>>;

const FRAME_ID: &str = "contentFrame";
const SPINNER_ID: &str = "spinner";
const SEARCH_INPUT_ID: &str = "searchInput";
const SEARCH_RESULTS_ID: &str = "searchResults";
const SEARCH_LOADING_ID: &str = "searchLoading";
const CLEAR_BUTTON_ID: &str = "clearSearchBtn";
const ARCHIVE_TITLE_SELECTOR: &str = ".archive-name";
const FRAME_CONTAINER_SELECTOR: &str = ".iframe-container";

/// Marks a frame anchor that already carries the click handler.
const ARMED_ATTR: &str = "data-viewer-armed";
/// Stable per-document anchor id handed out by [`WebHost::frame_anchors`].
const ANCHOR_ID_ATTR: &str = "data-viewer-anchor";
/// Property on the frame's `History` holding the unwrapped method.
const ORIGINAL_PREFIX: &str = "__archiveViewerOriginal_";

/// Run `f` against the viewer if it is alive and not already borrowed.
pub(crate) fn with_viewer<R>(
    weak: &WeakViewer,
    f: impl FnOnce(&mut Viewer<WebHost>) -> R,
) -> Option<R> {
    let shared = weak.upgrade()?;
    let result = match shared.try_borrow_mut() {
        Ok(mut viewer) => Some(f(&mut viewer)),
        Err(_) => {
            log::warn!("viewer busy, dropping re-entrant event");
            None
        }
    };
    result
}

pub(crate) fn js_error(value: &JsValue) -> String {
    value
        .as_string()
        .or_else(|| {
            Reflect::get(value, &JsValue::from_str("message"))
                .ok()
                .and_then(|m| m.as_string())
        })
        .unwrap_or_else(|| format!("{:?}", value))
}

/// Event listener that detaches itself when dropped.
pub(crate) struct Listener {
    target: EventTarget,
    kind: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

impl Listener {
    pub(crate) fn attach(
        target: &EventTarget,
        kind: &'static str,
        callback: impl FnMut(Event) + 'static,
    ) -> Result<Self, JsValue> {
        let callback = Closure::<dyn FnMut(Event)>::new(callback);
        target.add_event_listener_with_callback(kind, callback.as_ref().unchecked_ref())?;
        Ok(Self {
            target: target.clone(),
            kind,
            callback,
        })
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        // The target may have gone cross-origin meanwhile; nothing to do then.
        let _ = self
            .target
            .remove_event_listener_with_callback(self.kind, self.callback.as_ref().unchecked_ref());
    }
}

type HistoryWrapper = Closure<dyn FnMut(JsValue, JsValue, JsValue) -> Result<JsValue, JsValue>>;

struct JsTimer {
    id: i32,
    interval: bool,
    _callback: Closure<dyn FnMut()>,
}

pub struct WebHost {
    window: Window,
    document: Document,
    frame: HtmlIFrameElement,
    spinner: Option<Element>,
    frame_container: Option<HtmlElement>,
    search_input: Option<HtmlInputElement>,
    search_results: Option<Element>,
    search_loading: Option<Element>,
    clear_button: Option<Element>,
    api: ArchiveApi,
    viewer: WeakViewer,

    timers: HashMap<TimerHandle, JsTimer>,
    next_timer: u64,
    /// Fired one-shot timers whose closures can be dropped.
    spent: Vec<TimerHandle>,
    firing: Option<TimerHandle>,

    next_anchor: AnchorId,
    anchor_click: Option<Closure<dyn FnMut(Event)>>,
    frame_listeners: Vec<Listener>,
    history_wrappers: Vec<HistoryWrapper>,
}

impl WebHost {
    /// Look up the viewer page's elements. Only the content frame is required.
    pub fn from_document(config: &ViewerConfig) -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;
        let frame = document
            .get_element_by_id(FRAME_ID)
            .ok_or_else(|| JsValue::from_str("content frame #contentFrame not found"))?
            .dyn_into::<HtmlIFrameElement>()
            .map_err(|_| JsValue::from_str("#contentFrame is not an iframe"))?;

        let origin = window.location().origin()?;
        let base = Url::parse(&origin).map_err(|e| JsValue::from_str(&e.to_string()))?;

        if let Some(root) = document.document_element() {
            root.class_list().add_1("viewer-mode")?;
        }

        let by_id = |id: &str| document.get_element_by_id(id);
        Ok(Self {
            spinner: by_id(SPINNER_ID),
            frame_container: document
                .query_selector(FRAME_CONTAINER_SELECTOR)
                .ok()
                .flatten()
                .and_then(|e| e.dyn_into::<HtmlElement>().ok()),
            search_input: by_id(SEARCH_INPUT_ID).and_then(|e| e.dyn_into::<HtmlInputElement>().ok()),
            search_results: by_id(SEARCH_RESULTS_ID),
            search_loading: by_id(SEARCH_LOADING_ID),
            clear_button: by_id(CLEAR_BUTTON_ID),
            api: ArchiveApi::new(base, &config.archive),
            viewer: Weak::new(),
            timers: HashMap::new(),
            next_timer: 0,
            spent: Vec::new(),
            firing: None,
            next_anchor: 0,
            anchor_click: None,
            frame_listeners: Vec::new(),
            history_wrappers: Vec::new(),
            window,
            document,
            frame,
        })
    }

    /// Give the host its way back into the viewer and build the shared
    /// anchor click handler.
    pub(crate) fn attach(&mut self, viewer: WeakViewer) {
        let weak = viewer.clone();
        self.anchor_click = Some(Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            let Some(target) = event.current_target() else {
                return;
            };
            let element: Element = target.unchecked_into();
            let Some(anchor) = anchor_snapshot(&element) else {
                return;
            };
            if with_viewer(&weak, |v| v.on_link_click(&anchor)) == Some(ClickDisposition::Prevented) {
                event.prevent_default();
            }
        }));
        self.viewer = viewer;
    }

    pub(crate) fn window(&self) -> &Window {
        &self.window
    }

    pub(crate) fn document(&self) -> &Document {
        &self.document
    }

    pub(crate) fn frame(&self) -> &HtmlIFrameElement {
        &self.frame
    }

    pub(crate) fn search_input_element(&self) -> Option<&HtmlInputElement> {
        self.search_input.as_ref()
    }

    pub(crate) fn search_results_element(&self) -> Option<&Element> {
        self.search_results.as_ref()
    }

    pub(crate) fn clear_button_element(&self) -> Option<&Element> {
        self.clear_button.as_ref()
    }

    fn frame_window(&self) -> Result<Window, FrameAccessError> {
        self.frame.content_window().ok_or(FrameAccessError::Detached)
    }

    /// `None` from `contentDocument` means another origin.
    fn frame_document(&self) -> Result<Document, FrameAccessError> {
        self.frame_window()?;
        self.frame
            .content_document()
            .ok_or(FrameAccessError::CrossOrigin)
    }

    fn find_anchor(&self, id: AnchorId) -> Result<Option<Element>, FrameAccessError> {
        let doc = self.frame_document()?;
        doc.query_selector(&format!("a[{}=\"{}\"]", ANCHOR_ID_ATTR, id))
            .map_err(|e| FrameAccessError::Rejected(js_error(&e)))
    }

    fn schedule(&mut self, timer: Timer, delay: Duration, interval: bool) -> TimerHandle {
        self.sweep_spent();
        self.next_timer += 1;
        let handle = TimerHandle(self.next_timer);

        let weak = self.viewer.clone();
        let callback = Closure::<dyn FnMut()>::new(move || {
            with_viewer(&weak, |v| {
                if !interval {
                    v.host_mut().spent.push(handle);
                }
                v.host_mut().firing = Some(handle);
                v.on_timer(timer);
                v.host_mut().firing = None;
            });
        });

        let ms = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
        let function: &Function = callback.as_ref().unchecked_ref();
        let id = if interval {
            self.window
                .set_interval_with_callback_and_timeout_and_arguments_0(function, ms)
        } else {
            self.window
                .set_timeout_with_callback_and_timeout_and_arguments_0(function, ms)
        };
        match id {
            Ok(id) => {
                self.timers.insert(
                    handle,
                    JsTimer {
                        id,
                        interval,
                        _callback: callback,
                    },
                );
            }
            Err(e) => log::error!("cannot schedule {:?}: {}", timer, js_error(&e)),
        }
        handle
    }

    fn sweep_spent(&mut self) {
        let firing = self.firing;
        let spent = std::mem::take(&mut self.spent);
        for handle in spent {
            if Some(handle) == firing {
                self.spent.push(handle);
            } else {
                self.timers.remove(&handle);
            }
        }
    }

    fn wrap_history_method(
        &mut self,
        history: &JsValue,
        name: &str,
    ) -> Result<(), JsValue> {
        let key = JsValue::from_str(name);
        let saved_key = JsValue::from_str(&format!("{ORIGINAL_PREFIX}{name}"));

        // A reused window still holds our previous wrapper; always wrap the original.
        let saved = Reflect::get(history, &saved_key)?;
        let original: Function = if saved.is_function() {
            saved.unchecked_into()
        } else {
            let current = Reflect::get(history, &key)?;
            if !current.is_function() {
                return Err(JsValue::from_str("history method missing"));
            }
            Reflect::set(history, &saved_key, &current)?;
            current.unchecked_into()
        };

        let weak = self.viewer.clone();
        let this = history.clone();
        let wrapper: HistoryWrapper = Closure::new(move |state: JsValue, title: JsValue, url: JsValue| {
            let result = original.call3(&this, &state, &title, &url);
            with_viewer(&weak, |v| v.on_frame_history_change());
            result
        });
        Reflect::set(history, &key, wrapper.as_ref())?;
        self.history_wrappers.push(wrapper);
        Ok(())
    }
}

/// Read an anchor element of the frame document.
fn anchor_snapshot(element: &Element) -> Option<Anchor> {
    let id = element.get_attribute(ANCHOR_ID_ATTR)?.parse().ok()?;
    Some(Anchor {
        id,
        href: element.get_attribute("href"),
        classes: element
            .class_name()
            .split_whitespace()
            .map(str::to_string)
            .collect(),
        target: element.get_attribute("target"),
    })
}

fn set_class(element: Option<&Element>, class: &str, on: bool) {
    if let Some(element) = element {
        if let Err(e) = element.class_list().toggle_with_force(class, on) {
            log::warn!("cannot toggle .{}: {}", class, js_error(&e));
        }
    }
}

impl OuterWindow for WebHost {
    fn url(&self) -> Url {
        let href = self.window.location().href().unwrap_or_default();
        Url::parse(&href).unwrap_or_else(|_| self.api_base())
    }

    fn push_state(&mut self, url: &str) {
        let result = self
            .window
            .history()
            .and_then(|h| h.push_state_with_url(&JsValue::NULL, "", Some(url)));
        if let Err(e) = result {
            log::error!("pushState({}) failed: {}", url, js_error(&e));
        }
    }

    fn replace_state(&mut self, url: &str) {
        let result = self
            .window
            .history()
            .and_then(|h| h.replace_state_with_url(&JsValue::NULL, "", Some(url)));
        if let Err(e) = result {
            log::error!("replaceState({}) failed: {}", url, js_error(&e));
        }
    }

    fn assign(&mut self, url: &str) {
        if let Err(e) = self.window.location().set_href(url) {
            log::error!("navigation to {} failed: {}", url, js_error(&e));
        }
    }

    fn set_title(&mut self, title: &str) {
        self.document.set_title(title);
    }

    fn archive_title(&self) -> Option<String> {
        self.document
            .query_selector(ARCHIVE_TITLE_SELECTOR)
            .ok()
            .flatten()
            .and_then(|el| el.text_content())
            .map(|t| t.trim().to_string())
    }
}

impl WebHost {
    fn api_base(&self) -> Url {
        self.api.base().clone()
    }
}

impl ContentFrame for WebHost {
    fn frame_url(&self) -> Result<Url, FrameAccessError> {
        let href = self
            .frame_window()?
            .location()
            .href()
            .map_err(|_| FrameAccessError::CrossOrigin)?;
        Url::parse(&href).map_err(|e| FrameAccessError::Rejected(e.to_string()))
    }

    fn frame_title(&self) -> Result<String, FrameAccessError> {
        Ok(self.frame_document()?.title())
    }

    fn frame_ready_state(&self) -> Result<ReadyState, FrameAccessError> {
        let doc = self.frame_document()?;
        let state = Reflect::get(&doc, &JsValue::from_str("readyState"))
            .map_err(|e| FrameAccessError::Rejected(js_error(&e)))?
            .as_string()
            .unwrap_or_default();
        Ok(match state.as_str() {
            "complete" => ReadyState::Complete,
            "interactive" => ReadyState::Interactive,
            _ => ReadyState::Loading,
        })
    }

    fn frame_src(&self) -> Option<String> {
        self.frame.get_attribute("src")
    }

    fn replace_frame_location(&mut self, url: &str) -> Result<(), FrameAccessError> {
        self.frame_window()?
            .location()
            .replace(url)
            .map_err(|e| FrameAccessError::Rejected(js_error(&e)))
    }

    fn set_frame_src(&mut self, url: &str) {
        self.frame.set_src(url);
    }

    fn frame_anchors(&mut self) -> Result<Vec<Anchor>, FrameAccessError> {
        let doc = self.frame_document()?;
        let nodes = doc
            .query_selector_all("a")
            .map_err(|e| FrameAccessError::Rejected(js_error(&e)))?;

        let mut anchors = Vec::with_capacity(nodes.length() as usize);
        for i in 0..nodes.length() {
            let Some(node) = nodes.item(i) else { continue };
            let element: Element = node.unchecked_into();
            if !element.has_attribute(ANCHOR_ID_ATTR) {
                self.next_anchor += 1;
                element
                    .set_attribute(ANCHOR_ID_ATTR, &self.next_anchor.to_string())
                    .map_err(|e| FrameAccessError::Rejected(js_error(&e)))?;
            }
            if let Some(anchor) = anchor_snapshot(&element) {
                anchors.push(anchor);
            }
        }
        Ok(anchors)
    }

    fn arm_anchor(&mut self, anchor: &Anchor) -> Result<bool, FrameAccessError> {
        let Some(element) = self.find_anchor(anchor.id)? else {
            return Ok(false);
        };
        if element.has_attribute(ARMED_ATTR) {
            return Ok(false);
        }
        let Some(handler) = self.anchor_click.as_ref() else {
            return Err(FrameAccessError::Rejected("host not attached".into()));
        };
        element
            .add_event_listener_with_callback("click", handler.as_ref().unchecked_ref())
            .and_then(|_| element.set_attribute(ARMED_ATTR, ""))
            .map_err(|e| FrameAccessError::Rejected(js_error(&e)))?;
        Ok(true)
    }

    fn set_anchor_target(&mut self, anchor: AnchorId, target: &str) -> Result<(), FrameAccessError> {
        if let Some(element) = self.find_anchor(anchor)? {
            element
                .set_attribute("target", target)
                .map_err(|e| FrameAccessError::Rejected(js_error(&e)))?;
        }
        Ok(())
    }

    fn observe_frame_document(&mut self) -> Result<(), FrameAccessError> {
        let win = self.frame_window()?;
        let doc = self.frame_document()?;

        // Listeners of the previous document detach on drop.
        self.frame_listeners.clear();
        self.history_wrappers.clear();

        let rejected = |e: JsValue| FrameAccessError::Rejected(js_error(&e));
        let win_target: &EventTarget = win.unchecked_ref();
        let doc_target: &EventTarget = doc.unchecked_ref();

        for kind in ["hashchange", "popstate"] {
            let weak = self.viewer.clone();
            let listener = Listener::attach(win_target, kind, move |_| {
                with_viewer(&weak, |v| v.on_frame_history_change());
            })
            .map_err(rejected)?;
            self.frame_listeners.push(listener);
        }

        let weak = self.viewer.clone();
        let listener = Listener::attach(doc_target, "click", move |_| {
            with_viewer(&weak, |v| v.on_frame_click());
        })
        .map_err(rejected)?;
        self.frame_listeners.push(listener);

        let history = Reflect::get(&win, &JsValue::from_str("history")).map_err(rejected)?;
        self.wrap_history_method(&history, "pushState")
            .map_err(rejected)?;
        self.wrap_history_method(&history, "replaceState")
            .map_err(rejected)?;
        Ok(())
    }
}

impl ViewerUi for WebHost {
    fn set_spinner(&mut self, visible: bool) {
        set_class(self.spinner.as_ref(), "active", visible);
        if let Some(container) = &self.frame_container {
            let style = container.style();
            let _ = style.set_property("opacity", if visible { "0.5" } else { "1" });
            let _ = style.set_property("pointer-events", if visible { "none" } else { "all" });
        }
    }

    fn set_search_loading(&mut self, visible: bool) {
        set_class(self.search_loading.as_ref(), "active", visible);
    }

    fn set_clear_button(&mut self, visible: bool) {
        set_class(self.clear_button.as_ref(), "visible", visible);
    }

    fn search_input(&self) -> String {
        self.search_input
            .as_ref()
            .map(|input| input.value())
            .unwrap_or_default()
    }

    fn set_search_input(&mut self, value: &str) {
        if let Some(input) = &self.search_input {
            input.set_value(value);
        }
    }

    fn render_search_results(&mut self, markup: &str) {
        if let Some(results) = &self.search_results {
            results.set_inner_html(markup);
        }
    }

    fn set_search_overlay(&mut self, visible: bool) {
        set_class(self.search_results.as_ref(), "active", visible);
    }
}

impl Scheduler for WebHost {
    fn set_timeout(&mut self, timer: Timer, delay: Duration) -> TimerHandle {
        self.schedule(timer, delay, false)
    }

    fn set_interval(&mut self, timer: Timer, period: Duration) -> TimerHandle {
        self.schedule(timer, period, true)
    }

    fn clear_timer(&mut self, handle: TimerHandle) {
        if Some(handle) == self.firing {
            return;
        }
        if let Some(timer) = self.timers.remove(&handle) {
            if timer.interval {
                self.window.clear_interval_with_handle(timer.id);
            } else {
                self.window.clear_timeout_with_handle(timer.id);
            }
        }
    }
}

impl Backend for WebHost {
    fn request_random(&mut self, ticket: RandomTicket) {
        let api = self.api.clone();
        let weak = self.viewer.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let result = api.random().await;
            with_viewer(&weak, |v| v.on_random_response(ticket, result));
        });
    }

    fn request_search(&mut self, ticket: SearchTicket, limit: SearchLimit) {
        let api = self.api.clone();
        let weak = self.viewer.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let result = api.search(&ticket.query, limit).await;
            with_viewer(&weak, |v| v.on_search_response(&ticket, result));
        });
    }
}

/// Bundle of outer-page listeners; dropped with the exported handle.
pub(crate) fn bind_page_events(shared: &SharedViewer) -> Result<Vec<Listener>, JsValue> {
    let viewer = shared.borrow();
    let host = viewer.host();
    let weak = Rc::downgrade(shared);
    let mut listeners = Vec::new();

    let w = weak.clone();
    listeners.push(Listener::attach(host.frame().as_ref(), "load", move |_| {
        with_viewer(&w, |v| v.on_frame_load());
    })?);

    let w = weak.clone();
    listeners.push(Listener::attach(host.window().as_ref(), "popstate", move |_| {
        with_viewer(&w, |v| v.on_outer_popstate());
    })?);

    let document = host.document().clone();
    let w = weak.clone();
    listeners.push(Listener::attach(host.document().as_ref(), "click", move |event| {
        let target = event.target().and_then(|t| t.dyn_into::<web_sys::Node>().ok());
        let inside = |id: &str| {
            document
                .get_element_by_id(id)
                .is_some_and(|el| el.contains(target.as_ref()))
        };
        if !inside("searchContainer") && !inside(SEARCH_RESULTS_ID) {
            with_viewer(&w, |v| v.on_outside_click());
        }
    })?);

    if let Some(results) = host.search_results_element() {
        let w = weak.clone();
        listeners.push(Listener::attach(results.as_ref(), "click", move |event| {
            let path = event
                .target()
                .and_then(|t| t.dyn_into::<Element>().ok())
                .and_then(|el| el.closest("[data-path]").ok().flatten())
                .and_then(|el| el.get_attribute("data-path"));
            if let Some(path) = path {
                with_viewer(&w, |v| v.select_result(&path));
            }
        })?);
    }

    if let Some(input) = host.search_input_element() {
        let w = weak.clone();
        let field = input.clone();
        listeners.push(Listener::attach(input.as_ref(), "input", move |_| {
            let query = field.value();
            with_viewer(&w, |v| v.search(&query));
        })?);

        let w = weak.clone();
        listeners.push(Listener::attach(input.as_ref(), "focus", move |_| {
            with_viewer(&w, |v| v.show_search_results());
        })?);
    }

    if let Some(clear) = host.clear_button_element() {
        let w = weak;
        listeners.push(Listener::attach(clear.as_ref(), "click", move |_| {
            with_viewer(&w, |v| v.clear_search());
        })?);
    }

    Ok(listeners)
}
