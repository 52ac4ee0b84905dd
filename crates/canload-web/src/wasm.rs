#![forbid(unsafe_code)]

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use canload_core::{
    FillGeometry, LoadHost, Loader, LoaderEvent, LoaderOptions, Outcome, OverlaySurface, Phase,
    ReadyState,
};
use js_sys::{Function, Promise, Reflect};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    AddEventListenerOptions, Document, Element, Event, EventTarget, HtmlElement, HtmlImageElement,
    Window,
};
use web_time::Instant;

use crate::markup::{
    FILL_CLASS, HIDE_CLASS, OVERLAY_CLASS, PERCENT_CLASS, SCOPE_ATTR, render_overlay,
};

thread_local! {
    static NEXT_ID: Cell<u32> = const { Cell::new(1) };
}

fn next_instance_id() -> u32 {
    NEXT_ID.with(|id| {
        let current = id.get();
        id.set(current.wrapping_add(1));
        current
    })
}

fn js_error(msg: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&msg.to_string())
}

/// Options object -> [`LoaderOptions`], through the same JSON path as
/// config files.
fn parse_options(options: Option<JsValue>) -> Result<LoaderOptions, JsValue> {
    let Some(value) = options.filter(|v| !v.is_undefined() && !v.is_null()) else {
        return Ok(LoaderOptions::default());
    };
    let json: String = js_sys::JSON::stringify(&value)?.into();
    LoaderOptions::from_json_str(&json).map_err(js_error)
}

// ---------------------------------------------------------------------------
// Host queries
// ---------------------------------------------------------------------------

struct DomHost {
    window: Window,
    document: Document,
}

impl DomHost {
    fn font_ready_promise(&self) -> Option<Promise> {
        let fonts = Reflect::get(&self.document, &JsValue::from_str("fonts")).ok()?;
        if fonts.is_undefined() || fonts.is_null() {
            return None;
        }
        Reflect::get(&fonts, &JsValue::from_str("ready"))
            .ok()?
            .dyn_into::<Promise>()
            .ok()
    }
}

impl LoadHost for DomHost {
    fn ready_state(&self) -> ReadyState {
        Reflect::get(&self.document, &JsValue::from_str("readyState"))
            .ok()
            .and_then(|v| v.as_string())
            .map_or(ReadyState::Loading, |s| ReadyState::from_dom(&s))
    }

    fn has_font_readiness(&self) -> bool {
        self.font_ready_promise().is_some()
    }

    fn image_sources(&self) -> Vec<String> {
        let Ok(nodes) = self.document.query_selector_all("img") else {
            return Vec::new();
        };
        (0..nodes.length())
            .filter_map(|i| nodes.get(i))
            .filter_map(|node| node.dyn_into::<HtmlImageElement>().ok())
            .map(|img| {
                let current = img.current_src();
                if current.is_empty() { img.src() } else { current }
            })
            .collect()
    }

    fn background_images(&self) -> Vec<String> {
        let Ok(nodes) = self.document.query_selector_all("*") else {
            return Vec::new();
        };
        (0..nodes.length())
            .filter_map(|i| nodes.get(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .filter_map(|el| self.window.get_computed_style(&el).ok().flatten())
            .filter_map(|style| style.get_property_value("background-image").ok())
            .filter(|value| !value.is_empty())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Overlay surface
// ---------------------------------------------------------------------------

struct DomSurface {
    body: HtmlElement,
    overlay: Element,
    percent: Option<Element>,
    fill: Option<Element>,
    geometry: FillGeometry,
}

impl DomSurface {
    fn build(document: &Document, options: &LoaderOptions, id: u32) -> Result<Self, JsValue> {
        let body = document
            .body()
            .ok_or_else(|| js_error("document has no body"))?;
        let markup = render_overlay(options, id).map_err(js_error)?;

        let overlay = document.create_element("div")?;
        overlay.set_class_name(OVERLAY_CLASS);
        overlay.set_attribute(SCOPE_ATTR, &id.to_string())?;
        overlay.set_attribute("aria-hidden", "true")?;
        overlay.set_inner_html(&markup.inner_html());

        let percent = overlay.query_selector(&format!(".{PERCENT_CLASS}"))?;
        let fill = overlay.query_selector(&format!(".{FILL_CLASS}"))?;
        Ok(Self {
            body,
            overlay,
            percent,
            fill,
            geometry: options.skin.geometry(),
        })
    }
}

impl OverlaySurface for DomSurface {
    fn mount(&mut self) {
        if let Err(err) = self.body.append_child(&self.overlay) {
            tracing::warn!(?err, "failed to mount overlay");
        }
    }

    fn paint(&mut self, percent: u8, label: Option<&str>) {
        if let (Some(el), Some(text)) = (&self.percent, label) {
            el.set_text_content(Some(text));
        }
        if let Some(fill) = &self.fill {
            let style = format!("transform: {};", self.geometry.transform_for(percent));
            if let Err(err) = fill.set_attribute("style", &style) {
                tracing::warn!(?err, "failed to update fill level");
            }
        }
    }

    fn hide(&mut self) {
        if let Err(err) = self.overlay.class_list().add_1(HIDE_CLASS) {
            tracing::warn!(?err, "failed to start overlay fade");
        }
    }

    fn is_attached(&self) -> bool {
        self.overlay.parent_node().is_some()
    }

    fn detach(&mut self) {
        self.overlay.remove();
    }
}

// ---------------------------------------------------------------------------
// Subscriptions
// ---------------------------------------------------------------------------

/// An event listener removed again on drop.
struct Listener {
    target: EventTarget,
    event: &'static str,
    callback: Closure<dyn FnMut()>,
}

impl Listener {
    fn once(
        target: EventTarget,
        event: &'static str,
        callback: Closure<dyn FnMut()>,
    ) -> Result<Self, JsValue> {
        let options = AddEventListenerOptions::new();
        options.set_once(true);
        target.add_event_listener_with_callback_and_add_event_listener_options(
            event,
            callback.as_ref().unchecked_ref(),
            &options,
        )?;
        Ok(Self {
            target,
            event,
            callback,
        })
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        let _ = self.target.remove_event_listener_with_callback(
            self.event,
            self.callback.as_ref().unchecked_ref(),
        );
    }
}

/// One in-flight image preload; handlers are unset on drop.
struct Preload {
    image: HtmlImageElement,
    _on_settle: Closure<dyn FnMut(Event)>,
}

impl Drop for Preload {
    fn drop(&mut self) {
        self.image.set_onload(None);
        self.image.set_onerror(None);
    }
}

// ---------------------------------------------------------------------------
// Runtime
// ---------------------------------------------------------------------------

struct Runtime {
    loader: Loader<DomSurface>,
    window: Window,
    origin: Instant,
    timeout: Option<i32>,
    tick: Option<Closure<dyn FnMut()>>,
    listeners: Vec<Listener>,
    preloads: Vec<Preload>,
    /// Strong self-reference keeping the overlay alive until it is removed,
    /// even if JS drops its handle.
    keep_alive: Option<Rc<RefCell<Runtime>>>,
}

impl Runtime {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    /// Arm a single `setTimeout` for the loader's next deadline.
    fn reschedule(&mut self) {
        if let Some(handle) = self.timeout.take() {
            self.window.clear_timeout_with_handle(handle);
        }
        let (Some(deadline), Some(tick)) = (self.loader.next_deadline(), &self.tick) else {
            return;
        };
        let delay = deadline.saturating_sub(self.now());
        let delay_ms = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
        match self.window.set_timeout_with_callback_and_timeout_and_arguments_0(
            tick.as_ref().unchecked_ref(),
            delay_ms,
        ) {
            Ok(handle) => self.timeout = Some(handle),
            Err(err) => tracing::warn!(?err, "failed to arm loader timer"),
        }
    }

    /// Release the self-reference once the overlay is gone.
    fn release_if_removed(&mut self) -> Option<Rc<RefCell<Runtime>>> {
        if self.loader.phase() == Phase::Removed {
            self.keep_alive.take()
        } else {
            None
        }
    }
}

type SharedRuntime = Rc<RefCell<Runtime>>;

/// Drop `runtime` after the current callback returns, so no closure is
/// freed while it is executing.
fn release_later(runtime: Option<SharedRuntime>) {
    if let Some(runtime) = runtime {
        wasm_bindgen_futures::spawn_local(async move {
            drop(runtime);
        });
    }
}

fn with_runtime(weak: &Weak<RefCell<Runtime>>, f: impl FnOnce(&mut Runtime)) {
    let Some(runtime) = weak.upgrade() else {
        return;
    };
    let released = match runtime.try_borrow_mut() {
        Ok(mut rt) => {
            f(&mut rt);
            rt.reschedule();
            rt.release_if_removed()
        }
        Err(_) => {
            tracing::warn!("loader callback re-entered; dropped");
            None
        }
    };
    release_later(released);
}

fn dispatch(weak: &Weak<RefCell<Runtime>>, event: LoaderEvent) {
    with_runtime(weak, |rt| {
        let now = rt.now();
        rt.loader.handle(event, now);
    });
}

fn listen_once(
    weak: &Weak<RefCell<Runtime>>,
    target: EventTarget,
    name: &'static str,
    event: LoaderEvent,
) -> Result<Listener, JsValue> {
    let weak = weak.clone();
    let callback = Closure::<dyn FnMut()>::new(move || dispatch(&weak, event.clone()));
    Listener::once(target, name, callback)
}

fn preload(weak: &Weak<RefCell<Runtime>>, url: String) -> Result<Preload, JsValue> {
    let image = HtmlImageElement::new()?;
    let weak = weak.clone();
    let settled_url = url.clone();
    let on_settle = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
        let outcome = if event.type_() == "error" {
            Outcome::Failed
        } else {
            Outcome::Loaded
        };
        dispatch(
            &weak,
            LoaderEvent::ImageSettled {
                url: settled_url.clone(),
                outcome,
            },
        );
    });
    image.set_onload(Some(on_settle.as_ref().unchecked_ref::<Function>()));
    image.set_onerror(Some(on_settle.as_ref().unchecked_ref::<Function>()));
    image.set_src(&url);
    Ok(Preload {
        image,
        _on_settle: on_settle,
    })
}

fn watch_fonts(weak: &Weak<RefCell<Runtime>>, ready: Option<Promise>) {
    let Some(ready) = ready else {
        dispatch(weak, LoaderEvent::FontsSettled(Outcome::Failed));
        return;
    };
    let weak = weak.clone();
    wasm_bindgen_futures::spawn_local(async move {
        let outcome = match JsFuture::from(ready).await {
            Ok(_) => Outcome::Loaded,
            Err(_) => Outcome::Failed,
        };
        dispatch(&weak, LoaderEvent::FontsSettled(outcome));
    });
}

// ---------------------------------------------------------------------------
// JS API
// ---------------------------------------------------------------------------

/// Page-loading overlay.
///
/// ```js
/// const loader = CanLoader.init({ color: "#0af", minDuration: 500 });
/// ```
#[wasm_bindgen]
pub struct CanLoader {
    runtime: SharedRuntime,
}

#[wasm_bindgen]
impl CanLoader {
    /// Mount the overlay and start tracking the page. Rejects invalid
    /// options (for example a non-hex `color`).
    pub fn init(options: Option<JsValue>) -> Result<CanLoader, JsValue> {
        let options = parse_options(options)?;
        let window = web_sys::window().ok_or_else(|| js_error("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| js_error("no document"))?;

        let id = next_instance_id();
        let surface = DomSurface::build(&document, &options, id)?;
        let host = DomHost {
            window: window.clone(),
            document: document.clone(),
        };
        let font_ready = host.font_ready_promise();

        let origin = Instant::now();
        let (loader, activation) = Loader::activate(options, &host, surface, Duration::ZERO);

        let runtime = Rc::new(RefCell::new(Runtime {
            loader,
            window: window.clone(),
            origin,
            timeout: None,
            tick: None,
            listeners: Vec::new(),
            preloads: Vec::new(),
            keep_alive: None,
        }));
        let weak = Rc::downgrade(&runtime);

        let tick_weak = weak.clone();
        let tick = Closure::<dyn FnMut()>::new(move || {
            with_runtime(&tick_weak, |rt| {
                rt.timeout = None;
                let now = rt.now();
                rt.loader.advance(now);
            });
        });

        let mut listeners = Vec::new();
        if activation.listen_structure {
            listeners.push(listen_once(
                &weak,
                document.clone().into(),
                "DOMContentLoaded",
                LoaderEvent::StructureReady,
            )?);
        }
        if !activation.page_loaded {
            listeners.push(listen_once(
                &weak,
                window.clone().into(),
                "load",
                LoaderEvent::PageLoaded,
            )?);
        }

        let preloads = activation
            .preload
            .into_iter()
            .map(|url| preload(&weak, url))
            .collect::<Result<Vec<_>, _>>()?;

        {
            let mut rt = runtime.borrow_mut();
            rt.tick = Some(tick);
            rt.listeners = listeners;
            rt.preloads = preloads;
            rt.keep_alive = Some(Rc::clone(&runtime));
            rt.reschedule();
        }

        if activation.await_fonts {
            watch_fonts(&weak, font_ready);
        }
        if activation.page_loaded {
            dispatch(&weak, LoaderEvent::PageLoaded);
        }

        tracing::debug!(id, "overlay initialized");
        Ok(Self { runtime })
    }

    /// Start the finish sequence now. No-op if it already started.
    pub fn finish(&self) {
        with_runtime(&Rc::downgrade(&self.runtime), |rt| {
            let now = rt.now();
            rt.loader.finish(now);
        });
    }

    /// Last painted percentage.
    pub fn percent(&self) -> u8 {
        self.runtime.borrow().loader.state().current_percent()
    }

    /// `"active"`, `"finishing"` or `"removed"`.
    pub fn phase(&self) -> String {
        match self.runtime.borrow().loader.phase() {
            Phase::Active => "active",
            Phase::Finishing => "finishing",
            Phase::Removed => "removed",
        }
        .to_owned()
    }

    /// Remove the overlay immediately and stop listening to the page.
    pub fn destroy(&self) {
        let released = {
            let mut rt = self.runtime.borrow_mut();
            if let Some(handle) = rt.timeout.take() {
                rt.window.clear_timeout_with_handle(handle);
            }
            rt.loader.remove();
            rt.listeners.clear();
            rt.preloads.clear();
            rt.keep_alive.take()
        };
        release_later(released);
    }
}
