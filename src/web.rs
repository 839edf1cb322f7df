//! Browser host: `localStorage`, `setInterval` and the page's DOM.
//!
//! The page must provide elements with ids `time`, `start`, `stop`, `lap`,
//! `reset` and `laps`. Call [`mount`] once after the document has loaded.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    Document, Element, Event, EventTarget, HtmlButtonElement, HtmlInputElement, Storage,
    StorageEvent, Window,
};

use crate::clock::now_ms;
use crate::config::Config;
use crate::error::StoreError;
use crate::pump::{Scheduler, TickHandle};
use crate::stopwatch::{StopwatchWidget, WidgetEvent};
use crate::storage::{KeyValueStore, StorageChange};
use crate::ui::{Button, ButtonStates, LapRow, View};

const ACTION_ATTR: &str = "data-action";
const LAP_ATTR: &str = "data-lap-id";

type Dispatch = Rc<dyn Fn(WidgetEvent)>;
type DispatchSlot = Rc<RefCell<Option<Dispatch>>>;
type WebWidget = StopwatchWidget<LocalStorage, IntervalScheduler, DomView>;

pub struct LocalStorage {
    storage: Storage,
}

impl LocalStorage {
    pub fn open(window: &Window) -> Result<Self, JsValue> {
        let storage = window
            .local_storage()?
            .ok_or_else(|| JsValue::from_str("localStorage is not available"))?;
        Ok(Self { storage })
    }
}

impl KeyValueStore for LocalStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.storage.get_item(key).ok().flatten()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.storage
            .set_item(key, value)
            .map_err(|_| StoreError::Rejected {
                op: "set",
                key: key.to_string(),
            })
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.storage
            .remove_item(key)
            .map_err(|_| StoreError::Rejected {
                op: "remove",
                key: key.to_string(),
            })
    }
}

/// `setInterval`-backed ticks. Each interval's callback stays owned here until
/// the interval is cleared.
pub struct IntervalScheduler {
    window: Window,
    dispatch: DispatchSlot,
    next: u64,
    running: HashMap<TickHandle, (i32, Closure<dyn FnMut()>)>,
}

impl IntervalScheduler {
    fn new(window: Window, dispatch: DispatchSlot) -> Self {
        Self {
            window,
            dispatch,
            next: 0,
            running: HashMap::new(),
        }
    }
}

impl Scheduler for IntervalScheduler {
    fn schedule(&mut self, interval_ms: u64) -> Option<TickHandle> {
        self.next += 1;
        let handle = TickHandle(self.next);
        let slot = Rc::clone(&self.dispatch);
        let callback = Closure::wrap(Box::new(move || {
            let dispatch = slot.borrow().clone();
            if let Some(dispatch) = dispatch {
                dispatch(WidgetEvent::Tick(handle));
            }
        }) as Box<dyn FnMut()>);

        let timeout = i32::try_from(interval_ms).unwrap_or(i32::MAX);
        match self
            .window
            .set_interval_with_callback_and_timeout_and_arguments_0(
                callback.as_ref().unchecked_ref(),
                timeout,
            ) {
            Ok(id) => {
                self.running.insert(handle, (id, callback));
                Some(handle)
            }
            Err(e) => {
                log::error!("setInterval failed: {:?}", e);
                None
            }
        }
    }

    fn cancel(&mut self, handle: TickHandle) {
        if let Some((id, _callback)) = self.running.remove(&handle) {
            self.window.clear_interval_with_handle(id);
        }
    }
}

pub struct DomView {
    document: Document,
    time: Element,
    laps: Element,
    start: HtmlButtonElement,
    stop: HtmlButtonElement,
    lap: HtmlButtonElement,
    reset: HtmlButtonElement,
}

impl DomView {
    pub fn attach(document: &Document) -> Result<Self, JsValue> {
        Ok(Self {
            document: document.clone(),
            time: by_id(document, "time")?,
            laps: by_id(document, "laps")?,
            start: button(document, Button::Start)?,
            stop: button(document, Button::Stop)?,
            lap: button(document, Button::Lap)?,
            reset: button(document, Button::Reset)?,
        })
    }

    fn append_row(&self, row: &LapRow) -> Result<(), JsValue> {
        let item = self.document.create_element("div")?;
        item.set_class_name("lap");

        let delete = self.document.create_element("button")?;
        delete.set_class_name("round-button");
        delete.set_attribute(ACTION_ATTR, "delete")?;
        delete.set_attribute(LAP_ATTR, &row.id)?;
        delete.set_text_content(Some("X"));

        let label = self.document.create_element("span")?;
        label.set_text_content(Some(&format!(" Lap: {} ", row.duration)));

        let note = self
            .document
            .create_element("input")?
            .dyn_into::<HtmlInputElement>()
            .map_err(|_| JsValue::from_str("input element expected"))?;
        note.set_type("text");
        note.set_placeholder("Add a note");
        note.set_value(&row.note);
        note.set_attribute(ACTION_ATTR, "note")?;
        note.set_attribute(LAP_ATTR, &row.id)?;

        item.append_child(&delete)?;
        item.append_child(&label)?;
        item.append_child(&note)?;
        self.laps.append_child(&item)?;
        Ok(())
    }

    /// The note input being typed into, with its caret position.
    fn focused_note(&self) -> Option<(String, Option<u32>)> {
        let active = self.document.active_element()?;
        if active.get_attribute(ACTION_ATTR).as_deref() != Some("note") {
            return None;
        }
        let id = active.get_attribute(LAP_ATTR)?;
        let caret = active
            .dyn_ref::<HtmlInputElement>()
            .and_then(|input| input.selection_start().ok().flatten());
        Some((id, caret))
    }

    fn refocus_note(&self, id: &str, caret: Option<u32>) -> Result<(), JsValue> {
        let selector = format!("input[{}=\"{}\"]", LAP_ATTR, id);
        let Some(input) = self.document.query_selector(&selector)? else {
            return Ok(());
        };
        let input = input
            .dyn_into::<HtmlInputElement>()
            .map_err(|_| JsValue::from_str("input element expected"))?;
        input.focus()?;
        if let Some(caret) = caret {
            input.set_selection_range(caret, caret)?;
        }
        Ok(())
    }
}

impl View for DomView {
    fn show_time(&mut self, text: &str) {
        self.time.set_text_content(Some(text));
    }

    fn show_buttons(&mut self, buttons: ButtonStates) {
        self.start.set_disabled(!buttons.start);
        self.stop.set_disabled(!buttons.stop);
        self.lap.set_disabled(!buttons.lap);
        self.reset.set_disabled(!buttons.reset);
    }

    fn show_laps(&mut self, rows: &[LapRow]) {
        let focused = self.focused_note();
        self.laps.set_inner_html("");
        for row in rows {
            if let Err(e) = self.append_row(row) {
                log::error!("Failed to draw lap {}: {:?}", row.id, e);
            }
        }
        if let Some((id, caret)) = focused {
            if let Err(e) = self.refocus_note(&id, caret) {
                log::warn!("could not restore focus: {:?}", e);
            }
        }
    }
}

fn by_id(document: &Document, id: &str) -> Result<Element, JsValue> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("missing element #{}", id)))
}

fn button(document: &Document, which: Button) -> Result<HtmlButtonElement, JsValue> {
    by_id(document, which.label())?
        .dyn_into::<HtmlButtonElement>()
        .map_err(|_| JsValue::from_str(&format!("#{} is not a button", which.label())))
}

struct Listener {
    target: EventTarget,
    kind: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

impl Listener {
    fn add(
        target: &EventTarget,
        kind: &'static str,
        handler: impl FnMut(Event) + 'static,
    ) -> Result<Self, JsValue> {
        let callback = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
        target.add_event_listener_with_callback(kind, callback.as_ref().unchecked_ref())?;
        Ok(Self {
            target: target.clone(),
            kind,
            callback,
        })
    }

    fn remove(self) {
        self.target
            .remove_event_listener_with_callback(self.kind, self.callback.as_ref().unchecked_ref())
            .ok();
    }
}

/// Reads `data-action` and `data-lap-id` off the element an event came from.
fn lap_control(event: &Event) -> Option<(String, String, Element)> {
    let target = event.target()?.dyn_into::<Element>().ok()?;
    let action = target.get_attribute(ACTION_ATTR)?;
    let id = target.get_attribute(LAP_ATTR)?;
    Some((action, id, target))
}

struct Mounted {
    widget: Rc<RefCell<WebWidget>>,
    listeners: Vec<Listener>,
}

thread_local! {
    static MOUNTED: RefCell<Option<Mounted>> = const { RefCell::new(None) };
}

/// Builds the stopwatch over the current page. Mounting twice replaces the
/// previous instance.
#[wasm_bindgen]
pub fn mount() -> Result<(), JsValue> {
    unmount();

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    let slot: DispatchSlot = Rc::new(RefCell::new(None));
    let store = LocalStorage::open(&window)?;
    let scheduler = IntervalScheduler::new(window.clone(), Rc::clone(&slot));
    let view = DomView::attach(&document)?;
    let widget = Rc::new(RefCell::new(StopwatchWidget::create(
        store,
        scheduler,
        view,
        &Config::default(),
        now_ms(),
    )));

    let weak = Rc::downgrade(&widget);
    let dispatch: Dispatch = Rc::new(move |event| {
        let Some(widget) = weak.upgrade() else {
            return;
        };
        match widget.try_borrow_mut() {
            Ok(mut widget) => widget.handle(event, now_ms()),
            Err(_) => log::warn!("dropped re-entrant {:?}", event),
        };
    });
    *slot.borrow_mut() = Some(Rc::clone(&dispatch));

    let mut listeners = Vec::new();
    for which in Button::ALL {
        let target = by_id(&document, which.label())?;
        let dispatch = Rc::clone(&dispatch);
        listeners.push(Listener::add(&target, "click", move |_| {
            dispatch(WidgetEvent::Click(which))
        })?);
    }

    let laps = by_id(&document, "laps")?;
    let on_click = Rc::clone(&dispatch);
    listeners.push(Listener::add(&laps, "click", move |event| {
        if let Some((action, id, _)) = lap_control(&event) {
            if action == "delete" {
                on_click(WidgetEvent::DeleteLap(id));
            }
        }
    })?);
    let on_input = Rc::clone(&dispatch);
    listeners.push(Listener::add(&laps, "input", move |event| {
        if let Some((action, id, target)) = lap_control(&event) {
            if action == "note" {
                if let Some(input) = target.dyn_ref::<HtmlInputElement>() {
                    on_input(WidgetEvent::EditNote {
                        id,
                        text: input.value(),
                    });
                }
            }
        }
    })?);

    let on_storage = Rc::clone(&dispatch);
    listeners.push(Listener::add(&window, "storage", move |event| {
        if let Some(event) = event.dyn_ref::<StorageEvent>() {
            on_storage(WidgetEvent::StorageChanged(StorageChange {
                key: event.key(),
                new_value: event.new_value(),
            }));
        }
    })?);

    MOUNTED.with(|mounted| {
        *mounted.borrow_mut() = Some(Mounted { widget, listeners });
    });
    Ok(())
}

/// Stops the tick loop and detaches every listener. Stored state is kept.
#[wasm_bindgen]
pub fn unmount() {
    let previous = MOUNTED.with(|mounted| mounted.borrow_mut().take());
    if let Some(Mounted { widget, listeners }) = previous {
        for listener in listeners {
            listener.remove();
        }
        widget.borrow_mut().teardown();
    }
}
