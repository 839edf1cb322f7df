use timer_core::{LapLedger, LapRecord, TimerState};
use uuid::Uuid;

use crate::config::Config;
use crate::pump::{Scheduler, TickHandle};
use crate::storage::{KeyValueStore, StopwatchStorage, StorageChange};
use crate::ui::{self, Button, View};

/// Everything that can happen to a stopwatch, from any source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WidgetEvent {
    Click(Button),
    DeleteLap(String),
    EditNote { id: String, text: String },
    Tick(TickHandle),
    StorageChanged(StorageChange),
}

/// Lap id: epoch milliseconds followed by a 9-character random suffix.
pub fn new_lap_id(now_ms: u64) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}{}", now_ms, &suffix[..9])
}

/// One stopwatch instance: clock, laps, the store they persist to, the tick
/// loop and the view. Every mutation is saved before it is rendered.
pub struct StopwatchWidget<S, T, V> {
    storage: StopwatchStorage<S>,
    scheduler: T,
    view: V,
    timer: TimerState,
    laps: LapLedger,
    tick: Option<TickHandle>,
    tick_interval_ms: u64,
}

impl<S, T, V> StopwatchWidget<S, T, V>
where
    S: KeyValueStore,
    T: Scheduler,
    V: View,
{
    /// Builds the widget from whatever the store holds, resuming the tick loop
    /// if the stored clock is running.
    pub fn create(store: S, scheduler: T, view: V, config: &Config, now_ms: u64) -> Self {
        let mut widget = Self {
            storage: StopwatchStorage::new(store),
            scheduler,
            view,
            timer: TimerState::new(),
            laps: LapLedger::new(),
            tick: None,
            tick_interval_ms: config.tick_interval_ms,
        };
        widget.load_from_store(now_ms);
        log::info!(
            "stopwatch ready: running={} laps={}",
            widget.timer.is_running,
            widget.laps.len()
        );
        widget
    }

    /// Replaces in-memory state with the stored state, then brings the tick
    /// loop and the view in line with it.
    pub fn load_from_store(&mut self, now_ms: u64) {
        let (timer, laps) = self.storage.load();
        self.timer = timer;
        self.laps = laps;
        if self.timer.is_running {
            self.ensure_ticking();
        } else {
            self.cancel_tick();
        }
        self.render(now_ms);
    }

    pub fn teardown(&mut self) {
        self.cancel_tick();
        log::debug!("stopwatch torn down");
    }

    pub fn handle(&mut self, event: WidgetEvent, now_ms: u64) {
        match event {
            WidgetEvent::Click(Button::Start) => self.start(now_ms),
            WidgetEvent::Click(Button::Stop) => self.stop(now_ms),
            WidgetEvent::Click(Button::Lap) => self.lap(now_ms),
            WidgetEvent::Click(Button::Reset) => self.reset(now_ms),
            WidgetEvent::DeleteLap(id) => self.delete_lap(&id, now_ms),
            WidgetEvent::EditNote { id, text } => self.update_note(&id, &text, now_ms),
            WidgetEvent::Tick(handle) => self.tick(handle, now_ms),
            WidgetEvent::StorageChanged(change) => self.handle_storage_change(&change, now_ms),
        }
    }

    pub fn start(&mut self, now_ms: u64) {
        if !self.timer.start(now_ms) {
            // Already running; retry a tick loop the host failed to register.
            self.ensure_ticking();
            return;
        }
        log::debug!("start at {}", now_ms);
        self.storage.save_timer(&self.timer);
        self.ensure_ticking();
        self.render(now_ms);
    }

    pub fn stop(&mut self, now_ms: u64) {
        self.cancel_tick();
        if !self.timer.stop(now_ms) {
            return;
        }
        log::debug!("stop at {}", now_ms);
        self.storage.save_timer(&self.timer);
        self.render(now_ms);
    }

    pub fn lap(&mut self, now_ms: u64) {
        let Some((start, end)) = self.timer.split(now_ms) else {
            return;
        };
        let lap = LapRecord::new(new_lap_id(now_ms), start, end);
        log::debug!("lap {} took {} ms", lap.id, lap.duration);
        self.laps.push(lap);
        self.storage.save(&self.timer, &self.laps);
        self.render(now_ms);
    }

    pub fn reset(&mut self, now_ms: u64) {
        self.stop(now_ms);
        self.timer.reset();
        self.laps.clear();
        self.storage.clear();
        log::debug!("reset");
        self.render(now_ms);
    }

    pub fn update_note(&mut self, id: &str, text: &str, now_ms: u64) {
        if !self.laps.update_note(id, text) {
            log::debug!("note for unknown lap {}", id);
            return;
        }
        self.storage.save_laps(&self.laps);
        self.render(now_ms);
    }

    pub fn delete_lap(&mut self, id: &str, now_ms: u64) {
        if !self.laps.delete(id) {
            log::debug!("delete of unknown lap {}", id);
            return;
        }
        self.storage.save_laps(&self.laps);
        self.render(now_ms);
    }

    pub fn tick(&mut self, handle: TickHandle, now_ms: u64) {
        if self.tick != Some(handle) {
            log::trace!("stale tick {:?}", handle);
            return;
        }
        ui::render_time(&mut self.view, &self.timer, now_ms);
    }

    pub fn handle_storage_change(&mut self, change: &StorageChange, now_ms: u64) {
        if !change.is_watched() {
            return;
        }
        log::debug!("external change to {:?}, reloading", change.key);
        self.load_from_store(now_ms);
    }

    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        self.timer.elapsed_ms(now_ms)
    }

    pub fn timer(&self) -> &TimerState {
        &self.timer
    }

    pub fn laps(&self) -> &LapLedger {
        &self.laps
    }

    pub fn is_ticking(&self) -> bool {
        self.tick.is_some()
    }

    pub fn tick_handle(&self) -> Option<TickHandle> {
        self.tick
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn scheduler(&self) -> &T {
        &self.scheduler
    }

    pub fn store(&self) -> &S {
        self.storage.store()
    }

    pub fn store_mut(&mut self) -> &mut S {
        self.storage.store_mut()
    }

    fn ensure_ticking(&mut self) {
        if self.tick.is_none() {
            self.tick = self.scheduler.schedule(self.tick_interval_ms);
            if self.tick.is_none() {
                log::error!("could not schedule the display tick");
            }
        }
    }

    fn cancel_tick(&mut self) {
        if let Some(handle) = self.tick.take() {
            self.scheduler.cancel(handle);
        }
    }

    fn render(&mut self, now_ms: u64) {
        ui::render(&mut self.view, &self.timer, &self.laps, now_ms);
    }
}
