use std::io::Write;

use timer_core::{format_elapsed, LapLedger, TimerState};

use crate::stopwatch::WidgetEvent;

/// The four stopwatch buttons, numbered as on the terminal keypad.
#[derive(Clone, Copy, Debug, PartialEq, Eq, num_derive::FromPrimitive)]
pub enum Button {
    Start = 1,
    Stop,
    Lap,
    Reset,
}

impl Button {
    pub const ALL: [Button; 4] = [Button::Start, Button::Stop, Button::Lap, Button::Reset];

    pub fn label(self) -> &'static str {
        match self {
            Button::Start => "start",
            Button::Stop => "stop",
            Button::Lap => "lap",
            Button::Reset => "reset",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ButtonStates {
    pub start: bool,
    pub stop: bool,
    pub lap: bool,
    pub reset: bool,
}

impl ButtonStates {
    pub fn for_running(is_running: bool) -> Self {
        Self {
            start: !is_running,
            stop: is_running,
            lap: is_running,
            reset: true,
        }
    }

    pub fn is_enabled(&self, button: Button) -> bool {
        match button {
            Button::Start => self.start,
            Button::Stop => self.stop,
            Button::Lap => self.lap,
            Button::Reset => self.reset,
        }
    }
}

/// One rendered lap with its delete and note-edit controls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LapRow {
    /// 1-based position in the list.
    pub index: usize,
    pub id: String,
    pub duration: String,
    pub note: String,
}

impl LapRow {
    pub fn delete_event(&self) -> WidgetEvent {
        WidgetEvent::DeleteLap(self.id.clone())
    }

    pub fn note_event(&self, text: &str) -> WidgetEvent {
        WidgetEvent::EditNote {
            id: self.id.clone(),
            text: text.to_string(),
        }
    }
}

pub fn lap_rows(laps: &LapLedger) -> Vec<LapRow> {
    laps.iter()
        .enumerate()
        .map(|(i, lap)| LapRow {
            index: i + 1,
            id: lap.id.clone(),
            duration: format_elapsed(lap.duration),
            note: lap.note.clone(),
        })
        .collect()
}

/// Where the stopwatch draws itself.
pub trait View {
    fn show_time(&mut self, text: &str);
    fn show_buttons(&mut self, buttons: ButtonStates);
    /// Replaces the whole lap list.
    fn show_laps(&mut self, rows: &[LapRow]);
}

pub fn render_time<V: View>(view: &mut V, timer: &TimerState, now_ms: u64) {
    view.show_time(&format_elapsed(timer.elapsed_ms(now_ms)));
}

/// Full render: time, button enablement and the lap list.
pub fn render<V: View>(view: &mut V, timer: &TimerState, laps: &LapLedger, now_ms: u64) {
    render_time(view, timer, now_ms);
    view.show_buttons(ButtonStates::for_running(timer.is_running));
    view.show_laps(&lap_rows(laps));
}

/// Keeps the last rendered state. Doubles as a headless view.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SnapshotView {
    pub time: String,
    pub buttons: ButtonStates,
    pub laps: Vec<LapRow>,
    pub time_renders: usize,
    pub full_renders: usize,
}

impl SnapshotView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves a lap by 1-based index or by id.
    pub fn find_row(&self, which: &str) -> Option<&LapRow> {
        match which.parse::<usize>() {
            Ok(index) => self.laps.iter().find(|row| row.index == index),
            Err(_) => self.laps.iter().find(|row| row.id == which),
        }
    }
}

impl View for SnapshotView {
    fn show_time(&mut self, text: &str) {
        self.time = text.to_string();
        self.time_renders += 1;
    }

    fn show_buttons(&mut self, buttons: ButtonStates) {
        self.buttons = buttons;
    }

    fn show_laps(&mut self, rows: &[LapRow]) {
        self.laps = rows.to_vec();
        self.full_renders += 1;
    }
}

/// Draws to a terminal. The time line is rewritten in place; the button bar
/// and lap list are printed on every full render.
pub struct TerminalView<W: Write> {
    out: W,
    snapshot: SnapshotView,
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            snapshot: SnapshotView::new(),
        }
    }

    pub fn snapshot(&self) -> &SnapshotView {
        &self.snapshot
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn redraw_time(&mut self) {
        write!(self.out, "\r  {}  ", self.snapshot.time).ok();
        self.out.flush().ok();
    }
}

impl<W: Write> View for TerminalView<W> {
    fn show_time(&mut self, text: &str) {
        self.snapshot.show_time(text);
        self.redraw_time();
    }

    fn show_buttons(&mut self, buttons: ButtonStates) {
        self.snapshot.show_buttons(buttons);
    }

    fn show_laps(&mut self, rows: &[LapRow]) {
        self.snapshot.show_laps(rows);

        let mut bar = String::new();
        for (i, button) in Button::ALL.iter().enumerate() {
            if self.snapshot.buttons.is_enabled(*button) {
                bar.push_str(&format!("[{} {}] ", i + 1, button.label()));
            } else {
                bar.push_str(&format!(" {} {}  ", i + 1, button.label()));
            }
        }
        writeln!(self.out).ok();
        writeln!(self.out, "STOPWATCH  {}", bar.trim_end()).ok();
        for row in rows {
            if row.note.is_empty() {
                writeln!(self.out, "  Lap {:2}: {}", row.index, row.duration).ok();
            } else {
                writeln!(self.out, "  Lap {:2}: {}  {}", row.index, row.duration, row.note).ok();
            }
        }
        self.redraw_time();
    }
}
