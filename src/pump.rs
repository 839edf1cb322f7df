//! The periodic tick that keeps the time display moving.

use std::collections::BTreeMap;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use num_traits::{FromPrimitive, ToPrimitive};

/// Identifies one scheduled repeating tick. Never reused by a scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TickHandle(pub u64);

/// Host primitive for a cancellable repeating callback. Each tick is delivered
/// back to the widget as `WidgetEvent::Tick(handle)`. `schedule` returns `None`
/// when the host could not register the callback.
pub trait Scheduler {
    fn schedule(&mut self, interval_ms: u64) -> Option<TickHandle>;
    fn cancel(&mut self, handle: TickHandle);
}

/// Scheduler that never fires on its own; the embedder decides when a tick
/// happens. Used by headless hosts.
#[derive(Default)]
pub struct ManualScheduler {
    next: u64,
    active: BTreeMap<TickHandle, u64>,
    cancelled: Vec<TickHandle>,
    refusing: bool,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Vec<TickHandle> {
        self.active.keys().copied().collect()
    }

    pub fn is_active(&self, handle: TickHandle) -> bool {
        self.active.contains_key(&handle)
    }

    pub fn interval_of(&self, handle: TickHandle) -> Option<u64> {
        self.active.get(&handle).copied()
    }

    pub fn cancelled(&self) -> &[TickHandle] {
        &self.cancelled
    }

    /// While set, every `schedule` call fails.
    pub fn set_refusing(&mut self, refusing: bool) {
        self.refusing = refusing;
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&mut self, interval_ms: u64) -> Option<TickHandle> {
        if self.refusing {
            return None;
        }
        self.next += 1;
        let handle = TickHandle(self.next);
        self.active.insert(handle, interval_ms);
        Some(handle)
    }

    fn cancel(&mut self, handle: TickHandle) {
        if self.active.remove(&handle).is_some() {
            self.cancelled.push(handle);
        }
    }
}

#[derive(Debug, num_derive::FromPrimitive, num_derive::ToPrimitive)]
enum PumpOp {
    Start = 0,
    Stop,
    Quit,
}

/// Scalar control message: opcode, handle, interval.
type PumpMsg = (u32, u64, u64);

/// Background thread that sends one message per interval to the main loop
/// while a tick is scheduled. Only one tick runs at a time; scheduling a new
/// one replaces the old.
pub struct ThreadPump {
    control: Sender<PumpMsg>,
    next: u64,
    thread: Option<JoinHandle<()>>,
}

impl ThreadPump {
    /// `wrap` turns a tick into the main loop's message type.
    pub fn spawn<M, F>(main: Sender<M>, wrap: F) -> Self
    where
        M: Send + 'static,
        F: Fn(TickHandle) -> M + Send + 'static,
    {
        let (control, rx) = mpsc::channel();
        let thread = std::thread::spawn(move || pump_thread(rx, main, wrap));
        Self {
            control,
            next: 0,
            thread: Some(thread),
        }
    }

    fn send(&self, op: PumpOp, handle: u64, interval_ms: u64) -> bool {
        let code = op.to_u32().unwrap_or(PumpOp::Quit as u32);
        if self.control.send((code, handle, interval_ms)).is_err() {
            log::error!("pump thread is gone, dropped {:?}", op);
            return false;
        }
        true
    }
}

impl Scheduler for ThreadPump {
    fn schedule(&mut self, interval_ms: u64) -> Option<TickHandle> {
        self.next += 1;
        if self.send(PumpOp::Start, self.next, interval_ms) {
            Some(TickHandle(self.next))
        } else {
            None
        }
    }

    fn cancel(&mut self, handle: TickHandle) {
        self.send(PumpOp::Stop, handle.0, 0);
    }
}

impl Drop for ThreadPump {
    fn drop(&mut self) {
        self.send(PumpOp::Quit, 0, 0);
        if let Some(thread) = self.thread.take() {
            thread.join().ok();
        }
    }
}

fn pump_thread<M, F>(control: Receiver<PumpMsg>, main: Sender<M>, wrap: F)
where
    F: Fn(TickHandle) -> M,
{
    let mut current: Option<(u64, Duration)> = None;
    let mut deadline = Instant::now();

    loop {
        // Block while idle; otherwise wait only until the next tick is due.
        let msg = match current {
            Some(_) => {
                let wait = deadline.saturating_duration_since(Instant::now());
                match control.recv_timeout(wait) {
                    Ok(msg) => Some(msg),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            None => match control.recv() {
                Ok(msg) => Some(msg),
                Err(_) => break,
            },
        };

        match msg {
            Some((code, handle, interval_ms)) => match PumpOp::from_u32(code) {
                Some(PumpOp::Start) => {
                    let interval = Duration::from_millis(interval_ms.max(1));
                    current = Some((handle, interval));
                    deadline = Instant::now() + interval;
                }
                Some(PumpOp::Stop) => {
                    if current.map(|(h, _)| h) == Some(handle) {
                        current = None;
                    }
                }
                Some(PumpOp::Quit) => break,
                None => log::error!("unknown pump opcode: {}", code),
            },
            None => {
                if let Some((handle, interval)) = current {
                    if main.send(wrap(TickHandle(handle))).is_err() {
                        break;
                    }
                    deadline += interval;
                    // Skip ticks missed while the main loop was busy.
                    let now = Instant::now();
                    if deadline < now {
                        deadline = now + interval;
                    }
                }
            }
        }
    }
}
