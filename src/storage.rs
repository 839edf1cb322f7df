use timer_core::{
    decode_flag, decode_timestamp, encode_flag, encode_timestamp, LapLedger, LapRecord, TimerState,
};

use crate::error::StoreError;

pub const KEY_START_TIME: &str = "startTime";
pub const KEY_IS_RUNNING: &str = "isRunning";
pub const KEY_LAPS: &str = "laps";
pub const KEY_STOP_TIME: &str = "stopTime";

/// Keys whose external change triggers reconciliation.
pub const WATCHED_KEYS: [&str; 4] = [KEY_START_TIME, KEY_IS_RUNNING, KEY_LAPS, KEY_STOP_TIME];

/// String key-value store shared between every view of the stopwatch.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// Notification that another writer changed the store. `key` is `None` when
/// the whole store was cleared.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageChange {
    pub key: Option<String>,
    pub new_value: Option<String>,
}

impl StorageChange {
    pub fn set(key: &str, value: &str) -> Self {
        Self {
            key: Some(key.to_string()),
            new_value: Some(value.to_string()),
        }
    }

    pub fn removed(key: &str) -> Self {
        Self {
            key: Some(key.to_string()),
            new_value: None,
        }
    }

    pub fn cleared() -> Self {
        Self { key: None, new_value: None }
    }

    pub fn is_watched(&self) -> bool {
        match &self.key {
            Some(key) => WATCHED_KEYS.contains(&key.as_str()),
            None => true,
        }
    }
}

/// Persistence bridge: maps the timer and ledger onto the fixed store keys.
pub struct StopwatchStorage<S> {
    store: S,
}

impl<S: KeyValueStore> StopwatchStorage<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn load_timer(&self) -> TimerState {
        let start_timestamp = decode_timestamp(self.store.get(KEY_START_TIME).as_deref());
        let is_running = decode_flag(self.store.get(KEY_IS_RUNNING).as_deref());
        // A running clock always has a start timestamp.
        let is_running = is_running && start_timestamp.is_some();
        let stop_timestamp = if is_running {
            None
        } else {
            decode_timestamp(self.store.get(KEY_STOP_TIME).as_deref())
        };
        TimerState {
            start_timestamp,
            is_running,
            stop_timestamp,
        }
    }

    pub fn load_laps(&self) -> LapLedger {
        match self.store.get(KEY_LAPS) {
            Some(json) => match serde_json::from_str::<Vec<LapRecord>>(&json) {
                Ok(laps) => LapLedger::from_records(laps),
                Err(e) => {
                    log::warn!("ignoring unreadable laps value: {}", e);
                    LapLedger::new()
                }
            },
            None => LapLedger::new(),
        }
    }

    pub fn load(&self) -> (TimerState, LapLedger) {
        (self.load_timer(), self.load_laps())
    }

    pub fn save_timer(&mut self, timer: &TimerState) {
        self.write(KEY_START_TIME, &encode_timestamp(timer.start_timestamp));
        self.write(KEY_IS_RUNNING, encode_flag(timer.is_running));
        match timer.stop_timestamp {
            Some(stop) => self.write(KEY_STOP_TIME, &encode_timestamp(Some(stop))),
            None => self.erase(KEY_STOP_TIME),
        }
    }

    pub fn save_laps(&mut self, laps: &LapLedger) {
        match serde_json::to_string(laps.records()) {
            Ok(json) => self.write(KEY_LAPS, &json),
            Err(e) => log::error!("Failed to encode laps: {}", e),
        }
    }

    pub fn save(&mut self, timer: &TimerState, laps: &LapLedger) {
        self.save_timer(timer);
        self.save_laps(laps);
    }

    /// Removes every stopwatch key from the store.
    pub fn clear(&mut self) {
        for key in WATCHED_KEYS {
            self.erase(key);
        }
    }

    fn write(&mut self, key: &str, value: &str) {
        if let Err(e) = self.store.set(key, value) {
            log::error!("Failed to save {}: {}", key, e);
        }
    }

    fn erase(&mut self, key: &str) {
        if let Err(e) = self.store.remove(key) {
            log::error!("Failed to remove {}: {}", key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::SharedStorage;

    fn bridge() -> (SharedStorage, StopwatchStorage<crate::memory_store::TabStorage>) {
        let shared = SharedStorage::new();
        let tab = shared.open_tab();
        (shared, StopwatchStorage::new(tab))
    }

    #[test]
    fn test_empty_store_loads_defaults() {
        let (_shared, storage) = bridge();
        let (timer, laps) = storage.load();
        assert_eq!(timer, TimerState::default());
        assert!(laps.is_empty());
    }

    #[test]
    fn test_garbage_loads_defaults() {
        let (shared, storage) = bridge();
        let mut other = shared.open_tab();
        other.set(KEY_START_TIME, "soon").unwrap();
        other.set(KEY_IS_RUNNING, "yes").unwrap();
        other.set(KEY_LAPS, "[{not json").unwrap();
        let (timer, laps) = storage.load();
        assert_eq!(timer, TimerState::default());
        assert!(laps.is_empty());
    }

    #[test]
    fn test_running_without_start_is_not_running() {
        let (shared, storage) = bridge();
        shared.open_tab().set(KEY_IS_RUNNING, "true").unwrap();
        assert!(!storage.load_timer().is_running);
    }

    #[test]
    fn test_timer_layout() {
        let (shared, mut storage) = bridge();
        let mut timer = TimerState::new();
        timer.start(1_700_000_000_000);
        storage.save_timer(&timer);

        assert_eq!(shared.get(KEY_START_TIME).as_deref(), Some("1700000000000"));
        assert_eq!(shared.get(KEY_IS_RUNNING).as_deref(), Some("true"));
        assert_eq!(shared.get(KEY_STOP_TIME), None);

        timer.stop(1_700_000_004_000);
        storage.save_timer(&timer);
        assert_eq!(shared.get(KEY_IS_RUNNING).as_deref(), Some("false"));
        assert_eq!(shared.get(KEY_STOP_TIME).as_deref(), Some("1700000004000"));
        assert_eq!(storage.load_timer(), timer);
    }

    #[test]
    fn test_laps_round_trip() {
        let (_shared, mut storage) = bridge();
        let mut laps = LapLedger::new();
        laps.push(LapRecord::new("1000abc".into(), 0, 1000));
        laps.push(LapRecord::new("2500def".into(), 1000, 2500));
        laps.update_note("2500def", "uphill");
        storage.save_laps(&laps);
        assert_eq!(storage.load_laps(), laps);
    }

    #[test]
    fn test_clear_removes_keys() {
        let (shared, mut storage) = bridge();
        let mut timer = TimerState::new();
        timer.start(10);
        timer.stop(20);
        storage.save(&timer, &LapLedger::new());
        storage.clear();
        for key in WATCHED_KEYS {
            assert_eq!(shared.get(key), None, "{} still stored", key);
        }
    }

    #[test]
    fn test_watched_keys() {
        assert!(StorageChange::set(KEY_LAPS, "[]").is_watched());
        assert!(StorageChange::removed(KEY_START_TIME).is_watched());
        assert!(StorageChange::cleared().is_watched());
        assert!(!StorageChange::set("theme", "dark").is_watched());
    }
}
