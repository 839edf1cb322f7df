use serde::{Deserialize, Serialize};

/// One recorded lap. `duration` is always `end_time - start_time`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LapRecord {
    pub start_time: u64,
    pub end_time: u64,
    pub duration: u64,
    pub id: String,
    #[serde(default)]
    pub note: String,
}

impl LapRecord {
    pub fn new(id: String, start_time: u64, end_time: u64) -> Self {
        Self {
            start_time,
            end_time,
            duration: end_time.saturating_sub(start_time),
            id,
            note: String::new(),
        }
    }
}

/// Laps in append order, which is also display order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LapLedger {
    laps: Vec<LapRecord>,
}

impl LapLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(laps: Vec<LapRecord>) -> Self {
        Self { laps }
    }

    pub fn push(&mut self, lap: LapRecord) {
        self.laps.push(lap);
    }

    /// Returns false if no lap has this id.
    pub fn update_note(&mut self, id: &str, note: &str) -> bool {
        match self.laps.iter_mut().find(|lap| lap.id == id) {
            Some(lap) => {
                lap.note = note.to_string();
                true
            }
            None => false,
        }
    }

    /// Returns false if no lap has this id.
    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.laps.len();
        self.laps.retain(|lap| lap.id != id);
        self.laps.len() != before
    }

    pub fn clear(&mut self) {
        self.laps.clear();
    }

    pub fn get(&self, id: &str) -> Option<&LapRecord> {
        self.laps.iter().find(|lap| lap.id == id)
    }

    pub fn records(&self) -> &[LapRecord] {
        &self.laps
    }

    pub fn iter(&self) -> impl Iterator<Item = &LapRecord> {
        self.laps.iter()
    }

    pub fn len(&self) -> usize {
        self.laps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.laps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> LapLedger {
        let mut l = LapLedger::new();
        l.push(LapRecord::new("a".into(), 0, 5000));
        l.push(LapRecord::new("b".into(), 5000, 8000));
        l
    }

    #[test]
    fn test_new_record() {
        let lap = LapRecord::new("x".into(), 1000, 3500);
        assert_eq!(lap.duration, 2500);
        assert!(lap.note.is_empty());
    }

    #[test]
    fn test_append_order() {
        let l = ledger();
        let ids: Vec<&str> = l.iter().map(|lap| lap.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_update_note() {
        let mut l = ledger();
        assert!(l.update_note("b", "second"));
        assert_eq!(l.get("b").map(|lap| lap.note.as_str()), Some("second"));
        assert_eq!(l.get("a").map(|lap| lap.note.as_str()), Some(""));
    }

    #[test]
    fn test_update_note_unknown_id() {
        let mut l = ledger();
        let before = l.clone();
        assert!(!l.update_note("nope", "text"));
        assert_eq!(l, before);
    }

    #[test]
    fn test_delete() {
        let mut l = ledger();
        assert!(l.delete("a"));
        assert_eq!(l.len(), 1);
        assert!(!l.delete("a"));
        assert_eq!(l.records()[0].id, "b");
    }

    #[test]
    fn test_clear() {
        let mut l = ledger();
        l.clear();
        assert!(l.is_empty());
    }

    #[test]
    fn test_record_layout() {
        let lap = LapRecord::new("17000000001234abcdefghi".into(), 1000, 2500);
        let json = serde_json::to_string(&lap).unwrap();
        assert_eq!(
            json,
            r#"{"startTime":1000,"endTime":2500,"duration":1500,"id":"17000000001234abcdefghi","note":""}"#
        );
    }

    #[test]
    fn test_missing_note_defaults_empty() {
        let lap: LapRecord =
            serde_json::from_str(r#"{"startTime":1,"endTime":3,"duration":2,"id":"z"}"#).unwrap();
        assert_eq!(lap.note, "");
    }
}
