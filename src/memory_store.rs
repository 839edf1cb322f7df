//! In-process store shared by several tabs.
//!
//! Every write is visible to all tabs at once; the change notification goes
//! to every tab except the writer, and only when the stored value actually
//! changed, the same way a browser raises `storage` events.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use crate::error::StoreError;
use crate::storage::{KeyValueStore, StorageChange};

#[derive(Default)]
struct Shared {
    items: BTreeMap<String, String>,
    inboxes: Vec<VecDeque<StorageChange>>,
}

impl Shared {
    fn notify_others(&mut self, writer: Option<usize>, change: StorageChange) {
        for (tab, inbox) in self.inboxes.iter_mut().enumerate() {
            if Some(tab) != writer {
                inbox.push_back(change.clone());
            }
        }
    }
}

#[derive(Clone, Default)]
pub struct SharedStorage {
    inner: Rc<RefCell<Shared>>,
}

impl SharedStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_tab(&self) -> TabStorage {
        let mut shared = self.inner.borrow_mut();
        shared.inboxes.push(VecDeque::new());
        TabStorage {
            inner: Rc::clone(&self.inner),
            tab: shared.inboxes.len() - 1,
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.borrow().items.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Empties the store and notifies every tab.
    pub fn clear(&self) {
        let mut shared = self.inner.borrow_mut();
        if shared.items.is_empty() {
            return;
        }
        shared.items.clear();
        shared.notify_others(None, StorageChange::cleared());
    }
}

/// One tab's handle on a [`SharedStorage`].
pub struct TabStorage {
    inner: Rc<RefCell<Shared>>,
    tab: usize,
}

impl TabStorage {
    /// Drains the notifications queued for this tab, oldest first.
    pub fn take_changes(&self) -> Vec<StorageChange> {
        let mut shared = self.inner.borrow_mut();
        shared.inboxes[self.tab].drain(..).collect()
    }

    pub fn pending_changes(&self) -> usize {
        self.inner.borrow().inboxes[self.tab].len()
    }
}

impl KeyValueStore for TabStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.borrow().items.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut shared = self.inner.borrow_mut();
        let previous = shared.items.insert(key.to_string(), value.to_string());
        if previous.as_deref() != Some(value) {
            shared.notify_others(Some(self.tab), StorageChange::set(key, value));
        }
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let mut shared = self.inner.borrow_mut();
        if shared.items.remove(key).is_some() {
            shared.notify_others(Some(self.tab), StorageChange::removed(key));
        }
        Ok(())
    }
}
