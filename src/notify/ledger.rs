//! Record of live notification handles.
//!
//! One entry per favorited performance and one per enabled recurring
//! reminder kind. An entry exists only while it holds at least one handle.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::dispatcher::NotificationHandle;
use super::recurring::ReminderKind;
use crate::lineup::PerformanceId;

/// Persisted notification ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationLedger {
    #[serde(default)]
    performances: BTreeMap<PerformanceId, Vec<NotificationHandle>>,
    #[serde(default)]
    recurring: BTreeMap<ReminderKind, Vec<NotificationHandle>>,
}

impl NotificationLedger {
    /// Handles recorded for a performance. Empty when unscheduled.
    pub fn handles(&self, id: PerformanceId) -> &[NotificationHandle] {
        self.performances.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Replace the entry for `id`. An empty list removes the entry.
    pub fn insert(&mut self, id: PerformanceId, handles: Vec<NotificationHandle>) {
        if handles.is_empty() {
            self.performances.remove(&id);
        } else {
            self.performances.insert(id, handles);
        }
    }

    /// Remove and return the entry for `id`.
    pub fn remove(&mut self, id: PerformanceId) -> Vec<NotificationHandle> {
        self.performances.remove(&id).unwrap_or_default()
    }

    /// Ids with live handles, ascending.
    pub fn performance_ids(&self) -> Vec<PerformanceId> {
        self.performances.keys().copied().collect()
    }

    pub fn recurring(&self, kind: ReminderKind) -> &[NotificationHandle] {
        self.recurring.get(&kind).map_or(&[], Vec::as_slice)
    }

    /// Replace the entry for a reminder kind. An empty list removes it.
    pub fn set_recurring(&mut self, kind: ReminderKind, handles: Vec<NotificationHandle>) {
        if handles.is_empty() {
            self.recurring.remove(&kind);
        } else {
            self.recurring.insert(kind, handles);
        }
    }

    pub fn take_recurring(&mut self, kind: ReminderKind) -> Vec<NotificationHandle> {
        self.recurring.remove(&kind).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.performances.is_empty() && self.recurring.is_empty()
    }

    pub fn clear(&mut self) {
        self.performances.clear();
        self.recurring.clear();
    }

    /// Drop any empty entries a hand-edited or older file may contain.
    pub(crate) fn prune(&mut self) {
        self.performances.retain(|_, handles| !handles.is_empty());
        self.recurring.retain(|_, handles| !handles.is_empty());
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    fn handle(s: &str) -> NotificationHandle {
        NotificationHandle(s.to_owned())
    }

    #[test]
    fn empty_lists_never_create_entries() {
        let mut ledger = NotificationLedger::default();
        ledger.insert(4, Vec::new());
        ledger.set_recurring(ReminderKind::Hydration, Vec::new());
        assert!(ledger.is_empty());

        ledger.insert(4, vec![handle("a")]);
        assert_eq!(ledger.performance_ids(), vec![4]);
        ledger.insert(4, Vec::new());
        assert!(ledger.performance_ids().is_empty());
    }

    #[test]
    fn remove_returns_handles_once() {
        let mut ledger = NotificationLedger::default();
        ledger.insert(1, vec![handle("a"), handle("b")]);
        assert_eq!(ledger.remove(1).len(), 2);
        assert!(ledger.remove(1).is_empty());
        assert!(ledger.handles(1).is_empty());
    }

    #[test]
    fn json_shape_uses_string_ids_and_kind_names() {
        let mut ledger = NotificationLedger::default();
        ledger.insert(12, vec![handle("h1")]);
        ledger.set_recurring(ReminderKind::Sunscreen, vec![handle("s1")]);

        let json = serde_json::to_value(&ledger).unwrap();
        assert_eq!(json["performances"]["12"][0], "h1");
        assert_eq!(json["recurring"]["sunscreen"][0], "s1");

        let back: NotificationLedger = serde_json::from_value(json).unwrap();
        assert_eq!(back, ledger);
    }

    #[test]
    fn prune_drops_empty_entries_from_old_files() {
        let mut ledger: NotificationLedger =
            serde_json::from_str(r#"{"performances":{"3":[],"5":["x"]}}"#).unwrap();
        ledger.prune();
        assert_eq!(ledger.performance_ids(), vec![5]);
    }
}
