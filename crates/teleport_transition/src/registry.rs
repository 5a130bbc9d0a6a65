//! Transition registry
//!
//! The single source of truth for every in-flight transition: an ordered,
//! observable map from [`TransitionKey`] to [`TransitionRecord`].
//!
//! The registry is an explicitly constructed handle (cheap to clone, shared
//! by reference counting) rather than an ambient global, so each UI root owns
//! exactly one. It is confined to the UI thread; there is no locking because
//! there is no parallel mutation.
//!
//! # Anchor reports
//!
//! Observers push geometry into the registry with
//! [`Registry::report_anchor`] during a layout pass. Reports are buffered per
//! [`CompositeKey`] and applied by [`Registry::resolve_anchor_reports`] at
//! the end of the pass. When two observers report under the same composite
//! key in one pass, the later report wins.
//!
//! ```rust
//! use teleport_core::{Rect, Role, TransitionKey};
//! use teleport_transition::Registry;
//!
//! let registry = Registry::new();
//! let key = TransitionKey::new("card");
//! registry.upsert(key.clone());
//! registry.mutate("card", |r| r.initialized = true);
//!
//! registry.report_anchor(key.composite(Role::Destination), Rect::new(0.0, 80.0, 390.0, 300.0));
//! assert_eq!(registry.resolve_anchor_reports(), 1);
//! assert!(registry.get("card").unwrap().destination_anchor.is_some());
//! ```

use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashMap};
use smallvec::SmallVec;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use teleport_core::{CompositeKey, Rect, Role, TransitionKey};

use crate::record::TransitionRecord;

type FxIndexMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Change notification delivered to registry subscribers
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryEvent {
    Inserted(TransitionKey),
    Updated(TransitionKey),
    Removed(TransitionKey),
    Cleared,
}

/// Handle for removing a registry subscriber
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Rc<dyn Fn(&RegistryEvent)>;

struct RegistryInner {
    records: FxIndexMap<TransitionKey, TransitionRecord>,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
    next_cycle: u64,
    /// Anchor reports buffered for the current layout pass
    reports: FxIndexMap<CompositeKey, Rect>,
    report_counts: FxHashMap<CompositeKey, u32>,
}

/// Ordered, observable store of transition records
#[derive(Clone)]
pub struct Registry {
    inner: Rc<RefCell<RegistryInner>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(RegistryInner {
                records: FxIndexMap::default(),
                subscribers: Vec::new(),
                next_subscription: 0,
                next_cycle: 0,
                reports: FxIndexMap::default(),
                report_counts: FxHashMap::default(),
            })),
        }
    }

    /// Insert a default record for `key` if none exists
    ///
    /// Returns true when a record was created.
    pub fn upsert(&self, key: impl Into<TransitionKey>) -> bool {
        let key = key.into();
        let inserted = {
            let mut inner = self.inner.borrow_mut();
            if inner.records.contains_key(&key) {
                false
            } else {
                inner
                    .records
                    .insert(key.clone(), TransitionRecord::new(key.clone()));
                true
            }
        };
        if inserted {
            tracing::trace!("Registry: inserted record for {}", key);
            self.notify(&RegistryEvent::Inserted(key));
        }
        inserted
    }

    /// Snapshot of the record for `key`
    pub fn get(&self, key: &str) -> Option<TransitionRecord> {
        self.inner.borrow().records.get(key).cloned()
    }

    /// Read the record for `key` without cloning it
    pub fn with<F, R>(&self, key: &str, f: F) -> Option<R>
    where
        F: FnOnce(&TransitionRecord) -> R,
    {
        self.inner.borrow().records.get(key).map(f)
    }

    /// Apply `f` to the record for `key`; no-op if absent
    ///
    /// `f` must not call back into the registry. Subscribers are notified
    /// after the record has been written.
    pub fn mutate<F, R>(&self, key: &str, f: F) -> Option<R>
    where
        F: FnOnce(&mut TransitionRecord) -> R,
    {
        let (result, key) = {
            let mut inner = self.inner.borrow_mut();
            let record = inner.records.get_mut(key)?;
            let key = record.key.clone();
            (f(record), key)
        };
        self.notify(&RegistryEvent::Updated(key));
        Some(result)
    }

    /// Remove the record for `key`
    pub fn remove(&self, key: &str) -> Option<TransitionRecord> {
        let removed = self.inner.borrow_mut().records.shift_remove(key);
        if let Some(record) = &removed {
            tracing::trace!("Registry: removed record for {}", record.key);
            self.notify(&RegistryEvent::Removed(record.key.clone()));
        }
        removed
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.borrow().records.contains_key(key)
    }

    /// Keys in insertion order
    pub fn keys(&self) -> Vec<TransitionKey> {
        self.inner.borrow().records.keys().cloned().collect()
    }

    /// Snapshot of every record in insertion order
    pub fn records(&self) -> Vec<TransitionRecord> {
        self.inner.borrow().records.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().records.is_empty()
    }

    /// Drop every record and pending report
    pub fn clear(&self) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.records.clear();
            inner.reports.clear();
            inner.report_counts.clear();
        }
        self.notify(&RegistryEvent::Cleared);
    }

    /// Next cycle generation, unique across all keys for this registry
    pub fn next_cycle(&self) -> u64 {
        let mut inner = self.inner.borrow_mut();
        inner.next_cycle += 1;
        inner.next_cycle
    }

    /// Subscribe to record changes
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&RegistryEvent) + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        let id = SubscriptionId(inner.next_subscription);
        inner.next_subscription += 1;
        inner.subscribers.push((id, Rc::new(callback)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.inner
            .borrow_mut()
            .subscribers
            .retain(|(sub, _)| *sub != id);
    }

    fn notify(&self, event: &RegistryEvent) {
        let subscribers: Vec<Subscriber> = self
            .inner
            .borrow()
            .subscribers
            .iter()
            .map(|(_, s)| Rc::clone(s))
            .collect();
        for subscriber in subscribers {
            subscriber(event);
        }
    }

    /// Buffer an anchor report for the current layout pass
    pub fn report_anchor(&self, composite: CompositeKey, rect: Rect) {
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;
        let count = inner.report_counts.entry(composite.clone()).or_insert(0);
        *count += 1;
        if *count > 1 {
            if let Some(previous) = inner.reports.get(&composite) {
                if *previous != rect {
                    tracing::warn!(
                        "Registry: several observers reported {} in one pass; keeping the last report",
                        composite
                    );
                }
            }
        }
        inner.reports.insert(composite, rect);
    }

    /// Number of reports buffered for the current pass
    pub fn pending_reports(&self) -> usize {
        self.inner.borrow().reports.len()
    }

    /// Apply buffered reports and end the layout pass
    ///
    /// Destination reports always overwrite the destination anchor. Source
    /// reports only fill an empty source anchor, so the overlay's starting
    /// point stays put for the rest of the cycle. Records that are missing or
    /// not initialized ignore reports. Returns the number of anchors written.
    pub fn resolve_anchor_reports(&self) -> usize {
        let mut changed: SmallVec<[TransitionKey; 4]> = SmallVec::new();
        {
            let mut inner = self.inner.borrow_mut();
            let reports = std::mem::take(&mut inner.reports);
            inner.report_counts.clear();

            for (composite, rect) in reports {
                if !rect.is_finite() {
                    tracing::trace!("Registry: ignoring non-finite bounds for {}", composite);
                    continue;
                }
                let Some(record) = inner.records.get_mut(composite.key.as_str()) else {
                    continue;
                };
                if !record.initialized {
                    continue;
                }
                let written = match composite.role {
                    Role::Destination => {
                        if record.destination_anchor == Some(rect) {
                            false
                        } else {
                            record.destination_anchor = Some(rect);
                            true
                        }
                    }
                    Role::Source => {
                        if record.source_anchor.is_none() {
                            record.source_anchor = Some(rect);
                            true
                        } else {
                            false
                        }
                    }
                };
                if written {
                    changed.push(composite.key.clone());
                }
            }
        }

        let written = changed.len();
        for key in changed {
            self.notify(&RegistryEvent::Updated(key));
        }
        written
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Registry")
            .field("records", &inner.records.len())
            .field("pending_reports", &inner.reports.len())
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Phase;
    use std::cell::RefCell as StdRefCell;

    fn initialized(registry: &Registry, key: &str) {
        registry.upsert(key);
        registry.mutate(key, |r| r.initialized = true);
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let registry = Registry::new();
        assert!(registry.upsert("a"));
        registry.mutate("a", |r| r.phase = Phase::ForwardSettled);
        assert!(!registry.upsert("a"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("a").unwrap().phase, Phase::ForwardSettled);
    }

    #[test]
    fn test_missing_keys_degrade() {
        let registry = Registry::new();
        assert!(registry.get("nope").is_none());
        assert!(registry.mutate("nope", |r| r.initialized = true).is_none());
        assert!(registry.remove("nope").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_insertion_order() {
        let registry = Registry::new();
        for key in ["red", "blue", "green"] {
            registry.upsert(key);
        }
        registry.remove("blue");
        registry.upsert("blue");
        let keys: Vec<String> = registry.keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["red", "green", "blue"]);
    }

    #[test]
    fn test_subscribers_see_events() {
        let registry = Registry::new();
        let events = Rc::new(StdRefCell::new(Vec::new()));
        let events_cb = events.clone();
        let id = registry.subscribe(move |e| events_cb.borrow_mut().push(e.clone()));

        registry.upsert("a");
        registry.mutate("a", |r| r.initialized = true);
        registry.remove("a");
        registry.unsubscribe(id);
        registry.upsert("b");

        let a = TransitionKey::new("a");
        assert_eq!(
            *events.borrow(),
            vec![
                RegistryEvent::Inserted(a.clone()),
                RegistryEvent::Updated(a.clone()),
                RegistryEvent::Removed(a),
            ]
        );
    }

    #[test]
    fn test_subscriber_may_read_registry() {
        let registry = Registry::new();
        let reader = registry.clone();
        let seen = Rc::new(StdRefCell::new(None));
        let seen_cb = seen.clone();
        registry.subscribe(move |event| {
            if let RegistryEvent::Updated(key) = event {
                *seen_cb.borrow_mut() = reader.with(key.as_str(), |r| r.initialized);
            }
        });
        initialized(&registry, "a");
        assert_eq!(*seen.borrow(), Some(true));
    }

    #[test]
    fn test_reports_ignored_until_initialized() {
        let registry = Registry::new();
        let key = TransitionKey::new("a");
        registry.upsert(key.clone());
        registry.report_anchor(key.composite(Role::Source), Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(registry.resolve_anchor_reports(), 0);
        assert!(registry.get("a").unwrap().source_anchor.is_none());
        assert_eq!(registry.pending_reports(), 0);
    }

    #[test]
    fn test_source_anchor_captured_once() {
        let registry = Registry::new();
        let key = TransitionKey::new("a");
        initialized(&registry, "a");

        registry.report_anchor(key.composite(Role::Source), Rect::new(0.0, 0.0, 10.0, 10.0));
        registry.resolve_anchor_reports();
        registry.report_anchor(key.composite(Role::Source), Rect::new(5.0, 5.0, 10.0, 10.0));
        assert_eq!(registry.resolve_anchor_reports(), 0);

        assert_eq!(
            registry.get("a").unwrap().source_anchor,
            Some(Rect::new(0.0, 0.0, 10.0, 10.0))
        );
    }

    #[test]
    fn test_destination_anchor_tracks_latest() {
        let registry = Registry::new();
        let key = TransitionKey::new("a");
        initialized(&registry, "a");

        registry.report_anchor(key.composite(Role::Destination), Rect::new(0.0, 0.0, 10.0, 10.0));
        registry.resolve_anchor_reports();
        registry.report_anchor(key.composite(Role::Destination), Rect::new(0.0, 40.0, 10.0, 10.0));
        registry.resolve_anchor_reports();

        assert_eq!(
            registry.get("a").unwrap().destination_anchor,
            Some(Rect::new(0.0, 40.0, 10.0, 10.0))
        );
    }

    #[test]
    fn test_last_report_in_pass_wins() {
        let registry = Registry::new();
        let key = TransitionKey::new("a");
        initialized(&registry, "a");

        registry.report_anchor(key.composite(Role::Source), Rect::new(0.0, 0.0, 10.0, 10.0));
        registry.report_anchor(key.composite(Role::Source), Rect::new(0.0, 90.0, 10.0, 10.0));
        registry.resolve_anchor_reports();

        assert_eq!(
            registry.get("a").unwrap().source_anchor,
            Some(Rect::new(0.0, 90.0, 10.0, 10.0))
        );
    }

    #[test]
    fn test_non_finite_reports_dropped() {
        let registry = Registry::new();
        let key = TransitionKey::new("a");
        initialized(&registry, "a");
        registry.report_anchor(key.composite(Role::Destination), Rect::new(f32::NAN, 0.0, 1.0, 1.0));
        assert_eq!(registry.resolve_anchor_reports(), 0);
    }

    #[test]
    fn test_cycles_are_unique() {
        let registry = Registry::new();
        let a = registry.next_cycle();
        let b = registry.next_cycle();
        assert!(b > a);
    }
}
