//! Observable bindings
//!
//! A [`Binding`] is a shared, single-threaded value with change
//! subscribers. Transition controllers subscribe to a `Binding<bool>` (a
//! presented flag) or a `Binding<Option<T>>` (the selected item) and react
//! to every change, much like an `onChange` handler in a declarative UI.
//!
//! Subscribers only run when the value actually changes, and they run after
//! the binding's internal borrow is released, so a subscriber may read or
//! even write the binding again.
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use teleport_core::Binding;
//!
//! let presented = Binding::new(false);
//! let seen = Rc::new(Cell::new(0));
//! let seen_in_cb = seen.clone();
//! let _sub = presented.subscribe(move |_| seen_in_cb.set(seen_in_cb.get() + 1));
//!
//! presented.set(true);
//! presented.set(true); // unchanged, no notification
//! assert_eq!(seen.get(), 1);
//! ```

use smallvec::SmallVec;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

type Subscriber<T> = Rc<dyn Fn(&T)>;

struct BindingInner<T> {
    value: T,
    subscribers: SmallVec<[(u64, Subscriber<T>); 2]>,
    next_subscription: u64,
}

/// A shared observable value
pub struct Binding<T> {
    inner: Rc<RefCell<BindingInner<T>>>,
}

impl<T> Clone for Binding<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + PartialEq + 'static> Binding<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(BindingInner {
                value,
                subscribers: SmallVec::new(),
                next_subscription: 0,
            })),
        }
    }

    /// Get a copy of the current value
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Set the value, notifying subscribers if it changed
    pub fn set(&self, value: T) {
        let subscribers: Vec<Subscriber<T>> = {
            let mut inner = self.inner.borrow_mut();
            if inner.value == value {
                return;
            }
            inner.value = value.clone();
            inner.subscribers.iter().map(|(_, s)| Rc::clone(s)).collect()
        };
        for subscriber in subscribers {
            subscriber(&value);
        }
    }

    /// Update the value in place, notifying subscribers if it changed
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut T),
    {
        let mut value = self.get();
        f(&mut value);
        self.set(value);
    }

    /// Subscribe to changes
    ///
    /// The subscription stays active until the returned handle is passed to
    /// [`Binding::unsubscribe`] or the binding is dropped.
    pub fn subscribe<F>(&self, callback: F) -> BindingSubscription
    where
        F: Fn(&T) + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_subscription;
        inner.next_subscription += 1;
        inner.subscribers.push((id, Rc::new(callback)));
        BindingSubscription { id }
    }

    pub fn unsubscribe(&self, subscription: BindingSubscription) {
        self.inner
            .borrow_mut()
            .subscribers
            .retain(|(id, _)| *id != subscription.id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    /// Weak handle that does not keep the binding alive
    pub fn downgrade(&self) -> WeakBinding<T> {
        WeakBinding {
            inner: Rc::downgrade(&self.inner),
        }
    }
}

impl Binding<bool> {
    pub fn toggle(&self) {
        self.update(|value| *value = !*value);
    }
}

impl<T: fmt::Debug> fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Binding")
            .field("value", &inner.value)
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

/// Non-owning reference to a [`Binding`]
pub struct WeakBinding<T> {
    inner: Weak<RefCell<BindingInner<T>>>,
}

impl<T> WeakBinding<T> {
    pub fn upgrade(&self) -> Option<Binding<T>> {
        self.inner.upgrade().map(|inner| Binding { inner })
    }
}

/// Handle for removing a binding subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingSubscription {
    id: u64,
}
