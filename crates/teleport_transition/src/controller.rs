//! Transition controllers
//!
//! A controller turns a value change in the host into transition phases:
//!
//! - [`TransitionController`] drives a fixed key from a boolean trigger,
//!   like a "presented" flag.
//! - [`IdentityController`] drives whichever key the selected item maps to,
//!   and remembers the last key so that clearing the selection reverses the
//!   right transition.
//!
//! Controllers hold their binding subscription weakly and unsubscribe on
//! drop; keep the controller alive for as long as the transition should
//! follow the binding.
//!
//! ```rust
//! use teleport_animation::{AnimationCurve, AnimationScheduler};
//! use teleport_core::{Binding, Color, OverlayContent};
//! use teleport_transition::{Phase, Registry, TransitionController, TransitionOptions};
//!
//! let registry = Registry::new();
//! let scheduler = AnimationScheduler::new();
//! let presented = Binding::new(false);
//!
//! let controller = TransitionController::new(
//!     "card",
//!     &registry,
//!     scheduler.handle(),
//!     TransitionOptions::new().with_curve(AnimationCurve::linear(100)),
//!     || OverlayContent::new(Color::BLUE),
//! );
//! controller.bind(&presented);
//!
//! presented.set(true);
//! scheduler.run_until_idle(100);
//! assert_eq!(controller.phase(), Phase::ForwardSettled);
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use teleport_animation::{AnimationCurve, SchedulerHandle};
use teleport_core::{
    Binding, BindingSubscription, Identifiable, OverlayContent, Result, TransitionKey,
    WeakBinding,
};

use crate::config::RetentionPolicy;
use crate::engine::{Engine, IdleHook};
use crate::record::{
    AnimationSpec, CompletionCallback, CompletionMode, CornerSpec, Phase, TransitionRecord,
};
use crate::registry::Registry;

/// Per-transition options
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransitionOptions {
    pub animation: AnimationSpec,
    /// Corner radius interpolation; `None` draws the proxy unclipped
    pub corner: Option<CornerSpec>,
    pub on_complete: Option<CompletionCallback>,
    pub retention: RetentionPolicy,
}

impl TransitionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_animation(mut self, animation: AnimationSpec) -> Self {
        self.animation = animation;
        self
    }

    pub fn with_curve(mut self, curve: AnimationCurve) -> Self {
        self.animation.curve = curve;
        self
    }

    pub fn with_delay(mut self, delay_ms: u32) -> Self {
        self.animation.delay_ms = delay_ms;
        self
    }

    pub fn with_completion_mode(mut self, completion: CompletionMode) -> Self {
        self.animation.completion = completion;
        self
    }

    pub fn with_corner(mut self, corner: CornerSpec) -> Self {
        self.corner = Some(corner);
        self
    }

    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    /// Called with `true` when the forward leg completes and `false` when the
    /// reverse leg completes
    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: Fn(bool) + 'static,
    {
        self.on_complete = Some(CompletionCallback::new(callback));
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.animation.validate()?;
        if let Some(corner) = &self.corner {
            corner.validate()?;
        }
        Ok(())
    }

    /// Replace invalid parts with defaults so runtime operations stay total
    fn sanitized(mut self) -> Self {
        if let Err(err) = self.animation.validate() {
            tracing::warn!("Teleport: {}, using the default curve", err);
            self.animation.curve = AnimationCurve::default();
        }
        if let Some(Err(err)) = self.corner.as_ref().map(CornerSpec::validate) {
            tracing::warn!("Teleport: {}, drawing the proxy unclipped", err);
            self.corner = None;
        }
        self
    }
}

/// Read-only view shared by both controller flavors
fn current_phase(registry: &Registry, key: &TransitionKey) -> Phase {
    registry
        .with(key.as_str(), |r| r.phase)
        .unwrap_or_default()
}

struct ControllerInner {
    key: TransitionKey,
    engine: Engine,
    options: TransitionOptions,
    factory: Box<dyn Fn() -> OverlayContent>,
    trigger: Cell<bool>,
    binding: RefCell<Option<(WeakBinding<bool>, BindingSubscription)>>,
}

impl ControllerInner {
    fn apply(&self, on: bool) -> bool {
        self.trigger.set(on);
        if on {
            self.engine
                .forward(&self.key, &self.options, || (self.factory)())
        } else {
            self.engine.reverse(&self.key)
        }
    }
}

impl Drop for ControllerInner {
    fn drop(&mut self) {
        if let Some((binding, subscription)) = self.binding.get_mut().take() {
            if let Some(binding) = binding.upgrade() {
                binding.unsubscribe(subscription);
            }
        }
    }
}

/// Drives one fixed key from a boolean trigger
pub struct TransitionController {
    inner: Rc<ControllerInner>,
}

impl TransitionController {
    /// Create a controller for `key`
    ///
    /// `factory` builds the overlay proxy; it is called once each time a
    /// forward cycle opens.
    pub fn new<F>(
        key: impl Into<TransitionKey>,
        registry: &Registry,
        scheduler: SchedulerHandle,
        options: TransitionOptions,
        factory: F,
    ) -> Self
    where
        F: Fn() -> OverlayContent + 'static,
    {
        let key = key.into();
        let options = options.sanitized();
        registry.upsert(&key);

        let inner = Rc::new_cyclic(|weak: &Weak<ControllerInner>| {
            let weak = weak.clone();
            let on_idle: IdleHook = Rc::new(move |_: &TransitionKey| {
                // Trigger came back on while reversing
                if let Some(inner) = weak.upgrade() {
                    if inner.trigger.get() {
                        inner.apply(true);
                    }
                }
            });
            ControllerInner {
                engine: Engine::new(registry.clone(), scheduler, options.retention, on_idle),
                key,
                options,
                factory: Box::new(factory),
                trigger: Cell::new(false),
                binding: RefCell::new(None),
            }
        });

        Self { inner }
    }

    /// Follow `binding`, replacing any earlier binding
    ///
    /// A binding that is already `true` starts a forward cycle right away.
    pub fn bind(&self, binding: &Binding<bool>) {
        let weak = Rc::downgrade(&self.inner);
        let subscription = binding.subscribe(move |on: &bool| {
            if let Some(inner) = weak.upgrade() {
                inner.apply(*on);
            }
        });

        let previous = self
            .inner
            .binding
            .replace(Some((binding.downgrade(), subscription)));
        if let Some((old, old_subscription)) = previous {
            if let Some(old) = old.upgrade() {
                old.unsubscribe(old_subscription);
            }
        }

        if binding.get() {
            self.inner.apply(true);
        }
    }

    /// Set the trigger directly
    ///
    /// Returns true when the call changed the transition.
    pub fn set_trigger(&self, on: bool) -> bool {
        self.inner.apply(on)
    }

    pub fn trigger(&self) -> bool {
        self.inner.trigger.get()
    }

    pub fn key(&self) -> &TransitionKey {
        &self.inner.key
    }

    pub fn phase(&self) -> Phase {
        current_phase(self.inner.engine.registry(), &self.inner.key)
    }

    /// Snapshot of this controller's record
    pub fn record(&self) -> Option<TransitionRecord> {
        self.inner.engine.registry().get(self.inner.key.as_str())
    }

    pub fn options(&self) -> &TransitionOptions {
        &self.inner.options
    }
}

impl fmt::Debug for TransitionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionController")
            .field("key", &self.inner.key)
            .field("trigger", &self.inner.trigger.get())
            .field("phase", &self.phase())
            .finish()
    }
}

type IdentityFactory<T> = Box<dyn Fn(&T) -> OverlayContent>;

struct IdentityInner<T: Clone + PartialEq + 'static> {
    engine: Engine,
    options: TransitionOptions,
    factory: IdentityFactory<T>,
    current: RefCell<Option<T>>,
    last_key: RefCell<Option<TransitionKey>>,
    binding: RefCell<Option<(WeakBinding<Option<T>>, BindingSubscription)>>,
}

impl<T> IdentityInner<T>
where
    T: Identifiable + Clone + PartialEq + 'static,
{
    fn apply(&self, next: Option<T>) -> bool {
        let previous_key = self.last_key.borrow().clone();
        self.current.replace(next.clone());

        match next {
            Some(item) => {
                let key = TransitionKey::from_identity(&item);
                let mut changed = false;
                if let Some(previous) = previous_key.filter(|previous| *previous != key) {
                    changed |= self.engine.reverse(&previous);
                }
                self.last_key.replace(Some(key.clone()));
                changed |= self
                    .engine
                    .forward(&key, &self.options, || (self.factory)(&item));
                changed
            }
            // last_key is kept so a later reverse still finds the record
            None => match previous_key {
                Some(previous) => self.engine.reverse(&previous),
                None => false,
            },
        }
    }

    fn on_idle(&self, key: &TransitionKey) {
        let current = self.current.borrow().clone();
        if let Some(item) = current {
            if TransitionKey::from_identity(&item) == *key {
                self.engine
                    .forward(key, &self.options, || (self.factory)(&item));
            }
        }
    }
}

impl<T: Clone + PartialEq + 'static> Drop for IdentityInner<T> {
    fn drop(&mut self) {
        if let Some((binding, subscription)) = self.binding.get_mut().take() {
            if let Some(binding) = binding.upgrade() {
                binding.unsubscribe(subscription);
            }
        }
    }
}

/// Drives the transition keyed by the currently selected item
///
/// Selecting an item opens its transition; clearing the selection reverses
/// the last selected item's transition. Switching straight from one item to
/// another reverses the first and opens the second.
pub struct IdentityController<T: Clone + PartialEq + 'static> {
    inner: Rc<IdentityInner<T>>,
}

impl<T> IdentityController<T>
where
    T: Identifiable + Clone + PartialEq + 'static,
{
    pub fn new<F>(
        registry: &Registry,
        scheduler: SchedulerHandle,
        options: TransitionOptions,
        factory: F,
    ) -> Self
    where
        F: Fn(&T) -> OverlayContent + 'static,
    {
        let options = options.sanitized();
        let inner = Rc::new_cyclic(|weak: &Weak<IdentityInner<T>>| {
            let weak = weak.clone();
            let on_idle: IdleHook = Rc::new(move |key: &TransitionKey| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_idle(key);
                }
            });
            IdentityInner {
                engine: Engine::new(registry.clone(), scheduler, options.retention, on_idle),
                options,
                factory: Box::new(factory),
                current: RefCell::new(None),
                last_key: RefCell::new(None),
                binding: RefCell::new(None),
            }
        });

        Self { inner }
    }

    /// Follow `binding`, replacing any earlier binding
    pub fn bind(&self, binding: &Binding<Option<T>>) {
        let weak = Rc::downgrade(&self.inner);
        let subscription = binding.subscribe(move |next: &Option<T>| {
            if let Some(inner) = weak.upgrade() {
                inner.apply(next.clone());
            }
        });

        let previous = self
            .inner
            .binding
            .replace(Some((binding.downgrade(), subscription)));
        if let Some((old, old_subscription)) = previous {
            if let Some(old) = old.upgrade() {
                old.unsubscribe(old_subscription);
            }
        }

        let initial = binding.get();
        if initial.is_some() {
            self.inner.apply(initial);
        }
    }

    /// Select an item, or clear the selection with `None`
    pub fn set_identity(&self, identity: Option<T>) -> bool {
        self.inner.apply(identity)
    }

    pub fn identity(&self) -> Option<T> {
        self.inner.current.borrow().clone()
    }

    /// Key of the most recently selected item
    pub fn last_key(&self) -> Option<TransitionKey> {
        self.inner.last_key.borrow().clone()
    }

    /// Phase of the transition for `item`
    pub fn phase_of(&self, item: &T) -> Phase {
        current_phase(
            self.inner.engine.registry(),
            &TransitionKey::from_identity(item),
        )
    }

    pub fn options(&self) -> &TransitionOptions {
        &self.inner.options
    }
}

impl<T: Clone + PartialEq + 'static> fmt::Debug for IdentityController<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityController")
            .field("last_key", &*self.inner.last_key.borrow())
            .finish()
    }
}
