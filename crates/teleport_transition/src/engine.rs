//! Transition state machine
//!
//! Drives one record per key through
//! `Idle → AnimatingForward → ForwardSettled → AnimatingReverse → Idle`.
//! Both controller flavors delegate here; they only differ in how they pick
//! the key and when they call [`Engine::forward`] and [`Engine::reverse`].
//!
//! Every deferred step (the delayed forward start and the completion of
//! either leg) runs as a scheduler callback that carries the record's cycle
//! generation. A callback whose cycle or expected phase no longer matches
//! the record is stale and does nothing.

use std::fmt;
use std::rc::Rc;

use teleport_animation::{
    AnimationId, AnimationScheduler, ProgressAnimation, SchedulerHandle, TaskId,
};
use teleport_core::{OverlayContent, TransitionKey};

use crate::config::RetentionPolicy;
use crate::controller::TransitionOptions;
use crate::record::{AnimationSpec, Phase};
use crate::registry::Registry;

/// Called after a key returns to `Idle`
pub(crate) type IdleHook = Rc<dyn Fn(&TransitionKey)>;

#[derive(Clone)]
pub(crate) struct Engine {
    registry: Registry,
    scheduler: SchedulerHandle,
    retention: RetentionPolicy,
    on_idle: IdleHook,
}

impl Engine {
    pub(crate) fn new(
        registry: Registry,
        scheduler: SchedulerHandle,
        retention: RetentionPolicy,
        on_idle: IdleHook,
    ) -> Self {
        Self {
            registry,
            scheduler,
            retention,
            on_idle,
        }
    }

    pub(crate) fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Open a forward cycle for `key`
    ///
    /// Returns true when a new cycle was opened. `content` is only called in
    /// that case. A key that is mid-reverse is left alone; its controller
    /// fires forward again from the idle hook.
    pub(crate) fn forward<F>(&self, key: &TransitionKey, options: &TransitionOptions, content: F) -> bool
    where
        F: FnOnce() -> OverlayContent,
    {
        self.registry.upsert(key);
        let state = self
            .registry
            .with(key.as_str(), |r| (r.phase, r.is_start_pending()));
        match state {
            Some((Phase::Idle, false)) => {}
            Some((Phase::AnimatingReverse, _)) => {
                tracing::debug!(
                    "Teleport: forward for key={} deferred until reverse completes",
                    key
                );
                return false;
            }
            _ => {
                tracing::trace!("Teleport: forward for key={} already active", key);
                return false;
            }
        }

        let cycle = self.registry.next_cycle();
        let content = content();
        let spec = options.animation;
        let corner = options.corner;
        let on_complete = options.on_complete.clone();
        self.registry.mutate(key.as_str(), |r| {
            r.initialized = true;
            r.overlay_content = Some(content);
            r.animation_spec = spec;
            r.corner_spec = corner;
            r.on_complete = on_complete;
            r.cycle = cycle;
        });

        let engine = self.clone();
        let task_key = key.clone();
        let task = self.scheduler.schedule_after(spec.delay_ms, move || {
            engine.start_forward(&task_key, cycle);
        });
        match task {
            Some(task) => {
                self.registry
                    .mutate(key.as_str(), |r| r.pending_start = Some(task));
                tracing::debug!(
                    "Teleport: opened cycle {} for key={}, start in {}ms",
                    cycle,
                    key,
                    spec.delay_ms
                );
            }
            None => {
                tracing::warn!(
                    "Teleport: scheduler dropped, forward for key={} will not start",
                    key
                );
            }
        }
        true
    }

    fn start_forward(&self, key: &TransitionKey, cycle: u64) {
        let spec = self.registry.with(key.as_str(), |r| {
            (r.cycle == cycle && r.phase == Phase::Idle && r.is_start_pending())
                .then_some(r.animation_spec)
        });
        let Some(Some(spec)) = spec else {
            tracing::trace!("Teleport: stale start for key={} cycle {}", key, cycle);
            return;
        };

        let now = self.scheduler.now_ms();
        self.registry.mutate(key.as_str(), |r| {
            r.phase = Phase::AnimatingForward;
            r.pending_start = None;
            r.forward_started_at = Some(now);
        });
        tracing::debug!(
            "Teleport: key={} Idle -> AnimatingForward (cycle {})",
            key,
            cycle
        );

        let engine = self.clone();
        let done_key = key.clone();
        let animation = self.start_leg(ProgressAnimation::forward(spec.curve), spec, move || {
            engine.complete_forward(&done_key, cycle)
        });
        self.registry
            .mutate(key.as_str(), |r| r.animation = animation);
    }

    /// Start one leg with completion detection per the record's spec
    fn start_leg<F>(
        &self,
        animation: ProgressAnimation,
        spec: AnimationSpec,
        on_done: F,
    ) -> Option<AnimationId>
    where
        F: FnOnce() + 'static,
    {
        match spec.completion.criteria() {
            Some(criteria) => {
                self.scheduler
                    .start_animation_with_completion(animation, criteria, on_done)
            }
            None => {
                let id = self.scheduler.start_animation(animation);
                let delay = spec.curve.nominal_duration_ms().ceil().max(0.0) as u32;
                self.scheduler.schedule_after(delay, on_done);
                id
            }
        }
    }

    fn complete_forward(&self, key: &TransitionKey, cycle: u64) {
        let settled = self.registry.mutate(key.as_str(), |r| {
            if r.cycle != cycle || r.phase != Phase::AnimatingForward {
                return None;
            }
            r.phase = Phase::ForwardSettled;
            r.hide_destination = true;
            Some(r.on_complete.clone())
        });
        let Some(Some(on_complete)) = settled else {
            tracing::trace!("Teleport: stale forward completion for key={}", key);
            return;
        };
        tracing::debug!(
            "Teleport: key={} AnimatingForward -> ForwardSettled (cycle {})",
            key,
            cycle
        );
        if let Some(callback) = on_complete {
            callback.call(true);
        }
    }

    /// Close the cycle for `key`, animating back to the source if needed
    ///
    /// Returns true when the call changed anything.
    pub(crate) fn reverse(&self, key: &TransitionKey) -> bool {
        let state = self
            .registry
            .with(key.as_str(), |r| (r.phase, r.pending_start, r.cycle));
        let Some((phase, pending_start, cycle)) = state else {
            return false;
        };

        match phase {
            Phase::Idle => match pending_start {
                Some(task) => {
                    self.cancel_pending(key, task, cycle);
                    true
                }
                None => false,
            },
            Phase::AnimatingReverse => false,
            Phase::AnimatingForward | Phase::ForwardSettled => {
                self.start_reverse(key, phase, cycle);
                true
            }
        }
    }

    fn cancel_pending(&self, key: &TransitionKey, task: TaskId, cycle: u64) {
        self.scheduler.cancel(task);
        let on_complete = self
            .registry
            .with(key.as_str(), |r| r.on_complete.clone())
            .flatten();
        tracing::debug!(
            "Teleport: key={} cancelled before start (cycle {})",
            key,
            cycle
        );
        // The forward direction never ran but still gets its one call
        if let Some(callback) = &on_complete {
            callback.call(true);
        }
        self.release(key);
        if let Some(callback) = &on_complete {
            callback.call(false);
        }
        (self.on_idle)(key);
    }

    fn start_reverse(&self, key: &TransitionKey, from: Phase, cycle: u64) {
        let Some((spec, running, on_complete)) = self.registry.with(key.as_str(), |r| {
            (r.animation_spec, r.animation, r.on_complete.clone())
        }) else {
            return;
        };

        let animation = match running.and_then(|id| self.scheduler.stop_animation(id)) {
            Some(mut animation) => {
                animation.retarget(0.0);
                animation
            }
            None => ProgressAnimation::new(spec.curve, 1.0, 0.0),
        };

        let engine = self.clone();
        let done_key = key.clone();
        let id = self.start_leg(animation, spec, move || {
            engine.complete_reverse(&done_key, cycle)
        });
        self.registry.mutate(key.as_str(), |r| {
            r.hide_destination = false;
            r.phase = Phase::AnimatingReverse;
            r.animation = id;
        });
        tracing::debug!(
            "Teleport: key={} {:?} -> AnimatingReverse (cycle {})",
            key,
            from,
            cycle
        );

        if from == Phase::AnimatingForward {
            if let Some(callback) = on_complete {
                callback.call(true);
            }
        }
    }

    fn complete_reverse(&self, key: &TransitionKey, cycle: u64) {
        let state = self.registry.with(key.as_str(), |r| {
            (r.cycle == cycle && r.phase == Phase::AnimatingReverse)
                .then(|| (r.on_complete.clone(), r.animation))
        });
        let Some(Some((on_complete, animation))) = state else {
            tracing::trace!("Teleport: stale reverse completion for key={}", key);
            return;
        };

        if let Some(id) = animation {
            self.scheduler.stop_animation(id);
        }
        self.release(key);
        tracing::debug!(
            "Teleport: key={} AnimatingReverse -> Idle (cycle {})",
            key,
            cycle
        );
        if let Some(callback) = on_complete {
            callback.call(false);
        }
        (self.on_idle)(key);
    }

    /// Drop all per-cycle state for `key` per the retention policy
    fn release(&self, key: &TransitionKey) {
        match self.retention {
            RetentionPolicy::Reset => {
                self.registry.mutate(key.as_str(), |r| r.reset());
            }
            RetentionPolicy::Remove => {
                self.registry.remove(key.as_str());
            }
        }
    }
}

/// Completion calls a record is still owed, in delivery order
fn owed_completions(phase: Phase, start_pending: bool) -> &'static [bool] {
    match phase {
        Phase::Idle if start_pending => &[true, false],
        Phase::Idle => &[],
        Phase::AnimatingForward => &[true, false],
        // forward was reported on settle or on interruption
        Phase::ForwardSettled | Phase::AnimatingReverse => &[false],
    }
}

/// Close every open cycle at once without animating
///
/// Cancels all scheduler work and clears the registry, then delivers each
/// cycle's outstanding completion calls. Idle hooks do not run, so nothing
/// restarts. Returns the number of cycles closed.
pub(crate) fn teardown(registry: &Registry, scheduler: &AnimationScheduler) -> usize {
    let owed: Vec<_> = registry
        .records()
        .into_iter()
        .filter_map(|r| {
            let calls = owed_completions(r.phase, r.is_start_pending());
            (!calls.is_empty()).then(|| (r.key, r.phase, r.on_complete, calls))
        })
        .collect();

    scheduler.clear();
    registry.clear();

    for (key, phase, on_complete, calls) in &owed {
        tracing::debug!("Teleport: key={} {:?} -> Idle (torn down)", key, phase);
        if let Some(callback) = on_complete {
            calls.iter().for_each(|&forward| callback.call(forward));
        }
    }
    owed.len()
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("retention", &self.retention)
            .field("scheduler", &self.scheduler)
            .finish()
    }
}
