//! Animation scheduler
//!
//! Single-threaded frame scheduler for transition legs. It owns two kinds of
//! work, both keyed by generational slotmap ids:
//!
//! - **Delayed tasks** - deferred callbacks (the pause before a forward leg
//!   starts). Cancellable through their [`TaskId`].
//! - **Progress animations** - running legs, stepped every frame, with an
//!   optional completion callback fired per [`CompletionCriteria`].
//!
//! The scheduler lives on the UI thread. Callbacks run on a later call to
//! [`AnimationScheduler::advance`] with no internal borrow held, so they may
//! schedule, cancel or query freely. Work scheduled from inside a callback
//! (even with zero delay) runs on the next advance, never the current one.
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use teleport_animation::AnimationScheduler;
//!
//! let scheduler = AnimationScheduler::new();
//! let fired = Rc::new(Cell::new(false));
//! let fired_cb = fired.clone();
//! scheduler.schedule_after(100, move || fired_cb.set(true));
//!
//! scheduler.advance(60.0);
//! assert!(!fired.get());
//! scheduler.advance(60.0);
//! assert!(fired.get());
//! ```

use crate::curve::{CompletionCriteria, ProgressAnimation};
use slotmap::{new_key_type, SlotMap};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

new_key_type! {
    /// Handle to a scheduled delayed task
    pub struct TaskId;
    /// Handle to a running progress animation
    pub struct AnimationId;
}

type Callback = Box<dyn FnOnce()>;

struct ScheduledTask {
    due_ms: f64,
    seq: u64,
    callback: Callback,
}

struct ScheduledAnimation {
    animation: ProgressAnimation,
    seq: u64,
    criteria: CompletionCriteria,
    on_complete: Option<Callback>,
}

struct SchedulerInner {
    now_ms: f64,
    seq: u64,
    tasks: SlotMap<TaskId, ScheduledTask>,
    animations: SlotMap<AnimationId, ScheduledAnimation>,
    target_fps: u32,
}

impl SchedulerInner {
    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn has_work(&self) -> bool {
        !self.tasks.is_empty() || !self.animations.is_empty()
    }
}

/// The scheduler that runs delayed tasks and ticks progress animations
///
/// Typically owned by the transition container and shared with controllers
/// through [`SchedulerHandle`].
pub struct AnimationScheduler {
    inner: Rc<RefCell<SchedulerInner>>,
}

impl AnimationScheduler {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(SchedulerInner {
                now_ms: 0.0,
                seq: 0,
                tasks: SlotMap::with_key(),
                animations: SlotMap::with_key(),
                target_fps: 120,
            })),
        }
    }

    /// Get a weak handle for passing to components
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn set_target_fps(&self, fps: u32) {
        self.inner.borrow_mut().target_fps = fps.max(1);
    }

    pub fn target_fps(&self) -> u32 {
        self.inner.borrow().target_fps
    }

    /// Frame interval at the target frame rate
    pub fn frame_interval_ms(&self) -> f32 {
        1000.0 / self.target_fps() as f32
    }

    /// Scheduler clock in milliseconds
    pub fn now_ms(&self) -> f64 {
        self.inner.borrow().now_ms
    }

    /// Run `callback` once `delay_ms` has elapsed on the scheduler clock
    pub fn schedule_after<F>(&self, delay_ms: u32, callback: F) -> TaskId
    where
        F: FnOnce() + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        let seq = inner.next_seq();
        let due_ms = inner.now_ms + f64::from(delay_ms);
        inner.tasks.insert(ScheduledTask {
            due_ms,
            seq,
            callback: Box::new(callback),
        })
    }

    /// Cancel a pending task. Returns false if it already ran or was cancelled.
    pub fn cancel(&self, id: TaskId) -> bool {
        self.inner.borrow_mut().tasks.remove(id).is_some()
    }

    pub fn is_pending(&self, id: TaskId) -> bool {
        self.inner.borrow().tasks.contains_key(id)
    }

    /// Start an animation with no completion callback
    pub fn start_animation(&self, animation: ProgressAnimation) -> AnimationId {
        self.insert_animation(animation, CompletionCriteria::Removed, None)
    }

    /// Start an animation and run `on_complete` once it meets `criteria`
    pub fn start_animation_with_completion<F>(
        &self,
        animation: ProgressAnimation,
        criteria: CompletionCriteria,
        on_complete: F,
    ) -> AnimationId
    where
        F: FnOnce() + 'static,
    {
        self.insert_animation(animation, criteria, Some(Box::new(on_complete)))
    }

    fn insert_animation(
        &self,
        animation: ProgressAnimation,
        criteria: CompletionCriteria,
        on_complete: Option<Callback>,
    ) -> AnimationId {
        let mut inner = self.inner.borrow_mut();
        let seq = inner.next_seq();
        inner.animations.insert(ScheduledAnimation {
            animation,
            seq,
            criteria,
            on_complete,
        })
    }

    /// Current progress value, or None once the animation has been removed
    pub fn progress(&self, id: AnimationId) -> Option<f32> {
        self.inner
            .borrow()
            .animations
            .get(id)
            .map(|a| a.animation.value())
    }

    pub fn is_animating(&self, id: AnimationId) -> bool {
        self.inner.borrow().animations.contains_key(id)
    }

    /// Stop and remove an animation without running its completion
    pub fn stop_animation(&self, id: AnimationId) -> Option<ProgressAnimation> {
        self.inner
            .borrow_mut()
            .animations
            .remove(id)
            .map(|a| a.animation)
    }

    /// Advance the clock by `dt_ms`, run due tasks and fire completions
    ///
    /// Returns true while any task or animation is still outstanding.
    pub fn advance(&self, dt_ms: f32) -> bool {
        let callbacks = {
            let mut inner = self.inner.borrow_mut();
            // Clock never runs backwards and a bad frame time counts as zero
            let dt_ms = if dt_ms.is_finite() { dt_ms.max(0.0) } else { 0.0 };
            inner.now_ms += f64::from(dt_ms);
            let now = inner.now_ms;

            let mut due: Vec<(f64, u64, TaskId)> = inner
                .tasks
                .iter()
                .filter(|(_, task)| task.due_ms <= now)
                .map(|(id, task)| (task.due_ms, task.seq, id))
                .collect();
            due.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

            let mut callbacks: Vec<Callback> = Vec::with_capacity(due.len());
            for (_, _, id) in due {
                if let Some(task) = inner.tasks.remove(id) {
                    callbacks.push(task.callback);
                }
            }

            let mut completed: Vec<(u64, Callback)> = Vec::new();
            let mut finished: Vec<AnimationId> = Vec::new();
            for (id, scheduled) in inner.animations.iter_mut() {
                scheduled.animation.step(dt_ms);
                if scheduled.animation.is_complete(scheduled.criteria) {
                    if let Some(callback) = scheduled.on_complete.take() {
                        completed.push((scheduled.seq, callback));
                    }
                }
                if scheduled.animation.is_finished() && scheduled.on_complete.is_none() {
                    finished.push(id);
                }
            }
            for id in finished {
                inner.animations.remove(id);
            }
            completed.sort_by_key(|(seq, _)| *seq);
            callbacks.extend(completed.into_iter().map(|(_, callback)| callback));

            if !callbacks.is_empty() {
                tracing::trace!(
                    "AnimationScheduler: {} callbacks at t={:.1}ms",
                    callbacks.len(),
                    now
                );
            }
            callbacks
        };

        for callback in callbacks {
            callback();
        }

        self.inner.borrow().has_work()
    }

    /// Run tasks that are already due without moving the clock
    pub fn flush(&self) -> bool {
        self.advance(0.0)
    }

    /// Advance in fixed frames until no work remains or `max_frames` elapse
    ///
    /// Returns the number of frames advanced.
    pub fn run_until_idle(&self, max_frames: usize) -> usize {
        let frame = self.frame_interval_ms();
        let mut frames = 0;
        // Due work first, so a zero-delay task does not cost a frame
        if !self.flush() {
            return frames;
        }
        while frames < max_frames {
            frames += 1;
            if !self.advance(frame) {
                break;
            }
        }
        frames
    }

    pub fn has_pending_work(&self) -> bool {
        self.inner.borrow().has_work()
    }

    pub fn task_count(&self) -> usize {
        self.inner.borrow().tasks.len()
    }

    pub fn animation_count(&self) -> usize {
        self.inner.borrow().animations.len()
    }

    /// Drop every pending task and running animation without running callbacks
    pub fn clear(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.tasks.clear();
        inner.animations.clear();
    }
}

impl Default for AnimationScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AnimationScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("AnimationScheduler")
            .field("now_ms", &inner.now_ms)
            .field("tasks", &inner.tasks.len())
            .field("animations", &inner.animations.len())
            .finish()
    }
}

/// A weak handle to the scheduler
///
/// Does not keep the scheduler alive. Every operation degrades to a no-op
/// (or `None`) once the scheduler has been dropped.
#[derive(Clone)]
pub struct SchedulerHandle {
    inner: Weak<RefCell<SchedulerInner>>,
}

impl SchedulerHandle {
    fn upgrade(&self) -> Option<AnimationScheduler> {
        self.inner
            .upgrade()
            .map(|inner| AnimationScheduler { inner })
    }

    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    pub fn now_ms(&self) -> f64 {
        self.upgrade().map(|s| s.now_ms()).unwrap_or(0.0)
    }

    pub fn schedule_after<F>(&self, delay_ms: u32, callback: F) -> Option<TaskId>
    where
        F: FnOnce() + 'static,
    {
        self.upgrade().map(|s| s.schedule_after(delay_ms, callback))
    }

    pub fn cancel(&self, id: TaskId) -> bool {
        self.upgrade().map(|s| s.cancel(id)).unwrap_or(false)
    }

    pub fn is_pending(&self, id: TaskId) -> bool {
        self.upgrade().map(|s| s.is_pending(id)).unwrap_or(false)
    }

    pub fn start_animation(&self, animation: ProgressAnimation) -> Option<AnimationId> {
        self.upgrade().map(|s| s.start_animation(animation))
    }

    pub fn start_animation_with_completion<F>(
        &self,
        animation: ProgressAnimation,
        criteria: CompletionCriteria,
        on_complete: F,
    ) -> Option<AnimationId>
    where
        F: FnOnce() + 'static,
    {
        self.upgrade()
            .map(|s| s.start_animation_with_completion(animation, criteria, on_complete))
    }

    pub fn progress(&self, id: AnimationId) -> Option<f32> {
        self.upgrade().and_then(|s| s.progress(id))
    }

    pub fn stop_animation(&self, id: AnimationId) -> Option<ProgressAnimation> {
        self.upgrade().and_then(|s| s.stop_animation(id))
    }
}

impl fmt::Debug for SchedulerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::AnimationCurve;
    use std::cell::{Cell, RefCell};

    #[test]
    fn test_tasks_run_in_due_order() {
        let scheduler = AnimationScheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        for (delay, name) in [(30, "c"), (10, "a"), (10, "b")] {
            let log = log.clone();
            scheduler.schedule_after(delay, move || log.borrow_mut().push(name));
        }

        scheduler.advance(50.0);
        assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_cancelled_task_never_runs() {
        let scheduler = AnimationScheduler::new();
        let fired = Rc::new(Cell::new(false));
        let fired_cb = fired.clone();
        let id = scheduler.schedule_after(0, move || fired_cb.set(true));

        assert!(scheduler.is_pending(id));
        assert!(scheduler.cancel(id));
        assert!(!scheduler.cancel(id));
        scheduler.flush();
        assert!(!fired.get());
    }

    #[test]
    fn test_zero_delay_task_is_deferred() {
        let scheduler = AnimationScheduler::new();
        let fired = Rc::new(Cell::new(false));
        let fired_cb = fired.clone();
        scheduler.schedule_after(0, move || fired_cb.set(true));
        assert!(!fired.get());
        scheduler.flush();
        assert!(fired.get());
    }

    #[test]
    fn test_task_scheduled_from_callback_waits_for_next_advance() {
        let scheduler = Rc::new(AnimationScheduler::new());
        let count = Rc::new(Cell::new(0));

        let handle = scheduler.handle();
        let count_outer = count.clone();
        scheduler.schedule_after(0, move || {
            count_outer.set(count_outer.get() + 1);
            let count_inner = count_outer.clone();
            handle.schedule_after(0, move || count_inner.set(count_inner.get() + 1));
        });

        scheduler.flush();
        assert_eq!(count.get(), 1);
        scheduler.flush();
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_animation_completion_fires_once() {
        let scheduler = AnimationScheduler::new();
        let calls = Rc::new(Cell::new(0));
        let calls_cb = calls.clone();
        let id = scheduler.start_animation_with_completion(
            ProgressAnimation::forward(AnimationCurve::linear(100)),
            CompletionCriteria::LogicallyComplete,
            move || calls_cb.set(calls_cb.get() + 1),
        );

        scheduler.advance(50.0);
        assert!((scheduler.progress(id).unwrap() - 0.5).abs() < 1e-5);
        assert_eq!(calls.get(), 0);

        scheduler.advance(60.0);
        scheduler.advance(16.0);
        assert_eq!(calls.get(), 1);
        assert!(!scheduler.is_animating(id));
    }

    #[test]
    fn test_stopped_animation_skips_completion() {
        let scheduler = AnimationScheduler::new();
        let fired = Rc::new(Cell::new(false));
        let fired_cb = fired.clone();
        let id = scheduler.start_animation_with_completion(
            ProgressAnimation::forward(AnimationCurve::linear(100)),
            CompletionCriteria::Removed,
            move || fired_cb.set(true),
        );

        scheduler.advance(30.0);
        let stopped = scheduler.stop_animation(id).unwrap();
        assert!((stopped.value() - 0.3).abs() < 1e-5);
        scheduler.advance(200.0);
        assert!(!fired.get());
    }

    #[test]
    fn test_bad_frame_times_count_as_zero() {
        let scheduler = AnimationScheduler::new();
        let timed =
            scheduler.start_animation(ProgressAnimation::forward(AnimationCurve::linear(100)));
        let spring = scheduler.start_animation(ProgressAnimation::forward(
            AnimationCurve::spring(crate::SpringConfig::stiff()),
        ));

        scheduler.advance(30.0);
        let timed_at = scheduler.progress(timed).unwrap();
        let spring_at = scheduler.progress(spring).unwrap();

        scheduler.advance(-20.0);
        scheduler.advance(f32::NAN);
        scheduler.advance(f32::INFINITY);
        assert_eq!(scheduler.now_ms(), 30.0);
        assert_eq!(scheduler.progress(timed), Some(timed_at));
        assert_eq!(scheduler.progress(spring), Some(spring_at));

        scheduler.advance(16.0);
        assert!(scheduler.progress(spring).unwrap().is_finite());
        assert!(scheduler.progress(timed).unwrap() > timed_at);
    }

    #[test]
    fn test_run_until_idle() {
        let scheduler = AnimationScheduler::new();
        scheduler.start_animation(ProgressAnimation::forward(AnimationCurve::linear(100)));
        let frames = scheduler.run_until_idle(1000);
        assert!(frames > 0 && frames < 1000);
        assert!(!scheduler.has_pending_work());
    }

    #[test]
    fn test_handle_weak_reference() {
        let handle = {
            let scheduler = AnimationScheduler::new();
            scheduler.handle()
        };

        assert!(!handle.is_alive());
        assert!(handle.schedule_after(0, || {}).is_none());
        assert!(handle
            .start_animation(ProgressAnimation::forward(AnimationCurve::default()))
            .is_none());
    }

    #[test]
    fn test_clear_drops_work() {
        let scheduler = AnimationScheduler::new();
        scheduler.schedule_after(10, || {});
        scheduler.start_animation(ProgressAnimation::forward(AnimationCurve::default()));
        assert_eq!(scheduler.task_count(), 1);
        assert_eq!(scheduler.animation_count(), 1);
        scheduler.clear();
        assert!(!scheduler.has_pending_work());
    }
}
