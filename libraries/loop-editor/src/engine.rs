//! Playback engine capability boundary
//!
//! Abstracts the waveform/audio backend that actually renders and plays the
//! file. The synchroniser only talks to this trait, so any backend (a browser
//! waveform library, a native decoder, a test fake) can sit behind it.

use crate::error::EngineResult;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Seek destination
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SeekTarget {
    /// Fraction of the duration, 0.0-1.0
    Fraction(f64),

    /// Absolute position in seconds
    Seconds(f64),
}

impl SeekTarget {
    /// Resolve to seconds against a duration
    pub fn to_seconds(self, duration_secs: f64) -> f64 {
        match self {
            SeekTarget::Fraction(f) => f.clamp(0.0, 1.0) * duration_secs,
            SeekTarget::Seconds(s) => s,
        }
    }
}

/// Events an engine can emit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EngineEvent {
    /// Media decoded and ready for playback
    Ready { duration_secs: f64 },

    /// Play position advanced (audio clock tick)
    TimeUpdate { current_time_secs: f64 },

    /// Playback reached the end of the media
    Finish,
}

impl EngineEvent {
    pub fn kind(&self) -> EngineEventKind {
        match self {
            EngineEvent::Ready { .. } => EngineEventKind::Ready,
            EngineEvent::TimeUpdate { .. } => EngineEventKind::TimeUpdate,
            EngineEvent::Finish => EngineEventKind::Finish,
        }
    }
}

/// Subscribable event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineEventKind {
    Ready,
    TimeUpdate,
    Finish,
}

impl EngineEventKind {
    pub const ALL: [EngineEventKind; 3] = [
        EngineEventKind::Ready,
        EngineEventKind::TimeUpdate,
        EngineEventKind::Finish,
    ];
}

/// Handle returned by [`PlaybackEngine::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

/// Callback invoked for each engine event
pub type EngineListener = Box<dyn FnMut(&EngineEvent)>;

/// Waveform/audio backend driven by the editor
///
/// Commands are last-write-wins against the backend's own state machine.
/// Anything issued before `ready` should fail with
/// [`EngineError::NotReady`](crate::EngineError::NotReady) rather than
/// panic; the synchroniser retries it.
pub trait PlaybackEngine {
    /// Start loading media from a URL
    fn load(&mut self, url: &str) -> EngineResult<()>;

    fn play(&mut self) -> EngineResult<()>;

    fn pause(&mut self) -> EngineResult<()>;

    /// Stop playback and rewind
    fn stop(&mut self) -> EngineResult<()>;

    fn seek(&mut self, target: SeekTarget) -> EngineResult<()>;

    /// Jump to an absolute time
    ///
    /// Equivalent to `seek(SeekTarget::Seconds(seconds))`
    fn set_time(&mut self, seconds: f64) -> EngineResult<()> {
        self.seek(SeekTarget::Seconds(seconds))
    }

    /// Current play position in seconds
    fn current_time(&self) -> EngineResult<f64>;

    /// Media duration in seconds
    fn duration(&self) -> EngineResult<f64>;

    /// Playback speed multiplier (1.0 = normal)
    fn set_playback_rate(&mut self, rate: f64) -> EngineResult<()>;

    /// Register a listener for one event kind
    fn subscribe(&mut self, kind: EngineEventKind, listener: EngineListener) -> SubscriptionId;

    /// Remove a listener; returns false if the id was unknown
    fn unsubscribe(&mut self, id: SubscriptionId) -> bool;
}

/// Listener bookkeeping for engine implementations
///
/// Backends can embed this to get `subscribe`/`unsubscribe`/dispatch for
/// free.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: u64,
    listeners: Vec<(SubscriptionId, EngineEventKind, EngineListener)>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, kind: EngineEventKind, listener: EngineListener) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.listeners.push((id, kind, listener));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _, _)| *existing != id);
        self.listeners.len() != before
    }

    /// Deliver an event to every listener of its kind
    pub fn emit(&mut self, event: &EngineEvent) {
        let kind = event.kind();
        for (_, listener_kind, listener) in &mut self.listeners {
            if *listener_kind == kind {
                listener(event);
            }
        }
    }

    /// Number of live listeners
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

/// Queue that engine listeners push into and the editor drains
///
/// Keeps engine callbacks from re-entering the editor: listeners only
/// enqueue, and the host pumps the queue from its task loop.
#[derive(Debug, Clone, Default)]
pub struct EngineInbox {
    queue: Rc<RefCell<VecDeque<EngineEvent>>>,
}

impl EngineInbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listener that forwards into this inbox
    pub fn listener(&self) -> EngineListener {
        let queue = Rc::clone(&self.queue);
        Box::new(move |event| queue.borrow_mut().push_back(*event))
    }

    pub fn push(&self, event: EngineEvent) {
        self.queue.borrow_mut().push_back(event);
    }

    pub fn pop(&self) -> Option<EngineEvent> {
        self.queue.borrow_mut().pop_front()
    }

    /// Drop anything still queued (e.g. ticks from the previous file)
    pub fn clear(&self) {
        self.queue.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }
}

/// Engine subscriptions held for the currently loaded file
///
/// Acquired when the file changes, released before the next acquisition and
/// on teardown.
#[derive(Debug, Default)]
pub struct EngineSubscriptions {
    ids: Vec<SubscriptionId>,
}

impl EngineSubscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to every event kind, forwarding into `inbox`
    ///
    /// Any previous subscriptions are released first.
    pub fn acquire(&mut self, engine: &mut dyn PlaybackEngine, inbox: &EngineInbox) {
        self.release(engine);
        for kind in EngineEventKind::ALL {
            let id = engine.subscribe(kind, inbox.listener());
            self.ids.push(id);
        }
    }

    /// Unsubscribe everything held
    pub fn release(&mut self, engine: &mut dyn PlaybackEngine) {
        for id in self.ids.drain(..) {
            engine.unsubscribe(id);
        }
    }

    pub fn is_held(&self) -> bool {
        !self.ids.is_empty()
    }

    pub fn count(&self) -> usize {
        self.ids.len()
    }
}

/// Recording engine for unit tests
#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use crate::error::EngineError;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Load(String),
        Play,
        Pause,
        Stop,
        Seek(SeekTarget),
        Rate(f64),
    }

    #[derive(Default)]
    pub struct FakeEngine {
        pub calls: Vec<Call>,
        pub ready: bool,
        pub time: f64,
        pub duration: f64,
        pub registry: ListenerRegistry,
    }

    impl FakeEngine {
        pub fn ready(duration: f64) -> Self {
            Self {
                ready: true,
                duration,
                ..Self::default()
            }
        }

        pub fn seeks(&self) -> Vec<f64> {
            self.calls
                .iter()
                .filter_map(|c| match c {
                    Call::Seek(SeekTarget::Seconds(s)) => Some(*s),
                    _ => None,
                })
                .collect()
        }

        pub fn count(&self, call: &Call) -> usize {
            self.calls.iter().filter(|c| *c == call).count()
        }

        fn check(&self) -> EngineResult<()> {
            if self.ready {
                Ok(())
            } else {
                Err(EngineError::NotReady)
            }
        }
    }

    impl PlaybackEngine for FakeEngine {
        fn load(&mut self, url: &str) -> EngineResult<()> {
            self.calls.push(Call::Load(url.to_string()));
            Ok(())
        }

        fn play(&mut self) -> EngineResult<()> {
            self.check()?;
            self.calls.push(Call::Play);
            Ok(())
        }

        fn pause(&mut self) -> EngineResult<()> {
            self.check()?;
            self.calls.push(Call::Pause);
            Ok(())
        }

        fn stop(&mut self) -> EngineResult<()> {
            self.check()?;
            self.calls.push(Call::Stop);
            self.time = 0.0;
            Ok(())
        }

        fn seek(&mut self, target: SeekTarget) -> EngineResult<()> {
            self.check()?;
            self.calls.push(Call::Seek(target));
            self.time = target.to_seconds(self.duration);
            Ok(())
        }

        fn current_time(&self) -> EngineResult<f64> {
            self.check()?;
            Ok(self.time)
        }

        fn duration(&self) -> EngineResult<f64> {
            self.check()?;
            Ok(self.duration)
        }

        fn set_playback_rate(&mut self, rate: f64) -> EngineResult<()> {
            self.check()?;
            self.calls.push(Call::Rate(rate));
            Ok(())
        }

        fn subscribe(&mut self, kind: EngineEventKind, listener: EngineListener) -> SubscriptionId {
            self.registry.subscribe(kind, listener)
        }

        fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
            self.registry.unsubscribe(id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeEngine;
    use super::*;

    #[test]
    fn registry_dispatches_by_kind() {
        let inbox = EngineInbox::new();
        let mut registry = ListenerRegistry::new();
        registry.subscribe(EngineEventKind::Finish, inbox.listener());

        registry.emit(&EngineEvent::TimeUpdate {
            current_time_secs: 1.0,
        });
        assert!(inbox.is_empty());

        registry.emit(&EngineEvent::Finish);
        assert_eq!(inbox.pop(), Some(EngineEvent::Finish));
    }

    #[test]
    fn unsubscribe_unknown_id_is_false() {
        let mut registry = ListenerRegistry::new();
        let id = registry.subscribe(EngineEventKind::Ready, Box::new(|_| {}));
        assert!(registry.unsubscribe(id));
        assert!(!registry.unsubscribe(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn subscriptions_release_before_reacquire() {
        let mut engine = FakeEngine::default();
        let inbox = EngineInbox::new();
        let mut subs = EngineSubscriptions::new();

        subs.acquire(&mut engine, &inbox);
        assert_eq!(engine.registry.len(), 3);

        subs.acquire(&mut engine, &inbox);
        assert_eq!(engine.registry.len(), 3);
        assert_eq!(subs.count(), 3);

        subs.release(&mut engine);
        assert!(engine.registry.is_empty());
        assert!(!subs.is_held());
    }

    #[test]
    fn fraction_seek_resolves_against_duration() {
        assert_eq!(SeekTarget::Fraction(0.5).to_seconds(30.0), 15.0);
        assert_eq!(SeekTarget::Fraction(2.0).to_seconds(30.0), 30.0);
        assert_eq!(SeekTarget::Seconds(7.0).to_seconds(30.0), 7.0);
    }
}
