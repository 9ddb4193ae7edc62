/// Simulated playback engine
///
/// Stands in for a waveform/audio backend. The session drives its clock
/// explicitly through a [`SimulatorHandle`].
use loop_editor::{
    EngineError, EngineEvent, EngineEventKind, EngineListener, EngineResult, ListenerRegistry,
    PlaybackEngine, SeekTarget, SubscriptionId,
};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;

#[derive(Debug, Default)]
struct SimState {
    url: Option<String>,
    ready: bool,
    playing: bool,
    time_secs: f64,
    duration_secs: f64,
    rate: f64,
}

impl SimState {
    fn check(&self) -> EngineResult<()> {
        match (&self.url, self.ready) {
            (None, _) => Err(EngineError::NotLoaded),
            (Some(_), false) => Err(EngineError::NotReady),
            (Some(_), true) => Ok(()),
        }
    }
}

/// Engine handed to the editor
pub struct SimulatedEngine {
    state: Rc<RefCell<SimState>>,
    listeners: Rc<RefCell<ListenerRegistry>>,
}

/// Script-side control over the simulated backend
#[derive(Clone)]
pub struct SimulatorHandle {
    state: Rc<RefCell<SimState>>,
    listeners: Rc<RefCell<ListenerRegistry>>,
}

impl SimulatedEngine {
    /// Create an engine and the handle that drives it
    pub fn with_handle() -> (Self, SimulatorHandle) {
        let state = Rc::new(RefCell::new(SimState {
            rate: 1.0,
            ..SimState::default()
        }));
        let listeners = Rc::new(RefCell::new(ListenerRegistry::new()));

        let engine = Self {
            state: Rc::clone(&state),
            listeners: Rc::clone(&listeners),
        };
        (engine, SimulatorHandle { state, listeners })
    }
}

impl PlaybackEngine for SimulatedEngine {
    fn load(&mut self, url: &str) -> EngineResult<()> {
        if url.is_empty() {
            return Err(EngineError::InvalidArgument("empty url".to_string()));
        }
        let mut state = self.state.borrow_mut();
        state.url = Some(url.to_string());
        state.ready = false;
        state.playing = false;
        state.time_secs = 0.0;
        state.duration_secs = 0.0;
        debug!("sim: load {}", url);
        Ok(())
    }

    fn play(&mut self) -> EngineResult<()> {
        let mut state = self.state.borrow_mut();
        state.check()?;
        state.playing = true;
        debug!("sim: play at {:.3}s", state.time_secs);
        Ok(())
    }

    fn pause(&mut self) -> EngineResult<()> {
        let mut state = self.state.borrow_mut();
        state.check()?;
        state.playing = false;
        debug!("sim: pause at {:.3}s", state.time_secs);
        Ok(())
    }

    fn stop(&mut self) -> EngineResult<()> {
        let mut state = self.state.borrow_mut();
        state.check()?;
        state.playing = false;
        state.time_secs = 0.0;
        debug!("sim: stop");
        Ok(())
    }

    fn seek(&mut self, target: SeekTarget) -> EngineResult<()> {
        let mut state = self.state.borrow_mut();
        state.check()?;
        let secs = target.to_seconds(state.duration_secs);
        if !secs.is_finite() || secs < 0.0 {
            return Err(EngineError::InvalidArgument(format!("seek to {}", secs)));
        }
        state.time_secs = secs.min(state.duration_secs);
        debug!("sim: seek to {:.3}s", state.time_secs);
        Ok(())
    }

    fn current_time(&self) -> EngineResult<f64> {
        let state = self.state.borrow();
        state.check()?;
        Ok(state.time_secs)
    }

    fn duration(&self) -> EngineResult<f64> {
        let state = self.state.borrow();
        state.check()?;
        Ok(state.duration_secs)
    }

    fn set_playback_rate(&mut self, rate: f64) -> EngineResult<()> {
        let mut state = self.state.borrow_mut();
        state.check()?;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(EngineError::InvalidArgument(format!("rate {}", rate)));
        }
        state.rate = rate;
        debug!("sim: rate {:.3}", rate);
        Ok(())
    }

    fn subscribe(&mut self, kind: EngineEventKind, listener: EngineListener) -> SubscriptionId {
        self.listeners.borrow_mut().subscribe(kind, listener)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.borrow_mut().unsubscribe(id)
    }
}

impl SimulatorHandle {
    /// Finish decoding the loaded file
    pub fn ready(&self, duration_secs: f64) {
        {
            let mut state = self.state.borrow_mut();
            if state.url.is_none() {
                return;
            }
            state.ready = true;
            state.duration_secs = duration_secs;
        }
        self.emit(EngineEvent::Ready { duration_secs });
    }

    /// Report the clock at an absolute position
    pub fn tick(&self, secs: f64) {
        self.state.borrow_mut().time_secs = secs;
        self.emit(EngineEvent::TimeUpdate {
            current_time_secs: secs,
        });
    }

    /// Let `wall_secs` of wall-clock time pass while playing
    ///
    /// The clock advances by `wall_secs * rate` and reports a tick, plus
    /// `Finish` at the end of the media. Returns false when nothing is
    /// playing.
    pub fn step(&self, wall_secs: f64) -> bool {
        let (time, finished) = {
            let mut state = self.state.borrow_mut();
            if !state.playing || !state.ready {
                return false;
            }
            state.time_secs =
                (state.time_secs + wall_secs * state.rate).min(state.duration_secs);
            let finished = state.time_secs >= state.duration_secs;
            if finished {
                state.playing = false;
            }
            (state.time_secs, finished)
        };

        self.emit(EngineEvent::TimeUpdate {
            current_time_secs: time,
        });
        if finished {
            self.emit(EngineEvent::Finish);
        }
        true
    }

    /// Media reached its end
    pub fn finish(&self) {
        self.state.borrow_mut().playing = false;
        self.emit(EngineEvent::Finish);
    }

    pub fn is_playing(&self) -> bool {
        self.state.borrow().playing
    }

    pub fn time_secs(&self) -> f64 {
        self.state.borrow().time_secs
    }

    pub fn rate(&self) -> f64 {
        self.state.borrow().rate
    }

    /// Number of live engine listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    fn emit(&self, event: EngineEvent) {
        self.listeners.borrow_mut().emit(&event);
    }
}
