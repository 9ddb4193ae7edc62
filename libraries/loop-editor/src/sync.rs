//! Loop playback synchronisation
//!
//! Reacts to engine clock ticks and user transport commands so that what the
//! engine plays always matches the current loop region and loop flag.
//!
//! Engine failures never propagate out of here. A command rejected because
//! the engine is not ready is parked in a single last-write-wins slot and
//! retried on the next `ready` or tick.

use crate::{
    engine::PlaybackEngine,
    error::{EngineError, EngineResult},
    events::EditorEvent,
    region::{LoopBounds, LoopRegion},
    types::{EngineStatus, PlaybackState},
};
use tracing::{debug, info, warn};

/// Default tolerance for loop-end detection
pub const DEFAULT_LOOP_EPSILON_SECS: f64 = 0.01;

/// Transport command waiting for the engine to become ready
#[derive(Debug, Clone, Copy, PartialEq)]
enum PendingCommand {
    /// Seek then play
    Resume { at_secs: f64 },
    Pause,
    Seek { to_secs: f64 },
    Stop,
}

/// Keeps engine playback consistent with the loop region
#[derive(Debug, Clone)]
pub struct LoopPlaybackSynchronizer {
    state: PlaybackState,
    status: EngineStatus,
    region: LoopRegion,

    /// End of the audible range when not looping; `None` = full duration
    playback_end_secs: Option<f64>,

    /// Position captured at the last pause
    captured_time_secs: f64,

    epsilon_secs: f64,

    /// A wrap seek was issued and the clock has not come back to the loop
    /// start yet
    wrap_pending: bool,

    /// Rate not yet accepted by the engine
    rate_dirty: bool,

    pending: Option<PendingCommand>,
    pending_events: Vec<EditorEvent>,
}

impl LoopPlaybackSynchronizer {
    pub fn new(epsilon_secs: f64) -> Self {
        Self {
            state: PlaybackState::default(),
            status: EngineStatus::Unloaded,
            region: LoopRegion::FULL,
            playback_end_secs: None,
            captured_time_secs: 0.0,
            epsilon_secs: epsilon_secs.max(0.0),
            wrap_pending: false,
            rate_dirty: false,
            pending: None,
            pending_events: Vec::new(),
        }
    }

    // ===== State =====

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn status(&self) -> EngineStatus {
        self.status
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing
    }

    pub fn is_looping(&self) -> bool {
        self.state.is_looping
    }

    pub fn region(&self) -> LoopRegion {
        self.region
    }

    /// Loop region in seconds for the current duration
    pub fn loop_bounds(&self) -> LoopBounds {
        self.region.to_seconds(self.state.duration_secs)
    }

    pub fn captured_time_secs(&self) -> f64 {
        self.captured_time_secs
    }

    /// Whether a command is parked for retry
    pub fn has_pending_command(&self) -> bool {
        self.pending.is_some() || self.rate_dirty
    }

    /// Where non-looping playback stops
    pub fn playback_end_secs(&self) -> f64 {
        self.playback_end_secs
            .unwrap_or(self.state.duration_secs)
            .min(self.state.duration_secs)
    }

    // ===== Configuration =====

    /// Update the loop window (percent)
    pub fn set_region(&mut self, region: LoopRegion) {
        if region != self.region {
            self.region = region;
            self.wrap_pending = false;
        }
    }

    /// Set a custom end for non-looping playback; `None` plays to the end
    pub fn set_playback_end(&mut self, end_secs: Option<f64>) {
        self.playback_end_secs = end_secs.filter(|s| s.is_finite() && *s >= 0.0);
    }

    // ===== Engine lifecycle =====

    /// A new file was requested from the engine
    pub fn on_load(&mut self) {
        self.set_playing(false);
        self.state = PlaybackState {
            is_looping: self.state.is_looping,
            playback_rate: self.state.playback_rate,
            ..PlaybackState::default()
        };
        self.captured_time_secs = 0.0;
        self.wrap_pending = false;
        self.pending = None;
        self.rate_dirty = self.state.playback_rate != 1.0;
        self.set_status(EngineStatus::Loading);
    }

    /// Engine finished loading
    pub fn on_ready(&mut self, duration_secs: f64, engine: &mut dyn PlaybackEngine) {
        self.state.duration_secs = if duration_secs.is_finite() {
            duration_secs.max(0.0)
        } else {
            0.0
        };
        info!("Engine ready, duration {:.3}s", self.state.duration_secs);
        self.set_status(EngineStatus::Ready);
        self.pending_events.push(EditorEvent::Ready {
            duration_secs: self.state.duration_secs,
        });
        self.retry_pending(engine);
    }

    /// Audio clock advanced
    pub fn on_time_update(&mut self, current_time_secs: f64, engine: &mut dyn PlaybackEngine) {
        if !current_time_secs.is_finite() {
            return;
        }
        self.state.current_time_secs = current_time_secs;

        if self.status == EngineStatus::NotReady || self.has_pending_command() {
            self.retry_pending(engine);
        }

        if self.state.is_looping {
            self.check_loop_wrap(current_time_secs, engine);
        } else {
            self.wrap_pending = false;
            self.check_playback_end(current_time_secs, engine);
        }
    }

    /// Engine reached the end of the media
    pub fn on_finish(&mut self, engine: &mut dyn PlaybackEngine) {
        let bounds = self.loop_bounds();
        if self.state.is_looping && bounds.is_armed() {
            debug!("Finished while looping, restarting at {:.3}s", bounds.start_secs);
            self.wrap_pending = false;
            self.resume_at(bounds.start_secs, engine);
            return;
        }

        self.captured_time_secs = 0.0;
        self.set_playing(false);
    }

    // ===== Transport =====

    /// Play if paused, pause if playing
    pub fn toggle_play_pause(&mut self, engine: &mut dyn PlaybackEngine) {
        if self.intends_to_play() {
            self.captured_time_secs = engine
                .current_time()
                .unwrap_or(self.state.current_time_secs);
            let result = engine.pause();
            self.set_playing(false);
            self.settle(result, PendingCommand::Pause);
        } else {
            let at_secs = self.captured_time_secs.max(self.loop_bounds().start_secs);
            self.resume_at(at_secs, engine);
        }
    }

    /// Arm or disarm looping
    ///
    /// Arming seeks straight to the loop start.
    pub fn toggle_loop(&mut self, engine: &mut dyn PlaybackEngine) {
        self.state.is_looping = !self.state.is_looping;
        self.wrap_pending = false;
        info!("Loop {}", if self.state.is_looping { "armed" } else { "disarmed" });
        self.pending_events.push(EditorEvent::LoopToggled {
            enabled: self.state.is_looping,
        });

        if self.state.is_looping {
            let to_secs = self.loop_bounds().start_secs;
            let result = engine.set_time(to_secs);
            if result.is_ok() {
                self.state.current_time_secs = to_secs;
            }
            self.settle(result, PendingCommand::Seek { to_secs });
        }
    }

    /// Rewind to zero and stop
    pub fn stop(&mut self, engine: &mut dyn PlaybackEngine) {
        self.captured_time_secs = 0.0;
        self.wrap_pending = false;
        let result = engine.set_time(0.0).and_then(|()| engine.stop());
        self.state.current_time_secs = 0.0;
        self.set_playing(false);
        self.settle(result, PendingCommand::Stop);
    }

    /// Push a new speed multiplier to the engine
    pub fn set_playback_rate(&mut self, rate: f64, engine: &mut dyn PlaybackEngine) {
        self.state.playback_rate = rate;
        match engine.set_playback_rate(rate) {
            Ok(()) => {
                self.rate_dirty = false;
                self.mark_ready();
            }
            Err(e) => {
                self.rate_dirty = e.is_retryable();
                self.on_engine_error(&e);
            }
        }
    }

    pub fn has_pending_events(&self) -> bool {
        !self.pending_events.is_empty()
    }

    /// Drain queued events
    pub fn drain_events(&mut self) -> Vec<EditorEvent> {
        std::mem::take(&mut self.pending_events)
    }

    // ===== Internal =====

    fn intends_to_play(&self) -> bool {
        self.state.is_playing || matches!(self.pending, Some(PendingCommand::Resume { .. }))
    }

    fn check_loop_wrap(&mut self, now: f64, engine: &mut dyn PlaybackEngine) {
        let bounds = self.loop_bounds();
        if !bounds.is_armed() {
            return;
        }

        let threshold = bounds.end_secs - self.epsilon_secs;

        if self.wrap_pending {
            // A loop shorter than epsilon starts above the threshold, so
            // landing near the start also counts as having wrapped
            let rearm_below = threshold.max(bounds.start_secs + self.epsilon_secs);
            if now < rearm_below {
                self.wrap_pending = false;
            }
            return;
        }

        if now >= threshold {
            match engine.set_time(bounds.start_secs) {
                Ok(()) => {
                    debug!("Loop wrap {:.3}s -> {:.3}s", now, bounds.start_secs);
                    self.wrap_pending = true;
                    self.mark_ready();
                    self.pending_events.push(EditorEvent::Wrapped {
                        from_secs: now,
                        to_secs: bounds.start_secs,
                    });
                }
                // Next tick will try again
                Err(e) => self.on_engine_error(&e),
            }
        }
    }

    fn check_playback_end(&mut self, now: f64, engine: &mut dyn PlaybackEngine) {
        let end = self.playback_end_secs();
        if !self.state.is_playing || end <= 0.0 || now < end {
            return;
        }

        debug!("Reached playback end at {:.3}s", now);
        let result = engine.pause();
        self.captured_time_secs = now;
        self.set_playing(false);
        self.settle(result, PendingCommand::Pause);
    }

    fn resume_at(&mut self, at_secs: f64, engine: &mut dyn PlaybackEngine) {
        let result = engine.set_time(at_secs).and_then(|()| engine.play());
        match result {
            Ok(()) => {
                self.pending = None;
                self.state.current_time_secs = at_secs;
                self.mark_ready();
                self.set_playing(true);
            }
            Err(e) => {
                if e.is_retryable() {
                    self.pending = Some(PendingCommand::Resume { at_secs });
                }
                self.on_engine_error(&e);
            }
        }
    }

    /// Record the outcome of a fire-and-forget command
    fn settle(&mut self, result: EngineResult<()>, command: PendingCommand) {
        match result {
            Ok(()) => {
                self.pending = None;
                self.mark_ready();
            }
            Err(e) => {
                if e.is_retryable() {
                    self.pending = Some(command);
                }
                self.on_engine_error(&e);
            }
        }
    }

    fn retry_pending(&mut self, engine: &mut dyn PlaybackEngine) {
        if self.rate_dirty {
            let rate = self.state.playback_rate;
            self.set_playback_rate(rate, engine);
        }

        let Some(command) = self.pending.take() else {
            return;
        };
        debug!("Retrying {:?}", command);

        match command {
            PendingCommand::Resume { at_secs } => {
                // Duration may only be known now
                let at_secs = at_secs.max(self.loop_bounds().start_secs);
                self.resume_at(at_secs, engine);
            }
            PendingCommand::Pause => {
                let result = engine.pause();
                self.settle(result, command);
            }
            PendingCommand::Seek { to_secs } => {
                let result = engine.set_time(to_secs);
                self.settle(result, command);
            }
            PendingCommand::Stop => {
                let result = engine.set_time(0.0).and_then(|()| engine.stop());
                self.settle(result, command);
            }
        }
    }

    fn on_engine_error(&mut self, error: &EngineError) {
        if error.is_retryable() {
            debug!("Engine not ready: {}", error);
            self.set_status(EngineStatus::NotReady);
        } else {
            warn!("Engine command failed: {}", error);
            self.pending_events.push(EditorEvent::Error {
                message: error.to_string(),
            });
        }
    }

    fn mark_ready(&mut self) {
        if self.status == EngineStatus::NotReady {
            self.set_status(EngineStatus::Ready);
        }
    }

    fn set_status(&mut self, status: EngineStatus) {
        if self.status != status {
            self.status = status;
            self.pending_events
                .push(EditorEvent::EngineStatusChanged { status });
        }
    }

    fn set_playing(&mut self, playing: bool) {
        if self.state.is_playing != playing {
            self.state.is_playing = playing;
            self.pending_events.push(EditorEvent::PlaybackStateChanged {
                is_playing: playing,
                current_time_secs: self.state.current_time_secs,
            });
        }
    }
}

impl Default for LoopPlaybackSynchronizer {
    fn default() -> Self {
        Self::new(DEFAULT_LOOP_EPSILON_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fake::{Call, FakeEngine};

    fn looping_sync(engine: &mut FakeEngine) -> LoopPlaybackSynchronizer {
        let mut sync = LoopPlaybackSynchronizer::default();
        sync.set_region(LoopRegion::clamped(10.0, 20.0));
        sync.on_load();
        sync.on_ready(100.0, engine);
        sync.toggle_loop(engine);
        sync.toggle_play_pause(engine);
        engine.calls.clear();
        sync
    }

    #[test]
    fn loop_wraps_exactly_once() {
        let mut engine = FakeEngine::ready(100.0);
        let mut sync = looping_sync(&mut engine);

        for t in [10.0, 12.0, 14.0, 16.0, 18.0, 20.0, 20.01] {
            sync.on_time_update(t, &mut engine);
        }

        assert_eq!(engine.seeks(), vec![10.0]);
        assert_eq!(engine.count(&Call::Pause), 0);
        assert!(sync.is_playing());
    }

    #[test]
    fn loop_wrap_uses_epsilon() {
        let mut engine = FakeEngine::ready(100.0);
        let mut sync = looping_sync(&mut engine);

        sync.on_time_update(19.98, &mut engine);
        assert!(engine.seeks().is_empty());

        sync.on_time_update(19.995, &mut engine);
        assert_eq!(engine.seeks(), vec![10.0]);
    }

    #[test]
    fn loop_wraps_again_after_clock_returns() {
        let mut engine = FakeEngine::ready(100.0);
        let mut sync = looping_sync(&mut engine);

        sync.on_time_update(20.0, &mut engine);
        sync.on_time_update(10.1, &mut engine);
        sync.on_time_update(20.0, &mut engine);

        assert_eq!(engine.seeks(), vec![10.0, 10.0]);
        let wraps = sync
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, EditorEvent::Wrapped { .. }))
            .count();
        assert_eq!(wraps, 2);
    }

    #[test]
    fn loop_shorter_than_epsilon_keeps_wrapping() {
        let mut engine = FakeEngine::ready(1.0);
        let mut sync = LoopPlaybackSynchronizer::default();
        // 0.5s..0.505s
        sync.set_region(LoopRegion::clamped(50.0, 50.5));
        sync.on_ready(1.0, &mut engine);
        sync.toggle_loop(&mut engine);
        sync.toggle_play_pause(&mut engine);
        engine.calls.clear();

        for t in [0.51, 0.50, 0.52, 0.50, 0.515] {
            sync.on_time_update(t, &mut engine);
        }

        assert_eq!(engine.seeks(), vec![0.5, 0.5, 0.5]);
        assert!(sync.is_playing());
    }

    #[test]
    fn non_looping_pauses_at_playback_end() {
        let mut engine = FakeEngine::ready(30.0);
        let mut sync = LoopPlaybackSynchronizer::default();
        sync.on_ready(30.0, &mut engine);
        sync.toggle_play_pause(&mut engine);
        engine.calls.clear();

        sync.on_time_update(29.0, &mut engine);
        assert!(sync.is_playing());

        sync.on_time_update(30.0, &mut engine);
        assert!(!sync.is_playing());
        assert_eq!(engine.count(&Call::Pause), 1);

        // Already paused, no second pause
        sync.on_time_update(30.0, &mut engine);
        assert_eq!(engine.count(&Call::Pause), 1);
    }

    #[test]
    fn custom_playback_end() {
        let mut engine = FakeEngine::ready(30.0);
        let mut sync = LoopPlaybackSynchronizer::default();
        sync.on_ready(30.0, &mut engine);
        sync.set_playback_end(Some(12.0));
        sync.toggle_play_pause(&mut engine);

        sync.on_time_update(12.0, &mut engine);
        assert!(!sync.is_playing());
        assert_eq!(sync.captured_time_secs(), 12.0);
    }

    #[test]
    fn resume_never_before_loop_start() {
        let mut engine = FakeEngine::ready(100.0);
        let mut sync = LoopPlaybackSynchronizer::default();
        sync.set_region(LoopRegion::clamped(40.0, 60.0));
        sync.on_ready(100.0, &mut engine);

        sync.toggle_play_pause(&mut engine);
        assert_eq!(engine.seeks(), vec![40.0]);
        assert_eq!(engine.count(&Call::Play), 1);

        engine.time = 45.0;
        sync.toggle_play_pause(&mut engine);
        assert!(!sync.is_playing());
        assert_eq!(sync.captured_time_secs(), 45.0);

        sync.toggle_play_pause(&mut engine);
        assert_eq!(engine.seeks(), vec![40.0, 45.0]);
        assert!(sync.is_playing());
    }

    #[test]
    fn arming_loop_seeks_to_start() {
        let mut engine = FakeEngine::ready(100.0);
        let mut sync = LoopPlaybackSynchronizer::default();
        sync.set_region(LoopRegion::clamped(25.0, 50.0));
        sync.on_ready(100.0, &mut engine);

        sync.toggle_loop(&mut engine);
        assert!(sync.is_looping());
        assert_eq!(engine.seeks(), vec![25.0]);

        // Disarming does not seek
        sync.toggle_loop(&mut engine);
        assert!(!sync.is_looping());
        assert_eq!(engine.seeks(), vec![25.0]);
    }

    #[test]
    fn stop_rewinds_and_resets_capture() {
        let mut engine = FakeEngine::ready(100.0);
        let mut sync = LoopPlaybackSynchronizer::default();
        sync.on_ready(100.0, &mut engine);
        sync.toggle_play_pause(&mut engine);
        engine.time = 33.0;
        sync.toggle_play_pause(&mut engine);

        sync.stop(&mut engine);
        assert_eq!(sync.captured_time_secs(), 0.0);
        assert!(!sync.is_playing());
        assert_eq!(engine.seeks().last(), Some(&0.0));
        assert_eq!(engine.count(&Call::Stop), 1);
    }

    #[test]
    fn not_ready_commands_retry_on_ready() {
        let mut engine = FakeEngine::default();
        let mut sync = LoopPlaybackSynchronizer::default();
        sync.on_load();

        sync.toggle_play_pause(&mut engine);
        assert_eq!(sync.status(), EngineStatus::NotReady);
        assert!(!sync.is_playing());
        assert!(sync.has_pending_command());

        engine.ready = true;
        engine.duration = 50.0;
        sync.on_ready(50.0, &mut engine);

        assert!(sync.is_playing());
        assert!(!sync.has_pending_command());
        assert_eq!(engine.count(&Call::Play), 1);
    }

    #[test]
    fn toggle_while_resume_pending_cancels_it() {
        let mut engine = FakeEngine::default();
        let mut sync = LoopPlaybackSynchronizer::default();

        sync.toggle_play_pause(&mut engine);
        sync.toggle_play_pause(&mut engine);

        engine.ready = true;
        sync.on_ready(50.0, &mut engine);
        assert!(!sync.is_playing());
        assert_eq!(engine.count(&Call::Play), 0);
    }

    #[test]
    fn wrap_retries_on_next_tick() {
        let mut engine = FakeEngine::ready(100.0);
        let mut sync = looping_sync(&mut engine);

        engine.ready = false;
        sync.on_time_update(20.0, &mut engine);
        assert!(engine.seeks().is_empty());
        assert_eq!(sync.status(), EngineStatus::NotReady);

        engine.ready = true;
        sync.on_time_update(20.02, &mut engine);
        assert_eq!(engine.seeks(), vec![10.0]);
        assert_eq!(sync.status(), EngineStatus::Ready);
    }

    #[test]
    fn rate_applied_once_ready() {
        let mut engine = FakeEngine::default();
        let mut sync = LoopPlaybackSynchronizer::default();

        sync.set_playback_rate(2.0, &mut engine);
        assert!(sync.has_pending_command());

        engine.ready = true;
        sync.on_ready(10.0, &mut engine);
        assert_eq!(engine.count(&Call::Rate(2.0)), 1);
        assert!(!sync.has_pending_command());
    }

    #[test]
    fn finish_while_looping_restarts_loop() {
        let mut engine = FakeEngine::ready(100.0);
        let mut sync = looping_sync(&mut engine);

        sync.on_finish(&mut engine);
        assert_eq!(engine.seeks(), vec![10.0]);
        assert!(sync.is_playing());
    }

    #[test]
    fn finish_without_loop_stops_playing() {
        let mut engine = FakeEngine::ready(100.0);
        let mut sync = LoopPlaybackSynchronizer::default();
        sync.on_ready(100.0, &mut engine);
        sync.toggle_play_pause(&mut engine);

        sync.on_finish(&mut engine);
        assert!(!sync.is_playing());
        assert_eq!(sync.captured_time_secs(), 0.0);
    }

    #[test]
    fn load_resets_transport_but_keeps_loop_flag() {
        let mut engine = FakeEngine::ready(100.0);
        let mut sync = looping_sync(&mut engine);

        sync.on_load();
        assert!(!sync.is_playing());
        assert!(sync.is_looping());
        assert_eq!(sync.status(), EngineStatus::Loading);
        assert_eq!(sync.state().duration_secs, 0.0);
    }
}
