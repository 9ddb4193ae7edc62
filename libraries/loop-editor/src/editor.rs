//! Loop editor - core orchestration
//!
//! Wires geometry, drag constraints, the loop region, playback
//! synchronisation, the speed knob and the viewport into one embeddable
//! control. The host feeds it layout, pointer and engine events and reads
//! back positions, markers and queued [`EditorEvent`]s.

use crate::{
    capture::{CaptureState, PointerCapture},
    drag::{DragConstraintController, DragState, Handle, HandleMove, HandlePositions},
    engine::{EngineEvent, EngineInbox, EngineSubscriptions, PlaybackEngine},
    error::Result,
    events::EditorEvent,
    geometry::{ContainerGeometry, GeometryTracker},
    layout::{marker_layouts, MarkerLayout},
    region::{self, LoopRegion},
    speed::SpeedCurveMapper,
    sync::LoopPlaybackSynchronizer,
    types::{EditorConfig, EditorProps, EngineStatus, PlaybackState},
    viewport::{ViewportInput, ViewportScroller},
};
use tracing::{debug, info, warn};

/// Host callback receiving a boundary position in percent
pub type PositionCallback = Box<dyn FnMut(f64)>;

/// Embeddable loop-region editor
///
/// Single-threaded: every method is expected to run on the UI thread, in
/// response to a host event.
pub struct LoopEditor {
    config: EditorConfig,
    props: Option<EditorProps>,

    geometry: GeometryTracker,
    drag: DragConstraintController,
    sync: LoopPlaybackSynchronizer,
    speed: SpeedCurveMapper,
    viewport: ViewportScroller,

    engine: Box<dyn PlaybackEngine>,
    inbox: EngineInbox,
    subscriptions: EngineSubscriptions,

    capture: Box<dyn PointerCapture>,
    capture_state: CaptureState,

    on_start_change: Option<PositionCallback>,
    on_end_change: Option<PositionCallback>,

    /// Host-supplied region, applied once geometry is ready
    initial_region: LoopRegion,
    initial_pending: bool,

    /// Last region handed to the synchroniser
    region: LoopRegion,

    pending_events: Vec<EditorEvent>,
    torn_down: bool,
}

impl LoopEditor {
    /// Create an editor driving `engine`
    pub fn new(
        config: EditorConfig,
        engine: Box<dyn PlaybackEngine>,
        capture: Box<dyn PointerCapture>,
    ) -> Result<Self> {
        config.validate()?;

        let initial_region = LoopRegion::clamped(config.initial_start_pct, config.initial_end_pct);

        Ok(Self {
            geometry: GeometryTracker::new(),
            drag: DragConstraintController::new(config.handle_width),
            sync: LoopPlaybackSynchronizer::new(config.loop_epsilon_secs),
            speed: SpeedCurveMapper::new(config.default_speed_knob),
            viewport: ViewportScroller::new(config.pixels_per_second),
            engine,
            inbox: EngineInbox::new(),
            subscriptions: EngineSubscriptions::new(),
            capture,
            capture_state: CaptureState::default(),
            on_start_change: None,
            on_end_change: None,
            initial_region,
            initial_pending: true,
            region: initial_region,
            pending_events: Vec::new(),
            torn_down: false,
            props: None,
            config,
        })
    }

    // ===== Host wiring =====

    /// Callback for committed and live loop-start changes
    pub fn on_start_position_change(&mut self, callback: impl FnMut(f64) + 'static) {
        self.on_start_change = Some(Box::new(callback));
    }

    /// Callback for committed and live loop-end changes
    pub fn on_end_position_change(&mut self, callback: impl FnMut(f64) + 'static) {
        self.on_end_change = Some(Box::new(callback));
    }

    /// Apply new host props
    ///
    /// A changed `file_url` swaps engine subscriptions and loads the file.
    /// Changed initial positions reset the handles unless a drag is active.
    pub fn set_props(&mut self, props: EditorProps) {
        let previous = self.props.take();

        let url_changed = previous
            .as_ref()
            .map_or(true, |p| p.file_url != props.file_url);
        let loop_changed = previous.as_ref().map_or(true, |p| {
            p.initial_start_pct != props.initial_start_pct
                || p.initial_end_pct != props.initial_end_pct
        });

        if url_changed {
            self.load_file(&props.file_url);
        }

        if loop_changed {
            self.initial_region = LoopRegion::clamped(props.initial_start_pct, props.initial_end_pct);
            self.initial_pending = true;
            self.apply_initial_region();
        }

        self.props = Some(props);
    }

    /// Layout or resize notification for the host container
    ///
    /// Handles keep their pixel offsets where they still fit, so the loop
    /// region in percent can change without either handle moving. Every
    /// boundary whose percentage changed is reported to the host.
    pub fn commit_layout(&mut self, geometry: ContainerGeometry) {
        let before = self.loop_region();
        if !self.geometry.commit(geometry) {
            return;
        }
        debug!(
            "Layout committed: left {:.1}, width {:.1}",
            geometry.left, geometry.width
        );

        if self.initial_pending {
            self.apply_initial_region();
        } else {
            let geometry = self.geometry.measure();
            self.drag.on_geometry_changed(&geometry);
            self.report_region_change(before);
        }
        self.sync_region();
    }

    /// Container removed from the layout tree
    pub fn detach_layout(&mut self) {
        self.geometry.detach();
    }

    // ===== Pointer gestures =====

    /// Pointer pressed inside the container at client x
    ///
    /// Returns true if a handle was grabbed.
    pub fn pointer_down(&mut self, client_x: f64) -> bool {
        if self.torn_down {
            return false;
        }
        let geometry = self.geometry.measure();
        let Some(begin) = self.drag.pointer_down(geometry.to_local(client_x), &geometry) else {
            return false;
        };

        self.capture_state.acquire(self.capture.as_mut());
        self.pending_events.push(EditorEvent::DragStarted {
            handle: begin.handle,
        });
        if let Some(moved) = begin.moved {
            self.report_moves(&[moved]);
        }
        true
    }

    /// Global pointer move at client x
    pub fn pointer_move(&mut self, client_x: f64) {
        let geometry = self.geometry.measure();
        if let Some(moved) = self.drag.pointer_move(geometry.to_local(client_x), &geometry) {
            self.report_moves(&[moved]);
        }
    }

    /// Global pointer release, wherever the pointer is
    pub fn pointer_up(&mut self) {
        let committed = self.drag.pointer_up();
        self.capture_state.release(self.capture.as_mut());

        if let Some(committed) = committed {
            self.pending_events.push(EditorEvent::DragEnded {
                handle: committed.handle,
            });
            self.report_moves(&[committed]);
            // Scrolling was held back during the drag
            self.update_viewport();
        }
    }

    // ===== Engine events =====

    /// Drain engine notifications queued by the subscriptions
    ///
    /// Returns the number of events handled.
    pub fn process_engine_events(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.inbox.pop() {
            self.handle_engine_event(event);
            handled += 1;
        }
        handled
    }

    fn handle_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Ready { duration_secs } => {
                self.sync.on_ready(duration_secs, self.engine.as_mut());
                self.update_viewport();
            }
            EngineEvent::TimeUpdate { current_time_secs } => {
                self.sync.on_time_update(current_time_secs, self.engine.as_mut());
            }
            EngineEvent::Finish => self.sync.on_finish(self.engine.as_mut()),
        }
        self.collect_sync_events();
    }

    // ===== Transport =====

    pub fn toggle_play_pause(&mut self) {
        self.sync.toggle_play_pause(self.engine.as_mut());
        self.collect_sync_events();
    }

    pub fn toggle_loop(&mut self) {
        self.sync.toggle_loop(self.engine.as_mut());
        self.collect_sync_events();
    }

    pub fn stop(&mut self) {
        self.sync.stop(self.engine.as_mut());
        self.collect_sync_events();
    }

    /// End of the audible range when not looping; `None` = full duration
    pub fn set_playback_end(&mut self, end_secs: Option<f64>) {
        self.sync.set_playback_end(end_secs);
    }

    // ===== Speed =====

    /// Move the speed knob (0-100)
    pub fn set_speed_knob(&mut self, value: f64) {
        if self.speed.set_knob(value) {
            self.apply_speed();
        }
    }

    /// Double-activation on the knob
    pub fn reset_speed(&mut self) {
        if self.speed.reset() {
            self.apply_speed();
        }
    }

    /// Restore the knob from a stored rate multiplier
    pub fn restore_speed_rate(&mut self, rate: f64) {
        if self.speed.set_rate(rate) {
            self.apply_speed();
        }
    }

    fn apply_speed(&mut self) {
        let rate = self.speed.rate();
        info!("Playback rate {}", self.speed.label());
        self.sync.set_playback_rate(rate, self.engine.as_mut());
        self.collect_sync_events();
        self.pending_events.push(EditorEvent::SpeedChanged {
            knob: self.speed.knob(),
            rate,
        });
    }

    // ===== Queries =====

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn props(&self) -> Option<&EditorProps> {
        self.props.as_ref()
    }

    pub fn geometry(&self) -> ContainerGeometry {
        self.geometry.measure()
    }

    pub fn handle_positions(&self) -> HandlePositions {
        self.drag.positions()
    }

    pub fn drag_state(&self) -> DragState {
        self.drag.state()
    }

    /// Current loop region, derived from the handles
    ///
    /// Falls back to the host-supplied region until layout is ready, and
    /// to the last derived region while the container is detached.
    pub fn loop_region(&self) -> LoopRegion {
        if self.initial_pending {
            return self.initial_region;
        }
        region::to_percent(&self.drag.positions(), &self.geometry.measure())
            .unwrap_or(self.region)
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.sync.state()
    }

    pub fn engine_status(&self) -> EngineStatus {
        self.sync.status()
    }

    pub fn speed_knob(&self) -> f64 {
        self.speed.knob()
    }

    pub fn playback_rate(&self) -> f64 {
        self.speed.rate()
    }

    pub fn scroll_offset_px(&self) -> f64 {
        self.viewport.offset_px()
    }

    /// Whether document-level pointer routing is active
    pub fn is_capturing_pointer(&self) -> bool {
        self.capture_state.is_held()
    }

    /// Whether engine listeners are registered
    pub fn has_engine_subscriptions(&self) -> bool {
        self.subscriptions.is_held()
    }

    pub fn engine(&self) -> &dyn PlaybackEngine {
        self.engine.as_ref()
    }

    /// Marker placement for a container of the given height
    pub fn marker_layouts(&self, container_height_px: f64) -> [MarkerLayout; 2] {
        marker_layouts(
            &self.drag.positions(),
            self.config.handle_width,
            self.config.handle_height,
            container_height_px,
        )
    }

    /// Resolve the host sizing hints against the parent box
    pub fn resolve_size(&self, parent_width_px: f64, parent_height_px: f64) -> (f64, f64) {
        self.props.as_ref().map_or((parent_width_px, parent_height_px), |p| {
            (p.width.resolve(parent_width_px), p.height.resolve(parent_height_px))
        })
    }

    /// Take queued events in the order they happened
    pub fn drain_events(&mut self) -> Vec<EditorEvent> {
        self.collect_sync_events();
        std::mem::take(&mut self.pending_events)
    }

    /// Check if there are pending events
    pub fn has_pending_events(&self) -> bool {
        !self.pending_events.is_empty() || self.sync.has_pending_events()
    }

    // ===== Teardown =====

    /// Release every scoped resource
    ///
    /// Ends any drag, releases pointer capture and engine subscriptions.
    /// Safe to call more than once; also runs on drop.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        self.drag.cancel();
        self.capture_state.release(self.capture.as_mut());
        self.subscriptions.release(self.engine.as_mut());
        self.inbox.clear();
        debug!("Editor torn down");
    }

    // ===== Internal =====

    fn load_file(&mut self, url: &str) {
        self.subscriptions.release(self.engine.as_mut());
        self.inbox.clear();
        self.subscriptions
            .acquire(self.engine.as_mut(), &self.inbox);

        info!("Loading {}", url);
        self.sync.on_load();
        self.collect_sync_events();
        if let Err(e) = self.engine.load(url) {
            warn!("Failed to load {}: {}", url, e);
            self.pending_events.push(EditorEvent::Error {
                message: e.to_string(),
            });
        }
        self.pending_events.push(EditorEvent::FileLoaded {
            url: url.to_string(),
        });
    }

    fn apply_initial_region(&mut self) {
        let geometry = self.geometry.measure();
        if !geometry.fits_handles(self.drag.handle_width()) {
            // Applied on the first usable layout
            self.sync_region();
            return;
        }

        if self.drag.is_dragging() {
            debug!("Initial region ignored during drag");
            self.initial_pending = false;
            return;
        }

        if let Some(positions) = region::to_pixels(&self.initial_region, &geometry) {
            self.initial_pending = false;
            let moves = self.drag.reinitialize(positions, &geometry);
            self.report_moves(&moves);
        }
        self.sync_region();
    }

    fn report_moves(&mut self, moves: &[HandleMove]) {
        if moves.is_empty() {
            return;
        }
        let geometry = self.geometry.measure();

        for moved in moves {
            let Some(pct) = region::px_to_pct(moved.position_px, &geometry) else {
                continue;
            };
            match moved.handle {
                Handle::Start => {
                    if let Some(callback) = self.on_start_change.as_mut() {
                        callback(pct);
                    }
                    self.pending_events.push(EditorEvent::StartChanged { pct });
                }
                Handle::End => {
                    if let Some(callback) = self.on_end_change.as_mut() {
                        callback(pct);
                    }
                    self.pending_events.push(EditorEvent::EndChanged { pct });
                }
            }
        }

        self.sync_region();
    }

    /// Notify the host of boundaries whose percentage moved since `before`
    fn report_region_change(&mut self, before: LoopRegion) {
        let after = self.loop_region();

        if after.start_pct != before.start_pct {
            if let Some(callback) = self.on_start_change.as_mut() {
                callback(after.start_pct);
            }
            self.pending_events.push(EditorEvent::StartChanged {
                pct: after.start_pct,
            });
        }
        if after.end_pct != before.end_pct {
            if let Some(callback) = self.on_end_change.as_mut() {
                callback(after.end_pct);
            }
            self.pending_events.push(EditorEvent::EndChanged { pct: after.end_pct });
        }
    }

    fn sync_region(&mut self) {
        self.region = self.loop_region();
        self.sync.set_region(self.region);
        self.update_viewport();
    }

    /// Move synchroniser events into the editor queue, keeping one order
    fn collect_sync_events(&mut self) {
        self.pending_events.extend(self.sync.drain_events());
    }

    fn update_viewport(&mut self) {
        let region = self.loop_region();
        let input = ViewportInput {
            start_pct: region.start_pct,
            end_pct: region.end_pct,
            duration_secs: self.sync.state().duration_secs,
            container_width_px: self.geometry.measure().width,
        };
        if let Some(offset_px) = self.viewport.update(input, self.drag.is_dragging()) {
            self.pending_events.push(EditorEvent::Scrolled { offset_px });
        }
    }
}

impl Drop for LoopEditor {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::NoPointerCapture;
    use crate::engine::fake::FakeEngine;

    fn editor() -> LoopEditor {
        LoopEditor::new(
            EditorConfig::default(),
            Box::new(FakeEngine::ready(60.0)),
            Box::new(NoPointerCapture),
        )
        .unwrap()
    }

    #[test]
    fn initial_region_waits_for_layout() {
        let mut editor = editor();
        editor.set_props(EditorProps::new("a.wav").with_loop(10.0, 50.0));
        assert_eq!(editor.loop_region(), LoopRegion::clamped(10.0, 50.0));
        assert_eq!(editor.handle_positions(), HandlePositions::default());

        editor.commit_layout(ContainerGeometry::new(0.0, 300.0));
        assert_eq!(editor.handle_positions(), HandlePositions::new(30.0, 150.0));
    }

    #[test]
    fn full_region_end_is_clamped_inside_container() {
        let mut editor = editor();
        editor.commit_layout(ContainerGeometry::new(0.0, 300.0));
        editor.set_props(EditorProps::new("a.wav"));
        assert_eq!(editor.handle_positions().end_px, 290.0);
    }

    #[test]
    fn rejects_invalid_config() {
        let config = EditorConfig {
            handle_width: -1.0,
            ..Default::default()
        };
        let result = LoopEditor::new(
            config,
            Box::new(FakeEngine::default()),
            Box::new(NoPointerCapture),
        );
        assert!(result.is_err());
    }

    #[test]
    fn file_switch_keeps_single_subscription_set() {
        let mut editor = editor();
        editor.set_props(EditorProps::new("a.wav"));
        editor.set_props(EditorProps::new("b.wav"));
        editor.set_props(EditorProps::new("c.wav"));
        assert!(editor.has_engine_subscriptions());

        editor.teardown();
        assert!(!editor.has_engine_subscriptions());
    }
}
