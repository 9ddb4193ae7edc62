/// Scripted editor sessions
///
/// A script is a JSON array of steps, each tagged by `op`:
///
/// ```json
/// [
///   { "op": "props", "url": "kick.wav", "start_pct": 10, "end_pct": 50 },
///   { "op": "layout", "width": 300 },
///   { "op": "ready", "duration_secs": 40 },
///   { "op": "down", "x": 30 },
///   { "op": "move", "x": 60 },
///   { "op": "up" },
///   { "op": "toggle_loop" },
///   { "op": "toggle_play" },
///   { "op": "advance", "secs": 12 }
/// ]
/// ```
use crate::engine::{SimulatedEngine, SimulatorHandle};
use crate::error::{AuditionError, Result};
use loop_editor::{
    ContainerGeometry, EditorConfig, EditorEvent, EditorProps, LoopEditor, NoPointerCapture,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// One scripted host or engine action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Container laid out or resized
    Layout {
        #[serde(default)]
        left: f64,
        width: f64,
    },

    /// Container removed from the layout tree
    Detach,

    /// Host props: file and initial loop
    Props {
        url: String,
        #[serde(default)]
        start_pct: f64,
        #[serde(default = "default_end_pct")]
        end_pct: f64,
    },

    /// Pointer gestures, client x in pixels
    Down {
        x: f64,
    },
    Move {
        x: f64,
    },
    Up,

    /// Engine finished decoding
    Ready {
        duration_secs: f64,
    },

    /// Engine clock report at an absolute time
    Tick {
        secs: f64,
    },

    /// Let playback run for `secs` of wall-clock time
    Advance {
        secs: f64,
        #[serde(default = "default_step_secs")]
        step_secs: f64,
    },

    /// Engine reached the end of the media
    Finish,

    TogglePlay,
    ToggleLoop,
    Stop,

    /// Speed knob position, 0-100
    Knob {
        value: f64,
    },

    /// Double-activation on the speed knob
    ResetSpeed,

    /// End of non-looping playback; omitted plays to the end
    PlaybackEnd {
        #[serde(default)]
        secs: Option<f64>,
    },

    /// Unmount the editor
    Teardown,
}

fn default_end_pct() -> f64 {
    100.0
}

fn default_step_secs() -> f64 {
    0.05
}

/// Parse a JSON script
pub fn parse_script(text: &str) -> Result<Vec<Step>> {
    let steps: Vec<Step> = serde_json::from_str(text)?;
    if steps.is_empty() {
        return Err(AuditionError::Script("script has no steps".to_string()));
    }
    Ok(steps)
}

/// An editor wired to a simulated engine
pub struct Session {
    editor: LoopEditor,
    sim: SimulatorHandle,
}

impl Session {
    pub fn new(config: EditorConfig) -> Result<Self> {
        let (engine, sim) = SimulatedEngine::with_handle();
        let editor = LoopEditor::new(config, Box::new(engine), Box::new(NoPointerCapture))?;
        Ok(Self { editor, sim })
    }

    pub fn editor(&self) -> &LoopEditor {
        &self.editor
    }

    pub fn simulator(&self) -> &SimulatorHandle {
        &self.sim
    }

    /// Run every step, collecting emitted events in order
    pub fn run(&mut self, steps: &[Step]) -> Vec<EditorEvent> {
        info!("Running script with {} steps", steps.len());
        steps.iter().flat_map(|step| self.apply(step)).collect()
    }

    /// Apply one step and return the events it produced
    pub fn apply(&mut self, step: &Step) -> Vec<EditorEvent> {
        debug!("Step {:?}", step);

        match step {
            Step::Layout { left, width } => {
                self.editor
                    .commit_layout(ContainerGeometry::new(*left, *width));
            }
            Step::Detach => self.editor.detach_layout(),
            Step::Props {
                url,
                start_pct,
                end_pct,
            } => {
                let props = EditorProps::new(url.clone()).with_loop(*start_pct, *end_pct);
                self.editor.set_props(props);
            }
            Step::Down { x } => {
                self.editor.pointer_down(*x);
            }
            Step::Move { x } => self.editor.pointer_move(*x),
            Step::Up => self.editor.pointer_up(),
            Step::Ready { duration_secs } => self.sim.ready(*duration_secs),
            Step::Tick { secs } => self.sim.tick(*secs),
            Step::Advance { secs, step_secs } => self.advance(*secs, *step_secs),
            Step::Finish => self.sim.finish(),
            Step::TogglePlay => self.editor.toggle_play_pause(),
            Step::ToggleLoop => self.editor.toggle_loop(),
            Step::Stop => self.editor.stop(),
            Step::Knob { value } => self.editor.set_speed_knob(*value),
            Step::ResetSpeed => self.editor.reset_speed(),
            Step::PlaybackEnd { secs } => self.editor.set_playback_end(*secs),
            Step::Teardown => self.editor.teardown(),
        }

        self.editor.process_engine_events();
        self.editor.drain_events()
    }

    /// Interleave engine clock steps with editor processing
    fn advance(&mut self, secs: f64, step_secs: f64) {
        let step_secs = if step_secs > 0.0 { step_secs } else { secs };
        let mut remaining = secs;

        while remaining > 0.0 {
            let dt = step_secs.min(remaining);
            remaining -= dt;
            if !self.sim.step(dt) {
                break;
            }
            self.editor.process_engine_events();
        }
    }
}
