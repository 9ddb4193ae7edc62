/// Loop Audition - headless loop editor driver
use anyhow::Context;
use clap::{Parser, Subcommand};
use loop_audition::{config::default_config_toml, load_config, parse_script, Session};
use loop_editor::{knob_to_rate, rate_to_knob, SpeedCurveMapper};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "loop-audition")]
#[command(about = "Replay loop editor sessions against a simulated engine", long_about = None)]
struct Cli {
    /// Configuration file path (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a JSON script and print editor events as JSON lines
    Simulate {
        /// Script file path
        script: PathBuf,
    },
    /// Show the playback rate for a speed knob position
    Speed {
        /// Knob position, 0-100
        knob: f64,
    },
    /// Show the knob position for a playback rate
    Knob {
        /// Rate multiplier, e.g. 1.5
        rate: f64,
    },
    /// Print the default configuration as TOML
    DefaultConfig,
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr, stdout carries events
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loop_audition=info,loop_editor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate { script } => {
            simulate(cli.config.as_deref(), &script)?;
        }
        Commands::Speed { knob } => {
            let mut speed = SpeedCurveMapper::default();
            speed.set_knob(knob);
            println!("knob {:.0} -> {}", speed.knob(), speed.label());
        }
        Commands::Knob { rate } => {
            let knob = rate_to_knob(rate);
            println!("{:.2}x -> knob {:.0} ({:.2}x)", rate, knob, knob_to_rate(knob));
        }
        Commands::DefaultConfig => {
            print!("{}", default_config_toml()?);
        }
    }

    Ok(())
}

fn simulate(config_path: Option<&Path>, script: &Path) -> anyhow::Result<()> {
    let config = load_config(config_path).context("Failed to load configuration")?;

    let text = std::fs::read_to_string(script)
        .with_context(|| format!("Failed to read script {}", script.display()))?;
    let steps = parse_script(&text)
        .with_context(|| format!("Failed to parse script {}", script.display()))?;

    let mut session = Session::new(config)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    for (index, step) in steps.iter().enumerate() {
        for event in session.apply(step) {
            let line = serde_json::json!({ "step": index, "event": event });
            writeln!(out, "{}", line)?;
        }
    }

    let state = session.editor().playback_state();
    let region = session.editor().loop_region();
    tracing::info!(
        "Finished: loop {:.2}%..{:.2}%, playing {}, t={:.3}s",
        region.start_pct,
        region.end_pct,
        state.is_playing,
        state.current_time_secs
    );

    Ok(())
}
