use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use exercise_core::{
    aim::{Actuator, AimState},
    config::Config,
    display::{DisplaySink, Line},
    pipeline::ExerciseTracker,
    runtime::{run, FrameClock},
    source::ReplaySource,
};

// ── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "exercise-tracker",
    version,
    about = "Pose-driven exercise coach: hold timer, rep counter, and pan/tilt aim",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded pose stream (JSON lines) through the tracker.
    Run {
        /// Pose stream path
        #[arg(short, long)]
        poses: PathBuf,

        /// Routine config (TOML); the built-in routine is used if omitted or missing
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Do not drive the pan/tilt mount
        #[arg(long)]
        no_aim: bool,
    },

    /// Validate a routine config and print a summary.
    Check {
        /// Routine config (TOML)
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Write the built-in routine as TOML.
    Defaults {
        /// Output path; stdout if omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    // Respect RUST_LOG; default to info
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            poses,
            config,
            no_aim,
        } => cmd_run(poses, config, no_aim),
        Commands::Check { config } => cmd_check(config),
        Commands::Defaults { output } => cmd_defaults(output),
    }
}

// ── run ───────────────────────────────────────────────────────────────────────

fn cmd_run(poses: PathBuf, config_path: Option<PathBuf>, no_aim: bool) -> Result<()> {
    let config = load_config(config_path.as_ref())?;
    let routine = config.routine().context("invalid routine")?;
    let aim = if no_aim {
        None
    } else {
        config.aim_controller().context("invalid aim settings")?
    };

    info!("Exercise tracker");
    info!("  poses      : {}", poses.display());
    info!("  exercises  : {}", routine.len());
    info!("  aim        : {}", if aim.is_some() { "on" } else { "off" });

    let source = ReplaySource::open(&poses)?;
    let mut tracker = ExerciseTracker::new(routine, aim);

    let pb = spinner("Tracking…")?;
    let mut screen = TerminalSink::new(pb.clone());
    let mut mount = LoggingMount::default();
    let pb2 = pb.clone();

    let summary = run(
        &mut tracker,
        source,
        FrameClock::start(),
        &mut screen,
        Some(&mut mount),
        move |outcome| {
            pb2.set_message(format!(
                "{} · {} done",
                outcome.report.exercise_name, outcome.report.total_completed
            ));
            pb2.tick();
        },
    )
    .with_context(|| format!("pose replay failed: {}", poses.display()))?;

    pb.finish_with_message(format!(
        "{} frames, {} repetitions",
        summary.frames, summary.total_completed
    ));
    info!(
        frames = summary.frames,
        timeouts = summary.timeouts,
        total_completed = summary.total_completed,
        exercise = %tracker.routine().exercise(summary.exercise_index).name,
        "session finished"
    );
    Ok(())
}

// ── check ─────────────────────────────────────────────────────────────────────

fn cmd_check(config_path: PathBuf) -> Result<()> {
    let config = Config::load(&config_path)?;
    let routine = config
        .routine()
        .with_context(|| format!("invalid routine in {}", config_path.display()))?;
    let aim = config
        .aim_controller()
        .with_context(|| format!("invalid aim settings in {}", config_path.display()))?;

    println!("{}: ok", config_path.display());
    println!("  body parts : {}", routine.body_parts().len());
    println!("  aim        : {}", if aim.is_some() { "on" } else { "off" });
    println!("  playlist   :");
    for (i, exercise) in routine.exercises().iter().enumerate() {
        println!(
            "    {}. {}: {} x {:.1}s ({})",
            i + 1,
            exercise.name,
            exercise.repeat_count,
            exercise.hold_duration,
            exercise.body_parts.join(" + ")
        );
    }
    Ok(())
}

// ── defaults ──────────────────────────────────────────────────────────────────

fn cmd_defaults(output: Option<PathBuf>) -> Result<()> {
    let config = Config::default();
    match output {
        Some(path) => {
            config.save(&path)?;
            info!("wrote built-in routine to {}", path.display());
        }
        None => print!("{}", config.to_toml()?),
    }
    Ok(())
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::load_or_default(path),
        None => Ok(Config::default()),
    }
}

fn spinner(msg: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed_precise}]")?
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    Ok(pb)
}

/// Prints overlay lines above the spinner, only when their text changes.
struct TerminalSink {
    pb: ProgressBar,
    shown: HashMap<Line, String>,
}

impl TerminalSink {
    fn new(pb: ProgressBar) -> Self {
        Self {
            pb,
            shown: HashMap::new(),
        }
    }
}

impl DisplaySink for TerminalSink {
    fn show(&mut self, line: Line, text: &str) {
        if self.shown.get(&line).map(String::as_str) == Some(text) {
            return;
        }
        self.pb.println(format!("[{line:>7}] {text}"));
        self.shown.insert(line, text.to_string());
    }
}

/// Stand-in for the servo driver: logs angle changes.
#[derive(Default)]
struct LoggingMount {
    last: Option<AimState>,
}

impl Actuator for LoggingMount {
    fn apply(&mut self, state: AimState) -> Result<()> {
        if self.last != Some(state) {
            info!(pan = state.pan_angle, tilt = state.tilt_angle, "mount angles");
            self.last = Some(state);
        }
        Ok(())
    }
}
