use std::time::Duration;

use chrono::Utc;
use clap::Subcommand;
use tabata_core::cue::schedule;
use tabata_core::{Intensity, Settings, TimerEngine, TimerState, WorkoutConfig};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Run a workout in the foreground, printing events as JSON lines
    Run {
        /// Phase duration in seconds
        #[arg(long)]
        duration: Option<u64>,
        /// Number of sets
        #[arg(long)]
        sets: Option<u32>,
        /// Start on the high-intensity phase
        #[arg(long)]
        start_high: bool,
        /// Tick interval in milliseconds
        #[arg(long, default_value = "200")]
        tick_ms: u64,
    },
    /// Print the cue schedule for a workout without running it
    Preview {
        /// Phase duration in seconds
        #[arg(long)]
        duration: Option<u64>,
        /// Number of sets
        #[arg(long)]
        sets: Option<u32>,
        /// Start on the high-intensity phase
        #[arg(long)]
        start_high: bool,
    },
}

fn build_config(
    settings: &Settings,
    duration: Option<u64>,
    sets: Option<u32>,
    start_high: bool,
) -> Result<WorkoutConfig, Box<dyn std::error::Error>> {
    let start_intensity = if start_high {
        Intensity::High
    } else {
        settings.workout.start_intensity
    };
    let config = WorkoutConfig::new(
        duration.unwrap_or(settings.workout.phase_duration_secs),
        sets.unwrap_or(settings.workout.total_sets),
        start_intensity,
    )?;
    Ok(config)
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::load()?;

    match action {
        TimerAction::Run {
            duration,
            sets,
            start_high,
            tick_ms,
        } => {
            let config = build_config(&settings, duration, sets, start_high)?;
            let mut engine = TimerEngine::new(config, settings.cues.clone());

            for event in engine.start(Utc::now()) {
                println!("{}", serde_json::to_string(&event)?);
            }
            while engine.state() == TimerState::Running {
                std::thread::sleep(Duration::from_millis(tick_ms.max(1)));
                for event in engine.tick(Utc::now()) {
                    println!("{}", serde_json::to_string(&event)?);
                }
            }
        }
        TimerAction::Preview {
            duration,
            sets,
            start_high,
        } => {
            let config = build_config(&settings, duration, sets, start_high)?;
            let cues = schedule(&config, &settings.cues, Utc::now(), 0);
            println!("{}", serde_json::to_string_pretty(&cues)?);
        }
    }
    Ok(())
}
