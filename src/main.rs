//! Marble Course headless runner
//!
//! Builds a course, lets the autopilot roll the marble through it a few
//! times and prints the leaderboard.

use std::path::PathBuf;

use clap::Parser;
use glam::Vec3;

use marble_course::physics::RapierWorld;
use marble_course::renderer::FrameRecorder;
use marble_course::sim::{Autopilot, GameEngine, TrackLayout, format_seconds};
use marble_course::{RunHistory, Settings};

/// Marble Course, headless autopilot runs
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Settings JSON; defaults are used when omitted or unreadable
    #[arg(value_name = "PATH")]
    settings: Option<PathBuf>,

    /// Build a procedural course from this seed instead of the standard one
    #[arg(long)]
    seed: Option<u64>,

    /// Straight runs in a procedural course
    #[arg(long, default_value_t = 8)]
    runs: usize,

    /// Attempts at the course
    #[arg(long, default_value_t = 3)]
    attempts: u32,
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let settings = match &args.settings {
        Some(path) => Settings::load(path),
        None => Settings::default(),
    };
    let course = match args.seed {
        Some(seed) => TrackLayout::procedural(&settings.track, seed, args.runs)?,
        None => TrackLayout::standard(&settings.track)?,
    };
    let mut history = RunHistory::new();

    let mut pilot = Autopilot::new(&course, &settings.track);
    let physics = RapierWorld::new(Vec3::new(0.0, settings.world.gravity, 0.0));
    let mut engine = GameEngine::new(settings, physics, FrameRecorder::new());
    engine.initialize_world(course)?;
    // Give up well after the score has bottomed out
    let tick_limit = engine.max_time_budget().max(600) * 3;

    for attempt in 1..=args.attempts {
        engine.begin_run()?;
        while engine.is_running() && engine.current_time() < tick_limit {
            if let (Some(pos), Some(vel)) = (engine.player_position(), engine.player_velocity()) {
                for command in pilot.steer(pos, vel) {
                    engine.apply_input(&command);
                }
            }
            engine.tick();
        }
        if !engine.run_state().is_finished() {
            log::warn!(
                "Attempt {} timed out after {} ticks, chasing waypoint {}{}",
                attempt,
                tick_limit,
                pilot.next_waypoint(),
                if pilot.on_final_leg() { " (final leg)" } else { "" }
            );
        }
        for event in engine.drain_events() {
            let rank = history.record(&event);
            println!(
                "Attempt {}: {:?} in {}s, score {}{}",
                attempt,
                event.status,
                format_seconds(event.final_time),
                event.score,
                rank.map(|r| format!(" (rank #{})", r)).unwrap_or_default()
            );
        }
        engine.restart();
        pilot.reset();
    }

    println!(
        "\n{} attempts, {} failures, {} frames rendered",
        history.attempts,
        history.failures,
        engine.renderer().frames
    );
    if history.is_empty() {
        println!("No successful runs");
    }
    for (i, entry) in history.entries.iter().enumerate() {
        println!(
            "{:>2}. {:>5}  {}s  (attempt {})",
            i + 1,
            entry.score,
            format_seconds(entry.final_time),
            entry.attempt
        );
    }
    Ok(())
}

fn main() {
    env_logger::init();
    log::info!("Marble Course (headless) starting...");

    if let Err(e) = run(Args::parse()) {
        log::error!("{}", e);
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn defaults_and_options() {
        let args = Args::try_parse_from(["marble-course"]).unwrap();
        assert!(args.settings.is_none());
        assert_eq!((args.seed, args.runs, args.attempts), (None, 8, 3));

        let args = Args::try_parse_from([
            "marble-course",
            "course.json",
            "--seed",
            "42",
            "--runs",
            "5",
            "--attempts",
            "1",
        ])
        .unwrap();
        assert_eq!(args.settings, Some(PathBuf::from("course.json")));
        assert_eq!((args.seed, args.runs, args.attempts), (Some(42), 5, 1));
    }

    #[test]
    fn bad_numbers_are_rejected() {
        assert!(Args::try_parse_from(["marble-course", "--runs", "many"]).is_err());
        assert!(Args::try_parse_from(["marble-course", "--bogus"]).is_err());
    }
}
