//! Strider locomotion CLI.
//!
//! Provides two modes of operation:
//! - `walk`: Build a symmetric rig, walk it over a preset terrain and print a summary
//! - `config`: Print the default configuration as TOML

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info, warn};

use strider_gait::prelude::*;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

/// Procedural locomotion for n-pedal bodies.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk a generated rig over a preset terrain.
    Walk(WalkArgs),

    /// Print the default configuration as TOML.
    Config,
}

#[derive(clap::Args)]
struct WalkArgs {
    /// Number of lateral leg pairs.
    #[arg(short, long, default_value_t = 2)]
    pairs: usize,

    /// Terrain to walk on.
    #[arg(short, long, value_enum, default_value_t = TerrainKind::Flat)]
    terrain: TerrainKind,

    /// Number of ticks to simulate.
    #[arg(short = 'n', long, default_value_t = 500)]
    ticks: u32,

    /// Seconds per tick.
    #[arg(long, default_value_t = 0.02)]
    dt: f64,

    /// Steering input: forward component.
    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    forward: f64,

    /// Steering input: leftward component.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    left: f64,

    /// Hold the sprint input.
    #[arg(long)]
    sprint: bool,

    /// Enable the movement limiter.
    #[arg(long)]
    limiter: bool,

    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Default for WalkArgs {
    fn default() -> Self {
        Self {
            pairs: 2,
            terrain: TerrainKind::Flat,
            ticks: 500,
            dt: 0.02,
            forward: 1.0,
            left: 0.0,
            sprint: false,
            limiter: false,
            config: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TerrainKind {
    Flat,
    Slope,
    Ledge,
    Wall,
}

// ---------------------------------------------------------------------------
// Rig and terrain
// ---------------------------------------------------------------------------

fn terrain(kind: TerrainKind) -> TerrainScene {
    match kind {
        TerrainKind::Flat => presets::flat(),
        TerrainKind::Slope => presets::slope(0.15, 0.0),
        TerrainKind::Ledge => presets::ledge(6.0, 5.0),
        TerrainKind::Wall => presets::wall(6.0, 0.5),
    }
}

// ---------------------------------------------------------------------------
// Mode implementations
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct WalkSummary {
    swings: usize,
    blocked_ticks: u32,
    arc_changes: usize,
}

fn run_walk(args: &WalkArgs) -> Result<(), StriderError> {
    let mut config = match &args.config {
        Some(path) => LocomotionConfig::from_file(path)?,
        None => LocomotionConfig::default(),
    };
    if args.limiter {
        config.limiter.enabled = true;
    }
    if args.pairs == 0 {
        warn!("no leg pairs requested");
    }

    let scene = terrain(args.terrain);
    let mut system = RigBuilder::new(config)
        .with_body(BodyFrame::default())
        .with_limbs(presets::n_pedal_legs(args.pairs))
        .build(&scene)?;
    info!(
        limbs = system.limb_count(),
        terrain = ?args.terrain,
        ride_height = system.solver().ride_height(),
        "rig ready"
    );

    let input = LocomotionInput::new(args.forward, args.left).with_sprint(args.sprint);
    let mut summary = WalkSummary::default();
    for tick in 0..args.ticks {
        let report = system.tick(args.dt, &input, &scene);
        summary.swings += report.swings_started.len();
        summary.arc_changes += report.arcs_changed.len();
        if report.blocked() {
            summary.blocked_ticks += 1;
        }
        debug!(
            tick,
            x = system.body().position.x,
            z = system.body().position.z,
            swinging = system.swings().len(),
            "tick"
        );
    }

    let body = system.body();
    info!(
        elapsed = system.elapsed(),
        swings = summary.swings,
        blocked_ticks = summary.blocked_ticks,
        arc_changes = summary.arc_changes,
        "walk finished"
    );
    println!(
        "position=({:.3}, {:.3}, {:.3}) yaw={:.3} pitch={:.3} roll={:.3}",
        body.position.x,
        body.position.y,
        body.position.z,
        body.yaw.to_degrees(),
        body.pitch.to_degrees(),
        body.roll.to_degrees()
    );
    for limb in system.limbs() {
        let e = limb.effector();
        println!("  {}: {:?} at ({:.3}, {:.3}, {:.3})", limb.id(), limb.state(), e.x, e.y, e.z);
    }
    Ok(())
}

fn run_config() -> Result<(), String> {
    let text = toml::to_string_pretty(&LocomotionConfig::default()).map_err(|e| e.to_string())?;
    print!("{text}");
    Ok(())
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Some(Commands::Walk(args)) => run_walk(&args).map_err(|e| e.to_string()),
        Some(Commands::Config) => run_config(),
        // Default: walk with defaults
        None => run_walk(&WalkArgs::default()).map_err(|e| e.to_string()),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_walk_options() {
        let cli = Cli::parse_from([
            "strider", "walk", "--pairs", "3", "--terrain", "ledge", "--left", "-0.5", "--limiter",
        ]);
        let Some(Commands::Walk(args)) = cli.command else {
            panic!("expected walk");
        };
        assert_eq!(args.pairs, 3);
        assert_eq!(args.terrain, TerrainKind::Ledge);
        assert!((args.left + 0.5).abs() < f64::EPSILON);
        assert!(args.limiter);
    }

    #[test]
    fn terrain_kinds_differ_past_the_rig() {
        use nalgebra::Vector3;

        let point = Vector3::new(6.2, 0.0, 5.0);
        let flat = terrain(TerrainKind::Flat).ground_below(&point).unwrap();
        let ledge = terrain(TerrainKind::Ledge).ground_below(&point).unwrap();
        let slope = terrain(TerrainKind::Slope).ground_below(&point).unwrap();
        assert!(ledge.point.z < flat.point.z);
        assert!(slope.point.z > flat.point.z);
        assert!(terrain(TerrainKind::Wall).is_obstructed(&Vector3::new(5.0, 0.0, -0.5), &Vector3::new(7.0, 0.0, -0.5)));
    }

    #[test]
    fn wall_walk_runs() {
        let args = WalkArgs {
            terrain: TerrainKind::Wall,
            ticks: 100,
            ..WalkArgs::default()
        };
        assert!(run_walk(&args).is_ok());
    }

    #[test]
    fn default_walk_runs() {
        let args = WalkArgs {
            ticks: 50,
            ..WalkArgs::default()
        };
        assert!(run_walk(&args).is_ok());
    }

    #[test]
    fn zero_pairs_is_rejected() {
        let args = WalkArgs {
            pairs: 0,
            ..WalkArgs::default()
        };
        assert!(matches!(
            run_walk(&args),
            Err(StriderError::Rig(RigError::NoLimbs))
        ));
    }
}
