//! Podracer simulation CLI.
//!
//! Provides three modes of operation:
//! - `headless`: Drive the pod down a synthetic circuit on the rapier backend
//!   and print race statistics
//! - `config`: Print the default configuration or validate a file
//! - `info`: Print workspace crate versions

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use bevy::log::LogPlugin;
use bevy::prelude::*;
use clap::{Parser, Subcommand};

use podracer_core::prelude::*;
use podracer_physics::prelude::RapierWorld;
use podracer_sim::prelude::*;
use podracer_vehicle::prelude::PodGeometry;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

/// Podracer physics simulation.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Drive a scripted race on a synthetic circuit and print statistics.
    Headless {
        /// Maximum number of fixed steps.
        #[arg(short = 'n', long, default_value_t = 3600)]
        steps: u32,

        /// Laps to race; overrides the configuration.
        #[arg(short, long)]
        laps: Option<u32>,

        /// Configuration file (TOML).
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Seed for the power-coupling arc.
        #[arg(short, long)]
        seed: Option<u64>,
    },

    /// Print the default configuration, or validate a file.
    Config {
        /// File to validate instead of printing the defaults.
        #[arg(long)]
        validate: Option<PathBuf>,
    },

    /// Print crate information.
    Info,
}

// ---------------------------------------------------------------------------
// Synthetic circuit
// ---------------------------------------------------------------------------

/// Spacing of the lap gates along the straight.
const GATE_SPACING: f32 = 100.0;

fn quad(name: &str, corners: [Point3; 4]) -> TriangleMesh {
    TriangleMesh::new(name, corners.to_vec(), vec![[0, 2, 1], [0, 3, 2]])
}

/// Long straight along +Z with a lap gate every [`GATE_SPACING`] metres and
/// a hazard strip along its left edge.
fn synthetic_circuit(gates: u32) -> TrackGeometry {
    let length = GATE_SPACING * (gates as f32 + 1.0);
    let ground = quad(
        "ground",
        [
            Point3::new(-30.0, 0.0, -50.0),
            Point3::new(-30.0, 0.0, length),
            Point3::new(30.0, 0.0, length),
            Point3::new(30.0, 0.0, -50.0),
        ],
    );
    let hazard = quad(
        "lava_strip",
        [
            Point3::new(20.0, 0.01, 0.0),
            Point3::new(20.0, 0.01, length),
            Point3::new(30.0, 0.01, length),
            Point3::new(30.0, 0.01, 0.0),
        ],
    );
    let lap_boundary = (1..=gates)
        .map(|i| {
            let z = GATE_SPACING * i as f32;
            TriangleMesh::new(
                format!("gate_{i}"),
                vec![
                    Point3::new(-30.0, -1.0, z),
                    Point3::new(30.0, -1.0, z),
                    Point3::new(30.0, 8.0, z),
                    Point3::new(-30.0, 8.0, z),
                ],
                vec![[0, 1, 2], [0, 2, 3]],
            )
        })
        .collect();

    TrackGeometry {
        ground: vec![ground],
        hazard: vec![hazard],
        lap_boundary,
    }
}

/// Start-up sequence, then full throttle with a short afterburn every four
/// seconds.
fn scripted_input(step: u32) -> InputFrame {
    match step {
        0 => InputFrame {
            power_coupling: true,
            ..InputFrame::idle()
        },
        1 => InputFrame {
            engine_start: true,
            ..InputFrame::idle()
        },
        _ => InputFrame {
            throttle: true,
            boost: step % 240 < 60,
            ..InputFrame::idle()
        },
    }
}

fn load_config(path: Option<&Path>) -> Result<PodConfig, ConfigError> {
    path.map_or_else(|| Ok(PodConfig::default()), PodConfig::from_file)
}

// ---------------------------------------------------------------------------
// Mode implementations
// ---------------------------------------------------------------------------

fn run_headless(
    steps: u32,
    laps: Option<u32>,
    config: Option<&Path>,
    seed: Option<u64>,
) -> Result<(), PodracerError> {
    let mut config = load_config(config)?;
    if let Some(laps) = laps {
        config.race.laps = laps;
    }
    if seed.is_some() {
        config.power.seed = seed;
    }

    let track = synthetic_circuit(config.race.laps);
    let pod = ActivePod::build(
        RapierWorld::from_config(&config.sim),
        &PodGeometry::procedural(&config),
        &track,
        config,
        Iso3::translation(0.0, 1.5, 0.0),
    )?;

    let mut app = App::new();
    app.add_plugins(LogPlugin::default())
        .add_plugins(PodracerSimPlugin)
        .insert_resource(pod);
    app.finish();
    app.cleanup();

    let mut hazard_steps = 0u32;
    for step in 0..steps {
        app.world_mut().resource_mut::<PodInput>().frame = scripted_input(step);
        app.update();

        if app.world().resource::<PodTelemetry>().contacts().ground_hazard_touched {
            hazard_steps += 1;
        }
        if app.world().resource::<RaceStatus>().0.finished() {
            break;
        }
    }

    let telemetry = app.world().resource::<PodTelemetry>();
    let race = &app.world().resource::<RaceStatus>().0;
    for (i, lap) in race.lap_times().iter().enumerate() {
        println!("lap {}: {:.2}s", i + 1, lap.as_secs_f64());
    }
    println!(
        "\nsteps={}, stage={}, speed={:.1} km/h, avg={:.1} km/h",
        telemetry.steps,
        telemetry.stage().name(),
        telemetry.speed_kmh(),
        race.average_speed()
    );
    println!(
        "laps={}/{}, time={}, finished={}, hazard_steps={hazard_steps}",
        race.laps_done(),
        race.laps_target(),
        race.total_time(),
        race.finished()
    );
    Ok(())
}

fn run_config(validate: Option<&Path>) -> Result<(), ConfigError> {
    match validate {
        Some(path) => {
            PodConfig::from_file(path)?;
            println!("{}: ok", path.display());
        }
        None => print!("{}", PodConfig::default().to_toml_string()?),
    }
    Ok(())
}

fn run_info() {
    println!("podracer v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("crates:");
    println!("  podracer-core     {}", env!("CARGO_PKG_VERSION"));
    println!("  podracer-physics  {}", env!("CARGO_PKG_VERSION"));
    println!("  podracer-vehicle  {}", env!("CARGO_PKG_VERSION"));
    println!("  podracer-sim      {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("fixed step: {:.4}s", FIXED_DT);
    println!("edition: 2024");
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Headless {
            steps,
            laps,
            config,
            seed,
        }) => run_headless(steps, laps, config.as_deref(), seed),
        Some(Commands::Config { validate }) => {
            run_config(validate.as_deref()).map_err(PodracerError::from)
        }
        Some(Commands::Info) => {
            run_info();
            Ok(())
        }
        None => run_headless(3600, None, None, None),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
