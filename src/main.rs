//! `tabletop`: offline tools for saved tabletop scenarios.
//!
//! Loads scenario documents through the engine, replays action logs against
//! them, and prints level, roster, and snapping reports as JSON on stdout.
//! Logs go to stderr, filtered by `RUST_LOG`.

mod commands;

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use commands::{CliError, SnapRequest};
use engine::geom::Vector3;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tabletop", about = "Virtual tabletop scenario tools")]
struct Cli {
    /// JSON array of metadata records used to rehydrate loaded scenarios.
    #[arg(long, env = "TABLETOP_METADATA")]
    metadata: Option<PathBuf>,

    /// Grid type for `snap`: NONE, SQUARE, HEX_VERT or HEX_HORZ.
    #[arg(long, env = "TABLETOP_GRID", default_value = "SQUARE")]
    grid: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply a JSONL action log to a scenario and write GM and player snapshots.
    Replay {
        scenario: PathBuf,
        #[arg(long, default_value = "-", help = "Action log path, or - for stdin")]
        actions: String,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Write the GM and player snapshots of a scenario.
    Split {
        scenario: PathBuf,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Print the scenario's maps grouped into levels.
    Levels { scenario: PathBuf },
    /// Print the piece roster.
    Roster {
        scenario: PathBuf,
        #[arg(long, help = "Column name to sort by")]
        sort: Option<String>,
        #[arg(long)]
        descending: bool,
        #[arg(long, help = "Include GM-only pieces and columns")]
        gm: bool,
    },
    /// Snap a piece transform to the grid.
    Snap {
        #[arg(long, default_value_t = 0.0)]
        x: f64,
        #[arg(long, default_value_t = 0.0)]
        y: f64,
        #[arg(long, default_value_t = 0.0)]
        z: f64,
        #[arg(long, default_value_t = 0.0, help = "Rotation about the vertical axis, in degrees")]
        rotation: f64,
        #[arg(long, default_value_t = 1.0)]
        scale: f64,
        #[arg(long, default_value_t = 0.0)]
        elevation: f64,
    },
}

fn main() -> Result<(), CliError> {
    init_tracing();
    let cli = Cli::parse();
    let store = commands::load_metadata_store(cli.metadata.as_deref())?;

    match cli.command {
        Command::Replay { scenario, actions, out_dir } => {
            let (mut loaded, tabletop) = commands::load_scenario(&scenario, &store)?;
            commands::replay_actions(&mut loaded, open_input(&actions)?)?;
            commands::write_snapshots(&loaded, &tabletop, &out_dir)
        }
        Command::Split { scenario, out_dir } => {
            let (loaded, tabletop) = commands::load_scenario(&scenario, &store)?;
            commands::write_snapshots(&loaded, &tabletop, &out_dir)
        }
        Command::Levels { scenario } => {
            let (loaded, _) = commands::load_scenario(&scenario, &store)?;
            print_json(&commands::level_reports(&loaded))
        }
        Command::Roster { scenario, sort, descending, gm } => {
            let (loaded, tabletop) = commands::load_scenario(&scenario, &store)?;
            let rows =
                commands::roster_rows(&loaded, &tabletop.pieces_roster_columns, sort.as_deref(), descending, gm)?;
            print_json(&rows)
        }
        Command::Snap { x, y, z, rotation, scale, elevation } => {
            let request = SnapRequest {
                grid_type: commands::parse_grid(&cli.grid)?,
                position: Vector3::new(x, y, z),
                rotation_degrees: rotation,
                scale,
                elevation,
            };
            print_json(&commands::snap_report(&request))
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

fn open_input(path: &str) -> Result<Box<dyn BufRead>, CliError> {
    if path == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(Path::new(path)).map_err(|source| CliError::Io { path: path.to_owned(), source })?;
    Ok(Box::new(BufReader::new(file)))
}

fn print_json(value: &impl Serialize) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
