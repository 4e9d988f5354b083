use anyhow::Result;
use clap::{Parser, Subcommand};
use mmnav::WorldPoint;
use std::path::PathBuf;

mod commands;

/// Navmesh path query and tile inspection tool
#[derive(Parser)]
#[command(name = "mmnav")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory containing .mmap and .mmtile files
    #[arg(short, long, env = "MMNAV_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Map to load
    #[arg(short, long, env = "MMNAV_MAP_ID", default_value = "0", global = true)]
    map_id: u32,

    /// Snap half-extent on each axis
    #[arg(long, env = "MMNAV_SEARCH_EXTENT", default_value = "6", global = true)]
    extent: f32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find a walkable path between two points
    Path {
        /// Start point as x,y,z
        #[arg(long, value_parser = commands::parse_point, allow_hyphen_values = true)]
        from: WorldPoint,

        /// End point as x,y,z
        #[arg(long, value_parser = commands::parse_point, allow_hyphen_values = true)]
        to: WorldPoint,

        /// Output result as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Snap a point to the nearest walkable surface
    Closest {
        /// Point as x,y,z
        #[arg(long, value_parser = commands::parse_point, allow_hyphen_values = true)]
        point: WorldPoint,

        /// Output result as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Snap every row of a CSV file to the walkable surface
    Batch {
        /// Input CSV file
        input: PathBuf,

        /// Output file (defaults to <input>_snapped.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Column name for x
        #[arg(long, default_value = "x")]
        x_col: String,

        /// Column name for y
        #[arg(long, default_value = "y")]
        y_col: String,

        /// Column name for z (up)
        #[arg(long, default_value = "z")]
        z_col: String,
    },

    /// Display information about a tile file
    Info {
        /// Path to a .mmtile file
        #[arg(required_unless_present_all = ["gx", "gy"])]
        tile: Option<PathBuf>,

        /// Specify the tile by grid x instead of path
        #[arg(long, requires = "gy", conflicts_with = "tile")]
        gx: Option<u32>,

        /// Specify the tile by grid y instead of path
        #[arg(long, requires = "gx", conflicts_with = "tile")]
        gy: Option<u32>,
    },

    /// List the tile files of a map
    List,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Path { from, to, json } => {
            commands::path::run(cli.data_dir, cli.map_id, cli.extent, from, to, json)
        }
        Commands::Closest { point, json } => {
            commands::closest::run(cli.data_dir, cli.map_id, cli.extent, point, json)
        }
        Commands::Batch {
            input,
            output,
            x_col,
            y_col,
            z_col,
        } => commands::batch::run(
            cli.data_dir,
            cli.map_id,
            cli.extent,
            input,
            output,
            [x_col, y_col, z_col],
        ),
        Commands::Info { tile, gx, gy } => {
            commands::info::run(cli.data_dir, cli.map_id, tile, gx.zip(gy))
        }
        Commands::List => commands::list::run(cli.data_dir, cli.map_id),
    }
}
