// src/cli.rs
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser, Debug)]
#[command(author, version, about = "Log workout sets, run rest timers and count glasses of water", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new workout (e.g. "Squat")
    AddWorkout {
        name: String,
    },
    /// Rename a workout
    RenameWorkout {
        id: i64,
        name: String,
    },
    /// Delete a workout together with all of its sets
    DeleteWorkout {
        id: i64,
    },
    /// List workouts
    List,
    /// Show the sets recorded for a workout
    Sets {
        /// Workout ID
        workout: i64,
    },
    /// Record a set for a workout
    AddSet {
        /// Workout ID
        #[arg(short, long)]
        workout: i64,
        /// Weight used
        weight: String,
    },
    /// Change the weight of a set
    EditSet {
        id: i64,
        weight: String,
    },
    DeleteSet {
        id: i64,
    },
    /// Show a rest countdown. Enter finishes early, 'c' cancels
    Rest {
        /// Use the between-workouts rest instead of the between-sets rest
        #[arg(long)]
        workouts: bool,
        /// Override the rest length in seconds
        #[arg(short, long)]
        seconds: Option<String>,
    },
    /// Run the rest timer until it finishes or Ctrl-C stops it
    Timer {
        #[arg(long)]
        workouts: bool,
        #[arg(short, long)]
        seconds: Option<String>,
    },
    /// Track glasses of water drunk today
    Water {
        #[command(subcommand)]
        action: WaterAction,
    },
    /// Show the path to the database file
    DbPath,
    /// Show the path to the config file
    ConfigPath,
    /// Print a shell completion script
    Completions {
        shell: Shell,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaterAction {
    Drink,
    Undo,
    Reset,
    Show,
}

// Function to parse CLI arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}
