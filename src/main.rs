//src/main.rs
mod cli; // Keep cli module for parsing args

use anyhow::{bail, Context, Result};
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use std::collections::HashSet;
use std::io::{stdout, Write};
use tokio::sync::{broadcast, mpsc};
use tracing_subscriber::EnvFilter;

use rest_athlete_lib::{
    parse_weight, AppService, CountdownDialog, RestSettings, RestTimer, TimerEvent, Workout,
    WorkoutSet, WorkoutStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli_args = cli::parse_args(); // Parse arguments once

    if let cli::Commands::Completions { shell } = cli_args.command {
        let mut cmd = cli::build_cli_command();
        let bin_name = cmd.get_name().to_string();
        clap_complete::generate(shell, &mut cmd, bin_name, &mut stdout());
        return Ok(());
    }

    // Loads config, connects to DB and spawns the workout session
    let mut service =
        AppService::initialize().context("Failed to initialize application service")?;
    let header_color = service.header_color();

    match cli_args.command {
        cli::Commands::Completions { .. } => {
            unreachable!("Completion generation should have exited already");
        }

        // --- Workout Commands ---
        cli::Commands::AddWorkout { name } => {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                bail!("Workout name cannot be empty.");
            }
            service.session.refresh().await;
            let before: HashSet<i64> = service
                .session
                .snapshot()
                .workouts
                .iter()
                .map(|w| w.id)
                .collect();

            service.session.add_workout(trimmed).await;
            let snapshot = service.session.snapshot();
            match snapshot.workouts.iter().find(|w| !before.contains(&w.id)) {
                Some(workout) => println!(
                    "Successfully added workout '{}' ID: {}",
                    workout.name, workout.id
                ),
                None => bail!(
                    "Workout '{}' was not added (run with RUST_LOG=warn for details).",
                    trimmed
                ),
            }
        }
        cli::Commands::RenameWorkout { id, name } => {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                bail!("Workout name cannot be empty.");
            }
            service.find_workout(id).await?;
            service.session.rename_workout(id, trimmed).await;
            let renamed = service.find_workout(id).await?;
            if renamed.name != trimmed {
                bail!(
                    "Workout ID {} was not renamed (run with RUST_LOG=warn for details).",
                    id
                );
            }
            println!("Successfully renamed workout ID {} to '{}'.", id, renamed.name);
        }
        cli::Commands::DeleteWorkout { id } => {
            let workout = service.find_workout(id).await?;
            service.session.delete_workout(id).await;
            if service.session.snapshot().workouts.iter().any(|w| w.id == id) {
                bail!(
                    "Workout ID {} was not deleted (run with RUST_LOG=warn for details).",
                    id
                );
            }
            println!(
                "Successfully deleted workout '{}' (ID {}) and all of its sets.",
                workout.name, id
            );
        }
        cli::Commands::List => {
            service.session.refresh().await;
            let workouts = service.session.snapshot().workouts;
            if workouts.is_empty() {
                println!("No workouts yet. Add one with 'add-workout <name>'.");
            } else {
                print_workout_table(&workouts, header_color);
            }
        }

        // --- Set Commands ---
        cli::Commands::Sets { workout } => {
            let snapshot = service.select_workout(workout).await?;
            print_sets_for(&snapshot.selected, &snapshot.sets, header_color);
        }
        cli::Commands::AddSet { workout, weight } => {
            let Some(weight) = parse_weight(&weight) else {
                bail!("Invalid weight '{}'. Enter a non-negative number.", weight);
            };
            let before = service.select_workout(workout).await?.sets.len();
            service.session.add_set(weight).await;
            let snapshot = service
                .session
                .settled()
                .await
                .context("Workout session stopped")?;
            if snapshot.load_failed {
                bail!("Set may have been added, but the sets could not be re-read.");
            }
            if snapshot.sets.len() <= before {
                bail!("Set was not added (run with RUST_LOG=warn for details).");
            }
            print_sets_for(&snapshot.selected, &snapshot.sets, header_color);
        }
        cli::Commands::EditSet { id, weight } => {
            let Some(weight) = parse_weight(&weight) else {
                bail!("Invalid weight '{}'. Enter a non-negative number.", weight);
            };
            match service.store.update_set_weight(id, weight) {
                Ok(()) => println!("Successfully updated set ID {} to {:.2}.", id, weight),
                Err(e) => bail!("Error editing set ID {}: {}", id, e),
            }
        }
        cli::Commands::DeleteSet { id } => {
            match service.store.delete_set(id) {
                Ok(()) => println!("Successfully deleted set ID {}.", id),
                Err(e) => bail!("Error deleting set ID {}: {}", id, e),
            }
        }

        // --- Rest Commands ---
        cli::Commands::Rest { workouts, seconds } => {
            let seconds = resolve_rest_seconds(&mut service.rest, workouts, seconds.as_deref());
            run_countdown_dialog(seconds).await?;
        }
        cli::Commands::Timer { workouts, seconds } => {
            let seconds = resolve_rest_seconds(&mut service.rest, workouts, seconds.as_deref());
            run_rest_timer(service.rest_timer(), seconds).await?;
        }

        // --- Hydration Commands ---
        cli::Commands::Water { action } => {
            let count = match action {
                cli::WaterAction::Drink => service.hydration.drink()?,
                cli::WaterAction::Undo => service.hydration.undo()?,
                cli::WaterAction::Reset => {
                    service.hydration.reset()?;
                    0
                }
                cli::WaterAction::Show => service.hydration.count()?,
            };
            println!("Glasses of water today: {}", count);
        }

        cli::Commands::DbPath => {
            println!("Database file is located at: {:?}", service.get_db_path());
        }
        cli::Commands::ConfigPath => {
            println!("Config file is located at: {:?}", service.get_config_path());
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Applies `--workouts` / `--seconds` to the in-memory rest settings and
/// returns the duration to count down from.
fn resolve_rest_seconds(rest: &mut RestSettings, workouts: bool, seconds: Option<&str>) -> u32 {
    rest.set_use_workout_timer(workouts);
    if let Some(input) = seconds {
        if !rest.apply_override(input) {
            eprintln!(
                "Warning: '{}' is not a valid number of seconds, using {}s.",
                input,
                rest.active_duration()
            );
        }
    }
    rest.active_duration()
}

// Reads stdin on a plain thread so a pending read never holds up shutdown.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

async fn run_countdown_dialog(seconds: u32) -> Result<()> {
    let dialog = CountdownDialog::open(
        seconds,
        || println!("\nRest over. Time for the next set!"),
        || println!("\nRest cancelled."),
    );
    let mut remaining = dialog.watch_remaining();
    let mut input = spawn_stdin_reader();
    let mut input_open = true;

    println!(
        "Resting for {}s. Press Enter to finish early, 'c' + Enter to cancel.",
        seconds
    );
    loop {
        tokio::select! {
            outcome = dialog.outcome() => {
                tracing::debug!(?outcome, "Countdown resolved");
                break;
            }
            changed = remaining.changed() => {
                if changed.is_ok() {
                    let left = *remaining.borrow();
                    print!("\r{:>5}s left ({:>3.0}%) ", left, dialog.progress() * 100.0);
                    stdout().flush().context("Failed to write countdown")?;
                }
            }
            line = input.recv(), if input_open => match line {
                Some(text) if text.trim().eq_ignore_ascii_case("c") => {
                    dialog.dismiss();
                }
                Some(_) => {
                    dialog.confirm();
                }
                None => input_open = false,
            },
        }
    }

    // Cancelling is a normal choice, the callback already reported it
    Ok(())
}

async fn run_rest_timer(timer: RestTimer, seconds: u32) -> Result<()> {
    let mut events = timer.events();
    if !timer.start(seconds) {
        bail!("Rest timer could not be started with {}s.", seconds);
    }
    println!("Rest timer running for {}s. Ctrl-C stops it.", seconds);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(TimerEvent::Started { .. }) => {}
                Ok(TimerEvent::Tick { remaining_seconds }) => {
                    print!("\r{:>5}s left ", remaining_seconds);
                    stdout().flush().context("Failed to write timer")?;
                }
                Ok(TimerEvent::Stopped { remaining_seconds }) => {
                    println!("\nRest timer stopped with {}s left.", remaining_seconds);
                    break;
                }
                Ok(TimerEvent::Finished) => {
                    println!("\nRest over. Time for the next set!");
                    break;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Timer display fell behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                timer.stop();
            }
        }
    }
    Ok(())
}

fn print_workout_table(workouts: &[Workout], header_color: Color) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").fg(header_color),
            Cell::new("Workout").fg(header_color),
        ]);

    for workout in workouts {
        table.add_row(vec![
            Cell::new(workout.id.to_string()),
            Cell::new(&workout.name),
        ]);
    }
    println!("{table}");
}

fn print_sets_for(selected: &Option<Workout>, sets: &[WorkoutSet], header_color: Color) {
    if let Some(workout) = selected {
        println!("Sets for '{}' (ID {}):", workout.name, workout.id);
    }
    if sets.is_empty() {
        println!("No sets recorded yet.");
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Set").fg(header_color),
            Cell::new("ID").fg(header_color),
            Cell::new("Weight").fg(header_color),
            Cell::new("Recorded (UTC)").fg(header_color),
        ]);

    for (index, set) in sets.iter().enumerate() {
        table.add_row(vec![
            Cell::new((index + 1).to_string()),
            Cell::new(set.id.to_string()),
            Cell::new(format!("{:.2}", set.weight)),
            Cell::new(set.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()),
        ]);
    }
    println!("{table}");
}
