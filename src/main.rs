//! Command-line front end of the workout tracker.

use clap::{Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

mod analysis;
mod backup;
mod error;
mod history;
mod model;
mod plans;
mod presenter;
mod report;
mod rest_timer;
mod session;
mod store;
mod timeline;
mod tools;
mod tracker;

use error::TrackerError;
use history::WorkoutEdit;
use model::LoggedExercise;
use presenter::{ExerciseView, LogPresenter, Presenter, format_clock, format_last};
use session::{Phase, ResumeDecision};
use store::{JsonStore, Store};
use tools::{Goal, OneRmFormula};
use tracker::{Tracker, local_day};

#[derive(Parser, Debug)]
#[command(author, version, about = "Offline workout tracker", long_about = None)]
struct Cli {
    /// Directory holding the JSON collections.
    #[arg(long, global = true, env = store::DATA_DIR_ENV)]
    data_dir: Option<PathBuf>,
    /// Weekday to plan for (Mon..Sun). Defaults to today.
    #[arg(long, global = true)]
    day: Option<String>,
    /// What to do with an unfinished workout found at startup.
    #[arg(long, global = true, value_enum, default_value_t = PendingPolicy::Continue)]
    on_pending: PendingPolicy,
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum PendingPolicy {
    Continue,
    Discard,
}

impl From<PendingPolicy> for ResumeDecision {
    fn from(p: PendingPolicy) -> Self {
        match p {
            PendingPolicy::Continue => ResumeDecision::Continue,
            PendingPolicy::Discard => ResumeDecision::Discard,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the day's plan and the workout in progress
    Status,
    /// Start a workout
    Start,
    /// Log a completed set; missing values repeat the last set
    Set {
        exercise: String,
        #[arg(short, long)]
        weight: Option<f64>,
        #[arg(short, long)]
        reps: Option<f64>,
    },
    /// Change a logged set (1-based index)
    EditSet {
        exercise: String,
        index: usize,
        #[arg(short, long)]
        weight: f64,
        #[arg(short, long)]
        reps: f64,
    },
    /// Save notes for an exercise
    Notes { exercise: String, text: String },
    /// Finish the workout and save it to history
    Finish,
    /// Throw the workout in progress away
    Discard,
    /// Continue an unfinished workout
    Resume,
    /// Count down a rest interval
    Rest {
        seconds: Option<u32>,
        #[arg(long, allow_hyphen_values = true)]
        adjust: Option<i32>,
    },
    /// Show or edit the day's plan
    Plan {
        #[command(subcommand)]
        action: Option<PlanAction>,
    },
    /// Show or select the training split
    Split { name: Option<String> },
    History {
        #[command(subcommand)]
        action: Option<HistoryAction>,
    },
    Dashboard,
    Timeline {
        #[command(subcommand)]
        action: Option<TimelineAction>,
    },
    /// Show or set the username
    Profile { name: Option<String> },
    /// Change the default rest duration
    Settings {
        #[arg(long)]
        rest: u32,
    },
    /// Write a JSON backup of all data
    Export {
        #[arg(default_value = backup::BACKUP_FILE)]
        path: PathBuf,
    },
    /// Merge a JSON backup into the local data
    Import { path: PathBuf },
    /// Delete all local data
    Reset {
        #[arg(long)]
        yes: bool,
    },
    /// Write every logged set as CSV
    Csv {
        #[arg(default_value = "workouts.csv")]
        path: PathBuf,
    },
    /// Write an HTML history report
    Report {
        #[arg(default_value = "report.html")]
        path: PathBuf,
    },
    #[command(subcommand)]
    Tools(ToolCommand),
}

#[derive(Subcommand, Debug)]
enum PlanAction {
    Add { name: String },
    Remove { index: usize },
    Suggest {
        #[arg(default_value = "")]
        query: String,
    },
}

#[derive(Subcommand, Debug)]
enum HistoryAction {
    List,
    Edit {
        id: String,
        /// JSON array of exercises replacing the logged ones
        #[arg(long)]
        exercises: Option<PathBuf>,
        #[arg(long)]
        duration: Option<u64>,
        #[arg(long)]
        xp: Option<u64>,
    },
}

#[derive(Subcommand, Debug)]
enum TimelineAction {
    Add {
        note: Option<String>,
        #[arg(long)]
        photo: Option<PathBuf>,
    },
    List,
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
enum ToolCommand {
    OneRm {
        weight: f64,
        reps: f64,
        #[arg(long, default_value = "epley")]
        formula: OneRmFormula,
    },
    Plates { target: f64 },
    Bmi {
        weight: f64,
        height: f64,
        age: f64,
        #[arg(long, default_value = "maintain")]
        goal: Goal,
    },
    Coach {
        weight: f64,
        #[arg(long, default_value = "maintain")]
        goal: Goal,
        #[arg(long, default_value = "Balanced")]
        diet: String,
    },
}

/// Prints to the terminal and mirrors everything to the log. The exercise
/// list is only printed on request.
#[derive(Debug, Default)]
struct ConsolePresenter {
    log: LogPresenter,
    list: Option<(String, String, Vec<ExerciseView>)>,
}

impl ConsolePresenter {
    fn print_list(&self) {
        let Some((split, day, exercises)) = &self.list else {
            return;
        };
        println!("{day} - {split}");
        if exercises.is_empty() {
            println!("  Rest day.");
        }
        for (i, ex) in exercises.iter().enumerate() {
            let mut line = format!("{:>2}. {}", i + 1, ex.name);
            if let Some(last) = format_last(ex.last) {
                line.push_str(&format!("  last {last}"));
            }
            if let Some(best) = &ex.best {
                line.push_str(&format!("  best {}kg x {}", best.weight, best.reps));
            }
            println!("{line}");
            if !ex.notes.is_empty() {
                println!("      notes: {}", ex.notes);
            }
            for (n, set) in ex.sets.iter().enumerate() {
                println!(
                    "      set {}: {}kg x {}",
                    n + 1,
                    set.weight.unwrap_or_default(),
                    set.reps.unwrap_or_default()
                );
            }
        }
    }
}

impl Presenter for ConsolePresenter {
    fn render_exercise_list(&mut self, split: &str, day: &str, exercises: &[ExerciseView]) {
        self.log.render_exercise_list(split, day, exercises);
        self.list = Some((split.to_string(), day.to_string(), exercises.to_vec()));
    }

    fn notify(&mut self, message: &str) {
        self.log.notify(message);
        println!("{message}");
    }

    fn alert(&mut self, message: &str) {
        self.log.alert(message);
        println!("\x07{message}");
    }

    fn render_timers(&mut self, workout_secs: u64, rest_remaining: Option<u32>) {
        let rest = rest_remaining
            .map(|r| format!("  Rest {}", format_clock(r as u64)))
            .unwrap_or_default();
        print!("\rWorkout {}{rest}   ", format_clock(workout_secs));
        let _ = std::io::stdout().flush();
    }
}

type App = Tracker<JsonStore, ConsolePresenter>;

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Show user errors through the presenter before passing them on.
fn shown<T>(app: &mut App, result: Result<T, TrackerError>) -> Result<T, TrackerError> {
    if let Err(e) = &result {
        if e.is_user_error() {
            app.presenter_mut().notify(&e.to_string());
        }
    }
    result
}

fn run_tool(cmd: ToolCommand) {
    let line = match cmd {
        ToolCommand::OneRm {
            weight,
            reps,
            formula,
        } => tools::estimate_one_rm(weight, reps, formula).map(|e| e.to_string()),
        ToolCommand::Plates { target } => {
            tools::plate_breakdown(target).map(|p| tools::format_plates(&p))
        }
        ToolCommand::Bmi {
            weight,
            height,
            age,
            goal,
        } => tools::body_estimate(weight, height, age, goal).map(|e| {
            format!(
                "BMI {:.1}  -  Daily calories ~{} kcal",
                e.bmi, e.daily_calories
            )
        }),
        ToolCommand::Coach { weight, goal, diet } => {
            tools::nutrition_plan(weight, goal, &diet).map(|p| p.to_string())
        }
    };
    match line {
        Ok(text) => println!("{text}"),
        Err(e) => println!("{e}"),
    }
}

fn print_status(app: &App, now: i64) {
    let session = app.session();
    match session.phase() {
        Phase::Idle => println!("No workout in progress."),
        Phase::Active { .. } | Phase::Suspended { .. } => {
            let secs = (session.elapsed_ms(now) / 1000) as u64;
            println!(
                "Workout in progress: {} {} - {}",
                session.split(),
                session.day(),
                format_clock(secs)
            );
        }
        Phase::AwaitingDecision { .. } => println!("Unfinished workout waiting."),
    }
    let profile = app.profile();
    println!(
        "Level {} - {} XP - rest {}s",
        profile.level,
        profile.total_xp,
        app.settings().rest_duration
    );
}

/// A gap this long between two ticks means the process was not scheduled,
/// e.g. the machine slept.
const TICK_OVERRUN_MS: i64 = 1_500;

/// Deliver one host tick. An overrun is replayed as a background period
/// from `last_ms` to `now_ms` so the rest countdown is rebuilt from its
/// deadline instead of from the ticks that were missed.
fn deliver_tick<S: Store, P: Presenter>(
    app: &mut Tracker<S, P>,
    last_ms: i64,
    now_ms: i64,
) -> Result<(), TrackerError> {
    if now_ms - last_ms > TICK_OVERRUN_MS {
        log::debug!("Tick overran by {} ms", now_ms - last_ms);
        app.suspend(last_ms)?;
        app.fire_rest_deadline(now_ms);
        app.foreground(now_ms);
    } else {
        app.tick(now_ms);
    }
    Ok(())
}

fn count_down(app: &mut App) -> Result<(), TrackerError> {
    let mut last = now_ms();
    while app.rest().is_active() {
        std::thread::sleep(Duration::from_secs(1));
        let now = now_ms();
        deliver_tick(app, last, now)?;
        last = now;
    }
    println!();
    Ok(())
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let command = match cli.command {
        Command::Tools(cmd) => {
            run_tool(cmd);
            return Ok(());
        }
        other => other,
    };

    let dir = JsonStore::resolve_dir(cli.data_dir.as_deref())
        .ok_or("No data directory available; pass --data-dir")?;
    let store = JsonStore::open(dir)?;
    log::info!("Data directory: {}", store.dir().display());
    let now = now_ms();
    let policy = match command {
        Command::Resume => ResumeDecision::Continue,
        Command::Discard => ResumeDecision::Discard,
        _ => cli.on_pending.into(),
    };
    let mut app = Tracker::boot(store, ConsolePresenter::default(), now, None, Some(policy))?;
    if let Some(day) = cli.day.as_deref() {
        app.select_day(day)?;
    }

    match command {
        Command::Status => {
            app.set_last_view("workout")?;
            print_status(&app, now);
            app.presenter_mut().print_list();
        }
        Command::Start => app.start(now)?,
        Command::Set {
            exercise,
            weight,
            reps,
        } => {
            let outcome = app.complete_set(now, &exercise, weight, reps)?;
            println!(
                "Set {} logged (+{} XP). Rest {}",
                outcome.set_index + 1,
                outcome.xp_awarded,
                format_clock(app.rest().remaining() as u64)
            );
        }
        Command::EditSet {
            exercise,
            index,
            weight,
            reps,
        } => {
            app.update_set(&exercise, index.saturating_sub(1), Some(weight), Some(reps))?;
            println!("Set updated.");
        }
        Command::Notes { exercise, text } => {
            app.set_notes(&exercise, &text)?;
            println!("Notes saved.");
        }
        Command::Finish => {
            let w = app.finish(now)?;
            println!(
                "{} min - {} sets - {} kg - {} kcal - {} XP",
                w.duration, w.total_sets, w.total_volume, w.calories_burned, w.xp
            );
        }
        Command::Discard => {
            if app.settled_on_boot() != Some(ResumeDecision::Discard) {
                app.discard()?;
            }
        }
        Command::Resume => match app.settled_on_boot() {
            Some(ResumeDecision::Continue) => app.presenter_mut().notify("Workout resumed."),
            _ => println!("No unfinished workout."),
        },
        Command::Rest { seconds, adjust } => {
            app.start_rest(now, seconds);
            if let Some(delta) = adjust {
                app.adjust_rest(delta);
            }
            count_down(&mut app)?;
        }
        Command::Plan { action } => match action {
            None => {
                for name in app.plan()? {
                    let hint = app.prefill(&name)?;
                    let last = hint.weight.zip(hint.reps);
                    match format_last(last) {
                        Some(last) => println!("{name}  ({last})"),
                        None => println!("{name}"),
                    }
                }
            }
            Some(PlanAction::Add { name }) => {
                app.add_exercise(&name)?;
                app.presenter_mut().print_list();
            }
            Some(PlanAction::Remove { index }) => {
                let removed = app.remove_exercise(index.saturating_sub(1))?;
                println!("Removed {removed}.");
                app.presenter_mut().print_list();
            }
            Some(PlanAction::Suggest { query }) => {
                for name in app.suggestions(&query) {
                    let note = app
                        .record_for(&name)?
                        .filter(|r| !r.notes.is_empty())
                        .map(|r| format!("  ({})", r.notes))
                        .unwrap_or_default();
                    println!("{name}{note}");
                }
            }
        },
        Command::Split { name } => match name {
            Some(name) => {
                app.select_split(&name)?;
                app.presenter_mut().print_list();
            }
            None => {
                for split in plans::split_names() {
                    let marker = if split == app.settings().split { "*" } else { " " };
                    println!("{marker} {split}");
                }
            }
        },
        Command::History { action } => {
            app.set_last_view("history")?;
            match action.unwrap_or(HistoryAction::List) {
                HistoryAction::List => {
                    for w in app.workouts()? {
                        println!(
                            "{}  {}  {} {}  {} min  {} sets  {} kg  {} kcal  {} XP",
                            w.id,
                            w.date.get(..10).unwrap_or(&w.date),
                            w.split,
                            w.day,
                            w.duration,
                            w.total_sets,
                            w.total_volume,
                            w.calories_burned,
                            w.xp
                        );
                    }
                }
                HistoryAction::Edit {
                    id,
                    exercises,
                    duration,
                    xp,
                } => {
                    let current = app.workouts()?.into_iter().find(|w| w.id == id);
                    let current = shown(
                        &mut app,
                        current.ok_or_else(|| TrackerError::NotFound(format!("workout {id}"))),
                    )?;
                    let exercises: Vec<LoggedExercise> = match exercises {
                        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
                        None => current.exercises,
                    };
                    let edit = WorkoutEdit {
                        exercises,
                        duration_minutes: duration,
                        xp,
                    };
                    let (w, dash) = app.edit_workout(&id, &edit, local_day(now))?;
                    println!(
                        "{} min - {} sets - {} kg - {} kcal - {} XP",
                        w.duration, w.total_sets, w.total_volume, w.calories_burned, w.xp
                    );
                    println!("Workouts: {}  Streak: {}", dash.total_workouts, dash.streak);
                }
            }
        }
        Command::Dashboard => {
            app.set_last_view("dashboard")?;
            let dash = app.dashboard(local_day(now))?;
            let name = if app.profile().username.is_empty() {
                "Athlete"
            } else {
                app.profile().username.as_str()
            };
            println!("Welcome back, {name}");
            println!(
                "Workouts: {}  Streak: {} days  Level {} ({}/1000 XP)",
                dash.total_workouts, dash.streak, dash.level, dash.level_xp
            );
            match dash.today_calories {
                Some(kcal) => println!("Calories today: {kcal} kcal"),
                None => println!("Calories today: --"),
            }
            let week: Vec<String> = dash
                .weekly
                .iter()
                .map(|(label, n)| format!("{label} {n}"))
                .collect();
            println!("{}", week.join("  "));
            for line in &dash.insights {
                println!("{line}");
            }
        }
        Command::Timeline { action } => {
            app.set_last_view("timeline")?;
            match action.unwrap_or(TimelineAction::List) {
                TimelineAction::Add { note, photo } => {
                    let photo = photo.map(timeline::photo_from_path).transpose()?;
                    let note = note.unwrap_or_default();
                    let result = timeline::add_entry(app.store_mut(), now, &note, photo);
                    let entry = shown(&mut app, result)?;
                    println!("Saved {}.", entry.id);
                }
                TimelineAction::List => {
                    for e in timeline::list_entries(app.store())? {
                        let photo = e
                            .photo
                            .as_ref()
                            .map(|p| format!("  [{} {} bytes]", p.mime, p.bytes.len()))
                            .unwrap_or_default();
                        println!(
                            "{}  {}  {}{photo}",
                            e.id,
                            e.date.get(..10).unwrap_or(&e.date),
                            e.note
                        );
                    }
                }
                TimelineAction::Delete { id } => {
                    let result = timeline::delete_entry(app.store_mut(), &id);
                    shown(&mut app, result)?;
                    println!("Deleted {id}.");
                }
            }
        }
        Command::Profile { name } => match name {
            Some(name) => app.set_username(&name)?,
            None => {
                let p = app.profile();
                println!(
                    "{} - level {} - {} XP",
                    if p.username.is_empty() { "Athlete" } else { p.username.as_str() },
                    p.level,
                    p.total_xp
                );
            }
        },
        Command::Settings { rest } => app.set_rest_duration(rest)?,
        Command::Export { path } => {
            let data = app.export()?;
            backup::write_json(&data, &path)?;
            println!("Backup written to {}", path.display());
        }
        Command::Import { path } => {
            let data = backup::read_backup(&path)?;
            app.restore(&data, now)?;
        }
        Command::Reset { yes } => {
            if yes {
                app.reset(now)?;
            } else {
                println!("This deletes all local data. Pass --yes to confirm.");
            }
        }
        Command::Csv { path } => {
            backup::save_workouts_csv(&path, &app.workouts()?)?;
            println!("CSV written to {}", path.display());
        }
        Command::Report { path } => {
            let dash = app.dashboard(local_day(now))?;
            report::export_history_report(&path, &dash, &app.workouts()?, app.profile())?;
            println!("Report written to {}", path.display());
        }
        Command::Tools(_) => {}
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        let already_shown = e
            .downcast_ref::<TrackerError>()
            .is_some_and(TrackerError::is_user_error);
        if !already_shown {
            eprintln!("Error: {e}");
        }
        std::process::exit(1);
    }
}
