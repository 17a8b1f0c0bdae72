use chrono::{Datelike, NaiveDate};
use phf::phf_map;

use crate::error::TrackerError;
use crate::model::{DayPlan, Settings};
use crate::store::Store;

pub const WEEK_DAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
pub const MAX_RECENT_EXERCISES: usize = 6;

/// Exercises per weekday, Monday first.
type WeekTemplate = [&'static [&'static str]; 7];

pub static SPLIT_TEMPLATES: phf::Map<&'static str, WeekTemplate> = phf_map! {
    "Bro Split" => [
        &["Bench Press", "Incline DB Press", "Cable Fly"],
        &["Deadlift", "Barbell Row", "Lat Pulldown"],
        &["Overhead Press", "Lateral Raise", "Rear Delt Fly"],
        &["Barbell Curl", "Tricep Pushdown", "Hammer Curl"],
        &["Squat", "Leg Press", "Calf Raise"],
        &["Plank", "Hanging Leg Raise", "Cable Crunch"],
        &[],
    ],
    "Push / Pull / Legs" => [
        &["Bench Press", "Overhead Press", "Tricep Pushdown"],
        &["Deadlift", "Pull-up", "Barbell Row"],
        &["Squat", "Hamstring Curl", "Calf Raise"],
        &["Incline Press", "Dips", "Lateral Raise"],
        &["Lat Pulldown", "Seated Row", "Face Pull"],
        &["Leg Press", "Split Squat", "Calf Raise"],
        &[],
    ],
    "Upper / Lower" => [
        &["Bench Press", "Barbell Row", "Overhead Press"],
        &["Squat", "Romanian Deadlift", "Calf Raise"],
        &[],
        &["Incline Press", "Pull-up", "Lateral Raise"],
        &["Deadlift", "Leg Press", "Hamstring Curl"],
        &[],
        &[],
    ],
    "Full Body" => [
        &["Squat", "Bench Press", "Barbell Row"],
        &[],
        &["Deadlift", "Overhead Press", "Pull-up"],
        &[],
        &["Leg Press", "Incline Press", "Lat Pulldown"],
        &[],
        &[],
    ],
};

pub const EXERCISE_LIBRARY: [&str; 26] = [
    "Bench Press",
    "Incline DB Press",
    "Cable Fly",
    "Deadlift",
    "Barbell Row",
    "Lat Pulldown",
    "Overhead Press",
    "Lateral Raise",
    "Rear Delt Fly",
    "Barbell Curl",
    "Hammer Curl",
    "Tricep Pushdown",
    "Squat",
    "Leg Press",
    "Calf Raise",
    "Plank",
    "Hanging Leg Raise",
    "Cable Crunch",
    "Pull-up",
    "Seated Row",
    "Face Pull",
    "Romanian Deadlift",
    "Split Squat",
    "Hamstring Curl",
    "Dips",
    "Incline Press",
];

/// Sorted names of the built-in splits.
pub fn split_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = SPLIT_TEMPLATES.keys().copied().collect();
    names.sort_unstable();
    names
}

pub fn is_known_split(split: &str) -> bool {
    SPLIT_TEMPLATES.contains_key(split)
}

/// Normalise a weekday to its three-letter label (`"monday"` -> `"Mon"`).
pub fn parse_day(day: &str) -> Option<&'static str> {
    let lower = day.trim().to_lowercase();
    WEEK_DAYS
        .iter()
        .copied()
        .find(|d| lower.starts_with(&d.to_lowercase()) && !lower.is_empty())
}

pub fn day_for_date(date: NaiveDate) -> &'static str {
    WEEK_DAYS[date.weekday().num_days_from_monday() as usize]
}

pub fn plan_key(split: &str, day: &str) -> String {
    format!("{split}:{day}")
}

pub fn template_for(split: &str, day: &str) -> Vec<String> {
    let Some(idx) = WEEK_DAYS.iter().position(|d| *d == day) else {
        return Vec::new();
    };
    SPLIT_TEMPLATES
        .get(split)
        .map(|week| week[idx].iter().map(|s| s.to_string()).collect())
        .unwrap_or_default()
}

/// Exercises scheduled for `split`/`day`.
///
/// A saved custom plan always wins, even when it is empty.
pub fn plan_exercises<S: Store>(store: &S, split: &str, day: &str) -> Result<Vec<String>, TrackerError> {
    match store.fetch::<DayPlan>(&plan_key(split, day))? {
        Some(plan) => Ok(plan.exercises),
        None => Ok(template_for(split, day)),
    }
}

pub fn save_plan<S: Store>(
    store: &mut S,
    split: &str,
    day: &str,
    exercises: Vec<String>,
) -> Result<(), TrackerError> {
    let plan = DayPlan {
        key: plan_key(split, day),
        exercises,
    };
    store.save(&plan)?;
    log::info!("Saved plan {} ({} exercises)", plan.key, plan.exercises.len());
    Ok(())
}

/// Move `name` to the front of the recent list, keeping it unique and short.
pub fn remember_recent(settings: &mut Settings, name: &str) {
    settings.recent_exercises.retain(|e| e != name);
    settings.recent_exercises.insert(0, name.to_string());
    settings.recent_exercises.truncate(MAX_RECENT_EXERCISES);
}

/// Exercise picker options: recent exercises, then the library, filtered by
/// a case-insensitive substring and ranked by similarity to the query.
pub fn suggest_exercises(recent: &[String], query: &str) -> Vec<String> {
    let mut options: Vec<String> = Vec::new();
    for name in recent
        .iter()
        .map(String::as_str)
        .chain(EXERCISE_LIBRARY.iter().copied())
    {
        if !options.iter().any(|o| o == name) {
            options.push(name.to_string());
        }
    }

    let filter = query.trim().to_lowercase();
    if filter.is_empty() {
        return options;
    }
    let mut matches: Vec<(f64, usize, String)> = options
        .into_iter()
        .enumerate()
        .filter(|(_, name)| name.to_lowercase().contains(&filter))
        .map(|(i, name)| (strsim::jaro_winkler(&filter, &name.to_lowercase()), i, name))
        .collect();
    matches.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
    matches.into_iter().map(|(_, _, name)| name).collect()
}
