// Derived metrics shared by live sessions and history edits
use chrono::{DateTime, Datelike, Days, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::model::{CompletedWorkout, ExerciseRecord, LoggedExercise, LoggedSet, PrEntry, Profile};

pub const MAX_PRS: usize = 5;
pub const SET_XP: u64 = 10;
pub const COMPLETION_XP: u64 = 100;
pub const XP_PER_LEVEL: u64 = 1000;
pub const MIN_CALORIES: f64 = 10.0;
pub const MAX_CALORIES: f64 = 1200.0;

/// Totals over the valid sets of a workout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSummary {
    pub exercises_count: usize,
    pub total_sets: usize,
    pub total_reps: f64,
    pub total_volume: f64,
}

/// A set counts when its weight is a finite number `>= 0` and its reps a
/// finite number `> 0`. Other sets stay stored but are never totalled.
pub fn is_valid_set(set: &LoggedSet) -> bool {
    let weight_ok = set.weight.is_some_and(|w| w.is_finite() && w >= 0.0);
    let reps_ok = set.reps.is_some_and(|r| r.is_finite() && r > 0.0);
    weight_ok && reps_ok
}

pub fn summarize(exercises: &[LoggedExercise]) -> WorkoutSummary {
    let mut summary = WorkoutSummary::default();
    for ex in exercises {
        let mut any_valid = false;
        for set in ex.sets.iter().filter(|s| is_valid_set(s)) {
            let weight = set.weight.unwrap_or(0.0);
            let reps = set.reps.unwrap_or(0.0);
            any_valid = true;
            summary.total_sets += 1;
            summary.total_reps += reps;
            summary.total_volume += weight * reps;
        }
        if any_valid {
            summary.exercises_count += 1;
        }
    }
    summary
}

/// Estimate the calories burned for a session.
///
/// `volume` is in kilograms, `duration_secs` in seconds. The result is
/// clamped to `[10, 1200]`.
pub fn calculate_calories_burned(volume: f64, duration_secs: f64) -> u32 {
    let duration_min = (duration_secs / 60.0).round().max(1.0);
    let raw = if volume.is_finite() && volume != 0.0 {
        (volume * 0.035 + duration_min * 3.0).round()
    } else {
        (duration_min * 2.0).round()
    };
    raw.clamp(MIN_CALORIES, MAX_CALORIES) as u32
}

/// Whether a completed set beats the exercise's last logged weight or reps.
pub fn is_pr(prior: Option<&ExerciseRecord>, weight: f64, reps: f64) -> bool {
    let last_weight = prior.and_then(|p| p.last_weight).unwrap_or(0.0);
    let last_reps = prior.and_then(|p| p.last_reps).unwrap_or(0.0);
    weight > last_weight || reps > last_reps
}

/// Fold a set completion into an exercise record.
///
/// Returns the updated record and whether the set was a PR. A PR is
/// prepended to the history, which is then cut to [`MAX_PRS`].
pub fn record_set_completion(
    prior: Option<&ExerciseRecord>,
    name: &str,
    set: &LoggedSet,
    date: &str,
) -> (ExerciseRecord, bool) {
    let weight = set.weight.unwrap_or(0.0);
    let reps = set.reps.unwrap_or(0.0);
    let pr = is_pr(prior, weight, reps);

    let mut record = prior.cloned().unwrap_or_else(|| ExerciseRecord::new(name));
    record.name = name.to_string();
    if pr {
        record.prs.insert(
            0,
            PrEntry {
                weight,
                reps,
                date: date.to_string(),
            },
        );
    }
    record.prs.truncate(MAX_PRS);
    record.last_weight = Some(weight);
    record.last_reps = Some(reps);
    (record, pr)
}

pub fn level_for(total_xp: u64) -> u64 {
    total_xp / XP_PER_LEVEL + 1
}

/// XP earned inside the current level, out of [`XP_PER_LEVEL`].
pub fn level_progress(total_xp: u64) -> u64 {
    total_xp % XP_PER_LEVEL
}

/// XP credited to a finished workout record.
pub fn workout_xp(total_sets: usize) -> u64 {
    COMPLETION_XP + total_sets as u64 * SET_XP
}

pub fn apply_xp(profile: &Profile, amount: u64) -> Profile {
    let total_xp = profile.total_xp.saturating_add(amount);
    Profile {
        username: profile.username.clone(),
        total_xp,
        level: level_for(total_xp),
    }
}

/// Calendar day of a stored workout date in local time.
///
/// Accepts RFC 3339 timestamps and plain `YYYY-MM-DD` dates. Anything else is
/// ignored by the callers.
pub fn workout_day(date: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(date) {
        return Some(dt.with_timezone(&Local).date_naive());
    }
    let prefix = date.get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

/// Consecutive days, counting back from `today`, with at least one workout.
pub fn calculate_streak(workouts: &[CompletedWorkout], today: NaiveDate) -> u32 {
    let days: HashSet<NaiveDate> = workouts.iter().filter_map(|w| workout_day(&w.date)).collect();
    let mut streak = 0;
    let mut current = today;
    while days.contains(&current) {
        streak += 1;
        match current.checked_sub_days(Days::new(1)) {
            Some(prev) => current = prev,
            None => break,
        }
    }
    streak
}

/// Workout counts for the seven days ending at `today`, oldest first,
/// labelled with the short weekday name.
pub fn weekly_counts(workouts: &[CompletedWorkout], today: NaiveDate) -> Vec<(String, usize)> {
    (0..7u64)
        .rev()
        .filter_map(|offset| today.checked_sub_days(Days::new(offset)))
        .map(|day| {
            let count = workouts
                .iter()
                .filter(|w| workout_day(&w.date) == Some(day))
                .count();
            (day.weekday().to_string(), count)
        })
        .collect()
}

/// Volume and duration logged on `today`.
pub fn today_totals(workouts: &[CompletedWorkout], today: NaiveDate) -> (f64, u64) {
    workouts
        .iter()
        .filter(|w| workout_day(&w.date) == Some(today))
        .fold((0.0, 0), |(volume, secs), w| {
            let v = if w.total_volume.is_finite() { w.total_volume } else { 0.0 };
            let d = if w.duration_seconds > 0 {
                w.duration_seconds
            } else {
                w.duration * 60
            };
            (volume + v, secs + d)
        })
}
