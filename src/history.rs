// Finished workouts: in-place edits and the dashboard built from them

use chrono::NaiveDate;
use serde::Serialize;

use crate::analysis::{
    calculate_calories_burned, calculate_streak, level_for, level_progress, summarize,
    today_totals, weekly_counts,
};
use crate::error::TrackerError;
use crate::model::{CompletedWorkout, LoggedExercise, Profile};
use crate::store::Store;

/// Replacement data for a finished workout.
///
/// `duration_minutes` and `xp` are taken as given when present; every other
/// aggregate is recomputed from `exercises`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkoutEdit {
    pub exercises: Vec<LoggedExercise>,
    pub duration_minutes: Option<u64>,
    pub xp: Option<u64>,
}

fn validate_edit(edit: &WorkoutEdit) -> Result<(), TrackerError> {
    for ex in &edit.exercises {
        if ex.name.trim().is_empty() {
            return Err(TrackerError::InvalidInput("Exercise name is required.".into()));
        }
        for set in &ex.sets {
            let bad = |v: Option<f64>| v.is_some_and(|x| !x.is_finite() || x < 0.0);
            if bad(set.weight) || bad(set.reps) {
                return Err(TrackerError::InvalidInput(format!(
                    "Invalid weight or reps for {}.",
                    ex.name
                )));
            }
        }
    }
    if edit.duration_minutes == Some(0) {
        return Err(TrackerError::InvalidInput("Duration must be at least 1 minute.".into()));
    }
    Ok(())
}

/// Apply an edit to a workout, keeping its identity and timestamps.
pub fn reconcile(workout: &CompletedWorkout, edit: &WorkoutEdit) -> CompletedWorkout {
    let mut out = workout.clone();
    out.exercises = edit.exercises.clone();
    let summary = summarize(&out.exercises);
    out.exercises_count = summary.exercises_count;
    out.total_sets = summary.total_sets;
    out.total_reps = summary.total_reps;
    out.total_volume = summary.total_volume;

    if let Some(minutes) = edit.duration_minutes {
        out.duration = minutes;
        out.duration_seconds = minutes * 60;
    }
    if let Some(xp) = edit.xp {
        out.xp = xp;
    }
    let seconds = if out.duration_seconds > 0 {
        out.duration_seconds
    } else {
        out.duration * 60
    };
    out.calories_burned = calculate_calories_burned(out.total_volume, seconds as f64);
    out
}

/// Edit a stored workout in place.
pub fn edit_workout<S: Store>(
    store: &mut S,
    id: &str,
    edit: &WorkoutEdit,
) -> Result<CompletedWorkout, TrackerError> {
    validate_edit(edit)?;
    let workout: CompletedWorkout = store
        .fetch(id)?
        .ok_or_else(|| TrackerError::NotFound(format!("workout {id}")))?;
    let updated = reconcile(&workout, edit);
    store.save(&updated)?;
    log::info!(
        "Edited workout {id}: {} sets, {} kg",
        updated.total_sets,
        updated.total_volume
    );
    Ok(updated)
}

/// All finished workouts, newest first.
pub fn list_workouts<S: Store>(store: &S) -> Result<Vec<CompletedWorkout>, TrackerError> {
    let mut workouts: Vec<CompletedWorkout> = store.fetch_all()?;
    workouts.sort_by(|a, b| b.start_time.cmp(&a.start_time).then(b.id.cmp(&a.id)));
    Ok(workouts)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dashboard {
    pub total_workouts: usize,
    pub streak: u32,
    pub weekly: Vec<(String, usize)>,
    pub insights: Vec<String>,
    /// `None` when nothing was lifted today.
    pub today_calories: Option<u32>,
    pub total_xp: u64,
    pub level: u64,
    pub level_xp: u64,
}

/// Lines describing the most recent workout.
pub fn insights(workouts: &[CompletedWorkout]) -> Vec<String> {
    let Some(last) = workouts.iter().max_by(|a, b| {
        a.start_time.cmp(&b.start_time).then(a.id.cmp(&b.id))
    }) else {
        return vec!["Complete a workout to unlock insights.".to_string()];
    };
    vec![
        format!("Last workout: {} min - {} sets", last.duration, last.total_sets),
        format!("Total volume: {} kg", last.total_volume),
        format!("XP earned: {}", last.xp),
    ]
}

/// Rebuild every dashboard figure from the full workout list.
pub fn dashboard(workouts: &[CompletedWorkout], profile: &Profile, today: NaiveDate) -> Dashboard {
    let (volume, seconds) = today_totals(workouts, today);
    let today_calories = if volume > 0.0 {
        Some(calculate_calories_burned(volume, seconds as f64))
    } else {
        None
    };
    Dashboard {
        total_workouts: workouts.len(),
        streak: calculate_streak(workouts, today),
        weekly: weekly_counts(workouts, today),
        insights: insights(workouts),
        today_calories,
        total_xp: profile.total_xp,
        level: level_for(profile.total_xp),
        level_xp: level_progress(profile.total_xp),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LoggedSet;
    use crate::store::MemoryStore;

    fn stored_workout() -> CompletedWorkout {
        CompletedWorkout {
            id: "w_1".into(),
            date: "2024-03-10T09:00:00Z".into(),
            day: "Sun".into(),
            split: "Bro Split".into(),
            start_time: 1,
            end_time: 1_200_001,
            duration: 20,
            duration_seconds: 1200,
            exercises: vec![LoggedExercise {
                name: "Bench Press".into(),
                notes: String::new(),
                sets: vec![LoggedSet::new(100.0, 5.0)],
            }],
            exercises_count: 1,
            total_sets: 1,
            total_reps: 5.0,
            total_volume: 500.0,
            calories_burned: 78,
            xp: 110,
        }
    }

    fn edit_with(sets: Vec<LoggedSet>) -> WorkoutEdit {
        WorkoutEdit {
            exercises: vec![LoggedExercise {
                name: "Bench Press".into(),
                notes: String::new(),
                sets,
            }],
            ..WorkoutEdit::default()
        }
    }

    #[test]
    fn edit_recomputes_aggregates_in_place() {
        let mut store = MemoryStore::new();
        store.save(&stored_workout()).unwrap();

        let edit = edit_with(vec![
            LoggedSet::new(100.0, 5.0),
            LoggedSet::new(100.0, 5.0),
            LoggedSet::default(),
        ]);
        let updated = edit_workout(&mut store, "w_1", &edit).unwrap();
        assert_eq!(updated.id, "w_1");
        assert_eq!(updated.total_sets, 2);
        assert_eq!(updated.total_volume, 1000.0);
        assert_eq!(updated.calories_burned, 95);
        assert_eq!(updated.xp, 110);
        // empty set kept
        assert_eq!(updated.exercises[0].sets.len(), 3);

        let all = list_workouts(&store).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0], updated);
    }

    #[test]
    fn duration_and_xp_overrides_are_authoritative() {
        let edit = WorkoutEdit {
            duration_minutes: Some(60),
            xp: Some(5),
            ..edit_with(vec![LoggedSet::new(100.0, 10.0)])
        };
        let updated = reconcile(&stored_workout(), &edit);
        assert_eq!(updated.duration, 60);
        assert_eq!(updated.duration_seconds, 3600);
        assert_eq!(updated.xp, 5);
        assert_eq!(updated.calories_burned, 215);
    }

    #[test]
    fn reconcile_twice_is_stable() {
        let edit = edit_with(vec![LoggedSet::new(60.0, 8.0), LoggedSet::new(62.5, 6.0)]);
        let once = reconcile(&stored_workout(), &edit);
        let twice = reconcile(&once, &edit);
        assert_eq!(once, twice);
    }

    #[test]
    fn invalid_edits_leave_record_untouched() {
        let mut store = MemoryStore::new();
        store.save(&stored_workout()).unwrap();
        let edit = edit_with(vec![LoggedSet {
            weight: Some(-10.0),
            reps: Some(5.0),
            done: true,
        }]);
        assert!(matches!(
            edit_workout(&mut store, "w_1", &edit),
            Err(TrackerError::InvalidInput(_))
        ));
        let stored: CompletedWorkout = store.fetch("w_1").unwrap().unwrap();
        assert_eq!(stored, stored_workout());

        let missing = edit_workout(&mut store, "w_404", &edit_with(vec![]));
        assert!(matches!(missing, Err(TrackerError::NotFound(_))));
    }

    #[test]
    fn stored_workout_with_null_totals_is_still_listed() {
        let mut store = MemoryStore::new();
        store
            .put(
                crate::store::Collection::Workouts,
                "w_1",
                serde_json::json!({"id": "w_1", "date": "2024-03-10T09:00:00Z", "totalVolume": null, "xp": "abc"}),
            )
            .unwrap();
        let listed = list_workouts(&store).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].total_volume, 0.0);
        assert_eq!(listed[0].xp, 0);

        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let dash = dashboard(&listed, &Profile::new(), today);
        assert_eq!(dash.total_workouts, 1);
        assert_eq!(dash.today_calories, None);
    }

    #[test]
    fn dashboard_from_scratch() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let mut yesterday = stored_workout();
        yesterday.id = "w_0".into();
        yesterday.date = "2024-03-09".into();
        let mut latest = stored_workout();
        latest.id = "w_2".into();
        latest.date = "2024-03-10".into();
        latest.start_time = 10;
        let profile = Profile {
            username: "a".into(),
            total_xp: 2150,
            level: 3,
        };
        let d = dashboard(&[yesterday, latest], &profile, today);
        assert_eq!(d.total_workouts, 2);
        assert_eq!(d.streak, 2);
        assert_eq!(d.level, 3);
        assert_eq!(d.level_xp, 150);
        assert_eq!(d.today_calories, Some(78));
        assert_eq!(d.insights[0], "Last workout: 20 min - 1 sets");
    }

    #[test]
    fn empty_history_insight() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let d = dashboard(&[], &Profile::new(), today);
        assert_eq!(d.insights, vec!["Complete a workout to unlock insights."]);
        assert_eq!(d.today_calories, None);
        assert_eq!(d.level, 1);
    }
}
