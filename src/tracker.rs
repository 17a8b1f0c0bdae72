// Orchestration of session, rest timer, store and presenter

use chrono::{DateTime, Local, NaiveDate};

use crate::analysis::{self, SET_XP};
use crate::backup::{self, Backup};
use crate::error::TrackerError;
use crate::history::{self, Dashboard, WorkoutEdit};
use crate::model::{
    CompletedWorkout, ExerciseRecord, LoggedExercise, LoggedSet, Profile, Settings, PROFILE_KEY,
    SETTINGS_KEY,
};
use crate::plans;
use crate::presenter::{ExerciseView, Presenter};
use crate::rest_timer::{RestEvent, RestTimer};
use crate::session::{self, Phase, ResumeDecision, Session};
use crate::store::{Collection, Store};

pub const REST_DONE: &str = "Rest over. Next set!";

/// Local time for an epoch-millisecond timestamp.
pub fn local_time(now_ms: i64) -> DateTime<Local> {
    DateTime::from_timestamp_millis(now_ms)
        .unwrap_or_default()
        .with_timezone(&Local)
}

pub fn local_day(now_ms: i64) -> NaiveDate {
    local_time(now_ms).date_naive()
}

/// Result of logging one set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetOutcome {
    pub set_index: usize,
    pub is_pr: bool,
    pub xp_awarded: u64,
}

/// Coordinates the session, the rest timer, the store and the presenter.
///
/// Methods take the current wall-clock time in epoch milliseconds so hosts
/// and tests control time explicitly.
pub struct Tracker<S: Store, P: Presenter> {
    store: S,
    presenter: P,
    settings: Settings,
    profile: Profile,
    day: String,
    session: Session,
    rest: RestTimer,
    settled_on_boot: Option<ResumeDecision>,
}

impl<S: Store, P: Presenter> Tracker<S, P> {
    /// Load settings and profile (creating defaults) and restore any
    /// checkpointed session.
    ///
    /// `day` overrides the weekday derived from `now_ms`. Without a `policy`
    /// a restored session waits in the awaiting-decision state behind a
    /// prompt. Hosts that cannot ask pass a `policy`, which settles it at
    /// once without prompting.
    pub fn boot(
        store: S,
        presenter: P,
        now_ms: i64,
        day: Option<&str>,
        policy: Option<ResumeDecision>,
    ) -> Result<Self, TrackerError> {
        let day = day
            .map(str::to_string)
            .unwrap_or_else(|| plans::day_for_date(local_day(now_ms)).to_string());
        let mut tracker = Self {
            store,
            presenter,
            settings: Settings::default(),
            profile: Profile::new(),
            session: Session::idle("", &day),
            day,
            rest: RestTimer::new(crate::model::DEFAULT_REST_SECS),
            settled_on_boot: None,
        };
        tracker.bootstrap(now_ms, policy.is_none())?;
        if let (Some(policy), Some(elapsed)) = (policy, tracker.pending_elapsed_ms()) {
            log::info!(
                "Settling unfinished workout ({} s) with {policy:?}",
                elapsed / 1000
            );
            match policy {
                ResumeDecision::Continue => {
                    let result = tracker.resume_inner(now_ms, false);
                    tracker.report(result)?;
                }
                ResumeDecision::Discard => tracker.decide(policy, now_ms)?,
            }
            tracker.settled_on_boot = Some(policy);
        }
        Ok(tracker)
    }

    fn bootstrap(&mut self, now_ms: i64, prompt: bool) -> Result<(), TrackerError> {
        self.settings = self.store.fetch(SETTINGS_KEY)?.unwrap_or_default();
        self.store.save(&self.settings)?;

        let mut profile: Profile = self.store.fetch(PROFILE_KEY)?.unwrap_or_else(Profile::new);
        profile.level = analysis::level_for(profile.total_xp);
        self.store.save(&profile)?;
        self.profile = profile;

        self.rest = RestTimer::new(self.settings.rest_duration);

        let restored = self
            .settings
            .current_workout
            .as_ref()
            .and_then(|snap| Session::from_snapshot(snap, now_ms));
        match restored {
            Some(session) => {
                log::info!(
                    "Found unfinished workout from {} ({} s ago)",
                    session.day(),
                    session.elapsed_ms(now_ms) / 1000
                );
                self.day = session.day().to_string();
                self.session = session;
                if prompt {
                    self.presenter
                        .notify("Unfinished workout found. Continue or discard?");
                }
            }
            None => {
                self.session = Session::idle(&self.settings.split, &self.day);
                self.load_day_plan()?;
            }
        }
        self.render()?;
        Ok(())
    }

    /// Send user errors to the presenter and storage errors to the log.
    fn report<T>(&mut self, result: Result<T, TrackerError>) -> Result<T, TrackerError> {
        if let Err(e) = &result {
            if e.is_user_error() {
                self.presenter.notify(&e.to_string());
            } else {
                log::error!("{e}");
            }
        }
        result
    }

    fn exercise_record(&self, name: &str) -> Result<Option<ExerciseRecord>, TrackerError> {
        Ok(self.store.fetch(name)?)
    }

    fn load_day_plan(&mut self) -> Result<(), TrackerError> {
        let names = plans::plan_exercises(&self.store, &self.settings.split, &self.day)?;
        let mut exercises = Vec::with_capacity(names.len());
        for name in names {
            let notes = self
                .exercise_record(&name)?
                .map(|r| r.notes)
                .unwrap_or_default();
            exercises.push(LoggedExercise {
                name,
                notes,
                sets: Vec::new(),
            });
        }
        let split = self.settings.split.clone();
        let day = self.day.clone();
        self.session.plan(&split, &day, exercises);
        Ok(())
    }

    /// Push the current exercise list to the presenter.
    pub fn render(&mut self) -> Result<(), TrackerError> {
        let mut views = Vec::new();
        for ex in self.session.exercises() {
            let record = self.exercise_record(&ex.name)?;
            let last = record
                .as_ref()
                .and_then(|r| Some((r.last_weight?, r.last_reps?)));
            views.push(ExerciseView {
                name: ex.name.clone(),
                notes: ex.notes.clone(),
                last,
                best: record.as_ref().and_then(|r| r.best().cloned()),
                sets: ex.sets.clone(),
            });
        }
        let split = self.session.split().to_string();
        let day = self.session.day().to_string();
        self.presenter.render_exercise_list(&split, &day, &views);
        Ok(())
    }

    /// Write the live session into the settings record (last write wins).
    pub fn checkpoint(&mut self) -> Result<(), TrackerError> {
        self.settings.current_workout = self.session.snapshot();
        if let Err(e) = self.store.save(&self.settings) {
            log::error!("Checkpoint write failed: {e}");
            return Err(e.into());
        }
        Ok(())
    }

    fn clear_checkpoint(&mut self) -> Result<(), TrackerError> {
        let mut settings = self.settings.clone();
        settings.current_workout = None;
        self.save_settings(settings)
    }

    /// Persist `settings`, adopting them only once the write succeeded.
    fn save_settings(&mut self, settings: Settings) -> Result<(), TrackerError> {
        self.store.save(&settings)?;
        self.settings = settings;
        Ok(())
    }

    fn award_xp(&mut self, amount: u64) -> Result<(), TrackerError> {
        let updated = analysis::apply_xp(&self.profile, amount);
        self.store.save(&updated)?;
        self.profile = updated;
        self.presenter.notify(&format!("+{amount} XP"));
        Ok(())
    }

    pub fn start(&mut self, now_ms: i64) -> Result<(), TrackerError> {
        let result = self.start_inner(now_ms);
        self.report(result)
    }

    fn start_inner(&mut self, now_ms: i64) -> Result<(), TrackerError> {
        if !self.session.start(now_ms)? {
            return Err(TrackerError::SessionAlreadyActive);
        }
        if let Err(e) = self.checkpoint() {
            self.session.abort_start();
            self.settings.current_workout = None;
            return Err(e);
        }
        log::info!("Workout started: {} {}", self.session.split(), self.session.day());
        self.presenter.notify("Workout started.");
        Ok(())
    }

    /// Mark a set done. Missing values fall back to the exercise's last
    /// weight/reps. Starts the workout if none is running.
    pub fn complete_set(
        &mut self,
        now_ms: i64,
        exercise: &str,
        weight: Option<f64>,
        reps: Option<f64>,
    ) -> Result<SetOutcome, TrackerError> {
        let result = self.complete_set_inner(now_ms, exercise, weight, reps);
        self.report(result)
    }

    fn complete_set_inner(
        &mut self,
        now_ms: i64,
        exercise: &str,
        weight: Option<f64>,
        reps: Option<f64>,
    ) -> Result<SetOutcome, TrackerError> {
        let exercise = exercise.trim();
        if exercise.is_empty() {
            return Err(TrackerError::InvalidInput("Exercise name is required.".into()));
        }
        let prior = self.exercise_record(exercise)?;
        let set = session::validate_set(
            weight.or(prior.as_ref().and_then(|p| p.last_weight)),
            reps.or(prior.as_ref().and_then(|p| p.last_reps)),
        )?;
        if self.session.is_idle() {
            self.start_inner(now_ms)?;
        }
        if let Phase::AwaitingDecision { .. } = self.session.phase() {
            return Err(TrackerError::ResumePending);
        }

        let date = local_time(now_ms).to_rfc3339();
        let (mut record, is_pr) =
            analysis::record_set_completion(prior.as_ref(), exercise, &set, &date);
        if let Some(ex) = self.session.exercise(exercise) {
            record.notes = ex.notes.clone();
        }
        self.store.save(&record)?;
        if is_pr {
            self.presenter.notify("PR! New personal best.");
        }

        let set_index = self.session.log_set(exercise, set);
        self.award_xp(SET_XP)?;
        self.rest.start(now_ms, self.settings.rest_duration);
        self.checkpoint()?;
        Ok(SetOutcome {
            set_index,
            is_pr,
            xp_awarded: SET_XP,
        })
    }

    /// Change the numbers of an already logged set.
    pub fn update_set(
        &mut self,
        exercise: &str,
        index: usize,
        weight: Option<f64>,
        reps: Option<f64>,
    ) -> Result<(), TrackerError> {
        let result = self.update_set_inner(exercise, index, weight, reps);
        self.report(result)
    }

    fn update_set_inner(
        &mut self,
        exercise: &str,
        index: usize,
        weight: Option<f64>,
        reps: Option<f64>,
    ) -> Result<(), TrackerError> {
        if !self.session.is_in_progress() {
            return Err(TrackerError::NoActiveSession);
        }
        let set = session::validate_set(weight, reps)?;
        self.session.update_set(exercise, index, set)?;
        self.checkpoint()
    }

    pub fn set_notes(&mut self, exercise: &str, notes: &str) -> Result<(), TrackerError> {
        let result = self.set_notes_inner(exercise, notes);
        self.report(result)
    }

    fn set_notes_inner(&mut self, exercise: &str, notes: &str) -> Result<(), TrackerError> {
        let mut record = self
            .exercise_record(exercise)?
            .unwrap_or_else(|| ExerciseRecord::new(exercise));
        record.notes = notes.to_string();
        self.store.save(&record)?;
        if self.session.exercise(exercise).is_some() {
            self.session.set_notes(exercise, notes)?;
            if self.session.is_in_progress() {
                self.checkpoint()?;
            }
        }
        Ok(())
    }

    /// Host went to the background.
    pub fn suspend(&mut self, now_ms: i64) -> Result<(), TrackerError> {
        self.session.suspend(now_ms);
        self.rest.on_background(now_ms);
        if self.session.is_in_progress() {
            self.checkpoint()?;
        }
        Ok(())
    }

    /// Host is visible again.
    pub fn foreground(&mut self, now_ms: i64) {
        self.session.foreground();
        match self.rest.on_foreground(now_ms) {
            Some(RestEvent::Finished) => self.presenter.alert(REST_DONE),
            Some(RestEvent::Tick { remaining }) => self.show_timers(now_ms, Some(remaining)),
            None => {}
        }
    }

    /// Per-second host callback.
    pub fn tick(&mut self, now_ms: i64) {
        let rest = match self.rest.tick() {
            Some(RestEvent::Finished) => {
                self.presenter.alert(REST_DONE);
                None
            }
            Some(RestEvent::Tick { remaining }) => Some(remaining),
            None => None,
        };
        if self.session.clock().is_running() || rest.is_some() {
            self.show_timers(now_ms, rest);
        }
    }

    /// Deferred rest deadline callback scheduled while in the background.
    pub fn fire_rest_deadline(&mut self, now_ms: i64) {
        if let Some(RestEvent::Finished) = self.rest.fire_deadline(now_ms) {
            self.presenter.alert(REST_DONE);
        }
    }

    fn show_timers(&mut self, now_ms: i64, rest: Option<u32>) {
        let secs = (self.session.elapsed_ms(now_ms) / 1000) as u64;
        self.presenter.render_timers(secs, rest);
    }

    /// Elapsed time of a restored session, if one is waiting for a decision.
    pub fn pending_elapsed_ms(&self) -> Option<i64> {
        match self.session.phase() {
            Phase::AwaitingDecision {
                pending_elapsed_ms,
                ..
            } => Some(pending_elapsed_ms),
            _ => None,
        }
    }

    pub fn decide(&mut self, decision: ResumeDecision, now_ms: i64) -> Result<(), TrackerError> {
        match decision {
            ResumeDecision::Continue => self.resume(now_ms),
            ResumeDecision::Discard => self.discard(),
        }
    }

    pub fn resume(&mut self, now_ms: i64) -> Result<(), TrackerError> {
        let result = self.resume_inner(now_ms, true);
        self.report(result)
    }

    fn resume_inner(&mut self, now_ms: i64, announce: bool) -> Result<(), TrackerError> {
        let started_at = self.session.resume(now_ms)?;
        self.checkpoint()?;
        log::info!("Workout resumed, start rebased to {started_at}");
        if announce {
            self.presenter.notify("Workout resumed.");
        }
        Ok(())
    }

    /// Throw the live session away without XP or history.
    pub fn discard(&mut self) -> Result<(), TrackerError> {
        let result = self.discard_inner();
        self.report(result)
    }

    fn discard_inner(&mut self) -> Result<(), TrackerError> {
        self.session.discard()?;
        self.rest.reset(crate::model::DEFAULT_REST_SECS);
        self.clear_checkpoint()?;
        self.session = Session::idle(&self.settings.split, &self.day);
        self.load_day_plan()?;
        self.render()?;
        log::info!("Workout discarded");
        self.presenter.notify("Workout discarded.");
        Ok(())
    }

    pub fn finish(&mut self, now_ms: i64) -> Result<CompletedWorkout, TrackerError> {
        let result = self.finish_inner(now_ms);
        self.report(result)
    }

    fn finish_inner(&mut self, now_ms: i64) -> Result<CompletedWorkout, TrackerError> {
        let split = self.session.split().to_string();
        let day = self.session.day().to_string();
        let before = self.session.clone();
        let (started_at, exercises) = self.session.finish()?;

        let duration_ms = (now_ms - started_at).max(0);
        let duration_seconds = (duration_ms / 1000) as u64;
        let duration = ((duration_ms + 59_999) / 60_000).max(1) as u64;
        let summary = analysis::summarize(&exercises);
        let workout = CompletedWorkout {
            id: format!("w_{now_ms}"),
            date: local_time(now_ms).to_rfc3339(),
            day,
            split,
            start_time: started_at,
            end_time: now_ms,
            duration,
            duration_seconds,
            exercises,
            exercises_count: summary.exercises_count,
            total_sets: summary.total_sets,
            total_reps: summary.total_reps,
            total_volume: summary.total_volume,
            calories_burned: analysis::calculate_calories_burned(
                summary.total_volume,
                duration_seconds as f64,
            ),
            xp: analysis::workout_xp(summary.total_sets),
        };

        if let Err(e) = self.store.save(&workout) {
            // nothing recorded, keep the session alive
            self.session = before;
            return Err(e.into());
        }
        if let Err(e) = self.clear_checkpoint() {
            // a surviving checkpoint would be finished a second time
            if let Err(undo) = self.store.delete(Collection::Workouts, &workout.id) {
                log::error!("Could not withdraw workout {}: {undo}", workout.id);
            }
            self.settings.current_workout = before.snapshot();
            self.session = before;
            return Err(e);
        }
        self.rest.stop();
        self.session = Session::idle(&self.settings.split, &self.day);
        if let Err(e) = self.award_xp(workout.xp) {
            log::error!("Workout {} saved without its {} XP", workout.id, workout.xp);
            return Err(e);
        }
        self.load_day_plan()?;
        log::info!(
            "Workout {} finished: {} sets, {} kg, {} min",
            workout.id,
            workout.total_sets,
            workout.total_volume,
            workout.duration
        );
        self.presenter.notify("Workout complete!");
        Ok(workout)
    }

    pub fn start_rest(&mut self, now_ms: i64, seconds: Option<u32>) {
        let seconds = seconds.unwrap_or(self.settings.rest_duration);
        self.rest.start(now_ms, seconds);
    }

    pub fn adjust_rest(&mut self, delta_secs: i32) {
        self.rest.adjust(delta_secs);
    }

    pub fn set_rest_duration(&mut self, seconds: u32) -> Result<(), TrackerError> {
        let result = if seconds == 0 {
            Err(TrackerError::InvalidInput("Rest must be at least 1 second.".into()))
        } else {
            let mut settings = self.settings.clone();
            settings.rest_duration = seconds;
            self.save_settings(settings)
        };
        self.report(result)?;
        self.presenter.notify("Rest timer saved.");
        Ok(())
    }

    pub fn select_split(&mut self, split: &str) -> Result<(), TrackerError> {
        let result = if plans::is_known_split(split) {
            let mut settings = self.settings.clone();
            settings.split = split.to_string();
            self.save_settings(settings)
        } else {
            Err(TrackerError::InvalidInput(format!("Unknown split: {split}")))
        };
        self.report(result)?;
        if self.session.is_idle() {
            self.load_day_plan()?;
            self.render()?;
        }
        Ok(())
    }

    pub fn select_day(&mut self, day: &str) -> Result<(), TrackerError> {
        let result = plans::parse_day(day)
            .ok_or_else(|| TrackerError::InvalidInput(format!("Unknown day: {day}")));
        let day = self.report(result)?;
        self.day = day.to_string();
        if self.session.is_idle() {
            self.load_day_plan()?;
            self.render()?;
        }
        Ok(())
    }

    pub fn set_last_view(&mut self, view: &str) -> Result<(), TrackerError> {
        let mut settings = self.settings.clone();
        settings.last_view = view.to_string();
        self.save_settings(settings)
    }

    pub fn set_username(&mut self, name: &str) -> Result<(), TrackerError> {
        let mut profile = self.profile.clone();
        profile.username = name.trim().to_string();
        self.store.save(&profile)?;
        self.profile = profile;
        self.presenter.notify("Profile saved.");
        Ok(())
    }

    /// Exercises planned for the selected split and day.
    pub fn plan(&self) -> Result<Vec<String>, TrackerError> {
        plans::plan_exercises(&self.store, &self.settings.split, &self.day)
    }

    /// Append an exercise to the selected day's plan and to the live session.
    pub fn add_exercise(&mut self, name: &str) -> Result<(), TrackerError> {
        let name = name.trim();
        if name.is_empty() {
            return self.report(Err(TrackerError::InvalidInput("Enter an exercise name.".into())));
        }
        let mut exercises = self.plan()?;
        exercises.push(name.to_string());
        plans::save_plan(&mut self.store, &self.settings.split, &self.day, exercises)?;
        let mut settings = self.settings.clone();
        plans::remember_recent(&mut settings, name);
        self.save_settings(settings)?;

        if self.session.is_idle() {
            self.load_day_plan()?;
        } else if self.session.split() == self.settings.split && self.session.day() == self.day {
            let notes = self.exercise_record(name)?.map(|r| r.notes).unwrap_or_default();
            self.session.add_exercise(LoggedExercise {
                name: name.to_string(),
                notes,
                sets: Vec::new(),
            });
            if self.session.is_in_progress() {
                self.checkpoint()?;
            }
        }
        self.render()
    }

    /// Remove the exercise at `index` (zero based) from the day's plan.
    pub fn remove_exercise(&mut self, index: usize) -> Result<String, TrackerError> {
        let mut exercises = self.plan()?;
        if index >= exercises.len() {
            return self.report(Err(TrackerError::NotFound(format!(
                "exercise #{}",
                index + 1
            ))));
        }
        let removed = exercises.remove(index);
        plans::save_plan(&mut self.store, &self.settings.split, &self.day, exercises)?;
        if self.session.is_idle() {
            self.load_day_plan()?;
        } else if self.session.split() == self.settings.split && self.session.day() == self.day {
            self.session.remove_exercise(&removed);
            if self.session.is_in_progress() {
                self.checkpoint()?;
            }
        }
        self.render()?;
        Ok(removed)
    }

    pub fn suggestions(&self, query: &str) -> Vec<String> {
        plans::suggest_exercises(&self.settings.recent_exercises, query)
    }

    pub fn workouts(&self) -> Result<Vec<CompletedWorkout>, TrackerError> {
        history::list_workouts(&self.store)
    }

    /// Edit a finished workout and return the refreshed dashboard.
    pub fn edit_workout(
        &mut self,
        id: &str,
        edit: &WorkoutEdit,
        today: NaiveDate,
    ) -> Result<(CompletedWorkout, Dashboard), TrackerError> {
        let result = history::edit_workout(&mut self.store, id, edit);
        let updated = self.report(result)?;
        self.presenter.notify("Workout updated.");
        Ok((updated, self.dashboard(today)?))
    }

    pub fn dashboard(&self, today: NaiveDate) -> Result<Dashboard, TrackerError> {
        let workouts = history::list_workouts(&self.store)?;
        Ok(history::dashboard(&workouts, &self.profile, today))
    }

    pub fn export(&self) -> Result<Backup, TrackerError> {
        Ok(backup::export(&self.store)?)
    }

    /// Merge a backup into the store and boot again from it.
    pub fn restore(&mut self, data: &Backup, now_ms: i64) -> Result<(), TrackerError> {
        backup::import(&mut self.store, data)?;
        self.rest.stop();
        self.bootstrap(now_ms, true)?;
        self.presenter.notify("Backup restored.");
        Ok(())
    }

    /// Delete everything and boot from defaults.
    pub fn reset(&mut self, now_ms: i64) -> Result<(), TrackerError> {
        backup::reset(&mut self.store)?;
        self.rest.stop();
        self.bootstrap(now_ms, true)?;
        self.presenter.notify("Data reset.");
        Ok(())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn rest(&self) -> &RestTimer {
        &self.rest
    }

    pub fn day(&self) -> &str {
        &self.day
    }

    /// Decision applied by [`Tracker::boot`] to a restored workout.
    pub fn settled_on_boot(&self) -> Option<ResumeDecision> {
        self.settled_on_boot
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    pub fn record_for(&self, exercise: &str) -> Result<Option<ExerciseRecord>, TrackerError> {
        self.exercise_record(exercise)
    }

    /// Build a set value for display defaults.
    pub fn prefill(&self, exercise: &str) -> Result<LoggedSet, TrackerError> {
        let record = self.exercise_record(exercise)?;
        Ok(LoggedSet {
            weight: record.as_ref().and_then(|r| r.last_weight),
            reps: record.as_ref().and_then(|r| r.last_reps),
            done: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::model::SessionSnapshot;
    use crate::presenter::testing::RecordingPresenter;
    use crate::store::{Collection, MemoryStore};
    use serde_json::Value;

    const T0: i64 = 1_710_158_400_000;
    const MIN: i64 = 60_000;

    type TestTracker = Tracker<MemoryStore, RecordingPresenter>;

    fn boot(store: MemoryStore, now: i64) -> TestTracker {
        Tracker::boot(store, RecordingPresenter::default(), now, Some("Mon"), None).unwrap()
    }

    /// Store whose writes can be switched off, globally or per collection.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_writes: bool,
        fail_collection: Option<Collection>,
    }

    impl Store for FlakyStore {
        fn get(&self, c: Collection, key: &str) -> Result<Option<Value>, StoreError> {
            self.inner.get(c, key)
        }
        fn put(&mut self, c: Collection, key: &str, record: Value) -> Result<(), StoreError> {
            if self.fail_writes || self.fail_collection == Some(c) {
                return Err(StoreError::Unavailable("disk full".into()));
            }
            self.inner.put(c, key, record)
        }
        fn get_all(&self, c: Collection) -> Result<Vec<Value>, StoreError> {
            self.inner.get_all(c)
        }
        fn delete(&mut self, c: Collection, key: &str) -> Result<(), StoreError> {
            self.inner.delete(c, key)
        }
        fn clear(&mut self, c: Collection) -> Result<(), StoreError> {
            self.inner.clear(c)
        }
    }

    #[test]
    fn boot_creates_defaults_and_renders_plan() {
        let t = boot(MemoryStore::new(), T0);
        assert_eq!(t.settings().split, "Bro Split");
        assert_eq!(t.profile().level, 1);
        assert!(t.store().fetch::<Settings>(SETTINGS_KEY).unwrap().is_some());
        let (split, day, views) = t.presenter.lists.last().unwrap();
        assert_eq!(split, "Bro Split");
        assert_eq!(day, "Mon");
        assert_eq!(views.len(), 3);
        assert_eq!(views[0].name, "Bench Press");
        assert!(t.session().is_idle());
    }

    #[test]
    fn end_to_end_first_workout() {
        let mut t = boot(MemoryStore::new(), T0);
        t.start(T0).unwrap();
        let snap = t.settings().current_workout.clone().unwrap();
        assert_eq!(snap.start_time, Some(T0));
        assert_eq!(snap.split, "Bro Split");
        assert_eq!(snap.day, "Mon");

        let outcome = t
            .complete_set(T0 + MIN, "Bench Press", Some(100.0), Some(5.0))
            .unwrap();
        assert!(outcome.is_pr);
        assert_eq!(outcome.xp_awarded, 10);
        assert_eq!(t.profile().total_xp, 10);
        assert!(t.rest().is_active());
        assert_eq!(t.rest().remaining(), 90);

        // the checkpoint carries the logged set
        let stored: Settings = t.store().fetch(SETTINGS_KEY).unwrap().unwrap();
        let bench = &stored.current_workout.unwrap().exercises[0];
        assert_eq!(bench.sets, vec![LoggedSet::new(100.0, 5.0)]);

        let w = t.finish(T0 + 20 * MIN).unwrap();
        assert_eq!(w.total_volume, 500.0);
        assert_eq!(w.total_sets, 1);
        assert_eq!(w.exercises_count, 1);
        assert_eq!(w.xp, 110);
        assert_eq!(w.duration, 20);
        assert_eq!(w.duration_seconds, 1200);
        assert_eq!(w.calories_burned, 78);
        assert_eq!(t.profile().total_xp, 120);
        assert!(!t.rest().is_active());

        let stored: Settings = t.store().fetch(SETTINGS_KEY).unwrap().unwrap();
        assert!(stored.current_workout.is_none());
        assert_eq!(t.workouts().unwrap(), vec![w]);
        assert!(t.presenter.notices.iter().any(|n| n == "PR! New personal best."));
        assert!(t.session().is_idle());

        let record = t.record_for("Bench Press").unwrap().unwrap();
        assert_eq!(record.prs.len(), 1);
    }

    #[test]
    fn finish_without_session_is_reported() {
        let mut t = boot(MemoryStore::new(), T0);
        assert!(matches!(t.finish(T0), Err(TrackerError::NoActiveSession)));
        assert_eq!(t.presenter.notices.last().unwrap(), "No workout in progress.");
        assert!(t.workouts().unwrap().is_empty());
        assert_eq!(t.profile().total_xp, 0);
    }

    #[test]
    fn empty_workout_still_records_completion_bonus() {
        let mut t = boot(MemoryStore::new(), T0);
        t.start(T0).unwrap();
        let w = t.finish(T0 + 10).unwrap();
        assert_eq!(w.total_sets, 0);
        assert_eq!(w.exercises_count, 0);
        assert_eq!(w.duration, 1);
        assert_eq!(w.xp, 100);
        assert_eq!(w.calories_burned, 10);
    }

    #[test]
    fn set_completion_starts_idle_session() {
        let mut t = boot(MemoryStore::new(), T0);
        t.complete_set(T0, "Cable Fly", Some(20.0), Some(12.0)).unwrap();
        assert_eq!(t.session().started_at(), Some(T0));
        assert!(t.settings().current_workout.is_some());
    }

    #[test]
    fn invalid_set_input_mutates_nothing() {
        let mut t = boot(MemoryStore::new(), T0);
        let err = t.complete_set(T0, "Bench Press", None, Some(5.0)).unwrap_err();
        assert!(matches!(err, TrackerError::InvalidInput(_)));
        assert!(t.session().is_idle());
        assert_eq!(t.profile().total_xp, 0);
        assert!(t.record_for("Bench Press").unwrap().is_none());
        assert_eq!(t.presenter.notices.last().unwrap(), "Enter weight.");
    }

    #[test]
    fn missing_values_use_last_logged() {
        let mut t = boot(MemoryStore::new(), T0);
        t.complete_set(T0, "Squat", Some(140.0), Some(3.0)).unwrap();
        let outcome = t.complete_set(T0 + MIN, "Squat", None, None).unwrap();
        assert!(!outcome.is_pr);
        assert_eq!(outcome.set_index, 1);
        assert_eq!(t.session().exercise("Squat").unwrap().sets[1].weight, Some(140.0));
        assert_eq!(t.prefill("Squat").unwrap().reps, Some(3.0));
    }

    #[test]
    fn restart_offers_resume_and_rebases() {
        let mut t = boot(MemoryStore::new(), T0);
        t.start(T0).unwrap();
        t.complete_set(T0 + MIN, "Bench Press", Some(80.0), Some(8.0)).unwrap();
        t.suspend(T0 + 300_000).unwrap();
        let store = std::mem::take(&mut t.store);

        let reopen = T0 + 305_000;
        let mut t = boot(store, reopen);
        assert_eq!(t.pending_elapsed_ms(), Some(305_000));
        assert!(t.presenter.notices.iter().any(|n| n.contains("Continue or discard")));
        assert!(matches!(t.start(reopen), Err(TrackerError::ResumePending)));

        t.decide(ResumeDecision::Continue, reopen).unwrap();
        assert_eq!(t.session().started_at(), Some(reopen - 305_000));
        let stored: Settings = t.store().fetch(SETTINGS_KEY).unwrap().unwrap();
        let snap = stored.current_workout.unwrap();
        assert_eq!(snap.start_time, Some(reopen - 305_000));
        assert_eq!(snap.exercises[0].sets.len(), 1);

        let w = t.finish(reopen + 5 * MIN).unwrap();
        assert_eq!(w.total_volume, 640.0);
    }

    #[test]
    fn discard_clears_checkpoint_without_history() {
        let mut store = MemoryStore::new();
        let settings = Settings {
            current_workout: Some(SessionSnapshot {
                split: "Full Body".into(),
                day: "Wed".into(),
                start_time: Some(T0),
                exercises: vec![],
            }),
            ..Settings::default()
        };
        store.save(&settings).unwrap();

        let mut t = boot(store, T0 + MIN);
        assert_eq!(t.day(), "Wed");
        t.decide(ResumeDecision::Discard, T0 + MIN).unwrap();
        assert!(t.session().is_idle());
        assert!(t.settings().current_workout.is_none());
        assert_eq!(t.rest().remaining(), 90);
        assert!(t.workouts().unwrap().is_empty());
        assert_eq!(t.profile().total_xp, 0);
        assert!(matches!(t.discard(), Err(TrackerError::NoActiveSession)));
    }

    #[test]
    fn failed_start_checkpoint_is_surfaced_and_rolled_back() {
        let store = FlakyStore::default();
        let mut t = Tracker::boot(store, RecordingPresenter::default(), T0, Some("Mon"), None).unwrap();
        t.store_mut().fail_writes = true;
        let err = t.start(T0).unwrap_err();
        assert!(matches!(err, TrackerError::Storage(_)));
        assert!(t.session().is_idle());
        assert!(t.settings().current_workout.is_none());
    }

    #[test]
    fn failed_finish_keeps_session() {
        let store = FlakyStore::default();
        let mut t = Tracker::boot(store, RecordingPresenter::default(), T0, Some("Mon"), None).unwrap();
        t.complete_set(T0, "Bench Press", Some(60.0), Some(10.0)).unwrap();
        t.store_mut().fail_writes = true;
        assert!(t.finish(T0 + MIN).is_err());
        assert!(t.session().is_in_progress());
        assert_eq!(t.session().exercises()[0].sets.len(), 1);

        t.store_mut().fail_writes = false;
        let w = t.finish(T0 + 2 * MIN).unwrap();
        assert_eq!(w.total_sets, 1);
    }

    #[test]
    fn failed_xp_write_on_finish_does_not_leave_checkpoint() {
        let store = FlakyStore::default();
        let mut t = Tracker::boot(store, RecordingPresenter::default(), T0, Some("Mon"), None).unwrap();
        t.complete_set(T0, "Bench Press", Some(60.0), Some(10.0)).unwrap();
        t.store_mut().fail_collection = Some(Collection::Profile);
        assert!(t.finish(T0 + 2 * MIN).is_err());
        assert!(t.session().is_idle());
        assert_eq!(t.workouts().unwrap().len(), 1);
        let stored: Settings = t.store().fetch(SETTINGS_KEY).unwrap().unwrap();
        assert!(stored.current_workout.is_none());

        let mut store = std::mem::take(&mut t.store);
        store.fail_collection = None;
        let t = Tracker::boot(store, RecordingPresenter::default(), T0 + 3 * MIN, None, None).unwrap();
        assert_eq!(t.pending_elapsed_ms(), None);
        assert_eq!(t.workouts().unwrap().len(), 1);
    }

    #[test]
    fn failed_checkpoint_clear_on_finish_withdraws_workout() {
        let store = FlakyStore::default();
        let mut t = Tracker::boot(store, RecordingPresenter::default(), T0, Some("Mon"), None).unwrap();
        t.complete_set(T0, "Bench Press", Some(60.0), Some(10.0)).unwrap();
        t.store_mut().fail_collection = Some(Collection::Settings);
        assert!(t.finish(T0 + 2 * MIN).is_err());
        assert!(t.session().is_in_progress());
        assert!(t.settings().current_workout.is_some());
        assert!(t.workouts().unwrap().is_empty());
        assert_eq!(t.profile().total_xp, 10);
    }

    #[test]
    fn failed_settings_write_keeps_memory_in_sync() {
        let store = FlakyStore::default();
        let mut t = Tracker::boot(store, RecordingPresenter::default(), T0, Some("Mon"), None).unwrap();
        t.store_mut().fail_writes = true;
        assert!(t.set_rest_duration(30).is_err());
        assert!(t.select_split("Full Body").is_err());
        assert!(t.set_last_view("history").is_err());
        assert!(t.add_exercise("Dips").is_err());
        assert_eq!(t.settings().rest_duration, 90);
        assert_eq!(t.settings().split, "Bro Split");
        assert_eq!(t.settings().last_view, "dashboard");
        assert!(t.settings().recent_exercises.is_empty());
    }

    #[test]
    fn unattended_boot_settles_pending_workout_quietly() {
        let mut t = boot(MemoryStore::new(), T0);
        t.start(T0).unwrap();
        let store = std::mem::take(&mut t.store);

        let reopen = T0 + 2 * MIN;
        let mut t = Tracker::boot(
            store,
            RecordingPresenter::default(),
            reopen,
            None,
            Some(ResumeDecision::Continue),
        )
        .unwrap();
        assert_eq!(t.settled_on_boot(), Some(ResumeDecision::Continue));
        assert!(t.session().is_in_progress());
        assert_eq!(t.session().started_at(), Some(T0));
        assert!(t.presenter.notices.is_empty());

        let store = std::mem::take(&mut t.store);
        let t = Tracker::boot(
            store,
            RecordingPresenter::default(),
            reopen,
            None,
            Some(ResumeDecision::Discard),
        )
        .unwrap();
        assert_eq!(t.settled_on_boot(), Some(ResumeDecision::Discard));
        assert!(t.session().is_idle());
        assert!(t.settings().current_workout.is_none());

        let store = MemoryStore::new();
        let t = Tracker::boot(store, RecordingPresenter::default(), T0, None, Some(ResumeDecision::Continue))
            .unwrap();
        assert_eq!(t.settled_on_boot(), None);
    }

    #[test]
    fn second_start_is_rejected() {
        let mut t = boot(MemoryStore::new(), T0);
        t.start(T0).unwrap();
        assert!(matches!(t.start(T0 + MIN), Err(TrackerError::SessionAlreadyActive)));
        assert_eq!(t.session().started_at(), Some(T0));
        assert_eq!(
            t.presenter.notices.last().unwrap(),
            "A workout is already in progress."
        );
    }

    #[test]
    fn rest_alert_fires_once_across_background() {
        let mut t = boot(MemoryStore::new(), T0);
        t.set_rest_duration(30).unwrap();
        t.complete_set(T0, "Bench Press", Some(60.0), Some(10.0)).unwrap();
        t.tick(T0 + 1_000);
        t.suspend(T0 + 1_000).unwrap();
        t.tick(T0 + 2_000);
        t.fire_rest_deadline(T0 + 30_000);
        t.foreground(T0 + 40_000);
        assert_eq!(t.presenter.alerts, vec![REST_DONE.to_string()]);
        // the workout clock keeps running after foreground
        assert!(t.session().clock().is_running());
    }

    #[test]
    fn suspend_freezes_workout_clock_only() {
        let mut t = boot(MemoryStore::new(), T0);
        t.start(T0).unwrap();
        t.start_rest(T0, Some(60));
        for s in 1..=10 {
            t.tick(T0 + s * 1_000);
        }
        assert_eq!(t.rest().remaining(), 50);
        t.suspend(T0 + 10_000).unwrap();
        assert_eq!(t.session().elapsed_ms(T0 + 50_000), 10_000);
        assert!(t.rest().deadline_armed());
        t.foreground(T0 + 50_000);
        assert_eq!(t.rest().remaining(), 10);
        assert_eq!(t.session().elapsed_ms(T0 + 50_000), 50_000);
        assert_eq!(t.presenter.timers.last(), Some(&(50, Some(10))));
    }

    #[test]
    fn plan_edits_override_template_and_track_recent() {
        let mut t = boot(MemoryStore::new(), T0);
        t.add_exercise("Landmine Press").unwrap();
        assert_eq!(t.plan().unwrap().len(), 4);
        assert_eq!(t.settings().recent_exercises, vec!["Landmine Press"]);
        assert_eq!(t.suggestions("")[0], "Landmine Press");

        for _ in 0..4 {
            t.remove_exercise(0).unwrap();
        }
        assert!(t.plan().unwrap().is_empty());
        assert!(t.remove_exercise(0).is_err());
        assert!(t.session().exercises().is_empty());
    }

    #[test]
    fn adding_exercise_mid_workout_updates_checkpoint() {
        let mut t = boot(MemoryStore::new(), T0);
        t.start(T0).unwrap();
        t.add_exercise("Dips").unwrap();
        let snap = t.settings().current_workout.clone().unwrap();
        assert!(snap.exercises.iter().any(|e| e.name == "Dips"));
    }

    #[test]
    fn notes_are_saved_to_record_and_checkpoint() {
        let mut t = boot(MemoryStore::new(), T0);
        t.start(T0).unwrap();
        t.set_notes("Bench Press", "elbows in").unwrap();
        assert_eq!(t.record_for("Bench Press").unwrap().unwrap().notes, "elbows in");
        let snap = t.settings().current_workout.clone().unwrap();
        assert_eq!(snap.exercises[0].notes, "elbows in");

        t.complete_set(T0 + 1, "Bench Press", Some(50.0), Some(5.0)).unwrap();
        assert_eq!(t.record_for("Bench Press").unwrap().unwrap().notes, "elbows in");
    }

    #[test]
    fn split_and_day_selection() {
        let mut t = boot(MemoryStore::new(), T0);
        t.select_split("Upper / Lower").unwrap();
        t.select_day("wednesday").unwrap();
        assert!(t.plan().unwrap().is_empty());
        assert!(t.select_split("Nope").is_err());
        assert_eq!(t.settings().split, "Upper / Lower");
        assert!(t.select_day("someday").is_err());
        assert_eq!(t.day(), "Wed");
    }

    #[test]
    fn history_edit_refreshes_dashboard() {
        let mut t = boot(MemoryStore::new(), T0);
        t.complete_set(T0, "Bench Press", Some(100.0), Some(5.0)).unwrap();
        let w = t.finish(T0 + 20 * MIN).unwrap();
        let today = local_day(T0 + 20 * MIN);

        let edit = WorkoutEdit {
            exercises: vec![LoggedExercise {
                name: "Bench Press".into(),
                notes: String::new(),
                sets: vec![LoggedSet::new(100.0, 5.0), LoggedSet::new(100.0, 5.0)],
            }],
            duration_minutes: None,
            xp: None,
        };
        let (updated, dash) = t.edit_workout(&w.id, &edit, today).unwrap();
        assert_eq!(updated.total_volume, 1000.0);
        assert_eq!(updated.xp, 110);
        assert_eq!(dash.total_workouts, 1);
        assert_eq!(dash.streak, 1);
        assert_eq!(dash.insights[1], "Total volume: 1000 kg");
    }

    #[test]
    fn reset_wipes_everything() {
        let mut t = boot(MemoryStore::new(), T0);
        t.complete_set(T0, "Bench Press", Some(100.0), Some(5.0)).unwrap();
        t.finish(T0 + MIN).unwrap();
        t.set_username("sam").unwrap();
        t.reset(T0 + 2 * MIN).unwrap();
        assert_eq!(t.profile().total_xp, 0);
        assert_eq!(t.profile().username, "");
        assert!(t.workouts().unwrap().is_empty());
        assert!(t.record_for("Bench Press").unwrap().is_none());
    }

    #[test]
    fn restore_brings_back_exported_data() {
        let mut t = boot(MemoryStore::new(), T0);
        t.complete_set(T0, "Squat", Some(100.0), Some(5.0)).unwrap();
        t.finish(T0 + MIN).unwrap();
        let data = t.export().unwrap();
        assert_eq!(data.workouts.len(), 1);

        t.reset(T0 + 2 * MIN).unwrap();
        assert!(t.workouts().unwrap().is_empty());
        t.restore(&data, T0 + 3 * MIN).unwrap();
        assert_eq!(t.workouts().unwrap().len(), 1);
        assert_eq!(t.profile().total_xp, 120);
        assert_eq!(t.record_for("Squat").unwrap().unwrap().last_weight, Some(100.0));
        assert_eq!(t.presenter.notices.last().unwrap(), "Backup restored.");
    }

    #[test]
    fn last_view_is_persisted() {
        let mut t = boot(MemoryStore::new(), T0);
        t.set_last_view("history").unwrap();
        let stored: Settings = t.store().fetch(SETTINGS_KEY).unwrap().unwrap();
        assert_eq!(stored.last_view, "history");
    }
}
