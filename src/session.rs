// In-progress workout: lifecycle phases and the live set log

use crate::error::TrackerError;
use crate::model::{LoggedExercise, LoggedSet, SessionSnapshot};
use crate::rest_timer::Interval;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Active {
        started_at: i64,
    },
    /// Host is in the background; the displayed duration is frozen.
    Suspended {
        started_at: i64,
        frozen_elapsed_ms: i64,
    },
    /// A checkpoint was found at boot and awaits continue/discard.
    AwaitingDecision {
        stored_start: i64,
        pending_elapsed_ms: i64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeDecision {
    Continue,
    Discard,
}

/// Every transition takes the wall-clock time as an argument; nothing here
/// reads a clock or touches storage. [`crate::tracker::Tracker`] persists the
/// result through [`Session::snapshot`].
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    phase: Phase,
    split: String,
    day: String,
    exercises: Vec<LoggedExercise>,
    clock: Interval,
}

/// Reject numbers a user cannot have meant.
fn check_number(value: Option<f64>, field: &str) -> Result<f64, TrackerError> {
    match value {
        Some(v) if v.is_finite() && v >= 0.0 => Ok(v),
        Some(_) => Err(TrackerError::InvalidInput(format!("Enter a valid {field}."))),
        None => Err(TrackerError::InvalidInput(format!("Enter {field}."))),
    }
}

/// Validate weight/reps typed into a set row.
pub fn validate_set(weight: Option<f64>, reps: Option<f64>) -> Result<LoggedSet, TrackerError> {
    let weight = check_number(weight, "weight")?;
    let reps = check_number(reps, "reps")?;
    if reps == 0.0 {
        return Err(TrackerError::InvalidInput("Reps must be at least 1.".into()));
    }
    Ok(LoggedSet::new(weight, reps))
}

impl Session {
    pub fn idle(split: &str, day: &str) -> Self {
        Self {
            phase: Phase::Idle,
            split: split.to_string(),
            day: day.to_string(),
            exercises: Vec::new(),
            clock: Interval::default(),
        }
    }

    /// Rebuild from a stored checkpoint found at boot.
    ///
    /// The session is never continued automatically: it waits in
    /// [`Phase::AwaitingDecision`] with the elapsed time measured at `now_ms`.
    pub fn from_snapshot(snapshot: &SessionSnapshot, now_ms: i64) -> Option<Self> {
        let stored_start = snapshot.start_time?;
        Some(Self {
            phase: Phase::AwaitingDecision {
                stored_start,
                pending_elapsed_ms: (now_ms - stored_start).max(0),
            },
            split: snapshot.split.clone(),
            day: snapshot.day.clone(),
            exercises: snapshot.exercises.clone(),
            clock: Interval::default(),
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn split(&self) -> &str {
        &self.split
    }

    pub fn day(&self) -> &str {
        &self.day
    }

    pub fn exercises(&self) -> &[LoggedExercise] {
        &self.exercises
    }

    pub fn clock(&self) -> &Interval {
        &self.clock
    }

    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(self.phase, Phase::Active { .. } | Phase::Suspended { .. })
    }

    pub fn started_at(&self) -> Option<i64> {
        match self.phase {
            Phase::Active { started_at } | Phase::Suspended { started_at, .. } => Some(started_at),
            Phase::AwaitingDecision { stored_start, .. } => Some(stored_start),
            Phase::Idle => None,
        }
    }

    /// Duration shown to the user.
    pub fn elapsed_ms(&self, now_ms: i64) -> i64 {
        match self.phase {
            Phase::Idle => 0,
            Phase::Active { started_at } => (now_ms - started_at).max(0),
            Phase::Suspended {
                frozen_elapsed_ms, ..
            } => frozen_elapsed_ms,
            Phase::AwaitingDecision {
                pending_elapsed_ms,
                ..
            } => pending_elapsed_ms,
        }
    }

    /// Replace the day's exercise list; only allowed while idle.
    pub fn plan(&mut self, split: &str, day: &str, exercises: Vec<LoggedExercise>) {
        if self.is_idle() {
            self.split = split.to_string();
            self.day = day.to_string();
            self.exercises = exercises;
        }
    }

    /// Begin a workout. Returns `false` when one is already running.
    pub fn start(&mut self, now_ms: i64) -> Result<bool, TrackerError> {
        match self.phase {
            Phase::Idle => {
                self.phase = Phase::Active { started_at: now_ms };
                self.clock.restart();
                Ok(true)
            }
            Phase::Active { .. } | Phase::Suspended { .. } => Ok(false),
            Phase::AwaitingDecision { .. } => Err(TrackerError::ResumePending),
        }
    }

    /// Undo a start whose checkpoint could not be written.
    pub(crate) fn abort_start(&mut self) {
        if matches!(self.phase, Phase::Active { .. }) {
            self.phase = Phase::Idle;
            self.clock.cancel();
        }
    }

    pub fn suspend(&mut self, now_ms: i64) {
        if let Phase::Active { started_at } = self.phase {
            self.clock.cancel();
            self.phase = Phase::Suspended {
                started_at,
                frozen_elapsed_ms: (now_ms - started_at).max(0),
            };
        }
    }

    pub fn foreground(&mut self) {
        if let Phase::Suspended { started_at, .. } = self.phase {
            self.phase = Phase::Active { started_at };
            self.clock.restart();
        }
    }

    /// Continue a checkpointed session so the duration carries on from the
    /// elapsed time measured at boot. Returns the rebased start time.
    pub fn resume(&mut self, now_ms: i64) -> Result<i64, TrackerError> {
        match self.phase {
            Phase::AwaitingDecision {
                pending_elapsed_ms,
                ..
            } => {
                let started_at = now_ms - pending_elapsed_ms;
                self.phase = Phase::Active { started_at };
                self.clock.restart();
                Ok(started_at)
            }
            _ => Err(TrackerError::NoActiveSession),
        }
    }

    /// Drop the session without recording anything.
    pub fn discard(&mut self) -> Result<(), TrackerError> {
        if self.is_idle() {
            return Err(TrackerError::NoActiveSession);
        }
        self.phase = Phase::Idle;
        self.clock.cancel();
        self.exercises.clear();
        Ok(())
    }

    /// End the workout, handing back its start time and set log.
    pub fn finish(&mut self) -> Result<(i64, Vec<LoggedExercise>), TrackerError> {
        let started_at = match self.phase {
            Phase::Active { started_at } => started_at,
            Phase::AwaitingDecision { .. } => return Err(TrackerError::ResumePending),
            _ => return Err(TrackerError::NoActiveSession),
        };
        self.phase = Phase::Idle;
        self.clock.cancel();
        Ok((started_at, std::mem::take(&mut self.exercises)))
    }

    pub fn snapshot(&self) -> Option<SessionSnapshot> {
        let start_time = self.started_at()?;
        Some(SessionSnapshot {
            split: self.split.clone(),
            day: self.day.clone(),
            start_time: Some(start_time),
            exercises: self.exercises.clone(),
        })
    }

    fn exercise_mut(&mut self, name: &str) -> Result<&mut LoggedExercise, TrackerError> {
        self.exercises
            .iter_mut()
            .find(|e| e.name == name)
            .ok_or_else(|| TrackerError::NotFound(format!("exercise {name}")))
    }

    pub fn exercise(&self, name: &str) -> Option<&LoggedExercise> {
        self.exercises.iter().find(|e| e.name == name)
    }

    /// Append a completed set, adding the exercise if it is not listed yet.
    /// Returns the set index.
    pub fn log_set(&mut self, name: &str, set: LoggedSet) -> usize {
        if self.exercise(name).is_none() {
            self.exercises.push(LoggedExercise::new(name));
        }
        let idx = self.exercises.iter().position(|e| e.name == name).unwrap_or(0);
        let ex = &mut self.exercises[idx];
        ex.sets.push(LoggedSet { done: true, ..set });
        ex.sets.len() - 1
    }

    pub fn update_set(&mut self, name: &str, index: usize, set: LoggedSet) -> Result<(), TrackerError> {
        let ex = self.exercise_mut(name)?;
        let slot = ex
            .sets
            .get_mut(index)
            .ok_or_else(|| TrackerError::NotFound(format!("set {} of {name}", index + 1)))?;
        slot.weight = set.weight;
        slot.reps = set.reps;
        Ok(())
    }

    pub fn set_notes(&mut self, name: &str, notes: &str) -> Result<(), TrackerError> {
        self.exercise_mut(name)?.notes = notes.to_string();
        Ok(())
    }

    pub fn add_exercise(&mut self, exercise: LoggedExercise) {
        if self.exercise(&exercise.name).is_none() {
            self.exercises.push(exercise);
        }
    }

    pub fn remove_exercise(&mut self, name: &str) {
        self.exercises.retain(|e| e.name != name);
    }
}
