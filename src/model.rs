// Persisted records, in camelCase so browser backups import as-is

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::store::{Collection, Record};

pub const SETTINGS_KEY: &str = "settings";
pub const PROFILE_KEY: &str = "profile";
pub const DEFAULT_REST_SECS: u32 = 90;
pub const DEFAULT_SPLIT: &str = "Bro Split";
pub const DEFAULT_VIEW: &str = "dashboard";

/// Accept numbers, numeric strings and `null` for a numeric field.
///
/// Anything that does not parse to a finite number becomes `None` so a
/// malformed record never aborts loading.
pub fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64().filter(|v| v.is_finite()),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    })
}

/// Numeric field types that fall back to zero when a stored value is
/// missing or malformed.
pub trait LenientNumber: Default {
    fn from_f64(value: f64) -> Self;
}

impl LenientNumber for f64 {
    fn from_f64(value: f64) -> Self {
        value
    }
}

macro_rules! lenient_int {
    ($($t:ty),*) => {
        $(impl LenientNumber for $t {
            fn from_f64(value: f64) -> Self {
                // float to int casts saturate
                value.round() as $t
            }
        })*
    };
}

lenient_int!(i64, u64, u32, usize);

/// Like [`lenient_number`], but yields zero instead of `None`. Negative
/// values saturate to zero for unsigned fields.
pub fn number_or_zero<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: LenientNumber,
{
    Ok(lenient_number(deserializer)?
        .map(T::from_f64)
        .unwrap_or_default())
}

fn rest_or_default<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let secs: u32 = number_or_zero(deserializer)?;
    Ok(if secs == 0 { DEFAULT_REST_SECS } else { secs })
}

fn default_split() -> String {
    DEFAULT_SPLIT.to_string()
}

fn default_rest() -> u32 {
    DEFAULT_REST_SECS
}

fn default_view() -> String {
    DEFAULT_VIEW.to_string()
}

/// Singleton user preferences plus the in-progress session checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_split")]
    pub split: String,
    #[serde(default = "default_rest", deserialize_with = "rest_or_default")]
    pub rest_duration: u32,
    #[serde(default = "default_view")]
    pub last_view: String,
    /// The only durable copy of a live workout.
    #[serde(default)]
    pub current_workout: Option<SessionSnapshot>,
    #[serde(default)]
    pub recent_exercises: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            split: default_split(),
            rest_duration: DEFAULT_REST_SECS,
            last_view: default_view(),
            current_workout: None,
            recent_exercises: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    pub username: String,
    #[serde(deserialize_with = "number_or_zero")]
    pub total_xp: u64,
    #[serde(deserialize_with = "number_or_zero")]
    pub level: u64,
}

impl Profile {
    pub fn new() -> Self {
        Self {
            username: String::new(),
            total_xp: 0,
            level: 1,
        }
    }
}

/// One entry of an exercise's personal record history.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PrEntry {
    pub weight: f64,
    pub reps: f64,
    /// RFC 3339 timestamp of the set.
    pub date: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ExerciseRecord {
    pub name: String,
    #[serde(deserialize_with = "lenient_number")]
    pub last_weight: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub last_reps: Option<f64>,
    pub notes: String,
    /// Newest first, at most [`crate::analysis::MAX_PRS`] entries.
    pub prs: Vec<PrEntry>,
}

impl ExerciseRecord {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn best(&self) -> Option<&PrEntry> {
        self.prs.first()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DayPlan {
    /// `split:day`
    pub key: String,
    pub exercises: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggedSet {
    #[serde(deserialize_with = "lenient_number")]
    pub weight: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub reps: Option<f64>,
    pub done: bool,
}

impl LoggedSet {
    pub fn new(weight: f64, reps: f64) -> Self {
        Self {
            weight: Some(weight),
            reps: Some(reps),
            done: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggedExercise {
    pub name: String,
    pub notes: String,
    pub sets: Vec<LoggedSet>,
}

impl LoggedExercise {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

/// Checkpoint of the live session stored inside [`Settings`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSnapshot {
    pub split: String,
    pub day: String,
    /// Epoch milliseconds; identifies the session.
    pub start_time: Option<i64>,
    pub exercises: Vec<LoggedExercise>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CompletedWorkout {
    pub id: String,
    /// RFC 3339 timestamp of the finish.
    pub date: String,
    pub day: String,
    pub split: String,
    #[serde(deserialize_with = "number_or_zero")]
    pub start_time: i64,
    #[serde(deserialize_with = "number_or_zero")]
    pub end_time: i64,
    /// Whole minutes, rounded up, at least 1.
    #[serde(deserialize_with = "number_or_zero")]
    pub duration: u64,
    #[serde(deserialize_with = "number_or_zero")]
    pub duration_seconds: u64,
    pub exercises: Vec<LoggedExercise>,
    #[serde(deserialize_with = "number_or_zero")]
    pub exercises_count: usize,
    #[serde(deserialize_with = "number_or_zero")]
    pub total_sets: usize,
    #[serde(deserialize_with = "number_or_zero")]
    pub total_reps: f64,
    #[serde(deserialize_with = "number_or_zero")]
    pub total_volume: f64,
    #[serde(deserialize_with = "number_or_zero")]
    pub calories_burned: u32,
    #[serde(deserialize_with = "number_or_zero")]
    pub xp: u64,
}

/// Binary attachment of a timeline entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Photo {
    pub mime: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimelineEntry {
    pub id: String,
    pub date: String,
    pub note: String,
    pub photo: Option<Photo>,
}

impl Record for Settings {
    const COLLECTION: Collection = Collection::Settings;

    fn key(&self) -> String {
        SETTINGS_KEY.to_string()
    }
}

impl Record for Profile {
    const COLLECTION: Collection = Collection::Profile;

    fn key(&self) -> String {
        PROFILE_KEY.to_string()
    }
}

impl Record for ExerciseRecord {
    const COLLECTION: Collection = Collection::Exercises;

    fn key(&self) -> String {
        self.name.clone()
    }
}

impl Record for DayPlan {
    const COLLECTION: Collection = Collection::Plans;

    fn key(&self) -> String {
        self.key.clone()
    }
}

impl Record for CompletedWorkout {
    const COLLECTION: Collection = Collection::Workouts;

    fn key(&self) -> String {
        self.id.clone()
    }
}

impl Record for TimelineEntry {
    const COLLECTION: Collection = Collection::Timeline;

    fn key(&self) -> String {
        self.id.clone()
    }
}
