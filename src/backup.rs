// Backup, restore, reset and CSV history export

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

use crate::analysis;
use crate::error::StoreError;
use crate::model::{
    CompletedWorkout, DayPlan, ExerciseRecord, PROFILE_KEY, Photo, Profile, SETTINGS_KEY,
    Settings, TimelineEntry,
};
use crate::store::{ALL_COLLECTIONS, Store};

pub const BACKUP_FILE: &str = "ironai-backup.json";

static DATA_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^data:([^;,]*)((?:;[^;,]*)*?)(;base64)?,(.*)$").expect("valid data URL pattern")
});

/// Timeline entry with its photo inlined as a data URL.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackupTimelineEntry {
    pub id: String,
    pub date: String,
    pub note: String,
    pub photo: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Backup {
    pub settings: Option<Settings>,
    pub profile: Option<Profile>,
    pub exercises: Vec<ExerciseRecord>,
    pub plans: Vec<DayPlan>,
    pub workouts: Vec<CompletedWorkout>,
    pub timeline: Vec<BackupTimelineEntry>,
}

/// Number of records written by [`import`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportCounts {
    pub exercises: usize,
    pub plans: usize,
    pub workouts: usize,
    pub timeline: usize,
}

pub fn to_data_url(photo: &Photo) -> String {
    let mime = if photo.mime.is_empty() {
        "application/octet-stream"
    } else {
        photo.mime.as_str()
    };
    format!("data:{mime};base64,{}", STANDARD.encode(&photo.bytes))
}

/// Decode a data URL. Malformed input yields `None`.
pub fn from_data_url(url: &str) -> Option<Photo> {
    let caps = DATA_URL.captures(url.trim())?;
    let mime = caps.get(1).map_or("", |m| m.as_str()).to_string();
    let payload = caps.get(4).map_or("", |m| m.as_str());
    let bytes = if caps.get(3).is_some() {
        STANDARD.decode(payload).ok()?
    } else {
        payload.as_bytes().to_vec()
    };
    Some(Photo { mime, bytes })
}

pub fn export<S: Store>(store: &S) -> Result<Backup, StoreError> {
    let timeline: Vec<TimelineEntry> = store.fetch_all()?;
    let backup = Backup {
        settings: store.fetch(SETTINGS_KEY)?,
        profile: store.fetch(PROFILE_KEY)?,
        exercises: store.fetch_all()?,
        plans: store.fetch_all()?,
        workouts: store.fetch_all()?,
        timeline: timeline
            .into_iter()
            .map(|e| BackupTimelineEntry {
                photo: e.photo.as_ref().map(to_data_url),
                id: e.id,
                date: e.date,
                note: e.note,
            })
            .collect(),
    };
    log::info!(
        "Exported {} workouts, {} exercises, {} timeline entries",
        backup.workouts.len(),
        backup.exercises.len(),
        backup.timeline.len()
    );
    Ok(backup)
}

/// Upsert every record of a backup. Nothing is de-duplicated.
pub fn import<S: Store>(store: &mut S, backup: &Backup) -> Result<ImportCounts, StoreError> {
    if let Some(settings) = &backup.settings {
        store.save(settings)?;
    }
    if let Some(profile) = &backup.profile {
        let mut profile = profile.clone();
        profile.level = analysis::level_for(profile.total_xp);
        store.save(&profile)?;
    }
    for exercise in &backup.exercises {
        store.save(exercise)?;
    }
    for plan in &backup.plans {
        store.save(plan)?;
    }
    for workout in &backup.workouts {
        store.save(workout)?;
    }
    for entry in &backup.timeline {
        let photo = entry.photo.as_deref().and_then(|url| {
            let decoded = from_data_url(url);
            if decoded.is_none() {
                log::warn!("Dropping undecodable photo of timeline entry {}", entry.id);
            }
            decoded
        });
        store.save(&TimelineEntry {
            id: entry.id.clone(),
            date: entry.date.clone(),
            note: entry.note.clone(),
            photo,
        })?;
    }
    let counts = ImportCounts {
        exercises: backup.exercises.len(),
        plans: backup.plans.len(),
        workouts: backup.workouts.len(),
        timeline: backup.timeline.len(),
    };
    log::info!("Imported {counts:?}");
    Ok(counts)
}

/// Clear all six collections.
pub fn reset<S: Store>(store: &mut S) -> Result<(), StoreError> {
    for collection in ALL_COLLECTIONS {
        store.clear(collection)?;
    }
    log::warn!("All local data deleted");
    Ok(())
}

pub fn write_json<T: Serialize + ?Sized, P: AsRef<Path>>(
    value: &T,
    path: P,
) -> std::io::Result<()> {
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, value)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
}

pub fn read_backup<P: AsRef<Path>>(path: P) -> Result<Backup, StoreError> {
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

/// One CSV row per logged set.
pub fn write_workouts_csv(writer: impl Write, workouts: &[CompletedWorkout]) -> csv::Result<()> {
    #[derive(Serialize)]
    struct Row<'a> {
        workout_id: &'a str,
        date: &'a str,
        split: &'a str,
        day: &'a str,
        exercise: &'a str,
        set_index: usize,
        weight: Option<f64>,
        reps: Option<f64>,
        done: bool,
    }
    let mut wtr = csv::Writer::from_writer(writer);
    for w in workouts {
        for ex in &w.exercises {
            for (i, set) in ex.sets.iter().enumerate() {
                wtr.serialize(Row {
                    workout_id: &w.id,
                    date: &w.date,
                    split: &w.split,
                    day: &w.day,
                    exercise: &ex.name,
                    set_index: i + 1,
                    weight: set.weight,
                    reps: set.reps,
                    done: set.done,
                })?;
            }
        }
    }
    wtr.flush().map_err(Into::into)
}

pub fn save_workouts_csv<P: AsRef<Path>>(path: P, workouts: &[CompletedWorkout]) -> csv::Result<()> {
    write_workouts_csv(std::fs::File::create(path)?, workouts)
}
