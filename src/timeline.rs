// Progress timeline entries

use std::path::Path;

use crate::error::TrackerError;
use crate::model::{Photo, TimelineEntry};
use crate::store::{Collection, Store};
use crate::tracker::local_time;

pub fn add_entry<S: Store>(
    store: &mut S,
    now_ms: i64,
    note: &str,
    photo: Option<Photo>,
) -> Result<TimelineEntry, TrackerError> {
    let note = note.trim();
    let photo = photo.filter(|p| !p.bytes.is_empty());
    if note.is_empty() && photo.is_none() {
        return Err(TrackerError::InvalidInput("Add a photo or note.".into()));
    }
    let entry = TimelineEntry {
        id: format!("t_{now_ms}"),
        date: local_time(now_ms).to_rfc3339(),
        note: note.to_string(),
        photo,
    };
    store.save(&entry)?;
    log::info!("Saved timeline entry {}", entry.id);
    Ok(entry)
}

/// Newest first.
pub fn list_entries<S: Store>(store: &S) -> Result<Vec<TimelineEntry>, TrackerError> {
    let mut entries: Vec<TimelineEntry> = store.fetch_all()?;
    entries.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
    Ok(entries)
}

pub fn delete_entry<S: Store>(store: &mut S, id: &str) -> Result<(), TrackerError> {
    if store.get(Collection::Timeline, id)?.is_none() {
        return Err(TrackerError::NotFound(format!("timeline entry {id}")));
    }
    store.delete(Collection::Timeline, id)?;
    Ok(())
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        _ => "application/octet-stream",
    }
}

pub fn photo_from_path<P: AsRef<Path>>(path: P) -> std::io::Result<Photo> {
    let path = path.as_ref();
    Ok(Photo {
        mime: mime_for(path).to_string(),
        bytes: std::fs::read(path)?,
    })
}
