//! A calendar kept as a directory of `.ics` files, one event per file.

use std::path::PathBuf;

use calsync_core::collaborators::{CalendarStore, TagFilter};
use calsync_core::ics::{generate_stored_event, parse_occurrences};
use calsync_core::{CalSyncError, CalSyncResult, Occurrence, SyncTag, SyncWindow};

pub struct CalendarDir {
    path: PathBuf,
}

impl CalendarDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CalendarDir { path: path.into() }
    }

    fn event_path(&self, id: &str) -> PathBuf {
        self.path.join(format!("{id}.ics"))
    }

    /// Event files in the directory. A missing directory is an empty calendar.
    fn event_files(&self) -> CalSyncResult<Vec<PathBuf>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.path)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && path.extension().is_some_and(|e| e == "ics"))
            .collect();
        files.sort();
        Ok(files)
    }
}

impl CalendarStore for CalendarDir {
    fn query_occurrences(
        &self,
        window: &SyncWindow,
        filter: TagFilter,
    ) -> CalSyncResult<Vec<Occurrence>> {
        let mut occurrences = Vec::new();

        for path in self.event_files()? {
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let data = std::fs::read(&path)?;
            match parse_occurrences(&data, window) {
                Ok(parsed) => occurrences.extend(
                    parsed
                        .into_iter()
                        .filter(|o| filter.accepts(o))
                        .map(|o| o.with_id(id)),
                ),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable event file")
                }
            }
        }

        occurrences.sort_by_key(Occurrence::fingerprint);
        Ok(occurrences)
    }

    fn create(&self, occurrence: &Occurrence) -> CalSyncResult<Occurrence> {
        std::fs::create_dir_all(&self.path)?;

        let id = uuid::Uuid::new_v4().to_string();
        let ics = generate_stored_event(occurrence, &format!("{id}@calsync"));
        std::fs::write(self.event_path(&id), ics)?;

        Ok(occurrence.clone().with_id(id))
    }

    fn delete(&self, occurrence: &Occurrence) -> CalSyncResult<()> {
        let untagged = || CalSyncError::UntaggedDeletion {
            start: occurrence.start,
            end: occurrence.end,
        };
        if !occurrence.is_tagged() {
            return Err(untagged());
        }

        let id = occurrence
            .id
            .as_deref()
            .ok_or_else(|| CalSyncError::Store(format!("Occurrence has no id: {occurrence}")))?;
        if id.contains(['/', '\\']) {
            return Err(CalSyncError::Store(format!("Invalid event id: {id}")));
        }

        let path = self.event_path(id);
        if !path.exists() {
            tracing::warn!(path = %path.display(), "event file already gone");
            return Ok(());
        }

        // The file on disk must carry the tag too, not just the in-memory copy.
        let contents = std::fs::read_to_string(&path)?;
        let file_is_tagged = contents
            .lines()
            .filter_map(|line| line.strip_prefix("CATEGORIES:"))
            .any(SyncTag::is_in_categories);
        if !file_is_tagged {
            return Err(untagged());
        }

        std::fs::remove_file(&path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calsync_core::ErrorKind;
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap()
    }

    fn window() -> SyncWindow {
        SyncWindow::starting_on(NaiveDate::from_ymd_opt(2025, 3, 17).unwrap(), 7, &Utc).unwrap()
    }

    #[test]
    fn missing_directory_is_an_empty_calendar() {
        let dir = tempfile::tempdir().unwrap();
        let calendar = CalendarDir::new(dir.path().join("nope"));
        assert!(calendar.query_occurrences(&window(), TagFilter::Any).unwrap().is_empty());
    }

    #[test]
    fn created_events_come_back_with_their_file_id() {
        let dir = tempfile::tempdir().unwrap();
        let calendar = CalendarDir::new(dir.path());

        let created = calendar.create(&Occurrence::synced(at(20, 9), at(20, 10))).unwrap();
        let id = created.id.clone().unwrap();
        assert!(dir.path().join(format!("{id}.ics")).exists());

        let found = calendar.query_occurrences(&window(), TagFilter::SyncedOnly).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id.as_deref(), Some(id.as_str()));
        assert!(found[0].is_tagged());
    }

    #[test]
    fn tag_filter_splits_user_and_synced_events() {
        let dir = tempfile::tempdir().unwrap();
        let calendar = CalendarDir::new(dir.path());
        calendar.create(&Occurrence::synced(at(20, 9), at(20, 10))).unwrap();
        calendar.create(&Occurrence::new(at(20, 11), at(20, 12), "Dentist")).unwrap();

        let user = calendar.query_occurrences(&window(), TagFilter::UserOnly).unwrap();
        assert_eq!(user.len(), 1);
        assert_eq!(user[0].summary, "Dentist");
        assert_eq!(calendar.query_occurrences(&window(), TagFilter::Any).unwrap().len(), 2);
    }

    #[test]
    fn recurring_user_events_expand_into_the_window() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("weekly.ics"),
            "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:test\r\n\
             BEGIN:VEVENT\r\nUID:w\r\nDTSTART:20250310T090000Z\r\nDTEND:20250310T100000Z\r\nRRULE:FREQ=DAILY;COUNT=10\r\nSUMMARY:Standup\r\nEND:VEVENT\r\n\
             END:VCALENDAR\r\n",
        )
        .unwrap();

        let found = CalendarDir::new(dir.path())
            .query_occurrences(&window(), TagFilter::Any)
            .unwrap();
        assert_eq!(found.len(), 3);
        assert!(found.iter().all(|o| o.id.as_deref() == Some("weekly")));
    }

    #[test]
    fn unreadable_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.ics"), "hello").unwrap();
        let calendar = CalendarDir::new(dir.path());
        calendar.create(&Occurrence::new(at(20, 11), at(20, 12), "Lunch")).unwrap();

        assert_eq!(calendar.query_occurrences(&window(), TagFilter::Any).unwrap().len(), 1);
    }

    #[test]
    fn delete_removes_synced_files_only() {
        let dir = tempfile::tempdir().unwrap();
        let calendar = CalendarDir::new(dir.path());
        let synced = calendar.create(&Occurrence::synced(at(20, 9), at(20, 10))).unwrap();
        let mine = calendar.create(&Occurrence::new(at(20, 11), at(20, 12), "Mine")).unwrap();

        calendar.delete(&synced).unwrap();
        let err = calendar.delete(&mine).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvariantViolation);

        let left = calendar.query_occurrences(&window(), TagFilter::Any).unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].summary, "Mine");
    }

    #[test]
    fn delete_checks_the_file_not_just_the_occurrence() {
        let dir = tempfile::tempdir().unwrap();
        let calendar = CalendarDir::new(dir.path());
        let mine = calendar.create(&Occurrence::new(at(20, 11), at(20, 12), "Mine")).unwrap();

        let disguised = Occurrence::synced(mine.start, mine.end).with_id(mine.id.unwrap());
        let err = calendar.delete(&disguised).unwrap_err();
        assert!(matches!(err, CalSyncError::UntaggedDeletion { .. }));
        assert_eq!(calendar.query_occurrences(&window(), TagFilter::Any).unwrap().len(), 1);
    }
}
