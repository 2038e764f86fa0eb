use chrono::{DateTime, SubsecRound, Utc};
use gallery_core::{format_rfc3339, now_rfc3339, new_id, parse_rfc3339};
use gallery_sql::{Row, Value};
use tracing::{debug, warn};

use super::{GalleryStore, apply_patch, optional, required};
use crate::error::GalleryError;
use crate::model::{Event, EventStatus, EventView, NewEvent};

pub(super) const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS events (
    id            TEXT PRIMARY KEY,
    title         TEXT NOT NULL,
    description   TEXT,
    location_name TEXT,
    start_date    TEXT NOT NULL,
    end_date      TEXT NOT NULL,
    external_url  TEXT,
    created_at    TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_event_start ON events(start_date);
";

impl GalleryStore {
    pub fn create_event(&self, req: &NewEvent) -> Result<Event, GalleryError> {
        let event = checked(Event {
            id: new_id(),
            title: req.title.clone(),
            description: req.description.clone(),
            location_name: req.location_name.clone(),
            start_date: req.start_date,
            end_date: req.end_date,
            external_url: req.external_url.clone(),
            created_at: now_rfc3339(),
        })?;

        self.db
            .exec(
                "INSERT INTO events (id, title, description, location_name, start_date, \
                 end_date, external_url, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                &event_params(&event),
            )
            .map_err(GalleryError::storage)?;

        debug!(id = %event.id, title = %event.title, "event created");
        Ok(event)
    }

    pub fn get_event(&self, id: &str) -> Result<Event, GalleryError> {
        let rows = self
            .db
            .query("SELECT * FROM events WHERE id = ?1", &[Value::from(id)])
            .map_err(GalleryError::storage)?;
        rows.first()
            .and_then(row_to_event)
            .ok_or_else(|| GalleryError::NotFound(format!("event {id}")))
    }

    /// Apply a JSON merge patch to an event. `id` and `createdAt` are fixed.
    pub fn update_event(&self, id: &str, patch: &serde_json::Value) -> Result<Event, GalleryError> {
        let current = self.get_event(id)?;
        let mut updated: Event = apply_patch(&current, patch)?;
        updated.id = current.id;
        updated.created_at = current.created_at;
        let updated = checked(updated)?;

        let params = event_params(&updated);
        let affected = self
            .db
            .exec(
                "UPDATE events SET title = ?2, description = ?3, location_name = ?4, \
                 start_date = ?5, end_date = ?6, external_url = ?7 WHERE id = ?1",
                &params[..7],
            )
            .map_err(GalleryError::storage)?;

        if affected == 0 {
            return Err(GalleryError::NotFound(format!("event {id}")));
        }
        Ok(updated)
    }

    pub fn delete_event(&self, id: &str) -> Result<(), GalleryError> {
        let affected = self
            .db
            .exec("DELETE FROM events WHERE id = ?1", &[Value::from(id)])
            .map_err(GalleryError::storage)?;

        if affected == 0 {
            return Err(GalleryError::NotFound(format!("event {id}")));
        }
        Ok(())
    }

    /// Events by start date, each classified against `now`, optionally
    /// restricted to one status.
    pub fn list_events(
        &self,
        status: Option<EventStatus>,
        now: DateTime<Utc>,
    ) -> Result<Vec<EventView>, GalleryError> {
        let rows = self
            .db
            .query("SELECT * FROM events ORDER BY start_date, id", &[])
            .map_err(GalleryError::storage)?;

        Ok(rows
            .iter()
            .filter_map(row_to_event)
            .map(|event| EventView {
                status: event.status_at(now),
                event,
            })
            .filter(|view| status.is_none_or(|s| view.status == s))
            .collect())
    }
}

/// Trim text fields and reject an empty title or an end before the start.
/// Dates keep the precision they are stored at.
fn checked(mut event: Event) -> Result<Event, GalleryError> {
    event.start_date = event.start_date.trunc_subsecs(6);
    event.end_date = event.end_date.trunc_subsecs(6);
    event.title = required("title", &event.title)?;
    event.description = optional(event.description.as_deref());
    event.location_name = optional(event.location_name.as_deref());
    event.external_url = optional(event.external_url.as_deref());
    if event.end_date < event.start_date {
        return Err(GalleryError::Validation(
            "endDate must not be before startDate".into(),
        ));
    }
    Ok(event)
}

fn event_params(e: &Event) -> Vec<Value> {
    vec![
        Value::from(e.id.as_str()),
        Value::from(e.title.as_str()),
        Value::opt_text(e.description.as_deref()),
        Value::opt_text(e.location_name.as_deref()),
        Value::Text(format_rfc3339(e.start_date)),
        Value::Text(format_rfc3339(e.end_date)),
        Value::opt_text(e.external_url.as_deref()),
        Value::from(e.created_at.as_str()),
    ]
}

/// Rows with unreadable dates cannot be classified and are skipped.
fn row_to_event(row: &Row) -> Option<Event> {
    let id = row.get_str("id")?.to_string();
    let date = |column: &str| {
        let parsed = row.get_str(column).and_then(parse_rfc3339);
        if parsed.is_none() {
            warn!(event = %id, column, "malformed event date, skipping");
        }
        parsed
    };
    let start_date = date("start_date")?;
    let end_date = date("end_date")?;
    Some(Event {
        title: row.get_str("title").unwrap_or_default().to_string(),
        description: row.get_str("description").map(String::from),
        location_name: row.get_str("location_name").map(String::from),
        start_date,
        end_date,
        external_url: row.get_str("external_url").map(String::from),
        created_at: row.get_str("created_at").unwrap_or_default().to_string(),
        id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::make_store;

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn new_event(title: &str, start: &str, end: &str) -> NewEvent {
        NewEvent {
            title: title.into(),
            description: None,
            location_name: Some(" Hall A ".into()),
            start_date: at(start),
            end_date: at(end),
            external_url: None,
        }
    }

    fn titles(views: &[EventView]) -> Vec<&str> {
        views.iter().map(|v| v.event.title.as_str()).collect()
    }

    #[test]
    fn event_crud() {
        let store = make_store();
        let e = store
            .create_event(&new_event(" Opening ", "2024-05-01T10:00:00Z", "2024-05-01T18:00:00Z"))
            .unwrap();
        assert_eq!(e.title, "Opening");
        assert_eq!(e.location_name.as_deref(), Some("Hall A"));
        assert_eq!(store.get_event(&e.id).unwrap(), e);

        let updated = store
            .update_event(&e.id, &serde_json::json!({"endDate": "2024-05-02T18:00:00Z", "id": "x"}))
            .unwrap();
        assert_eq!(updated.id, e.id);
        assert_eq!(updated.end_date, at("2024-05-02T18:00:00Z"));
        assert_eq!(store.get_event(&e.id).unwrap(), updated);

        store.delete_event(&e.id).unwrap();
        assert!(matches!(store.get_event(&e.id), Err(GalleryError::NotFound(_))));
        assert!(matches!(store.delete_event(&e.id), Err(GalleryError::NotFound(_))));
    }

    #[test]
    fn end_before_start_is_rejected() {
        let store = make_store();
        let err = store
            .create_event(&new_event("Backwards", "2024-05-02T00:00:00Z", "2024-05-01T00:00:00Z"))
            .unwrap_err();
        assert!(matches!(err, GalleryError::Validation(_)), "got {err:?}");

        let e = store
            .create_event(&new_event("Ok", "2024-05-01T00:00:00Z", "2024-05-02T00:00:00Z"))
            .unwrap();
        let err = store
            .update_event(&e.id, &serde_json::json!({"startDate": "2024-06-01T00:00:00Z"}))
            .unwrap_err();
        assert!(matches!(err, GalleryError::Validation(_)), "got {err:?}");
    }

    #[test]
    fn events_are_classified_and_filtered() {
        let store = make_store();
        store
            .create_event(&new_event("Later", "2024-07-01T00:00:00Z", "2024-07-05T00:00:00Z"))
            .unwrap();
        store
            .create_event(&new_event("Now", "2024-05-30T00:00:00Z", "2024-06-05T00:00:00Z"))
            .unwrap();
        store
            .create_event(&new_event("Done", "2024-01-01T00:00:00Z", "2024-01-02T00:00:00Z"))
            .unwrap();
        let now = at("2024-06-01T12:00:00Z");

        let all = store.list_events(None, now).unwrap();
        assert_eq!(titles(&all), vec!["Done", "Now", "Later"]);
        let statuses: Vec<_> = all.iter().map(|v| v.status).collect();
        assert_eq!(
            statuses,
            vec![EventStatus::Past, EventStatus::Active, EventStatus::Upcoming]
        );

        let active = store.list_events(Some(EventStatus::Active), now).unwrap();
        assert_eq!(titles(&active), vec!["Now"]);
        let upcoming = store.list_events(Some(EventStatus::Upcoming), now).unwrap();
        assert_eq!(titles(&upcoming), vec!["Later"]);

        // The same rows read a week later.
        let later = store
            .list_events(Some(EventStatus::Past), at("2024-06-08T00:00:00Z"))
            .unwrap();
        assert_eq!(titles(&later), vec!["Done", "Now"]);
    }

    #[test]
    fn malformed_dates_are_skipped() {
        let store = make_store();
        store
            .create_event(&new_event("Good", "2024-05-01T00:00:00Z", "2024-05-02T00:00:00Z"))
            .unwrap();
        store
            .db
            .exec(
                "INSERT INTO events (id, title, start_date, end_date, created_at) \
                 VALUES ('bad', 'Bad', 'someday', '2024-05-02T00:00:00Z', ?1)",
                &[Value::Text(now_rfc3339())],
            )
            .unwrap();

        let all = store.list_events(None, at("2024-05-01T12:00:00Z")).unwrap();
        assert_eq!(titles(&all), vec!["Good"]);
        assert!(matches!(store.get_event("bad"), Err(GalleryError::NotFound(_))));
    }
}
