//! Favorite aggregation.
//!
//! Counts and liked flags are always derived from the `favorites` relation;
//! there is no counter column. After a toggle the count is re-read, never
//! adjusted locally, since other viewers may have toggled concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use gallery_core::{new_id, now_rfc3339};
use gallery_sql::{SQLError, Select, Value};
use tracing::{debug, warn};

use crate::error::{FavoriteOp, GalleryError};
use crate::model::Toggle;
use crate::relation::RelationStore;

const TABLE: &str = "favorites";

/// A concurrent delete can remove the row we collided with before we read
/// it back; the insert is retried this many times in total.
const INSERT_ATTEMPTS: usize = 3;

pub struct FavoriteAggregator {
    relation: Arc<dyn RelationStore>,
}

impl FavoriteAggregator {
    pub fn new(relation: Arc<dyn RelationStore>) -> Self {
        Self { relation }
    }

    /// Favorite count per artwork. Every requested id is present in the
    /// result, with zero when nobody favorited it.
    pub async fn counts_for(
        &self,
        artwork_ids: &[String],
    ) -> Result<HashMap<String, u64>, SQLError> {
        let mut counts: HashMap<String, u64> =
            artwork_ids.iter().map(|id| (id.clone(), 0)).collect();
        if counts.is_empty() {
            return Ok(counts);
        }

        let query = Select::from(TABLE)
            .columns(&["artwork_id"])
            .is_in("artwork_id", to_values(counts.keys()));
        for row in self.relation.select(&query).await? {
            if let Some(count) = row.get_str("artwork_id").and_then(|id| counts.get_mut(id)) {
                *count += 1;
            }
        }
        Ok(counts)
    }

    /// Count for a single artwork, without transferring rows.
    pub async fn count_for(&self, artwork_id: &str) -> Result<u64, SQLError> {
        self.relation
            .count(&Select::from(TABLE).eq("artwork_id", artwork_id))
            .await
    }

    /// The viewer's favorite row id per artwork. Anonymous viewers like nothing.
    pub async fn liked_set_for(
        &self,
        viewer: Option<&str>,
        artwork_ids: &[String],
    ) -> Result<HashMap<String, String>, SQLError> {
        let Some(viewer) = viewer else {
            return Ok(HashMap::new());
        };
        if artwork_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let query = Select::from(TABLE)
            .columns(&["id", "artwork_id"])
            .eq("user_id", viewer)
            .is_in("artwork_id", to_values(artwork_ids.iter()));
        let rows = self.relation.select(&query).await?;
        Ok(rows
            .iter()
            .filter_map(|r| {
                Some((
                    r.get_str("artwork_id")?.to_string(),
                    r.get_str("id")?.to_string(),
                ))
            })
            .collect())
    }

    /// The viewer's favorite row for one artwork, if any.
    pub async fn find(&self, viewer: &str, artwork_id: &str) -> Result<Option<String>, SQLError> {
        let query = Select::from(TABLE)
            .columns(&["id"])
            .eq("user_id", viewer)
            .eq("artwork_id", artwork_id)
            .range(0, 1);
        let rows = self.relation.select(&query).await?;
        Ok(rows.first().and_then(|r| r.get_str("id")).map(String::from))
    }

    /// Add or remove the viewer's favorite on an artwork.
    ///
    /// With `current` set the row is deleted (already gone counts as done);
    /// otherwise a row is inserted, and a duplicate key means a concurrent
    /// request won the race, so its row is returned instead.
    pub async fn toggle(
        &self,
        viewer: &str,
        artwork_id: &str,
        current: Option<&str>,
    ) -> Result<Toggle, GalleryError> {
        let (liked, favorite_id) = match current {
            Some(favorite_id) => {
                self.remove(viewer, artwork_id, favorite_id).await?;
                (false, None)
            }
            None => (true, Some(self.add(viewer, artwork_id).await?)),
        };

        let favorites_count = match self.count_for(artwork_id).await {
            Ok(n) => Some(n),
            Err(e) => {
                warn!(artwork = artwork_id, error = %e, "favorite count refresh failed");
                None
            }
        };

        Ok(Toggle {
            liked,
            favorite_id,
            favorites_count,
        })
    }

    async fn remove(
        &self,
        viewer: &str,
        artwork_id: &str,
        favorite_id: &str,
    ) -> Result<(), GalleryError> {
        // Scoped to the viewer: a stale or forged id never removes someone
        // else's row.
        let query = Select::from(TABLE)
            .eq("id", favorite_id)
            .eq("user_id", viewer);
        let removed = self
            .relation
            .delete(&query)
            .await
            .map_err(|e| GalleryError::favorite(artwork_id, FavoriteOp::Delete, e))?;
        if removed == 0 {
            debug!(artwork = artwork_id, favorite = favorite_id, "favorite already removed");
        }
        Ok(())
    }

    async fn add(&self, viewer: &str, artwork_id: &str) -> Result<String, GalleryError> {
        let mut last = None;
        for attempt in 1..=INSERT_ATTEMPTS {
            let row = vec![
                ("id".to_string(), Value::Text(new_id())),
                ("user_id".to_string(), Value::from(viewer)),
                ("artwork_id".to_string(), Value::from(artwork_id)),
                ("created_at".to_string(), Value::Text(now_rfc3339())),
            ];
            match self.relation.insert(TABLE, row).await {
                Ok(row) => {
                    return row.get_str("id").map(String::from).ok_or_else(|| {
                        GalleryError::Store {
                            artwork_id: artwork_id.to_string(),
                            op: FavoriteOp::Insert,
                            message: "inserted favorite has no id".into(),
                        }
                    });
                }
                Err(e) if e.is_unique_violation() => {
                    debug!(artwork = artwork_id, attempt, "favorite insert raced, reading winner");
                    let existing = self
                        .find(viewer, artwork_id)
                        .await
                        .map_err(|e| GalleryError::favorite(artwork_id, FavoriteOp::Read, e))?;
                    if let Some(id) = existing {
                        return Ok(id);
                    }
                    last = Some(e);
                }
                Err(e) => return Err(GalleryError::favorite(artwork_id, FavoriteOp::Insert, e)),
            }
        }

        let message = last.map(|e| e.to_string()).unwrap_or_default();
        Err(GalleryError::Store {
            artwork_id: artwork_id.to_string(),
            op: FavoriteOp::Insert,
            message: format!("favorite kept vanishing after {INSERT_ATTEMPTS} attempts: {message}"),
        })
    }
}

fn to_values<'a>(ids: impl Iterator<Item = &'a String>) -> Vec<Value> {
    ids.map(|id| Value::from(id.as_str())).collect()
}
