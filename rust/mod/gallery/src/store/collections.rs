use std::collections::HashSet;

use gallery_core::{new_id, now_rfc3339};
use gallery_sql::{Row, Value};
use tracing::debug;

use super::{GalleryStore, optional, required, row_to_artwork};
use crate::error::GalleryError;
use crate::model::{COLLECTION_PREVIEW, Collection, NewCollection, NewCollectionItem};

pub(super) const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS collections (
    id          TEXT PRIMARY KEY,
    title       TEXT NOT NULL,
    description TEXT,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS collection_items (
    collection_id TEXT NOT NULL REFERENCES collections(id) ON DELETE CASCADE,
    artwork_id    TEXT NOT NULL REFERENCES artworks(id) ON DELETE CASCADE,
    position      INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (collection_id, artwork_id)
);
CREATE INDEX IF NOT EXISTS idx_collection_item_position
    ON collection_items(collection_id, position);
";

impl GalleryStore {
    /// Create a collection holding `artwork_ids` at positions 0, 1, ...
    ///
    /// Every artwork must exist; repeated ids keep their first position.
    pub fn create_collection(&self, req: &NewCollection) -> Result<Collection, GalleryError> {
        let title = required("title", &req.title)?;
        let mut seen = HashSet::new();
        let artwork_ids: Vec<String> = req
            .artwork_ids
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty() && seen.insert(id.to_string()))
            .map(String::from)
            .collect();
        for artwork_id in &artwork_ids {
            self.require_artwork(artwork_id)?;
        }

        let id = new_id();
        self.db
            .exec(
                "INSERT INTO collections (id, title, description, created_at) \
                 VALUES (?1, ?2, ?3, ?4)",
                &[
                    Value::from(id.as_str()),
                    Value::from(title.as_str()),
                    Value::opt_text(optional(req.description.as_deref()).as_deref()),
                    Value::Text(now_rfc3339()),
                ],
            )
            .map_err(GalleryError::storage)?;

        for (position, artwork_id) in artwork_ids.iter().enumerate() {
            self.insert_item(&id, artwork_id, position as i64)?;
        }

        debug!(id = %id, title = %title, items = artwork_ids.len(), "collection created");
        self.get_collection(&id)
    }

    /// A collection with its first artworks by position.
    pub fn get_collection(&self, id: &str) -> Result<Collection, GalleryError> {
        let rows = self
            .db
            .query("SELECT * FROM collections WHERE id = ?1", &[Value::from(id)])
            .map_err(GalleryError::storage)?;
        let row = rows
            .first()
            .ok_or_else(|| GalleryError::NotFound(format!("collection {id}")))?;
        self.with_artworks(row)
    }

    /// All collections, newest first.
    pub fn list_collections(&self) -> Result<Vec<Collection>, GalleryError> {
        let rows = self
            .db
            .query("SELECT * FROM collections ORDER BY created_at DESC, rowid DESC", &[])
            .map_err(GalleryError::storage)?;
        rows.iter().map(|row| self.with_artworks(row)).collect()
    }

    /// Delete a collection. Its items go with it; the artworks stay.
    pub fn delete_collection(&self, id: &str) -> Result<(), GalleryError> {
        let affected = self
            .db
            .exec("DELETE FROM collections WHERE id = ?1", &[Value::from(id)])
            .map_err(GalleryError::storage)?;

        if affected == 0 {
            return Err(GalleryError::NotFound(format!("collection {id}")));
        }
        Ok(())
    }

    /// Add an artwork to a collection, after the last item unless a
    /// position is given.
    pub fn add_collection_item(
        &self,
        collection_id: &str,
        item: &NewCollectionItem,
    ) -> Result<Collection, GalleryError> {
        self.get_collection(collection_id)?;
        let artwork_id = required("artworkId", &item.artwork_id)?;
        self.require_artwork(&artwork_id)?;

        let position = match item.position {
            Some(p) => p,
            None => self
                .db
                .query(
                    "SELECT COALESCE(MAX(position) + 1, 0) AS next \
                     FROM collection_items WHERE collection_id = ?1",
                    &[Value::from(collection_id)],
                )
                .map_err(GalleryError::storage)?
                .first()
                .and_then(|r| r.get_i64("next"))
                .unwrap_or(0),
        };
        self.insert_item(collection_id, &artwork_id, position)?;
        self.get_collection(collection_id)
    }

    /// Returns `false` when the artwork was not in the collection.
    pub fn remove_collection_item(
        &self,
        collection_id: &str,
        artwork_id: &str,
    ) -> Result<bool, GalleryError> {
        let affected = self
            .db
            .exec(
                "DELETE FROM collection_items WHERE collection_id = ?1 AND artwork_id = ?2",
                &[Value::from(collection_id), Value::from(artwork_id)],
            )
            .map_err(GalleryError::storage)?;
        Ok(affected > 0)
    }

    fn insert_item(
        &self,
        collection_id: &str,
        artwork_id: &str,
        position: i64,
    ) -> Result<(), GalleryError> {
        self.db
            .exec(
                "INSERT INTO collection_items (collection_id, artwork_id, position) \
                 VALUES (?1, ?2, ?3)",
                &[
                    Value::from(collection_id),
                    Value::from(artwork_id),
                    Value::Integer(position),
                ],
            )
            .map_err(|e| match GalleryError::storage(e) {
                GalleryError::Conflict(_) => GalleryError::Conflict(format!(
                    "artwork {artwork_id} is already in collection {collection_id}"
                )),
                other => other,
            })?;
        Ok(())
    }

    fn require_artwork(&self, artwork_id: &str) -> Result<(), GalleryError> {
        match self.get_artwork(artwork_id) {
            Err(GalleryError::NotFound(_)) => Err(GalleryError::Validation(format!(
                "artwork {artwork_id} does not exist"
            ))),
            other => other.map(|_| ()),
        }
    }

    fn with_artworks(&self, row: &Row) -> Result<Collection, GalleryError> {
        let id = row.get_str("id").unwrap_or_default().to_string();
        let items = self
            .db
            .query(
                "SELECT a.* FROM collection_items ci \
                 JOIN artworks a ON a.id = ci.artwork_id \
                 WHERE ci.collection_id = ?1 \
                 ORDER BY ci.position, a.id LIMIT ?2",
                &[Value::from(id.as_str()), Value::Integer(COLLECTION_PREVIEW as i64)],
            )
            .map_err(GalleryError::storage)?;

        Ok(Collection {
            title: row.get_str("title").unwrap_or_default().to_string(),
            description: row.get_str("description").map(String::from),
            created_at: row.get_str("created_at").unwrap_or_default().to_string(),
            artworks: items.iter().map(row_to_artwork).collect(),
            id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::{make_store, new_artwork};

    fn new_collection(title: &str, artwork_ids: &[&str]) -> NewCollection {
        NewCollection {
            title: title.into(),
            description: Some("  ".into()),
            artwork_ids: artwork_ids.iter().map(|id| id.to_string()).collect(),
        }
    }

    fn titles(c: &Collection) -> Vec<&str> {
        c.artworks.iter().map(|a| a.title.as_str()).collect()
    }

    #[test]
    fn items_keep_given_order() {
        let store = make_store();
        let a = store.create_artwork(&new_artwork("A", None, &[])).unwrap();
        let b = store.create_artwork(&new_artwork("B", None, &[])).unwrap();
        let c = store.create_artwork(&new_artwork("C", None, &[])).unwrap();

        let col = store
            .create_collection(&new_collection(" Picks ", &[&c.id, &a.id, &c.id, &b.id]))
            .unwrap();
        assert_eq!(col.title, "Picks");
        assert_eq!(col.description, None);
        assert_eq!(titles(&col), vec!["C", "A", "B"]);
        assert_eq!(store.get_collection(&col.id).unwrap(), col);
    }

    #[test]
    fn preview_is_capped() {
        let store = make_store();
        let ids: Vec<String> = (0..12)
            .map(|i| store.create_artwork(&new_artwork(&format!("art{i:02}"), None, &[])).unwrap().id)
            .collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();

        let col = store.create_collection(&new_collection("Big", &refs)).unwrap();
        assert_eq!(col.artworks.len(), COLLECTION_PREVIEW);
        assert_eq!(col.artworks[0].title, "art00");
        assert_eq!(col.artworks[8].title, "art08");
    }

    #[test]
    fn unknown_artwork_creates_nothing() {
        let store = make_store();
        let err = store
            .create_collection(&new_collection("Ghost", &["missing"]))
            .unwrap_err();
        assert!(matches!(err, GalleryError::Validation(_)), "got {err:?}");
        assert!(store.list_collections().unwrap().is_empty());

        let err = store.create_collection(&new_collection(" ", &[])).unwrap_err();
        assert!(matches!(err, GalleryError::Validation(_)), "got {err:?}");
    }

    #[test]
    fn newest_collection_first() {
        let store = make_store();
        store.create_collection(&new_collection("First", &[])).unwrap();
        store.create_collection(&new_collection("Second", &[])).unwrap();
        let listed: Vec<_> = store
            .list_collections()
            .unwrap()
            .into_iter()
            .map(|c| c.title)
            .collect();
        assert_eq!(listed, vec!["Second", "First"]);
    }

    #[test]
    fn add_and_remove_items() {
        let store = make_store();
        let a = store.create_artwork(&new_artwork("A", None, &[])).unwrap();
        let b = store.create_artwork(&new_artwork("B", None, &[])).unwrap();
        let c = store.create_artwork(&new_artwork("C", None, &[])).unwrap();
        let col = store.create_collection(&new_collection("Mix", &[&a.id])).unwrap();

        let item = |artwork_id: &str, position| NewCollectionItem {
            artwork_id: artwork_id.into(),
            position,
        };
        let col2 = store.add_collection_item(&col.id, &item(&b.id, None)).unwrap();
        assert_eq!(titles(&col2), vec!["A", "B"]);
        let col2 = store.add_collection_item(&col.id, &item(&c.id, Some(-1))).unwrap();
        assert_eq!(titles(&col2), vec!["C", "A", "B"]);

        let err = store.add_collection_item(&col.id, &item(&a.id, None)).unwrap_err();
        assert!(matches!(err, GalleryError::Conflict(_)), "got {err:?}");
        let err = store.add_collection_item(&col.id, &item("missing", None)).unwrap_err();
        assert!(matches!(err, GalleryError::Validation(_)), "got {err:?}");
        let err = store.add_collection_item("nope", &item(&a.id, None)).unwrap_err();
        assert!(matches!(err, GalleryError::NotFound(_)), "got {err:?}");

        assert!(store.remove_collection_item(&col.id, &a.id).unwrap());
        assert!(!store.remove_collection_item(&col.id, &a.id).unwrap());
        assert_eq!(titles(&store.get_collection(&col.id).unwrap()), vec!["C", "B"]);
    }

    #[test]
    fn deletes_cascade_through_items() {
        let store = make_store();
        let a = store.create_artwork(&new_artwork("A", None, &[])).unwrap();
        let b = store.create_artwork(&new_artwork("B", None, &[])).unwrap();
        let col = store.create_collection(&new_collection("Pair", &[&a.id, &b.id])).unwrap();

        store.delete_artwork(&a.id).unwrap();
        assert_eq!(titles(&store.get_collection(&col.id).unwrap()), vec!["B"]);

        store.delete_collection(&col.id).unwrap();
        assert!(matches!(store.get_collection(&col.id), Err(GalleryError::NotFound(_))));
        assert!(store.get_artwork(&b.id).is_ok());
        assert!(matches!(store.delete_collection(&col.id), Err(GalleryError::NotFound(_))));
    }
}
