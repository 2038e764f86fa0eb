mod collections;
mod events;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use gallery_core::{
    ListParams, ListResult, format_rfc3339, merge_patch, new_id, now_rfc3339, parse_rfc3339,
};
use gallery_sql::{Row, SQLStore, Select, Value};
use tracing::{debug, warn};

use crate::error::GalleryError;
use crate::model::{
    Artwork, ArtworkCard, Favorite, FavoriteEntry, NewArtwork, NewProfile, Profile, Role,
};

/// SQL schema for profiles, artworks, favorites and the card view.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS profiles (
    id          TEXT PRIMARY KEY,
    username    TEXT NOT NULL UNIQUE,
    full_name   TEXT,
    avatar_url  TEXT,
    role        TEXT NOT NULL DEFAULT 'user',
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS artworks (
    id          TEXT PRIMARY KEY,
    title       TEXT NOT NULL,
    image_url   TEXT NOT NULL,
    description TEXT,
    author_id   TEXT REFERENCES profiles(id) ON DELETE CASCADE,
    tags        TEXT NOT NULL DEFAULT '[]',
    created_at  TEXT
);
CREATE INDEX IF NOT EXISTS idx_artwork_created_at ON artworks(created_at);
CREATE INDEX IF NOT EXISTS idx_artwork_author ON artworks(author_id);

CREATE TABLE IF NOT EXISTS favorites (
    id          TEXT PRIMARY KEY,
    user_id     TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    artwork_id  TEXT NOT NULL REFERENCES artworks(id) ON DELETE CASCADE,
    created_at  TEXT NOT NULL,
    UNIQUE (user_id, artwork_id)
);
CREATE INDEX IF NOT EXISTS idx_favorite_artwork ON favorites(artwork_id);

CREATE VIEW IF NOT EXISTS artwork_cards AS
SELECT a.id, a.title, a.image_url, a.description, a.author_id, a.tags, a.created_at,
       p.username  AS author_username,
       p.full_name AS author_full_name
FROM artworks a
LEFT JOIN profiles p ON p.id = a.author_id;
";

/// Persistent storage for the gallery, backed by SQLStore (SQLite).
pub struct GalleryStore {
    db: Arc<dyn SQLStore>,
}

impl GalleryStore {
    /// Create a new GalleryStore and initialise the schema.
    pub fn new(db: Arc<dyn SQLStore>) -> Result<Self, GalleryError> {
        for schema in [SCHEMA, events::SCHEMA, collections::SCHEMA] {
            db.exec_batch(schema)
                .map_err(|e| GalleryError::Storage(format!("gallery schema init: {e}")))?;
        }
        Ok(Self { db })
    }

    /// The underlying SQL store, shared with the relation adapter.
    pub fn db(&self) -> Arc<dyn SQLStore> {
        Arc::clone(&self.db)
    }

    // -----------------------------------------------------------------------
    // Profiles
    // -----------------------------------------------------------------------

    /// Insert a profile for principal `id`.
    pub fn create_profile(&self, id: &str, req: &NewProfile) -> Result<Profile, GalleryError> {
        let profile = Profile {
            id: required("id", id)?,
            username: required("username", &req.username)?,
            full_name: optional(req.full_name.as_deref()),
            avatar_url: optional(req.avatar_url.as_deref()),
            role: req.role,
            created_at: now_rfc3339(),
        };

        self.db
            .exec(
                "INSERT INTO profiles (id, username, full_name, avatar_url, role, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                &profile_params(&profile),
            )
            .map_err(|e| match GalleryError::storage(e) {
                GalleryError::Conflict(_) => GalleryError::Conflict(format!(
                    "profile '{}' or username '{}' already exists",
                    profile.id, profile.username
                )),
                other => other,
            })?;

        debug!(id = %profile.id, username = %profile.username, "profile created");
        Ok(profile)
    }

    /// Get a profile by ID.
    pub fn get_profile(&self, id: &str) -> Result<Profile, GalleryError> {
        self.find_profile(id)?
            .ok_or_else(|| GalleryError::NotFound(format!("profile {id}")))
    }

    fn find_profile(&self, id: &str) -> Result<Option<Profile>, GalleryError> {
        let rows = self
            .db
            .query("SELECT * FROM profiles WHERE id = ?1", &[Value::from(id)])
            .map_err(GalleryError::storage)?;
        Ok(rows.first().map(row_to_profile))
    }

    /// Apply a JSON merge patch to a profile. `id` and `createdAt` are fixed.
    pub fn update_profile(
        &self,
        id: &str,
        patch: &serde_json::Value,
    ) -> Result<Profile, GalleryError> {
        let current = self.get_profile(id)?;
        let mut updated: Profile = apply_patch(&current, patch)?;
        updated.id = current.id;
        updated.created_at = current.created_at;
        updated.username = required("username", &updated.username)?;
        updated.full_name = optional(updated.full_name.as_deref());
        updated.avatar_url = optional(updated.avatar_url.as_deref());

        let affected = self
            .db
            .exec(
                "UPDATE profiles SET username = ?2, full_name = ?3, avatar_url = ?4, role = ?5 \
                 WHERE id = ?1",
                &profile_params(&updated)[..5],
            )
            .map_err(|e| match GalleryError::storage(e) {
                GalleryError::Conflict(_) => {
                    GalleryError::Conflict(format!("username '{}' is taken", updated.username))
                }
                other => other,
            })?;

        if affected == 0 {
            return Err(GalleryError::NotFound(format!("profile {id}")));
        }
        Ok(updated)
    }

    /// Delete a profile. Authored artworks and the user's favorites go with it.
    pub fn delete_profile(&self, id: &str) -> Result<(), GalleryError> {
        let affected = self
            .db
            .exec("DELETE FROM profiles WHERE id = ?1", &[Value::from(id)])
            .map_err(GalleryError::storage)?;

        if affected == 0 {
            return Err(GalleryError::NotFound(format!("profile {id}")));
        }
        Ok(())
    }

    /// List profiles, optionally restricted to one role, ordered by display name.
    pub fn list_profiles(
        &self,
        role: Option<Role>,
        params: &ListParams,
    ) -> Result<ListResult<Profile>, GalleryError> {
        let mut select = Select::from("profiles");
        if let Some(role) = role {
            select = select.eq("role", role.as_str());
        }

        let (count_sql, count_params) = select.to_count_sql();
        let total = self
            .db
            .query(&count_sql, &count_params)
            .map_err(GalleryError::storage)?
            .first()
            .and_then(|r| r.get_i64("cnt"))
            .unwrap_or(0) as usize;

        // Display-name ordering needs an expression, so the page query is
        // rendered by hand around the builder's WHERE clause.
        let (base_sql, mut params_out) = select.to_sql();
        params_out.push(Value::Integer(params.limit as i64));
        params_out.push(Value::Integer(params.offset as i64));
        let sql = format!(
            "{base_sql} ORDER BY casefold(COALESCE(NULLIF(TRIM(full_name), ''), username)), id \
             LIMIT ?{} OFFSET ?{}",
            params_out.len() - 1,
            params_out.len()
        );

        let rows = self
            .db
            .query(&sql, &params_out)
            .map_err(GalleryError::storage)?;

        Ok(ListResult {
            items: rows.iter().map(row_to_profile).collect(),
            total,
        })
    }

    /// Profiles that can own artworks, for the author picker.
    pub fn list_authors(&self) -> Result<Vec<Profile>, GalleryError> {
        let rows = self
            .db
            .query(
                "SELECT * FROM profiles WHERE role IN ('creator', 'admin') \
                 ORDER BY casefold(COALESCE(NULLIF(TRIM(full_name), ''), username)), id",
                &[],
            )
            .map_err(GalleryError::storage)?;
        Ok(rows.iter().map(row_to_profile).collect())
    }

    /// Role of a viewer. A viewer without a profile row is a plain user.
    pub fn role_of(&self, viewer: &str) -> Result<Role, GalleryError> {
        let rows = self
            .db
            .query("SELECT role FROM profiles WHERE id = ?1", &[Value::from(viewer)])
            .map_err(GalleryError::storage)?;
        Ok(rows
            .first()
            .and_then(|r| r.get_str("role"))
            .and_then(Role::from_str)
            .unwrap_or_default())
    }

    // -----------------------------------------------------------------------
    // Artworks
    // -----------------------------------------------------------------------

    /// Insert a new artwork.
    pub fn create_artwork(&self, req: &NewArtwork) -> Result<Artwork, GalleryError> {
        let artwork = Artwork {
            id: new_id(),
            title: required("title", &req.title)?,
            image_url: required("imageUrl", &req.image_url)?,
            description: optional(req.description.as_deref()),
            author_id: optional(req.author_id.as_deref()),
            tags: normalize_tags(&req.tags),
            // Stored at microsecond precision; the returned value must match reads.
            created_at: Some(req.created_at.unwrap_or_else(Utc::now).trunc_subsecs(6)),
        };

        self.db
            .exec(
                "INSERT INTO artworks (id, title, image_url, description, author_id, tags, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                &artwork_params(&artwork)?,
            )
            .map_err(|e| match GalleryError::storage(e) {
                GalleryError::Validation(_) => GalleryError::Validation(format!(
                    "author {} does not exist",
                    artwork.author_id.as_deref().unwrap_or("-")
                )),
                other => other,
            })?;

        debug!(id = %artwork.id, title = %artwork.title, "artwork created");
        Ok(artwork)
    }

    /// Get an artwork by ID.
    pub fn get_artwork(&self, id: &str) -> Result<Artwork, GalleryError> {
        let rows = self
            .db
            .query("SELECT * FROM artworks WHERE id = ?1", &[Value::from(id)])
            .map_err(GalleryError::storage)?;
        rows.first()
            .map(row_to_artwork)
            .ok_or_else(|| GalleryError::NotFound(format!("artwork {id}")))
    }

    /// Get an artwork with its author's names.
    pub fn get_card(&self, id: &str) -> Result<ArtworkCard, GalleryError> {
        let rows = self
            .db
            .query("SELECT * FROM artwork_cards WHERE id = ?1", &[Value::from(id)])
            .map_err(GalleryError::storage)?;
        rows.first()
            .map(row_to_card)
            .ok_or_else(|| GalleryError::NotFound(format!("artwork {id}")))
    }

    /// Apply a JSON merge patch to an artwork. `id` and `createdAt` are fixed.
    pub fn update_artwork(
        &self,
        id: &str,
        patch: &serde_json::Value,
    ) -> Result<Artwork, GalleryError> {
        let current = self.get_artwork(id)?;
        let mut updated: Artwork = apply_patch(&current, patch)?;
        updated.id = current.id;
        updated.created_at = current.created_at;
        updated.title = required("title", &updated.title)?;
        updated.image_url = required("imageUrl", &updated.image_url)?;
        updated.description = optional(updated.description.as_deref());
        updated.author_id = optional(updated.author_id.as_deref());
        updated.tags = normalize_tags(&updated.tags);

        let params = artwork_params(&updated)?;
        let affected = self
            .db
            .exec(
                "UPDATE artworks SET title = ?2, image_url = ?3, description = ?4, \
                 author_id = ?5, tags = ?6 WHERE id = ?1",
                &params[..6],
            )
            .map_err(GalleryError::storage)?;

        if affected == 0 {
            return Err(GalleryError::NotFound(format!("artwork {id}")));
        }
        Ok(updated)
    }

    /// Delete an artwork. Its favorites go with it.
    pub fn delete_artwork(&self, id: &str) -> Result<(), GalleryError> {
        let affected = self
            .db
            .exec("DELETE FROM artworks WHERE id = ?1", &[Value::from(id)])
            .map_err(GalleryError::storage)?;

        if affected == 0 {
            return Err(GalleryError::NotFound(format!("artwork {id}")));
        }
        Ok(())
    }

    /// List artwork cards, newest first.
    pub fn list_artworks(
        &self,
        params: &ListParams,
    ) -> Result<ListResult<ArtworkCard>, GalleryError> {
        let select = Select::from("artwork_cards");

        let (count_sql, count_params) = select.to_count_sql();
        let total = self
            .db
            .query(&count_sql, &count_params)
            .map_err(GalleryError::storage)?
            .first()
            .and_then(|r| r.get_i64("cnt"))
            .unwrap_or(0) as usize;

        let (sql, sql_params) = select
            .order_by("created_at", false)
            .order_by("id", true)
            .range(params.offset, params.limit)
            .to_sql();
        let rows = self
            .db
            .query(&sql, &sql_params)
            .map_err(GalleryError::storage)?;

        Ok(ListResult {
            items: rows.iter().map(row_to_card).collect(),
            total,
        })
    }

    // -----------------------------------------------------------------------
    // Favorites page
    // -----------------------------------------------------------------------

    /// Favorites visible to `viewer`: every row for admins, own rows otherwise.
    ///
    /// Favorites whose artwork disappeared are skipped by the join.
    pub fn favorites_for(&self, viewer: &str) -> Result<Vec<FavoriteEntry>, GalleryError> {
        let admin = self.role_of(viewer)? == Role::Admin;

        let result = if admin {
            self.db.query(
                "SELECT f.id AS favorite_id, f.user_id AS liker_id, a.* \
                 FROM favorites f JOIN artworks a ON a.id = f.artwork_id \
                 ORDER BY f.created_at DESC, f.id",
                &[],
            )
        } else {
            self.db.query(
                "SELECT f.id AS favorite_id, f.user_id AS liker_id, a.* \
                 FROM favorites f JOIN artworks a ON a.id = f.artwork_id \
                 WHERE f.user_id = ?1 \
                 ORDER BY f.created_at DESC, f.id",
                &[Value::from(viewer)],
            )
        };
        let rows = result.map_err(GalleryError::storage)?;

        let likers = if admin {
            let ids: HashSet<&str> = rows.iter().filter_map(|r| r.get_str("liker_id")).collect();
            self.profiles_by_id(ids.into_iter().map(Value::from).collect())?
        } else {
            HashMap::new()
        };

        Ok(rows
            .iter()
            .filter_map(|row| {
                let favorite_id = row.get_str("favorite_id")?.to_string();
                let liker = row
                    .get_str("liker_id")
                    .and_then(|id| likers.get(id))
                    .cloned();
                Some(FavoriteEntry {
                    favorite_id,
                    artwork: row_to_artwork(row),
                    liker,
                })
            })
            .collect())
    }

    fn profiles_by_id(&self, ids: Vec<Value>) -> Result<HashMap<String, Profile>, GalleryError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let (sql, params) = Select::from("profiles").is_in("id", ids).to_sql();
        let rows = self.db.query(&sql, &params).map_err(GalleryError::storage)?;
        Ok(rows
            .iter()
            .map(row_to_profile)
            .map(|p| (p.id.clone(), p))
            .collect())
    }

    /// Get a favorite row by ID.
    pub fn get_favorite(&self, id: &str) -> Result<Option<Favorite>, GalleryError> {
        let rows = self
            .db
            .query("SELECT * FROM favorites WHERE id = ?1", &[Value::from(id)])
            .map_err(GalleryError::storage)?;
        Ok(rows.first().and_then(row_to_favorite))
    }

    /// Remove a favorite on behalf of `viewer` (its owner or an admin).
    ///
    /// Returns `false` when the row was already gone.
    pub fn remove_favorite(&self, viewer: &str, id: &str) -> Result<bool, GalleryError> {
        let Some(favorite) = self.get_favorite(id)? else {
            return Ok(false);
        };
        if favorite.user_id != viewer && self.role_of(viewer)? != Role::Admin {
            return Err(GalleryError::PermissionDenied(format!(
                "favorite {id} belongs to another user"
            )));
        }

        let affected = self
            .db
            .exec("DELETE FROM favorites WHERE id = ?1", &[Value::from(id)])
            .map_err(GalleryError::storage)?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Row decoding
// ---------------------------------------------------------------------------

pub(crate) fn row_to_profile(row: &Row) -> Profile {
    let id = row.get_str("id").unwrap_or_default().to_string();
    let role = match row.get_str("role") {
        Some(raw) => Role::from_str(raw).unwrap_or_else(|| {
            warn!(profile = %id, role = raw, "unknown role, treating as user");
            Role::User
        }),
        None => Role::User,
    };
    Profile {
        username: row.get_str("username").unwrap_or_default().to_string(),
        full_name: row.get_str("full_name").map(String::from),
        avatar_url: row.get_str("avatar_url").map(String::from),
        role,
        created_at: row.get_str("created_at").unwrap_or_default().to_string(),
        id,
    }
}

pub(crate) fn row_to_artwork(row: &Row) -> Artwork {
    let id = row.get_str("id").unwrap_or_default().to_string();
    Artwork {
        title: row.get_str("title").unwrap_or_default().to_string(),
        image_url: row.get_str("image_url").unwrap_or_default().to_string(),
        description: row.get_str("description").map(String::from),
        author_id: row.get_str("author_id").map(String::from),
        tags: decode_tags(&id, row.get_str("tags")),
        created_at: decode_timestamp(&id, row.get_str("created_at")),
        id,
    }
}

pub(crate) fn row_to_card(row: &Row) -> ArtworkCard {
    ArtworkCard {
        artwork: row_to_artwork(row),
        author_username: row.get_str("author_username").map(String::from),
        author_full_name: row.get_str("author_full_name").map(String::from),
    }
}

pub(crate) fn row_to_favorite(row: &Row) -> Option<Favorite> {
    Some(Favorite {
        id: row.get_str("id")?.to_string(),
        user_id: row.get_str("user_id")?.to_string(),
        artwork_id: row.get_str("artwork_id")?.to_string(),
        created_at: row.get_str("created_at").unwrap_or_default().to_string(),
    })
}

fn decode_tags(id: &str, raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(tags) => tags,
        Err(e) => {
            warn!(artwork = %id, error = %e, "malformed tags, treating as untagged");
            Vec::new()
        }
    }
}

fn decode_timestamp(id: &str, raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?;
    let parsed = parse_rfc3339(raw);
    if parsed.is_none() {
        warn!(artwork = %id, created_at = raw, "malformed timestamp, treating as absent");
    }
    parsed
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn profile_params(p: &Profile) -> Vec<Value> {
    vec![
        Value::from(p.id.as_str()),
        Value::from(p.username.as_str()),
        Value::opt_text(p.full_name.as_deref()),
        Value::opt_text(p.avatar_url.as_deref()),
        Value::from(p.role.as_str()),
        Value::from(p.created_at.as_str()),
    ]
}

fn artwork_params(a: &Artwork) -> Result<Vec<Value>, GalleryError> {
    let tags = serde_json::to_string(&a.tags).map_err(|e| GalleryError::Storage(e.to_string()))?;
    Ok(vec![
        Value::from(a.id.as_str()),
        Value::from(a.title.as_str()),
        Value::from(a.image_url.as_str()),
        Value::opt_text(a.description.as_deref()),
        Value::opt_text(a.author_id.as_deref()),
        Value::Text(tags),
        match a.created_at {
            Some(ts) => Value::Text(format_rfc3339(ts)),
            None => Value::Null,
        },
    ])
}

/// Merge `patch` over the JSON form of `current` and decode the result.
fn apply_patch<T>(current: &T, patch: &serde_json::Value) -> Result<T, GalleryError>
where
    T: serde::Serialize + serde::de::DeserializeOwned,
{
    if !patch.is_object() {
        return Err(GalleryError::Validation("patch must be a JSON object".into()));
    }
    let mut base = serde_json::to_value(current).map_err(|e| GalleryError::Storage(e.to_string()))?;
    let mut patch = patch.clone();
    if let Some(obj) = patch.as_object_mut() {
        obj.remove("id");
        obj.remove("createdAt");
    }
    merge_patch(&mut base, &patch);
    serde_json::from_value(base).map_err(|e| GalleryError::Validation(e.to_string()))
}

fn required(field: &str, value: &str) -> Result<String, GalleryError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(GalleryError::Validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Trim tags, drop empty ones and duplicates, keep first-seen order.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty() && seen.insert(t.to_string()))
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gallery_sql::SqliteStore;

    pub(super) fn make_store() -> GalleryStore {
        let db: Arc<dyn SQLStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        GalleryStore::new(db).unwrap()
    }

    pub(super) fn new_profile(username: &str, role: Role) -> NewProfile {
        NewProfile {
            id: None,
            username: username.into(),
            full_name: None,
            avatar_url: None,
            role,
        }
    }

    pub(super) fn new_artwork(title: &str, author: Option<&str>, tags: &[&str]) -> NewArtwork {
        NewArtwork {
            title: title.into(),
            image_url: format!("{title}.png"),
            description: None,
            author_id: author.map(String::from),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            created_at: None,
        }
    }

    fn favorite(store: &GalleryStore, id: &str, user: &str, artwork: &str) {
        store
            .db
            .exec(
                "INSERT INTO favorites (id, user_id, artwork_id, created_at) VALUES (?1, ?2, ?3, ?4)",
                &[
                    Value::from(id),
                    Value::from(user),
                    Value::from(artwork),
                    Value::Text(now_rfc3339()),
                ],
            )
            .unwrap();
    }

    #[test]
    fn schema_init_is_idempotent() {
        let db: Arc<dyn SQLStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        GalleryStore::new(Arc::clone(&db)).unwrap();
        GalleryStore::new(db).unwrap();
    }

    #[test]
    fn profile_crud() {
        let store = make_store();
        let p = store
            .create_profile("u1", &new_profile(" anna ", Role::Creator))
            .unwrap();
        assert_eq!(p.username, "anna");

        let got = store.get_profile("u1").unwrap();
        assert_eq!(got, p);

        let updated = store
            .update_profile("u1", &serde_json::json!({"fullName": "Anna K.", "id": "hijack"}))
            .unwrap();
        assert_eq!(updated.id, "u1");
        assert_eq!(updated.display_name(), "Anna K.");

        store.delete_profile("u1").unwrap();
        assert!(matches!(store.get_profile("u1"), Err(GalleryError::NotFound(_))));
        assert!(matches!(store.delete_profile("u1"), Err(GalleryError::NotFound(_))));
    }

    #[test]
    fn duplicate_username_conflicts() {
        let store = make_store();
        store.create_profile("u1", &new_profile("anna", Role::User)).unwrap();
        let err = store
            .create_profile("u2", &new_profile("anna", Role::User))
            .unwrap_err();
        assert!(matches!(err, GalleryError::Conflict(_)), "got {err:?}");

        store.create_profile("u2", &new_profile("bo", Role::User)).unwrap();
        let err = store
            .update_profile("u2", &serde_json::json!({"username": "anna"}))
            .unwrap_err();
        assert!(matches!(err, GalleryError::Conflict(_)), "got {err:?}");
    }

    #[test]
    fn empty_required_fields_are_rejected() {
        let store = make_store();
        assert!(matches!(
            store.create_profile("u1", &new_profile("  ", Role::User)),
            Err(GalleryError::Validation(_))
        ));
        assert!(matches!(
            store.create_artwork(&new_artwork(" ", None, &[])),
            Err(GalleryError::Validation(_))
        ));
    }

    #[test]
    fn artwork_tags_are_normalized() {
        let store = make_store();
        let a = store
            .create_artwork(&new_artwork("Dawn", None, &[" sea ", "", "sea", "sky"]))
            .unwrap();
        assert_eq!(a.tags, vec!["sea", "sky"]);
        assert_eq!(store.get_artwork(&a.id).unwrap(), a);
    }

    #[test]
    fn created_artwork_reads_back_identically() {
        let store = make_store();
        let fresh = store.create_artwork(&new_artwork("Dawn", None, &[])).unwrap();
        assert_eq!(store.get_artwork(&fresh.id).unwrap().created_at, fresh.created_at);

        let mut backfill = new_artwork("Dusk", None, &[]);
        backfill.created_at = parse_rfc3339("2024-03-01T10:00:00.123456789Z");
        let a = store.create_artwork(&backfill).unwrap();
        assert_eq!(a.created_at, parse_rfc3339("2024-03-01T10:00:00.123456Z"));
        assert_eq!(store.get_artwork(&a.id).unwrap(), a);
    }

    #[test]
    fn artwork_with_unknown_author_is_invalid() {
        let store = make_store();
        let err = store
            .create_artwork(&new_artwork("Dawn", Some("ghost"), &[]))
            .unwrap_err();
        assert!(matches!(err, GalleryError::Validation(_)), "got {err:?}");
    }

    #[test]
    fn update_artwork_keeps_identity() {
        let store = make_store();
        let a = store.create_artwork(&new_artwork("Dawn", None, &["sea"])).unwrap();
        let updated = store
            .update_artwork(
                &a.id,
                &serde_json::json!({"title": "Dusk", "tags": ["sky", "sky"], "createdAt": null}),
            )
            .unwrap();
        assert_eq!(updated.title, "Dusk");
        assert_eq!(updated.tags, vec!["sky"]);
        assert_eq!(updated.created_at, a.created_at);

        let err = store
            .update_artwork(&a.id, &serde_json::json!({"title": ""}))
            .unwrap_err();
        assert!(matches!(err, GalleryError::Validation(_)));
    }

    #[test]
    fn cards_carry_author_names() {
        let store = make_store();
        store
            .create_profile(
                "u1",
                &NewProfile {
                    full_name: Some("Anna K.".into()),
                    ..new_profile("anna", Role::Creator)
                },
            )
            .unwrap();
        let a = store.create_artwork(&new_artwork("Dawn", Some("u1"), &[])).unwrap();
        let card = store.get_card(&a.id).unwrap();
        assert_eq!(card.author_username.as_deref(), Some("anna"));
        assert_eq!(card.author_full_name.as_deref(), Some("Anna K."));
    }

    #[test]
    fn list_artworks_newest_first() {
        let store = make_store();
        for (i, title) in ["a", "b", "c"].iter().enumerate() {
            let mut req = new_artwork(title, None, &[]);
            req.created_at = parse_rfc3339(&format!("2024-01-0{}T00:00:00Z", i + 1));
            store.create_artwork(&req).unwrap();
        }
        let page = store
            .list_artworks(&ListParams { limit: 2, offset: 0 })
            .unwrap();
        assert_eq!(page.total, 3);
        let titles: Vec<_> = page.items.iter().map(|c| c.artwork.title.as_str()).collect();
        assert_eq!(titles, vec!["c", "b"]);
    }

    #[test]
    fn authors_ordered_by_display_name() {
        let store = make_store();
        store.create_profile("u1", &new_profile("zed", Role::Creator)).unwrap();
        store
            .create_profile(
                "u2",
                &NewProfile {
                    full_name: Some("Boris".into()),
                    ..new_profile("xx", Role::Admin)
                },
            )
            .unwrap();
        store.create_profile("u3", &new_profile("alice", Role::User)).unwrap();

        let authors: Vec<_> = store.list_authors().unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(authors, vec!["u2", "u1"]);

        let users = store
            .list_profiles(Some(Role::User), &ListParams::default())
            .unwrap();
        assert_eq!(users.total, 1);
        assert_eq!(users.items[0].id, "u3");
    }

    #[test]
    fn malformed_rows_are_coerced() {
        let store = make_store();
        store
            .db
            .exec_batch(
                "INSERT INTO profiles (id, username, role, created_at) VALUES ('u1', 'anna', 'root', 'x');
                 INSERT INTO artworks (id, title, image_url, tags, created_at)
                 VALUES ('a1', 'Dawn', 'dawn.png', 'not json', 'yesterday');",
            )
            .unwrap();
        assert_eq!(store.get_profile("u1").unwrap().role, Role::User);
        let a = store.get_artwork("a1").unwrap();
        assert!(a.tags.is_empty());
        assert!(a.created_at.is_none());
    }

    #[test]
    fn deleting_profile_cascades() {
        let store = make_store();
        store.create_profile("u1", &new_profile("anna", Role::Creator)).unwrap();
        store.create_profile("u2", &new_profile("bo", Role::User)).unwrap();
        let own = store.create_artwork(&new_artwork("Own", Some("u1"), &[])).unwrap();
        let other = store.create_artwork(&new_artwork("Other", None, &[])).unwrap();
        favorite(&store, "f1", "u2", &own.id);
        favorite(&store, "f2", "u1", &other.id);

        store.delete_profile("u1").unwrap();
        assert!(store.get_artwork(&own.id).is_err());
        assert!(store.get_favorite("f1").unwrap().is_none());
        assert!(store.get_favorite("f2").unwrap().is_none());
    }

    #[test]
    fn favorites_listing_depends_on_role() {
        let store = make_store();
        store.create_profile("admin", &new_profile("root", Role::Admin)).unwrap();
        store.create_profile("u1", &new_profile("anna", Role::User)).unwrap();
        store.create_profile("u2", &new_profile("bo", Role::User)).unwrap();
        let a = store.create_artwork(&new_artwork("Dawn", None, &[])).unwrap();
        favorite(&store, "f1", "u1", &a.id);
        favorite(&store, "f2", "u2", &a.id);

        let own = store.favorites_for("u1").unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].favorite_id, "f1");
        assert!(own[0].liker.is_none());

        let all = store.favorites_for("admin").unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|e| e.liker.is_some()));

        assert!(store.favorites_for("nobody").unwrap().is_empty());
    }

    #[test]
    fn remove_favorite_checks_ownership() {
        let store = make_store();
        store.create_profile("admin", &new_profile("root", Role::Admin)).unwrap();
        store.create_profile("u1", &new_profile("anna", Role::User)).unwrap();
        store.create_profile("u2", &new_profile("bo", Role::User)).unwrap();
        let a = store.create_artwork(&new_artwork("Dawn", None, &[])).unwrap();
        favorite(&store, "f1", "u1", &a.id);
        favorite(&store, "f2", "u2", &a.id);

        assert!(matches!(
            store.remove_favorite("u2", "f1"),
            Err(GalleryError::PermissionDenied(_))
        ));
        assert!(store.remove_favorite("u1", "f1").unwrap());
        assert!(!store.remove_favorite("u1", "f1").unwrap());
        assert!(store.remove_favorite("admin", "f2").unwrap());
    }

    #[test]
    fn normalize_tags_keeps_order() {
        let tags = vec!["b".to_string(), " a".into(), "b ".into(), "  ".into()];
        assert_eq!(normalize_tags(&tags), vec!["b", "a"]);
    }
}
