mod artworks;
mod collections;
mod events;
mod favorites;
mod profiles;

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderMap;
use gallery_core::{Authenticator, ServiceError};

use crate::feed::FeedService;
use crate::model::Role;
use crate::store::GalleryStore;

/// Shared state of the gallery handlers.
#[derive(Clone)]
pub struct GalleryState {
    pub store: Arc<GalleryStore>,
    pub feed: Arc<FeedService>,
    pub auth: Arc<dyn Authenticator>,
}

impl GalleryState {
    /// The viewer behind a request, if any.
    fn viewer(&self, headers: &HeaderMap) -> Result<Option<String>, ServiceError> {
        self.auth.viewer(headers)
    }

    fn require_viewer(&self, headers: &HeaderMap) -> Result<String, ServiceError> {
        self.viewer(headers)?
            .ok_or_else(|| ServiceError::Unauthorized("sign in required".into()))
    }

    /// The viewer and their role, if the role passes `allowed`.
    fn require_role(
        &self,
        headers: &HeaderMap,
        allowed: fn(Role) -> bool,
    ) -> Result<(String, Role), ServiceError> {
        let viewer = self.require_viewer(headers)?;
        let role = self.store.role_of(&viewer)?;
        if !allowed(role) {
            return Err(ServiceError::PermissionDenied(format!(
                "role '{role}' may not do this"
            )));
        }
        Ok((viewer, role))
    }
}

/// Build the complete gallery module router.
///
/// Routes:
/// - `GET    /artworks`                 ranked feed (search, tags, sort)
/// - `POST   /artworks`                 create artwork (creator, admin)
/// - `GET    /artworks/{id}`            artwork with count and liked flag
/// - `PUT    /artworks/{id}`            patch artwork (admin)
/// - `DELETE /artworks/{id}`            delete artwork (admin)
/// - `POST   /artworks/{id}/@favorite`  toggle favorite
/// - `GET    /favorites`                favorites page
/// - `DELETE /favorites/{id}`           remove favorite (owner, admin)
/// - `GET    /profiles`                 list profiles
/// - `POST   /profiles`                 create profile
/// - `GET    /profiles/{id}`            get profile
/// - `PUT    /profiles/{id}`            patch profile (self, admin)
/// - `DELETE /profiles/{id}`            delete profile (self, admin)
/// - `GET    /authors`                  creators and admins
/// - `GET    /events`                   events by start, `?status=` filter
/// - `POST   /events`                   create event (admin)
/// - `GET    /events/{id}`              event with status
/// - `PUT    /events/{id}`              patch event (admin)
/// - `DELETE /events/{id}`              delete event (admin)
/// - `GET    /collections`              collections, newest first
/// - `POST   /collections`              create collection (admin)
/// - `GET    /collections/{id}`         collection with its artworks
/// - `DELETE /collections/{id}`         delete collection (admin)
/// - `POST   /collections/{id}/items`   add artwork (admin)
/// - `DELETE /collections/{id}/items/{artwork_id}`  remove artwork (admin)
pub fn router(state: GalleryState) -> Router {
    Router::new()
        .merge(artworks::router(state.clone()))
        .merge(collections::router(state.clone()))
        .merge(events::router(state.clone()))
        .merge(favorites::router(state.clone()))
        .merge(profiles::router(state))
}
