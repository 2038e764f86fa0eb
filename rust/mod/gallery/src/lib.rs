pub mod api;
pub mod error;
pub mod favorites;
pub mod feed;
pub mod model;
pub mod ranking;
pub mod relation;
pub mod search;
pub mod store;

use std::sync::Arc;

use axum::Router;
use gallery_core::{Authenticator, Module};
use gallery_sql::SQLStore;

pub use api::GalleryState;
pub use error::{FavoriteOp, GalleryError};
pub use favorites::FavoriteAggregator;
pub use feed::{FeedService, FeedState, ToggleOutcome};
pub use relation::{RelationStore, SqlRelation};
pub use search::SearchMerger;
pub use store::GalleryStore;

/// Gallery module: artworks, profiles, favorites, the ranked feed, events
/// and curated collections.
pub struct GalleryModule {
    state: GalleryState,
}

impl GalleryModule {
    /// Initialize the schema on `db` and wire the services over it.
    pub fn new(
        db: Arc<dyn SQLStore>,
        auth: Arc<dyn Authenticator>,
        search_window: usize,
    ) -> Result<Self, GalleryError> {
        let store = Arc::new(GalleryStore::new(Arc::clone(&db))?);
        let relation: Arc<dyn RelationStore> = Arc::new(SqlRelation::new(db));
        let feed = Arc::new(FeedService::new(relation, search_window));
        Ok(Self {
            state: GalleryState { store, feed, auth },
        })
    }

    pub fn state(&self) -> &GalleryState {
        &self.state
    }
}

impl Module for GalleryModule {
    fn name(&self) -> &str {
        "gallery"
    }

    fn routes(&self) -> Router {
        api::router(self.state.clone())
    }
}
