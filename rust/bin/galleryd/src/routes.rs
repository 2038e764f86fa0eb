//! Route registration: module routes plus system endpoints.

use axum::Router;
use axum::response::IntoResponse;
use axum::routing::get;

/// Build the complete router. Each module is mounted under `/{name}`.
pub fn build_router(module_routes: Vec<(&str, Router)>) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/version", get(version));

    for (name, router) in module_routes {
        app = app.nest(&format!("/{name}"), router);
    }
    app
}

async fn health() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "ok",
    }))
}

async fn version() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": "galleryd",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use gallery::GalleryModule;
    use gallery_core::{Module, TrustedHeader};
    use gallery_sql::{SQLStore, SqliteStore};
    use tower::ServiceExt;

    use super::*;

    fn app() -> Router {
        let db: Arc<dyn SQLStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        let module = GalleryModule::new(db, Arc::new(TrustedHeader::default()), 200).unwrap();
        build_router(vec![(module.name(), module.routes())])
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let resp = app
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn system_endpoints() {
        let (status, json) = get_json(app(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");

        let (_, json) = get_json(app(), "/version").await;
        assert_eq!(json["name"], "galleryd");
    }

    #[tokio::test]
    async fn gallery_is_nested() {
        let (status, json) = get_json(app(), "/gallery/artworks").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["items"], serde_json::json!([]));
    }
}
