#![cfg(test)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use sqlx::PgPool;
use testware::{TestSetup, create_settings};
use tower::ServiceExt;
use tower_sessions::MemoryStore;

use api::routes::build_router;
use api::state::AppState;
use repos::Repo;

fn setup(pool: &PgPool) -> Router {
    TestSetup::init();
    let state = AppState::new(Repo::new(pool.clone()), create_settings());
    build_router(state, MemoryStore::default())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_health_live_ok(pool: PgPool) {
    let app = setup(&pool);

    let request = Request::builder()
        .method("GET")
        .uri("/api/live")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    assert!(body.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_health_ready_ok(pool: PgPool) {
    let app = setup(&pool);

    let request = Request::builder()
        .method("GET")
        .uri("/api/ready")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_health_ready_not_ok(pool: PgPool) {
    let app = setup(&pool);

    pool.close().await;
    let request = Request::builder()
        .method("GET")
        .uri("/api/ready")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_unknown_route_not_found(pool: PgPool) {
    let app = setup(&pool);

    let request = Request::builder()
        .method("GET")
        .uri("/api/nope")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
