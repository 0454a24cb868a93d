use crate::api::api_error::APIError;
use crate::api::model::SearchParams;
use crate::api::server::AppState;
use crate::error::Error;
use crate::index::{DocumentSummary, SearchHit};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_extra::extract::WithRejection;
use serde_json::json;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub(super) fn new(state: AppState, timeout: Duration) -> Router {
    Router::new()
        .route("/healthcheck", get(health_check))
        .route("/search", get(search))
        .route("/random", get(random))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(timeout))
        .with_state(state)
}

#[allow(clippy::unused_async)]
async fn health_check() -> impl IntoResponse {
    Json(json!({"ok":"healthy"}))
}

async fn search(
    State(state): State<AppState>,
    WithRejection(Query(params), _): WithRejection<Query<SearchParams>, APIError>,
) -> Result<Json<Vec<SearchHit>>, APIError> {
    let index = state.index.current().await?;
    let query = params.query().ok_or(Error::EmptyQuery)?;
    let hits = index.search(query);
    tracing::debug!("search \"{query}\" matched {} documents", hits.len());
    Ok(Json(hits))
}

async fn random(State(state): State<AppState>) -> Result<Json<DocumentSummary>, APIError> {
    let index = state.index.current().await?;
    Ok(Json(index.random_pick()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::Document;
    use crate::index::{ActiveIndex, SearchIndex};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn app(index: ActiveIndex) -> Router {
        new(AppState { index }, Duration::from_secs(5))
    }

    async fn ready_index(documents: &[Document]) -> ActiveIndex {
        let index = ActiveIndex::new();
        index.replace(SearchIndex::build(documents)).await;
        index
    }

    fn documents() -> Vec<Document> {
        vec![
            Document {
                id: 0,
                title: "T".to_string(),
                text: "Hello World".to_string(),
                description: Some("greeting page".to_string()),
                url: "a.dev".to_string(),
            },
            Document {
                id: 1,
                title: "Other".to_string(),
                text: "Unrelated words".to_string(),
                description: None,
                url: "b.dev".to_string(),
            },
        ]
    }

    #[tokio::test]
    async fn healthcheck() {
        let (status, body) = get_json(&app(ActiveIndex::new()), "/healthcheck").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"ok":"healthy"}));
    }

    #[tokio::test]
    async fn queries_before_first_index_are_unavailable() {
        let app = app(ActiveIndex::new());
        let (status, body) = get_json(&app, "/search?q=hello").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["error"].as_str().unwrap().contains("not ready"));

        let (status, _) = get_json(&app, "/random").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn search_returns_hits_without_text() {
        let app = app(ready_index(&documents()).await);
        let (status, body) = get_json(&app, "/search?q=hello%20world").await;
        assert_eq!(status, StatusCode::OK);

        let hits = body.as_array().unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["url"], "a.dev");
        assert_eq!(hits[0]["title"], "T");
        assert_eq!(hits[0]["description"], "greeting page");
        assert!(hits[0].get("text").is_none());
        assert!(hits[0]["score"].as_f64().unwrap() > 0.0);
    }

    #[tokio::test]
    async fn blank_or_missing_query_is_a_bad_request() {
        let app = app(ready_index(&documents()).await);
        for uri in ["/search", "/search?q=", "/search?q=%20%20"] {
            let (status, body) = get_json(&app, uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["error"], "query parameter \"q\" is required");
        }
    }

    #[tokio::test]
    async fn random_returns_a_document_without_text() {
        let app = app(ready_index(&documents()).await);
        let (status, body) = get_json(&app, "/random").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.get("text").is_none());
        assert!(["a.dev", "b.dev"].contains(&body["url"].as_str().unwrap()));
    }

    #[tokio::test]
    async fn random_on_empty_index_is_not_found() {
        let app = app(ready_index(&[]).await);
        let (status, _) = get_json(&app, "/random").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
