//! Test fixtures for driving the ladder through its HTTP API

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use elo_ladder::metrics::MetricsCollector;
use elo_ladder::rating::{EloConfig, EloRatingCalculator, InMemoryCompetitorStorage};
use elo_ladder::service::{create_router, ApiState, LadderService};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// A ladder plus the router serving it
pub struct TestApp {
    pub ladder: Arc<LadderService>,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(EloConfig::default(), None)
    }

    pub fn with_config(config: EloConfig, max_competitors: Option<usize>) -> Self {
        let calculator = EloRatingCalculator::new(config).expect("valid Elo config");
        let ladder = Arc::new(LadderService::new(
            Arc::new(calculator),
            Arc::new(InMemoryCompetitorStorage::new(max_competitors)),
            Arc::new(MetricsCollector::new().expect("metrics collector")),
        ));
        let router = create_router(ApiState::new(ladder.clone(), "elo-ladder-test"));

        Self { ladder, router }
    }

    /// Send a request and return the status with the raw body
    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, String) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).expect("valid request"))
            .await
            .expect("router is infallible");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");

        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Send a request and parse the body as JSON
    pub async fn send_json(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let (status, text) = self.send(method, uri, body).await;
        let json = serde_json::from_str(&text)
            .unwrap_or_else(|e| panic!("body of {} is not JSON ({}): {}", uri, e, text));
        (status, json)
    }

    pub async fn add_player(&self, name: &str) -> u64 {
        let (status, body) = self
            .send_json(
                Method::POST,
                "/player",
                Some(serde_json::json!({ "name": name })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "adding {} failed: {}", name, body);
        body["id"].as_u64().expect("numeric id")
    }

    pub async fn report_match(&self, winner_id: u64, loser_id: u64) -> (StatusCode, Value) {
        self.send_json(
            Method::POST,
            "/match",
            Some(serde_json::json!({ "winner_id": winner_id, "loser_id": loser_id })),
        )
        .await
    }

    pub async fn rating_of(&self, id: u64) -> f64 {
        let (status, body) = self
            .send_json(Method::GET, &format!("/player/{}", id), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        body["rating"].as_f64().expect("numeric rating")
    }
}
