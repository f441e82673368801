#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use rust_decimal_macros::dec;
use serde_json::Value;
use storefront_api::{
    app_router,
    config::AppConfig,
    db::{self, DbConfig},
    errors::ServiceError,
    handlers::AppServices,
    services::{
        checkout::{CheckoutSession, PaymentSessionCreator, PaymentSessionRequest},
        shipping::{QuoteRequest, RateQuoter, ShippingOption},
    },
    AppState,
};
use tower::ServiceExt;

/// Carrier stand-in answering a fixed PAC/SEDEX pair
#[derive(Default)]
pub struct StaticRateQuoter {
    pub calls: AtomicUsize,
}

#[async_trait]
impl RateQuoter for StaticRateQuoter {
    async fn quote(&self, _request: &QuoteRequest) -> Result<Vec<ShippingOption>, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![
            ShippingOption {
                code: "04014".into(),
                service: "SEDEX".into(),
                price: dec!(45.20),
                deadline: 2,
            },
            ShippingOption {
                code: "04510".into(),
                service: "PAC".into(),
                price: dec!(23.50),
                deadline: 7,
            },
        ])
    }
}

/// Payment provider stand-in that records every session request
#[derive(Default)]
pub struct RecordingPaymentProvider {
    pub requests: Mutex<Vec<PaymentSessionRequest>>,
}

impl RecordingPaymentProvider {
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<PaymentSessionRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl PaymentSessionCreator for RecordingPaymentProvider {
    async fn create_session(
        &self,
        request: &PaymentSessionRequest,
    ) -> Result<CheckoutSession, ServiceError> {
        let mut requests = self.requests.lock().unwrap();
        requests.push(request.clone());
        let id = format!("cs_test_{}", requests.len());
        Ok(CheckoutSession {
            url: Some(format!("https://checkout.example/pay/{id}")),
            session_id: id,
        })
    }
}

/// Helper harness for driving the router against an in-memory SQLite store.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub quoter: Arc<StaticRateQuoter>,
    pub payments: Arc<RecordingPaymentProvider>,
}

impl TestApp {
    pub async fn new() -> Self {
        let quoter = Arc::new(StaticRateQuoter::default());
        let payments = Arc::new(RecordingPaymentProvider::default());
        let (router, state) = build(quoter.clone(), payments.clone()).await;
        Self {
            router,
            state,
            quoter,
            payments,
        }
    }

    /// Build the app with custom carrier and payment collaborators; the
    /// `quoter` and `payments` fields then hold unused stand-ins.
    pub async fn with_collaborators(
        quoter: Arc<dyn RateQuoter>,
        payments: Arc<dyn PaymentSessionCreator>,
    ) -> Self {
        let (router, state) = build(quoter, payments).await;
        Self {
            router,
            state,
            quoter: Arc::default(),
            payments: Arc::default(),
        }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request builds");

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router responds")
    }

    pub async fn request_raw(&self, method: Method, uri: &str, body: &'static str) -> Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .expect("request builds");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router responds")
    }
}

async fn build(
    quoter: Arc<dyn RateQuoter>,
    payments: Arc<dyn PaymentSessionCreator>,
) -> (Router, AppState) {
    let cfg = test_config();
    let pool = db::establish_connection_with_config(&DbConfig {
        url: cfg.database_url.clone(),
        max_connections: 1,
        min_connections: 1,
        ..Default::default()
    })
    .await
    .expect("failed to create test database");
    db::run_migrations(&pool)
        .await
        .expect("failed to run migrations in tests");

    let db_arc = Arc::new(pool);
    let services = AppServices::with_collaborators(db_arc.clone(), &cfg, quoter, payments);
    let state = AppState::new(db_arc, cfg, services);
    (app_router(state.clone()), state)
}

pub fn test_config() -> AppConfig {
    let mut cfg = AppConfig::new(
        "sqlite::memory:".to_string(),
        "127.0.0.1".to_string(),
        18_080,
        "test".to_string(),
    );
    cfg.db_max_connections = 1;
    cfg.db_min_connections = 1;
    cfg
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
