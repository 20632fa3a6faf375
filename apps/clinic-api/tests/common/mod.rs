#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use clinic_api::{build_router, AppConfig, AppState};
use common_auth::Role;
use common_db::models::User;
use common_db::testing::TestDb;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub struct TestApp {
    pub db: TestDb,
    pub state: AppState,
    pub router: Router,
    _reports: TempDir,
}

pub fn test_config(reports_dir: &std::path::Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.jwt_secret = "segredo-de-teste-com-32-caracteres".to_string();
    config.database.key_phrase = "frase-de-teste".to_string();
    config.reports.dir = reports_dir.to_string_lossy().into_owned();
    config.calendar.utc_offset_minutes = -180;
    config
}

impl TestApp {
    pub async fn new() -> Self {
        let db = TestDb::new().await;
        let reports = tempfile::tempdir().unwrap();
        let state = AppState::new(db.database(), test_config(reports.path()));
        let router = build_router(state.clone());
        Self { db, state, router, _reports: reports }
    }

    /// Usuário com token já emitido
    pub async fn login_as(&self, name: &str, role: Role) -> (User, String) {
        let user = self.db.user(name, role).await;
        let issued = self.state.tokens.issue(user.id, user.role).unwrap();
        (user, issued.token)
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }
}
