use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode, header};
use bookshelf::router::init_router;
use bookshelf::state::AppState;
use bookshelf::utils::email::Mailer;
use bookshelf_cache::MemoryStore;
use bookshelf_config::{CorsConfig, EmailConfig, TokenConfig};
use bookshelf_core::clock::ManualClock;
use bookshelf_db::MemoryUserStore;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

pub const PASSWORD: &str = "pa55word1234";

#[derive(Debug, Clone)]
pub struct SentEmail {
    pub recipient: String,
    pub template: String,
    pub data: Value,
}

/// Mailer that keeps every message instead of delivering it.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentEmail>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }

    /// The code from the most recent email to `recipient`.
    pub fn last_code_for(&self, recipient: &str) -> Option<String> {
        self.sent()
            .iter()
            .rev()
            .find(|email| email.recipient == recipient)
            .and_then(|email| email.data["code"].as_str().map(str::to_string))
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, recipient: &str, template: &str, data: &Value) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(SentEmail {
            recipient: recipient.to_string(),
            template: template.to_string(),
            data: data.clone(),
        });
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub mailer: Arc<RecordingMailer>,
    pub clock: Arc<ManualClock>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

fn email_config() -> EmailConfig {
    EmailConfig {
        enabled: false,
        smtp_host: "localhost".to_string(),
        smtp_port: 1025,
        smtp_username: String::new(),
        smtp_password: String::new(),
        from_email: "noreply@bookshelf.dev".to_string(),
        from_name: "Bookshelf".to_string(),
        max_attempts: 5,
        retry_backoff_secs: 0,
    }
}

impl TestApp {
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::default());
        let mailer = Arc::new(RecordingMailer::default());

        let state = AppState::new(
            Arc::new(MemoryUserStore::new()),
            Arc::new(MemoryStore::new(clock.clone())),
            mailer.clone(),
            clock.clone(),
            TokenConfig::default(),
            email_config(),
            CorsConfig {
                allowed_origins: vec!["http://localhost:3000".to_string()],
            },
        );

        Self {
            router: init_router(state.clone()),
            state,
            mailer,
            clock,
        }
    }

    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        bearer: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send_request(request).await
    }

    pub async fn send_request(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Waits for queued verification emails to go out.
    pub async fn settle(&self) {
        self.state.background.drain().await;
    }

    pub async fn register(&self, email: &str) -> TestResponse {
        let response = self
            .send(
                "POST",
                "/v1/auth/register",
                Some(json!({
                    "first_name": "Test",
                    "last_name": "Reader",
                    "email": email,
                    "password": PASSWORD,
                })),
                None,
            )
            .await;
        self.settle().await;
        response
    }

    /// Logs in and returns `(access_token, refresh_token)`.
    pub async fn login(&self, email: &str) -> (String, String) {
        let response = self
            .send(
                "POST",
                "/v1/auth/login",
                Some(json!({ "email": email, "password": PASSWORD })),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "login failed: {}", response.body);

        (
            response.body["access_token"].as_str().unwrap().to_string(),
            response.body["refresh_token"].as_str().unwrap().to_string(),
        )
    }
}

pub fn generate_unique_email() -> String {
    format!("reader-{}@example.com", uuid::Uuid::new_v4())
}
