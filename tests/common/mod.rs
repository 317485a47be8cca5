//! In-process stand-in for the classification service.

#![allow(dead_code)]

use axum::{
    extract::{Form, Multipart, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const PREDICT_PATH: &str = "/blood/upload-image-prediction";
pub const USERNAME: &str = "johndoe";
pub const PASSWORD: &str = "secret";
pub const TOKEN: &str = "token-johndoe";
pub const EMAIL: &str = "johndoe@example.com";

/// One multipart field as received by the service.
#[derive(Debug, Clone)]
pub struct Upload {
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// What the prediction endpoint answers with.
#[derive(Debug, Clone)]
pub enum Reply {
    Body(String),
    Json(serde_json::Value),
    Status(u16, String),
}

#[derive(Clone)]
pub struct FakeService {
    reply: Arc<Mutex<Reply>>,
    uploads: Arc<Mutex<Vec<Upload>>>,
    emails: Arc<Mutex<Vec<String>>>,
}

impl FakeService {
    pub fn new(reply: Reply) -> Self {
        Self {
            reply: Arc::new(Mutex::new(reply)),
            uploads: Arc::new(Mutex::new(Vec::new())),
            emails: Arc::new(Mutex::new(vec![EMAIL.to_string()])),
        }
    }

    pub fn set_reply(&self, reply: Reply) {
        *self.reply.lock().unwrap() = reply;
    }

    pub fn uploads(&self) -> Vec<Upload> {
        self.uploads.lock().unwrap().clone()
    }

    fn router(&self) -> Router {
        Router::new()
            .route(PREDICT_PATH, post(predict))
            .route("/auth/register", post(register))
            .route("/login/", post(login))
            .route("/users/profile", get(profile))
            .route("/blood/", get(history))
            .with_state(self.clone())
    }

    /// Serves on an ephemeral port and returns the base URL.
    pub async fn spawn(&self) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = self.router();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}")
    }
}

/// A base URL nothing listens on.
pub async fn unreachable_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

async fn predict(State(service): State<FakeService>, mut multipart: Multipart) -> Response {
    while let Some(field) = multipart.next_field().await.unwrap() {
        let upload = Upload {
            field: field.name().unwrap_or_default().to_string(),
            file_name: field.file_name().map(str::to_string),
            content_type: field.content_type().map(str::to_string),
            bytes: field.bytes().await.unwrap().to_vec(),
        };
        service.uploads.lock().unwrap().push(upload);
    }

    let reply = service.reply.lock().unwrap().clone();
    match reply {
        Reply::Body(body) => body.into_response(),
        Reply::Json(value) => Json(value).into_response(),
        Reply::Status(status, body) => {
            (StatusCode::from_u16(status).unwrap(), body).into_response()
        }
    }
}

async fn register(
    State(service): State<FakeService>,
    Json(body): Json<HashMap<String, String>>,
) -> Response {
    let fields = ["email", "username", "password"].map(|key| body.get(key));
    let [Some(email), Some(_), Some(_)] = fields else {
        return StatusCode::UNPROCESSABLE_ENTITY.into_response();
    };

    let mut emails = service.emails.lock().unwrap();
    if emails.contains(email) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": "Email already registered"})),
        )
            .into_response();
    }
    emails.push(email.clone());
    Json(json!(["User registered successfully"])).into_response()
}

async fn login(Form(form): Form<HashMap<String, String>>) -> Response {
    let username = form.get("username").map(String::as_str);
    let password = form.get("password").map(String::as_str);
    if form.get("grant_type").map(String::as_str) == Some("password")
        && username == Some(USERNAME)
        && password == Some(PASSWORD)
    {
        Json(json!({"access_token": TOKEN, "token_type": "bearer"})).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Incorrect username or password"})),
        )
            .into_response()
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {TOKEN}"))
        .unwrap_or(false)
}

async fn profile(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({
        "username": USERNAME,
        "age": 42,
        "gender": "female",
        "congenital_disorders": null
    }))
    .into_response()
}

async fn history(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!([
        {"date": "2024-10-03", "green": 1, "normal": 2, "red": 0, "kun": 0, "total": 3},
        {"date": "2024-10-04", "green": 0, "normal": 1, "red": 2, "kun": 1, "total": 4}
    ]))
    .into_response()
}
