//! Local stand-ins for Azure endpoints used by the client tests.

use std::sync::{Arc, Mutex};

use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use async_trait::async_trait;
use chrono::Utc;

use super::credential::{AccessToken, TokenCredential};
use crate::domain::error::Result;

pub struct StaticCredential;

#[async_trait]
impl TokenCredential for StaticCredential {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn get_token(&self, _scope: &str) -> Result<AccessToken> {
        Ok(AccessToken {
            token: "static-token".to_string(),
            expires_at: Utc::now() + chrono::Duration::hours(1),
        })
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

struct StubState {
    status: u16,
    body: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

pub struct StubServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl StubServer {
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn record(req: HttpRequest, body: web::Bytes, state: web::Data<StubState>) -> HttpResponse {
    let headers = req
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();
    state.requests.lock().unwrap().push(RecordedRequest {
        method: req.method().to_string(),
        path: req.path().to_string(),
        query: req.query_string().to_string(),
        headers,
        body: body.to_vec(),
    });

    let status = actix_web::http::StatusCode::from_u16(state.status).unwrap();
    HttpResponse::build(status)
        .content_type("application/json")
        .body(state.body.clone())
}

/// Starts a server on an ephemeral port that records every request and
/// answers all of them with `status` and `body`.
pub async fn spawn_recorder(status: u16, body: &str) -> StubServer {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let state = web::Data::new(StubState {
        status,
        body: body.to_string(),
        requests: requests.clone(),
    });

    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .default_service(web::route().to(record))
    })
    .workers(1)
    .disable_signals()
    .bind(("127.0.0.1", 0))
    .unwrap();
    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());

    StubServer {
        base_url: format!("http://{}", addr),
        requests,
    }
}
