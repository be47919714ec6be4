//! Loopback HTTP server for exercising the HTTP clients in tests.
//!
//! Routes match on the request path (query string ignored) and always return
//! the same canned response. Unknown paths get a 404. Every request is
//! recorded.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri, header};

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: String,
    pub body: String,
}

#[derive(Clone)]
struct Shared {
    routes: Arc<HashMap<String, (StatusCode, String)>>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

pub struct FakeServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl FakeServer {
    pub async fn start(routes: Vec<(&str, u16, String)>) -> Self {
        let routes = routes
            .into_iter()
            .map(|(path, status, body)| {
                let status = StatusCode::from_u16(status).expect("valid status code");
                (path.to_string(), (status, body))
            })
            .collect();
        let shared = Shared {
            routes: Arc::new(routes),
            requests: Arc::new(Mutex::new(Vec::new())),
        };
        let requests = Arc::clone(&shared.requests);

        let app = Router::new().fallback(respond).with_state(shared);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            base_url: format!("http://{addr}"),
            requests,
        }
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn count(&self, path: &str) -> usize {
        self.requests().iter().filter(|r| r.path == path).count()
    }
}

async fn respond(
    State(shared): State<Shared>,
    method: Method,
    uri: Uri,
    body: String,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    let path = uri.path().to_string();
    let (status, reply) = shared
        .routes
        .get(&path)
        .cloned()
        .unwrap_or((StatusCode::NOT_FOUND, "{}".to_string()));
    shared.requests.lock().expect("requests lock").push(Recorded {
        method,
        path,
        query: uri.query().unwrap_or_default().to_string(),
        body,
    });
    (status, [(header::CONTENT_TYPE, "application/json")], reply)
}
