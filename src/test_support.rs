//! Fake kubelet / API server for tests.
//!
//! Binds an axum router to `127.0.0.1:0` and records the path and
//! `Authorization` header of every request it sees.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::net::TcpListener;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub path: String,
    pub authorization: Option<String>,
}

/// Canned answers for one path. The last answer repeats once the list is
/// used up.
#[derive(Debug, Clone)]
pub struct Route {
    path: String,
    answers: Vec<(StatusCode, String)>,
    first_delay: Option<Duration>,
}

impl Route {
    pub fn ok(path: &str, body: &str) -> Self {
        Self::status(path, StatusCode::OK, body)
    }

    pub fn status(path: &str, status: StatusCode, body: &str) -> Self {
        Self {
            path: path.to_string(),
            answers: vec![(status, body.to_string())],
            first_delay: None,
        }
    }

    pub fn sequence(path: &str, answers: &[(StatusCode, &str)]) -> Self {
        Self {
            path: path.to_string(),
            answers: answers
                .iter()
                .map(|(status, body)| (*status, body.to_string()))
                .collect(),
            first_delay: None,
        }
    }

    /// Holds the first answer back for `delay`.
    pub fn delay_first(mut self, delay: Duration) -> Self {
        self.first_delay = Some(delay);
        self
    }
}

#[derive(Default)]
struct Inner {
    routes: HashMap<String, Route>,
    hits: HashMap<String, usize>,
    recorded: Vec<Recorded>,
}

type Shared = Arc<Mutex<Inner>>;

pub struct FakeServer {
    base: String,
    state: Shared,
}

impl FakeServer {
    pub async fn spawn(routes: Vec<Route>) -> Self {
        let inner = Inner {
            routes: routes.into_iter().map(|r| (r.path.clone(), r)).collect(),
            ..Default::default()
        };
        let state: Shared = Arc::new(Mutex::new(inner));

        let app = Router::new().fallback(answer).with_state(state.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base: format!("http://{}", addr),
            state,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn host(&self) -> String {
        self.base.trim_start_matches("http://").rsplit_once(':').unwrap().0.to_string()
    }

    pub fn port(&self) -> u16 {
        self.base.rsplit_once(':').unwrap().1.parse().unwrap()
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.lock().unwrap().recorded.clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.path).collect()
    }

    /// `Authorization` header of the first request to `path`, `None` when the
    /// path was never requested.
    pub fn authorization_for(&self, path: &str) -> Option<Option<String>> {
        self.requests()
            .into_iter()
            .find(|r| r.path == path)
            .map(|r| r.authorization)
    }

    /// A kube client talking to this server, authenticated with the token in
    /// `token_file` when given.
    pub fn kube_client(&self, token_file: Option<&Path>) -> kube::Client {
        kube::Client::try_from(self.kube_config(token_file)).unwrap()
    }

    pub fn kube_config(&self, token_file: Option<&Path>) -> kube::Config {
        let mut config = kube::Config::new(self.base.parse().unwrap());
        config.auth_info.token_file = token_file.map(|p| p.display().to_string());
        config
    }
}

async fn answer(State(state): State<Shared>, request: Request) -> Response {
    let path = request.uri().path().to_string();
    let authorization = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let (status, body, delay) = {
        let mut inner = state.lock().unwrap();
        inner.recorded.push(Recorded {
            path: path.clone(),
            authorization,
        });

        let hit = inner.hits.entry(path.clone()).or_insert(0);
        let n = *hit;
        *hit += 1;

        match inner.routes.get(&path) {
            Some(route) => {
                let (status, body) = route
                    .answers
                    .get(n)
                    .or_else(|| route.answers.last())
                    .cloned()
                    .unwrap_or((StatusCode::OK, String::new()));
                let delay = if n == 0 { route.first_delay } else { None };
                (status, body, delay)
            }
            None => (StatusCode::NOT_FOUND, "404 page not found".to_string(), None),
        }
    };

    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    (status, body).into_response()
}
