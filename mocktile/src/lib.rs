//! A small HTTP server for exercising tile and icon fetching in tests.
//!
//! Responses are registered per path up front, because a single map render requests many tile
//! URLs at once. Each path records how often it was hit, which is what the icon deduplication
//! tests key on.

use http_body_util::Full;
use hyper::{body::Bytes, server::conn::http1, service::Service, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::{
    collections::HashMap,
    future::Future,
    net::SocketAddr,
    pin::Pin,
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::net::TcpListener;

pub use hyper;

#[derive(Clone)]
struct CannedResponse {
    status: StatusCode,
    payload: Bytes,
    content_type: Option<String>,
    delay: Option<Duration>,
}

impl CannedResponse {
    fn ok(payload: Bytes) -> Self {
        Self {
            status: StatusCode::OK,
            payload,
            content_type: None,
            delay: None,
        }
    }
}

#[derive(Default)]
struct State {
    routes: HashMap<String, CannedResponse>,
    fallback: Option<CannedResponse>,
    hits: HashMap<String, usize>,
    headers: HashMap<String, Vec<(String, String)>>,
}

pub struct Server {
    port: u16,
    state: Arc<Mutex<State>>,
}

impl Server {
    /// Create a new [`Server`], bound to a random port on localhost.
    pub async fn bind() -> Server {
        let state = Arc::new(Mutex::new(State::default()));

        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let listener = TcpListener::bind(addr).await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let state_clone = state.clone();
        tokio::spawn(async move {
            loop {
                let (stream, _) = listener.accept().await.unwrap();
                let io = TokioIo::new(stream);

                let state = state_clone.clone();
                tokio::task::spawn(async move {
                    let _ = http1::Builder::new()
                        .serve_connection(io, MockService { state })
                        .await;
                });
            }
        });

        Server { port, state }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }

    /// Serve `payload` with status 200 for the given path.
    pub fn respond(&self, path: impl Into<String>, payload: impl Into<Bytes>) {
        self.register(path, CannedResponse::ok(payload.into()));
    }

    /// Serve an empty body with the given status for the given path.
    pub fn respond_with_status(&self, path: impl Into<String>, status: StatusCode) {
        self.register(
            path,
            CannedResponse {
                status,
                ..CannedResponse::ok(Bytes::new())
            },
        );
    }

    /// Serve `payload` with an explicit `Content-Type` header.
    pub fn respond_with_content_type(
        &self,
        path: impl Into<String>,
        payload: impl Into<Bytes>,
        content_type: impl Into<String>,
    ) {
        self.register(
            path,
            CannedResponse {
                content_type: Some(content_type.into()),
                ..CannedResponse::ok(payload.into())
            },
        );
    }

    /// Serve `payload`, but only after sleeping; for driving client timeouts.
    pub fn respond_with_delay(
        &self,
        path: impl Into<String>,
        payload: impl Into<Bytes>,
        delay: Duration,
    ) {
        self.register(
            path,
            CannedResponse {
                delay: Some(delay),
                ..CannedResponse::ok(payload.into())
            },
        );
    }

    /// Serve `payload` for every path without an explicit route, e.g. a whole tile grid.
    pub fn respond_to_any(&self, payload: impl Into<Bytes>) {
        self.state.lock().unwrap().fallback = Some(CannedResponse::ok(payload.into()));
    }

    /// How many requests the given path received so far. Paths without an explicit route are
    /// counted too.
    pub fn hits(&self, path: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .hits
            .get(path)
            .copied()
            .unwrap_or(0)
    }

    /// Header name/value pairs of the most recent request to the given path, lowercased names.
    pub fn last_headers(&self, path: &str) -> Option<Vec<(String, String)>> {
        self.state.lock().unwrap().headers.get(path).cloned()
    }

    fn register(&self, path: impl Into<String>, response: CannedResponse) {
        let path = path.into();
        log::info!("Registering '{}'.", path);
        self.state.lock().unwrap().routes.insert(path, response);
    }
}

struct MockService {
    state: Arc<Mutex<State>>,
}

impl Service<Request<hyper::body::Incoming>> for MockService {
    type Response = Response<Full<Bytes>>;
    type Error = hyper::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, request: Request<hyper::body::Incoming>) -> Self::Future {
        log::info!("Incoming request '{}'.", request.uri());
        let state = self.state.clone();
        Box::pin(async move {
            let path = request.uri().path().to_string();

            let canned = {
                let mut state = state.lock().unwrap();
                *state.hits.entry(path.clone()).or_insert(0) += 1;
                state.headers.insert(
                    path.clone(),
                    request
                        .headers()
                        .iter()
                        .map(|(name, value)| {
                            (
                                name.as_str().to_owned(),
                                String::from_utf8_lossy(value.as_bytes()).into_owned(),
                            )
                        })
                        .collect(),
                );
                state
                    .routes
                    .get(&path)
                    .or(state.fallback.as_ref())
                    .cloned()
            };

            let Some(canned) = canned else {
                log::warn!("No route for '{}'.", path);
                return Ok(Response::builder()
                    .status(StatusCode::NOT_FOUND)
                    .body(Full::new(Bytes::from_static(b"no route")))
                    .unwrap());
            };

            if let Some(delay) = canned.delay {
                tokio::time::sleep(delay).await;
            }

            let mut response = Response::builder().status(canned.status);
            if let Some(content_type) = canned.content_type {
                response = response.header(hyper::header::CONTENT_TYPE, content_type);
            }
            Ok(response.body(Full::new(canned.payload)).unwrap())
        })
    }
}
