//! Helpers for testing the avatar cache.
//!
//! When writing tests, keep the following points in mind:
//!
//!  - In every test, call [`setup`]. This will set up the logger so that all
//!    console output is captured by the test runner.
//!
//!  - When using [`Server`] or [`HitCounter`], make sure that the server is
//!    held until all requests to it have been made. If the server is dropped,
//!    connections to it will time out. To avoid this, assign it to a variable:
//!    `let server = prtracker_test::Server::new();`.

use std::collections::BTreeMap;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{self, Request};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Router, middleware};
use image::{DynamicImage, ImageOutputFormat, Rgba, RgbaImage};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::fmt;
use url::Url;

/// Setup the test environment.
///
///  - Initializes logs: The logger only captures logs from this workspace's
///    crates and mutes all other logs.
pub fn setup() {
    fmt()
        .with_env_filter(EnvFilter::new("prtracker_avatars=trace"))
        .with_target(false)
        .pretty()
        .with_test_writer()
        .try_init()
        .ok();
}

/// Returns a PNG payload for the given identity name.
///
/// The image is a 16x16 solid color derived from the name, so distinct
/// names produce distinct, reproducible payloads.
pub fn avatar_png(name: &str) -> Vec<u8> {
    let seed = name
        .bytes()
        .fold(0u8, |acc, b| acc.wrapping_mul(31).wrapping_add(b));
    let pixel = Rgba([seed, seed.wrapping_mul(7), seed.wrapping_mul(13), 0xff]);
    let image = RgbaImage::from_pixel(16, 16, pixel);

    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(image)
        .write_to(&mut buffer, ImageOutputFormat::Png)
        .unwrap();
    buffer.into_inner()
}

fn png_response(payload: Vec<u8>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "image/png")],
        payload,
    )
}

/// The routes every test server serves.
fn avatar_router() -> Router {
    Router::new()
        .route(
            "/avatars/:name",
            get(|extract::Path(name): extract::Path<String>| async move {
                png_response(avatar_png(&name))
            }),
        )
        .route(
            "/delay/:time/*path",
            get(
                |extract::Path((time, path)): extract::Path<(String, String)>| async move {
                    let duration = humantime::parse_duration(&time).unwrap();
                    tokio::time::sleep(duration).await;

                    let name = path.rsplit('/').next().unwrap_or_default().to_owned();
                    png_response(avatar_png(&name))
                },
            ),
        )
        .route(
            "/respond_statuscode/:num/*tail",
            get(
                |extract::Path((num, _)): extract::Path<(u16, String)>| async move {
                    StatusCode::from_u16(num).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
                },
            ),
        )
        .route(
            "/garbage_data/*tail",
            get(|extract::Path(tail): extract::Path<String>| async move { tail }),
        )
}

/// A test server that binds to a random port and serves avatar fixtures.
///
/// This server requires a `tokio` runtime and is supposed to be run in a
/// `tokio::test`. It automatically stops serving when dropped.
#[derive(Debug)]
pub struct Server {
    pub handle: tokio::task::JoinHandle<()>,
    pub socket: SocketAddr,
}

impl Server {
    /// Creates a new test server serving the standard avatar routes.
    pub fn new() -> Self {
        Self::with_router(avatar_router())
    }

    /// Creates a new test server from the given router.
    pub fn with_router(router: Router) -> Self {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let socket = listener.local_addr().unwrap();
        let listener = tokio::net::TcpListener::from_std(listener).unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self { handle, socket }
    }

    /// Returns the socket address that this server listens on.
    pub fn addr(&self) -> SocketAddr {
        self.socket
    }

    /// Returns the port that this server listens on.
    pub fn port(&self) -> u16 {
        self.addr().port()
    }

    /// Returns a full URL pointing to the given path.
    ///
    /// This URL uses `localhost` as hostname.
    pub fn url(&self, path: &str) -> Url {
        let path = path.trim_start_matches('/');
        format!("http://localhost:{}/{}", self.port(), path)
            .parse()
            .unwrap()
    }
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// A [`Server`] that additionally counts the requests it receives.
pub struct HitCounter {
    server: Server,
    hits: Arc<Mutex<BTreeMap<String, usize>>>,
}

impl HitCounter {
    pub fn new() -> Self {
        let hits = Arc::new(Mutex::new(BTreeMap::new()));

        let hitcounter = {
            let hits = hits.clone();
            move |extract::OriginalUri(uri): extract::OriginalUri,
                  req: Request,
                  next: middleware::Next| {
                let hits = hits.clone();
                async move {
                    {
                        let mut hits = hits.lock().unwrap();
                        let hits = hits.entry(uri.to_string()).or_default();
                        *hits += 1;
                    }

                    next.run(req).await
                }
            }
        };

        let router = avatar_router().layer(middleware::from_fn(hitcounter));
        let server = Server::with_router(router);

        Self { server, hits }
    }

    /// Total number of requests served so far, resetting the counters.
    pub fn accesses(&self) -> usize {
        let map = std::mem::take(&mut *self.hits.lock().unwrap());
        map.into_values().sum()
    }

    /// Per-URI hit counts, resetting the counters.
    pub fn all_hits(&self) -> Vec<(String, usize)> {
        let map = std::mem::take(&mut *self.hits.lock().unwrap());
        map.into_iter().collect()
    }

    /// Returns a full URL pointing to the given path.
    pub fn url(&self, path: &str) -> Url {
        self.server.url(path)
    }
}

impl Default for HitCounter {
    fn default() -> Self {
        Self::new()
    }
}
