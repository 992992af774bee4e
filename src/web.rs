// src/web.rs
use crate::client::{POLLER_SCRIPT, SCRIPT_PATH, STATUS_PATH};
use crate::config::AppConfig;
use crate::error::ServeError;
use crate::freshness::current_status;
use crate::fs::FileSystem;
use crate::inject::inject_reload_script;
use anyhow::Result;
use axum::{
    extract::State,
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use percent_encoding::percent_decode_str;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch::Receiver as WatchReceiver;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

/// Sent with HTML pages and status responses so the browser always asks again.
pub const NO_CACHE: &str = "no-cache, no-store, must-revalidate";

/// Shared application state for the web server.
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub fs: Arc<dyn FileSystem>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, fs: Arc<dyn FileSystem>) -> Self {
        Self { config, fs }
    }
}

/// Serves the fixed poller script.
async fn serve_script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript")],
        POLLER_SCRIPT,
    )
}

/// Rescans the watch set and reports the freshness marker.
async fn serve_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let status = current_status(
        state.fs.as_ref(),
        &state.config.root,
        &state.config.watch_extension,
    );
    debug!("Status requested, lastModified = {}", status.last_modified.as_f64());
    ([(header::CACHE_CONTROL, NO_CACHE)], Json(status))
}

/// Serves any other path as a file under the serving root.
///
/// Every failure ends in a 404; the reason is only logged.
async fn serve_file(State(state): State<Arc<AppState>>, uri: Uri) -> Response {
    match file_response(&state, uri.path()) {
        Ok(response) => response,
        Err(e) => {
            match &e {
                ServeError::NotFound(_) => debug!("{}", e),
                ServeError::Traversal(_) => warn!("Rejected request: {}", e),
                _ => error!("Error serving {}: {}", uri.path(), e),
            }
            not_found()
        }
    }
}

fn file_response(state: &AppState, request_path: &str) -> Result<Response, ServeError> {
    let config = &state.config;
    let mut path = resolve_request_path(&config.root, request_path, &config.index)?;

    if !state.fs.is_file(&path) {
        // A directory with a default document serves that document.
        let nested_index = path.join(&config.index);
        if state.fs.is_file(&nested_index) {
            path = nested_index;
        } else {
            return Err(ServeError::NotFound(path));
        }
    }

    ensure_within_root(state.fs.as_ref(), &config.root, &path, request_path)?;

    let bytes = state.fs.read(&path).map_err(|source| ServeError::Io {
        path: path.clone(),
        source,
    })?;

    if is_html(&path, &config.index) {
        let html = String::from_utf8(bytes).map_err(|_| ServeError::Decode {
            path: path.clone(),
        })?;
        debug!("Serving {} with reload script", path.display());
        return Ok((
            [
                (header::CONTENT_TYPE, "text/html; charset=utf-8"),
                (header::CACHE_CONTROL, NO_CACHE),
            ],
            inject_reload_script(&html),
        )
            .into_response());
    }

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    debug!("Serving {} as {}", path.display(), mime);
    Ok(([(header::CONTENT_TYPE, mime.to_string())], bytes).into_response())
}

/// Rejects files whose real location, after following symlinks, is outside `root`.
fn ensure_within_root(
    fs: &dyn FileSystem,
    root: &Path,
    path: &Path,
    request_path: &str,
) -> Result<(), ServeError> {
    let canonical_root = fs.canonicalize(root).map_err(|source| ServeError::Io {
        path: root.to_path_buf(),
        source,
    })?;
    let canonical_path = fs.canonicalize(path).map_err(|source| ServeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if canonical_path.starts_with(&canonical_root) {
        Ok(())
    } else {
        Err(ServeError::Traversal(request_path.to_string()))
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "404 Not Found").into_response()
}

/// HTML pages are files ending in `.html`, plus the default document whatever its name.
fn is_html(path: &Path, index: &str) -> bool {
    match path.file_name().and_then(|name| name.to_str()) {
        Some(name) => name.ends_with(".html") || name == index,
        None => false,
    }
}

/// Maps a request path onto a file path under `root`.
///
/// `/` maps to the default document. The path is percent-decoded and must
/// consist only of normal components: any `..`, root, or drive prefix is
/// rejected rather than normalized. Symlinks are checked separately once the
/// file is known to exist.
pub fn resolve_request_path(
    root: &Path,
    request_path: &str,
    index: &str,
) -> Result<PathBuf, ServeError> {
    let decoded = percent_decode_str(request_path)
        .decode_utf8()
        .map_err(|_| ServeError::NotFound(PathBuf::from(request_path)))?;

    let relative = decoded.trim_start_matches('/');
    let relative = if relative.is_empty() { index } else { relative };

    let mut resolved = root.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ServeError::Traversal(request_path.to_string()));
            }
        }
    }
    Ok(resolved)
}

/// Builds the router: poller script, status endpoint, and the static file fallback.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(SCRIPT_PATH, get(serve_script))
        .route(STATUS_PATH, get(serve_status))
        .fallback(serve_file)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds the configured address.
///
/// # Errors
///
/// [`ServeError::PortInUse`] when another process holds the port, otherwise
/// [`ServeError::Bind`].
pub async fn bind(config: &AppConfig) -> Result<TcpListener, ServeError> {
    let addr = config.listen_addr();
    let result = TcpListener::bind(addr.as_str()).await;
    match result {
        Ok(listener) => {
            info!("Bound {}", addr);
            Ok(listener)
        }
        Err(source) if source.kind() == ErrorKind::AddrInUse => Err(ServeError::PortInUse {
            addr,
            port: config.port,
        }),
        Err(source) => Err(ServeError::Bind { addr, source }),
    }
}

/// Serves requests on `listener` until the shutdown signal flips to `true`.
///
/// # Returns
/// Returns `Ok(())` when the server shuts down cleanly.
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown_signal: WatchReceiver<bool>,
) -> Result<()> {
    let mut shutdown = shutdown_signal.clone();
    info!(
        "Web server serving {} on http://{}",
        state.config.root.display(),
        listener.local_addr()?
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            loop {
                let stop = *shutdown.borrow_and_update();
                if stop || shutdown.changed().await.is_err() {
                    break;
                }
            }
            info!("Web server shutting down gracefully.");
        })
        .await?;

    info!("Web server stopped.");
    Ok(())
}
