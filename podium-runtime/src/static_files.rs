//! Static file serving for runtime-generated assets under the data directory.
//!
//! `GET /user-static/<relative-path>` resolves `<relative-path>` beneath the
//! base directory and streams the file. Resolution order:
//!
//! 1. empty relative path → 400
//! 2. path escapes the base directory (lexically or through a symlink) → 403
//! 3. nothing at the path → 404
//! 4. path is a directory → 403
//! 5. otherwise → 200 with `Content-Type` from a fixed extension table and
//!    `Content-Disposition: inline; filename="<basename>"`

use std::future::Future;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use percent_encoding::percent_decode_str;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::io::ReaderStream;

use crate::error::RuntimeError;
use crate::paths::STATIC_ROUTE_PREFIX;
use crate::supervisor::{ProcessRef, UNKNOWN_EXIT_CODE};

pub const OCTET_STREAM: &str = "application/octet-stream";

/// Per-request failure. Never affects other requests.
#[derive(Debug, Error)]
pub enum StaticError {
    #[error("No file specified")]
    BadRequest,

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("File not found")]
    NotFound,

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StaticError {
    pub fn status(&self) -> StatusCode {
        match self {
            StaticError::BadRequest => StatusCode::BAD_REQUEST,
            StaticError::Forbidden(_) => StatusCode::FORBIDDEN,
            StaticError::NotFound => StatusCode::NOT_FOUND,
            StaticError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for StaticError {
    fn into_response(self) -> Response {
        if let StaticError::Io { .. } = &self {
            tracing::error!(error = %self, "static file read failed");
            return (self.status(), "Internal server error").into_response();
        }
        (self.status(), self.to_string()).into_response()
    }
}

const TRAVERSAL: &str = "Access outside the static directory is forbidden";
const DIRECTORY: &str = "Access to directories is forbidden";

/// A request resolved to a readable file under the base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticFile {
    pub path: PathBuf,
    pub file_name: String,
    pub content_type: &'static str,
}

impl StaticFile {
    pub fn content_disposition(&self) -> String {
        format!("inline; filename=\"{}\"", self.file_name.replace('"', "\\\""))
    }
}

/// Resolve a full request path such as `/user-static/reports/q1.pdf`.
pub fn handle(base: &Path, request_path: &str) -> Result<StaticFile, StaticError> {
    let relative = relative_path(request_path)?;
    resolve(base, &relative)
}

/// Strip the route prefix and percent-decode the remainder.
pub fn relative_path(request_path: &str) -> Result<String, StaticError> {
    let trimmed = request_path.trim_start_matches('/');
    // The prefix must end at a segment boundary: `user-staticfoo` is not ours.
    let rest = trimmed
        .strip_prefix(STATIC_ROUTE_PREFIX)
        .and_then(|rest| match rest {
            "" => Some(rest),
            _ => rest.strip_prefix('/'),
        })
        .unwrap_or("");
    let decoded = percent_decode_str(rest)
        .decode_utf8()
        .map_err(|_| StaticError::BadRequest)?;
    if decoded.is_empty() {
        return Err(StaticError::BadRequest);
    }
    Ok(decoded.into_owned())
}

/// Resolve `relative` beneath `base`.
pub fn resolve(base: &Path, relative: &str) -> Result<StaticFile, StaticError> {
    if relative.is_empty() {
        return Err(StaticError::BadRequest);
    }
    let normalized = normalize(relative)?;
    let candidate = base.join(&normalized);

    let canonical = match candidate.canonicalize() {
        Ok(path) => path,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(StaticError::NotFound)
        }
        Err(source) => {
            return Err(StaticError::Io {
                path: candidate,
                source,
            })
        }
    };
    let canonical_base = base.canonicalize().map_err(|source| StaticError::Io {
        path: base.to_path_buf(),
        source,
    })?;
    if !canonical.starts_with(&canonical_base) {
        return Err(StaticError::Forbidden(TRAVERSAL));
    }
    if canonical.is_dir() {
        return Err(StaticError::Forbidden(DIRECTORY));
    }

    let file_name = candidate
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(StaticFile {
        content_type: content_type_for(&candidate),
        path: canonical,
        file_name,
    })
}

/// Lexically fold `.` and `..`; climbing above the base or rooting the path
/// elsewhere is forbidden.
fn normalize(relative: &str) -> Result<PathBuf, StaticError> {
    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.pop().is_none() {
                    return Err(StaticError::Forbidden(TRAVERSAL));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(StaticError::Forbidden(TRAVERSAL))
            }
        }
    }
    Ok(parts.iter().collect())
}

/// Fixed extension table; anything else is `application/octet-stream`.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("txt") => "text/plain",
        Some("json") => "application/json",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("pdf") => "application/pdf",
        _ => OCTET_STREAM,
    }
}

// ---------------------------------------------------------------------------
// HTTP surface
// ---------------------------------------------------------------------------

pub fn router(base: PathBuf) -> Router {
    let prefix = format!("/{STATIC_ROUTE_PREFIX}");
    Router::new()
        .route(&prefix, get(serve_file))
        .route(&format!("{prefix}/"), get(serve_file))
        .route(&format!("{prefix}/{{*path}}"), get(serve_file))
        .with_state(Arc::new(base))
}

async fn serve_file(State(base): State<Arc<PathBuf>>, uri: Uri) -> Result<Response, StaticError> {
    let file = match handle(&base, uri.path()) {
        Ok(file) => file,
        Err(err) => {
            tracing::debug!(path = %uri.path(), status = err.status().as_u16(), "static request rejected");
            return Err(err);
        }
    };

    let opened = tokio::fs::File::open(&file.path).await.map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            StaticError::NotFound
        } else {
            StaticError::Io {
                path: file.path.clone(),
                source,
            }
        }
    })?;
    let length = opened.metadata().await.ok().map(|meta| meta.len());

    let mut response = Body::from_stream(ReaderStream::new(opened)).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(file.content_type),
    );
    let disposition = HeaderValue::from_str(&file.content_disposition())
        .unwrap_or_else(|_| HeaderValue::from_static("inline"));
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    if let Some(length) = length {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    }
    Ok(response)
}

pub async fn bind(addr: SocketAddr) -> Result<TcpListener, RuntimeError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| RuntimeError::Bind { addr, source })
}

/// Serve `base` on `listener` until `shutdown` resolves.
pub async fn serve<S>(listener: TcpListener, base: PathBuf, shutdown: S) -> Result<(), RuntimeError>
where
    S: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, base = %base.display(), "static server listening");
    }
    axum::serve(listener, router(base))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|err| RuntimeError::Serve(err.to_string()))
}

/// Bind `addr` and run the server as a supervised in-process service.
///
/// The listener is bound before this returns, so the server is accepting
/// connections as soon as the handle exists.
pub async fn launch(addr: SocketAddr, base: PathBuf) -> Result<ProcessRef, RuntimeError> {
    let listener = bind(addr).await?;
    Ok(ProcessRef::spawn_task("static", move |stop| async move {
        let shutdown = async move {
            let _ = stop.await;
        };
        match serve(listener, base, shutdown).await {
            Ok(()) => 0,
            Err(err) => {
                tracing::error!(error = %err, "static server failed");
                UNKNOWN_EXIT_CODE
            }
        }
    }))
}
