//! Endpoints served by the gateway itself.
//!
//! These are resolved before the proxy table and still run inside the
//! filter pipeline, so they get correlation ids, CORS headers and rate
//! limiting like any proxied call.

pub mod files;
pub mod health;

use crate::error::{ProxyError, ProxyResult};
use rentway_kernel::{GatewayRequest, GatewayResponse, HttpMethod};
use std::path::PathBuf;

pub const HEALTH_PATH: &str = "/api/health";
pub const CHECK_FILE_PATH: &str = "/api/check-file";
pub const SERVE_FILE_PATH: &str = "/api/serve-file";
pub const UPLOADS_PATH: &str = "/uploads";

/// Paths no proxy route may overlap.
pub const RESERVED_PATHS: [&str; 4] = [HEALTH_PATH, CHECK_FILE_PATH, SERVE_FILE_PATH, UPLOADS_PATH];

/// Remainder of `path` below `mount`, if `path` is `mount` itself or lies
/// under it.
fn strip_mount<'a>(path: &'a str, mount: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(mount)?;
    if rest.is_empty() {
        Some("")
    } else {
        rest.strip_prefix('/')
    }
}

/// Dispatcher for the gateway's own endpoints.
#[derive(Debug, Clone)]
pub struct LocalEndpoints {
    files_root: PathBuf,
    uploads_dir: PathBuf,
}

impl LocalEndpoints {
    pub fn new(files_root: impl Into<PathBuf>, uploads_dir: impl Into<PathBuf>) -> Self {
        Self {
            files_root: files_root.into(),
            uploads_dir: uploads_dir.into(),
        }
    }

    /// Serve `req` when it targets a local endpoint; `None` hands it on to
    /// the proxy table.
    pub async fn serve(&self, req: &GatewayRequest) -> Option<ProxyResult<GatewayResponse>> {
        let path = req.path.as_str();
        let readable = matches!(req.method, HttpMethod::Get | HttpMethod::Head);

        if path == HEALTH_PATH {
            return Some(if readable {
                Ok(health::health())
            } else {
                Err(ProxyError::MethodNotSupported(req.method.to_string()))
            });
        }

        let (mount, rest) = [CHECK_FILE_PATH, SERVE_FILE_PATH, UPLOADS_PATH]
            .into_iter()
            .find_map(|mount| strip_mount(path, mount).map(|rest| (mount, rest)))?;
        if !readable {
            return Some(Err(ProxyError::MethodNotSupported(req.method.to_string())));
        }
        Some(match mount {
            CHECK_FILE_PATH => files::check_file(&self.files_root, rest).await,
            SERVE_FILE_PATH => files::serve_file(&self.files_root, rest).await,
            _ => files::serve_upload(&self.uploads_dir, rest).await,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(path: &str) -> GatewayRequest {
        GatewayRequest::new("r1", HttpMethod::Get, path)
    }

    #[test]
    fn mounts_respect_segment_boundaries() {
        assert_eq!(strip_mount("/uploads", UPLOADS_PATH), Some(""));
        assert_eq!(strip_mount("/uploads/a/b.png", UPLOADS_PATH), Some("a/b.png"));
        assert_eq!(strip_mount("/uploadsx", UPLOADS_PATH), None);
    }

    #[tokio::test]
    async fn proxied_paths_are_not_claimed() {
        let local = LocalEndpoints::new("/nonexistent", "/nonexistent");
        assert!(local.serve(&get("/vehicles/1")).await.is_none());
        assert!(local.serve(&get("/api/healthz")).await.is_none());
    }

    #[tokio::test]
    async fn health_is_served_locally() {
        let local = LocalEndpoints::new("/nonexistent", "/nonexistent");
        let resp = local.serve(&get(HEALTH_PATH)).await.unwrap().unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.backend_id, GatewayResponse::LOCAL);
    }

    #[tokio::test]
    async fn writes_to_local_endpoints_are_refused() {
        let local = LocalEndpoints::new("/nonexistent", "/nonexistent");
        let req = GatewayRequest::new("r1", HttpMethod::Post, "/uploads/x.png");
        assert!(matches!(
            local.serve(&req).await,
            Some(Err(ProxyError::MethodNotSupported(_)))
        ));
    }

    #[tokio::test]
    async fn serve_file_reads_under_files_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("terms.txt"), b"terms").unwrap();
        let local = LocalEndpoints::new(dir.path(), dir.path());
        let resp = local
            .serve(&get("/api/serve-file/terms.txt"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&resp.body[..], b"terms");
    }
}
