//! Filesystem endpoints.
//!
//! GET /api/check-file/{path}  - metadata for a path under the files root
//! GET /api/serve-file/{path}  - raw bytes of a file under the files root
//! GET /uploads/{path}         - uploaded assets, directories serve index.html

use crate::error::{ProxyError, ProxyResult};
use http::HeaderValue;
use http::header::CONTENT_TYPE;
use rentway_kernel::GatewayResponse;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Resolve a caller-supplied relative path under `root`, rejecting any
/// attempt to climb out of it.
fn resolve_under(root: &Path, raw: &str) -> ProxyResult<(String, PathBuf)> {
    let relative = urlencoding::decode(raw)
        .map_err(|_| ProxyError::InvalidFilePath)?
        .into_owned();
    if raw.contains("..") || relative.contains("..") || relative.contains('\0') {
        return Err(ProxyError::InvalidFilePath);
    }
    let full = root.join(relative.trim_start_matches('/'));
    Ok((relative, full))
}

/// Buffer a file into a response with a content type guessed from its
/// extension.
async fn file_response(path: &Path) -> std::io::Result<GatewayResponse> {
    let bytes = tokio::fs::read(path).await?;
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    let mut resp = GatewayResponse::new(200, GatewayResponse::LOCAL).with_body(bytes);
    if let Ok(value) = HeaderValue::from_str(mime.essence_str()) {
        resp.headers.insert(CONTENT_TYPE, value);
    }
    Ok(resp)
}

/// `GET /api/check-file/{path}`
pub async fn check_file(root: &Path, raw: &str) -> ProxyResult<GatewayResponse> {
    let (_, full) = resolve_under(root, raw)?;
    let shown = full.display().to_string();
    info!(path = %shown, "checking file");

    let Ok(meta) = tokio::fs::metadata(&full).await else {
        return Ok(GatewayResponse::json(
            200,
            &json!({ "exists": false, "path": shown }),
        ));
    };

    let mut info = json!({
        "exists": true,
        "path": shown,
        "size": meta.len(),
        "is_file": meta.is_file(),
        "is_directory": meta.is_dir(),
    });
    if meta.is_dir() {
        let mut contents = Vec::new();
        let mut entries = tokio::fs::read_dir(&full)
            .await
            .map_err(|e| ProxyError::Internal(e.to_string()))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ProxyError::Internal(e.to_string()))?
        {
            contents.push(entry.file_name().to_string_lossy().into_owned());
        }
        contents.sort();
        info["contents"] = json!(contents);
    }
    Ok(GatewayResponse::json(200, &info))
}

/// `GET /api/serve-file/{path}`
pub async fn serve_file(root: &Path, raw: &str) -> ProxyResult<GatewayResponse> {
    let (relative, full) = resolve_under(root, raw)?;
    info!(path = %full.display(), "serving file");
    match tokio::fs::metadata(&full).await {
        Ok(meta) if meta.is_file() => file_response(&full)
            .await
            .map_err(|_| ProxyError::FileNotFound(relative)),
        _ => Err(ProxyError::FileNotFound(relative)),
    }
}

/// `GET /uploads/{path}`
pub async fn serve_upload(uploads_dir: &Path, raw: &str) -> ProxyResult<GatewayResponse> {
    let (relative, mut full) = resolve_under(uploads_dir, raw)?;
    if tokio::fs::metadata(&full)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
    {
        full.push("index.html");
    }
    debug!(path = %full.display(), "serving upload");
    file_response(&full)
        .await
        .map_err(|_| ProxyError::FileNotFound(relative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn json_body(resp: &GatewayResponse) -> Value {
        serde_json::from_slice(&resp.body).unwrap()
    }

    #[test]
    fn resolve_decodes_escapes_under_root() {
        let root = Path::new("/srv/files");
        let (relative, full) = resolve_under(root, "a%20b/c.txt").unwrap();
        assert_eq!(relative, "a b/c.txt");
        assert_eq!(full, Path::new("/srv/files/a b/c.txt"));

        let (relative, _) = resolve_under(root, "100%").unwrap();
        assert_eq!(relative, "100%");
    }

    #[test]
    fn non_utf8_escapes_are_rejected() {
        let err = resolve_under(Path::new("/srv"), "%ff%fe.txt").unwrap_err();
        assert!(matches!(err, ProxyError::InvalidFilePath));
    }

    #[tokio::test]
    async fn traversal_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        for raw in ["../etc/passwd", "a/%2e%2e/b"] {
            let err = check_file(dir.path(), raw).await.unwrap_err();
            assert!(matches!(err, ProxyError::InvalidFilePath));
            let err = serve_file(dir.path(), raw).await.unwrap_err();
            assert!(matches!(err, ProxyError::InvalidFilePath));
        }
    }

    #[tokio::test]
    async fn check_file_describes_files_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs/b.txt"), b"hello").unwrap();
        std::fs::write(dir.path().join("docs/a.txt"), b"").unwrap();

        let file = json_body(&check_file(dir.path(), "docs/b.txt").await.unwrap());
        assert_eq!(file["exists"], true);
        assert_eq!(file["size"], 5);
        assert_eq!(file["is_file"], true);
        assert!(file.get("contents").is_none());

        let folder = json_body(&check_file(dir.path(), "docs").await.unwrap());
        assert_eq!(folder["is_directory"], true);
        assert_eq!(folder["contents"], serde_json::json!(["a.txt", "b.txt"]));

        let missing = json_body(&check_file(dir.path(), "nope").await.unwrap());
        assert_eq!(missing["exists"], false);
    }

    #[tokio::test]
    async fn serve_file_guesses_content_type() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("car.json"), br#"{"ok":true}"#).unwrap();

        let resp = serve_file(dir.path(), "car.json").await.unwrap();
        assert_eq!(resp.headers[CONTENT_TYPE], "application/json");
        assert_eq!(&resp.body[..], br#"{"ok":true}"#);

        let err = serve_file(dir.path(), "missing.png").await.unwrap_err();
        assert_eq!(err.body()["detail"], "File not found: missing.png");
    }

    #[tokio::test]
    async fn upload_directory_serves_index() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("gallery")).unwrap();
        std::fs::write(dir.path().join("gallery/index.html"), b"<h1>cars</h1>").unwrap();

        let resp = serve_upload(dir.path(), "gallery").await.unwrap();
        assert_eq!(resp.headers[CONTENT_TYPE], "text/html");
        assert_eq!(&resp.body[..], b"<h1>cars</h1>");

        assert!(matches!(
            serve_upload(dir.path(), "vehicles/1.jpg").await,
            Err(ProxyError::FileNotFound(_))
        ));
    }
}
