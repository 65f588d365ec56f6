use std::time::Duration;

use base64::{engine::general_purpose, Engine as _};
use reqwest::header::CONTENT_TYPE;
use tracing::{info, warn};
use url::Url;

use crate::error::{AppError, Result};
use crate::types::InlineImage;

pub const DEFAULT_MIME: &str = "image/jpeg";

/// Turns the request's image fields into a base64 payload for the prompt.
#[derive(Clone)]
pub struct ImageLoader {
    client: reqwest::Client,
    max_bytes: usize,
}

impl ImageLoader {
    pub fn new(timeout: Duration, max_bytes: usize) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, max_bytes })
    }

    /// Inline data wins over a URL. Neither present is fine (barcode-only).
    pub async fn resolve(
        &self,
        image_base64: Option<&str>,
        image_url: Option<&str>,
    ) -> Result<Option<InlineImage>> {
        let inline = image_base64.map(str::trim).filter(|s| !s.is_empty());
        if let Some(data) = inline {
            return inline_image(data).map(Some);
        }
        let remote = image_url.map(str::trim).filter(|s| !s.is_empty());
        match remote {
            Some(url) => self.fetch(url).await.map(Some),
            None => Ok(None),
        }
    }

    async fn fetch(&self, raw_url: &str) -> Result<InlineImage> {
        let url = match Url::parse(raw_url) {
            Ok(u) if matches!(u.scheme(), "http" | "https") => u,
            _ => return Err(AppError::Validation("image_url must be an absolute http(s) URL".to_string())),
        };

        let mut resp = self.client.get(url.clone()).send().await.map_err(|e| {
            warn!(%url, "image fetch failed: {e}");
            AppError::Validation(format!("Failed to fetch image_url: {e}"))
        })?;

        let status = resp.status();
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "image fetch returned non-success status");
            return Err(AppError::Validation(format!(
                "Failed to fetch image_url: status {}",
                status.as_u16()
            )));
        }

        let mime_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
            .filter(|v| v.starts_with("image/"))
            .unwrap_or_else(|| DEFAULT_MIME.to_string());

        let too_large = || {
            warn!(%url, max_bytes = self.max_bytes, "image exceeds size limit");
            AppError::Validation(format!("image_url exceeds the {} byte limit", self.max_bytes))
        };
        if resp.content_length().is_some_and(|n| n > self.max_bytes as u64) {
            return Err(too_large());
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = resp.chunk().await.map_err(|e| {
            warn!(%url, "image body read failed: {e}");
            AppError::Validation(format!("Failed to read image_url body: {e}"))
        })? {
            if bytes.len() + chunk.len() > self.max_bytes {
                return Err(too_large());
            }
            bytes.extend_from_slice(&chunk);
        }
        info!(%url, bytes = bytes.len(), mime_type = %mime_type, "image fetched");

        Ok(InlineImage {
            mime_type,
            data: general_purpose::STANDARD.encode(&bytes),
        })
    }
}

/// Accept raw base64 or a `data:<mime>;base64,<payload>` URL.
pub fn inline_image(raw: &str) -> Result<InlineImage> {
    let (mime_type, payload) = match raw.strip_prefix("data:") {
        Some(rest) => {
            let (meta, payload) = rest
                .split_once(',')
                .ok_or_else(|| AppError::Validation("image_base64 data URL has no payload".to_string()))?;
            let mime = meta.strip_suffix(";base64").ok_or_else(|| {
                AppError::Validation("image_base64 data URL must be base64 encoded".to_string())
            })?;
            let mime = if mime.is_empty() { DEFAULT_MIME } else { mime };
            (mime.to_string(), payload)
        }
        None => (DEFAULT_MIME.to_string(), raw),
    };

    let data: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    general_purpose::STANDARD
        .decode(&data)
        .map_err(|e| AppError::Validation(format!("image_base64 is not valid base64: {e}")))?;

    Ok(InlineImage { mime_type, data })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::header, routing::get, Router};

    #[test]
    fn raw_base64_defaults_to_jpeg() {
        let img = inline_image("aGVs\nbG8=").unwrap();
        assert_eq!(img.mime_type, "image/jpeg");
        assert_eq!(img.data, "aGVsbG8=");
    }

    #[test]
    fn data_url_keeps_its_mime_type() {
        let img = inline_image("data:image/webp;base64,aGVsbG8=").unwrap();
        assert_eq!(img.mime_type, "image/webp");
        assert_eq!(img.data, "aGVsbG8=");
    }

    #[test]
    fn invalid_base64_is_validation_error() {
        assert!(matches!(inline_image("not base64!!"), Err(AppError::Validation(_))));
        assert!(matches!(
            inline_image("data:image/png,plain"),
            Err(AppError::Validation(_))
        ));
    }

    async fn spawn_images() -> String {
        let app = Router::new()
            .route("/photo.png", get(|| async { ([(header::CONTENT_TYPE, "image/png")], "png-bytes") }))
            .route("/missing.png", get(|| async { axum::http::StatusCode::NOT_FOUND }))
            .route("/huge.png", get(|| async { ([(header::CONTENT_TYPE, "image/png")], vec![0u8; 4096]) }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move { axum::serve(listener, app).await.expect("serve images") });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn remote_image_is_fetched_and_encoded() {
        let base = spawn_images().await;
        let loader = ImageLoader::new(Duration::from_secs(5), 1024).unwrap();
        let img = loader
            .resolve(None, Some(&format!("{base}/photo.png")))
            .await
            .unwrap()
            .expect("image");
        assert_eq!(img.mime_type, "image/png");
        assert_eq!(img.data, general_purpose::STANDARD.encode("png-bytes"));
    }

    #[tokio::test]
    async fn missing_remote_image_is_validation_error() {
        let base = spawn_images().await;
        let loader = ImageLoader::new(Duration::from_secs(5), 1024).unwrap();
        let res = loader.resolve(None, Some(&format!("{base}/missing.png"))).await;
        assert!(matches!(res, Err(AppError::Validation(_))));
    }

    /// Chunked response with no Content-Length, so only the read loop can stop it.
    async fn spawn_chunked_image() -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            while let Ok((mut sock, _)) = listener.accept().await {
                let mut buf = [0u8; 2048];
                let _ = sock.read(&mut buf).await;
                let mut resp = String::from(
                    "HTTP/1.1 200 OK\r\ncontent-type: image/png\r\ntransfer-encoding: chunked\r\n\r\n",
                );
                for _ in 0..8 {
                    resp.push_str(&format!("200\r\n{}\r\n", "x".repeat(512)));
                }
                resp.push_str("0\r\n\r\n");
                let _ = sock.write_all(resp.as_bytes()).await;
            }
        });
        format!("http://{addr}/streamed.png")
    }

    #[tokio::test]
    async fn oversized_remote_image_is_validation_error() {
        let base = spawn_images().await;
        let streamed = spawn_chunked_image().await;
        let loader = ImageLoader::new(Duration::from_secs(5), 1024).unwrap();
        for path in [format!("{base}/huge.png"), streamed] {
            let res = loader.resolve(None, Some(&path)).await;
            match res {
                Err(e @ AppError::Validation(_)) => {
                    assert_eq!(e.status(), axum::http::StatusCode::BAD_REQUEST);
                    assert!(e.to_string().contains("1024 byte limit"), "{path}: {e}");
                }
                other => panic!("{path}: expected validation error, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn inline_wins_over_url_and_nothing_is_none() {
        let loader = ImageLoader::new(Duration::from_secs(5), 1024).unwrap();
        let img = loader
            .resolve(Some("aGVsbG8="), Some("http://127.0.0.1:1/never-fetched"))
            .await
            .unwrap();
        assert_eq!(img.map(|i| i.data).as_deref(), Some("aGVsbG8="));
        assert!(loader.resolve(None, Some("  ")).await.unwrap().is_none());
    }
}
