//! Book cover images, fetched from Open Library by ISBN and saved next to the
//! other static assets.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::CoverError;

#[async_trait]
pub trait CoverSource: Send + Sync {
    /// Fetch the cover for `isbn` and store it. Returns the file written.
    async fn save_cover(&self, isbn: &str) -> Result<PathBuf, CoverError>;
}

/// Downloads medium-size covers from `covers.openlibrary.org`.
pub struct OpenLibraryCovers {
    http: Client,
    base_url: String,
    covers_dir: PathBuf,
}

impl OpenLibraryCovers {
    /// `timeout` bounds the whole fetch, from connect to the last byte.
    pub fn new(covers_dir: impl Into<PathBuf>, timeout: Duration) -> Result<Self, CoverError> {
        let http = reqwest::ClientBuilder::new().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: "https://covers.openlibrary.org".to_string(),
            covers_dir: covers_dir.into(),
        })
    }

    pub fn cover_url(&self, isbn: &str) -> String {
        format!("{}/b/isbn/{}-M.jpg", self.base_url, isbn)
    }
}

#[async_trait]
impl CoverSource for OpenLibraryCovers {
    async fn save_cover(&self, isbn: &str) -> Result<PathBuf, CoverError> {
        validate_isbn(isbn)?;

        let bytes = self
            .http
            .get(self.cover_url(isbn))
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        tokio::fs::create_dir_all(&self.covers_dir).await?;
        let path = self.covers_dir.join(format!("{}.jpg", isbn));
        tokio::fs::write(&path, &bytes).await?;

        tracing::debug!(isbn, bytes = bytes.len(), "Saved cover to {}", path.display());
        Ok(path)
    }
}

/// ISBNs end up in a file name, so only digits, letters and dashes are allowed.
pub fn validate_isbn(isbn: &str) -> Result<(), CoverError> {
    let valid = !isbn.is_empty()
        && isbn.len() <= 20
        && isbn.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(CoverError::InvalidIsbn(isbn.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn covers(dir: impl Into<PathBuf>, timeout: Duration) -> OpenLibraryCovers {
        OpenLibraryCovers::new(dir, timeout).unwrap()
    }

    #[test]
    fn test_cover_url() {
        let covers = covers("covers", Duration::from_secs(10));
        assert_eq!(
            covers.cover_url("9780141439549"),
            "https://covers.openlibrary.org/b/isbn/9780141439549-M.jpg"
        );
    }

    #[test]
    fn test_validate_isbn() {
        assert!(validate_isbn("978-0-14-143954-9").is_ok());
        assert!(validate_isbn("080442957X").is_ok());
        assert!(validate_isbn("").is_err());
        assert!(validate_isbn("../../etc/passwd").is_err());
        assert!(validate_isbn("12 34").is_err());
    }

    #[tokio::test]
    async fn test_invalid_isbn_is_not_fetched() {
        let covers = covers(std::env::temp_dir(), Duration::from_secs(10));
        let err = covers.save_cover("../x").await.unwrap_err();
        assert!(matches!(err, CoverError::InvalidIsbn(_)));
    }

    #[tokio::test]
    async fn test_stalled_fetch_times_out() {
        // Accepts connections but never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let dir = std::env::temp_dir().join("shelf-stalled-cover");
        let mut covers = covers(&dir, Duration::from_millis(200));
        covers.base_url = format!("http://{}", addr);

        let started = std::time::Instant::now();
        let err = covers.save_cover("9780141439549").await.unwrap_err();
        assert!(matches!(err, CoverError::Fetch(ref e) if e.is_timeout()), "{err:?}");
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!dir.join("9780141439549.jpg").exists());
    }
}
