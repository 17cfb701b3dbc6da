//! Welcome banner
//!
//! The text file every new connection receives before it sends a username.

use std::path::PathBuf;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct WelcomeBanner {
    path: PathBuf,
}

impl WelcomeBanner {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the banner, failing with a configuration error if it is missing
    pub async fn read(&self) -> Result<Vec<u8>, AppError> {
        tokio::fs::read(&self.path)
            .await
            .map_err(|source| AppError::BannerUnavailable {
                path: self.path.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_read_banner() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("welcome-text.txt");
        std::fs::write(&path, "Welcome!\n[ENTER YOUR NAME]: ").unwrap();

        let banner = WelcomeBanner::new(&path);
        assert_eq!(banner.read().await.unwrap(), b"Welcome!\n[ENTER YOUR NAME]: ");
    }

    #[tokio::test]
    async fn test_missing_banner() {
        let dir = tempdir().unwrap();
        let banner = WelcomeBanner::new(dir.path().join("nope.txt"));

        let err = banner.read().await.unwrap_err();
        assert!(matches!(err, AppError::BannerUnavailable { .. }));
        assert!(err.to_string().contains("nope.txt"));
    }
}
