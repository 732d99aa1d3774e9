//! Archive verifier
//!
//! Downloads the source archive GitHub generates for a pushed tag and computes
//! the SHA-512 digest that package recipes pin.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::thread;
use std::time::Duration;

use sha2::{Digest, Sha512};
use tempfile::TempDir;

use crate::config::ArchiveConfig;
use crate::domain::Version;
use crate::error::{ReleaseError, Result};
use crate::ui;

/// Digest reported in dry-run mode instead of downloading anything
pub const DRY_RUN_DIGEST: &str = "DRY_RUN_SAMPLE_HASH";

const CHUNK_SIZE: usize = 4096;

/// Deterministic archive URL for a version tag
pub fn archive_url(repository: &str, version: &Version) -> String {
    format!(
        "https://github.com/{}/archive/refs/tags/{}.tar.gz",
        repository,
        version.tag_name()
    )
}

/// Something that can place the bytes at `url` into `dest`.
pub trait ArchiveSource {
    fn download(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Downloads over HTTPS with a blocking reqwest client
pub struct HttpArchiveSource {
    client: reqwest::blocking::Client,
}

impl HttpArchiveSource {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("release-flow/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ReleaseError::config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(HttpArchiveSource { client })
    }
}

impl ArchiveSource for HttpArchiveSource {
    fn download(&self, url: &str, dest: &Path) -> Result<()> {
        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|e| std::io::Error::other(format!("GET {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(std::io::Error::other(format!(
                "GET {}: HTTP {}",
                url,
                status.as_u16()
            ))
            .into());
        }

        let mut file = File::create(dest)?;
        response
            .copy_to(&mut file)
            .map_err(|e| std::io::Error::other(format!("reading {}: {}", url, e)))?;
        Ok(())
    }
}

/// Download schedule: a grace period, then a bounded number of attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub grace_period: Duration,
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl From<&ArchiveConfig> for RetryPolicy {
    fn from(config: &ArchiveConfig) -> Self {
        RetryPolicy {
            grace_period: config.grace_period(),
            max_attempts: config.max_attempts,
            retry_delay: config.retry_delay(),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::from(&ArchiveConfig::default())
    }
}

/// Fetches a tagged archive and hashes it.
pub struct ArchiveVerifier<S: ArchiveSource> {
    source: S,
    repository: String,
    policy: RetryPolicy,
}

impl<S: ArchiveSource> ArchiveVerifier<S> {
    pub fn new(source: S, repository: impl Into<String>, policy: RetryPolicy) -> Self {
        ArchiveVerifier {
            source,
            repository: repository.into(),
            policy,
        }
    }

    /// Download the archive for `version` and return its SHA-512 as lowercase hex.
    ///
    /// # Returns
    /// * `Ok(digest)` - Hex digest, or [`DRY_RUN_DIGEST`] in dry-run mode
    /// * `Err(ArchiveUnavailable)` - If no attempt produced a non-empty file
    pub fn fetch_and_digest(&self, version: &Version, dry_run: bool) -> Result<String> {
        let url = archive_url(&self.repository, version);
        if dry_run {
            ui::display_dry_run(&format!("download and hash {}", url));
            return Ok(DRY_RUN_DIGEST.to_string());
        }

        ui::display_status("Waiting for GitHub to process the new tag...");
        thread::sleep(self.policy.grace_period);

        let workdir = TempDir::new()?;
        let archive_path = workdir.path().join(format!("{}.tar.gz", version.tag_name()));

        let mut last_error = String::new();
        for attempt in 1..=self.policy.max_attempts {
            match self.try_download(&url, &archive_path) {
                Ok(()) => return digest_file(&archive_path),
                Err(reason) => last_error = reason,
            }

            if attempt < self.policy.max_attempts {
                ui::display_status(&format!(
                    "Attempt {} failed ({}), retrying in {} seconds...",
                    attempt,
                    last_error,
                    self.policy.retry_delay.as_secs()
                ));
                thread::sleep(self.policy.retry_delay);
            }
        }

        Err(ReleaseError::ArchiveUnavailable {
            url,
            attempts: self.policy.max_attempts,
            last_error,
        })
    }

    /// One download attempt; the error is the reason it did not yield a usable file.
    fn try_download(&self, url: &str, dest: &Path) -> std::result::Result<(), String> {
        self.source.download(url, dest).map_err(|e| e.to_string())?;
        if is_non_empty(dest) {
            Ok(())
        } else {
            Err("downloaded archive is empty".to_string())
        }
    }
}

fn is_non_empty(path: &Path) -> bool {
    path.metadata().map(|m| m.len() > 0).unwrap_or(false)
}

/// SHA-512 of a file, read in fixed-size chunks.
pub fn digest_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha512::new();
    let mut buf = [0u8; CHUNK_SIZE];

    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::fs;

    const INSTANT: RetryPolicy = RetryPolicy {
        grace_period: Duration::ZERO,
        max_attempts: 5,
        retry_delay: Duration::ZERO,
    };

    /// Writes `payload` once `succeed_on` attempts have been made
    struct FlakySource {
        attempts: Cell<u32>,
        succeed_on: Option<u32>,
        payload: Vec<u8>,
    }

    impl FlakySource {
        fn new(succeed_on: Option<u32>, payload: &[u8]) -> Self {
            FlakySource {
                attempts: Cell::new(0),
                succeed_on,
                payload: payload.to_vec(),
            }
        }
    }

    impl ArchiveSource for FlakySource {
        fn download(&self, _url: &str, dest: &Path) -> Result<()> {
            let attempt = self.attempts.get() + 1;
            self.attempts.set(attempt);
            match self.succeed_on {
                Some(n) if attempt >= n => {
                    fs::write(dest, &self.payload)?;
                    Ok(())
                }
                // An empty artifact counts as a failed download
                _ => {
                    fs::write(dest, b"")?;
                    Ok(())
                }
            }
        }
    }

    #[test]
    fn test_archive_url() {
        assert_eq!(
            archive_url("lucocozz/cargs", &Version::new(1, 2, 3)),
            "https://github.com/lucocozz/cargs/archive/refs/tags/v1.2.3.tar.gz"
        );
    }

    #[test]
    fn test_digest_matches_whole_file_digest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blob");
        let data: Vec<u8> = (0..(CHUNK_SIZE * 3 + 17)).map(|i| (i % 251) as u8).collect();
        fs::write(&path, &data).unwrap();

        let expected = format!("{:x}", Sha512::digest(&data));
        assert_eq!(digest_file(&path).unwrap(), expected);
    }

    #[test]
    fn test_digest_of_known_input() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("abc");
        fs::write(&path, b"abc").unwrap();
        assert_eq!(
            digest_file(&path).unwrap(),
            "ddaf35a193617abacc417349ae20413112e6fa4e89a97ea20a9eeee64b55d39a\
             2192992a274fc1a836ba3c23a3feebbd454d4423643ce80e2a9ac94fa54ca49f"
        );
    }

    #[test]
    fn test_succeeds_after_retries() {
        let source = FlakySource::new(Some(3), b"tarball bytes");
        let verifier = ArchiveVerifier::new(source, "lucocozz/cargs", INSTANT);
        let digest = verifier
            .fetch_and_digest(&Version::new(1, 0, 0), false)
            .unwrap();

        assert_eq!(digest, format!("{:x}", Sha512::digest(b"tarball bytes")));
        assert_eq!(verifier.source.attempts.get(), 3);
    }

    #[test]
    fn test_gives_up_after_five_attempts() {
        let source = FlakySource::new(None, b"");
        let verifier = ArchiveVerifier::new(source, "lucocozz/cargs", INSTANT);
        let result = verifier.fetch_and_digest(&Version::new(1, 0, 0), false);

        match result {
            Err(ReleaseError::ArchiveUnavailable {
                url,
                attempts,
                last_error,
            }) => {
                assert_eq!(attempts, 5);
                assert!(url.ends_with("v1.0.0.tar.gz"));
                assert_eq!(last_error, "downloaded archive is empty");
            }
            other => panic!("expected ArchiveUnavailable, got {:?}", other),
        }
        assert_eq!(verifier.source.attempts.get(), 5);
    }

    struct RejectingSource;

    impl ArchiveSource for RejectingSource {
        fn download(&self, url: &str, _dest: &Path) -> Result<()> {
            Err(std::io::Error::other(format!("GET {}: HTTP 503", url)).into())
        }
    }

    #[test]
    fn test_failure_keeps_download_error() {
        let verifier = ArchiveVerifier::new(RejectingSource, "lucocozz/cargs", INSTANT);
        let err = verifier
            .fetch_and_digest(&Version::new(1, 0, 0), false)
            .unwrap_err();

        assert!(matches!(
            &err,
            ReleaseError::ArchiveUnavailable { last_error, .. } if last_error.contains("HTTP 503")
        ));
        assert!(err.to_string().contains("HTTP 503"));
    }

    #[test]
    fn test_dry_run_never_downloads() {
        let source = FlakySource::new(Some(1), b"data");
        let verifier = ArchiveVerifier::new(source, "lucocozz/cargs", RetryPolicy::default());
        let digest = verifier
            .fetch_and_digest(&Version::new(1, 0, 0), true)
            .unwrap();

        assert_eq!(digest, DRY_RUN_DIGEST);
        assert_eq!(verifier.source.attempts.get(), 0);
    }
}
