//! Fetching bundle releases from GitHub

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;

use super::{Bundle, PLATFORMS};
use crate::error::{CircupError, Result};

/// Tag GitHub redirects to when a repository has no release
const NO_RELEASE_TAG: &str = "releases";

const STAGING_SUFFIX: &str = ".new";
const PREVIOUS_SUFFIX: &str = ".old";

pub struct Downloader {
    client: Client,
    /// Used for `releases/latest`, whose redirect target carries the tag
    no_redirect: Client,
    offline: bool,
}

impl Downloader {
    pub fn new(timeout: Duration, offline: bool) -> Result<Self> {
        let build = |policy: Policy| {
            Client::builder()
                .timeout(timeout)
                .user_agent(concat!("circup/", env!("CARGO_PKG_VERSION")))
                .redirect(policy)
                .build()
                .map_err(CircupError::from)
        };
        Ok(Self {
            client: build(Policy::default())?,
            no_redirect: build(Policy::none())?,
            offline,
        })
    }

    /// Tag name of the latest release behind a `releases/latest` URL
    pub fn latest_release_tag(&self, url: &str) -> Result<String> {
        tracing::info!("Requesting redirect information: {}", url);
        let response = self.no_redirect.head(url).send()?;
        let target = if response.status().is_redirection() {
            response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|location| location.to_str().ok())
                .unwrap_or_default()
                .to_string()
        } else {
            response.url().to_string()
        };
        let tag = target
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        tracing::info!("Tag: '{}'", tag);
        Ok(tag)
    }

    /// Latest tag of a bundle; the downloaded one when offline
    pub fn latest_tag(&self, bundle: &Bundle) -> Result<String> {
        if self.offline {
            return Ok(bundle.current_tag());
        }
        bundle.latest_tag(|url| self.latest_release_tag(url))
    }

    /// Make sure the latest release of a bundle is unpacked locally
    ///
    /// Download failures are reported and the previous download, if any, is
    /// kept.
    pub fn ensure_latest(&self, bundle: &Bundle) -> Result<()> {
        if self.offline {
            if !bundle.is_downloaded() {
                tracing::warn!("{} is not downloaded and circup is offline", bundle.key());
            }
            return Ok(());
        }

        tracing::info!("Checking library updates for {}", bundle.key());
        let tag = self.latest_tag(bundle)?;
        if tag == bundle.current_tag() && bundle.is_downloaded() {
            tracing::info!("Current bundle up to date {}", tag);
            return Ok(());
        }

        tracing::info!("New version available ({})", tag);
        match self.download_release(bundle, &tag) {
            Ok(()) => Ok(()),
            Err(e @ (CircupError::BundleDownloadFailed { .. } | CircupError::Transport { .. })) => {
                tracing::error!("{}", e);
                eprintln!(
                    "{}",
                    console::style(
                        "There was a problem downloading that platform bundle. \
                         Skipping and using existing download if available."
                    )
                    .red()
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Download and unpack every platform zip of a release
    ///
    /// Platforms are unpacked next to the current ones and only swapped in
    /// once all of them succeeded, so a failure leaves the previous
    /// download and its tag untouched.
    pub fn download_release(&self, bundle: &Bundle, tag: &str) -> Result<()> {
        println!("Downloading latest bundles for {} ({}).", bundle.key(), tag);
        let mut staged = Vec::new();
        if let Err(e) = self.stage_release(bundle, tag, &mut staged) {
            for (_, staging) in &staged {
                if let Err(err) = fs::remove_dir_all(staging) {
                    tracing::warn!("Unable to remove {}: {}", staging.display(), err);
                }
            }
            return Err(e);
        }
        for (platform, staging) in &staged {
            replace_dir(staging, &bundle.platform_dir(platform))?;
        }
        bundle.set_current_tag(tag)?;
        println!("\nOK\n");
        Ok(())
    }

    fn stage_release(
        &self,
        bundle: &Bundle,
        tag: &str,
        staged: &mut Vec<(&'static str, PathBuf)>,
    ) -> Result<()> {
        for (platform, archive) in PLATFORMS {
            println!("{archive}:");
            let url = bundle.download_url(archive, tag);
            let zip_path = bundle.zip_path(platform);
            self.fetch(&url, &zip_path)?;
            let staging = sibling(&bundle.platform_dir(platform), STAGING_SUFFIX);
            staged.push((*platform, staging.clone()));
            extract_archive(&zip_path, &staging).map_err(|e| CircupError::BundleDownloadFailed {
                url,
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }

    /// Download a URL into a local file, showing progress
    pub fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        tracing::info!("Downloading bundle: {}", url);
        let failed = |reason: String| CircupError::BundleDownloadFailed {
            url: url.to_string(),
            reason,
        };

        let response = self.client.get(url).send().map_err(|e| failed(e.to_string()))?;
        if !response.status().is_success() {
            tracing::warn!("Unable to connect to {}", url);
            return Err(failed(format!("HTTP {}", response.status())));
        }

        let pb = match response.content_length() {
            Some(len) => ProgressBar::new(len),
            None => ProgressBar::no_length(),
        };
        pb.set_style(
            ProgressStyle::with_template("[{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
                .map(|style| style.progress_chars("#>-"))
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        pb.set_message("Extracting:");

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = File::create(dest).map_err(|e| CircupError::FileWriteFailed {
            path: dest.display().to_string(),
            reason: e.to_string(),
        })?;
        let copied = std::io::copy(&mut pb.wrap_read(response), &mut file);
        match copied {
            Ok(_) => pb.finish(),
            Err(ref e) => {
                pb.abandon();
                return Err(failed(e.to_string()));
            }
        }
        tracing::info!("Saved to {}", dest.display());
        Ok(())
    }

    /// Whether a repository looks like a bundle with downloadable releases
    pub fn validate(&self, bundle: &Bundle) -> Result<bool> {
        let response = self.client.get(bundle.url()).send()?;
        if response.status() == StatusCode::NOT_FOUND {
            tracing::warn!("Repository {} does not exist", bundle.url());
            return Ok(false);
        }

        let tag = self.latest_tag(bundle)?;
        if tag.is_empty() || tag == NO_RELEASE_TAG {
            tracing::warn!("Invalid tag \"{}\"", tag);
            return Ok(false);
        }
        for (_, archive) in PLATFORMS {
            let url = bundle.download_url(archive, &tag);
            let response = self.client.head(&url).send()?;
            if !response.status().is_success() {
                tracing::warn!("Unable to find {}", url);
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// `dir` with a suffix appended to its last component
fn sibling(dir: &Path, suffix: &str) -> PathBuf {
    let mut name = dir.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    dir.with_file_name(name)
}

/// Move `staging` to `dir`, dropping the old `dir` only once the move worked
fn replace_dir(staging: &Path, dir: &Path) -> Result<()> {
    let previous = sibling(dir, PREVIOUS_SUFFIX);
    if previous.exists() {
        fs::remove_dir_all(&previous)?;
    }
    if dir.exists() {
        fs::rename(dir, &previous)?;
    }
    if let Err(e) = fs::rename(staging, dir) {
        if previous.exists() {
            fs::rename(&previous, dir)?;
        }
        return Err(e.into());
    }
    if previous.exists() {
        fs::remove_dir_all(&previous)?;
    }
    Ok(())
}

/// Unpack a zip file into a directory, replacing what was there
pub fn extract_archive(zip_path: &Path, dir: &Path) -> Result<()> {
    if dir.is_dir() {
        fs::remove_dir_all(dir)?;
    }
    let file = File::open(zip_path).map_err(|e| CircupError::FileReadFailed {
        path: zip_path.display().to_string(),
        reason: e.to_string(),
    })?;
    let mut archive = zip::ZipArchive::new(file)?;
    archive.extract(dir)?;
    tracing::debug!("Extracted {} into {}", zip_path.display(), dir.display());
    Ok(())
}
