//! Command implementations for the circup CLI
//!
//! Device commands receive the connected backend and the [`Session`]; the
//! bundle and completion commands run without a device.

pub mod bundle;
pub mod completions;
pub mod example;
pub mod freeze;
pub mod install;
pub mod list;
pub mod show;
pub mod uninstall;
pub mod update;
pub mod wwshell;

use semver::Version;

use crate::bundle::download::Downloader;
use crate::bundle::{Bundle, config};
use crate::error::Result;
use crate::session::Session;

/// Redirects to the tag of the newest CircuitPython release
pub const CIRCUITPYTHON_RELEASES_URL: &str =
    "https://github.com/adafruit/circuitpython/releases/latest";

const DOWNLOADS_URL: &str = "https://circuitpython.org/downloads";
const BOARD_URL: &str = "https://circuitpython.org/board/";

/// The configured bundles, each brought up to date unless offline
pub fn load_bundles(session: &Session) -> Result<Vec<Bundle>> {
    let bundles = config::bundles(&session.data_dir)?;
    let downloader = Downloader::new(session.timeout, session.offline)?;
    for bundle in &bundles {
        downloader.ensure_latest(bundle)?;
    }
    Ok(bundles)
}

/// Tell the user when a newer CircuitPython than the device runs exists
///
/// Failing to look up the release is logged and otherwise ignored.
pub fn check_firmware(session: &Session) {
    if session.offline {
        return;
    }
    let latest = Downloader::new(session.timeout, false)
        .and_then(|downloader| downloader.latest_release_tag(CIRCUITPYTHON_RELEASES_URL));
    match latest {
        Ok(tag) if is_newer(&session.cpy_version, &tag) => {
            println!(
                "{}",
                console::style(format!("A newer version of CircuitPython ({tag}) is available."))
                    .green()
            );
            println!("Get it here: {}", download_page(&session.board_id));
        }
        Ok(_) => {}
        Err(e) => tracing::warn!("Unable to check the latest CircuitPython release: {}", e),
    }
}

/// Whether `latest` is a later release than `current`
pub fn is_newer(current: &str, latest: &str) -> bool {
    match (Version::parse(current), Version::parse(latest)) {
        (Ok(current), Ok(latest)) => latest > current,
        _ => {
            tracing::warn!("Cannot compare CircuitPython versions '{}' and '{}'", current, latest);
            false
        }
    }
}

fn download_page(board_id: &str) -> String {
    if board_id.is_empty() {
        DOWNLOADS_URL.to_string()
    } else {
        format!("{BOARD_URL}{board_id}")
    }
}

/// Names formatted as `['a', 'b']`
pub fn name_list<S: AsRef<str>>(names: &[S]) -> String {
    let quoted: Vec<String> = names.iter().map(|n| format!("'{}'", n.as_ref())).collect();
    format!("[{}]", quoted.join(", "))
}
