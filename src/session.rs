//! Per-invocation context
//!
//! Everything a command needs to know about the device and the flags it was
//! started with, passed explicitly instead of living in globals.

use std::path::PathBuf;
use std::time::Duration;

use crate::bundle::{self, PY_PLATFORM};
use crate::error::Result;

/// Network timeout used when none is given
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct Session {
    /// CircuitPython version running on the device
    pub cpy_version: String,
    pub board_id: String,
    /// Never touch the network, use what is already downloaded
    pub offline: bool,
    pub timeout: Duration,
    pub data_dir: PathBuf,
}

impl Session {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            cpy_version: String::new(),
            board_id: String::new(),
            offline: false,
            timeout: DEFAULT_TIMEOUT,
            data_dir: data_dir.into(),
        }
    }

    pub fn with_device(mut self, cpy_version: impl Into<String>, board_id: impl Into<String>) -> Self {
        self.cpy_version = cpy_version.into();
        self.board_id = board_id.into();
        self
    }

    /// Bundle platform holding compiled modules for the device
    pub fn compiled_platform(&self) -> Result<&'static str> {
        bundle::platform_for_version(&self.cpy_version)
    }

    /// Bundle platform for a module, source or compiled
    pub fn platform(&self, bytecode: bool) -> Result<&'static str> {
        if bytecode {
            self.compiled_platform()
        } else {
            Ok(PY_PLATFORM)
        }
    }
}
