// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use crate::pixel::PixelFormat;
use std::process;
use thiserror::Error;
use tracing::error;

pub type Result<T> = std::result::Result<T, Error>;

/// Library errors fall into two kinds: configuration errors raised before
/// any driver is touched, and driver errors carrying the failing operation
/// and its raw status.
#[derive(Debug, Error)]
pub enum Error {
    #[error("no cameras found")]
    NoCameras,
    #[error("camera {index} out of range, {count} camera(s) present")]
    CameraOutOfRange { index: usize, count: usize },
    #[error("unsupported pixel format {found}, only RGBA32 is supported")]
    UnsupportedFormat { found: PixelFormat },
    #[error("{op} failed with status {status:#010x}")]
    Driver { op: &'static str, status: i32 },
}

impl Error {
    pub fn driver(op: &'static str, status: i32) -> Self {
        Error::Driver { op, status }
    }

    /// Whether this is a caller precondition violation rather than a
    /// failing driver call.
    pub fn is_config(&self) -> bool {
        !matches!(self, Error::Driver { .. })
    }
}

/// What a session does when an operation fails.
///
/// The default propagates the typed error to the caller.  `Abort` restores
/// the historical fail-fast behavior of the VideoCore convenience layers:
/// log the failure and terminate the process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailureMode {
    #[default]
    Propagate,
    Abort,
}

impl FailureMode {
    pub(crate) fn check<T>(self, result: Result<T>) -> Result<T> {
        match result {
            Err(err) if self == FailureMode::Abort => {
                error!("fatal: {err}");
                process::exit(1);
            }
            other => other,
        }
    }
}
