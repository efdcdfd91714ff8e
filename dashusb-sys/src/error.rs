// SPDX-License-Identifier: GPL-3.0-only

use std::fmt;

use thiserror::Error;

/// Which step of a format run failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatStep {
    /// Writing the fresh partition table
    WriteTable,

    /// Creating partition N (1-based)
    CreatePartition(u32),

    /// Writing the filesystem onto partition N (1-based)
    FormatPartition(u32),
}

impl fmt::Display for FormatStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WriteTable => write!(f, "partition table write"),
            Self::CreatePartition(n) => write!(f, "creation of partition {n}"),
            Self::FormatPartition(n) => write!(f, "formatting of partition {n}"),
        }
    }
}

/// Error types for layout planning and device formatting
#[derive(Error, Debug)]
pub enum FormatError {
    #[error(
        "requested {requested_gib} GiB exceeds the {capacity_gib} GiB device capacity{note}",
        note = margin_note(.reserved_bytes)
    )]
    CapacityExceeded {
        requested_gib: u64,
        capacity_gib: u64,
        /// Non-zero when the reserved table/alignment margin, invisible to
        /// the user-facing capacity check, is the root cause.
        reserved_bytes: u64,
    },

    #[error("volume name {0:?} appears more than once in the layout")]
    DuplicateVolumeName(String),

    #[error("no volumes requested; nothing to format")]
    EmptyPlan,

    #[error("destructive operation attempted without confirmation")]
    NotConfirmed,

    #[error("a format is already in progress on {0}")]
    DeviceBusy(String),

    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("{step} failed: {message}; the device is partially formatted and must be re-formatted or discarded")]
    StepFailed { step: FormatStep, message: String },

    #[error("required tool not found: {0}")]
    ToolMissing(String),

    #[error("operation failed: {0}")]
    OperationFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FormatError {
    /// Validation-class errors are detected before any device mutation and
    /// are always safe to retry after adjusting input. Everything else must
    /// be surfaced verbatim with no automatic retry.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::CapacityExceeded { .. }
                | Self::DuplicateVolumeName(_)
                | Self::EmptyPlan
                | Self::NotConfirmed
        )
    }
}

fn margin_note(reserved_bytes: &u64) -> String {
    if *reserved_bytes > 0 {
        format!(" once {reserved_bytes} bytes are reserved for the partition table")
    } else {
        String::new()
    }
}

/// Result type alias for planning and format operations
pub type Result<T> = std::result::Result<T, FormatError>;
