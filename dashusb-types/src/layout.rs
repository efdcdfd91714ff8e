//! Volume layout models: requested volumes, capacity checks, and planner
//! output.

use serde::{Deserialize, Serialize};

use crate::ByteRange;

/// Supported filesystem types
///
/// Head units only accept exFAT media volumes, so this currently has a
/// single variant; it stays an enum so the wire shape survives a second
/// filesystem.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilesystemType {
    /// exFAT filesystem
    #[default]
    Exfat,
}

impl FilesystemType {
    /// Convert to mkfs command name
    pub fn mkfs_command(&self) -> &'static str {
        match self {
            Self::Exfat => "mkfs.exfat",
        }
    }

    /// The type string used by partitioning tools
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exfat => "exfat",
        }
    }

    /// Parse from filesystem type string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "exfat" => Some(Self::Exfat),
            _ => None,
        }
    }
}

/// One requested volume, before planning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeRequest {
    /// Volume label, unique within a layout
    pub name: String,

    /// Requested size in whole gibibytes; 0 omits the volume entirely
    pub size_gib: u64,

    /// Target filesystem
    pub filesystem: FilesystemType,

    /// Free-text annotation shown in listings; not load-bearing
    pub purpose: String,
}

impl VolumeRequest {
    pub fn new(name: impl Into<String>, size_gib: u64, purpose: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size_gib,
            filesystem: FilesystemType::Exfat,
            purpose: purpose.into(),
        }
    }
}

/// The ordered set of requested volumes for one device.
///
/// Ordering is creation order and therefore on-device partition order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub volumes: Vec<VolumeRequest>,
}

impl Layout {
    /// Sum of all requested sizes in whole gibibytes, zero entries included.
    pub fn total_gib(&self) -> u64 {
        self.volumes.iter().map(|v| v.size_gib).sum()
    }

    /// The volumes that will actually be planned (size > 0), in order.
    pub fn active(&self) -> impl Iterator<Item = &VolumeRequest> {
        self.volumes.iter().filter(|v| v.size_gib > 0)
    }

    /// First volume name that appears more than once, if any.
    pub fn duplicate_name(&self) -> Option<&str> {
        for (i, volume) in self.volumes.iter().enumerate() {
            if self.volumes[..i].iter().any(|v| v.name == volume.name) {
                return Some(&volume.name);
            }
        }
        None
    }
}

/// Result of checking a layout against a device's capacity
///
/// The raw (possibly negative) `remaining_gib` decides `ok`; negative
/// remaining space is a reportable state, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutCheck {
    /// Whole gibibytes left on the device; negative when over capacity
    pub remaining_gib: i64,

    /// Whether the layout fits
    pub ok: bool,
}

impl LayoutCheck {
    /// Remaining space clamped at zero, for display fields only.
    pub fn remaining_display_gib(&self) -> u64 {
        self.remaining_gib.max(0) as u64
    }
}

/// Planner output: one concrete partition per non-zero volume request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionSpec {
    /// Partition number (1-based, in on-device order)
    pub number: u32,

    /// Byte-exact extent, device-relative
    pub range: ByteRange,

    /// Filesystem to create on the partition
    pub filesystem: FilesystemType,

    /// Volume label, from the originating request
    pub label: String,

    /// Annotation carried over from the originating request
    pub purpose: String,
}

/// Successful outcome of a format run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatReport {
    /// Device path that was formatted
    pub device: String,

    /// Partition table type that was written
    pub table_type: String,

    /// The volumes now present on the device, in partition order
    pub volumes: Vec<FormattedVolume>,
}

/// One formatted volume in a [`FormatReport`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedVolume {
    /// Partition device path (e.g., "/dev/sdb1")
    pub device: String,

    /// Volume label
    pub label: String,

    /// Filesystem written onto the partition
    pub filesystem: FilesystemType,

    /// Size in bytes
    pub size: u64,
}
