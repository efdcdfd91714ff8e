// SPDX-License-Identifier: GPL-3.0-only

//! Block-device operations seam and the parted/mkfs implementation

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dashusb_types::{PartitionSpec, UsbDevice};
use tokio::process::Command;
use tracing::{debug, info};
use which::which;

use crate::error::{FormatError, Result};

/// The operations a format run performs against a block device.
///
/// The production implementation shells out to the platform partitioning
/// tools; tests substitute a recording fake. Implementations only execute
/// single steps - ordering, preconditions, and abort-on-failure live in
/// [`crate::format::FormatService`].
#[async_trait]
pub trait BlockDeviceOps: Send + Sync {
    /// Resolve the device node as it exists right now.
    async fn probe(&self, device: &str) -> Result<UsbDevice>;

    /// Write a fresh, empty GPT to the device, discarding any previous
    /// table. Irreversible.
    async fn write_partition_table(&self, device: &str) -> Result<()>;

    /// Create one partition at the spec's byte offsets.
    async fn create_partition(&self, device: &str, spec: &PartitionSpec) -> Result<()>;

    /// Write a filesystem carrying the spec's label onto a created
    /// partition.
    async fn format_partition(&self, device: &str, spec: &PartitionSpec) -> Result<()>;
}

/// Derive the kernel device path of partition `number` on `device`.
///
/// Disks whose name ends in a digit (nvme0n1, mmcblk0) take a `p`
/// separator; sd-style names do not.
pub fn partition_device_path(device: &str, number: u32) -> String {
    if device.chars().last().is_some_and(|c| c.is_ascii_digit()) {
        format!("{device}p{number}")
    } else {
        format!("{device}{number}")
    }
}

/// parted/mkfs wrapper for the real block layer
pub struct PartedCli {
    parted: PathBuf,
    mkfs_exfat: PathBuf,
}

impl PartedCli {
    /// Locate the required tools in PATH.
    ///
    /// Returns an error if either is not installed.
    pub fn new() -> Result<Self> {
        let parted = which("parted").map_err(|_| FormatError::ToolMissing("parted".into()))?;
        let mkfs_exfat =
            which("mkfs.exfat").map_err(|_| FormatError::ToolMissing("mkfs.exfat".into()))?;
        info!(
            "using {} and {}",
            parted.display(),
            mkfs_exfat.display()
        );
        Ok(Self { parted, mkfs_exfat })
    }
}

async fn run_tool(program: &Path, args: &[&str]) -> Result<()> {
    debug!("running {} {}", program.display(), args.join(" "));

    let output = Command::new(program).args(args).output().await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(FormatError::OperationFailed(format!(
            "{} {}: {}",
            program.display(),
            args.join(" "),
            stderr.trim()
        )));
    }

    Ok(())
}

#[async_trait]
impl BlockDeviceOps for PartedCli {
    async fn probe(&self, device: &str) -> Result<UsbDevice> {
        crate::enumerate::probe_device(device).await
    }

    async fn write_partition_table(&self, device: &str) -> Result<()> {
        run_tool(&self.parted, &["-s", device, "mklabel", "gpt"]).await
    }

    async fn create_partition(&self, device: &str, spec: &PartitionSpec) -> Result<()> {
        let start = format!("{}B", spec.range.start);
        // parted treats the end position as inclusive
        let end = format!("{}B", spec.range.end - 1);
        run_tool(
            &self.parted,
            &[
                "-s",
                device,
                "mkpart",
                &spec.label,
                spec.filesystem.as_str(),
                &start,
                &end,
            ],
        )
        .await
    }

    async fn format_partition(&self, device: &str, spec: &PartitionSpec) -> Result<()> {
        let partition = partition_device_path(device, spec.number);
        run_tool(&self.mkfs_exfat, &["-L", &spec.label, &partition]).await
    }
}

#[cfg(test)]
mod tests {
    use super::partition_device_path;

    #[test]
    fn partition_paths_follow_kernel_naming() {
        assert_eq!(partition_device_path("/dev/sdb", 1), "/dev/sdb1");
        assert_eq!(partition_device_path("/dev/sdb", 3), "/dev/sdb3");
        assert_eq!(partition_device_path("/dev/nvme0n1", 2), "/dev/nvme0n1p2");
        assert_eq!(partition_device_path("/dev/mmcblk0", 1), "/dev/mmcblk0p1");
    }
}
