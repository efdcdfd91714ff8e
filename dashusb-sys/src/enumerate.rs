// SPDX-License-Identifier: GPL-3.0-only

//! Removable-device enumeration via lsblk
//!
//! Only removable, writable, whole-disk devices are reported; system disks
//! and read-only media never reach the caller.

use dashusb_types::UsbDevice;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::error::{FormatError, Result};

const LSBLK_COLUMNS: &str = "NAME,SIZE,RM,RO,TYPE,MODEL,VENDOR";

#[derive(Debug, Deserialize)]
struct LsblkReport {
    #[serde(default)]
    blockdevices: Vec<LsblkEntry>,
}

#[derive(Debug, Deserialize)]
struct LsblkEntry {
    name: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    rm: bool,
    #[serde(default)]
    ro: bool,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    vendor: Option<String>,
}

impl LsblkEntry {
    fn is_usable(&self) -> bool {
        self.rm && !self.ro && self.kind == "disk" && self.size > 0
    }

    fn into_device(self) -> UsbDevice {
        UsbDevice {
            device: format!("/dev/{}", self.name),
            model: self.model.unwrap_or_default().trim().to_string(),
            vendor: self.vendor.unwrap_or_default().trim().to_string(),
            size: self.size,
            removable: self.rm,
        }
    }
}

fn parse_lsblk_report(raw: &str) -> Result<Vec<UsbDevice>> {
    let report: LsblkReport = serde_json::from_str(raw)
        .map_err(|e| FormatError::OperationFailed(format!("unparsable lsblk output: {e}")))?;

    Ok(report
        .blockdevices
        .into_iter()
        .filter(LsblkEntry::is_usable)
        .map(LsblkEntry::into_device)
        .collect())
}

async fn run_lsblk(extra: &[&str]) -> Result<String> {
    let output = Command::new("lsblk")
        .args(["-J", "-b", "-d", "-o", LSBLK_COLUMNS])
        .args(extra)
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(FormatError::OperationFailed(format!(
            "lsblk failed: {}",
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// List removable, writable, non-system disks currently attached.
pub async fn list_usb_devices() -> Result<Vec<UsbDevice>> {
    let raw = run_lsblk(&[]).await?;
    let devices = parse_lsblk_report(&raw)?;
    debug!("found {} removable devices", devices.len());
    Ok(devices)
}

/// Re-probe a single device node as it exists right now.
///
/// Fails with [`FormatError::DeviceUnavailable`] when the node no longer
/// resolves; never falls back to scanning for a similar device.
pub async fn probe_device(device: &str) -> Result<UsbDevice> {
    let raw = run_lsblk(&[device]).await.map_err(|e| {
        FormatError::DeviceUnavailable(format!("{device} did not answer a probe: {e}"))
    })?;

    parse_lsblk_report(&raw)?
        .into_iter()
        .next()
        .ok_or_else(|| {
            FormatError::DeviceUnavailable(format!(
                "{device} is no longer an attached removable disk"
            ))
        })
}
