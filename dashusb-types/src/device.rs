//! Removable-device model
//!
//! A [`UsbDevice`] is a snapshot taken at enumeration time. It is read-only
//! to the rest of the stack and becomes stale the moment the device is
//! unplugged; the format executor re-probes and compares capacity before
//! touching anything, since the operating system may hand the same device
//! node to a different stick.

use serde::{Deserialize, Serialize};

/// One removable USB storage device as enumerated from the host
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsbDevice {
    /// Device path (e.g., "/dev/sdb"); stable for one session only
    pub device: String,

    /// Disk model name
    pub model: String,

    /// Vendor/manufacturer name
    pub vendor: String,

    /// Total size in bytes, exact
    pub size: u64,

    /// Whether the disk reports itself as removable
    pub removable: bool,
}

impl UsbDevice {
    /// Get a human-readable display name for the device
    pub fn display_name(&self) -> String {
        if !self.model.is_empty() {
            self.model.clone()
        } else if !self.vendor.is_empty() {
            format!("{} Disk", self.vendor)
        } else {
            self.device
                .split('/')
                .next_back()
                .unwrap_or(&self.device)
                .to_string()
        }
    }
}
