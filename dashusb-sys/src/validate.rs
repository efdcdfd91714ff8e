// SPDX-License-Identifier: GPL-3.0-only

//! Layout validation against device capacity

use dashusb_types::{Layout, LayoutCheck, UsbDevice, bytes_to_whole_gib};

use crate::recommend::DASHCAM_LABEL;

/// Check a requested layout against a device's capacity.
///
/// Pure function; live-editing callers re-run it on every change to a
/// requested size and must keep any committing action disabled while `ok`
/// is false. Negative remaining space is a reportable state, not an error.
pub fn validate(device: &UsbDevice, layout: &Layout) -> LayoutCheck {
    let capacity_gib = bytes_to_whole_gib(device.size) as i64;
    let remaining_gib = capacity_gib - layout.total_gib() as i64;
    LayoutCheck {
        remaining_gib,
        ok: remaining_gib >= 0,
    }
}

/// Minimums the head unit documents for a media device
#[derive(Debug, Clone, Copy)]
pub struct MediaRequirements {
    pub min_total_gib: u64,
    pub min_dashcam_gib: u64,
    pub recommended_write_speed_mbps: u32,
}

pub fn media_requirements() -> MediaRequirements {
    MediaRequirements {
        min_total_gib: 32,
        min_dashcam_gib: 32,
        recommended_write_speed_mbps: 4,
    }
}

/// Non-fatal advisories for layouts that fit the device but fall short of
/// the head unit's documented minimums. The head unit may refuse to record
/// onto undersized volumes; formatting them is still allowed.
pub fn advisories(device: &UsbDevice, layout: &Layout) -> Vec<String> {
    let requirements = media_requirements();
    let mut notes = Vec::new();

    let capacity_gib = bytes_to_whole_gib(device.size);
    if capacity_gib < requirements.min_total_gib {
        notes.push(format!(
            "device is {} GiB; the head unit expects at least {} GiB",
            capacity_gib, requirements.min_total_gib
        ));
    }

    if let Some(dashcam) = layout.volumes.iter().find(|v| v.name == DASHCAM_LABEL) {
        if dashcam.size_gib > 0 && dashcam.size_gib < requirements.min_dashcam_gib {
            notes.push(format!(
                "{} volume is {} GiB; the head unit expects at least {} GiB for recordings",
                DASHCAM_LABEL, dashcam.size_gib, requirements.min_dashcam_gib
            ));
        }
    }

    notes
}
