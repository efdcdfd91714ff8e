// SPDX-License-Identifier: GPL-3.0-only

//! Default volume layout by capacity tier

use dashusb_types::{Layout, UsbDevice, VolumeRequest, bytes_to_whole_gib};

/// Well-known volume labels the head unit recognizes.
pub const DASHCAM_LABEL: &str = "Dashcam";
pub const MUSIC_LABEL: &str = "Music";
pub const LIGHTSHOW_LABEL: &str = "LightShow";

const DASHCAM_PURPOSE: &str = "Dashcam and sentry recordings";
const MUSIC_PURPOSE: &str = "Music files";
const LIGHTSHOW_PURPOSE: &str = "Light show sequences";

/// Derive the default volume layout for a device from its capacity tier.
///
/// Returns all three well-known volumes; sizes below the tier threshold are
/// explicit zeros, which the planner omits. The result always satisfies
/// [`crate::validate::validate`]: every tier's total is strictly below the
/// tier's lower bound, and on devices smaller than the single dashcam
/// volume the size is clamped to what fits.
///
/// The recommendation replaces any previously requested sizes for these
/// three names; it does not merge with custom layouts using other names.
pub fn recommend(device: &UsbDevice) -> Layout {
    let capacity_gib = bytes_to_whole_gib(device.size);

    let (dashcam, music, lightshow) = if capacity_gib < 64 {
        (32u64.min(capacity_gib), 0, 0)
    } else if capacity_gib < 128 {
        (32, 16, 8)
    } else {
        (64, 32, 16)
    };

    Layout {
        volumes: vec![
            VolumeRequest::new(DASHCAM_LABEL, dashcam, DASHCAM_PURPOSE),
            VolumeRequest::new(MUSIC_LABEL, music, MUSIC_PURPOSE),
            VolumeRequest::new(LIGHTSHOW_LABEL, lightshow, LIGHTSHOW_PURPOSE),
        ],
    }
}
