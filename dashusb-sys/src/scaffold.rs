// SPDX-License-Identifier: GPL-3.0-only

//! Folder scaffolding for freshly formatted volumes
//!
//! The head unit only records into folders it recognizes. Mounting is the
//! caller's concern; this module just lays out directories on a volume that
//! is already mounted.

use std::path::Path;

use tokio::fs;
use tracing::debug;

use crate::error::Result;
use crate::recommend::{DASHCAM_LABEL, LIGHTSHOW_LABEL, MUSIC_LABEL};

/// Folders the head unit expects on the dashcam volume.
const DASHCAM_FOLDERS: [&str; 3] = [
    "DashCam/RecentClips",
    "DashCam/SavedClips",
    "DashCam/SentryClips",
];

/// Create the folder tree the head unit expects on a mounted volume.
///
/// The tree is chosen by volume label; labels the head unit does not
/// recognize get no scaffolding. Existing folders are left as they are.
pub async fn scaffold_volume(mount_point: &Path, label: &str) -> Result<()> {
    match label {
        DASHCAM_LABEL => {
            for folder in DASHCAM_FOLDERS {
                fs::create_dir_all(mount_point.join(folder)).await?;
            }
        }
        MUSIC_LABEL => fs::create_dir_all(mount_point.join("Music")).await?,
        LIGHTSHOW_LABEL => fs::create_dir_all(mount_point.join("LightShow")).await?,
        other => {
            debug!("no scaffolding defined for volume label {other:?}");
        }
    }
    Ok(())
}
