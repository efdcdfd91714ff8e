// SPDX-License-Identifier: GPL-3.0-only

//! Layout planning and destructive formatting for dashcam media devices
//!
//! This crate owns everything between a requested volume layout and a
//! formatted USB stick:
//!
//! - capacity validation and the default capacity-tier recommendation
//! - byte-exact partition planning with a reserved table/alignment margin
//! - the format executor, which writes the partition table and filesystems
//! - removable-device enumeration via lsblk
//!
//! Formatting requires elevated privileges and is irreversible; everything
//! up to [`FormatService::format`] is pure and safe to run anywhere.

pub mod device_ops;
pub mod enumerate;
pub mod error;
pub mod format;
pub mod plan;
pub mod recommend;
pub mod scaffold;
pub mod validate;

pub use device_ops::{BlockDeviceOps, PartedCli, partition_device_path};
pub use enumerate::{list_usb_devices, probe_device};
pub use error::{FormatError, FormatStep, Result};
pub use format::FormatService;
pub use plan::{plan, plan_with_reserved};
pub use recommend::{DASHCAM_LABEL, LIGHTSHOW_LABEL, MUSIC_LABEL, recommend};
pub use scaffold::scaffold_volume;
pub use validate::{MediaRequirements, advisories, media_requirements, validate};
