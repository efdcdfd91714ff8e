// SPDX-License-Identifier: GPL-3.0-only

//! Canonical domain models for dashusb media-device provisioning
//!
//! This crate defines the single source of truth for the types shared
//! across the stack:
//!
//! - **dashusb-sys**: validates, plans, and formats against these types
//! - **dashusb-cli**: renders them for the terminal and as JSON
//!
//! All sizes entering a [`VolumeRequest`] are whole gibibytes
//! (1 GiB = 2^30 bytes); all device capacities and partition offsets are
//! exact bytes. The conversion helpers in [`capacity`] are the only place
//! the two meet.

pub mod capacity;
pub mod device;
pub mod layout;

pub use capacity::{
    ByteRange, GIB, GPT_RESERVED_BYTES, bytes_to_pretty, bytes_to_whole_gib, whole_gib_to_bytes,
};
pub use device::UsbDevice;
pub use layout::{
    FilesystemType, FormatReport, FormattedVolume, Layout, LayoutCheck, PartitionSpec,
    VolumeRequest,
};
