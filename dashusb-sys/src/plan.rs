// SPDX-License-Identifier: GPL-3.0-only

//! Partition planning: turns a validated layout into byte-exact specs

use dashusb_types::{
    ByteRange, GPT_RESERVED_BYTES, Layout, PartitionSpec, UsbDevice, bytes_to_whole_gib,
    whole_gib_to_bytes,
};

use crate::error::{FormatError, Result};
use crate::validate::validate;

/// Plan a layout with the default reserved margin.
pub fn plan(device: &UsbDevice, layout: &Layout) -> Result<Vec<PartitionSpec>> {
    plan_with_reserved(device, layout, GPT_RESERVED_BYTES)
}

/// Turn a layout into ordered, non-overlapping partition specs.
///
/// `reserved` bytes at the start of the device are left unallocated for the
/// partition table and alignment. The layout is re-validated here even
/// though live callers already have: it may have been edited since, and the
/// margin consumes space the user-facing capacity check does not see.
pub fn plan_with_reserved(
    device: &UsbDevice,
    layout: &Layout,
    reserved: u64,
) -> Result<Vec<PartitionSpec>> {
    if let Some(name) = layout.duplicate_name() {
        return Err(FormatError::DuplicateVolumeName(name.to_string()));
    }

    if !validate(device, layout).ok {
        return Err(FormatError::CapacityExceeded {
            requested_gib: layout.total_gib(),
            capacity_gib: bytes_to_whole_gib(device.size),
            reserved_bytes: 0,
        });
    }

    let mut specs = Vec::new();
    let mut cursor = reserved;

    for request in layout.active() {
        let end = cursor + whole_gib_to_bytes(request.size_gib);
        specs.push(PartitionSpec {
            number: specs.len() as u32 + 1,
            range: ByteRange { start: cursor, end },
            filesystem: request.filesystem,
            label: request.name.clone(),
            purpose: request.purpose.clone(),
        });
        cursor = end;
    }

    // A layout that consumes every whole gibibyte passes the capacity check
    // but can still overrun once the margin is added.
    if cursor > device.size {
        tracing::warn!(
            device = %device.device,
            reserved,
            "layout fits the capacity check but not the reserved margin"
        );
        return Err(FormatError::CapacityExceeded {
            requested_gib: layout.total_gib(),
            capacity_gib: bytes_to_whole_gib(device.size),
            reserved_bytes: reserved,
        });
    }

    Ok(specs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashusb_types::{GIB, VolumeRequest};

    fn device(size: u64) -> UsbDevice {
        UsbDevice {
            device: "/dev/sdb".to_string(),
            model: String::new(),
            vendor: String::new(),
            size,
            removable: true,
        }
    }

    fn layout(entries: &[(&str, u64)]) -> Layout {
        Layout {
            volumes: entries
                .iter()
                .map(|(name, size)| VolumeRequest::new(*name, *size, ""))
                .collect(),
        }
    }

    #[test]
    fn specs_are_ordered_and_contiguous_after_the_margin() {
        let specs = plan(
            &device(128 * GIB),
            &layout(&[("Dashcam", 64), ("Music", 32), ("LightShow", 16)]),
        )
        .unwrap();

        assert_eq!(specs.len(), 3);
        assert_eq!(specs[0].range.start, GPT_RESERVED_BYTES);
        assert_eq!(specs[0].range.size(), 64 * GIB);
        for pair in specs.windows(2) {
            assert_eq!(pair[0].range.end, pair[1].range.start);
            assert!(!pair[0].range.overlaps(&pair[1].range));
        }
        assert_eq!(specs[2].range.end, GPT_RESERVED_BYTES + 112 * GIB);
        assert!(specs[2].range.end <= 128 * GIB);
        let numbers: Vec<u32> = specs.iter().map(|s| s.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn zero_size_requests_produce_no_partition() {
        let specs = plan(
            &device(64 * GIB),
            &layout(&[("Dashcam", 32), ("Music", 0), ("LightShow", 8)]),
        )
        .unwrap();

        let labels: Vec<&str> = specs.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["Dashcam", "LightShow"]);
        assert_eq!(specs[1].number, 2);
    }

    #[test]
    fn over_capacity_layout_is_rejected_before_allocation() {
        let err = plan(&device(64 * GIB), &layout(&[("Dashcam", 65)])).unwrap_err();
        match err {
            FormatError::CapacityExceeded { reserved_bytes, .. } => {
                assert_eq!(reserved_bytes, 0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn margin_makes_planning_stricter_than_validation() {
        // Every whole gibibyte requested: validate says ok, plan cannot fit
        // the reserved margin on top.
        let device = device(64 * GIB);
        let layout = layout(&[("Dashcam", 64)]);
        assert!(validate(&device, &layout).ok);

        let err = plan(&device, &layout).unwrap_err();
        match err {
            FormatError::CapacityExceeded { reserved_bytes, .. } => {
                assert_eq!(reserved_bytes, GPT_RESERVED_BYTES);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn slack_from_flooring_can_absorb_the_margin() {
        // A real 64 GB stick is not a whole number of GiB; the sub-GiB slack
        // covers the margin even when every floored GiB is requested.
        let device = device(64 * GIB + 4 * 1024 * 1024);
        let specs = plan(&device, &layout(&[("Dashcam", 64)])).unwrap();
        assert_eq!(specs.len(), 1);
        assert!(specs[0].range.end <= device.size);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = plan(
            &device(128 * GIB),
            &layout(&[("Music", 16), ("Music", 16)]),
        )
        .unwrap_err();
        assert!(matches!(err, FormatError::DuplicateVolumeName(name) if name == "Music"));
    }

    #[test]
    fn empty_and_all_zero_layouts_plan_to_nothing() {
        assert!(plan(&device(64 * GIB), &layout(&[])).unwrap().is_empty());
        assert!(
            plan(&device(64 * GIB), &layout(&[("Dashcam", 0)]))
                .unwrap()
                .is_empty()
        );
    }
}
