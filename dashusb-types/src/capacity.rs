//! Capacity arithmetic shared across models

use num_format::{Locale, ToFormattedString};
use serde::{Deserialize, Serialize};

/// One gibibyte (2^30 bytes); the unit all user-facing volume sizes are
/// expressed in.
pub const GIB: u64 = 1024 * 1024 * 1024;

/// Space reserved at the start of a device for the partition table and
/// alignment (1 MiB) - standard for modern disks. The planner accepts an
/// override for table formats with different overhead.
pub const GPT_RESERVED_BYTES: u64 = 1024 * 1024;

/// Convert an exact byte count to whole gibibytes, rounding down.
pub fn bytes_to_whole_gib(bytes: u64) -> u64 {
    bytes / GIB
}

/// Convert a whole-gibibyte count to an exact byte count.
pub fn whole_gib_to_bytes(gib: u64) -> u64 {
    gib * GIB
}

/// A byte range representing a contiguous region of a device
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteRange {
    /// Start byte (inclusive)
    pub start: u64,

    /// End byte (exclusive)
    pub end: u64,
}

impl ByteRange {
    /// Check if this range is valid for a disk of the given size
    pub fn is_valid_for_disk(&self, disk_size: u64) -> bool {
        self.start < self.end && self.end <= disk_size
    }

    /// Get the size of this range in bytes
    pub fn size(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// Check if this range shares any byte with another
    pub fn overlaps(&self, other: &ByteRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Convert bytes to human-readable format (e.g., "1.50 GiB").
///
/// Display only - never feed the result back into arithmetic.
pub fn bytes_to_pretty(bytes: &u64, add_bytes: bool) -> String {
    let mut steps = 0;
    let mut val: f64 = *bytes as f64;

    while val >= 1024. && steps < 4 {
        val /= 1024.;
        steps += 1;
    }

    let unit = match steps {
        0 => "B",
        1 => "KiB",
        2 => "MiB",
        3 => "GiB",
        _ => "TiB",
    };

    if add_bytes {
        let bytes_str = bytes.to_formatted_string(&Locale::en);
        format!("{:.2} {} ({} bytes)", val, unit, bytes_str)
    } else {
        format!("{:.2} {}", val, unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_gib_rounds_down() {
        assert_eq!(bytes_to_whole_gib(GIB - 1), 0);
        assert_eq!(bytes_to_whole_gib(GIB), 1);
        assert_eq!(bytes_to_whole_gib(137_438_953_472), 128);
        assert_eq!(bytes_to_whole_gib(137_438_953_471), 127);
    }

    #[test]
    fn gib_conversion_round_trips_on_whole_units() {
        for gib in [0, 1, 32, 64, 128] {
            assert_eq!(bytes_to_whole_gib(whole_gib_to_bytes(gib)), gib);
        }
    }

    #[test]
    fn pretty_picks_largest_unit() {
        assert_eq!(bytes_to_pretty(&512, false), "512.00 B");
        assert_eq!(bytes_to_pretty(&(64 * GIB), false), "64.00 GiB");
        assert_eq!(bytes_to_pretty(&(1024 * 1024), false), "1.00 MiB");
        assert_eq!(bytes_to_pretty(&(2048 * GIB), false), "2.00 TiB");
    }

    #[test]
    fn pretty_with_exact_bytes() {
        assert_eq!(
            bytes_to_pretty(&(2 * GIB), true),
            "2.00 GiB (2,147,483,648 bytes)"
        );
    }

    #[test]
    fn byte_range_overlap() {
        let a = ByteRange { start: 0, end: 10 };
        let b = ByteRange { start: 10, end: 20 };
        let c = ByteRange { start: 5, end: 15 };
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&b));
    }

    #[test]
    fn byte_range_validity() {
        let range = ByteRange { start: 0, end: 100 };
        assert!(range.is_valid_for_disk(100));
        assert!(!range.is_valid_for_disk(99));
        assert_eq!(range.size(), 100);
    }
}
