// SPDX-License-Identifier: GPL-3.0-only

//! The format executor - the only destructive path in the system
//!
//! Every precondition is checked before the device is touched. Once the
//! table write begins the operation cannot be cancelled, and any later
//! failure leaves the device partially formatted with no rollback; callers
//! must re-enumerate before trusting the device again.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use dashusb_types::{FormatReport, FormattedVolume, Layout, PartitionSpec, UsbDevice};
use tracing::{info, warn};

use crate::device_ops::{BlockDeviceOps, PartedCli, partition_device_path};
use crate::error::{FormatError, FormatStep, Result};
use crate::plan::plan;

/// Executes format runs while holding exclusive intent over the target
/// device identifier. One logical operation per device at a time; a second
/// call against a busy identifier is rejected, never interleaved.
pub struct FormatService {
    ops: Arc<dyn BlockDeviceOps>,
    active: Arc<Mutex<HashSet<String>>>,
}

impl FormatService {
    /// Service backed by the real partitioning tools.
    pub fn new() -> Result<Self> {
        Ok(Self::with_ops(Arc::new(PartedCli::new()?)))
    }

    /// Service backed by caller-supplied operations.
    pub fn with_ops(ops: Arc<dyn BlockDeviceOps>) -> Self {
        Self {
            ops,
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Format `device` with the given layout, destroying all existing data.
    ///
    /// `confirmed` must carry an explicit affirmative confirmation naming
    /// the target device; interactive callers prompt for it, non-interactive
    /// callers pass their `--yes` flag. Re-running against the same device
    /// is legal and simply re-formats - nothing from an earlier run
    /// survives.
    pub async fn format(
        &self,
        device: &UsbDevice,
        layout: &Layout,
        confirmed: bool,
    ) -> Result<FormatReport> {
        if !confirmed {
            return Err(FormatError::NotConfirmed);
        }

        let specs = plan(device, layout)?;
        if specs.is_empty() {
            return Err(FormatError::EmptyPlan);
        }

        let _claim = self.claim(&device.device)?;

        // Identifier alone is not a safe reference key: the node may now be
        // a different stick. Capacity must match the planning-time snapshot.
        let probed = self.ops.probe(&device.device).await?;
        if probed.size != device.size {
            return Err(FormatError::DeviceUnavailable(format!(
                "{} changed size since planning ({} -> {} bytes); re-enumerate and retry",
                device.device, device.size, probed.size
            )));
        }

        info!(
            device = %device.device,
            partitions = specs.len(),
            "writing new partition table"
        );
        self.ops
            .write_partition_table(&device.device)
            .await
            .map_err(|e| step_failed(FormatStep::WriteTable, e))?;

        for spec in &specs {
            info!(device = %device.device, label = %spec.label, "creating partition {}", spec.number);
            self.ops
                .create_partition(&device.device, spec)
                .await
                .map_err(|e| step_failed(FormatStep::CreatePartition(spec.number), e))?;
        }

        for spec in &specs {
            info!(device = %device.device, label = %spec.label, "formatting partition {}", spec.number);
            self.ops
                .format_partition(&device.device, spec)
                .await
                .map_err(|e| step_failed(FormatStep::FormatPartition(spec.number), e))?;
        }

        info!(device = %device.device, "format complete");
        Ok(report(device, &specs))
    }

    /// Same contract as [`FormatService::format`], for callers that build
    /// their own layout instead of starting from the recommendation.
    pub async fn create_custom_partitions(
        &self,
        device: &UsbDevice,
        layout: &Layout,
        confirmed: bool,
    ) -> Result<FormatReport> {
        self.format(device, layout, confirmed).await
    }

    fn claim(&self, device: &str) -> Result<DeviceClaim> {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if !active.insert(device.to_string()) {
            return Err(FormatError::DeviceBusy(device.to_string()));
        }
        Ok(DeviceClaim {
            active: Arc::clone(&self.active),
            device: device.to_string(),
        })
    }
}

/// Releases the per-device claim when the format call completes, whatever
/// the outcome.
struct DeviceClaim {
    active: Arc<Mutex<HashSet<String>>>,
    device: String,
}

impl Drop for DeviceClaim {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.device);
    }
}

fn step_failed(step: FormatStep, source: FormatError) -> FormatError {
    warn!("{step} failed: {source}");
    FormatError::StepFailed {
        step,
        message: source.to_string(),
    }
}

fn report(device: &UsbDevice, specs: &[PartitionSpec]) -> FormatReport {
    FormatReport {
        device: device.device.clone(),
        table_type: "gpt".to_string(),
        volumes: specs
            .iter()
            .map(|spec| FormattedVolume {
                device: partition_device_path(&device.device, spec.number),
                label: spec.label.clone(),
                filesystem: spec.filesystem,
                size: spec.range.size(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashusb_types::{GIB, VolumeRequest};

    /// Recording fake for the block layer. `fail_on` aborts the named step
    /// after recording it, mimicking a tool failure mid-run.
    struct FakeOps {
        probe_size: Mutex<u64>,
        steps: Mutex<Vec<String>>,
        fail_on: Option<String>,
    }

    impl FakeOps {
        fn new(probe_size: u64) -> Self {
            Self {
                probe_size: Mutex::new(probe_size),
                steps: Mutex::new(Vec::new()),
                fail_on: None,
            }
        }

        fn failing_on(probe_size: u64, step: &str) -> Self {
            Self {
                fail_on: Some(step.to_string()),
                ..Self::new(probe_size)
            }
        }

        fn record(&self, step: String) -> Result<()> {
            self.steps.lock().unwrap().push(step.clone());
            if self.fail_on.as_deref() == Some(step.as_str()) {
                return Err(FormatError::OperationFailed(format!("{step} exploded")));
            }
            Ok(())
        }

        fn steps(&self) -> Vec<String> {
            self.steps.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl BlockDeviceOps for FakeOps {
        async fn probe(&self, device: &str) -> Result<UsbDevice> {
            Ok(UsbDevice {
                device: device.to_string(),
                model: String::new(),
                vendor: String::new(),
                size: *self.probe_size.lock().unwrap(),
                removable: true,
            })
        }

        async fn write_partition_table(&self, _device: &str) -> Result<()> {
            self.record("table".to_string())
        }

        async fn create_partition(&self, _device: &str, spec: &PartitionSpec) -> Result<()> {
            self.record(format!("create:{}", spec.number))
        }

        async fn format_partition(&self, _device: &str, spec: &PartitionSpec) -> Result<()> {
            self.record(format!("format:{}", spec.number))
        }
    }

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

    fn service(ops: Arc<FakeOps>) -> FormatService {
        FormatService::with_ops(ops)
    }

    #[tokio::test]
    async fn unconfirmed_call_never_touches_the_device() {
        let ops = Arc::new(FakeOps::new(128 * GIB));
        let err = service(Arc::clone(&ops))
            .format(&device(128 * GIB), &layout(&[("Dashcam", 64)]), false)
            .await
            .unwrap_err();

        assert!(matches!(err, FormatError::NotConfirmed));
        assert!(ops.steps().is_empty());
    }

    #[tokio::test]
    async fn all_zero_layout_is_an_empty_plan() {
        let ops = Arc::new(FakeOps::new(128 * GIB));
        let err = service(Arc::clone(&ops))
            .format(
                &device(128 * GIB),
                &layout(&[("Dashcam", 0), ("Music", 0)]),
                true,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, FormatError::EmptyPlan));
        assert!(ops.steps().is_empty());
    }

    #[tokio::test]
    async fn capacity_excess_is_caught_before_any_step() {
        let ops = Arc::new(FakeOps::new(64 * GIB));
        let err = service(Arc::clone(&ops))
            .format(&device(64 * GIB), &layout(&[("Dashcam", 100)]), true)
            .await
            .unwrap_err();

        assert!(matches!(err, FormatError::CapacityExceeded { .. }));
        assert!(ops.steps().is_empty());
    }

    #[tokio::test]
    async fn capacity_drift_since_planning_is_rejected() {
        // The snapshot says 128 GiB, the node now answers with 64 GiB: same
        // identifier, different stick.
        let ops = Arc::new(FakeOps::new(64 * GIB));
        let err = service(Arc::clone(&ops))
            .format(&device(128 * GIB), &layout(&[("Dashcam", 64)]), true)
            .await
            .unwrap_err();

        assert!(matches!(err, FormatError::DeviceUnavailable(_)));
        assert!(ops.steps().is_empty());
    }

    #[tokio::test]
    async fn busy_device_is_rejected_and_released_on_drop() {
        let svc = service(Arc::new(FakeOps::new(128 * GIB)));
        let claim = svc.claim("/dev/sdb").unwrap();

        let err = svc
            .format(&device(128 * GIB), &layout(&[("Dashcam", 64)]), true)
            .await
            .unwrap_err();
        assert!(matches!(err, FormatError::DeviceBusy(d) if d == "/dev/sdb"));

        drop(claim);
        svc.format(&device(128 * GIB), &layout(&[("Dashcam", 64)]), true)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn steps_run_strictly_in_order() {
        let ops = Arc::new(FakeOps::new(128 * GIB));
        let report = service(Arc::clone(&ops))
            .format(
                &device(128 * GIB),
                &layout(&[("Dashcam", 64), ("Music", 32), ("LightShow", 16)]),
                true,
            )
            .await
            .unwrap();

        assert_eq!(
            ops.steps(),
            vec![
                "table", "create:1", "create:2", "create:3", "format:1", "format:2", "format:3"
            ]
        );

        assert_eq!(report.table_type, "gpt");
        let partitions: Vec<(&str, &str)> = report
            .volumes
            .iter()
            .map(|v| (v.device.as_str(), v.label.as_str()))
            .collect();
        assert_eq!(
            partitions,
            vec![
                ("/dev/sdb1", "Dashcam"),
                ("/dev/sdb2", "Music"),
                ("/dev/sdb3", "LightShow")
            ]
        );
        assert_eq!(report.volumes[0].size, 64 * GIB);
    }

    #[tokio::test]
    async fn step_failure_aborts_everything_after_it() {
        let ops = Arc::new(FakeOps::failing_on(128 * GIB, "create:2"));
        let err = service(Arc::clone(&ops))
            .format(
                &device(128 * GIB),
                &layout(&[("Dashcam", 64), ("Music", 32), ("LightShow", 16)]),
                true,
            )
            .await
            .unwrap_err();

        match err {
            FormatError::StepFailed { step, .. } => {
                assert_eq!(step, FormatStep::CreatePartition(2));
            }
            other => panic!("unexpected error: {other}"),
        }
        // Partition 3 was never attempted and no filesystem was written.
        assert_eq!(ops.steps(), vec!["table", "create:1", "create:2"]);
    }

    #[tokio::test]
    async fn reformat_replaces_rather_than_merges() {
        let ops = Arc::new(FakeOps::new(128 * GIB));
        let svc = service(Arc::clone(&ops));
        let target = device(128 * GIB);

        svc.format(&target, &layout(&[("Dashcam", 64), ("Music", 32)]), true)
            .await
            .unwrap();
        let second = svc
            .format(&target, &layout(&[("Dashcam", 100)]), true)
            .await
            .unwrap();

        // The second report reflects only the second layout.
        assert_eq!(second.volumes.len(), 1);
        assert_eq!(second.volumes[0].label, "Dashcam");
        assert_eq!(second.volumes[0].size, 100 * GIB);
        assert_eq!(
            ops.steps(),
            vec![
                "table", "create:1", "create:2", "format:1", "format:2", "table", "create:1",
                "format:1"
            ]
        );
    }
}
