// SPDX-License-Identifier: GPL-3.0-only

//! CLI wrapper around dashusb-sys for provisioning dashcam media devices

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use dashusb_sys::{
    FormatService, advisories, list_usb_devices, plan_with_reserved, probe_device, recommend,
    scaffold_volume, validate,
};
use dashusb_types::{GPT_RESERVED_BYTES, Layout, UsbDevice, VolumeRequest, bytes_to_pretty};

/// Partition and format a USB device for a dashcam/media head unit
#[derive(Parser)]
#[command(name = "dashusb")]
#[command(about = "Provision USB media for a dashcam head unit", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List attached removable USB devices
    List {
        /// Emit machine-readable JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the recommended volume layout for a device
    Recommend {
        /// Device path (e.g. /dev/sdb)
        device: String,
        #[arg(long)]
        json: bool,
    },
    /// Dry-run the partition plan for a layout without touching the device
    Plan {
        /// Device path (e.g. /dev/sdb)
        device: String,
        /// Dashcam volume size in GiB (defaults to the recommendation)
        #[arg(long)]
        dashcam: Option<u64>,
        /// Music volume size in GiB
        #[arg(long)]
        music: Option<u64>,
        /// Light-show volume size in GiB
        #[arg(long)]
        lightshow: Option<u64>,
        /// Bytes reserved at the start of the device for the partition table
        #[arg(long, default_value_t = GPT_RESERVED_BYTES)]
        reserved_bytes: u64,
        #[arg(long)]
        json: bool,
    },
    /// Partition and format a device with the recommended layout (DESTROYS ALL DATA)
    Format {
        /// Device path (e.g. /dev/sdb)
        device: String,
        /// Dashcam volume size in GiB (defaults to the recommendation)
        #[arg(long)]
        dashcam: Option<u64>,
        /// Music volume size in GiB
        #[arg(long)]
        music: Option<u64>,
        /// Light-show volume size in GiB
        #[arg(long)]
        lightshow: Option<u64>,
        /// Skip the interactive confirmation prompt
        #[arg(long)]
        yes: bool,
        #[arg(long)]
        json: bool,
    },
    /// Partition and format a device with a fully custom layout (DESTROYS ALL DATA)
    Custom {
        /// Device path (e.g. /dev/sdb)
        device: String,
        /// Volume as NAME:SIZE_GIB; repeat for more volumes, in partition order
        #[arg(long = "volume", value_parser = parse_volume, required = true)]
        volumes: Vec<VolumeRequest>,
        /// Skip the interactive confirmation prompt
        #[arg(long)]
        yes: bool,
        #[arg(long)]
        json: bool,
    },
    /// Create the folder tree the head unit expects on a mounted volume
    Scaffold {
        /// Mount point of the volume
        mount_point: PathBuf,
        /// Volume label (Dashcam, Music, LightShow)
        label: String,
    },
}

fn parse_volume(raw: &str) -> Result<VolumeRequest, String> {
    let (name, size) = raw
        .rsplit_once(':')
        .ok_or_else(|| format!("expected NAME:SIZE_GIB, got {raw:?}"))?;
    if name.is_empty() {
        return Err("volume name must not be empty".to_string());
    }
    let size_gib: u64 = size
        .parse()
        .map_err(|_| format!("invalid size {size:?}; sizes are whole GiB"))?;
    Ok(VolumeRequest::new(name, size_gib, ""))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List { json } => {
            let devices = list_usb_devices().await?;
            if json {
                println!("{}", serde_json::to_string(&devices)?);
            } else if devices.is_empty() {
                println!("no removable USB devices found");
            } else {
                for device in devices {
                    println!(
                        "{}  {}  {}",
                        device.device,
                        device.display_name(),
                        bytes_to_pretty(&device.size, true)
                    );
                }
            }
        }

        Commands::Recommend { device, json } => {
            let device = probe_device(&device).await?;
            let layout = recommend(&device);
            if json {
                println!("{}", serde_json::to_string(&layout)?);
            } else {
                print_layout(&device, &layout);
            }
        }

        Commands::Plan {
            device,
            dashcam,
            music,
            lightshow,
            reserved_bytes,
            json,
        } => {
            let device = probe_device(&device).await?;
            let layout = build_layout(&device, dashcam, music, lightshow);
            let check = validate(&device, &layout);
            let specs = plan_with_reserved(&device, &layout, reserved_bytes)?;
            if json {
                println!(
                    "{}",
                    serde_json::json!({ "check": check, "partitions": specs })
                );
            } else {
                println!(
                    "layout fits; {} GiB left over on {}",
                    check.remaining_display_gib(),
                    device.device
                );
                for spec in &specs {
                    println!(
                        "  {}  {}  bytes {}..{}  ({})",
                        spec.number,
                        spec.label,
                        spec.range.start,
                        spec.range.end,
                        bytes_to_pretty(&spec.range.size(), false)
                    );
                }
            }
        }

        Commands::Format {
            device,
            dashcam,
            music,
            lightshow,
            yes,
            json,
        } => {
            require_root()?;
            let device = probe_device(&device).await?;
            let layout = build_layout(&device, dashcam, music, lightshow);
            run_format(&device, &layout, yes, json, false).await?;
        }

        Commands::Custom {
            device,
            volumes,
            yes,
            json,
        } => {
            require_root()?;
            let device = probe_device(&device).await?;
            let layout = Layout { volumes };
            run_format(&device, &layout, yes, json, true).await?;
        }

        Commands::Scaffold { mount_point, label } => {
            scaffold_volume(&mount_point, &label).await?;
            println!("scaffolded {} folders under {}", label, mount_point.display());
        }
    }

    Ok(())
}

fn require_root() -> Result<()> {
    if unsafe { libc::geteuid() } != 0 {
        anyhow::bail!("formatting requires root privileges");
    }
    Ok(())
}

fn build_layout(
    device: &UsbDevice,
    dashcam: Option<u64>,
    music: Option<u64>,
    lightshow: Option<u64>,
) -> Layout {
    let mut layout = recommend(device);
    let overrides = [
        (dashusb_sys::DASHCAM_LABEL, dashcam),
        (dashusb_sys::MUSIC_LABEL, music),
        (dashusb_sys::LIGHTSHOW_LABEL, lightshow),
    ];
    for volume in &mut layout.volumes {
        if let Some((_, Some(size))) = overrides.iter().find(|(name, _)| *name == volume.name) {
            volume.size_gib = *size;
        }
    }
    layout
}

fn print_layout(device: &UsbDevice, layout: &Layout) {
    let check = validate(device, layout);
    println!(
        "{} ({}, {})",
        device.device,
        device.display_name(),
        bytes_to_pretty(&device.size, false)
    );
    for volume in &layout.volumes {
        println!("  {:<12} {:>4} GiB  {}", volume.name, volume.size_gib, volume.purpose);
    }
    println!("  {:<12} {:>4} GiB", "free", check.remaining_display_gib());
}

async fn run_format(
    device: &UsbDevice,
    layout: &Layout,
    yes: bool,
    json: bool,
    custom: bool,
) -> Result<()> {
    for note in advisories(device, layout) {
        tracing::warn!("{note}");
    }

    let confirmed = yes || confirm(device)?;
    let service = FormatService::new()?;
    let report = if custom {
        service
            .create_custom_partitions(device, layout, confirmed)
            .await?
    } else {
        service.format(device, layout, confirmed).await?
    };

    if json {
        println!("{}", serde_json::to_string(&report)?);
    } else {
        println!("formatted {} with {} volumes:", report.device, report.volumes.len());
        for volume in &report.volumes {
            println!(
                "  {}  {}  {}",
                volume.device,
                volume.label,
                bytes_to_pretty(&volume.size, false)
            );
        }
    }
    Ok(())
}

/// Interactive confirmation naming the target device. Formatting destroys
/// every byte on the device and cannot be cancelled once started.
fn confirm(device: &UsbDevice) -> Result<bool> {
    println!(
        "ALL DATA on {} ({}, {}) will be permanently destroyed.",
        device.device,
        device.display_name(),
        bytes_to_pretty(&device.size, true)
    );
    println!("The operation cannot be cancelled once it starts.");
    print!("Type the device path to confirm: ");
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim() == device.device)
}
