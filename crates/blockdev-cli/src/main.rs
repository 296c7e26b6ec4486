//! blockdev-probe - partition table inspection tool
//!
//! Prints the partition table found on a block device or disk image.

use anyhow::{Context, Result};
use blockdev_core::{format_size, Error, PartitionTable, ProbeOptions, TableSummary};
use blockdev_tables::{probe_path, ProbedTable};
use clap::builder::RangedU64ValueParser;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

/// Exit status when a table is present but damaged
const EXIT_DAMAGED: u8 = 2;

#[derive(Parser)]
#[command(name = "blockdev-probe")]
#[command(about = "Detect and list the MBR or GPT partition table of a device")]
#[command(version)]
struct Cli {
    /// Block device or disk image to inspect
    device: PathBuf,

    /// Print the table as JSON
    #[arg(long)]
    json: bool,

    /// Maximum number of extension records followed in an MBR logical chain
    #[arg(
        long,
        default_value_t = blockdev_core::limits::DEFAULT_MAX_LOGICAL_PARTITIONS,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    max_logical: usize,

    /// Fall back to the backup GPT when the primary fails its checksums
    #[arg(long)]
    recover_backup: bool,

    /// Log level
    #[arg(long, env = "RUST_LOG", default_value = "warn")]
    log_level: String,
}

impl Cli {
    fn options(&self) -> ProbeOptions {
        ProbeOptions::default()
            .with_max_logical_partitions(self.max_logical)
            .with_backup_recovery(self.recover_backup)
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(&cli.log_level)
        .with_writer(std::io::stderr)
        .init();

    let options = cli.options();
    tracing::debug!("Probing {}", cli.device.display());
    tracing::debug!("  Max logical records: {}", options.max_logical_partitions);
    tracing::debug!("  Max entry array: {} bytes", options.max_entry_array_bytes);
    tracing::debug!("  Backup recovery: {}", options.recover_from_backup);

    let table = match probe_path(&cli.device, &options) {
        Ok(table) => table,
        Err(err) => {
            if let Some(report) = damage_report(&err, options.recover_from_backup) {
                tracing::error!("{}: {}", cli.device.display(), err);
                eprintln!("{}: {}", cli.device.display(), report);
                return Ok(ExitCode::from(EXIT_DAMAGED));
            }
            return Err(err).with_context(|| format!("probing {}", cli.device.display()));
        }
    };

    if cli.json {
        let summary = TableSummary::from_table(&table);
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_table(&cli.device, &table);
    }

    Ok(ExitCode::SUCCESS)
}

/// Describe a table that exists but could not be decoded
///
/// Returns `None` for errors that do not mean damage, such as I/O failures
/// or an unpartitioned device.
fn damage_report(err: &Error, recover_backup: bool) -> Option<String> {
    if !err.is_corruption() {
        return None;
    }

    let mut report = format!("partition table is damaged: {}", err);
    if matches!(err, Error::IntegrityMismatch(_)) && !recover_backup {
        report.push_str(" (retry with --recover-backup to read the backup GPT)");
    }
    Some(report)
}

fn print_table(device: &std::path::Path, table: &ProbedTable) {
    println!("=== Partition Table ===");
    println!("Device:      {}", device.display());
    println!("Type:        {} ({})", table.table_kind(), table.identify());

    match table {
        ProbedTable::Mbr(mbr) => {
            println!("Disk Sig:    0x{:08X}", mbr.disk_signature());
        }
        ProbedTable::Gpt(gpt) => {
            println!("Disk GUID:   {}", table.disk_identifier());
            println!("Usable LBA:  {}", gpt.usable_block_count());
            if gpt.is_from_backup() {
                println!("Note:        recovered from the backup GPT header");
            }
        }
    }
    println!();

    if table.partitions().is_empty() {
        println!("No partitions found.");
        return;
    }

    println!(
        "{:<4} {:<4} {:<9} {:<12} {:<12} {:<20} {}",
        "#", "Boot", "Kind", "Start", "Size", "Type", "Identifier"
    );
    println!("{}", "-".repeat(101));

    for partition in table.partitions().values() {
        let type_name = match table {
            ProbedTable::Mbr(mbr) => mbr
                .partition_type(partition.number)
                .map(|t| t.to_string())
                .unwrap_or_default(),
            ProbedTable::Gpt(gpt) => gpt
                .partition_type(partition.number)
                .map(|t| t.name().to_string())
                .unwrap_or_default(),
        };

        let boot = match table {
            ProbedTable::Mbr(mbr) if mbr.is_bootable(partition.number) => "*",
            _ => "",
        };

        println!(
            "{:<4} {:<4} {:<9} {:<12} {:<12} {:<20} {}",
            partition.number,
            boot,
            partition.kind,
            partition.start_block,
            format_size(partition.byte_length()),
            type_name,
            partition.identifier
        );
    }
}
