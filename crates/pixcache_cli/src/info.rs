//! `pixcache info`: store location and usage.

use pixcache_common::ByteSize;
use pixcache_memo::{Store, StoreStats};

use crate::settings;
use crate::{GlobalArgs, InfoArgs, ReportFormat};

/// Runs the `pixcache info` command.
///
/// A store that has not been created yet is reported, not created.
pub fn run(args: &InfoArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config = settings::load(global)?;
    let path = settings::store_path(&config)?;

    let stats = if settings::store_exists(&path) {
        let store = Store::open(&path, config.max_size)?;
        let stats = store.stats();
        store.close();
        Some(stats?)
    } else {
        None
    };

    match args.format {
        ReportFormat::Text => {
            if global.quiet {
                return Ok(0);
            }
            println!("{:>10} {}", "Store", path.display());
            if config.disabled {
                println!("{:>10} disabled", "Caching");
            }
            match stats {
                Some(stats) => print_stats(&stats),
                None => {
                    println!("{:>10} {}", "Capacity", config.max_size);
                    println!("{:>10} not created yet", "Status");
                }
            }
        }
        ReportFormat::Json => {
            let report = serde_json::json!({
                "path": path.display().to_string(),
                "disabled": config.disabled,
                "exists": stats.is_some(),
                "entries": stats.map(|s| s.entries).unwrap_or(0),
                "max_size": config.max_size.bytes(),
                "disk_size": stats.map(|s| s.disk_size).unwrap_or(ByteSize::new(0)).bytes(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(0)
}

fn print_stats(stats: &StoreStats) {
    println!("{:>10} {}", "Entries", stats.entries);
    println!("{:>10} {}", "Capacity", stats.max_size);
    println!("{:>10} {}", "On disk", stats.disk_size);
}
