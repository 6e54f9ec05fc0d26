//! `pixcache purge`: empty or delete the store.

use pixcache_memo::Store;

use crate::settings;
use crate::{GlobalArgs, PurgeArgs};

/// Runs the `pixcache purge` command.
///
/// Emptying keeps the LMDB files, whose size does not shrink; `--delete`
/// removes the store directory so the next scope starts from nothing.
pub fn run(args: &PurgeArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config = settings::load(global)?;
    let path = settings::store_path(&config)?;

    if !settings::store_exists(&path) {
        if !global.quiet {
            eprintln!("nothing to purge: no store at {}", path.display());
        }
        return Ok(0);
    }

    if args.delete {
        std::fs::remove_dir_all(&path)?;
        if !global.quiet {
            eprintln!("   Deleted {}", path.display());
        }
        return Ok(0);
    }

    let store = Store::open(&path, config.max_size)?;
    let removed = store.clear();
    store.close();
    let removed = removed?;
    if !global.quiet {
        eprintln!("    Purged {removed} entries from {}", path.display());
    }
    Ok(0)
}
