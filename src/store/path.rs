//! Canonical partition paths
//!
//! Layout: `{save_dir}/{asset_class}/{data_kind}/{partition_key}/{symbol}-{data_kind}-{partition_key}.csv`.
//! Every component that originates outside the crate is sanitized so a
//! malicious symbol cannot escape the save directory.

use crate::planner::FetchUnit;
use std::path::{Path, PathBuf};

/// Canonical path for a unit's partition file.
pub fn partition_path(save_dir: &Path, unit: &FetchUnit) -> PathBuf {
    let symbol = sanitize_component(&unit.symbol);
    let key = unit.key.to_string();
    save_dir
        .join(unit.asset_class.to_string())
        .join(unit.kind.to_string())
        .join(&key)
        .join(format!("{}-{}-{}.csv", symbol, unit.kind, key))
}

/// Replace path separators and parent references in a filename component.
fn sanitize_component(name: &str) -> String {
    name.replace("..", "__").replace(['/', '\\', ':'], "_")
}
