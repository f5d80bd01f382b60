use anyhow::{Context, Result};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use super::{store::SNAPSHOT_FILE, Column};

/// Persist `cols` as `<dir>/meta_data.json`, replacing any previous snapshot.
///
/// Column order is kept as given so the snapshot mirrors the source header.
pub fn write_snapshot<P: AsRef<Path>>(dir: P, cols: &[Column]) -> Result<PathBuf> {
    let dir = dir.as_ref();
    let path = dir.join(SNAPSHOT_FILE);

    // Write atomically: to tmp file, then rename over the previous snapshot
    let tmp_path = dir.join(format!(".{}.tmp", SNAPSHOT_FILE));
    let mut tmp = fs::File::create(&tmp_path)
        .with_context(|| format!("creating {}", tmp_path.display()))?;

    // pretty-print with a trailing newline
    serde_json::to_writer_pretty(&mut tmp, cols).context("serializing snapshot")?;
    tmp.write_all(b"\n")?;
    tmp.sync_all()?;

    fs::rename(&tmp_path, &path)
        .with_context(|| format!("renaming {} -> {}", tmp_path.display(), path.display()))?;

    Ok(path)
}
