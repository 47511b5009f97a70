use anyhow::{Context, Result};
use camino::Utf8Path;
use tokio::fs;
use tracing::debug;

use crate::{config::Asset, glob::Glob, shell};

/// Outcome of one copy task.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct CopyReport {
    pub files: usize,
    pub bytes: u64,
    pub errors: usize,
}

impl CopyReport {
    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }
}

/// Copies every file matched by the asset's input globs into `out_dir/<output>`, keeping
/// each file's path relative to its glob base.
///
/// A file that cannot be copied is reported under the task's name and skipped. Only an
/// invalid glob fails the whole task.
pub async fn copy_asset(
    root: &Utf8Path,
    name: &str,
    asset: &Asset,
    out_dir: &Utf8Path,
) -> Result<CopyReport> {
    let dest = out_dir.join(&asset.output);
    let mut report = CopyReport::default();

    for pattern in &asset.input {
        let glob = Glob::new(pattern).with_context(|| format!("invalid input for `{name}`"))?;

        for found in glob.walk(root) {
            let found = match found {
                Ok(found) => found,
                Err(err) => {
                    shell().notify(name, format!("{err:#}"));
                    report.errors += 1;
                    continue;
                }
            };
            // the output may live inside an input directory
            if found.path.starts_with(out_dir) {
                continue;
            }

            let target = dest.join(&found.relative);
            match copy_file(&found.path, &target).await {
                Ok(bytes) => {
                    debug!(from = %found.path, to = %target, bytes, "copied");
                    report.files += 1;
                    report.bytes += bytes;
                }
                Err(err) => {
                    shell().notify(name, format!("{err:#}"));
                    report.errors += 1;
                }
            }
        }
    }
    Ok(report)
}

async fn copy_file(from: &Utf8Path, to: &Utf8Path) -> Result<u64> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create `{parent}`"))?;
    }
    let bytes = fs::copy(from, to)
        .await
        .with_context(|| format!("failed to copy `{from}` to `{to}`"))?;
    Ok(bytes)
}
