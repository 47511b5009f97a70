use std::time::Duration;

use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};
use notify_debouncer_full::{
    new_debouncer,
    notify::{RecommendedWatcher, RecursiveMode, Watcher as _},
    DebounceEventResult, FileIdMap,
};
use tokio::sync::mpsc;
use tracing::warn;

type Debouncer = notify_debouncer_full::Debouncer<RecommendedWatcher, FileIdMap>;

/// Debounced recursive filesystem watcher feeding changed paths into the async loop.
pub struct Watcher {
    changes: mpsc::UnboundedReceiver<Vec<Utf8PathBuf>>,
    _debouncer: Debouncer,
}

impl Watcher {
    pub fn watch(path: &Utf8Path) -> Result<Self> {
        let (tx, changes) = mpsc::unbounded_channel();

        let mut debouncer = new_debouncer(
            Duration::from_millis(200),
            None,
            move |result: DebounceEventResult| match result {
                Ok(events) => {
                    let paths: Vec<_> = events
                        .into_iter()
                        .flat_map(|event| event.event.paths)
                        .filter_map(|path| Utf8PathBuf::from_path_buf(path).ok())
                        .collect();
                    if !paths.is_empty() {
                        let _ = tx.send(paths);
                    }
                }
                Err(errors) => {
                    for err in errors {
                        warn!("filesystem watcher: {err}");
                    }
                }
            },
        )?;

        debouncer
            .watcher()
            .watch(path.as_std_path(), RecursiveMode::Recursive)?;

        Ok(Self {
            changes,
            _debouncer: debouncer,
        })
    }

    /// Waits for the next batch of changed paths, `None` once the watcher stopped.
    pub async fn recv(&mut self) -> Option<Vec<Utf8PathBuf>> {
        self.changes.recv().await
    }
}
