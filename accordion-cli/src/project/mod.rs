mod watch;

use std::{env, time::Instant};

use anyhow::{anyhow, bail, Context, Result};
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use tokio::fs;
use tracing::debug;

use self::watch::Watcher;
use crate::{
    config::{Asset, Config, FILE_NAME},
    copy::{copy_asset, CopyReport},
    glob::Glob,
    shell,
    util::*,
};

#[derive(Clone, Debug)]
pub struct Project {
    pub root: Utf8PathBuf,
    pub config: Config,
    pub config_path: Option<Utf8PathBuf>,
}

impl Project {
    // Commands

    pub async fn clean(&self) -> Result<()> {
        let out_dir = self.out_dir()?;
        if out_dir.exists() {
            fs::remove_dir_all(&out_dir)
                .await
                .with_context(|| format!("failed to remove `{out_dir}`"))?;
            shell().status("Removed", &out_dir);
        }
        Ok(())
    }

    /// Runs the named copy tasks, or every task when `names` is empty.
    pub async fn build(&self, names: &[String]) -> Result<()> {
        let out_dir = self.out_dir()?;
        let start = Instant::now();
        let mut total = CopyReport::default();

        for (name, asset) in self.tasks(names)? {
            let report = self.run_task(name, asset, &out_dir).await?;
            total.files += report.files;
            total.bytes += report.bytes;
            total.errors += report.errors;
        }

        shell().status(
            "Finished",
            format!(
                "{} file(s), {} in {}",
                total.files,
                FileSize(total.bytes),
                Elapsed(start.elapsed())
            ),
        );
        total.copied_ok()?;
        Ok(())
    }

    pub async fn watch(mut self) -> Result<()> {
        let mut watcher = Watcher::watch(&self.root)?;
        debug!(root = %self.root, "watching");
        report(self.build(&[]).await);

        loop {
            let changed = watcher
                .recv()
                .await
                .ok_or_else(|| anyhow!("filesystem watcher closed"))?;

            let out_dir = normalize(&self.root.join(&self.config.build.out_dir));
            let changed: Vec<_> = changed
                .into_iter()
                .filter(|path| !path.starts_with(&out_dir))
                .collect();

            let config_file = self.config_file();
            if changed.iter().any(|path| *path == config_file) {
                shell().status("Reload", format!("{FILE_NAME} changed"));
                match Self::from_env(self.config_path.as_deref()) {
                    Ok(project) => self = project,
                    Err(err) => {
                        shell().error(format!("{err:#}"));
                        continue;
                    }
                }
                report(self.build(&[]).await);
                continue;
            }

            let names = self.affected(&changed);
            if !names.is_empty() {
                shell().status("Changed", names.join(", "));
                report(self.build(&names).await);
            }
        }
    }

    // Utilities

    fn tasks<'a>(&'a self, names: &'a [String]) -> Result<Vec<(&'a str, &'a Asset)>> {
        if names.is_empty() {
            return Ok(self
                .config
                .assets
                .iter()
                .map(|(name, asset)| (name.as_str(), asset))
                .collect());
        }

        names
            .iter()
            .map(|name| {
                self.config
                    .assets
                    .get(name)
                    .map(|asset| (name.as_str(), asset))
                    .ok_or_else(|| anyhow!("no asset named `{name}` in {FILE_NAME}"))
            })
            .collect()
    }

    async fn run_task(&self, name: &str, asset: &Asset, out_dir: &Utf8Path) -> Result<CopyReport> {
        shell().progress("Copying", name);
        let report = copy_asset(&self.root, name, asset, out_dir).await?;
        shell().status(
            "Copied",
            format!("{name}: {} file(s), {}", report.files, FileSize(report.bytes)),
        );
        Ok(report)
    }

    /// Tasks whose watch globs match any of the changed paths, in config order.
    fn affected(&self, changed: &[Utf8PathBuf]) -> Vec<String> {
        self.config
            .assets
            .iter()
            .filter(|(_, asset)| {
                asset
                    .watch_globs()
                    .iter()
                    .filter_map(|pattern| Glob::new(pattern).ok())
                    .any(|glob| changed.iter().any(|path| glob.matches_path(&self.root, path)))
            })
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn config_file(&self) -> Utf8PathBuf {
        self.config_path
            .clone()
            .unwrap_or_else(|| self.root.join(FILE_NAME))
    }

    /// The build output directory, which must lie strictly inside the project root.
    fn out_dir(&self) -> Result<Utf8PathBuf> {
        let root = normalize(&self.root);
        let out_dir = normalize(&root.join(&self.config.build.out_dir));

        // an existing directory may still be a link back to the root or above
        let resolved = out_dir
            .canonicalize_utf8()
            .unwrap_or_else(|_| out_dir.clone());
        if out_dir == root || !out_dir.starts_with(&root) || root.starts_with(&resolved) {
            bail!(
                "output directory `{}` must be inside the project root `{root}`",
                self.config.build.out_dir
            );
        }
        Ok(out_dir)
    }

    pub fn from_env(config: Option<&Utf8Path>) -> Result<Self> {
        if let Some(path) = config {
            let path = path
                .canonicalize_utf8()
                .with_context(|| format!("`{path}` not found"))?;
            return Self::load(path);
        }

        let cwd = Utf8PathBuf::try_from(env::current_dir()?)?;
        let cwd = cwd.canonicalize_utf8().unwrap_or(cwd);
        if let Some(path) = find_file(&cwd) {
            Self::load(path)
        } else {
            debug!(root = %cwd, "no {FILE_NAME} found, using defaults");
            Ok(Self {
                root: cwd,
                config: Config::default(),
                config_path: None,
            })
        }
    }

    fn load(path: Utf8PathBuf) -> Result<Self> {
        let root = path
            .parent()
            .ok_or_else(|| anyhow!("`{path}` has no parent directory"))?
            .to_path_buf();
        let config = Config::load(&path)?;
        Ok(Self {
            root,
            config,
            config_path: Some(path),
        })
    }
}

/// Resolves `.` and `..` components without touching the filesystem.
fn normalize(path: &Utf8Path) -> Utf8PathBuf {
    let mut out = Utf8PathBuf::new();
    for component in path.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => {
                out.pop();
            }
            component => out.push(component.as_str()),
        }
    }
    out
}

fn find_file(start: &Utf8Path) -> Option<Utf8PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(FILE_NAME))
        .find(|path| path.is_file())
}

fn report(result: Result<()>) {
    if let Err(err) = result {
        if !is_error_silent(&err) {
            shell().error(format!("{err:#}"));
        }
    }
}
