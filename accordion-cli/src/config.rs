use std::{collections::BTreeSet, fs};

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};

use crate::shell;

pub const FILE_NAME: &str = "accordion.toml";

#[derive(Clone, Deserialize, Debug)]
#[serde(default)]
pub struct Config {
    pub build: Build,
    /// Copy tasks by name. A config that lists assets replaces the default set entirely.
    pub assets: IndexMap<String, Asset>,
}

#[derive(Clone, Deserialize, Debug)]
#[serde(default, rename_all = "kebab-case")]
pub struct Build {
    pub out_dir: Utf8PathBuf,
}

#[derive(Clone, PartialEq, Eq, Deserialize, Debug)]
#[serde(rename_all = "kebab-case")]
pub struct Asset {
    /// Globs relative to the project root.
    #[serde(deserialize_with = "one_or_many")]
    pub input: Vec<String>,
    /// Directory relative to the build output directory.
    #[serde(default)]
    pub output: Utf8PathBuf,
    /// Globs that trigger a rerun in watch mode, `input` when empty.
    #[serde(default, deserialize_with = "one_or_many")]
    pub watch: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        let assets = [
            ("fonts", "src/assets/fonts/**/*.{ttf,eot,svg,woff,woff2}", "fonts"),
            ("favicons", "src/favicons/*.{ico,png,svg}", "favicons"),
            ("img", "src/img/**/*.{jpg,png,jpeg,webp,svg}", "img"),
            ("video", "src/video/**/*.{mp4,avi,mov}", "video"),
            ("icons", "src/components/**/*.svg", "icons"),
            ("static", "src/static/**/*.*", ""),
        ]
        .into_iter()
        .map(|(name, input, output)| {
            let asset = Asset {
                input: vec![input.to_string()],
                output: output.into(),
                watch: vec![],
            };
            (name.to_string(), asset)
        })
        .collect();

        Self {
            build: Build::default(),
            assets,
        }
    }
}

impl Default for Build {
    fn default() -> Self {
        Self {
            out_dir: "build".into(),
        }
    }
}

impl Asset {
    pub fn watch_globs(&self) -> &[String] {
        if self.watch.is_empty() {
            &self.input
        } else {
            &self.watch
        }
    }
}

impl Config {
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("`{path}` is not a valid config file"))?;

        let mut unused = BTreeSet::new();
        let config = Self::parse(&contents, |key| {
            unused.insert(key);
        })
        .with_context(|| format!("failed to parse `{path}`"))?;

        for key in unused {
            shell().warn(format!("{path}: unused config key: {key}"));
        }
        Ok(config)
    }

    fn parse<F>(contents: &str, mut unused: F) -> Result<Self>
    where
        F: FnMut(String),
    {
        let config = serde_ignored::deserialize(toml::Deserializer::new(contents), |path| {
            unused(path.to_string());
        })?;
        Ok(config)
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}
