use std::{fmt, io};

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// A file glob such as `src/assets/fonts/**/*.{ttf,woff2}`.
///
/// The leading components without wildcards form the base directory. Matching files are
/// reported with their path relative to that base, which is where they land inside an
/// output directory. `*` and `?` stay within one path component, `**` spans any number of
/// components, `{a,b}` expands to alternatives. Wildcards never match a leading `.`.
#[derive(Clone, Debug)]
pub struct Glob {
    source: String,
    base: Utf8PathBuf,
    alternatives: Vec<Vec<Segment>>,
}

#[derive(Clone, PartialEq, Eq, Debug)]
enum Segment {
    AnyDepth,
    Name(Vec<char>),
}

#[derive(Clone, PartialEq, Eq, Error, Debug)]
pub enum GlobError {
    #[error("empty glob")]
    Empty,
    #[error("unclosed `{{` in glob `{0}`")]
    UnclosedBrace(String),
}

/// A file found by [`Glob::walk`].
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Match {
    pub path: Utf8PathBuf,
    pub relative: Utf8PathBuf,
}

impl Glob {
    pub fn new(pattern: &str) -> Result<Self, GlobError> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(GlobError::Empty);
        }

        let components: Vec<&str> = pattern.split('/').filter(|c| !c.is_empty()).collect();
        let literal = components
            .iter()
            .take_while(|c| !c.contains(['*', '?', '{']))
            .count();

        // a plain file path is matched against its own parent directory
        let split = if literal == components.len() {
            literal.saturating_sub(1)
        } else {
            literal
        };

        let mut base: Utf8PathBuf = components[..split].iter().collect();
        if pattern.starts_with('/') {
            base = Utf8Path::new("/").join(base);
        }

        let rest = components[split..].join("/");
        let alternatives = expand_braces(&rest)
            .ok_or_else(|| GlobError::UnclosedBrace(pattern.to_string()))?
            .iter()
            .map(|alternative| parse_segments(alternative))
            .collect();

        Ok(Self {
            source: pattern.to_string(),
            base,
            alternatives,
        })
    }

    pub fn base(&self) -> &Utf8Path {
        &self.base
    }

    /// Checks a path relative to the base directory.
    pub fn matches(&self, relative: &Utf8Path) -> bool {
        let components: Vec<&str> = relative.components().map(|c| c.as_str()).collect();
        self.alternatives
            .iter()
            .any(|segments| match_segments(segments, &components))
    }

    /// Checks a path resolved against `root`.
    pub fn matches_path(&self, root: &Utf8Path, path: &Utf8Path) -> bool {
        path.strip_prefix(root.join(&self.base))
            .is_ok_and(|relative| self.matches(relative))
    }

    /// Lists matching files under `root`, in directory walk order.
    ///
    /// Unreadable entries are reported as errors without ending the walk.
    pub fn walk(&self, root: &Utf8Path) -> impl Iterator<Item = anyhow::Result<Match>> + '_ {
        let base = root.join(&self.base);
        WalkDir::new(&base)
            .sort_by_file_name()
            .into_iter()
            .filter_map(move |entry| {
                let entry = match entry {
                    Ok(entry) => entry,
                    // a missing base directory simply has no matches
                    Err(err) if err.depth() == 0 && is_not_found(&err) => return None,
                    Err(err) => return Some(Err(err.into())),
                };
                if !entry.file_type().is_file() {
                    return None;
                }

                let path = match Utf8PathBuf::from_path_buf(entry.into_path()) {
                    Ok(path) => path,
                    Err(path) => {
                        return Some(Err(anyhow::anyhow!(
                            "`{}` is not valid UTF-8",
                            path.display()
                        )))
                    }
                };
                let relative = path.strip_prefix(&base).ok()?.to_path_buf();

                self.matches(&relative)
                    .then_some(Ok(Match { path, relative }))
            })
    }
}

impl fmt::Display for Glob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn is_not_found(err: &walkdir::Error) -> bool {
    err.io_error()
        .is_some_and(|err| err.kind() == io::ErrorKind::NotFound)
}

/// Expands the first `{a,b}` group and recurses, `None` on unbalanced braces.
fn expand_braces(pattern: &str) -> Option<Vec<String>> {
    let Some(open) = pattern.find('{') else {
        return Some(vec![pattern.to_string()]);
    };

    let mut depth = 0;
    let mut close = None;
    let mut splits = vec![];
    for (i, c) in pattern[open..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(open + i);
                    break;
                }
            }
            ',' if depth == 1 => splits.push(open + i),
            _ => {}
        }
    }
    let close = close?;

    let (prefix, suffix) = (&pattern[..open], &pattern[close + 1..]);
    let mut bounds = vec![open];
    bounds.extend(splits);
    bounds.push(close);

    let mut out = vec![];
    for window in bounds.windows(2) {
        let choice = &pattern[window[0] + 1..window[1]];
        out.extend(expand_braces(&format!("{prefix}{choice}{suffix}"))?);
    }
    Some(out)
}

fn parse_segments(pattern: &str) -> Vec<Segment> {
    pattern
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| match segment {
            "**" => Segment::AnyDepth,
            name => Segment::Name(name.chars().collect()),
        })
        .collect()
}

fn match_segments(segments: &[Segment], path: &[&str]) -> bool {
    match segments.split_first() {
        None => path.is_empty(),
        Some((Segment::AnyDepth, rest)) => {
            for skip in 0..=path.len() {
                if match_segments(rest, &path[skip..]) {
                    return true;
                }
                if path.get(skip).is_some_and(|name| name.starts_with('.')) {
                    break;
                }
            }
            false
        }
        Some((Segment::Name(pattern), rest)) => path.split_first().is_some_and(|(name, tail)| {
            match_name(pattern, name) && match_segments(rest, tail)
        }),
    }
}

fn match_name(pattern: &[char], name: &str) -> bool {
    let name: Vec<char> = name.chars().collect();
    if name.first() == Some(&'.') && pattern.first() != Some(&'.') {
        return false;
    }
    wildcard(pattern, &name)
}

fn wildcard(pattern: &[char], name: &[char]) -> bool {
    match (pattern.split_first(), name.split_first()) {
        (None, _) => name.is_empty(),
        (Some((&'*', rest)), _) => (0..=name.len()).any(|skip| wildcard(rest, &name[skip..])),
        (Some((&'?', rest)), Some((_, tail))) => wildcard(rest, tail),
        (Some((p, rest)), Some((c, tail))) => p == c && wildcard(rest, tail),
        (Some(_), None) => false,
    }
}
