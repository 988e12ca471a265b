//! File-system helpers shared by the batch commands.

use anyhow::{anyhow, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::warn;

pub fn open(path: &Path, kind: &str) -> Result<File> {
    match File::open(path) {
        Err(e) => Err(anyhow!("Opening {} file `{}`: {}", kind, path.display(), e)),
        Ok(file) => Ok(file),
    }
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Expands command-line file arguments into paths. Glob patterns are matched
/// against the file system, directories are walked recursively for files
/// that `accept` admits, and anything else is passed through as-is so a
/// missing file is reported by whoever tries to read it. Each path appears
/// once, in first-seen order.
pub fn expand<F>(patterns: &[String], accept: F) -> Vec<PathBuf>
where
    F: Fn(&Path) -> bool,
{
    let mut paths: Vec<PathBuf> = Vec::new();
    let mut push = |path: PathBuf| {
        if !paths.contains(&path) {
            paths.push(path);
        }
    };

    for pattern in patterns {
        let path = Path::new(pattern);
        if path.is_dir() {
            let mut found: Vec<PathBuf> = walkdir::WalkDir::new(path)
                .into_iter()
                .filter_map(|entry| match entry {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        warn!("walking `{}`: {}", pattern, e);
                        None
                    }
                })
                .filter(|entry| entry.file_type().is_file() && accept(entry.path()))
                .map(walkdir::DirEntry::into_path)
                .collect();
            found.sort();
            found.into_iter().for_each(&mut push);
        } else if is_glob(pattern) {
            match glob::glob(pattern) {
                Ok(matches) => {
                    for entry in matches {
                        match entry {
                            Ok(path) if path.is_file() => push(path),
                            Ok(_) => {}
                            Err(e) => warn!("matching `{}`: {}", pattern, e),
                        }
                    }
                }
                Err(e) => {
                    warn!("invalid pattern `{}`: {}", pattern, e);
                    push(path.to_owned());
                }
            }
        } else {
            push(path.to_owned());
        }
    }
    paths
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    fn is_json(path: &Path) -> bool {
        path.extension().map_or(false, |e| e == "json")
    }

    #[test]
    fn test_expand() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;
        let nested = dir.path().join("2025").join("12");
        fs::create_dir_all(&nested)?;
        for name in ["b.json", "a.json", "notes.txt"] {
            fs::write(nested.join(name), "{}")?;
        }
        fs::write(dir.path().join("top.json"), "{}")?;

        let walked = expand(&[dir.path().display().to_string()], is_json);
        assert_eq!(
            walked,
            vec![
                nested.join("a.json"),
                nested.join("b.json"),
                dir.path().join("top.json"),
            ]
        );

        let pattern = format!("{}/*.json", nested.display());
        let globbed = expand(&[pattern.clone(), pattern], is_json);
        assert_eq!(globbed, vec![nested.join("a.json"), nested.join("b.json")]);

        let missing = dir.path().join("missing.json");
        assert_eq!(
            expand(&[missing.display().to_string()], is_json),
            vec![missing]
        );
        Ok(())
    }
}
