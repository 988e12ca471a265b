//! Project configuration, read from an optional `hndigest.yaml` found in the
//! working directory or any of its parents. Every key is optional:
//!
//! ```yaml
//! languages: [zh, ja, ko, es, de]  # translation languages to check
//! template: theme/index.html       # page shell, relative to this file
//! strict: false                    # treat validation warnings as errors
//! days: 7                          # default build cutoff; 0 keeps everything
//! ```

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The name of the project file.
pub const PROJECT_FILE: &str = "hndigest.yaml";

/// Languages checked when neither the project file nor the command line
/// names any.
pub const DEFAULT_LANGUAGES: [&str; 5] = ["zh", "ja", "ko", "es", "de"];

#[derive(Deserialize)]
#[serde(default, deny_unknown_fields)]
struct Project {
    languages: Vec<String>,
    template: Option<PathBuf>,
    strict: bool,
    days: u32,
}

impl Default for Project {
    fn default() -> Self {
        Project {
            languages: DEFAULT_LANGUAGES.iter().map(|l| l.to_string()).collect(),
            template: None,
            strict: false,
            days: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Lowercase language codes, in the order given.
    pub languages: Vec<String>,

    /// The page shell; `None` selects the built-in one.
    pub template: Option<PathBuf>,

    pub strict: bool,
    pub days: u32,

    /// The project file this configuration was read from, if any.
    pub source: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config::from_project(Project::default(), None, Path::new("."))
    }
}

impl Config {
    /// Looks for the project file in `dir` and then each of its ancestors,
    /// falling back to the defaults if there is none.
    pub fn discover(dir: &Path) -> Result<Config> {
        let mut dir = Some(dir);
        while let Some(current) = dir {
            let path = current.join(PROJECT_FILE);
            if path.is_file() {
                return Config::from_project_file(&path);
            }
            dir = current.parent();
        }
        debug!("no `{}` found, using defaults", PROJECT_FILE);
        Ok(Config::default())
    }

    pub fn from_project_file(path: &Path) -> Result<Config> {
        use crate::util::open;
        let project: Project = serde_yaml::from_reader(open(path, "project")?)
            .map_err(|e| anyhow!("Loading configuration `{}`: {}", path.display(), e))?;
        let root = match path.parent() {
            Some(root) => root,
            None => {
                return Err(anyhow!(
                    "Can't get parent directory for provided project file path '{:?}'",
                    path
                ))
            }
        };
        debug!("loaded configuration from `{}`", path.display());
        Ok(Config::from_project(project, Some(path.to_owned()), root))
    }

    fn from_project(project: Project, source: Option<PathBuf>, root: &Path) -> Config {
        Config {
            languages: normalize_languages(&project.languages),
            template: project.template.map(|relpath| root.join(relpath)),
            strict: project.strict,
            days: project.days,
            source,
        }
    }
}

/// Lowercases and dedupes language codes, dropping empty ones.
pub fn normalize_languages(langs: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for lang in langs.iter().map(|l| l.trim().to_lowercase()) {
        if !lang.is_empty() && !out.contains(&lang) {
            out.push(lang);
        }
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.languages, vec!["zh", "ja", "ko", "es", "de"]);
        assert_eq!(config.template, None);
        assert!(!config.strict);
        assert_eq!(config.days, 0);
    }

    #[test]
    fn test_discover_walks_parents() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(
            dir.path().join(PROJECT_FILE),
            "languages: [JA, es, ja]\ntemplate: theme/page.html\nstrict: true\n",
        )?;
        let nested = dir.path().join("digests").join("2025");
        fs::create_dir_all(&nested)?;

        let config = Config::discover(&nested)?;
        assert_eq!(config.languages, vec!["ja", "es"]);
        assert_eq!(config.template, Some(dir.path().join("theme/page.html")));
        assert!(config.strict);
        assert_eq!(config.days, 0);
        assert_eq!(config.source, Some(dir.path().join(PROJECT_FILE)));
        Ok(())
    }

    #[test]
    fn test_unknown_key_is_an_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(PROJECT_FILE);
        fs::write(&path, "langauges: [ja]\n")?;
        assert!(Config::from_project_file(&path).is_err());
        Ok(())
    }
}
