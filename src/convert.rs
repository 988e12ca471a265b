//! Converts digest files between formats. Any readable input (markdown,
//! outline, or JSON) can become an outline document or interchange JSON; the
//! output lands beside the input with the new extension unless an explicit
//! path is given.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::build::{self, InputFormat};
use crate::model::Digest;
use crate::serializer;
use crate::write::{remove_file, write_file, Error as WriteError};

/// A format [`convert_file`] can write.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ConvertFormat {
    #[default]
    Org,
    Json,
}

impl ConvertFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ConvertFormat::Org => "org",
            ConvertFormat::Json => "json",
        }
    }

    /// The writable format matching an input format. Markdown has none.
    pub fn from_input(format: InputFormat) -> Option<ConvertFormat> {
        match format {
            InputFormat::Markdown => None,
            InputFormat::Outline => Some(ConvertFormat::Org),
            InputFormat::Json => Some(ConvertFormat::Json),
        }
    }
}

/// Renders a digest in the given format.
pub fn render(digest: &Digest, format: ConvertFormat) -> Result<String> {
    match format {
        ConvertFormat::Org => Ok(serializer::serialize(digest)),
        ConvertFormat::Json => {
            let mut json = digest.to_json().map_err(Error::Json)?;
            json.push('\n');
            Ok(json)
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConvertOptions {
    pub to: ConvertFormat,

    /// Overrides the output path; only meaningful for a single input.
    pub output: Option<PathBuf>,

    /// Remove the input once the output is written.
    pub delete: bool,

    pub dry_run: bool,
}

/// Where the conversion of `path` is written by default.
pub fn target_path(path: &Path, format: ConvertFormat) -> PathBuf {
    path.with_extension(format.extension())
}

/// Converts one file and returns the path of the output (which, in a dry
/// run, is only where the output would have gone).
pub fn convert_file(path: &Path, options: &ConvertOptions) -> Result<PathBuf> {
    let digest = build::load(path)?;
    let target = options
        .output
        .clone()
        .unwrap_or_else(|| target_path(path, options.to));
    if target == path {
        return Err(Error::SameFile(target));
    }
    let contents = render(&digest, options.to)?;

    if options.dry_run {
        info!(
            "dry run: would convert {} -> {}{}",
            path.display(),
            target.display(),
            if options.delete { " and delete the source" } else { "" }
        );
        return Ok(target);
    }

    write_file(&target, &contents)?;
    info!("converted: {} -> {}", path.display(), target.display());
    if options.delete {
        remove_file(path)?;
        info!("deleted: {}", path.display());
    }
    Ok(target)
}

type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the input can't be loaded.
    #[error(transparent)]
    Load(#[from] build::Error),

    /// Returned when the output would overwrite the input.
    #[error("`{}` is already in the requested format", .0.display())]
    SameFile(PathBuf),

    #[error("serializing JSON: {0}")]
    Json(#[source] serde_json::Error),

    #[error(transparent)]
    Write(#[from] WriteError),
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parser;
    use std::fs;

    const MARKDOWN: &str = "\
# HN Digest 2025-12-15 11:00 UTC

> A calm day.

---

### [Foo](https://example.com) • 10pts 2c
[HN discussion](https://news.ycombinator.com/item?id=123)
TLDR: Short.
";

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_markdown_to_outline() -> TestResult {
        let dir = tempfile::tempdir()?;
        let source = dir.path().join("15-1100.md");
        fs::write(&source, MARKDOWN)?;

        let target = convert_file(&source, &ConvertOptions::default())?;
        assert_eq!(target, dir.path().join("15-1100.org"));
        assert!(source.exists());

        let digest = parser::parse(&fs::read_to_string(&target)?);
        assert_eq!(digest.date, "2025-12-15T11:00:00Z");
        assert_eq!(digest.stories[0].id, 123);
        assert_eq!(digest.stories[0].tldr, "Short.");
        Ok(())
    }

    #[test]
    fn test_delete_and_dry_run() -> TestResult {
        let dir = tempfile::tempdir()?;
        let source = dir.path().join("d.org");
        fs::write(&source, "#+DATE: 2025-12-15T11:00:00Z\n* Stories\n** Foo\n")?;

        let dry = ConvertOptions {
            to: ConvertFormat::Json,
            delete: true,
            dry_run: true,
            ..ConvertOptions::default()
        };
        let target = convert_file(&source, &dry)?;
        assert!(!target.exists());
        assert!(source.exists());

        let real = ConvertOptions {
            dry_run: false,
            ..dry
        };
        let target = convert_file(&source, &real)?;
        assert!(!source.exists());
        let digest = Digest::from_json(&fs::read_to_string(&target)?)?;
        assert_eq!(digest.stories[0].title, "Foo");
        Ok(())
    }

    #[test]
    fn test_refuses_same_file() -> TestResult {
        let dir = tempfile::tempdir()?;
        let source = dir.path().join("d.org");
        fs::write(&source, "#+DATE: 2025-12-15T11:00:00Z\n")?;
        let result = convert_file(&source, &ConvertOptions::default());
        assert!(matches!(result, Err(Error::SameFile(_))));
        Ok(())
    }

    #[test]
    fn test_undated_input_fails() -> TestResult {
        let dir = tempfile::tempdir()?;
        let source = dir.path().join("d.org");
        fs::write(&source, "* Stories\n** Foo\n")?;
        let result = convert_file(&source, &ConvertOptions::default());
        assert!(matches!(result, Err(Error::Load(build::Error::MissingDate(_)))));
        assert!(!dir.path().join("d.json").exists());
        Ok(())
    }
}
