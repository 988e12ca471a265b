//! Exports the [`build`] function which stitches together the high-level
//! steps of publishing digests: loading them from any supported input format
//! ([`load`]), ordering and filtering them by date, rendering the requested
//! output format, and writing the results ([`crate::write`]).
//!
//! [`read`] and [`load`] are also the loading path for every other command.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate};
use tracing::{debug, info, warn};

use crate::htmlrenderer::{Error as RenderError, PageLink, PageTemplate};
use crate::markdown::Error as MarkdownError;
use crate::model::Digest;
use crate::write::{write_file, Error as WriteError};
use crate::{llms, markdown, parser, serializer};

/// A digest source format, chosen by file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputFormat {
    /// `.md`: the upstream markdown digest. Read-only.
    Markdown,

    /// `.org`: the outline document.
    Outline,

    /// `.json`: the record interchange shape.
    Json,
}

impl InputFormat {
    pub fn from_path(path: &Path) -> Option<InputFormat> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "md" | "markdown" => Some(InputFormat::Markdown),
            "org" => Some(InputFormat::Outline),
            "json" => Some(InputFormat::Json),
            _ => None,
        }
    }

    /// True if `path` has a supported extension.
    pub fn is_supported(path: &Path) -> bool {
        InputFormat::from_path(path).is_some()
    }
}

/// What `build` renders.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// A web page, optionally split into a recent page and an archive.
    #[default]
    Html,

    /// The outline documents of the selected digests, concatenated.
    Org,

    /// The plain-text story index over every loaded digest.
    Llms,

    /// A JSON array of the selected digests.
    Json,
}

/// Parses `input` in the given format, without further checks.
pub fn parse(input: &str, format: InputFormat) -> std::result::Result<Digest, ParseError> {
    Ok(match format {
        InputFormat::Markdown => markdown::parse(input)?,
        InputFormat::Outline => parser::parse(input),
        InputFormat::Json => Digest::from_json(input)?,
    })
}

/// Returned by [`parse`] for documents that can't be parsed at all.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error(transparent)]
    Markdown(#[from] MarkdownError),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reads and parses a digest file of any supported format. The digest may
/// lack a date; see [`load`].
pub fn read(path: &Path) -> Result<(InputFormat, Digest)> {
    let format =
        InputFormat::from_path(path).ok_or_else(|| Error::UnsupportedFormat(path.to_owned()))?;
    let input = std::fs::read_to_string(path).map_err(|err| Error::Read {
        path: path.to_owned(),
        err,
    })?;
    let digest = parse(&input, format).map_err(|err| Error::Parse {
        path: path.to_owned(),
        err,
    })?;
    Ok((format, digest))
}

/// Reads a digest file, rejecting digests without a date.
pub fn load(path: &Path) -> Result<Digest> {
    let (_, digest) = read(path)?;
    match digest.date.is_empty() {
        true => Err(Error::MissingDate(path.to_owned())),
        false => Ok(digest),
    }
}

/// Reads a digest file as a JSON document in the interchange shape. JSON
/// files are taken verbatim; other formats are parsed and converted.
pub fn read_document(path: &Path) -> Result<serde_json::Value> {
    match InputFormat::from_path(path) {
        Some(InputFormat::Json) => {
            let input = std::fs::read_to_string(path).map_err(|err| Error::Read {
                path: path.to_owned(),
                err,
            })?;
            serde_json::from_str(&input).map_err(|err| Error::Parse {
                path: path.to_owned(),
                err: ParseError::Json(err),
            })
        }
        _ => {
            let (_, digest) = read(path)?;
            serde_json::to_value(&digest).map_err(Error::Serialize)
        }
    }
}

/// The digests [`load_all`] could read, and how many files it skipped.
#[derive(Debug, Default)]
pub struct Loaded {
    pub digests: Vec<Digest>,
    pub skipped: usize,
}

/// Loads every file in `paths`, skipping (with a warning) the ones that
/// can't be read, parsed, or dated.
pub fn load_all(paths: &[PathBuf]) -> Loaded {
    let mut loaded = Loaded::default();
    for path in paths {
        match load(path) {
            Ok(digest) => {
                debug!("loaded `{}` ({} stories)", path.display(), digest.stories.len());
                loaded.digests.push(digest);
            }
            Err(e) => {
                warn!("skipping: {}", e);
                loaded.skipped += 1;
            }
        }
    }
    loaded
}

/// Sorts digests newest first. Digests with equal dates keep their order.
pub fn sort_by_date(digests: &mut [Digest]) {
    digests.sort_by(|a, b| b.date.cmp(&a.date));
}

/// Sorts every digest's stories by points, highest first.
pub fn sort_stories_by_points(digests: &mut [Digest]) {
    for digest in digests {
        digest.stories.sort_by(|a, b| b.points.cmp(&a.points));
    }
}

/// Splits date-sorted (newest first) digests into those from the last
/// `days` days and the older ones. `days == 0` keeps everything recent.
pub fn split_recent(digests: &[Digest], days: u32, today: NaiveDate) -> (&[Digest], &[Digest]) {
    if days == 0 {
        return digests.split_at(digests.len());
    }
    let cutoff = (today - Duration::days(i64::from(days)))
        .format("%Y-%m-%d")
        .to_string();
    let split = digests.partition_point(|d| d.day() >= cutoff.as_str());
    digests.split_at(split)
}

/// Options for [`build`].
#[derive(Clone, Debug)]
pub struct BuildOptions {
    pub format: OutputFormat,

    /// Where the main output goes; `None` leaves it to the caller (usually
    /// stdout).
    pub output: Option<PathBuf>,

    /// Where HTML for digests older than the cutoff goes. Without it, older
    /// digests are left out.
    pub archive: Option<PathBuf>,

    /// Only digests from the last `days` days are rendered; `0` for all.
    pub days: u32,

    pub by_points: bool,

    /// The page shell; `None` selects the built-in one.
    pub template: Option<PathBuf>,

    /// The reference date for the `days` cutoff (UTC).
    pub today: NaiveDate,

    pub dry_run: bool,
}

/// One rendered output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rendered {
    /// The destination; `None` for output meant for stdout.
    pub path: Option<PathBuf>,
    pub contents: String,

    /// The number of digests the output covers.
    pub digests: usize,
}

/// Loads `paths`, renders them as `options` ask, and writes every output
/// that has a destination. All outputs are returned, written or not.
pub fn build(paths: &[PathBuf], options: &BuildOptions) -> Result<Vec<Rendered>> {
    let Loaded {
        mut digests,
        skipped,
    } = load_all(paths);
    if digests.is_empty() {
        return Err(Error::NoInput);
    }
    info!("build: {} processed, {} skipped, 0 failed", digests.len(), skipped);

    sort_by_date(&mut digests);
    if options.by_points {
        sort_stories_by_points(&mut digests);
    }

    let outputs = render(&digests, options)?;
    for output in &outputs {
        let Some(path) = &output.path else {
            continue;
        };
        match options.dry_run {
            true => info!("dry run: would write {} ({} digests)", path.display(), output.digests),
            false => {
                write_file(path, &output.contents)?;
                info!("wrote {} ({} digests)", path.display(), output.digests);
            }
        }
    }
    Ok(outputs)
}

/// Renders date-sorted digests in the requested format.
pub fn render(digests: &[Digest], options: &BuildOptions) -> Result<Vec<Rendered>> {
    let (recent, older) = split_recent(digests, options.days, options.today);
    let single = |contents: String, count: usize| {
        vec![Rendered {
            path: options.output.clone(),
            contents,
            digests: count,
        }]
    };

    Ok(match options.format {
        OutputFormat::Html => {
            let template = page_template(options.template.as_deref())?;
            match (&options.archive, older.is_empty()) {
                (Some(archive), false) => {
                    let recent_href = options
                        .output
                        .as_deref()
                        .and_then(file_name)
                        .unwrap_or("index.html");
                    let archive_href = file_name(archive).unwrap_or("archive.html");
                    vec![
                        Rendered {
                            path: options.output.clone(),
                            contents: template
                                .render_page(recent, Some(&PageLink::to_archive(archive_href)))?,
                            digests: recent.len(),
                        },
                        Rendered {
                            path: Some(archive.clone()),
                            contents: template
                                .render_page(older, Some(&PageLink::to_recent(recent_href)))?,
                            digests: older.len(),
                        },
                    ]
                }
                _ => single(template.render_page(recent, None)?, recent.len()),
            }
        }
        OutputFormat::Org => single(serializer::serialize_all(recent), recent.len()),
        OutputFormat::Llms => {
            let mut index = String::new();
            llms::write_index(&mut index, digests).map_err(RenderError::from)?;
            single(index, digests.len())
        }
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(recent).map_err(Error::Serialize)?;
            json.push('\n');
            single(json, recent.len())
        }
    })
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name()?.to_str()
}

fn page_template(path: Option<&Path>) -> Result<PageTemplate> {
    match path {
        None => Ok(PageTemplate::builtin()?),
        Some(path) => {
            let source = std::fs::read_to_string(path).map_err(|err| Error::OpenTemplateFile {
                path: path.to_owned(),
                err,
            })?;
            Ok(PageTemplate::parse(&source)?)
        }
    }
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for loading and building digests.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned for files whose extension isn't a known digest format.
    #[error("`{}` is not a markdown, outline, or JSON digest", .0.display())]
    UnsupportedFormat(PathBuf),

    /// Returned for files that can't be read, including files that aren't
    /// valid UTF-8.
    #[error("reading `{}`: {}", .path.display(), .err)]
    Read {
        path: PathBuf,
        #[source]
        err: io::Error,
    },

    /// Returned for files that can't be parsed at all.
    #[error("parsing `{}`: {}", .path.display(), .err)]
    Parse {
        path: PathBuf,
        #[source]
        err: ParseError,
    },

    /// Returned for digests without a date, which can be neither sorted nor
    /// filtered.
    #[error("`{}` has no date", .0.display())]
    MissingDate(PathBuf),

    /// Returned when none of the inputs yielded a digest.
    #[error("no valid digests found")]
    NoInput,

    /// Returned for I/O problems while opening template files.
    #[error("opening template file `{}`: {}", .path.display(), .err)]
    OpenTemplateFile {
        path: PathBuf,
        #[source]
        err: io::Error,
    },

    /// Returned for errors rendering HTML pages.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Returned for errors serializing JSON output.
    #[error("serializing JSON: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Returned for errors writing output files.
    #[error(transparent)]
    Write(#[from] WriteError),
}
