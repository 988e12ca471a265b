use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use hndigest::build::{self, BuildOptions, InputFormat, OutputFormat};
use hndigest::config::{normalize_languages, Config};
use hndigest::convert::{self, ConvertFormat, ConvertOptions};
use hndigest::translate::{self, JsonProvider, Provider};
use hndigest::util::expand;
use hndigest::validate::{RecordValidator, Validator};
use hndigest::write::write_file;

#[derive(Parser)]
#[command(name = "hndigest", version, about = "Convert, build, validate, and translate HN digests")]
struct Cli {
    /// Only log warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Log more detail; repeat for even more.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Log what would be written without writing anything.
    #[arg(short = 'n', long, global = true)]
    dry_run: bool,

    /// Use this project file instead of searching for `hndigest.yaml`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert digests to outline documents or JSON, beside the inputs.
    Convert {
        /// Files, directories, or glob patterns.
        #[arg(required = true)]
        files: Vec<String>,

        #[arg(long, value_enum, default_value_t)]
        to: ConvertFormat,

        /// Output path (single input only).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Delete each source after a successful conversion.
        #[arg(long)]
        delete: bool,
    },

    /// Render digests to a page, an outline, JSON, or a plain index.
    Build {
        /// Files, directories, or glob patterns.
        #[arg(required = true)]
        files: Vec<String>,

        /// Output path; stdout if omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value_t)]
        format: OutputFormat,

        /// Only include digests from the last N days (0 for all).
        #[arg(short, long)]
        days: Option<u32>,

        /// Write older HTML digests to this page.
        #[arg(short, long)]
        archive: Option<PathBuf>,

        /// Order stories by points instead of source order.
        #[arg(long)]
        by_points: bool,

        /// Page shell template.
        #[arg(long)]
        template: Option<PathBuf>,
    },

    /// Validate digests against the record schema.
    Validate {
        /// Files, directories, or glob patterns.
        #[arg(required = true)]
        files: Vec<String>,

        /// Treat warnings as errors.
        #[arg(long)]
        strict: bool,
    },

    /// Report missing translations, or merge new ones from stdin.
    Translate {
        file: PathBuf,

        /// Report missing translations (the default).
        #[arg(long, conflicts_with_all = ["prompt", "apply"])]
        check: bool,

        /// Print the report as JSON.
        #[arg(long, conflicts_with_all = ["prompt", "apply"])]
        json: bool,

        /// Print a translation request for the missing fields.
        #[arg(long, conflicts_with = "apply")]
        prompt: bool,

        /// Merge a `{"translations": [...]}` payload read from stdin. JSON
        /// files keep every key outside the stories' `i18n` objects; outline
        /// files are rewritten.
        #[arg(long)]
        apply: bool,

        /// Comma-separated language codes.
        #[arg(long, value_delimiter = ',')]
        lang: Vec<String>,
    },
}

/// Counts for a batch command's closing log line.
#[derive(Default)]
struct Summary {
    processed: usize,
    skipped: usize,
    failed: usize,
}

impl Summary {
    fn log(&self, command: &str) {
        info!(
            "{}: {} processed, {} skipped, {} failed",
            command, self.processed, self.skipped, self.failed
        );
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);
    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(quiet: bool, verbose: u8) {
    let level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        _ => "trace",
    };
    // RUST_LOG wins over the flags.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_project_file(path),
        None => Config::discover(&std::env::current_dir().context("Getting current directory")?),
    }
}

/// Runs a command; `Ok(false)` means it ran but some item failed.
fn run(cli: Cli) -> Result<bool> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Convert {
            files,
            to,
            output,
            delete,
        } => run_convert(
            &files,
            ConvertOptions {
                to,
                output,
                delete,
                dry_run: cli.dry_run,
            },
        ),
        Command::Build {
            files,
            output,
            format,
            days,
            archive,
            by_points,
            template,
        } => run_build(
            &files,
            &BuildOptions {
                format,
                output,
                archive,
                days: days.unwrap_or(config.days),
                by_points,
                template: template.or(config.template),
                today: chrono::Utc::now().date_naive(),
                dry_run: cli.dry_run,
            },
        ),
        Command::Validate { files, strict } => run_validate(&files, strict || config.strict),
        Command::Translate {
            file,
            check,
            json,
            prompt,
            apply,
            lang,
        } => {
            let langs = match lang.is_empty() {
                true => config.languages,
                false => normalize_languages(&lang),
            };
            match (apply, prompt) {
                (true, _) => run_apply(&file, &langs, cli.dry_run),
                (false, true) => run_check(&file, &langs, Report::Prompt),
                (false, false) if json => run_check(&file, &langs, Report::Json),
                (false, false) => {
                    if !check {
                        debug!("no mode given, checking");
                    }
                    run_check(&file, &langs, Report::Text)
                }
            }
        }
    }
}

fn inputs(files: &[String]) -> Result<Vec<PathBuf>> {
    let paths = expand(files, InputFormat::is_supported);
    match paths.is_empty() {
        true => Err(anyhow!("No input files match {:?}", files)),
        false => Ok(paths),
    }
}

fn run_convert(files: &[String], options: ConvertOptions) -> Result<bool> {
    let paths = inputs(files)?;
    if options.output.is_some() && paths.len() > 1 {
        return Err(anyhow!("`--output` needs exactly one input, got {}", paths.len()));
    }

    let mut summary = Summary::default();
    for path in &paths {
        match convert::convert_file(path, &options) {
            Ok(_) => summary.processed += 1,
            Err(convert::Error::Load(
                e @ (build::Error::MissingDate(_)
                | build::Error::UnsupportedFormat(_)
                | build::Error::Read { .. }
                | build::Error::Parse { .. }),
            )) => {
                warn!("skipping: {}", e);
                summary.skipped += 1;
            }
            Err(e) => {
                error!("{}", e);
                summary.failed += 1;
            }
        }
    }
    summary.log("convert");
    Ok(summary.skipped == 0 && summary.failed == 0)
}

fn run_build(files: &[String], options: &BuildOptions) -> Result<bool> {
    let paths = inputs(files)?;
    let outputs = match build::build(&paths, options) {
        Ok(outputs) => outputs,
        Err(build::Error::NoInput) => {
            error!("no valid digests among {} input files", paths.len());
            return Ok(false);
        }
        Err(e) => return Err(e.into()),
    };

    let mut stdout = io::stdout().lock();
    for output in outputs.iter().filter(|o| o.path.is_none()) {
        stdout
            .write_all(output.contents.as_bytes())
            .context("Writing to stdout")?;
    }
    Ok(true)
}

fn run_validate(files: &[String], strict: bool) -> Result<bool> {
    let paths = inputs(files)?;
    let validator = RecordValidator::new()?;

    let mut summary = Summary::default();
    for path in &paths {
        let document = match build::read_document(path) {
            Ok(document) => document,
            Err(e) => {
                error!("FAIL: {}", e);
                summary.failed += 1;
                continue;
            }
        };
        let report = validator.validate(&document);
        for warning in &report.warnings {
            warn!("{}: {}", path.display(), warning);
        }
        match report.passed(strict) {
            true => {
                println!("OK: {}", path.display());
                summary.processed += 1;
            }
            false => {
                error!("FAIL: {}", path.display());
                for failure in report.failures(strict) {
                    error!("  {}", failure);
                }
                summary.failed += 1;
            }
        }
    }
    summary.log("validate");
    Ok(summary.failed == 0)
}

#[derive(Clone, Copy)]
enum Report {
    Text,
    Json,
    Prompt,
}

fn run_check(path: &Path, langs: &[String], kind: Report) -> Result<bool> {
    let (_, digest) = build::read(path)?;
    let report = translate::check(&digest, langs);
    match kind {
        Report::Text => print!("{}", report),
        Report::Json => println!("{}", report.to_json()?),
        Report::Prompt => print!("{}", report.prompt()),
    }
    Ok(true)
}

fn run_apply(path: &Path, langs: &[String], dry_run: bool) -> Result<bool> {
    let (format, mut digest) = build::read(path)?;
    let format = ConvertFormat::from_input(format).ok_or_else(|| {
        anyhow!(
            "`{}` is a markdown digest, which is read-only; convert it first",
            path.display()
        )
    })?;

    // A bad payload must leave the file untouched, so read it all first.
    let report = translate::check(&digest, langs);
    let payload = JsonProvider::new(io::stdin().lock())
        .translate(&report)
        .with_context(|| format!("Applying translations to `{}`", path.display()))?;

    let updated = translate::apply(&mut digest, &payload);
    let contents = match format {
        ConvertFormat::Json => {
            let input = fs::read_to_string(path)
                .with_context(|| format!("Reading `{}`", path.display()))?;
            let mut document: serde_json::Value = serde_json::from_str(&input)
                .with_context(|| format!("Parsing `{}`", path.display()))?;
            translate::patch_document(&mut document, &digest)?;
            let mut json = serde_json::to_string_pretty(&document)?;
            json.push('\n');
            json
        }
        ConvertFormat::Org => convert::render(&digest, format)?,
    };
    match dry_run {
        true => info!("dry run: would update {} stories in {}", updated, path.display()),
        false => {
            write_file(path, &contents)?;
            info!("updated {} stories in {}", updated, path.display());
        }
    }
    Ok(true)
}
