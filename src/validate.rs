//! Validates digests in their JSON interchange shape. Field-level errors come
//! from a Draft 7 JSON Schema bundled with the crate; a [`Validator`] adds
//! semantic checks on top and returns a [`Report`]. Warnings only fail a
//! digest in strict mode. Outline and markdown input is validated by
//! converting it to the interchange shape first.

use std::{collections::HashSet, fmt};

use jsonschema::{Draft, JSONSchema};
use serde_json::{Map, Value};

use crate::tag;

/// The bundled schema for the interchange shape.
pub const SCHEMA: &str = include_str!("../schema/digest.schema.json");

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the bundled schema isn't JSON.
    #[error("reading digest schema: {0}")]
    Json(#[from] serde_json::Error),

    /// Returned when the bundled schema isn't a valid Draft 7 schema.
    #[error("compiling digest schema: {0}")]
    Compile(String),
}
/// One finding, addressed by a dotted path into the document
/// (`stories.0.id`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub path: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.path.is_empty() {
            true => write!(f, "(root): {}", self.message),
            false => write!(f, "{}: {}", self.path, self.message),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Report {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl Report {
    /// True if there are no errors, and in `strict` mode no warnings either.
    pub fn passed(&self, strict: bool) -> bool {
        self.errors.is_empty() && (!strict || self.warnings.is_empty())
    }

    /// The diagnostics that fail the digest in the given mode.
    pub fn failures(&self, strict: bool) -> impl Iterator<Item = &Diagnostic> {
        let warnings: &[Diagnostic] = match strict {
            true => &self.warnings[..],
            false => &[],
        };
        self.errors.iter().chain(warnings)
    }

    fn error(&mut self, path: &str, message: &str) {
        self.errors.push(Diagnostic {
            path: path.to_owned(),
            message: message.to_owned(),
        });
    }

    fn warning(&mut self, path: &str, message: String) {
        self.warnings.push(Diagnostic {
            path: path.to_owned(),
            message,
        });
    }
}

/// Checks a digest document.
pub trait Validator {
    fn validate(&self, document: &Value) -> Report;
}

/// The built-in digest validator: [`SCHEMA`] plus semantic checks.
pub struct RecordValidator {
    schema: JSONSchema,
}

impl RecordValidator {
    pub fn new() -> Result<RecordValidator, Error> {
        let schema: Value = serde_json::from_str(SCHEMA)?;
        let schema = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&schema)
            .map_err(|e| Error::Compile(e.to_string()))?;
        Ok(RecordValidator { schema })
    }
}

impl Validator for RecordValidator {
    fn validate(&self, document: &Value) -> Report {
        let mut report = Report::default();
        let document = document.get("digest").unwrap_or(document);
        if let Err(errors) = self.schema.validate(document) {
            for error in errors {
                let path = dotted(&error.instance_path.to_string());
                report.error(&path, &error.to_string());
            }
            report.errors.sort_by(|a, b| a.path.cmp(&b.path));
        }

        let stories = document.get("stories").and_then(Value::as_array);
        for (i, story) in stories.into_iter().flatten().enumerate() {
            if let Some(story) = story.as_object() {
                check_story(&mut report, &format!("stories.{}", i), story);
            }
        }
        check_duplicates(&mut report, stories.map_or(&[][..], Vec::as_slice));
        report
    }
}

/// Converts a JSON pointer (`/stories/0/id`) to a dotted path
/// (`stories.0.id`).
fn dotted(pointer: &str) -> String {
    pointer
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.replace("~1", "/").replace("~0", "~"))
        .collect::<Vec<_>>()
        .join(".")
}

fn check_story(report: &mut Report, path: &str, story: &Map<String, Value>) {
    let tags = story.get("tags").and_then(Value::as_array);
    for (i, tag) in tags.into_iter().flatten().enumerate() {
        if tag.as_str().map_or(false, |t| tag::is_reserved(&tag::normalize(t))) {
            report.error(
                &format!("{}.tags.{}", path, i),
                &format!("`{}` is reserved for translations", tag::RESERVED),
            );
        }
    }

    let comment_count = story.get("comments").and_then(Value::as_array).map_or(0, Vec::len);
    match story.get("i18n") {
        None | Some(Value::Null) => {
            report.warning(
                &format!("{}.i18n", path),
                String::from("missing; should be an empty object"),
            );
        }
        Some(i18n) => {
            for (lang, translation) in i18n.as_object().into_iter().flatten() {
                let have = translation
                    .get("comments")
                    .and_then(Value::as_array)
                    .map_or(0, Vec::len);
                if have > 0 && have != comment_count {
                    report.warning(
                        &format!("{}.i18n.{}.comments", path, lang),
                        format!("has {} comments, story has {}", have, comment_count),
                    );
                }
            }
        }
    }
}

fn check_duplicates(report: &mut Report, stories: &[Value]) {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for story in stories {
        let Some(id) = story.get("id").and_then(Value::as_u64).filter(|id| *id > 0) else {
            continue;
        };
        if !seen.insert(id) && reported.insert(id) {
            report.warning("stories", format!("duplicate story id {}", id));
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn fixture(document: Value) -> (Vec<String>, Vec<String>) {
        let report = validator().validate(&document);
        (
            report.errors.iter().map(Diagnostic::to_string).collect(),
            report.warnings.iter().map(Diagnostic::to_string).collect(),
        )
    }

    fn validator() -> RecordValidator {
        RecordValidator::new().expect("bundled schema compiles")
    }

    fn error_paths(document: Value) -> Vec<String> {
        validator()
            .validate(&document)
            .errors
            .into_iter()
            .map(|e| e.path)
            .collect()
    }

    #[test]
    fn test_valid_document() {
        let document = json!({
            "date": "2025-12-15T11:00:00Z",
            "vibe": "calm",
            "highlights": ["one"],
            "stories": [{
                "id": 1, "title": "T", "points": 3, "time": 1734260400,
                "tags": ["ai"],
                "comments": [{"by": "bob", "text": "nice", "id": 9}],
                "i18n": {"ja": {"tldr": "x", "comments": ["いいね"]}}
            }]
        });
        let report = validator().validate(&document);
        assert_eq!(report, Report::default());
        assert!(report.passed(true));
    }

    #[test]
    fn test_null_fields_are_accepted() {
        let (errors, _) = fixture(json!({
            "date": "d",
            "vibe": null,
            "stories": [{"id": null, "tldr": null, "i18n": {"ja": {"take": null}}}]
        }));
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_field_types() {
        let paths = error_paths(json!({
            "date": 20251215,
            "highlights": ["ok", 3],
            "stories": [{"id": -1, "title": 5, "points": "many", "i18n": {}}]
        }));
        assert_eq!(
            paths,
            vec![
                "date",
                "highlights.1",
                "stories.0.id",
                "stories.0.points",
                "stories.0.title",
            ]
        );
    }

    #[test]
    fn test_nested_types() {
        let paths = error_paths(json!({
            "date": "d",
            "stories": [{
                "comments": [{"by": 1, "text": "t"}],
                "i18n": {"ja": {"comments": [true]}, "es": "hola"}
            }]
        }));
        assert_eq!(
            paths,
            vec!["stories.0.comments.0.by", "stories.0.i18n.es", "stories.0.i18n.ja.comments.0"]
        );
    }

    #[test]
    fn test_required_fields() {
        let (errors, _) = fixture(json!({"vibe": "calm"}));
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.starts_with("(root): ")));
        assert!(errors.iter().any(|e| e.contains("\"date\"")));
        assert!(errors.iter().any(|e| e.contains("\"stories\"")));

        assert_eq!(error_paths(json!([1, 2])), vec![""]);
    }

    #[test]
    fn test_reserved_tag_rejected() {
        let (errors, _) = fixture(json!({
            "date": "d",
            "stories": [{"tags": ["web", "I18N"], "i18n": {}}]
        }));
        assert_eq!(errors, vec!["stories.0.tags.1: `i18n` is reserved for translations"]);
    }

    #[test]
    fn test_warnings() {
        let document = json!({
            "date": "d",
            "stories": [
                {"id": 4, "comments": [{"by": "a", "text": "b"}], "i18n": {"ja": {"comments": ["x", "y"]}}},
                {"id": 4},
                {"id": 4, "i18n": null}
            ]
        });
        let (errors, warnings) = fixture(document.clone());
        assert!(errors.is_empty());
        assert_eq!(
            warnings,
            vec![
                "stories.0.i18n.ja.comments: has 2 comments, story has 1",
                "stories.1.i18n: missing; should be an empty object",
                "stories.2.i18n: missing; should be an empty object",
                "stories: duplicate story id 4",
            ]
        );

        let report = validator().validate(&document);
        assert!(report.passed(false));
        assert!(!report.passed(true));
        assert_eq!(report.failures(false).count(), 0);
        assert_eq!(report.failures(true).count(), 4);
    }

    #[test]
    fn test_digest_wrapper() {
        let (errors, _) = fixture(json!({"digest": {"date": "d", "stories": []}}));
        assert!(errors.is_empty());
    }

    #[test]
    fn test_dotted() {
        assert_eq!(dotted(""), "");
        assert_eq!(dotted("/stories/0/id"), "stories.0.id");
        assert_eq!(dotted("/stories/0/i18n/a~1b"), "stories.0.i18n.a/b");
    }
}
