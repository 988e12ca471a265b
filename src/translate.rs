//! Translation coverage and merging. [`check`] reports, per story and
//! language, which translated fields are missing; [`apply`] folds a
//! [`Payload`] of translations back into a digest without ever overwriting a
//! field that already has content.
//!
//! Producing the translated text is someone else's job. A [`Provider`] takes
//! a [`Report`] and hands back a [`Payload`]; the bundled [`JsonProvider`]
//! just reads a ready-made payload, e.g. from stdin.

use std::{collections::BTreeMap, fmt, io::Read};

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use tracing::debug;

use crate::model::{Digest, Story, Translation};

/// Returned when a translation payload can't be obtained.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the payload can't be read.
    #[error("reading translation payload: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when the payload isn't a well-formed `{"translations": [...]}`
    /// document.
    #[error("invalid translation payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// Returned when merged translations can't be written back as JSON.
    #[error("encoding translations: {0}")]
    Encode(serde_json::Error),
}

type Result<T> = std::result::Result<T, Error>;

/// A translated field that is absent or incomplete.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MissingField {
    Tldr,
    Take,

    /// The translation has `have` comments where the story has `want`.
    Comments { have: usize, want: usize },
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingField::Tldr => f.write_str("tldr"),
            MissingField::Take => f.write_str("take"),
            MissingField::Comments { have, want } => write!(f, "comments({}/{})", have, want),
        }
    }
}

/// The missing fields of one language of one story. Displays (and
/// serializes) as `ja[tldr,comments(0/3)]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Gap {
    pub lang: String,
    pub fields: Vec<MissingField>,
}

impl fmt::Display for Gap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[", self.lang)?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", field)?;
        }
        f.write_str("]")
    }
}

impl Serialize for Gap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The untranslated text a translator works from.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Source {
    pub tldr: String,
    pub take: String,
    pub comments: Vec<String>,
}

/// A story with at least one incomplete translation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Needed {
    pub id: u64,
    pub title: String,
    pub source: Source,
    pub missing_langs: Vec<Gap>,
}

/// Everything [`check`] found missing, in story order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub translations_needed: Vec<Needed>,
}

impl Report {
    /// True if every requested language of every story is complete.
    pub fn is_complete(&self) -> bool {
        self.translations_needed.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Renders the report as a request for a translator: the source texts
    /// of every incomplete story and the payload shape to answer with.
    pub fn prompt(&self) -> String {
        if self.is_complete() {
            return String::from("No translations needed.\n");
        }

        let mut out = String::from("Translate the following content:\n\n");
        let mut langs: Vec<&str> = Vec::new();
        for needed in &self.translations_needed {
            let gaps: Vec<String> = needed.missing_langs.iter().map(Gap::to_string).collect();
            out.push_str(&format!("## Story {}: {}\n", needed.id, needed.title));
            out.push_str(&format!("Languages needed: {}\n\n", gaps.join(", ")));
            out.push_str(&format!("TLDR (English): {}\n", needed.source.tldr));
            out.push_str(&format!("Take (English): {}\n", needed.source.take));
            if !needed.source.comments.is_empty() {
                out.push_str("Comments (English, keep this order):\n");
                for (i, comment) in needed.source.comments.iter().enumerate() {
                    out.push_str(&format!("{}. {}\n", i + 1, comment));
                }
            }
            out.push('\n');
            for gap in &needed.missing_langs {
                if !langs.contains(&gap.lang.as_str()) {
                    langs.push(&gap.lang);
                }
            }
        }

        out.push_str("Respond with JSON in this format:\n```json\n");
        out.push_str("{\n  \"translations\": [\n    {\n      \"id\": STORY_ID,\n      \"i18n\": {\n");
        for (i, lang) in langs.iter().enumerate() {
            let comma = match i + 1 < langs.len() {
                true => ",",
                false => "",
            };
            out.push_str(&format!(
                "        \"{}\": {{\"tldr\": \"...\", \"take\": \"...\", \"comments\": [\"...\"]}}{}\n",
                lang, comma
            ));
        }
        out.push_str("      }\n    }\n  ]\n}\n```\n");
        out
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_complete() {
            return writeln!(f, "All translations present for requested languages.");
        }
        for needed in &self.translations_needed {
            let gaps: Vec<String> = needed.missing_langs.iter().map(Gap::to_string).collect();
            writeln!(f, "Story {}: needs {}", needed.id, gaps.join(", "))?;
        }
        Ok(())
    }
}

/// Lists the fields of `translation` that still need translating for
/// `story`. A missing translation is missing everything.
pub fn missing_fields(story: &Story, translation: Option<&Translation>) -> Vec<MissingField> {
    let empty = Translation::default();
    let translation = translation.unwrap_or(&empty);
    let mut fields = Vec::new();
    if translation.tldr.is_empty() {
        fields.push(MissingField::Tldr);
    }
    if translation.take.is_empty() {
        fields.push(MissingField::Take);
    }
    if translation.comments.len() != story.comments.len() {
        fields.push(MissingField::Comments {
            have: translation.comments.len(),
            want: story.comments.len(),
        });
    }
    fields
}

/// Reports the missing translations of every story for each of `langs`.
pub fn check(digest: &Digest, langs: &[String]) -> Report {
    let translations_needed = digest
        .stories
        .iter()
        .filter_map(|story| {
            let missing_langs: Vec<Gap> = langs
                .iter()
                .filter_map(|lang| {
                    let fields = missing_fields(story, story.i18n.get(lang));
                    match fields.is_empty() {
                        true => None,
                        false => Some(Gap {
                            lang: lang.clone(),
                            fields,
                        }),
                    }
                })
                .collect();
            match missing_langs.is_empty() {
                true => None,
                false => Some(Needed {
                    id: story.id,
                    title: story.title.clone(),
                    source: Source {
                        tldr: story.tldr.clone(),
                        take: story.take.clone(),
                        comments: story.comments.iter().map(|c| c.text.clone()).collect(),
                    },
                    missing_langs,
                }),
            }
        })
        .collect();
    Report {
        translations_needed,
    }
}

/// Translations for one story, keyed by language.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: u64,
    #[serde(default, deserialize_with = "crate::model::deserialize_i18n")]
    pub i18n: BTreeMap<String, Translation>,
}

/// A batch of incoming translations, as produced by a [`Provider`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    #[serde(default)]
    pub translations: Vec<Block>,
}

impl Payload {
    pub fn from_json(input: &str) -> Result<Payload> {
        Ok(serde_json::from_str(input)?)
    }
}

/// Applies `payload` to every story whose id it names. Stories sharing an id
/// all receive the same merge; blocks for unknown ids are ignored. Returns
/// the number of stories that changed.
pub fn apply(digest: &mut Digest, payload: &Payload) -> usize {
    let mut updated = 0;
    for story in digest.stories.iter_mut().filter(|s| s.id != 0) {
        let id = story.id;
        let mut changed = false;
        for block in payload.translations.iter().filter(|b| b.id == id) {
            for (lang, incoming) in &block.i18n {
                changed |= story.translation_mut(lang).merge(incoming);
            }
        }
        if changed {
            debug!("merged translations into story {}", story.id);
            updated += 1;
        }
    }
    for block in &payload.translations {
        if !digest.stories.iter().any(|s| s.id == block.id) {
            debug!("ignoring translations for unknown story {}", block.id);
        }
    }
    updated
}

/// Writes the translations of `digest` back into `document`, the JSON it was
/// parsed from. Stories are matched by position and only their `i18n`
/// objects are replaced, so keys outside the interchange shape survive.
pub fn patch_document(document: &mut Value, digest: &Digest) -> Result<()> {
    let root = match document.get("digest").is_some() {
        true => &mut document["digest"],
        false => document,
    };
    let Some(stories) = root.get_mut("stories").and_then(Value::as_array_mut) else {
        return Ok(());
    };
    for (story, record) in stories.iter_mut().zip(&digest.stories) {
        if let Some(story) = story.as_object_mut() {
            let i18n = serde_json::to_value(&record.i18n).map_err(Error::Encode)?;
            story.insert(String::from("i18n"), i18n);
        }
    }
    Ok(())
}

/// Supplies translations for the gaps in a [`Report`].
pub trait Provider {
    fn translate(&mut self, report: &Report) -> Result<Payload>;
}

/// A [`Provider`] that reads a finished payload from a reader, ignoring the
/// report. This is how translations produced out of band (by a person or a
/// language model working from [`Report::prompt`]) come back in.
pub struct JsonProvider<R> {
    reader: R,
}

impl<R: Read> JsonProvider<R> {
    pub fn new(reader: R) -> JsonProvider<R> {
        JsonProvider { reader }
    }
}

impl<R: Read> Provider for JsonProvider<R> {
    fn translate(&mut self, _report: &Report) -> Result<Payload> {
        let mut input = String::new();
        self.reader.read_to_string(&mut input)?;
        Payload::from_json(&input)
    }
}
