//! Defines the record types shared by every parser, serializer, and renderer:
//! [`Digest`], [`Story`], [`Comment`], and [`Translation`]. Every field has a
//! zero value, and deserialization fills absent or `null` fields with it, so
//! partially populated input never has to be patched up at the use site.

use std::collections::BTreeMap;

use serde::{de::IgnoredAny, Deserialize, Deserializer, Serialize};

/// One curation run: a dated batch of stories plus a one-line summary.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Digest {
    /// ISO-8601-like timestamp, e.g. `2025-12-15T11:00:00Z`. This is the
    /// primary sort and filter key for digests.
    #[serde(deserialize_with = "nullable")]
    pub date: String,

    /// A short free-text summary of the batch.
    #[serde(deserialize_with = "nullable")]
    pub vibe: String,

    /// Short highlight lines in display order.
    #[serde(deserialize_with = "nullable")]
    pub highlights: Vec<String>,

    /// Stories in source order.
    #[serde(deserialize_with = "nullable")]
    pub stories: Vec<Story>,
}

/// One external article plus the curator's commentary on it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Story {
    /// The Hacker News item id. `0` means the story has no identity, which
    /// disables anchor generation (see [`crate::url::story_anchor`]).
    #[serde(alias = "hn_id", deserialize_with = "lenient_u64")]
    pub id: u64,

    #[serde(deserialize_with = "nullable")]
    pub title: String,

    #[serde(deserialize_with = "nullable")]
    pub url: String,

    /// The URL of the discussion thread.
    #[serde(deserialize_with = "nullable")]
    pub hn_url: String,

    #[serde(alias = "score", deserialize_with = "lenient_u64")]
    pub points: u64,

    #[serde(alias = "descendants", deserialize_with = "lenient_u64")]
    pub comments_count: u64,

    #[serde(
        alias = "author",
        deserialize_with = "nullable",
        skip_serializing_if = "String::is_empty"
    )]
    pub by: String,

    /// Submission time. Unix timestamps are converted to ISO-8601 on input.
    #[serde(deserialize_with = "lenient_time", skip_serializing_if = "String::is_empty")]
    pub time: String,

    #[serde(deserialize_with = "nullable")]
    pub tldr: String,

    #[serde(deserialize_with = "nullable")]
    pub take: String,

    /// Lowercase labels in source order.
    #[serde(deserialize_with = "crate::tag::deserialize_tags")]
    pub tags: Vec<String>,

    /// The sole source of truth for comment count and order; translated
    /// comment sequences are aligned to it by index.
    #[serde(deserialize_with = "nullable")]
    pub comments: Vec<Comment>,

    /// Translations keyed by lowercase language code.
    #[serde(deserialize_with = "deserialize_i18n")]
    pub i18n: BTreeMap<String, Translation>,
}

/// A quoted remark from the discussion thread.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Comment {
    #[serde(alias = "author", deserialize_with = "nullable")]
    pub by: String,

    #[serde(deserialize_with = "nullable")]
    pub text: String,

    /// The Hacker News comment id, if known. `0` is read as unknown.
    #[serde(alias = "comment_id", deserialize_with = "lenient_opt_u64")]
    pub id: Option<u64>,
}

/// A language-specific rendering of a [`Story`]'s commentary. Each field is
/// independently present or empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Translation {
    #[serde(deserialize_with = "nullable", skip_serializing_if = "String::is_empty")]
    pub title: String,

    #[serde(deserialize_with = "nullable")]
    pub tldr: String,

    #[serde(deserialize_with = "nullable")]
    pub take: String,

    /// Translated comment texts, positionally aligned with
    /// [`Story::comments`]. A length mismatch marks the translation as
    /// incomplete.
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<String>,
}

impl Digest {
    /// Parses a digest from the JSON interchange shape. A top-level
    /// `{"digest": {...}}` wrapper is unwrapped.
    pub fn from_json(input: &str) -> serde_json::Result<Digest> {
        let mut value: serde_json::Value = serde_json::from_str(input)?;
        if let Some(inner) = value.get_mut("digest").map(serde_json::Value::take) {
            value = inner;
        }
        serde_json::from_value(value)
    }

    /// Serializes the digest as pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// The `YYYY-MM-DD` prefix of [`Digest::date`], or the whole date if it
    /// is shorter than that.
    pub fn day(&self) -> &str {
        self.date.get(..10).unwrap_or(&self.date)
    }
}

impl Story {
    /// Returns the translation for `lang`, inserting an empty one if the
    /// story has none yet. Existing entries are never replaced.
    pub fn translation_mut(&mut self, lang: &str) -> &mut Translation {
        self.i18n.entry(lang.to_owned()).or_default()
    }
}

impl Translation {
    /// True if every field is empty.
    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
            && self.tldr.is_empty()
            && self.take.is_empty()
            && self.comments.is_empty()
    }

    /// Merges `incoming` into `self` without overwriting content. Scalars
    /// are filled only where empty; comments are replaced only when absent
    /// or of a different length than the incoming list. Returns whether
    /// anything changed.
    pub fn merge(&mut self, incoming: &Translation) -> bool {
        let mut changed = false;
        for (field, value) in [
            (&mut self.title, &incoming.title),
            (&mut self.tldr, &incoming.tldr),
            (&mut self.take, &incoming.take),
        ] {
            if field.is_empty() && !value.is_empty() {
                *field = value.clone();
                changed = true;
            }
        }
        if !incoming.comments.is_empty()
            && (self.comments.is_empty() || self.comments.len() != incoming.comments.len())
        {
            self.comments = incoming.comments.clone();
            changed = true;
        }
        changed
    }
}

/// Normalizes language keys to trimmed lowercase. Entries whose keys collide
/// after normalization are merged in key order, so `JA` only fills what `ja`
/// left empty. Blank keys are dropped.
pub fn fold_languages(i18n: BTreeMap<String, Translation>) -> BTreeMap<String, Translation> {
    let mut folded: BTreeMap<String, Translation> = BTreeMap::new();
    let (exact, other): (Vec<_>, Vec<_>) = i18n
        .into_iter()
        .partition(|(lang, _)| *lang == lang.trim().to_lowercase());
    for (lang, translation) in exact.into_iter().chain(other) {
        let lang = lang.trim().to_lowercase();
        if lang.is_empty() {
            continue;
        }
        folded.entry(lang).or_default().merge(&translation);
    }
    folded
}

/// Reads an `i18n` map, folding its keys with [`fold_languages`].
pub fn deserialize_i18n<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, Translation>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(fold_languages(nullable(deserializer)?))
}

/// Reads `null` as the type's zero value.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient {
    Int(u64),
    Str(String),
    Other(IgnoredAny),
}

impl Lenient {
    fn to_u64(&self) -> u64 {
        match self {
            Lenient::Int(n) => *n,
            Lenient::Str(s) => s.trim().parse().unwrap_or_default(),
            Lenient::Other(_) => 0,
        }
    }
}

/// Reads non-negative integers and numeric strings; anything else is `0`.
fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Lenient::deserialize(deserializer)?.to_u64())
}

fn lenient_opt_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Some(lenient_u64(deserializer)?).filter(|id| *id > 0))
}

fn lenient_time<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Lenient::deserialize(deserializer)? {
        Lenient::Str(s) => s,
        Lenient::Int(secs) => i64::try_from(secs)
            .ok()
            .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
            .map(|t| t.format("%Y-%m-%dT%H:%M:%SZ").to_string())
            .unwrap_or_default(),
        Lenient::Other(_) => String::new(),
    })
}
