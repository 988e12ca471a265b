//! Story tag handling. Tags are lowercase in the record model and are written
//! into outline headings as a trailing `:tag:tag:` group. The `i18n` tag is
//! reserved: it marks the translation container heading and must never be
//! read or written as a user tag.

use serde::{Deserialize, Deserializer};
use tracing::warn;

/// The tag that marks a story's translation container in outline form.
pub const RESERVED: &str = "i18n";

/// Lowercases a tag and strips surrounding whitespace and a leading `#`.
pub fn normalize(tag: &str) -> String {
    tag.trim().trim_start_matches('#').to_lowercase()
}

/// True if `tag` collides with the reserved translation marker.
pub fn is_reserved(tag: &str) -> bool {
    tag.eq_ignore_ascii_case(RESERVED)
}

fn is_tag_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '@' | '#' | '%' | '-')
}

/// Makes a tag safe for a heading tag group. Tags made only of tag
/// characters pass through normalized; anything else (spaces, colons) is
/// slugified. Returns `None` for empty and reserved tags.
pub fn sanitize(tag: &str) -> Option<String> {
    let tag = normalize(tag);
    let tag = match tag.chars().all(is_tag_char) {
        true => tag,
        false => slug::slugify(&tag),
    };
    match tag.is_empty() || is_reserved(&tag) {
        true => None,
        false => Some(tag),
    }
}

/// Formats tags as a heading tag group (`:ai:security:`), or an empty string
/// when there is nothing to write. Reserved tags are dropped with a warning.
pub fn format_group(tags: &[String]) -> String {
    let mut group = String::new();
    for tag in tags {
        match sanitize(tag) {
            Some(tag) => {
                group.push(':');
                group.push_str(&tag);
            }
            None if is_reserved(&normalize(tag)) => {
                warn!("dropping reserved tag `{}` from heading", tag)
            }
            None => {}
        }
    }
    if !group.is_empty() {
        group.push(':');
    }
    group
}

fn is_tag_group(s: &str) -> bool {
    s.len() > 2
        && s.starts_with(':')
        && s.ends_with(':')
        && s[1..s.len() - 1]
            .split(':')
            .all(|t| !t.is_empty() && t.chars().all(is_tag_char))
}

/// Splits heading text (already stripped of its leading stars) into the
/// title and its lowercase tags. The reserved tag is excluded.
pub fn split_heading(text: &str) -> (&str, Vec<String>) {
    let text = text.trim();
    let start = text
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace())
        .map_or(0, |(i, c)| i + c.len_utf8());
    let group = &text[start..];
    if !is_tag_group(group) {
        return (text, Vec::new());
    }
    let tags = group
        .split(':')
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .filter(|t| !is_reserved(t))
        .collect();
    (text[..start].trim_end(), tags)
}

/// Deserializes a tag sequence, normalizing every tag on the way in.
pub fn deserialize_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let tags = Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(tags
        .iter()
        .map(|t| normalize(t))
        .filter(|t| !t.is_empty())
        .collect())
}
