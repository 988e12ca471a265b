//! Discussion-thread URLs and story anchors. A story's numeric id ties it to
//! its Hacker News thread (`https://news.ycombinator.com/item?id={id}`) and
//! to its anchor on rendered pages (`s{id}-{MMDDHHMM}`).

use url::Url;

const DISCUSSION_HOST: &str = "news.ycombinator.com";
const DISCUSSION_PATH: &str = "/item";

/// Returns the discussion-thread URL for a story id, or `None` for id `0`.
pub fn discussion_url(id: u64) -> Option<Url> {
    if id == 0 {
        return None;
    }
    let mut url = Url::parse(&format!("https://{}{}", DISCUSSION_HOST, DISCUSSION_PATH)).ok()?;
    url.query_pairs_mut().append_pair("id", &id.to_string());
    Some(url)
}

/// Extracts the numeric item id from a discussion-thread link. Links to other
/// hosts or paths, and ids that are not positive integers, yield `None`.
pub fn discussion_id(link: &str) -> Option<u64> {
    let url = Url::parse(link).ok()?;
    if url.host_str() != Some(DISCUSSION_HOST) || url.path() != DISCUSSION_PATH {
        return None;
    }
    url.query_pairs()
        .find(|(key, _)| key == "id")
        .and_then(|(_, value)| value.parse::<u64>().ok())
        .filter(|id| *id > 0)
}

/// Builds the stable anchor for a story on a rendered page. The digest's
/// month, day, hour, and minute are appended so the same story appearing in
/// two digests gets two distinct anchors. Stories without an id get no
/// anchor.
pub fn story_anchor(id: u64, digest_date: &str) -> Option<String> {
    if id == 0 {
        return None;
    }
    Some(match anchor_suffix(digest_date) {
        Some(suffix) => format!("s{}-{}", id, suffix),
        None => format!("s{}", id),
    })
}

fn anchor_suffix(date: &str) -> Option<String> {
    let parts = [
        date.get(5..7)?,
        date.get(8..10)?,
        date.get(11..13)?,
        date.get(14..16)?,
    ];
    match parts.iter().all(|p| p.bytes().all(|b| b.is_ascii_digit())) {
        true => Some(parts.concat()),
        false => None,
    }
}
