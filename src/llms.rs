//! The plain-text story index: one line per story across every digest,
//! `date|id|points|comments|tags|title`, meant to be cheap for a language
//! model (or `grep`) to scan. Tags are comma-separated; the title is the last
//! field so it may contain `|`.

use std::fmt::{self, Write};

use crate::model::Digest;

/// Writes the index lines for `digests`, in order.
pub fn write_index<W: Write>(w: &mut W, digests: &[Digest]) -> fmt::Result {
    for digest in digests {
        for story in &digest.stories {
            writeln!(
                w,
                "{}|{}|{}|{}|{}|{}",
                digest.day(),
                story.id,
                story.points,
                story.comments_count,
                story.tags.join(","),
                story.title.split_whitespace().collect::<Vec<_>>().join(" ")
            )?;
        }
    }
    Ok(())
}
