//! Parses the upstream markdown digest format into [`Digest`] records. The
//! format is line oriented:
//!
//! ```markdown
//! # HN Digest 2025-12-15 11:00 UTC
//!
//! > One-line vibe
//!
//! **Highlights**
//! - Something happened
//!
//! ---
//!
//! ### [Title](https://example.com) • 450pts 210c
//! [HN discussion](https://news.ycombinator.com/item?id=123)
//! TLDR: Summary.
//! <!-- i18n:ja -->TLDR: 要約<!-- /i18n -->
//! Take: Opinion.
//! Comments:
//! - "quoted text" -author
//! Tags: #db #release
//! ```
//!
//! Inline translations are read for `TLDR:` and `Take:` only. Translated
//! comment variants are skipped, so comment translations never come from
//! this format.

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::{
    model::{Comment, Digest, Story},
    tag, url,
};

/// Returned when a document can't be read as a digest.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the document has no `# HN Digest <date> <time>` header.
    /// Without a date the digest can be neither sorted nor filtered.
    #[error("missing `# HN Digest YYYY-MM-DD HH:MM` header")]
    MissingDate,
}

type Result<T> = std::result::Result<T, Error>;

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("Invalid markdown digest regex"))
}

fn header_regex() -> &'static Regex {
    static HEADER: OnceLock<Regex> = OnceLock::new();
    regex(&HEADER, r"(\d{4}-\d{2}-\d{2}) (\d{2}:\d{2})")
}

fn story_regex() -> &'static Regex {
    static STORY: OnceLock<Regex> = OnceLock::new();
    regex(&STORY, r"^### \[(.+?)\]\((.+?)\) • (\d+)pts (\d+)c")
}

fn link_regex() -> &'static Regex {
    static LINK: OnceLock<Regex> = OnceLock::new();
    regex(&LINK, r"\]\((https?://[^)\s]+)\)")
}

fn rule_regex() -> &'static Regex {
    static RULE: OnceLock<Regex> = OnceLock::new();
    regex(&RULE, r"^-{3,}\s*$")
}

fn comment_regex() -> &'static Regex {
    static COMMENT: OnceLock<Regex> = OnceLock::new();
    regex(&COMMENT, r#"^- ["'“](.+?)["'”]\s*-([\w-]+)"#)
}

fn translation_regex() -> &'static Regex {
    static TRANSLATION: OnceLock<Regex> = OnceLock::new();
    regex(
        &TRANSLATION,
        r"^<!-- i18n:(\w+) -->(TLDR|Take): (.+?)<!-- /i18n -->",
    )
}

fn tag_regex() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    regex(&TAG, r"#(\w[\w-]*)")
}

/// Parses a markdown digest. Unrecognized lines are skipped; the only
/// document-level failure is a missing date header.
pub fn parse(input: &str) -> Result<Digest> {
    let mut state = State::default();
    for line in input.lines() {
        state.on_line(line);
    }
    state.finish()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Mode {
    #[default]
    Header,
    Vibe,
    Highlights,
    Stories,
    Comments,
}

/// The commentary label whose inline translations may follow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Label {
    Tldr,
    Take,
}

#[derive(Default)]
struct State {
    digest: Digest,
    mode: Mode,
    story: Option<Story>,
    label: Option<Label>,
}

impl State {
    fn on_line(&mut self, line: &str) {
        let label = self.label.take();

        if self.mode == Mode::Header {
            if line.starts_with("# HN Digest") {
                if let Some(caps) = header_regex().captures(line) {
                    self.digest.date = format!("{}T{}:00Z", &caps[1], &caps[2]);
                }
                self.mode = Mode::Vibe;
            }
            return;
        }

        if let Some(caps) = story_regex().captures(line) {
            self.flush();
            self.story = Some(Story {
                title: caps[1].to_owned(),
                url: caps[2].to_owned(),
                points: caps[3].parse().unwrap_or_default(),
                comments_count: caps[4].parse().unwrap_or_default(),
                ..Story::default()
            });
            self.mode = Mode::Stories;
            return;
        }

        if rule_regex().is_match(line) {
            self.flush();
            if self.mode != Mode::Vibe {
                self.mode = Mode::Stories;
            }
            return;
        }

        match self.mode {
            Mode::Header => {}
            Mode::Vibe => self.on_vibe(line),
            Mode::Highlights => match line.strip_prefix("- ") {
                Some(highlight) => self.digest.highlights.push(highlight.trim().to_owned()),
                None if line.starts_with("###") => self.mode = Mode::Stories,
                None => {}
            },
            Mode::Comments => self.on_comment(line),
            Mode::Stories => self.on_story(line, label),
        }
    }

    fn on_vibe(&mut self, line: &str) {
        if line.contains("**Highlights**") {
            self.mode = Mode::Highlights;
        } else if let Some(vibe) = line.strip_prefix("> ") {
            if self.digest.vibe.is_empty() && !vibe.trim_start().starts_with("<!--") {
                self.digest.vibe = vibe.trim().to_owned();
            }
        }
    }

    fn on_comment(&mut self, line: &str) {
        if let Some(caps) = comment_regex().captures(line) {
            if let Some(story) = self.story.as_mut() {
                story.comments.push(Comment {
                    by: caps[2].to_owned(),
                    text: caps[1].to_owned(),
                    id: None,
                });
            }
        } else if ["Tags:", "TLDR:", "Take:"].iter().any(|l| line.starts_with(l)) {
            self.mode = Mode::Stories;
            self.on_story(line, None);
        }
    }

    fn on_story(&mut self, line: &str, label: Option<Label>) {
        let Some(story) = self.story.as_mut() else {
            return;
        };

        if let Some(tldr) = line.strip_prefix("TLDR:") {
            story.tldr = tldr.trim().to_owned();
            self.label = Some(Label::Tldr);
        } else if let Some(take) = line.strip_prefix("Take:") {
            story.take = take.trim().to_owned();
            self.label = Some(Label::Take);
        } else if line.starts_with("<!-- i18n:") {
            // Inline translations belong to the label directly above them;
            // the run continues until a line of another kind.
            self.label = label;
            match (label, translation_regex().captures(line)) {
                (Some(Label::Tldr), Some(caps)) if &caps[2] == "TLDR" => {
                    story.translation_mut(&caps[1].to_lowercase()).tldr = caps[3].to_owned();
                }
                (Some(Label::Take), Some(caps)) if &caps[2] == "Take" => {
                    story.translation_mut(&caps[1].to_lowercase()).take = caps[3].to_owned();
                }
                _ => debug!("ignoring inline translation: {}", line),
            }
        } else if line.starts_with("Comments:") {
            self.mode = Mode::Comments;
        } else if let Some(tags) = line.strip_prefix("Tags:") {
            story.tags = tag_regex()
                .captures_iter(tags)
                .map(|caps| tag::normalize(&caps[1]))
                .collect();
        } else if let Some(id) = link_regex()
            .captures_iter(line)
            .find_map(|caps| url::discussion_id(&caps[1]).map(|id| (id, caps[1].to_owned())))
        {
            (story.id, story.hn_url) = id;
        }
    }

    fn flush(&mut self) {
        if let Some(story) = self.story.take() {
            self.digest.stories.push(story);
        }
    }

    fn finish(mut self) -> Result<Digest> {
        self.flush();
        match self.digest.date.is_empty() {
            true => Err(Error::MissingDate),
            false => Ok(self.digest),
        }
    }
}
