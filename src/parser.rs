//! Parses outline (org-mode) digest documents into [`Digest`] records. This is
//! the inverse of [`crate::serializer`]. The expected shape is:
//!
//! ```org
//! #+DATE: 2025-12-15T11:00:00Z
//!
//! * Vibe
//! Quiet day.
//!
//! * Highlights
//! - Something happened
//!
//! * Stories
//! ** Story title :tag:other:
//! :PROPERTIES:
//! :ID:       123
//! :END:
//! *** TLDR
//! *** Take
//! *** Comments
//! **** author
//! *** i18n                                            :i18n:
//! **** ja
//! ***** TLDR
//! ```
//!
//! Parsing is a single forward pass over lines. The parser never fails: a
//! heading that shows up outside the context it belongs to is ignored and the
//! text under it is dropped, and unparseable property values fall back to
//! their zero value.

use tracing::debug;

use crate::{
    model::{Comment, Digest, Story, Translation},
    tag,
};

/// Parses an outline document into a [`Digest`]. Malformed elements are
/// skipped at the narrowest scope possible; the rest of the document is still
/// parsed.
pub fn parse(input: &str) -> Digest {
    let mut state = State::default();
    for line in input.lines() {
        state.on_line(line);
    }
    state.finish()
}

/// The top-level (depth 1) section the parser is in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Block {
    #[default]
    None,
    Vibe,
    Highlights,
    Stories,
    Other,
}

/// The story subsection (depth 3) the parser is in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Section {
    #[default]
    None,
    Tldr,
    Take,
    Comments,
    I18n,
}

impl Section {
    fn from_name(name: &str) -> Section {
        match name.to_lowercase().as_str() {
            "tldr" => Section::Tldr,
            "take" => Section::Take,
            "comments" => Section::Comments,
            "i18n" => Section::I18n,
            _ => Section::None,
        }
    }
}

/// Where the body text under the most recent heading goes once the next
/// heading closes it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Sink {
    #[default]
    Discard,
    Vibe,
    Highlights,
    StoryTldr,
    StoryTake,
    Comment,
    TranslationTitle,
    TranslationTldr,
    TranslationTake,
    TranslationComments,
}

/// The record a property drawer describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Target {
    Story,
    Comment,
}

#[derive(Default)]
struct State<'a> {
    digest: Digest,
    block: Block,

    /// The story being populated. It is flushed into `digest.stories` when the
    /// next story or top-level section starts, and at end of input.
    story: Option<Story>,
    section: Section,

    /// The language whose translation depth-5 headings fill.
    lang: Option<String>,

    sink: Sink,
    body: Vec<&'a str>,

    /// The record owning a drawer that opens on the next non-blank line.
    pending_drawer: Option<Target>,

    /// `Some` while inside a drawer; the inner value is the drawer's owner,
    /// if it has one.
    drawer: Option<Option<Target>>,

    seen_heading: bool,
}

impl<'a> State<'a> {
    fn on_line(&mut self, line: &'a str) {
        let trimmed = line.trim();
        if let Some(target) = self.drawer {
            if heading(line).is_none() {
                if trimmed.eq_ignore_ascii_case(":END:") {
                    self.drawer = None;
                } else if let (Some(target), Some((key, value))) = (target, property(trimmed)) {
                    self.on_property(target, key, value);
                }
                return;
            }
            debug!("closing unterminated drawer at heading `{}`", trimmed);
            self.drawer = None;
        }
        if trimmed.eq_ignore_ascii_case(":PROPERTIES:") {
            self.drawer = Some(self.pending_drawer.take());
            return;
        }

        match heading(line) {
            Some((depth, _)) if self.block == Block::Vibe && depth > 1 => self.body.push(line),
            Some((depth, text)) => {
                self.seen_heading = true;
                self.pending_drawer = None;
                self.close_body();
                self.on_heading(depth, text);
            }
            None if !self.seen_heading => self.on_metadata(trimmed),
            None => {
                if !trimmed.is_empty() {
                    self.pending_drawer = None;
                }
                self.body.push(line);
            }
        }
    }

    fn on_metadata(&mut self, line: &str) {
        let Some((key, value)) = line.strip_prefix("#+").and_then(|l| l.split_once(':')) else {
            return;
        };
        if key.trim().eq_ignore_ascii_case("date") {
            self.digest.date = value.trim().to_owned();
        }
    }

    fn on_heading(&mut self, depth: usize, text: &str) {
        // Only story headings carry tags; the i18n container carries a marker.
        let (title, tags) = match depth {
            2 | 3 => tag::split_heading(text),
            _ => (text.trim(), Vec::new()),
        };
        match depth {
            1 => {
                self.flush_story();
                self.block = match title.to_lowercase().as_str() {
                    "vibe" => Block::Vibe,
                    "highlights" => Block::Highlights,
                    "stories" => Block::Stories,
                    _ => Block::Other,
                };
                self.sink = match self.block {
                    Block::Vibe => Sink::Vibe,
                    Block::Highlights => Sink::Highlights,
                    _ => Sink::Discard,
                };
            }
            2 => {
                self.flush_story();
                self.story = Some(Story {
                    title: title.to_owned(),
                    tags,
                    ..Story::default()
                });
                self.sink = Sink::Discard;
                self.pending_drawer = Some(Target::Story);
            }
            3 => {
                self.lang = None;
                self.section = match self.story {
                    Some(_) => Section::from_name(title),
                    None => {
                        debug!("ignoring subsection `{}` outside a story", title);
                        Section::None
                    }
                };
                self.sink = match self.section {
                    Section::Tldr => Sink::StoryTldr,
                    Section::Take => Sink::StoryTake,
                    _ => Sink::Discard,
                };
            }
            4 => {
                self.lang = None;
                self.sink = Sink::Discard;
                match (self.section, self.story.as_mut()) {
                    (Section::Comments, Some(story)) => {
                        story.comments.push(Comment {
                            by: title.to_owned(),
                            ..Comment::default()
                        });
                        self.sink = Sink::Comment;
                        self.pending_drawer = Some(Target::Comment);
                    }
                    (Section::I18n, Some(story)) => {
                        let lang = title.to_lowercase();
                        story.translation_mut(&lang);
                        self.lang = Some(lang);
                    }
                    _ => debug!("ignoring entry `{}` outside comments and i18n", title),
                }
            }
            5 if self.lang.is_some() => {
                self.sink = match title.to_lowercase().as_str() {
                    "title" => Sink::TranslationTitle,
                    "tldr" => Sink::TranslationTldr,
                    "take" => Sink::TranslationTake,
                    "comments" => Sink::TranslationComments,
                    _ => Sink::Discard,
                };
            }
            _ => {
                debug!("ignoring depth-{} heading `{}`", depth, title);
                self.sink = Sink::Discard;
            }
        }
    }

    fn on_property(&mut self, target: Target, key: &str, value: &str) {
        let key = key.to_lowercase();
        match target {
            Target::Story => {
                let Some(story) = self.story.as_mut() else {
                    return;
                };
                match key.as_str() {
                    "id" => story.id = integer(&key, value),
                    "url" => story.url = value.to_owned(),
                    "hn_url" => story.hn_url = value.to_owned(),
                    "points" => story.points = integer(&key, value),
                    "comments" => story.comments_count = integer(&key, value),
                    "by" => story.by = value.to_owned(),
                    "time" => story.time = value.to_owned(),
                    _ => {}
                }
            }
            Target::Comment => {
                let comment = self.story.as_mut().and_then(|s| s.comments.last_mut());
                if let (Some(comment), "comment_id") = (comment, key.as_str()) {
                    comment.id = Some(integer(&key, value)).filter(|id| *id > 0);
                }
            }
        }
    }

    /// Hands the text collected since the last heading to the current sink.
    fn close_body(&mut self) {
        let lines = std::mem::take(&mut self.body);
        match self.sink {
            Sink::Discard => {}
            Sink::Vibe => self.digest.vibe = text(&lines),
            Sink::Highlights => self.digest.highlights.extend(
                lines
                    .iter()
                    .map(|l| l.trim())
                    .filter_map(|l| match l {
                        "-" => Some(""),
                        l => l.strip_prefix("- "),
                    })
                    .map(|h| h.trim().to_owned()),
            ),
            Sink::StoryTldr => {
                if let Some(story) = self.story.as_mut() {
                    story.tldr = text(&lines);
                }
            }
            Sink::StoryTake => {
                if let Some(story) = self.story.as_mut() {
                    story.take = text(&lines);
                }
            }
            Sink::Comment => {
                if let Some(comment) = self.story.as_mut().and_then(|s| s.comments.last_mut()) {
                    comment.text = text(&lines);
                }
            }
            Sink::TranslationTitle
            | Sink::TranslationTldr
            | Sink::TranslationTake
            | Sink::TranslationComments => {
                let sink = self.sink;
                if let Some(translation) = self.translation() {
                    match sink {
                        Sink::TranslationTitle => translation.title = text(&lines),
                        Sink::TranslationTldr => translation.tldr = text(&lines),
                        Sink::TranslationTake => translation.take = text(&lines),
                        _ => translation.comments = list(&lines),
                    }
                }
            }
        }
    }

    fn translation(&mut self) -> Option<&mut Translation> {
        let lang = self.lang.as_deref()?;
        Some(self.story.as_mut()?.translation_mut(lang))
    }

    fn flush_story(&mut self) {
        if let Some(story) = self.story.take() {
            self.digest.stories.push(story);
        }
        self.section = Section::None;
        self.lang = None;
    }

    fn finish(mut self) -> Digest {
        self.close_body();
        self.flush_story();
        self.digest
    }
}

/// Returns the depth and text of a heading line. A heading is one or more
/// leading `*` followed by whitespace or the end of the line.
fn heading(line: &str) -> Option<(usize, &str)> {
    let depth = line.bytes().take_while(|b| *b == b'*').count();
    if depth == 0 {
        return None;
    }
    let rest = &line[depth..];
    match rest.chars().next() {
        None => Some((depth, "")),
        Some(c) if c.is_whitespace() => Some((depth, rest.trim())),
        Some(_) => None,
    }
}

/// Splits a `:KEY: value` drawer line.
fn property(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.strip_prefix(':')?.split_once(':')?;
    match !key.is_empty() && key.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        true => Some((key, value.trim())),
        false => None,
    }
}

fn integer(key: &str, value: &str) -> u64 {
    value.parse().unwrap_or_else(|_| {
        debug!("property `{}` has non-integer value `{}`, using 0", key, value);
        0
    })
}

fn text(lines: &[&str]) -> String {
    lines.join("\n").trim().to_owned()
}

/// Reads a bullet list of translated comments. Each `- ` line starts an item;
/// lines indented by two spaces continue the previous one.
fn list(lines: &[&str]) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for line in lines {
        if let Some(item) = line.strip_prefix("- ") {
            items.push(item.trim().to_owned());
        } else if line.trim_end() == "-" {
            items.push(String::new());
        } else if let (Some(rest), Some(item)) = (line.strip_prefix("  "), items.last_mut()) {
            item.push('\n');
            item.push_str(rest.trim_end());
        }
    }
    items
}
