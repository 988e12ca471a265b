//! Renders digests to HTML. The digests themselves are rendered to two
//! fragments, `content` (the digest sections) and `sidebar` (date groups
//! linking to story anchors), which a [`PageTemplate`] then substitutes into
//! the page shell.
//!
//! All record text is escaped on the way out; translations are emitted as
//! elements tagged with `data-lang` so the page can toggle between them.

use std::fmt::{self, Display, Write};

use gtmpl::{Template, Value};

use crate::model::{Digest, Story, Translation};
use crate::serializer::display_date;
use crate::url::{discussion_url, story_anchor};
use crate::value::Fragments;

/// The page shell used when no template is configured.
pub const BUILTIN_TEMPLATE: &str = include_str!("../theme/index.html");

/// Sidebar titles longer than this many characters are cut short.
const SIDEBAR_TITLE_CHARS: usize = 40;

struct EscapeHtml<'a>(&'a str);

impl Display for EscapeHtml<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&html_escape::encode_text(self.0))
    }
}

struct EscapeAttr<'a>(&'a str);

impl Display for EscapeAttr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&html_escape::encode_double_quoted_attribute(self.0))
    }
}

/// A link from one rendered page to its sibling (the recent page to the
/// archive, or back).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageLink {
    pub href: String,
    pub label: String,
}

impl PageLink {
    pub fn to_archive(href: &str) -> PageLink {
        PageLink {
            href: href.to_owned(),
            label: String::from("View older digests →"),
        }
    }

    pub fn to_recent(href: &str) -> PageLink {
        PageLink {
            href: href.to_owned(),
            label: String::from("← Back to recent digests"),
        }
    }
}

/// Writes one story as an `<article>`. Stories with an id get an anchor
/// (see [`story_anchor`]) so the sidebar and other pages can link to them.
pub fn write_story<W: Write>(w: &mut W, story: &Story, digest_date: &str) -> fmt::Result {
    let anchor = story_anchor(story.id, digest_date);
    match &anchor {
        Some(anchor) => writeln!(w, r#"<article class="story" id="{}">"#, EscapeAttr(anchor))?,
        None => writeln!(w, r#"<article class="story">"#)?,
    }

    write!(
        w,
        r#"  <h3 class="story-title"><a href="{}" target="_blank" rel="noopener">{}</a>"#,
        EscapeAttr(&story.url),
        EscapeHtml(&story.title)
    )?;
    if let Some(anchor) = &anchor {
        write!(w, r##" <a href="#{}" class="story-anchor">#</a>"##, EscapeAttr(anchor))?;
    }
    writeln!(w, "</h3>")?;

    for (lang, translation) in story.i18n.iter().filter(|(_, t)| !t.title.is_empty()) {
        writeln!(
            w,
            r#"  <div class="i18n-title" data-lang="{}">{}</div>"#,
            EscapeAttr(lang),
            EscapeHtml(&translation.title)
        )?;
    }

    write!(
        w,
        r#"  <div class="story-meta">{}pts | {}c"#,
        story.points, story.comments_count
    )?;
    let hn_url = match story.hn_url.is_empty() {
        true => discussion_url(story.id).map(String::from),
        false => Some(story.hn_url.clone()),
    };
    if let Some(hn_url) = hn_url {
        let label = match story.id {
            0 => String::from("HN"),
            id => format!("HN#{}", id),
        };
        write!(
            w,
            r#" | <a href="{}" target="_blank" rel="noopener">{}</a>"#,
            EscapeAttr(&hn_url),
            label
        )?;
    }
    writeln!(w, "</div>")?;

    let sections: [(&str, &str, &String, fn(&Translation) -> &String); 2] = [
        ("story-tldr", "TL;DR", &story.tldr, |t| &t.tldr),
        ("story-take", "Take", &story.take, |t| &t.take),
    ];
    for (class, label, text, translated) in sections {
        if text.is_empty() {
            continue;
        }
        writeln!(w, r#"  <div class="story-section {}">"#, class)?;
        writeln!(w, r#"    <div class="story-label">{}</div>"#, label)?;
        writeln!(w, r#"    <div class="story-text">{}</div>"#, EscapeHtml(text))?;
        for (lang, translation) in &story.i18n {
            let text = translated(translation);
            if !text.is_empty() {
                writeln!(
                    w,
                    r#"    <span class="i18n-text" data-lang="{}">{}</span>"#,
                    EscapeAttr(lang),
                    EscapeHtml(text)
                )?;
            }
        }
        writeln!(w, "  </div>")?;
    }

    if !story.comments.is_empty() {
        writeln!(w, r#"  <div class="story-section story-comments">"#)?;
        writeln!(w, r#"    <div class="story-label">HN Voices</div>"#)?;
        for (i, comment) in story.comments.iter().enumerate() {
            writeln!(w, r#"    <div class="comment">"#)?;
            writeln!(
                w,
                r#"      <div class="comment-text">"{}"</div>"#,
                EscapeHtml(&comment.text)
            )?;
            for (lang, translation) in &story.i18n {
                if let Some(text) = translation.comments.get(i).filter(|t| !t.is_empty()) {
                    writeln!(
                        w,
                        r#"      <div class="comment-i18n" data-lang="{}">{}</div>"#,
                        EscapeAttr(lang),
                        EscapeHtml(text)
                    )?;
                }
            }
            writeln!(
                w,
                r#"      <div class="comment-author">-- {}</div>"#,
                EscapeHtml(&comment.by)
            )?;
            writeln!(w, "    </div>")?;
        }
        writeln!(w, "  </div>")?;
    }

    if !story.tags.is_empty() {
        write!(w, r#"  <div class="tags">"#)?;
        for tag in &story.tags {
            write!(w, r#"<span class="tag">#{}</span>"#, EscapeHtml(tag))?;
        }
        writeln!(w, "</div>")?;
    }
    writeln!(w, "</article>")
}

/// Writes one digest as a `<section>`: its date, vibe, highlights, and
/// stories.
pub fn write_digest<W: Write>(w: &mut W, digest: &Digest) -> fmt::Result {
    writeln!(w, r#"<section class="digest">"#)?;
    writeln!(w, r#"<div class="digest-header">"#)?;
    writeln!(
        w,
        r#"  <div class="digest-date">{}</div>"#,
        EscapeHtml(&display_date(&digest.date))
    )?;
    if !digest.vibe.is_empty() {
        writeln!(w, r#"  <div class="digest-vibe">{}</div>"#, EscapeHtml(&digest.vibe))?;
    }
    writeln!(w, "</div>")?;
    if !digest.highlights.is_empty() {
        writeln!(w, r#"<ul class="digest-highlights">"#)?;
        for highlight in &digest.highlights {
            writeln!(w, "  <li>{}</li>", EscapeHtml(highlight))?;
        }
        writeln!(w, "</ul>")?;
    }
    for story in &digest.stories {
        write_story(w, story, &digest.date)?;
    }
    writeln!(w, "</section>")
}

/// Writes the page's main content: every digest in order, then the link to
/// the sibling page, if any.
pub fn write_content<W: Write>(w: &mut W, digests: &[Digest], link: Option<&PageLink>) -> fmt::Result {
    for digest in digests {
        write_digest(w, digest)?;
    }
    if let Some(link) = link {
        writeln!(
            w,
            r#"<a href="{}" class="archive-link">{}</a>"#,
            EscapeAttr(&link.href),
            EscapeHtml(&link.label)
        )?;
    }
    Ok(())
}

/// Writes the sidebar: one heading per day, and under it a link to every
/// story with an anchor.
pub fn write_sidebar<W: Write>(w: &mut W, digests: &[Digest]) -> fmt::Result {
    let mut current_day = None;
    for digest in digests {
        if current_day != Some(digest.day()) {
            current_day = Some(digest.day());
            writeln!(w, r#"<div class="sidebar-date">{}</div>"#, EscapeHtml(digest.day()))?;
        }
        for story in &digest.stories {
            let Some(anchor) = story_anchor(story.id, &digest.date) else {
                continue;
            };
            writeln!(
                w,
                r##"<a href="#{}">{}</a>"##,
                EscapeAttr(&anchor),
                EscapeHtml(&truncate(&story.title, SIDEBAR_TITLE_CHARS))
            )?;
        }
    }
    Ok(())
}

fn truncate(text: &str, max: usize) -> String {
    match text.chars().count() > max {
        true => format!("{}...", text.chars().take(max).collect::<String>()),
        false => text.to_owned(),
    }
}

/// The page shell. Templates see two fields, `.content` and `.sidebar`, both
/// already-rendered HTML.
pub struct PageTemplate(Template);

impl PageTemplate {
    /// Parses a page shell.
    pub fn parse(source: &str) -> Result<PageTemplate> {
        // gtmpl's lexer never returns on an action missing its `}}`.
        if let Some(line) = unclosed_action(source) {
            return Err(Error::ParseTemplate(format!("unclosed action on line {}", line)));
        }
        let mut template = Template::default();
        template
            .parse(source)
            .map_err(|e| Error::ParseTemplate(e.to_string()))?;
        Ok(PageTemplate(template))
    }

    /// The shell bundled with the crate.
    pub fn builtin() -> Result<PageTemplate> {
        PageTemplate::parse(BUILTIN_TEMPLATE)
    }

    /// Substitutes `content` and `sidebar` into the shell.
    pub fn render(&self, content: &str, sidebar: &str) -> Result<String> {
        let value = Value::from(&Fragments { content, sidebar });
        let context = gtmpl::Context::from(value).map_err(|e| Error::Template(e.to_string()))?;

        let mut out: Vec<u8> = Vec::new();
        self.0
            .execute(&mut out, &context)
            .map_err(|e| Error::Template(e.to_string()))?;
        Ok(String::from_utf8(out)?)
    }

    /// Renders a full page for `digests`, linking to the sibling page if
    /// `link` is given.
    pub fn render_page(&self, digests: &[Digest], link: Option<&PageLink>) -> Result<String> {
        let mut content = String::new();
        write_content(&mut content, digests, link)?;
        let mut sidebar = String::new();
        write_sidebar(&mut sidebar, digests)?;
        self.render(&content, &sidebar)
    }
}

type Result<T> = std::result::Result<T, Error>;

/// Returned when a page can't be rendered.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the page shell isn't a valid template.
    #[error("parsing page template: {0}")]
    ParseTemplate(String),

    /// Returned when executing the page shell fails.
    #[error("rendering page template: {0}")]
    Template(String),

    /// Returned when the template produces bytes that aren't UTF-8.
    #[error("page template produced invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Returned when writing a fragment fails.
    #[error("writing HTML: {0}")]
    Fmt(#[from] fmt::Error),
}

/// Returns the 1-based line of the first `{{` with no `}}` after it.
fn unclosed_action(source: &str) -> Option<usize> {
    let mut rest = source;
    let mut offset = 0;
    while let Some(open) = rest.find("{{") {
        let start = offset + open;
        let after = &rest[open + 2..];
        match after.find("}}") {
            Some(close) => {
                offset = start + 2 + close + 2;
                rest = &after[close + 2..];
            }
            None => return Some(source[..start].matches('\n').count() + 1),
        }
    }
    None
}
