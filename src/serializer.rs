//! Writes [`Digest`] records as outline documents. For well-formed records
//! this is the inverse of [`crate::parser::parse`], except that free text is
//! passed through [`escape`], which is display-safe but lossy: `*`, `[`, and
//! `]` come back as their full-width look-alikes.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::{
    model::{fold_languages, Comment, Digest, Story, Translation},
    tag,
};

/// The upstream API the digests are curated from.
pub const SOURCE: &str = "https://hacker-news.firebaseio.com/v0/";

/// Column at which the `:i18n:` marker of a translation container starts.
const MARKER_COLUMN: usize = 58;

/// Replaces characters with outline meaning by full-width look-alikes so free
/// text can never open a heading, a link, or a property drawer.
pub fn escape(text: &str) -> String {
    let escaped: String = text
        .chars()
        .map(|c| match c {
            '*' => '⁎',
            '[' => '［',
            ']' => '］',
            c => c,
        })
        .collect();
    if !escaped.lines().any(is_drawer_line) {
        return escaped;
    }
    escaped
        .split('\n')
        .map(|line| match is_drawer_line(line) {
            true => line.replacen(':', "：", 1),
            false => line.to_owned(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_drawer_line(line: &str) -> bool {
    let line = line.trim();
    line.eq_ignore_ascii_case(":PROPERTIES:") || line.eq_ignore_ascii_case(":END:")
}

/// Formats a digest date for display as `YYYY-MM-DD HH:MM UTC`. Dates that
/// don't parse are shown as-is with a `UTC` suffix.
pub fn display_date(date: &str) -> String {
    const FORMAT: &str = "%Y-%m-%d %H:%M UTC";
    if let Ok(parsed) = DateTime::parse_from_rfc3339(date) {
        return parsed.with_timezone(&Utc).format(FORMAT).to_string();
    }
    match NaiveDateTime::parse_from_str(date, "%Y-%m-%dT%H:%M:%S") {
        Ok(parsed) => parsed.format(FORMAT).to_string(),
        Err(_) => format!("{} UTC", date),
    }
}

/// Serializes a digest as an outline document.
pub fn serialize(digest: &Digest) -> String {
    let mut out = Outline::default();
    out.digest(digest);
    out.0
}

/// Serializes several digests into one outline document, in order.
pub fn serialize_all<'a>(digests: impl IntoIterator<Item = &'a Digest>) -> String {
    let mut out = Outline::default();
    for digest in digests {
        if !out.0.is_empty() {
            out.blank();
        }
        out.digest(digest);
    }
    out.0
}

#[derive(Default)]
struct Outline(String);

impl Outline {
    fn line(&mut self, line: &str) {
        self.0.push_str(line);
        self.0.push('\n');
    }

    fn blank(&mut self) {
        self.0.push('\n');
    }

    fn heading(&mut self, depth: usize, text: &str) {
        self.0.push_str(&"*".repeat(depth));
        if !text.is_empty() {
            self.0.push(' ');
            self.0.push_str(text);
        }
        self.0.push('\n');
    }

    fn text(&mut self, text: &str) {
        for line in escape(text).lines() {
            self.line(line);
        }
    }

    fn properties(&mut self, properties: &[(&str, String)]) {
        self.line(":PROPERTIES:");
        for (key, value) in properties {
            self.line(&format!("{:<10} {}", format!(":{}:", key), one_line(value)));
        }
        self.line(":END:");
    }

    fn digest(&mut self, digest: &Digest) {
        match digest.date.is_empty() {
            true => self.line("#+TITLE: HN Digest"),
            false => {
                self.line(&format!("#+TITLE: HN Digest {}", display_date(&digest.date)));
                self.line(&format!("#+DATE: {}", digest.date));
            }
        }
        self.line(&format!("#+SOURCE: {}", SOURCE));
        self.blank();

        self.heading(1, "Vibe");
        self.text(&digest.vibe);
        self.blank();

        if !digest.highlights.is_empty() {
            self.heading(1, "Highlights");
            for highlight in &digest.highlights {
                match escape(&one_line(highlight)) {
                    h if h.is_empty() => self.line("-"),
                    h => self.line(&format!("- {}", h)),
                }
            }
            self.blank();
        }

        self.heading(1, "Stories");
        self.blank();
        for story in &digest.stories {
            self.story(story);
        }
    }

    fn story(&mut self, story: &Story) {
        let title = escape(&one_line(&story.title));
        let tags = tag::format_group(&story.tags);
        match (title.is_empty(), tags.is_empty()) {
            (_, true) => self.heading(2, &title),
            (true, false) => self.heading(2, &tags),
            (false, false) => self.heading(2, &format!("{} {}", title, tags)),
        }

        let mut properties = vec![
            ("ID", story.id.to_string()),
            ("URL", story.url.clone()),
            ("HN_URL", story.hn_url.clone()),
            ("POINTS", story.points.to_string()),
            ("COMMENTS", story.comments_count.to_string()),
        ];
        if !story.by.is_empty() {
            properties.push(("BY", story.by.clone()));
        }
        if !story.time.is_empty() {
            properties.push(("TIME", story.time.clone()));
        }
        self.properties(&properties);
        self.blank();

        if !story.tldr.is_empty() {
            self.heading(3, "TLDR");
            self.text(&story.tldr);
            self.blank();
        }
        if !story.take.is_empty() {
            self.heading(3, "Take");
            self.text(&story.take);
            self.blank();
        }
        if !story.comments.is_empty() {
            self.heading(3, "Comments");
            self.blank();
            for comment in &story.comments {
                self.comment(comment);
            }
        }
        if !story.i18n.is_empty() {
            self.line(&format!("{:<width$}:{}:", "*** i18n", tag::RESERVED, width = MARKER_COLUMN));
            self.blank();
            for (lang, translation) in &fold_languages(story.i18n.clone()) {
                self.translation(lang, translation);
            }
        }
    }

    fn comment(&mut self, comment: &Comment) {
        self.heading(4, &escape(&one_line(&comment.by)));
        if let Some(id) = comment.id {
            self.properties(&[("COMMENT_ID", id.to_string())]);
        }
        self.text(&comment.text);
        self.blank();
    }

    fn translation(&mut self, lang: &str, translation: &Translation) {
        self.heading(4, lang);
        self.line(":PROPERTIES:");
        self.line(&format!(":LANG: {}", lang));
        self.line(":END:");
        self.blank();

        for (name, text) in [
            ("Title", &translation.title),
            ("TLDR", &translation.tldr),
            ("Take", &translation.take),
        ] {
            if !text.is_empty() {
                self.heading(5, name);
                self.text(text);
                self.blank();
            }
        }

        if !translation.comments.is_empty() {
            self.heading(5, "Comments");
            for comment in &translation.comments {
                self.list_item(comment);
            }
            self.blank();
        }
    }

    fn list_item(&mut self, text: &str) {
        let escaped = escape(text);
        let mut lines = escaped.lines();
        match lines.next() {
            Some(first) if !first.is_empty() => self.line(&format!("- {}", first)),
            _ => self.line("-"),
        }
        for line in lines {
            self.line(&format!("  {}", line));
        }
    }
}

fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    fn fixture_digest() -> Digest {
        let mut story = Story {
            id: 123,
            title: String::from("Postgres 18"),
            url: String::from("https://example.com/pg"),
            hn_url: String::from("https://news.ycombinator.com/item?id=123"),
            points: 450,
            comments_count: 210,
            by: String::from("someone"),
            tldr: String::from("Async IO lands.\n\nSecond paragraph."),
            take: String::from("Finally."),
            tags: vec![String::from("db"), String::from("release")],
            comments: vec![
                Comment {
                    by: String::from("bob"),
                    text: String::from("nice"),
                    id: Some(456),
                },
                Comment {
                    by: String::from("alice"),
                    text: String::from("also\nnice"),
                    id: None,
                },
            ],
            ..Story::default()
        };
        *story.translation_mut("ja") = Translation {
            title: String::from("ポスグレ18"),
            tldr: String::from("非同期IO"),
            take: String::new(),
            comments: vec![String::from("いいね"), String::from("これも\nいい")],
        };
        story.translation_mut("es").take = String::from("Por fin.");
        Digest {
            date: String::from("2025-12-15T11:00:00Z"),
            vibe: String::from("Quiet day."),
            highlights: vec![String::from("Postgres 18 ships")],
            stories: vec![
                story,
                Story {
                    id: 124,
                    title: String::from("Second"),
                    ..Story::default()
                },
            ],
        }
    }

    #[test]
    fn test_round_trip() {
        let digest = fixture_digest();
        assert_eq!(parse(&serialize(&digest)), digest);
    }

    #[test]
    fn test_serialize_is_stable() {
        let once = serialize(&fixture_digest());
        assert_eq!(serialize(&parse(&once)), once);
    }

    #[test]
    fn test_header() {
        let out = serialize(&fixture_digest());
        assert!(out.starts_with(
            "#+TITLE: HN Digest 2025-12-15 11:00 UTC\n\
             #+DATE: 2025-12-15T11:00:00Z\n\
             #+SOURCE: https://hacker-news.firebaseio.com/v0/\n\n\
             * Vibe\nQuiet day.\n\n\
             * Highlights\n- Postgres 18 ships\n\n\
             * Stories\n\n\
             ** Postgres 18 :db:release:\n"
        ));
    }

    #[test]
    fn test_property_order() {
        let out = serialize(&fixture_digest());
        assert!(out.contains(
            ":PROPERTIES:\n\
             :ID:       123\n\
             :URL:      https://example.com/pg\n\
             :HN_URL:   https://news.ycombinator.com/item?id=123\n\
             :POINTS:   450\n\
             :COMMENTS: 210\n\
             :BY:       someone\n\
             :END:\n"
        ));
        assert!(!out.contains(":TIME:"));
        assert!(out.contains("**** bob\n:PROPERTIES:\n:COMMENT_ID: 456\n:END:\nnice\n"));
        assert!(out.contains("**** alice\nalso\nnice\n"));
    }

    #[test]
    fn test_translation_layout() {
        let out = serialize(&fixture_digest());
        let container = format!("*** i18n{}:i18n:\n", " ".repeat(50));
        assert!(out.contains(&container));
        assert!(out.contains("**** ja\n:PROPERTIES:\n:LANG: ja\n:END:\n"));
        assert!(out.contains("***** Comments\n- いいね\n- これも\n  いい\n"));
    }

    #[test]
    fn test_empty_translation_is_kept() {
        let mut digest = fixture_digest();
        digest.stories[1].translation_mut("ko");
        let parsed = parse(&serialize(&digest));
        assert_eq!(parsed.stories[1].i18n["ko"], Translation::default());
    }

    #[test]
    fn test_reserved_tag_is_never_written() {
        let mut digest = fixture_digest();
        digest.stories[1].tags = vec![String::from("i18n"), String::from("web")];
        let out = serialize(&digest);
        assert!(out.contains("** Second :web:\n"));
        assert_eq!(parse(&out).stories[1].tags, vec!["web"]);
    }

    #[test]
    fn test_escape_free_text() {
        let mut digest = fixture_digest();
        digest.stories[0].tldr = String::from("* not a heading [link]");
        let parsed = parse(&serialize(&digest));
        assert_eq!(parsed.stories[0].tldr, "⁎ not a heading ［link］");
        assert_eq!(parsed.stories.len(), 2);
    }

    #[test]
    fn test_drawer_lines_in_free_text() {
        let mut digest = fixture_digest();
        digest.stories[0].tldr = String::from("Config looks like\n:PROPERTIES:\nfoo\n  :end:");
        let out = serialize(&digest);
        assert!(out.contains("Config looks like\n：PROPERTIES:\nfoo\n  ：end:\n"));
        let parsed = parse(&out);
        assert_eq!(parsed.stories.len(), 2);
        assert_eq!(parsed.stories[0].tldr, "Config looks like\n：PROPERTIES:\nfoo\n  ：end:");
        assert_eq!(parsed.stories[1].id, 124);
    }

    #[test]
    fn test_empty_highlight_survives() {
        let mut digest = fixture_digest();
        digest.highlights = vec![String::from("one"), String::new(), String::from("three")];
        let out = serialize(&digest);
        assert!(out.contains("* Highlights\n- one\n-\n- three\n"));
        assert_eq!(parse(&out).highlights, digest.highlights);
    }

    #[test]
    fn test_language_keys_written_lowercase() {
        let mut digest = fixture_digest();
        digest.stories[1].i18n.insert(
            String::from("KO"),
            Translation {
                tldr: String::from("x"),
                ..Translation::default()
            },
        );
        let out = serialize(&digest);
        assert!(out.contains("**** ko\n:PROPERTIES:\n:LANG: ko\n:END:\n"));
        assert_eq!(parse(&out).stories[1].i18n["ko"].tldr, "x");
    }

    #[test]
    fn test_comment_author_with_colon_words() {
        let mut digest = fixture_digest();
        digest.stories[0].comments[0].by = String::from("bob :x:");
        assert_eq!(parse(&serialize(&digest)).stories[0].comments[0].by, "bob :x:");
    }

    #[test]
    fn test_display_date() {
        assert_eq!(display_date("2025-12-15T11:00:00Z"), "2025-12-15 11:00 UTC");
        assert_eq!(display_date("2025-12-15T11:00:00+02:00"), "2025-12-15 09:00 UTC");
        assert_eq!(display_date("2025-12-15T11:00:00"), "2025-12-15 11:00 UTC");
        assert_eq!(display_date("yesterday"), "yesterday UTC");
    }

    #[test]
    fn test_serialize_all() {
        let digest = fixture_digest();
        let out = serialize_all([&digest, &digest]);
        assert_eq!(out.matches("#+TITLE:").count(), 2);
        assert_eq!(parse(&out).stories.len(), 4);
    }
}
