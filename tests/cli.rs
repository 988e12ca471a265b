use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use hndigest::model::Digest;
use hndigest::parser;

type Result<T = ()> = std::result::Result<T, Box<dyn std::error::Error>>;

const DATED: &str = "\
#+DATE: 2025-12-15T11:00:00Z

* Stories

** Foo :ai:
:PROPERTIES:
:ID:       123
:POINTS:   10
:END:

*** TLDR
Foo happened.

*** Comments

**** bob
nice
";

fn hndigest(dir: &Path, args: &[&str], stdin: Option<&str>) -> Result<Output> {
    let mut child = Command::new(env!("CARGO_BIN_EXE_hndigest"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;
    if let Some(mut pipe) = child.stdin.take() {
        // the command may exit before reading its input
        match pipe.write_all(stdin.unwrap_or_default().as_bytes()) {
            Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => return Err(e.into()),
            _ => {}
        }
    }
    Ok(child.wait_with_output()?)
}

#[test]
fn build_skips_undated_files_and_writes_output() -> Result {
    let dir = tempfile::tempdir()?;
    fs::create_dir(dir.path().join("digests"))?;
    fs::write(dir.path().join("digests/15-1100.org"), DATED)?;
    fs::write(dir.path().join("digests/undated.org"), "* Stories\n** Bar\n")?;

    let out = hndigest(
        dir.path(),
        &["build", "digests", "-o", "site/index.html", "--days", "0"],
        None,
    )?;
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("undated.org"));
    assert!(stderr.contains("1 processed, 1 skipped"));

    let page = fs::read_to_string(dir.path().join("site/index.html"))?;
    assert!(page.contains(r#"id="s123-12151100""#));
    assert!(!page.contains("Bar"));
    Ok(())
}

#[test]
fn build_without_valid_input_fails() -> Result {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("undated.org"), "** Bar\n")?;
    let out = hndigest(dir.path(), &["build", "undated.org"], None)?;
    assert!(!out.status.success());
    Ok(())
}

#[test]
fn build_llms_index_to_stdout() -> Result {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("d.org"), DATED)?;
    let out = hndigest(dir.path(), &["build", "-f", "llms", "d.org"], None)?;
    assert!(out.status.success());
    assert_eq!(String::from_utf8(out.stdout)?, "2025-12-15|123|10|0|ai|Foo\n");
    Ok(())
}

#[test]
fn convert_to_json_and_back() -> Result {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("d.org"), DATED)?;

    let out = hndigest(dir.path(), &["convert", "--to", "json", "--delete", "d.org"], None)?;
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(!dir.path().join("d.org").exists());
    let json = Digest::from_json(&fs::read_to_string(dir.path().join("d.json"))?)?;
    assert_eq!(json, parser::parse(DATED));

    let out = hndigest(dir.path(), &["convert", "d.json"], None)?;
    assert!(out.status.success());
    let outline = parser::parse(&fs::read_to_string(dir.path().join("d.org"))?);
    assert_eq!(outline, json);
    Ok(())
}

#[test]
fn convert_dry_run_writes_nothing() -> Result {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("d.org"), DATED)?;
    let out = hndigest(dir.path(), &["-n", "convert", "--to", "json", "d.org"], None)?;
    assert!(out.status.success());
    assert!(!dir.path().join("d.json").exists());
    Ok(())
}

#[test]
fn convert_counts_undated_input_as_failure() -> Result {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("a.org"), DATED)?;
    fs::write(dir.path().join("b.org"), "** Bar\n")?;
    let out = hndigest(dir.path(), &["convert", "--to", "json", "a.org", "b.org"], None)?;
    assert!(!out.status.success());
    assert!(dir.path().join("a.json").exists());
    assert!(!dir.path().join("b.json").exists());
    Ok(())
}

#[test]
fn validate_reports_each_file() -> Result {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("good.org"), DATED)?;
    fs::write(dir.path().join("bad.json"), r#"{"date": 5, "stories": []}"#)?;

    let out = hndigest(dir.path(), &["validate", "good.org"], None)?;
    assert!(out.status.success());
    assert_eq!(String::from_utf8(out.stdout)?, "OK: good.org\n");

    let out = hndigest(dir.path(), &["validate", "good.org", "bad.json"], None)?;
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("FAIL: bad.json"));

    // a story without an `i18n` object only fails in strict mode
    fs::write(
        dir.path().join("loose.json"),
        r#"{"date": "2025-12-15T11:00:00Z", "stories": [{"id": 1}]}"#,
    )?;
    let out = hndigest(dir.path(), &["validate", "loose.json"], None)?;
    assert!(out.status.success());
    let out = hndigest(dir.path(), &["validate", "--strict", "loose.json"], None)?;
    assert!(!out.status.success());
    Ok(())
}

#[test]
fn translate_check_and_apply() -> Result {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("d.org");
    fs::write(&path, DATED)?;

    let out = hndigest(dir.path(), &["translate", "d.org", "--lang", "ja", "--json"], None)?;
    assert!(out.status.success());
    let report: serde_json::Value = serde_json::from_slice(&out.stdout)?;
    assert_eq!(
        report["translations_needed"][0]["missing_langs"][0],
        "ja[tldr,take,comments(0/1)]"
    );

    let payload = r#"{"translations": [{"id": 123, "i18n": {"JA": {"tldr": "起きた", "comments": ["いいね"]}}}]}"#;
    let out = hndigest(dir.path(), &["translate", "d.org", "--apply"], Some(payload))?;
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let digest = parser::parse(&fs::read_to_string(&path)?);
    assert_eq!(digest.stories[0].i18n["ja"].tldr, "起きた");
    assert_eq!(digest.stories[0].i18n["ja"].comments, vec!["いいね"]);
    Ok(())
}

#[test]
fn translate_apply_keeps_unknown_json_keys() -> Result {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("d.json");
    fs::write(
        &path,
        r#"{"date": "2025-12-15T11:00:00Z", "run": "nightly", "stories": [{"id": 1, "rank": 2, "i18n": {}}]}"#,
    )?;

    let payload = r#"{"translations": [{"id": 1, "i18n": {"ja": {"tldr": "起きた"}}}]}"#;
    let out = hndigest(dir.path(), &["translate", "d.json", "--apply"], Some(payload))?;
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let document: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
    assert_eq!(document["run"], "nightly");
    assert_eq!(document["stories"][0]["rank"], 2);
    assert_eq!(document["stories"][0]["i18n"]["ja"]["tldr"], "起きた");
    Ok(())
}

#[test]
fn translate_bad_payload_leaves_file_untouched() -> Result {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("d.org");
    fs::write(&path, DATED)?;

    let out = hndigest(dir.path(), &["translate", "d.org", "--apply"], Some("{not json"))?;
    assert!(!out.status.success());
    assert_eq!(fs::read_to_string(&path)?, DATED);
    Ok(())
}

#[test]
fn translate_refuses_markdown() -> Result {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("d.md");
    fs::write(&path, "# HN Digest 2025-12-15 11:00 UTC\n")?;
    let out = hndigest(dir.path(), &["translate", "d.md", "--apply"], Some("{}"))?;
    assert!(!out.status.success());
    Ok(())
}
