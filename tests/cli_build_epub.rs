use std::fs;
use std::path::Path;

use predicates::prelude::*;

const URL: &str = "https://www.economist.com/europe/2024/01/04/a-cold-winter";

fn write_inputs(root: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(root.join("articles"))?;
    fs::write(
        root.join("articles/a-cold-winter.json"),
        serde_json::to_vec_pretty(&serde_json::json!({
            "title": "A cold winter",
            "subtitle": "Energy prices bite",
            "content": [
                "<p>Prices <a href=\"https://other.com/x\">rose</a></p>",
                "<p>For subscribers only</p>",
            ],
            "url": URL,
        }))?,
    )?;
    fs::write(
        root.join("state.json"),
        serde_json::to_vec_pretty(&serde_json::json!({
            "title": "The Weekly",
            "date": "January 6th 2024",
            "urls": [URL, "https://www.economist.com/business/2024/01/04/unscraped"],
            "articles": {
                URL: {
                    "title": "A cold winter",
                    "subtitle": "Energy prices bite",
                    "filename": "a-cold-winter.json",
                }
            }
        }))?,
    )?;
    Ok(())
}

#[test]
fn build_epub_writes_container_and_archive() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let root = temp.path();
    write_inputs(root)?;

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("magazine-epub");
    cmd.current_dir(root)
        .args([
            "build-epub",
            "--state",
            "state.json",
            "--articles",
            "articles",
            "--out",
            "out",
            "--epub",
            "weekly.epub",
        ])
        .assert()
        .success();

    let article = fs::read_to_string(root.join("out/OEBPS/europe/2024/01/04/a-cold-winter.xhtml"))?;
    assert!(article.contains("<p>Prices <b>rose</b></p>"));
    assert!(!article.contains("subscribers"));
    assert!(root.join("out/OEBPS/manifest.opf").is_file());

    let mut archive = zip::ZipArchive::new(fs::File::open(root.join("weekly.epub"))?)?;
    assert_eq!(archive.by_index(0)?.name(), "mimetype");
    assert!(archive.by_name("OEBPS/toc.ncx").is_ok());
    Ok(())
}

#[test]
fn build_epub_refuses_existing_output() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let root = temp.path();
    write_inputs(root)?;
    fs::create_dir_all(root.join("out"))?;

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("magazine-epub");
    cmd.current_dir(root)
        .args([
            "build-epub",
            "--state",
            "state.json",
            "--articles",
            "articles",
            "--out",
            "out",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("output directory already exists"));
    Ok(())
}

#[test]
fn debug_clean_article_prints_sanitized_fragments() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    write_inputs(temp.path())?;

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("magazine-epub");
    let output = cmd
        .arg("debug-clean-article")
        .arg(temp.path().join("articles/a-cold-winter.json"))
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let fragments: Vec<String> = serde_json::from_slice(&output)?;
    assert_eq!(fragments.len(), 1);
    assert!(fragments[0].contains("https://other.com/x"));
    Ok(())
}

#[test]
fn structure_skips_unscraped_sections() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    write_inputs(temp.path())?;

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("magazine-epub");
    cmd.args(["structure", "--state"])
        .arg(temp.path().join("state.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"title\": \"Europe\""))
        .stdout(predicate::str::contains("Business").not());
    Ok(())
}

#[test]
fn rust_log_debug_emits_parsed_cli_to_stderr() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    write_inputs(temp.path())?;

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("magazine-epub");
    cmd.env("RUST_LOG", "debug")
        .args(["structure", "--state"])
        .arg(temp.path().join("state.json"))
        .assert()
        .success()
        .stderr(predicate::str::contains("parsed cli"));
    Ok(())
}

#[test]
fn default_log_level_hides_debug_lines() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    write_inputs(temp.path())?;

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("magazine-epub");
    cmd.env_remove("RUST_LOG")
        .args(["structure", "--state"])
        .arg(temp.path().join("state.json"))
        .assert()
        .success()
        .stderr(predicate::str::contains("parsed cli").not());
    Ok(())
}
