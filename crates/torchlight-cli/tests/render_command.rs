#![allow(missing_docs, clippy::expect_used, clippy::unwrap_used)]

use std::fs;

use tempfile::tempdir;

mod common;
use common::{highlighter, torchlight_cmd_for};

#[tokio::test]
async fn renders_fenced_blocks() -> anyhow::Result<()> {
    let home = tempdir()?;
    let server = highlighter().await;
    let input = home.path().join("doc.md");
    let output = home.path().join("doc.html");
    fs::write(&input, "# Title\n\n```php\necho 1;\n```\n\nDone.\n")?;

    torchlight_cmd_for(home.path(), &server)
        .args(["render", input.to_str().unwrap(), "--output", output.to_str().unwrap()])
        .args(["--theme", "nord"])
        .assert()
        .success();

    let html = fs::read_to_string(&output)?;
    assert_eq!(
        html,
        "# Title\n\n<pre><code data-theme=\"nord\" class=\"torchlight\" style=\"\">nord:echo 1;</code></pre>\n\nDone.\n"
    );
    Ok(())
}

#[tokio::test]
async fn renders_one_pre_per_theme() -> anyhow::Result<()> {
    let home = tempdir()?;
    let server = highlighter().await;
    fs::write(
        home.path().join("torchlight.toml"),
        "theme = [\"dark:github-dark\", \"light:github-light\"]\n",
    )?;

    let output = torchlight_cmd_for(home.path(), &server)
        .args(["render", "-"])
        .write_stdin("```js\nlet a;\n```\n")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let html = String::from_utf8(output)?;

    assert_eq!(
        html,
        "<pre><code data-theme=\"dark:github-dark\" class=\"torchlight\" style=\"\">dark:github-dark:let a;</code></pre>\
         <pre><code data-theme=\"light:github-light\" class=\"torchlight\" style=\"\">light:github-light:let a;</code></pre>\n"
    );
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
async fn documents_without_code_make_no_requests() -> anyhow::Result<()> {
    let home = tempdir()?;
    let server = highlighter().await;

    torchlight_cmd_for(home.path(), &server)
        .args(["render", "-"])
        .write_stdin("Just prose.\n")
        .assert()
        .success()
        .stdout("Just prose.\n");

    assert!(server.received_requests().await.unwrap().is_empty());
    Ok(())
}
