#![allow(missing_docs, clippy::expect_used, clippy::unwrap_used)]

use predicates::prelude::*;
use tempfile::tempdir;

mod common;
use common::{highlighter, torchlight_cmd, torchlight_cmd_for};

#[tokio::test]
async fn highlights_stdin() -> anyhow::Result<()> {
    let home = tempdir()?;
    let server = highlighter().await;

    torchlight_cmd_for(home.path(), &server)
        .args(["highlight", "-", "--language", "php", "--theme", "nord"])
        .write_stdin("    echo 1;\n")
        .assert()
        .success()
        .stdout("<pre class=\"nord\">echo 1;</pre>\n");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let auth = requests[0].headers.get("authorization").unwrap();
    assert_eq!(auth.to_str()?, "Bearer test-token");
    Ok(())
}

#[tokio::test]
async fn second_run_is_served_from_file_cache() -> anyhow::Result<()> {
    let home = tempdir()?;
    let server = highlighter().await;
    let file = home.path().join("hello.php");
    std::fs::write(&file, "echo \"hello\";\n")?;

    for _ in 0..2 {
        torchlight_cmd_for(home.path(), &server)
            .args(["highlight", file.to_str().unwrap(), "--language", "php"])
            .assert()
            .success()
            .stdout(predicate::str::contains("echo \"hello\";"));
    }

    assert_eq!(server.received_requests().await.unwrap().len(), 1);
    assert!(home.path().join("cache").read_dir()?.next().is_some());
    Ok(())
}

#[tokio::test]
async fn multiple_themes_print_one_block_each() -> anyhow::Result<()> {
    let home = tempdir()?;
    let server = highlighter().await;

    torchlight_cmd_for(home.path(), &server)
        .args(["highlight", "-", "-l", "js", "-t", "github-dark,github-light"])
        .write_stdin("let a;")
        .assert()
        .success()
        .stdout("<pre class=\"github-dark\">let a;</pre>\n<pre class=\"github-light\">let a;</pre>\n");
    Ok(())
}

#[test]
fn missing_token_fails_outside_production() {
    let home = tempdir().unwrap();

    torchlight_cmd(home.path())
        .args(["highlight", "-", "--language", "php"])
        .write_stdin("echo 1;")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No Torchlight token configured."));
}

#[test]
fn missing_token_falls_back_in_production() {
    let home = tempdir().unwrap();

    torchlight_cmd(home.path())
        .env("TORCHLIGHT_ENV", "production")
        .args(["highlight", "-", "--language", "php", "--theme", "material"])
        .write_stdin("echo \"hello world\";")
        .assert()
        .success()
        .stdout(
            "<pre><code data-lang='php' data-theme='material' class='torchlight'>echo &quot;hello world&quot;;</code></pre>\n",
        );
}

#[tokio::test]
async fn server_errors_fail_the_command() -> anyhow::Result<()> {
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let home = tempdir()?;
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    torchlight_cmd_for(home.path(), &server)
        .args(["highlight", "-", "--language", "php"])
        .write_stdin("echo 1;")
        .assert()
        .failure()
        .stderr(predicate::str::contains("500"));
    Ok(())
}
