#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use serde_json::json;
use std::fs;
use std::path::Path;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

#[allow(dead_code)]
pub const CMD_TIMEOUT: Duration = Duration::from_secs(15);

const ENV_KEYS: &[&str] = &[
    "TORCHLIGHT_TOKEN",
    "TORCHLIGHT_THEME",
    "TORCHLIGHT_BUST",
    "TORCHLIGHT_OPTIONS",
    "TORCHLIGHT_HOST",
    "TORCHLIGHT_REQUEST_TIMEOUT",
    "TORCHLIGHT_REQUEST_CHUNK_SIZE",
    "TORCHLIGHT_CACHE_SECONDS",
    "TORCHLIGHT_TAB_WIDTH",
    "TORCHLIGHT_CACHE",
    "TORCHLIGHT_ENV",
];

/// Create a `torchlight` command isolated in `home`.
///
/// Uses `home/torchlight.toml` (created empty when missing) and caches under
/// `home/cache`. Inherited `TORCHLIGHT_*` variables are cleared.
#[allow(dead_code)]
pub fn torchlight_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("torchlight"));
    cmd.timeout(CMD_TIMEOUT);
    for key in ENV_KEYS {
        cmd.env_remove(key);
    }

    let config = home.join("torchlight.toml");
    if !config.exists() {
        fs::write(&config, "").expect("failed to write test config");
    }
    cmd.env("TORCHLIGHT_CONFIG", &config);
    cmd.env("TORCHLIGHT_CACHE_DIR", home.join("cache"));
    cmd
}

/// Same as [`torchlight_cmd`], pointed at `server` with a token.
#[allow(dead_code)]
pub fn torchlight_cmd_for(home: &Path, server: &MockServer) -> Command {
    let mut cmd = torchlight_cmd(home);
    cmd.env("TORCHLIGHT_TOKEN", "test-token");
    cmd.env("TORCHLIGHT_HOST", server.uri());
    cmd
}

/// Echoes each block back as `<theme>:<code>` output.
#[allow(dead_code)]
pub struct EchoHighlighter;

impl Respond for EchoHighlighter {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        let blocks: Vec<_> = body["blocks"]
            .as_array()
            .unwrap()
            .iter()
            .map(|b| {
                let theme = b["theme"].as_str().unwrap();
                let code = b["code"].as_str().unwrap();
                json!({
                    "id": b["id"],
                    "highlighted": format!("{theme}:{code}"),
                    "wrapped": format!("<pre class=\"{theme}\">{code}</pre>"),
                    "classes": "torchlight",
                    "styles": "",
                    "attrs": {"data-theme": theme},
                })
            })
            .collect();
        ResponseTemplate::new(200).set_body_json(json!({ "blocks": blocks }))
    }
}

/// Start a mock highlighter.
#[allow(dead_code)]
pub async fn highlighter() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/highlight"))
        .respond_with(EchoHighlighter)
        .mount(&server)
        .await;
    server
}
