#![allow(missing_docs, clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use serde_json::json;
use torchlight_core::{
    Block, CacheDriver, Config, FileCache, Manager, RenderContext, SimpleSwapProcessor,
    ThemeSetting,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

struct Highlighter;

impl Respond for Highlighter {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        let blocks: Vec<_> = body["blocks"]
            .as_array()
            .unwrap()
            .iter()
            .map(|b| {
                json!({
                    "id": b["id"],
                    "highlighted": format!("<span>{}</span>", b["code"].as_str().unwrap()),
                    "wrapped": "<pre>wrapped</pre>",
                    "classes": format!("torchlight {}", b["theme"].as_str().unwrap()),
                })
            })
            .collect();
        ResponseTemplate::new(200).set_body_json(json!({ "duration": 3, "blocks": blocks }))
    }
}

async fn highlighter() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/highlight"))
        .and(header("authorization", "Bearer token"))
        .respond_with(Highlighter)
        .mount(&server)
        .await;
    server
}

fn config(server: &MockServer, cache_dir: &std::path::Path) -> Config {
    Config {
        token: Some("token".into()),
        host: server.uri(),
        cache: CacheDriver::File,
        cache_dir: Some(cache_dir.to_path_buf()),
        request_chunk_size: 2,
        ..Config::default()
    }
}

fn page(blocks: &[&Block]) -> String {
    blocks
        .iter()
        .map(|b| {
            format!(
                "<!-- {} --><code class=\"{}\">{}</code><!-- {} -->",
                b.placeholder(Some("begin")),
                b.placeholder(Some("classes")),
                b.placeholder(None),
                b.placeholder(Some("end")),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[tokio::test]
async fn file_cache_is_shared_between_managers() -> anyhow::Result<()> {
    let server = highlighter().await;
    let cache_dir = tempfile::tempdir()?;

    let mut outputs = Vec::new();
    for _ in 0..2 {
        let manager = Manager::new(config(&server, cache_dir.path()))?;
        let mut context = RenderContext::new();
        let blocks: Vec<Block> = (0..3)
            .map(|i| {
                manager
                    .block()
                    .with_language("php")
                    .with_theme("nord")
                    .with_code(&format!("echo {i};"))
            })
            .collect();
        let content = page(&blocks.iter().collect::<Vec<_>>());
        for block in blocks {
            context.register(block);
        }
        outputs.push(manager.render(&mut context, &content).await?);
    }

    // Three blocks in chunks of two, then everything from disk
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
    assert_eq!(outputs[0], outputs[1]);
    assert_eq!(
        outputs[0],
        "<code class=\"torchlight nord\"><span>echo 0;</span></code>\n\
         <code class=\"torchlight nord\"><span>echo 1;</span></code>\n\
         <code class=\"torchlight nord\"><span>echo 2;</span></code>"
    );

    let stored = FileCache::new(cache_dir.path());
    assert!(std::fs::read_dir(stored.root())?.count() >= 3);
    Ok(())
}

#[tokio::test]
async fn dual_theme_render_with_post_processing() -> anyhow::Result<()> {
    let server = highlighter().await;
    let cache_dir = tempfile::tempdir()?;
    let config = Config {
        theme: ThemeSetting::List(vec!["github-dark".into(), "github-light".into()]),
        ..config(&server, cache_dir.path())
    };

    let mut manager = Manager::with_cache(config, Arc::new(torchlight_core::MemoryCache::new()))?;
    manager.add_post_processor(SimpleSwapProcessor::new([("echo", "print")]));

    let block = manager.block_with_id("component").with_language("php").with_code("echo 1;");
    let content = format!("<pre>{}</pre>", page(&[&block]));
    let mut context = RenderContext::new();
    context.register(block);

    let html = manager.render(&mut context, &content).await?;

    assert_eq!(
        html,
        "<pre><code class=\"torchlight github-dark\"><span>print 1;</span></code>\
         <code class=\"torchlight github-light\"><span>print 1;</span></code></pre>"
    );
    Ok(())
}
