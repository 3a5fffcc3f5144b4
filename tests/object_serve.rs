//! Object serving through a running router with a filesystem bucket.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;

mod common;

const DOMAIN: &str = "files.example.com";

async fn bucket_dir() -> PathBuf {
    let root = std::env::temp_dir().join(format!("edge-router-it-{}", uuid::Uuid::new_v4()));
    tokio::fs::create_dir_all(root.join("releases")).await.unwrap();
    tokio::fs::write(root.join("releases/app.zip"), b"PK-archive-bytes").await.unwrap();
    tokio::fs::write(root.join("releases/notes.txt"), b"release notes").await.unwrap();
    root
}

fn object_config(root: &std::path::Path) -> String {
    format!(
        r#"
        domains = ["{DOMAIN}"]

        [objects]
        default_bucket = "releases"
        cache_control = "public, max-age=600"

        [buckets.releases]
        kind = "filesystem"
        root = "{root}"

        [[routes]]
        domain = "{DOMAIN}"
        path = "/app"
        type = "objectServe"
        target = "releases/app.zip"

        [[routes]]
        domain = "{DOMAIN}"
        path = "/notes"
        type = "objectServe"
        target = "releases/notes.txt"
        cacheControl = "no-cache"

        [[routes]]
        domain = "{DOMAIN}"
        path = "/escape"
        type = "objectServe"
        target = "../../etc/passwd"

        [[routes]]
        domain = "{DOMAIN}"
        path = "/gone"
        type = "objectServe"
        target = "releases/removed.bin"
        "#,
        root = root.display()
    )
}

#[tokio::test]
async fn test_miss_then_hit_with_download_headers() {
    let root = bucket_dir().await;
    let (addr, shutdown) = common::start_server(common::config(&object_config(&root))).await;
    let client = common::client();

    let res = client
        .get(format!("http://{addr}/app"))
        .header("host", DOMAIN)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-cache-status"], "MISS");
    assert_eq!(res.headers()["content-type"], "application/zip");
    assert_eq!(res.headers()["content-length"], "16");
    assert_eq!(res.headers()["cache-control"], "public, max-age=600");
    assert_eq!(
        res.headers()["content-disposition"],
        "attachment; filename=\"app.zip\""
    );
    assert!(res.headers().get("etag").is_some());
    assert_eq!(res.bytes().await.unwrap(), "PK-archive-bytes");

    // The cache write is detached; give it a moment to land.
    let mut status = String::new();
    for _ in 0..20 {
        let res = client
            .get(format!("http://{addr}/app"))
            .header("host", DOMAIN)
            .send()
            .await
            .unwrap();
        status = res.headers()["x-cache-status"].to_str().unwrap().to_string();
        let body = res.bytes().await.unwrap();
        assert_eq!(body, "PK-archive-bytes");
        if status == "HIT" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    assert_eq!(status, "HIT");

    shutdown.trigger();
    tokio::fs::remove_dir_all(&root).await.unwrap();
}

#[tokio::test]
async fn test_text_is_inline_with_route_cache_control() {
    let root = bucket_dir().await;
    let (addr, shutdown) = common::start_server(common::config(&object_config(&root))).await;

    let res = common::client()
        .get(format!("http://{addr}/notes"))
        .header("host", DOMAIN)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "text/plain; charset=utf-8");
    assert_eq!(res.headers()["cache-control"], "no-cache");
    assert!(res.headers().get("content-disposition").is_none());
    assert_eq!(res.text().await.unwrap(), "release notes");

    shutdown.trigger();
    tokio::fs::remove_dir_all(&root).await.unwrap();
}

#[tokio::test]
async fn test_head_returns_headers_only() {
    let root = bucket_dir().await;
    let (addr, shutdown) = common::start_server(common::config(&object_config(&root))).await;

    let res = common::client()
        .head(format!("http://{addr}/app"))
        .header("host", DOMAIN)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-length"], "16");
    assert!(res.headers().get("x-cache-status").is_none());
    assert!(res.bytes().await.unwrap().is_empty());

    shutdown.trigger();
    tokio::fs::remove_dir_all(&root).await.unwrap();
}

#[tokio::test]
async fn test_traversal_key_is_rejected() {
    let root = bucket_dir().await;
    let (addr, shutdown) = common::start_server(common::config(&object_config(&root))).await;

    let res = common::client()
        .get(format!("http://{addr}/escape"))
        .header("host", DOMAIN)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["type"], "validation_error");

    shutdown.trigger();
    tokio::fs::remove_dir_all(&root).await.unwrap();
}

#[tokio::test]
async fn test_missing_object_names_the_key() {
    let root = bucket_dir().await;
    let (addr, shutdown) = common::start_server(common::config(&object_config(&root))).await;

    let res = common::client()
        .get(format!("http://{addr}/gone"))
        .header("host", DOMAIN)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["key"], "releases/removed.bin");
    assert_eq!(body["type"], "not_found");

    shutdown.trigger();
    tokio::fs::remove_dir_all(&root).await.unwrap();
}
