use super::*;

use std::fs;
use uuid::Uuid;

fn create_cache_dir() -> PathBuf {
    let path = std::env::temp_dir().join(format!("dlcdeck-appinfo-{}", Uuid::new_v4()));
    fs::create_dir_all(&path).expect("create temp dir");
    path
}

fn write_doc(dir: &PathBuf, app_id: &str, doc: &Value) {
    fs::write(
        dir.join(format!("{app_id}.json")),
        serde_json::to_string(doc).expect("serialize doc"),
    )
    .expect("write doc");
}

#[tokio::test]
async fn should_load_a_cached_document() {
    let dir = create_cache_dir();
    write_doc(
        &dir,
        "10",
        &serde_json::json!({"common": {"name": "Base Game"}}),
    );

    let client = AppInfoCacheClient::new(dir.clone());
    let tree = client.query_app_info("10", None, None).await.expect("doc");
    assert_eq!(tree.get_str("common.name"), Some("Base Game"));
    assert!(client.query_app_info("11", None, None).await.is_none());

    let _ = fs::remove_dir_all(dir);
}

#[tokio::test]
async fn should_treat_a_stale_document_as_absent() {
    let dir = create_cache_dir();
    write_doc(
        &dir,
        "10",
        &serde_json::json!({
            "depots": {"branches": {"public": {"buildid": "5"}, "beta": {"buildid": 9}}}
        }),
    );
    let client = AppInfoCacheClient::new(dir.clone());

    assert!(client.query_app_info("10", None, Some(9)).await.is_none());
    assert!(client.query_app_info("10", None, Some(5)).await.is_some());
    assert!(client.query_app_info("10", None, None).await.is_some());
    // Branch-specific build ids are honored.
    assert!(client.query_app_info("10", Some("beta"), Some(9)).await.is_some());

    let _ = fs::remove_dir_all(dir);
}

#[tokio::test]
async fn should_treat_an_unparseable_document_as_absent() {
    let dir = create_cache_dir();
    fs::write(dir.join("10.json"), "{ nope").expect("write corrupt doc");

    let client = AppInfoCacheClient::new(dir.clone());
    assert!(client.query_app_info("10", None, None).await.is_none());

    let _ = fs::remove_dir_all(dir);
}

#[tokio::test]
async fn should_keep_documents_without_a_build_id_field() {
    let dir = create_cache_dir();
    write_doc(&dir, "10", &serde_json::json!({"common": {"name": "X"}}));

    let client = AppInfoCacheClient::new(dir.clone());
    assert!(client.query_app_info("10", None, Some(100)).await.is_some());

    let _ = fs::remove_dir_all(dir);
}
