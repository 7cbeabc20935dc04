use diversity::registry::{Registry, RemoteApiRegistry, RemoteRegistryOptions};
use serde_json::json;
use std::time::Duration;

use crate::common::{mock_api, serve_missing};

#[tokio::test]
async fn test_responses_are_cached_until_purged() {
    let mut server = mock_api().await;
    let versions = server
        .mock("GET", "/components/menu")
        .with_status(200)
        .with_body(json!(["1.0.0", "1.1.0"]).to_string())
        .expect(2)
        .create_async()
        .await;
    let spec = server
        .mock("GET", "/components/menu/1.1.0/files/diversity.json")
        .with_status(200)
        .with_body(json!({ "name": "menu", "version": "1.1.0" }).to_string())
        .expect(1)
        .create_async()
        .await;

    let remote = RemoteApiRegistry::connect(RemoteRegistryOptions::new(server.url())).await.unwrap();
    for _ in 0..3 {
        let menu = remote.get_component("menu", None).await.unwrap().unwrap();
        assert_eq!(menu.identity(), "menu:1.1.0");
    }

    let versions_url = format!("{}/components/menu", server.url());
    assert!(remote.cache_contains(&versions_url));
    remote.cache_purge(Some(versions_url.as_str()));
    assert!(!remote.cache_contains(&versions_url));
    assert_eq!(remote.list_versions("menu").await.unwrap().len(), 2);

    versions.assert_async().await;
    spec.assert_async().await;
}

#[tokio::test]
async fn test_expired_responses_are_refetched() {
    let mut server = mock_api().await;
    let versions = server
        .mock("GET", "/components/menu")
        .with_status(200)
        .with_body(json!(["1.0.0"]).to_string())
        .expect(2)
        .create_async()
        .await;

    let options = RemoteRegistryOptions::new(server.url()).with_ttl(Duration::from_millis(50));
    let remote = RemoteApiRegistry::connect(options).await.unwrap();

    remote.list_versions("menu").await.unwrap();
    remote.list_versions("menu").await.unwrap();
    tokio::time::sleep(Duration::from_millis(120)).await;
    remote.list_versions("menu").await.unwrap();

    versions.assert_async().await;
}

#[tokio::test]
async fn test_unknown_component_is_absent() {
    let mut server = mock_api().await;
    serve_missing(&mut server, "ghost").await;

    let remote = RemoteApiRegistry::connect(RemoteRegistryOptions::new(server.url())).await.unwrap();
    assert!(remote.get_component("ghost", None).await.unwrap().is_none());
    assert!(remote.list_versions("ghost").await.unwrap().is_empty());
    assert!(!remote.is_available("ghost", None).await.unwrap());
}
