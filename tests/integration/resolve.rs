use diversity::core::DiversityError;
use diversity::registry::{CompoundRegistry, Registry};
use diversity::resolver::ComponentSet;
use diversity::test_utils::RegistryFixture;
use diversity::version::VersionRequirement;
use serde_json::json;
use std::sync::Arc;

use crate::common::{mock_api, serve_component};

fn identities(set: &diversity::resolver::ResolvedSet) -> Vec<String> {
    set.iter().map(|c| c.identity()).collect()
}

#[tokio::test]
async fn test_conflicting_versions_keep_highest() {
    let fixture = RegistryFixture::standard().unwrap();
    let registry: Arc<dyn Registry> = Arc::new(fixture.registry().unwrap());
    let root = registry.get_component("conflicted", None).await.unwrap().unwrap();

    let resolved = ComponentSet::new(registry).expand(&[root]).await.unwrap();

    assert_eq!(identities(&resolved), vec!["alpha:1.5.0", "beta:1.0.0", "conflicted:1.0.0"]);
    let discarded: Vec<String> = resolved.discarded().iter().map(|c| c.identity()).collect();
    assert_eq!(discarded, vec!["alpha:1.0.0"]);
}

#[tokio::test]
async fn test_several_roots_share_dependencies() {
    let fixture = RegistryFixture::standard().unwrap();
    let registry: Arc<dyn Registry> = Arc::new(fixture.registry().unwrap());
    let parent = registry.get_component("parent", None).await.unwrap().unwrap();
    let dummy = registry.get_component("dummy", None).await.unwrap().unwrap();
    let requirement = VersionRequirement::parse("<2.0").unwrap();
    let alpha = registry.get_component("alpha", Some(&requirement)).await.unwrap().unwrap();

    let resolved = ComponentSet::new(registry).expand(&[parent, dummy, alpha]).await.unwrap();
    assert_eq!(identities(&resolved), vec!["dummy:0.0.1", "parent:1.0.0", "alpha:1.5.0"]);
}

#[tokio::test]
async fn test_dependencies_resolve_across_registries() {
    let local = RegistryFixture::new().unwrap();
    local
        .add(
            "shell",
            "2.0.0",
            &json!({ "name": "shell", "version": "2.0.0", "dependencies": { "theme": "^1.2" } }),
        )
        .unwrap();

    let mut server = mock_api().await;
    serve_component(&mut server, "theme", "1.4.0", &json!({ "name": "theme", "version": "1.4.0" }), &[]).await;
    let remote = diversity::registry::RemoteApiRegistry::connect(diversity::registry::RemoteRegistryOptions::new(server.url()))
        .await
        .unwrap();

    let registry: Arc<dyn Registry> = Arc::new(
        CompoundRegistry::new()
            .with_registry(Arc::new(local.registry().unwrap()), Some("local"))
            .with_registry(Arc::new(remote), Some("remote")),
    );
    let shell = registry.get_component("shell", None).await.unwrap().unwrap();

    let resolved = ComponentSet::new(registry).expand(&[shell]).await.unwrap();
    assert_eq!(identities(&resolved), vec!["theme:1.4.0", "shell:2.0.0"]);
    assert_eq!(
        resolved.get("theme").unwrap().base_url().unwrap(),
        format!("{}/components/theme/1.4.0/files", server.url())
    );
}

#[tokio::test]
async fn test_unsatisfiable_dependency_names_requester() {
    let fixture = RegistryFixture::standard().unwrap();
    let registry: Arc<dyn Registry> = Arc::new(fixture.registry().unwrap());
    let weak = registry.get_component("weak-sauce", None).await.unwrap().unwrap();

    let err = ComponentSet::new(registry).expand(&[weak]).await.unwrap_err();
    match err.downcast_ref::<DiversityError>() {
        Some(DiversityError::UnresolvedDependency {
            requester,
            dependency,
            requirement,
        }) => {
            assert_eq!(requester, "weak-sauce:0.0.4");
            assert_eq!(dependency, "dummy");
            assert_eq!(requirement, ">0.0.1");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
