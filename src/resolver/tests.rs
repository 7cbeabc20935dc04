//! Tests for the resolver module.

use super::*;
use crate::component::ComponentOptions;
use crate::registry::LocalRegistry;
use crate::test_utils::{RegistryFixture, init_test_logging};
use crate::version::VersionRequirement;
use serde_json::json;

async fn root(registry: &LocalRegistry, name: &str, requirement: Option<&str>) -> Arc<Component> {
    let requirement = requirement.map(|r| VersionRequirement::parse(r).unwrap());
    registry.get_component(name, requirement.as_ref()).await.unwrap().unwrap()
}

fn names(set: &ResolvedSet) -> Vec<String> {
    set.iter().map(|c| c.identity()).collect()
}

#[tokio::test]
async fn test_unsatisfiable_dependency() {
    init_test_logging(None);
    let fixture = RegistryFixture::standard().unwrap();
    let registry = Arc::new(fixture.registry().unwrap());

    let weak = root(&registry, "weak-sauce", None).await;
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
        other => panic!("expected UnresolvedDependency, got {other:?}"),
    }
}

#[tokio::test]
async fn test_highest_version_wins() {
    let fixture = RegistryFixture::standard().unwrap();
    let registry = Arc::new(fixture.registry().unwrap());

    let conflicted = root(&registry, "conflicted", None).await;
    let set = ComponentSet::new(registry).expand(&[conflicted]).await.unwrap();

    assert_eq!(names(&set), vec!["alpha:1.5.0", "beta:1.0.0", "conflicted:1.0.0"]);
    assert_eq!(set.discarded().len(), 1);
    assert_eq!(set.discarded()[0].identity(), "alpha:1.0.0");
    assert_eq!(set.get("alpha").unwrap().version(), &Version::new(1, 5, 0));
}

#[tokio::test]
async fn test_root_can_be_displaced() {
    let fixture = RegistryFixture::standard().unwrap();
    let registry = Arc::new(fixture.registry().unwrap());

    let old_alpha = root(&registry, "alpha", Some("=1.0.0")).await;
    let beta = root(&registry, "beta", None).await;
    let set = ComponentSet::new(registry).expand(&[old_alpha, beta]).await.unwrap();

    assert_eq!(names(&set), vec!["alpha:1.5.0", "beta:1.0.0"]);
}

#[tokio::test]
async fn test_dependencies_precede_dependents() {
    let fixture = RegistryFixture::standard().unwrap();
    fixture
        .add("top", "1.0.0", &json!({"name": "top", "version": "1.0.0", "dependencies": {"parent": "*", "beta": "1.0.0"}}))
        .unwrap();
    let registry = Arc::new(fixture.registry().unwrap());

    let top = root(&registry, "top", None).await;
    let set = ComponentSet::new(registry).expand(&[top]).await.unwrap();

    assert_eq!(names(&set), vec!["dummy:0.0.1", "parent:1.0.0", "alpha:1.5.0", "beta:1.0.0", "top:1.0.0"]);
    for component in &set {
        let own = set.position(component.name()).unwrap();
        for dependency in component.dependencies() {
            assert!(set.position(&dependency.name).unwrap() < own, "{} before {}", dependency.name, component);
        }
    }
}

#[tokio::test]
async fn test_expansion_is_idempotent() {
    let fixture = RegistryFixture::standard().unwrap();
    let registry = Arc::new(fixture.registry().unwrap());
    let set = ComponentSet::new(registry.clone());

    let roots = vec![root(&registry, "conflicted", None).await, root(&registry, "parent", None).await];
    let first = set.expand(&roots).await.unwrap();
    let second = set.expand(&roots).await.unwrap();
    assert_eq!(first.identities(), second.identities());
}

#[tokio::test]
async fn test_shared_dependency_appears_once() {
    let fixture = RegistryFixture::standard().unwrap();
    let registry = Arc::new(fixture.registry().unwrap());

    let roots = vec![root(&registry, "parent", None).await, root(&registry, "dummy", None).await];
    let set = ComponentSet::new(registry).expand(&roots).await.unwrap();
    assert_eq!(names(&set), vec!["dummy:0.0.1", "parent:1.0.0"]);
    assert!(set.discarded().is_empty());
}

#[tokio::test]
async fn test_partial_version_requirement() {
    let fixture = RegistryFixture::standard().unwrap();
    let registry = Arc::new(fixture.registry().unwrap());

    let top = root(&registry, "toponent", None).await;
    let set = ComponentSet::new(registry).expand(&[top]).await.unwrap();
    assert_eq!(names(&set), vec!["sub_one:1.1.4", "toponent:1.1.0"]);
}

#[tokio::test]
async fn test_cycle_is_reported() {
    let fixture = RegistryFixture::new().unwrap();
    fixture.add("ping", "1.0.0", &json!({"name": "ping", "version": "1.0.0", "dependencies": {"pong": "1.0.0"}})).unwrap();
    fixture.add("pong", "1.0.0", &json!({"name": "pong", "version": "1.0.0", "dependencies": {"ping": "^1.0"}})).unwrap();
    let registry = Arc::new(fixture.registry().unwrap());

    let ping = root(&registry, "ping", None).await;
    let err = ComponentSet::new(registry).expand(&[ping]).await.unwrap_err();
    match err.downcast_ref::<DiversityError>() {
        Some(DiversityError::CircularDependency {
            chain,
        }) => assert_eq!(chain, "ping:1.0.0 -> pong:1.0.0 -> ping:1.0.0"),
        other => panic!("expected CircularDependency, got {other:?}"),
    }
}

#[tokio::test]
async fn test_direct_url_dependency() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/specs/remote-widget/diversity.json")
        .with_status(200)
        .with_body(json!({"name": "remote-widget", "version": "0.2.0", "script": ["w.js"]}).to_string())
        .create_async()
        .await;

    let fixture = RegistryFixture::new().unwrap();
    let url = format!("{}/specs/remote-widget/diversity.json", server.url());
    let page = Arc::new(
        Component::from_spec(
            json!({"name": "page", "version": "1.0.0", "dependencies": {"remote-widget": url}}),
            ComponentOptions::default(),
        )
        .unwrap(),
    );
    let registry = Arc::new(fixture.registry().unwrap());

    let set = ComponentSet::new(registry).expand(&[page]).await.unwrap();
    assert_eq!(names(&set), vec!["remote-widget:0.2.0", "page:1.0.0"]);
    assert_eq!(
        set.get("remote-widget").unwrap().script_urls(),
        vec![format!("{}/specs/remote-widget/w.js", server.url())]
    );
}

#[tokio::test]
async fn test_empty_roots() {
    let fixture = RegistryFixture::new().unwrap();
    let set = ComponentSet::new(Arc::new(fixture.registry().unwrap())).expand(&[]).await.unwrap();
    assert!(set.is_empty());
    assert_eq!(set.len(), 0);
}

#[tokio::test]
async fn test_displacing_winner_stays_behind_its_dependencies() {
    let fixture = RegistryFixture::new().unwrap();
    fixture.add("lib", "1.0.0", &json!({"name": "lib", "version": "1.0.0"})).unwrap();
    fixture
        .add("lib", "1.5.0", &json!({"name": "lib", "version": "1.5.0", "dependencies": {"base": "*"}}))
        .unwrap();
    fixture.add("base", "1.0.0", &json!({"name": "base", "version": "1.0.0"})).unwrap();
    fixture.add("plugin", "1.0.0", &json!({"name": "plugin", "version": "1.0.0", "dependencies": {"lib": "~>1.5"}})).unwrap();
    fixture
        .add(
            "app",
            "1.0.0",
            &json!({"name": "app", "version": "1.0.0", "dependencies": {"lib": "=1.0.0", "plugin": "*"}}),
        )
        .unwrap();
    let registry = Arc::new(fixture.registry().unwrap());

    let app = root(&registry, "app", None).await;
    let set = ComponentSet::new(registry).expand(&[app]).await.unwrap();

    // lib 1.5.0 takes the slot of lib 1.0.0 but still follows base
    assert_eq!(names(&set), vec!["base:1.0.0", "lib:1.5.0", "plugin:1.0.0", "app:1.0.0"]);
    assert_eq!(set.discarded()[0].identity(), "lib:1.0.0");
}
