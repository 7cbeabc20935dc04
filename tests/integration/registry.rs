use diversity::engine::{Engine, EngineOptions, RenderContext};
use diversity::registry::{CompoundRegistry, FileMode, LocalRegistry, Registry};
use diversity::test_utils::RegistryFixture;
use diversity::version::VersionRequirement;
use semver::Version;
use serde_json::json;
use std::sync::Arc;

fn versions(list: &[&str]) -> Vec<Version> {
    list.iter().map(|v| Version::parse(v).unwrap()).collect()
}

#[tokio::test]
async fn test_installed_component_renders_from_its_new_home() {
    let source = RegistryFixture::new().unwrap();
    let dir = source
        .add(
            "card",
            "1.2.0",
            &json!({
                "name": "card",
                "version": "1.2.0",
                "template": "tpl/card.html",
                "script": ["card.js", "//cdn/lib.js"],
                "i18n": { "en": "i18n/en.json" }
            }),
        )
        .unwrap();
    source.add_file("card", "1.2.0", "tpl/card.html", "<div>{{ l10n | length }}</div>").unwrap();
    source.add_file("card", "1.2.0", "card.js", "var card;\n").unwrap();
    source.add_file("card", "1.2.0", "i18n/en.json", "{}").unwrap();

    let target = RegistryFixture::new().unwrap();
    let local = target.registry().unwrap();
    let installed = local.install(dir.to_str().unwrap(), false).await.unwrap();
    assert_eq!(installed.identity(), "card:1.2.0");

    let home = target.path().join("card/1.2.0");
    assert!(home.join("tpl/card.html").is_file());
    assert!(home.join("card.js").is_file());
    assert!(home.join("i18n/en.json").is_file());

    // The source can go; rendering only uses the installed copy
    drop(source);
    let registry: Arc<dyn Registry> = Arc::new(local);
    let card = registry.get_component("card", None).await.unwrap().unwrap();
    let engine = Engine::new(registry, EngineOptions::default());
    let html = engine.render(&card, &RenderContext::new().with_language("en"), &json!({})).await.unwrap();
    assert_eq!(html, "<div>1</div>");
}

#[tokio::test]
async fn test_uninstall_by_requirement() {
    let fixture = RegistryFixture::standard().unwrap();
    let local = fixture.registry().unwrap();

    let requirement = VersionRequirement::parse("<2.0").unwrap();
    let removed = local.uninstall("alpha", Some(&requirement)).await.unwrap();
    assert_eq!(removed, versions(&["1.5.0", "1.0.0"]));
    assert_eq!(local.list_versions("alpha").await.unwrap(), versions(&["2.0.0"]));

    let removed = local.uninstall("alpha", None).await.unwrap();
    assert_eq!(removed, versions(&["2.0.0"]));
    assert!(!fixture.path().join("alpha").exists());
    assert!(local.get_component("alpha", None).await.unwrap().is_none());
}

#[tokio::test]
async fn test_nowrite_mode_leaves_tree_untouched() {
    let fixture = RegistryFixture::standard().unwrap();
    let local = LocalRegistry::new(fixture.options().with_mode(FileMode::NoWrite)).unwrap();

    let removed = local.uninstall("beta", None).await.unwrap();
    assert_eq!(removed, versions(&["1.0.0"]));
    assert!(fixture.path().join("beta/1.0.0/diversity.json").is_file());
    assert!(local.get_component("beta", None).await.unwrap().is_some());
}

#[tokio::test]
async fn test_local_fallback_and_compound_listing() {
    let primary = RegistryFixture::new().unwrap();
    primary.add("alpha", "3.0.0", &json!({ "name": "alpha", "version": "3.0.0" })).unwrap();
    let secondary = RegistryFixture::standard().unwrap();

    // A local registry with a fallback answers misses from it
    let with_fallback = primary.registry().unwrap().with_fallback(Arc::new(secondary.registry().unwrap()));
    let requirement = VersionRequirement::parse("^1.0").unwrap();
    let alpha = with_fallback.get_component("alpha", Some(&requirement)).await.unwrap().unwrap();
    assert_eq!(alpha.identity(), "alpha:1.5.0");

    let compound = CompoundRegistry::new()
        .with_registry(Arc::new(primary.registry().unwrap()), Some("primary"))
        .with_registry(Arc::new(secondary.registry().unwrap()), Some("secondary"));
    assert_eq!(compound.list_versions("alpha").await.unwrap(), versions(&["3.0.0", "2.0.0", "1.5.0", "1.0.0"]));

    let listing = compound.list_components().await.unwrap();
    assert!(listing.contains_key("dummy"));
    assert_eq!(listing["alpha"].first(), Some(&Version::new(3, 0, 0)));
}
