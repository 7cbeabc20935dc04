use diversity::config::DiversityConfig;
use diversity::engine::{Engine, EngineOptions, MinificationOptions, RenderContext};
use diversity::registry::{CompoundRegistry, Registry, RemoteApiRegistry, RemoteRegistryOptions};
use diversity::test_utils::RegistryFixture;
use serde_json::json;
use std::sync::Arc;

use crate::common::{TestProject, mock_api, serve_component};

#[tokio::test]
async fn test_render_nests_remote_component_in_local_parent() {
    let fixture = RegistryFixture::standard().unwrap();
    let mut server = mock_api().await;
    serve_component(
        &mut server,
        "badge",
        "2.1.0",
        &json!({
            "name": "badge",
            "version": "2.1.0",
            "template": "badge.html",
            "script": ["badge.js"],
            "settings": { "type": "object", "properties": { "label": { "type": "string" } } }
        }),
        &[("badge.html", "<b>{{ settings.label }}</b>")],
    )
    .await;
    let remote = RemoteApiRegistry::connect(RemoteRegistryOptions::new(server.url())).await.unwrap();

    fixture
        .add(
            "frame",
            "1.0.0",
            &json!({
                "name": "frame",
                "version": "1.0.0",
                "template": "frame.html",
                "settings": {
                    "type": "object",
                    "properties": { "body": { "type": "object", "format": "diversity" } }
                }
            }),
        )
        .unwrap();
    fixture
        .add_file(
            "frame",
            "1.0.0",
            "frame.html",
            "<main>{{ settings.body.componentHTML }}</main>{% for s in scripts %}<script src=\"{{ s }}\"></script>{% endfor %}",
        )
        .unwrap();

    let registry: Arc<dyn Registry> = Arc::new(
        CompoundRegistry::new()
            .with_registry(Arc::new(fixture.registry().unwrap()), Some("local"))
            .with_registry(Arc::new(remote), Some("remote")),
    );
    let engine = Engine::new(registry.clone(), EngineOptions::default());
    let frame = registry.get_component("frame", None).await.unwrap().unwrap();
    let html = engine
        .render(
            &frame,
            &RenderContext::new(),
            &json!({ "body": { "component": "badge", "version": "^2.0", "settings": { "label": "New" } } }),
        )
        .await
        .unwrap();

    assert_eq!(
        html,
        format!(
            "<main><b>New</b></main><script src=\"{}/components/badge/2.1.0/files/badge.js\"></script>",
            server.url()
        )
    );
}

#[tokio::test]
async fn test_side_loaded_settings_schema() {
    let fixture = RegistryFixture::standard().unwrap();
    fixture
        .add(
            "shelf",
            "1.0.0",
            &json!({
                "name": "shelf",
                "version": "1.0.0",
                "template": "shelf.html",
                "settings": "schema.json"
            }),
        )
        .unwrap();
    fixture
        .add_file(
            "shelf",
            "1.0.0",
            "schema.json",
            &json!({
                "type": "object",
                "properties": {
                    "items": { "type": "array", "items": { "type": "object", "format": "diversity" } }
                }
            })
            .to_string(),
        )
        .unwrap();
    fixture
        .add_file("shelf", "1.0.0", "shelf.html", "{% for i in settings.items %}[{{ i.componentHTML }}]{% endfor %}")
        .unwrap();

    let registry: Arc<dyn Registry> = Arc::new(fixture.registry().unwrap());
    let engine = Engine::new(registry.clone(), EngineOptions::default());
    let shelf = registry.get_component("shelf", None).await.unwrap().unwrap();

    let html = engine
        .render(
            &shelf,
            &RenderContext::new(),
            &json!({ "items": [
                { "component": "child", "settings": { "title": "one" } },
                { "component": "dummy" }
            ] }),
        )
        .await
        .unwrap();
    assert_eq!(html, "[<span class=\"child\">one</span>][<p class=\"dummy\">dummy</p>]");
}

#[tokio::test]
async fn test_missing_side_schema_renders_unexpanded() {
    let fixture = RegistryFixture::standard().unwrap();
    fixture
        .add(
            "plain",
            "1.0.0",
            &json!({ "name": "plain", "version": "1.0.0", "template": "plain.html", "settings": "gone.json" }),
        )
        .unwrap();
    fixture.add_file("plain", "1.0.0", "plain.html", "{{ settings.x.component }}").unwrap();

    let registry: Arc<dyn Registry> = Arc::new(fixture.registry().unwrap());
    let engine = Engine::new(registry.clone(), EngineOptions::default());
    let plain = registry.get_component("plain", None).await.unwrap().unwrap();

    let html = engine.render(&plain, &RenderContext::new(), &json!({ "x": { "component": "child" } })).await.unwrap();
    assert_eq!(html, "child");
}

#[tokio::test]
async fn test_style_bundle_from_config() {
    let project = TestProject::with_config("[engine]\nvalidate_settings = false\n").unwrap();
    let mut config = DiversityConfig::load_from(project.config_path()).await.unwrap();
    config.minification = MinificationOptions {
        minify_css: true,
        ..config.minification
    };
    project
        .registry()
        .add(
            "styled",
            "1.0.0",
            &json!({
                "name": "styled",
                "version": "1.0.0",
                "template": "styled.html",
                "style": ["//fonts/cdn.css", "styled.css"],
                "dependencies": { "dummy": "0.0.1" }
            }),
        )
        .unwrap();
    project.registry().add_file("styled", "1.0.0", "styled.html", "{{ styles | join(sep=\" \") }}").unwrap();
    project.registry().add_file("styled", "1.0.0", "styled.css", "/* theme */\n.styled {\n  margin: 0;\n}\n").unwrap();

    let registry: Arc<dyn Registry> = Arc::new(config.build_registry().await.unwrap());
    let engine = config.build_engine(registry.clone()).unwrap();
    assert!(!engine.options().validate_settings);
    let styled = registry.get_component("styled", None).await.unwrap().unwrap();

    let html = engine.render(&styled, &RenderContext::new(), &json!({})).await.unwrap();
    let styles: Vec<&str> = html.split(' ').collect();
    assert_eq!(styles[0], "//fonts/cdn.css");
    assert!(styles[1].starts_with("/minified/styles/"), "{html}");

    let bundle = config.minification.base_dir.join(styles[1].trim_start_matches("/minified/"));
    let content = std::fs::read_to_string(bundle).unwrap();
    assert!(content.contains(".dummy"));
    assert!(content.contains(".styled"));
}

#[tokio::test]
async fn test_concurrent_renders_share_engine() {
    let fixture = RegistryFixture::standard().unwrap();
    let registry: Arc<dyn Registry> = Arc::new(fixture.registry().unwrap());
    let engine = Arc::new(Engine::new(registry.clone(), EngineOptions::default()));
    let child = registry.get_component("child", None).await.unwrap().unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let engine = Arc::clone(&engine);
        let child = Arc::clone(&child);
        handles.push(tokio::spawn(async move {
            engine.render(&child, &RenderContext::new(), &json!({ "title": format!("t{}", i % 2) })).await
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let html = handle.await.unwrap().unwrap();
        assert_eq!(html, format!("<span class=\"child\">t{}</span>", i % 2));
    }
}
