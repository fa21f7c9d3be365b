use super::*;
use crate::{
    action::{Action, ActionConfig},
    interaction::Step,
};
use shared::{domain::StepName, error::ActionError};
use std::{
    env,
    time::{SystemTime, UNIX_EPOCH},
};

struct Probe;

impl Action for Probe {
    fn invoke(&mut self, method: &str, _context: &Context) -> Result<(), ActionError> {
        match method {
            "test" => Ok(()),
            _ => Err(ActionError::UnknownMethod),
        }
    }
}

fn registry() -> InteractionRegistry {
    let actions = ActionRegistry::new();
    actions.register("test", || Probe, ActionConfig::new());
    InteractionRegistry::new(Rc::new(actions), GlobalTargets::default())
}

fn mousedown(action: &str) -> InteractionSteps {
    InteractionSteps::new().with_phase(StepName::Start, vec![Step::new("mousedown", action)])
}

#[test]
fn register_and_get_ignore_case() {
    let registry = registry();
    registry.register("My-Test", mousedown("test:abc"));

    assert!(registry.get("my-test").is_some());
    assert!(registry.get(" MY-TEST ").is_some());
    assert!(registry.get("sss").is_none());
    assert_eq!(registry.names(), vec!["my-test".to_string()]);

    registry.unregister("MY-test");
    assert!(!registry.contains("my-test"));
}

#[test]
fn create_builds_a_fresh_context() {
    let registry = registry();
    registry.register("my-test", mousedown("test:abc"));

    let interaction = registry
        .create("my-test", None)
        .expect("create")
        .expect("registered");
    let context = interaction.context().expect("context");
    assert!(context.get_action("test").is_some());
}

#[test]
fn create_uses_the_supplied_context() {
    let registry = registry();
    registry.register("test", mousedown("test:test"));
    let context = Context::new();

    let interaction = registry
        .create("test", Some(Rc::clone(&context)))
        .expect("create")
        .expect("registered");
    assert!(Rc::ptr_eq(&interaction.context().expect("context"), &context));
}

#[test]
fn create_unknown_name_is_none() {
    assert!(registry().create("sss", None).expect("create").is_none());
}

#[test]
fn create_surfaces_unknown_actions() {
    let registry = registry();
    registry.register("broken", mousedown("missing:start"));

    let err = registry.create("broken", None).expect_err("unknown action");
    assert_eq!(err.to_string(), "There is no action named missing");
}

#[test]
fn factories_receive_context_and_registries() {
    let registry = registry();
    registry.register(
        "custom",
        InteractionTemplate::factory(|context, actions, globals| {
            context.set_cache("built-by", serde_json::json!("factory"));
            let interaction =
                Interaction::new(context, mousedown("test:test"), actions, globals.clone())?;
            interaction.bind(Some(Rc::clone(&globals.document)));
            Ok(interaction)
        }),
    );

    let interaction = registry
        .create("custom", None)
        .expect("create")
        .expect("registered");
    let context = interaction.context().expect("context");
    assert_eq!(
        context.get_cache("built-by"),
        Some(serde_json::json!("factory"))
    );
    assert!(interaction.is_bound());
}

#[test]
fn documents_register_as_steps() {
    let registry = registry();
    let doc = InteractionDocument::from_json_str(
        r#"{"start":[{"trigger":"mousedown","action":"test:test"}]}"#,
    )
    .expect("document");
    registry.register("from-doc", doc);

    assert!(matches!(
        registry.get("from-doc"),
        Some(InteractionTemplate::Steps(_))
    ));
    assert!(registry.create("from-doc", None).expect("create").is_some());
}

#[test]
fn preload_registers_documents_by_file_stem() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let root = env::temp_dir().join(format!("interaction_core_preload_{suffix}"));
    fs::create_dir_all(&root).expect("temp root");
    fs::write(
        root.join("Element-Active.toml"),
        "[[start]]\ntrigger = \"element:mouseenter\"\naction = \"test:test\"\n",
    )
    .expect("write toml");
    fs::write(
        root.join("legend-filter.json"),
        r#"{"start":[{"trigger":"legend:click","action":"test:test"}]}"#,
    )
    .expect("write json");
    fs::write(root.join("notes.txt"), "ignored").expect("write txt");

    let registry = registry();
    let settings = Settings {
        interaction_dirs: vec![root.clone()],
        ..Settings::default()
    };
    let loaded = registry.preload(&settings).expect("preload");

    assert_eq!(loaded, 2);
    assert_eq!(
        registry.names(),
        vec!["element-active".to_string(), "legend-filter".to_string()]
    );

    fs::remove_dir_all(root).expect("cleanup");
}

#[test]
fn preload_reports_broken_documents() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let root = env::temp_dir().join(format!("interaction_core_preload_broken_{suffix}"));
    fs::create_dir_all(&root).expect("temp root");
    fs::write(root.join("broken.toml"), "[[start]]\naction = \"test:test\"\n").expect("write");

    let settings = Settings {
        interaction_dirs: vec![root.clone()],
        ..Settings::default()
    };
    let err = registry().preload(&settings).expect_err("missing trigger");
    assert!(format!("{err:#}").contains("broken.toml"));

    fs::remove_dir_all(root).expect("cleanup");
}
