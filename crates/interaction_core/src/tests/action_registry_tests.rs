use super::*;
use crate::context::Context;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared::error::ActionError;

#[derive(Default, Serialize, Deserialize)]
struct Highlight {
    color: String,
}

impl Action for Highlight {
    fn init(&mut self, config: &ActionConfig) -> Result<(), serde_json::Error> {
        config.apply_to(self)
    }

    fn invoke(&mut self, method: &str, context: &Context) -> Result<(), ActionError> {
        match method {
            "highlight" => {
                context.set_cache("color", json!(self.color));
                Ok(())
            }
            _ => Err(ActionError::UnknownMethod),
        }
    }
}

#[test]
fn create_builds_and_initializes_registered_actions() {
    let registry = ActionRegistry::new();
    registry.register(
        "highlight",
        Highlight::default,
        ActionConfig::new().with("color", json!("red")),
    );
    let context = Context::new();

    let action = registry
        .create("highlight", &context)
        .expect("create")
        .expect("registered");
    action.invoke("highlight").expect("invoke");

    assert_eq!(context.get_cache("color"), Some(json!("red")));
    assert_eq!(context.action_count(), 1);
}

#[test]
fn create_returns_none_for_unknown_names() {
    let registry = ActionRegistry::new();
    let context = Context::new();
    assert!(registry.create("missing", &context).expect("create").is_none());
    assert_eq!(context.action_count(), 0);
}

#[test]
fn failed_init_leaves_no_action_behind() {
    let registry = ActionRegistry::new();
    registry.register(
        "highlight",
        Highlight::default,
        ActionConfig::new().with("color", json!(7)),
    );
    let context = Context::new();

    let err = registry.create("highlight", &context).expect_err("bad config");
    assert!(matches!(err, InteractionError::InvalidConfig { .. }));
    assert_eq!(context.action_count(), 0);
}

#[test]
fn register_overwrites_and_unregister_removes() {
    let registry = ActionRegistry::new();
    registry.register("highlight", Highlight::default, ActionConfig::new());
    registry.register(
        "highlight",
        Highlight::default,
        ActionConfig::new().with("color", json!("blue")),
    );

    let class = registry.get_action_class("highlight").expect("class");
    assert_eq!(class.default_config.get("color"), Some(&json!("blue")));
    assert_eq!(registry.names(), vec!["highlight".to_string()]);

    registry.unregister("highlight");
    assert!(!registry.contains("highlight"));
    assert!(registry.get_action_class("highlight").is_none());
}

#[test]
fn create_callback_names_the_action() {
    let context = Context::new();
    let action = ActionRegistry::create_callback(Rc::new(|_ctx: &Context| {}), &context);
    assert_eq!(action.name(), CALLBACK_ACTION_NAME);
    assert!(context.get_action(CALLBACK_ACTION_NAME).is_some());
}
