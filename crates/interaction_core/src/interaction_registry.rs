//! Named interaction templates.

use std::{
    cell::RefCell,
    collections::HashMap,
    fmt, fs,
    path::{Path, PathBuf},
    rc::Rc,
};

use anyhow::Context as _;
use shared::{error::InteractionError, protocol::InteractionDocument};
use tracing::{debug, info};

use crate::{
    action_registry::ActionRegistry,
    config::Settings,
    context::{Context, ContextRef},
    event_source::GlobalTargets,
    interaction::{Interaction, InteractionSteps},
};

pub type InteractionFactory = Rc<
    dyn Fn(ContextRef, &ActionRegistry, &GlobalTargets) -> Result<Interaction, InteractionError>,
>;

/// What `create` builds from: plain steps, or a factory for interactions
/// that need custom setup.
#[derive(Clone)]
pub enum InteractionTemplate {
    Steps(InteractionSteps),
    Factory(InteractionFactory),
}

impl InteractionTemplate {
    pub fn factory(
        factory: impl Fn(ContextRef, &ActionRegistry, &GlobalTargets) -> Result<Interaction, InteractionError>
        + 'static,
    ) -> Self {
        Self::Factory(Rc::new(factory))
    }
}

impl From<InteractionSteps> for InteractionTemplate {
    fn from(value: InteractionSteps) -> Self {
        Self::Steps(value)
    }
}

impl From<InteractionDocument> for InteractionTemplate {
    fn from(value: InteractionDocument) -> Self {
        Self::Steps(value.into())
    }
}

impl fmt::Debug for InteractionTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Steps(steps) => f.debug_tuple("Steps").field(steps).finish(),
            Self::Factory(_) => f.write_str("Factory"),
        }
    }
}

/// Registry keys ignore surrounding whitespace and case.
pub fn normalize_key(name: &str) -> String {
    name.trim().to_lowercase()
}

pub struct InteractionRegistry {
    actions: Rc<ActionRegistry>,
    globals: GlobalTargets,
    templates: RefCell<HashMap<String, InteractionTemplate>>,
}

impl InteractionRegistry {
    pub fn new(actions: Rc<ActionRegistry>, globals: GlobalTargets) -> Self {
        Self {
            actions,
            globals,
            templates: RefCell::new(HashMap::new()),
        }
    }

    pub fn actions(&self) -> &Rc<ActionRegistry> {
        &self.actions
    }

    pub fn globals(&self) -> &GlobalTargets {
        &self.globals
    }

    pub fn register(&self, name: &str, template: impl Into<InteractionTemplate>) {
        let key = normalize_key(name);
        debug!(interaction = %key, "registered interaction");
        self.templates.borrow_mut().insert(key, template.into());
    }

    pub fn unregister(&self, name: &str) {
        self.templates.borrow_mut().remove(&normalize_key(name));
    }

    pub fn get(&self, name: &str) -> Option<InteractionTemplate> {
        self.templates.borrow().get(&normalize_key(name)).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.borrow().contains_key(&normalize_key(name))
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.templates.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    /// Builds the interaction registered under `name` around `context`, or
    /// around a fresh context when none is given. `Ok(None)` if nothing is
    /// registered under `name`.
    pub fn create(
        &self,
        name: &str,
        context: Option<ContextRef>,
    ) -> Result<Option<Interaction>, InteractionError> {
        let Some(template) = self.get(name) else {
            return Ok(None);
        };
        let context = context.unwrap_or_else(Context::new);
        let interaction = match template {
            InteractionTemplate::Steps(steps) => {
                Interaction::new(context, steps, &self.actions, self.globals.clone())?
            }
            InteractionTemplate::Factory(factory) => {
                factory(context, self.actions.as_ref(), &self.globals)?
            }
        };
        Ok(Some(interaction))
    }

    /// Registers every `*.toml` and `*.json` document found in the configured
    /// directories under its file stem. Returns how many were registered.
    pub fn preload(&self, settings: &Settings) -> anyhow::Result<usize> {
        let mut loaded = 0;
        for dir in &settings.interaction_dirs {
            for path in document_paths(dir)? {
                let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                    continue;
                };
                let raw = fs::read_to_string(&path)
                    .with_context(|| format!("failed to read '{}'", path.display()))?;
                let doc = match path.extension().and_then(|ext| ext.to_str()) {
                    Some("json") => InteractionDocument::from_json_str(&raw),
                    _ => InteractionDocument::from_toml_str(&raw),
                }
                .with_context(|| format!("invalid interaction document '{}'", path.display()))?;
                self.register(name, doc);
                loaded += 1;
            }
        }
        info!(loaded, "preloaded interaction documents");
        Ok(loaded)
    }
}

fn document_paths(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("failed to read interaction dir '{}'", dir.display()))?;
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_document = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("toml" | "json")
        );
        if is_document && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

impl fmt::Debug for InteractionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteractionRegistry")
            .field("interactions", &self.names())
            .field("actions", &self.actions)
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/interaction_registry_tests.rs"]
mod tests;
