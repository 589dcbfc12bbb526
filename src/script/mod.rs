//! Script composition
//!
//! Each slice ships a Lua processing module written as if it owned the
//! engine's global namespace. Composition:
//! - validates every module in an isolated embedded Lua environment
//! - renders one entry script that dispatches the engine hooks to all
//!   modules in input order
//!
//! Declared `node_keys` / `way_keys` are not combined; the composite asks the
//! engine for every key and each module filters in its own hooks.
//!
//! Validation executes each module's top level on embedded Lua 5.4, which is
//! how missing `require`d helpers and the declared key filters are found. The
//! engine itself usually embeds LuaJIT/5.1, so top-level code that calls
//! 5.1-only globals (`module`, `setfenv`, `getfenv`) fails composition even
//! though the engine would accept it. Such calls belong behind a presence
//! check (`if setfenv then ... end`) or inside hook functions, which are only
//! compiled here and never run.

mod composite;
mod generate;
mod hooks;
mod lua;

pub use composite::CompositeScript;
pub use generate::render_composite;
pub use hooks::{Attributes, Hook, ScriptHooks};
pub use lua::{LuaModule, LuaRuntime, RESTART_RELATIONS};

use std::collections::HashSet;
use std::path::PathBuf;

use serde::Serialize;
use tracing::debug;

/// A named processing module on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptModule {
    pub name: String,
    pub path: PathBuf,
}

impl ScriptModule {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// Script composition errors. All are fatal.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("cannot read script module '{module}' at {}: {message}", path.display())]
    Read {
        module: String,
        path: PathBuf,
        message: String,
    },

    #[error("script module '{module}' failed to load: {message}")]
    Load { module: String, message: String },

    #[error("script module '{module}': {hook} failed: {message}")]
    Hook {
        module: String,
        hook: &'static str,
        message: String,
    },

    #[error("script module '{module}': {hook} returned {found}, expected a table")]
    InvalidReturn {
        module: String,
        hook: &'static str,
        found: String,
    },

    #[error("script module '{0}' listed more than once")]
    DuplicateModule(String),
}

/// What composition learned about one module
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleSummary {
    pub name: String,
    pub hooks: Vec<Hook>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_keys: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub way_keys: Option<Vec<String>>,
}

impl ModuleSummary {
    fn of(module: &LuaModule) -> Self {
        Self {
            name: module.name().to_string(),
            hooks: module.hooks().collect(),
            node_keys: module.node_keys().map(<[String]>::to_vec),
            way_keys: module.way_keys().map(<[String]>::to_vec),
        }
    }
}

/// Generated entry script plus per-module details
#[derive(Debug, Clone, Serialize)]
pub struct ComposedScript {
    pub source: String,
    pub modules: Vec<ModuleSummary>,
}

/// Validate `modules` and render the composite entry script.
///
/// Nothing is rendered unless every module loads.
pub fn compose(modules: &[ScriptModule]) -> Result<ComposedScript, ScriptError> {
    check_unique(modules)?;

    let runtime = LuaRuntime::new();
    let mut summaries = Vec::with_capacity(modules.len());
    for module in modules {
        let loaded = runtime.load(module)?;
        let summary = ModuleSummary::of(&loaded);
        debug!(
            module = %summary.name,
            hooks = ?summary.hooks,
            node_keys = ?summary.node_keys,
            way_keys = ?summary.way_keys,
            "validated script module"
        );
        summaries.push(summary);
    }

    Ok(ComposedScript {
        source: render_composite(modules),
        modules: summaries,
    })
}

/// Load `modules` into one embedded runtime behind a [`CompositeScript`].
///
/// The restart primitive is the runtime's `RestartRelations` global, when
/// one has been registered.
pub fn load_composite(modules: &[ScriptModule]) -> Result<(LuaRuntime, CompositeScript), ScriptError> {
    check_unique(modules)?;

    let runtime = LuaRuntime::new();
    let mut loaded: Vec<Box<dyn ScriptHooks>> = Vec::with_capacity(modules.len());
    for module in modules {
        loaded.push(Box::new(runtime.load(module)?));
    }

    let restart_runtime = runtime.clone();
    let composite = CompositeScript::new(loaded, move || restart_runtime.restart_relations());
    Ok((runtime, composite))
}

fn check_unique(modules: &[ScriptModule]) -> Result<(), ScriptError> {
    let mut seen = HashSet::new();
    for module in modules {
        if !seen.insert(module.name.as_str()) {
            return Err(ScriptError::DuplicateModule(module.name.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_compose_reports_modules() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("water.lua"),
            "way_keys = { 'natural' }\nfunction way_function() end",
        )
        .unwrap();
        fs::write(dir.path().join("roads.lua"), "function attribute_function() return {} end").unwrap();

        let modules = [
            ScriptModule::new("water", dir.path().join("water.lua")),
            ScriptModule::new("roads", dir.path().join("roads.lua")),
        ];
        let composed = compose(&modules).unwrap();

        assert_eq!(composed.modules.len(), 2);
        assert_eq!(composed.modules[0].hooks, [Hook::Way]);
        assert_eq!(composed.modules[0].way_keys.as_deref(), Some(&["natural".to_string()][..]));
        assert_eq!(composed.modules[1].hooks, [Hook::Attribute]);
        let water_at = composed.source.find("\"water\"").unwrap();
        let roads_at = composed.source.find("\"roads\"").unwrap();
        assert!(water_at < roads_at);
    }

    #[test]
    fn test_top_level_lua51_globals_must_be_guarded() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("legacy.lua"),
            "setfenv(1, setmetatable({}, {__index = _G}))\nfunction way_function() end",
        )
        .unwrap();
        fs::write(
            dir.path().join("portable.lua"),
            "if setfenv then setfenv(1, setmetatable({}, {__index = _G})) end\n\
             function way_function() return getfenv and getfenv(1) end",
        )
        .unwrap();

        let legacy = [ScriptModule::new("legacy", dir.path().join("legacy.lua"))];
        match compose(&legacy) {
            Err(ScriptError::Load { module, .. }) => assert_eq!(module, "legacy"),
            other => panic!("expected load error, got {other:?}"),
        }

        let portable = [ScriptModule::new("portable", dir.path().join("portable.lua"))];
        let composed = compose(&portable).unwrap();
        assert_eq!(composed.modules[0].hooks, [Hook::Way]);
    }

    #[test]
    fn test_compose_fails_without_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("good.lua"), "function way_function() end").unwrap();
        fs::write(dir.path().join("bad.lua"), "this is not lua").unwrap();

        let modules = [
            ScriptModule::new("good", dir.path().join("good.lua")),
            ScriptModule::new("bad", dir.path().join("bad.lua")),
        ];
        match compose(&modules) {
            Err(ScriptError::Load { module, .. }) => assert_eq!(module, "bad"),
            other => panic!("expected load error, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_module_names() {
        let modules = [
            ScriptModule::new("water", "a/water.lua"),
            ScriptModule::new("water", "b/water.lua"),
        ];
        assert!(matches!(compose(&modules), Err(ScriptError::DuplicateModule(name)) if name == "water"));
    }

    #[test]
    fn test_load_composite_restarts_through_runtime() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.lua"), "function relation_function() table.insert(trace, 'a') end").unwrap();
        fs::write(dir.path().join("b.lua"), "function relation_function() table.insert(trace, 'b') end").unwrap();
        let modules = [
            ScriptModule::new("a", dir.path().join("a.lua")),
            ScriptModule::new("b", dir.path().join("b.lua")),
        ];

        let (runtime, composite) = load_composite(&modules).unwrap();
        runtime
            .lua()
            .load("trace = {}\nfunction RestartRelations() table.insert(trace, '|') end")
            .exec()
            .unwrap();
        composite.relation().unwrap();

        let trace: String = runtime.lua().load("return table.concat(trace)").eval().unwrap();
        assert_eq!(trace, "a|b|");
    }
}
