//! Embedded Lua host for script modules.

use std::collections::BTreeSet;
use std::fs;

use mlua::{Function, Lua, LuaSerdeExt, Table, Value as LuaValue};

use super::hooks::{Attributes, Hook, ScriptHooks};
use super::{ScriptError, ScriptModule};

/// Name of the engine primitive that resets relation iteration state.
pub const RESTART_RELATIONS: &str = "RestartRelations";

/// One Lua state hosting any number of isolated modules
#[derive(Clone)]
pub struct LuaRuntime {
    lua: Lua,
}

impl LuaRuntime {
    pub fn new() -> Self {
        Self { lua: Lua::new() }
    }

    /// Underlying Lua state, for registering engine globals
    pub fn lua(&self) -> &Lua {
        &self.lua
    }

    /// Load a module into a private environment.
    ///
    /// Reads fall through to the real globals; writes stay in the module's
    /// own table. The module's directory is searched first by `require`.
    pub fn load(&self, module: &ScriptModule) -> Result<LuaModule, ScriptError> {
        let source = fs::read_to_string(&module.path).map_err(|e| ScriptError::Read {
            module: module.name.clone(),
            path: module.path.clone(),
            message: e.to_string(),
        })?;

        let load_error = |e: mlua::Error| ScriptError::Load {
            module: module.name.clone(),
            message: e.to_string(),
        };

        if let Some(dir) = module.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            self.prepend_search_path(&dir.to_string_lossy())
                .map_err(load_error)?;
        }

        let env: Table = self
            .lua
            .load("return setmetatable({}, { __index = _G })")
            .set_name("=mapt-env")
            .eval()
            .map_err(load_error)?;

        self.lua
            .load(source.as_str())
            .set_name(format!("@{}", module.path.display()))
            .set_environment(env.clone())
            .exec()
            .map_err(load_error)?;

        let mut hooks = BTreeSet::new();
        for hook in Hook::ALL {
            let value: LuaValue = env.raw_get(hook.function_name()).map_err(load_error)?;
            if matches!(value, LuaValue::Function(_)) {
                hooks.insert(hook);
            }
        }

        let node_keys = key_filter(&env, "node_keys").map_err(load_error)?;
        let way_keys = key_filter(&env, "way_keys").map_err(load_error)?;

        Ok(LuaModule {
            lua: self.lua.clone(),
            name: module.name.clone(),
            env,
            hooks,
            node_keys,
            way_keys,
        })
    }

    /// Call the engine's relation restart primitive if one is registered.
    pub fn restart_relations(&self) -> Result<(), ScriptError> {
        let restart: Option<Function> = self
            .lua
            .globals()
            .get(RESTART_RELATIONS)
            .map_err(|e| hook_error("composite", Hook::Relation, e))?;
        if let Some(restart) = restart {
            restart
                .call::<()>(())
                .map_err(|e| hook_error("composite", Hook::Relation, e))?;
        }
        Ok(())
    }

    fn prepend_search_path(&self, dir: &str) -> mlua::Result<()> {
        let package: Option<Table> = self.lua.globals().get("package")?;
        let Some(package) = package else {
            return Ok(());
        };
        let current: String = package.get("path")?;
        let entry = format!("{}/?.lua", dir);
        if !current.split(';').any(|p| p == entry) {
            package.set("path", format!("{};{}", entry, current))?;
        }
        Ok(())
    }
}

impl Default for LuaRuntime {
    fn default() -> Self {
        Self::new()
    }
}

fn key_filter(env: &Table, key: &str) -> mlua::Result<Option<Vec<String>>> {
    match env.raw_get::<LuaValue>(key)? {
        LuaValue::Table(table) => table
            .sequence_values::<String>()
            .collect::<mlua::Result<Vec<_>>>()
            .map(Some),
        _ => Ok(None),
    }
}

fn hook_error(module: &str, hook: Hook, error: mlua::Error) -> ScriptError {
    ScriptError::Hook {
        module: module.to_string(),
        hook: hook.function_name(),
        message: error.to_string(),
    }
}

/// A module loaded into its own environment
pub struct LuaModule {
    lua: Lua,
    name: String,
    env: Table,
    hooks: BTreeSet<Hook>,
    node_keys: Option<Vec<String>>,
    way_keys: Option<Vec<String>>,
}

impl LuaModule {
    /// Hooks the module defines itself
    pub fn hooks(&self) -> impl Iterator<Item = Hook> + '_ {
        self.hooks.iter().copied()
    }

    pub fn defines(&self, hook: Hook) -> bool {
        self.hooks.contains(&hook)
    }

    pub fn node_keys(&self) -> Option<&[String]> {
        self.node_keys.as_deref()
    }

    pub fn way_keys(&self) -> Option<&[String]> {
        self.way_keys.as_deref()
    }

    fn function(&self, hook: Hook) -> Result<Option<Function>, ScriptError> {
        if !self.defines(hook) {
            return Ok(None);
        }
        self.env
            .raw_get::<Option<Function>>(hook.function_name())
            .map_err(|e| self.error(hook, e))
    }

    fn error(&self, hook: Hook, error: mlua::Error) -> ScriptError {
        hook_error(&self.name, hook, error)
    }

    fn call_unit(&self, hook: Hook) -> Result<(), ScriptError> {
        match self.function(hook)? {
            Some(f) => f.call::<()>(()).map_err(|e| self.error(hook, e)),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for LuaModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LuaModule")
            .field("name", &self.name)
            .field("hooks", &self.hooks)
            .field("node_keys", &self.node_keys)
            .field("way_keys", &self.way_keys)
            .finish()
    }
}

impl ScriptHooks for LuaModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&self, name: &str) -> Result<(), ScriptError> {
        match self.function(Hook::Init)? {
            Some(f) => f.call::<()>(name).map_err(|e| self.error(Hook::Init, e)),
            None => Ok(()),
        }
    }

    fn exit(&self) -> Result<(), ScriptError> {
        self.call_unit(Hook::Exit)
    }

    fn attribute(&self, attr: &Attributes, layer: &str) -> Result<Attributes, ScriptError> {
        let Some(f) = self.function(Hook::Attribute)? else {
            return Ok(Attributes::new());
        };
        let attr = self
            .lua
            .to_value(attr)
            .map_err(|e| self.error(Hook::Attribute, e))?;
        let result: LuaValue = f
            .call((attr, layer))
            .map_err(|e| self.error(Hook::Attribute, e))?;

        let invalid = |found: &str| ScriptError::InvalidReturn {
            module: self.name.clone(),
            hook: Hook::Attribute.function_name(),
            found: found.to_string(),
        };
        match result {
            LuaValue::Nil | LuaValue::Boolean(false) => Ok(Attributes::new()),
            LuaValue::Table(_) => {
                let json: serde_json::Value = self
                    .lua
                    .from_value(result)
                    .map_err(|e| self.error(Hook::Attribute, e))?;
                match json {
                    serde_json::Value::Object(map) => Ok(map),
                    // An empty table deserializes as an empty sequence
                    serde_json::Value::Array(items) if items.is_empty() => Ok(Attributes::new()),
                    _ => Err(invalid("array")),
                }
            }
            other => Err(invalid(other.type_name())),
        }
    }

    fn node(&self) -> Result<(), ScriptError> {
        self.call_unit(Hook::Node)
    }

    fn way(&self) -> Result<(), ScriptError> {
        self.call_unit(Hook::Way)
    }

    fn relation_scan(&self) -> Result<bool, ScriptError> {
        match self.function(Hook::RelationScan)? {
            Some(f) => {
                let wanted: LuaValue = f.call(()).map_err(|e| self.error(Hook::RelationScan, e))?;
                Ok(!matches!(wanted, LuaValue::Nil | LuaValue::Boolean(false)))
            }
            None => Ok(false),
        }
    }

    fn relation(&self) -> Result<(), ScriptError> {
        self.call_unit(Hook::Relation)
    }
}
