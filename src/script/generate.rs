//! Generated Lua entry script.
//!
//! The tile engine runs a single processing script with one global
//! namespace. The generated script loads every module into a private
//! environment (reads fall through to `_G`) and defines the engine's global
//! hooks as dispatchers over those environments.

use std::fmt::Write;

use super::hooks::Hook;
use super::lua::RESTART_RELATIONS;
use super::ScriptModule;

const PRELUDE: &str = r#"local modules = {}

local function load_module(name, path)
  local env = setmetatable({}, { __index = _G })
  local chunk, err
  if setfenv then
    chunk, err = loadfile(path)
    if chunk then setfenv(chunk, env) end
  else
    chunk, err = loadfile(path, "t", env)
  end
  if not chunk then
    error("cannot load module '" .. name .. "': " .. tostring(err), 0)
  end
  chunk()
  modules[#modules + 1] = { name = name, env = env }
end

local function hook(module, fname)
  local f = rawget(module.env, fname)
  if type(f) == "function" then return f end
  return nil
end
"#;

/// Render the composite entry script for `modules`, in order.
pub fn render_composite(modules: &[ScriptModule]) -> String {
    let mut out = String::new();
    out.push_str("-- Generated by mapt. Edits are overwritten on the next build.\n");
    let _ = writeln!(out, "-- Modules: {}", modules.len());
    out.push('\n');
    out.push_str(PRELUDE);
    out.push('\n');

    for module in modules {
        let _ = writeln!(
            out,
            "load_module({}, {})",
            lua_string(&module.name),
            lua_string(&module.path.to_string_lossy())
        );
    }
    out.push('\n');

    for hook in Hook::ALL {
        out.push_str(&dispatcher(hook));
        out.push('\n');
    }
    out
}

fn dispatcher(hook: Hook) -> String {
    let name = hook.function_name();
    match hook {
        Hook::Attribute => format!(
            r#"function {name}(...)
  for _, m in ipairs(modules) do
    local f = hook(m, "{name}")
    if f then
      local result = f(...)
      if type(result) == "table" and next(result) ~= nil then
        return result
      end
    end
  end
  return {{}}
end
"#
        ),
        Hook::RelationScan => format!(
            r#"function {name}(...)
  local wanted = false
  for _, m in ipairs(modules) do
    local f = hook(m, "{name}")
    if f and f(...) then
      wanted = true
    end
  end
  return wanted
end
"#
        ),
        Hook::Relation => format!(
            r#"function {name}(...)
  for _, m in ipairs(modules) do
    local f = hook(m, "{name}")
    if f then f(...) end
    if {restart} then {restart}() end
  end
end
"#,
            restart = RESTART_RELATIONS
        ),
        Hook::Init | Hook::Exit | Hook::Node | Hook::Way => format!(
            r#"function {name}(...)
  for _, m in ipairs(modules) do
    local f = hook(m, "{name}")
    if f then f(...) end
  end
end
"#
        ),
    }
}

/// Quote `s` as a Lua string literal.
fn lua_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                let _ = write!(out, "\\{:03}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
