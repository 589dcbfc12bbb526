//! In-process composite of script modules.
//!
//! Mirrors the dispatch rules of the generated entry script so composition
//! behaviour can be exercised without the tile engine.

use std::fmt;

use super::hooks::{Attributes, ScriptHooks};
use super::ScriptError;

type Restart = Box<dyn Fn() -> Result<(), ScriptError>>;

/// Ordered set of modules behind one hook surface
pub struct CompositeScript {
    modules: Vec<Box<dyn ScriptHooks>>,
    restart: Restart,
}

impl CompositeScript {
    /// Compose modules in order; `restart` runs after each module's
    /// `relation` call.
    pub fn new<F>(modules: Vec<Box<dyn ScriptHooks>>, restart: F) -> Self
    where
        F: Fn() -> Result<(), ScriptError> + 'static,
    {
        Self {
            modules,
            restart: Box::new(restart),
        }
    }

    /// Compose modules with no restart primitive
    pub fn without_restart(modules: Vec<Box<dyn ScriptHooks>>) -> Self {
        Self::new(modules, || Ok(()))
    }

    pub fn module_names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl fmt::Debug for CompositeScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeScript")
            .field("modules", &self.module_names())
            .finish_non_exhaustive()
    }
}

impl ScriptHooks for CompositeScript {
    fn name(&self) -> &str {
        "composite"
    }

    fn init(&self, name: &str) -> Result<(), ScriptError> {
        self.modules.iter().try_for_each(|m| m.init(name))
    }

    fn exit(&self) -> Result<(), ScriptError> {
        self.modules.iter().try_for_each(|m| m.exit())
    }

    /// First non-empty result wins.
    fn attribute(&self, attr: &Attributes, layer: &str) -> Result<Attributes, ScriptError> {
        for module in &self.modules {
            let result = module.attribute(attr, layer)?;
            if !result.is_empty() {
                return Ok(result);
            }
        }
        Ok(Attributes::new())
    }

    fn node(&self) -> Result<(), ScriptError> {
        self.modules.iter().try_for_each(|m| m.node())
    }

    fn way(&self) -> Result<(), ScriptError> {
        self.modules.iter().try_for_each(|m| m.way())
    }

    /// Every module is asked; any interest means the relation is scanned.
    fn relation_scan(&self) -> Result<bool, ScriptError> {
        let mut wanted = false;
        for module in &self.modules {
            wanted |= module.relation_scan()?;
        }
        Ok(wanted)
    }

    fn relation(&self) -> Result<(), ScriptError> {
        for module in &self.modules {
            module.relation()?;
            (self.restart)()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    struct Recorder {
        name: String,
        log: Log,
        attributes: Attributes,
        scan: bool,
    }

    impl Recorder {
        fn boxed(name: &str, log: &Log, attributes: serde_json::Value, scan: bool) -> Box<dyn ScriptHooks> {
            let attributes = match attributes {
                serde_json::Value::Object(map) => map,
                _ => Attributes::new(),
            };
            Box::new(Self {
                name: name.to_string(),
                log: Rc::clone(log),
                attributes,
                scan,
            })
        }

        fn record(&self, event: &str) {
            self.log.borrow_mut().push(format!("{}:{}", self.name, event));
        }
    }

    impl ScriptHooks for Recorder {
        fn name(&self) -> &str {
            &self.name
        }

        fn init(&self, name: &str) -> Result<(), ScriptError> {
            self.record(&format!("init({})", name));
            Ok(())
        }

        fn attribute(&self, _attr: &Attributes, _layer: &str) -> Result<Attributes, ScriptError> {
            self.record("attribute");
            Ok(self.attributes.clone())
        }

        fn way(&self) -> Result<(), ScriptError> {
            self.record("way");
            Ok(())
        }

        fn relation_scan(&self) -> Result<bool, ScriptError> {
            self.record("scan");
            Ok(self.scan)
        }

        fn relation(&self) -> Result<(), ScriptError> {
            self.record("relation");
            Ok(())
        }
    }

    fn events(log: &Log) -> Vec<String> {
        log.borrow().clone()
    }

    #[test]
    fn test_attribute_first_non_empty_wins() {
        let log = Log::default();
        let composite = CompositeScript::without_restart(vec![
            Recorder::boxed("a", &log, json!({}), false),
            Recorder::boxed("b", &log, json!({"k": "v"}), false),
            Recorder::boxed("c", &log, json!({"k": "other"}), false),
        ]);

        let result = composite.attribute(&Attributes::new(), "water").unwrap();
        assert_eq!(serde_json::Value::Object(result), json!({"k": "v"}));
        // c is never consulted
        assert_eq!(events(&log), ["a:attribute", "b:attribute"]);
    }

    #[test]
    fn test_attribute_order_sensitive() {
        let log = Log::default();
        let composite = CompositeScript::without_restart(vec![
            Recorder::boxed("a", &log, json!({"from": "a"}), false),
            Recorder::boxed("b", &log, json!({"from": "b"}), false),
        ]);
        let result = composite.attribute(&Attributes::new(), "roads").unwrap();
        assert_eq!(result["from"], "a");
    }

    #[test]
    fn test_attribute_none_is_empty() {
        let log = Log::default();
        let composite = CompositeScript::without_restart(vec![Recorder::boxed("a", &log, json!({}), false)]);
        assert!(composite.attribute(&Attributes::new(), "x").unwrap().is_empty());
    }

    #[test]
    fn test_relation_scan_ors_without_short_circuit() {
        let log = Log::default();
        let composite = CompositeScript::without_restart(vec![
            Recorder::boxed("a", &log, json!({}), false),
            Recorder::boxed("b", &log, json!({}), true),
            Recorder::boxed("c", &log, json!({}), false),
        ]);
        assert!(composite.relation_scan().unwrap());
        assert_eq!(events(&log), ["a:scan", "b:scan", "c:scan"]);
    }

    #[test]
    fn test_relation_scan_all_false() {
        let log = Log::default();
        let composite = CompositeScript::without_restart(vec![
            Recorder::boxed("a", &log, json!({}), false),
            Recorder::boxed("b", &log, json!({}), false),
        ]);
        assert!(!composite.relation_scan().unwrap());
    }

    #[test]
    fn test_relation_restarts_after_each_module() {
        let log = Log::default();
        let restarts = Rc::clone(&log);
        let composite = CompositeScript::new(
            vec![
                Recorder::boxed("a", &log, json!({}), false),
                Recorder::boxed("b", &log, json!({}), false),
            ],
            move || {
                restarts.borrow_mut().push("restart".to_string());
                Ok(())
            },
        );

        composite.relation().unwrap();
        assert_eq!(events(&log), ["a:relation", "restart", "b:relation", "restart"]);
    }

    #[test]
    fn test_fan_out_in_input_order() {
        let log = Log::default();
        let composite = CompositeScript::without_restart(vec![
            Recorder::boxed("water", &log, json!({}), false),
            Recorder::boxed("roads", &log, json!({}), false),
        ]);

        composite.init("planet").unwrap();
        composite.way().unwrap();
        composite.node().unwrap();
        composite.exit().unwrap();
        assert_eq!(
            events(&log),
            ["water:init(planet)", "roads:init(planet)", "water:way", "roads:way"]
        );
        assert_eq!(composite.module_names(), ["water", "roads"]);
    }

    #[test]
    fn test_hook_error_stops_dispatch() {
        struct Broken;
        impl ScriptHooks for Broken {
            fn name(&self) -> &str {
                "broken"
            }
            fn way(&self) -> Result<(), ScriptError> {
                Err(ScriptError::Hook {
                    module: "broken".to_string(),
                    hook: "way_function",
                    message: "boom".to_string(),
                })
            }
        }

        let log = Log::default();
        let composite = CompositeScript::without_restart(vec![
            Box::new(Broken),
            Recorder::boxed("after", &log, json!({}), false),
        ]);
        assert!(composite.way().is_err());
        assert!(events(&log).is_empty());
    }
}
