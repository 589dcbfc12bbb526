//! The hook surface shared by script modules and the composite.

use serde::Serialize;

use super::ScriptError;

/// Attribute table returned by an `attribute` hook
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// Callbacks the tile engine invokes on a processing script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Hook {
    Init,
    Exit,
    Attribute,
    Node,
    Way,
    RelationScan,
    Relation,
}

impl Hook {
    /// Every hook, in dispatch declaration order
    pub const ALL: [Hook; 7] = [
        Hook::Init,
        Hook::Exit,
        Hook::Attribute,
        Hook::Node,
        Hook::Way,
        Hook::RelationScan,
        Hook::Relation,
    ];

    /// Global function name the engine looks up
    pub fn function_name(self) -> &'static str {
        match self {
            Hook::Init => "init_function",
            Hook::Exit => "exit_function",
            Hook::Attribute => "attribute_function",
            Hook::Node => "node_function",
            Hook::Way => "way_function",
            Hook::RelationScan => "relation_scan_function",
            Hook::Relation => "relation_function",
        }
    }
}

/// A unit of tile-processing logic.
///
/// Every hook defaults to the identity no-op: `attribute` yields an empty
/// table, `relation_scan` is not interested, the rest do nothing.
pub trait ScriptHooks {
    fn name(&self) -> &str;

    fn init(&self, _name: &str) -> Result<(), ScriptError> {
        Ok(())
    }

    fn exit(&self) -> Result<(), ScriptError> {
        Ok(())
    }

    fn attribute(&self, _attr: &Attributes, _layer: &str) -> Result<Attributes, ScriptError> {
        Ok(Attributes::new())
    }

    fn node(&self) -> Result<(), ScriptError> {
        Ok(())
    }

    fn way(&self) -> Result<(), ScriptError> {
        Ok(())
    }

    fn relation_scan(&self) -> Result<bool, ScriptError> {
        Ok(false)
    }

    fn relation(&self) -> Result<(), ScriptError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Silent;

    impl ScriptHooks for Silent {
        fn name(&self) -> &str {
            "silent"
        }
    }

    #[test]
    fn test_defaults_are_identity() {
        let module = Silent;
        assert!(module.init("planet").is_ok());
        assert!(module.attribute(&Attributes::new(), "water").unwrap().is_empty());
        assert!(!module.relation_scan().unwrap());
        assert!(module.relation().is_ok());
    }

    #[test]
    fn test_function_names_unique() {
        let mut names: Vec<&str> = Hook::ALL.iter().map(|h| h.function_name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Hook::ALL.len());
    }
}
