//
// matching/registry.rs
//
// paramatch: declarative data-matching and XML/XPath toolkit.
//

//!
//! Process-wide registry of custom-matcher factories, the one piece of
//! shared state in the crate. Registration/deregistration take the
//! writer side of a readers-writer lock; lookup (done on every
//! evaluation of a `Custom` item) takes the reader side.
//!

use crate::param::ParamMap;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// User-extension point for a matching-item leaf whose semantics this
/// crate does not know about. A registered factory is looked up by
/// `type_tag` every time a `Custom` item is matched, loaded, or dumped.
pub trait CustomMatcherFactory: Send + Sync {
    fn type_name(&self) -> &str;

    /// Matches `payload` (the item's stored value text) against a
    /// single scalar `value`.
    fn match_string(&self, payload: &str, value: &str) -> bool;

    /// Matches `payload` against a named parameter drawn from `params`
    /// (or, if `name` is `None`, against the whole map in whatever way
    /// the factory defines).
    fn match_params(&self, payload: &str, name: Option<&str>, params: &ParamMap) -> bool;

    /// Renders `payload` for the dumper's text/XML forms. Defaults to
    /// the stored payload verbatim; a factory overrides this when its
    /// payload's on-disk text differs from what it wants logged or
    /// re-dumped (e.g. a factory that stores a parsed form internally).
    fn dump_value(&self, payload: &str) -> String {
        payload.to_string()
    }
}

static REGISTRY: Lazy<RwLock<HashMap<String, Arc<dyn CustomMatcherFactory>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateRegistration(pub String);

impl std::fmt::Display for DuplicateRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "a custom matcher factory is already registered for type '{}'", self.0)
    }
}
impl std::error::Error for DuplicateRegistration {}

/// Registers `factory` under its own `type_name()`. Rejects a
/// duplicate registration of the same type name.
pub fn register(factory: Arc<dyn CustomMatcherFactory>) -> Result<(), DuplicateRegistration> {
    let mut registry = REGISTRY.write().expect("custom matcher registry lock poisoned");
    let name = factory.type_name().to_string();
    if registry.contains_key(&name) {
        return Err(DuplicateRegistration(name));
    }
    registry.insert(name, factory);
    Ok(())
}

/// Removes the factory registered under `type_name`, if any.
pub fn deregister(type_name: &str) -> Option<Arc<dyn CustomMatcherFactory>> {
    let mut registry = REGISTRY.write().expect("custom matcher registry lock poisoned");
    registry.remove(type_name)
}

/// Looks up the factory registered under `type_name`. The returned
/// `Arc` is a strong reference independent of the registry lock.
pub fn lookup(type_name: &str) -> Option<Arc<dyn CustomMatcherFactory>> {
    let registry = REGISTRY.read().expect("custom matcher registry lock poisoned");
    registry.get(type_name).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysTrue;
    impl CustomMatcherFactory for AlwaysTrue {
        fn type_name(&self) -> &str {
            "test-always-true"
        }
        fn match_string(&self, _payload: &str, _value: &str) -> bool {
            true
        }
        fn match_params(&self, _payload: &str, _name: Option<&str>, _params: &ParamMap) -> bool {
            true
        }
    }

    #[test]
    fn register_lookup_deregister_round_trip() {
        let factory = Arc::new(AlwaysTrue);
        register(factory.clone()).unwrap();
        assert!(lookup("test-always-true").is_some());
        assert!(matches!(register(factory.clone()), Err(DuplicateRegistration(_))));
        deregister("test-always-true");
        assert!(lookup("test-always-true").is_none());
    }
}
