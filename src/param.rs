//
// param.rs
//
// paramatch: declarative data-matching and XML/XPath toolkit.
//

//!
//! `ParamMap`: an ordered multimap of name/value strings supplied by
//! the caller to a matching-item evaluation. A parameter entry may
//! optionally carry an attached polymorphic object; the XPath matcher
//! uses this slot to cache a parsed DOM across the lifetime of a
//! single evaluation pass, rather than reparsing the same XML-valued
//! parameter for every XPath sub-item that reads it.
//!

use std::any::Any;
use std::fmt;

/// One name/value pair in a `ParamMap`, with an optional attached
/// object (`payload`). The payload is never compared or serialised; it
/// exists purely as a same-pass cache slot.
pub struct Param {
    name: String,
    value: String,
    payload: Option<Box<dyn Any>>,
}

impl Param {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Param {
            name: name.into(),
            value: value.into(),
            payload: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn payload(&self) -> Option<&(dyn Any)> {
        self.payload.as_deref()
    }

    pub fn set_payload(&mut self, payload: Box<dyn Any>) {
        self.payload = Some(payload);
    }

    pub fn clear_payload(&mut self) {
        self.payload = None;
    }
}

impl fmt::Debug for Param {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Param")
            .field("name", &self.name)
            .field("value", &self.value)
            .field("has_payload", &self.payload.is_some())
            .finish()
    }
}

impl Clone for Param {
    /// Clones name/value; the attached payload is never cloned since
    /// it is a same-pass cache, not part of the logical value.
    fn clone(&self) -> Self {
        Param::new(self.name.clone(), self.value.clone())
    }
}

/// Ordered multimap of name/value strings. Iteration order is
/// insertion order; a name may appear more than once.
#[derive(Debug, Clone, Default)]
pub struct ParamMap {
    params: Vec<Param>,
}

impl ParamMap {
    pub fn new() -> Self {
        ParamMap { params: Vec::new() }
    }

    /// Appends a new entry, keeping any existing entries with the same
    /// name (this is a multimap: `get` returns the first match).
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.params.push(Param::new(name, value));
        self
    }

    /// Replaces every existing entry named `name` with a single new
    /// one holding `value`, preserving the position of the first
    /// removed entry; appends if `name` was absent.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let name = name.into();
        if let Some(pos) = self.params.iter().position(|p| p.name == name) {
            self.params.retain(|p| p.name != name);
            self.params.insert(pos.min(self.params.len()), Param::new(name, value));
        } else {
            self.params.push(Param::new(name, value));
        }
        self
    }

    /// First value for `name`, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.iter().find(|p| p.name == name).map(|p| p.value())
    }

    /// All values for `name`, in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> {
        self.params.iter().filter(move |p| p.name == name).map(|p| p.value())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.params.iter().any(|p| p.name == name)
    }

    pub fn clear(&mut self, name: &str) {
        self.params.retain(|p| p.name != name);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Param> {
        self.params.iter()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Mutable access to the first entry named `name`, used by the
    /// XPath matcher to stash a cached parsed DOM as a payload.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Param> {
        self.params.iter_mut().find(|p| p.name == name)
    }
}

impl<'a> IntoIterator for &'a ParamMap {
    type Item = &'a Param;
    type IntoIter = std::slice::Iter<'a, Param>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.iter()
    }
}

impl FromIterator<(String, String)> for ParamMap {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut map = ParamMap::new();
        for (name, value) in iter {
            map.add(name, value);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_insertion_order_and_multiplicity() {
        let mut p = ParamMap::new();
        p.add("a", "1").add("b", "2").add("a", "3");
        let names: Vec<&str> = p.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["a", "b", "a"]);
        assert_eq!(p.get("a"), Some("1"));
        let all: Vec<&str> = p.get_all("a").collect();
        assert_eq!(all, vec!["1", "3"]);
    }

    #[test]
    fn set_replaces_all_entries_with_that_name() {
        let mut p = ParamMap::new();
        p.add("a", "1").add("b", "2").add("a", "3");
        p.set("a", "final");
        let all: Vec<&str> = p.get_all("a").collect();
        assert_eq!(all, vec!["final"]);
    }

    #[test]
    fn payload_is_a_same_pass_cache_not_part_of_value() {
        let mut p = ParamMap::new();
        p.add("body", "<msg/>");
        p.get_mut("body").unwrap().set_payload(Box::new(42i32));
        let cloned = p.clone();
        assert!(cloned.iter().next().unwrap().payload().is_none());
    }
}
