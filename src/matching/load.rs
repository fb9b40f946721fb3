//
// matching/load.rs
//
// paramatch: declarative data-matching and XML/XPath toolkit.
//

//!
//! Builds a matching-item tree from a flat parameter map, an XML
//! element, or an XML-formatted string. The parameter-map form keys a
//! leaf item's `name` (the parameter it will later be matched
//! against) by the key suffix itself: `{prefix}:{name}` holds the
//! comparison value, `{prefix}:type:{name}` an optional explicit type,
//! and so on; `{prefix}:item:{id}...` introduces a nested sub-item,
//! which makes the whole thing an implicit list.
//!

use super::{optimize, ItemKind, LazyRegex, LazyXPath, MatchingItem, MissingMatch};
use crate::dom::{self, NodePtr};
use crate::error::LoadError;
use crate::param::ParamMap;
use log::warn;

/// Bit flags controlling loader behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadFlags(pub u32);

impl LoadFlags {
    pub const NONE: u32 = 0;
    pub const IGNORE_FAILED: u32 = 1 << 0;
    pub const ACCEPT_INVALID: u32 = 1 << 1;
    pub const PRESERVE_IDS: u32 = 1 << 2;
    pub const VALIDATE_REGEX: u32 = 1 << 3;
    pub const VALIDATE_XPATH: u32 = 1 << 4;
    pub const VALIDATE_RANDOM: u32 = 1 << 5;
    pub const NO_OPTIMIZE: u32 = 1 << 6;
    pub const REQUIRE_NAMES: u32 = 1 << 7;
    pub const DETECT_REGEX_CARET: u32 = 1 << 8;
    pub const DETECT_NEGATED_CARET: u32 = 1 << 9;
    pub const DEFAULT_LIST_OR: u32 = 1 << 10;
    pub const PREFER_BASIC_REGEX: u32 = 1 << 11;

    pub fn new(bits: u32) -> Self {
        LoadFlags(bits)
    }

    pub fn contains(&self, bit: u32) -> bool {
        self.0 & bit != 0
    }
}

impl Default for LoadFlags {
    fn default() -> Self {
        LoadFlags(LoadFlags::NONE)
    }
}

impl std::ops::BitOr for LoadFlags {
    type Output = LoadFlags;
    fn bitor(self, rhs: LoadFlags) -> LoadFlags {
        LoadFlags(self.0 | rhs.0)
    }
}

struct ParsedItemFlags {
    negated: bool,
    case_insensitive: bool,
    basic: bool,
    list_any: bool,
    missing_match: MissingMatch,
}

fn parse_item_flags(text: &str) -> ParsedItemFlags {
    let mut parsed = ParsedItemFlags {
        negated: false,
        case_insensitive: false,
        basic: false,
        list_any: false,
        missing_match: MissingMatch::RunMatch,
    };
    for token in text.split_whitespace() {
        match token {
            "negated" => parsed.negated = true,
            "caseinsensitive" => parsed.case_insensitive = true,
            "basic" => parsed.basic = true,
            "any" => parsed.list_any = true,
            "missing_match" => parsed.missing_match = MissingMatch::Match,
            "missing_no_match" => parsed.missing_match = MissingMatch::NoMatch,
            _ => {}
        }
    }
    parsed
}

/// Loads a tree from a flat parameter map under `prefix`, applying list
/// optimisation (see `matching::optimize`) unless `NO_OPTIMIZE` is set.
pub fn load_from_params(params: &ParamMap, prefix: &str, flags: LoadFlags) -> Result<MatchingItem, LoadError> {
    let item = load_from_params_suffixed(params, prefix, "", flags)?;
    Ok(maybe_optimize(item, flags))
}

/// Applies `optimize::optimize` unless the loader was asked to skip it;
/// falls back to the pre-optimisation tree if optimising the whole
/// thing away would leave nothing to return (e.g. an empty top-level
/// list), since callers expect a `MatchingItem` back, not an `Option`.
fn maybe_optimize(item: MatchingItem, flags: LoadFlags) -> MatchingItem {
    if flags.contains(LoadFlags::NO_OPTIMIZE) {
        return item;
    }
    match optimize::optimize(item.clone()) {
        Some(optimized) => optimized,
        None => item,
    }
}

fn key(prefix: &str, middle: &str, suffix: &str) -> String {
    if suffix.is_empty() {
        if middle.is_empty() {
            prefix.to_string()
        } else {
            format!("{}:{}", prefix, middle)
        }
    } else if middle.is_empty() {
        format!("{}:{}", prefix, suffix)
    } else {
        format!("{}:{}:{}", prefix, middle, suffix)
    }
}

fn load_from_params_suffixed(params: &ParamMap, prefix: &str, suffix: &str, flags: LoadFlags) -> Result<MatchingItem, LoadError> {
    if suffix.is_empty() {
        if let Some(xml) = params.get(&key(prefix, "xml", "")) {
            return load_from_xml_string(xml, flags);
        }
    }

    let item_prefix = key(prefix, "item", "");
    let item_key_prefix = format!("{}:", item_prefix);
    let mut child_ids: Vec<String> = Vec::new();
    for p in params.iter() {
        if let Some(rest) = p.name().strip_prefix(&item_key_prefix) {
            let id = rest.split(':').next().unwrap_or(rest).to_string();
            if !child_ids.contains(&id) {
                child_ids.push(id);
            }
        }
    }

    let flags_text = params.get(&key(prefix, "flags", suffix)).unwrap_or("");
    let parsed_flags = parse_item_flags(flags_text);
    let id_value = params.get(&key(prefix, "id", suffix));

    if !child_ids.is_empty() {
        let list_flags_text = params.get(&key(prefix, "listflags", "")).unwrap_or(flags_text);
        let list_parsed = parse_item_flags(list_flags_text);
        let match_all = if list_parsed.list_any {
            false
        } else {
            !flags.contains(LoadFlags::DEFAULT_LIST_OR)
        };
        let mut items = Vec::new();
        for id in &child_ids {
            let child_prefix = format!("{}:{}", item_prefix, id);
            match load_from_params_suffixed(params, &child_prefix, "", flags) {
                Ok(item) => items.push(item),
                Err(e) => {
                    if flags.contains(LoadFlags::IGNORE_FAILED) {
                        warn!("skipping matching-item '{}': {}", id, e);
                    } else {
                        return Err(e);
                    }
                }
            }
        }
        let mut item = MatchingItem::new(ItemKind::List { name: suffix.to_string(), match_all, items })
            .negated(list_parsed.negated)
            .with_missing_match(list_parsed.missing_match);
        if flags.contains(LoadFlags::PRESERVE_IDS) {
            if let Some(id) = id_value {
                item = item.with_id(id);
            }
        }
        return Ok(item);
    }

    let (name, value) = if !suffix.is_empty() {
        let value_key = key(prefix, "", suffix);
        let value = params.get(&value_key).ok_or_else(|| LoadError::fatal(format!("missing value at '{}'", value_key)))?;
        (suffix.to_string(), value.to_string())
    } else if let Some(value) = params.get(prefix) {
        (String::new(), value.to_string())
    } else {
        resolve_named_leaf(params, prefix).ok_or_else(|| LoadError::fatal(format!("missing value at '{}'", prefix)))?
    };

    if name.is_empty() && flags.contains(LoadFlags::REQUIRE_NAMES) {
        return Err(LoadError::fatal(format!("item under '{}' has no name", prefix)));
    }

    // A list child's leaf keys carry its name as an extra path segment
    // (`{prefix}:{name}`, `{prefix}:type:{name}`, ...) that the lookups
    // above (keyed on the original, still-unnamed `suffix`) cannot see;
    // once the name has been discovered, re-resolve against it.
    let (parsed_flags, id_value, explicit_type) = if suffix.is_empty() && !name.is_empty() {
        let flags_text = params.get(&key(prefix, "flags", &name)).unwrap_or("");
        (parse_item_flags(flags_text), params.get(&key(prefix, "id", &name)), params.get(&key(prefix, "type", &name)))
    } else {
        (parsed_flags, id_value, params.get(&key(prefix, "type", suffix)))
    };

    build_leaf(&name, explicit_type, &value, &parsed_flags, id_value, flags)
}

/// Reserved path segments that, immediately after a sub-item's prefix,
/// mark a control key rather than the item's own name/value key.
const RESERVED_CHILD_MIDDLES: [&str; 5] = ["type", "flags", "id", "item", "listflags"];

/// Finds the `(name, value)` pair for a leaf whose name was never
/// passed down explicitly: scans for a key under `{prefix}:` whose
/// first remaining path segment isn't one of the reserved control
/// words, e.g. `rule:item:1:user` resolves to `("user", ...)`.
fn resolve_named_leaf(params: &ParamMap, prefix: &str) -> Option<(String, String)> {
    let search_prefix = format!("{}:", prefix);
    for p in params.iter() {
        if let Some(tail) = p.name().strip_prefix(search_prefix.as_str()) {
            let first = tail.split(':').next().unwrap_or(tail);
            if !RESERVED_CHILD_MIDDLES.contains(&first) {
                return Some((tail.to_string(), p.value().to_string()));
            }
        }
    }
    None
}

fn build_leaf(
    name: &str,
    explicit_type: Option<&str>,
    value: &str,
    parsed_flags: &ParsedItemFlags,
    id_value: Option<&str>,
    flags: LoadFlags,
) -> Result<MatchingItem, LoadError> {
    let looks_like_regex = flags.contains(LoadFlags::DETECT_REGEX_CARET) && value.starts_with('^');
    let type_name = explicit_type.unwrap_or(if looks_like_regex { "regexp" } else { "string" });

    let (value, negated) = if flags.contains(LoadFlags::DETECT_NEGATED_CARET) && type_name == "regexp" && value.ends_with('^') {
        (value.trim_end_matches('^'), true)
    } else {
        (value, parsed_flags.negated)
    };

    let kind = match type_name {
        "string" => ItemKind::String {
            name: name.to_string(),
            value: value.to_string(),
            case_insensitive: parsed_flags.case_insensitive,
        },
        "regexp" => {
            if flags.contains(LoadFlags::VALIDATE_REGEX) {
                regex::Regex::new(value).map_err(|e| LoadError::fatal(format!("invalid regex '{}': {}", value, e)))?;
            }
            ItemKind::Regexp {
                name: name.to_string(),
                regex: LazyRegex::new(value, parsed_flags.case_insensitive),
                basic: parsed_flags.basic || flags.contains(LoadFlags::PREFER_BASIC_REGEX),
            }
        }
        "xpath" => {
            if flags.contains(LoadFlags::VALIDATE_XPATH) {
                crate::xpath::XPath::compile(value).map_err(|e| LoadError::fatal(format!("invalid xpath '{}': {}", value, e)))?;
            }
            ItemKind::XPath { name: name.to_string(), path: LazyXPath::new(value), inner: None }
        }
        "random" => {
            let (val, max) = parse_random_spec(value)?;
            if flags.contains(LoadFlags::VALIDATE_RANDOM) && max == 0 {
                return Err(LoadError::fatal("random matcher requires max > 0"));
            }
            ItemKind::Random { name: name.to_string(), val, max }
        }
        other => ItemKind::Custom { type_tag: other.to_string(), name: Some(name.to_string()).filter(|n| !n.is_empty()), payload: value.to_string() },
    };
    let mut item = MatchingItem::new(kind).negated(negated).with_missing_match(parsed_flags.missing_match);
    if flags.contains(LoadFlags::PRESERVE_IDS) {
        if let Some(id) = id_value {
            item = item.with_id(id);
        }
    }
    Ok(item)
}

fn parse_random_spec(value: &str) -> Result<(u32, u32), LoadError> {
    let (val_text, max_text) = value
        .split_once(',')
        .ok_or_else(|| LoadError::fatal(format!("random matcher spec '{}' must be 'val,max'", value)))?;
    let val: u32 = val_text.trim().parse().map_err(|_| LoadError::fatal(format!("invalid random val '{}'", val_text)))?;
    let max: u32 = max_text.trim().parse().map_err(|_| LoadError::fatal(format!("invalid random max '{}'", max_text)))?;
    Ok((val, max))
}

/// Loads a tree from an already-built XML element, whose tag names the
/// matcher type, applying list optimisation unless `NO_OPTIMIZE` is set.
pub fn load_from_xml(node: &NodePtr, flags: LoadFlags) -> Result<MatchingItem, LoadError> {
    let item = load_from_xml_inner(node, flags)?;
    Ok(maybe_optimize(item, flags))
}

fn load_from_xml_inner(node: &NodePtr, flags: LoadFlags) -> Result<MatchingItem, LoadError> {
    let tag = node.tag().ok_or_else(|| LoadError::fatal("matching-item XML must be an element"))?;
    let name_attr = node.attribute_value("name");
    let id_attr = node.attribute_value("id");
    let flags_attr = node.attribute_value("flags").unwrap_or_default();
    let parsed = parse_item_flags(&flags_attr);
    let text = node.text();

    let kind = match tag.as_str() {
        "string" => ItemKind::String {
            name: require_name(name_attr, flags)?,
            value: text,
            case_insensitive: parsed.case_insensitive,
        },
        "regexp" => {
            if flags.contains(LoadFlags::VALIDATE_REGEX) {
                regex::Regex::new(&text).map_err(|e| LoadError::fatal(format!("invalid regex '{}': {}", text, e)))?;
            }
            ItemKind::Regexp {
                name: require_name(name_attr, flags)?,
                regex: LazyRegex::new(text, parsed.case_insensitive),
                basic: parsed.basic || flags.contains(LoadFlags::PREFER_BASIC_REGEX),
            }
        }
        "xpath" => {
            if flags.contains(LoadFlags::VALIDATE_XPATH) {
                crate::xpath::XPath::compile(&text).map_err(|e| LoadError::fatal(format!("invalid xpath '{}': {}", text, e)))?;
            }
            let inner = match node.first_child(Some("match")) {
                Some(wrapper) => {
                    let child = wrapper
                        .first_child(None)
                        .ok_or_else(|| LoadError::fatal("<match> element has no inner matcher"))?;
                    Some(Box::new(load_from_xml_inner(&child, flags)?))
                }
                None => None,
            };
            ItemKind::XPath { name: require_name(name_attr, flags)?, path: LazyXPath::new(text), inner }
        }
        "random" => {
            let (val, max) = parse_random_spec(&text)?;
            if flags.contains(LoadFlags::VALIDATE_RANDOM) && max == 0 {
                return Err(LoadError::fatal("random matcher requires max > 0"));
            }
            ItemKind::Random { name: name_attr.unwrap_or_default(), val, max }
        }
        "list" => {
            let match_all = if parsed.list_any { false } else { !flags.contains(LoadFlags::DEFAULT_LIST_OR) };
            let mut items = Vec::new();
            for child in node.child_elements() {
                match load_from_xml_inner(&child, flags) {
                    Ok(item) => items.push(item),
                    Err(e) => {
                        if flags.contains(LoadFlags::IGNORE_FAILED) {
                            warn!("skipping matching-item: {}", e);
                        } else {
                            return Err(e);
                        }
                    }
                }
            }
            ItemKind::List { name: name_attr.unwrap_or_default(), match_all, items }
        }
        other => ItemKind::Custom { type_tag: other.to_string(), name: name_attr.clone(), payload: text },
    };

    let mut item = MatchingItem::new(kind).negated(parsed.negated).with_missing_match(parsed.missing_match);
    if flags.contains(LoadFlags::PRESERVE_IDS) {
        if let Some(id) = id_attr {
            item = item.with_id(id);
        }
    }
    Ok(item)
}

fn require_name(name: Option<String>, flags: LoadFlags) -> Result<String, LoadError> {
    match name {
        Some(n) => Ok(n),
        None if flags.contains(LoadFlags::REQUIRE_NAMES) => Err(LoadError::fatal("item requires a 'name' attribute")),
        None => Ok(String::new()),
    }
}

/// Parses `xml` as a document and loads the tree from its root
/// element.
pub fn load_from_xml_string(xml: &str, flags: LoadFlags) -> Result<MatchingItem, LoadError> {
    let doc = dom::new_document(xml).map_err(|e| LoadError::fatal(format!("invalid matching-item XML: {}", e)))?;
    let root = doc.root_element().ok_or_else(|| LoadError::fatal("matching-item XML has no root element"))?;
    load_from_xml(&root, flags)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_a_simple_string_item_from_xml() {
        let xml = r#"<string name="user">alice</string>"#;
        let item = load_from_xml_string(xml, LoadFlags::default()).unwrap();
        match item.kind {
            ItemKind::String { name, value, .. } => {
                assert_eq!(name, "user");
                assert_eq!(value, "alice");
            }
            _ => panic!("expected a string item"),
        }
    }

    #[test]
    fn loads_a_list_from_flat_params() {
        let mut params = ParamMap::new();
        params.add("rule:item:1:user", "alice");
        params.add("rule:item:2:ip", "^10\\.");
        params.add("rule:item:2:type:ip", "regexp");
        let item = load_from_params(&params, "rule", LoadFlags::default()).unwrap();
        match item.kind {
            ItemKind::List { match_all, items, .. } => {
                assert!(match_all);
                assert_eq!(items.len(), 2);
                match &items[0].kind {
                    ItemKind::String { name, value, .. } => {
                        assert_eq!(name, "user");
                        assert_eq!(value, "alice");
                    }
                    _ => panic!("expected a string item"),
                }
                match &items[1].kind {
                    ItemKind::Regexp { name, regex, .. } => {
                        assert_eq!(name, "ip");
                        assert_eq!(regex.source(), r"^10\.");
                    }
                    _ => panic!("expected a regexp item"),
                }
            }
            _ => panic!("expected a list"),
        }
    }

    #[test]
    fn ignore_failed_skips_a_bad_sub_item() {
        let xml = r#"<list><string name="a">x</string><regexp name="b">(</regexp></list>"#;
        let flags = LoadFlags::new(LoadFlags::IGNORE_FAILED | LoadFlags::VALIDATE_REGEX);
        let item = load_from_xml_string(xml, flags).unwrap();
        match item.kind {
            ItemKind::List { items, .. } => assert_eq!(items.len(), 1),
            _ => panic!("expected a list"),
        }
    }
}
