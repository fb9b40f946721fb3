//
// matching/dump.rs
//
// paramatch: declarative data-matching and XML/XPath toolkit.
//

//!
//! The inverse of `load`: renders a matching-item tree as a compact
//! text form (for logs), an XML element tree (the mirror of
//! `load::load_from_xml`), or a flat parameter list (the mirror of
//! `load::load_from_params`).
//!

use super::{ItemKind, MatchingItem, MissingMatch};
use crate::dom::NodePtr;
use crate::param::ParamMap;

/// Bit flags controlling dumper behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpFlags(pub u32);

impl DumpFlags {
    pub const NONE: u32 = 0;
    pub const IGNORE_EMPTY: u32 = 1 << 0;
    pub const IGNORE_NAME: u32 = 1 << 1;
    pub const DUMP_ID: u32 = 1 << 2;

    pub fn new(bits: u32) -> Self {
        DumpFlags(bits)
    }

    pub fn contains(&self, bit: u32) -> bool {
        self.0 & bit != 0
    }
}

impl Default for DumpFlags {
    fn default() -> Self {
        DumpFlags(DumpFlags::NONE)
    }
}

/// Rendering knobs for the text form.
#[derive(Debug, Clone)]
pub struct DumpOptions {
    pub flags: DumpFlags,
    /// Character wrapped around a `string` leaf's value in the text
    /// form, e.g. `'` to render `name: 'value'`.
    pub str_enclose: char,
    /// Character wrapped around a `regexp` leaf's source.
    pub rex_enclose: char,
    /// Separator between an item's name and its value in the text
    /// form.
    pub name_sep: String,
}

impl DumpOptions {
    pub fn new() -> Self {
        DumpOptions { flags: DumpFlags::default(), str_enclose: '\'', rex_enclose: '/', name_sep: ": ".to_string() }
    }

    pub fn with_flags(mut self, flags: DumpFlags) -> Self {
        self.flags = flags;
        self
    }
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self::new()
    }
}

fn is_empty_value(item: &MatchingItem) -> bool {
    match &item.kind {
        ItemKind::String { value, .. } => value.is_empty(),
        ItemKind::Regexp { regex, .. } => regex.source().is_empty(),
        ItemKind::Custom { payload, .. } => payload.is_empty(),
        _ => false,
    }
}

fn prop_letters(item: &MatchingItem, list_any: Option<bool>) -> String {
    let mut letters = String::new();
    if item.negated {
        letters.push('!');
    }
    match &item.kind {
        ItemKind::String { case_insensitive, .. } if *case_insensitive => letters.push('i'),
        ItemKind::Regexp { basic, .. } if *basic => letters.push('b'),
        _ => {}
    }
    if let Some(true) = list_any {
        letters.push('a');
    }
    match item.missing_match {
        MissingMatch::Match => letters.push('M'),
        MissingMatch::NoMatch => letters.push('N'),
        MissingMatch::RunMatch => {}
    }
    letters
}

/// Renders a `Custom` item's payload through its registered factory's
/// `dump_value`, if one is still registered; falls back to the raw
/// stored payload otherwise (e.g. the factory was deregistered since
/// the tree was built).
fn custom_dump_value(type_tag: &str, payload: &str) -> String {
    match super::registry::lookup(type_tag) {
        Some(factory) => factory.dump_value(payload),
        None => payload.to_string(),
    }
}

/// The declared `name` field of any item kind (the parameter it will be
/// matched against), `""` for an unnamed leaf or a nameless `Custom`.
fn item_name(kind: &ItemKind) -> &str {
    match kind {
        ItemKind::String { name, .. } => name,
        ItemKind::Regexp { name, .. } => name,
        ItemKind::XPath { name, .. } => name,
        ItemKind::Random { name, .. } => name,
        ItemKind::List { name, .. } => name,
        ItemKind::Custom { name, .. } => name.as_deref().unwrap_or(""),
    }
}

fn type_name(kind: &ItemKind) -> &str {
    match kind {
        ItemKind::String { .. } => "string",
        ItemKind::Regexp { .. } => "regexp",
        ItemKind::XPath { .. } => "xpath",
        ItemKind::Random { .. } => "random",
        ItemKind::List { .. } => "list",
        ItemKind::Custom { type_tag, .. } => type_tag,
    }
}

/// Renders `item` as a compact single-line text form, e.g.
/// `name: 'alice'` or `!ip: /^10\./#b` or `{user: 'alice' ip: /^10\./}`.
pub fn dump_text(item: &MatchingItem, options: &DumpOptions) -> String {
    if options.flags.contains(DumpFlags::IGNORE_EMPTY) && is_empty_value(item) {
        return String::new();
    }
    let mut out = String::new();
    match &item.kind {
        ItemKind::String { name, value, .. } => {
            write_name(&mut out, name, options);
            out.push(options.str_enclose);
            out.push_str(value);
            out.push(options.str_enclose);
            append_props(&mut out, item, None);
        }
        ItemKind::Regexp { name, regex, .. } => {
            write_name(&mut out, name, options);
            out.push(options.rex_enclose);
            out.push_str(regex.source());
            out.push(options.rex_enclose);
            append_props(&mut out, item, None);
        }
        ItemKind::Random { name, val, max } => {
            write_name(&mut out, name, options);
            out.push_str(&format!("random({},{})", val, max));
            append_props(&mut out, item, None);
        }
        ItemKind::XPath { name, path, inner } => {
            write_name(&mut out, name, options);
            out.push_str(path.source());
            if let Some(inner) = inner {
                out.push_str(" => ");
                out.push_str(&dump_text(inner, options));
            }
            append_props(&mut out, item, None);
        }
        ItemKind::Custom { type_tag, name, payload } => {
            out.push_str(type_tag);
            if let Some(name) = name {
                if !options.flags.contains(DumpFlags::IGNORE_NAME) {
                    out.push('(');
                    out.push_str(name);
                    out.push(')');
                }
            }
            out.push_str(&options.name_sep);
            out.push_str(&custom_dump_value(type_tag, payload));
            append_props(&mut out, item, None);
        }
        ItemKind::List { match_all, items, .. } => {
            if item.negated {
                out.push('!');
            }
            out.push(if *match_all { '&' } else { '|' });
            out.push('{');
            for (i, child) in items.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                out.push_str(&dump_text(child, options));
            }
            out.push('}');
        }
    }
    out
}

fn write_name(out: &mut String, name: &str, options: &DumpOptions) {
    if name.is_empty() || options.flags.contains(DumpFlags::IGNORE_NAME) {
        return;
    }
    out.push_str(name);
    out.push_str(&options.name_sep);
}

fn append_props(out: &mut String, item: &MatchingItem, list_any: Option<bool>) {
    let letters = prop_letters(item, list_any);
    if !letters.is_empty() {
        out.push('#');
        out.push_str(&letters);
    }
}

/// Renders `item` as an XML element tree, the mirror of
/// `load::load_from_xml`.
pub fn dump_xml(item: &MatchingItem, options: &DumpOptions) -> NodePtr {
    let tag = type_name(&item.kind);
    let element = NodePtr::new_element(tag).expect("a matching-item type name is always a valid XML name");

    if options.flags.contains(DumpFlags::DUMP_ID) {
        if let Some(id) = &item.id {
            element.set_attribute("id", id.clone());
        }
    }
    let flags_text = xml_flags_text(item, &item.kind);
    if !flags_text.is_empty() {
        element.set_attribute("flags", flags_text);
    }

    match &item.kind {
        ItemKind::String { name, value, .. } => {
            set_name(&element, name, options);
            element.set_text(Some(value.as_str()));
        }
        ItemKind::Regexp { name, regex, .. } => {
            set_name(&element, name, options);
            element.set_text(Some(regex.source()));
        }
        ItemKind::Random { name, val, max } => {
            set_name(&element, name, options);
            element.set_text(Some(format!("{},{}", val, max).as_str()));
        }
        ItemKind::XPath { name, path, inner } => {
            set_name(&element, name, options);
            element.set_text(Some(path.source()));
            if let Some(inner) = inner {
                let wrapper = NodePtr::new_element("match").expect("'match' is a valid XML name");
                let _ = wrapper.add_child(dump_xml(inner, options));
                let _ = element.add_child(wrapper);
            }
        }
        ItemKind::Custom { type_tag, name, payload } => {
            if let Some(name) = name {
                set_name(&element, name, options);
            }
            element.set_text(Some(custom_dump_value(type_tag, payload).as_str()));
        }
        ItemKind::List { name, items, .. } => {
            set_name(&element, name, options);
            for child in items {
                let _ = element.add_child(dump_xml(child, options));
            }
        }
    }
    element
}

fn set_name(element: &NodePtr, name: &str, options: &DumpOptions) {
    if !name.is_empty() && !options.flags.contains(DumpFlags::IGNORE_NAME) {
        element.set_attribute("name", name.to_string());
    }
}

fn xml_flags_text(item: &MatchingItem, kind: &ItemKind) -> String {
    let mut tokens: Vec<&str> = Vec::new();
    if item.negated {
        tokens.push("negated");
    }
    match kind {
        ItemKind::String { case_insensitive, .. } if *case_insensitive => tokens.push("caseinsensitive"),
        ItemKind::Regexp { basic, .. } if *basic => tokens.push("basic"),
        ItemKind::List { match_all, .. } if !match_all => tokens.push("any"),
        _ => {}
    }
    match item.missing_match {
        MissingMatch::Match => tokens.push("missing_match"),
        MissingMatch::NoMatch => tokens.push("missing_no_match"),
        MissingMatch::RunMatch => {}
    }
    tokens.join(" ")
}

/// Renders `item` into flat `{prefix}:...` parameter-map keys, the
/// mirror of `load::load_from_params`. A `List` writes its children
/// under `{prefix}:item:{0,1,2,...}` sub-prefixes.
pub fn dump_params(item: &MatchingItem, params: &mut ParamMap, prefix: &str, options: &DumpOptions) {
    dump_params_suffixed(item, params, prefix, "", options)
}

fn dump_params_suffixed(item: &MatchingItem, params: &mut ParamMap, prefix: &str, suffix: &str, options: &DumpOptions) {
    if options.flags.contains(DumpFlags::IGNORE_EMPTY) && is_empty_value(item) {
        return;
    }
    if options.flags.contains(DumpFlags::DUMP_ID) {
        if let Some(id) = &item.id {
            params.add(key(prefix, "id", suffix), id.clone());
        }
    }
    let flags_text = xml_flags_text(item, &item.kind);
    if !flags_text.is_empty() {
        params.add(key(prefix, "flags", suffix), flags_text);
    }

    match &item.kind {
        ItemKind::String { value, .. } => {
            params.add(key(prefix, "", suffix), value.clone());
        }
        ItemKind::Regexp { regex, .. } => {
            params.add(key(prefix, "", suffix), regex.source().to_string());
            params.add(key(prefix, "type", suffix), "regexp".to_string());
        }
        ItemKind::Random { val, max, .. } => {
            params.add(key(prefix, "", suffix), format!("{},{}", val, max));
            params.add(key(prefix, "type", suffix), "random".to_string());
        }
        ItemKind::XPath { path, .. } => {
            params.add(key(prefix, "", suffix), path.source().to_string());
            params.add(key(prefix, "type", suffix), "xpath".to_string());
        }
        ItemKind::Custom { type_tag, payload, .. } => {
            params.add(key(prefix, "", suffix), payload.clone());
            params.add(key(prefix, "type", suffix), type_tag.clone());
        }
        ItemKind::List { items, .. } => {
            let item_prefix = key(prefix, "item", "");
            for (i, child) in items.iter().enumerate() {
                let child_prefix = format!("{}:{}", item_prefix, i);
                // A nested list is detected structurally on reload (by
                // the presence of further `item:` children), not by
                // name, so only a leaf child's name is worth encoding.
                let name = if matches!(child.kind, ItemKind::List { .. }) { "" } else { item_name(&child.kind) };
                dump_params_suffixed(child, params, &child_prefix, name, options);
            }
        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::LazyRegex;

    #[test]
    fn dumps_a_string_leaf_to_text() {
        let item = MatchingItem::new(ItemKind::String { name: "user".to_string(), value: "alice".to_string(), case_insensitive: false });
        assert_eq!(dump_text(&item, &DumpOptions::default()), "user: 'alice'");
    }

    #[test]
    fn dumps_negated_regex_with_prop_letter() {
        let item = MatchingItem::new(ItemKind::Regexp { name: "ip".to_string(), regex: LazyRegex::new(r"^10\.", false), basic: true })
            .negated(true);
        assert_eq!(dump_text(&item, &DumpOptions::default()), "ip: /^10\\./#!b");
    }

    #[test]
    fn dumps_a_list_to_text() {
        let list = MatchingItem::new(ItemKind::List {
            name: String::new(),
            match_all: true,
            items: vec![
                MatchingItem::new(ItemKind::String { name: "user".to_string(), value: "alice".to_string(), case_insensitive: false }),
            ],
        });
        assert_eq!(dump_text(&list, &DumpOptions::default()), "&{user: 'alice'}");
    }

    #[test]
    fn xml_round_trips_through_load() {
        use crate::matching::load::{load_from_xml, LoadFlags};
        let item = MatchingItem::new(ItemKind::List {
            name: String::new(),
            match_all: true,
            items: vec![
                MatchingItem::new(ItemKind::String { name: "user".to_string(), value: "alice".to_string(), case_insensitive: false }),
                MatchingItem::new(ItemKind::Regexp { name: "ip".to_string(), regex: LazyRegex::new(r"^10\.", false), basic: false }),
            ],
        });
        let xml = dump_xml(&item, &DumpOptions::default());
        let reloaded = load_from_xml(&xml, LoadFlags::new(LoadFlags::NO_OPTIMIZE)).unwrap();
        match reloaded.kind {
            ItemKind::List { items, .. } => assert_eq!(items.len(), 2),
            _ => panic!("expected a list"),
        }
    }

    #[test]
    fn params_round_trip_through_load() {
        use crate::matching::load::{load_from_params, LoadFlags};
        let item = MatchingItem::new(ItemKind::List {
            name: String::new(),
            match_all: true,
            items: vec![MatchingItem::new(ItemKind::String { name: "user".to_string(), value: "alice".to_string(), case_insensitive: false })],
        });
        let mut params = ParamMap::new();
        dump_params(&item, &mut params, "rule", &DumpOptions::default());
        let reloaded = load_from_params(&params, "rule", LoadFlags::new(LoadFlags::NO_OPTIMIZE)).unwrap();
        match reloaded.kind {
            ItemKind::List { items, .. } => {
                assert_eq!(items.len(), 1);
                match &items[0].kind {
                    ItemKind::String { name, value, .. } => {
                        assert_eq!(name, "user");
                        assert_eq!(value, "alice");
                    }
                    _ => panic!("expected a string item"),
                }
            }
            _ => panic!("expected a list"),
        }
    }

    #[test]
    fn params_round_trip_preserves_each_childs_own_name() {
        use crate::matching::load::{load_from_params, LoadFlags};
        use crate::matching::LazyRegex;
        let item = MatchingItem::new(ItemKind::List {
            name: String::new(),
            match_all: true,
            items: vec![
                MatchingItem::new(ItemKind::String { name: "user".to_string(), value: "alice".to_string(), case_insensitive: false }),
                MatchingItem::new(ItemKind::Regexp { name: "ip".to_string(), regex: LazyRegex::new(r"^10\.", false), basic: false }),
            ],
        });
        let mut params = ParamMap::new();
        dump_params(&item, &mut params, "rule", &DumpOptions::default());
        let reloaded = load_from_params(&params, "rule", LoadFlags::new(LoadFlags::NO_OPTIMIZE)).unwrap();
        match reloaded.kind {
            ItemKind::List { items, .. } => {
                assert_eq!(items.len(), 2);
                let names: Vec<&str> = items
                    .iter()
                    .map(|i| match &i.kind {
                        ItemKind::String { name, .. } => name.as_str(),
                        ItemKind::Regexp { name, .. } => name.as_str(),
                        _ => panic!("unexpected kind"),
                    })
                    .collect();
                assert_eq!(names, vec!["user", "ip"]);
            }
            _ => panic!("expected a list"),
        }
    }
}
