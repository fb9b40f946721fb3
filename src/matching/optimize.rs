//
// matching/optimize.rs
//
// paramatch: declarative data-matching and XML/XPath toolkit.
//

//!
//! Post-load tree optimisation: a `List` with a single surviving child
//! is replaced by that child (with the list's negation folded into
//! it), and an empty `List` is pruned away entirely. Nested lists are
//! optimised bottom-up before this rule is applied to their parent, so
//! a `List[List[x]]` collapses all the way down to `x`.
//!

use super::{ItemKind, MatchingItem};

/// Optimises `item`, returning `None` only when `item` itself (or
/// everything under it) optimised away to nothing — the sole case is
/// an empty `List` with no surviving children.
pub fn optimize(item: MatchingItem) -> Option<MatchingItem> {
    let MatchingItem { id, negated, missing_match, kind } = item;
    match kind {
        ItemKind::List { name, match_all, items } => {
            let optimized: Vec<MatchingItem> = items.into_iter().filter_map(optimize).collect();
            match optimized.len() {
                0 => None,
                1 => {
                    let mut only = optimized.into_iter().next().unwrap();
                    if negated {
                        only.negated = !only.negated;
                    }
                    Some(only)
                }
                _ => Some(MatchingItem {
                    id,
                    negated,
                    missing_match,
                    kind: ItemKind::List { name, match_all, items: optimized },
                }),
            }
        }
        other => Some(MatchingItem { id, negated, missing_match, kind: other }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::{LazyRegex, MatchContext, MissingMatch};
    use crate::param::ParamMap;

    fn string_item(name: &str, value: &str) -> MatchingItem {
        MatchingItem::new(ItemKind::String { name: name.to_string(), value: value.to_string(), case_insensitive: false })
    }

    #[test]
    fn collapses_singleton_list_and_pushes_negation_into_child() {
        let list = MatchingItem::new(ItemKind::List { name: String::new(), match_all: true, items: vec![string_item("a", "1")] }).negated(true);
        let optimized = optimize(list).expect("single-child list optimises to that child");
        match optimized.kind {
            ItemKind::String { name, value, .. } => {
                assert_eq!(name, "a");
                assert_eq!(value, "1");
            }
            _ => panic!("expected the promoted string item"),
        }
        assert!(optimized.negated, "negation of the collapsed list must land on the child");
    }

    #[test]
    fn prunes_empty_list() {
        let list = MatchingItem::new(ItemKind::List { name: String::new(), match_all: false, items: vec![] });
        assert!(optimize(list).is_none());
    }

    #[test]
    fn optimises_nested_lists_bottom_up() {
        let inner = MatchingItem::new(ItemKind::List { name: String::new(), match_all: true, items: vec![string_item("a", "1")] });
        let outer = MatchingItem::new(ItemKind::List { name: String::new(), match_all: true, items: vec![inner, string_item("b", "2")] });
        let optimized = optimize(outer).unwrap();
        match optimized.kind {
            ItemKind::List { items, .. } => {
                assert_eq!(items.len(), 2);
                assert!(matches!(items[0].kind, ItemKind::String { .. }));
            }
            _ => panic!("expected a two-item list after the nested singleton collapsed"),
        }
    }

    #[test]
    fn scenario_optimised_singleton_matches_same_as_unoptimized() {
        let regex_item = MatchingItem::new(ItemKind::Regexp {
            name: "ip".to_string(),
            regex: LazyRegex::new(r"^10\.", false),
            basic: false,
        });
        let list = MatchingItem::new(ItemKind::List { name: String::new(), match_all: true, items: vec![regex_item.clone()] });
        let optimized = optimize(list.clone()).unwrap();
        let ctx = MatchContext::new();

        for value in ["10.0.0.1", "192.168.0.1"] {
            let mut p1 = ParamMap::new();
            p1.add("ip", value);
            let mut p2 = p1.clone();
            assert_eq!(
                list.eval_match(&mut p1, &ctx).is_some(),
                optimized.eval_match(&mut p2, &ctx).is_some()
            );
        }
        let _ = MissingMatch::RunMatch;
    }
}
