//! End-to-end properties of the batch planner over parsed documents.

use mdlift_engine::{Anchor, BlockId, WalkOptions, plan_units, walk_markdown};
use std::collections::HashSet;

fn parse(markdown: &str) -> mdlift_engine::WalkOutput {
    walk_markdown(markdown, &WalkOptions::default(), None)
}

/// A document with nesting at several depths: lists, quotes and a table.
const DOCUMENT: &str = "\
# Heading

intro paragraph

- top one
  - nested one
    - deeper
  - nested two
- top two

> a quote
> with text

| a | b | c |
|---|---|---|
| 1 | 2 | 3 |
| 4 | 5 | 6 |

final paragraph
";

#[test]
fn units_reconstruct_the_forest_for_any_ceiling() {
    let output = parse(DOCUMENT);
    let all_ids: HashSet<BlockId> = output.forest.iter().map(|block| block.id).collect();

    for ceiling in [2, 3, 4, 7, 10, 1000] {
        let units = plan_units(&output.forest, ceiling);
        let mut seen: HashSet<BlockId> = HashSet::new();
        for unit in &units {
            for id in unit.children.iter().chain(unit.descendants.iter()) {
                assert!(
                    seen.insert(*id),
                    "ceiling {ceiling}: block {id} appears twice"
                );
            }
        }
        assert_eq!(seen, all_ids, "ceiling {ceiling}: block set differs");
    }
}

#[test]
fn no_unit_reaches_the_ceiling() {
    let output = parse(DOCUMENT);
    for ceiling in [2, 3, 5, 8, 1000] {
        for unit in plan_units(&output.forest, ceiling) {
            assert!(
                unit.children.len() + unit.descendants.len() < ceiling,
                "ceiling {ceiling} violated"
            );
        }
    }
}

#[test]
fn merging_is_maximal_for_same_anchor_neighbours() {
    let output = parse(DOCUMENT);
    for ceiling in [3, 5, 10] {
        let units = plan_units(&output.forest, ceiling);
        for pair in units.windows(2) {
            if pair[0].anchor == pair[1].anchor {
                let combined = pair[0].children.len()
                    + pair[0].descendants.len()
                    + pair[1].children.len()
                    + pair[1].descendants.len();
                assert!(
                    combined >= ceiling,
                    "ceiling {ceiling}: adjacent same-anchor units were left unmerged"
                );
            }
        }
    }
}

#[test]
fn empty_markdown_plans_zero_units() {
    let output = parse("");
    assert!(output.forest.is_empty());
    assert!(plan_units(&output.forest, 1000).is_empty());
}

#[test]
fn simple_document_fits_one_unit() {
    let output = parse("# Title\n\nHello **world**");
    let units = plan_units(&output.forest, 1000);

    assert_eq!(units.len(), 1);
    assert_eq!(units[0].anchor, Anchor::DocumentRoot);
    assert_eq!(units[0].children.len(), 2);
    assert!(units[0].descendants.is_empty());
}

#[test]
fn nested_list_keeps_child_as_descendant() {
    let output = parse("- A\n  - B");
    let units = plan_units(&output.forest, 1000);

    assert_eq!(units.len(), 1);
    assert_eq!(units[0].children, vec![output.forest.roots()[0]]);
    assert_eq!(units[0].descendants.len(), 1);
}

#[test]
fn split_subtrees_anchor_on_their_parents() {
    // Deep single chain: root -> a -> b -> c. With ceiling 2 every block
    // travels alone and anchors on its parent.
    let output = parse("- r\n  - a\n    - b\n      - c");
    let units = plan_units(&output.forest, 2);

    assert_eq!(units.len(), 4);
    assert_eq!(units[0].anchor, Anchor::DocumentRoot);
    let ids: Vec<BlockId> = output.forest.iter().map(|block| block.id).collect();
    for (unit, parent) in units[1..].iter().zip(ids.iter()) {
        assert_eq!(unit.anchor, Anchor::Block(*parent));
    }
}
