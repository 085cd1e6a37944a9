//! Finds the list items that carry questions and solutions in CEMC contest pages.
//!
//! Question pages are a loose sequence of `<ol>` elements: a front-matter list,
//! one or more lists of questions, and assorted lists used for answer choices
//! or drawing labels. Which lists count as questions is decided by a small set
//! of named exclusion rules, each tied to a layout seen in a specific year.

use html5ever::tree_builder::TreeSink;
use scraper::{ElementRef, Html, Selector};

use crate::error::ExtractError;

pub(crate) fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static selector must parse")
}

/// Reasons a candidate `<ol>` is not a question list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListExclusion {
    /// The first candidate holds instructions, never questions.
    FrontMatter,
    /// 2020 pages render answer choices as top-level `type="a"` lists.
    AlphabeticNumbering,
    /// Lists revealed by a hide/show drawing button label the drawing.
    DrawingToggle,
}

impl ListExclusion {
    pub const ALL: [ListExclusion; 3] = [
        ListExclusion::FrontMatter,
        ListExclusion::AlphabeticNumbering,
        ListExclusion::DrawingToggle,
    ];

    fn excludes(&self, position: usize, list: ElementRef<'_>, doc: &DocumentFacts<'_>) -> bool {
        match self {
            ListExclusion::FrontMatter => position == 0,
            ListExclusion::AlphabeticNumbering => is_alphabetic(list),
            ListExclusion::DrawingToggle => doc.toggle_targets.contains(&list),
        }
    }
}

struct DocumentFacts<'a> {
    toggle_targets: Vec<ElementRef<'a>>,
}

impl<'a> DocumentFacts<'a> {
    fn collect(root: ElementRef<'a>) -> Self {
        let toggle_targets = root
            .select(&selector("button"))
            .filter_map(toggle_target)
            .collect();
        Self { toggle_targets }
    }
}

fn is_alphabetic(list: ElementRef<'_>) -> bool {
    matches!(list.value().attr("type"), Some("a") | Some("A"))
}

/// The list a hide/show button controls: its next sibling element when that
/// is a list, otherwise the first list inside that sibling.
pub(crate) fn toggle_target(button: ElementRef<'_>) -> Option<ElementRef<'_>> {
    let next = button.next_siblings().find_map(ElementRef::wrap)?;
    if next.value().name() == "ol" {
        return Some(next);
    }
    next.select(&selector("ol")).next()
}

fn body(doc: &Html) -> ElementRef<'_> {
    doc.select(&selector("body"))
        .next()
        .unwrap_or_else(|| doc.root_element())
}

fn direct_items(list: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    list.children()
        .filter_map(ElementRef::wrap)
        .filter(|child| child.value().name() == "li")
}

/// Question lists of a contest page, in document order.
pub fn question_lists(doc: &Html) -> Vec<ElementRef<'_>> {
    let root = body(doc);
    let facts = DocumentFacts::collect(root);

    root.select(&selector("ol"))
        .filter(|list| list.value().attr("class").is_none())
        .enumerate()
        .filter(|(position, list)| {
            !ListExclusion::ALL
                .iter()
                .any(|rule| rule.excludes(*position, *list, &facts))
        })
        .map(|(_, list)| list)
        .collect()
}

/// Question items of a contest page, in document order.
pub fn question_items(doc: &Html) -> Vec<ElementRef<'_>> {
    question_lists(doc).into_iter().flat_map(direct_items).collect()
}

/// Solution items: the direct items of the second top-level list of the body.
pub fn solution_items(doc: &Html) -> Result<Vec<ElementRef<'_>>, ExtractError> {
    let list = body(doc)
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|child| child.value().name() == "ol")
        .nth(1)
        .ok_or(ExtractError::MissingList {
            what: "solution list (second top-level <ol>)",
        })?;
    Ok(direct_items(list).collect())
}

/// Markup of a question item, widened for the sibling layout when the item
/// has no nested list: the item followed by every sibling node up to the
/// next `<li>`.
///
/// The parent list is re-parsed and everything outside that range removed,
/// so text and comments go through the same serializer as the item itself.
pub fn reconstruct_item(item: ElementRef<'_>) -> String {
    let Some(list) = item.parent().and_then(ElementRef::wrap) else {
        return item.html();
    };
    let siblings: Vec<_> = list.children().collect();
    let Some(start) = siblings.iter().position(|node| node.id() == item.id()) else {
        return item.html();
    };
    let end = siblings[start + 1..]
        .iter()
        .position(|node| ElementRef::wrap(*node).is_some_and(|el| el.value().name() == "li"))
        .map_or(siblings.len(), |offset| start + 1 + offset);

    let mut tree = Html::parse_fragment(&list.html());
    let outside: Vec<_> = match copied_list(&tree) {
        Some(copy) => copy
            .children()
            .enumerate()
            .filter(|(position, _)| !(start..end).contains(position))
            .map(|(_, node)| node.id())
            .collect(),
        None => return item.html(),
    };
    for id in &outside {
        tree.remove_from_parent(id);
    }
    copied_list(&tree).map_or_else(|| item.html(), |copy| copy.inner_html())
}

fn copied_list(tree: &Html) -> Option<ElementRef<'_>> {
    tree.root_element().children().find_map(ElementRef::wrap)
}

pub fn has_nested_list(item: ElementRef<'_>) -> bool {
    item.select(&selector("ol")).next().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(items: &[ElementRef<'_>]) -> Vec<String> {
        items
            .iter()
            .map(|item| {
                item.children()
                    .filter_map(|node| node.value().as_text().map(|t| t.trim().to_string()))
                    .collect::<String>()
            })
            .collect()
    }

    #[test]
    fn question_items_should_skip_front_matter_and_classed_lists() {
        let doc = Html::parse_document(
            r#"<body>
            <ol class="toc"><li>toc</li></ol>
            <ol><li>instructions</li></ol>
            <ol><li>one</li><li>two</li></ol>
            <ol><li>three</li></ol>
            </body>"#,
        );
        let items = question_items(&doc);
        assert_eq!(texts(&items), vec!["one", "two", "three"]);
    }

    #[test]
    fn question_items_should_skip_alphabetic_lists() {
        let doc = Html::parse_document(
            r#"<body>
            <ol><li>instructions</li></ol>
            <ol><li>one</li></ol>
            <ol type="a"><li>choice a</li><li>choice b</li></ol>
            <ol><li>two</li></ol>
            </body>"#,
        );
        assert_eq!(texts(&question_items(&doc)), vec!["one", "two"]);
    }

    #[test]
    fn question_items_should_skip_drawing_toggle_list() {
        let doc = Html::parse_document(
            r#"<body>
            <ol><li>instructions</li></ol>
            <ol><li>one</li></ol>
            <button>Show drawing</button>
            <div><ol><li>label</li></ol></div>
            <ol><li>two</li></ol>
            </body>"#,
        );
        assert_eq!(texts(&question_items(&doc)), vec!["one", "two"]);
    }

    #[test]
    fn exclusion_rules_should_be_evaluated_independently() {
        let doc = Html::parse_document(r#"<body><ol type="a"><li>x</li></ol></body>"#);
        let root = body(&doc);
        let facts = DocumentFacts::collect(root);
        let list = root.select(&selector("ol")).next().unwrap();
        assert!(ListExclusion::FrontMatter.excludes(0, list, &facts));
        assert!(!ListExclusion::FrontMatter.excludes(1, list, &facts));
        assert!(ListExclusion::AlphabeticNumbering.excludes(1, list, &facts));
        assert!(!ListExclusion::DrawingToggle.excludes(1, list, &facts));
    }

    #[test]
    fn toggle_target_should_accept_bare_list_sibling() {
        let doc = Html::parse_document(
            r#"<body><p><button>toggle</button></p><div><button>t</button> <ol id="x"><li>l</li></ol></div></body>"#,
        );
        let buttons: Vec<_> = doc.select(&selector("button")).collect();
        assert!(toggle_target(buttons[0]).is_none());
        let target = toggle_target(buttons[1]).unwrap();
        assert_eq!(target.value().attr("id"), Some("x"));
    }

    #[test]
    fn solution_items_should_use_second_top_level_list() {
        let doc = Html::parse_document(
            r#"<body>
            <ol><li>front</li></ol>
            <div><ol><li>nested</li></ol></div>
            <ol><li>s1</li><li>s2</li></ol>
            </body>"#,
        );
        let items = solution_items(&doc).unwrap();
        assert_eq!(texts(&items), vec!["s1", "s2"]);
    }

    #[test]
    fn solution_items_should_fail_without_second_list() {
        let doc = Html::parse_document("<body><ol><li>front</li></ol></body>");
        assert_eq!(
            solution_items(&doc).unwrap_err(),
            ExtractError::MissingList {
                what: "solution list (second top-level <ol>)"
            }
        );
    }

    #[test]
    fn reconstruct_item_should_walk_siblings_until_next_item() {
        let doc = Html::parse_document(
            r#"<body><ol><li>first</li><ol type="A"><li>7</li><li>8</li></ol><!--c--><li>second</li></ol></body>"#,
        );
        let list = doc.select(&selector("body > ol")).next().unwrap();
        let first = direct_items(list).next().unwrap();
        assert!(!has_nested_list(first));
        insta::assert_snapshot!(
            reconstruct_item(first),
            @r#"<li>first</li><ol type="A"><li>7</li><li>8</li></ol><!--c-->"#
        );
    }

    #[test]
    fn reconstruct_item_should_serialize_sibling_text_like_elements() {
        let doc = Html::parse_document(
            "<body><ol><li>first</li>a &lt; b&nbsp;&amp; c<ol type=\"A\"><li>x</li></ol><li>second</li></ol></body>",
        );
        let list = doc.select(&selector("body > ol")).next().unwrap();
        let mut items = direct_items(list);
        let first = items.next().unwrap();
        insta::assert_snapshot!(
            reconstruct_item(first),
            @r#"<li>first</li>a &lt; b&nbsp;&amp; c<ol type="A"><li>x</li></ol>"#
        );

        let second = items.next().unwrap();
        assert_eq!(reconstruct_item(second), "<li>second</li>");
    }
}
