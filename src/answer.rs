use std::sync::LazyLock;

use html5ever::tree_builder::TreeSink;
use regex::Regex;
use scraper::{ElementRef, Html};

use crate::error::{ExtractError, FragmentKind};
use crate::locate::selector;

static ANSWER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:<[^>]+>)*Answer(?::)?(?:</[^>]+>)*(?::\s*)?(?:<[^>]+>)*\s*(?:\((?P<letter>[A-Za-z]+)\)|(?:\\\()*(?P<digits>\d+)(?:\\\))*)",
    )
    .unwrap()
});

/// A fragment split into its answer value and the remaining body markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedAnswer {
    pub answer: String,
    pub body: String,
}

/// Pulls the normalized answer out of one answer paragraph's markup.
///
/// Serialized markup spells non-breaking spaces as `&nbsp;`; they are turned
/// back into U+00A0 so the pattern's `\s` matches them like any whitespace.
pub fn match_answer(paragraph: &str) -> Option<String> {
    let paragraph = paragraph.replace("&nbsp;", "\u{a0}");
    let caps = ANSWER_RE.captures(&paragraph)?;
    caps.name("letter")
        .or_else(|| caps.name("digits"))
        .map(|m| m.as_str().to_string())
}

fn answer_paragraph<'a>(paragraphs: &[ElementRef<'a>], is_final: bool) -> Option<ElementRef<'a>> {
    let last = *paragraphs.last()?;
    if is_final && !last.html().contains("Answer") && paragraphs.len() > 1 {
        // a footer paragraph may trail the last solution
        return Some(paragraphs[paragraphs.len() - 2]);
    }
    Some(last)
}

/// Splits the trailing answer paragraph off a solution fragment.
///
/// `is_final` marks the last item of the contest, whose answer may be
/// followed by an unrelated footer paragraph. The fragment markup is parsed
/// afresh, so the caller's document is never modified.
pub fn extract_answer(
    fragment: &str,
    index: usize,
    is_final: bool,
) -> Result<ExtractedAnswer, ExtractError> {
    let mut tree = Html::parse_fragment(fragment);

    let (answer, paragraph_id) = {
        let paragraphs: Vec<_> = tree.select(&selector("p")).collect();
        let paragraph = answer_paragraph(&paragraphs, is_final)
            .ok_or(ExtractError::MissingAnswer { index })?;
        let answer =
            match_answer(&paragraph.html()).ok_or(ExtractError::MissingAnswer { index })?;
        (answer, paragraph.id())
    };
    tree.remove_from_parent(&paragraph_id);

    if is_blank(tree.root_element()) {
        return Err(ExtractError::EmptyBody {
            kind: FragmentKind::Solution,
            index,
        });
    }

    Ok(ExtractedAnswer {
        answer,
        body: tree.root_element().inner_html(),
    })
}

/// True when a fragment has no content besides a possibly empty `<li>` shell.
pub(crate) fn is_blank(root: ElementRef<'_>) -> bool {
    let children: Vec<_> = root.children().filter_map(ElementRef::wrap).collect();
    match children.as_slice() {
        [] => root.text().all(|text| text.trim().is_empty()),
        [only] if only.value().name() == "li" => {
            is_blank(*only)
                && root
                    .children()
                    .filter_map(|node| node.value().as_text().map(|t| t.trim().is_empty()))
                    .all(|blank| blank)
        }
        _ => false,
    }
}
