use html5ever::tree_builder::TreeSink;
use scraper::{ElementRef, Html};
use tracing::{debug, info, warn};

use crate::answer::{extract_answer, is_blank};
use crate::contest::ContestConfig;
use crate::error::{ExtractError, FragmentKind};
use crate::locate::{self, selector};
use crate::model::{QuestionRecord, Source, TopicFile};

/// A question item with its answer-choice list separated out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionParts {
    pub content: String,
    pub choices: Vec<String>,
}

/// Builds one record per question of a contest-year.
///
/// Stops at the first structural error; a year is either fully built or not
/// at all.
pub fn build_question_records(
    question_doc: &Html,
    solution_doc: &Html,
    topics: &TopicFile,
    config: &ContestConfig,
) -> Result<Vec<QuestionRecord>, ExtractError> {
    let questions = locate::question_items(question_doc);
    let solutions = locate::solution_items(solution_doc)?;

    let count = config.question_count.min(questions.len());
    if questions.len() < config.question_count {
        warn!(
            year = config.year,
            contest = %config.contest,
            found = questions.len(),
            expected = config.question_count,
            "fewer questions than expected"
        );
    }
    let last_solution = config.question_count.min(solutions.len()).saturating_sub(1);

    let mut records = Vec::with_capacity(count);
    for (index, question) in questions.into_iter().take(count).enumerate() {
        let parts = split_question(question, index, config)?;

        let solution = solutions
            .get(index)
            .ok_or(ExtractError::MissingSolution { index })?;
        let extracted = extract_answer(&solution.html(), index, index == last_solution)?;

        let source = Source {
            year: config.year,
            number: index as u32,
        };
        let topics = topics.lookup(source).cloned();
        if topics.is_none() {
            debug!(year = config.year, number = source.printed_number(), "no topics");
        }

        records.push(QuestionRecord {
            content: parts.content,
            answer_choices: parts.choices,
            solution: extracted.body,
            correct_answer: extracted.answer,
            topics,
            source,
            percentage_correct: None,
        });
    }

    info!(
        year = config.year,
        contest = %config.contest,
        count = records.len(),
        "built question records"
    );
    Ok(records)
}

/// Separates a question item from its answer-choice list.
pub fn split_question(
    question: ElementRef<'_>,
    index: usize,
    config: &ContestConfig,
) -> Result<QuestionParts, ExtractError> {
    let markup = if !locate::has_nested_list(question) && config.allows_sibling_layout() {
        debug!(year = config.year, index, "rebuilding question from siblings");
        locate::reconstruct_item(question)
    } else {
        question.html()
    };
    split_fragment(&markup, index)
}

/// Works on a fresh parse of `markup`. With a drawing toggle present the
/// toggle's own list comes first, so the second list holds the choices.
pub fn split_fragment(markup: &str, index: usize) -> Result<QuestionParts, ExtractError> {
    let mut tree = Html::parse_fragment(markup);

    let chosen = {
        let lists: Vec<_> = tree.select(&selector("ol")).collect();
        let has_toggle = tree.select(&selector("button")).next().is_some();
        let position = if has_toggle && lists.len() > 1 { 1 } else { 0 };
        lists
            .get(position)
            .map(|list| (list.id(), choice_texts(*list)))
    };

    let choices = match chosen {
        Some((id, choices)) => {
            tree.remove_from_parent(&id);
            choices
        }
        None => Vec::new(),
    };

    if is_blank(tree.root_element()) {
        return Err(ExtractError::EmptyBody {
            kind: FragmentKind::Question,
            index,
        });
    }

    Ok(QuestionParts {
        content: tree.root_element().inner_html(),
        choices,
    })
}

// choices rendered purely as markup (fractions, images) have no text
fn choice_texts(list: ElementRef<'_>) -> Vec<String> {
    list.select(&selector("li"))
        .map(|item| {
            let text: String = item.text().collect();
            if text.trim().is_empty() {
                item.inner_html()
            } else {
                text
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_fragment_should_remove_choice_list() {
        let parts = split_fragment(
            r#"<li><p>What is 1+1?</p><ol type="A"><li>1</li><li>2</li></ol></li>"#,
            0,
        )
        .unwrap();
        assert_eq!(parts.choices, vec!["1", "2"]);
        insta::assert_snapshot!(parts.content, @"<li><p>What is 1+1?</p></li>");
    }

    #[test]
    fn split_fragment_should_prefer_second_list_with_toggle() {
        let parts = split_fragment(
            r#"<li><p>Shape?</p><button>Show</button><div><ol><li>label</li></ol></div><ol type="A"><li>square</li><li><img src="c.png"></li></ol></li>"#,
            1,
        )
        .unwrap();
        assert_eq!(parts.choices, vec!["square", r#"<img src="c.png">"#]);
        assert!(parts.content.contains("label"));
        assert!(!parts.content.contains("square"));
    }

    #[test]
    fn split_fragment_should_keep_open_ended_question() {
        let parts = split_fragment("<li><p>How many?</p></li>", 20).unwrap();
        assert!(parts.choices.is_empty());
        assert_eq!(parts.content, "<li><p>How many?</p></li>");
    }

    #[test]
    fn split_fragment_should_reject_question_without_body() {
        assert_eq!(
            split_fragment("<li><ol><li>1</li></ol></li>", 4).unwrap_err(),
            ExtractError::EmptyBody {
                kind: FragmentKind::Question,
                index: 4
            }
        );
    }
}
