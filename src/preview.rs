use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use askama::Template;
use scraper::Html;

use crate::contest::Contest;
use crate::model::{ContestDataset, QuestionRecord, TopicId};

/// Review page for a decoded dataset, used to eyeball extraction results.
#[derive(Debug, Template)]
#[template(path = "preview.html.j2")]
pub struct PreviewPage<'a> {
    pub title: String,
    pub with_solutions: bool,
    pub years: Vec<PreviewYear<'a>>,
}

#[derive(Debug)]
pub struct PreviewYear<'a> {
    pub year: u32,
    pub questions: Vec<PreviewQuestion<'a>>,
}

#[derive(Debug)]
pub struct PreviewQuestion<'a> {
    pub number: u32,
    pub content: &'a str,
    pub choices: Vec<PreviewChoice<'a>>,
    pub solution: &'a str,
    pub answer: &'a str,
    pub percentage: String,
    pub topics: Vec<&'a str>,
}

/// An answer choice, which is plain text unless its text was blank and the
/// item's markup was kept instead.
#[derive(Debug)]
pub struct PreviewChoice<'a> {
    pub value: &'a str,
    pub is_markup: bool,
}

impl<'a> PreviewChoice<'a> {
    fn new(value: &'a str) -> Self {
        let fragment = Html::parse_fragment(value);
        let is_markup = fragment
            .root_element()
            .text()
            .all(|text| text.trim().is_empty());
        Self { value, is_markup }
    }
}

impl<'a> PreviewPage<'a> {
    pub fn new(contest: Contest, dataset: &'a ContestDataset) -> Self {
        let names: HashMap<TopicId, &str> =
            dataset.legend.iter().map(|(name, id)| (id, name)).collect();

        let mut years: BTreeMap<u32, Vec<PreviewQuestion<'a>>> = BTreeMap::new();
        for record in &dataset.data {
            years
                .entry(record.source.year)
                .or_default()
                .push(PreviewQuestion::new(record, &names));
        }

        Self {
            title: format!("{} contest", contest.name()),
            with_solutions: false,
            years: years
                .into_iter()
                .map(|(year, mut questions)| {
                    questions.sort_by_key(|q| q.number);
                    PreviewYear { year, questions }
                })
                .collect(),
        }
    }

    pub fn generate_questions(&mut self) -> Result<String> {
        self.with_solutions = false;
        Ok(self.render()?)
    }

    pub fn generate_solutions(&mut self) -> Result<String> {
        self.with_solutions = true;
        Ok(self.render()?)
    }
}

impl<'a> PreviewQuestion<'a> {
    fn new(record: &'a QuestionRecord, names: &HashMap<TopicId, &'a str>) -> Self {
        let topics = record
            .topics
            .iter()
            .flat_map(|topics| topics.all())
            .filter_map(|id| names.get(id).copied())
            .collect();
        Self {
            number: record.source.printed_number(),
            content: &record.content,
            choices: record
                .answer_choices
                .iter()
                .map(|choice| PreviewChoice::new(choice))
                .collect(),
            solution: &record.solution,
            answer: &record.correct_answer,
            percentage: record
                .percentage_correct
                .map(|p| format!("{p:.1}"))
                .unwrap_or_default(),
            topics,
        }
    }
}
