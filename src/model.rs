use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

pub type TopicId = u32;

/// One contest question, ready for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    pub content: String,
    pub answer_choices: Vec<String>,
    pub solution: String,
    pub correct_answer: String,
    pub topics: Option<Topics>,
    pub source: Source,
    pub percentage_correct: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Source {
    pub year: u32,
    /// Zero-based position within the contest.
    pub number: u32,
}

impl Source {
    /// Question number as printed in contest documents and reports.
    pub fn printed_number(&self) -> u32 {
        self.number + 1
    }
}

/// Primary and secondary topic classification of one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicEntry<T: Ord> {
    #[serde(rename = "primaryTopics", default = "BTreeSet::new")]
    pub primary: BTreeSet<T>,
    #[serde(rename = "secondaryTopics", default = "BTreeSet::new")]
    pub secondary: BTreeSet<T>,
}

impl<T: Ord> TopicEntry<T> {
    pub fn all(&self) -> impl Iterator<Item = &T> {
        self.primary.iter().chain(self.secondary.iter())
    }
}

pub type Topics = TopicEntry<TopicId>;

/// Topic classifications keyed by year, then by 1-based question number.
pub type TopicCorpus<T> = BTreeMap<u32, BTreeMap<u32, TopicEntry<T>>>;

/// Name to id mapping, ids dense from 1 in lexicographic name order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicLegend(BTreeMap<String, TopicId>);

impl TopicLegend {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: BTreeSet<String> = names.into_iter().map(Into::into).collect();
        Self(
            names
                .into_iter()
                .zip(1..)
                .collect::<BTreeMap<String, TopicId>>(),
        )
    }

    pub fn id(&self, name: &str) -> Option<TopicId> {
        self.0.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, TopicId)> {
        self.0.iter().map(|(name, id)| (name.as_str(), *id))
    }
}

/// Topic file as produced by the legend build: classifications plus legend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicFile {
    pub data: TopicCorpus<TopicId>,
    #[serde(default)]
    pub legend: TopicLegend,
}

impl TopicFile {
    pub fn lookup(&self, source: Source) -> Option<&Topics> {
        self.data
            .get(&source.year)
            .and_then(|year| year.get(&source.printed_number()))
    }
}

/// One per-question line of a contest results report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticRow {
    pub year: u32,
    /// 1-based, as printed in the report.
    pub question_number: u32,
    pub correct_answer: String,
    pub percentage_correct: f64,
}

/// Output document: all records of one contest plus the topic legend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContestDataset {
    pub data: Vec<QuestionRecord>,
    pub legend: TopicLegend,
}

impl ContestDataset {
    /// Replaces every record of the years present in `records`, keeping other
    /// years, and orders the result by source.
    pub fn merge_years(&mut self, records: Vec<QuestionRecord>) {
        let years: BTreeSet<u32> = records.iter().map(|r| r.source.year).collect();
        self.data.retain(|r| !years.contains(&r.source.year));
        self.data.extend(records);
        self.data.sort_by_key(|r| r.source);
    }

    /// Adopts `legend` unless it is empty. Kept records of other years still
    /// carry ids from the stored legend, so an empty one never replaces it.
    pub fn update_legend(&mut self, legend: TopicLegend) {
        if !legend.is_empty() {
            self.legend = legend;
        }
    }
}
