use std::collections::{BTreeSet, HashMap};
use std::io::{Read, Write};

use serde::Serialize;
use tracing::{debug, info};

use crate::error::ReportError;
use crate::model::{QuestionRecord, StatisticRow, TopicCorpus, TopicEntry, TopicId, TopicLegend};
use crate::stats::StatisticsReport;

const YEAR: &str = "Year";
const QUESTION: &str = "Question";
const PERCENTAGE: &str = "Percentage Correct";

/// Assigns ids to every topic name in the corpus and rewrites the corpus to
/// use them. Run once over the whole corpus so ids agree across years.
pub fn build_topic_legend(corpus: TopicCorpus<String>) -> (TopicCorpus<TopicId>, TopicLegend) {
    let legend = TopicLegend::from_names(
        corpus
            .values()
            .flat_map(|year| year.values())
            .flat_map(|entry| entry.all().cloned()),
    );

    let to_ids = |names: BTreeSet<String>| -> BTreeSet<TopicId> {
        names.iter().filter_map(|name| legend.id(name)).collect()
    };
    let corpus = corpus
        .into_iter()
        .map(|(year, questions)| {
            let questions = questions
                .into_iter()
                .map(|(number, entry)| {
                    let entry = TopicEntry {
                        primary: to_ids(entry.primary),
                        secondary: to_ids(entry.secondary),
                    };
                    (number, entry)
                })
                .collect();
            (year, questions)
        })
        .collect();

    info!(topics = legend.len(), "built topic legend");
    (corpus, legend)
}

/// Percentage correct keyed by `(year, printed question number)`.
#[derive(Debug, Clone, Default)]
pub struct StatisticsTable {
    rows: HashMap<(u32, u32), f64>,
}

impl StatisticsTable {
    /// Later rows for the same key replace earlier ones. Percentages outside
    /// `0..=100` are dropped.
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a StatisticRow>) -> Self {
        let mut table = Self::default();
        for row in rows {
            table.insert(row.year, row.question_number, row.percentage_correct);
        }
        table
    }

    /// Reads a CSV with `Year`, `Question` and `Percentage Correct` columns.
    /// Rows with any of those missing or non-numeric are skipped.
    pub fn from_csv<R: Read>(reader: R) -> Result<Self, csv::Error> {
        let mut reader = csv::Reader::from_reader(reader);
        let headers = reader.headers()?.clone();
        let column = |name: &str| headers.iter().position(|h| h.trim() == name);
        let (Some(year_col), Some(question_col), Some(percentage_col)) =
            (column(YEAR), column(QUESTION), column(PERCENTAGE))
        else {
            debug!("statistics csv lacks required columns");
            return Ok(Self::default());
        };

        let mut table = Self::default();
        for record in reader.records() {
            let record = match record {
                Ok(record) => record,
                Err(err) => {
                    debug!(error = %err, "skipping unreadable csv row");
                    continue;
                }
            };
            let field = |index: usize| record.get(index).map(str::trim);
            let parsed = (
                field(year_col).and_then(|v| v.parse::<u32>().ok()),
                field(question_col).and_then(|v| v.parse::<u32>().ok()),
                field(percentage_col).and_then(|v| v.parse::<f64>().ok()),
            );
            match parsed {
                (Some(year), Some(question), Some(percentage)) => {
                    table.insert(year, question, percentage)
                }
                _ => debug!(row = ?record, "skipping malformed statistics row"),
            }
        }
        Ok(table)
    }

    /// Merges another table in; its entries win on conflict.
    pub fn extend(&mut self, other: StatisticsTable) {
        self.rows.extend(other.rows);
    }

    fn insert(&mut self, year: u32, question: u32, percentage: f64) {
        if (0.0..=100.0).contains(&percentage) {
            self.rows.insert((year, question), percentage);
        } else {
            debug!(year, question, percentage, "dropping out-of-range percentage");
        }
    }

    pub fn get(&self, year: u32, printed_number: u32) -> Option<f64> {
        self.rows.get(&(year, printed_number)).copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinSummary {
    pub matched: usize,
    pub missing: usize,
}

/// Sets every record's `percentage_correct` from the table, or clears it when
/// no statistic exists. Records are never dropped.
pub fn join_statistics(records: &mut [QuestionRecord], table: &StatisticsTable) -> JoinSummary {
    let mut summary = JoinSummary::default();
    for record in records.iter_mut() {
        record.percentage_correct = table.get(record.source.year, record.source.printed_number());
        match record.percentage_correct {
            Some(_) => summary.matched += 1,
            None => summary.missing += 1,
        }
    }
    info!(
        matched = summary.matched,
        missing = summary.missing,
        "joined statistics"
    );
    summary
}

#[derive(Serialize)]
struct CsvRow<'a> {
    #[serde(rename = "Question")]
    question: u32,
    #[serde(rename = "Correct Answer")]
    correct_answer: &'a str,
    #[serde(rename = "Percentage Correct")]
    percentage_correct: f64,
    #[serde(rename = "Year")]
    year: u32,
    #[serde(rename = "Number of Contestants")]
    contestants: Option<u32>,
    #[serde(rename = "Average Mark")]
    average_mark: Option<f64>,
    #[serde(rename = "Format")]
    format: String,
    #[serde(rename = "Source")]
    source: &'a str,
}

/// Writes parsed reports as one CSV readable by [`StatisticsTable::from_csv`].
pub fn write_statistics_csv<W: Write>(
    writer: W,
    reports: &[StatisticsReport],
) -> Result<(), ReportError> {
    let mut writer = csv::Writer::from_writer(writer);
    for report in reports {
        for row in &report.rows {
            writer.serialize(CsvRow {
                question: row.question_number,
                correct_answer: &row.correct_answer,
                percentage_correct: row.percentage_correct,
                year: row.year,
                contestants: report.metadata.contestants,
                average_mark: report.metadata.average_mark,
                format: report.metadata.format.to_string(),
                source: &report.source,
            })?;
        }
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::model::Source;
    use crate::stats::{ReportFormat, ReportMetadata};

    fn entry(primary: &[&str], secondary: &[&str]) -> TopicEntry<String> {
        TopicEntry {
            primary: primary.iter().map(|s| s.to_string()).collect(),
            secondary: secondary.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn record(year: u32, number: u32) -> QuestionRecord {
        QuestionRecord {
            content: "<li>q</li>".to_string(),
            answer_choices: vec![],
            solution: "<li>s</li>".to_string(),
            correct_answer: "A".to_string(),
            topics: None,
            source: Source { year, number },
            percentage_correct: Some(1.0),
        }
    }

    fn row(year: u32, question_number: u32, percentage_correct: f64) -> StatisticRow {
        StatisticRow {
            year,
            question_number,
            correct_answer: "C".to_string(),
            percentage_correct,
        }
    }

    #[test]
    fn legend_should_cover_every_year_and_be_deterministic() {
        let mut corpus: TopicCorpus<String> = BTreeMap::new();
        corpus
            .entry(2020)
            .or_default()
            .insert(1, entry(&["Number Theory"], &["Algebra"]));
        corpus
            .entry(2021)
            .or_default()
            .insert(3, entry(&["Geometry"], &[]));

        let (ids, legend) = build_topic_legend(corpus.clone());
        let expected: Vec<_> = vec![("Algebra", 1), ("Geometry", 2), ("Number Theory", 3)];
        assert_eq!(legend.iter().collect::<Vec<_>>(), expected);
        assert_eq!(ids[&2020][&1].primary.iter().copied().collect::<Vec<_>>(), vec![3]);
        assert_eq!(ids[&2020][&1].secondary.iter().copied().collect::<Vec<_>>(), vec![1]);
        assert_eq!(ids[&2021][&3].primary.iter().copied().collect::<Vec<_>>(), vec![2]);

        let (again, legend_again) = build_topic_legend(corpus);
        assert_eq!(again, ids);
        assert_eq!(legend_again, legend);
    }

    #[test]
    fn join_should_translate_zero_based_numbers() {
        let table = StatisticsTable::from_rows(&[row(2021, 7, 60.1)]);
        let mut records = vec![record(2021, 6), record(2021, 7), record(2022, 6)];

        let summary = join_statistics(&mut records, &table);
        assert_eq!(summary, JoinSummary { matched: 1, missing: 2 });
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].percentage_correct, Some(60.1));
        assert_eq!(records[1].percentage_correct, None);
        assert_eq!(records[2].percentage_correct, None);
    }

    #[test]
    fn join_with_empty_table_should_keep_all_records() {
        let mut records = vec![record(2024, 0), record(2024, 1)];
        let summary = join_statistics(&mut records, &StatisticsTable::default());
        assert_eq!(summary.missing, 2);
        assert!(records.iter().all(|r| r.percentage_correct.is_none()));
    }

    #[test]
    fn table_should_drop_out_of_range_percentages() {
        let table = StatisticsTable::from_rows(&[row(2021, 1, 101.0), row(2021, 2, 0.0)]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(2021, 2), Some(0.0));
    }

    #[test]
    fn csv_loader_should_skip_malformed_rows() {
        let csv = "Question,Correct Answer,Percentage Correct,Year\n\
                   1,B,81.5,2023\n\
                   2,C,abc,2023\n\
                   x,D,40.0,2023\n\
                   4,E,33.3,\n\
                   5,A,12.0,2023\n";
        let table = StatisticsTable::from_csv(csv.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(2023, 1), Some(81.5));
        assert_eq!(table.get(2023, 5), Some(12.0));
        assert_eq!(table.get(2023, 2), None);
    }

    #[test]
    fn csv_loader_should_tolerate_missing_columns() {
        let table = StatisticsTable::from_csv("Question,Score\n1,2\n".as_bytes()).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn written_csv_should_load_back_as_table() {
        let report = StatisticsReport {
            source: "2024PascalResults.pdf".to_string(),
            metadata: ReportMetadata {
                contestants: Some(12000),
                average_mark: Some(80.5),
                year: Some(2024),
                format: ReportFormat::Mixed,
            },
            rows: vec![row(2024, 1, 91.0), row(2024, 25, 4.5)],
        };
        let mut buf = Vec::new();
        write_statistics_csv(&mut buf, &[report]).unwrap();

        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.starts_with(
            "Question,Correct Answer,Percentage Correct,Year,Number of Contestants,Average Mark,Format,Source\n"
        ));

        let table = StatisticsTable::from_csv(buf.as_slice()).unwrap();
        assert_eq!(table.get(2024, 1), Some(91.0));
        assert_eq!(table.get(2024, 25), Some(4.5));
    }
}
