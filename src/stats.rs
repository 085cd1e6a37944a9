//! Per-question statistics from the results page of a contest report.
//!
//! Reports come as per-page plain text. Two layouts exist: older reports list
//! every question as multiple choice with one percentage column per letter,
//! newer ones add open-ended rows where each candidate value is followed by
//! its percentage in parentheses.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::debug;

use crate::contest::Contest;
use crate::error::ReportError;
use crate::model::StatisticRow;

static MULTIPLE_CHOICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(\d+)\s+([A-E])\s+([\d.]+)\s+([\d.]+)\s+([\d.]+)\s+([\d.]+)\s+([\d.]+)(?:\s+([\d.]+))?",
    )
    .unwrap()
});
static OPEN_ENDED_HEAD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)\s+(\d+)").unwrap());
static TALLY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s+(\d+)\s+\(([\d.]+)\)").unwrap());
static CONTESTANTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Number of Contestants [^\d]*: (\d+)").unwrap());
static AVERAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Average mark [^\d]*: ([\d.]+)").unwrap());

/// One parsed results line, before it is attributed to a year.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultLine {
    pub question_number: u32,
    pub correct_answer: String,
    pub percentage_correct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum ReportFormat {
    #[strum(serialize = "Old (all multiple choice)")]
    AllMultipleChoice,
    #[strum(serialize = "New (with open-ended questions)")]
    Mixed,
}

/// Values printed once per report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub contestants: Option<u32>,
    pub average_mark: Option<f64>,
    pub year: Option<u32>,
    pub format: ReportFormat,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsReport {
    pub source: String,
    pub metadata: ReportMetadata,
    pub rows: Vec<StatisticRow>,
}

/// First page containing the results title.
pub fn find_results_page<'a>(pages: &'a [String], title: &str) -> Option<&'a str> {
    pages
        .iter()
        .find(|page| page.contains(title))
        .map(String::as_str)
}

/// Parses one line with the multiple-choice grammar, then the open-ended one.
pub fn parse_line(line: &str) -> Option<ResultLine> {
    parse_multiple_choice(line).or_else(|| parse_open_ended(line))
}

fn parse_multiple_choice(line: &str) -> Option<ResultLine> {
    let caps = MULTIPLE_CHOICE_RE.captures(line)?;
    let correct_answer = caps[2].to_string();
    // A..E map to the five percentage columns following the letter
    let column = match correct_answer.as_str() {
        "A" => 3,
        "B" => 4,
        "C" => 5,
        "D" => 6,
        _ => 7,
    };
    Some(ResultLine {
        question_number: caps[1].parse().ok()?,
        percentage_correct: caps[column].parse().ok()?,
        correct_answer,
    })
}

/// `num value (tally (pct))* value (pct)`: the answer value must reappear
/// right before its own percentage. When it appears more than once, the last
/// occurrence in the run of tallies counts.
fn parse_open_ended(line: &str) -> Option<ResultLine> {
    let head = OPEN_ENDED_HEAD_RE.captures(line)?;
    let answer = head.get(2)?.as_str();

    let mut rest = &line[head.get(0)?.end()..];
    let mut percentage = None;
    while let Some(tally) = TALLY_RE.captures(rest) {
        if &tally[1] == answer {
            percentage = Some(tally[2].to_string());
        }
        rest = &rest[tally.get(0)?.end()..];
    }

    Some(ResultLine {
        question_number: head[1].parse().ok()?,
        correct_answer: answer.to_string(),
        percentage_correct: percentage?.parse().ok()?,
    })
}

/// All result lines of a page, in document order. Unmatched lines are
/// headers, footers or noise and are skipped.
pub fn parse_results(text: &str) -> Vec<ResultLine> {
    text.lines()
        .filter_map(|line| {
            let parsed = parse_line(line);
            if parsed.is_none() && !line.trim().is_empty() {
                debug!(line, "skipping non-result line");
            }
            parsed
        })
        .collect()
}

/// Report-level values, each matched independently of the result rows.
pub fn extract_metadata(text: &str, file_name: &str, contest_name: &str) -> ReportMetadata {
    let contestants = CONTESTANTS_RE
        .captures(text)
        .and_then(|caps| caps[1].parse().ok());
    let average_mark = AVERAGE_RE
        .captures(text)
        .and_then(|caps| caps[1].parse().ok());

    let name = regex::escape(contest_name);
    let year = [
        (format!(r"(\d{{4}}){}", name), file_name),
        (format!(r"(\d{{4}})\s+{} Contest", name), text),
    ]
    .iter()
    .find_map(|(pattern, haystack)| {
        Regex::new(pattern)
            .ok()?
            .captures(haystack)
            .and_then(|caps| caps[1].parse().ok())
    });

    let format = if text.contains("Correct Answer % not") && text.contains("1st/1er") {
        ReportFormat::Mixed
    } else {
        ReportFormat::AllMultipleChoice
    };

    ReportMetadata {
        contestants,
        average_mark,
        year,
        format,
    }
}

/// Parses a whole report: locates the page titled `title`, reads its metadata
/// and attributes every result line to the report's year.
pub fn parse_report(
    pages: &[String],
    file_name: &str,
    contest: Contest,
    title: &str,
) -> Result<StatisticsReport, ReportError> {
    let page = find_results_page(pages, title)
        .ok_or_else(|| ReportError::NoResultsPage(title.to_string()))?;
    let metadata = extract_metadata(page, file_name, contest.name());
    let year = metadata
        .year
        .ok_or_else(|| ReportError::UnknownYear(file_name.to_string()))?;

    let rows = parse_results(page)
        .into_iter()
        .map(|line| StatisticRow {
            year,
            question_number: line.question_number,
            correct_answer: line.correct_answer,
            percentage_correct: line.percentage_correct,
        })
        .collect();

    Ok(StatisticsReport {
        source: file_name.to_string(),
        metadata,
        rows,
    })
}

/// Splits `pdftotext` output into pages, dropping trailing blank pages.
pub fn split_pages(raw: &str) -> Vec<String> {
    let mut pages: Vec<String> = raw
        .split('\u{000C}')
        .map(|chunk| chunk.replace('\u{0000}', ""))
        .collect();
    while pages.last().is_some_and(|page| page.trim().is_empty()) {
        pages.pop();
    }
    pages
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearSummary {
    pub year: u32,
    pub questions: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub contestants: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub years: Vec<YearSummary>,
    pub hardest: Option<StatisticRow>,
    pub easiest: Option<StatisticRow>,
}

/// Difficulty overview across reports: per-year spread plus the hardest and
/// easiest question overall.
pub fn summarize(reports: &[StatisticsReport]) -> ReportSummary {
    let mut by_year: BTreeMap<u32, (Vec<f64>, Option<u32>)> = BTreeMap::new();
    for report in reports {
        for row in &report.rows {
            let entry = by_year.entry(row.year).or_default();
            entry.0.push(row.percentage_correct);
            entry.1 = entry.1.or(report.metadata.contestants);
        }
    }

    let years = by_year
        .into_iter()
        .map(|(year, (values, contestants))| YearSummary {
            year,
            questions: values.len(),
            mean: values.iter().sum::<f64>() / values.len() as f64,
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            contestants,
        })
        .collect();

    let rows = || reports.iter().flat_map(|report| report.rows.iter());
    let hardest = rows()
        .min_by(|a, b| a.percentage_correct.total_cmp(&b.percentage_correct))
        .cloned();
    let easiest = rows()
        .max_by(|a, b| a.percentage_correct.total_cmp(&b.percentage_correct))
        .cloned();

    ReportSummary {
        years,
        hardest,
        easiest,
    }
}
