use std::fs;
use std::path::Path;

use base64::{engine::general_purpose, Engine as _};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::model::{ContestDataset, QuestionRecord};

const ZSTD_LEVEL: i32 = 19;

/// Encoding applied to the markup fields of stored records.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MarkupCodec {
    /// zstd-compressed, then base64.
    #[default]
    Zstd,
    /// Markup stored as is.
    Plain,
}

impl MarkupCodec {
    pub fn encode(&self, markup: &str) -> Result<String, StoreError> {
        match self {
            MarkupCodec::Plain => Ok(markup.to_string()),
            MarkupCodec::Zstd => {
                let compressed = zstd::encode_all(markup.as_bytes(), ZSTD_LEVEL)?;
                Ok(general_purpose::STANDARD.encode(compressed))
            }
        }
    }

    pub fn decode(&self, blob: &str) -> Result<String, StoreError> {
        match self {
            MarkupCodec::Plain => Ok(blob.to_string()),
            MarkupCodec::Zstd => {
                let compressed = general_purpose::STANDARD.decode(blob)?;
                let raw = zstd::decode_all(compressed.as_slice())?;
                Ok(String::from_utf8(raw)?)
            }
        }
    }

    fn map_markup(
        &self,
        record: &QuestionRecord,
        f: impl Fn(&Self, &str) -> Result<String, StoreError>,
    ) -> Result<QuestionRecord, StoreError> {
        Ok(QuestionRecord {
            content: f(self, &record.content)?,
            solution: f(self, &record.solution)?,
            ..record.clone()
        })
    }

    pub fn encode_dataset(&self, dataset: &ContestDataset) -> Result<ContestDataset, StoreError> {
        Ok(ContestDataset {
            data: dataset
                .data
                .iter()
                .map(|record| self.map_markup(record, Self::encode))
                .collect::<Result<_, _>>()?,
            legend: dataset.legend.clone(),
        })
    }

    pub fn decode_dataset(&self, dataset: &ContestDataset) -> Result<ContestDataset, StoreError> {
        Ok(ContestDataset {
            data: dataset
                .data
                .iter()
                .map(|record| self.map_markup(record, Self::decode))
                .collect::<Result<_, _>>()?,
            legend: dataset.legend.clone(),
        })
    }
}

/// Reads a stored dataset and decodes its markup.
pub fn read_dataset(path: &Path, codec: MarkupCodec) -> Result<ContestDataset, StoreError> {
    let data = fs::read_to_string(path)?;
    let stored: ContestDataset = serde_json::from_str(&data)?;
    codec.decode_dataset(&stored)
}

/// Encodes markup and writes the dataset as pretty JSON.
pub fn write_dataset(
    path: &Path,
    dataset: &ContestDataset,
    codec: MarkupCodec,
) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let stored = codec.encode_dataset(dataset)?;
    let mut data = serde_json::to_string_pretty(&stored)?;
    data.push('\n');
    fs::write(path, data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Source, TopicEntry, TopicLegend};

    fn dataset() -> ContestDataset {
        ContestDataset {
            data: vec![QuestionRecord {
                content: r#"<li><p>Évaluez \(\frac{1}{2} + 3\) &amp; more</p></li>"#.to_string(),
                answer_choices: vec!["\\(1\\)".to_string(), r#"<img src="a.png">"#.to_string()],
                solution: "<li><p>Because.</p></li>".to_string(),
                correct_answer: "B".to_string(),
                topics: Some(TopicEntry {
                    primary: [2].into(),
                    secondary: [1, 3].into(),
                }),
                source: Source {
                    year: 2021,
                    number: 6,
                },
                percentage_correct: Some(60.1),
            }],
            legend: TopicLegend::from_names(["Algebra", "Geometry", "Number Theory"]),
        }
    }

    #[test]
    fn zstd_codec_should_round_trip_markup() {
        let codec = MarkupCodec::Zstd;
        let markup = "<p>\\(x^2\\) ünïcödé ✓</p>";
        let blob = codec.encode(markup).unwrap();
        assert_ne!(blob, markup);
        assert_eq!(codec.decode(&blob).unwrap(), markup);
    }

    #[test]
    fn decode_should_reject_garbage() {
        assert!(MarkupCodec::Zstd.decode("not base64!").is_err());
    }

    #[test]
    fn dataset_should_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("pascal_questions.json");
        let original = dataset();

        for codec in [MarkupCodec::Zstd, MarkupCodec::Plain] {
            write_dataset(&path, &original, codec).unwrap();
            let loaded = read_dataset(&path, codec).unwrap();
            assert_eq!(loaded, original);
        }
    }

    #[test]
    fn stored_dataset_should_encode_only_markup_fields() {
        let stored = MarkupCodec::Zstd.encode_dataset(&dataset()).unwrap();
        let record = &stored.data[0];
        assert!(!record.content.contains("<li>"));
        assert_eq!(record.answer_choices, dataset().data[0].answer_choices);
        assert_eq!(record.correct_answer, "B");
    }
}
