//! Builds a per-question dataset for CEMC math contests from published
//! question pages, solution pages and results reports.
//!
//! The three entry points are [`build_question_records`],
//! [`join_statistics`] and [`build_topic_legend`].

pub mod answer;
pub mod builder;
pub mod contest;
pub mod error;
pub mod fetch;
pub mod join;
pub mod locate;
pub mod model;
pub mod preview;
pub mod stats;
pub mod store;

pub use builder::build_question_records;
pub use contest::{Contest, ContestConfig, ContestConfigBuilder};
pub use error::{ExtractError, ReportError, StoreError};
pub use join::{build_topic_legend, join_statistics, JoinSummary, StatisticsTable};
pub use model::{
    ContestDataset, QuestionRecord, Source, StatisticRow, TopicCorpus, TopicFile, TopicLegend,
};
pub use store::MarkupCodec;
