use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

const DOCUMENT_ROOT: &str = "https://cemc.uwaterloo.ca/sites/default/files/documents";

/// Last contest year whose question pages may place the answer list after the
/// question's `<li>` instead of inside it.
pub const SIBLING_LAYOUT_LAST_YEAR: u32 = 2021;

#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[strum(ascii_case_insensitive)]
pub enum Contest {
    #[default]
    #[strum(serialize = "pascal")]
    #[serde(rename = "pascal")]
    Pascal,
    #[strum(serialize = "cayley")]
    #[serde(rename = "cayley")]
    Cayley,
    #[strum(serialize = "fermat")]
    #[serde(rename = "fermat")]
    Fermat,
    #[strum(serialize = "gauss7")]
    #[serde(rename = "gauss7")]
    Gauss7,
    #[strum(serialize = "gauss8")]
    #[serde(rename = "gauss8")]
    Gauss8,
}

impl Contest {
    /// Name as printed in report titles, e.g. "Pascal" or "Gauss".
    pub fn name(&self) -> &'static str {
        match self {
            Contest::Pascal => "Pascal",
            Contest::Cayley => "Cayley",
            Contest::Fermat => "Fermat",
            Contest::Gauss7 | Contest::Gauss8 => "Gauss",
        }
    }

    fn question_stem(&self) -> &'static str {
        match self {
            Contest::Gauss7 => "Gauss7",
            Contest::Gauss8 => "Gauss8",
            other => other.name(),
        }
    }

    // both Gauss grades share one solutions document
    fn solution_stem(&self) -> &'static str {
        self.name()
    }

    pub fn question_url(&self, year: u32) -> String {
        format!(
            "{}/{}/{}{}Contest.html",
            DOCUMENT_ROOT,
            year,
            year,
            self.question_stem()
        )
    }

    pub fn solution_url(&self, year: u32) -> String {
        format!(
            "{}/{}/{}{}Solution.html",
            DOCUMENT_ROOT,
            year,
            year,
            self.solution_stem()
        )
    }

    /// Literal title identifying the results page of a report.
    pub fn results_title(&self) -> String {
        format!("{} Contest Concours {}", self.name(), self.name())
    }
}

/// Run-scoped settings handed to every pipeline entry point.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
pub struct ContestConfig {
    pub contest: Contest,
    pub year: u32,
    #[builder(default = "25")]
    pub question_count: usize,
}

impl ContestConfig {
    pub fn allows_sibling_layout(&self) -> bool {
        self.year <= SIBLING_LAYOUT_LAST_YEAR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contest_should_parse_case_insensitively() {
        assert_eq!("Pascal".parse::<Contest>().unwrap(), Contest::Pascal);
        assert_eq!("GAUSS8".parse::<Contest>().unwrap(), Contest::Gauss8);
        assert!("fryer".parse::<Contest>().is_err());
        assert_eq!(Contest::Gauss7.to_string(), "gauss7");
    }

    #[test]
    fn gauss_grades_should_share_solution_document() {
        assert_eq!(
            Contest::Gauss8.question_url(2024),
            "https://cemc.uwaterloo.ca/sites/default/files/documents/2024/2024Gauss8Contest.html"
        );
        assert_eq!(
            Contest::Gauss7.solution_url(2024),
            Contest::Gauss8.solution_url(2024)
        );
        assert!(Contest::Gauss7
            .solution_url(2024)
            .ends_with("2024GaussSolution.html"));
    }

    #[test]
    fn config_builder_should_apply_defaults() {
        let config = ContestConfigBuilder::default()
            .contest(Contest::Pascal)
            .year(2021)
            .build()
            .unwrap();
        assert_eq!(config.question_count, 25);
        assert!(config.allows_sibling_layout());

        let config = ContestConfigBuilder::default()
            .contest(Contest::Gauss8)
            .year(2022)
            .question_count(20)
            .build()
            .unwrap();
        assert_eq!(config.question_count, 20);
        assert!(!config.allows_sibling_layout());
        assert_eq!(Contest::Gauss8.results_title(), "Gauss Contest Concours Gauss");
    }
}
