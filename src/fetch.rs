use anyhow::{Context, Result};
use tracing::info;

use crate::contest::ContestConfig;

/// Raw question and solution pages of one contest-year.
#[derive(Debug, Clone)]
pub struct ContestPages {
    pub questions: String,
    pub solutions: String,
}

/// Downloads both pages; either failing aborts the run.
pub async fn fetch_contest_pages(config: &ContestConfig) -> Result<ContestPages> {
    let client = reqwest::Client::new();
    let questions = fetch_html(&client, &config.contest.question_url(config.year)).await?;
    let solutions = fetch_html(&client, &config.contest.solution_url(config.year)).await?;
    Ok(ContestPages {
        questions,
        solutions,
    })
}

async fn fetch_html(client: &reqwest::Client, url: &str) -> Result<String> {
    info!(url, "fetching");
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("failed to fetch {url}"))?
        .error_for_status()
        .with_context(|| format!("bad status from {url}"))?;
    let bytes = response
        .bytes()
        .await
        .with_context(|| format!("failed to read body of {url}"))?;
    // pages are UTF-8 regardless of what the server advertises
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
