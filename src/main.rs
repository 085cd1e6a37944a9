use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use contest_dataset::{
    build_question_records, build_topic_legend, fetch, join_statistics, preview::PreviewPage,
    stats, store, Contest, ContestConfig, ContestConfigBuilder, ContestDataset, MarkupCodec,
    StatisticsTable, TopicCorpus, TopicFile,
};
use scraper::Html;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "contest-dataset", version, about = "CEMC contest question dataset builder")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch a contest-year's pages and merge its records into a dataset
    Scrape(ScrapeArgs),
    /// Same as scrape, from local question and solution pages
    Build(BuildArgs),
    /// Parse results reports into a statistics CSV
    Stats(StatsArgs),
    /// Assign topic ids to a raw topic corpus
    Legend(LegendArgs),
    /// Re-join statistics into an existing dataset
    Join(JoinArgs),
    /// Render a dataset into an HTML review page
    Preview(PreviewArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    #[arg(long)]
    contest: Contest,
    #[arg(long)]
    year: u32,
    /// Topic file with ids, as written by `legend`
    #[arg(long)]
    topics: Option<PathBuf>,
    /// Statistics CSVs to join
    #[arg(long)]
    stats: Vec<PathBuf>,
    #[arg(long)]
    out: PathBuf,
    #[arg(long, value_enum, default_value_t = MarkupCodec::Zstd)]
    codec: MarkupCodec,
}

#[derive(Args, Debug)]
struct ScrapeArgs {
    #[command(flatten)]
    run: RunArgs,
}

#[derive(Args, Debug)]
struct BuildArgs {
    #[command(flatten)]
    run: RunArgs,
    #[arg(long)]
    questions: PathBuf,
    #[arg(long)]
    solutions: PathBuf,
}

#[derive(Args, Debug)]
struct StatsArgs {
    #[arg(long)]
    contest: Contest,
    /// Results page title, defaults to "<Name> Contest Concours <Name>"
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    out: PathBuf,
    /// Report PDFs, or text files with form-feed page breaks
    #[arg(required = true)]
    reports: Vec<PathBuf>,
}

#[derive(Args, Debug)]
struct LegendArgs {
    #[arg(long)]
    input: PathBuf,
    #[arg(long)]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct JoinArgs {
    #[arg(long)]
    dataset: PathBuf,
    #[arg(long, required = true)]
    stats: Vec<PathBuf>,
    #[arg(long, value_enum, default_value_t = MarkupCodec::Zstd)]
    codec: MarkupCodec,
}

#[derive(Args, Debug)]
struct PreviewArgs {
    #[arg(long)]
    contest: Contest,
    #[arg(long)]
    dataset: PathBuf,
    #[arg(long)]
    out: PathBuf,
    #[arg(long, default_value_t = false)]
    solutions: bool,
    #[arg(long, value_enum, default_value_t = MarkupCodec::Zstd)]
    codec: MarkupCodec,
}

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(err) = run().await {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scrape(args) => {
            let config = contest_config(&args.run)?;
            let pages = fetch::fetch_contest_pages(&config).await?;
            build_and_store(&args.run, &config, &pages.questions, &pages.solutions)
        }
        Commands::Build(args) => {
            let config = contest_config(&args.run)?;
            let questions = read_text(&args.questions)?;
            let solutions = read_text(&args.solutions)?;
            build_and_store(&args.run, &config, &questions, &solutions)
        }
        Commands::Stats(args) => run_stats(args),
        Commands::Legend(args) => run_legend(args),
        Commands::Join(args) => run_join(args),
        Commands::Preview(args) => run_preview(args),
    }
}

fn contest_config(args: &RunArgs) -> Result<ContestConfig> {
    Ok(ContestConfigBuilder::default()
        .contest(args.contest)
        .year(args.year)
        .build()?)
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn load_statistics(paths: &[PathBuf]) -> Result<StatisticsTable> {
    let mut table = StatisticsTable::default();
    for path in paths {
        let file =
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        let loaded = StatisticsTable::from_csv(file)
            .with_context(|| format!("failed to read statistics from {}", path.display()))?;
        info!(path = %path.display(), rows = loaded.len(), "loaded statistics");
        table.extend(loaded);
    }
    Ok(table)
}

fn build_and_store(
    args: &RunArgs,
    config: &ContestConfig,
    question_html: &str,
    solution_html: &str,
) -> Result<()> {
    let topics = match &args.topics {
        Some(path) => serde_json::from_str::<TopicFile>(&read_text(path)?)
            .with_context(|| format!("invalid topic file {}", path.display()))?,
        None => TopicFile::default(),
    };

    let mut records = {
        let question_doc = Html::parse_document(question_html);
        let solution_doc = Html::parse_document(solution_html);
        build_question_records(&question_doc, &solution_doc, &topics, config).with_context(
            || format!("failed to build {} {} records", config.contest, config.year),
        )?
    };

    if !args.stats.is_empty() {
        join_statistics(&mut records, &load_statistics(&args.stats)?);
    }

    let mut dataset = if args.out.exists() {
        store::read_dataset(&args.out, args.codec)
            .with_context(|| format!("failed to load existing {}", args.out.display()))?
    } else {
        ContestDataset::default()
    };
    dataset.merge_years(records);
    dataset.update_legend(topics.legend);

    store::write_dataset(&args.out, &dataset, args.codec)
        .with_context(|| format!("failed to write {}", args.out.display()))?;
    info!(path = %args.out.display(), records = dataset.data.len(), "saved dataset");
    Ok(())
}

fn report_pages(path: &Path) -> Result<Vec<String>> {
    let is_pdf = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if !is_pdf {
        return Ok(stats::split_pages(&read_text(path)?));
    }

    let output = Command::new("pdftotext")
        .arg("-enc")
        .arg("UTF-8")
        .arg("-layout")
        .arg(path)
        .arg("-")
        .output()
        .with_context(|| format!("failed to execute pdftotext for {}", path.display()))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "pdftotext returned non-zero exit status for {}: {}",
            path.display(),
            stderr.trim()
        );
    }
    Ok(stats::split_pages(&String::from_utf8_lossy(&output.stdout)))
}

fn run_stats(args: StatsArgs) -> Result<()> {
    let title = args
        .title
        .unwrap_or_else(|| args.contest.results_title());

    let mut reports = Vec::new();
    for path in &args.reports {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let pages = report_pages(path)?;
        match stats::parse_report(&pages, &file_name, args.contest, &title) {
            Ok(report) if report.rows.is_empty() => {
                warn!(report = %file_name, "results page found but no rows parsed")
            }
            Ok(report) => {
                info!(
                    report = %file_name,
                    year = ?report.metadata.year,
                    format = %report.metadata.format,
                    rows = report.rows.len(),
                    "parsed report"
                );
                reports.push(report);
            }
            Err(err) => warn!(report = %file_name, error = %err, "skipping report"),
        }
    }

    let file = File::create(&args.out)
        .with_context(|| format!("failed to create {}", args.out.display()))?;
    contest_dataset::join::write_statistics_csv(file, &reports)?;

    let summary = stats::summarize(&reports);
    for year in &summary.years {
        info!(
            year = year.year,
            questions = year.questions,
            mean = year.mean,
            min = year.min,
            max = year.max,
            contestants = ?year.contestants,
            "year summary"
        );
    }
    if let (Some(hardest), Some(easiest)) = (&summary.hardest, &summary.easiest) {
        info!(
            year = hardest.year,
            question = hardest.question_number,
            percentage = hardest.percentage_correct,
            "hardest question"
        );
        info!(
            year = easiest.year,
            question = easiest.question_number,
            percentage = easiest.percentage_correct,
            "easiest question"
        );
    }
    info!(path = %args.out.display(), reports = reports.len(), "saved statistics");
    Ok(())
}

fn run_legend(args: LegendArgs) -> Result<()> {
    let corpus: TopicCorpus<String> = serde_json::from_str(&read_text(&args.input)?)
        .with_context(|| format!("invalid topic corpus {}", args.input.display()))?;
    let (data, legend) = build_topic_legend(corpus);

    let mut json = serde_json::to_string_pretty(&TopicFile { data, legend })?;
    json.push('\n');
    fs::write(&args.out, json).with_context(|| format!("failed to write {}", args.out.display()))
}

fn run_join(args: JoinArgs) -> Result<()> {
    let mut dataset = store::read_dataset(&args.dataset, args.codec)
        .with_context(|| format!("failed to load {}", args.dataset.display()))?;
    join_statistics(&mut dataset.data, &load_statistics(&args.stats)?);
    store::write_dataset(&args.dataset, &dataset, args.codec)
        .with_context(|| format!("failed to write {}", args.dataset.display()))
}

fn run_preview(args: PreviewArgs) -> Result<()> {
    let dataset = store::read_dataset(&args.dataset, args.codec)
        .with_context(|| format!("failed to load {}", args.dataset.display()))?;
    let mut page = PreviewPage::new(args.contest, &dataset);
    let html = if args.solutions {
        page.generate_solutions()?
    } else {
        page.generate_questions()?
    };
    fs::write(&args.out, html).with_context(|| format!("failed to write {}", args.out.display()))
}
