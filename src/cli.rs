use clap::{Parser, Subcommand, ValueEnum};
use owo_colors::OwoColorize;
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use tabled::{settings::Style, Table, Tabled};
use wallet_merge::{
    FileOutcome, FileStatus, MergeConfig, MergeReport, SolutionPoint, Timeline, TimelineConfig,
    DEFAULT_CHALLENGES, DEFAULT_INPUT_DIR, DEFAULT_OUTPUT, DEFAULT_WALLETS,
};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
    Jsonl,
    Yaml,
    Csv,
}

#[derive(Parser)]
#[command(name = "wallet-merge")]
#[command(about = "Merge wallet JSON exports and track solved challenges")]
#[command(version)]
struct Cli {
    /// Report format (the merged wallet file is always JSON)
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge every *.json in a directory into one list without duplicate addresses
    Merge {
        #[arg(long, default_value = DEFAULT_INPUT_DIR)]
        input_dir: PathBuf,

        #[arg(long, default_value = DEFAULT_OUTPUT)]
        output: PathBuf,
    },

    /// Cumulative solutions by the merged wallets over time
    Timeline {
        #[arg(long, default_value = DEFAULT_WALLETS)]
        wallets: PathBuf,

        #[arg(long, default_value = DEFAULT_CHALLENGES)]
        challenges: PathBuf,
    },
}

#[derive(Tabled)]
struct KeyValueRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled)]
struct TimelineTableRow {
    #[tabled(rename = "Discovered")]
    discovered: String,
    #[tabled(rename = "Challenge")]
    challenge: String,
    #[tabled(rename = "Solutions")]
    solutions: usize,
    #[tabled(rename = "Cumulative")]
    cumulative: String,
}

impl TimelineTableRow {
    fn from_point(p: &SolutionPoint) -> Self {
        Self {
            discovered: p.discovered_at.format("%Y-%m-%d %H:%M").to_string(),
            challenge: p.challenge.clone(),
            solutions: p.solutions,
            cumulative: p.cumulative.to_string().cyan().to_string(),
        }
    }
}

#[derive(Serialize)]
struct FileCsvRow {
    file: String,
    status: FileStatus,
    records: usize,
    added: usize,
    duplicates: usize,
    error: String,
}

impl FileCsvRow {
    fn from_outcome(f: &FileOutcome) -> Self {
        Self {
            file: f.file.display().to_string(),
            status: f.status,
            records: f.records,
            added: f.added,
            duplicates: f.duplicates,
            error: f.error.clone().unwrap_or_default(),
        }
    }
}

fn fail(e: &wallet_merge::Error) -> ! {
    eprintln!("{} {}", "Error:".red().bold(), e);
    std::process::exit(1);
}

fn warn(message: &str) {
    eprintln!("{} {}", "Warning:".yellow().bold(), message);
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap());
}

fn print_yaml<T: Serialize + ?Sized>(value: &T) {
    print!("{}", serde_yaml::to_string(value).unwrap());
}

fn print_csv<T: Serialize>(rows: impl IntoIterator<Item = T>) {
    let mut wtr = csv::Writer::from_writer(std::io::stdout());
    for row in rows {
        wtr.serialize(row).unwrap();
    }
    wtr.flush().unwrap();
}

fn output_report(report: &MergeReport, format: OutputFormat) {
    match format {
        OutputFormat::Table => print_report_table(report),
        OutputFormat::Json => print_json(report),
        OutputFormat::Jsonl => {
            println!("{}", serde_json::to_string(report).unwrap());
        }
        OutputFormat::Yaml => print_yaml(report),
        OutputFormat::Csv => print_csv(report.files.iter().map(FileCsvRow::from_outcome)),
    }
}

fn print_report_table(report: &MergeReport) {
    println!(
        "{} {} JSON files",
        "Found".dimmed(),
        report.files_found.to_string().bright_white()
    );
    for f in &report.files {
        if f.status == FileStatus::Processed {
            println!(
                "{} {} ({} wallets)",
                "Processed:".green(),
                f.file_name(),
                f.records
            );
        }
    }

    let rows = vec![
        KeyValueRow {
            field: "Files processed".to_string(),
            value: format!("{}/{}", report.files_processed, report.files_found),
        },
        KeyValueRow {
            field: "Unique wallets".to_string(),
            value: report.unique_wallets.to_string().green().to_string(),
        },
        KeyValueRow {
            field: "Duplicates".to_string(),
            value: report.duplicates.to_string().yellow().to_string(),
        },
        KeyValueRow {
            field: "Sorted by created_at".to_string(),
            value: if report.sorted {
                "yes".to_string()
            } else {
                "no".dimmed().to_string()
            },
        },
        KeyValueRow {
            field: "Output".to_string(),
            value: report.output.display().to_string(),
        },
    ];

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

fn output_timeline(timeline: &Timeline, format: OutputFormat) {
    match format {
        OutputFormat::Table => print_timeline_table(timeline),
        OutputFormat::Json => print_json(&timeline.points),
        OutputFormat::Jsonl => {
            for p in &timeline.points {
                println!("{}", serde_json::to_string(p).unwrap());
            }
        }
        OutputFormat::Yaml => print_yaml(&timeline.points),
        OutputFormat::Csv => print_csv(&timeline.points),
    }
}

fn print_timeline_table(timeline: &Timeline) {
    if timeline.is_empty() {
        println!("No solutions found.");
        return;
    }

    let rows: Vec<TimelineTableRow> = timeline
        .points
        .iter()
        .map(TimelineTableRow::from_point)
        .collect();
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
    println!(
        "\n{} {}",
        "Total:".dimmed(),
        format!("{} solutions", timeline.total()).bright_white()
    );
}

fn cmd_merge(config: &MergeConfig, format: OutputFormat) {
    let report = wallet_merge::merge(config).unwrap_or_else(|e| fail(&e));

    for f in report.skipped() {
        if let Some(error) = &f.error {
            warn(&format!("skipping {}", error));
        }
    }

    output_report(&report, format);
}

fn cmd_timeline(config: &TimelineConfig, format: OutputFormat) {
    let addresses = wallet_merge::load_addresses(&config.wallets).unwrap_or_else(|e| {
        warn(&format!("{}; counting all solutions", e));
        HashSet::new()
    });
    let challenges =
        wallet_merge::load_challenges(&config.challenges).unwrap_or_else(|e| fail(&e));

    let timeline = wallet_merge::build_timeline(&challenges, &addresses);
    for u in &timeline.unparsed {
        warn(&format!(
            "could not parse timestamp '{}' for challenge {}",
            u.value, u.challenge
        ));
    }

    output_timeline(&timeline, format);
}

fn main() {
    human_panic::setup_panic!();
    let cli = Cli::parse();
    run(cli);
}

fn run(cli: Cli) {
    match cli.command {
        Some(Commands::Merge { input_dir, output }) => {
            cmd_merge(&MergeConfig::new(input_dir, output), cli.format);
        }
        Some(Commands::Timeline {
            wallets,
            challenges,
        }) => cmd_timeline(
            &TimelineConfig {
                wallets,
                challenges,
            },
            cli.format,
        ),
        None => cmd_merge(&MergeConfig::default(), cli.format),
    }
}
