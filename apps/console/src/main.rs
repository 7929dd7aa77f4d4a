use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    notifications::drain_pending,
    pages::{
        generation::GenerationOutcome, DatabasePage, GenerationPage, PageContext, ProcessingPage,
        ReportsPage,
    },
    paging::DEFAULT_PAGE_SIZE,
    records::RecordFilter,
    settings::{load_settings, load_settings_from, prepare_base_url},
    BroadcastNotifier, HttpStudentApi, NotificationLevel, Phase, SelectedFile,
};
use shared::domain::ExportFormat;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "student-console", about = "Drive the student data API from a terminal")]
struct Cli {
    /// Settings file; defaults to ./client.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    api_base_url: Option<String>,
    #[arg(long)]
    download_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a spreadsheet of random students on the server.
    Generate {
        #[arg(long, default_value_t = 1000)]
        records: i64,
        #[arg(long)]
        download: bool,
    },
    /// Run the server's quick performance test and optionally fetch the largest file.
    QuickTest {
        #[arg(long)]
        download: bool,
    },
    /// Convert an Excel workbook to CSV on the server.
    Convert { file: PathBuf },
    /// Upload a CSV file into the student database.
    Upload { file: PathBuf },
    Count,
    /// List all students, filtered locally.
    Students {
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long)]
        class: Option<String>,
    },
    /// Fetch one page of the student report.
    Report {
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        size: u32,
        #[arg(long, default_value = "")]
        student_id: String,
        #[arg(long, default_value = "")]
        class: String,
    },
    /// Export the filtered report as excel, csv or pdf and download it.
    Export {
        #[arg(value_parser = parse_format)]
        format: ExportFormat,
        #[arg(long, default_value = "")]
        student_id: String,
        #[arg(long, default_value = "")]
        class: String,
    },
}

fn parse_format(raw: &str) -> Result<ExportFormat, String> {
    ExportFormat::parse(raw).ok_or_else(|| format!("unknown export format '{raw}'"))
}

fn finished(phase: Phase, action: &str) -> Result<()> {
    if phase == Phase::Failed {
        bail!("{action} failed");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => load_settings_from(path)?,
        None => load_settings()?,
    };
    if let Some(url) = &cli.api_base_url {
        settings.api_base_url = prepare_base_url(url)?;
    }
    if let Some(dir) = cli.download_dir.clone() {
        settings.download_dir = dir;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    info!(api = %settings.api_base_url, "student console starting");

    let api = Arc::new(
        HttpStudentApi::from_settings(&settings).context("failed to build http client")?,
    );
    let notifier = Arc::new(BroadcastNotifier::default());
    let mut notices = notifier.subscribe();
    let ctx = PageContext::new(api, notifier, &settings);

    let outcome = run(cli.command, ctx).await;

    for notice in drain_pending(&mut notices) {
        let tag = match notice.level {
            NotificationLevel::Success => "ok",
            NotificationLevel::Error => "error",
            NotificationLevel::Info => "info",
        };
        eprintln!("[{tag}] {}", notice.message);
    }
    outcome
}

async fn run(command: Command, ctx: PageContext) -> Result<()> {
    match command {
        Command::Generate { records, download } => {
            let page = GenerationPage::new(ctx);
            finished(page.generate_records(records).await?, "generation")?;
            if let Some(link) = page.share_link().await {
                println!("file available at {link}");
            }
            if download {
                if let Some(phase) = page.download_current().await? {
                    finished(phase, "download")?;
                }
            }
        }
        Command::QuickTest { download } => {
            let page = GenerationPage::new(ctx);
            finished(page.run_quick_performance_test().await?, "quick test")?;
            if let Some(GenerationOutcome::PerformanceTest(report)) = page.state().await.result {
                for entry in &report.runs {
                    println!(
                        "{}: {}",
                        entry.key,
                        serde_json::to_string(&entry.details)?
                    );
                }
            }
            if download {
                if let Some(phase) = page.download_current().await? {
                    finished(phase, "download")?;
                }
            }
        }
        Command::Convert { file } => {
            let page = ProcessingPage::new(ctx);
            page.select_file(SelectedFile::from_path(&file).await?)
                .await?;
            finished(page.convert().await?, "conversion")?;
            if let Some(report) = page.state().await.result {
                println!(
                    "{}",
                    report.csv_file_path.unwrap_or(report.message)
                );
            }
        }
        Command::Upload { file } => {
            let page = DatabasePage::new(ctx);
            page.select_file(SelectedFile::from_path(&file).await?)
                .await?;
            finished(page.upload().await?, "upload")?;
            println!(
                "uploaded {} records; {} students stored",
                page.uploaded_records().await,
                page.total_students().await
            );
        }
        Command::Count => {
            let page = DatabasePage::new(ctx);
            finished(page.refresh_count().await?, "count")?;
            println!("{}", page.total_students().await);
        }
        Command::Students { search, class } => {
            let page = DatabasePage::new(ctx);
            finished(page.load_students().await?, "student listing")?;
            page.set_filter(RecordFilter::new(search, class)).await;
            let stats = page.stats().await;
            println!(
                "{}",
                serde_json::to_string_pretty(&page.filtered_students().await)?
            );
            println!(
                "{} students, {} classes, average score {:.1}",
                stats.total, stats.class_count, stats.average_score
            );
        }
        Command::Report {
            page: index,
            size,
            student_id,
            class,
        } => {
            let page = ReportsPage::new(ctx);
            page.set_filters(&student_id, &class).await?;
            finished(page.change_page(index, size).await?, "report")?;
            println!("{}", serde_json::to_string_pretty(&page.rows().await)?);
            let query = page.query().await;
            println!(
                "page {} of {} ({} matching students)",
                query.page_index + 1,
                page.page_count().await,
                page.total_elements().await
            );
        }
        Command::Export {
            format,
            student_id,
            class,
        } => {
            let page = ReportsPage::new(ctx);
            page.set_filters(&student_id, &class).await?;
            if let Some(phase) = page.export(format).await? {
                finished(phase, "download")?;
            }
            finished(page.export_state().await.phase, "export")?;
            if let Some(saved) = page.download_state().await.result {
                println!("saved {} ({} bytes)", saved.path.display(), saved.size_bytes);
            }
        }
    }
    Ok(())
}
