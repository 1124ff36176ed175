use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use tankobon::{perform_convert, ConvertOptions, SplitPolicy};

#[derive(Parser, Debug)]
#[command(name = "tankobon")]
#[command(version, about = "Combines chapter folders of page scans into ordered PDF volumes.", long_about = None)]
struct Cli {
    /// Root directory containing one subdirectory per chapter
    #[arg(value_name = "DIR")]
    input: PathBuf,

    /// Base name for the output PDF(s), without extension
    #[arg(short, long, default_value = "volume", value_name = "NAME")]
    output: String,

    /// Directory the PDFs are written into
    #[arg(short = 'd', long, default_value = ".", value_name = "DIR")]
    output_dir: PathBuf,

    /// Split the output into numbered parts
    #[arg(long, value_enum, value_name = "MODE")]
    split_by: Option<SplitBy>,

    /// Pages or chapters per part (0 = no split)
    #[arg(long, default_value_t = 0, value_name = "NUM")]
    split_value: u32,

    /// Print the outcome as JSON
    #[arg(long)]
    json: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum SplitBy {
    Pages,
    Chapters,
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let policy = match cli.split_by {
        Some(SplitBy::Pages) => SplitPolicy::ByPages(cli.split_value),
        Some(SplitBy::Chapters) => SplitPolicy::ByChapters(cli.split_value),
        None => SplitPolicy::NoSplit,
    };

    let style = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40} {pos}/{len} pages")?
        .progress_chars("=> ");

    let mut bar: Option<ProgressBar> = None;
    let outcome = perform_convert(
        ConvertOptions {
            root: cli.input,
            output_name: cli.output,
            policy,
            output_dir: Some(cli.output_dir),
        },
        &mut |progress| {
            let bar = bar.get_or_insert_with(|| {
                let bar = ProgressBar::new(progress.total_pages as u64);
                bar.set_style(style.clone());
                bar
            });
            bar.set_position(progress.written_pages as u64);
            bar.println(format!("wrote {}", progress.document.display()));
        },
    )?;

    if let Some(bar) = &bar {
        bar.finish();
    }

    for warning in &outcome.warnings {
        warn!("{}", warning);
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!(
            "Wrote {} page(s) across {} PDF(s)",
            outcome.total_pages,
            outcome.documents.len()
        );
    }

    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    if let Err(e) = run() {
        eprintln!("[Error] {:#}", e);
        std::process::exit(1);
    }
}
