use anyhow::Result;
use colored::*;
use indicatif::MultiProgress;
use itemizer::{
    core::config::{parse_item_list, SegmenterConfig, StrategyMode},
    edgar::{
        batch::{self, BatchOptions},
        filing::{self, render_sections},
        parsing::{ParseOutcome, Segmenter},
        report::ReportType,
    },
};
use std::path::PathBuf;
use std::sync::Arc;
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(name = "itemizer", about = "Split EDGAR periodic reports into their items")]
enum Command {
    /// Segment one filing and print its sections
    Segment {
        /// Submission text file
        #[structopt(parse(from_os_str))]
        input: PathBuf,

        /// Form type; defaults to the one the submission declares
        #[structopt(long)]
        form: Option<ReportType>,

        /// Discovery strategy: auto, pattern or index
        #[structopt(long)]
        strategy: Option<StrategyMode>,

        /// Print the outcome as JSON
        #[structopt(long)]
        json: bool,

        /// Run both strategies and report whether they agree
        #[structopt(long)]
        compare: bool,

        /// Only emit these items, e.g. "1a,7,7a"
        #[structopt(long)]
        items: Option<String>,
    },

    /// Segment many filings, writing one output file per input
    Batch {
        /// Files or directories of submission text files
        #[structopt(parse(from_os_str), required = true)]
        inputs: Vec<PathBuf>,

        #[structopt(long, default_value = "4")]
        workers: usize,

        /// Only segment these forms (repeatable)
        #[structopt(long = "form")]
        forms: Vec<ReportType>,

        /// Only segment filings from these CIKs (repeatable)
        #[structopt(long = "cik")]
        ciks: Vec<String>,

        /// Re-segment filings that already have output
        #[structopt(long)]
        overwrite: bool,

        /// Output directory; defaults to $ITEMIZER_OUTPUT_DIR, then next to each input
        #[structopt(long, parse(from_os_str))]
        output_dir: Option<PathBuf>,

        /// Form to assume for every filing instead of its declared form
        #[structopt(long)]
        declared_form: Option<ReportType>,

        #[structopt(long)]
        strategy: Option<StrategyMode>,

        #[structopt(long)]
        items: Option<String>,
    },
}

fn build_segmenter(strategy: Option<StrategyMode>, items: Option<&str>) -> Result<Segmenter> {
    let mut config = SegmenterConfig::from_env()?;
    if let Some(strategy) = strategy {
        config.strategy = strategy;
    }
    if let Some(items) = items {
        config.items = parse_item_list(items);
    }
    log::debug!("Segmenter config: {:?}", config);
    Segmenter::new(config)
}

fn segment(
    input: PathBuf,
    form: Option<ReportType>,
    segmenter: &Segmenter,
    json: bool,
    compare: bool,
) -> Result<bool> {
    let filing = filing::load_filing(&input, form)?;

    if compare {
        let comparison = segmenter.compare_strategies(&filing)?;
        println!("{}", serde_json::to_string_pretty(&comparison)?);
        if comparison.agree {
            println!("{}", "Strategies agree".green());
        } else {
            println!("{}", "Strategies disagree".yellow());
        }
        return Ok(comparison.agree);
    }

    let outcome = segmenter.segment(&filing);
    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(outcome.is_parsed());
    }

    match &outcome {
        ParseOutcome::Parsed(parsed) => {
            print!("{}", render_sections(parsed, segmenter.config().section_marker)?);
            for diagnostic in parsed.diagnostics.iter() {
                eprintln!(
                    "{} {:?}: {}",
                    "note:".dimmed(),
                    diagnostic.kind,
                    diagnostic.message
                );
            }
            if let Some(url) = parsed.metadata.archive_url() {
                eprintln!("{} {}", "source:".dimmed(), url);
            }
            Ok(true)
        }
        ParseOutcome::Failed(failure) => {
            eprintln!(
                "{} {}: {}",
                "Failed".red().bold(),
                failure.reason,
                failure.message
            );
            if let Some(excerpt) = &failure.excerpt {
                eprintln!("  {}", excerpt.dimmed());
            }
            Ok(false)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();
    log::debug!("Logger initialized");

    match Command::from_args() {
        Command::Segment {
            input,
            form,
            strategy,
            json,
            compare,
            items,
        } => {
            if !input.exists() {
                eprintln!("Input file does not exist: {:?}", input);
                std::process::exit(1);
            }
            let segmenter = build_segmenter(strategy, items.as_deref())?;
            if !segment(input, form, &segmenter, json, compare)? {
                std::process::exit(2);
            }
        }
        Command::Batch {
            inputs,
            workers,
            forms,
            ciks,
            overwrite,
            output_dir,
            declared_form,
            strategy,
            items,
        } => {
            let segmenter = Arc::new(build_segmenter(strategy, items.as_deref())?);
            let inputs = batch::collect_inputs(&inputs)?;
            if inputs.is_empty() {
                println!("{}", "No input files found".yellow());
                return Ok(());
            }

            let output_dir =
                output_dir.or_else(|| std::env::var("ITEMIZER_OUTPUT_DIR").ok().map(PathBuf::from));
            let options = BatchOptions {
                workers,
                forms,
                ciks,
                overwrite,
                output_dir,
                declared_form,
            };

            let multi_progress = Arc::new(MultiProgress::new());
            let summary =
                batch::run_batch(inputs, segmenter, options, Some(&multi_progress)).await?;

            println!(
                "{} {}",
                "Batch complete:".green().bold(),
                summary.to_string().bold()
            );
            for (reason, count) in &summary.failures_by_reason {
                println!("  {} {}", format!("{:>6}", count).red(), reason);
            }
        }
    }

    Ok(())
}
