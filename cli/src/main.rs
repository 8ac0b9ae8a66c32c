//! easybookmark CLI - LLM-assisted PDF bookmarking

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use easybookmark::config::CONFIG_FILENAME;
use easybookmark::toc::apply_offset_counting;
use easybookmark::{
    add_bookmarks, default_output_path, import_toc_file, read_bookmarks, to_json, Config,
    EasyBookmark, ExtractionReport, JsonFormat, LopdfSource, OpenAiClient, PageRange, PageSource,
    WriteReport,
};

#[derive(Parser)]
#[command(name = "easybookmark")]
#[command(version)]
#[command(about = "Extract a PDF's table of contents with an LLM and add it as bookmarks", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, value_name = "FILE", default_value = CONFIG_FILENAME)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the TOC and print or save it as JSON
    Extract {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[command(flatten)]
        range: RangeArgs,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,

        #[command(flatten)]
        llm: LlmArgs,
    },

    /// Add bookmarks from a TOC JSON file
    Apply {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// TOC JSON file
        #[arg(long, value_name = "FILE")]
        toc: PathBuf,

        /// Value added to every page in the TOC file
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        offset: i64,

        /// Output PDF (defaults to <FILE>_bookmarked.pdf)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Extract the TOC and add it as bookmarks
    Run {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[command(flatten)]
        range: RangeArgs,

        /// Output PDF (defaults to <FILE>_bookmarked.pdf)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[command(flatten)]
        llm: LlmArgs,
    },

    /// Show the existing bookmarks of a PDF
    Show {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show the effective configuration
    Config {
        /// Write a default configuration file
        #[arg(long)]
        init: bool,
    },

    /// Show version information
    Version,
}

#[derive(Args)]
struct RangeArgs {
    /// Physical pages holding the TOC (e.g., "3-6" or "3-6,6-9")
    #[arg(long)]
    pages: Option<String>,

    /// Physical page of printed page N minus N
    #[arg(long, allow_hyphen_values = true)]
    offset: Option<i64>,
}

#[derive(Args)]
struct LlmArgs {
    /// API key
    #[arg(long, env = "EASYBOOKMARK_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model name
    #[arg(long)]
    model: Option<String>,

    /// API root of an OpenAI-compatible endpoint
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Never send page images
    #[arg(long)]
    no_vision: bool,

    /// Send page ranges concurrently
    #[arg(long)]
    parallel: bool,

    /// Do not fall back to line parsing when the model finds nothing
    #[arg(long)]
    no_heuristic: bool,

    /// Page image resolution
    #[arg(long)]
    dpi: Option<u32>,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Extract {
            input,
            range,
            output,
            compact,
            llm,
        }) => cmd_extract(&cli.config, &input, &range, output.as_deref(), compact, &llm),
        Some(Commands::Apply {
            input,
            toc,
            offset,
            output,
        }) => cmd_apply(&input, &toc, offset, output.as_deref()),
        Some(Commands::Run {
            input,
            range,
            output,
            llm,
        }) => cmd_run(&cli.config, &input, &range, output.as_deref(), &llm),
        Some(Commands::Show { input }) => cmd_show(&input),
        Some(Commands::Config { init }) => cmd_config(&cli.config, init),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            println!("{}", "Usage: easybookmark <COMMAND> <FILE>".yellow());
            println!("       easybookmark --help for more information");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

/// Load the config file and apply command-line overrides.
fn settings(config_path: &Path, llm: &LlmArgs) -> Config {
    let mut config = Config::load_or_default(config_path);

    if let Some(key) = &llm.api_key {
        config.api_key = key.clone();
    } else if config.api_key.is_empty() {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.api_key = key;
        }
    }
    if let Some(model) = &llm.model {
        config.model_name = model.clone();
    }
    if let Some(base_url) = &llm.base_url {
        config.base_url = Some(base_url.clone());
    }
    if llm.no_vision {
        config.vision = Some(false);
    }
    if llm.parallel {
        config.parallel = true;
    }
    if llm.no_heuristic {
        config.heuristic_fallback = false;
    }
    if let Some(dpi) = llm.dpi {
        config.dpi = dpi;
    }
    log::debug!(
        "Using model {} (vision: {}, parallel: {})",
        config.model_name,
        config.vision_enabled(),
        config.parallel
    );
    config
}

fn bookmarker(config: &Config, range: &RangeArgs) -> Result<EasyBookmark, Box<dyn std::error::Error>> {
    let mut builder = EasyBookmark::from_config(config)?;
    if let Some(pages) = &range.pages {
        let ranges =
            PageRange::parse_list(pages).map_err(|e| format!("Invalid page range: {}", e))?;
        builder = builder.with_ranges(ranges);
    }
    if let Some(offset) = range.offset {
        builder = builder.with_offset(offset);
    }
    Ok(builder)
}

fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed}]")
            .unwrap(),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message);
    pb
}

fn cmd_extract(
    config_path: &Path,
    input: &Path,
    range: &RangeArgs,
    output: Option<&Path>,
    compact: bool,
    llm: &LlmArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = settings(config_path, llm);
    let builder = bookmarker(&config, range)?;
    let client = OpenAiClient::new(config.openai_config())?;

    let pb = spinner(format!("Extracting TOC with {}...", config.model_name));
    let report = builder.extract(input, client);
    pb.finish_and_clear();
    let report = report?;

    if let Some(path) = output {
        let mut file = fs::File::create(path)?;
        write_toc(&mut file, &report, compact)?;
        println!("{}", extraction_summary(&report));
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        // stdout carries only the JSON; the summary goes to stderr
        write_toc(&mut io::stdout().lock(), &report, compact)?;
        eprintln!("{}", extraction_summary(&report));
    }

    Ok(())
}

/// Write the extracted entries as JSON, ready for `apply --toc`.
fn write_toc<W: Write>(
    out: &mut W,
    report: &ExtractionReport,
    compact: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let format = if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    };
    writeln!(out, "{}", to_json(&report.entries, format)?)?;
    Ok(())
}

fn cmd_apply(
    input: &Path,
    toc: &Path,
    offset: i64,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let entries = import_toc_file(toc)?;
    let page_count = LopdfSource::open(input)?.page_count();
    let validated = apply_offset_counting(entries, offset, 1..=i64::from(page_count));
    if validated.dropped > 0 {
        println!(
            "{} {} entries point outside the document",
            "Dropped".yellow(),
            validated.dropped
        );
    }

    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output_path(input));
    let written = add_bookmarks(input, &output, &validated.entries)?;

    print_written(&written);
    println!("{} {}", "Saved to".green(), output.display());
    Ok(())
}

fn cmd_run(
    config_path: &Path,
    input: &Path,
    range: &RangeArgs,
    output: Option<&Path>,
    llm: &LlmArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = settings(config_path, llm);
    let builder = bookmarker(&config, range)?;
    let client = OpenAiClient::new(config.openai_config())?;
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output_path(input));

    let pb = spinner(format!("Extracting TOC with {}...", config.model_name));
    let result = builder.run(input, &output, client);
    pb.finish_and_clear();
    let (report, written) = result?;

    println!("{}", extraction_summary(&report));
    print_written(&written);
    println!("{} {}", "Saved to".green(), output.display());
    Ok(())
}

fn cmd_show(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let entries = read_bookmarks(input)?;

    println!("{}", "Bookmarks".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    if entries.is_empty() {
        println!("{}", "(none)".dimmed());
        return Ok(());
    }

    for entry in &entries {
        let indent = "  ".repeat(entry.level.saturating_sub(1) as usize);
        let page = if entry.is_unresolved() {
            "?".to_string()
        } else {
            entry.page.to_string()
        };
        println!("{}{} {}", indent, entry.title, format!("p.{}", page).dimmed());
    }
    println!("\n{}: {}", "Total".bold(), entries.len());
    Ok(())
}

fn cmd_config(config_path: &Path, init: bool) -> Result<(), Box<dyn std::error::Error>> {
    if init {
        if config_path.exists() {
            return Err(format!("{} already exists", config_path.display()).into());
        }
        Config::default().save(config_path)?;
        println!("{} {}", "Created".green(), config_path.display());
        return Ok(());
    }

    let mut config = Config::load_or_default(config_path);
    config.api_key = config.masked_api_key();

    println!(
        "{} {}",
        "Configuration".cyan().bold(),
        format!("({})", config_path.display()).dimmed()
    );
    println!("{}", "─".repeat(40).dimmed());
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn extraction_summary(report: &ExtractionReport) -> String {
    let mut lines = vec![format!("\n{}", "Extraction".cyan().bold())];
    for pass in &report.passes {
        let tier = pass
            .tier
            .map(|t| t.to_string())
            .unwrap_or_else(|| "nothing found".to_string());
        lines.push(format!(
            "  {} pages {}: {} entries {}",
            "├─".dimmed(),
            pass.request.page_range,
            pass.entries,
            format!("({})", tier).dimmed()
        ));
    }
    lines.push(format!(
        "  {} {} entries, {} duplicates, {} out of range",
        "└─".dimmed(),
        report.entries.len().to_string().green().bold(),
        report.duplicates_dropped,
        report.out_of_range_dropped
    ));
    lines.join("\n")
}

fn print_written(written: &WriteReport) {
    println!(
        "{} {} bookmarks written",
        "Done!".green().bold(),
        written.written
    );
    if written.skipped() > 0 {
        println!(
            "  {} {} without page, {} past the last page",
            "skipped:".yellow(),
            written.skipped_unresolved,
            written.skipped_out_of_range
        );
    }
}

fn cmd_version() {
    println!("{} {}", "easybookmark".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("LLM-assisted PDF bookmarking tool");
    println!();
    println!("License: MIT");
}
