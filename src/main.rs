// Main CLI entry point for idox
// Uses clap for argument parsing

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use idox::engine::{Idox, Options, DEFAULT_INJECTION_POINT};
use idox::models::Protocol;
use idox::parsers::split_response;
use idox::reporting::{export_summary, render_summary};
use idox::response_analysis::classify_response;
use idox::sequences::{FileSequence, NumericSequence, Sequence};
use idox::transport::TransportResponse;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn run_args() -> Vec<Arg> {
    vec![
        Arg::new("ending_number")
            .value_parser(value_parser!(i64))
            .help("The number of requests to send up to (exclusive)"),
        Arg::new("sequence_file")
            .long("sequence-file")
            .value_parser(value_parser!(PathBuf))
            .conflicts_with("ending_number")
            .help("Read one token per line from this file instead of counting"),
        Arg::new("starting_number")
            .long("starting-number")
            .value_parser(value_parser!(i64))
            .default_value("0")
            .allow_negative_numbers(true)
            .help("The base number to start at"),
        Arg::new("numeric_step")
            .long("numeric-step")
            .value_parser(value_parser!(i64))
            .default_value("1")
            .allow_negative_numbers(true)
            .help("The step between numbers to take on each iteration"),
        Arg::new("max_concurrency")
            .long("max-concurrency")
            .value_parser(value_parser!(usize))
            .default_value("25")
            .help("Maximum concurrent requests to make at a time"),
        Arg::new("output_directory")
            .long("output-directory")
            .value_parser(value_parser!(PathBuf))
            .default_value("./output")
            .help("Directory to store results in"),
        Arg::new("injection_point")
            .long("injection-point")
            .default_value(DEFAULT_INJECTION_POINT)
            .help("The marker replaced by each token"),
        Arg::new("protocol")
            .long("protocol")
            .value_parser(["http", "https"])
            .default_value("https")
            .help("Scheme used when the request has none"),
        Arg::new("timeout")
            .long("timeout")
            .value_parser(value_parser!(u64))
            .help("Per-request timeout in seconds"),
    ]
}

fn cli() -> Command {
    Command::new("idox")
        .version(clap::crate_version!())
        .about("IDOR file downloader using HTTP request files")
        .arg(Arg::new("verbose")
            .short('v')
            .long("verbose")
            .global(true)
            .action(ArgAction::SetTrue)
            .help("Log run progress"))
        .arg(Arg::new("debug")
            .long("debug")
            .global(true)
            .action(ArgAction::SetTrue)
            .help("Log every request and artifact"))
        .subcommand_required(true)
        .subcommand(Command::new("file")
            .about("Enumerate using a raw HTTP request file")
            .arg(Arg::new("request_file_path")
                .long("request-file-path")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("The path to the raw request file (e.g. exported from Burp)"))
            .args(run_args()))
        .subcommand(Command::new("url")
            .about("Enumerate a bare URL")
            .arg(Arg::new("url")
                .required(true)
                .help("The url to make requests to"))
            .arg(Arg::new("request_type")
                .long("request-type")
                .default_value("GET")
                .help("HTTP method to use"))
            .args(run_args()))
        .subcommand(Command::new("classify")
            .about("Print the extension a captured raw HTTP response would be saved as")
            .arg(Arg::new("response_file")
                .required(true)
                .value_parser(value_parser!(PathBuf))))
}

fn init_logging(matches: &ArgMatches) {
    let level = if matches.get_flag("debug") {
        "debug"
    } else if matches.get_flag("verbose") {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("idox={},reqwest=info,hyper=info", level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn build_sequence(matches: &ArgMatches) -> Result<Box<dyn Sequence>> {
    if let Some(path) = matches.get_one::<PathBuf>("sequence_file") {
        return Ok(Box::new(FileSequence::open(path)?));
    }
    let end = *matches
        .get_one::<i64>("ending_number")
        .context("ENDING_NUMBER is required unless --sequence-file is given")?;
    let start = *matches.get_one::<i64>("starting_number").unwrap_or(&0);
    let step = *matches.get_one::<i64>("numeric_step").unwrap_or(&1);
    Ok(Box::new(NumericSequence::new(start, Some(end), step)?))
}

fn build_options(matches: &ArgMatches) -> Result<Options> {
    let protocol = matches
        .get_one::<String>("protocol")
        .map(|p| p.parse::<Protocol>())
        .transpose()
        .map_err(anyhow::Error::msg)?
        .unwrap_or_default();

    let mut options = Options {
        protocol,
        request_timeout: matches.get_one::<u64>("timeout").map(|s| Duration::from_secs(*s)),
        ..Options::default()
    };
    if let Some(n) = matches.get_one::<usize>("max_concurrency") {
        options.max_concurrency = *n;
    }
    if let Some(dir) = matches.get_one::<PathBuf>("output_directory") {
        options.output_directory = dir.clone();
    }
    if let Some(marker) = matches.get_one::<String>("injection_point") {
        options.injection_point = marker.clone();
    }
    Ok(options)
}

async fn run(matches: &ArgMatches, options: Options) -> Result<()> {
    let sequence = build_sequence(matches)?;
    let idox = Idox::new(sequence, options)?;
    let output_directory = idox.output_directory().to_path_buf();

    println!("Starting Idox");
    let stats = idox.run().await;
    println!("Finished running");
    print!("{}", render_summary(&stats));

    let path = export_summary(&stats, &output_directory)
        .with_context(|| format!("failed to write summary to {}", output_directory.display()))?;
    println!("Summary written to {}", path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_logging(&matches);

    match matches.subcommand() {
        Some(("file", sub)) => {
            let mut options = build_options(sub)?;
            options.request_file = sub.get_one::<PathBuf>("request_file_path").cloned();
            run(sub, options).await
        }
        Some(("url", sub)) => {
            let mut options = build_options(sub)?;
            options.request_url = sub.get_one::<String>("url").cloned();
            if let Some(method) = sub.get_one::<String>("request_type") {
                options.request_method = method.to_ascii_uppercase();
            }
            run(sub, options).await
        }
        Some(("classify", sub)) => {
            let path = sub
                .get_one::<PathBuf>("response_file")
                .context("response file is required")?;
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let response: TransportResponse = split_response(&raw)?.into();
            println!("{}", classify_response(&response));
            Ok(())
        }
        _ => unreachable!("subcommand_required is set"),
    }
}
