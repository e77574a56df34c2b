use anyhow::Result;
use gosub_testing::testing::config::HarnessConfig;
use gosub_testing::testing::tree_construction::backend::BackendRegistry;
use gosub_testing::testing::tree_construction::{run_conformance, Corpus};
use log::{info, LevelFilter};
use simple_logger::SimpleLogger;
use std::path::PathBuf;
use std::process::exit;

/// Tree builders linked into this runner. Backends register themselves here by name.
fn registered_backends() -> BackendRegistry {
    BackendRegistry::new()
}

fn main() -> Result<()> {
    let matches = clap::Command::new("Gosub html5lib tree-construction runner")
        .version("0.1.0")
        .arg(
            clap::Arg::new("config")
                .help("Json file with the run configuration")
                .short('c')
                .long("config"),
        )
        .arg(
            clap::Arg::new("fixtures")
                .help("Directory with the tree-construction fixtures")
                .long("fixtures"),
        )
        .arg(
            clap::Arg::new("xfail")
                .help("Fixture file with the inputs that are expected to fail")
                .long("xfail"),
        )
        .arg(
            clap::Arg::new("check-errors")
                .help("Also compare the number of parse errors")
                .long("check-errors")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            clap::Arg::new("threads")
                .help("Number of worker threads")
                .short('j')
                .long("threads")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            clap::Arg::new("list")
                .help("Only print the test matrix")
                .long("list")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            clap::Arg::new("debug")
                .help("Enable debug logging")
                .short('d')
                .long("debug")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let level = if matches.get_flag("debug") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    SimpleLogger::new().with_level(level).init()?;

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => HarnessConfig::from_json_file(path)?,
        None => HarnessConfig::default(),
    };
    if let Some(fixtures) = matches.get_one::<String>("fixtures") {
        config.fixture_root = PathBuf::from(fixtures);
    }
    if let Some(xfail) = matches.get_one::<String>("xfail") {
        config.expected_failures = Some(PathBuf::from(xfail));
    }
    if matches.get_flag("check-errors") {
        config.check_parse_errors = true;
    }
    if let Some(threads) = matches.get_one::<usize>("threads") {
        config.threads = *threads;
    }
    config.validate()?;

    let mut backends = registered_backends();
    if backends.is_empty() {
        info!("No tree builders registered");
    }

    if matches.get_flag("list") {
        backends.retain_selected(&config.backends)?;

        let corpus = Corpus::load(&config)?;
        let plan = corpus.plan(&backends, &config);
        for cell in plan.cells() {
            let marker = if cell.scripting_disabled {
                " (skip)"
            } else if cell.expected_to_fail {
                " (xfail)"
            } else {
                ""
            };
            println!("{}{marker}", cell.id());
        }
        println!("{} cells", plan.len());

        return Ok(());
    }

    let summary = run_conformance(&config, backends)?;
    for result in summary.failures() {
        println!("{} {}", result.outcome.marker(), result.id);
    }
    println!("{summary}");

    if !summary.is_success() {
        exit(1);
    }

    Ok(())
}
