mod common;
mod logic;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use common::scenario::{expand_group, get_scenario, list_scenarios};
use common::split_csv;
use logic::policy::GameplayStrategy;
use logic::{GameTester, LogicTester, resolve_seed_inputs};

#[derive(Debug, Parser)]
#[command(name = "pixelday-tester", version = "0.1.0")]
#[command(about = "Automated playthroughs and invariant checks for the Pixelday game logic")]
struct Args {
    /// Scenarios to run (comma-separated; `full-day` and `all` expand to groups)
    #[arg(long, default_value = "smoke")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Seeds to run (comma-separated integers, 0x hex, or `random`)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of days played per scenario and seed
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Player policy for scenarios that do not fix one (kind, mischief, repairer, random)
    #[arg(long)]
    strategy: Option<String>,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_scenarios(&args)? {
        return Ok(());
    }

    announce_banner();

    let start_time = Instant::now();
    let scenarios = expand_scenarios(&args.scenarios);
    let strategy = resolve_strategy(args.strategy.as_deref())?;
    let seed_tokens = split_csv(&args.seeds);
    let seed_infos = resolve_seed_inputs(&seed_tokens)?;
    for info in &seed_infos {
        if let Some(source) = &info.source {
            println!("🌱 Seed {} (from {source})", info.seed);
        }
    }
    let logic_seeds: Vec<u64> = seed_infos.iter().map(|s| s.seed).collect();
    log::debug!("running {scenarios:?} with seeds {logic_seeds:?}");
    let game_tester = GameTester::try_new(args.verbose).context("loading scene catalog")?;

    let all_results =
        run_logic_scenarios(&args, &scenarios, &logic_seeds, strategy, game_tester).await;

    write_reports(&args, &all_results, start_time)?;

    if all_results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_scenarios(args: &Args) -> Result<bool> {
    if !args.list_scenarios {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available scenarios:")?;
    for (key, description) in list_scenarios() {
        writeln!(output_target.writer(), "  {key:25} - {description}")?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🎮 Pixelday Automated Tester".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

fn expand_scenarios(scenarios_arg: &str) -> Vec<String> {
    let mut scenarios: Vec<String> = Vec::new();
    for token in split_csv(scenarios_arg) {
        let keys = expand_group(&token).unwrap_or_else(|| vec![token]);
        for key in keys {
            if !scenarios.contains(&key) {
                scenarios.push(key);
            }
        }
    }
    scenarios
}

fn resolve_strategy(name: Option<&str>) -> Result<Option<GameplayStrategy>> {
    name.map(|name| {
        GameplayStrategy::from_key(name).ok_or_else(|| anyhow!("Unknown strategy: {name}"))
    })
    .transpose()
}

async fn run_logic_scenarios(
    args: &Args,
    scenarios: &[String],
    logic_seeds: &[u64],
    strategy: Option<GameplayStrategy>,
    game_tester: GameTester,
) -> Vec<logic::ScenarioResult> {
    let mut results: Vec<logic::ScenarioResult> = Vec::new();

    println!("{}", "🧠 Running Logic Tests".bright_yellow().bold());
    println!("{}", "-".repeat(30).yellow());

    let logic_tester = LogicTester::new(game_tester);

    for scenario_name in scenarios {
        if let Some(scenario) = get_scenario(scenario_name) {
            let scenario = scenario.with_strategy_override(strategy);
            let scenario_results = logic_tester
                .run_scenario(&scenario, logic_seeds, args.iterations)
                .await;
            results.extend(scenario_results);
        } else {
            eprintln!("⚠️  Unknown scenario: {}", scenario_name.yellow());
        }
    }

    results
}

fn write_reports(
    args: &Args,
    results: &[logic::ScenarioResult],
    start_time: Instant,
) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => {
            if results.is_empty() {
                writeln!(&mut output_target, "[]")?;
            } else {
                logic::reports::generate_json_report(&mut output_target, results)?;
            }
        }
        "markdown" => {
            if results.is_empty() {
                writeln!(
                    &mut output_target,
                    "# Pixelday Logic Test Results\n\n_No scenarios executed._"
                )?;
            } else {
                logic::reports::generate_markdown_report(&mut output_target, results)?;
            }
        }
        _ => {
            let duration = start_time.elapsed();
            if results.is_empty() {
                writeln!(&mut output_target, "No logic scenarios executed.")?;
            } else {
                logic::reports::generate_console_report(&mut output_target, results, duration)?;
            }
            writeln!(&mut output_target)?;
            writeln!(&mut output_target, "🏁 Total time: {duration:?}")?;
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
