//! Nexus - headless front end for the spreadsheet formula engine

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, bail};
use nexus_core::{Config, Sheet};
use nexus_engine::builtins::BUILTINS;
use nexus_engine::engine::{column_index_to_letters, format_number, parse_cell_reference};

const DEFAULT_COLUMNS: usize = 26;
/// Tallest sheet `--set` may ask for.
const MAX_ROWS: usize = 100_000;

fn print_usage() {
    eprintln!("Usage: nexus [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --columns <A,B,...>               Column names (default: A..Z)");
    eprintln!("  --set <REF=VALUE>                 Store a value or =formula (can be repeated)");
    eprintln!("  -c, --command <FORMULA>           Evaluate a formula and print the result");
    eprintln!("  --goal-seek <TARGET> <VALUE> <CHANGING>");
    eprintln!("                                    Solve CHANGING so TARGET evaluates to VALUE");
    eprintln!("  --config <FILE>                   Load settings from TOML file");
    eprintln!("  --no-config                       Ignore the user config file");
    eprintln!("  -h, --help                        Print help");
    eprintln!();
    eprintln!("Functions:");
    for info in BUILTINS {
        eprintln!("  {:<34}{}", info.sheet_name, info.description);
    }
}

struct GoalSeekArgs {
    target: String,
    value: f64,
    changing: String,
}

#[derive(Default)]
struct Options {
    columns: Option<Vec<String>>,
    assignments: Vec<(String, String)>,
    command: Option<String>,
    goal_seek: Option<GoalSeekArgs>,
    config: Option<PathBuf>,
    no_config: bool,
    help: bool,
}

fn take_value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> anyhow::Result<&'a str> {
    *i += 1;
    match args.get(*i) {
        Some(value) => Ok(value.as_str()),
        None => bail!("{} requires a value", flag),
    }
}

fn parse_args(args: &[String]) -> anyhow::Result<Options> {
    let mut options = Options::default();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => options.help = true,
            "--columns" => {
                let list = take_value(args, &mut i, "--columns")?;
                let columns: Vec<String> = list.split(',').map(|c| c.trim().to_string()).collect();
                if columns.iter().any(String::is_empty) {
                    bail!("--columns must not contain blank names");
                }
                options.columns = Some(columns);
            }
            "--set" => {
                let assignment = take_value(args, &mut i, "--set")?;
                let (reference, value) = assignment
                    .split_once('=')
                    .with_context(|| format!("--set expects REF=VALUE, got {}", assignment))?;
                options
                    .assignments
                    .push((reference.trim().to_string(), value.to_string()));
            }
            "-c" | "--command" => {
                let formula = take_value(args, &mut i, "--command")?;
                options.command = Some(formula.to_string());
            }
            "--goal-seek" => {
                let target = take_value(args, &mut i, "--goal-seek")?.to_string();
                let value = take_value(args, &mut i, "--goal-seek")?;
                let value: f64 = value
                    .trim()
                    .parse()
                    .with_context(|| format!("--goal-seek target value is not a number: {}", value))?;
                let changing = take_value(args, &mut i, "--goal-seek")?.to_string();
                options.goal_seek = Some(GoalSeekArgs {
                    target,
                    value,
                    changing,
                });
            }
            "--config" => {
                let path = take_value(args, &mut i, "--config")?;
                options.config = Some(PathBuf::from(path));
            }
            "--no-config" => options.no_config = true,
            arg => bail!("Unknown option: {}", arg),
        }
        i += 1;
    }
    Ok(options)
}

/// Build a sheet just tall enough for every `--set` target.
fn build_sheet(options: &Options) -> anyhow::Result<Sheet> {
    let mut sheet = match &options.columns {
        Some(columns) => Sheet::new("Sheet1", columns.iter().cloned()),
        None => Sheet::new("Sheet1", (0..DEFAULT_COLUMNS).map(column_index_to_letters)),
    };

    let rows = options
        .assignments
        .iter()
        .filter_map(|(reference, _)| parse_cell_reference(reference))
        .map(|at| at.row + 1)
        .max()
        .unwrap_or(1);
    if rows > MAX_ROWS {
        bail!("--set row {} exceeds the {} row limit", rows, MAX_ROWS);
    }
    for _ in 0..rows {
        sheet.add_row();
    }

    for (reference, value) in &options.assignments {
        sheet
            .set_input(reference, value)
            .with_context(|| format!("--set {}", reference))?;
    }
    Ok(sheet)
}

fn load_config(path: Option<&PathBuf>) -> Config {
    match Config::load(path.map(PathBuf::as_path)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: {}; using default settings", e);
            Config::default()
        }
    }
}

fn run(options: Options) -> anyhow::Result<ExitCode> {
    if options.command.is_none() && options.goal_seek.is_none() {
        print_usage();
        bail!("nothing to do: pass --command or --goal-seek");
    }

    let config = if options.no_config {
        Config::default()
    } else {
        load_config(options.config.as_ref())
    };
    let mut sheet = build_sheet(&options)?;
    let mut failed = false;

    if let Some(seek) = &options.goal_seek {
        match sheet.goal_seek(&seek.target, seek.value, &seek.changing, &config.solver) {
            Ok(solved) => println!("{}", format_number(solved)),
            Err(e) => {
                println!("{}", e);
                failed = true;
            }
        }
    }

    if let Some(command) = &options.command {
        // Leading '=' is optional on the command line.
        let command = command.trim();
        let formula = if command.starts_with('=') {
            command.to_string()
        } else {
            format!("={}", command)
        };
        let value = sheet.evaluate_input(&formula);
        println!("{}", value);
        failed |= value.is_error();
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage();
            return ExitCode::FAILURE;
        }
    };
    if options.help {
        print_usage();
        return ExitCode::SUCCESS;
    }

    match run(options) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
