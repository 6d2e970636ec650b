use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use microgrid_dispatch::config::InputConfig;
use microgrid_dispatch::domain::{combine_generation, GenerationForecast};
use microgrid_dispatch::{report, solver, telemetry, DispatchMode, SolverKind};
use tracing::{info, warn};

const USAGE: &str = "\
Usage: microgrid-dispatch [OPTIONS] <config.json>

Options:
  --mode <cost|islanded>        dispatch mode (default: inferred from config)
  --solver <exact|annealing>    solver backend (default: exact)
  --forecast <file>             forecast collaborator JSON; repeatable,
                                series are summed (e.g. solar + wind)
  --json                        emit the result as JSON instead of a table
";

struct CliArgs {
    config: PathBuf,
    mode: Option<DispatchMode>,
    solver: SolverKind,
    forecasts: Vec<PathBuf>,
    json: bool,
}

enum Cli {
    Run(CliArgs),
    Help,
}

impl CliArgs {
    /// Parse everything after the program name.
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Cli> {
        let mut config = None;
        let mut mode = None;
        let mut solver = SolverKind::Exact;
        let mut forecasts = Vec::new();
        let mut json = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--mode" => {
                    let value = args.next().context("--mode needs a value")?;
                    mode = Some(
                        DispatchMode::from_str(&value)
                            .map_err(|_| anyhow::anyhow!("unknown mode `{value}`"))?,
                    );
                }
                "--solver" => {
                    let value = args.next().context("--solver needs a value")?;
                    solver = SolverKind::from_str(&value)
                        .map_err(|_| anyhow::anyhow!("unknown solver `{value}`"))?;
                }
                "--forecast" => {
                    forecasts.push(PathBuf::from(
                        args.next().context("--forecast needs a path")?,
                    ));
                }
                "--json" => json = true,
                "--help" | "-h" => return Ok(Cli::Help),
                other if config.is_none() && !other.starts_with('-') => {
                    config = Some(PathBuf::from(other));
                }
                other => bail!("unexpected argument `{other}`\n\n{USAGE}"),
            }
        }

        Ok(Cli::Run(Self {
            config: config.with_context(|| format!("missing config path\n\n{USAGE}"))?,
            mode,
            solver,
            forecasts,
            json,
        }))
    }
}

fn load_forecasts(paths: &[PathBuf]) -> Result<Option<Vec<f64>>> {
    if paths.is_empty() {
        return Ok(None);
    }
    let mut series = Vec::with_capacity(paths.len());
    for path in paths {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read forecast file {}", path.display()))?;
        let forecast: GenerationForecast = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse forecast file {}", path.display()))?;
        if forecast.granularity != "hourly" {
            warn!(
                path = %path.display(),
                granularity = %forecast.granularity,
                "forecast granularity is not hourly"
            );
        }
        info!(
            path = %path.display(),
            date = %forecast.date,
            total_kwh = forecast.total_generation_kwh,
            "loaded generation forecast"
        );
        series.push(forecast.forecast_series_kwh);
    }
    Ok(Some(combine_generation(&series)?))
}

fn main() -> Result<()> {
    telemetry::init_tracing();

    let args = match CliArgs::parse(std::env::args().skip(1))? {
        Cli::Run(args) => args,
        Cli::Help => {
            println!("{USAGE}");
            return Ok(());
        }
    };
    let config = InputConfig::load(&args.config)?;

    let mode = args.mode.unwrap_or_else(|| config.inferred_mode());
    let generation = load_forecasts(&args.forecasts)?;
    let input = config.into_input(mode, generation)?;

    let backend = solver::backend(args.solver)?;
    info!(solver = backend.name(), %mode, horizon = input.horizon(), "running dispatch");

    let result = microgrid_dispatch::solve_dispatch(&input, backend.as_ref())?;

    if args.json {
        println!("{}", report::render_json(&result)?);
    } else {
        print!("{}", report::render_table(&result));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli> {
        CliArgs::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn help_is_a_command_not_an_error() {
        assert!(matches!(parse(&["--help"]).unwrap(), Cli::Help));
        assert!(matches!(parse(&["-h"]).unwrap(), Cli::Help));
        // Help wins even without a config path.
        assert!(matches!(parse(&["--json", "-h"]).unwrap(), Cli::Help));
    }

    #[test]
    fn flags_and_config_path_are_parsed() {
        let Cli::Run(args) = parse(&[
            "--mode",
            "islanded",
            "--solver",
            "annealing",
            "--forecast",
            "solar.json",
            "--forecast",
            "wind.json",
            "--json",
            "inputs.json",
        ])
        .unwrap() else {
            panic!("expected a run command");
        };
        assert_eq!(args.mode, Some(DispatchMode::Islanded));
        assert_eq!(args.solver, SolverKind::Annealing);
        assert_eq!(args.forecasts.len(), 2);
        assert!(args.json);
        assert_eq!(args.config, PathBuf::from("inputs.json"));
    }

    #[test]
    fn missing_config_path_is_an_error() {
        assert!(parse(&["--json"]).is_err());
        assert!(parse(&["--mode", "grid", "inputs.json"]).is_err());
    }
}
