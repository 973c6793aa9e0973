//! u-cgp CLI: evolve a circuit for a target specification file.

use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use u_cgp::bdd::BddManager;
use u_cgp::cgp::{CgpConfig, CgpResult, CgpRunner, MutationStrategy, Outcome, SelectionStrategy};
use u_cgp::io::{seed::load_seed, SpecFile};
use u_cgp::random::create_rng;
use u_cgp::CgpError;

const USAGE: &str =
    "<rng-seed> <spec-file> <budget> <population> <pm|sam|gam|sg> [so|nsga2|aps] [seed-file]";

/// Parses a non-negative integer argument into its target width.
fn number<T: FromStr>(arg: &str, name: &str) -> Result<T, String> {
    arg.parse()
        .map_err(|_| format!("{name} must be a non-negative integer, got `{arg}`"))
}

/// Parsed command line.
struct Args {
    rng_seed: u64,
    spec: PathBuf,
    budget: u64,
    population: usize,
    mutation: MutationStrategy,
    selection: Option<SelectionStrategy>,
    seed_file: Option<PathBuf>,
}

impl Args {
    fn parse(args: &[String]) -> Result<Self, String> {
        if !(6..=8).contains(&args.len()) {
            return Err(format!("expected 5 to 7 arguments, got {}", args.len().saturating_sub(1)));
        }
        let selection = match args.get(6).map(String::as_str) {
            None | Some("so") => None,
            Some(name) => Some(name.parse().map_err(|e: u_cgp::cgp::ConfigError| e.to_string())?),
        };
        Ok(Self {
            rng_seed: number(&args[1], "rng-seed")?,
            spec: PathBuf::from(&args[2]),
            budget: number(&args[3], "budget")?,
            population: number(&args[4], "population")?,
            mutation: args[5].parse().map_err(|e: u_cgp::cgp::ConfigError| e.to_string())?,
            selection,
            seed_file: args.get(7).map(PathBuf::from),
        })
    }

    fn config(&self) -> CgpConfig {
        let config = CgpConfig::default()
            .with_seed(self.rng_seed)
            .with_evaluation_budget(self.budget)
            .with_population_size(self.population)
            .with_mutation(self.mutation);
        match self.selection {
            Some(selection) => config.with_multi_objective(selection),
            None => config,
        }
    }
}

fn run(args: &Args) -> Result<CgpResult, CgpError> {
    let config = args.config();
    config.validate()?;

    let spec = SpecFile::load(&args.spec)?;
    let mut engine = BddManager::new(spec.num_inputs, config.engine_capacity);
    let mut target = spec.build(&mut engine);

    let seed = match &args.seed_file {
        Some(path) => {
            let layout = config.layout_for(spec.num_inputs, spec.num_outputs, spec.gate_hint)?;
            let mut rng = create_rng(args.rng_seed);
            Some(load_seed(path, layout, &mut rng)?)
        }
        None => None,
    };

    CgpRunner::run(&mut engine, &mut target, &config, seed)
}

fn print_summary(result: &CgpResult) {
    let f = result.best.fitness();
    match result.outcome {
        Outcome::Feasible => println!("Feasible circuit found"),
        Outcome::Infeasible => println!("No feasible circuit within budget"),
    }
    println!("  Evaluations used:  {}", result.evaluations_used);
    println!(
        "  Generations:       {} feasibility, {} optimization",
        result.feasibility_generations, result.optimization_generations
    );
    println!("  Error:             {}", f.error);
    println!("  Transistors:       {}", f.transistors);
    println!("  Active gates:      {}", result.best.active_gate_count());
    if !result.pareto_front.is_empty() {
        println!("  Delay:             {:.3}", f.delay);
        println!("  Power:             {:.4}", f.power);
        println!("  Pareto front:      {} circuits", result.pareto_front.len());
        for (i, g) in result.pareto_front.iter().enumerate() {
            let pf = g.fitness();
            println!(
                "    [{i}] error {} delay {:.3} power {:.4} transistors {}",
                pf.error, pf.delay, pf.power, pf.transistors
            );
        }
    }
    println!();
    println!("{}", result.best);
}

fn main() -> ExitCode {
    env_logger::init();

    let argv: Vec<String> = std::env::args().collect();
    let program = argv.first().map(String::as_str).unwrap_or("u-cgp");
    let args = match Args::parse(&argv) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("Error: {message}");
            eprintln!("Usage: {program} {USAGE}");
            return ExitCode::FAILURE;
        }
    };

    match run(&args) {
        Ok(result) => {
            print_summary(&result);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
