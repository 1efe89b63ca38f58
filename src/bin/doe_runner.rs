/// CLI tool for running correlated Design of Experiments (DOE) studies
use scenario_doe::dedup::{close_pairs, FeatureTable, ScaleMode};
use scenario_doe::doe::{DoeConfig, DoeRunner};
use scenario_doe::io::{load_scenarios, save_scenarios};
use std::env;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let command = &args[1];

    match command.as_str() {
        "generate" => generate_doe_config(&args[2..]),
        "list" => list_parameters(&args[2..]),
        "sample" => sample_scenarios(&args[2..]),
        "run" => run_study(&args[2..]),
        "pairs" => print_close_pairs(&args[2..]),
        _ => {
            println!("Unknown command: {}", command);
            print_usage();
        }
    }

    #[cfg(feature = "profiling")]
    scenario_doe::PROFILER.lock().log_and_clear();
}

fn print_usage() {
    println!("\n╔══════════════════════════════════════════════════════════╗");
    println!("║  Scenario DOE Runner - Correlated Latin Hypercube Tool   ║");
    println!("╚══════════════════════════════════════════════════════════╝\n");
    println!("Usage: cargo run --release --bin doe_runner <command> [options]\n");
    println!("Commands:");
    println!("  generate    Generate a template study configuration");
    println!("  list        List parameters and correlations of a study");
    println!("  sample      Sample scenarios only");
    println!("  run         Sample, deduplicate and export a full study");
    println!("  pairs       Print close scenario pairs of a scenario file\n");
    println!("Examples:");
    println!("  # Generate a study config");
    println!("  cargo run --release --bin doe_runner generate pier_study.toml\n");
    println!("  # List parameters");
    println!("  cargo run --release --bin doe_runner list pier_study.toml\n");
    println!("  # Sample scenarios into a file (.gz compresses)");
    println!("  cargo run --release --bin doe_runner sample pier_study.toml scenarios.json\n");
    println!("  # Run the full study");
    println!("  cargo run --release --bin doe_runner run pier_study.toml doe_results/pier\n");
    println!("  # Close pairs at eps 0.15 in min-max space");
    println!("  cargo run --release --bin doe_runner pairs scenarios.json 0.15 minmax\n");
}

fn generate_doe_config(args: &[String]) {
    if args.is_empty() {
        println!("❌ Error: Please specify output file name");
        println!("Usage: cargo run --bin doe_runner generate <output_file.toml>");
        return;
    }

    let output_file = &args[0];

    println!("\n🔧 Generating DOE configuration...\n");

    let config = DoeConfig::template();

    match config.to_file(output_file) {
        Ok(_) => {
            println!("✅ DOE configuration generated: {}", output_file);
            println!("📊 Parameters: {}", config.parameters.len());
            println!("   - Correlated pairs: {}", config.correlations.len());
            println!("   - Scenarios: {}\n", config.n_scenarios);
        }
        Err(e) => {
            println!("❌ Error generating config: {}", e);
        }
    }
}

fn list_parameters(args: &[String]) {
    if args.is_empty() {
        println!("❌ Error: Please specify DOE configuration file");
        println!("Usage: cargo run --bin doe_runner list <config_file.toml>");
        return;
    }

    match DoeConfig::from_file(&args[0]) {
        Ok(config) => {
            let runner = DoeRunner::new(config, "doe_results");
            runner.list_parameters();
        }
        Err(e) => {
            println!("❌ Error loading config: {}", e);
        }
    }
}

fn default_output_dir(config: &DoeConfig) -> String {
    format!("doe_results/{}", config.study_name.replace(' ', "_"))
}

fn sample_scenarios(args: &[String]) {
    if args.is_empty() {
        println!("❌ Error: Please specify DOE configuration file");
        println!("Usage: cargo run --bin doe_runner sample <config_file.toml> [output.json]");
        return;
    }

    let config = match DoeConfig::from_file(&args[0]) {
        Ok(config) => config,
        Err(e) => {
            println!("❌ Error loading config: {}", e);
            return;
        }
    };
    let runner = DoeRunner::new(config.clone(), default_output_dir(&config));
    let output = match args.get(1) {
        Some(path) => std::path::PathBuf::from(path),
        None => runner.output_dir().join("scenarios.json"),
    };

    let result = runner.sample().and_then(|scenarios| {
        save_scenarios(&output, &scenarios)?;
        Ok(scenarios.len())
    });
    match result {
        Ok(n) => println!("✅ Wrote {} scenarios to {}\n", n, output.display()),
        Err(e) => println!("❌ Error sampling scenarios ({:?}): {}\n", e.kind(), e),
    }
}

fn run_study(args: &[String]) {
    if args.is_empty() {
        println!("❌ Error: Please specify DOE configuration file");
        println!("Usage: cargo run --bin doe_runner run <config_file.toml> [output_dir]");
        return;
    }

    match DoeConfig::from_file(&args[0]) {
        Ok(config) => {
            let output_dir = args.get(1).cloned().unwrap_or_else(|| default_output_dir(&config));
            let study_name = config.study_name.clone();
            let runner = DoeRunner::new(config, output_dir.clone());

            match runner.run_all() {
                Ok(summary) => {
                    println!("\n✅ DOE study '{}' completed successfully!", study_name);
                    println!("📊 {} scenarios, {} kept", summary.n_scenarios, summary.n_kept);
                    println!("📁 Results saved to: {}\n", output_dir);
                }
                Err(e) => println!("❌ Error running DOE ({:?}): {}\n", e.kind(), e),
            }
        }
        Err(e) => {
            println!("❌ Error loading config: {}", e);
        }
    }
}

fn print_close_pairs(args: &[String]) {
    if args.len() < 2 {
        println!("❌ Error: Please specify scenario file and eps");
        println!("Usage: cargo run --bin doe_runner pairs <scenarios.json> <eps> [zscore|minmax]");
        return;
    }

    let eps: f64 = match args[1].parse() {
        Ok(eps) => eps,
        Err(_) => {
            println!("❌ Error: eps must be a number, got '{}'", args[1]);
            return;
        }
    };
    let scale = match args.get(2).map(|s| s.parse::<ScaleMode>()).transpose() {
        Ok(scale) => scale.unwrap_or_default(),
        Err(e) => {
            println!("❌ Error: {}", e);
            return;
        }
    };

    let result = load_scenarios(&args[0]).and_then(|scenarios| {
        let table = FeatureTable::from_scenarios(&scenarios);
        close_pairs(&table, None, scale, eps).map(|pairs| (table.n_rows(), pairs))
    });
    match result {
        Ok((n_rows, pairs)) => {
            println!("\n{} scenarios, {} close pairs (eps = {}, {})\n", n_rows, pairs.len(), eps, scale);
            for (first, second) in pairs {
                println!("  scenario {} ~ scenario {}", first, second);
            }
            println!();
        }
        Err(e) => println!("❌ Error: {}\n", e),
    }
}
