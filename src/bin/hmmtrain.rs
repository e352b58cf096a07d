use hmmtrain::prelude::*;
use std::env;

const PROGRAM: &str = "hmmtrain";

fn die(message: &str) -> ! {
    eprintln!("\n{PROGRAM} ERROR! {message}\n");
    eprintln!("Usage: {PROGRAM} <model-file> [iterations] [seed] [-v]");
    std::process::exit(1);
}

fn main() {
    let mut verbose = false;
    let mut positional = Vec::new();
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "-v" | "--verbose" => verbose = true,
            _ => positional.push(arg),
        }
    }

    let mut config = DriverConfig::default();
    let model_file = match positional.as_slice() {
        [model_file, rest @ ..] if rest.len() <= 2 => {
            if let Some(iterations) = rest.first() {
                let Ok(iterations) = iterations.parse() else {
                    die(&format!("'{iterations}' is not a number of iterations"));
                };
                config = config.with_iterations(iterations);
            }
            if let Some(seed) = rest.get(1) {
                let Ok(seed) = seed.parse() else {
                    die(&format!("'{seed}' is not a valid seed"));
                };
                config = config.with_seed(seed);
            }
            model_file.clone()
        }
        _ => die("Expected a model file and at most an iteration count and a seed"),
    };

    tracing_subscriber::fmt()
        .with_max_level(if verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    let mut driver = TrainingDriver::from_file(
        &model_file,
        |model| DenseBackend::new(model, config.seed),
        BaumWelchUpdater,
        config,
    )
    .unwrap_or_die(&format!("Could not initialise a training run from '{model_file}'"));

    let report = driver.run().unwrap_or_die("The training run failed");

    for record in driver.history() {
        println!("iteration {:>3}  log-likelihood {:.6}", record.iteration, record.log_likelihood);
    }
    if let Some(last) = driver.history().last() {
        for (name, value) in &last.parameters {
            println!("{name:<16} {value:.6}");
        }
    }
    println!("{report}");
}
