use std::{env, process};

use anyhow::{Context, bail};
use architecture::ExperimentConfig;
use log::info;
use machine_learning::training::Classifier;

const USAGE: &str = "Usage: facerec summary <config.json>\n       facerec init <config.json> <checkpoint_dir> [seed]";

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    if let Err(e) = run(&args) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(args: &[String]) -> anyhow::Result<()> {
    match args {
        [mode, config] if mode == "summary" => {
            let config = load(config)?;
            let graph = config.architecture.build(&config.model)?;
            println!("{}", graph.summary()?);
        }
        [mode, config, dir, rest @ ..] if mode == "init" && rest.len() <= 1 => {
            let seed = match rest.first() {
                Some(seed) => seed.parse().with_context(|| format!("invalid seed {seed:?}"))?,
                None => 0,
            };

            let config = load(config)?;
            let graph = config.architecture.build(&config.model)?;
            let classifier = Classifier::new(config.model, graph, seed)?;
            classifier.save(dir)?;

            info!(params = classifier.params().len(); "initialized checkpoint at {dir}");
        }
        _ => bail!("{USAGE}"),
    }

    Ok(())
}

fn load(path: &str) -> anyhow::Result<ExperimentConfig> {
    ExperimentConfig::load(path).with_context(|| format!("failed to load {path}"))
}
