//! Belief propagation on a small network.
//!
//! Without `--spec-dir` the rain -> sprinkler -> wet chain is used, otherwise the
//! network is read from a folder with `graph.txt` and `interactions/*.txt`.
//!
//! ```text
//! cargo run --example chain -- --evidence wet=0,1 --dot chain.dot
//! RUST_LOG=debug cargo run --example chain -- --config bp.yaml
//! ```

use std::{fs, fs::File, path::PathBuf};

use bnrs::core::{BayesNet, BayesNetBuilder, PropagationConfig};
use bnrs::io::{load_manual_spec, write_dot, write_json, DotOptions, Summary};
use clap::Parser;

#[derive(Parser)]
#[command(name = "chain")]
#[command(about = "Runs belief propagation and prints beliefs of every node", long_about = None)]
struct Cli {
    /// YAML file with propagation hyper-parameters
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Folder with graph.txt and interactions/<node>.txt
    #[arg(short, long)]
    spec_dir: Option<PathBuf>,

    /// Observed distribution of a node, e.g. wet=0,1
    #[arg(short, long)]
    evidence: Vec<String>,

    /// Print CPTs in the summary
    #[arg(long)]
    show_cpt: bool,

    /// Write the network in the Graphviz dot language
    #[arg(long)]
    dot: Option<PathBuf>,

    /// Write the network as JSON
    #[arg(long)]
    json: Option<PathBuf>,
}

fn rain_chain() -> Result<BayesNet, Box<dyn std::error::Error>> {
    let mut bnb = BayesNetBuilder::new();
    for name in ["rain", "sprinkler", "wet"] {
        bnb.add_node(name, 2)?;
    }
    bnb.add_prior("rain", vec![0.5, 0.5])?;
    bnb.add_cpt(
        "sprinkler",
        &["rain"],
        vec![(vec![0], vec![0.9, 0.1]), (vec![1], vec![0.2, 0.8])],
    )?;
    bnb.add_cpt(
        "wet",
        &["sprinkler"],
        vec![(vec![0], vec![0.7, 0.3]), (vec![1], vec![0.1, 0.9])],
    )?;
    Ok(bnb.build())
}

fn parse_evidence(text: &str) -> Result<(String, Vec<f64>), Box<dyn std::error::Error>> {
    let (name, values) = text
        .split_once('=')
        .ok_or_else(|| format!("evidence '{text}' is not of the form name=p0,p1,..."))?;
    let values = values
        .split(',')
        .map(|x| x.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()?;
    Ok((name.trim().to_owned(), values))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config: PropagationConfig = match &cli.config {
        Some(path) => serde_yaml::from_str(&fs::read_to_string(path)?)?,
        None => PropagationConfig::default(),
    };
    let mut net = match &cli.spec_dir {
        Some(dir) => load_manual_spec(dir)?,
        None => rain_chain()?,
    };
    for text in &cli.evidence {
        let (name, values) = parse_evidence(text)?;
        net.set_evidence(&name, &values)?;
    }

    let info = net.run(&config)?;
    println!("{}", info);
    if info.degenerate_normalizations > 0 {
        println!(
            "{} degenerate distributions replaced by uniform ones",
            info.degenerate_normalizations
        );
    }
    print!("{}", Summary::new(&net).with_cpt(cli.show_cpt));

    if let Some(path) = &cli.dot {
        write_dot(&net, &DotOptions::default(), File::create(path)?)?;
    }
    if let Some(path) = &cli.json {
        write_json(&net, File::create(path)?)?;
    }
    Ok(())
}
