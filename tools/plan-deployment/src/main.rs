mod scenario;

use std::error::Error;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use env_logger::Builder;
use log::info;
use rand::SeedableRng;
use rand_pcg::Pcg64;

use nimbus_placement::deployer::Deployer;
use nimbus_placement::request::DeploymentRequest;

use crate::scenario::Scenario;

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
/// Generates deployment plan for the application request described in a scenario
struct Args {
    /// Path to YAML file with scenario
    #[arg(short, long)]
    scenario: PathBuf,

    /// Path to produced JSON file with deployment (default - print to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Random seed (default - random)
    #[arg(long)]
    seed: Option<u64>,
}

fn init_logger() {
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .init();
}

fn main() -> Result<(), Box<dyn Error>> {
    init_logger();
    let args = Args::parse();

    let scenario = Scenario::from_file(&args.scenario)?;
    let (application, status) = scenario.application();
    let deployer = Deployer::new(Arc::new(scenario.topology_provider()?), Arc::new(status));
    deployer.bind_application(&application)?;

    let request = DeploymentRequest::builder()
        .with_application(&application)
        .with_requests(scenario.request.iter().map(|(template, count)| (template.as_str(), *count)))
        .build()?;
    let deployment = match args.seed {
        Some(seed) => deployer.generate_deployment_with_rng(&request, &mut Pcg64::seed_from_u64(seed))?,
        None => deployer.generate_deployment(&request)?,
    };
    info!(
        "Planned {} machines of application {} with policy {}",
        deployment.specs().len(),
        application.name(),
        application.policy()
    );

    let json = serde_json::to_string_pretty(&deployment)?;
    match args.output {
        Some(path) => std::fs::write(path, json)?,
        None => println!("{}", json),
    }
    Ok(())
}
