use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use subclad::error::{Result, SubgroupError};
use subclad::interface::SearchInterface;
use subclad::search::SearchOutcome;
use subclad::settings::Settings;
use subclad::{loader, server};

fn print_outcome(outcome: &SearchOutcome) {
    println!(
        "Population correlation {:.6} over {} records, baseline {}",
        outcome.population.correlation.unwrap_or(f64::NAN),
        outcome.population.count,
        outcome.baseline
    );
    println!("{:>9} {:>12} {:>9} {:>7}   Conditions", "Score", "Correlation", "Baseline", "Size");
    for s in &outcome.results {
        println!("{:>9.6} {:>12.6} {:>9.6} {:>7}   {}", s.score, s.correlation, s.baseline, s.count, s.description);
    }
    if !outcome.within.is_empty() {
        println!();
        println!("{:>9} {:>12} {:>7}   Conditions   (within)", "Within", "Correlation", "Size");
        for s in &outcome.within {
            let (score, reference) = s.within.as_ref().map_or((0.0, ""), |w| (w.score, w.reference.as_str()));
            println!("{:>9.6} {:>12.6} {:>7}   {}   {}", score, s.correlation, s.count, s.description, reference);
        }
    }
}

fn run() -> Result<()> {
    let path = std::env::args().nth(1);
    let settings = Settings::load(path.as_deref())?;
    let dataset = settings
        .dataset
        .as_deref()
        .ok_or_else(|| SubgroupError::Settings("no dataset configured".into()))?;
    let records = Arc::new(loader::load(dataset, settings.delimiter()?)?);
    let interface = Arc::new(SearchInterface::new(records));

    if settings.server.enabled {
        let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
        return runtime.block_on(server::serve(&settings.server.bind, interface));
    }

    let outcome = interface.run_sync(settings.search)?;
    info!(ms = outcome.elapsed_ms, evaluated = outcome.evaluated(), retained = outcome.retained(), "done");
    print_outcome(&outcome);
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "subclad failed");
            ExitCode::FAILURE
        }
    }
}
