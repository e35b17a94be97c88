//! One-shot discovery runner.
//!
//! Runs a single discovery-plus-reconciliation pass for every enabled
//! connector (or one pinned by id), bypassing the scheduler's interval
//! check, and prints a per-connector summary. Exits non-zero only when no
//! connector was processed at all or every connector errored.

use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use uuid::Uuid;

use catalogd::config::ConfigLoader;
use catalogd::db;
use catalogd::discovery::AdapterRegistry;
use catalogd::notify::LogNotifier;
use migration::{Migrator, MigratorTrait};
use catalogd::reconcile::ReconcileEngine;
use catalogd::scheduler::DiscoveryScheduler;
use catalogd::store::{CatalogStore, DbCatalogStore};
use catalogd::telemetry;

#[derive(Debug, Parser)]
#[command(name = "run_discovery", about = "Run one discovery pass for enabled connectors")]
struct Args {
    /// Run only this connector
    #[arg(long)]
    connector_id: Option<Uuid>,

    /// Override the configured database URL
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = ConfigLoader::new().load()?;
    if let Some(url) = args.database_url {
        config.database_url = url;
    }
    telemetry::init_tracing(&config);

    let db = db::init_pool(&config).await?;
    Migrator::up(&db, None).await?;

    let store = Arc::new(DbCatalogStore::new(Arc::new(db)));
    let engine = ReconcileEngine::new(store.clone());
    let registry = Arc::new(AdapterRegistry::initialize(None));
    let scheduler = DiscoveryScheduler::new(
        config.scheduler.clone(),
        store.clone(),
        registry,
        engine,
        Arc::new(LogNotifier),
    );

    let connectors = store.load_connectors().await?;
    let targets: Vec<_> = connectors
        .into_iter()
        .filter(|c| c.enabled)
        .filter(|c| args.connector_id.is_none_or(|id| c.id == id))
        .collect();

    if targets.is_empty() {
        eprintln!("No enabled connectors to process");
        std::process::exit(1);
    }

    let now = Utc::now();
    let mut processed = 0usize;
    let mut errored = 0usize;

    for connector in &targets {
        let discovery_config = connector.discovery_config();
        match scheduler
            .run_connector(connector, &discovery_config, now)
            .await
        {
            Ok(summary) => {
                processed += 1;
                println!(
                    "{} ({}): discovered {}, new {}, updated {}, removed {}, saved {}, failed {}",
                    connector.name,
                    connector.connector_type,
                    summary.discovered,
                    summary.new_assets.len(),
                    summary.updated,
                    summary.removed,
                    summary.saved,
                    summary.failed,
                );
            }
            Err(err) => {
                errored += 1;
                eprintln!("{} ({}): discovery failed: {err}", connector.name, connector.id);
            }
        }
    }

    println!("Processed {processed}/{} connectors ({errored} errored)", targets.len());
    if processed == 0 {
        std::process::exit(1);
    }
    Ok(())
}
