//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands};
use crate::config::{load_config, PollerConfig};
use crate::coordinator::WorkerCoordinator;
use crate::error::Result;
use crate::metrics::CursorMetrics;
use crate::persist::{CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
use crate::publish::StdoutPublisher;
use crate::source::StoreSource;
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Run { once } => self.run_poller(*once).await,
            Commands::Validate => self.validate(),
            Commands::State => self.state().await,
        }
    }

    /// Load and validate the configuration file
    fn load_config(&self) -> Result<PollerConfig> {
        load_config(&self.cli.config)
    }

    /// Poll the configured source
    async fn run_poller(&self, once: bool) -> Result<()> {
        let mut config = self.load_config()?;
        if once {
            config.poll = false;
        }

        let source = Arc::new(Self::build_source(&config)?);
        let store = Self::build_store(&config);
        let metrics = Arc::new(CursorMetrics::new());

        let coordinator = WorkerCoordinator::start(
            &config,
            source,
            Arc::new(StdoutPublisher::stdout()),
            store,
            metrics.clone(),
        )
        .await?;

        let cancel = CancellationToken::new();
        let shutdown = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received, shutting down");
                shutdown.cancel();
            }
        });

        let result = coordinator.run(cancel).await;

        let snapshot = coordinator.state().snapshot();
        info!(
            object = %snapshot.watermark_name,
            time = %snapshot.watermark_time,
            metrics = ?metrics.snapshot(),
            "Poller stopped"
        );

        result
    }

    /// Validate the configuration file
    fn validate(&self) -> Result<()> {
        let config = self.load_config()?;

        Self::output_message(&json!({
            "type": "LOG",
            "log": {
                "level": "INFO",
                "message": format!(
                    "Configuration '{}' is valid for {}",
                    config.id,
                    config.url
                )
            }
        }));

        Ok(())
    }

    /// Print the stored checkpoint
    async fn state(&self) -> Result<()> {
        let config = self.load_config()?;
        let key = config.source_key();
        let checkpoint = Self::build_store(&config).get(&key).await?;

        Self::output_message(&json!({
            "type": "STATE",
            "key": key,
            "state": checkpoint,
        }));

        Ok(())
    }

    /// Build the object source, throttled if configured
    fn build_source(config: &PollerConfig) -> Result<StoreSource> {
        let source = StoreSource::parse(&config.url)?;

        Ok(match &config.rate_limit {
            Some(rate_limit) => {
                let limiter = rate_limit.limiter()?;
                info!(
                    requests_per_second = limiter.per_second(),
                    burst_size = limiter.burst(),
                    "Throttling downloads"
                );
                source.with_rate_limiter(limiter)
            }
            None => source,
        })
    }

    /// Build the checkpoint store
    fn build_store(config: &PollerConfig) -> Arc<dyn CheckpointStore> {
        match &config.state_dir {
            Some(dir) => Arc::new(FileCheckpointStore::new(dir)),
            None => {
                warn!("No state_dir configured, checkpoints will not survive a restart");
                Arc::new(MemoryCheckpointStore::new())
            }
        }
    }

    /// Output a message
    fn output_message(msg: &serde_json::Value) {
        println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
    }
}
