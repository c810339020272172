//! Load-generation engine interface.
//!
//! The engine schedules calls, collects metrics and produces reports; none of
//! that lives here. This module hands it a ready pool and packages its output.

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::Serialize;
use tracing::{Instrument, info};

use crate::{
    account::WalletPool,
    config::{StressConfig, TestProfile},
    context::TestContext,
    error::{PrepareError, StressTestError},
    faucet::FaucetData,
    init::WorkerInit,
    network::NetworkClient,
    orchestrator::{PrepareState, WalletFunder},
};

/// Boxed engine error.
pub type EngineError = Box<dyn std::error::Error + Send + Sync>;

/// Identifies the worker pool for the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletPoolDescriptor {
    /// Number of workers.
    pub n_wallets: usize,
    /// Seed of the pool in lowercase hex.
    pub wallet_gen_seed: String,
}

/// Scheduling options forwarded to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunOptions {
    /// Total calls to issue.
    pub n_calls: u64,
    /// Issue calls from different workers concurrently.
    #[serde(rename = "async")]
    pub async_calls: bool,
    /// Delay between serial calls.
    pub call_delay_ms: u64,
    /// Delay between rounds.
    pub round_delay_ms: u64,
}

impl RunOptions {
    /// Delay between serial calls.
    pub const fn call_delay(&self) -> Duration {
        Duration::from_millis(self.call_delay_ms)
    }
}

impl From<&StressConfig> for RunOptions {
    fn from(config: &StressConfig) -> Self {
        Self {
            n_calls: config.n_calls,
            async_calls: config.async_calls,
            call_delay_ms: config.call_delay_ms,
            round_delay_ms: 0,
        }
    }
}

/// Everything the engine receives for one run.
///
/// Workers in `pool` are funded and hold hot nonces. Calls from one worker
/// must take their nonces from [`Account::next_nonce`](crate::Account::next_nonce);
/// distinct workers may send concurrently.
pub struct EngineRun<'a> {
    /// Shared network client.
    pub client: Arc<dyn NetworkClient>,
    /// Ready worker pool.
    pub pool: Arc<WalletPool>,
    /// Per-worker initializers the engine may re-run before using a worker.
    pub initializers: &'a [Arc<dyn WorkerInit>],
    /// Pool descriptor.
    pub descriptor: WalletPoolDescriptor,
    /// Scheduling options.
    pub options: RunOptions,
    /// Read-only run context.
    pub ctx: &'a TestContext,
}

impl fmt::Debug for EngineRun<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineRun")
            .field("descriptor", &self.descriptor)
            .field("options", &self.options)
            .field("initializers", &self.initializers.len())
            .finish_non_exhaustive()
    }
}

/// A load-generation engine driving calls from a prepared pool.
#[async_trait]
pub trait LoadEngine: Send + Sync {
    /// One report produced by the engine's report sinks.
    type Report: Send;

    /// Runs before the faucet is resolved, e.g. to deploy contracts the calls use.
    async fn setup(
        &self,
        _client: &dyn NetworkClient,
        _ctx: &TestContext,
    ) -> Result<(), EngineError> {
        Ok(())
    }

    /// Generates the load and returns the reports.
    async fn run(&self, run: EngineRun<'_>) -> Result<Vec<Self::Report>, EngineError>;
}

/// Output of a complete run.
#[derive(Debug, Serialize)]
pub struct StressTestOutput<R> {
    /// Reports produced by the engine.
    pub report_outputs: Vec<R>,
    /// Context the run used.
    pub test_context: TestContext,
    /// Configuration with the faucet credential removed.
    pub config: StressConfig,
    /// How the pool was funded.
    pub faucet_data: FaucetData,
}

/// Runs a complete stress test: engine setup, wallet preparation, load.
///
/// The configuration is validated before the engine's setup hook touches the
/// network. No load is generated unless preparation reaches the ready state.
pub async fn run_stress_test<E>(
    engine: &E,
    client: Arc<dyn NetworkClient>,
    config: &StressConfig,
    profile: TestProfile,
) -> Result<StressTestOutput<E::Report>, StressTestError>
where
    E: LoadEngine + ?Sized,
{
    config.validate().map_err(|e| PrepareError::at(PrepareState::Init, e))?;
    let ctx = config.test_context();

    engine
        .setup(client.as_ref(), &ctx)
        .instrument(ctx.span.clone())
        .await
        .map_err(StressTestError::Engine)?;

    let prepared = WalletFunder::new(Arc::clone(&client), profile).prepare(config, &ctx).await?;

    let descriptor = WalletPoolDescriptor {
        n_wallets: prepared.faucet_data.n_wallets,
        wallet_gen_seed: ctx.seed.to_hex(),
    };
    let run = EngineRun {
        client,
        pool: Arc::clone(&prepared.pool),
        initializers: &prepared.initializers,
        descriptor,
        options: RunOptions::from(config),
        ctx: &ctx,
    };

    let span = ctx.span.clone();
    let report_outputs = engine.run(run).instrument(span).await.map_err(StressTestError::Engine)?;
    info!(parent: &ctx.span, reports = report_outputs.len(), "Stress test finished");

    Ok(StressTestOutput {
        report_outputs,
        test_context: ctx,
        config: config.redacted(),
        faucet_data: prepared.faucet_data,
    })
}
