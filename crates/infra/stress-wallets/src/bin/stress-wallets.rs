use std::sync::Arc;

use alloy_primitives::U256;
use clap::{Args, Parser, Subcommand};
use dotenvy::dotenv;
use eyre::{Result, WrapErr};
use serde_json::json;
use stress_wallets::{
    Faucet, NetworkConfig, RootCredential, RpcNetworkClient, StressConfig, TestProfile, TestSeed,
    WalletFunder, derive_faucet_signer, derive_pool, fund_sub_faucets,
};
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "stress-wallets")]
#[command(author, version, about = "Seeded wallet provisioning for load tests", long_about = None)]
struct Cli {
    #[arg(long, env, default_value = "info", global = true)]
    log_level: Level,

    /// Format for logs, can be json or text
    #[arg(long, env, default_value = "text", global = true)]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Derive, fund and bootstrap the worker pool of a seed
    Prepare(PrepareArgs),
    /// Fund derived sub-faucets from the root faucet
    FundFaucets(FundFaucetsArgs),
    /// Print the derived faucet and worker addresses of a seed
    Addresses(AddressesArgs),
}

#[derive(Args, Debug)]
struct PrepareArgs {
    #[command(flatten)]
    config: StressConfig,

    /// Gas limit of one load-test call
    #[arg(long, default_value_t = 21_000)]
    gas_limit: u64,

    /// Fixed auxiliary cost per worker in wei
    #[arg(long, default_value = "0")]
    tx_cost: U256,
}

#[derive(Args, Debug)]
struct FundFaucetsArgs {
    /// Seeds whose sub-faucets are funded
    #[arg(long, value_delimiter = ',', required = true)]
    seeds: Vec<TestSeed>,

    /// Wei sent to each sub-faucet
    #[arg(long)]
    amount: U256,

    /// Root faucet private key
    #[arg(long, env = "FAUCET_PRIVATE_KEY", hide_env_values = true)]
    faucet_private_key: RootCredential,

    /// Gas price in wei
    #[arg(long, env = "GAS_PRICE", default_value_t = 1_000_000_000)]
    gas_price: u128,

    #[command(flatten)]
    network: NetworkConfig,
}

#[derive(Args, Debug)]
struct AddressesArgs {
    /// Test seed
    #[arg(long)]
    seed: TestSeed,

    /// Number of worker addresses to print
    #[arg(long, default_value_t = 1)]
    n_wallets: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log_format, cli.log_level);

    match cli.command {
        Commands::Prepare(args) => prepare(args).await,
        Commands::FundFaucets(args) => fund_faucets(args).await,
        Commands::Addresses(args) => addresses(args),
    }
}

fn init_tracing(log_format: &str, log_level: Level) {
    let filter = EnvFilter::new(log_level.to_string());
    if log_format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt().json().with_env_filter(filter).with_ansi(false).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).with_ansi(false).init();
    }
}

async fn prepare(args: PrepareArgs) -> Result<()> {
    let config = args.config;
    config.validate()?;

    let client = RpcNetworkClient::connect(
        config.network.rpc_url.clone(),
        config.gas_price,
        config.network.chain_id,
    )
    .await
    .wrap_err("Failed to connect to network")?;

    let profile = TestProfile { gas_limit: args.gas_limit, tx_cost: args.tx_cost };
    let ctx = config.test_context();
    let prepared = WalletFunder::new(Arc::new(client), profile).prepare(&config, &ctx).await?;

    let output = json!({
        "test_context": ctx,
        "config": config.redacted(),
        "faucet_data": prepared.faucet_data,
        "wallets": prepared.pool.addresses(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn fund_faucets(args: FundFaucetsArgs) -> Result<()> {
    let client = RpcNetworkClient::connect(
        args.network.rpc_url.clone(),
        args.gas_price,
        args.network.chain_id,
    )
    .await
    .wrap_err("Failed to connect to network")?;

    let root = Faucet::resolve(TestSeed::ROOT, Some(&args.faucet_private_key))?;
    info!(
        root = %root.address(),
        sub_faucets = args.seeds.len(),
        amount = %args.amount,
        "Funding sub-faucets"
    );

    let funded = fund_sub_faucets(&client, &root, &args.seeds, args.amount, args.gas_price).await?;
    println!("{}", serde_json::to_string_pretty(&funded)?);
    Ok(())
}

fn addresses(args: AddressesArgs) -> Result<()> {
    let faucet = if args.seed.is_root() {
        None
    } else {
        Some(derive_faucet_signer(args.seed)?.address())
    };
    let output = json!({
        "seed": args.seed,
        "faucet": faucet,
        "wallets": derive_pool(args.seed, args.n_wallets).addresses(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
