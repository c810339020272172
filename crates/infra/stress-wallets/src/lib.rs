#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod account;
pub use account::{Account, AccountRole, WalletPool};

mod config;
pub use config::{NetworkConfig, StressConfig, TestProfile};

mod context;
pub use context::{TestContext, TestSeed};

mod derive;
pub use derive::{
    FaucetSource, RootCredential, derive_faucet_signer, derive_pool, derive_worker_signer,
};

mod engine;
pub use engine::{
    EngineError, EngineRun, LoadEngine, RunOptions, StressTestOutput, WalletPoolDescriptor,
    run_stress_test,
};

mod error;
pub use error::{FundingError, PrepareError, StressTestError};

mod faucet;
pub use faucet::{Faucet, FaucetData, SubFaucetFunding, disbursement_cost, fund_sub_faucets};

mod funding;
pub use funding::{FUNDING_MARGIN, FundingParams, n_wallets};

mod init;
pub use init::{FundWallet, InitHotNonce, WorkerInit, standard_initializers};

mod network;
pub use network::{NetworkClient, NetworkError, TRANSFER_GAS};

mod nonce;
pub use nonce::init_hot_nonce;

mod orchestrator;
pub use orchestrator::{PrepareState, PreparedPool, WalletFunder};

mod rpc;
pub use rpc::RpcNetworkClient;
