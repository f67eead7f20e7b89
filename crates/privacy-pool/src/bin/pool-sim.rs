//! Privacy Pool Simulator
//!
//! Runs the full pool lifecycle against in-memory collaborators:
//! asp registration and approval, deposits, association sets, a compliant
//! withdrawal, a replay attempt and a ragequit.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin pool-sim -- --deposits 8 --seed 42
//! cargo run --bin pool-sim -- --config pool.example.yaml --log-level debug
//! ```

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use pool_elgamal::KeyPair;
use privacy_pool::{
    AccountId, ExclusionCheck, ManualClock, MemoryLedger, Note, PoolConfig, PoolError,
    PrivacyPool, SetMembership, SetType, StaticVerifier, TokenLedger, WithdrawalRequest,
};
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

const OWNER: AccountId = [0x01; 32];
const AUDITORS: [AccountId; 3] = [[0xa1; 32], [0xa2; 32], [0xa3; 32]];
const ASP_OWNER: AccountId = [0x0a; 32];
const DEPOSITOR: AccountId = [0xd0; 32];
const RECIPIENT: AccountId = [0xfe; 32];
const POOL: AccountId = [0xee; 32];

#[derive(Parser, Debug)]
#[command(name = "pool-sim")]
#[command(about = "Simulate a compliance-compatible privacy pool", long_about = None)]
struct Cli {
    /// YAML pool config; defaults when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of deposits (first one single, rest batched)
    #[arg(long, default_value = "4")]
    deposits: usize,

    /// Amount per deposit
    #[arg(long, default_value = "1000")]
    amount: u128,

    /// Seed for the deterministic rng
    #[arg(long, default_value = "7")]
    seed: u64,

    /// Start time, unix seconds
    #[arg(long, default_value = "1700000000")]
    start: u64,

    /// Log level (error, warn, info, debug, trace); RUST_LOG overrides
    #[arg(long, default_value = "info")]
    log_level: Level,
}

fn load_config(path: Option<&PathBuf>) -> Result<PoolConfig> {
    match path {
        Some(path) => {
            let yaml = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            Ok(PoolConfig::from_yaml(&yaml)?)
        }
        None => Ok(PoolConfig::default()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    if cli.deposits < 2 {
        bail!("need at least 2 deposits (one withdrawn, one ragequit)");
    }

    let config = load_config(cli.config.as_ref())?;
    info!(
        threshold = config.approval_threshold,
        delay = config.ragequit_delay,
        history = config.root_history_size,
        "loaded pool config"
    );

    let mut rng = ChaCha20Rng::seed_from_u64(cli.seed);
    let clock = ManualClock::new(cli.start);

    let total = cli
        .amount
        .checked_mul(cli.deposits as u128)
        .context("deposit total overflows")?;
    let mut ledger = MemoryLedger::new(POOL);
    ledger.mint(config.stake_asset, &ASP_OWNER, config.min_asp_stake);
    ledger.mint(0, &DEPOSITOR, total);

    let mut pool = PrivacyPool::new(config, ledger, StaticVerifier::accepting(), clock.clone())?;
    pool.initialize(OWNER, &AUDITORS, POOL)?;

    // governance
    let asp_key = KeyPair::random(&mut rng).public_key().compress();
    let stake = pool.config().min_asp_stake;
    let asp_id = pool.register_asp(&ASP_OWNER, asp_key, [0x42; 32], stake)?;
    for auditor in AUDITORS.iter().take(pool.config().approval_threshold as usize) {
        let status = pool.approve_asp(auditor, asp_id)?;
        info!(asp_id, ?status, "auditor voted");
    }

    // deposits
    let notes: Vec<Note> = (0..cli.deposits)
        .map(|_| Note::random(&mut rng, cli.amount, 0))
        .collect();
    let receipt = pool.deposit(&DEPOSITOR, &notes[0].deposit_request())?;
    info!(index = receipt.index, root = %hex::encode(receipt.root), "single deposit");

    let mut batch_root = receipt.root;
    for chunk in notes[1..].chunks(pool.config().max_batch_size) {
        let requests: Vec<_> = chunk.iter().map(Note::deposit_request).collect();
        let result = pool.batch_deposit(&DEPOSITOR, &requests)?;
        batch_root = result.root;
        info!(
            start_index = result.start_index,
            size = result.size,
            depth = result.depth,
            "batch deposit"
        );
    }

    // certify the first deposit, flag the last one
    let inclusion = pool.create_association_set(
        &ASP_OWNER,
        SetType::Inclusion,
        &[notes[0].commitment()],
    )?;
    let exclusion = pool.create_association_set(
        &ASP_OWNER,
        SetType::Exclusion,
        &[notes[notes.len() - 1].commitment()],
    )?;

    // compliant withdrawal
    let request = WithdrawalRequest {
        nullifier: notes[0].nullifier(),
        recipient: RECIPIENT,
        asset_id: 0,
        amount: cli.amount,
        deposit_proof: pool.generate_deposit_proof(&notes[0].commitment())?,
        inclusion: SetMembership {
            set_id: inclusion,
            proof: pool.generate_membership_proof(inclusion, &notes[0].commitment())?,
        },
        exclusion: Some(ExclusionCheck {
            set_id: exclusion,
            root: pool
                .association_set(exclusion)
                .map(|set| set.root())
                .context("exclusion set missing")?,
        }),
        proof: Vec::new(),
    };
    pool.withdraw(&DEPOSITOR, &request)?;

    match pool.withdraw(&DEPOSITOR, &request) {
        Err(PoolError::AlreadySpent) => info!("replayed withdrawal rejected"),
        other => bail!("replay was not rejected: {:?}", other),
    }

    // uncertified deposit exits through ragequit
    let quitter = &notes[1];
    let request_id = pool.request_ragequit(&DEPOSITOR, &quitter.ragequit_claim(), DEPOSITOR)?;
    clock.advance(1_000);
    if let Err(e) = pool.execute_ragequit(&DEPOSITOR, request_id) {
        warn!(error = %e, "early ragequit refused");
    }
    clock.advance(pool.config().ragequit_delay);
    pool.execute_ragequit(&DEPOSITOR, request_id)?;

    for event in pool.drain_events() {
        info!(?event, "event");
    }

    let state = pool.deposit_state();
    info!(
        root = %hex::encode(state.root),
        last_batch_root = %hex::encode(batch_root),
        size = state.size,
        depth = state.depth,
        liquidity = pool.liquidity(0),
        recipient_balance = pool.ledger().balance_of(0, &RECIPIENT),
        depositor_balance = pool.ledger().balance_of(0, &DEPOSITOR),
        quitter_spent = pool.is_spent(&quitter.nullifier()),
        "simulation complete"
    );
    Ok(())
}
