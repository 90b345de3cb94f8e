use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use mint_chain::{ContractArtifact, JsonRpcWallet, RpcSettings, WalletProvider, format_display};
use mint_core::{MintConfig, logging};
use mint_session::{
    AccountDataStore, MintPhase, MintWorkflow, SessionSettings, WalletSession, WorkflowSettings,
};
use tracing::{error, info};

const VERSION: &str = env!("CARGO_PKG_VERSION");

const USAGE: &str = "usage: mintpad [status|mint|watch]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Status,
    Mint,
    Watch,
}

fn parse_command(mut args: impl Iterator<Item = String>) -> Result<Command> {
    let command = match args.next().as_deref() {
        None | Some("status") => Command::Status,
        Some("mint") => Command::Mint,
        Some("watch") => Command::Watch,
        Some(other) => anyhow::bail!("unknown command {other:?}\n{USAGE}"),
    };
    if let Some(extra) = args.next() {
        anyhow::bail!("unexpected argument {extra:?}\n{USAGE}");
    }
    Ok(command)
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<ExitCode> {
    let command = parse_command(std::env::args().skip(1))?;

    MintConfig::ensure_dirs()?;
    let config = MintConfig::load()?;
    let _log_guard = logging::init_logging(&config)?;
    info!("Starting mintpad v{VERSION}");
    config.validate()?;

    let provider: Option<Arc<dyn WalletProvider>> = match RpcSettings::from_config(&config)? {
        Some(settings) => Some(Arc::new(JsonRpcWallet::new(
            settings,
            config.price_method.clone(),
        )?)),
        None => None,
    };
    let artifact_path = config.artifact_path()?;
    let artifact = ContractArtifact::load_from_file(&artifact_path)
        .with_context(|| format!("no usable contract artifact at {}", artifact_path.display()))?;
    artifact.ensure_mint_interface(&config.price_method)?;

    let store = Arc::new(AccountDataStore::new());
    let mut session = WalletSession::new(
        provider,
        artifact,
        SessionSettings::from_config(&config),
        store.clone(),
    );
    let mut workflow = MintWorkflow::new(WorkflowSettings::from_config(&config), store.clone())?;

    if !connect(&mut session, &mut workflow).await {
        return Ok(ExitCode::FAILURE);
    }
    print_summary(&session, &workflow, &store);

    match command {
        Command::Status => {}
        Command::Mint => {
            let attempt = workflow.mint(&session).await?;
            println!("{}", attempt.message.as_deref().unwrap_or_default());
            if attempt.phase != MintPhase::Success {
                return Ok(ExitCode::FAILURE);
            }
            print_summary(&session, &workflow, &store);
        }
        Command::Watch => loop {
            match session.next_event().await {
                Some(event) => info!(?event, "wallet event applied"),
                None => info!("wallet subscription ended"),
            }
            if !session.state().is_connected() {
                println!("Wallet session reset, reconnecting");
                if !connect(&mut session, &mut workflow).await {
                    return Ok(ExitCode::FAILURE);
                }
            }
            print_summary(&session, &workflow, &store);
        },
    }
    Ok(ExitCode::SUCCESS)
}

/// Connect and run the connection-change effect. Prints the failure reason.
async fn connect(session: &mut WalletSession, workflow: &mut MintWorkflow) -> bool {
    if let Some(message) = session.connect().await.error_message() {
        println!("{message}");
        workflow.on_connection_change(session).await;
        return false;
    }
    workflow.on_connection_change(session).await;
    true
}

fn print_summary(session: &WalletSession, workflow: &MintWorkflow, store: &AccountDataStore) {
    let account = session
        .account()
        .map(|a| a.to_string())
        .unwrap_or_else(|| "-".into());
    println!("Wallet address: {account}");

    let derived = workflow.derived();
    let data = store.snapshot();
    let price = derived.price.or(data.price);
    let supply = derived.max_supply.or(data.max_supply);
    println!(
        "Price: {}",
        price.map(format_display).unwrap_or_else(|| "-".into())
    );
    println!(
        "Max supply: {}",
        supply.map(|s| s.to_string()).unwrap_or_else(|| "-".into())
    );
    if let Some(status) = workflow.status() {
        println!("{status}");
    }
}
