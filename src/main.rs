use std::path::PathBuf;

use bitcoin::{
    secp256k1::{All, Secp256k1},
    Address, Network,
};
use clap::{Parser, Subcommand};
use keypath_wallet::{
    bitcoin_wallet::{
        address_formats::{derive_address_str, parse_address},
        input_data::{electrum_rpc::ElectrumRpc, esplora::EsploraClient, Broadcaster, UtxoSource},
        key_material::{EnvKeySupplier, KeyState},
        transfer::TaprootTransfer,
    },
    configuration::{Backend, WalletConfig},
    WalletError,
};
use log::debug;

#[derive(Parser)]
#[command(name = "keypath-wallet", about = "Addresses and taproot key-path spends for one private key")]
struct Cli {
    /// JSON settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true, value_enum)]
    backend: Option<Backend>,

    /// testnet, signet or regtest
    #[arg(long, global = true)]
    network: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the address of the key in the given format
    Address {
        /// legacy, segwit or taproot
        #[arg(long, default_value = "taproot")]
        format: String,
    },
    /// Send the first confirmed taproot output, minus the fee, to the destination
    Send {
        #[arg(long)]
        destination: Option<String>,

        /// Sign but print the raw transaction instead of broadcasting it
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), WalletError> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let mut config = WalletConfig::load(cli.config.as_deref())?;
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(network) = cli.network {
        config.network = network;
    }
    let network = config.network()?;
    debug!("using {:?} backend on {}", config.backend, network);

    let secp = Secp256k1::new();
    let key_state = KeyState::resolve(&secp, &EnvKeySupplier::new(&config.key_env_var)).await?;

    match cli.command {
        Command::Address { format } => {
            let address = derive_address_str(&format, key_state.key_material()?, network)?;
            println!("{}", address);
        }
        Command::Send {
            destination,
            dry_run,
        } => {
            let destination = parse_address(
                destination.as_deref().unwrap_or(&config.destination),
                network,
            )?;
            match config.backend {
                Backend::Esplora => {
                    let client = EsploraClient::new(&config.esplora_url, config.request_timeout())?;
                    send(&secp, &client, &client, &key_state, &destination, network, dry_run).await?;
                }
                Backend::Electrum => {
                    let client = ElectrumRpc::new(&config.electrum_url).await?;
                    send(&secp, &client, &client, &key_state, &destination, network, dry_run).await?;
                }
            }
        }
    }
    return Ok(());
}

async fn send<S, B>(
    secp: &Secp256k1<All>,
    source: &S,
    broadcaster: &B,
    key_state: &KeyState,
    destination: &Address,
    network: Network,
    dry_run: bool,
) -> Result<(), WalletError>
where
    S: UtxoSource,
    B: Broadcaster,
{
    let mut transfer = TaprootTransfer::new(secp, source, broadcaster, network);
    if dry_run {
        let prepared = transfer.prepare(key_state, destination).await?;
        println!(
            "spending {} from {}: fee {} sat, sending {} sat",
            prepared.utxo.outpoint(),
            prepared.source_address,
            prepared.fee,
            prepared.send_amount
        );
        println!("{}", prepared.signed.to_hex());
        return Ok(());
    }
    let receipt = transfer.run(key_state, destination).await?;
    println!("{}", receipt.receipt.response);
    return Ok(());
}
