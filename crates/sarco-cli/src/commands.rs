//! CLI command implementations

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;

use sarco_core::{keccak256, Address, ResourceId};
use sarco_protocol::{ProtocolConfig, ProtocolState, Sarcophagus, SnapshotStorage};

use crate::render;

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "SARCO_DATA_DIR";

/// Sarco - Sarcophagus protocol snapshot inspector
#[derive(Parser)]
#[command(name = "sarco")]
#[command(about = "Inspect Sarcophagus escrow protocol snapshots")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Snapshot directory (defaults to $SARCO_DATA_DIR, then the local data dir)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write an empty snapshot
    Init {
        /// JSON protocol configuration (defaults are used when omitted)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Admin address (0x-prefixed hex), overriding the configuration
        #[arg(long)]
        admin: Option<String>,

        /// Custody account address (0x-prefixed hex)
        #[arg(long)]
        custody: Option<String>,

        /// Overwrite an existing snapshot
        #[arg(long)]
        force: bool,
    },

    /// Show protocol status
    Status,

    /// Show one resource and its bonded custodians
    Resource {
        /// Resource id (hex)
        id: String,
    },

    /// Show one custodian profile
    Custodian {
        /// Custodian address (hex)
        address: String,
    },

    /// List resources
    List {
        /// Only resources created by this embalmer
        #[arg(long)]
        embalmer: Option<String>,

        /// Only resources addressed to this recipient
        #[arg(long)]
        recipient: Option<String>,

        /// Only resources this custodian is bonded to
        #[arg(long)]
        custodian: Option<String>,
    },

    /// Show recent events
    Events {
        /// Number of events to show
        #[arg(long, default_value = "20")]
        limit: usize,

        /// Only events about this resource
        #[arg(long)]
        resource: Option<String>,
    },
}

/// Default custody account used by `init`
pub fn default_custody() -> Address {
    let hash = keccak256(b"sarcophagus.custody");
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash[12..]);
    Address::new(bytes)
}

/// `--data-dir`, then `$SARCO_DATA_DIR`, then `<local data dir>/sarcophagus`
pub fn resolve_data_dir(flag: Option<PathBuf>, env: Option<String>) -> PathBuf {
    flag.or_else(|| env.filter(|v| !v.is_empty()).map(PathBuf::from))
        .or_else(|| dirs::data_local_dir().map(|d| d.join("sarcophagus")))
        .unwrap_or_else(|| PathBuf::from("./sarcophagus_data"))
}

fn load_state(storage: &SnapshotStorage) -> anyhow::Result<ProtocolState> {
    storage.load_state()?.with_context(|| {
        format!(
            "no snapshot in {:?}; run 'sarco init' first",
            storage.base_path()
        )
    })
}

fn parse_address(s: &str) -> anyhow::Result<Address> {
    Address::from_hex(s).with_context(|| format!("invalid address: {}", s))
}

fn parse_resource_id(s: &str) -> anyhow::Result<ResourceId> {
    ResourceId::from_hex(s).with_context(|| format!("invalid resource id: {}", s))
}

/// Run the CLI, returning the text to print
pub fn execute(cli: Cli) -> anyhow::Result<String> {
    let data_dir = resolve_data_dir(cli.data_dir, std::env::var(DATA_DIR_ENV).ok());
    let storage = SnapshotStorage::new(data_dir.clone())?;

    let output = match cli.command {
        Commands::Init {
            config,
            admin,
            custody,
            force,
        } => {
            if storage.has_state() && !force {
                bail!(
                    "snapshot already exists in {:?}; pass --force to overwrite",
                    data_dir
                );
            }
            let admin = admin.as_deref().map(parse_address).transpose()?;
            let custody = custody
                .as_deref()
                .map(parse_address)
                .transpose()?
                .unwrap_or_else(default_custody);

            let mut config = match config {
                Some(path) => ProtocolConfig::load(&path)
                    .with_context(|| format!("failed to load config {:?}", path))?,
                None => ProtocolConfig::default(),
            };
            if let Some(admin) = admin {
                config.admin = admin;
            }
            config.validate()?;
            storage.save_state(&ProtocolState::new(config.clone(), custody))?;
            info!("Initialized snapshot in {:?}", data_dir);

            let mut out = format!("Initialized {:?}\nCustody: {}\n", data_dir, custody);
            if config.admin.is_zero() {
                out.push_str("\n⚠️  No admin set; admin operations are disabled.\n");
            } else {
                out.push_str(&format!("Admin:   {}\n", config.admin));
            }
            out
        }

        Commands::Status => {
            let state = load_state(&storage)?;
            let ledger = storage.load_ledger()?;
            render::render_status(&state, &ledger)
        }

        Commands::Resource { id } => {
            let state = load_state(&storage)?;
            let id = parse_resource_id(&id)?;
            render::render_resource(&state, &id)
                .with_context(|| format!("resource not found: {}", id))?
        }

        Commands::Custodian { address } => {
            let state = load_state(&storage)?;
            let address = parse_address(&address)?;
            render::render_custodian(&state, &address)
                .with_context(|| format!("custodian not registered: {}", address))?
        }

        Commands::List {
            embalmer,
            recipient,
            custodian,
        } => {
            let state = load_state(&storage)?;
            let selected: Option<&[ResourceId]> = if let Some(a) = embalmer {
                Some(state.resources_by_embalmer(&parse_address(&a)?))
            } else if let Some(a) = recipient {
                Some(state.resources_by_recipient(&parse_address(&a)?))
            } else if let Some(a) = custodian {
                Some(state.resources_by_custodian(&parse_address(&a)?))
            } else {
                None
            };
            let resources: Vec<&Sarcophagus> = match selected {
                Some(ids) => ids.iter().filter_map(|id| state.resource(id)).collect(),
                None => state.resources().collect(),
            };
            render::render_resource_list(resources)
        }

        Commands::Events { limit, resource } => {
            let state = load_state(&storage)?;
            let resource = resource.as_deref().map(parse_resource_id).transpose()?;
            render::render_events(state.events(), limit, resource)
        }
    };

    Ok(output)
}
