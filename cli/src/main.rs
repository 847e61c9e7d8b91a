mod core;
use anyhow::{Context, Result, anyhow};
use blueprintlib::patcher::{Placement, SelectionPolicy};
use blueprintlib::rpc::RpcClient;
use blueprintlib::store::NodeConfig;
use blueprintlib::templates;
use blueprintlib::tx::{Address, Operation, build_request, parse_amount};
use clap::{Parser, Subcommand};
use crate::core::{Config, Core};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about = "Stylus blueprint toolkit", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, value_name = "FILE", default_value_os_t = PathBuf::from("blueprint.toml"))]
    config: PathBuf,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    GenerateConfig {
        #[arg(short, long, value_name = "FILE", default_value_os_t = PathBuf::from("blueprint.toml"))]
        output: PathBuf,
    },
    /// List bundled contract templates
    Templates,
    /// Add the cache SDK to a template or a contract file
    Patch {
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        template: Option<String>,
        #[arg(long, value_name = "FILE")]
        file: Option<PathBuf>,
        #[arg(long)]
        policy: Option<SelectionPolicy>,
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Manage blueprint nodes
    #[command(subcommand)]
    Node(NodeCommands),
    /// Build a transaction request
    #[command(subcommand)]
    Tx(TxCommands),
    /// Query chain id and block height of a network
    CheckNetwork {
        /// Network name, defaults to the configured one
        name: Option<String>,
        /// Also report whether code is deployed at this address
        #[arg(long)]
        address: Option<String>,
        /// eth_call this calldata against --address
        #[arg(long, requires = "address")]
        data: Option<String>,
    },
}

#[derive(Subcommand)]
enum NodeCommands {
    Add {
        kind: String,
        /// key=value pairs
        assignments: Vec<String>,
    },
    Set {
        id: Uuid,
        #[arg(required = true)]
        assignments: Vec<String>,
    },
    Show {
        id: Uuid,
    },
    Remove {
        id: Uuid,
    },
    List,
    /// Print the node's contract source
    Render {
        id: Uuid,
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum TxCommands {
    Approve {
        token: String,
        spender: String,
        amount: String,
    },
    Transfer {
        token: String,
        to: String,
        amount: String,
    },
    Native {
        to: String,
        amount: String,
    },
}

fn init_logging(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match log_file {
        Some(path) => {
            let directory = path
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .ok_or_else(|| anyhow!("log file {} has no file name", path.display()))?;
            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(writer)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            Ok(None)
        }
    }
}

fn emit(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "wrote output");
        }
        None => print!("{text}"),
    }
    Ok(())
}

fn list_templates() {
    for template in templates::all() {
        println!("{:<8} {} - {}", template.id, template.name, template.description);
        if let Some(url) = template.source_url {
            println!("         {url}");
        }
    }
}

fn patch(
    config: &Config,
    template: Option<String>,
    file: Option<PathBuf>,
    policy: Option<SelectionPolicy>,
    output: Option<PathBuf>,
) -> Result<()> {
    let source = match (template, file) {
        (Some(id), _) => templates::require(&id)?.source.to_string(),
        (None, Some(path)) => {
            fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?
        }
        (None, None) => return Err(anyhow!("either --template or --file is required")),
    };
    let mut patcher = config.cache.clone();
    if let Some(policy) = policy {
        patcher = patcher.with_policy(policy);
    }
    let patched = patcher.patch(&source);
    match &patched.placement {
        Placement::AlreadyPatched => info!("already patched, source unchanged"),
        Placement::Interface {
            trait_name,
            type_name,
        } => info!("inserted into impl {trait_name} for {type_name}"),
        Placement::Impl {
            trait_name: Some(trait_name),
            type_name,
        } => info!("inserted into impl {trait_name} for {type_name}"),
        Placement::Impl {
            trait_name: None,
            type_name,
        } => info!("inserted into impl {type_name}"),
        Placement::Synthesized { struct_name } => info!("appended new impl {struct_name}"),
        Placement::ImportOnly => info!("only the import was added"),
    }
    emit(&patched.source, output.as_deref())
}

fn run_node(config_path: &Path, command: NodeCommands) -> Result<()> {
    let mut core = Core::load(config_path)?;
    match command {
        NodeCommands::Add { kind, assignments } => {
            let config = NodeConfig::from_assignments(assignments.iter().map(String::as_str))?;
            let id = core.blueprint.add_node(kind, config);
            core.save()?;
            println!("{id}");
        }
        NodeCommands::Set { id, assignments } => {
            let patch = NodeConfig::from_assignments(assignments.iter().map(String::as_str))?;
            core.blueprint.update_node_config(id, patch)?;
            core.save()?;
        }
        NodeCommands::Show { id } => {
            let node = core
                .blueprint
                .node(id)
                .ok_or_else(|| anyhow!("node {id} not found"))?;
            println!("{}", serde_json::to_string_pretty(node)?);
        }
        NodeCommands::Remove { id } => {
            core.blueprint.remove_node(id)?;
            core.save()?;
        }
        NodeCommands::List => {
            for node in core.blueprint.nodes() {
                println!("{} {:<10} {} keys", node.id, node.kind, node.config.len());
            }
        }
        NodeCommands::Render { id, output } => {
            let source = core.blueprint.render_source(id, &core.config.cache)?;
            emit(&source, output.as_deref())?;
        }
    }
    Ok(())
}

fn run_tx(command: TxCommands) -> Result<()> {
    let operation = match command {
        TxCommands::Approve {
            token,
            spender,
            amount,
        } => Operation::Approve {
            token: Address::parse(&token)?,
            spender: Address::parse(&spender)?,
            amount: parse_amount(&amount)?,
        },
        TxCommands::Transfer { token, to, amount } => Operation::Transfer {
            token: Address::parse(&token)?,
            to: Address::parse(&to)?,
            amount: parse_amount(&amount)?,
        },
        TxCommands::Native { to, amount } => Operation::NativeTransfer {
            to: Address::parse(&to)?,
            amount: parse_amount(&amount)?,
        },
    };
    info!(operation = operation.tag(), "built transaction request");
    println!("{}", serde_json::to_string_pretty(&build_request(&operation))?);
    Ok(())
}

async fn check_network(
    config: &Config,
    name: Option<String>,
    address: Option<String>,
    data: Option<String>,
) -> Result<()> {
    let name = name.unwrap_or_else(|| config.default_network.clone());
    let network = config.network(&name)?;
    let client = RpcClient::new(network.rpc_url.clone())?;
    let report = client
        .check_connection(&network)
        .await
        .with_context(|| format!("querying {}", client.rpc_url()))?;
    println!("network:      {}", report.network);
    println!("chain id:     {}", report.chain_id);
    println!("block number: {}", report.block_number);
    println!("latency:      {} ms", report.latency_ms);
    if !report.chain_id_matches {
        println!(
            "warning: expected chain id {}, endpoint reports {}",
            network.chain_id, report.chain_id
        );
    }
    if let Some(address) = address {
        let address = Address::parse(&address)?;
        let code = client.get_code(&address).await?;
        let code_len = code.len().saturating_sub(2) / 2;
        if code_len == 0 {
            println!("code at {address}: none");
        } else {
            println!("code at {address}: {code_len} bytes");
        }
        if let Some(data) = data {
            println!("call result:  {}", client.call(&address, &data).await?);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(cli.log_file.as_deref())?;
    match cli.command {
        Commands::GenerateConfig { output } => {
            Config::default().write(&output)?;
            println!("Default config generated at: {}", output.display());
        }
        Commands::Templates => list_templates(),
        Commands::Patch {
            template,
            file,
            policy,
            output,
        } => {
            let config = Config::load_or_default(&cli.config)?;
            patch(&config, template, file, policy, output)?;
        }
        Commands::Node(command) => run_node(&cli.config, command)?,
        Commands::Tx(command) => run_tx(command)?,
        Commands::CheckNetwork {
            name,
            address,
            data,
        } => {
            let config = Config::load_or_default(&cli.config)?;
            check_network(&config, name, address, data).await?;
        }
    }
    Ok(())
}
