//! Wires a cluster map, a local identity, and the stub arrangement into a
//! runnable node (§10.2). This binary exists so the shim crate has a
//! concrete, runnable demonstration; real arrangements are expected to ship
//! their own thin binary following this same shape.

use clap::Parser;
use color_eyre::eyre::{eyre, Context, Result};
use serde::Deserialize;
use shim::{ClusterMap, Environment, SetupError};
use shim_stub::Stub;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::{TcpListener, UdpSocket};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "shim-cli", about = "Runs a node hosting the stub arrangement")]
struct Args {
    /// This node's name in the cluster map.
    #[arg(long)]
    name: String,

    /// Port this node binds for client connections.
    #[arg(long = "client-port")]
    client_port: u16,

    /// JSON file mapping peer name to "host:port". Mutually layered with
    /// `--peer`: entries from both sources are merged, `--peer` wins on
    /// conflict.
    #[arg(long = "cluster-file")]
    cluster_file: Option<PathBuf>,

    /// A peer entry as "name=host:port"; may be repeated.
    #[arg(long = "peer")]
    peers: Vec<String>,

    /// Enables the arrangement's own debug observers (§6.1).
    #[arg(long)]
    debug: bool,

    /// Arms the stub's periodic ping-to-"B" timer (§8 scenario S5).
    #[arg(long = "ping-timer")]
    ping_timer: bool,
}

#[derive(Deserialize)]
struct ClusterFile(HashMap<String, String>);

fn load_cluster(args: &Args) -> Result<ClusterMap<String>> {
    let mut entries: HashMap<String, SocketAddr> = HashMap::new();

    if let Some(path) = &args.cluster_file {
        let contents = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("reading cluster file {}", path.display()))?;
        let ClusterFile(raw) = serde_json::from_str(&contents)
            .wrap_err_with(|| format!("parsing cluster file {}", path.display()))?;
        for (name, addr) in raw {
            let addr: SocketAddr = addr
                .parse()
                .wrap_err_with(|| format!("invalid address for peer {name}"))?;
            entries.insert(name, addr);
        }
    }

    for peer in &args.peers {
        let (name, addr) = peer
            .split_once('=')
            .ok_or_else(|| eyre!("--peer entries must look like name=host:port, got {peer}"))?;
        let addr: SocketAddr = addr
            .parse()
            .wrap_err_with(|| format!("invalid address for peer {name}"))?;
        entries.insert(name.to_string(), addr);
    }

    if !entries.contains_key(&args.name) {
        return Err(SetupError::MissingSelf(args.name.clone()).into());
    }

    ClusterMap::new(entries.into_iter().collect()).map_err(Into::into)
}

fn init_logging(debug: bool) {
    let default_filter = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    init_logging(args.debug);

    let cluster = load_cluster(&args)?;
    let me = args.name.clone();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("building the single-threaded runtime")?;

    runtime.block_on(async move {
        // §3: the local node's own cluster-map entry determines its datagram
        // bind port; there is no separate `--port` flag to fall out of sync
        // with it.
        let self_port = cluster
            .addr_of(&me)
            .ok_or_else(|| SetupError::MissingSelf(me.clone()))?
            .port();
        let peer_addr: SocketAddr = format!("0.0.0.0:{self_port}").parse().unwrap();
        let peer_sock = UdpSocket::bind(peer_addr)
            .await
            .map_err(|source| SetupError::PeerBind {
                addr: peer_addr,
                source,
            })?;

        let client_addr: SocketAddr = format!("0.0.0.0:{}", args.client_port).parse().unwrap();
        let listen_sock = TcpListener::bind(client_addr)
            .await
            .map_err(|source| SetupError::ClientListenerBind {
                addr: client_addr,
                source,
            })?;

        tracing::info!(name = %me, peer = %peer_addr, clients = %client_addr, "node starting");

        let mut stub = Stub::new().with_debug(args.debug);
        if args.ping_timer {
            stub = stub.with_ping_timer();
        }

        let env = Environment::new(cluster, peer_sock, listen_sock);
        shim::run(stub, me, env).await;
    })
}
