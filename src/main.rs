use chordshare::config::Config;
use chordshare::handler::P2PHandler;
use chordshare::network::Server;
use chordshare::routing::identifier::Identify;
use chordshare::routing::NodeState;
use chordshare::storage::FileStore;
use chordshare::{membership, procedures, stabilization};
use log::{error, info, warn};
use std::io::{self, BufRead};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(
    name = "chordshare",
    version = "0.1",
    author = "Benedikt Seidl, Stefan Su",
    about = "Peer-to-peer file-sharing overlay based on Chord"
)]
struct Opt {
    /// Port this node listens on
    listen_port: u16,

    /// Port of a bootstrap peer to join an existing ring
    bootstrap_port: Option<u16>,

    /// Host this node listens and is addressed on
    #[structopt(short = "H", long = "host", default_value = "127.0.0.1")]
    host: String,

    /// Path to a custom config file
    #[structopt(short = "c", long = "config", parse(from_os_str))]
    config: Option<PathBuf>,

    /// Level of verbosity (v, vv, vvv)
    #[structopt(short = "v", parse(from_occurrences))]
    verbose: usize,
}

fn main() {
    let opt = Opt::from_args();

    stderrlog::new()
        .module(module_path!())
        .verbosity(opt.verbose)
        .init()
        .expect("failed to initialize logger");

    let config = match &opt.config {
        Some(path) => Config::load_from_file(&path.to_string_lossy()).unwrap_or_else(|err| {
            error!("error while loading config file: {}", err);
            process::exit(2);
        }),
        None => Config::default(),
    };

    let self_addr: SocketAddr = format!("{}:{}", opt.host, opt.listen_port)
        .parse()
        .unwrap_or_else(|err| {
            error!("invalid listen address: {}", err);
            process::exit(2);
        });

    let bootstrap_addr: Option<SocketAddr> = opt.bootstrap_port.map(|port| {
        format!("{}:{}", opt.host, port).parse().unwrap_or_else(|err| {
            error!("invalid bootstrap address: {}", err);
            process::exit(2);
        })
    });

    if let Err(err) = run(config, self_addr, bootstrap_addr) {
        error!("fatal application error: {}", err);
        process::exit(1);
    }
}

fn run(config: Config, self_addr: SocketAddr, bootstrap_addr: Option<SocketAddr>) -> chordshare::Result<()> {
    let file_store = Arc::new(FileStore::load_from_dir(&config.data_dir)?);
    let state = Arc::new(Mutex::new(NodeState::singleton(self_addr)));

    let handler = P2PHandler::new(Arc::clone(&state), Arc::clone(&file_store), config.connection_timeout_ms);
    Server::new(Box::new(handler)).listen(self_addr, config.num_workers)?;

    match bootstrap_addr {
        Some(bootstrap_addr) => membership::join(bootstrap_addr, &state, &file_store, config.connection_timeout_ms)?,
        None => info!("starting a new ring at {}", self_addr),
    }

    let (shutdown_tx, shutdown_rx) = mpsc::channel();
    let stabilization_state = Arc::clone(&state);
    let stabilization_config = stabilization::StabilizationConfig {
        stabilize_delay_secs: config.stabilize_delay_secs,
        ping_max_retries: config.ping_max_retries,
        ping_retry_delay_secs: config.ping_retry_delay_secs,
        connection_timeout_ms: config.connection_timeout_ms,
    };
    thread::spawn(move || {
        stabilization::run(&stabilization_state, &stabilization_config, &shutdown_rx);
    });

    command_loop(self_addr, &state, &file_store, &config, shutdown_tx)
}

/// The foreground operator command loop (§6): `info`, `fingertable`,
/// `files`, `getfile <name>`, `putfile <name>`, `quit`/`q`/`exit`.
fn command_loop(
    self_addr: SocketAddr,
    state: &Mutex<NodeState>,
    file_store: &FileStore,
    config: &Config,
    shutdown_tx: mpsc::Sender<()>,
) -> chordshare::Result<()> {
    let stdin = io::stdin();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };

        let mut parts = line.split_whitespace();
        let command = match parts.next() {
            Some(command) => command,
            None => continue,
        };

        match command {
            "info" => {
                let guard = state.lock().unwrap();
                println!("address:     {}", guard.addr);
                println!("id:          {}", guard.id);
                println!("successor:   {}", guard.successor().identifier());
                println!("predecessor: {}", guard.predecessor.identifier());
                println!("files:       {}", file_store.names().len());
            }
            "fingertable" => {
                let guard = state.lock().unwrap();
                for entry in guard.finger_table.iter() {
                    println!("{}\t-> {} ({})", entry.target, entry.successor, entry.successor.identifier());
                }
            }
            "files" => {
                for name in file_store.names() {
                    let id = name.identifier();
                    println!("{}\t{}", name, id);
                }
            }
            "getfile" => match parts.next() {
                Some(name) => {
                    if let Err(err) = procedures::get_file(name, self_addr, state, file_store, config.connection_timeout_ms) {
                        println!("error: {}", err);
                    }
                }
                None => println!("usage: getfile <name>"),
            },
            "putfile" => match parts.next() {
                Some(name) => {
                    if let Err(err) = procedures::put_file(name, self_addr, state, file_store, config.connection_timeout_ms) {
                        println!("error: {}", err);
                    }
                }
                None => println!("usage: putfile <name>"),
            },
            "quit" | "q" | "exit" => {
                if let Err(err) = membership::leave(state, config.connection_timeout_ms) {
                    warn!("graceful leave failed: {}", err);
                }
                let _ = shutdown_tx.send(());
                println!("STOPPED");
                break;
            }
            other => println!("unknown command: {}", other),
        }
    }

    Ok(())
}
