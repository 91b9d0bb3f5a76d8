use clap::{App, Arg};
use kvstore_server_node::config::{build_config, RawArgs, PORT_ENV_VAR};
use kvstore_server_node::server::ServerNode;
use kvstore_server_node::store::Store;
use log::{error, info};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

fn setup_logger(level: log::LevelFilter, log_file: Option<&str>) -> Result<(), fern::InitError> {
    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}][{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout());
    if let Some(path) = log_file {
        dispatch = dispatch.chain(fern::log_file(path)?);
    }
    dispatch.apply()?;
    Ok(())
}

#[rocket::main]
async fn main() -> Result<(), rocket::Error> {
    let start_time = Instant::now();
    let matches = App::new("kvstore-server-node")
        .version("1.0")
        .about("An in-memory key-value store served over HTTP")
        .arg(
            Arg::with_name("address")
                .long("address")
                .takes_value(true)
                .help("Address to bind to (default 0.0.0.0)"),
        )
        .arg(
            Arg::with_name("port")
                .long("port")
                .takes_value(true)
                .help("Port to listen on (default 8080, or KV_PORT)"),
        )
        .arg(
            Arg::with_name("shards")
                .long("shards")
                .takes_value(true)
                .help("Number of lock shards in the store"),
        )
        .arg(
            Arg::with_name("log_level")
                .long("log-level")
                .takes_value(true)
                .default_value("info")
                .possible_values(["trace", "debug", "info", "warn", "error", "off"])
                .help("Log level"),
        )
        .arg(
            Arg::with_name("log_file")
                .long("log-file")
                .takes_value(true)
                .help("Also write logs to this file"),
        )
        .get_matches();

    let level = matches
        .value_of("log_level")
        .and_then(|raw| log::LevelFilter::from_str(raw).ok())
        .unwrap_or(log::LevelFilter::Info);
    if let Err(e) = setup_logger(level, matches.value_of("log_file")) {
        eprintln!("Failed to set up logging: {}", e);
    }

    let args = RawArgs {
        address: matches.value_of("address"),
        port: matches.value_of("port"),
        shards: matches.value_of("shards"),
    };
    let config = match build_config(&args, std::env::var(PORT_ENV_VAR).ok()) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };
    info!("Loaded configuration: {:?}", config);

    let store = Arc::new(Store::with_shards(config.shard_count));
    let server_node = ServerNode::new(config, store);
    info!("Elapsed time creating server: {:?}", start_time.elapsed());
    server_node.build().launch().await?;
    Ok(())
}
