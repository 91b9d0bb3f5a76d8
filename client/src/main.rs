use clap::{App, Arg};
use kvstore_client::client_api::KvApi;
use kvstore_client::kv_client::{HttpKvClient, DEFAULT_SERVER};
use std::sync::Arc;
use tokio::io::{self, AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let matches = App::new("KVStore Client")
        .version("1.0")
        .about("Talks to a key-value store node over HTTP")
        .arg(
            Arg::new("server")
                .short('s')
                .long("server")
                .takes_value(true)
                .help("Server address (http://IP:Port)"),
        )
        .get_matches();

    let server = matches.value_of("server").unwrap_or(DEFAULT_SERVER);
    let kv_store = Arc::new(HttpKvClient::new(server)?);

    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin);
    let mut line = String::new();

    println!("KVStore Client for {}", kv_store.base_url());
    println!("Type 'help' for a list of commands");

    while reader.read_line(&mut line).await? > 0 {
        {
            let line = line.trim();
            let parts: Vec<&str> = line.split_whitespace().collect();
            match parts.as_slice() {
                ["get", key] => match kv_store.get(key).await {
                    Ok(Some(value)) => println!("Value: {}", value),
                    Ok(None) => println!("Key not found"),
                    Err(e) => eprintln!("Error: {}", e),
                },
                ["get", ..] => eprintln!("Usage: get <key>"),
                ["put", key, value] => match kv_store.put(key, value).await {
                    Ok(_) => println!("Put successful"),
                    Err(e) => eprintln!("Error: {}", e),
                },
                ["put", ..] => eprintln!("Usage: put <key> <value>"),
                ["help"] => {
                    println!("Available commands:");
                    println!("  get <key>              - Retrieve the value for a key");
                    println!("  put <key> <value>      - Set the value for a key");
                    println!("  help                   - Show this message");
                    println!("  quit                   - Exit the client");
                }
                ["quit"] => break,
                [] => {}
                _ => eprintln!("Unknown command: '{}'", line),
            }
        }
        line.clear();
    }

    Ok(())
}
