use clap::{App, Arg};
use futures::future::join_all;
use kvstore_client::client_api::KvApi;
use kvstore_client::kv_client::{HttpKvClient, DEFAULT_SERVER};
use log::info;
use std::time::{Duration, Instant};

// Writes `requests` distinct keys concurrently, reads every one of them back
// and checks that no write was lost. Prints wall time and mean latency for
// each phase.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let matches = App::new("KVStore Benchmark")
        .version("1.0")
        .about("Load generator for a key-value store node")
        .arg(
            Arg::new("server")
                .short('s')
                .long("server")
                .takes_value(true)
                .help("Server address (http://IP:Port)"),
        )
        .arg(
            Arg::new("requests")
                .short('n')
                .long("requests")
                .takes_value(true)
                .default_value("1000")
                .help("Number of keys to write and read back"),
        )
        .get_matches();

    let server = matches.value_of("server").unwrap_or(DEFAULT_SERVER);
    let requests = matches
        .value_of("requests")
        .unwrap_or("1000")
        .parse::<usize>()?;
    let client = HttpKvClient::new(server)?;

    let keys = load_gen(requests);
    let (elapsed, latencies) = put_run(&client, &keys).await?;
    report("PUT", elapsed, &latencies);

    let (elapsed, latencies, lost) = get_run(&client, &keys).await?;
    report("GET", elapsed, &latencies);
    if lost > 0 {
        anyhow::bail!("{} of {} writes were not read back", lost, keys.len());
    }
    println!("All {} writes read back", keys.len());
    Ok(())
}

// One (key, value) pair per request, all keys distinct
fn load_gen(requests: usize) -> Vec<(String, String)> {
    (0..requests)
        .map(|i| (format!("bench-key-{}", i), format!("bench-value-{}", i)))
        .collect()
}

async fn put_run(
    client: &dyn KvApi,
    keys: &[(String, String)],
) -> anyhow::Result<(Duration, Vec<Duration>)> {
    info!("Start running {} puts", keys.len());
    let start = Instant::now();
    let results = join_all(keys.iter().map(|(key, value)| async move {
        let sent = Instant::now();
        client.put(key, value).await.map(|_| sent.elapsed())
    }))
    .await;
    let elapsed = start.elapsed();
    let latencies = results.into_iter().collect::<anyhow::Result<Vec<_>>>()?;
    Ok((elapsed, latencies))
}

async fn get_run(
    client: &dyn KvApi,
    keys: &[(String, String)],
) -> anyhow::Result<(Duration, Vec<Duration>, usize)> {
    info!("Start running {} gets", keys.len());
    let start = Instant::now();
    let results = join_all(keys.iter().map(|(key, value)| async move {
        let sent = Instant::now();
        client
            .get(key)
            .await
            .map(|got| (sent.elapsed(), got.as_deref() == Some(value.as_str())))
    }))
    .await;
    let elapsed = start.elapsed();
    let mut latencies = Vec::with_capacity(keys.len());
    let mut lost = 0;
    for result in results {
        let (latency, matched) = result?;
        latencies.push(latency);
        if !matched {
            lost += 1;
        }
    }
    Ok((elapsed, latencies, lost))
}

fn report(phase: &str, elapsed: Duration, latencies: &[Duration]) {
    let mean = if latencies.is_empty() {
        Duration::ZERO
    } else {
        latencies.iter().sum::<Duration>() / latencies.len() as u32
    };
    println!(
        "{}: {} requests in {:?} (mean latency {:?})",
        phase,
        latencies.len(),
        elapsed,
        mean
    );
}
