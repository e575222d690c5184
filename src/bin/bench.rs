//! LodeKV Load Generator
//!
//! Opens N parallel connections, each issuing SET/GET pairs on its own key,
//! and reports throughput.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use clap::Parser;
use lodekv::protocol::Reply;
use lodekv::Client;

/// LodeKV load generator
#[derive(Parser, Debug)]
#[command(name = "lodekv-bench")]
#[command(about = "Parallel SET/GET load generator for LodeKV")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Number of parallel connections (one thread each)
    #[arg(short, long, default_value = "50")]
    connections: usize,

    /// SET/GET pairs issued per connection
    #[arg(short, long, default_value = "10000")]
    requests: usize,
}

fn main() {
    let args = Args::parse();

    println!(
        "Connections: {}, SET/GET pairs per connection: {}",
        args.connections, args.requests
    );

    let completed = Arc::new(AtomicU64::new(0));
    let start = Instant::now();

    let workers: Vec<_> = (0..args.connections)
        .map(|id| {
            let server = args.server.clone();
            let completed = Arc::clone(&completed);
            let requests = args.requests;
            thread::spawn(move || run_worker(id, &server, requests, &completed))
        })
        .collect();

    for worker in workers {
        if worker.join().is_err() {
            eprintln!("A worker thread panicked");
        }
    }

    let elapsed = start.elapsed().as_secs_f64().max(0.001);
    let completed = completed.load(Ordering::Relaxed);

    println!("Completed pairs: {}", completed);
    println!("Elapsed: {:.3} s", elapsed);
    println!("QPS: {:.0} (pairs/s)", completed as f64 / elapsed);
}

/// Issue `requests` SET/GET pairs; a pair counts once its GET returns data
fn run_worker(id: usize, server: &str, requests: usize, completed: &AtomicU64) {
    let mut client = match Client::connect(server) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("worker {}: connect failed: {}", id, e);
            return;
        }
    };

    let key = format!("key_{}", id);
    let value = format!("value_{}", id);

    for _ in 0..requests {
        if let Err(e) = client.set(&key, &value) {
            eprintln!("worker {}: SET failed: {}", id, e);
            return;
        }
        match client.get(&key) {
            Ok(Reply::Bulk(_)) => {
                completed.fetch_add(1, Ordering::Relaxed);
            }
            Ok(other) => {
                eprintln!("worker {}: unexpected GET reply: {:?}", id, other);
                return;
            }
            Err(e) => {
                eprintln!("worker {}: GET failed: {}", id, e);
                return;
            }
        }
    }
}
