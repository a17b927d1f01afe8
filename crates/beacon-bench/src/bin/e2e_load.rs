//! End-to-end load driver for beacon.
//!
//! Connects a swarm of WebSocket clients to a running server, subscribes
//! them all to one topic, and measures relayed publish throughput with
//! real network I/O.

use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Barrier;
use tokio_tungstenite::{connect_async, tungstenite::Message};

const SERVER_URL: &str = "ws://127.0.0.1:4444/signal";
const TOPIC: &str = "load-test";
const WARMUP_SECS: u64 = 2;
const BENCH_SECS: u64 = 10;

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();
    let num_clients = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(16);

    println!("beacon end-to-end load driver");
    println!("make sure the server is running: cargo run --release --bin beacon");
    println!();

    run_load(num_clients).await;
}

async fn run_load(num_clients: usize) {
    println!(
        "{} clients on topic {:?}; warmup {}s, measurement {}s",
        num_clients, TOPIC, WARMUP_SECS, BENCH_SECS
    );

    let received = Arc::new(AtomicU64::new(0));
    let barrier = Arc::new(Barrier::new(num_clients + 1));

    let mut handles = Vec::new();
    for client_id in 0..num_clients {
        let received = Arc::clone(&received);
        let barrier = Arc::clone(&barrier);

        handles.push(tokio::spawn(async move {
            if let Err(e) = run_client(client_id, received, barrier).await {
                eprintln!("client {} error: {}", client_id, e);
            }
        }));
    }

    barrier.wait().await;
    println!("all {} clients connected and subscribed", num_clients);

    println!("warming up...");
    tokio::time::sleep(Duration::from_secs(WARMUP_SECS)).await;

    received.store(0, Ordering::SeqCst);
    let start = Instant::now();

    println!("measuring...");
    tokio::time::sleep(Duration::from_secs(BENCH_SECS)).await;

    let elapsed = start.elapsed();
    let total = received.load(Ordering::SeqCst);
    let per_sec = total as f64 / elapsed.as_secs_f64();

    println!();
    println!("clients:            {}", num_clients);
    println!("duration:           {:.2}s", elapsed.as_secs_f64());
    println!("relayed messages:   {}", total);
    println!("throughput:         {:.0} msg/s", per_sec);
    println!("per client:         {:.0} msg/s", per_sec / num_clients as f64);

    for handle in handles {
        handle.abort();
    }
}

async fn run_client(
    client_id: usize,
    received: Arc<AtomicU64>,
    barrier: Arc<Barrier>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let (ws, _) = connect_async(SERVER_URL).await?;
    let (mut sender, mut receiver) = ws.split();

    let subscribe = format!(r#"{{"type":"subscribe","topics":["{TOPIC}"]}}"#);
    sender.send(Message::Text(subscribe)).await?;

    barrier.wait().await;

    // Receiver task: count every relayed publish.
    let recv_count = received.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            if let Ok(Message::Text(text)) = result {
                if text.contains(r#""type":"publish""#) {
                    recv_count.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    });

    let publish = format!(
        r#"{{"type":"publish","topic":"{TOPIC}","client":{client_id},"sdp":"v=0 o=- 0 0 IN IP4 0.0.0.0"}}"#
    );

    // Send loop; yield so the receiver half keeps draining.
    loop {
        if sender.send(Message::Text(publish.clone())).await.is_err() {
            break;
        }
        tokio::task::yield_now().await;
    }

    recv_task.abort();
    Ok(())
}
