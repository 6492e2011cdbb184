use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, Level};

#[derive(Parser)]
#[command(name = "loadgen")]
#[command(about = "Synthetic diner traffic for a running Pronto service", long_about = None)]
#[command(version)]
struct Cli {
    /// Base URL of the service under load
    #[arg(short, long, default_value = "http://localhost:8080")]
    target: String,

    /// How long to run, e.g. "30s" or "5m"
    #[arg(short, long, default_value = "30s")]
    duration: String,

    /// Number of concurrent diners
    #[arg(short, long, default_value_t = 4)]
    workers: u32,

    /// Pause between a diner's actions, e.g. "250ms"
    #[arg(short, long, default_value = "250ms")]
    pace: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Default)]
struct Tally {
    requests: AtomicU64,
    orders_placed: AtomicU64,
    orders_rejected: AtomicU64,
    logins: AtomicU64,
    login_failures: AtomicU64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let duration = humantime::parse_duration(&cli.duration)?;
    let pace = humantime::parse_duration(&cli.pace)?;

    println!("{}", "=== Pronto load generator ===".bold().cyan());
    println!("Target: {}", cli.target.green());
    println!(
        "Diners: {}, duration: {:?}, pace: {:?}",
        cli.workers, duration, pace
    );

    let pb = ProgressBar::new(duration.as_secs());
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}s")
            .unwrap()
            .progress_chars("=>-"),
    );

    let tally = Arc::new(Tally::default());
    let deadline = Instant::now() + duration;

    // Spawn progress updater
    let pb_clone = pb.clone();
    tokio::spawn(async move {
        let start = Instant::now();
        loop {
            let elapsed = start.elapsed();
            if elapsed >= duration {
                break;
            }
            pb_clone.set_position(elapsed.as_secs());
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    });

    let mut diners = Vec::new();
    for diner in 0..cli.workers {
        diners.push(tokio::spawn(run_diner(
            cli.target.clone(),
            deadline,
            pace,
            diner,
            tally.clone(),
        )));
    }
    join_all(diners).await;

    pb.finish_and_clear();

    println!("\n{}", "=== Traffic summary ===".bold().green());
    println!(
        "Requests issued:  {}",
        tally.requests.load(Ordering::Relaxed)
    );
    println!(
        "Orders placed:    {}",
        tally.orders_placed.load(Ordering::Relaxed).to_string().green()
    );
    println!(
        "Orders rejected:  {}",
        tally
            .orders_rejected
            .load(Ordering::Relaxed)
            .to_string()
            .yellow()
    );
    println!("Logins:           {}", tally.logins.load(Ordering::Relaxed));
    println!(
        "Failed logins:    {}",
        tally
            .login_failures
            .load(Ordering::Relaxed)
            .to_string()
            .yellow()
    );

    Ok(())
}

/// One simulated diner: log in, browse the menu, place a few orders, log out,
/// and repeat until the deadline.
async fn run_diner(base: String, deadline: Instant, pace: Duration, diner: u32, tally: Arc<Tally>) {
    let client = reqwest::Client::new();
    let email = format!("diner{}@pronto.test", diner);
    let mut visit: u64 = 0;

    while Instant::now() < deadline {
        visit += 1;

        tally.requests.fetch_add(1, Ordering::Relaxed);
        let logged_in = match client
            .post(format!("{}/auth/login", base))
            .json(&json!({ "email": email, "password": password_for(visit) }))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("login request failed: {}", e);
                false
            }
        };

        if !logged_in {
            tally.login_failures.fetch_add(1, Ordering::Relaxed);
            tokio::time::sleep(pace).await;
            continue;
        }
        tally.logins.fetch_add(1, Ordering::Relaxed);

        tally.requests.fetch_add(1, Ordering::Relaxed);
        if let Err(e) = client.get(format!("{}/menu", base)).send().await {
            debug!("menu request failed: {}", e);
        }

        let orders = { rand::thread_rng().gen_range(1..=3) };
        for _ in 0..orders {
            if Instant::now() >= deadline {
                break;
            }
            let pizzas = {
                let mut rng = rand::thread_rng();
                pick_order_size(&mut rng)
            };

            tally.requests.fetch_add(1, Ordering::Relaxed);
            match client
                .post(format!("{}/orders", base))
                .json(&order_body(pizzas))
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    tally.orders_placed.fetch_add(1, Ordering::Relaxed);
                }
                Ok(_) => {
                    tally.orders_rejected.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => debug!("order request failed: {}", e),
            }
            tokio::time::sleep(pace).await;
        }

        tally.requests.fetch_add(1, Ordering::Relaxed);
        if let Err(e) = client.delete(format!("{}/auth/logout", base)).send().await {
            debug!("logout request failed: {}", e);
        }
        tokio::time::sleep(pace).await;
    }
}

/// Every seventh visit fat-fingers the password to exercise the failure path.
fn password_for(visit: u64) -> &'static str {
    if visit % 7 == 0 {
        "anchovies"
    } else {
        "mozzarella"
    }
}

/// Occasionally overshoots the kitchen's capacity on purpose.
fn pick_order_size(rng: &mut impl Rng) -> u32 {
    rng.gen_range(1..=25)
}

const TITLES: [&str; 4] = ["Margherita", "Pepperoni", "Veggie", "Crusty"];
const PRICES: [f64; 4] = [8.5, 9.95, 10.25, 7.75];

fn order_body(pizzas: u32) -> Value {
    let items: Vec<Value> = (0..pizzas)
        .map(|i| {
            let pick = (i as usize) % TITLES.len();
            json!({ "title": TITLES[pick], "price": PRICES[pick] })
        })
        .collect();
    json!({ "items": items })
}
