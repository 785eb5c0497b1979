use clap::Parser;
use rpcstress_common::DEFAULT_METHOD;
use rpcstress_harness::config::{
    Config, DEFAULT_CONCURRENCY, DEFAULT_SERVER_ADDRESS, DEFAULT_TOTAL_REQUESTS,
};
use rpcstress_harness::payload::Payload;
use rpcstress_harness::report::Report;
use rpcstress_harness::runner::StressRunner;
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rpcstress", about = "RPC stress test harness")]
struct Args {
    /// RPC server address (host:port)
    #[arg(long, default_value = DEFAULT_SERVER_ADDRESS)]
    server: String,

    /// Total number of requests to send
    #[arg(long, default_value_t = DEFAULT_TOTAL_REQUESTS)]
    requests: u64,

    /// Number of concurrent workers, each with its own connection
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// RPC method to call
    #[arg(long, default_value = DEFAULT_METHOD)]
    method: String,

    /// Connection and per-call timeout, e.g. `30s` or `500ms`
    #[arg(long, value_parser = humantime::parse_duration, default_value = "30s")]
    timeout: Duration,

    /// Run for this long instead of a fixed number of requests
    #[arg(long, value_parser = humantime::parse_duration)]
    duration: Option<Duration>,

    /// JSON file with a custom request payload
    #[arg(long)]
    payload: Option<PathBuf>,

    /// Fail if the error rate exceeds this fraction
    #[arg(long)]
    max_error_rate: Option<f64>,
}

impl Args {
    fn to_config(&self) -> Config {
        Config {
            server_address: self.server.clone(),
            total_requests: self.requests,
            concurrency: self.concurrency,
            method: self.method.clone(),
            timeout: self.timeout,
            duration: self.duration,
            payload_file: self.payload.clone(),
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = args.to_config();

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {e}");
        process::exit(3);
    }

    let payload = match &config.payload_file {
        Some(path) => Payload::from_file(path).unwrap_or_else(|e| {
            eprintln!("Failed to load payload: {e}");
            process::exit(3);
        }),
        None => Payload::default(),
    };

    println!("Starting stress test...");
    println!("Server:                {}", config.server_address);
    match config.duration {
        Some(d) => println!("Duration:              {}", humantime::format_duration(d)),
        None => println!("Requests:              {}", config.total_requests),
    }
    println!("Concurrency:           {}", config.concurrency);
    println!("Method:                {}", config.method);
    println!();

    let runner = StressRunner::new(config, payload);
    let metrics = runner.run().await;
    let report = Report::from_metrics(&metrics);

    print!("{report}");

    if let Some(max_error_rate) = args.max_error_rate {
        let exceeded = metrics.requests_total > 0 && report.error_rate > max_error_rate;
        println!();
        println!(
            "Error rate:            {:.3}%    [threshold: {:.3}%]  {}",
            report.error_rate * 100.0,
            max_error_rate * 100.0,
            if exceeded { "✗" } else { "✓" },
        );
        println!("Result: {}", if exceeded { "FAIL" } else { "PASS" });
        if exceeded {
            process::exit(1);
        }
    }
}
