//! Concurrent put/query load against a time-series database.
//!
//! Every worker takes its own session from one cluster, runs its share of
//! operations, and hands the session back. At the end the cluster is closed
//! and checked for leaked sessions.
//!
//! ```sh
//! tsdb-stress --operation put --count 100000 --threads 8 --batch 50
//! tsdb-stress --operation query --count 1000 --threads 4 --host tsdb.internal
//! ```

use std::process;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use futures::future::join_all;
use tracing::{error, info, warn};
use tsdb_driver::cli::{ConnectionArgs, init_tracing};
use tsdb_driver::prelude::*;

const STRESS_METRIC: &str = "tsdb.stress";

#[derive(Parser)]
#[command(name = "tsdb-stress")]
struct Cli {
    #[command(flatten)]
    conn: ConnectionArgs,

    #[arg(short, long, value_enum, default_value_t = Operation::Put)]
    operation: Operation,

    /// Total operations across all workers
    #[arg(short = 'n', long, default_value_t = 1000)]
    count: u64,

    /// Concurrent workers, one session each
    #[arg(short, long, default_value_t = 4)]
    threads: u64,

    /// Points per put request (0 = single-point puts)
    #[arg(short, long, default_value_t = 0)]
    batch: usize,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Operation {
    Put,
    Query,
}

#[derive(Debug, Default)]
struct RunResult {
    worker: u64,
    ops: u64,
    points: u64,
    failures: u64,
    duration: Duration,
}

fn stress_point(worker: u64, seq: u64) -> Result<DataPoint, DriverError> {
    let now = chrono::Utc::now().timestamp_millis();
    Ok(DataPoint::new(STRESS_METRIC, now, now)?
        .with_tag("worker", worker.to_string())
        .with_tag("series", (seq % 16).to_string()))
}

async fn run_worker(
    cluster: &Cluster,
    worker: u64,
    ops: u64,
    operation: Operation,
    batch: usize,
) -> Result<RunResult, DriverError> {
    let session = cluster.new_session()?;
    let result = drive_session(&session, worker, ops, operation, batch).await;
    cluster.close_session(&session);

    let result = result?;
    info!(
        "Finished worker {} in {:.1}ms over {} ops ({} failed)",
        worker,
        result.duration.as_secs_f64() * 1000.0,
        result.ops,
        result.failures
    );
    Ok(result)
}

async fn drive_session(
    session: &Session,
    worker: u64,
    ops: u64,
    operation: Operation,
    batch: usize,
) -> Result<RunResult, DriverError> {
    let mut result = RunResult {
        worker,
        ..RunResult::default()
    };
    let start = Instant::now();

    for seq in 0..ops {
        let outcome = match operation {
            Operation::Put if batch == 0 => {
                let point = stress_point(worker, seq)?;
                session.put_point(point, true).await.map(|s| s.success)
            }
            Operation::Put => {
                let points = (0..batch as u64)
                    .map(|i| stress_point(worker, seq * batch as u64 + i))
                    .collect::<Result<Vec<_>, _>>()?;
                session.put(&points, true, true).await.map(|s| s.success)
            }
            Operation::Query => {
                let since = chrono::Utc::now().timestamp_millis() - 60_000;
                let query = Query::new(since).with_ms_resolution(true).with_metric(
                    MetricQuery::new(Aggregator::Sum, STRESS_METRIC)
                        .with_tag("worker", worker.to_string()),
                );
                session
                    .query(&query, Endpoint::Query)
                    .await
                    .map(|series| series.iter().map(|s| s.dps.len() as u64).sum::<u64>())
            }
        };
        result.ops += 1;
        match outcome {
            Ok(points) => result.points += points,
            Err(e) => {
                result.failures += 1;
                warn!("worker {worker}: op {seq} failed: {e}");
            }
        }
    }

    result.duration = start.elapsed();
    Ok(result)
}

fn throughput(ops: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 { ops as f64 / secs } else { 0.0 }
}

async fn run(cli: &Cli) -> Result<bool, DriverError> {
    if cli.threads == 0 {
        return Err(DriverError::InvalidConfig("--threads must be > 0".into()));
    }
    let cluster = Arc::new(Cluster::new(
        cli.conn.host.clone(),
        cli.conn.port,
        cli.conn.configuration(),
    )?);

    let per_worker = cli.count / cli.threads;
    let remainder = cli.count % cli.threads;
    info!(
        "Stressing {}:{} with {:?}: {} ops over {} workers",
        cli.conn.host, cli.conn.port, cli.operation, cli.count, cli.threads
    );

    let start = Instant::now();
    let workers = (0..cli.threads).map(|w| {
        let ops = per_worker + u64::from(w < remainder);
        run_worker(&cluster, w, ops, cli.operation, cli.batch)
    });
    let results = join_all(workers).await;
    let elapsed = start.elapsed();

    let mut total_ops = 0;
    let mut total_failures = 0;
    for result in results {
        match result {
            Ok(r) => {
                println!(
                    "worker {:>3}: {:>8} ops {:>8} points {:>6} failed {:>10.1}ms {:>10.1} ops/s",
                    r.worker,
                    r.ops,
                    r.points,
                    r.failures,
                    r.duration.as_secs_f64() * 1000.0,
                    throughput(r.ops, r.duration)
                );
                total_ops += r.ops;
                total_failures += r.failures;
            }
            Err(e) => {
                error!("worker failed to start: {e}");
                total_failures += 1;
            }
        }
    }
    println!(
        "total: {} ops, {} failed, {:.1}ms, {:.1} ops/s",
        total_ops,
        total_failures,
        elapsed.as_secs_f64() * 1000.0,
        throughput(total_ops, elapsed)
    );

    cluster.close();
    let leaked = cluster.sessions().len();
    if leaked > 0 {
        error!("{leaked} sessions still registered after close");
    }
    Ok(total_failures == 0 && leaked == 0)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing();

    match run(&cli).await {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stress_points_carry_worker_tags() {
        let point = stress_point(3, 17).unwrap();
        assert_eq!(point.metric, STRESS_METRIC);
        assert_eq!(point.tags["worker"], "3");
        assert_eq!(point.tags["series"], "1");
    }

    fn unreachable_cluster() -> Cluster {
        // Bind then drop to find a port nothing listens on.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let config = Configuration::default()
            .with_io_threads(1)
            .with_connect_timeout(Duration::from_millis(200))
            .with_put_retries(0)
            .with_query_retries(0);
        Cluster::new("127.0.0.1", port, config).unwrap()
    }

    #[tokio::test]
    async fn failed_ops_are_counted_and_the_session_handed_back() {
        let cluster = unreachable_cluster();
        let result = run_worker(&cluster, 1, 3, Operation::Put, 2).await.unwrap();
        assert_eq!(result.ops, 3);
        assert_eq!(result.failures, 3);
        assert!(cluster.sessions().is_empty());
    }

    #[tokio::test]
    async fn idle_worker_hands_its_session_back() {
        let cluster = unreachable_cluster();
        let result = run_worker(&cluster, 0, 0, Operation::Query, 0).await.unwrap();
        assert_eq!(result.ops, 0);
        assert!(cluster.sessions().is_empty());
    }

    #[test]
    fn throughput_of_zero_elapsed_is_zero() {
        assert_eq!(throughput(10, Duration::ZERO), 0.0);
        assert_eq!(throughput(10, Duration::from_secs(2)), 5.0);
    }
}
