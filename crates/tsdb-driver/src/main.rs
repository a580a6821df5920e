//! Talk to a time-series database from the command line.
//!
//! # Examples
//!
//! ```sh
//! # Write one point and print the put summary
//! tsdb put --metric sys.cpu.user --value 42.5 --tag host=web01
//!
//! # Synchronous write, waiting up to 500ms for durability
//! tsdb --sync-timeout-ms 500 put --metric sys.cpu.user --value 7 --sync
//!
//! # A metric since a given second, downsampled
//! tsdb query --metric sys.cpu.user --start 1700000000 --downsample 5m-avg
//!
//! # Latest sample per series
//! tsdb query --metric sys.cpu.user --start 0 --endpoint last
//!
//! # Server release line
//! tsdb --host tsdb.internal version
//! ```

use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tsdb_driver::cli::{ConnectionArgs, init_tracing};
use tsdb_driver::prelude::*;

/// Query and write a time-series database over its HTTP API.
#[derive(Parser)]
#[command(name = "tsdb")]
struct Cli {
    #[command(flatten)]
    conn: ConnectionArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write one data point
    Put {
        #[arg(long)]
        metric: String,

        /// Integer or float value
        #[arg(long, value_parser = parse_value)]
        value: DataPointValue,

        /// Epoch seconds or milliseconds (default: now, in seconds)
        #[arg(long)]
        timestamp: Option<i64>,

        /// Tag as key=value; repeatable
        #[arg(long = "tag", value_parser = parse_tag)]
        tags: Vec<(String, String)>,

        /// Wait for durability (needs --sync-timeout-ms)
        #[arg(long)]
        sync: bool,

        /// Do not ask the server for per-point details
        #[arg(long)]
        no_details: bool,
    },
    /// Read a metric
    Query {
        #[command(flatten)]
        range: RangeArgs,

        #[arg(long, default_value = "sum", value_parser = parse_aggregator)]
        aggregator: Aggregator,

        /// e.g. 5m-avg
        #[arg(long)]
        downsample: Option<String>,

        #[arg(long, value_enum, default_value_t = QueryEndpoint::Query)]
        endpoint: QueryEndpoint,
    },
    /// Delete the points a query selects
    Delete {
        #[command(flatten)]
        range: RangeArgs,
    },
    /// Print the server's release line
    Version,
}

#[derive(clap::Args)]
struct RangeArgs {
    #[arg(long)]
    metric: String,

    /// Start time in epoch seconds or milliseconds
    #[arg(long)]
    start: i64,

    /// End time (default: now)
    #[arg(long)]
    end: Option<i64>,

    /// Tag as key=value; repeatable
    #[arg(long = "tag", value_parser = parse_tag)]
    tags: Vec<(String, String)>,
}

impl RangeArgs {
    fn query(&self, aggregator: Aggregator, downsample: Option<&str>) -> Query {
        let mut metric = MetricQuery::new(aggregator, &self.metric);
        for (k, v) in &self.tags {
            metric = metric.with_tag(k, v);
        }
        if let Some(ds) = downsample {
            metric = metric.with_downsample(ds);
        }
        let mut query = Query::new(self.start).with_metric(metric);
        if self.end.is_some() {
            query = query.with_end(self.end);
        }
        query
    }
}

#[derive(ValueEnum, Clone, Copy)]
enum QueryEndpoint {
    Query,
    Exp,
    Gexp,
    Last,
}

impl From<QueryEndpoint> for Endpoint {
    fn from(e: QueryEndpoint) -> Self {
        match e {
            QueryEndpoint::Query => Endpoint::Query,
            QueryEndpoint::Exp => Endpoint::QueryExp,
            QueryEndpoint::Gexp => Endpoint::QueryGexp,
            QueryEndpoint::Last => Endpoint::QueryLast,
        }
    }
}

fn parse_tag(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) if !k.is_empty() && !v.is_empty() => Ok((k.to_string(), v.to_string())),
        _ => Err(format!("expected key=value, got '{s}'")),
    }
}

fn parse_value(s: &str) -> Result<DataPointValue, String> {
    if let Ok(i) = s.parse::<i64>() {
        return Ok(DataPointValue::Integer(i));
    }
    s.parse::<f64>()
        .map(DataPointValue::Float)
        .map_err(|_| format!("'{s}' is not a number"))
}

fn parse_aggregator(s: &str) -> Result<Aggregator, String> {
    serde_json::from_value(serde_json::Value::String(s.to_lowercase()))
        .map_err(|_| format!("unknown aggregator '{s}'"))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), DriverError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| DriverError::InvalidValue(format!("cannot render reply: {e}")))?;
    println!("{text}");
    Ok(())
}

async fn run(cli: &Cli) -> Result<(), DriverError> {
    let cluster = Cluster::new(cli.conn.host.clone(), cli.conn.port, cli.conn.configuration())?;
    let session = cluster.connect()?;

    let outcome = match &cli.command {
        Command::Put {
            metric,
            value,
            timestamp,
            tags,
            sync,
            no_details,
        } => {
            let ts = timestamp.unwrap_or_else(|| chrono::Utc::now().timestamp());
            let point = DataPoint::new(metric, ts, *value)?.with_tags(tags.iter().cloned());
            session
                .put(&[point], *sync, !no_details)
                .await
                .and_then(|summary| print_json(&summary))
        }
        Command::Query {
            range,
            aggregator,
            downsample,
            endpoint,
        } => {
            let query = range.query(*aggregator, downsample.as_deref());
            session
                .query(&query, (*endpoint).into())
                .await
                .and_then(|results| print_json(&results))
        }
        Command::Delete { range } => {
            let mut query = range.query(Aggregator::Sum, None);
            session
                .delete(&mut query)
                .await
                .and_then(|results| print_json(&results))
        }
        Command::Version => session.version().await.map(|version| println!("{version}")),
    };

    cluster.close();
    outcome
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing();

    if let Err(e) = run(&cli).await {
        eprintln!("Error [{:?}]: {e}", e.kind());
        if let DriverError::PutFailed { errors, .. } = &e {
            for err in errors {
                eprintln!("  {}: {}", err.datapoint, err.error);
            }
        }
        if let Some(trace) = e.server_trace() {
            eprintln!("Server trace:\n{trace}");
        }
        process::exit(1);
    }
}
