use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::{debug, info, warn};
use marine_sens::config::{read_records, AppConfig, FileConfigStore, SENSORS_FILE};
use marine_sens::core::{PipelineCommand, RegistryEvent, SensorRegistry, TelemetryPipeline};
use marine_sens::decoders::MessageProcessor;
use marine_sens::demo::Simulator;
use marine_sens_core::{ConversionRegistry, SystemClock};
use marine_sens_types::{ParsedMessage, UnitRegion};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot};

const TICK_INTERVAL: Duration = Duration::from_millis(50);
const CHANNEL_CAPACITY: usize = 1024;

/// marine-sens - NMEA 0183 / NMEA 2000 sensor telemetry pipeline
#[derive(Parser, Debug, Clone)]
#[command(name = "marine-sens")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Debug verbosity level (0=quiet, 1=info, 2=debug, 3=trace)
    #[arg(short = 'd', long = "debug", value_name = "LEVEL", default_value = "0")]
    debug: u8,

    /// Configuration file (defaults to the user config directory)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// JSON-lines file of parsed messages to replay, or `-` for stdin
    #[arg(short = 'i', long = "input", value_name = "FILE")]
    input: Option<String>,

    /// Unit region (metric, imperial, nautical-eu, nautical-us)
    #[arg(short = 'r', long = "region", value_name = "REGION", value_parser = parse_region)]
    region: Option<UnitRegion>,

    /// IANA timezone for local date/time values (e.g. Europe/Berlin)
    #[arg(short = 't', long = "timezone", value_name = "TZ")]
    timezone: Option<String>,

    /// Run the built-in simulator for this many seconds
    #[arg(short = 's', long = "simulate", value_name = "SECONDS")]
    simulate: Option<u64>,

    /// Print the final sensor snapshots as JSON
    #[arg(long = "dump")]
    dump: bool,
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Parse a region name, accepting kebab and camel case
fn parse_region(s: &str) -> Result<UnitRegion, String> {
    let wanted = normalize(s);
    UnitRegion::ALL
        .into_iter()
        .find(|region| normalize(region.as_str()) == wanted)
        .ok_or_else(|| format!("Unknown region '{}'", s))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Level 0 (default): warn only
    // Level 1: info
    // Level 2: debug
    // Level 3+: trace
    let log_level = match cli.debug {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    // Allow RUST_LOG to override CLI setting
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    info!("Starting marine-sens v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load().context("Failed to load configuration")?,
    };
    if let Some(region) = cli.region {
        config.presentation.region = region;
    }
    if let Some(timezone) = &cli.timezone {
        config.presentation.timezone = Some(timezone.clone());
    }
    config.validate()?;

    // Sensor records live next to the configuration file
    let sensors_path = match &cli.config {
        Some(path) => path
            .parent()
            .map(|dir| dir.join(SENSORS_FILE))
            .unwrap_or_else(|| PathBuf::from(SENSORS_FILE)),
        None => AppConfig::config_dir()?.join(SENSORS_FILE),
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(run(cli, config, sensors_path))
}

async fn run(cli: Cli, config: AppConfig, sensors_path: PathBuf) -> Result<()> {
    let conversions = Arc::new(ConversionRegistry::new().context("Invalid unit conversion table")?);
    let mut registry = SensorRegistry::new(
        FileConfigStore::new(&sensors_path),
        conversions,
        config.presentation.clone(),
        config.registry_config(),
    );
    registry.on_event(log_event);

    let pipeline = TelemetryPipeline::new(
        MessageProcessor::new(config.talker_table()),
        registry,
        config.enrichment.debounce_ms,
        Box::new(SystemClock),
    );

    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    tokio::spawn(load_sensor_config(sensors_path, tx.clone()));

    let producer = tx;
    tokio::spawn(async move {
        if let Err(e) = produce(&cli, &producer).await {
            warn!("Input stopped: {:#}", e);
        }
        if cli.dump {
            dump_snapshots(&producer).await;
        }
        let _ = producer.send(PipelineCommand::Shutdown).await;
    });

    let pipeline = pipeline.run(rx, TICK_INTERVAL).await;
    let stats = pipeline.stats();
    info!(
        "{} messages, {} rejected, {} sensor updates, {} alarm events",
        stats.messages, stats.rejected, stats.sensor_updates, stats.alarm_events
    );
    for (message_type, count) in pipeline.processor().diagnostics().counts() {
        info!("Unsupported {}: {} messages", message_type, count);
    }
    Ok(())
}

/// Trace registry events; alarms themselves are logged by the registry
fn log_event(event: &RegistryEvent) {
    match event {
        RegistryEvent::Created(key) => debug!("Created event for {}", key),
        RegistryEvent::Updated(update) => debug!(
            "{}[{}] updated: {}",
            update.sensor_type,
            update.instance,
            update.changed_metric_keys.join(", ")
        ),
        RegistryEvent::Alarm(alarm) => debug!(
            "Alarm event {}[{}].{} -> {}",
            alarm.sensor_type,
            alarm.instance,
            alarm.metric_key,
            alarm.level.as_str()
        ),
        RegistryEvent::Removed(key) => debug!("Removed event for {}", key),
    }
}

async fn send(tx: &mpsc::Sender<PipelineCommand>, command: PipelineCommand) -> Result<()> {
    tx.send(command)
        .await
        .map_err(|_| anyhow!("Pipeline is no longer running"))
}

/// Read persisted sensor configuration and hand it to the pipeline
async fn load_sensor_config(path: PathBuf, tx: mpsc::Sender<PipelineCommand>) {
    let records = match read_records(&path).await {
        Ok(records) => {
            info!("Loaded {} sensor configurations from {}", records.len(), path.display());
            records
        }
        Err(e) => {
            warn!("Starting without saved sensor configuration: {:#}", e);
            Default::default()
        }
    };
    if let Err(e) = send(&tx, PipelineCommand::HydrationLoaded(records)).await {
        debug!("{}", e);
    }
}

async fn dump_snapshots(tx: &mpsc::Sender<PipelineCommand>) {
    let (reply, snapshot) = oneshot::channel();
    if send(tx, PipelineCommand::Snapshot(reply)).await.is_err() {
        return;
    }
    match snapshot.await {
        Ok(snapshots) => match serde_json::to_string_pretty(&snapshots) {
            Ok(json) => println!("{}", json),
            Err(e) => warn!("Failed to serialize snapshots: {}", e),
        },
        Err(_) => warn!("Pipeline stopped before the snapshot was taken"),
    }
}

async fn produce(cli: &Cli, tx: &mpsc::Sender<PipelineCommand>) -> Result<()> {
    match (&cli.input, cli.simulate) {
        (Some(input), _) if input == "-" => replay(BufReader::new(tokio::io::stdin()), tx).await,
        (Some(input), _) => {
            let file = tokio::fs::File::open(input)
                .await
                .with_context(|| format!("Failed to open {}", input))?;
            replay(BufReader::new(file), tx).await
        }
        (None, Some(seconds)) => simulate(seconds, tx).await,
        (None, None) => {
            warn!("No --input or --simulate given, nothing to do");
            Ok(())
        }
    }
}

/// Send one `ParsedMessage` per non-empty line
async fn replay<R: AsyncBufRead + Unpin>(reader: R, tx: &mpsc::Sender<PipelineCommand>) -> Result<()> {
    let mut lines = reader.lines();
    let mut line_number = 0;
    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ParsedMessage>(&line) {
            Ok(msg) => send(tx, PipelineCommand::Message(msg)).await?,
            Err(e) => warn!("Line {}: not a parsed message: {}", line_number, e),
        }
    }
    info!("Replayed {} lines", line_number);
    Ok(())
}

async fn simulate(seconds: u64, tx: &mpsc::Sender<PipelineCommand>) -> Result<()> {
    let mut simulator = Simulator::new();
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    for _ in 0..seconds {
        interval.tick().await;
        let now = chrono::Utc::now().timestamp_millis();
        for msg in simulator.next_batch(now) {
            send(tx, PipelineCommand::Message(msg)).await?;
        }
    }
    Ok(())
}
