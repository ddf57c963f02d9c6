//! CarbonLink simulated device.
//!
//! Runs one creator or burner node: a simulated CO2/humidity sensor feeds the
//! tick scheduler, which keeps the credit ledger, raises alerts and publishes
//! telemetry over MQTT (default) or HTTP.
//!
//! ```text
//! carbonlink-device --role burner --broker localhost:1883 --api-key burner-01
//! carbonlink-device --role creator --http http://localhost:3000/api/carbon-creator
//! carbonlink-device --http https://api.example.org/burner --http-auth header --api-key burner-01
//! carbonlink-device --config device.json --ticks 120 --seed 7
//! ```
//!
//! `RUST_LOG` controls verbosity; the default is `info`.

mod shutdown;
mod simulated;
mod transport;

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use clap::{Parser, ValueEnum};
use log::{info, warn};

use carbonlink_connectors::{HttpAuth, HttpConfig, HttpPublisher, MqttConfig, MqttPublisher};
use carbonlink_core::time::MonotonicClock;
use carbonlink_core::traits::TransportStatus;
use carbonlink_core::{DeviceConfig, DispatchOutcome, Role, TickDriver, TickScheduler};

use crate::simulated::SimulatedSensor;
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RoleArg {
    Creator,
    Burner,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Creator => Role::Creator,
            RoleArg::Burner => Role::Burner,
        }
    }
}

/// Credentials sent with HTTP requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum HttpAuthArg {
    /// No credentials
    None,
    /// API key as a bearer token
    Bearer,
    /// Username and password
    Basic,
    /// API key in the header named by --auth-header
    Header,
}

#[derive(Debug, Parser)]
#[command(name = "carbonlink-device", version, about = "Simulated CarbonLink creator/burner device")]
struct Args {
    /// JSON device configuration; role defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Device role, overrides the configuration file
    #[arg(short, long, value_enum)]
    role: Option<RoleArg>,

    /// MQTT broker as host[:port]
    #[arg(short, long, default_value = "localhost:1883")]
    broker: String,

    /// Post to this HTTP base URL instead of using MQTT
    #[arg(long, value_name = "URL")]
    http: Option<String>,

    /// How HTTP requests authenticate
    #[arg(long, value_enum, default_value = "bearer")]
    http_auth: HttpAuthArg,

    /// Header carrying the API key with `--http-auth header`
    #[arg(long, default_value = "X-API-Key")]
    auth_header: String,

    /// First segment of every MQTT topic
    #[arg(long, default_value = "carbonlink")]
    topic_prefix: String,

    /// Device key used in MQTT topics and for HTTP authentication
    #[arg(long, default_value = "device")]
    api_key: String,

    /// MQTT client id; derived from the role when omitted
    #[arg(long)]
    device_id: Option<String>,

    /// MQTT or HTTP basic-auth username
    #[arg(long, requires = "password")]
    username: Option<String>,

    /// MQTT or HTTP basic-auth password
    #[arg(long, requires = "username")]
    password: Option<String>,

    /// Stop after this many ticks
    #[arg(long)]
    ticks: Option<u64>,

    /// Seed for the simulated sensor
    #[arg(long)]
    seed: Option<u64>,

    /// Fraction of sensor reads that fail, 0.0 to 1.0
    #[arg(long, default_value_t = 0.0)]
    fault_rate: f64,
}

fn load_config(path: Option<&Path>, role: Option<Role>) -> anyhow::Result<DeviceConfig> {
    let config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str::<DeviceConfig>(&text)
                .with_context(|| format!("invalid configuration in {}", path.display()))?
        }
        None => DeviceConfig::for_role(role.unwrap_or_default()),
    };

    // The file may already tune the requested role; only switch when it differs.
    Ok(match role {
        Some(role) if role != config.role => config.with_role(role),
        _ => config,
    })
}

fn http_auth(args: &Args) -> anyhow::Result<HttpAuth> {
    Ok(match args.http_auth {
        HttpAuthArg::None => HttpAuth::Anonymous,
        HttpAuthArg::Bearer => HttpAuth::Bearer(args.api_key.clone()),
        HttpAuthArg::Basic => match (&args.username, &args.password) {
            (Some(username), Some(password)) => HttpAuth::Basic {
                username: username.clone(),
                password: password.clone(),
            },
            _ => bail!("--http-auth basic needs --username and --password"),
        },
        HttpAuthArg::Header => HttpAuth::KeyHeader {
            header: args.auth_header.clone(),
            key: args.api_key.clone(),
        },
    })
}

fn build_transport(args: &Args, role: Role) -> anyhow::Result<Transport> {
    if let Some(base_url) = &args.http {
        let config = HttpConfig::new(base_url.as_str()).auth(http_auth(args)?);
        let publisher = HttpPublisher::new(config).context("invalid HTTP settings")?;
        return Ok(Transport::Http(publisher));
    }

    let client_id = args
        .device_id
        .clone()
        .unwrap_or_else(|| format!("carbonlink-{}-{}", role, std::process::id()));

    let mut config = MqttConfig::from_broker(&args.broker)
        .context("invalid broker address")?
        .client_id(client_id)
        .topic_prefix(args.topic_prefix.as_str())
        .api_key(args.api_key.as_str());
    if let (Some(user), Some(pass)) = (&args.username, &args.password) {
        config = config.credentials(user.as_str(), pass.as_str());
    }

    let publisher = MqttPublisher::new(config).context("invalid MQTT settings")?;
    Ok(Transport::Mqtt(publisher))
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref(), args.role.map(Role::from))?;
    let role = config.role;

    let mut transport = build_transport(&args, role)?;
    info!("Starting {} device over {}", role, transport.name());
    if let Err(e) = transport.reconnect() {
        warn!("Initial connection failed ({}), will retry in the background", e);
    }

    let sensor = SimulatedSensor::for_role(role, args.seed).with_fault_rate(args.fault_rate);
    let period = config.tick_period;
    let mut scheduler = TickScheduler::new(config, sensor, transport, MonotonicClock::new())
        .map_err(|e| anyhow!("invalid device configuration: {}", e))?;

    let shutdown = Arc::new(AtomicBool::new(false));
    shutdown::install(Arc::clone(&shutdown))?;

    let mut driver = TickDriver::new(period).with_shutdown(shutdown);
    if let Some(ticks) = args.ticks {
        driver = driver.with_max_ticks(ticks);
    }

    driver.run(&mut scheduler, |report, state| {
        if report.replenished {
            info!("Auto-purchased credits, balance {:.1}", state.ledger().available());
        }
        match report.aggregate {
            Some(DispatchOutcome::Sent) => info!("{}", state.status_line()),
            Some(DispatchOutcome::Failed(e)) => warn!("Aggregate publish failed: {}", e),
            _ => {}
        }
    });

    info!("Final state {}", scheduler.state().status_line());
    let stats = scheduler.transport().stats();
    info!(
        "Transport: {} sent ({} bytes), {} failed, {} reconnections",
        stats.messages_sent, stats.bytes_sent, stats.messages_failed, stats.reconnections
    );
    if let Some(error) = &stats.last_error {
        info!("Last transport error: {}", error);
    }

    Ok(())
}
