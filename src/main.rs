use std::future;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use log::{info, warn};

use coap_node::handlers::{DigestHandler, SensorInit, TemperatureHandler, EXCHANGE_LIFETIME};
use coap_node::sensor::{TemperatureSensor, Unavailable, W1Thermometer};
use coap_node::{node, CoapServer, UdpTransport};

#[derive(Parser)]
#[command(about = "CoAP echo, SHA-256 and temperature node")]
struct Opts {
    #[arg(long, env = "COAP_NODE_BIND", default_value = "0.0.0.0:5683", help = "UDP address to listen on")]
    bind: String,

    #[arg(long, env = "COAP_NODE_MTU", help = "Largest reply to send, in bytes")]
    mtu: Option<u32>,

    #[arg(
        long,
        env = "COAP_NODE_SENSOR",
        help = "1-Wire thermometer device directory, e.g. /sys/bus/w1/devices/28-0316a2795dff"
    )]
    sensor: Option<std::path::PathBuf>,

    #[arg(long, env = "COAP_NODE_SENSOR_INIT", value_enum, default_value_t = InitPolicy::Once)]
    sensor_init: InitPolicy,

    #[arg(
        long,
        env = "COAP_NODE_DIGEST_TIMEOUT",
        help = "Seconds an unfinished /sha256 upload is kept [default: 247]"
    )]
    digest_timeout: Option<u64>,

    #[arg(long, help = "Do not serve /.well-known/core")]
    no_discovery: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum InitPolicy {
    Once,
    EveryRequest,
}

impl From<InitPolicy> for SensorInit {
    fn from(policy: InitPolicy) -> Self {
        match policy {
            InitPolicy::Once => SensorInit::Once,
            InitPolicy::EveryRequest => SensorInit::EveryRequest,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opts = Opts::parse();

    let sensor: Box<dyn TemperatureSensor> = match &opts.sensor {
        Some(dir) => {
            info!("Reading temperature from {}", dir.display());
            Box::new(W1Thermometer::new(dir))
        }
        None => {
            warn!("No sensor configured, /temp will answer 5.00");
            Box::new(Unavailable)
        }
    };
    let temperature = TemperatureHandler::new(sensor).init_policy(opts.sensor_init.into());

    let digest_timeout = opts
        .digest_timeout
        .map_or(EXCHANGE_LIFETIME, Duration::from_secs);
    let digest = DigestHandler::new().session_timeout(digest_timeout);

    let mut app = node::app(digest, temperature.clone());
    if opts.no_discovery {
        app = app.not_discoverable();
    }

    let mut transport = UdpTransport::new(opts.bind.clone());
    if let Some(mtu) = opts.mtu {
        transport = transport.set_mtu(mtu);
    }

    let server = CoapServer::bind(transport)
        .await
        .with_context(|| format!("binding {}", opts.bind))?;
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl-C, running until killed: {e}");
            future::pending::<()>().await;
        }
    };
    let served = server.serve_until(app, shutdown).await;

    temperature.shutdown().await;
    served.context("server stopped")
}
