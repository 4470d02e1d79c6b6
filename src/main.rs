use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use log::*;
use tokio::runtime::Handle;

use heatpump_modbus::bridge::{Bridge, EndpointHandler, ModbusBridge, SlaveEndpoint};
use heatpump_modbus::comms::CommunicationInterface;
use heatpump_modbus::config::AppConfig;
use heatpump_modbus::handler::HeatPumpHandler;
use heatpump_modbus::logging;
use heatpump_modbus::thing::{LoggingCallback, ThingCallback, ThingStatus};
use heatpump_modbus::transport::{spawn_channel, ModbusComms, TransportSettings};

type Error = Box<dyn std::error::Error>;

/// Polls a Lambda heat pump over Modbus and logs its channel states.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, default_value = "heatpump.toml")]
    config: PathBuf,

    /// Overrides `log_level` from the configuration
    #[arg(short, long, env = "HEATPUMP_LOG")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();
    let config = AppConfig::load(&args.config)?;
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.log_level)
        .parse::<LevelFilter>()?;
    logging::setup(level)?;
    debug!("Loaded {:?}", config);

    let mut channel = spawn_channel(&config.endpoint);
    channel.enable().await?;

    let comms: Arc<dyn CommunicationInterface> = Arc::new(ModbusComms::new(
        channel,
        TransportSettings::from(&config.endpoint),
        Handle::current(),
    ));
    let endpoint: Arc<dyn EndpointHandler> =
        Arc::new(SlaveEndpoint::new(config.endpoint.slave_id, Some(comms)));
    let bridge = Arc::new(ModbusBridge::new(config.endpoint.label(), Some(endpoint)));
    let shared_bridge: Arc<dyn Bridge> = bridge.clone();
    let callback: Arc<dyn ThingCallback> = Arc::new(LoggingCallback);

    let handlers: Vec<Arc<HeatPumpHandler>> = config
        .things
        .iter()
        .map(|thing| {
            let handler = Arc::new(HeatPumpHandler::new(
                thing.thing_uid(),
                Some(shared_bridge.clone()),
                callback.clone(),
                config.endpoint.timeout(),
            ));
            let listener = Arc::downgrade(&handler);
            bridge.attach(listener);
            handler.initialize(thing.clone());
            handler
        })
        .collect();
    info!("Polling {} thing(s) on {}", handlers.len(), config.endpoint.label());
    bridge.set_status(ThingStatus::Online);

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    bridge.set_status(ThingStatus::Offline);
    for handler in &handlers {
        handler.dispose();
    }
    Ok(())
}
