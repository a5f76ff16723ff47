use vtunerconfig::init_config;
use vtunerlineup::{TunerConfigExt, TunerServerExt};
use vtunerserver::{LoggingOptions, ServerBuilder};
use vtunerupnp::{SsdpAnnouncer, SsdpDevice};
use vtunerutils::upnp_server_string;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ========== PHASE 1 : Configuration et serveur HTTP ==========

    // Répertoire de configuration en premier argument (sinon VTUNER_CONFIG,
    // ./.vtuner puis ~/.vtuner)
    let config_dir = std::env::args().nth(1).unwrap_or_default();
    let config = init_config(&config_dir)?;

    let mut server = ServerBuilder::from_config("VTuner", &config).build();
    server
        .init_logging(LoggingOptions::from_config(&config))
        .await;

    server
        .add_route("/info", || async {
            serde_json::json!({ "version": env!("CARGO_PKG_VERSION") })
        })
        .await;

    // ========== PHASE 2 : Tuner ==========

    info!("📺 Initializing tuner lineup...");
    let tuner = server.init_tuner(&config).await?;
    let lineup = tuner.store.snapshot();
    info!(
        "✅ {} channel(s) in lineup \"{}\"",
        lineup.channels().len(),
        lineup.identity().friendly_name
    );
    match tuner.gateway.decoder() {
        Some(decoder) => info!("🎬 Streams transcoded with {}", decoder),
        None => info!("↪️ No decoder configured, clients are redirected to the sources"),
    }

    // ========== PHASE 3 : Démarrage ==========

    info!("🌐 Starting HTTP server...");
    server.start().await?;

    let announcer = if config.get_ssdp_enabled() {
        info!("📡 Advertising tuner over SSDP...");
        let device = SsdpDevice::root_device(
            lineup.identity().device_uuid.clone(),
            lineup.discovery_url(),
            upnp_server_string("VTuner", env!("CARGO_PKG_VERSION")),
        );
        match SsdpAnnouncer::start(device, server.shutdown_token().child_token()).await {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!("cannot advertise over SSDP: {}", e);
                None
            }
        }
    } else {
        info!("SSDP disabled");
        None
    };

    info!("✅ VTuner is ready at {}", lineup.base_url());
    info!("Press Ctrl+C to stop...");
    server.wait().await;

    if let Some(announcer) = announcer {
        announcer.wait().await;
    }

    Ok(())
}
