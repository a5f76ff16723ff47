//! Extension pour intégrer le tuner dans vtunerserver

use crate::api::{TunerApiDoc, TunerState, create_api_router, create_router};
use crate::config_ext::TunerConfigExt;
use crate::lineup::Lineup;
use crate::scan::merge_guide_channels;
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::OpenApi;
use vtunerconfig::Config;
use vtunerguide::{GuideProvider, new_provider};

/// Trait d'extension pour vtunerserver::Server
pub trait TunerServerExt {
    /// Initialise le tuner à partir de la configuration
    ///
    /// Charge le guide s'il est configuré (un guide indisponible est
    /// signalé et ignoré), construit la lineup et enregistre les routes.
    ///
    /// # Routes créées
    ///
    /// - HDHomeRun : `/`, `/device.xml`, `/discover.json`, `/lineup.json`,
    ///   `/lineup.xml`, `/lineup_status.json`, `/lineup.post`,
    ///   `/auto/{channel_id}`
    /// - API : `/api/sessions`
    /// - Swagger : `/swagger-ui/tuner`
    async fn init_tuner(&mut self, config: &Config) -> anyhow::Result<TunerState>;
}

impl TunerServerExt for vtunerserver::Server {
    async fn init_tuner(&mut self, config: &Config) -> anyhow::Result<TunerState> {
        let identity = config.get_device_identity()?;
        let configured = config.get_configured_channels()?;

        let provider: Option<Arc<dyn GuideProvider>> = match config.get_guide_provider_config()? {
            Some(guide) => match new_provider(&guide).await {
                Ok(provider) => {
                    info!("Guide provider {} loaded", provider.name());
                    Some(provider)
                }
                Err(e) => {
                    warn!("Guide unavailable, serving configured channels only: {}", e);
                    None
                }
            },
            None => None,
        };

        let channels = match &provider {
            Some(provider) => merge_guide_channels(&configured, &provider.channels()),
            None => configured.clone(),
        };

        let info = self.info();
        let lineup = Lineup::new(identity, info.base_url, info.http_port).with_channels(channels);
        info!(
            "Lineup \"{}\" with {} channels at {}",
            lineup.identity().friendly_name,
            lineup.channels().len(),
            lineup.base_url()
        );

        let state = TunerState::new(
            lineup,
            provider,
            configured,
            config.get_ffmpeg_path(),
            self.shutdown_token(),
        );

        self.add_router("/", create_router(state.clone())).await;
        self.add_openapi(
            create_api_router(state.gateway.clone()),
            TunerApiDoc::openapi(),
            "tuner",
        )
        .await;

        Ok(state)
    }
}
