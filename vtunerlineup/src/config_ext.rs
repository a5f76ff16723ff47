//! Extension pour lire la configuration du tuner dans vtunerconfig
//!
//! # Exemple
//!
//! ```rust,ignore
//! use vtunerconfig::get_config;
//! use vtunerlineup::TunerConfigExt;
//!
//! let config = get_config()?;
//! let identity = config.get_device_identity()?;
//! let channels = config.get_configured_channels()?;
//! ```

use crate::model::{Channel, DeviceIdentity};
use anyhow::Result;
use tracing::warn;
use vtunerconfig::Config;
use vtunerguide::ProviderConfig;

/// Trait d'extension pour les sections `discovery`, `iptv`, `guide` et
/// `lineup` de la configuration
pub trait TunerConfigExt {
    /// Annonce SSDP activée (`discovery.ssdp`, vrai par défaut)
    fn get_ssdp_enabled(&self) -> bool;

    /// Chemin du décodeur (`iptv.ffmpeg`), `None` si vide
    fn get_ffmpeg_path(&self) -> Option<String>;

    /// Identité de l'appareil (`discovery.device`)
    ///
    /// L'UUID est généré et sauvegardé au premier appel s'il est absent.
    fn get_device_identity(&self) -> Result<DeviceIdentity>;

    /// Chaînes déclarées dans `lineup.channels`
    fn get_configured_channels(&self) -> Result<Vec<Channel>>;

    /// Source du guide (`guide`), `None` si aucune source n'est configurée
    fn get_guide_provider_config(&self) -> Result<Option<ProviderConfig>>;
}

impl TunerConfigExt for Config {
    fn get_ssdp_enabled(&self) -> bool {
        match self.get_typed::<bool>(&["discovery", "ssdp"]) {
            Ok(enabled) => enabled,
            Err(e) => {
                warn!("Invalid discovery.ssdp value, SSDP enabled: {}", e);
                true
            }
        }
    }

    fn get_ffmpeg_path(&self) -> Option<String> {
        self.get_typed::<Option<String>>(&["iptv", "ffmpeg"])
            .ok()
            .flatten()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
    }

    fn get_device_identity(&self) -> Result<DeviceIdentity> {
        let path = &["discovery", "device"];
        let mut identity = match self.get_typed::<Option<DeviceIdentity>>(path) {
            Ok(identity) => identity.unwrap_or_default(),
            // section absente
            Err(_) if self.get_value(path).is_err() => DeviceIdentity::default(),
            Err(e) => return Err(e.context("invalid discovery.device section")),
        };
        identity.device_uuid = self.get_device_uuid()?;
        Ok(identity)
    }

    fn get_configured_channels(&self) -> Result<Vec<Channel>> {
        match self.get_typed::<Option<Vec<Channel>>>(&["lineup", "channels"]) {
            Ok(channels) => Ok(channels.unwrap_or_default()),
            // section absente
            Err(_) if self.get_value(&["lineup", "channels"]).is_err() => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    fn get_guide_provider_config(&self) -> Result<Option<ProviderConfig>> {
        if self.get_value(&["guide"]).is_err() {
            return Ok(None);
        }
        let config: ProviderConfig = self.get_typed(&["guide"])?;
        Ok(config.is_configured().then_some(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml_str("").unwrap();
        assert!(config.get_ssdp_enabled());
        assert_eq!(config.get_ffmpeg_path(), None);
        assert!(config.get_configured_channels().unwrap().is_empty());
        assert_eq!(config.get_guide_provider_config().unwrap(), None);

        let identity = config.get_device_identity().unwrap();
        assert_eq!(identity.friendly_name, "vtuner");
        assert_eq!(identity.tuner_count, 1);
        assert!(!identity.device_uuid.is_empty());
    }

    #[test]
    fn test_tuner_sections() {
        let config = Config::from_yaml_str(
            r#"
discovery:
  ssdp: false
  device:
    friendly_name: salon
    device_id: 1234ABCD
    uuid: "uuid:0000-1111"
iptv:
  ffmpeg: /usr/bin/ffmpeg
guide:
  xmltv: http://guide.example/xmltv.xml
lineup:
  channels:
    - number: 5
      name: France 5
      stream_url: http://source/5.m3u8
      guide_id: France5.fr
      hd: true
    - number: "6.1"
      stream_url: http://source/6.m3u8
"#,
        )
        .unwrap();

        assert!(!config.get_ssdp_enabled());
        assert_eq!(config.get_ffmpeg_path().as_deref(), Some("/usr/bin/ffmpeg"));

        let identity = config.get_device_identity().unwrap();
        assert_eq!(identity.friendly_name, "salon");
        assert_eq!(identity.device_id, "1234ABCD");
        assert_eq!(identity.device_uuid, "0000-1111");
        // valeurs par défaut conservées
        assert_eq!(identity.manufacturer, "Silicondust");

        let channels = config.get_configured_channels().unwrap();
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0].number, "5");
        assert!(channels[0].hd);
        assert_eq!(channels[0].guide_id.as_deref(), Some("France5.fr"));
        assert_eq!(channels[1].number, "6.1");

        let guide = config.get_guide_provider_config().unwrap().unwrap();
        assert_eq!(guide.provider, "xmltv");
        assert_eq!(guide.xmltv_url, "http://guide.example/xmltv.xml");
    }

    #[test]
    fn test_malformed_identity_is_an_error() {
        let config = Config::from_yaml_str(
            r#"
discovery:
  device:
    friendly_name: salon
    tuner_count: two
"#,
        )
        .unwrap();

        let err = config.get_device_identity().unwrap_err();
        assert!(err.to_string().contains("discovery.device"));
    }
}
