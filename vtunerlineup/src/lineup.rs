//! Lineup du tuner et son stockage partagé

use crate::error::{Result, TunerError};
use crate::model::{Channel, DeviceIdentity, DiscoveryData, LineupItem};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, warn};
use vtunerupnp::DeviceDescription;

/// Liste ordonnée des chaînes servies par le tuner
///
/// Les numéros de chaîne sont uniques : une insertion en double est ignorée
/// et signalée dans les logs.
#[derive(Debug, Clone, PartialEq)]
pub struct Lineup {
    identity: DeviceIdentity,
    advertise_host: String,
    port: u16,
    channels: Vec<Channel>,
}

impl Lineup {
    /// Lineup vide
    ///
    /// `advertise_host` est l'hôte donné aux clients dans les URLs
    /// (jamais `0.0.0.0`).
    pub fn new(identity: DeviceIdentity, advertise_host: impl Into<String>, port: u16) -> Self {
        Self {
            identity,
            advertise_host: advertise_host.into(),
            port,
            channels: Vec::new(),
        }
    }

    pub fn with_channels(mut self, channels: impl IntoIterator<Item = Channel>) -> Self {
        self.set_channels(channels);
        self
    }

    /// Ajoute une chaîne, sauf si son numéro est déjà pris
    pub fn insert_channel(&mut self, channel: Channel) -> bool {
        if self.channels.iter().any(|c| c.number == channel.number) {
            warn!(
                number = %channel.number,
                name = %channel.name,
                "Duplicate channel number, keeping the first one"
            );
            return false;
        }
        debug!(number = %channel.number, name = %channel.name, "Channel added to lineup");
        self.channels.push(channel);
        true
    }

    /// Remplace toutes les chaînes
    pub fn set_channels(&mut self, channels: impl IntoIterator<Item = Channel>) {
        self.channels.clear();
        for channel in channels {
            self.insert_channel(channel);
        }
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    /// Recherche une chaîne par numéro
    pub fn channel(&self, number: &str) -> Result<&Channel> {
        self.channels
            .iter()
            .find(|c| c.number == number)
            .ok_or_else(|| TunerError::ChannelNotFound(number.to_string()))
    }

    /// `<hôte>:<port>` tel qu'annoncé aux clients
    pub fn base_address(&self) -> String {
        format!("{}:{}", self.advertise_host, self.port)
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.base_address())
    }

    /// URL de la description UPnP, utilisée comme LOCATION SSDP
    pub fn discovery_url(&self) -> String {
        format!("{}/device.xml", self.base_url())
    }

    /// URL de la passerelle de streaming pour une chaîne
    pub fn stream_url(&self, channel: &Channel) -> String {
        format!("{}/auto/v{}", self.base_url(), channel.number)
    }

    pub fn lineup_item(&self, channel: &Channel) -> LineupItem {
        LineupItem {
            guide_number: channel.number.clone(),
            guide_name: channel.name.clone(),
            url: self.stream_url(channel),
            hd: channel.hd.then_some(true.into()),
            favorite: channel.favorite.then_some(true.into()),
            drm: None,
            video_codec: None,
            audio_codec: None,
        }
    }

    pub fn lineup_items(&self) -> Vec<LineupItem> {
        self.channels.iter().map(|c| self.lineup_item(c)).collect()
    }

    pub fn discovery_data(&self) -> DiscoveryData {
        let identity = &self.identity;
        DiscoveryData {
            friendly_name: identity.friendly_name.clone(),
            manufacturer: identity.manufacturer.clone(),
            model_number: identity.model_number.clone(),
            firmware_name: identity.firmware_name.clone(),
            tuner_count: identity.tuner_count,
            firmware_version: identity.firmware_version.clone(),
            device_id: identity.device_id.clone(),
            device_auth: identity.device_auth.clone(),
            base_url: self.base_url(),
            lineup_url: format!("{}/lineup.json", self.base_url()),
        }
    }

    pub fn device_description(&self) -> DeviceDescription {
        let identity = &self.identity;
        DeviceDescription {
            url_base: self.base_url(),
            friendly_name: identity.friendly_name.clone(),
            manufacturer: identity.manufacturer.clone(),
            model_name: identity.model_number.clone(),
            model_number: identity.model_number.clone(),
            serial_number: identity.device_id.clone(),
            ..DeviceDescription::media_server(&identity.device_uuid)
        }
    }
}

/// Lineup partagée entre les handlers et la tâche de scan
///
/// Les lecteurs obtiennent un instantané (`Arc`) ; un remplacement change la
/// lineup d'un bloc.
#[derive(Debug)]
pub struct LineupStore {
    current: RwLock<Arc<Lineup>>,
}

impl LineupStore {
    pub fn new(lineup: Lineup) -> Self {
        Self {
            current: RwLock::new(Arc::new(lineup)),
        }
    }

    pub fn snapshot(&self) -> Arc<Lineup> {
        self.current.read().clone()
    }

    pub fn replace(&self, lineup: Lineup) {
        *self.current.write() = Arc::new(lineup);
    }

    /// Remplace la liste des chaînes en gardant identité et adresse
    pub fn replace_channels(&self, channels: Vec<Channel>) -> usize {
        let mut lineup = (*self.snapshot()).clone();
        lineup.set_channels(channels);
        let count = lineup.channels().len();
        self.replace(lineup);
        count
    }
}
