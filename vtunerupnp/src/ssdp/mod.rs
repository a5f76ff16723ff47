//! # Module SSDP - Simple Service Discovery Protocol
//!
//! Annonce le tuner comme root device UPnP pour que les clients DVR le
//! découvrent sans configuration.
//!
//! ## Fonctionnalités
//!
//! - Envoi de NOTIFY alive/byebye en multicast
//! - Réponse aux M-SEARCH en unicast
//! - Annonces périodiques avec reprise progressive après un échec d'envoi
//! - Arrêt propre avec byebye sur annulation
//!
//! ## Architecture
//!
//! - [`SsdpAnnouncer`] : tâches d'annonce et de réponse
//! - [`SsdpDevice`] : représentation d'un device pour SSDP
//! - [`messages`] : construction et analyse des messages
//!
//! ## Constantes SSDP
//!
//! - **Multicast Address**: 239.255.255.250:1900
//! - **Max-Age**: 1800 secondes
//! - **Heartbeat**: 15 secondes

mod announcer;
mod device;
pub mod messages;

pub use announcer::{AnnouncerHandle, Backoff, SsdpAnnouncer};
pub use device::{MEDIA_SERVER_DEVICE_TYPE, SsdpDevice};

use std::time::Duration;

/// Adresse multicast SSDP
pub const SSDP_MULTICAST_ADDR: &str = "239.255.255.250";

/// Port SSDP
pub const SSDP_PORT: u16 = 1900;

/// Durée de validité des annonces (en secondes)
pub const MAX_AGE: u32 = 1800;

/// Intervalle entre deux `ssdp:alive`
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Premier délai de reprise après un échec d'envoi
pub const INITIAL_RETRY_DELAY: Duration = Duration::from_secs(1);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heartbeat_is_well_below_lease() {
        // plusieurs annonces doivent tenir dans une durée de validité
        assert!(HEARTBEAT_INTERVAL * 10 < Duration::from_secs(MAX_AGE as u64));
    }
}
