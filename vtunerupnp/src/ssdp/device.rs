//! Représentation d'un device SSDP

/// Type UPnP annoncé par le tuner
pub const MEDIA_SERVER_DEVICE_TYPE: &str = "urn:schemas-upnp-org:device:MediaServer:1";

/// Device SSDP avec ses métadonnées pour les annonces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsdpDevice {
    /// UUID du device (sans le préfixe "uuid:")
    pub uuid: String,

    /// Type du device (ex: "urn:schemas-upnp-org:device:MediaServer:1")
    pub device_type: String,

    /// URL de la description du device
    pub location: String,

    /// Identifiant du serveur (ex: "Linux/6.5 UPnP/1.0 VTuner/0.1.0")
    pub server: String,

    /// Types de notification (NT) envoyés dans les NOTIFY
    pub notification_types: Vec<String>,
}

impl SsdpDevice {
    /// Crée le root device du tuner
    ///
    /// Seul `upnp:rootdevice` est annoncé ; l'UUID et le type de device
    /// restent accessibles par M-SEARCH.
    pub fn root_device(
        uuid: impl Into<String>,
        location: impl Into<String>,
        server: impl Into<String>,
    ) -> Self {
        let uuid = uuid.into();
        let uuid = uuid.strip_prefix("uuid:").unwrap_or(&uuid).to_string();
        Self {
            uuid,
            device_type: MEDIA_SERVER_DEVICE_TYPE.to_string(),
            location: location.into(),
            server: server.into(),
            notification_types: vec!["upnp:rootdevice".to_string()],
        }
    }

    /// Retourne la liste des types de notification
    pub fn get_notification_types(&self) -> &[String] {
        &self.notification_types
    }

    /// Cibles auxquelles ce device répond lors d'un M-SEARCH
    pub fn search_targets(&self) -> Vec<String> {
        let mut targets = self.notification_types.clone();
        for extra in [format!("uuid:{}", self.uuid), self.device_type.clone()] {
            if !targets.contains(&extra) {
                targets.push(extra);
            }
        }
        targets
    }

    /// USN associé à un type de notification
    pub fn usn(&self, nt: &str) -> String {
        if nt.starts_with("uuid:") {
            nt.to_string()
        } else {
            format!("uuid:{}::{}", self.uuid, nt)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> SsdpDevice {
        SsdpDevice::root_device(
            "uuid:1234",
            "http://10.0.0.2:6077/device.xml",
            "Linux/6.5 UPnP/1.0 VTuner/0.1.0",
        )
    }

    #[test]
    fn test_root_device_announces_rootdevice_only() {
        let d = device();
        assert_eq!(d.uuid, "1234");
        assert_eq!(d.get_notification_types(), ["upnp:rootdevice".to_string()]);
    }

    #[test]
    fn test_usn_format() {
        let d = device();
        assert_eq!(d.usn("upnp:rootdevice"), "uuid:1234::upnp:rootdevice");
        assert_eq!(d.usn("uuid:1234"), "uuid:1234");
    }

    #[test]
    fn test_search_targets() {
        let targets = device().search_targets();
        assert_eq!(
            targets,
            vec![
                "upnp:rootdevice".to_string(),
                "uuid:1234".to_string(),
                MEDIA_SERVER_DEVICE_TYPE.to_string(),
            ]
        );
    }
}
