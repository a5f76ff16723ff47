//! Modèles de données du tuner
//!
//! Les noms de champs JSON/XML suivent ceux des appareils HDHomeRun, que
//! les clients DVR attendent à l'identique.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use vtunerguide::Logo;

/// Source affichée dans `lineup_status.json`
pub const LINEUP_SOURCE: &str = "Cable";

/// Identité de l'appareil émulé, fixe pendant toute la vie du serveur
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    #[serde(default = "default_friendly_name")]
    pub friendly_name: String,
    #[serde(default = "default_manufacturer")]
    pub manufacturer: String,
    #[serde(default = "default_model_number")]
    pub model_number: String,
    #[serde(default = "default_firmware_name")]
    pub firmware_name: String,
    #[serde(default = "default_firmware_version", deserialize_with = "string_or_number")]
    pub firmware_version: String,
    /// Identifiant court (8 caractères hexadécimaux)
    #[serde(default = "default_device_id", deserialize_with = "string_or_number")]
    pub device_id: String,
    #[serde(default)]
    pub device_auth: String,
    /// UUID utilisé pour l'USN SSDP et l'UDN UPnP, sans préfixe `uuid:`
    #[serde(default, rename = "uuid")]
    pub device_uuid: String,
    #[serde(default = "default_tuner_count")]
    pub tuner_count: u32,
}

fn default_friendly_name() -> String {
    "vtuner".to_string()
}

fn default_manufacturer() -> String {
    "Silicondust".to_string()
}

fn default_model_number() -> String {
    "HDTC-2US".to_string()
}

fn default_firmware_name() -> String {
    "hdhomeruntc_atsc".to_string()
}

fn default_firmware_version() -> String {
    "20150826".to_string()
}

fn default_device_id() -> String {
    "12345678".to_string()
}

fn default_tuner_count() -> u32 {
    1
}

impl Default for DeviceIdentity {
    fn default() -> Self {
        Self {
            friendly_name: default_friendly_name(),
            manufacturer: default_manufacturer(),
            model_number: default_model_number(),
            firmware_name: default_firmware_name(),
            firmware_version: default_firmware_version(),
            device_id: default_device_id(),
            device_auth: String::new(),
            device_uuid: String::new(),
            tuner_count: default_tuner_count(),
        }
    }
}

/// Chaîne de la lineup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Numéro de chaîne, unique dans la lineup (ex: "5" ou "5.1")
    #[serde(deserialize_with = "string_or_number")]
    pub number: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub call_sign: String,
    #[serde(default)]
    pub logos: Vec<Logo>,
    /// URL de la source vidéo
    #[serde(default)]
    pub stream_url: String,
    /// Identifiant de la chaîne dans le guide
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guide_id: Option<String>,
    #[serde(default)]
    pub hd: bool,
    #[serde(default)]
    pub favorite: bool,
}

/// Booléen sérialisé en `1`/`0`
///
/// La désérialisation accepte aussi `true`/`false` et leurs formes texte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvertibleBoolean(pub bool);

impl From<bool> for ConvertibleBoolean {
    fn from(value: bool) -> Self {
        Self(value)
    }
}

impl Serialize for ConvertibleBoolean {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(self.0))
    }
}

impl<'de> Deserialize<'de> for ConvertibleBoolean {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bool(bool),
            Int(i64),
            Str(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Bool(b) => Ok(Self(b)),
            Raw::Int(i) => Ok(Self(i != 0)),
            Raw::Str(s) => match s.trim().to_lowercase().as_str() {
                "1" | "true" => Ok(Self(true)),
                "0" | "false" | "" => Ok(Self(false)),
                other => Err(serde::de::Error::custom(format!(
                    "invalid boolean value: {}",
                    other
                ))),
            },
        }
    }
}

/// Entrée de `lineup.json` / `<Program>` de `lineup.xml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineupItem {
    #[serde(rename = "GuideNumber")]
    pub guide_number: String,
    #[serde(rename = "GuideName")]
    pub guide_name: String,
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "HD", default, skip_serializing_if = "Option::is_none")]
    pub hd: Option<ConvertibleBoolean>,
    #[serde(rename = "Favorite", default, skip_serializing_if = "Option::is_none")]
    pub favorite: Option<ConvertibleBoolean>,
    #[serde(rename = "DRM", default, skip_serializing_if = "Option::is_none")]
    pub drm: Option<ConvertibleBoolean>,
    #[serde(rename = "VideoCodec", default, skip_serializing_if = "Option::is_none")]
    pub video_codec: Option<String>,
    #[serde(rename = "AudioCodec", default, skip_serializing_if = "Option::is_none")]
    pub audio_codec: Option<String>,
}

/// Contenu de `discover.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DiscoveryData {
    pub friendly_name: String,
    pub manufacturer: String,
    pub model_number: String,
    pub firmware_name: String,
    pub tuner_count: u32,
    pub firmware_version: String,
    #[serde(rename = "DeviceID")]
    pub device_id: String,
    pub device_auth: String,
    #[serde(rename = "BaseURL")]
    pub base_url: String,
    #[serde(rename = "LineupURL")]
    pub lineup_url: String,
}

/// Contenu de `lineup_status.json`
///
/// Les deux formes n'ont pas de champ discriminant : le client distingue
/// l'état par les champs présents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LineupStatus {
    Scanning {
        #[serde(rename = "ScanInProgress")]
        scan_in_progress: ConvertibleBoolean,
        #[serde(rename = "Progress")]
        progress: u8,
        #[serde(rename = "Found")]
        found: usize,
    },
    Idle {
        #[serde(rename = "ScanInProgress")]
        scan_in_progress: ConvertibleBoolean,
        #[serde(rename = "ScanPossible")]
        scan_possible: ConvertibleBoolean,
        #[serde(rename = "Source")]
        source: String,
        #[serde(rename = "SourceList")]
        source_list: Vec<String>,
    },
}

impl LineupStatus {
    pub fn idle() -> Self {
        Self::Idle {
            scan_in_progress: false.into(),
            scan_possible: true.into(),
            source: LINEUP_SOURCE.to_string(),
            source_list: vec![LINEUP_SOURCE.to_string()],
        }
    }

    pub fn scanning(progress: u8, found: usize) -> Self {
        Self::Scanning {
            scan_in_progress: true.into(),
            progress: progress.min(100),
            found,
        }
    }

    pub fn is_scanning(&self) -> bool {
        matches!(self, Self::Scanning { .. })
    }
}

/// Accepte `5`, `5.1` ou `"5"` là où une chaîne est attendue
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s.trim().to_string(),
        Raw::Int(i) => i.to_string(),
        Raw::Float(f) => f.to_string(),
    })
}
