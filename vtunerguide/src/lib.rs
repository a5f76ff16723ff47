//! # vtunerguide - Channel guide providers
//!
//! This crate defines the [`GuideProvider`] trait through which the lineup
//! layer obtains channel metadata and programme schedules, independently of
//! where the guide comes from.
//!
//! ## Providers
//!
//! - [`XmlTvProvider`] : an XMLTV document fetched over HTTP(S) or read from
//!   a local file
//!
//! ## Snapshot model
//!
//! Each provider keeps its channels and programmes in a [`GuideSnapshot`].
//! [`GuideProvider::refresh`] is the only mutating operation: it builds a
//! complete new snapshot and swaps it in at once, so concurrent readers of
//! [`GuideProvider::channels`] or [`GuideProvider::schedule`] see either the
//! old or the new guide, never a mix.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use vtunerguide::{ProviderConfig, new_provider};
//!
//! # async fn example() -> vtunerguide::Result<()> {
//! let config = ProviderConfig::xmltv("http://example.org/guide.xml");
//! let provider = new_provider(&config).await?;
//!
//! let channels = provider.channels();
//! let (_, programmes) = provider.schedule(&channels, &[])?;
//! println!("{} programmes for {} channels", programmes.len(), channels.len());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod xmltv;

pub use error::{FetchError, GuideError, Result};
pub use xmltv::{Programme, XmlTvProvider};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;

/// Call sign used when the source does not provide one
pub const UNKNOWN_CALL_SIGN: &str = "UNK";

/// Channel logo
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Logo {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// Channel as described by a guide source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuideChannel {
    /// Identifier used by the source to link programmes to the channel
    pub id: String,
    pub name: String,
    /// Logical channel number, empty when the source has none
    pub number: String,
    pub call_sign: String,
    pub logos: Vec<Logo>,
}

/// A programme together with provider specific data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgrammeEntry {
    pub programme: Programme,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_data: Option<serde_json::Value>,
}

impl ProgrammeEntry {
    pub fn new(programme: Programme) -> Self {
        Self {
            programme,
            provider_data: None,
        }
    }

    /// Identifier of the channel the programme belongs to
    pub fn channel_id(&self) -> &str {
        &self.programme.channel
    }
}

/// Opaque state a provider may hand back to resume a schedule fetch
pub type ContinuationState = serde_json::Map<String, serde_json::Value>;

/// Guide content at a point in time
#[derive(Debug, Clone, Default)]
pub struct GuideSnapshot {
    pub channels: Vec<GuideChannel>,
    pub programmes: Vec<Programme>,
}

/// Kind of guide source
pub const XMLTV_PROVIDER: &str = "xmltv";

/// Provider configuration (`guide` section of the configuration file)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider kind, `xmltv` is the only supported value
    #[serde(default = "default_provider")]
    pub provider: String,
    /// URL or path of the XMLTV document
    #[serde(default, rename = "xmltv")]
    pub xmltv_url: String,
}

fn default_provider() -> String {
    XMLTV_PROVIDER.to_string()
}

impl ProviderConfig {
    pub fn xmltv(url: impl Into<String>) -> Self {
        Self {
            provider: XMLTV_PROVIDER.to_string(),
            xmltv_url: url.into(),
        }
    }

    /// A configuration without source location disables the guide
    pub fn is_configured(&self) -> bool {
        !self.xmltv_url.trim().is_empty()
    }
}

/// Source of channel metadata and programme schedules
///
/// Implementations must be thread-safe (`Send + Sync`) as they are shared
/// between request handlers and the scan task as `Arc<dyn GuideProvider>`.
#[async_trait]
pub trait GuideProvider: Debug + Send + Sync {
    /// Human readable provider name
    fn name(&self) -> &str;

    /// Channels of the current snapshot, in source order
    fn channels(&self) -> Vec<GuideChannel>;

    /// Programmes for the given channels
    ///
    /// Returns only programmes whose channel id is one of `channels`. Performs
    /// no I/O and does not change the provider state. `previous` holds
    /// programmes the caller already knows; providers able to fetch
    /// incrementally return a continuation state to resume from.
    fn schedule(
        &self,
        channels: &[GuideChannel],
        previous: &[ProgrammeEntry],
    ) -> Result<(Option<ContinuationState>, Vec<ProgrammeEntry>)>;

    /// Reloads the guide from its source
    ///
    /// On success the whole snapshot is replaced. On failure the previous
    /// snapshot is kept and a [`FetchError`] is returned. `saved_state` is the
    /// value returned by the previous call, for providers that support it.
    async fn refresh(&self, saved_state: Option<&[u8]>) -> Result<Option<Vec<u8>>>;

    /// Configuration backing the provider
    fn config(&self) -> &ProviderConfig;
}

/// Builds the provider selected by `config`
///
/// The provider is loaded once before being returned, so an unreachable or
/// malformed source fails here.
pub async fn new_provider(config: &ProviderConfig) -> Result<Arc<dyn GuideProvider>> {
    match config.provider.trim().to_lowercase().as_str() {
        XMLTV_PROVIDER => Ok(Arc::new(XmlTvProvider::new(config.clone()).await?)),
        other => Err(GuideError::UnsupportedProvider(other.to_string())),
    }
}
