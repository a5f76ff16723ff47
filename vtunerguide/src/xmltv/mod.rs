//! XMLTV guide provider

pub mod model;

pub use model::Programme;

use crate::{
    ContinuationState, FetchError, GuideChannel, GuideProvider, GuideSnapshot, Logo,
    ProgrammeEntry, ProviderConfig, Result, UNKNOWN_CALL_SIGN,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Guide provider backed by an XMLTV document
///
/// The document is reloaded in full on every [`GuideProvider::refresh`].
#[derive(Debug)]
pub struct XmlTvProvider {
    config: ProviderConfig,
    snapshot: RwLock<Arc<GuideSnapshot>>,
}

impl XmlTvProvider {
    /// Creates the provider and loads the document once
    ///
    /// Fails with the fetch error when the initial load fails.
    pub async fn new(config: ProviderConfig) -> Result<Self> {
        let provider = Self {
            config,
            snapshot: RwLock::new(Arc::new(GuideSnapshot::default())),
        };
        provider.refresh(None).await?;
        Ok(provider)
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<GuideSnapshot> {
        self.snapshot.read().clone()
    }

    async fn fetch(&self) -> std::result::Result<String, FetchError> {
        let location = self.config.xmltv_url.trim();
        if location.is_empty() {
            return Err(FetchError::MissingSource);
        }

        if location.starts_with("http://") || location.starts_with("https://") {
            let http_err = |source| FetchError::Http {
                url: location.to_string(),
                source,
            };
            let response = reqwest::get(location).await.map_err(http_err)?;
            if !response.status().is_success() {
                return Err(FetchError::Status {
                    url: location.to_string(),
                    status: response.status(),
                });
            }
            response.text().await.map_err(http_err)
        } else {
            let path = location.strip_prefix("file://").unwrap_or(location);
            let bytes = tokio::fs::read(path).await.map_err(|source| FetchError::Io {
                path: path.to_string(),
                source,
            })?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
    }
}

/// Maps an XMLTV channel entry to the guide channel shape
fn to_guide_channel(channel: &model::Channel) -> GuideChannel {
    let name = channel
        .display_names
        .first()
        .map(|n| n.value.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| channel.id.clone());

    let logos = channel
        .icons
        .iter()
        .map(|icon| Logo {
            url: icon.source.clone(),
            width: icon.width.as_deref().and_then(|w| w.trim().parse().ok()),
            height: icon.height.as_deref().and_then(|h| h.trim().parse().ok()),
        })
        .collect();

    GuideChannel {
        id: channel.id.clone(),
        name,
        number: channel.lcn.clone().unwrap_or_default().trim().to_string(),
        call_sign: UNKNOWN_CALL_SIGN.to_string(),
        logos,
    }
}

#[async_trait]
impl GuideProvider for XmlTvProvider {
    fn name(&self) -> &str {
        "XMLTV"
    }

    fn channels(&self) -> Vec<GuideChannel> {
        self.snapshot.read().channels.clone()
    }

    fn schedule(
        &self,
        channels: &[GuideChannel],
        previous: &[ProgrammeEntry],
    ) -> Result<(Option<ContinuationState>, Vec<ProgrammeEntry>)> {
        let wanted: HashSet<&str> = channels.iter().map(|c| c.id.as_str()).collect();
        let snapshot = self.snapshot();

        let mut programmes: Vec<ProgrammeEntry> = snapshot
            .programmes
            .iter()
            .filter(|p| wanted.contains(p.channel.as_str()))
            .cloned()
            .map(ProgrammeEntry::new)
            .collect();

        // programmes already known to the caller and absent from the document
        let listed: HashSet<(String, String)> = programmes
            .iter()
            .map(|p| (p.programme.channel.clone(), p.programme.start.clone()))
            .collect();
        for entry in previous {
            let key = (entry.programme.channel.clone(), entry.programme.start.clone());
            if wanted.contains(entry.channel_id()) && !listed.contains(&key) {
                programmes.push(entry.clone());
            }
        }

        Ok((None, programmes))
    }

    async fn refresh(&self, _saved_state: Option<&[u8]>) -> Result<Option<Vec<u8>>> {
        let document = self.fetch().await?;
        let tv = model::parse(&document).map_err(FetchError::from)?;

        let snapshot = GuideSnapshot {
            channels: tv.channels.iter().map(to_guide_channel).collect(),
            programmes: tv.programmes,
        };
        info!(
            source = %self.config.xmltv_url,
            channels = snapshot.channels.len(),
            programmes = snapshot.programmes.len(),
            "XMLTV guide loaded"
        );

        *self.snapshot.write() = Arc::new(snapshot);
        debug!("XMLTV snapshot replaced");
        Ok(None)
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }
}
