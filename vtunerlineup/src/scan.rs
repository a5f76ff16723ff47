//! Scan des chaînes (`/lineup.post?scan=...`)
//!
//! Un scan recharge le guide puis reconstruit la liste des chaînes à partir
//! des chaînes configurées, complétées par les informations du guide. Un
//! seul scan tourne à la fois ; `abort` l'annule sans toucher à la lineup.

use crate::error::{Result, TunerError};
use crate::lineup::LineupStore;
use crate::model::{Channel, LineupStatus};
use parking_lot::Mutex;
use std::str::FromStr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use vtunerguide::{GuideChannel, GuideProvider, UNKNOWN_CALL_SIGN};

/// Commande reçue sur `/lineup.post`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanCommand {
    Start,
    Abort,
}

impl FromStr for ScanCommand {
    type Err = TunerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "start" => Ok(Self::Start),
            "abort" => Ok(Self::Abort),
            other => Err(TunerError::BadScanCommand(other.to_string())),
        }
    }
}

#[derive(Debug)]
enum ScanState {
    Idle,
    Scanning {
        id: u64,
        progress: u8,
        found: usize,
        cancel: CancellationToken,
    },
}

/// Machine à états du scan
#[derive(Debug)]
pub struct ScanController {
    store: Arc<LineupStore>,
    provider: Option<Arc<dyn GuideProvider>>,
    configured: Vec<Channel>,
    shutdown: CancellationToken,
    state: Mutex<ScanState>,
    next_id: Mutex<u64>,
}

impl ScanController {
    /// `configured` est la liste des chaînes de la configuration, base de
    /// chaque scan.
    pub fn new(
        store: Arc<LineupStore>,
        provider: Option<Arc<dyn GuideProvider>>,
        configured: Vec<Channel>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            store,
            provider,
            configured,
            shutdown,
            state: Mutex::new(ScanState::Idle),
            next_id: Mutex::new(0),
        }
    }

    pub fn status(&self) -> LineupStatus {
        match &*self.state.lock() {
            ScanState::Idle => LineupStatus::idle(),
            ScanState::Scanning {
                progress, found, ..
            } => LineupStatus::scanning(*progress, *found),
        }
    }

    pub fn is_scanning(&self) -> bool {
        matches!(&*self.state.lock(), ScanState::Scanning { .. })
    }

    /// Exécute une commande brute de `/lineup.post`
    pub fn command(self: &Arc<Self>, command: &str) -> Result<()> {
        match command.parse::<ScanCommand>()? {
            ScanCommand::Start => {
                self.start();
            }
            ScanCommand::Abort => self.abort(),
        }
        Ok(())
    }

    /// Lance un scan en tâche de fond
    ///
    /// Retourne `false` si un scan est déjà en cours (aucun second scan
    /// n'est lancé).
    pub fn start(self: &Arc<Self>) -> bool {
        let (id, cancel) = {
            let mut state = self.state.lock();
            if matches!(&*state, ScanState::Scanning { .. }) {
                info!("Scan already running");
                return false;
            }

            let id = {
                let mut next = self.next_id.lock();
                *next += 1;
                *next
            };
            let cancel = self.shutdown.child_token();
            *state = ScanState::Scanning {
                id,
                progress: 0,
                found: 0,
                cancel: cancel.clone(),
            };
            (id, cancel)
        };

        info!("Channel scan started");
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            controller.run(id, cancel).await;
        });
        true
    }

    /// Annule le scan en cours, s'il y en a un
    pub fn abort(&self) {
        let mut state = self.state.lock();
        if let ScanState::Scanning { cancel, .. } = &*state {
            cancel.cancel();
            info!("Channel scan aborted");
        }
        *state = ScanState::Idle;
    }

    async fn run(&self, id: u64, cancel: CancellationToken) {
        let channels = match &self.provider {
            None => self.configured.clone(),
            Some(provider) => {
                self.set_progress(id, 10, 0);
                let refreshed = tokio::select! {
                    _ = cancel.cancelled() => {
                        self.finish(id);
                        return;
                    }
                    res = provider.refresh(None) => res,
                };

                if let Err(e) = refreshed {
                    warn!("Guide refresh failed, lineup left unchanged: {}", e);
                    self.finish(id);
                    return;
                }
                merge_guide_channels(&self.configured, &provider.channels())
            }
        };

        self.set_progress(id, 90, channels.len());
        match self.commit(id, &cancel, channels) {
            Some(count) => info!(channels = count, "Channel scan completed"),
            None => info!("Channel scan discarded"),
        }
    }

    /// Publie les chaînes d'un scan et repasse à `Idle`
    ///
    /// Le verrou d'état est tenu pendant le remplacement : un scan annulé ou
    /// supplanté ne publie rien.
    fn commit(
        &self,
        scan_id: u64,
        cancel: &CancellationToken,
        channels: Vec<Channel>,
    ) -> Option<usize> {
        let mut state = self.state.lock();
        let current = matches!(&*state, ScanState::Scanning { id, .. } if *id == scan_id);
        if !current {
            return None;
        }

        *state = ScanState::Idle;
        if cancel.is_cancelled() {
            return None;
        }
        Some(self.store.replace_channels(channels))
    }

    fn set_progress(&self, scan_id: u64, value: u8, channels: usize) {
        if let ScanState::Scanning {
            id,
            progress,
            found,
            ..
        } = &mut *self.state.lock()
            && *id == scan_id
        {
            *progress = value;
            *found = channels;
        }
    }

    /// Repasse à `Idle`, sauf si un autre scan a pris la place entre-temps
    fn finish(&self, scan_id: u64) {
        let mut state = self.state.lock();
        if let ScanState::Scanning { id, .. } = &*state
            && *id == scan_id
        {
            *state = ScanState::Idle;
        }
    }
}

/// Complète les chaînes configurées avec les informations du guide
///
/// Une chaîne est rapprochée d'une chaîne du guide par identifiant de guide,
/// à défaut par numéro. Seuls les champs vides sont remplis. Les chaînes du
/// guide sans équivalent configuré sont ignorées : elles n'ont pas de
/// source vidéo.
pub fn merge_guide_channels(configured: &[Channel], guide: &[GuideChannel]) -> Vec<Channel> {
    configured
        .iter()
        .map(|channel| {
            let matched = channel
                .guide_id
                .as_deref()
                .and_then(|id| guide.iter().find(|g| g.id == id))
                .or_else(|| {
                    guide
                        .iter()
                        .find(|g| !g.number.is_empty() && g.number == channel.number)
                });

            let mut merged = channel.clone();
            if let Some(g) = matched {
                if merged.name.is_empty() {
                    merged.name = g.name.clone();
                }
                if merged.call_sign.is_empty() && g.call_sign != UNKNOWN_CALL_SIGN {
                    merged.call_sign = g.call_sign.clone();
                }
                if merged.logos.is_empty() {
                    merged.logos = g.logos.clone();
                }
                if merged.guide_id.is_none() {
                    merged.guide_id = Some(g.id.clone());
                }
            }
            merged
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lineup::Lineup;
    use crate::model::DeviceIdentity;
    use std::time::Duration;
    use vtunerguide::Logo;

    fn channel(number: &str, name: &str) -> Channel {
        Channel {
            number: number.into(),
            name: name.into(),
            stream_url: format!("http://source/{}", number),
            ..Default::default()
        }
    }

    fn guide(id: &str, number: &str, name: &str) -> GuideChannel {
        GuideChannel {
            id: id.into(),
            name: name.into(),
            number: number.into(),
            call_sign: UNKNOWN_CALL_SIGN.into(),
            logos: vec![Logo {
                url: format!("http://logos/{}.png", id),
                ..Default::default()
            }],
        }
    }

    async fn wait_idle(controller: &ScanController) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while controller.is_scanning() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("scan did not finish");
    }

    #[test]
    fn test_parse_command() {
        assert_eq!("start".parse::<ScanCommand>().unwrap(), ScanCommand::Start);
        assert_eq!("abort".parse::<ScanCommand>().unwrap(), ScanCommand::Abort);
        assert!(matches!(
            "Start".parse::<ScanCommand>(),
            Err(TunerError::BadScanCommand(v)) if v == "Start"
        ));
        assert!("".parse::<ScanCommand>().is_err());
    }

    #[test]
    fn test_merge_by_guide_id_then_number() {
        let mut by_id = channel("5", "");
        by_id.guide_id = Some("france5".into());
        let by_number = channel("7", "");
        let named = channel("9", "Mine");
        let unmatched = channel("11", "");

        let merged = merge_guide_channels(
            &[by_id, by_number, named, unmatched],
            &[
                guide("france5", "42", "France 5"),
                guide("arte", "7", "Arte"),
                guide("other", "9", "Other"),
                guide("extra", "99", "Extra"),
            ],
        );

        assert_eq!(merged.len(), 4);
        assert_eq!(merged[0].name, "France 5");
        assert_eq!(merged[0].logos[0].url, "http://logos/france5.png");
        assert_eq!(merged[1].name, "Arte");
        assert_eq!(merged[1].guide_id.as_deref(), Some("arte"));
        // champ déjà renseigné conservé
        assert_eq!(merged[2].name, "Mine");
        assert_eq!(merged[3].name, "");
        assert_eq!(merged[3].guide_id, None);
        // "UNK" n'écrase pas un indicatif vide
        assert!(merged.iter().all(|c| c.call_sign.is_empty()));
    }

    #[tokio::test]
    async fn test_scan_without_provider_reapplies_configuration() {
        let store = Arc::new(LineupStore::new(Lineup::new(
            DeviceIdentity::default(),
            "127.0.0.1",
            6077,
        )));
        let controller = Arc::new(ScanController::new(
            store.clone(),
            None,
            vec![channel("5", "A"), channel("6", "B")],
            CancellationToken::new(),
        ));
        assert_eq!(controller.status(), LineupStatus::idle());

        controller.command("start").unwrap();
        wait_idle(&controller).await;

        assert_eq!(store.snapshot().channels().len(), 2);
        assert_eq!(controller.status(), LineupStatus::idle());
    }

    #[test]
    fn test_superseded_scan_does_not_publish() {
        let store = Arc::new(LineupStore::new(
            Lineup::new(DeviceIdentity::default(), "127.0.0.1", 6077)
                .with_channels(vec![channel("1", "Old")]),
        ));
        let controller = ScanController::new(
            store.clone(),
            None,
            vec![],
            CancellationToken::new(),
        );
        let first = CancellationToken::new();
        *controller.state.lock() = ScanState::Scanning {
            id: 1,
            progress: 90,
            found: 1,
            cancel: first.clone(),
        };

        // abort puis nouveau scan avant la publication du premier
        first.cancel();
        let second = CancellationToken::new();
        *controller.state.lock() = ScanState::Scanning {
            id: 2,
            progress: 0,
            found: 0,
            cancel: second.clone(),
        };

        assert_eq!(controller.commit(1, &first, vec![channel("9", "Stale")]), None);
        assert_eq!(store.snapshot().channels()[0].name, "Old");
        assert!(controller.is_scanning());

        // scan annulé encore courant : rien n'est publié non plus
        second.cancel();
        assert_eq!(controller.commit(2, &second, vec![channel("9", "Stale")]), None);
        assert_eq!(store.snapshot().channels()[0].name, "Old");
        assert!(!controller.is_scanning());

        *controller.state.lock() = ScanState::Scanning {
            id: 3,
            progress: 0,
            found: 0,
            cancel: CancellationToken::new(),
        };
        assert_eq!(
            controller.commit(3, &CancellationToken::new(), vec![channel("9", "New")]),
            Some(1)
        );
        assert_eq!(store.snapshot().channels()[0].name, "New");
    }

    #[tokio::test]
    async fn test_abort_when_idle_is_acknowledged() {
        let store = Arc::new(LineupStore::new(Lineup::new(
            DeviceIdentity::default(),
            "127.0.0.1",
            6077,
        )));
        let controller = Arc::new(ScanController::new(
            store,
            None,
            vec![],
            CancellationToken::new(),
        ));
        controller.command("abort").unwrap();
        assert!(!controller.is_scanning());
        assert!(controller.command("restart").is_err());
    }
}
