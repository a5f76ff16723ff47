//! Registre des sessions de streaming en cours

use super::progress::DecoderStatus;
use crate::model::Channel;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// Session de streaming, de l'acceptation de la requête à l'arrêt du décodeur
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StreamSession {
    pub id: Uuid,
    pub channel_number: String,
    pub channel_name: String,
    pub started_at: DateTime<Utc>,
    /// PID du décodeur
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<DecoderStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, StreamSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enregistre une nouvelle session et retourne son identifiant
    pub fn register(&self, channel: &Channel, pid: Option<u32>) -> Uuid {
        let session = StreamSession {
            id: Uuid::new_v4(),
            channel_number: channel.number.clone(),
            channel_name: channel.name.clone(),
            started_at: Utc::now(),
            pid,
            status: None,
        };
        let id = session.id;
        self.sessions.write().insert(id, session);
        id
    }

    pub fn update_status(&self, id: Uuid, status: DecoderStatus) {
        if let Some(session) = self.sessions.write().get_mut(&id) {
            session.status = Some(status);
        }
    }

    pub fn remove(&self, id: Uuid) -> Option<StreamSession> {
        self.sessions.write().remove(&id)
    }

    pub fn get(&self, id: Uuid) -> Option<StreamSession> {
        self.sessions.read().get(&id).cloned()
    }

    /// Sessions en cours, les plus anciennes d'abord
    pub fn list(&self) -> Vec<StreamSession> {
        let mut sessions: Vec<StreamSession> = self.sessions.read().values().cloned().collect();
        sessions.sort_by_key(|s| s.started_at);
        sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_update_remove() {
        let registry = SessionRegistry::new();
        let channel = Channel {
            number: "5".into(),
            name: "France 5".into(),
            ..Default::default()
        };

        let id = registry.register(&channel, Some(42));
        assert_eq!(registry.len(), 1);

        let status = DecoderStatus {
            frames: "10".into(),
            ..Default::default()
        };
        registry.update_status(id, status.clone());
        let session = registry.get(id).unwrap();
        assert_eq!(session.status, Some(status));
        assert_eq!(session.channel_number, "5");

        assert!(registry.remove(id).is_some());
        assert!(registry.is_empty());
        // mise à jour après suppression sans effet
        registry.update_status(id, DecoderStatus::default());
        assert!(registry.get(id).is_none());
    }
}
