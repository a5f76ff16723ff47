//! Handlers HTTP du tuner
//!
//! Routes HDHomeRun servies à la racine :
//!
//! - `GET /`, `GET /device.xml` : description UPnP
//! - `GET /discover.json` : données de découverte
//! - `GET /lineup.json`, `GET /lineup.xml` : lineup
//! - `GET /lineup_status.json`, `POST /lineup.post?scan=start|abort` : scan
//! - `GET /auto/{channel_id}` : streaming
//!
//! et sous `/api` (documenté par OpenAPI) :
//!
//! - `GET /api/sessions` : sessions de streaming en cours

use crate::error::Result;
use crate::lineup::{Lineup, LineupStore};
use crate::model::{Channel, DiscoveryData, LineupItem, LineupStatus};
use crate::scan::ScanController;
use crate::stream::{DecoderStatus, StreamGateway, StreamSession, stream_channel};
use axum::extract::{FromRef, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::error;
use utoipa::OpenApi;
use vtunerguide::GuideProvider;
use vtunerupnp::render_description;

/// Type MIME de la description UPnP
pub const DEVICE_XML_CONTENT_TYPE: &str = "text/xml; charset=\"utf-8\"";

/// Type MIME de `lineup.xml`
pub const LINEUP_XML_CONTENT_TYPE: &str = "application/xml";

/// En-tête de `lineup.xml`
pub const LINEUP_XML_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// État partagé par les handlers du tuner
#[derive(Debug, Clone)]
pub struct TunerState {
    pub store: Arc<LineupStore>,
    pub scan: Arc<ScanController>,
    pub gateway: Arc<StreamGateway>,
}

impl TunerState {
    /// Assemble lineup, scan et passerelle autour d'une même lineup
    ///
    /// `configured` sert de base aux scans ; `shutdown` arrête les scans et
    /// les sessions de streaming.
    pub fn new(
        lineup: Lineup,
        provider: Option<Arc<dyn GuideProvider>>,
        configured: Vec<Channel>,
        decoder: Option<String>,
        shutdown: CancellationToken,
    ) -> Self {
        let store = Arc::new(LineupStore::new(lineup));
        let scan = Arc::new(ScanController::new(
            store.clone(),
            provider,
            configured,
            shutdown.clone(),
        ));
        let gateway = Arc::new(StreamGateway::new(store.clone(), decoder, shutdown));
        Self {
            store,
            scan,
            gateway,
        }
    }
}

impl FromRef<TunerState> for Arc<StreamGateway> {
    fn from_ref(state: &TunerState) -> Self {
        state.gateway.clone()
    }
}

#[derive(Serialize)]
#[serde(rename = "Lineup")]
struct LineupDocument<'a> {
    #[serde(rename = "Program")]
    programs: &'a [LineupItem],
}

/// Sérialise la lineup au format `lineup.xml`
pub fn render_lineup_xml(items: &[LineupItem]) -> Result<String> {
    let mut xml = String::from(LINEUP_XML_HEADER);
    xml.push('\n');

    let mut serializer = quick_xml::se::Serializer::new(&mut xml);
    serializer.indent('\t', 1);
    LineupDocument { programs: items }.serialize(serializer)?;

    Ok(xml)
}

pub async fn device_xml(State(state): State<TunerState>) -> Response {
    let description = state.store.snapshot().device_description();
    match render_description(&description) {
        Ok(xml) => ([(header::CONTENT_TYPE, DEVICE_XML_CONTENT_TYPE)], xml).into_response(),
        Err(e) => {
            error!("Failed to render device description: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn discover_json(State(state): State<TunerState>) -> Json<DiscoveryData> {
    Json(state.store.snapshot().discovery_data())
}

pub async fn lineup_json(State(state): State<TunerState>) -> Json<Vec<LineupItem>> {
    Json(state.store.snapshot().lineup_items())
}

pub async fn lineup_xml(State(state): State<TunerState>) -> Result<Response> {
    let xml = render_lineup_xml(&state.store.snapshot().lineup_items())?;
    Ok(([(header::CONTENT_TYPE, LINEUP_XML_CONTENT_TYPE)], xml).into_response())
}

pub async fn lineup_status(State(state): State<TunerState>) -> Json<LineupStatus> {
    Json(state.scan.status())
}

#[derive(Debug, Default, Deserialize)]
pub struct ScanQuery {
    #[serde(default)]
    pub scan: String,
}

pub async fn lineup_post(
    State(state): State<TunerState>,
    Query(query): Query<ScanQuery>,
) -> Result<StatusCode> {
    state.scan.command(&query.scan)?;
    Ok(StatusCode::OK)
}

/// Liste des sessions de streaming en cours
#[utoipa::path(
    get,
    path = "/sessions",
    responses(
        (status = 200, description = "Live stream sessions", body = [StreamSession])
    ),
    tag = "tuner"
)]
pub async fn list_sessions(
    State(gateway): State<Arc<StreamGateway>>,
) -> Json<Vec<StreamSession>> {
    Json(gateway.sessions().list())
}

/// Routes HDHomeRun, à monter à la racine
pub fn create_router(state: TunerState) -> Router {
    Router::new()
        .route("/", get(device_xml))
        .route("/device.xml", get(device_xml))
        .route("/discover.json", get(discover_json))
        .route("/lineup.json", get(lineup_json))
        .route("/lineup.xml", get(lineup_xml))
        .route("/lineup_status.json", get(lineup_status))
        .route("/lineup.post", post(lineup_post))
        .route("/auto/{channel_id}", get(stream_channel))
        .with_state(state)
}

/// Routes de l'API documentée, montées sous `/api`
pub fn create_api_router(gateway: Arc<StreamGateway>) -> Router {
    Router::new()
        .route("/sessions", get(list_sessions))
        .with_state(gateway)
}

/// API OpenAPI du tuner
#[derive(OpenApi)]
#[openapi(
    paths(list_sessions),
    components(schemas(StreamSession, DecoderStatus)),
    tags(
        (name = "tuner", description = "Live stream sessions")
    )
)]
pub struct TunerApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ConvertibleBoolean;

    fn item(number: &str, hd: bool) -> LineupItem {
        LineupItem {
            guide_number: number.into(),
            guide_name: format!("Channel {}", number),
            url: format!("http://10.0.0.2:6077/auto/v{}", number),
            hd: hd.then_some(ConvertibleBoolean(true)),
            favorite: None,
            drm: None,
            video_codec: None,
            audio_codec: None,
        }
    }

    #[test]
    fn test_lineup_xml_layout() {
        let xml = render_lineup_xml(&[item("5", true), item("6", false)]).unwrap();

        let mut lines = xml.lines();
        assert_eq!(lines.next(), Some(LINEUP_XML_HEADER));
        assert_eq!(lines.next(), Some("<Lineup>"));
        assert_eq!(lines.next(), Some("\t<Program>"));
        assert_eq!(xml.matches("<Program>").count(), 2);
        assert!(xml.contains("\t\t<GuideNumber>5</GuideNumber>"));
        assert!(xml.contains("<URL>http://10.0.0.2:6077/auto/v5</URL>"));
        assert!(xml.contains("<HD>1</HD>"));
        assert_eq!(xml.matches("<HD>").count(), 1);
    }

    #[test]
    fn test_lineup_xml_escapes_names() {
        let mut channel = item("7", false);
        channel.guide_name = "Arts & <Culture>".into();
        let xml = render_lineup_xml(&[channel]).unwrap();
        assert!(xml.contains("Arts &amp; &lt;Culture"));
    }
}
