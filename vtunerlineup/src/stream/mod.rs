//! # Passerelle de streaming
//!
//! `GET /auto/{channel_id}` sert une chaîne de la lineup :
//!
//! - sans décodeur configuré, le client est redirigé (301) vers la source ;
//! - avec un décodeur (ffmpeg), celui-ci est lancé sur la source et sa
//!   sortie standard (MPEG-TS) est relayée au client.
//!
//! ## Cycle de vie d'une session
//!
//! Chaque session possède un `CancellationToken` enfant du jeton d'arrêt du
//! serveur. Il est annulé quand le client se déconnecte, sur erreur de
//! copie, en fin de flux ou à l'arrêt du serveur. Une tâche de supervision
//! possède le processus et le tue à l'annulation ; si le processus se
//! termine de lui-même, elle annule le jeton. La session quitte le registre
//! une fois le processus récupéré.

mod progress;
mod session;

pub use progress::{DecoderStatus, MAX_LINE_LENGTH, ProgressLineCodec};
pub use session::{SessionRegistry, StreamSession};

use crate::error::{Result, TunerError};
use crate::lineup::LineupStore;
use crate::model::Channel;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::io;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio_util::codec::FramedRead;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

/// Type MIME du flux relayé
pub const MPEGTS_CONTENT_TYPE: &str = "video/mp2t";

/// Arguments passés au décodeur pour une source donnée
pub fn decoder_args(stream_url: &str) -> Vec<String> {
    [
        "-re",
        "-i",
        stream_url,
        "-codec",
        "copy",
        "-bsf:v",
        "h264_mp4toannexb",
        "-f",
        "mpegts",
        "-tune",
        "zerolatency",
        "-progress",
        "pipe:2",
        "pipe:1",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Numéro de chaîne d'un identifiant `/auto` (`v5` → `5`)
fn channel_number(channel_id: &str) -> &str {
    let mut chars = channel_id.chars();
    chars.next();
    chars.as_str()
}

#[derive(Debug)]
pub struct StreamGateway {
    store: Arc<LineupStore>,
    decoder: Option<String>,
    shutdown: CancellationToken,
    sessions: SessionRegistry,
}

impl StreamGateway {
    /// `decoder` est le chemin du binaire ffmpeg ; vide ou absent, les
    /// clients sont redirigés vers la source.
    pub fn new(
        store: Arc<LineupStore>,
        decoder: Option<String>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            store,
            decoder: decoder.filter(|d| !d.trim().is_empty()),
            shutdown,
            sessions: SessionRegistry::new(),
        }
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn decoder(&self) -> Option<&str> {
        self.decoder.as_deref()
    }

    /// Sert la chaîne désignée par `channel_id`
    ///
    /// Une chaîne inconnue ou un décodeur impossible à lancer sont des
    /// erreurs ; rien n'est alors envoyé au client.
    pub fn open(&self, channel_id: &str) -> Result<Response> {
        let number = channel_number(channel_id);
        let lineup = self.store.snapshot();
        let channel = lineup.channel(number)?;

        info!(channel = %number, "Serving channel");

        match &self.decoder {
            None => Ok((
                StatusCode::MOVED_PERMANENTLY,
                [(header::LOCATION, channel.stream_url.clone())],
            )
                .into_response()),
            Some(decoder) => self.transcode(decoder, channel),
        }
    }

    fn transcode(&self, decoder: &str, channel: &Channel) -> Result<Response> {
        info!(channel = %channel.number, "Transcoding stream with {}", decoder);

        let mut child = Command::new(decoder)
            .args(decoder_args(&channel.stream_url))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| TunerError::process(format!("cannot start {}: {}", decoder, e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TunerError::process("decoder stdout not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| TunerError::process("decoder stderr not captured"))?;

        let cancel = self.shutdown.child_token();
        let id = self.sessions.register(channel, child.id());
        debug!(session = %id, pid = ?child.id(), "Stream session registered");

        tokio::spawn(supervise(
            child,
            cancel.clone(),
            self.sessions.clone(),
            id,
            channel.number.clone(),
        ));
        tokio::spawn(report_progress(
            stderr,
            cancel.clone(),
            self.sessions.clone(),
            id,
            channel.number.clone(),
        ));

        let body = Body::from_stream(forward_output(stdout, cancel, channel.number.clone()));
        Ok(([(header::CONTENT_TYPE, MPEGTS_CONTENT_TYPE)], body).into_response())
    }
}

/// Handler `GET /auto/{channel_id}`
pub async fn stream_channel(
    State(gateway): State<Arc<StreamGateway>>,
    Path(channel_id): Path<String>,
) -> Result<Response> {
    gateway.open(&channel_id)
}

/// Relaye la sortie du décodeur
///
/// Le jeton est annulé à la fin du flux comme à sa destruction (client
/// déconnecté).
fn forward_output(
    stdout: ChildStdout,
    cancel: CancellationToken,
    channel: String,
) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
    async_stream::stream! {
        let _guard = cancel.clone().drop_guard();
        let mut output = ReaderStream::new(stdout);

        loop {
            // la sortie déjà produite est vidée avant de constater l'annulation
            let next = tokio::select! {
                biased;
                next = output.next() => next,
                _ = cancel.cancelled() => break,
            };

            match next {
                Some(Ok(chunk)) => yield Ok(chunk),
                Some(Err(e)) => {
                    error!(channel = %channel, "Error when copying data: {}", e);
                    break;
                }
                None => {
                    debug!(channel = %channel, "Decoder output closed");
                    break;
                }
            }
        }
    }
}

/// Possède le processus décodeur jusqu'à sa fin
async fn supervise(
    mut child: Child,
    cancel: CancellationToken,
    sessions: SessionRegistry,
    id: Uuid,
    channel: String,
) {
    tokio::select! {
        _ = cancel.cancelled() => {
            match child.kill().await {
                Ok(()) => info!(channel = %channel, "Stopped streaming"),
                Err(e) => error!(channel = %channel, "Failed to kill decoder: {}", e),
            }
        }
        status = child.wait() => {
            match status {
                Ok(status) if status.success() => info!(channel = %channel, "Decoder exited"),
                Ok(status) => warn!(channel = %channel, "Decoder exited with status: {}", status),
                Err(e) => error!(channel = %channel, "Error waiting for decoder: {}", e),
            }
            cancel.cancel();
        }
    }

    sessions.remove(id);
    debug!(session = %id, "Stream session closed");
}

/// Lit la progression du décodeur sur sa sortie d'erreur
async fn report_progress(
    stderr: ChildStderr,
    cancel: CancellationToken,
    sessions: SessionRegistry,
    id: Uuid,
    channel: String,
) {
    let mut lines = FramedRead::new(stderr, ProgressLineCodec::new());

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => break,
            next = lines.next() => next,
        };

        match next {
            Some(Ok(line)) => match DecoderStatus::parse(&line) {
                Some(status) => {
                    debug!(
                        channel = %channel,
                        frames = %status.frames,
                        time = %status.time,
                        bitrate = %status.bitrate,
                        speed = %status.speed,
                        "Decoder status"
                    );
                    sessions.update_status(id, status);
                }
                None => trace!(channel = %channel, "{}", line),
            },
            Some(Err(e)) => {
                warn!(channel = %channel, "Error reading decoder output: {}", e);
                break;
            }
            None => break,
        }
    }
}
