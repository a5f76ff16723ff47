//! Annonceur SSDP

use super::messages::{alive_message, byebye_message, matching_targets, msearch_response, parse_st};
use super::{HEARTBEAT_INTERVAL, INITIAL_RETRY_DELAY, SSDP_MULTICAST_ADDR, SSDP_PORT, SsdpDevice};
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Délai de reprise exponentiel : 1 s, 2 s, 4 s… plafonné
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Option<Duration>,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max: max.max(initial),
            current: None,
        }
    }

    /// Délai avant la prochaine tentative
    pub fn next_delay(&mut self) -> Duration {
        let next = match self.current {
            None => self.initial,
            Some(current) => (current * 2).min(self.max),
        };
        self.current = Some(next);
        next
    }

    pub fn reset(&mut self) {
        self.current = None;
    }
}

/// Annonceur SSDP d'un device
///
/// Deux tâches partagent la même socket : le heartbeat (`ssdp:alive`
/// périodique, `ssdp:byebye` à l'arrêt) et le répondeur M-SEARCH. Les deux
/// s'arrêtent sur le jeton d'annulation.
pub struct SsdpAnnouncer {
    device: Arc<SsdpDevice>,
    socket: Arc<UdpSocket>,
    target: SocketAddr,
    heartbeat: Duration,
}

/// Poignée sur les tâches d'un annonceur démarré
pub struct AnnouncerHandle {
    cancel: CancellationToken,
    heartbeat: JoinHandle<()>,
    responder: JoinHandle<()>,
}

impl AnnouncerHandle {
    /// Arrête les annonces (byebye envoyé) et attend la fin des tâches
    pub async fn shutdown(self) {
        self.cancel.cancel();
        self.wait().await;
    }

    /// Attend la fin des tâches, déclenchée par le jeton d'annulation
    pub async fn wait(self) {
        let _ = self.heartbeat.await;
        let _ = self.responder.await;
    }
}

impl SsdpAnnouncer {
    /// Démarre l'annonce d'un device sur le groupe multicast SSDP
    ///
    /// Une erreur d'ouverture de la socket ou d'adhésion au groupe est
    /// retournée ; les erreurs d'envoi ultérieures sont seulement journalisées.
    pub async fn start(
        device: SsdpDevice,
        cancel: CancellationToken,
    ) -> io::Result<AnnouncerHandle> {
        let socket = multicast_socket()?;
        let target = SocketAddr::V4(SocketAddrV4::new(multicast_group(), SSDP_PORT));
        info!("SSDP announcer started on {}", target);
        Ok(Self::new(device, socket, target).spawn(cancel).await)
    }

    /// Construit un annonceur sur une socket existante
    ///
    /// `target` reçoit les NOTIFY ; les M-SEARCH sont lus sur `socket`.
    pub fn new(device: SsdpDevice, socket: UdpSocket, target: SocketAddr) -> Self {
        Self {
            device: Arc::new(device),
            socket: Arc::new(socket),
            target,
            heartbeat: HEARTBEAT_INTERVAL,
        }
    }

    /// Change l'intervalle entre deux annonces
    pub fn with_heartbeat(mut self, heartbeat: Duration) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    /// Envoie l'annonce initiale puis lance les tâches
    pub async fn spawn(self, cancel: CancellationToken) -> AnnouncerHandle {
        if let Err(e) = send_all(&self.socket, self.target, &self.device, alive_message).await {
            warn!("Failed to send initial NOTIFY alive: {}", e);
        }

        let heartbeat = tokio::spawn(heartbeat_loop(
            self.socket.clone(),
            self.target,
            self.device.clone(),
            self.heartbeat,
            cancel.clone(),
        ));
        let responder = tokio::spawn(responder_loop(
            self.socket.clone(),
            self.device.clone(),
            cancel.clone(),
        ));

        AnnouncerHandle {
            cancel,
            heartbeat,
            responder,
        }
    }
}

fn multicast_group() -> Ipv4Addr {
    SSDP_MULTICAST_ADDR
        .parse()
        .unwrap_or(Ipv4Addr::new(239, 255, 255, 250))
}

/// Socket UDP sur le port 1900, réutilisable, membre du groupe SSDP
fn multicast_socket() -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;

    let bind_addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, SSDP_PORT);
    socket.bind(&bind_addr.into())?;

    socket.join_multicast_v4(&multicast_group(), &Ipv4Addr::UNSPECIFIED)?;
    socket.set_multicast_loop_v4(false)?;
    socket.set_nonblocking(true)?;

    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket)
}

async fn send_all(
    socket: &UdpSocket,
    target: SocketAddr,
    device: &SsdpDevice,
    build: fn(&SsdpDevice, &str) -> String,
) -> io::Result<()> {
    for nt in device.get_notification_types() {
        socket.send_to(build(device, nt).as_bytes(), target).await?;
        debug!("NOTIFY sent: {} (NT={})", device.usn(nt), nt);
    }
    Ok(())
}

async fn heartbeat_loop(
    socket: Arc<UdpSocket>,
    target: SocketAddr,
    device: Arc<SsdpDevice>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut backoff = Backoff::new(INITIAL_RETRY_DELAY.min(interval), interval);
    let mut delay = interval;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }

        match send_all(&socket, target, &device, alive_message).await {
            Ok(()) => {
                backoff.reset();
                delay = interval;
            }
            Err(e) => {
                delay = backoff.next_delay();
                warn!("SSDP heartbeat failed, retrying in {:?}: {}", delay, e);
            }
        }
    }

    match send_all(&socket, target, &device, byebye_message).await {
        Ok(()) => info!("SSDP byebye sent for uuid:{}", device.uuid),
        Err(e) => warn!("Failed to send NOTIFY byebye: {}", e),
    }
}

async fn responder_loop(socket: Arc<UdpSocket>, device: Arc<SsdpDevice>, cancel: CancellationToken) {
    let mut buf = vec![0u8; 8192];

    loop {
        let received = tokio::select! {
            _ = cancel.cancelled() => break,
            res = socket.recv_from(&mut buf) => res,
        };

        let (n, src) = match received {
            Ok(r) => r,
            Err(e) => {
                warn!("SSDP read error: {}", e);
                tokio::time::sleep(Duration::from_millis(100)).await;
                continue;
            }
        };

        let data = String::from_utf8_lossy(&buf[..n]);
        let Some(st) = parse_st(&data) else {
            continue;
        };

        for target in matching_targets(&device, &st) {
            let response = msearch_response(&device, &target);
            match socket.send_to(response.as_bytes(), src).await {
                Ok(_) => debug!("M-SEARCH response sent to {} with ST={}", src, target),
                Err(e) => warn!("Failed to send M-SEARCH response to {}: {}", src, e),
            }
        }
    }
}
