use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::net::UdpSocket;
use tokio::sync::oneshot;

pub const PACKET_LEN: usize = 48;

/// Seconds between the NTP era 0 epoch (1900) and the Unix epoch.
const NTP_UNIX_OFFSET_SECS: u64 = 2_208_988_800;

/// How the server answers each well-formed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Behavior {
    #[default]
    Respond,
    /// Every reply is a kiss-o'-death with code `RATE`.
    KissOfDeath,
    /// Every `n`th request is silently dropped; the rest are answered.
    DropEvery(u64),
    /// Never answers.
    Silent,
}

#[derive(Debug, Clone, Default)]
pub struct TestServerStats {
    requests_total: Arc<AtomicU64>,
    replies_total: Arc<AtomicU64>,
    dropped_total: Arc<AtomicU64>,
}

impl TestServerStats {
    fn inc_requests_total(&self) -> u64 {
        self.requests_total.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn inc_replies_total(&self) {
        self.replies_total.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_dropped_total(&self) {
        self.dropped_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn replies_total(&self) -> u64 {
        self.replies_total.load(Ordering::Relaxed)
    }

    pub fn dropped_total(&self) -> u64 {
        self.dropped_total.load(Ordering::Relaxed)
    }
}

/// Minimal SNTP server on a local UDP port, for tests.
pub struct TestServer {
    addr: SocketAddr,
    stats: TestServerStats,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    pub async fn start() -> std::io::Result<Self> {
        Self::start_with(Behavior::Respond).await
    }

    pub async fn start_with(behavior: Behavior) -> std::io::Result<Self> {
        Self::bind("127.0.0.1:0".parse().map_err(std::io::Error::other)?, behavior).await
    }

    pub async fn bind(addr: SocketAddr, behavior: Behavior) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        let addr = socket.local_addr()?;
        let stats = TestServerStats::default();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(serve(socket, behavior, stats.clone(), shutdown_rx));

        Ok(Self {
            addr,
            stats,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// `host:port` form accepted by the probe.
    pub fn target(&self) -> String {
        self.addr.to_string()
    }

    pub fn stats(&self) -> &TestServerStats {
        &self.stats
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if self.shutdown_tx.is_some()
            && let Some(task) = self.task.take()
        {
            task.abort();
        }
    }
}

async fn serve(
    socket: UdpSocket,
    behavior: Behavior,
    stats: TestServerStats,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut buf = [0u8; 512];
    loop {
        let (len, peer) = tokio::select! {
            _ = &mut shutdown_rx => return,
            recv = socket.recv_from(&mut buf) => match recv {
                Ok(v) => v,
                // ICMP port-unreachable from a departed client surfaces here on some platforms.
                Err(_) => continue,
            },
        };

        if len < PACKET_LEN {
            continue;
        }
        let n = stats.inc_requests_total();

        let reply = match behavior {
            Behavior::Silent => None,
            Behavior::DropEvery(every) if every != 0 && n % every == 0 => None,
            Behavior::KissOfDeath => Some(kiss_of_death(&buf[..PACKET_LEN])),
            Behavior::Respond | Behavior::DropEvery(_) => Some(reply_to(&buf[..PACKET_LEN])),
        };

        match reply {
            Some(packet) => {
                if socket.send_to(&packet, peer).await.is_ok() {
                    stats.inc_replies_total();
                }
            }
            None => stats.inc_dropped_total(),
        }
    }
}

fn now_timestamp() -> [u8; 8] {
    let since = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let secs = (since.as_secs() + NTP_UNIX_OFFSET_SECS) as u32;
    let frac = ((u64::from(since.subsec_nanos()) << 32) / 1_000_000_000) as u32;

    let mut out = [0u8; 8];
    out[..4].copy_from_slice(&secs.to_be_bytes());
    out[4..].copy_from_slice(&frac.to_be_bytes());
    out
}

/// Builds a stratum 2 server reply echoing the client's transmit timestamp.
pub fn reply_to(request: &[u8]) -> [u8; PACKET_LEN] {
    let version = (request[0] >> 3) & 0x07;
    let now = now_timestamp();

    let mut packet = [0u8; PACKET_LEN];
    packet[0] = (version << 3) | 4;
    packet[1] = 2;
    packet[2] = request[2];
    packet[3] = 0xEC;
    packet[12..16].copy_from_slice(&[127, 0, 0, 1]);
    packet[16..24].copy_from_slice(&now);
    packet[24..32].copy_from_slice(&request[40..48]);
    packet[32..40].copy_from_slice(&now);
    packet[40..48].copy_from_slice(&now);
    packet
}

pub fn kiss_of_death(request: &[u8]) -> [u8; PACKET_LEN] {
    let version = (request[0] >> 3) & 0x07;

    let mut packet = [0u8; PACKET_LEN];
    packet[0] = (3 << 6) | (version << 3) | 4;
    packet[12..16].copy_from_slice(b"RATE");
    packet[24..32].copy_from_slice(&request[40..48]);
    packet
}
