use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tokio::net::UdpSocket;
use tracing::{debug, trace};

use crate::probe::{FailureKind, Probe, ProbeFuture, ProbeOutcome};

/// Used when `server` does not carry a port.
const DEFAULT_PORT: u16 = 123;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const PACKET_LEN: usize = 48;
/// Seconds between 1900-01-01 (NTP era 0) and 1970-01-01.
const NTP_UNIX_OFFSET_SECS: u64 = 2_208_988_800;

const VERSION: u8 = 4;
const MODE_CLIENT: u8 = 3;
const MODE_SERVER: u8 = 4;
const LEAP_NOT_IN_SYNC: u8 = 3;

const ORIGIN_TS: std::ops::Range<usize> = 24..32;
const TRANSMIT_TS: std::ops::Range<usize> = 40..48;
const REFERENCE_ID: std::ops::Range<usize> = 12..16;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to resolve `{0}`")]
    Resolve(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no reply within {0:?}")]
    Timeout(Duration),

    #[error("short reply ({0} bytes, expected at least 48)")]
    ShortReply(usize),

    #[error("unexpected mode {0} in reply (expected server mode 4)")]
    UnexpectedMode(u8),

    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u8),

    #[error("server reports an unsynchronized clock")]
    Unsynchronized,

    #[error("kiss-o'-death reply (code `{0}`)")]
    KissOfDeath(String),

    #[error("reply origin timestamp does not match the request")]
    OriginMismatch,

    #[error("reply carries an empty transmit timestamp")]
    MissingTransmit,
}

impl Error {
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Resolve(_) => FailureKind::Resolve,
            Self::Io(_) => FailureKind::Io,
            Self::Timeout(_) => FailureKind::Timeout,
            Self::KissOfDeath(_) => FailureKind::KissOfDeath,
            Self::ShortReply(_)
            | Self::UnexpectedMode(_)
            | Self::UnsupportedVersion(_)
            | Self::Unsynchronized
            | Self::OriginMismatch
            | Self::MissingTransmit => FailureKind::InvalidResponse,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SntpReply {
    pub version: u8,
    pub stratum: u8,
    pub round_trip: Duration,
}

/// Minimal SNTPv4 client: one request, one validated reply.
#[derive(Debug, Clone)]
pub struct SntpProbe {
    timeout: Duration,
}

impl Default for SntpProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl SntpProbe {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn query(&self, server: &str) -> Result<SntpReply, Error> {
        match tokio::time::timeout(self.timeout, self.exchange(server)).await {
            Ok(res) => res,
            Err(_) => Err(Error::Timeout(self.timeout)),
        }
    }

    async fn exchange(&self, server: &str) -> Result<SntpReply, Error> {
        let addr = self.resolve(server).await?;

        let bind: SocketAddr = if addr.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let socket = UdpSocket::bind(bind).await?;
        socket.connect(addr).await?;

        let request = encode_request(SystemTime::now(), rand::random::<u16>());
        let started = Instant::now();
        socket.send(&request).await?;

        let mut buf = [0u8; 128];
        let n = socket.recv(&mut buf).await?;
        let round_trip = started.elapsed();

        let mut reply = decode_reply(&request, &buf[..n])?;
        reply.round_trip = round_trip;
        Ok(reply)
    }

    async fn resolve(&self, server: &str) -> Result<SocketAddr, Error> {
        let target = with_default_port(server, DEFAULT_PORT);
        let mut addrs = tokio::net::lookup_host(target.as_str())
            .await
            .map_err(|_| Error::Resolve(server.to_string()))?;
        addrs
            .next()
            .ok_or_else(|| Error::Resolve(server.to_string()))
    }
}

impl Probe for SntpProbe {
    fn name(&self) -> &'static str {
        "sntp"
    }

    fn probe<'a>(&'a self, server: &'a str) -> ProbeFuture<'a> {
        Box::pin(async move {
            match self.query(server).await {
                Ok(reply) => {
                    trace!(
                        server,
                        stratum = reply.stratum,
                        rtt_us = reply.round_trip.as_micros() as u64,
                        "sntp reply"
                    );
                    ProbeOutcome::Success
                }
                Err(err) => {
                    debug!(server, error = %err, "sntp probe failed");
                    ProbeOutcome::Failure(err.kind())
                }
            }
        })
    }
}

fn with_default_port(server: &str, port: u16) -> String {
    if server.parse::<SocketAddr>().is_ok() {
        return server.to_string();
    }
    if let Ok(ip) = server.parse::<IpAddr>() {
        return SocketAddr::new(ip, port).to_string();
    }
    // `host:port`, but not a bare IPv6 literal (handled above).
    if let Some((host, p)) = server.rsplit_once(':')
        && !host.contains(':')
        && p.parse::<u16>().is_ok()
    {
        return server.to_string();
    }
    format!("{server}:{port}")
}

fn ntp_timestamp(t: SystemTime, nonce: u16) -> [u8; 8] {
    let since_epoch = t.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
    // Era rollover is fine here: only equality with the echoed value matters.
    let secs = (since_epoch.as_secs().wrapping_add(NTP_UNIX_OFFSET_SECS)) as u32;
    let frac = ((u64::from(since_epoch.subsec_nanos()) << 32) / 1_000_000_000) as u32;
    // Low bits carry a nonce so concurrent requests stay distinguishable.
    let frac = (frac & 0xFFFF_0000) | u32::from(nonce);

    let mut out = [0u8; 8];
    out[..4].copy_from_slice(&secs.to_be_bytes());
    out[4..].copy_from_slice(&frac.to_be_bytes());
    out
}

fn encode_request(now: SystemTime, nonce: u16) -> [u8; PACKET_LEN] {
    let mut packet = [0u8; PACKET_LEN];
    packet[0] = (VERSION << 3) | MODE_CLIENT;
    packet[TRANSMIT_TS].copy_from_slice(&ntp_timestamp(now, nonce));
    packet
}

fn decode_reply(request: &[u8; PACKET_LEN], reply: &[u8]) -> Result<SntpReply, Error> {
    if reply.len() < PACKET_LEN {
        return Err(Error::ShortReply(reply.len()));
    }

    let leap = reply[0] >> 6;
    let version = (reply[0] >> 3) & 0b111;
    let mode = reply[0] & 0b111;
    let stratum = reply[1];

    if mode != MODE_SERVER {
        return Err(Error::UnexpectedMode(mode));
    }
    if !(1..=4).contains(&version) {
        return Err(Error::UnsupportedVersion(version));
    }
    if stratum == 0 {
        let code = String::from_utf8_lossy(&reply[REFERENCE_ID])
            .trim_end_matches('\0')
            .to_string();
        return Err(Error::KissOfDeath(code));
    }
    if leap == LEAP_NOT_IN_SYNC {
        return Err(Error::Unsynchronized);
    }
    if reply[ORIGIN_TS] != request[TRANSMIT_TS] {
        return Err(Error::OriginMismatch);
    }
    if reply[TRANSMIT_TS].iter().all(|b| *b == 0) {
        return Err(Error::MissingTransmit);
    }

    Ok(SntpReply {
        version,
        stratum,
        round_trip: Duration::ZERO,
    })
}
