//! Network sink for remote logging
//!
//! Sends formatted records to a remote collector over TCP (newline-delimited)
//! or UDP (one datagram per record). A lost TCP connection is re-established
//! with exponential backoff; while a retry is pending, records fail fast
//! instead of blocking the caller.

use super::base::{delegate_sink_core, SinkCore};
use crate::core::{LogRecord, LoggerError, Result, Sink};
use parking_lot::Mutex;
use rand::Rng;
use std::io::Write;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs, UdpSocket};
use std::time::{Duration, Instant};

/// Transport used by a [`NetworkSink`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

/// Connection settings for a [`NetworkSink`]
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub address: String,
    pub protocol: Protocol,
    pub connect_timeout: Duration,
    /// Bounds every write, and therefore every flush
    pub write_timeout: Duration,
    pub reconnect: bool,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

impl NetworkConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            protocol: Protocol::Tcp,
            connect_timeout: Duration::from_secs(3),
            write_timeout: Duration::from_secs(5),
            reconnect: true,
            backoff_base: Duration::from_millis(100),
            backoff_max: Duration::from_secs(30),
        }
    }

    #[must_use]
    pub fn protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    #[must_use]
    pub fn reconnect(mut self, enable: bool) -> Self {
        self.reconnect = enable;
        self
    }

    #[must_use]
    pub fn backoff(mut self, base: Duration, max: Duration) -> Self {
        self.backoff_base = base;
        self.backoff_max = max;
        self
    }
}

/// Exponential backoff with up to 10% jitter; attempt 0 waits nothing
pub(crate) fn calculate_backoff(attempt: u32, base: Duration, max: Duration) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let base_ms = base.as_millis() as u64;
    let max_ms = max.as_millis() as u64;
    let exponential = 2u64.saturating_pow(attempt - 1);
    let capped = base_ms.saturating_mul(exponential).min(max_ms);

    let jitter_range = capped / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped + jitter)
}

enum Connection {
    Tcp(TcpStream),
    Udp(UdpSocket),
}

impl Connection {
    fn send(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        match self {
            Connection::Tcp(stream) => stream.write_all(bytes),
            Connection::Udp(socket) => socket.send(bytes).map(|_| ()),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Connection::Tcp(stream) => stream.flush(),
            Connection::Udp(_) => Ok(()),
        }
    }
}

struct NetworkState {
    connection: Option<Connection>,
    failures: u32,
    next_retry: Option<Instant>,
}

/// Sink that ships records to a remote collector
///
/// # Example
///
/// ```no_run
/// use rust_sink_logger::prelude::*;
/// use rust_sink_logger::sinks::NetworkSink;
///
/// let sink = NetworkSink::tcp("127.0.0.1:5170").expect("collector reachable");
///
/// let logger = Logger::builder().name("net").sink(sink).build().unwrap();
/// logger.info("This record will be sent to 127.0.0.1:5170");
/// ```
pub struct NetworkSink {
    core: SinkCore,
    config: NetworkConfig,
    state: Mutex<NetworkState>,
}

impl NetworkSink {
    /// Connect over TCP with default settings
    ///
    /// # Errors
    ///
    /// Returns error if the address does not resolve or the connection fails
    pub fn tcp(address: impl Into<String>) -> Result<Self> {
        Self::with_config(NetworkConfig::new(address))
    }

    /// Send datagrams to `address`
    pub fn udp(address: impl Into<String>) -> Result<Self> {
        Self::with_config(NetworkConfig::new(address).protocol(Protocol::Udp))
    }

    pub fn with_config(config: NetworkConfig) -> Result<Self> {
        let connection = connect(&config)?;
        Ok(Self {
            core: SinkCore::new("network"),
            config,
            state: Mutex::new(NetworkState {
                connection: Some(connection),
                failures: 0,
                next_retry: None,
            }),
        })
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.core.set_name(name);
        self
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().connection.is_some()
    }

    /// Reconnect unless a backoff delay is still pending
    fn ensure_connected(&self, state: &mut NetworkState) -> Result<()> {
        if state.connection.is_some() {
            return Ok(());
        }
        if !self.config.reconnect {
            return Err(LoggerError::writer(format!(
                "Not connected to {}",
                self.config.address
            )));
        }
        if let Some(next) = state.next_retry {
            if Instant::now() < next {
                return Err(LoggerError::writer(format!(
                    "Not connected to {}; next reconnect attempt in {:?}",
                    self.config.address,
                    next - Instant::now()
                )));
            }
        }

        match connect(&self.config) {
            Ok(connection) => {
                state.connection = Some(connection);
                state.failures = 0;
                state.next_retry = None;
                Ok(())
            }
            Err(e) => {
                state.failures = state.failures.saturating_add(1);
                state.next_retry = Some(
                    Instant::now()
                        + calculate_backoff(
                            state.failures,
                            self.config.backoff_base,
                            self.config.backoff_max,
                        ),
                );
                Err(e)
            }
        }
    }
}

fn connect(config: &NetworkConfig) -> Result<Connection> {
    let addrs: Vec<SocketAddr> = config
        .address
        .to_socket_addrs()
        .map_err(|e| {
            LoggerError::io_operation(
                "resolve log collector",
                format!("Failed to resolve '{}'", config.address),
                e,
            )
        })?
        .collect();

    let mut last_error = None;
    for addr in addrs {
        let attempt = match config.protocol {
            Protocol::Tcp => connect_tcp(addr, config),
            Protocol::Udp => connect_udp(addr, config),
        };
        match attempt {
            Ok(connection) => return Ok(connection),
            Err(e) => last_error = Some(e),
        }
    }

    Err(match last_error {
        Some(e) => LoggerError::io_operation(
            "connect to log collector",
            format!("Failed to connect to '{}'", config.address),
            e,
        ),
        None => LoggerError::config(
            "NetworkSink",
            format!("'{}' resolved to no addresses", config.address),
        ),
    })
}

fn connect_tcp(addr: SocketAddr, config: &NetworkConfig) -> std::io::Result<Connection> {
    let stream = TcpStream::connect_timeout(&addr, config.connect_timeout)?;
    stream.set_write_timeout(Some(config.write_timeout))?;
    stream.set_nodelay(true)?;
    Ok(Connection::Tcp(stream))
}

fn connect_udp(addr: SocketAddr, config: &NetworkConfig) -> std::io::Result<Connection> {
    let local: SocketAddr = if addr.is_ipv4() {
        ([0, 0, 0, 0], 0).into()
    } else {
        ([0u16; 8], 0).into()
    };
    let socket = UdpSocket::bind(local)?;
    socket.set_write_timeout(Some(config.write_timeout))?;
    socket.connect(addr)?;
    Ok(Connection::Udp(socket))
}

impl Sink for NetworkSink {
    fn log(&self, record: &LogRecord) -> Result<()> {
        let buf = self.core.render(record);
        let mut state = self.state.lock();
        self.ensure_connected(&mut state)?;

        let Some(connection) = state.connection.as_mut() else {
            return Err(LoggerError::writer("Network connection unavailable"));
        };
        let Err(e) = connection.send(buf.as_bytes()) else {
            return Ok(());
        };

        // Connection lost: one immediate reconnect and resend
        state.connection = None;
        state.next_retry = None;
        self.ensure_connected(&mut state).map_err(|reconnect_err| {
            LoggerError::writer(format!(
                "Failed to send log record: {} (reconnect: {})",
                e, reconnect_err
            ))
        })?;
        let resent = match state.connection.as_mut() {
            Some(connection) => connection.send(buf.as_bytes()),
            None => return Err(LoggerError::writer("Network connection unavailable")),
        };
        resent.map_err(|e| {
            state.connection = None;
            LoggerError::writer(format!("Failed to resend log record: {}", e))
        })
    }

    fn flush(&self) -> Result<()> {
        if let Some(ref mut connection) = self.state.lock().connection {
            connection.flush()?;
        }
        Ok(())
    }

    delegate_sink_core!();
}

impl Drop for NetworkSink {
    fn drop(&mut self) {
        if let Some(ref mut connection) = self.state.get_mut().connection {
            let _ = connection.flush();
        }
    }
}
