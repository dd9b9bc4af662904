//! Instrument transports.
//!
//! The interpreter talks to an instrument through two traits:
//!
//! - [`Connector`] opens a connection from [`ConnectOptions`] (the `Address`,
//!   `Termination` and `Timeout` variables at the moment of the first
//!   instrument operation).
//! - [`Transport`] is the open connection: `write` sends a line, `query`
//!   sends a line and returns the reply.
//!
//! [`ResourceConnector`] is the connector the binary uses.  It picks a
//! concrete transport from the address string:
//!
//! | Address                                  | Transport          |
//! |------------------------------------------|--------------------|
//! | `SIM::…`                                 | [`SimInstrument`]  |
//! | `TCPIP[n]::<host>::<port>::SOCKET`       | [`TcpInstrument`]  |
//! | `TCPIP[n]::<host>::SOCKET` (port 5025)   | [`TcpInstrument`]  |
//! | `<host>:<port>`                          | [`TcpInstrument`]  |
//!
//! Serial, GPIB, USB and VXI-11 resources are rejected with
//! [`TransportError::UnsupportedResource`].

pub mod sim;
pub mod tcp;

use std::io;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub use sim::{Exchange, SimInstrument};
pub use tcp::TcpInstrument;

/// Default raw-socket SCPI port.
pub const SCPI_PORT: u16 = 5025;

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no Address variable is set")]
    MissingAddress,

    #[error("unsupported resource {0:?}")]
    UnsupportedResource(String),

    #[error("cannot connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("connection closed by instrument")]
    Closed,
}

// ── Traits ────────────────────────────────────────────────────────────────────

/// What a [`Connector`] needs to open a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    pub address: String,
    /// Appended to every outgoing line; marks the end of every reply.
    pub termination: String,
    pub timeout: Duration,
}

/// An open instrument connection.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Send `text`; no reply is read.
    async fn write(&mut self, text: &str) -> Result<(), TransportError>;

    /// Send `text` and return the raw reply (termination included).
    async fn query(&mut self, text: &str) -> Result<String, TransportError>;
}

/// Opens connections for the interpreter.
#[allow(async_fn_in_trait)]
pub trait Connector {
    type Conn: Transport;

    async fn open(&self, options: &ConnectOptions) -> Result<Self::Conn, TransportError>;
}

// ── Resource addresses ────────────────────────────────────────────────────────

/// A parsed instrument address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Sim,
    Tcp { host: String, port: u16 },
}

impl FromStr for Resource {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unsupported = || TransportError::UnsupportedResource(s.to_owned());
        let address = s.trim();
        if address.is_empty() {
            return Err(TransportError::MissingAddress);
        }

        let parts: Vec<&str> = address.split("::").collect();
        let interface = parts[0].to_ascii_uppercase();

        if interface.starts_with("SIM") {
            return Ok(Resource::Sim);
        }

        if let Some(board) = interface.strip_prefix("TCPIP") {
            if !board.chars().all(|c| c.is_ascii_digit()) {
                return Err(unsupported());
            }
            let is_socket = parts
                .last()
                .is_some_and(|p| p.eq_ignore_ascii_case("SOCKET"));
            return match (parts.len(), is_socket) {
                (3, true) => Ok(Resource::Tcp {
                    host: parts[1].to_owned(),
                    port: SCPI_PORT,
                }),
                (4, true) => Ok(Resource::Tcp {
                    host: parts[1].to_owned(),
                    port: parts[2].parse().map_err(|_| unsupported())?,
                }),
                _ => Err(unsupported()),
            };
        }

        if parts.len() == 1 {
            if let Some((host, port)) = address.rsplit_once(':') {
                if !host.is_empty() {
                    if let Ok(port) = port.parse() {
                        return Ok(Resource::Tcp { host: host.to_owned(), port });
                    }
                }
            }
        }

        Err(unsupported())
    }
}

// ── ResourceConnector ─────────────────────────────────────────────────────────

/// Connection opened by [`ResourceConnector`].
#[derive(Debug)]
pub enum Instrument {
    Sim(SimInstrument),
    Tcp(TcpInstrument),
}

impl Transport for Instrument {
    async fn write(&mut self, text: &str) -> Result<(), TransportError> {
        match self {
            Instrument::Sim(sim) => sim.write(text).await,
            Instrument::Tcp(tcp) => tcp.write(text).await,
        }
    }

    async fn query(&mut self, text: &str) -> Result<String, TransportError> {
        match self {
            Instrument::Sim(sim) => sim.query(text).await,
            Instrument::Tcp(tcp) => tcp.query(text).await,
        }
    }
}

/// Dispatches on the address string to a concrete transport.
///
/// `SIM::` addresses all share the connector's [`SimInstrument`], so its
/// transcript can be inspected after a run.
#[derive(Debug, Clone, Default)]
pub struct ResourceConnector {
    pub sim: SimInstrument,
}

impl Connector for ResourceConnector {
    type Conn = Instrument;

    async fn open(&self, options: &ConnectOptions) -> Result<Instrument, TransportError> {
        match options.address.parse::<Resource>()? {
            Resource::Sim => Ok(Instrument::Sim(self.sim.open(options).await?)),
            Resource::Tcp { host, port } => Ok(Instrument::Tcp(
                TcpInstrument::connect(&host, port, options).await?,
            )),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
