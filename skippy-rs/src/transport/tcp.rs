//! Raw SCPI over TCP (the `::SOCKET` resource class).
//!
//! Each outgoing line gets the termination appended.  A query reads until
//! the termination arrives; the whole read is bounded by the timeout.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use super::{ConnectOptions, Transport, TransportError};

#[derive(Debug)]
pub struct TcpInstrument {
    stream: BufReader<TcpStream>,
    termination: Vec<u8>,
    timeout: Duration,
}

impl TcpInstrument {
    /// Connect to `host:port`, giving up after `options.timeout`.
    pub async fn connect(
        host: &str,
        port: u16,
        options: &ConnectOptions,
    ) -> Result<Self, TransportError> {
        let connect_err = |source| TransportError::Connect {
            address: options.address.clone(),
            source,
        };
        let stream = timeout(options.timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| TransportError::Timeout(options.timeout))?
            .map_err(connect_err)?;
        stream.set_nodelay(true).map_err(connect_err)?;
        debug!(host, port, "connected");

        let termination = if options.termination.is_empty() {
            b"\n".to_vec()
        } else {
            options.termination.as_bytes().to_vec()
        };
        Ok(Self {
            stream: BufReader::new(stream),
            termination,
            timeout: options.timeout,
        })
    }

    async fn send_line(&mut self, text: &str) -> Result<(), TransportError> {
        let mut buf = Vec::with_capacity(text.len() + self.termination.len());
        buf.extend_from_slice(text.as_bytes());
        buf.extend_from_slice(&self.termination);
        let sock = self.stream.get_mut();
        sock.write_all(&buf).await?;
        sock.flush().await?;
        Ok(())
    }

    /// Read bytes until the buffer ends with the termination.
    async fn read_reply(&mut self) -> Result<Vec<u8>, TransportError> {
        let last = self.termination[self.termination.len() - 1];
        let mut reply = Vec::new();
        loop {
            let n = self.stream.read_until(last, &mut reply).await?;
            if n == 0 {
                return Err(TransportError::Closed);
            }
            if reply.ends_with(&self.termination) {
                return Ok(reply);
            }
        }
    }
}

impl Transport for TcpInstrument {
    async fn write(&mut self, text: &str) -> Result<(), TransportError> {
        self.send_line(text).await
    }

    async fn query(&mut self, text: &str) -> Result<String, TransportError> {
        self.send_line(text).await?;
        let limit = self.timeout;
        let reply = timeout(limit, self.read_reply())
            .await
            .map_err(|_| TransportError::Timeout(limit))??;
        Ok(String::from_utf8_lossy(&reply).into_owned())
    }
}
