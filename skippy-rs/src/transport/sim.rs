//! In-memory simulated instrument.
//!
//! Behaves like a minimal SCPI device so documents can be rehearsed without
//! hardware:
//!
//! - `*IDN?` answers the identification string.
//! - `*RST` forgets every setting.
//! - `HEADER value` stores a setting that `HEADER?` reads back (headers are
//!   case-insensitive).
//! - any other query answers `0`.
//!
//! Canned replies added with [`SimInstrument::with_response`] take priority.
//! Every exchange is appended to a transcript shared by all handles cloned
//! from the same instrument.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{ConnectOptions, Connector, Transport, TransportError};

pub const IDENTITY: &str = "Skippy,Simulated Instrument,0,1.0";

/// One recorded exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exchange {
    Write(String),
    Query { sent: String, response: String },
}

#[derive(Debug, Default)]
struct SimState {
    settings: HashMap<String, String>,
    canned: HashMap<String, String>,
    fail_on: Option<String>,
    opened: Vec<String>,
    transcript: Vec<Exchange>,
}

/// A simulated instrument; clones share state.
#[derive(Debug, Clone, Default)]
pub struct SimInstrument {
    state: Arc<Mutex<SimState>>,
    termination: String,
}

/// Upper-cased command header: the text before the first space.
fn header(text: &str) -> String {
    text.split_whitespace()
        .next()
        .unwrap_or("")
        .to_ascii_uppercase()
}

impl SimInstrument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `query` with `response` instead of the default behaviour.
    pub fn with_response(self, query: &str, response: &str) -> Self {
        self.lock()
            .canned
            .insert(query.trim().to_ascii_uppercase(), response.to_owned());
        self
    }

    /// Fail any write or query whose text equals `text`.
    pub fn failing_on(self, text: &str) -> Self {
        self.lock().fail_on = Some(text.to_owned());
        self
    }

    /// Addresses this instrument was opened with, in order.
    pub fn opened(&self) -> Vec<String> {
        self.lock().opened.clone()
    }

    /// Every exchange so far, in order.
    pub fn transcript(&self) -> Vec<Exchange> {
        self.lock().transcript.clone()
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_failure(state: &SimState, text: &str) -> Result<(), TransportError> {
        if state.fail_on.as_deref() == Some(text) {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                format!("simulated failure on {text:?}"),
            )));
        }
        Ok(())
    }
}

impl Connector for SimInstrument {
    type Conn = SimInstrument;

    async fn open(&self, options: &ConnectOptions) -> Result<SimInstrument, TransportError> {
        self.lock().opened.push(options.address.clone());
        Ok(SimInstrument {
            state: Arc::clone(&self.state),
            termination: options.termination.clone(),
        })
    }
}

impl Transport for SimInstrument {
    async fn write(&mut self, text: &str) -> Result<(), TransportError> {
        let mut state = self.lock();
        Self::check_failure(&state, text)?;

        let head = header(text);
        if head == "*RST" {
            state.settings.clear();
        } else if !head.ends_with('?') {
            let value = text.trim()[head.len()..].trim();
            if !value.is_empty() {
                state.settings.insert(head, value.to_owned());
            }
        }
        state.transcript.push(Exchange::Write(text.to_owned()));
        Ok(())
    }

    async fn query(&mut self, text: &str) -> Result<String, TransportError> {
        let mut state = self.lock();
        Self::check_failure(&state, text)?;

        let key = text.trim().to_ascii_uppercase();
        let response = if let Some(canned) = state.canned.get(&key) {
            canned.clone()
        } else if key == "*IDN?" {
            IDENTITY.to_owned()
        } else {
            let head = header(&key);
            head.strip_suffix('?')
                .and_then(|h| state.settings.get(h))
                .cloned()
                .unwrap_or_else(|| "0".to_owned())
        };

        state.transcript.push(Exchange::Query {
            sent: text.to_owned(),
            response: response.clone(),
        });
        Ok(format!("{response}{}", self.termination))
    }
}
