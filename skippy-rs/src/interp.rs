//! Command interpreter.
//!
//! The [`Interpreter`] owns the [`VarStore`] and a read-only view of the
//! command table, and executes the rows in order against a [`Connector`].
//!
//! For each row:
//!
//! 1. The iteration count is resolved (`Iterate $N` reads `N`, otherwise 1).
//! 2. For each iteration, `X` is set to the 1-based index and `$Name`
//!    references in the command text are substituted.
//! 3. The substituted text is split on `;`; each statement is dispatched with
//!    the row's operation (`Auto` picks `Query` or `Write` per statement).
//!
//! The instrument connection is opened on the first `Write`/`Query` and kept
//! for the rest of the run.  The interpreter never appends a line
//! terminator; the transport adds the `Termination` it was opened with.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::command::{Command, Operation, SpecialOp};
use crate::document::Document;
use crate::duration::parse_duration;
use crate::error::{Error, Result};
use crate::expand::{substitute, unresolved};
use crate::transport::{ConnectOptions, Connector, Transport, TransportError};
use crate::var::{self, VarStore};

/// Query timeout used when neither the document nor the caller sets one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

// ── Run summary ───────────────────────────────────────────────────────────────

/// What one dispatched statement did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Wrote(String),
    Queried { sent: String, response: String },
    Delayed(Duration),
    Comment(String),
    /// Unrecognised operation; nothing was sent.
    Skipped { operation: String, text: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// 1-based row index in the command table.
    pub command: usize,
    /// 1-based iteration index.
    pub iteration: u64,
    pub outcome: Outcome,
}

/// Every statement dispatched during a successful run, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub steps: Vec<Step>,
}

impl RunSummary {
    /// Number of statements that reached the instrument.
    pub fn instrument_ops(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s.outcome, Outcome::Wrote(_) | Outcome::Queried { .. }))
            .count()
    }
}

// ── Lazy connection ───────────────────────────────────────────────────────────

/// The run's single instrument handle, opened on first use.
struct Link<'c, C: Connector> {
    connector: &'c C,
    conn: Option<C::Conn>,
}

impl<'c, C: Connector> Link<'c, C> {
    fn new(connector: &'c C) -> Self {
        Self { connector, conn: None }
    }

    async fn get(
        &mut self,
        options: impl FnOnce() -> std::result::Result<ConnectOptions, TransportError>,
    ) -> std::result::Result<&mut C::Conn, TransportError> {
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => {
                let options = options()?;
                info!(address = %options.address, "opening instrument");
                self.connector.open(&options).await?
            }
        };
        Ok(self.conn.insert(conn))
    }
}

// ── Interpreter ───────────────────────────────────────────────────────────────

pub struct Interpreter {
    /// Variables; mutated by `X` and `Update` during a run.
    pub vars: VarStore,
    commands: Arc<[Command]>,
    cancel: CancelToken,
    timeout: Duration,
}

impl Interpreter {
    pub fn new(document: Document) -> Self {
        Self {
            vars: document.vars,
            commands: document.commands.into(),
            cancel: CancelToken::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Use `token` to stop the run from outside.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Query timeout used when the `Timeout` variable is not set.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Execute every command in order.
    ///
    /// Stops at the first fatal error; non-fatal conditions are logged and
    /// recorded as [`Outcome::Skipped`].
    pub async fn run<C: Connector>(&mut self, connector: &C) -> Result<RunSummary> {
        let commands = Arc::clone(&self.commands);
        let mut link = Link::new(connector);
        let mut summary = RunSummary::default();

        for (i, cmd) in commands.iter().enumerate() {
            let index = i + 1;
            self.check_cancel(index)?;
            self.exec_command(index, cmd, &mut link, &mut summary).await?;
        }

        Ok(summary)
    }

    async fn exec_command<C: Connector>(
        &mut self,
        index: usize,
        cmd: &Command,
        link: &mut Link<'_, C>,
        summary: &mut RunSummary,
    ) -> Result<()> {
        debug!(command = index, address = %cmd.address, operation = %cmd.operation, "command");
        if let SpecialOp::Unknown(op) = &cmd.special_op {
            warn!(command = index, "unrecognised special operation {op:?} ignored");
        }

        let count = self.iteration_count(index, cmd)?;
        if count == 0 {
            debug!(command = index, "iteration count is not positive, skipping");
        }

        for iteration in 1..=count {
            if iteration > 1 {
                self.check_cancel(index)?;
            }
            self.vars.set(var::ITERATION, iteration.to_string());

            if iteration == 1 && cmd.operation != Operation::Delay {
                for name in unresolved(&cmd.command, &self.vars) {
                    warn!(command = index, "${name} is not set; sent verbatim");
                }
            }
            let text = substitute(&cmd.command, &self.vars).into_owned();

            for (n, statement) in split_statements(&text).into_iter().enumerate() {
                if n > 0 {
                    self.check_cancel(index)?;
                }
                let outcome = self.dispatch(index, cmd, statement, link).await?;
                summary.steps.push(Step { command: index, iteration, outcome });
            }
        }
        Ok(())
    }

    async fn dispatch<C: Connector>(
        &mut self,
        index: usize,
        cmd: &Command,
        statement: &str,
        link: &mut Link<'_, C>,
    ) -> Result<Outcome> {
        let transport_err = |source| Error::Transport { command: index, source };
        let op = cmd.operation.resolve(statement);

        if cmd.special_op == SpecialOp::Update && op != Operation::Query {
            warn!(command = index, "Update only applies to queries; ignored for {op}");
        }

        let outcome = match op {
            Operation::Write => {
                let conn = link
                    .get(|| self.connect_options())
                    .await
                    .map_err(transport_err)?;
                conn.write(statement).await.map_err(transport_err)?;
                info!("[{index}] WRITE {statement}");
                Outcome::Wrote(statement.to_owned())
            }
            Operation::Query => {
                let conn = link
                    .get(|| self.connect_options())
                    .await
                    .map_err(transport_err)?;
                let raw = conn.query(statement).await.map_err(transport_err)?;
                let response = raw.trim_end().to_owned();
                info!("[{index}] QUERY {statement} -> {response}");

                if cmd.special_op == SpecialOp::Update {
                    match cmd.arg_variable(true) {
                        Some(name) => {
                            debug!(command = index, "${name} = {response:?}");
                            self.vars.set(name, response.clone());
                        }
                        None => warn!(
                            command = index,
                            "Update argument {:?} is not a $Name; response discarded",
                            cmd.special_op_arg
                        ),
                    }
                }
                Outcome::Queried { sent: statement.to_owned(), response }
            }
            Operation::Delay => {
                let delay = parse_duration(&cmd.command)
                    .map_err(|source| Error::DurationParse { command: index, source })?;
                info!("[{index}] DELAY {delay:?}");
                self.pause(index, delay).await?;
                Outcome::Delayed(delay)
            }
            Operation::Comment => {
                info!("[{index}] COMMENT {statement}");
                Outcome::Comment(statement.to_owned())
            }
            other => {
                warn!(command = index, "unrecognised operation {:?}; skipped", other.name());
                Outcome::Skipped {
                    operation: other.name().to_owned(),
                    text: statement.to_owned(),
                }
            }
        };
        Ok(outcome)
    }

    /// Number of times `cmd` runs.
    fn iteration_count(&self, index: usize, cmd: &Command) -> Result<u64> {
        if cmd.special_op != SpecialOp::Iterate {
            return Ok(1);
        }
        let resolution = |name: &str, reason: String| Error::VariableResolution {
            command: index,
            name: name.to_owned(),
            reason,
        };

        let name = cmd
            .arg_variable(false)
            .ok_or_else(|| resolution(&cmd.special_op_arg, "no variable named".to_owned()))?;
        let value = self
            .vars
            .get(name)
            .ok_or_else(|| resolution(name, "not set".to_owned()))?;
        let count: i64 = value
            .trim()
            .parse()
            .map_err(|_| resolution(name, format!("{value:?} is not an integer")))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Connection parameters from the current variables.
    fn connect_options(&self) -> std::result::Result<ConnectOptions, TransportError> {
        let address = self
            .vars
            .get(var::ADDRESS)
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .ok_or(TransportError::MissingAddress)?;

        let termination = self
            .vars
            .get(var::TERMINATION)
            .map(var::decode_escapes)
            .unwrap_or_else(|| "\n".to_owned());

        let timeout = match self.vars.get(var::TIMEOUT) {
            Some(ms) => match ms.trim().parse::<u64>() {
                Ok(ms) => Duration::from_millis(ms),
                Err(_) => {
                    warn!(
                        "Timeout {ms:?} is not a whole number of milliseconds; using {:?}",
                        self.timeout
                    );
                    self.timeout
                }
            },
            None => self.timeout,
        };

        Ok(ConnectOptions { address: address.to_owned(), termination, timeout })
    }

    /// Wait for `delay`, returning early with [`Error::Cancelled`] if the
    /// cancel token fires.
    async fn pause(&self, index: usize, delay: Duration) -> Result<()> {
        if delay.is_zero() {
            return Ok(());
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => Ok(()),
            _ = self.cancel.cancelled() => Err(Error::Cancelled { command: index }),
        }
    }

    fn check_cancel(&self, index: usize) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled { command: index });
        }
        Ok(())
    }
}

/// Split substituted text into statements.
///
/// Text without `;` is a single statement (possibly empty).  Otherwise each
/// `;`-separated piece is trimmed and empty pieces are dropped.
pub fn split_statements(text: &str) -> Vec<&str> {
    if !text.contains(';') {
        return vec![text.trim()];
    }
    text.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
