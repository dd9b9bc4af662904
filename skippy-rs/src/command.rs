//! Command-table rows.
//!
//! Each row of the second table becomes one [`Command`].  The `Operation`
//! and `SpecialOp` cells are parsed case-insensitively; values outside the
//! known set are kept so they can be reported when the row executes.

use std::fmt;

// ── Operation ─────────────────────────────────────────────────────────────────

/// What a row does with each of its statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Write,
    Query,
    Delay,
    Comment,
    /// `Query` when the statement ends with `?`, otherwise `Write`.
    Auto,
    /// Anything else, kept verbatim for the warning.
    Unknown(String),
}

impl Operation {
    /// Resolve [`Operation::Auto`] against a concrete statement.
    pub fn resolve(&self, statement: &str) -> Operation {
        match self {
            Operation::Auto if statement.trim_end().ends_with('?') => Operation::Query,
            Operation::Auto => Operation::Write,
            other => other.clone(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Operation::Write => "WRITE",
            Operation::Query => "QUERY",
            Operation::Delay => "DELAY",
            Operation::Comment => "COMMENT",
            Operation::Auto => "AUTO",
            Operation::Unknown(s) => s,
        }
    }
}

impl From<&str> for Operation {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "write" => Operation::Write,
            "query" => Operation::Query,
            "delay" => Operation::Delay,
            "comment" => Operation::Comment,
            "auto" => Operation::Auto,
            _ => Operation::Unknown(s.trim().to_owned()),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── SpecialOp ─────────────────────────────────────────────────────────────────

/// Per-row modifier layered on top of the operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SpecialOp {
    #[default]
    None,
    /// Repeat the row `$N` times, binding `X` to the 1-based index.
    Iterate,
    /// Store the query response into `$Name`.
    Update,
    /// Unrecognised modifier; ignored with a warning.
    Unknown(String),
}

impl From<&str> for SpecialOp {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "" => SpecialOp::None,
            "iterate" => SpecialOp::Iterate,
            "update" => SpecialOp::Update,
            _ => SpecialOp::Unknown(s.trim().to_owned()),
        }
    }
}

impl fmt::Display for SpecialOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecialOp::None => Ok(()),
            SpecialOp::Iterate => f.write_str("Iterate"),
            SpecialOp::Update => f.write_str("Update"),
            SpecialOp::Unknown(s) => f.write_str(s),
        }
    }
}

// ── Command ───────────────────────────────────────────────────────────────────

/// One row of the command table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Free-text label; the connection itself comes from `$Address`.
    pub address: String,
    pub operation: Operation,
    /// Raw command text, before `$Name` substitution and `;` splitting.
    pub command: String,
    pub special_op: SpecialOp,
    pub special_op_arg: String,
}

impl Command {
    /// Build a command from the raw (already trimmed) table cells.
    pub fn from_cells(
        address: &str,
        operation: &str,
        command: &str,
        special_op: &str,
        special_op_arg: &str,
    ) -> Self {
        Self {
            address: address.to_owned(),
            operation: operation.into(),
            command: command.to_owned(),
            special_op: special_op.into(),
            special_op_arg: special_op_arg.to_owned(),
        }
    }

    /// The variable named by `special_op_arg`, without its leading `$`.
    ///
    /// `require_sigil` rejects arguments that do not start with `$`.
    pub fn arg_variable(&self, require_sigil: bool) -> Option<&str> {
        match self.special_op_arg.strip_prefix('$') {
            Some(name) if !name.is_empty() => Some(name),
            Some(_) => None,
            None if require_sigil || self.special_op_arg.is_empty() => None,
            None => Some(&self.special_op_arg),
        }
    }
}
