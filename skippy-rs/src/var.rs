//! Variable store.
//!
//! Holds the string-valued variables loaded from the first table of a
//! document.  The interpreter mutates it during a run: `X` is rewritten on
//! every iteration and `update` captures store query responses.

use indexmap::IndexMap;

/// Connection target read by the interpreter when it opens the instrument.
pub const ADDRESS: &str = "Address";
/// Line terminator handed to the transport (escape sequences decoded).
pub const TERMINATION: &str = "Termination";
/// Query timeout in milliseconds.
pub const TIMEOUT: &str = "Timeout";
/// 1-based index of the current iteration.
pub const ITERATION: &str = "X";

/// Ordered key/value variable store.
///
/// Iteration order is insertion order; overwriting a variable keeps its
/// original position.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VarStore {
    vars: IndexMap<String, String>,
}

impl VarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or overwrite) a variable.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Get the string value of a variable.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Returns `true` if the variable is set.
    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Remove every variable.
    pub fn clear(&mut self) {
        self.vars.clear();
    }

    /// Iterate over all variables in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl Extend<(String, String)> for VarStore {
    fn extend<I: IntoIterator<Item = (String, String)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.set(name, value);
        }
    }
}

/// Decode the backslash escapes allowed in a `Termination` value.
///
/// Spreadsheet cells cannot hold a raw newline comfortably, so `\n`, `\r`,
/// `\t` and `\\` are spelled out.  Unknown escapes are kept verbatim.
pub fn decode_escapes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
