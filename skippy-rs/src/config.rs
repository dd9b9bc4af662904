//! `.skippyrc` configuration file parser.
//!
//! A small line-oriented file that supplies defaults for every run:
//!
//! | Directive | Action |
//! |-----------|--------|
//! | `/set <name>=<value>` or `/set <name> <value>` | default variable |
//! | `/timeout <ms>` | default query timeout |
//! | Lines starting with `;` | comment, ignored |
//! | Any other `/command` | silently skipped |
//!
//! Default variables are loaded before the document's variable table, so the
//! document always wins.  A typical file pins the bench's usual terminator:
//!
//! ```text
//! ; bench 3
//! /set Termination=\r\n
//! /timeout 2000
//! ```

use std::path::Path;
use std::time::Duration;

use thiserror::Error;

use crate::error::{Error, Result};
use crate::var::VarStore;

// ── Public API ────────────────────────────────────────────────────────────────

/// A non-fatal error encountered while loading a config file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct ConfigError {
    pub line: usize,
    pub message: String,
}

/// Parsed configuration: default variables and settings.
#[derive(Debug, Default)]
pub struct Config {
    pub vars: VarStore,
    pub timeout: Option<Duration>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config string.
    ///
    /// Unknown directives are skipped so newer files still load.  Returns the
    /// config and a list of parse errors on recognised lines.
    pub fn load_str(s: &str) -> (Self, Vec<ConfigError>) {
        let mut config = Config::new();
        let mut errors = Vec::new();

        for (i, raw) in s.lines().enumerate() {
            let lineno = i + 1;
            let line = raw.trim();

            if line.is_empty() || line.starts_with(';') {
                continue;
            }

            let Some(rest) = line.strip_prefix('/') else { continue };

            let (cmd, args_str) = rest
                .split_once(|c: char| c.is_ascii_whitespace())
                .unwrap_or((rest, ""));
            let tokens = split_args(args_str.trim());

            let result = match cmd {
                "set" => parse_set(&tokens, &mut config.vars),
                "timeout" => parse_timeout(&tokens).map(|t| config.timeout = Some(t)),
                _ => Ok(()),
            };
            if let Err(message) = result {
                errors.push(ConfigError { line: lineno, message });
            }
        }

        (config, errors)
    }

    /// Read and parse a config file from disk.
    pub fn load_file(path: &Path) -> Result<(Self, Vec<ConfigError>)> {
        let s = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_owned(),
            source,
        })?;
        Ok(Self::load_str(&s))
    }
}

// ── Argument tokenizer ────────────────────────────────────────────────────────

/// Split `s` into whitespace-delimited tokens, honouring double-quoted strings
/// and `\"` escapes within them.  Backslashes outside quotes are literal, so
/// `\r\n` survives for [`crate::var::decode_escapes`].
fn split_args(s: &str) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => in_quotes = !in_quotes,
            '\\' if in_quotes && chars.peek() == Some(&'"') => {
                cur.push('"');
                chars.next();
            }
            c if c.is_ascii_whitespace() && !in_quotes => {
                if !cur.is_empty() {
                    args.push(std::mem::take(&mut cur));
                }
            }
            c => cur.push(c),
        }
    }
    if !cur.is_empty() {
        args.push(cur);
    }
    args
}

// ── Directives ────────────────────────────────────────────────────────────────

/// Parse `/set <name>=<value>` or `/set <name> <value>`.
fn parse_set(tokens: &[String], vars: &mut VarStore) -> std::result::Result<(), String> {
    if tokens.is_empty() {
        return Err("/set: requires an argument".into());
    }

    let (name, value) = if let Some((name, value)) = tokens[0].split_once('=') {
        (name.to_owned(), value.to_owned())
    } else if tokens.len() >= 2 {
        (tokens[0].clone(), tokens[1..].join(" "))
    } else {
        return Err(format!("/set: missing value for '{}'", tokens[0]));
    };

    if name.is_empty() {
        return Err("/set: variable name cannot be empty".into());
    }

    vars.set(name, value);
    Ok(())
}

/// Parse `/timeout <ms>`.
fn parse_timeout(tokens: &[String]) -> std::result::Result<Duration, String> {
    match tokens {
        [ms] => ms
            .parse()
            .map(Duration::from_millis)
            .map_err(|_| format!("/timeout: {ms:?} is not a whole number of milliseconds")),
        _ => Err("/timeout: requires exactly one argument".into()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // -- split_args -----------------------------------------------------------

    #[test]
    fn split_simple() {
        assert_eq!(split_args("foo bar baz"), ["foo", "bar", "baz"]);
    }

    #[test]
    fn split_quoted_spaces() {
        assert_eq!(split_args(r#"Label "Bench 3 PSU""#), ["Label", "Bench 3 PSU"]);
    }

    #[test]
    fn split_escaped_quote_inside_quotes() {
        assert_eq!(split_args(r#""say \"hi\"""#), [r#"say "hi""#]);
    }

    #[test]
    fn split_keeps_backslash_escapes() {
        assert_eq!(split_args(r"Termination=\r\n"), [r"Termination=\r\n"]);
    }

    // -- /set -----------------------------------------------------------------

    #[test]
    fn set_equals_syntax() {
        let (cfg, errs) = Config::load_str("/set Address=SIM::INSTR");
        assert!(errs.is_empty(), "{errs:?}");
        assert_eq!(cfg.vars.get("Address"), Some("SIM::INSTR"));
    }

    #[test]
    fn set_space_syntax() {
        let (cfg, errs) = Config::load_str("/set Count 8");
        assert!(errs.is_empty(), "{errs:?}");
        assert_eq!(cfg.vars.get("Count"), Some("8"));
    }

    #[test]
    fn set_value_with_spaces() {
        let (cfg, errs) = Config::load_str("/set Operator jane doe");
        assert!(errs.is_empty(), "{errs:?}");
        assert_eq!(cfg.vars.get("Operator"), Some("jane doe"));
    }

    #[test]
    fn set_without_value_is_error() {
        let (_, errs) = Config::load_str("/set lonely");
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].line, 1);
    }

    // -- /timeout -------------------------------------------------------------

    #[test]
    fn timeout_directive() {
        let (cfg, errs) = Config::load_str("/timeout 1500");
        assert!(errs.is_empty(), "{errs:?}");
        assert_eq!(cfg.timeout, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn bad_timeout_reports_line() {
        let (cfg, errs) = Config::load_str("/set a=1\n/timeout soon");
        assert_eq!(cfg.timeout, None);
        assert_eq!(errs[0].line, 2);
        assert!(errs[0].to_string().starts_with("line 2: /timeout"));
    }

    // -- Comments & skipping --------------------------------------------------

    #[test]
    fn semicolon_comments_ignored() {
        let (cfg, errs) = Config::load_str(
            ";; This is a comment\n\
             ; Also a comment\n\
             /set real=yes",
        );
        assert!(errs.is_empty(), "{errs:?}");
        assert_eq!(cfg.vars.get("real"), Some("yes"));
        assert_eq!(cfg.vars.len(), 1);
    }

    #[test]
    fn unknown_directives_silently_skipped() {
        let (cfg, errs) = Config::load_str("/retries 3\n/set loaded=yes");
        assert!(errs.is_empty(), "{errs:?}");
        assert!(cfg.vars.contains("loaded"));
    }

    #[test]
    fn realistic_rc() {
        let src = "\
; bench 3\n\
\n\
/set Termination=\\r\\n\n\
/set Address TCPIP0::192.168.0.40::5025::SOCKET\n\
/timeout 2000\n\
";
        let (cfg, errs) = Config::load_str(src);
        assert!(errs.is_empty(), "{errs:?}");
        assert_eq!(cfg.vars.get("Termination"), Some("\\r\\n"));
        assert_eq!(cfg.vars.get("Address"), Some("TCPIP0::192.168.0.40::5025::SOCKET"));
        assert_eq!(cfg.timeout, Some(Duration::from_secs(2)));
    }

    #[test]
    fn load_file_reads_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"/set from=disk\n").unwrap();
        let (cfg, errs) = Config::load_file(file.path()).unwrap();
        assert!(errs.is_empty());
        assert_eq!(cfg.vars.get("from"), Some("disk"));
    }
}
