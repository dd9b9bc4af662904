//! Command-line argument parsing.
//!
//! Usage:
//!   skippy [-f[<file>]] [-n] [-d] [-t<ms>] [-D<name>=<value>]... <document.csv>

use std::path::PathBuf;
use std::time::Duration;

pub const USAGE: &str =
    "Usage: skippy [-f[<file>]] [-n] [-d] [-t<ms>] [-D<name>=<value>]... <document.csv>";

// ── Public types ──────────────────────────────────────────────────────────────

/// Parsed command-line arguments.
#[derive(Debug, Default)]
pub struct CliArgs {
    /// Config-file specification.
    pub config: ConfigFile,
    /// Parse and list the document without connecting (`-n`).
    pub dry_run: bool,
    /// Debug logging (`-d`).
    pub debug: bool,
    /// Query timeout override (`-t<ms>`).
    pub timeout: Option<Duration>,
    /// Variable overrides applied after the document loads (`-D<name>=<value>`).
    pub overrides: Vec<(String, String)>,
    /// The document to run.
    pub document: PathBuf,
}

/// How to choose the config file.
#[derive(Debug, Default)]
pub enum ConfigFile {
    /// Search `~/.skippyrc`, then `./.skippyrc` (default).
    #[default]
    Search,
    /// `-f` with no file argument: skip config.
    Skip,
    /// `-f<file>`: load this specific file.
    Explicit(PathBuf),
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse `std::env::args()` and return [`CliArgs`] or an error message.
pub fn parse_args() -> Result<CliArgs, String> {
    let raw: Vec<String> = std::env::args().collect();
    parse_argv(&raw[1..])
}

/// Parse a slice of argument strings (exposed for testing).
pub fn parse_argv(argv: &[String]) -> Result<CliArgs, String> {
    let mut args = CliArgs::default();
    let mut positional: Vec<String> = Vec::new();
    let mut i = 0;

    // Value of a flag: the rest of this token, or the next argument.
    let take_value = |rest: String, i: &mut usize, flag: char| -> Result<String, String> {
        if !rest.is_empty() {
            Ok(rest)
        } else if *i + 1 < argv.len() {
            *i += 1;
            Ok(argv[*i].clone())
        } else {
            Err(format!("-{flag} requires an argument"))
        }
    };

    while i < argv.len() {
        let arg = argv[i].as_str();

        // `--` ends flag processing.
        if arg == "--" {
            i += 1;
            positional.extend(argv[i..].iter().cloned());
            break;
        }

        if !arg.starts_with('-') || arg == "-" {
            positional.push(arg.to_owned());
            i += 1;
            continue;
        }

        let chars: Vec<char> = arg[1..].chars().collect();
        let mut j = 0;
        while j < chars.len() {
            let rest: String = chars[j + 1..].iter().collect();
            match chars[j] {
                'n' => args.dry_run = true,
                'd' => args.debug = true,

                // -f[<file>]
                'f' => {
                    if !rest.is_empty() {
                        args.config = ConfigFile::Explicit(PathBuf::from(rest));
                        j = chars.len();
                    } else if i + 2 < argv.len() && !argv[i + 1].starts_with('-') {
                        // Separate: -f <file> <document>
                        i += 1;
                        args.config = ConfigFile::Explicit(PathBuf::from(&argv[i]));
                    } else {
                        args.config = ConfigFile::Skip;
                    }
                }

                // -t<ms>
                't' => {
                    let consumed = !rest.is_empty();
                    let ms = take_value(rest, &mut i, 't')?;
                    let ms: u64 = ms
                        .parse()
                        .map_err(|_| format!("invalid timeout: {ms}"))?;
                    args.timeout = Some(Duration::from_millis(ms));
                    if consumed {
                        j = chars.len();
                    }
                }

                // -D<name>=<value>
                'D' => {
                    let consumed = !rest.is_empty();
                    let pair = take_value(rest, &mut i, 'D')?;
                    let (name, value) = pair
                        .split_once('=')
                        .filter(|(name, _)| !name.is_empty())
                        .ok_or_else(|| format!("-D expects <name>=<value>, got {pair:?}"))?;
                    args.overrides.push((name.to_owned(), value.to_owned()));
                    if consumed {
                        j = chars.len();
                    }
                }

                c => return Err(format!("unknown option: -{c}")),
            }
            j += 1;
        }
        i += 1;
    }

    match positional.len() {
        0 => return Err("missing document argument".to_owned()),
        1 => args.document = PathBuf::from(positional.remove(0)),
        n => return Err(format!("too many arguments ({n})")),
    }

    Ok(args)
}

// ── Path helpers ──────────────────────────────────────────────────────────────

/// Search for the config file in the standard locations.
/// Returns the first path that exists, or `None`.
pub fn find_user_config() -> Option<PathBuf> {
    let home = std::env::var("HOME").unwrap_or_default();
    [format!("{home}/.skippyrc"), "./.skippyrc".to_owned()]
        .into_iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
