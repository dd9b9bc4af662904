//! `$Name` substitution.
//!
//! A reference is `$` followed by the name of a variable in the store.  Names
//! may hold any characters (`$Ch.1`, `$V-Max`), and at each `$` the longest
//! defined name wins, so `$CountMax` resolves through `CountMax` even when
//! `Count` is also set.  A `$` that starts no defined name stays in the text
//! unchanged and reaches the instrument verbatim.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use tracing::warn;

use crate::var::VarStore;

/// Word-character references, used only to report names nothing resolves.
fn word_reference_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$(\w+)").expect("reference pattern is valid"))
}

/// `$` followed by any defined name, longest names first so the leftmost
/// alternative that matches is the longest.
fn defined_reference_re(vars: &VarStore) -> Option<Regex> {
    let mut names: Vec<&str> = vars
        .iter()
        .map(|(name, _)| name)
        .filter(|name| !name.is_empty())
        .collect();
    if names.is_empty() {
        return None;
    }
    names.sort_by(|a, b| b.len().cmp(&a.len()));
    let alternation: Vec<String> = names.into_iter().map(regex::escape).collect();
    match Regex::new(&format!(r"\$(?:{})", alternation.join("|"))) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!("cannot match variable references: {e}");
            None
        }
    }
}

/// Replace every `$Name` in `src` with the value of `Name` in `vars`.
///
/// Returns the input unchanged (borrowed) when nothing was substituted.
pub fn substitute<'a>(src: &'a str, vars: &VarStore) -> Cow<'a, str> {
    if !src.contains('$') {
        return Cow::Borrowed(src);
    }
    let Some(re) = defined_reference_re(vars) else {
        return Cow::Borrowed(src);
    };
    re.replace_all(src, |caps: &Captures<'_>| {
        vars.get(&caps[0][1..]).unwrap_or_default().to_owned()
    })
}

/// Word-character names referenced by `src` that no defined name covers, in
/// order of first appearance.
pub fn unresolved<'a>(src: &'a str, vars: &VarStore) -> Vec<&'a str> {
    let mut names: Vec<&str> = Vec::new();
    for caps in word_reference_re().captures_iter(src) {
        if let Some(m) = caps.get(1) {
            let rest = &src[m.start()..];
            let covered = vars
                .iter()
                .any(|(name, _)| !name.is_empty() && rest.starts_with(name));
            let name = m.as_str();
            if !covered && !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}
