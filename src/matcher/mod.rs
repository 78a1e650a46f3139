//! Block/allow decision engine. [`MatcherState`] is an immutable snapshot;
//! [`Matcher`] holds the currently-active snapshot behind a short-lived
//! read lock so query workers never block on a reload in progress.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::dns::Name;
use crate::error::{HeimdallError, Result};

#[derive(Debug, Clone, Default)]
pub struct MatcherState {
    blocked_exact: HashSet<Name>,
    blocked_wildcard: HashSet<Name>,
    allow_exact: HashSet<Name>,
    allow_wildcard: HashSet<Name>,
    loaded_at: Option<DateTime<Utc>>,
}

impl MatcherState {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot from blocklist and whitelist text, each in the
    /// loader format defined in §4.1: bare/trailing-dot names, `*.`
    /// wildcards, hosts-file `0.0.0.0 name` / `127.0.0.1 name` lines, and
    /// `#`/`//`-prefixed or blank lines skipped. Invalid names are
    /// silently dropped rather than failing the whole load.
    pub fn load(blocklist_text: &str, whitelist_text: &str) -> Self {
        let (blocked_exact, blocked_wildcard) = parse_name_lines(blocklist_text);
        let (allow_exact, allow_wildcard) = parse_name_lines(whitelist_text);
        MatcherState {
            blocked_exact,
            blocked_wildcard,
            allow_exact,
            allow_wildcard,
            loaded_at: Some(Utc::now()),
        }
    }

    pub fn is_blocked(&self, name: &Name) -> bool {
        if set_matches(&self.allow_exact, &self.allow_wildcard, name) {
            return false;
        }
        set_matches(&self.blocked_exact, &self.blocked_wildcard, name)
    }

    /// The gauge side of the counter split called for in §9: total
    /// entries in the active snapshot, not events.
    pub fn blocklist_size(&self) -> usize {
        self.blocked_exact.len() + self.blocked_wildcard.len()
    }

    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }
}

fn set_matches(exact: &HashSet<Name>, wildcard: &HashSet<Name>, name: &Name) -> bool {
    if exact.contains(name) {
        return true;
    }
    wildcard
        .iter()
        .any(|w| name.matches_or_is_subdomain_of(w))
}

/// Shared line-parsing rule for both the on-disk artifact loader and the
/// whitelist file: returns (exact names, wildcard names-without-prefix).
fn parse_name_lines(text: &str) -> (HashSet<Name>, HashSet<Name>) {
    let mut exact = HashSet::new();
    let mut wildcard = HashSet::new();

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
            continue;
        }

        let candidate = if let Some(rest) = line
            .strip_prefix("0.0.0.0")
            .or_else(|| line.strip_prefix("127.0.0.1"))
        {
            match rest.split_whitespace().next() {
                Some(name) => name,
                None => continue,
            }
        } else {
            line.split_whitespace().next().unwrap_or(line)
        };

        let is_wildcard = candidate.starts_with("*.");
        let stripped = candidate.strip_prefix("*.").unwrap_or(candidate);
        let stripped = stripped.strip_suffix('.').unwrap_or(stripped);

        if !Name::is_syntactically_valid(stripped) {
            continue;
        }
        let name = Name::from(stripped);
        if is_wildcard {
            wildcard.insert(name);
        } else {
            exact.insert(name);
        }
    }

    (exact, wildcard)
}

pub struct Matcher {
    state: RwLock<Arc<MatcherState>>,
}

impl Matcher {
    pub fn new(state: MatcherState) -> Self {
        Matcher {
            state: RwLock::new(Arc::new(state)),
        }
    }

    /// Load the matcher from the on-disk artifact produced by the Merger
    /// and an optional whitelist file. Absence of the blocklist file
    /// yields an empty matcher rather than an error, per §4.8 startup.
    pub fn from_files(blocklist_path: &Path, whitelist_path: Option<&Path>) -> Result<Self> {
        Ok(Matcher::new(load_state_from_files(
            blocklist_path,
            whitelist_path,
        )?))
    }

    pub fn snapshot(&self) -> Arc<MatcherState> {
        self.state.read().clone()
    }

    pub fn is_blocked(&self, name: &Name) -> bool {
        self.snapshot().is_blocked(name)
    }

    /// Atomically replace the active snapshot. In-flight readers that
    /// already cloned the old `Arc` keep seeing it until they finish;
    /// no reader ever observes a torn state.
    pub fn swap(&self, new_state: MatcherState) {
        *self.state.write() = Arc::new(new_state);
    }

    pub fn reload_from_files(&self, blocklist_path: &Path, whitelist_path: Option<&Path>) -> Result<()> {
        let state = load_state_from_files(blocklist_path, whitelist_path)?;
        self.swap(state);
        Ok(())
    }
}

fn load_state_from_files(blocklist_path: &Path, whitelist_path: Option<&Path>) -> Result<MatcherState> {
    let blocklist_text = match std::fs::read_to_string(blocklist_path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(source) => {
            return Err(HeimdallError::Io {
                path: blocklist_path.to_path_buf(),
                source,
            });
        }
    };
    let whitelist_text = match whitelist_path {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(source) => {
                return Err(HeimdallError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        },
        None => String::new(),
    };
    Ok(MatcherState::load(&blocklist_text, &whitelist_text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_block() {
        let state = MatcherState::load("ads.example.com\n", "");
        assert!(state.is_blocked(&Name::from("ads.example.com")));
        assert!(!state.is_blocked(&Name::from("example.com")));
    }

    #[test]
    fn wildcard_block_respects_label_boundary() {
        let state = MatcherState::load("*.doubleclick.net\n", "");
        assert!(state.is_blocked(&Name::from("ad.g.doubleclick.net")));
        assert!(state.is_blocked(&Name::from("doubleclick.net")));
        assert!(!state.is_blocked(&Name::from("evilgoogleclick.net")));
    }

    #[test]
    fn whitelist_overrides_wildcard_block() {
        let state = MatcherState::load("*.google.com\n", "mail.google.com\n");
        assert!(!state.is_blocked(&Name::from("mail.google.com")));
        assert!(state.is_blocked(&Name::from("images.google.com")));
    }

    #[test]
    fn hosts_format_lines_are_accepted() {
        let state = MatcherState::load("0.0.0.0 tracker.example\n127.0.0.1 other.example\n", "");
        assert!(state.is_blocked(&Name::from("tracker.example")));
        assert!(state.is_blocked(&Name::from("other.example")));
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let state = MatcherState::load("# comment\n\n// also comment\nreal.example\n", "");
        assert_eq!(state.blocklist_size(), 1);
        assert!(state.is_blocked(&Name::from("real.example")));
    }

    #[test]
    fn invalid_names_are_dropped_silently() {
        let state = MatcherState::load("-bad.example\nvalid.example\n", "");
        assert_eq!(state.blocklist_size(), 1);
    }
}
