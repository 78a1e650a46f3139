use std::fmt;

/// A normalized DNS domain name: lower-case, no trailing dot. Used as the
/// matcher and cache key everywhere in this crate — wire decoding produces
/// one, and nothing downstream ever sees the raw label sequence again.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(String);

impl Name {
    /// Build a `Name` from label strings as read off the wire, normalizing
    /// case. The trailing root label is implicit (labels never include it).
    pub fn from_labels(labels: &[String]) -> Self {
        let joined = labels.join(".").to_ascii_lowercase();
        Name(joined)
    }

    /// Parse a presentation-form name (`example.com`, `example.com.`,
    /// `*.example.com`). The `*.` prefix, if present, is stripped; callers
    /// that care whether a name was a wildcard check before calling this.
    pub fn from_presentation(s: &str) -> Self {
        let s = s.strip_prefix("*.").unwrap_or(s);
        let s = s.strip_suffix('.').unwrap_or(s);
        Name(s.to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn labels(&self) -> Vec<&str> {
        if self.0.is_empty() {
            Vec::new()
        } else {
            self.0.split('.').collect()
        }
    }

    /// `self == other || self` ends in `"." + other`. The one rule every
    /// wildcard/whitelist check in this crate funnels through — a match
    /// must land on a label boundary, never mid-label.
    pub fn matches_or_is_subdomain_of(&self, other: &Name) -> bool {
        if self.0 == other.0 {
            return true;
        }
        if other.0.is_empty() {
            return false;
        }
        self.0
            .strip_suffix(other.0.as_str())
            .and_then(|prefix| prefix.strip_suffix('.'))
            .is_some()
    }

    /// RFC 1035 §2.3.4 syntax: labels of 1-63 alnum/`-`, not starting or
    /// ending with `-`, total length (with separators) at most 253.
    pub fn is_syntactically_valid(s: &str) -> bool {
        if s.is_empty() || s.len() > 253 {
            return false;
        }
        for label in s.split('.') {
            if label.is_empty() || label.len() > 63 {
                return false;
            }
            if !label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
            {
                return false;
            }
            if label.starts_with('-') || label.ends_with('-') {
                return false;
            }
        }
        true
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Name::from_presentation(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_trailing_dot() {
        let a = Name::from_presentation("Example.COM.");
        let b = Name::from_presentation("example.com");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "example.com");
    }

    #[test]
    fn wildcard_prefix_is_stripped() {
        let n = Name::from_presentation("*.doubleclick.net");
        assert_eq!(n.as_str(), "doubleclick.net");
    }

    #[test]
    fn subdomain_requires_label_boundary() {
        let wildcard = Name::from_presentation("facebook.com");
        assert!(Name::from_presentation("foo.facebook.com").matches_or_is_subdomain_of(&wildcard));
        assert!(Name::from_presentation("facebook.com").matches_or_is_subdomain_of(&wildcard));
        assert!(
            !Name::from_presentation("evilfacebook.com").matches_or_is_subdomain_of(&wildcard)
        );
    }

    #[test]
    fn syntax_rejects_bad_labels() {
        assert!(Name::is_syntactically_valid("example.com"));
        assert!(!Name::is_syntactically_valid("-example.com"));
        assert!(!Name::is_syntactically_valid("example-.com"));
        assert!(!Name::is_syntactically_valid(""));
        assert!(!Name::is_syntactically_valid(&"a".repeat(64)));
        let long = (0..30).map(|_| "abcdefgh").collect::<Vec<_>>().join(".");
        assert!(!Name::is_syntactically_valid(&long));
    }
}
