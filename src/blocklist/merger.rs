//! Unions parsed sources into the canonical on-disk blocklist artifact:
//! sorted, LF-terminated, header block first, written atomically.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::Utc;

use super::parser::{self, BlocklistFormat, ParsedNames};
use crate::error::{HeimdallError, Result};

pub struct SourceInput<'a> {
    pub id: &'a str,
    pub text: &'a str,
    pub format: BlocklistFormat,
}

pub struct MergeReport {
    pub domain_count: usize,
    pub source_count: usize,
}

/// Parses each input, unions the results, and writes the artifact to
/// `dest` via a temp-file-then-rename so readers never observe a partial
/// write. The output is byte-for-byte reproducible given the same inputs.
pub fn merge(sources: &[SourceInput], dest: &Path) -> Result<MergeReport> {
    let mut names: BTreeSet<String> = BTreeSet::new();
    let mut source_ids = Vec::new();

    for source in sources {
        let ParsedNames {
            exact: source_exact,
            wildcard: source_wildcard,
        } = parser::parse(source.text, source.format);
        for name in source_exact {
            names.insert(name.as_str().to_string());
        }
        for name in source_wildcard {
            names.insert(format!("*.{}", name.as_str()));
        }
        source_ids.push(source.id.to_string());
    }

    let domain_count = names.len();

    let mut body = String::new();
    body.push_str("# nullroute blocklist artifact\n");
    body.push_str(&format!("# generated: {}\n", Utc::now().to_rfc3339()));
    body.push_str(&format!("# domains: {}\n", domain_count));
    body.push_str(&format!("# sources: {}\n", source_ids.len()));
    for id in &source_ids {
        body.push_str(&format!("# source: {}\n", id));
    }

    for name in &names {
        body.push_str(name);
        body.push('\n');
    }

    write_atomically(dest, body.as_bytes())?;

    Ok(MergeReport {
        domain_count,
        source_count: source_ids.len(),
    })
}

fn write_atomically(dest: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|source| HeimdallError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let tmp = dest.with_extension("tmp");
    std::fs::write(&tmp, content).map_err(|source| HeimdallError::Io {
        path: tmp.clone(),
        source,
    })?;
    std::fs::rename(&tmp, dest).map_err(|source| HeimdallError::Io {
        path: dest.to_path_buf(),
        source,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_unions_and_sorts_across_sources() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("blocklist.txt");

        let sources = vec![
            SourceInput {
                id: "a",
                text: "zeta.example\nalpha.example\n",
                format: BlocklistFormat::Domains,
            },
            SourceInput {
                id: "b",
                text: "0.0.0.0 alpha.example\n0.0.0.0 beta.example\n",
                format: BlocklistFormat::Hosts,
            },
        ];

        let report = merge(&sources, &dest).unwrap();
        assert_eq!(report.domain_count, 3);
        assert_eq!(report.source_count, 2);

        let written = std::fs::read_to_string(&dest).unwrap();
        let body_lines: Vec<&str> = written.lines().filter(|l| !l.starts_with('#')).collect();
        assert_eq!(body_lines, vec!["alpha.example", "beta.example", "zeta.example"]);
    }

    #[test]
    fn wildcards_are_written_with_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("blocklist.txt");
        let sources = vec![SourceInput {
            id: "a",
            text: "*.ads.example\n",
            format: BlocklistFormat::Domains,
        }];
        merge(&sources, &dest).unwrap();
        let written = std::fs::read_to_string(&dest).unwrap();
        assert!(written.lines().any(|l| l == "*.ads.example"));
    }
}
