use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A branch as the feed and the snapshot log know it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub key: String,
    pub label: String,
    /// Opaque per-branch feed reference: an absolute URL or a path under the feed base URL.
    pub feed_ref: String,
}

/// Known branches keyed by machine identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchDirectory {
    branches: BTreeMap<String, Branch>,
}

impl BranchDirectory {
    pub fn new(branches: impl IntoIterator<Item = Branch>) -> Self {
        Self {
            branches: branches
                .into_iter()
                .map(|branch| (branch.key.clone(), branch))
                .collect(),
        }
    }

    /// Parse `key|Label|feed_ref` entries separated by `;`.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let mut branches = Vec::new();
        for entry in raw.split(';').map(str::trim).filter(|entry| !entry.is_empty()) {
            let parts: Vec<&str> = entry.split('|').map(str::trim).collect();
            match parts.as_slice() {
                [key, label, feed_ref]
                    if !key.is_empty() && !label.is_empty() && !feed_ref.is_empty() =>
                {
                    branches.push(Branch {
                        key: key.to_string(),
                        label: label.to_string(),
                        feed_ref: feed_ref.to_string(),
                    });
                }
                _ => return Err(entry.to_string()),
            }
        }
        Ok(Self::new(branches))
    }

    pub fn get(&self, key: &str) -> Option<&Branch> {
        self.branches.get(key.trim())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Branch> {
        self.branches.values()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_branch_entries() {
        let directory = BranchDirectory::parse(
            "norte|Sucursal Norte|sheets/norte; sur|Sucursal Sur|https://feed.example/sur;",
        )
        .expect("valid directory");

        let norte = directory.get("norte").expect("norte present");
        assert_eq!(norte.label, "Sucursal Norte");
        assert_eq!(norte.feed_ref, "sheets/norte");
        assert_eq!(directory.iter().count(), 2);
    }

    #[test]
    fn rejects_incomplete_entries() {
        let err = BranchDirectory::parse("norte|Sucursal Norte").expect_err("missing feed ref");
        assert_eq!(err, "norte|Sucursal Norte");
    }

    #[test]
    fn empty_input_yields_empty_directory() {
        assert!(BranchDirectory::parse("  ").expect("empty ok").is_empty());
    }
}
