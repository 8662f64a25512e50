//! Catalog settings read by the context factory at cold start.
//!
//! - `CATALOG_DEFAULT_BRANCH`: default branch name (default: `main`)
//! - `CATALOG_REFERENCES`: comma-separated reference names; the default
//!   branch is always included

use anyhow::{bail, Result};

pub const DEFAULT_BRANCH: &str = "main";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    pub default_branch: String,
    pub references: Vec<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            default_branch: DEFAULT_BRANCH.to_string(),
            references: vec![DEFAULT_BRANCH.to_string()],
        }
    }
}

impl CatalogConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let default_branch = lookup("CATALOG_DEFAULT_BRANCH")
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| DEFAULT_BRANCH.to_string());
        validate_reference_name(&default_branch)?;

        let mut references = vec![default_branch.clone()];
        if let Some(raw) = lookup("CATALOG_REFERENCES") {
            for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
                validate_reference_name(name)?;
                if !references.iter().any(|r| r == name) {
                    references.push(name.to_string());
                }
            }
        }

        Ok(Self {
            default_branch,
            references,
        })
    }

    pub fn reference(&self, name: &str) -> Option<&str> {
        self.references
            .iter()
            .find(|r| r.as_str() == name)
            .map(String::as_str)
    }
}

/// Reference names start with a letter, use `[A-Za-z0-9._/-]`, contain no
/// `..` and do not end with `/`.
pub fn validate_reference_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '/' | '-'));

    if !starts_with_letter || !valid_chars || name.contains("..") || name.ends_with('/') {
        bail!("invalid reference name '{name}'");
    }
    Ok(())
}
