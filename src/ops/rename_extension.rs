//! Placeholder substitution in a fresh copy of the extension template.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::util::{safe_read_to_string, validate_directory};
use crate::error::{Result, VecorelError};

const TITLE_PLACEHOLDER: &str = "Template Extension";
const SLUG_PLACEHOLDER: &str = "template-extension";
const ORG_PLACEHOLDER: &str = "vecorel";
const PREFIX_PLACEHOLDER: &str = "template:";

/// Names that replace the template placeholders
#[derive(Debug, Clone)]
pub struct ExtensionNames {
    /// Human readable title, e.g. `Administrative Division`
    pub title: String,
    /// Repository and URL slug, e.g. `administrative-division-extension`
    pub slug: String,
    /// GitHub organisation owning the repository
    pub org: String,
    /// Property prefix without the colon, e.g. `admin`
    pub prefix: String,
}

impl ExtensionNames {
    /// Names with the default organisation and a prefix derived from the slug
    #[must_use]
    pub fn new(title: impl Into<String>, slug: impl Into<String>) -> Self {
        let slug = slug.into();
        let prefix = slug
            .trim_end_matches("-extension")
            .split('-')
            .next()
            .unwrap_or_default()
            .to_string();
        Self {
            title: title.into(),
            slug,
            org: ORG_PLACEHOLDER.to_string(),
            prefix,
        }
    }

    fn check(&self) -> Result<()> {
        let slug_ok = !self.slug.is_empty()
            && self
                .slug
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !slug_ok {
            return Err(VecorelError::Other(format!(
                "Invalid slug '{}', use lowercase letters, digits and dashes",
                self.slug
            )));
        }
        if self.title.trim().is_empty() || self.prefix.trim().is_empty() {
            return Err(VecorelError::Other("Title and prefix must not be empty".to_string()));
        }
        Ok(())
    }

    /// Replace all placeholders in a text
    #[must_use]
    pub fn apply(&self, text: &str) -> String {
        text.replace(
            &format!("{ORG_PLACEHOLDER}/{SLUG_PLACEHOLDER}"),
            &format!("{}/{}", self.org, self.slug),
        )
        .replace(TITLE_PLACEHOLDER, &self.title)
        .replace(SLUG_PLACEHOLDER, &self.slug)
        .replace(PREFIX_PLACEHOLDER, &format!("{}:", self.prefix))
    }
}

/// Rewrite every text file below `folder`, returning the changed files
pub fn rename_extension(folder: &Path, names: &ExtensionNames) -> Result<Vec<PathBuf>> {
    validate_directory(folder, "extension folder")?;
    names.check()?;

    let mut changed = Vec::new();
    let entries = WalkDir::new(folder)
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git");
    for entry in entries {
        let entry = entry.map_err(|e| VecorelError::Other(format!("Cannot walk {}: {e}", folder.display())))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        // Binary files are left alone
        let Ok(text) = safe_read_to_string(path, "template file") else {
            log::debug!("Skipping {}", path.display());
            continue;
        };
        let replaced = names.apply(&text);
        if replaced != text {
            fs::write(path, replaced).map_err(|e| VecorelError::io(path, e))?;
            log::info!("Updated {}", path.display());
            changed.push(path.to_path_buf());
        }
    }
    Ok(changed)
}
