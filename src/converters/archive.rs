//! Input tokens and archive detection.
//!
//! A token is `PATH` or `PATH|MEMBER1,MEMBER2`, where the members name files
//! inside an archive. Archives are recognised but not extracted.

use std::fmt;

/// Extensions of archive formats a token may point to
const ARCHIVE_EXTENSIONS: [&str; 7] = [".zip", ".7z", ".rar", ".tar", ".tar.gz", ".tgz", ".tar.bz2"];

/// A parsed input token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputToken {
    pub path: String,
    pub members: Vec<String>,
}

impl InputToken {
    #[must_use]
    pub fn parse(token: &str) -> Self {
        match token.split_once('|') {
            Some((path, members)) => Self {
                path: path.trim().to_string(),
                members: members
                    .split(',')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(str::to_string)
                    .collect(),
            },
            None => Self {
                path: token.trim().to_string(),
                members: Vec::new(),
            },
        }
    }

    #[must_use]
    pub fn is_remote(&self) -> bool {
        self.path.starts_with("http://") || self.path.starts_with("https://")
    }

    #[must_use]
    pub fn is_archive(&self) -> bool {
        is_archive(&self.path)
    }
}

impl fmt::Display for InputToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)?;
        if !self.members.is_empty() {
            write!(f, "|{}", self.members.join(","))?;
        }
        Ok(())
    }
}

/// Whether a path or URL names an archive
#[must_use]
pub fn is_archive(path: &str) -> bool {
    let path = path.split(['?', '#']).next().unwrap_or(path).to_lowercase();
    ARCHIVE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_members() {
        let token = InputToken::parse("https://example.com/data.zip|fields.geojson, crops.geojson");
        assert_eq!(token.path, "https://example.com/data.zip");
        assert_eq!(token.members, vec!["fields.geojson", "crops.geojson"]);
        assert!(token.is_remote());
        assert!(token.is_archive());
        assert_eq!(
            token.to_string(),
            "https://example.com/data.zip|fields.geojson,crops.geojson"
        );
    }

    #[test]
    fn test_plain_path() {
        let token = InputToken::parse("fields.geojson");
        assert!(token.members.is_empty());
        assert!(!token.is_remote());
        assert!(!token.is_archive());
        assert!(is_archive("DATA.TAR.GZ?download=1"));
    }
}
