//! The filesystem seam: everything the pipeline reads comes through here.

use async_trait::async_trait;

use crate::infra::error::InfraError;

/// A parsed `.redirect` stub: a 3xx status on the first line, the target URL
/// on the second. A stub signals that a slug should redirect instead of
/// rendering content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectStub {
    pub status: u16,
    pub location: String,
}

impl RedirectStub {
    /// Parse stub file contents. Anything that is not a redirection status
    /// followed by a non-empty target yields `None` and the stub is treated
    /// as absent.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut lines = raw.lines();
        let status: u16 = lines.next()?.trim().parse().ok()?;
        let location = lines.next()?.trim();
        if !(300..400).contains(&status) || location.is_empty() {
            return None;
        }
        Some(Self {
            status,
            location: location.to_string(),
        })
    }
}

/// Read access to post sources and template files.
///
/// Production uses [`crate::infra::fs::FsContentSource`]; the trait exists so
/// the pipeline never touches paths or the filesystem directly.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Read a post source file by its posts-root-relative path (with the
    /// `.md` suffix). `Ok(None)` when the file does not exist.
    async fn read_post(&self, path: &str) -> Result<Option<String>, InfraError>;

    /// Read a template file by name from the templates root.
    async fn read_template(&self, name: &str) -> Result<Option<String>, InfraError>;

    /// Every file under the posts root, as posts-root-relative paths.
    async fn list_post_files(&self) -> Result<Vec<String>, InfraError>;

    /// The sibling redirect stub for a normalized key, if one exists and
    /// parses.
    async fn read_redirect(&self, key: &str) -> Result<Option<RedirectStub>, InfraError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_parses_status_and_target() {
        let stub = RedirectStub::parse("301\n/new-url\n").expect("valid stub");
        assert_eq!(stub.status, 301);
        assert_eq!(stub.location, "/new-url");
    }

    #[test]
    fn stub_rejects_non_redirect_status() {
        assert_eq!(RedirectStub::parse("200\n/somewhere"), None);
        assert_eq!(RedirectStub::parse("404\n/somewhere"), None);
    }

    #[test]
    fn stub_rejects_missing_or_empty_target() {
        assert_eq!(RedirectStub::parse("301"), None);
        assert_eq!(RedirectStub::parse("301\n   "), None);
        assert_eq!(RedirectStub::parse("not-a-status\n/x"), None);
    }
}
