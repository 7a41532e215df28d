//! Site-wide template and metadata state, loaded once at startup and never
//! mutated afterwards.

use tracing::debug;

use crate::{
    application::source::ContentSource,
    config::ContentSettings,
    domain::metadata::{self, Metadata},
    infra::error::InfraError,
};

const SITE_METADATA_TEMPLATE: &str = "defaultTags.html";
const HEADER_TEMPLATE: &str = "header.html";
const FOOTER_TEMPLATE: &str = "footer.html";
const POST_HEADER_TEMPLATE: &str = "postHeader.html";

/// Compiled per-article header fragment. Compilation stores the source;
/// invocation is literal marker substitution — there is no template language.
pub struct PostHeaderTemplate {
    source: String,
    marker: String,
}

impl PostHeaderTemplate {
    pub fn render(&self, metadata: &Metadata) -> String {
        metadata::apply_replacements(metadata, &self.source, &self.marker)
    }
}

/// Process-wide read-only state: site default metadata and the three page
/// chrome templates.
pub struct SiteContext {
    pub marker: String,
    pub site_metadata: Metadata,
    /// Site header with site-level substitutions already applied; per-article
    /// substitutions run over it again at render time.
    pub header: String,
    pub footer: String,
    pub post_header: PostHeaderTemplate,
}

impl SiteContext {
    /// Load templates and site defaults. A missing template file is a
    /// configuration error: the server refuses to start rather than serving
    /// half-assembled pages later.
    pub async fn load(
        source: &dyn ContentSource,
        content: &ContentSettings,
    ) -> Result<Self, InfraError> {
        let marker = content.metadata_marker.clone();

        let defaults_raw = required_template(source, SITE_METADATA_TEMPLATE).await?;
        let parsed = metadata::parse_metadata_lines(defaults_raw.lines(), &marker);
        if parsed.skipped > 0 {
            debug!(
                target = "brezza::site",
                template = SITE_METADATA_TEMPLATE,
                skipped = parsed.skipped,
                "ignored lines without key=value"
            );
        }
        let site_metadata = parsed.values;

        let header_raw = required_template(source, HEADER_TEMPLATE).await?;
        let header = metadata::apply_replacements(&site_metadata, &header_raw, &marker);

        let footer = required_template(source, FOOTER_TEMPLATE).await?;

        let post_header = PostHeaderTemplate {
            source: required_template(source, POST_HEADER_TEMPLATE).await?,
            marker: marker.clone(),
        };

        Ok(Self {
            marker,
            site_metadata,
            header,
            footer,
            post_header,
        })
    }

    pub fn site_title(&self) -> Option<&str> {
        self.site_metadata.get("SiteTitle").map(String::as_str)
    }
}

async fn required_template(
    source: &dyn ContentSource,
    name: &str,
) -> Result<String, InfraError> {
    source
        .read_template(name)
        .await?
        .ok_or_else(|| InfraError::configuration(format!("template `{name}` is missing")))
}
