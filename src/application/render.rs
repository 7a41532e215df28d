//! Markdown rendering seam.

use comrak::Options;

/// Markdown-to-HTML as a pure function dependency of the render pipeline.
pub trait Markdown: Send + Sync {
    fn to_html(&self, markdown: &str) -> String;
}

/// Comrak-backed renderer. Sources are trusted local files, so there is no
/// sanitisation stage; the options mirror the GFM-flavoured behavior the
/// site's existing posts rely on.
pub struct ComrakMarkdown {
    options: Options<'static>,
}

impl ComrakMarkdown {
    pub fn new() -> Self {
        let mut options = Options::default();
        options.extension.table = true;
        options.extension.strikethrough = true;
        options.extension.autolink = true;
        options.parse.smart = true;
        Self { options }
    }
}

impl Default for ComrakMarkdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Markdown for ComrakMarkdown {
    fn to_html(&self, markdown: &str) -> String {
        comrak::markdown_to_html(markdown, &self.options)
    }
}
