use anyhow::Context as _;
use regex::{Captures, Regex};

/// Fixed formatting applied around `html2md`.
///
/// `html2md` already emits fenced code blocks and inline links, so only the
/// knobs it lacks live here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConverterOptions {
    /// Longest allowed run of newline characters in the output.
    pub max_consecutive_newlines: usize,
    /// Keep `<img>` elements whose `src` is a `data:` URI.
    pub keep_data_images: bool,
}

impl ConverterOptions {
    pub const AGENT: Self = Self {
        max_consecutive_newlines: 2,
        keep_data_images: false,
    };
}

impl Default for ConverterOptions {
    fn default() -> Self {
        Self::AGENT
    }
}

#[derive(Debug, Clone)]
pub struct MarkdownConverter {
    options: ConverterOptions,
    data_image: Regex,
    blank_run_or_fence: Regex,
}

impl MarkdownConverter {
    pub fn new(options: ConverterOptions) -> anyhow::Result<Self> {
        let data_image = Regex::new(r#"(?i)<img\b[^>]*[\s"'/]src\s*=\s*["']?\s*data:[^>]*>"#)
            .context("compile data image pattern")?;
        // Fenced blocks match first so their contents are left alone.
        let blank_run_or_fence = Regex::new(r"(?s)```.*?```|\n(?:[ \t]*\n)+")
            .context("compile newline pattern")?;
        Ok(Self {
            options,
            data_image,
            blank_run_or_fence,
        })
    }

    pub fn convert(&self, html: &str) -> String {
        let html = if self.options.keep_data_images {
            std::borrow::Cow::Borrowed(html)
        } else {
            self.data_image.replace_all(html, "")
        };

        let markdown = html2md::parse_html(&html);
        self.collapse_newlines(&markdown).trim().to_owned()
    }

    fn collapse_newlines(&self, markdown: &str) -> String {
        let max = self.options.max_consecutive_newlines.max(1);
        self.blank_run_or_fence
            .replace_all(markdown, |caps: &Captures<'_>| {
                let run = &caps[0];
                if !run.starts_with("```") && run.matches('\n').count() > max {
                    "\n".repeat(max)
                } else {
                    run.to_owned()
                }
            })
            .into_owned()
    }
}

/// Converts with [`ConverterOptions::AGENT`].
pub fn html_to_markdown(html: &str) -> anyhow::Result<String> {
    Ok(MarkdownConverter::new(ConverterOptions::AGENT)?.convert(html))
}
