use anyhow::Context as _;
use regex::Regex;

/// Elements whose whole subtree is page chrome rather than content.
pub const DEFAULT_STRIP_TAGS: &[&str] = &[
    "nav", "header", "footer", "aside", "script", "style", "noscript", "iframe", "svg",
];

/// ARIA landmark roles that mark structural boilerplate.
pub const STRIP_ROLES: &[&str] = &["navigation", "banner", "contentinfo", "complementary"];

/// Pattern-based boilerplate remover.
///
/// This is not a parser. Each paired element is removed with a shortest
/// match from its opening tag to the first closing tag of the same name, so
/// `<aside>a<aside>b</aside>c</aside>` leaves `c</aside>` behind. Role
/// matches stop at the first closing tag of any name. Callers relying on
/// exact output depend on both behaviors.
#[derive(Debug, Clone)]
pub struct BoilerplateStripper {
    patterns: Vec<Regex>,
}

impl BoilerplateStripper {
    /// Compiles the built-in denylist followed by `extra_tags`, in that order.
    pub fn new<S: AsRef<str>>(extra_tags: &[S]) -> anyhow::Result<Self> {
        let mut patterns = Vec::new();

        let tags = DEFAULT_STRIP_TAGS
            .iter()
            .copied()
            .chain(extra_tags.iter().map(AsRef::as_ref));
        for tag in tags {
            let tag = tag.trim();
            if tag.is_empty() {
                continue;
            }
            let name = regex::escape(tag);
            patterns.push(
                Regex::new(&format!(r"(?i)<{name}[\s>][\s\S]*?</{name}>"))
                    .with_context(|| format!("compile element pattern for <{tag}>"))?,
            );
            patterns.push(
                Regex::new(&format!(r"(?i)<{name}[^>]*/>"))
                    .with_context(|| format!("compile self-closing pattern for <{tag}>"))?,
            );
        }

        for role in STRIP_ROLES {
            patterns.push(
                Regex::new(&format!(
                    r#"(?i)<[a-z][^>]+role=["']{role}["'][\s\S]*?>[\s\S]*?</[a-z]+>"#
                ))
                .with_context(|| format!("compile role pattern for {role}"))?,
            );
        }

        patterns.push(Regex::new(r"<!--[\s\S]*?-->").context("compile comment pattern")?);

        Ok(Self { patterns })
    }

    pub fn strip(&self, html: &str) -> String {
        let mut out = html.to_owned();
        for pattern in &self.patterns {
            out = pattern.replace_all(&out, "").into_owned();
        }
        out
    }
}

/// One-shot helper for callers that do not keep a compiled stripper around.
pub fn strip_boilerplate<S: AsRef<str>>(html: &str, extra_tags: &[S]) -> anyhow::Result<String> {
    Ok(BoilerplateStripper::new(extra_tags)?.strip(html))
}
