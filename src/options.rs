use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::content_signal::ContentSignal;

pub const DEFAULT_SKIP_HEADER: &str = "x-markdown-skip";

/// Request-time settings, read once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NegotiationOptions {
    /// Header carried by the internal self-fetch so it is not negotiated again.
    pub skip_header: String,
    /// Add `vary: accept` to Markdown replies.
    pub vary_header: bool,
    pub content_signal: ContentSignal,
    /// Tag names stripped on top of the built-in list.
    pub strip_selectors: Vec<String>,
    /// Base URL for the self-fetch. Defaults to the request's `Host`.
    pub origin: Option<Url>,
    /// Directory of pre-built artifacts (output of `agent-md build`).
    pub artifacts_dir: Option<PathBuf>,
}

impl Default for NegotiationOptions {
    fn default() -> Self {
        Self {
            skip_header: DEFAULT_SKIP_HEADER.to_owned(),
            vary_header: true,
            content_signal: ContentSignal::default(),
            strip_selectors: Vec::new(),
            origin: None,
            artifacts_dir: None,
        }
    }
}

/// Reads options from a YAML file. Missing keys keep their defaults.
pub fn load(path: &Path) -> anyhow::Result<NegotiationOptions> {
    let yaml = std::fs::read_to_string(path)
        .with_context(|| format!("read options: {}", path.display()))?;
    parse(&yaml).with_context(|| format!("parse options: {}", path.display()))
}

pub fn parse(yaml: &str) -> anyhow::Result<NegotiationOptions> {
    if yaml.trim().is_empty() {
        return Ok(NegotiationOptions::default());
    }
    serde_yaml::from_str(yaml).context("deserialize negotiation options")
}
