use serde::{Deserialize, Serialize};

pub const CONTENT_SIGNAL_HEADER: &str = "content-signal";

/// `content_signal` option: `false` disables the header, `true` enables it
/// with every flag allowed, and a table overrides individual flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentSignal {
    Enabled(bool),
    Custom(ContentSignalFlags),
}

/// Unset flags default to `yes`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContentSignalFlags {
    pub ai_train: Option<bool>,
    pub search: Option<bool>,
    pub ai_input: Option<bool>,
}

impl Default for ContentSignal {
    fn default() -> Self {
        Self::Enabled(false)
    }
}

impl ContentSignal {
    pub fn header_value(&self) -> Option<String> {
        let flags = match self {
            Self::Enabled(false) => return None,
            Self::Enabled(true) => ContentSignalFlags::default(),
            Self::Custom(flags) => *flags,
        };
        Some(format!(
            "ai-train={}, search={}, ai-input={}",
            yes_no(flags.ai_train),
            yes_no(flags.search),
            yes_no(flags.ai_input),
        ))
    }
}

fn yes_no(flag: Option<bool>) -> &'static str {
    if flag.unwrap_or(true) { "yes" } else { "no" }
}
