#![forbid(unsafe_code)]

pub mod artifact;
pub mod build;
pub mod cli;
pub mod content_signal;
pub mod convert;
pub mod detect;
pub mod fetch;
pub mod logging;
pub mod negotiate;
pub mod options;
pub mod strip;
pub mod tokens;

pub use build::{BuildOptions, BuildResult, build_static_markdown};
pub use negotiate::{Negotiator, markdown_middleware};
pub use options::NegotiationOptions;
