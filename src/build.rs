use std::path::{Path, PathBuf};

use anyhow::Context as _;
use indexmap::IndexMap;
use serde::Deserialize;

use crate::artifact::{
    DEFAULT_ARTIFACT_DIR, artifact_relative_path, is_contained_route, route_slug,
};
use crate::convert::{ConverterOptions, MarkdownConverter};
use crate::strip::BoilerplateStripper;

pub const DEFAULT_DIST_DIR: &str = ".next";
pub const MANIFEST_FILE: &str = "prerender-manifest.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Project root; `dist_dir` and `out_dir` are resolved against it.
    pub cwd: PathBuf,
    pub dist_dir: PathBuf,
    pub out_dir: PathBuf,
    pub strip_selectors: Vec<String>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            cwd: PathBuf::from("."),
            dist_dir: PathBuf::from(DEFAULT_DIST_DIR),
            out_dir: PathBuf::from(DEFAULT_ARTIFACT_DIR),
            strip_selectors: Vec::new(),
        }
    }
}

/// Routes in manifest order. A route is in exactly one list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildResult {
    pub generated: Vec<String>,
    pub skipped: Vec<String>,
}

impl BuildResult {
    pub fn is_empty(&self) -> bool {
        self.generated.is_empty() && self.skipped.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct PrerenderManifest {
    #[serde(default)]
    routes: IndexMap<String, serde_json::Value>,
}

pub fn build_static_markdown(options: &BuildOptions) -> anyhow::Result<BuildResult> {
    let dist_path = options.cwd.join(&options.dist_dir);
    let out_path = options.cwd.join(&options.out_dir);

    if !dist_path.is_dir() {
        anyhow::bail!(
            "build output not found at {}; run the framework build first",
            dist_path.display()
        );
    }

    let routes = read_manifest_routes(&dist_path.join(MANIFEST_FILE))?;
    if routes.is_empty() {
        tracing::info!(dist = %dist_path.display(), "no prerendered routes");
        return Ok(BuildResult::default());
    }

    let stripper =
        BoilerplateStripper::new(&options.strip_selectors).context("compile strip selectors")?;
    let converter = MarkdownConverter::new(ConverterOptions::AGENT)?;

    std::fs::create_dir_all(&out_path)
        .with_context(|| format!("create markdown output dir: {}", out_path.display()))?;

    let mut result = BuildResult::default();
    for route in routes {
        if !is_contained_route(&route) {
            tracing::warn!(%route, "route escapes the output directory; skipping");
            result.skipped.push(route);
            continue;
        }

        let Some(html_path) = find_html_for_route(&dist_path, &route) else {
            tracing::warn!(%route, "no prerendered html found; skipping");
            result.skipped.push(route);
            continue;
        };

        let bytes = std::fs::read(&html_path)
            .with_context(|| format!("read prerendered html: {}", html_path.display()))?;
        let html = String::from_utf8_lossy(&bytes);
        let markdown = converter.convert(&stripper.strip(&html));

        let md_path = out_path.join(artifact_relative_path(&route));
        write_markdown(&md_path, &markdown)?;
        tracing::info!(%route, path = %md_path.display(), "wrote markdown");
        result.generated.push(route);
    }

    Ok(result)
}

/// Route keys from the manifest. A missing file or `routes` table is empty.
fn read_manifest_routes(path: &Path) -> anyhow::Result<Vec<String>> {
    if !path.exists() {
        tracing::debug!(manifest = %path.display(), "prerender manifest not found");
        return Ok(Vec::new());
    }

    let json = std::fs::read_to_string(path)
        .with_context(|| format!("read prerender manifest: {}", path.display()))?;
    let manifest: PrerenderManifest = serde_json::from_str(&json)
        .with_context(|| format!("parse prerender manifest: {}", path.display()))?;
    Ok(manifest.routes.into_keys().collect())
}

/// Candidate HTML files for a route, most specific first: the nested app
/// layout, then the flat pages layout.
pub fn html_candidates(dist_path: &Path, route: &str) -> Vec<PathBuf> {
    let slug = route_slug(route);
    let server = dist_path.join("server");
    ["app", "pages"]
        .into_iter()
        .flat_map(|layout| {
            let root = server.join(layout);
            [
                root.join(slug).join("page.html"),
                root.join(format!("{slug}.html")),
                root.join(slug).join("index.html"),
            ]
        })
        .collect()
}

pub fn find_html_for_route(dist_path: &Path, route: &str) -> Option<PathBuf> {
    html_candidates(dist_path, route)
        .into_iter()
        .find(|candidate| candidate.is_file())
}

fn write_markdown(path: &Path, markdown: &str) -> anyhow::Result<()> {
    let parent_dir = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("markdown path must have parent: {}", path.display()))?;
    std::fs::create_dir_all(parent_dir)
        .with_context(|| format!("create markdown parent dir: {}", parent_dir.display()))?;
    std::fs::write(path, markdown)
        .with_context(|| format!("write markdown: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, contents: &str) -> anyhow::Result<()> {
        std::fs::create_dir_all(path.parent().expect("parent"))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn options(cwd: &Path) -> BuildOptions {
        BuildOptions {
            cwd: cwd.to_path_buf(),
            ..BuildOptions::default()
        }
    }

    #[test]
    fn missing_build_output_is_fatal() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let err = build_static_markdown(&options(temp.path())).expect_err("must fail");
        assert!(err.to_string().contains("build output not found"), "{err:#}");
        assert!(!temp.path().join(DEFAULT_ARTIFACT_DIR).exists());
        Ok(())
    }

    #[test]
    fn missing_or_empty_manifest_builds_nothing() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let dist = temp.path().join(".next");
        std::fs::create_dir_all(&dist)?;

        assert!(build_static_markdown(&options(temp.path()))?.is_empty());

        write(&dist.join(MANIFEST_FILE), r#"{"version": 4}"#)?;
        assert!(build_static_markdown(&options(temp.path()))?.is_empty());

        write(&dist.join(MANIFEST_FILE), r#"{"version": 4, "routes": {}}"#)?;
        assert!(build_static_markdown(&options(temp.path()))?.is_empty());
        Ok(())
    }

    #[test]
    fn generates_found_routes_and_skips_the_rest() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let dist = temp.path().join(".next");
        write(
            &dist.join(MANIFEST_FILE),
            r#"{"version": 4, "routes": {"/": {"initialRevalidateSeconds": false}, "/about": {}}, "dynamicRoutes": {}}"#,
        )?;
        write(
            &dist.join("server/app/index.html"),
            "<header>Site</header><main><p>Welcome home.</p></main>",
        )?;

        let result = build_static_markdown(&options(temp.path()))?;
        assert_eq!(result.generated, ["/"]);
        assert_eq!(result.skipped, ["/about"]);

        let out = temp.path().join(DEFAULT_ARTIFACT_DIR);
        let index = std::fs::read_to_string(out.join("index.md"))?;
        assert!(index.contains("Welcome home."), "{index}");
        assert!(!index.contains("Site"), "{index}");
        assert!(!out.join("about.md").exists());
        Ok(())
    }

    #[test]
    fn keeps_manifest_order_and_nests_output() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let dist = temp.path().join("dist");
        write(
            &dist.join(MANIFEST_FILE),
            r#"{"routes": {"/zeta": {}, "/blog/hello-world": {}, "/alpha": {}}}"#,
        )?;
        write(&dist.join("server/pages/zeta.html"), "<p>Zeta</p>")?;
        write(
            &dist.join("server/app/blog/hello-world/page.html"),
            "<p>Hello world</p><cookie-banner>Accept</cookie-banner>",
        )?;
        write(&dist.join("server/pages/alpha/index.html"), "<p>Alpha</p>")?;

        let result = build_static_markdown(&BuildOptions {
            cwd: temp.path().to_path_buf(),
            dist_dir: PathBuf::from("dist"),
            out_dir: PathBuf::from("md"),
            strip_selectors: vec!["cookie-banner".to_owned()],
        })?;
        assert_eq!(result.generated, ["/zeta", "/blog/hello-world", "/alpha"]);
        assert!(result.skipped.is_empty());

        let hello = std::fs::read_to_string(temp.path().join("md/blog/hello-world.md"))?;
        assert!(hello.contains("Hello world"), "{hello}");
        assert!(!hello.contains("Accept"), "{hello}");
        assert!(temp.path().join("md/zeta.md").is_file());
        assert!(temp.path().join("md/alpha.md").is_file());
        Ok(())
    }

    #[test]
    fn candidate_order_prefers_app_layout() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let dist = temp.path();
        write(&dist.join("server/pages/docs.html"), "<p>pages</p>")?;
        write(&dist.join("server/app/docs/index.html"), "<p>app index</p>")?;
        assert_eq!(
            find_html_for_route(dist, "/docs"),
            Some(dist.join("server/app/docs/index.html"))
        );

        write(&dist.join("server/app/docs.html"), "<p>app flat</p>")?;
        assert_eq!(
            find_html_for_route(dist, "/docs"),
            Some(dist.join("server/app/docs.html"))
        );

        write(&dist.join("server/app/docs/page.html"), "<p>app page</p>")?;
        assert_eq!(
            find_html_for_route(dist, "/docs"),
            Some(dist.join("server/app/docs/page.html"))
        );
        assert_eq!(html_candidates(dist, "/docs").len(), 6);
        Ok(())
    }

    #[test]
    fn escaping_routes_are_skipped() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let dist = temp.path().join(".next");
        write(&dist.join(MANIFEST_FILE), r#"{"routes": {"/../outside": {}}}"#)?;
        write(&dist.join("server/outside.html"), "<p>nope</p>")?;

        let result = build_static_markdown(&options(temp.path()))?;
        assert!(result.generated.is_empty());
        assert_eq!(result.skipped, ["/../outside"]);
        Ok(())
    }

    #[test]
    fn invalid_utf8_html_is_decoded_lossily() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let dist = temp.path().join(".next");
        write(&dist.join(MANIFEST_FILE), r#"{"routes": {"/latin": {}, "/": {}}}"#)?;
        let latin = dist.join("server/pages/latin.html");
        write(&latin, "")?;
        std::fs::write(&latin, b"<p>caf\xe9</p>")?;
        write(&dist.join("server/app/index.html"), "<p>Home page</p>")?;

        let result = build_static_markdown(&options(temp.path()))?;
        assert_eq!(result.generated, ["/latin", "/"]);

        let out = temp.path().join(DEFAULT_ARTIFACT_DIR);
        let latin = std::fs::read_to_string(out.join("latin.md"))?;
        assert!(latin.contains("caf\u{fffd}"), "{latin}");
        assert!(std::fs::read_to_string(out.join("index.md"))?.contains("Home page"));
        Ok(())
    }

    #[test]
    fn malformed_manifest_is_an_error() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        write(&temp.path().join(".next").join(MANIFEST_FILE), "{not json")?;
        let err = build_static_markdown(&options(temp.path())).expect_err("must fail");
        assert!(format!("{err:#}").contains("parse prerender manifest"), "{err:#}");
        Ok(())
    }
}
