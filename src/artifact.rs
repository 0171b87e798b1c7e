use std::path::{Component, Path, PathBuf};

/// Conventional artifact root, relative to the project directory.
pub const DEFAULT_ARTIFACT_DIR: &str = "public/.well-known/markdown";

/// Route path without its leading slash; `/` becomes `index`.
pub fn route_slug(route: &str) -> &str {
    if route == "/" {
        "index"
    } else {
        route.strip_prefix('/').unwrap_or(route)
    }
}

/// Artifact file for a route, relative to the artifact root.
///
/// `/` maps to `index.md` and `/a/b` to `a/b.md`. The route is used as-is:
/// no case folding and no percent-decoding.
pub fn artifact_relative_path(route: &str) -> PathBuf {
    PathBuf::from(format!("{}.md", route_slug(route)))
}

/// True when the route cannot resolve outside the artifact root.
pub fn is_contained_route(route: &str) -> bool {
    Path::new(route_slug(route))
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
}
