//! Import specifier resolution against the set of tracked files.

use crate::config::DependenciesConfig;

/// Outcome of resolving one import specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Root-relative path of an existing tracked file
    Internal(String),
    /// Bare module specifier
    External(String),
    /// Relative or root-anchored specifier with no matching file
    Unresolved(String),
}

#[derive(Debug, Clone)]
pub struct ImportResolver {
    extensions: Vec<String>,
    include_externals: bool,
}

impl ImportResolver {
    pub fn new(extensions: Vec<String>, include_externals: bool) -> Self {
        let extensions = extensions
            .into_iter()
            .map(|e| {
                if e.starts_with('.') {
                    e
                } else {
                    format!(".{}", e)
                }
            })
            .collect();
        Self {
            extensions,
            include_externals,
        }
    }

    pub fn from_config(config: &DependenciesConfig) -> Self {
        Self::new(config.resolve_extensions.clone(), config.include_externals)
    }

    pub fn include_externals(&self) -> bool {
        self.include_externals
    }

    /// Resolve `specifier` as imported from `importer` (both root-relative).
    ///
    /// Candidates are tried in order: the path as written, the path with each
    /// configured extension (then the importer's own extension), then
    /// `index.<ext>` inside it. The first that `exists` wins.
    pub fn resolve(&self, importer: &str, specifier: &str, exists: impl Fn(&str) -> bool) -> Resolution {
        let base = if is_relative(specifier) {
            let dir = match importer.rfind('/') {
                Some(pos) => &importer[..pos],
                None => "",
            };
            join(dir, specifier)
        } else if let Some(rooted) = specifier.strip_prefix('/') {
            normalize(rooted)
        } else {
            return Resolution::External(specifier.to_string());
        };

        let Some(base) = base else {
            return Resolution::Unresolved(specifier.to_string());
        };

        let importer_ext = importer
            .rsplit_once('.')
            .map(|(_, ext)| format!(".{}", ext))
            .filter(|ext| !ext.contains('/') && !self.extensions.contains(ext));
        let extensions: Vec<&str> = self
            .extensions
            .iter()
            .map(String::as_str)
            .chain(importer_ext.as_deref())
            .collect();

        let mut candidates = Vec::with_capacity(extensions.len() * 2 + 1);
        if !base.is_empty() {
            candidates.push(base.clone());
            candidates.extend(extensions.iter().map(|ext| format!("{}{}", base, ext)));
        }
        let index_prefix = if base.is_empty() {
            "index".to_string()
        } else {
            format!("{}/index", base)
        };
        candidates.extend(extensions.iter().map(|ext| format!("{}{}", index_prefix, ext)));

        candidates
            .into_iter()
            .find(|c| exists(c))
            .map(Resolution::Internal)
            .unwrap_or_else(|| Resolution::Unresolved(specifier.to_string()))
    }
}

fn is_relative(specifier: &str) -> bool {
    specifier == "." || specifier == ".." || specifier.starts_with("./") || specifier.starts_with("../")
}

fn join(dir: &str, specifier: &str) -> Option<String> {
    if dir.is_empty() {
        normalize(specifier)
    } else {
        normalize(&format!("{}/{}", dir, specifier))
    }
}

/// Lexically collapse `.` and `..`; `None` if the path climbs above the root.
pub fn normalize(path: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn resolver() -> ImportResolver {
        ImportResolver::from_config(&DependenciesConfig::default())
    }

    fn files(paths: &[&str]) -> HashSet<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_relative_with_extension_probe() {
        let known = files(&["src/a.ts", "src/b.tsx"]);
        let r = resolver();
        assert_eq!(
            r.resolve("src/a.ts", "./b", |p| known.contains(p)),
            Resolution::Internal("src/b.tsx".to_string())
        );
    }

    #[test]
    fn test_parent_and_index_fallback() {
        let known = files(&["src/lib/index.ts", "src/app/main.ts"]);
        let r = resolver();
        assert_eq!(
            r.resolve("src/app/main.ts", "../lib", |p| known.contains(p)),
            Resolution::Internal("src/lib/index.ts".to_string())
        );
    }

    #[test]
    fn test_exact_path_wins() {
        let known = files(&["data.json", "data.json.ts"]);
        assert_eq!(
            resolver().resolve("main.ts", "./data.json", |p| known.contains(p)),
            Resolution::Internal("data.json".to_string())
        );
    }

    #[test]
    fn test_root_anchored_specifier() {
        let known = files(&["shared/util.js"]);
        assert_eq!(
            resolver().resolve("deep/nested/x.ts", "/shared/util", |p| known.contains(p)),
            Resolution::Internal("shared/util.js".to_string())
        );
    }

    #[test]
    fn test_bare_specifier_is_external() {
        assert_eq!(
            resolver().resolve("a.ts", "react", |_| true),
            Resolution::External("react".to_string())
        );
    }

    #[test]
    fn test_missing_and_escaping_paths_are_unresolved() {
        let known = files(&["a.ts"]);
        let r = resolver();
        assert_eq!(
            r.resolve("a.ts", "./missing", |p| known.contains(p)),
            Resolution::Unresolved("./missing".to_string())
        );
        assert_eq!(
            r.resolve("a.ts", "../../outside", |_| true),
            Resolution::Unresolved("../../outside".to_string())
        );
    }

    #[test]
    fn test_importer_extension_is_tried() {
        let known = files(&["pkg/models.py", "pkg/app.py"]);
        assert_eq!(
            resolver().resolve("pkg/app.py", "./models", |p| known.contains(p)),
            Resolution::Internal("pkg/models.py".to_string())
        );
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("a/./b/../c"), Some("a/c".to_string()));
        assert_eq!(normalize("../x"), None);
    }
}
