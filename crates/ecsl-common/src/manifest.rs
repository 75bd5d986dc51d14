use std::path::{Path, PathBuf};

use serde::Deserialize;

pub const MANIFEST_FILE: &str = "Ecsl.toml";

/// The parsed Ecsl.toml manifest.
#[derive(Debug, Clone)]
pub struct EcslManifest {
    pub project: Option<ProjectSection>,
    pub codegen: CodegenSection,
    /// The directory containing the Ecsl.toml file.
    pub root_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectSection {
    pub name: String,
}

/// `[codegen]` table. Every key is optional; `None` means "use the compiler default".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CodegenSection {
    #[serde(default)]
    pub max_entity_count: Option<usize>,
    #[serde(default)]
    pub foreach_filter: Option<String>,
    #[serde(default)]
    pub primitives: Vec<String>,
}

#[derive(Deserialize)]
struct RawManifest {
    #[serde(default)]
    project: Option<ProjectSection>,
    #[serde(default)]
    codegen: CodegenSection,
}

/// Errors that can occur when loading a manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("no Ecsl.toml found (searched from {0})")]
    NotFound(String),
    #[error("failed to read Ecsl.toml: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("invalid Ecsl.toml: {0}")]
    ParseError(String),
    #[error("invalid Ecsl.toml: [codegen] max_entity_count must be greater than zero")]
    ZeroCapacity,
    #[error("invalid Ecsl.toml: [codegen] unknown foreach_filter '{0}' (expected 'all' or 'any')")]
    UnknownFilter(String),
    #[error("invalid Ecsl.toml: [codegen] primitive '{0}' is not a valid identifier")]
    InvalidPrimitive(String),
}

/// Walk up from `start_dir` looking for `Ecsl.toml`.
pub fn find_manifest(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    loop {
        let candidate = current.join(MANIFEST_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Load and validate a manifest from a file path.
pub fn load_manifest(path: &Path) -> Result<EcslManifest, ManifestError> {
    let content = std::fs::read_to_string(path)?;
    let root_dir = path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    parse_manifest(&content, root_dir)
}

/// Parse and validate a manifest from a string.
pub fn parse_manifest(content: &str, root_dir: PathBuf) -> Result<EcslManifest, ManifestError> {
    let raw: RawManifest =
        toml::from_str(content).map_err(|e| ManifestError::ParseError(e.to_string()))?;

    validate_codegen(&raw.codegen)?;

    Ok(EcslManifest {
        project: raw.project,
        codegen: raw.codegen,
        root_dir,
    })
}

/// Find and load the manifest starting from a source file's directory.
pub fn find_and_load_manifest(source_file: &Path) -> Result<EcslManifest, ManifestError> {
    let start_dir = source_file.parent().unwrap_or_else(|| Path::new("."));
    let manifest_path = find_manifest(start_dir)
        .ok_or_else(|| ManifestError::NotFound(start_dir.display().to_string()))?;
    load_manifest(&manifest_path)
}

fn validate_codegen(codegen: &CodegenSection) -> Result<(), ManifestError> {
    if codegen.max_entity_count == Some(0) {
        return Err(ManifestError::ZeroCapacity);
    }
    if let Some(filter) = &codegen.foreach_filter {
        if filter != "all" && filter != "any" {
            return Err(ManifestError::UnknownFilter(filter.clone()));
        }
    }
    for primitive in &codegen.primitives {
        if !is_identifier(primitive) {
            return Err(ManifestError::InvalidPrimitive(primitive.clone()));
        }
    }
    Ok(())
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_manifest() {
        let manifest = parse_manifest("", PathBuf::from(".")).unwrap();
        assert!(manifest.project.is_none());
        assert!(manifest.codegen.max_entity_count.is_none());
        assert!(manifest.codegen.primitives.is_empty());
    }

    #[test]
    fn parse_full_manifest() {
        let toml = r#"
[project]
name = "game"

[codegen]
max_entity_count = 4096
foreach_filter = "any"
primitives = ["vec3f", "uint"]
"#;
        let manifest = parse_manifest(toml, PathBuf::from(".")).unwrap();
        assert_eq!(manifest.project.unwrap().name, "game");
        assert_eq!(manifest.codegen.max_entity_count, Some(4096));
        assert_eq!(manifest.codegen.foreach_filter.as_deref(), Some("any"));
        assert_eq!(manifest.codegen.primitives, vec!["vec3f", "uint"]);
    }

    #[test]
    fn zero_capacity_fails() {
        let result = parse_manifest("[codegen]\nmax_entity_count = 0\n", PathBuf::from("."));
        let err = result.unwrap_err().to_string();
        assert!(err.contains("greater than zero"), "got: {}", err);
    }

    #[test]
    fn unknown_filter_fails() {
        let result = parse_manifest("[codegen]\nforeach_filter = \"some\"\n", PathBuf::from("."));
        assert!(matches!(result, Err(ManifestError::UnknownFilter(ref f)) if f == "some"));
    }

    #[test]
    fn invalid_primitive_fails() {
        let result = parse_manifest(
            "[codegen]\nprimitives = [\"unsigned int\"]\n",
            PathBuf::from("."),
        );
        assert!(matches!(result, Err(ManifestError::InvalidPrimitive(_))));
    }

    #[test]
    fn malformed_toml_fails() {
        let result = parse_manifest("[codegen\n", PathBuf::from("."));
        let err = result.unwrap_err().to_string();
        assert!(err.contains("invalid Ecsl.toml"), "got: {}", err);
    }

    #[test]
    fn find_manifest_walks_up() {
        let tmp = std::env::temp_dir().join("ecsl_test_manifest");
        let _ = std::fs::remove_dir_all(&tmp);
        std::fs::create_dir_all(tmp.join("src/nested")).unwrap();
        std::fs::write(tmp.join(MANIFEST_FILE), "[project]\nname = \"test\"\n").unwrap();

        let found = find_manifest(&tmp.join("src/nested"));
        assert_eq!(found, Some(tmp.join(MANIFEST_FILE)));

        let loaded = find_and_load_manifest(&tmp.join("src/nested/main.ecs")).unwrap();
        assert_eq!(loaded.root_dir, tmp);

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
