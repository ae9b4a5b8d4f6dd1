//! Project Analysis
//!
//! Detects what kind of project a source tree is by looking for marker files
//! (package.json, requirements.txt, Cargo.toml, go.mod, ...) and gathers the
//! facts a translator needs up front: entry points, dependencies, Docker
//! settings, tests and docs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::file_access::{to_slash_path, DEFAULT_EXCLUDED_DIRS};

/// Detected project type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectKind {
    #[serde(rename = "Node.js")]
    NodeJs,
    Python,
    #[serde(rename = "Java Maven")]
    JavaMaven,
    #[serde(rename = "Java Gradle")]
    JavaGradle,
    Rust,
    Go,
    #[serde(rename = "PHP")]
    Php,
    Unknown,
}

impl std::fmt::Display for ProjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ProjectKind::NodeJs => "Node.js",
            ProjectKind::Python => "Python",
            ProjectKind::JavaMaven => "Java Maven",
            ProjectKind::JavaGradle => "Java Gradle",
            ProjectKind::Rust => "Rust",
            ProjectKind::Go => "Go",
            ProjectKind::Php => "PHP",
            ProjectKind::Unknown => "Unknown",
        };
        write!(f, "{}", label)
    }
}

/// Docker facts read from the Dockerfile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockerConfig {
    pub has_dockerfile: bool,
    pub has_compose: bool,
    pub port: Option<String>,
    pub base_image: Option<String>,
}

/// Result of analyzing a source tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectAnalysis {
    pub project_type: ProjectKind,
    pub main_files: Vec<String>,
    /// Ecosystem name -> dependency names
    pub dependencies: BTreeMap<String, Vec<String>>,
    pub config_files: Vec<String>,
    pub docker: DockerConfig,
    pub test_files: Vec<String>,
    pub documentation: Vec<String>,
}

const MAIN_FILES: &[&str] = &[
    "main.py", "app.py", "server.py", "index.py", "main.js", "app.js", "server.js", "index.js",
    "main.go", "main.rs", "main.java", "index.php", "app.php",
];

const CONFIG_FILES: &[&str] = &[
    "config.json",
    "config.yaml",
    "config.yml",
    "settings.json",
    "settings.yaml",
    "settings.yml",
    ".env",
    "environment.json",
    "docker-compose.yml",
    "docker-compose.yaml",
];

const DOC_FILES: &[&str] = &[
    "README.md",
    "README.rst",
    "README.txt",
    "CHANGELOG.md",
    "CHANGELOG.rst",
    "LICENSE",
    "LICENSE.txt",
    "LICENSE.md",
    "docs",
    "documentation",
];

/// Project analyzer
pub struct ProjectAnalyzer {
    /// Project root path
    project_path: PathBuf,
}

impl ProjectAnalyzer {
    /// Create a new analyzer for the given path
    pub fn new(project_path: impl AsRef<Path>) -> Self {
        Self {
            project_path: project_path.as_ref().to_path_buf(),
        }
    }

    /// Analyze the project. Unreadable marker files are logged and skipped.
    pub fn analyze(&self) -> ProjectAnalysis {
        ProjectAnalysis {
            project_type: self.detect_kind(),
            main_files: self.existing(MAIN_FILES),
            dependencies: self.dependencies(),
            config_files: self.existing(CONFIG_FILES),
            docker: self.docker_config(),
            test_files: self.test_files(),
            documentation: self.existing(DOC_FILES),
        }
    }

    /// Detect the project type
    pub fn detect_kind(&self) -> ProjectKind {
        let detections = [
            (ProjectKind::NodeJs, "package.json"),
            (ProjectKind::Python, "requirements.txt"),
            (ProjectKind::JavaMaven, "pom.xml"),
            (ProjectKind::JavaGradle, "build.gradle"),
            (ProjectKind::Rust, "Cargo.toml"),
            (ProjectKind::Go, "go.mod"),
            (ProjectKind::Php, "composer.json"),
        ];

        detections
            .into_iter()
            .find(|(_, marker)| self.project_path.join(marker).exists())
            .map(|(kind, _)| kind)
            .unwrap_or(ProjectKind::Unknown)
    }

    fn existing(&self, names: &[&str]) -> Vec<String> {
        names
            .iter()
            .filter(|name| self.project_path.join(name).exists())
            .map(|name| name.to_string())
            .collect()
    }

    fn dependencies(&self) -> BTreeMap<String, Vec<String>> {
        let mut deps = BTreeMap::new();

        let requirements = self.project_path.join("requirements.txt");
        if let Some(content) = read_marker(&requirements) {
            let names: Vec<String> = content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(String::from)
                .collect();
            deps.insert("python".to_string(), names);
        }

        let package_json = self.project_path.join("package.json");
        if let Some(content) = read_marker(&package_json) {
            match serde_json::from_str::<serde_json::Value>(&content) {
                Ok(json) => {
                    let names = json
                        .get("dependencies")
                        .and_then(|d| d.as_object())
                        .map(|d| d.keys().cloned().collect())
                        .unwrap_or_default();
                    deps.insert("nodejs".to_string(), names);
                }
                Err(e) => tracing::warn!(error = %e, "failed to parse package.json"),
            }
        }

        let cargo_toml = self.project_path.join("Cargo.toml");
        if let Some(content) = read_marker(&cargo_toml) {
            match content.parse::<toml::Table>() {
                Ok(table) => {
                    let names = table
                        .get("dependencies")
                        .and_then(|d| d.as_table())
                        .map(|d| d.keys().cloned().collect())
                        .unwrap_or_default();
                    deps.insert("rust".to_string(), names);
                }
                Err(e) => tracing::warn!(error = %e, "failed to parse Cargo.toml"),
            }
        }

        deps
    }

    fn docker_config(&self) -> DockerConfig {
        let mut config = DockerConfig {
            has_compose: self.project_path.join("docker-compose.yml").exists()
                || self.project_path.join("docker-compose.yaml").exists(),
            ..Default::default()
        };

        let dockerfile = self.project_path.join("Dockerfile");
        if let Some(content) = read_marker(&dockerfile) {
            config.has_dockerfile = true;
            for line in content.lines().map(str::trim) {
                let mut words = line.split_whitespace();
                match (words.next(), words.next()) {
                    (Some("EXPOSE"), Some(port)) if config.port.is_none() => {
                        config.port = Some(port.to_string());
                    }
                    (Some("FROM"), Some(image)) if config.base_image.is_none() => {
                        config.base_image = Some(image.to_string());
                    }
                    _ => {}
                }
            }
        }

        config
    }

    fn test_files(&self) -> Vec<String> {
        let walker = ignore::WalkBuilder::new(&self.project_path)
            .hidden(false)
            .git_ignore(false)
            .parents(false)
            .filter_entry(|entry| {
                let name = entry.file_name().to_string_lossy();
                !(entry.depth() > 0 && DEFAULT_EXCLUDED_DIRS.contains(&&*name))
            })
            .build();

        let mut found: Vec<String> = walker
            .filter_map(Result::ok)
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter(|e| is_test_file(&e.file_name().to_string_lossy()))
            .filter_map(|e| {
                e.path()
                    .strip_prefix(&self.project_path)
                    .ok()
                    .map(to_slash_path)
            })
            .collect();
        found.sort();
        found
    }
}

fn read_marker(path: &Path) -> Option<String> {
    if !path.is_file() {
        return None;
    }
    match std::fs::read_to_string(path) {
        Ok(content) => Some(content),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read marker file");
            None
        }
    }
}

fn is_test_file(name: &str) -> bool {
    (name.starts_with("test_") && (name.ends_with(".py") || name.ends_with(".js")))
        || name.ends_with("_test.py")
        || name.ends_with("_test.js")
        || name.ends_with("_test.go")
        || name.ends_with(".test.js")
        || name.ends_with(".spec.js")
        || name == "tests.py"
        || name == "tests.js"
}
