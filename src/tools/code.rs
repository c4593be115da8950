//! Code Context
//!
//! Collects an Actor's source for the code quality review. Source files
//! stored with the `latest` version win; otherwise the Git repositories
//! referenced by the default build and the versions are tried in order.

use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt::Write;
use tracing::{debug, info};

use super::artifact::{ArtifactKind, FetchedArtifact};
use super::source::MetadataSource;
use crate::constants::tools::FILES_TO_SKIP;
use crate::types::{ActorId, Result, truncate_to_token_limit};

/// One file of the code context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeFile {
    pub name: String,
    pub content: String,
}

/// File tree plus file contents
#[derive(Debug, Clone, PartialEq)]
pub struct CodeContext {
    /// Nested object, directories map to objects and files to `null`
    pub tree: Value,
    pub files: Vec<CodeFile>,
}

impl CodeContext {
    /// Markdown rendering handed to the model
    pub fn render(&self) -> String {
        let mut out = String::from("## File tree\n\n```\n");
        render_tree(&self.tree, 0, &mut out);
        out.push_str("```\n");

        for file in &self.files {
            let _ = write!(out, "\n### {}\n\n```\n{}\n```\n", file.name, file.content);
        }
        out
    }
}

/// Whether a path is lockfile/licence/readme noise
pub fn is_skipped(name: &str) -> bool {
    let lower = name.to_lowercase();
    FILES_TO_SKIP.iter().any(|skip| lower.contains(skip))
}

/// Build a nested file tree from slash-separated paths
pub fn file_tree<'a>(names: impl IntoIterator<Item = &'a str>) -> Value {
    let mut root = Map::new();
    for name in names {
        let parts: Vec<&str> = name.split('/').filter(|p| !p.is_empty()).collect();
        insert_path(&mut root, &parts);
    }
    Value::Object(root)
}

fn insert_path(node: &mut Map<String, Value>, parts: &[&str]) {
    match parts {
        [] => {}
        [file] => {
            node.entry(file.to_string()).or_insert(Value::Null);
        }
        [dir, rest @ ..] => {
            let child = node
                .entry(dir.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(map) = child {
                insert_path(map, rest);
            }
        }
    }
}

fn render_tree(tree: &Value, depth: usize, out: &mut String) {
    let Value::Object(entries) = tree else {
        return;
    };
    for (name, child) in entries {
        let suffix = if child.is_object() { "/" } else { "" };
        let _ = writeln!(out, "{}{}{}", "  ".repeat(depth), name, suffix);
        render_tree(child, depth + 1, out);
    }
}

/// Fetch the code context of an Actor
pub async fn fetch_code_context(
    source: &dyn MetadataSource,
    id: &ActorId,
    max_tokens: usize,
) -> Result<FetchedArtifact> {
    let versions = source.versions(id).await?;

    if let Some(latest) = versions
        .iter()
        .find(|v| v.build_tag.as_deref() == Some("latest"))
    {
        let text_files: Vec<_> = latest
            .source_files
            .iter()
            .filter(|f| {
                f.format
                    .as_deref()
                    .is_some_and(|fmt| fmt.eq_ignore_ascii_case("text"))
            })
            .collect();

        if !text_files.is_empty() {
            info!("Using {} stored source files for {}", text_files.len(), id);
            let context = CodeContext {
                tree: file_tree(text_files.iter().map(|f| f.name.as_str())),
                files: text_files
                    .iter()
                    .filter(|f| !is_skipped(&f.name))
                    .map(|f| CodeFile {
                        name: f.name.clone(),
                        content: f.content.clone().unwrap_or_default(),
                    })
                    .collect(),
            };
            return Ok(finish(id, id.as_str(), &context, max_tokens));
        }
    }

    let mut repo_urls = Vec::new();
    if let Some(build) = source.default_build(id).await?
        && let Some(url) = build.act_version.and_then(|v| v.git_repo_url)
    {
        repo_urls.push(url);
    }
    repo_urls.extend(versions.into_iter().filter_map(|v| v.git_repo_url));
    let mut seen = HashSet::new();
    repo_urls.retain(|url| seen.insert(url.clone()));

    for repo_url in &repo_urls {
        let Some(snapshot) = source.repository(repo_url, max_tokens).await? else {
            continue;
        };

        info!("Using repository {} for {}", repo_url, id);
        let context = CodeContext {
            tree: snapshot.tree,
            files: snapshot
                .files
                .into_iter()
                .filter(|(name, file)| file.file_type == "content" && !is_skipped(name))
                .map(|(name, file)| CodeFile {
                    name,
                    content: file.content.unwrap_or_default(),
                })
                .collect(),
        };
        return Ok(finish(id, repo_url, &context, max_tokens));
    }

    debug!("No source code reachable for {}", id);
    Ok(FetchedArtifact::unavailable(
        ArtifactKind::SourceCode,
        id.as_str(),
        "no stored source files and no reachable Git repository; grade the code as N/A",
    ))
}

fn finish(id: &ActorId, origin: &str, context: &CodeContext, max_tokens: usize) -> FetchedArtifact {
    let text = truncate_to_token_limit(&context.render(), max_tokens);
    let source = if origin == id.as_str() {
        id.to_string()
    } else {
        format!("{} ({})", id, origin)
    };
    FetchedArtifact::available(ArtifactKind::SourceCode, source, text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubMetadata;
    use crate::tools::source::{
        BuildRecord, BuildVersion, RepositoryFile, RepositorySnapshot, SourceFile, VersionRecord,
    };

    fn id() -> ActorId {
        ActorId::parse("owner/pkg").unwrap()
    }

    fn source_file(name: &str, format: &str) -> SourceFile {
        SourceFile {
            name: name.to_string(),
            format: Some(format.to_string()),
            content: Some(format!("// {name}")),
        }
    }

    #[test]
    fn test_file_tree_nests_directories() {
        let tree = file_tree(["src/main.py", "src/utils/io.py", "README.md"]);
        assert!(tree["src"]["utils"]["io.py"].is_null());
        assert!(tree["README.md"].is_null());
        assert!(tree["src"].is_object());
    }

    #[test]
    fn test_is_skipped() {
        assert!(is_skipped("LICENSE"));
        assert!(is_skipped("frontend/package-lock.json"));
        assert!(is_skipped("README.md"));
        assert!(!is_skipped("src/main.py"));
    }

    #[test]
    fn test_render_lists_tree_and_files() {
        let context = CodeContext {
            tree: file_tree(["src/main.py"]),
            files: vec![CodeFile {
                name: "src/main.py".to_string(),
                content: "print(1)".to_string(),
            }],
        };
        let text = context.render();
        assert!(text.contains("src/\n  main.py"));
        assert!(text.contains("### src/main.py"));
    }

    #[tokio::test]
    async fn test_prefers_latest_version_text_files() {
        let stub = StubMetadata::new().with_versions(vec![VersionRecord {
            build_tag: Some("latest".to_string()),
            source_files: vec![
                source_file("src/main.py", "TEXT"),
                source_file("LICENSE", "TEXT"),
                source_file("icon.png", "BASE64"),
            ],
            ..VersionRecord::default()
        }]);

        let artifact = fetch_code_context(&stub, &id(), 10_000).await.unwrap();
        let text = artifact.text().unwrap();
        assert!(text.contains("### src/main.py"));
        assert!(!text.contains("### LICENSE"));
        assert!(!text.contains("icon.png"));
        assert_eq!(artifact.source, "owner/pkg");
    }

    #[tokio::test]
    async fn test_falls_back_to_repository() {
        let mut files = std::collections::BTreeMap::new();
        files.insert(
            "main.js".to_string(),
            RepositoryFile {
                file_type: "content".to_string(),
                content: Some("console.log(1)".to_string()),
            },
        );
        files.insert(
            "yarn.lock".to_string(),
            RepositoryFile {
                file_type: "content".to_string(),
                content: Some("lock".to_string()),
            },
        );

        let stub = StubMetadata::new()
            .with_build(BuildRecord {
                actor_definition: None,
                act_version: Some(BuildVersion {
                    git_repo_url: Some("https://github.com/owner/pkg".to_string()),
                }),
            })
            .with_repository(
                "https://github.com/owner/pkg",
                RepositorySnapshot {
                    tree: file_tree(["main.js", "yarn.lock"]),
                    files,
                },
            );

        let artifact = fetch_code_context(&stub, &id(), 10_000).await.unwrap();
        let text = artifact.text().unwrap();
        assert!(text.contains("console.log(1)"));
        assert!(!text.contains("### yarn.lock"));
        assert!(artifact.source.contains("github.com/owner/pkg"));
    }

    #[tokio::test]
    async fn test_unavailable_without_code() {
        let stub = StubMetadata::new();
        let artifact = fetch_code_context(&stub, &id(), 10_000).await.unwrap();
        assert!(!artifact.is_available());
        assert_eq!(artifact.kind, ArtifactKind::SourceCode);
    }

    #[tokio::test]
    async fn test_each_repository_is_tried_once() {
        let repo = |url: &str| VersionRecord {
            git_repo_url: Some(url.to_string()),
            ..VersionRecord::default()
        };
        let stub = StubMetadata::new()
            .with_build(BuildRecord {
                actor_definition: None,
                act_version: Some(BuildVersion {
                    git_repo_url: Some("https://github.com/owner/a".to_string()),
                }),
            })
            .with_versions(vec![
                repo("https://github.com/owner/b"),
                repo("https://github.com/owner/a"),
            ]);
        let calls = stub.call_counter();

        let artifact = fetch_code_context(&stub, &id(), 10_000).await.unwrap();
        assert!(!artifact.is_available());
        // versions, default build, then one lookup per distinct repository
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 4);
    }
}
