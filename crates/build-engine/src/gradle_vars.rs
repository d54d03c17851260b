//! Gradle variables patcher
//!
//! Upserts `key = 'value'` lines inside the `ext { ... }` block of
//! `android/variables.gradle`. Only the value token of a matching line is
//! replaced; everything outside the block is left byte-for-byte as it was.

use std::path::{Path, PathBuf};

use capbuild_core::{fs, EditOutcome, ProjectLayout};
use regex::Regex;
use tracing::{debug, error, info};

use crate::BuildError;

const EXT_OPENER: &str = r"(?m)^\s*ext\s*\{";
const INSERT_INDENT: &str = "    ";

/// Byte range of the `ext` block body (between the braces)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BlockSpan {
    body_start: usize,
    body_end: usize,
}

/// Editor for one variables.gradle file
#[derive(Debug, Clone)]
pub struct GradleVariables {
    path: PathBuf,
}

impl GradleVariables {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Editor for `android/variables.gradle`
    pub fn for_project(layout: &ProjectLayout) -> Self {
        Self::new(layout.variables_gradle())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Set `key` to `value` inside the ext block, writing only on change
    pub async fn upsert(&self, key: &str, value: &str) -> Result<EditOutcome, BuildError> {
        if !self.path.exists() {
            error!("Gradle variables file not found: {:?}", self.path);
            return Err(BuildError::FileNotFound(self.path.display().to_string()));
        }

        let content = tokio::fs::read_to_string(&self.path).await?;
        let (patched, outcome) = upsert_variable(&content, key, value).map_err(|e| {
            error!("Cannot patch {:?}: {}", self.path, e);
            e
        })?;

        if outcome.is_change() {
            fs::replace_file(&self.path, patched).await?;
        }
        Ok(outcome)
    }
}

/// Upsert `key` in the variables file at `path`
pub async fn upsert(path: impl AsRef<Path>, key: &str, value: &str) -> Result<EditOutcome, BuildError> {
    GradleVariables::new(path.as_ref()).upsert(key, value).await
}

/// Apply the upsert to file text.
///
/// Returns the new text (identical to the input when unchanged) and the outcome.
pub fn upsert_variable(content: &str, key: &str, value: &str) -> Result<(String, EditOutcome), BuildError> {
    let span = find_ext_block(content)?;
    let body = &content[span.body_start..span.body_end];
    let replacement = format!("'{}'", value);

    let line_re = Regex::new(&format!(
        r#"(?m)^(?P<head>[ \t]*{}[ \t]*=[ \t]*)(?P<value>'[^'\n]*'|"[^"\n]*"|[^\s/]+)"#,
        regex::escape(key)
    ))?;

    let (new_body, outcome) = match line_re.captures(body) {
        Some(caps) => {
            let old = &caps["value"];
            if old == replacement {
                debug!("Gradle variable {} unchanged", key);
                return Ok((content.to_string(), EditOutcome::Unchanged));
            }
            info!("Gradle variable {}: {} -> {}", key, old, replacement);

            let value_range = caps.name("value").map(|m| m.range()).unwrap_or(0..0);
            let mut new_body = String::with_capacity(body.len() + replacement.len());
            new_body.push_str(&body[..value_range.start]);
            new_body.push_str(&replacement);
            new_body.push_str(&body[value_range.end..]);
            (new_body, EditOutcome::Updated)
        }
        None => {
            info!("Gradle variable {} = {} (new)", key, replacement);
            (insert_line(body, &format!("{}{} = {}", INSERT_INDENT, key, replacement)), EditOutcome::Inserted)
        }
    };

    let mut patched = String::with_capacity(content.len() + new_body.len());
    patched.push_str(&content[..span.body_start]);
    patched.push_str(&new_body);
    patched.push_str(&content[span.body_end..]);
    Ok((patched, outcome))
}

/// Insert `line` after the last non-blank line of `body`
fn insert_line(body: &str, line: &str) -> String {
    let mut lines: Vec<&str> = body.split('\n').collect();
    match lines.iter().rposition(|l| !l.trim().is_empty()) {
        Some(last) => {
            lines.insert(last + 1, line);
            // keep the closing brace off the inserted line
            if last + 2 == lines.len() {
                lines.push("");
            }
            lines.join("\n")
        }
        None => format!("\n{}\n", line),
    }
}

/// Locate the first `ext {` opener and its matching closing brace.
///
/// Braces inside quoted strings and `//` or `/* */` comments are ignored.
fn find_ext_block(content: &str) -> Result<BlockSpan, BuildError> {
    let opener = Regex::new(EXT_OPENER)?
        .find(content)
        .ok_or_else(|| BuildError::GradleVariables("no 'ext { ... }' block".to_string()))?;

    let body_start = opener.end();
    let bytes = content.as_bytes();
    let mut depth = 1usize;
    let mut quote: Option<u8> = None;
    let mut i = body_start;

    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    i += 1;
                } else if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'\'' | b'"' => quote = Some(b),
                b'/' if bytes.get(i + 1) == Some(&b'/') => {
                    i = content[i..].find('\n').map_or(bytes.len(), |end| i + end);
                    continue;
                }
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    let end = content[i + 2..]
                        .find("*/")
                        .ok_or_else(|| BuildError::GradleVariables("unterminated comment".to_string()))?;
                    i += 2 + end + 2;
                    continue;
                }
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(BlockSpan { body_start, body_end: i });
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }

    Err(BuildError::GradleVariables("unterminated 'ext' block".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARIABLES_GRADLE: &str = "ext {
    minSdkVersion = 23
    compileSdkVersion = 35
    androidxMaterialVersion = '1.10.0'
    androidxWebkitVersion = '1.12.1' // webview
    cordovaAndroidVersion = '10.1.1'
}

task printVersions {
    doLast { println \"{\" }
}
";

    #[test]
    fn test_update_existing_key() {
        let (patched, outcome) = upsert_variable(VARIABLES_GRADLE, "androidxMaterialVersion", "1.12.0").unwrap();

        assert_eq!(outcome, EditOutcome::Updated);
        assert!(patched.contains("    androidxMaterialVersion = '1.12.0'\n"));
        assert!(!patched.contains("1.10.0"));
        assert_eq!(patched.lines().count(), VARIABLES_GRADLE.lines().count());
    }

    #[test]
    fn test_insert_new_key() {
        let (patched, outcome) = upsert_variable(VARIABLES_GRADLE, "newKey", "abc").unwrap();

        assert_eq!(outcome, EditOutcome::Inserted);
        assert!(patched.contains("    cordovaAndroidVersion = '10.1.1'\n    newKey = 'abc'\n}"));
        assert!(patched.ends_with("task printVersions {\n    doLast { println \"{\" }\n}\n"));
    }

    #[test]
    fn test_keeps_trailing_comment_and_spacing() {
        let (patched, _) = upsert_variable(VARIABLES_GRADLE, "androidxWebkitVersion", "1.13.0").unwrap();
        assert!(patched.contains("    androidxWebkitVersion = '1.13.0' // webview\n"));

        let (patched, _) = upsert_variable("ext {\n\tminSdkVersion=22\n}\n", "minSdkVersion", "24").unwrap();
        assert_eq!(patched, "ext {\n\tminSdkVersion='24'\n}\n");
    }

    #[test]
    fn test_unchanged_returns_input() {
        let (patched, outcome) = upsert_variable(VARIABLES_GRADLE, "cordovaAndroidVersion", "10.1.1").unwrap();
        assert_eq!(outcome, EditOutcome::Unchanged);
        assert_eq!(patched, VARIABLES_GRADLE);
    }

    #[test]
    fn test_prefix_key_does_not_match() {
        let (patched, outcome) = upsert_variable(VARIABLES_GRADLE, "minSdk", "21").unwrap();
        assert_eq!(outcome, EditOutcome::Inserted);
        assert!(patched.contains("    minSdkVersion = 23\n"));
        assert!(patched.contains("    minSdk = '21'\n"));
    }

    #[test]
    fn test_braces_in_strings_and_empty_block() {
        let source = "ext {\n    banner = '}{'\n}\nafter = 1\n";
        let (patched, _) = upsert_variable(source, "k", "v").unwrap();
        assert_eq!(patched, "ext {\n    banner = '}{'\n    k = 'v'\n}\nafter = 1\n");

        let (patched, outcome) = upsert_variable("ext {}\n", "k", "v").unwrap();
        assert_eq!(outcome, EditOutcome::Inserted);
        assert_eq!(patched, "ext {\n    k = 'v'\n}\n");
    }

    #[test]
    fn test_comments_inside_block() {
        let source = "ext {\n    // don't bump without testing\n    androidxMaterialVersion = '1.11.0'\n}\n";
        let (patched, outcome) = upsert_variable(source, "androidxMaterialVersion", "1.12.0").unwrap();
        assert_eq!(outcome, EditOutcome::Updated);
        assert_eq!(
            patched,
            "ext {\n    // don't bump without testing\n    androidxMaterialVersion = '1.12.0'\n}\n"
        );

        let source = "ext {\n    /* } isn't the end */\n    a = '1' // closes }\n}\nafter { b = 2 }\n";
        let (patched, _) = upsert_variable(source, "k", "v").unwrap();
        assert_eq!(
            patched,
            "ext {\n    /* } isn't the end */\n    a = '1' // closes }\n    k = 'v'\n}\nafter { b = 2 }\n"
        );
    }

    #[test]
    fn test_nested_block_uses_matching_brace() {
        let source = "ext {\n    flavors = {\n        free = 'x'\n    }\n    a = '1'\n}\n";
        let (patched, outcome) = upsert_variable(source, "k", "v").unwrap();
        assert_eq!(outcome, EditOutcome::Inserted);
        assert_eq!(patched, "ext {\n    flavors = {\n        free = 'x'\n    }\n    a = '1'\n    k = 'v'\n}\n");
    }

    #[test]
    fn test_insert_into_single_line_block() {
        let (patched, _) = upsert_variable("ext { androidxMaterialVersion = '1.11.0' }
", "newKey", "1.0.0").unwrap();
        assert_eq!(patched, "ext { androidxMaterialVersion = '1.11.0' \n    newKey = '1.0.0'\n}\n");
    }

    #[test]
    fn test_missing_block() {
        let err = upsert_variable("android {\n}\n", "k", "v").unwrap_err();
        assert!(matches!(err, BuildError::GradleVariables(_)));

        let err = upsert_variable("ext {\n    a = 1\n", "k", "v").unwrap_err();
        assert!(matches!(err, BuildError::GradleVariables(_)));
    }

    #[tokio::test]
    async fn test_upsert_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("variables.gradle");
        tokio::fs::write(&path, VARIABLES_GRADLE).await.unwrap();

        let vars = GradleVariables::new(&path);
        assert_eq!(vars.upsert("androidxMaterialVersion", "1.12.0").await.unwrap(), EditOutcome::Updated);
        assert_eq!(vars.upsert("androidxMaterialVersion", "1.12.0").await.unwrap(), EditOutcome::Unchanged);

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(written.contains("androidxMaterialVersion = '1.12.0'"));

        let err = upsert(dir.path().join("missing.gradle"), "k", "v").await.unwrap_err();
        assert!(matches!(err, BuildError::FileNotFound(_)));
    }
}
