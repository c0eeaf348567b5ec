//! Instruction prompt resolution.
//!
//! The prompt fed to the model is resolved through four tiers, each
//! consulted only when the previous one produced nothing:
//!
//! 1. workspace rule files (`.md` files inside the configured rule
//!    directories of each workspace root),
//! 2. the user's custom prompt from configuration,
//! 3. the bundled template for the configured language,
//! 4. a hardcoded English fallback.
//!
//! The relative order of tiers 1 and 2 differed between call paths in
//! earlier versions of this tool; both orders survive as named
//! [`PromptStrategy`] variants selected through configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::config::Settings;

/// Hardcoded fallback instruction (tier 4).
pub const DEFAULT_PROMPT: &str = "You are a helpful assistant that generates conventional commit messages based on git diffs.
Please generate a commit message for the following diff.
The commit message should follow the Conventional Commits specification.
Only return the commit message, no other text.";

const TEMPLATE_EN: &str = include_str!("templates/en.md");
const TEMPLATE_ZH_CN: &str = include_str!("templates/zh-CN.md");

/// Which of the first two tiers wins when both have content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum PromptStrategy {
    /// Workspace rule files beat the custom prompt.
    #[default]
    #[serde(rename = "rules-first")]
    RulesFirst,
    /// The custom prompt beats workspace rule files.
    #[serde(rename = "custom-first")]
    CustomFirst,
}

/// Resolves instruction prompts against one configuration snapshot and
/// a set of workspace roots.
pub struct PromptResolver<'a> {
    settings: &'a Settings,
    roots: &'a [PathBuf],
}

impl<'a> PromptResolver<'a> {
    pub fn new(settings: &'a Settings, roots: &'a [PathBuf]) -> Self {
        Self { settings, roots }
    }

    /// Resolve the instruction prompt using the configured strategy.
    pub fn resolve(&self, language: &str) -> String {
        self.resolve_with(language, self.settings.prompt_strategy)
    }

    /// Resolve the instruction prompt with an explicit tier order.
    pub fn resolve_with(&self, language: &str, strategy: PromptStrategy) -> String {
        let (first, second): (fn(&Self) -> Option<String>, fn(&Self) -> Option<String>) =
            match strategy {
                PromptStrategy::RulesFirst => (Self::workspace_rules, Self::custom_prompt),
                PromptStrategy::CustomFirst => (Self::custom_prompt, Self::workspace_rules),
            };

        if let Some(prompt) = first(self) {
            debug!("using {:?} tier-one prompt", strategy);
            return prompt;
        }
        if let Some(prompt) = second(self) {
            debug!("using {:?} tier-two prompt", strategy);
            return prompt;
        }
        if let Some(template) = builtin_template(language) {
            debug!(language, "using bundled prompt template");
            return template.to_string();
        }
        DEFAULT_PROMPT.to_string()
    }

    /// Full prompt sent to the model: resolved instructions followed by
    /// the diff in a fenced block. The join is fixed so identical inputs
    /// always produce identical prompts.
    pub fn compose(&self, language: &str, diff: &str) -> String {
        let prompt = self.resolve(language);
        format!("{prompt}\n\nGit diff:\n```diff\n{diff}\n```\n")
    }

    /// Content of the first workspace prompt file found across roots and
    /// rule directories, if any.
    pub fn workspace_prompt_file(&self) -> Option<String> {
        for root in self.roots {
            for dir in &self.settings.rule_dirs {
                let path = root.join(dir).join(&self.settings.workspace_prompt_file);
                if let Some(content) = read_file(&path) {
                    if !content.trim().is_empty() {
                        debug!(path = %path.display(), "found workspace prompt file");
                        return Some(content);
                    }
                }
            }
        }
        None
    }

    /// Tier 1: concatenated `.md` rule files across all roots and rule
    /// directories, in sorted filename order.
    fn workspace_rules(&self) -> Option<String> {
        let mut blocks = Vec::new();

        for root in self.roots {
            for dir in &self.settings.rule_dirs {
                blocks.extend(read_markdown_dir(&root.join(dir)));
            }
        }

        if blocks.is_empty() {
            None
        } else {
            Some(blocks.join("\n\n"))
        }
    }

    /// Tier 2: trimmed custom prompt from configuration.
    fn custom_prompt(&self) -> Option<String> {
        let prompt = self.settings.custom_prompt.as_deref()?.trim();
        if prompt.is_empty() {
            None
        } else {
            Some(prompt.to_string())
        }
    }
}

/// Tier 3: bundled template for the language tag, matched on the full
/// tag first and the primary subtag second.
fn builtin_template(language: &str) -> Option<&'static str> {
    match language {
        "zh-CN" | "zh" => Some(TEMPLATE_ZH_CN),
        "en" | "en-US" => Some(TEMPLATE_EN),
        _ => None,
    }
}

/// Read one file; missing or unreadable files are "no content".
fn read_file(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(content) => Some(content),
        Err(_) => None,
    }
}

/// Trimmed contents of every `.md` file directly inside `dir`
/// (non-recursive), sorted by filename for determinism.
fn read_markdown_dir(dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "md"))
        .collect();
    paths.sort();

    paths
        .iter()
        .filter_map(|p| read_file(p))
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_template_matches_primary_subtag() {
        assert!(builtin_template("zh").is_some());
        assert!(builtin_template("en-US").is_some());
        assert!(builtin_template("fr").is_none());
    }

    #[test]
    fn default_prompt_mentions_conventional_commits() {
        assert!(DEFAULT_PROMPT.contains("Conventional Commits"));
    }
}
