//! Prompt compilation from the three context tiers.
//!
//! Output layout (sections with no snippets are omitted):
//!
//! ```text
//! Route context:
//! - <snippet>
//!
//! Module context:
//! - <snippet>
//!
//! Profile context:
//! - <snippet>
//!
//!
//! User question:
//! <prompt>
//! ```

use serde::{Deserialize, Serialize};

/// Module key used when the caller does not name one.
pub const DEFAULT_MODULE_KEY: &str = "GENERAL";

const ROUTE_SECTION: &str = "Route context";
const MODULE_SECTION: &str = "Module context";
const PROFILE_SECTION: &str = "Profile context";
const QUESTION_HEADER: &str = "\nUser question:\n";

/// Snippets fetched for one request, most recent first within each tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSnippets {
    pub route: Vec<String>,
    pub module: Vec<String>,
    pub profile: Vec<String>,
}

impl ContextSnippets {
    pub fn is_empty(&self) -> bool {
        self.route.is_empty() && self.module.is_empty() && self.profile.is_empty()
    }

    pub fn compile(&self, prompt: &str) -> String {
        compile(prompt, &self.route, &self.module, &self.profile)
    }
}

/// Merge the context tiers and the user prompt into one prompt.
///
/// With every tier empty the prompt is returned unchanged.
pub fn compile(prompt: &str, route: &[String], module: &[String], profile: &[String]) -> String {
    if route.is_empty() && module.is_empty() && profile.is_empty() {
        return prompt.to_string();
    }

    let mut out = String::new();
    append_section(&mut out, ROUTE_SECTION, route);
    append_section(&mut out, MODULE_SECTION, module);
    append_section(&mut out, PROFILE_SECTION, profile);
    out.push_str(QUESTION_HEADER);
    out.push_str(prompt);
    out
}

fn append_section(out: &mut String, title: &str, snippets: &[String]) {
    if snippets.is_empty() {
        return;
    }
    out.push_str(title);
    out.push_str(":\n");
    for snippet in snippets {
        out.push_str("- ");
        out.push_str(snippet);
        out.push('\n');
    }
    out.push('\n');
}

/// Blank or missing module keys fall back to [`DEFAULT_MODULE_KEY`].
pub fn effective_module_key(module_key: Option<&str>) -> &str {
    match module_key {
        Some(key) if !key.trim().is_empty() => key,
        _ => DEFAULT_MODULE_KEY,
    }
}
