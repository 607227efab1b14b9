//! Output formatting for CLI display.
//!
//! Provides the [`PrettyPrint`] trait for human-readable output
//! as an alternative to JSON serialization.

use crate::{format_sonar_date, ChangelogEvent, InheritedProfile, ProfileInheritance, QualityProfile, RestoreResult};

/// Trait for human-readable key-value output.
///
/// Implemented by model types to provide formatted output
/// suitable for terminal display when `--json` is not specified.
pub trait PrettyPrint {
    /// Returns a formatted string for terminal display.
    fn pretty_print(&self) -> String;
}

impl PrettyPrint for QualityProfile {
    fn pretty_print(&self) -> String {
        let header = format!("Profile: {}", self.name);
        let divider = "─".repeat(header.len().max(30));

        let mut lines = vec![
            header,
            divider,
            format!("Key:            {}", self.key),
            format!(
                "Language:       {}",
                self.language_name.as_deref().unwrap_or(&self.language)
            ),
        ];

        if let Some(ref parent) = self.parent_name {
            lines.push(format!("Parent:         {}", parent));
        }

        if let Some(count) = self.active_rule_count {
            lines.push(format!("Active rules:   {}", count));
        }

        if let Some(count) = self.project_count {
            lines.push(format!("Projects:       {}", count));
        }

        if let Some(ref updated) = self.rule_updated_at {
            lines.push(format!("Rules updated:  {}", format_sonar_date(updated)));
        }

        if self.is_default {
            lines.push("Default:        yes".to_string());
        }

        if self.is_built_in {
            lines.push("Built-in:       yes".to_string());
        }

        lines.join("\n")
    }
}

fn tree_line(profile: &InheritedProfile) -> String {
    let mut line = format!("{} ({} active rules", profile.name, profile.active_rule_count);
    if let Some(overriding) = profile.overriding_rule_count {
        line.push_str(&format!(", {} overriding", overriding));
    }
    line.push(')');
    if profile.is_built_in {
        line.push_str(" [built-in]");
    }
    line
}

impl PrettyPrint for ProfileInheritance {
    fn pretty_print(&self) -> String {
        let header = format!("Profile: {}", self.profile.name);
        let divider = "─".repeat(header.len().max(30));

        let mut lines = vec![header, divider];

        // Root ancestor first
        for (depth, ancestor) in self.ancestors.iter().rev().enumerate() {
            lines.push(format!("{}{}", "  ".repeat(depth), tree_line(ancestor)));
        }

        let depth = self.ancestors.len();
        lines.push(format!("{}* {}", "  ".repeat(depth), tree_line(&self.profile)));

        for child in &self.children {
            lines.push(format!("{}{}", "  ".repeat(depth + 1), tree_line(child)));
        }

        lines.join("\n")
    }
}

impl PrettyPrint for ChangelogEvent {
    fn pretty_print(&self) -> String {
        let date = self
            .date
            .as_ref()
            .map(format_sonar_date)
            .unwrap_or_else(|| "-".to_string());

        let mut line = format!(
            "{}  {:<11} {}",
            date,
            format!("{:?}", self.action).to_uppercase(),
            self.rule_key.as_deref().unwrap_or("-")
        );

        if let Some(author) = self.author() {
            line.push_str(&format!("  by {}", author));
        }

        if !self.params.is_empty() {
            let params: Vec<String> = self
                .params
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            line.push_str(&format!("  [{}]", params.join(", ")));
        }

        line
    }
}

impl PrettyPrint for RestoreResult {
    fn pretty_print(&self) -> String {
        format!(
            "{}\nRestored:       {} rules ({} failed)",
            self.profile.pretty_print(),
            self.rule_successes,
            self.rule_failures
        )
    }
}
