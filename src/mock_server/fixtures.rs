//! Test data fixtures for the mock server.
//!
//! Provides factory functions for creating realistic test data.

use std::collections::BTreeMap;

use crate::{parse_sonar_date, ChangelogAction, ChangelogEvent, QualityProfile};

/// Organization used by the default scenario.
pub const ORGANIZATION: &str = "acme";

/// Collection of fixture factories for test data.
pub struct Fixtures;

impl Fixtures {
    // =========================================================================
    // Profile Fixtures
    // =========================================================================

    /// Create a minimal, non-default profile.
    pub fn profile(key: &str, name: &str, language: &str) -> QualityProfile {
        QualityProfile {
            key: key.to_string(),
            name: name.to_string(),
            language: language.to_string(),
            language_name: None,
            is_inherited: false,
            is_default: false,
            is_built_in: false,
            parent_key: None,
            parent_name: None,
            active_rule_count: None,
            active_deprecated_rule_count: None,
            project_count: None,
            rule_updated_at: None,
            last_used: None,
            user_updated_at: None,
            organization: None,
            actions: None,
        }
    }

    /// Create a built-in default profile.
    pub fn builtin_default(key: &str, language: &str) -> QualityProfile {
        let mut profile = Self::profile(key, "Sonar way", language);
        profile.is_built_in = true;
        profile.is_default = true;
        profile
    }

    /// Create a profile inheriting from `parent`.
    pub fn child_of(key: &str, name: &str, parent: &QualityProfile) -> QualityProfile {
        let mut profile = Self::profile(key, name, &parent.language);
        profile.is_inherited = true;
        profile.parent_key = Some(parent.key.clone());
        profile.parent_name = Some(parent.name.clone());
        profile
    }

    // =========================================================================
    // Changelog Fixtures
    // =========================================================================

    /// Create a changelog event.
    pub fn event(action: ChangelogAction, rule_key: &str, date: &str) -> ChangelogEvent {
        ChangelogEvent {
            date: parse_sonar_date(date),
            author_login: Some("jdoe".to_string()),
            author_name: Some("Jane Doe".to_string()),
            action,
            rule_key: Some(rule_key.to_string()),
            rule_name: Some(format!("Rule {rule_key}")),
            params: BTreeMap::new(),
        }
    }

    /// Create `count` activation events, most recent first.
    pub fn activations(count: usize, repository: &str) -> Vec<ChangelogEvent> {
        (0..count)
            .map(|i| {
                let day = 28 - (i % 28);
                Self::event(
                    ChangelogAction::Activated,
                    &format!("{repository}:S{}", 100 + i),
                    &format!("2024-02-{day:02}T10:00:00+0000"),
                )
            })
            .collect()
    }

    // =========================================================================
    // Scenarios
    // =========================================================================

    /// A default scenario with a realistic profile hierarchy.
    ///
    /// In organization [`ORGANIZATION`]:
    /// - java: "Sonar way" (built-in default) <- "Company way" <- "Team way"
    /// - py: "Sonar way" (built-in default)
    ///
    /// "Company way" carries a 5-event changelog.
    pub fn default_scenario() -> DefaultScenario {
        let java_default = Self::builtin_default("AX-java-sonar-way", "java");
        let company = Self::child_of("AX-java-company", "Company way", &java_default);
        let team = Self::child_of("AX-java-team", "Team way", &company);
        let py_default = Self::builtin_default("AX-py-sonar-way", "py");

        let mut company_events = Self::activations(3, "java");
        let mut updated = Self::event(
            ChangelogAction::Updated,
            "java:S100",
            "2024-03-01T09:30:00+0000",
        );
        updated.params.insert("severity".to_string(), "CRITICAL".to_string());
        company_events.insert(0, updated);
        company_events.push(Self::event(
            ChangelogAction::Deactivated,
            "java:S1068",
            "2024-01-15T08:00:00+0000",
        ));

        DefaultScenario {
            organization: ORGANIZATION.to_string(),
            profiles: vec![
                ScenarioProfile {
                    profile: java_default,
                    rules: vec!["java:S100", "java:S101", "java:S1068"],
                    projects: vec![],
                    events: vec![],
                },
                ScenarioProfile {
                    profile: company,
                    rules: vec!["java:S100", "java:S101", "java:S102"],
                    projects: vec!["acme_backend"],
                    events: company_events,
                },
                ScenarioProfile {
                    profile: team,
                    rules: vec!["java:S100"],
                    projects: vec![],
                    events: vec![],
                },
                ScenarioProfile {
                    profile: py_default,
                    rules: vec!["python:S1481"],
                    projects: vec![],
                    events: vec![],
                },
            ],
        }
    }
}

/// A profile and its surrounding data, as seeded into the mock.
#[derive(Debug, Clone)]
pub struct ScenarioProfile {
    pub profile: QualityProfile,
    pub rules: Vec<&'static str>,
    pub projects: Vec<&'static str>,
    pub events: Vec<ChangelogEvent>,
}

/// A complete test scenario with interconnected data.
#[derive(Debug, Clone)]
pub struct DefaultScenario {
    pub organization: String,
    pub profiles: Vec<ScenarioProfile>,
}
