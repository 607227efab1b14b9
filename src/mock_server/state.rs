//! Mock server state management.
//!
//! Provides the in-memory data store for the mock SonarCloud API server.

use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{
    ChangelogEvent, InheritedProfile, ProfileInheritance, QualityProfile, RestoreResult,
};

/// A profile together with the data the mock keeps around it.
#[derive(Debug, Clone)]
pub struct StoredProfile {
    pub organization: String,
    pub profile: QualityProfile,
    /// Keys of the explicitly associated projects.
    pub projects: BTreeSet<String>,
    /// Active rule keys (e.g., "java:S1068").
    pub rules: Vec<String>,
    /// Changelog, most recent first.
    pub events: Vec<ChangelogEvent>,
}

impl StoredProfile {
    fn matches(&self, organization: &str, language: &str, name: &str) -> bool {
        self.organization == organization
            && self.profile.language == language
            && self.profile.name == name
    }

    fn as_inherited(&self) -> InheritedProfile {
        InheritedProfile {
            key: self.profile.key.clone(),
            name: self.profile.name.clone(),
            parent: self.profile.parent_key.clone(),
            active_rule_count: self.rules.len() as u32,
            overriding_rule_count: None,
            is_built_in: self.profile.is_built_in,
        }
    }
}

/// Shared state for the mock server.
///
/// This struct holds all the mock data that the server will serve.
/// It's wrapped in `Arc<RwLock<_>>` for concurrent access.
#[derive(Debug, Default)]
pub struct MockState {
    pub profiles: Vec<StoredProfile>,

    /// Optional authentication token. If set, requests must include this token.
    pub required_token: Option<String>,

    next_key: u64,
}

impl MockState {
    /// Create a new empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create state wrapped in Arc<RwLock> for sharing.
    pub fn shared(self) -> Arc<RwLock<Self>> {
        Arc::new(RwLock::new(self))
    }

    /// Add a profile to the state.
    pub fn with_profile(mut self, organization: &str, profile: QualityProfile, rules: &[&str]) -> Self {
        self.profiles.push(StoredProfile {
            organization: organization.to_string(),
            profile,
            projects: BTreeSet::new(),
            rules: rules.iter().map(|r| r.to_string()).collect(),
            events: Vec::new(),
        });
        self
    }

    /// Replace the changelog of a profile.
    pub fn with_events(
        mut self,
        organization: &str,
        language: &str,
        name: &str,
        events: Vec<ChangelogEvent>,
    ) -> Self {
        if let Some(stored) = self.find_mut(organization, language, name) {
            stored.events = events;
        }
        self
    }

    /// Set the required authentication token.
    pub fn with_required_token(mut self, token: &str) -> Self {
        self.required_token = Some(token.to_string());
        self
    }

    /// Get a profile by organization, language and name.
    pub fn find(&self, organization: &str, language: &str, name: &str) -> Option<&StoredProfile> {
        self.profiles
            .iter()
            .find(|p| p.matches(organization, language, name))
    }

    fn find_mut(
        &mut self,
        organization: &str,
        language: &str,
        name: &str,
    ) -> Option<&mut StoredProfile> {
        self.profiles
            .iter_mut()
            .find(|p| p.matches(organization, language, name))
    }

    fn by_key(&self, key: &str) -> Option<&StoredProfile> {
        self.profiles.iter().find(|p| p.profile.key == key)
    }

    fn allocate_key(&mut self) -> String {
        self.next_key += 1;
        format!("AX-mock-{:06}", self.next_key)
    }

    /// Search profiles with the filters of `api/qualityprofiles/search`.
    pub fn search(
        &self,
        organization: &str,
        defaults: bool,
        language: Option<&str>,
        project: Option<&str>,
        name: Option<&str>,
    ) -> Vec<QualityProfile> {
        self.profiles
            .iter()
            .filter(|p| p.organization == organization)
            .filter(|p| !defaults || p.profile.is_default)
            .filter(|p| language.map_or(true, |l| p.profile.language == l))
            .filter(|p| project.map_or(true, |k| p.projects.contains(k)))
            .filter(|p| name.map_or(true, |n| p.profile.name == n))
            .map(|p| {
                let mut profile = p.profile.clone();
                profile.active_rule_count = Some(p.rules.len() as u32);
                profile.project_count = Some(p.projects.len() as u32);
                profile.organization = Some(p.organization.clone());
                profile
            })
            .collect()
    }

    /// Create an empty profile.
    pub fn create(
        &mut self,
        organization: &str,
        language: &str,
        name: &str,
    ) -> Result<QualityProfile, String> {
        if self.find(organization, language, name).is_some() {
            return Err(format!(
                "Quality profile already exists: {{lang={language}, name={name}}}"
            ));
        }

        let key = self.allocate_key();
        let profile = QualityProfile {
            key,
            name: name.to_string(),
            language: language.to_string(),
            language_name: None,
            is_inherited: false,
            is_default: false,
            is_built_in: false,
            parent_key: None,
            parent_name: None,
            active_rule_count: Some(0),
            active_deprecated_rule_count: None,
            project_count: None,
            rule_updated_at: None,
            last_used: None,
            user_updated_at: None,
            organization: Some(organization.to_string()),
            actions: None,
        };

        self.profiles.push(StoredProfile {
            organization: organization.to_string(),
            profile: profile.clone(),
            projects: BTreeSet::new(),
            rules: Vec::new(),
            events: Vec::new(),
        });

        Ok(profile)
    }

    /// Delete a profile and all its descendants.
    pub fn delete(&mut self, organization: &str, language: &str, name: &str) -> Result<(), String> {
        let stored = self
            .find(organization, language, name)
            .ok_or_else(|| not_found(language, name))?;

        if stored.profile.is_default {
            return Err(format!("Profile '{name}' is the default profile and cannot be deleted"));
        }

        let mut doomed = vec![stored.profile.key.clone()];
        let mut i = 0;
        while i < doomed.len() {
            let parent = doomed[i].clone();
            let children: Vec<String> = self
                .profiles
                .iter()
                .filter(|p| p.profile.parent_key.as_deref() == Some(parent.as_str()))
                .map(|p| p.profile.key.clone())
                .filter(|key| !doomed.contains(key))
                .collect();
            doomed.extend(children);
            i += 1;
        }

        self.profiles.retain(|p| !doomed.contains(&p.profile.key));
        Ok(())
    }

    /// Make a profile the default of its language.
    pub fn set_default(&mut self, organization: &str, language: &str, name: &str) -> Result<(), String> {
        if self.find(organization, language, name).is_none() {
            return Err(not_found(language, name));
        }

        for p in self
            .profiles
            .iter_mut()
            .filter(|p| p.organization == organization && p.profile.language == language)
        {
            p.profile.is_default = p.profile.name == name;
        }
        Ok(())
    }

    /// Associate a project with a profile, replacing any other profile of
    /// the same language.
    pub fn add_project(
        &mut self,
        organization: &str,
        language: &str,
        name: &str,
        project: &str,
    ) -> Result<(), String> {
        if self.find(organization, language, name).is_none() {
            return Err(not_found(language, name));
        }

        for p in self
            .profiles
            .iter_mut()
            .filter(|p| p.organization == organization && p.profile.language == language)
        {
            if p.profile.name == name {
                p.projects.insert(project.to_string());
            } else {
                p.projects.remove(project);
            }
        }
        Ok(())
    }

    /// Remove a project's association with a profile.
    pub fn remove_project(
        &mut self,
        organization: &str,
        language: &str,
        name: &str,
        project: &str,
    ) -> Result<(), String> {
        let stored = self
            .find_mut(organization, language, name)
            .ok_or_else(|| not_found(language, name))?;
        stored.projects.remove(project);
        Ok(())
    }

    /// Set or clear a profile's parent.
    pub fn change_parent(
        &mut self,
        organization: &str,
        language: &str,
        name: &str,
        parent: Option<&str>,
    ) -> Result<(), String> {
        let child_key = self
            .find(organization, language, name)
            .ok_or_else(|| not_found(language, name))?
            .profile
            .key
            .clone();

        let parent_ref = match parent {
            Some(parent_name) => {
                let p = self
                    .find(organization, language, parent_name)
                    .ok_or_else(|| not_found(language, parent_name))?;
                if p.profile.key == child_key {
                    return Err("A profile cannot inherit from itself".to_string());
                }
                if self.lineage(&p.profile.key).contains(&child_key) {
                    return Err("Descendant quality profile can't be used as parent".to_string());
                }
                Some((p.profile.key.clone(), p.profile.name.clone()))
            }
            None => None,
        };

        let stored = self
            .find_mut(organization, language, name)
            .ok_or_else(|| not_found(language, name))?;

        stored.profile.is_inherited = parent_ref.is_some();
        stored.profile.parent_key = parent_ref.as_ref().map(|(key, _)| key.clone());
        stored.profile.parent_name = parent_ref.map(|(_, name)| name);
        Ok(())
    }

    /// Keys of a profile and all its ancestors, nearest first.
    fn lineage(&self, key: &str) -> Vec<String> {
        let mut keys = vec![key.to_string()];
        let mut next = self.by_key(key).and_then(|p| p.profile.parent_key.clone());
        while let Some(parent) = next {
            if keys.contains(&parent) {
                break;
            }
            next = self.by_key(&parent).and_then(|p| p.profile.parent_key.clone());
            keys.push(parent);
        }
        keys
    }

    /// Ancestors and children of a profile.
    pub fn inheritance(&self, organization: &str, language: &str, name: &str) -> Option<ProfileInheritance> {
        let stored = self.find(organization, language, name)?;

        let mut ancestors = Vec::new();
        let mut next = stored.profile.parent_key.clone();
        while let Some(key) = next {
            match self.by_key(&key) {
                Some(parent) if ancestors.len() < self.profiles.len() => {
                    ancestors.push(parent.as_inherited());
                    next = parent.profile.parent_key.clone();
                }
                _ => break,
            }
        }

        let children = self
            .profiles
            .iter()
            .filter(|p| p.profile.parent_key.as_deref() == Some(stored.profile.key.as_str()))
            .map(StoredProfile::as_inherited)
            .collect();

        Some(ProfileInheritance {
            profile: stored.as_inherited(),
            ancestors,
            children,
        })
    }

    /// XML backup of a profile.
    pub fn backup(&self, organization: &str, language: &str, name: &str) -> Option<String> {
        let stored = self.find(organization, language, name)?;

        let rules: String = stored
            .rules
            .iter()
            .map(|rule| {
                let (repository, key) = rule.split_once(':').unwrap_or((language, rule));
                format!(
                    "<rule><repositoryKey>{}</repositoryKey><key>{}</key><priority>MAJOR</priority></rule>",
                    escape_xml(repository),
                    escape_xml(key)
                )
            })
            .collect();

        Some(format!(
            "<?xml version='1.0' encoding='UTF-8'?><profile><name>{}</name><language>{}</language><rules>{}</rules></profile>",
            escape_xml(&stored.profile.name),
            escape_xml(&stored.profile.language),
            rules
        ))
    }

    /// Restore a profile from an XML backup, overwriting any profile with
    /// the same name and language.
    pub fn restore(&mut self, organization: &str, xml: &str) -> Result<RestoreResult, String> {
        let name = element(xml, "name").ok_or("Backup XML is missing <name>")?;
        let language = element(xml, "language").ok_or("Backup XML is missing <language>")?;

        let rules: Vec<String> = xml
            .split("<rule>")
            .skip(1)
            .filter_map(|rule| {
                let repository = element(rule, "repositoryKey")?;
                let key = element(rule, "key")?;
                Some(format!("{repository}:{key}"))
            })
            .collect();
        let declared = xml.matches("<rule>").count();

        if self.find(organization, &language, &name).is_none() {
            self.create(organization, &language, &name)?;
        }

        let stored = self
            .find_mut(organization, &language, &name)
            .ok_or_else(|| not_found(&language, &name))?;
        stored.rules = rules;

        let mut profile = stored.profile.clone();
        profile.active_rule_count = Some(stored.rules.len() as u32);

        Ok(RestoreResult {
            profile,
            rule_successes: stored.rules.len() as u32,
            rule_failures: (declared - stored.rules.len()) as u32,
        })
    }
}

fn not_found(language: &str, name: &str) -> String {
    format!("Quality Profile for language '{language}' and name '{name}' does not exist")
}

/// Unescaped text of the first `<tag>...</tag>` element.
fn element(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close)? + start;
    Some(unescape_xml(xml[start..end].trim()))
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_server::Fixtures;

    fn state() -> MockState {
        MockState::new()
            .with_profile("acme", Fixtures::profile("AX-1", "Root", "java"), &["java:S1"])
            .with_profile("acme", Fixtures::profile("AX-2", "Child", "java"), &[])
            .with_profile("other", Fixtures::profile("AX-3", "Root", "java"), &[])
    }

    #[test]
    fn test_search_scopes_by_organization() {
        let state = state();
        assert_eq!(state.search("acme", false, None, None, None).len(), 2);
        assert_eq!(state.search("other", false, None, None, None).len(), 1);
        assert_eq!(state.search("acme", false, Some("py"), None, None).len(), 0);
    }

    #[test]
    fn test_create_rejects_duplicates() {
        let mut state = state();
        assert!(state.create("acme", "java", "Root").is_err());
        let created = state.create("acme", "java", "New").unwrap();
        assert!(created.key.starts_with("AX-mock-"));
        assert!(state.find("acme", "java", "New").is_some());
    }

    #[test]
    fn test_delete_removes_descendants() {
        let mut state = state();
        state.change_parent("acme", "java", "Child", Some("Root")).unwrap();

        state.delete("acme", "java", "Root").unwrap();

        assert!(state.find("acme", "java", "Root").is_none());
        assert!(state.find("acme", "java", "Child").is_none());
        assert!(state.find("other", "java", "Root").is_some());
    }

    #[test]
    fn test_delete_rejects_default() {
        let mut state = state();
        state.set_default("acme", "java", "Root").unwrap();
        assert!(state.delete("acme", "java", "Root").is_err());
    }

    #[test]
    fn test_inheritance() {
        let mut state = state();
        state.change_parent("acme", "java", "Child", Some("Root")).unwrap();

        let child = state.inheritance("acme", "java", "Child").unwrap();
        assert_eq!(child.ancestors.len(), 1);
        assert_eq!(child.ancestors[0].name, "Root");

        let root = state.inheritance("acme", "java", "Root").unwrap();
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.profile.active_rule_count, 1);
    }

    #[test]
    fn test_backup_then_restore_elsewhere() {
        let mut state = state();
        let xml = state.backup("acme", "java", "Root").unwrap();
        assert!(xml.contains("<key>S1</key>"));

        let result = state.restore("other", &xml).unwrap();
        assert_eq!(result.rule_successes, 1);
        assert_eq!(result.rule_failures, 0);
        assert_eq!(state.find("other", "java", "Root").unwrap().rules, vec!["java:S1"]);
    }

    #[test]
    fn test_change_parent_rejects_cycle() {
        let mut state = state();
        state.change_parent("acme", "java", "Child", Some("Root")).unwrap();

        let err = state
            .change_parent("acme", "java", "Root", Some("Child"))
            .unwrap_err();
        assert_eq!(err, "Descendant quality profile can't be used as parent");
        assert!(state.find("acme", "java", "Root").unwrap().profile.parent_key.is_none());

        assert!(state.change_parent("acme", "java", "Root", Some("Root")).is_err());
    }

    #[test]
    fn test_delete_terminates_on_cyclic_parents() {
        let mut state = state();
        // Seed a cycle directly, bypassing change_parent
        state.profiles[0].profile.parent_key = Some("AX-2".to_string());
        state.profiles[1].profile.parent_key = Some("AX-1".to_string());

        state.delete("acme", "java", "Child").unwrap();

        assert!(state.find("acme", "java", "Root").is_none());
        assert!(state.find("acme", "java", "Child").is_none());
        assert_eq!(state.profiles.len(), 1);
    }

    #[test]
    fn test_backup_escapes_names() {
        let mut state = MockState::new().with_profile(
            "acme",
            Fixtures::profile("AX-9", "R&D <strict>", "java"),
            &["java:S1"],
        );

        let xml = state.backup("acme", "java", "R&D <strict>").unwrap();
        assert!(xml.contains("<name>R&amp;D &lt;strict&gt;</name>"));

        let result = state.restore("other", &xml).unwrap();
        assert_eq!(result.profile.name, "R&D <strict>");
        assert_eq!(result.rule_successes, 1);
    }

    #[test]
    fn test_restore_requires_name() {
        let mut state = state();
        assert!(state.restore("acme", "<profile><language>java</language></profile>").is_err());
    }
}
