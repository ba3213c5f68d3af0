//! The configuration document: profiles of expected field values
//!
//! Reserved upper-case keys carry connection and run settings, the
//! `approval_rules` key holds the approval-rule catalogue, and every other
//! top-level mapping is a profile.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::model::ResourceRef;
use crate::{Error, Result};

/// Name of the fallback profile
pub const DEFAULT_PROFILE: &str = "default";

/// Field holding the list of managed approval-rule catalogue keys
pub const APPROVAL_RULES_FIELD: &str = "approval_rules";

/// An expected (or live) field value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    /// Short name of the value's kind, used in type errors
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Text(_) => "string",
            Self::List(_) => "list",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Option<bool>> for FieldValue {
    fn from(value: Option<bool>) -> Self {
        value.map_or(Self::Null, Self::Bool)
    }
}

impl From<Option<String>> for FieldValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::Null, Self::Text)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "None"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Text(s) => write!(f, "{}", s),
            Self::List(items) => write!(f, "{}", items.join(", ")),
        }
    }
}

/// Ordered mapping from field name to expected value
///
/// Order follows the document and drives report column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldSet(Vec<(String, FieldValue)>);

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a field, keeping its original position on replace
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name, value)),
        }
    }

    /// Builder form of [`FieldSet::insert`]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for FieldSet {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct FieldSetVisitor;

        impl<'de> Visitor<'de> for FieldSetVisitor {
            type Value = FieldSet;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a mapping of field names to expected values")
            }

            fn visit_unit<E>(self) -> std::result::Result<FieldSet, E> {
                Ok(FieldSet::new())
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<FieldSet, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut fields = FieldSet::new();
                while let Some((name, value)) = map.next_entry::<String, FieldValue>()? {
                    fields.insert(name, value);
                }
                Ok(fields)
            }
        }

        deserializer.deserialize_any(FieldSetVisitor)
    }
}

/// Catalogue entry describing an approval rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRuleConfig {
    /// Rule name as shown on the project
    pub name: String,
    #[serde(default = "default_approvals_required")]
    pub approvals_required: u32,
    #[serde(default = "default_applies_to_all")]
    pub applies_to_all_protected_branches: bool,
    /// Usernames of eligible approvers
    #[serde(default)]
    pub users: Vec<String>,
}

fn default_approvals_required() -> u32 {
    1
}

fn default_applies_to_all() -> bool {
    true
}

#[derive(Deserialize)]
struct RawDocument {
    #[serde(rename = "GITLAB_URL", default)]
    gitlab_url: Option<String>,
    #[serde(rename = "GITLAB_CONFIG_LOG_LEVEL", default)]
    log_level: Option<String>,
    #[serde(rename = "APPROVERS_GROUP", default)]
    approvers_group: Option<ResourceRef>,
    #[serde(default)]
    approval_rules: BTreeMap<String, ApprovalRuleConfig>,
    #[serde(flatten)]
    entries: BTreeMap<String, serde_yaml::Value>,
}

/// Keep the top-level mappings as profiles; other entries are not profiles
fn collect_profiles(
    entries: BTreeMap<String, serde_yaml::Value>,
) -> Result<BTreeMap<String, FieldSet>> {
    let mut profiles = BTreeMap::new();
    for (name, value) in entries {
        if !value.is_mapping() {
            tracing::debug!(key = %name, "Ignoring top-level key that is not a profile");
            continue;
        }
        profiles.insert(name, serde_yaml::from_value(value)?);
    }
    Ok(profiles)
}

/// Validated configuration document, immutable once loaded
#[derive(Debug, Clone)]
pub struct ConfigDocument {
    gitlab_url: Option<String>,
    log_level: Option<String>,
    approvers_group: Option<ResourceRef>,
    approval_rules: BTreeMap<String, ApprovalRuleConfig>,
    default: FieldSet,
    profiles: BTreeMap<String, FieldSet>,
}

impl ConfigDocument {
    /// Build a document from a default profile only
    pub fn new(default: FieldSet) -> Self {
        Self {
            gitlab_url: None,
            log_level: None,
            approvers_group: None,
            approval_rules: BTreeMap::new(),
            default,
            profiles: BTreeMap::new(),
        }
    }

    /// Add a named profile (builder pattern)
    pub fn with_profile(mut self, name: impl Into<String>, fields: FieldSet) -> Self {
        self.profiles.insert(name.into(), fields);
        self
    }

    /// Add an approval rule to the catalogue (builder pattern)
    pub fn with_approval_rule(mut self, key: impl Into<String>, rule: ApprovalRuleConfig) -> Self {
        self.approval_rules.insert(key.into(), rule);
        self
    }

    /// Set the group whose members resolve approver usernames (builder pattern)
    pub fn with_approvers_group(mut self, group: impl Into<ResourceRef>) -> Self {
        self.approvers_group = Some(group.into());
        self
    }

    /// Load and validate a document from disk
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        tracing::debug!(?path, "Loading configuration document");
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate a YAML document
    pub fn parse(content: &str) -> Result<Self> {
        let raw: RawDocument = serde_yaml::from_str(content)?;
        let mut profiles = collect_profiles(raw.entries)?;
        let default = profiles
            .remove(DEFAULT_PROFILE)
            .ok_or(Error::MissingDefaultProfile)?;

        let document = Self {
            gitlab_url: raw.gitlab_url,
            log_level: raw.log_level,
            approvers_group: raw.approvers_group,
            approval_rules: raw.approval_rules,
            default,
            profiles,
        };
        document.validate()?;
        Ok(document)
    }

    /// Check cross-references between profiles and the rule catalogue
    pub fn validate(&self) -> Result<()> {
        for (profile, fields) in self.named_profiles() {
            let Some(value) = fields.get(APPROVAL_RULES_FIELD) else {
                continue;
            };
            let keys = value.as_list().ok_or_else(|| Error::FieldType {
                field: APPROVAL_RULES_FIELD.to_string(),
                expected: "list",
                found: value.kind_name().to_string(),
            })?;
            for key in keys {
                if !self.approval_rules.contains_key(key) {
                    return Err(Error::UnknownApprovalRule {
                        profile: profile.to_string(),
                        rule: key.clone(),
                    });
                }
            }
        }

        if self.manages_approval_rules() && self.approvers_group.is_none() {
            return Err(Error::MissingApproversGroup);
        }
        Ok(())
    }

    /// All profiles including `default`, in name order after `default`
    fn named_profiles(&self) -> impl Iterator<Item = (&str, &FieldSet)> {
        std::iter::once((DEFAULT_PROFILE, &self.default))
            .chain(self.profiles.iter().map(|(n, f)| (n.as_str(), f)))
    }

    pub fn default_profile(&self) -> &FieldSet {
        &self.default
    }

    /// A named profile, `None` when no profile carries that exact name
    pub fn profile(&self, name: &str) -> Option<&FieldSet> {
        if name == DEFAULT_PROFILE {
            return Some(&self.default);
        }
        self.profiles.get(name)
    }

    /// Whether any profile manages approval rules
    pub fn manages_approval_rules(&self) -> bool {
        self.named_profiles()
            .any(|(_, fields)| fields.contains(APPROVAL_RULES_FIELD))
    }

    pub fn approval_rule(&self, key: &str) -> Option<&ApprovalRuleConfig> {
        self.approval_rules.get(key)
    }

    pub fn gitlab_url(&self) -> Option<&str> {
        self.gitlab_url.as_deref()
    }

    pub fn log_level(&self) -> Option<&str> {
        self.log_level.as_deref()
    }

    pub fn approvers_group(&self) -> Option<&ResourceRef> {
        self.approvers_group.as_ref()
    }
}
