//! Core types for the managed field registry

use crate::config::FieldValue;
use crate::model::{ProjectDetail, ProjectUpdate};
use crate::{Error, Result};

/// Shape a configured value must have for a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    /// Free text; `null` allowed when `nullable`
    Text { nullable: bool },
    /// One of a closed set of strings
    Enum(&'static [&'static str]),
    /// List of catalogue keys
    List,
    /// The configured value is not consulted
    Any,
}

impl ValueKind {
    /// Validate a configured value against this kind
    pub fn check(self, field: &str, value: &FieldValue) -> Result<()> {
        let mismatch = |expected: &'static str| Error::FieldType {
            field: field.to_string(),
            expected,
            found: value.kind_name().to_string(),
        };

        match (self, value) {
            (Self::Any, _) => Ok(()),
            (Self::Bool, FieldValue::Bool(_)) => Ok(()),
            (Self::Bool, _) => Err(mismatch("boolean")),
            (Self::Text { .. }, FieldValue::Text(_)) => Ok(()),
            (Self::Text { nullable: true }, FieldValue::Null) => Ok(()),
            (Self::Text { .. }, _) => Err(mismatch("string")),
            (Self::Enum(allowed), FieldValue::Text(s)) => {
                if allowed.contains(&s.as_str()) {
                    Ok(())
                } else {
                    Err(Error::InvalidFieldValue {
                        field: field.to_string(),
                        value: s.clone(),
                        allowed: allowed.join(", "),
                    })
                }
            }
            (Self::Enum(_), _) => Err(mismatch("string")),
            (Self::List, FieldValue::List(_)) => Ok(()),
            (Self::List, _) => Err(mismatch("list")),
        }
    }
}

/// A project attribute compared by strict equality and written in the
/// coalesced project save
#[derive(Debug, Clone, Copy)]
pub struct ScalarField {
    pub name: &'static str,
    pub kind: ValueKind,
    /// Extract the live value
    pub read: fn(&ProjectDetail) -> FieldValue,
    /// Stage the expected value into the project save batch
    pub write: fn(&mut ProjectUpdate, &FieldValue),
    /// Render the live value for the report given the expected value
    pub display: fn(&FieldValue, &FieldValue) -> String,
    /// Change records carry display text instead of raw values
    pub redacted: bool,
}

impl ScalarField {
    /// Whether the live value differs from the expected one
    pub fn drifted(&self, current: &FieldValue, expected: &FieldValue) -> bool {
        current != expected
    }
}

/// How a managed field is read, compared and written
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    Scalar(ScalarField),
    /// Forced to fast-forward on projects whose default branch is `main`
    MergeMethod,
    /// Merge access on the default branch's protection rule
    MergeAccessLevels,
    /// Push-rule secret detection, written in the push-rule save
    PreventSecrets,
    /// Presence and attributes of catalogue approval rules
    ApprovalRules,
}

impl FieldKind {
    /// Shape the configured value must have
    pub fn value_kind(&self) -> ValueKind {
        match self {
            Self::Scalar(field) => field.kind,
            Self::MergeMethod | Self::MergeAccessLevels => ValueKind::Any,
            Self::PreventSecrets => ValueKind::Bool,
            Self::ApprovalRules => ValueKind::List,
        }
    }
}

/// Outcome of looking up a configured field name
#[derive(Debug, Clone, Copy)]
pub enum FieldLookup<'a> {
    Managed(&'a FieldKind),
    /// Name is not known to the registry; the field is left alone
    Ignored,
}
