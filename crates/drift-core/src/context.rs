//! Per-run lookup tables shared by every project reconciliation
//!
//! Constructed once per run and passed by reference; nothing here is
//! process-wide.

use std::collections::HashMap;

use crate::client::ResourceClient;
use crate::config::ConfigDocument;
use crate::model::Member;
use crate::{Error, Result};

/// Members of the approvers group, indexed by id and by username
#[derive(Debug, Clone, Default)]
pub struct MemberDirectory {
    by_id: HashMap<u64, Member>,
    by_username: HashMap<String, u64>,
}

impl MemberDirectory {
    pub fn new(members: impl IntoIterator<Item = Member>) -> Self {
        let mut directory = Self::default();
        for member in members {
            directory
                .by_username
                .insert(member.username.clone(), member.id);
            directory.by_id.insert(member.id, member);
        }
        directory
    }

    /// Resolve a configured username, failing loudly when it is not a member
    pub fn id_for(&self, username: &str) -> Result<u64> {
        self.by_username
            .get(username)
            .copied()
            .ok_or_else(|| Error::UnknownApprover {
                username: username.to_string(),
            })
    }

    pub fn username_for(&self, id: u64) -> Option<&str> {
        self.by_id.get(&id).map(|m| m.username.as_str())
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Immutable context for one reconciliation run
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    members: Option<MemberDirectory>,
}

impl RunContext {
    /// Context without a member directory
    pub fn empty() -> Self {
        Self::default()
    }

    /// Context with an already-built member directory
    pub fn with_members(members: MemberDirectory) -> Self {
        Self {
            members: Some(members),
        }
    }

    /// Build the context for a run, fetching group members only when some
    /// profile manages approval rules
    pub fn build<C>(client: &C, config: &ConfigDocument) -> Result<Self>
    where
        C: ResourceClient + ?Sized,
    {
        if !config.manages_approval_rules() {
            return Ok(Self::empty());
        }

        let group = config.approvers_group().ok_or(Error::MissingApproversGroup)?;
        tracing::info!(%group, "Getting group members for approver lookup");
        let members = client.list_group_members(group).map_err(|e| {
            if e.is_not_found() {
                Error::GroupNotFound {
                    group: group.to_string(),
                }
            } else {
                e.into()
            }
        })?;
        tracing::debug!(count = members.len(), "Loaded approvers group members");

        Ok(Self::with_members(MemberDirectory::new(members)))
    }

    /// Member directory, required when approval rules are reconciled
    pub fn members(&self) -> Result<&MemberDirectory> {
        self.members.as_ref().ok_or(Error::MissingApproversGroup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> MemberDirectory {
        MemberDirectory::new(vec![
            Member {
                id: 1,
                username: "alice".to_string(),
            },
            Member {
                id: 2,
                username: "bob".to_string(),
            },
        ])
    }

    #[test]
    fn resolves_usernames_both_ways() {
        let members = directory();
        assert_eq!(members.id_for("bob").unwrap(), 2);
        assert_eq!(members.username_for(1), Some("alice"));
        assert_eq!(members.len(), 2);
    }

    #[test]
    fn unknown_username_fails_loudly() {
        let err = directory().id_for("mallory").unwrap_err();
        assert!(matches!(err, Error::UnknownApprover { username } if username == "mallory"));
    }

    #[test]
    fn empty_context_has_no_directory() {
        assert!(matches!(
            RunContext::empty().members(),
            Err(Error::MissingApproversGroup)
        ));
    }
}
