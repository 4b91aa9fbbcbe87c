use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub type MemberId = Uuid;
pub type GroupId = Uuid;

/// A person taking part in a group's expenses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    pub email: String,
}

impl Member {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
        }
    }

    /// Parse the `"Name <email>"` form used on the command line.
    /// A bare email is accepted too; the part before '@' becomes the name.
    pub fn parse_contact(input: &str) -> Option<Self> {
        let input = input.trim();
        match (input.find('<'), input.rfind('>')) {
            (Some(open), Some(close)) if open < close => {
                let name = input[..open].trim();
                let email = input[open + 1..close].trim();
                if name.is_empty() || !email.contains('@') {
                    return None;
                }
                Some(Member::new(name, email))
            }
            (None, None) if input.contains('@') => {
                let name = input.split('@').next().unwrap_or(input);
                if name.is_empty() {
                    return None;
                }
                Some(Member::new(name, input))
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for Member {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GroupViolation {
    #[error("group name is empty")]
    EmptyName,

    #[error("a group needs at least one member")]
    NoMembers,

    #[error("group creator {0} is not one of the members")]
    CreatorNotMember(MemberId),

    #[error("member {0} is listed more than once")]
    DuplicateMember(String),
}

/// A set of members sharing expenses. Members are fixed at creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub created_by: MemberId,
    /// Members in the order they were added; the order drives the
    /// interactive split flow and the equal-split remainder.
    pub members: Vec<Member>,
    pub created_at: DateTime<Utc>,
}

impl Group {
    pub fn new(
        name: impl Into<String>,
        created_by: MemberId,
        members: Vec<Member>,
    ) -> Result<Self, GroupViolation> {
        let group = Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_by,
            members,
            created_at: Utc::now(),
        };
        group.validate()?;
        Ok(group)
    }

    pub fn validate(&self) -> Result<(), GroupViolation> {
        if self.name.trim().is_empty() {
            return Err(GroupViolation::EmptyName);
        }
        if self.members.is_empty() {
            return Err(GroupViolation::NoMembers);
        }
        if !self.is_member(self.created_by) {
            return Err(GroupViolation::CreatorNotMember(self.created_by));
        }

        let mut ids = HashSet::new();
        let mut emails = HashSet::new();
        for member in &self.members {
            if !ids.insert(member.id) || !emails.insert(email_key(&member.email)) {
                return Err(GroupViolation::DuplicateMember(member.email.clone()));
            }
        }
        Ok(())
    }

    pub fn is_member(&self, id: MemberId) -> bool {
        self.members.iter().any(|m| m.id == id)
    }

    pub fn member(&self, id: MemberId) -> Option<&Member> {
        self.members.iter().find(|m| m.id == id)
    }

    /// Look a member up by email (case-insensitive).
    pub fn member_by_email(&self, email: &str) -> Option<&Member> {
        let key = email_key(email);
        self.members.iter().find(|m| email_key(&m.email) == key)
    }

    pub fn creator(&self) -> Option<&Member> {
        self.member(self.created_by)
    }
}

/// Case-folded form used to compare emails, so lookups and duplicate
/// detection agree.
fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Member {
        Member::new("Alice", "alice@example.com")
    }

    fn bob() -> Member {
        Member::new("Bob", "bob@example.com")
    }

    #[test]
    fn test_create_group() {
        let a = alice();
        let group = Group::new("Trip", a.id, vec![a.clone(), bob()]).unwrap();

        assert_eq!(group.members.len(), 2);
        assert_eq!(group.creator(), Some(&a));
        assert!(group.member_by_email("ALICE@example.com").is_some());
    }

    #[test]
    fn test_creator_must_be_member() {
        let a = alice();
        let result = Group::new("Trip", a.id, vec![bob()]);
        assert_eq!(result.unwrap_err(), GroupViolation::CreatorNotMember(a.id));
    }

    #[test]
    fn test_rejects_empty_and_duplicates() {
        let a = alice();
        assert_eq!(
            Group::new("Trip", a.id, vec![]).unwrap_err(),
            GroupViolation::NoMembers
        );
        assert_eq!(
            Group::new("  ", a.id, vec![a.clone()]).unwrap_err(),
            GroupViolation::EmptyName
        );

        let twin = Member::new("Alice again", "Alice@Example.com");
        assert!(matches!(
            Group::new("Trip", a.id, vec![a, twin]),
            Err(GroupViolation::DuplicateMember(_))
        ));
    }

    #[test]
    fn test_email_matching_is_consistent_beyond_ascii() {
        let a = Member::new("Élodie", "élodie@example.com");
        let group = Group::new("Paris", a.id, vec![a.clone(), bob()]).unwrap();

        assert_eq!(group.member_by_email("ÉLODIE@example.com"), Some(&a));
        assert_eq!(group.member_by_email(" Élodie@Example.com "), Some(&a));

        let twin = Member::new("Elodie again", "ÉLODIE@EXAMPLE.COM");
        assert_eq!(
            Group::new("Paris", a.id, vec![a, twin]).unwrap_err(),
            GroupViolation::DuplicateMember("ÉLODIE@EXAMPLE.COM".to_string())
        );
    }

    #[test]
    fn test_parse_contact() {
        let m = Member::parse_contact("Carol Smith <carol@example.com>").unwrap();
        assert_eq!(m.name, "Carol Smith");
        assert_eq!(m.email, "carol@example.com");

        let m = Member::parse_contact("dave@example.com").unwrap();
        assert_eq!(m.name, "dave");

        assert!(Member::parse_contact("no email here").is_none());
        assert!(Member::parse_contact("<x@example.com>").is_none());
    }
}
