#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{kind} must be a uuid (got {value:?})")]
pub struct IdParseError {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! entity_id {
    ($name:ident, $kind:literal) => {
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub const KIND: &'static str = $kind;

            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(value: Uuid) -> Self {
                Self(value)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            pub fn parse(value: &str) -> Result<Self, IdParseError> {
                Uuid::parse_str(value.trim())
                    .map(Self)
                    .map_err(|_| IdParseError {
                        kind: $kind,
                        value: value.to_string(),
                    })
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0.hyphenated())
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdParseError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Self::parse(value)
            }
        }
    };
}

entity_id!(UserId, "user_id");
entity_id!(WorkspaceId, "workspace_id");
entity_id!(MembershipId, "membership_id");
entity_id!(ProjectId, "project_id");
entity_id!(StateId, "state_id");
entity_id!(IssueId, "issue_id");
entity_id!(DescriptionId, "description_id");
entity_id!(LabelId, "label_id");

impl UserId {
    /// Stable id for an identity that only carries an email address.
    pub fn from_email(email: &str) -> Self {
        let normalized = format!("mailto:{}", email.trim().to_lowercase());
        Self(Uuid::new_v5(&Uuid::NAMESPACE_URL, normalized.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_display() {
        let id = IssueId::generate();
        let parsed = IssueId::parse(&id.to_string()).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn parse_rejects_garbage_with_kind() {
        let err = ProjectId::parse("WEB-1").unwrap_err();
        assert_eq!(err.kind, "project_id");
        assert_eq!(err.value, "WEB-1");
    }

    #[test]
    fn email_ids_ignore_case_and_padding() {
        assert_eq!(
            UserId::from_email(" Ana@Example.com "),
            UserId::from_email("ana@example.com")
        );
        assert_ne!(
            UserId::from_email("ana@example.com"),
            UserId::from_email("bo@example.com")
        );
    }
}
