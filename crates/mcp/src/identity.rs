#![forbid(unsafe_code)]

use pb_core::ids::UserId;
use serde::Serialize;

/// The signed-in user as the identity provider reports it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub(crate) struct AuthUser {
    /// Set only when the provider vouches for a specific id.
    pub(crate) id: Option<UserId>,
    pub(crate) email: String,
    pub(crate) display_name: Option<String>,
}

impl AuthUser {
    /// Without an explicit id the store matches the user by email.
    pub(crate) fn new(email: &str, id: Option<UserId>, display_name: Option<String>) -> Self {
        Self {
            id,
            email: email.trim().to_string(),
            display_name: display_name
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty()),
        }
    }
}

pub(crate) trait Identity {
    fn current_user(&self) -> Option<AuthUser>;
}

#[derive(Clone, Debug, Default)]
pub(crate) struct StaticIdentity {
    user: Option<AuthUser>,
}

impl StaticIdentity {
    pub(crate) fn new(user: Option<AuthUser>) -> Self {
        Self { user }
    }
}

impl Identity for StaticIdentity {
    fn current_user(&self) -> Option<AuthUser> {
        self.user.clone()
    }
}
