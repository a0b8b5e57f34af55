//! Route gate for views that require a signed-in user.

use std::fmt;

use chargebnb_core::Identity;

/// Fixed text rendered in place of a protected view for anonymous users.
pub const LOGIN_REQUIRED_MESSAGE: &str = "You must be logged in to view this page.";

/// Outcome of gating a view on the current identity.
#[derive(Debug, Clone, PartialEq)]
pub enum Gated<V> {
    Allowed(V),
    LoginRequired,
}

impl<V> Gated<V> {
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Gated::Allowed(_))
    }

    /// Returns the protected view, or `None` when the fallback was produced.
    pub fn into_view(self) -> Option<V> {
        match self {
            Gated::Allowed(view) => Some(view),
            Gated::LoginRequired => None,
        }
    }
}

impl<V: fmt::Display> fmt::Display for Gated<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gated::Allowed(view) => view.fmt(f),
            Gated::LoginRequired => f.write_str(LOGIN_REQUIRED_MESSAGE),
        }
    }
}

/// Gates `view` on `identity`.
///
/// Pure: no redirect, no side effect. The view is passed through unchanged
/// when an identity is present.
pub fn require_identity<V>(identity: Option<&Identity>, view: V) -> Gated<V> {
    match identity {
        Some(_) => Gated::Allowed(view),
        None => Gated::LoginRequired,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_gets_fallback() {
        let gated = require_identity(None, "Protected Content");
        assert_eq!(gated, Gated::LoginRequired);
        assert_eq!(gated.to_string(), LOGIN_REQUIRED_MESSAGE);
    }

    #[test]
    fn signed_in_user_sees_view_unchanged() {
        let user = Identity::new("Test User");
        let gated = require_identity(Some(&user), "Protected Content");
        assert!(gated.is_allowed());
        assert_eq!(gated.to_string(), "Protected Content");
        assert_eq!(gated.into_view(), Some("Protected Content"));
    }
}
