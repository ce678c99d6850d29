//! Per-client state layered over the shared roster.
//!
//! The authoritative records belong to [`RosterSession`](crate::RosterSession); who is
//! signed in and how they filter and sort the table belong to each client.

use roster_core::{RecordField, SortSpec, ViewControls};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::{AuthError, Authenticator, Role};
use crate::session::Notice;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientContext {
    pub role: Role,
    pub auth_error: Option<String>,
    pub controls: ViewControls,
    /// Notice this client dismissed; hidden until the session raises a different one.
    #[serde(skip)]
    pub dismissed_notice: Option<Notice>,
}

impl ClientContext {
    /// Context already holding `role`, for callers that authenticated elsewhere.
    #[must_use]
    pub fn with_role(role: Role) -> Self {
        Self { role, ..Self::default() }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// A rejected attempt keeps the current role and records the failure message.
    ///
    /// # Errors
    /// Returns the authenticator's [`AuthError`] on mismatch.
    pub fn authenticate<A: Authenticator + ?Sized>(
        &mut self,
        authenticator: &A,
        username: &str,
        password: &str,
    ) -> Result<Role, AuthError> {
        match authenticator.authenticate(username, password) {
            Ok(role) => {
                info!(username, role = role.as_str(), "sign-in accepted");
                self.role = role;
                self.auth_error = None;
                Ok(role)
            }
            Err(err) => {
                warn!(username, "sign-in rejected");
                self.auth_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    pub fn logout(&mut self) {
        if self.is_admin() {
            info!("administrator signed out");
        }
        self.role = Role::Viewer;
        self.auth_error = None;
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.controls.search_term = term.into();
    }

    /// `None` restores the filter order.
    pub fn set_sort(&mut self, sort: Option<SortSpec>) {
        self.controls.sort = sort;
    }

    pub fn toggle_sort(&mut self, key: RecordField) -> SortSpec {
        let next = SortSpec::toggle(self.controls.sort, key);
        self.controls.sort = Some(next);
        next
    }

    pub fn dismiss(&mut self, notice: Option<&Notice>) {
        self.dismissed_notice = notice.cloned();
    }

    /// The notice this client should see, if any.
    #[must_use]
    pub fn visible_notice<'a>(&self, notice: Option<&'a Notice>) -> Option<&'a Notice> {
        notice.filter(|current| self.dismissed_notice.as_ref() != Some(*current))
    }
}
