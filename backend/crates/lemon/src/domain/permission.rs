//! Permission Evaluation
//!
//! Decides whether a subject (possibly anonymous) may perform an action on a
//! resource. [`LemonPermissionEvaluator`] holds the default rules:
//!
//! | subject            | may                                                  |
//! |--------------------|------------------------------------------------------|
//! | good admin         | everything                                           |
//! | anonymous, blocked | `View` on public resources                           |
//! | owner              | `View`, `Edit`; `ChangePassword` on their own user   |
//! | anyone else        | `View` on public resources                           |
//!
//! `ChangeRoles` and `Delete` on users are therefore admin-only.

use crate::domain::entity::user::User;
use crate::domain::value_object::{
    UserId,
    role::{Role, Roles},
};

/// Who is asking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub user_id: UserId,
    pub roles: Roles,
}

impl Subject {
    pub fn new(user_id: UserId, roles: Roles) -> Self {
        Self { user_id, roles }
    }

    pub fn is_blocked(&self) -> bool {
        self.roles.contains(&Role::Blocked)
    }

    pub fn is_good_user(&self) -> bool {
        !self.is_blocked() && !self.roles.contains(&Role::Unverified)
    }

    pub fn is_good_admin(&self) -> bool {
        self.is_good_user() && self.roles.contains(&Role::Admin)
    }
}

impl From<&User> for Subject {
    fn from(user: &User) -> Self {
        Self::new(user.user_id, user.roles.clone())
    }
}

/// What is being accessed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// A user account; profiles are publicly viewable
    User(UserId),
    /// Any other entity owned by a user
    Owned { owner_id: UserId, public: bool },
}

impl Resource {
    pub fn owner_id(&self) -> UserId {
        match self {
            Resource::User(user_id) => *user_id,
            Resource::Owned { owner_id, .. } => *owner_id,
        }
    }

    pub fn is_public(&self) -> bool {
        match self {
            Resource::User(_) => true,
            Resource::Owned { public, .. } => *public,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    View,
    Edit,
    ChangePassword,
    ChangeRoles,
    Delete,
}

pub trait PermissionEvaluator: Send + Sync {
    fn has_permission(&self, subject: Option<&Subject>, resource: &Resource, action: Action)
    -> bool;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LemonPermissionEvaluator;

impl PermissionEvaluator for LemonPermissionEvaluator {
    fn has_permission(
        &self,
        subject: Option<&Subject>,
        resource: &Resource,
        action: Action,
    ) -> bool {
        let public_view = action == Action::View && resource.is_public();

        let Some(subject) = subject else {
            return public_view;
        };

        if subject.is_good_admin() {
            return true;
        }

        if subject.is_blocked() {
            return public_view;
        }

        if subject.user_id == resource.owner_id() {
            return match action {
                Action::View | Action::Edit => true,
                Action::ChangePassword => matches!(resource, Resource::User(_)),
                Action::ChangeRoles | Action::Delete => false,
            };
        }

        public_view
    }
}
