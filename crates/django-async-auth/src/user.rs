//! User models.
//!
//! - [`AbstractUser`] - a stored user with identity, flags, groups and
//!   permissions
//! - [`RequestUser`] - the user making a request, which may be anonymous

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::permissions::{self, Group};

/// A user account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbstractUser {
    pub id: Option<i64>,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Inactive accounts hold no permissions.
    pub is_active: bool,
    pub is_staff: bool,
    /// Superusers hold every permission.
    pub is_superuser: bool,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub groups: Vec<Group>,
    /// Directly assigned `"app_label.codename"` permissions.
    pub user_permissions: Vec<String>,
}

impl Default for AbstractUser {
    fn default() -> Self {
        Self {
            id: None,
            username: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
            date_joined: Utc::now(),
            last_login: None,
            groups: Vec::new(),
            user_permissions: Vec::new(),
        }
    }
}

impl AbstractUser {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Self::default()
        }
    }

    /// Grants a permission directly.
    #[must_use]
    pub fn with_perm(mut self, perm: impl Into<String>) -> Self {
        self.user_permissions.push(perm.into());
        self
    }

    #[must_use]
    pub fn with_group(mut self, group: Group) -> Self {
        self.groups.push(group);
        self
    }

    pub fn get_username(&self) -> &str {
        &self.username
    }

    /// First and last name, trimmed.
    pub fn get_full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn get_short_name(&self) -> &str {
        &self.first_name
    }

    pub fn has_perm(&self, perm: &str) -> bool {
        permissions::has_perm(self, perm)
    }

    pub fn has_perms<S: AsRef<str>>(&self, perms: &[S]) -> bool {
        permissions::has_perms(self, perms)
    }

    pub fn has_module_perms(&self, app_label: &str) -> bool {
        permissions::has_module_perms(self, app_label)
    }
}

/// The user behind a request.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestUser {
    #[default]
    Anonymous,
    Authenticated(AbstractUser),
}

impl RequestUser {
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    pub const fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    /// The account, when authenticated.
    pub const fn user(&self) -> Option<&AbstractUser> {
        match self {
            Self::Authenticated(user) => Some(user),
            Self::Anonymous => None,
        }
    }

    /// The username, or an empty string for anonymous users.
    pub fn get_username(&self) -> &str {
        self.user().map_or("", AbstractUser::get_username)
    }

    pub fn has_perm(&self, perm: &str) -> bool {
        self.user().is_some_and(|u| u.has_perm(perm))
    }

    pub fn has_perms<S: AsRef<str>>(&self, perms: &[S]) -> bool {
        self.user().is_some_and(|u| u.has_perms(perms))
    }

    pub fn has_module_perms(&self, app_label: &str) -> bool {
        self.user().is_some_and(|u| u.has_module_perms(app_label))
    }
}

impl From<AbstractUser> for RequestUser {
    fn from(user: AbstractUser) -> Self {
        Self::Authenticated(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::Permission;

    #[test]
    fn test_user_defaults() {
        let user = AbstractUser::new("alice");
        assert_eq!(user.get_username(), "alice");
        assert!(user.is_active);
        assert!(!user.is_staff);
        assert!(!user.is_superuser);
        assert!(user.groups.is_empty());
    }

    #[test]
    fn test_full_name() {
        let mut user = AbstractUser::new("alice");
        assert_eq!(user.get_full_name(), "");
        user.first_name = "Alice".into();
        assert_eq!(user.get_full_name(), "Alice");
        user.last_name = "Liddell".into();
        assert_eq!(user.get_full_name(), "Alice Liddell");
        assert_eq!(user.get_short_name(), "Alice");
    }

    #[test]
    fn test_anonymous_user() {
        let user = RequestUser::Anonymous;
        assert!(!user.is_authenticated());
        assert!(user.is_anonymous());
        assert_eq!(user.get_username(), "");
        assert!(!user.has_perm("library.view_book"));
        assert!(!user.has_perms::<&str>(&[]));
    }

    #[test]
    fn test_authenticated_user_permissions() {
        let mut editors = Group::new("editors");
        editors.add_permission(Permission::new("library", "change_book", "Can change book"));
        let user: RequestUser = AbstractUser::new("bob")
            .with_perm("library.view_book")
            .with_group(editors)
            .into();

        assert!(user.is_authenticated());
        assert_eq!(user.get_username(), "bob");
        assert!(user.has_perms(&["library.view_book", "library.change_book"]));
        assert!(!user.has_perm("library.delete_book"));
        assert!(user.has_module_perms("library"));
    }
}
