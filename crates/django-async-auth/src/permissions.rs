//! Permissions and groups.
//!
//! Permissions are named `"app_label.codename"` (e.g. `"library.add_book"`).
//! A user holds permissions directly and through the groups it belongs to.
//! Superusers hold every permission; inactive users hold none.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::user::AbstractUser;

/// A single permission on one model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Permission {
    pub app_label: String,
    /// The machine-readable identifier (e.g. `add_book`).
    pub codename: String,
    /// The human-readable name (e.g. "Can add book").
    pub name: String,
}

impl Permission {
    pub fn new(
        app_label: impl Into<String>,
        codename: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            app_label: app_label.into(),
            codename: codename.into(),
            name: name.into(),
        }
    }

    /// The `"app_label.codename"` form checked by [`has_perm`].
    pub fn full_codename(&self) -> String {
        format!("{}.{}", self.app_label, self.codename)
    }
}

/// A named set of permissions shared by its members.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Group {
    pub name: String,
    pub permissions: Vec<Permission>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            permissions: Vec::new(),
        }
    }

    /// Adds `permission` unless the group already has it.
    pub fn add_permission(&mut self, permission: Permission) {
        if !self.permissions.contains(&permission) {
            self.permissions.push(permission);
        }
    }

    pub fn remove_permission(&mut self, full_codename: &str) {
        self.permissions
            .retain(|p| p.full_codename() != full_codename);
    }

    pub fn get_permissions(&self) -> HashSet<String> {
        self.permissions
            .iter()
            .map(Permission::full_codename)
            .collect()
    }
}

/// Checks one permission.
pub fn has_perm(user: &AbstractUser, perm: &str) -> bool {
    if !user.is_active {
        return false;
    }
    if user.is_superuser {
        return true;
    }
    get_all_permissions(user).contains(perm)
}

/// Checks that the user holds every permission in `perms`.
///
/// An empty list is trivially satisfied by any active user.
pub fn has_perms<S: AsRef<str>>(user: &AbstractUser, perms: &[S]) -> bool {
    if !user.is_active {
        return false;
    }
    if user.is_superuser {
        return true;
    }
    let all_perms = get_all_permissions(user);
    perms.iter().all(|p| all_perms.contains(p.as_ref()))
}

/// Checks for any permission within `app_label`.
pub fn has_module_perms(user: &AbstractUser, app_label: &str) -> bool {
    if !user.is_active {
        return false;
    }
    if user.is_superuser {
        return true;
    }
    let prefix = format!("{app_label}.");
    get_all_permissions(user)
        .iter()
        .any(|p| p.starts_with(&prefix))
}

/// Permissions granted through the user's groups.
pub fn get_group_permissions(user: &AbstractUser) -> HashSet<String> {
    user.groups
        .iter()
        .flat_map(Group::get_permissions)
        .collect()
}

/// Direct permissions plus group permissions.
pub fn get_all_permissions(user: &AbstractUser) -> HashSet<String> {
    let mut perms: HashSet<String> = user.user_permissions.iter().cloned().collect();
    perms.extend(get_group_permissions(user));
    perms
}

/// The add, change, delete and view permissions of a model.
pub fn default_permissions(app_label: &str, model_name: &str) -> Vec<Permission> {
    ["add", "change", "delete", "view"]
        .into_iter()
        .map(|action| {
            Permission::new(
                app_label,
                format!("{action}_{model_name}"),
                format!("Can {action} {model_name}"),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_perms(perms: &[&str]) -> AbstractUser {
        let mut user = AbstractUser::new("alice");
        user.user_permissions = perms.iter().map(ToString::to_string).collect();
        user
    }

    #[test]
    fn test_full_codename() {
        let perm = Permission::new("library", "add_book", "Can add book");
        assert_eq!(perm.full_codename(), "library.add_book");
    }

    #[test]
    fn test_group_add_and_remove() {
        let mut group = Group::new("editors");
        let perm = Permission::new("library", "change_book", "Can change book");
        group.add_permission(perm.clone());
        group.add_permission(perm);
        assert_eq!(group.permissions.len(), 1);
        assert!(group.get_permissions().contains("library.change_book"));

        group.remove_permission("library.change_book");
        assert!(group.permissions.is_empty());
    }

    #[test]
    fn test_direct_permissions() {
        let user = user_with_perms(&["library.add_book", "library.view_book"]);
        assert!(has_perm(&user, "library.add_book"));
        assert!(!has_perm(&user, "library.delete_book"));
        assert!(has_perms(&user, &["library.add_book", "library.view_book"]));
        assert!(!has_perms(&user, &["library.add_book", "library.delete_book"]));
        assert!(has_perms::<&str>(&user, &[]));
    }

    #[test]
    fn test_group_permissions_are_inherited() {
        let mut group = Group::new("editors");
        group.add_permission(Permission::new("library", "change_book", "Can change book"));
        let mut user = AbstractUser::new("bob");
        user.groups.push(group);

        assert!(has_perm(&user, "library.change_book"));
        assert!(has_module_perms(&user, "library"));
        assert!(!has_module_perms(&user, "shop"));
        assert_eq!(get_group_permissions(&user).len(), 1);
    }

    #[test]
    fn test_superuser_has_everything() {
        let mut user = AbstractUser::new("root");
        user.is_superuser = true;
        assert!(has_perm(&user, "anything.at_all"));
        assert!(has_perms(&user, &["a.b", "c.d"]));
        assert!(has_module_perms(&user, "shop"));
    }

    #[test]
    fn test_inactive_user_has_nothing() {
        let mut user = user_with_perms(&["library.add_book"]);
        user.is_superuser = true;
        user.is_active = false;
        assert!(!has_perm(&user, "library.add_book"));
        assert!(!has_perms::<&str>(&user, &[]));
        assert!(!has_module_perms(&user, "library"));
    }

    #[test]
    fn test_default_permissions() {
        let perms = default_permissions("library", "book");
        let names: Vec<String> = perms.iter().map(Permission::full_codename).collect();
        assert_eq!(
            names,
            [
                "library.add_book",
                "library.change_book",
                "library.delete_book",
                "library.view_book"
            ]
        );
        assert_eq!(perms[3].name, "Can view book");
    }
}
