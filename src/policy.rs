use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// One of the seven decisions that make up a [`PermissionPolicy`].
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Permission {
    Comments,
    Copy,
    Accessibility,
    Edit,
    Fill,
    Print,
    Sign,
}

impl Permission {
    pub const ALL: [Permission; 7] = [
        Permission::Comments,
        Permission::Copy,
        Permission::Accessibility,
        Permission::Edit,
        Permission::Fill,
        Permission::Print,
        Permission::Sign,
    ];

    /// Field name used in diagnostics.
    pub fn field_name(self) -> &'static str {
        match self {
            Permission::Comments => "allow_comments",
            Permission::Copy => "allow_copy",
            Permission::Accessibility => "allow_accessibility",
            Permission::Edit => "allow_edit",
            Permission::Fill => "allow_fill",
            Permission::Print => "allow_print",
            Permission::Sign => "allow_sign",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Permission::Comments => "Comments/annotations",
            Permission::Copy => "Content copying",
            Permission::Accessibility => "Copy for accessibility",
            Permission::Edit => "Content editing",
            Permission::Fill => "Filling form fields",
            Permission::Print => "Printing",
            Permission::Sign => "Signing (approximated)",
        }
    }
}

impl FromStr for Permission {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "comments" | "comment" | "annotations" => Ok(Permission::Comments),
            "copy" => Ok(Permission::Copy),
            "accessibility" | "a11y" => Ok(Permission::Accessibility),
            "edit" | "modify" => Ok(Permission::Edit),
            "fill" | "forms" => Ok(Permission::Fill),
            "print" => Ok(Permission::Print),
            "sign" | "signing" => Ok(Permission::Sign),
            _ => Err(Error::UnknownPermission(s.to_string())),
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Permission::Comments => "comments",
            Permission::Copy => "copy",
            Permission::Accessibility => "accessibility",
            Permission::Edit => "edit",
            Permission::Fill => "fill",
            Permission::Print => "print",
            Permission::Sign => "sign",
        };
        f.write_str(name)
    }
}

/// The permission decision applied to a protected document.
///
/// Every field is always decided: the only ways to obtain a policy are the
/// constructors below, each of which supplies all seven values, and
/// [`PermissionPolicyBuilder::build`], which refuses to build while a field is
/// still open.
///
/// Signing has no permission bit of its own. Granting it grants both annotation
/// changes and form filling, which together let a reader fill a signature
/// field.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PermissionPolicy {
    allow_comments: bool,
    allow_copy: bool,
    allow_accessibility: bool,
    allow_edit: bool,
    allow_fill: bool,
    allow_print: bool,
    allow_sign: bool,
}

impl PermissionPolicy {
    pub fn builder() -> PermissionPolicyBuilder {
        PermissionPolicyBuilder::default()
    }

    /// Grants nothing. Encodes to an empty capability set and a zero mask.
    pub const fn deny_all() -> Self {
        PermissionPolicy {
            allow_comments: false,
            allow_copy: false,
            allow_accessibility: false,
            allow_edit: false,
            allow_fill: false,
            allow_print: false,
            allow_sign: false,
        }
    }

    pub const fn allow_all() -> Self {
        PermissionPolicy {
            allow_comments: true,
            allow_copy: true,
            allow_accessibility: true,
            allow_edit: true,
            allow_fill: true,
            allow_print: true,
            allow_sign: true,
        }
    }

    /// Returns a copy of this policy with one decision replaced.
    #[must_use]
    pub fn with(mut self, permission: Permission, allowed: bool) -> Self {
        *self.slot(permission) = allowed;
        self
    }

    pub fn allows(&self, permission: Permission) -> bool {
        match permission {
            Permission::Comments => self.allow_comments,
            Permission::Copy => self.allow_copy,
            Permission::Accessibility => self.allow_accessibility,
            Permission::Edit => self.allow_edit,
            Permission::Fill => self.allow_fill,
            Permission::Print => self.allow_print,
            Permission::Sign => self.allow_sign,
        }
    }

    pub fn allow_comments(&self) -> bool {
        self.allow_comments
    }

    pub fn allow_copy(&self) -> bool {
        self.allow_copy
    }

    pub fn allow_accessibility(&self) -> bool {
        self.allow_accessibility
    }

    pub fn allow_edit(&self) -> bool {
        self.allow_edit
    }

    pub fn allow_fill(&self) -> bool {
        self.allow_fill
    }

    pub fn allow_print(&self) -> bool {
        self.allow_print
    }

    pub fn allow_sign(&self) -> bool {
        self.allow_sign
    }

    /// Iterates over the granted permissions.
    pub fn granted(&self) -> impl Iterator<Item = Permission> + '_ {
        Permission::ALL.into_iter().filter(|p| self.allows(*p))
    }

    fn slot(&mut self, permission: Permission) -> &mut bool {
        match permission {
            Permission::Comments => &mut self.allow_comments,
            Permission::Copy => &mut self.allow_copy,
            Permission::Accessibility => &mut self.allow_accessibility,
            Permission::Edit => &mut self.allow_edit,
            Permission::Fill => &mut self.allow_fill,
            Permission::Print => &mut self.allow_print,
            Permission::Sign => &mut self.allow_sign,
        }
    }
}

impl Default for PermissionPolicy {
    /// Printing, form filling and accessibility extraction allowed; everything
    /// else denied.
    fn default() -> Self {
        PermissionPolicy {
            allow_comments: false,
            allow_copy: false,
            allow_accessibility: true,
            allow_edit: false,
            allow_fill: true,
            allow_print: true,
            allow_sign: false,
        }
    }
}

impl fmt::Display for PermissionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for permission in Permission::ALL {
            let state = if self.allows(permission) { "allowed" } else { "denied" };
            writeln!(f, "- {}: {}", permission.label(), state)?;
        }
        Ok(())
    }
}

/// Collects the seven decisions one by one.
#[derive(Clone, Debug, Default)]
pub struct PermissionPolicyBuilder {
    decisions: [Option<bool>; 7],
}

impl PermissionPolicyBuilder {
    /// Starts from an existing policy with every field already decided.
    pub fn from_policy(policy: PermissionPolicy) -> Self {
        let mut builder = Self::default();
        for permission in Permission::ALL {
            builder = builder.set(permission, policy.allows(permission));
        }
        builder
    }

    pub fn set(mut self, permission: Permission, allowed: bool) -> Self {
        self.decisions[Self::index(permission)] = Some(allowed);
        self
    }

    pub fn allow_comments(self, value: bool) -> Self {
        self.set(Permission::Comments, value)
    }

    pub fn allow_copy(self, value: bool) -> Self {
        self.set(Permission::Copy, value)
    }

    pub fn allow_accessibility(self, value: bool) -> Self {
        self.set(Permission::Accessibility, value)
    }

    pub fn allow_edit(self, value: bool) -> Self {
        self.set(Permission::Edit, value)
    }

    pub fn allow_fill(self, value: bool) -> Self {
        self.set(Permission::Fill, value)
    }

    pub fn allow_print(self, value: bool) -> Self {
        self.set(Permission::Print, value)
    }

    pub fn allow_sign(self, value: bool) -> Self {
        self.set(Permission::Sign, value)
    }

    /// Builds the policy, failing on the first permission left undecided.
    pub fn build(self) -> Result<PermissionPolicy> {
        let mut policy = PermissionPolicy::deny_all();
        for permission in Permission::ALL {
            match self.decisions[Self::index(permission)] {
                Some(allowed) => policy = policy.with(permission, allowed),
                None => return Err(Error::UndecidedPermission(permission.field_name())),
            }
        }
        Ok(policy)
    }

    fn index(permission: Permission) -> usize {
        permission as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_requires_every_field() {
        let err = PermissionPolicy::builder()
            .allow_comments(false)
            .allow_copy(true)
            .allow_accessibility(true)
            .allow_edit(false)
            .allow_fill(true)
            .allow_print(true)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::UndecidedPermission("allow_sign")));
    }

    #[test]
    fn builder_round_trips_policy() {
        let policy = PermissionPolicy::default().with(Permission::Sign, true);
        let rebuilt = PermissionPolicyBuilder::from_policy(policy).build().unwrap();
        assert_eq!(rebuilt, policy);
    }

    #[test]
    fn default_matches_interactive_defaults() {
        let policy = PermissionPolicy::default();
        let granted: Vec<_> = policy.granted().collect();
        assert_eq!(granted, vec![Permission::Accessibility, Permission::Fill, Permission::Print]);
    }

    #[test]
    fn with_does_not_touch_other_fields() {
        let policy = PermissionPolicy::deny_all().with(Permission::Copy, true);
        assert!(policy.allow_copy());
        assert_eq!(policy.granted().count(), 1);
        assert_eq!(policy.with(Permission::Copy, false), PermissionPolicy::deny_all());
    }

    #[test]
    fn parse_permission_names() {
        assert_eq!("Print".parse::<Permission>().unwrap(), Permission::Print);
        assert_eq!(" a11y ".parse::<Permission>().unwrap(), Permission::Accessibility);
        assert_eq!("annotations".parse::<Permission>().unwrap(), Permission::Comments);
        assert!(matches!("scan".parse::<Permission>(), Err(Error::UnknownPermission(_))));
    }

    #[test]
    fn summary_lists_every_permission() {
        let summary = PermissionPolicy::allow_all().with(Permission::Edit, false).to_string();
        assert_eq!(summary.lines().count(), 7);
        assert!(summary.contains("- Content editing: denied"));
        assert!(summary.contains("- Printing: allowed"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn policy_serializes_by_field_name() {
        let policy = PermissionPolicy::deny_all().with(Permission::Print, true);
        let json = serde_json::to_value(policy).unwrap();
        assert_eq!(json["allow_print"], true);
        assert_eq!(json["allow_sign"], false);
        let back: PermissionPolicy = serde_json::from_value(json).unwrap();
        assert_eq!(back, policy);
        assert_eq!(serde_json::to_string(&Permission::Comments).unwrap(), "\"comments\"");
    }
}
