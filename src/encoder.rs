//! Translation of a [`PermissionPolicy`] into the two encodings engines accept.
//!
//! Both encodings apply the same seven rules independently per flag, so the
//! result never depends on the order the flags are looked at:
//!
//! | flag          | codes / bits                             |
//! |---------------|------------------------------------------|
//! | comments      | MODIFY_ANNOTATIONS                       |
//! | sign          | MODIFY_ANNOTATIONS, FILL_FORM            |
//! | copy          | COPY                                     |
//! | accessibility | ACCESSIBILITY                            |
//! | edit          | MODIFY_CONTENTS                          |
//! | fill          | FILL_FORM                                |
//! | print         | PRINT, PRINT_HIGH(_RES)                  |

use crate::bitmask::{BitLayout, PermissionBits};
use crate::capability::{CapabilityCode, CapabilitySet, Vocabulary};
use crate::policy::{Permission, PermissionPolicy};

fn codes_for(permission: Permission) -> &'static [CapabilityCode] {
    match permission {
        Permission::Comments => &[CapabilityCode::ModifyAnnotations],
        Permission::Sign => &[CapabilityCode::ModifyAnnotations, CapabilityCode::FillForm],
        Permission::Copy => &[CapabilityCode::Copy],
        Permission::Accessibility => &[CapabilityCode::Accessibility],
        Permission::Edit => &[CapabilityCode::ModifyContents],
        Permission::Fill => &[CapabilityCode::FillForm],
        Permission::Print => &[CapabilityCode::Print, CapabilityCode::PrintHighRes],
    }
}

fn bits_for(permission: Permission, layout: BitLayout) -> PermissionBits {
    match permission {
        Permission::Comments => PermissionBits::MODIFY_ANNOTATIONS,
        Permission::Sign => PermissionBits::MODIFY_ANNOTATIONS | PermissionBits::FILL_FORM,
        Permission::Copy => layout.copy_bit(),
        Permission::Accessibility => PermissionBits::ACCESSIBILITY,
        Permission::Edit => PermissionBits::MODIFY_CONTENTS,
        Permission::Fill => PermissionBits::FILL_FORM,
        Permission::Print => PermissionBits::PRINT | PermissionBits::PRINT_HIGH,
    }
}

/// Named capability set for `policy`.
///
/// Codes the vocabulary does not define are skipped. An all-denied policy
/// yields an empty set, which grants nothing.
pub fn to_capability_set(policy: &PermissionPolicy, vocabulary: &Vocabulary) -> CapabilitySet {
    policy
        .granted()
        .flat_map(|permission| codes_for(permission).iter().copied())
        .filter(|code| vocabulary.contains(*code))
        .collect()
}

/// Legacy permission mask for `policy`; zero when every flag is denied.
pub fn to_bitmask(policy: &PermissionPolicy, layout: BitLayout) -> PermissionBits {
    policy
        .granted()
        .fold(PermissionBits::empty(), |mask, permission| mask | bits_for(permission, layout))
}

impl PermissionPolicy {
    pub fn to_capability_set(&self, vocabulary: &Vocabulary) -> CapabilitySet {
        to_capability_set(self, vocabulary)
    }

    pub fn to_bitmask(&self, layout: BitLayout) -> PermissionBits {
        to_bitmask(self, layout)
    }
}
