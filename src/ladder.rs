//! The fallback ladder: encryption calls tried in order until one is accepted.
//!
//! ```text
//! named set:  NamedPermissions -> PositionalPermissions -> PasswordsOnly
//! bitmask:    PermissionMask   -> KeyStrength           -> PasswordsOnly
//! ```
//!
//! The first rung only hands over on a call shape mismatch; any other failure
//! there ends the climb. Later rungs hand over on every failure except one
//! caused by the passwords themselves. A credential failure always ends the
//! climb at once.

use log::{debug, warn};

use crate::bitmask::PermissionBits;
use crate::capability::CapabilitySet;
use crate::engine::{DocumentWriter, EncryptCall};
use crate::error::EngineError;
use crate::probe::EngineCapabilityShape;
use crate::{Error, Result};

/// Number of rungs on either ladder.
pub const RUNG_COUNT: usize = 3;

/// One step of a ladder, named after the call shape it attempts.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Rung {
    NamedPermissions,
    PositionalPermissions,
    PermissionMask,
    KeyStrength,
    PasswordsOnly,
}

impl Rung {
    pub fn of(call: &EncryptCall<'_>) -> Rung {
        match call {
            EncryptCall::NamedPermissions { .. } => Rung::NamedPermissions,
            EncryptCall::PositionalPermissions { .. } => Rung::PositionalPermissions,
            EncryptCall::PermissionMask { .. } => Rung::PermissionMask,
            EncryptCall::KeyStrength { .. } => Rung::KeyStrength,
            EncryptCall::PasswordsOnly { .. } => Rung::PasswordsOnly,
        }
    }

    /// Whether a successful call on this rung applied the permission policy.
    pub fn applies_permissions(self) -> bool {
        matches!(
            self,
            Rung::NamedPermissions | Rung::PositionalPermissions | Rung::PermissionMask
        )
    }

    /// The engine shape demonstrated by a successful call on this rung.
    pub fn effective_shape(self) -> EngineCapabilityShape {
        match self {
            Rung::NamedPermissions | Rung::PositionalPermissions => EngineCapabilityShape::NamedSetKeyword,
            Rung::PermissionMask => EngineCapabilityShape::BitmaskKeyword,
            Rung::KeyStrength => EngineCapabilityShape::BitmaskPositional,
            Rung::PasswordsOnly => EngineCapabilityShape::PasswordOnly,
        }
    }
}

#[derive(Clone, Debug)]
enum Payload {
    Named(CapabilitySet),
    Mask(PermissionBits),
}

/// The ordered encryption attempts for one encoded policy.
#[derive(Clone, Debug)]
pub struct Ladder {
    payload: Payload,
}

impl Ladder {
    /// Ladder for engines with a named vocabulary.
    pub fn named(permissions: CapabilitySet) -> Self {
        Ladder {
            payload: Payload::Named(permissions),
        }
    }

    /// Ladder for engines taking a legacy permission mask.
    pub fn bitmask(permissions: PermissionBits) -> Self {
        Ladder {
            payload: Payload::Mask(permissions),
        }
    }

    pub fn shape(&self) -> EngineCapabilityShape {
        match self.payload {
            Payload::Named(_) => EngineCapabilityShape::NamedSetKeyword,
            Payload::Mask(_) => EngineCapabilityShape::BitmaskKeyword,
        }
    }

    pub fn calls<'a>(&'a self, user_password: &'a str, owner_password: &'a str) -> [EncryptCall<'a>; RUNG_COUNT] {
        match &self.payload {
            Payload::Named(permissions) => [
                EncryptCall::NamedPermissions {
                    user_password,
                    owner_password,
                    permissions,
                },
                EncryptCall::PositionalPermissions {
                    user_password,
                    owner_password,
                    permissions,
                },
                EncryptCall::PasswordsOnly {
                    user_password,
                    owner_password,
                },
            ],
            Payload::Mask(permissions) => [
                EncryptCall::PermissionMask {
                    user_password,
                    owner_password,
                    use_128bit: true,
                    permissions: *permissions,
                },
                EncryptCall::KeyStrength {
                    user_password,
                    owner_password,
                    use_128bit: true,
                },
                EncryptCall::PasswordsOnly {
                    user_password,
                    owner_password,
                },
            ],
        }
    }

    /// Tries each rung once, in order, and returns the one that succeeded.
    ///
    /// A failure that ends the climb early is reported as
    /// [`Error::EncryptionExhausted`] with the number of attempts made.
    pub fn climb<W>(&self, writer: &mut W, user_password: &str, owner_password: &str) -> Result<Rung>
    where
        W: DocumentWriter + ?Sized,
    {
        let mut last_error = None;

        for (attempt, call) in self.calls(user_password, owner_password).iter().enumerate() {
            let rung = Rung::of(call);
            debug!("encryption attempt {}/{}: {call:?}", attempt + 1, RUNG_COUNT);

            match writer.encrypt(call) {
                Ok(()) => {
                    match rung {
                        Rung::KeyStrength => {
                            warn!("engine ignored the permission mask; passwords applied without restrictions")
                        }
                        Rung::PasswordsOnly => {
                            warn!("engine accepted passwords only; permission policy and key length not applied")
                        }
                        _ => {}
                    }
                    return Ok(rung);
                }
                Err(EngineError::Credential(reason)) => return Err(Error::Credential(reason)),
                Err(err) if attempt == 0 && !matches!(err, EngineError::SignatureMismatch(_)) => {
                    return Err(Error::EncryptionExhausted {
                        shape: self.shape(),
                        attempts: 1,
                        source: err,
                    });
                }
                Err(err) => {
                    debug!("{rung:?} rejected: {err}");
                    last_error = Some(err);
                }
            }
        }

        let source = last_error.unwrap_or_else(|| EngineError::SignatureMismatch("no call attempted".to_string()));
        Err(Error::EncryptionExhausted {
            shape: self.shape(),
            attempts: RUNG_COUNT,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityCode;
    use std::collections::VecDeque;
    use std::io::Write;

    /// Answers each encryption call with the next scripted result.
    #[derive(Default)]
    struct ScriptedWriter {
        answers: VecDeque<std::result::Result<(), EngineError>>,
        attempts: Vec<Rung>,
    }

    impl ScriptedWriter {
        fn answering<I>(answers: I) -> Self
        where
            I: IntoIterator<Item = std::result::Result<(), EngineError>>,
        {
            ScriptedWriter {
                answers: answers.into_iter().collect(),
                attempts: Vec::new(),
            }
        }
    }

    impl DocumentWriter for ScriptedWriter {
        type Page = ();

        fn add_page(&mut self, _page: ()) -> std::result::Result<(), EngineError> {
            Ok(())
        }

        fn page_count(&self) -> usize {
            0
        }

        fn encrypt(&mut self, call: &EncryptCall<'_>) -> std::result::Result<(), EngineError> {
            self.attempts.push(Rung::of(call));
            self.answers.pop_front().unwrap_or(Ok(()))
        }

        fn write(&mut self, _sink: &mut dyn Write) -> std::result::Result<(), EngineError> {
            Ok(())
        }
    }

    fn mismatch() -> std::result::Result<(), EngineError> {
        Err(EngineError::SignatureMismatch("unexpected argument".to_string()))
    }

    fn named_ladder() -> Ladder {
        Ladder::named([CapabilityCode::Print].into_iter().collect())
    }

    #[test]
    fn stops_at_first_success() {
        let mut writer = ScriptedWriter::answering([Ok(())]);
        let rung = named_ladder().climb(&mut writer, "", "owner").unwrap();
        assert_eq!(rung, Rung::NamedPermissions);
        assert_eq!(writer.attempts, vec![Rung::NamedPermissions]);
    }

    #[test]
    fn named_ladder_order() {
        let mut writer = ScriptedWriter::answering([mismatch(), mismatch(), Ok(())]);
        let rung = named_ladder().climb(&mut writer, "", "owner").unwrap();
        assert_eq!(rung, Rung::PasswordsOnly);
        assert_eq!(
            writer.attempts,
            vec![Rung::NamedPermissions, Rung::PositionalPermissions, Rung::PasswordsOnly]
        );
        assert!(!rung.applies_permissions());
    }

    #[test]
    fn bitmask_ladder_order() {
        let mut writer = ScriptedWriter::answering([mismatch(), Ok(())]);
        let rung = Ladder::bitmask(PermissionBits::PRINT)
            .climb(&mut writer, "user", "owner")
            .unwrap();
        assert_eq!(rung, Rung::KeyStrength);
        assert_eq!(rung.effective_shape(), EngineCapabilityShape::BitmaskPositional);
        assert_eq!(writer.attempts, vec![Rung::PermissionMask, Rung::KeyStrength]);
    }

    #[test]
    fn non_credential_failures_fall_through() {
        let mut writer = ScriptedWriter::answering([
            mismatch(),
            Err(EngineError::Encryption("filter unsupported".to_string())),
            Ok(()),
        ]);
        assert_eq!(named_ladder().climb(&mut writer, "", "owner").unwrap(), Rung::PasswordsOnly);
    }

    #[test]
    fn first_rung_only_falls_through_on_mismatch() {
        let mut writer = ScriptedWriter::answering([Err(EngineError::Encryption("filter unsupported".to_string()))]);
        let err = Ladder::bitmask(PermissionBits::PRINT)
            .climb(&mut writer, "", "owner")
            .unwrap_err();
        match err {
            Error::EncryptionExhausted { attempts, source, .. } => {
                assert_eq!(attempts, 1);
                assert!(matches!(source, EngineError::Encryption(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(writer.attempts, vec![Rung::PermissionMask]);
    }

    #[test]
    fn credential_error_is_not_retried() {
        let mut writer = ScriptedWriter::answering([
            mismatch(),
            Err(EngineError::Credential("owner password is empty".to_string())),
        ]);
        let err = named_ladder().climb(&mut writer, "", "").unwrap_err();
        assert!(matches!(err, Error::Credential(_)));
        assert_eq!(writer.attempts.len(), 2);
    }

    #[test]
    fn exhaustion_reports_last_cause() {
        let mut writer = ScriptedWriter::answering([
            mismatch(),
            mismatch(),
            Err(EngineError::Encryption("last".to_string())),
        ]);
        let err = Ladder::bitmask(PermissionBits::empty())
            .climb(&mut writer, "", "owner")
            .unwrap_err();
        match err {
            Error::EncryptionExhausted { shape, attempts, source } => {
                assert_eq!(shape, EngineCapabilityShape::BitmaskKeyword);
                assert_eq!(attempts, 3);
                assert!(matches!(source, EngineError::Encryption(ref reason) if reason == "last"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(writer.attempts.len(), 3);
    }

    #[test]
    fn empty_set_is_still_passed_to_the_engine() {
        let ladder = Ladder::named(CapabilitySet::new());
        let calls = ladder.calls("", "owner");
        assert!(matches!(calls[0], EncryptCall::NamedPermissions { permissions, .. } if permissions.is_empty()));
        assert!(calls[0].restricts_permissions());
    }
}
