#![cfg(feature = "lopdf-engine")]

use lopdf::{Document, Permissions};
use pdfprotect::{
    BitLayout, EncryptionStrength, EngineCapabilityShape, Error, LopdfEngine, Permission, PermissionPolicy, ProtectOptions,
    Protector, Rung, is_valid_pdf, protect_document,
};

mod utils;

#[test]
fn pages_survive_in_order() {
    utils::init_logging();
    let dir = tempfile::tempdir().unwrap();
    let source = utils::save_document(&mut utils::generate_document(3), dir.path(), "report.pdf");
    let destination = dir.path().join("protected_report.pdf");

    let options = ProtectOptions::builder().compress(false).build();
    let protector = Protector::new(LopdfEngine::new(options));
    let report = protector
        .protect(&source, &destination, "", "owner-secret", &PermissionPolicy::default())
        .unwrap();
    assert_eq!(report.page_count, 3);
    assert_eq!(report.rung, Rung::NamedPermissions);
    assert_eq!(report.probed_shape, EngineCapabilityShape::NamedSetKeyword);
    assert!(report.permissions_applied());
    assert_eq!(report.bytes_written as u64, std::fs::metadata(&destination).unwrap().len());

    let doc = Document::load(&destination).unwrap();
    assert_eq!(doc.get_pages().len(), 3);
    assert_eq!(utils::page_texts(&doc), vec!["Page 1", "Page 2", "Page 3"]);
}

#[test]
fn output_is_encrypted_with_requested_permissions() {
    let dir = tempfile::tempdir().unwrap();
    let source = utils::save_document(&mut utils::generate_document(1), dir.path(), "in.pdf");
    let destination = dir.path().join("out.pdf");

    let policy = PermissionPolicy::deny_all().with(Permission::Print, true);
    protect_document(&source, &destination, "", "owner-secret", &policy).unwrap();

    let raw = std::fs::read(&destination).unwrap();
    assert!(raw.windows(b"/Encrypt".len()).any(|window| window == b"/Encrypt"));

    let doc = Document::load(&destination).unwrap();
    let state = doc.encryption_state.as_ref().expect("encryption state");
    assert!(state.permissions().contains(Permissions::PRINTABLE));
    assert!(state.permissions().contains(Permissions::PRINTABLE_IN_HIGH_QUALITY));
    assert!(!state.permissions().contains(Permissions::COPYABLE));
    assert!(!state.permissions().contains(Permissions::MODIFIABLE));
    assert!(!state.permissions().contains(Permissions::ANNOTABLE));
}

#[test]
fn bitmask_engine_applies_permissions() {
    let dir = tempfile::tempdir().unwrap();
    let source = utils::save_document(&mut utils::generate_document(2), dir.path(), "in.pdf");
    let destination = dir.path().join("out.pdf");

    let protector = Protector::new(LopdfEngine::default().without_vocabulary());
    let policy = PermissionPolicy::deny_all().with(Permission::Copy, true);
    let report = protector.protect(&source, &destination, "", "owner-secret", &policy).unwrap();
    assert_eq!(report.probed_shape, EngineCapabilityShape::BitmaskKeyword);
    assert_eq!(report.rung, Rung::PermissionMask);

    let doc = Document::load(&destination).unwrap();
    assert_eq!(doc.get_pages().len(), 2);
    let state = doc.encryption_state.as_ref().expect("encryption state");
    assert!(state.permissions().contains(Permissions::COPYABLE));
    assert!(!state.permissions().contains(Permissions::PRINTABLE));
}

#[test]
fn aliased_layout_moves_copy_onto_annotations() {
    let dir = tempfile::tempdir().unwrap();
    let source = utils::save_document(&mut utils::generate_document(1), dir.path(), "in.pdf");
    let policy = PermissionPolicy::deny_all().with(Permission::Copy, true);

    let destination = dir.path().join("aliased.pdf");
    let options = ProtectOptions::builder().bit_layout(BitLayout::AnnotationAliased).build();
    let report = Protector::new(LopdfEngine::new(options).without_vocabulary())
        .protect(&source, &destination, "", "owner-secret", &policy)
        .unwrap();
    assert_eq!(report.rung, Rung::PermissionMask);
    let doc = Document::load(&destination).unwrap();
    let state = doc.encryption_state.as_ref().expect("encryption state");
    assert!(state.permissions().contains(Permissions::ANNOTABLE));
    assert!(!state.permissions().contains(Permissions::COPYABLE));

    let destination = dir.path().join("overridden.pdf");
    let options = ProtectOptions::builder().bit_layout(BitLayout::AnnotationAliased).build();
    Protector::new(LopdfEngine::new(options).without_vocabulary())
        .with_bit_layout(BitLayout::Standard)
        .protect(&source, &destination, "", "owner-secret", &policy)
        .unwrap();
    let doc = Document::load(&destination).unwrap();
    let state = doc.encryption_state.as_ref().expect("encryption state");
    assert!(state.permissions().contains(Permissions::COPYABLE));
    assert!(!state.permissions().contains(Permissions::ANNOTABLE));
}

#[test]
fn user_password_is_required_to_open() {
    let dir = tempfile::tempdir().unwrap();
    let source = utils::save_document(&mut utils::generate_document(1), dir.path(), "in.pdf");
    let destination = dir.path().join("out.pdf");

    protect_document(&source, &destination, "open-me", "owner-secret", &PermissionPolicy::default()).unwrap();
    assert!(is_valid_pdf(&source));
    assert!(!is_valid_pdf(&destination));
}

#[test]
fn every_strength_produces_a_readable_file() {
    let dir = tempfile::tempdir().unwrap();
    let source = utils::save_document(&mut utils::generate_document(2), dir.path(), "in.pdf");

    for strength in [
        EncryptionStrength::Rc4_40,
        EncryptionStrength::Rc4_128,
        EncryptionStrength::Aes128,
        EncryptionStrength::Aes256,
    ] {
        let destination = dir.path().join(format!("out-{strength}.pdf"));
        let options = ProtectOptions::builder().strength(strength).build();
        Protector::new(LopdfEngine::new(options))
            .protect(&source, &destination, "", "owner-secret", &PermissionPolicy::default())
            .unwrap();
        let doc = Document::load(&destination).unwrap();
        assert_eq!(doc.get_pages().len(), 2, "{strength}");
    }
}

#[test]
fn empty_owner_password_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let source = utils::save_document(&mut utils::generate_document(1), dir.path(), "in.pdf");
    let destination = dir.path().join("out.pdf");

    let err = protect_document(&source, &destination, "", "", &PermissionPolicy::default()).unwrap_err();
    assert!(matches!(err, Error::Credential(_)), "{err:?}");
    assert!(!destination.exists());
}

#[test]
fn existing_destination_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let source = utils::save_document(&mut utils::generate_document(1), dir.path(), "in.pdf");
    let destination = dir.path().join("out.pdf");
    std::fs::write(&destination, b"stale").unwrap();

    protect_document(&source, &destination, "", "owner-secret", &PermissionPolicy::default()).unwrap();
    assert!(std::fs::read(&destination).unwrap().starts_with(b"%PDF-"));
}

#[test]
fn text_file_is_not_a_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.pdf");
    std::fs::write(&path, "just some text\n").unwrap();
    assert!(!is_valid_pdf(&path));

    let destination = dir.path().join("out.pdf");
    let err = protect_document(&path, &destination, "", "owner-secret", &PermissionPolicy::default()).unwrap_err();
    assert!(matches!(err, Error::UnreadableDocument { .. }), "{err:?}");
    assert!(!destination.exists());
}

#[test]
fn missing_file_is_not_a_pdf() {
    let dir = tempfile::tempdir().unwrap();
    assert!(!is_valid_pdf(dir.path().join("absent.pdf")));
}
