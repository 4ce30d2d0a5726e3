use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Write};
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use log::{debug, warn};
use lopdf::encryption::crypt_filters::{Aes128CryptFilter, Aes256CryptFilter, CryptFilter};
use lopdf::{
    Dictionary, Document, EncryptionState, EncryptionVersion, Object, ObjectId, Permissions, StringFormat, dictionary,
};

use super::{DocumentWriter, EncryptCall, PdfEngine, SourceDocument};
use crate::bitmask::{BitLayout, PermissionBits};
use crate::capability::{CapabilityCode, CapabilitySet, Vocabulary};
use crate::error::EngineError;
use crate::options::{EncryptionStrength, ProtectOptions};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE_ATTRIBUTES: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Catalog entries carried over to the protected document.
const CARRIED_CATALOG_ENTRIES: [&[u8]; 5] = [b"AcroForm", b"Lang", b"MarkInfo", b"ViewerPreferences", b"PageLayout"];

const MAX_TREE_DEPTH: usize = 64;

/// Longest password accepted by the AES-256 handler, in bytes.
const MAX_AES256_PASSWORD_LEN: usize = 127;

const CODE_PERMISSIONS: [(CapabilityCode, Permissions); 8] = [
    (CapabilityCode::Print, Permissions::PRINTABLE),
    (CapabilityCode::PrintHighRes, Permissions::PRINTABLE_IN_HIGH_QUALITY),
    (CapabilityCode::ModifyContents, Permissions::MODIFIABLE),
    (CapabilityCode::ModifyAnnotations, Permissions::ANNOTABLE),
    (CapabilityCode::Copy, Permissions::COPYABLE),
    (CapabilityCode::Accessibility, Permissions::COPYABLE_FOR_ACCESSIBILITY),
    (CapabilityCode::FillForm, Permissions::FILLABLE),
    (CapabilityCode::Assemble, Permissions::ASSEMBLABLE),
];

const BIT_PERMISSIONS: [(PermissionBits, Permissions); 8] = [
    (PermissionBits::PRINT, Permissions::PRINTABLE),
    (PermissionBits::PRINT_HIGH, Permissions::PRINTABLE_IN_HIGH_QUALITY),
    (PermissionBits::MODIFY_CONTENTS, Permissions::MODIFIABLE),
    (PermissionBits::MODIFY_ANNOTATIONS, Permissions::ANNOTABLE),
    (PermissionBits::COPY, Permissions::COPYABLE),
    (PermissionBits::ACCESSIBILITY, Permissions::COPYABLE_FOR_ACCESSIBILITY),
    (PermissionBits::FILL_FORM, Permissions::FILLABLE),
    (PermissionBits::ASSEMBLE, Permissions::ASSEMBLABLE),
];

/// Engine backed by the `lopdf` crate.
///
/// lopdf names its permissions (`Permissions::PRINTABLE`, ...), so by default
/// the engine reports a complete vocabulary. [`LopdfEngine::without_vocabulary`]
/// hides it, which makes callers fall back to the legacy permission mask.
#[derive(Clone, Debug)]
pub struct LopdfEngine {
    options: ProtectOptions,
    vocabulary: Option<Vocabulary>,
}

impl LopdfEngine {
    pub fn new(options: ProtectOptions) -> Self {
        LopdfEngine {
            options,
            vocabulary: Some(Vocabulary::complete()),
        }
    }

    pub fn without_vocabulary(mut self) -> Self {
        self.vocabulary = None;
        self
    }

    pub fn options(&self) -> &ProtectOptions {
        &self.options
    }
}

impl Default for LopdfEngine {
    fn default() -> Self {
        Self::new(ProtectOptions::default())
    }
}

impl PdfEngine for LopdfEngine {
    type Source = LopdfSource;
    type Writer = LopdfWriter;

    fn name(&self) -> &str {
        "lopdf"
    }

    fn vocabulary(&self) -> Option<&Vocabulary> {
        self.vocabulary.as_ref()
    }

    fn bit_layout(&self) -> BitLayout {
        self.options.bit_layout
    }

    fn open(&self, path: &Path) -> Result<LopdfSource, EngineError> {
        let document = Document::load(path)?;
        // lopdf decrypts documents that open with an empty user password.
        if document.is_encrypted() {
            return Err(EngineError::Unreadable("the document requires a password to open".to_string()));
        }
        let pages = document.get_pages().into_values().collect();
        Ok(LopdfSource {
            document: Rc::new(document),
            pages,
        })
    }

    fn create_writer(&self, source: &LopdfSource) -> LopdfWriter {
        LopdfWriter::new(&source.document, self.options.clone())
    }
}

/// A document loaded with lopdf.
pub struct LopdfSource {
    document: Rc<Document>,
    pages: Vec<ObjectId>,
}

impl LopdfSource {
    pub fn document(&self) -> &Document {
        &self.document
    }
}

impl SourceDocument for LopdfSource {
    type Page = LopdfPage;

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page(&self, index: usize) -> Result<LopdfPage, EngineError> {
        let id = *self
            .pages
            .get(index)
            .ok_or_else(|| EngineError::Unreadable(format!("page {} does not exist", index + 1)))?;
        let dict = self.document.get_dictionary(id)?;
        if !dict.has_type(b"Page") {
            return Err(EngineError::Unreadable(format!(
                "object {} {} is not a page",
                id.0, id.1
            )));
        }
        Ok(LopdfPage {
            document: Rc::clone(&self.document),
            id,
        })
    }
}

/// A page of a [`LopdfSource`].
#[derive(Clone)]
pub struct LopdfPage {
    document: Rc<Document>,
    id: ObjectId,
}

impl LopdfPage {
    pub fn id(&self) -> ObjectId {
        self.id
    }
}

/// Builds the protected copy of a lopdf document.
///
/// Pages keep their object ids. Each added page brings along every object it
/// references; the page tree and catalog are rebuilt when the writer is
/// sealed, which happens on the first encryption attempt or write.
pub struct LopdfWriter {
    document: Document,
    source: Rc<Document>,
    pages: Vec<ObjectId>,
    imported: BTreeSet<ObjectId>,
    options: ProtectOptions,
    sealed: bool,
    encrypted: bool,
}

impl LopdfWriter {
    fn new(source: &Rc<Document>, options: ProtectOptions) -> Self {
        let mut document = Document::with_version(source.version.clone());
        // Copied objects keep their ids, so new ids start past the source's.
        document.max_id = source.max_id;
        LopdfWriter {
            document,
            source: Rc::clone(source),
            pages: Vec::new(),
            imported: BTreeSet::new(),
            options,
            sealed: false,
            encrypted: false,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    fn import_references(&mut self, object: &Object) {
        let source = Rc::clone(&self.source);
        let mut pending = Vec::new();
        collect_references(object, &mut pending);

        while let Some(id) = pending.pop() {
            if !self.imported.insert(id) {
                continue;
            }
            match source.get_object(id) {
                // The page tree and catalog are rebuilt, never copied.
                Ok(object) if object.type_name().map(|name| name == b"Pages" || name == b"Catalog").unwrap_or(false) => {}
                Ok(object) => {
                    collect_references(object, &mut pending);
                    self.document.objects.insert(id, object.clone());
                }
                Err(err) => warn!("skipping unresolvable reference {} {}: {}", id.0, id.1, err),
            }
        }
    }

    fn seal(&mut self) {
        if self.sealed {
            return;
        }
        let source = Rc::clone(&self.source);

        let pages_id = self.document.new_object_id();
        for id in &self.pages {
            if let Some(Object::Dictionary(page)) = self.document.objects.get_mut(id) {
                page.set("Parent", pages_id);
            }
        }
        let kids: Vec<Object> = self.pages.iter().map(|id| Object::Reference(*id)).collect();
        self.document.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => self.pages.len() as i64,
            }),
        );

        let mut catalog = dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        };
        if let Some(source_catalog) = catalog_of(&source) {
            for key in CARRIED_CATALOG_ENTRIES {
                if let Ok(value) = source_catalog.get(key) {
                    self.import_references(value);
                    catalog.set(key, value.clone());
                }
            }
        }
        let catalog_id = self.document.add_object(catalog);
        self.document.trailer.set("Root", catalog_id);

        if let Ok(info) = source.trailer.get(b"Info") {
            self.import_references(info);
            self.document.trailer.set("Info", info.clone());
        }
        self.document.trailer.set("ID", file_identifier(&source));

        if self.options.compress {
            self.document.compress();
        }
        debug!(
            "sealed protected document: {} pages, {} objects",
            self.pages.len(),
            self.document.objects.len()
        );
        self.sealed = true;
    }

    fn encryption_state(
        &self, document: &Document, strength: EncryptionStrength, user_password: &str, owner_password: &str,
        permissions: Permissions,
    ) -> Result<EncryptionState, EngineError> {
        let version = match strength {
            EncryptionStrength::Rc4_40 => EncryptionVersion::V1 {
                document,
                owner_password,
                user_password,
                permissions,
            },
            EncryptionStrength::Rc4_128 => EncryptionVersion::V2 {
                document,
                owner_password,
                user_password,
                key_length: 128,
                permissions,
            },
            EncryptionStrength::Aes128 => {
                let crypt_filter: Arc<dyn CryptFilter> = Arc::new(Aes128CryptFilter);
                EncryptionVersion::V4 {
                    document,
                    encrypt_metadata: true,
                    crypt_filters: BTreeMap::from([(b"StdCF".to_vec(), crypt_filter)]),
                    stream_filter: b"StdCF".to_vec(),
                    string_filter: b"StdCF".to_vec(),
                    owner_password,
                    user_password,
                    permissions,
                }
            }
            EncryptionStrength::Aes256 => {
                let crypt_filter: Arc<dyn CryptFilter> = Arc::new(Aes256CryptFilter);
                let file_encryption_key: [u8; 32] = rand::random();
                let version = EncryptionVersion::V5 {
                    encrypt_metadata: true,
                    crypt_filters: BTreeMap::from([(b"StdCF".to_vec(), crypt_filter)]),
                    file_encryption_key: &file_encryption_key,
                    stream_filter: b"StdCF".to_vec(),
                    string_filter: b"StdCF".to_vec(),
                    owner_password,
                    user_password,
                    permissions,
                };
                return EncryptionState::try_from(version).map_err(|err| EngineError::Encryption(err.to_string()));
            }
        };
        EncryptionState::try_from(version).map_err(|err| EngineError::Encryption(err.to_string()))
    }
}

impl DocumentWriter for LopdfWriter {
    type Page = LopdfPage;

    fn add_page(&mut self, page: LopdfPage) -> Result<(), EngineError> {
        if self.sealed {
            return Err(EngineError::Encryption("pages cannot be added once the document is sealed".to_string()));
        }
        if !Rc::ptr_eq(&self.source, &page.document) {
            return Err(EngineError::Unreadable("page belongs to a different document".to_string()));
        }

        let mut dict = self.source.get_dictionary(page.id)?.clone();
        for key in INHERITABLE_ATTRIBUTES {
            if !dict.has(key) {
                if let Some(value) = inherited_attribute(&self.source, &dict, key) {
                    dict.set(key, value);
                }
            }
        }
        dict.remove(b"Parent");

        let page_object = Object::Dictionary(dict);
        self.imported.insert(page.id);
        self.import_references(&page_object);
        self.document.objects.insert(page.id, page_object);
        self.pages.push(page.id);
        Ok(())
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn encrypt(&mut self, call: &EncryptCall<'_>) -> Result<(), EngineError> {
        if self.encrypted {
            return Err(EngineError::Encryption("the document is already encrypted".to_string()));
        }
        let (strength, permissions) = match *call {
            EncryptCall::NamedPermissions { permissions, .. }
            | EncryptCall::PositionalPermissions { permissions, .. } => {
                (self.options.strength, permissions_from_codes(permissions))
            }
            EncryptCall::PermissionMask {
                use_128bit,
                permissions,
                ..
            } => (self.options.strength.for_128bit_request(use_128bit), permissions_from_bits(permissions)),
            EncryptCall::KeyStrength { use_128bit, .. } => {
                (self.options.strength.for_128bit_request(use_128bit), Permissions::all())
            }
            EncryptCall::PasswordsOnly { .. } => (self.options.strength, Permissions::all()),
        };
        let (user_password, owner_password) = (call.user_password(), call.owner_password());
        check_passwords(strength, user_password, owner_password)?;

        self.seal();
        // Encrypt a copy so a failed attempt leaves the writer untouched.
        let mut document = self.document.clone();
        let state = self.encryption_state(&document, strength, user_password, owner_password, permissions)?;
        document
            .encrypt(&state)
            .map_err(|err| EngineError::Encryption(err.to_string()))?;
        debug!("encrypted with {strength}, permissions {:#x}", permissions.bits());

        self.document = document;
        self.encrypted = true;
        Ok(())
    }

    fn write(&mut self, mut sink: &mut dyn Write) -> Result<(), EngineError> {
        self.seal();
        self.document
            .save_to(&mut sink)
            .map_err(|err| EngineError::Io(io::Error::other(err.to_string())))
    }
}

fn check_passwords(strength: EncryptionStrength, user_password: &str, owner_password: &str) -> Result<(), EngineError> {
    if owner_password.is_empty() {
        return Err(EngineError::Credential("the owner password must not be empty".to_string()));
    }
    for (role, password) in [("user", user_password), ("owner", owner_password)] {
        match strength {
            EncryptionStrength::Aes256 => {
                if password.len() > MAX_AES256_PASSWORD_LEN {
                    return Err(EngineError::Credential(format!(
                        "the {role} password is longer than {MAX_AES256_PASSWORD_LEN} bytes"
                    )));
                }
            }
            // Older handlers take passwords as single-byte PDFDocEncoding text.
            _ => {
                if password.chars().any(|c| u32::from(c) > 0xFF) {
                    return Err(EngineError::Credential(format!(
                        "the {role} password contains characters that {strength} encryption cannot encode"
                    )));
                }
            }
        }
    }
    Ok(())
}

fn permissions_from_codes(codes: &CapabilitySet) -> Permissions {
    CODE_PERMISSIONS
        .iter()
        .filter(|(code, _)| codes.contains(*code))
        .fold(Permissions::empty(), |acc, (_, permission)| acc | *permission)
}

fn permissions_from_bits(bits: PermissionBits) -> Permissions {
    BIT_PERMISSIONS
        .iter()
        .filter(|(bit, _)| bits.contains(*bit))
        .fold(Permissions::empty(), |acc, (_, permission)| acc | *permission)
}

fn collect_references(object: &Object, out: &mut Vec<ObjectId>) {
    match object {
        Object::Reference(id) => out.push(*id),
        Object::Array(items) => items.iter().for_each(|item| collect_references(item, out)),
        Object::Dictionary(dict) => dict.iter().for_each(|(_, value)| collect_references(value, out)),
        Object::Stream(stream) => stream.dict.iter().for_each(|(_, value)| collect_references(value, out)),
        _ => {}
    }
}

fn inherited_attribute(document: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    for _ in 0..MAX_TREE_DEPTH {
        let node = document.get_dictionary(parent?).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    warn!("page tree deeper than {MAX_TREE_DEPTH} levels, not inheriting {}", String::from_utf8_lossy(key));
    None
}

fn catalog_of(document: &Document) -> Option<&Dictionary> {
    document
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .and_then(|id| document.get_dictionary(id))
        .ok()
}

/// File identifier of the protected copy: the source's permanent identifier
/// (or a fresh one) followed by a fresh changing identifier.
fn file_identifier(source: &Document) -> Object {
    let permanent = source
        .trailer
        .get(b"ID")
        .and_then(Object::as_array)
        .ok()
        .and_then(|ids| ids.first())
        .and_then(|id| id.as_str().ok())
        .map(<[u8]>::to_vec)
        .unwrap_or_else(|| rand::random::<[u8; 16]>().to_vec());
    let changing = rand::random::<[u8; 16]>().to_vec();
    Object::Array(vec![
        Object::String(permanent, StringFormat::Hexadecimal),
        Object::String(changing, StringFormat::Hexadecimal),
    ])
}
