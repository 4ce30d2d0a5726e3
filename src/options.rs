use std::fmt;
use std::str::FromStr;

use crate::Error;
use crate::bitmask::BitLayout;

/// Cipher and key length of the standard security handler.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum EncryptionStrength {
    /// RC4 with a 40-bit key (revision 2).
    Rc4_40,
    /// RC4 with a 128-bit key (revision 3).
    Rc4_128,
    /// AES with a 128-bit key (revision 4).
    #[default]
    Aes128,
    /// AES with a 256-bit key (revision 6).
    Aes256,
}

impl EncryptionStrength {
    pub fn key_bits(self) -> usize {
        match self {
            EncryptionStrength::Rc4_40 => 40,
            EncryptionStrength::Rc4_128 | EncryptionStrength::Aes128 => 128,
            EncryptionStrength::Aes256 => 256,
        }
    }

    /// Strength to use when a call asks for 128-bit keys (or not).
    ///
    /// A 128-bit request keeps any configured strength of at least 128 bits and
    /// upgrades 40-bit RC4; otherwise 40-bit RC4 is used.
    pub fn for_128bit_request(self, use_128bit: bool) -> Self {
        match (use_128bit, self) {
            (true, EncryptionStrength::Rc4_40) => EncryptionStrength::Rc4_128,
            (true, strength) => strength,
            (false, _) => EncryptionStrength::Rc4_40,
        }
    }
}

impl fmt::Display for EncryptionStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EncryptionStrength::Rc4_40 => "rc4-40",
            EncryptionStrength::Rc4_128 => "rc4-128",
            EncryptionStrength::Aes128 => "aes-128",
            EncryptionStrength::Aes256 => "aes-256",
        };
        f.write_str(name)
    }
}

impl FromStr for EncryptionStrength {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rc4-40" | "rc4_40" => Ok(EncryptionStrength::Rc4_40),
            "rc4-128" | "rc4_128" => Ok(EncryptionStrength::Rc4_128),
            "aes-128" | "aes128" => Ok(EncryptionStrength::Aes128),
            "aes-256" | "aes256" => Ok(EncryptionStrength::Aes256),
            _ => Err(Error::UnknownOption(s.to_string())),
        }
    }
}

/// Options for protecting PDF documents
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProtectOptions {
    /// Cipher used by the engine
    pub strength: EncryptionStrength,

    /// Copy bit placement for engines that take a legacy permission mask
    pub bit_layout: BitLayout,

    /// Compress streams before encrypting
    pub compress: bool,
}

impl Default for ProtectOptions {
    fn default() -> Self {
        ProtectOptions {
            strength: EncryptionStrength::default(),
            bit_layout: BitLayout::default(),
            compress: true,
        }
    }
}

impl ProtectOptions {
    /// Create a builder for ProtectOptions
    pub fn builder() -> ProtectOptionsBuilder {
        ProtectOptionsBuilder::default()
    }
}

/// Builder for ProtectOptions
#[derive(Default)]
pub struct ProtectOptionsBuilder {
    options: ProtectOptions,
}

impl ProtectOptionsBuilder {
    /// Set the encryption strength
    pub fn strength(mut self, value: EncryptionStrength) -> Self {
        self.options.strength = value;
        self
    }

    /// Set the copy bit layout
    pub fn bit_layout(mut self, value: BitLayout) -> Self {
        self.options.bit_layout = value;
        self
    }

    /// Enable or disable stream compression
    pub fn compress(mut self, value: bool) -> Self {
        self.options.compress = value;
        self
    }

    /// Build the ProtectOptions
    pub fn build(self) -> ProtectOptions {
        self.options
    }
}
