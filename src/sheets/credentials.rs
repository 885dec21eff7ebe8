use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use argon2::password_hash::rand_core::RngCore;
use argon2::{Algorithm, Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};

use super::error::SheetsError;

/// Key under which the Sheets OAuth token is kept.
pub const SHEETS_TOKEN_KEY: &str = "sheets_access_token";

const STORE_VERSION: u8 = 1;

#[derive(Serialize, Deserialize, Clone)]
struct SealedValue {
    nonce: String,      // base64
    ciphertext: String, // base64
}

#[derive(Serialize, Deserialize)]
struct StoreFile {
    version: u8,
    salt: String, // base64, fixed per store for key derivation
    entries: HashMap<String, SealedValue>,
}

/// Encrypted at-rest storage for remote-mirror credentials. Values are
/// sealed with AES-256-GCM under a key derived from machine identity, so
/// the store file alone is not enough to recover a token.
pub struct CredentialStore {
    path: PathBuf,
    master_key: [u8; 32],
}

impl CredentialStore {
    pub fn open(data_dir: PathBuf) -> Result<Self, SheetsError> {
        let path = data_dir.join("mirror_credentials.enc");
        let file = Self::load_or_create(&path)?;
        let master_key = derive_key(&machine_id(), &file.salt)?;

        Ok(Self { path, master_key })
    }

    fn load_or_create(path: &PathBuf) -> Result<StoreFile, SheetsError> {
        if path.exists() {
            let data = fs::read(path)
                .map_err(|e| SheetsError::Encryption(format!("failed to read store: {}", e)))?;
            serde_json::from_slice(&data)
                .map_err(|e| SheetsError::Encryption(format!("failed to parse store: {}", e)))
        } else {
            let mut salt = [0u8; 16];
            OsRng.fill_bytes(&mut salt);
            Ok(StoreFile {
                version: STORE_VERSION,
                salt: BASE64.encode(salt),
                entries: HashMap::new(),
            })
        }
    }

    fn save(&self, file: &StoreFile) -> Result<(), SheetsError> {
        let data = serde_json::to_vec_pretty(file)
            .map_err(|e| SheetsError::Encryption(format!("failed to serialize store: {}", e)))?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| SheetsError::Encryption(format!("failed to create dir: {}", e)))?;
        }
        fs::write(&self.path, data)
            .map_err(|e| SheetsError::Encryption(format!("failed to write store: {}", e)))
    }

    /// Seal and persist a credential value.
    pub fn store(&self, key: &str, value: &str) -> Result<(), SheetsError> {
        let cipher = Aes256Gcm::new_from_slice(&self.master_key)
            .map_err(|e| SheetsError::Encryption(format!("cipher init failed: {}", e)))?;

        let mut nonce_bytes = [0u8; 12];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher.encrypt(nonce, value.as_bytes())?;

        let mut file = Self::load_or_create(&self.path)?;
        file.entries.insert(
            key.to_string(),
            SealedValue {
                nonce: BASE64.encode(nonce_bytes),
                ciphertext: BASE64.encode(&ciphertext),
            },
        );
        self.save(&file)
    }

    /// Retrieve and unseal a credential value.
    pub fn retrieve(&self, key: &str) -> Result<String, SheetsError> {
        let file = Self::load_or_create(&self.path)?;
        let sealed = file
            .entries
            .get(key)
            .ok_or_else(|| SheetsError::Encryption(format!("credential '{}' not found", key)))?;

        let cipher = Aes256Gcm::new_from_slice(&self.master_key)
            .map_err(|e| SheetsError::Encryption(format!("cipher init failed: {}", e)))?;

        let nonce_bytes = BASE64
            .decode(&sealed.nonce)
            .map_err(|e| SheetsError::Encryption(format!("invalid nonce: {}", e)))?;
        let ciphertext = BASE64
            .decode(&sealed.ciphertext)
            .map_err(|e| SheetsError::Encryption(format!("invalid ciphertext: {}", e)))?;

        let plaintext = cipher.decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())?;

        String::from_utf8(plaintext)
            .map_err(|e| SheetsError::Encryption(format!("invalid UTF-8: {}", e)))
    }

    pub fn delete(&self, key: &str) -> Result<(), SheetsError> {
        let mut file = Self::load_or_create(&self.path)?;
        file.entries.remove(key);
        self.save(&file)
    }
}

fn machine_id() -> String {
    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown-host".to_string());
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown-user".to_string());
    format!("wdo-journal-{}-{}", host, user)
}

fn derive_key(machine_id: &str, salt_b64: &str) -> Result<[u8; 32], SheetsError> {
    let salt = BASE64
        .decode(salt_b64)
        .map_err(|e| SheetsError::Encryption(format!("invalid salt: {}", e)))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, Params::default());
    let mut key = [0u8; 32];
    argon2
        .hash_password_into(machine_id.as_bytes(), &salt, &mut key)
        .map_err(|e| SheetsError::Encryption(format!("key derivation failed: {}", e)))?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, CredentialStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::open(dir.path().to_path_buf()).unwrap();
        (dir, store)
    }

    #[test]
    fn store_and_retrieve_roundtrip() {
        let (_dir, store) = store();
        store.store(SHEETS_TOKEN_KEY, "ya29.secret-token").unwrap();
        assert_eq!(store.retrieve(SHEETS_TOKEN_KEY).unwrap(), "ya29.secret-token");
    }

    #[test]
    fn unknown_key_is_an_error() {
        let (_dir, store) = store();
        assert!(store.retrieve("missing").is_err());
    }

    #[test]
    fn delete_removes_the_entry() {
        let (_dir, store) = store();
        store.store("k", "v").unwrap();
        store.delete("k").unwrap();
        assert!(store.retrieve("k").is_err());
    }

    #[test]
    fn ciphertext_on_disk_is_not_plaintext() {
        let (dir, store) = store();
        store.store("k", "super-secret").unwrap();
        let raw = fs::read_to_string(dir.path().join("mirror_credentials.enc")).unwrap();
        assert!(!raw.contains("super-secret"));
    }
}
