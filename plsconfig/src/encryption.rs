//! Chiffrement du mot de passe de session
//!
//! The session password may be stored in `config.yaml` as
//! `encrypted:BASE64(nonce || ciphertext)`. The AES-256-GCM key is derived
//! from the machine identity, so an encrypted file only decrypts on the host
//! that wrote it.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use anyhow::{Result, anyhow};
use base64::Engine;
use sha2::{Digest, Sha256};

const ENCRYPTED_PREFIX: &str = "encrypted:";
const KEY_SALT: &[u8] = b"plsserver-session-password-v1";
const NONCE_SALT: &[u8] = b"plsserver-nonce-v1";
const NONCE_LEN: usize = 12;

/// Identité stable de la machine
#[cfg(target_os = "linux")]
fn machine_identity() -> Result<String> {
    use std::fs;

    for candidate in [
        "/etc/machine-id",
        "/var/lib/dbus/machine-id",
        "/proc/sys/kernel/hostname",
    ] {
        if let Ok(id) = fs::read_to_string(candidate) {
            let id = id.trim();
            if !id.is_empty() {
                return Ok(id.to_string());
            }
        }
    }
    Err(anyhow!("Failed to read a machine identity"))
}

#[cfg(target_os = "macos")]
fn machine_identity() -> Result<String> {
    let output = std::process::Command::new("ioreg")
        .args(["-d2", "-c", "IOPlatformExpertDevice"])
        .output()?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .lines()
        .find(|line| line.contains("IOPlatformUUID"))
        .and_then(|line| line.split('"').nth(3))
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Failed to extract IOPlatformUUID from ioreg"))
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn machine_identity() -> Result<String> {
    std::env::var("COMPUTERNAME")
        .or_else(|_| std::env::var("HOSTNAME"))
        .map_err(|_| anyhow!("Unsupported platform for machine identity"))
}

fn derive_key(identity: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(identity.as_bytes());
    hasher.update(KEY_SALT);
    let mut key = [0u8; 32];
    key.copy_from_slice(&hasher.finalize());
    key
}

fn cipher_for(identity: &str) -> Result<Aes256Gcm> {
    Aes256Gcm::new_from_slice(&derive_key(identity))
        .map_err(|e| anyhow!("Failed to create cipher: {}", e))
}

fn encrypt_with(identity: &str, password: &str) -> Result<String> {
    let cipher = cipher_for(identity)?;

    // Nonce déterministe : le même mot de passe ne réécrit pas la config
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.update(NONCE_SALT);
    let digest = hasher.finalize();
    let nonce_bytes = &digest[..NONCE_LEN];

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(nonce_bytes), password.as_bytes())
        .map_err(|e| anyhow!("Encryption failed: {}", e))?;

    let mut combined = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    combined.extend_from_slice(nonce_bytes);
    combined.extend_from_slice(&ciphertext);

    Ok(format!(
        "{}{}",
        ENCRYPTED_PREFIX,
        base64::engine::general_purpose::STANDARD.encode(&combined)
    ))
}

fn decrypt_with(identity: &str, encrypted: &str) -> Result<String> {
    let payload = encrypted
        .strip_prefix(ENCRYPTED_PREFIX)
        .ok_or_else(|| anyhow!("Invalid encrypted password format (missing prefix)"))?;

    let combined = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| anyhow!("Invalid base64: {}", e))?;
    if combined.len() <= NONCE_LEN {
        return Err(anyhow!("Invalid ciphertext (too short)"));
    }

    let (nonce, ciphertext) = combined.split_at(NONCE_LEN);
    let plaintext = cipher_for(identity)?
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|e| anyhow!("Decryption failed (wrong machine or corrupted data): {}", e))?;

    String::from_utf8(plaintext).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
}

/// Chiffre un mot de passe avec la clé de la machine courante
///
/// Returns `encrypted:BASE64`, where the payload is the 12-byte nonce
/// followed by the AES-GCM ciphertext.
pub fn encrypt_password(password: &str) -> Result<String> {
    encrypt_with(&machine_identity()?, password)
}

/// Déchiffre une valeur produite par [`encrypt_password`] sur cette machine
pub fn decrypt_password(encrypted: &str) -> Result<String> {
    decrypt_with(&machine_identity()?, encrypted)
}

pub fn is_encrypted(value: &str) -> bool {
    value.starts_with(ENCRYPTED_PREFIX)
}

/// Returns the clear-text password, decrypting it when it carries the
/// `encrypted:` prefix.
pub fn get_password(value: &str) -> Result<String> {
    if is_encrypted(value) {
        decrypt_password(value)
    } else {
        Ok(value.to_string())
    }
}
