//! Módulo de criptografia para dados sensíveis
//!
//! Este módulo implementa as primitivas de criptografia que protegem o
//! conteúdo clínico dos prontuários no banco de dados:
//! - AES-256-GCM para os dados
//! - ChaCha20-Poly1305 para embrulhar a chave mestra
//! - Argon2id para derivar a chave de embrulho a partir da frase-senha

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use anyhow::{Context, Result};
use argon2::Argon2;
use chacha20poly1305::{ChaCha20Poly1305, Key as ChaChaKey, Nonce as ChaChaNonce};
use chrono::Utc;
use rand::{rngs::OsRng as RandOsRng, RngCore};
use serde::{de::DeserializeOwned, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::models::MasterKey;

/// Erros específicos para operações de criptografia
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Falha na criptografia: {0}")]
    EncryptionFailed(String),

    #[error("Falha na descriptografia: {0}")]
    DecryptionFailed(String),

    #[error("Dados inválidos: {0}")]
    InvalidData(String),

    #[error("Configuração de criptografia inválida: {0}")]
    InvalidConfiguration(String),
}

/// Tamanho do nonce em bytes para AES-GCM e ChaCha20-Poly1305
const NONCE_SIZE: usize = 12;

/// Tamanho do salt do Argon2id
const KDF_SALT_SIZE: usize = 16;

/// Chave AES-256 para criptografia (com zeroização automática)
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey(pub [u8; 32]);

impl EncryptionKey {
    /// Cria uma nova chave aleatória
    pub fn generate() -> Self {
        let mut key = [0u8; 32];
        RandOsRng.fill_bytes(&mut key);
        Self(key)
    }

    /// Cria uma chave a partir de bytes existentes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != 32 {
            return Err(CryptoError::InvalidData(format!(
                "A chave deve ter 32 bytes, recebeu {}",
                bytes.len()
            )));
        }

        let mut key = [0u8; 32];
        key.copy_from_slice(bytes);
        Ok(Self(key))
    }

    /// Converte para bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKey(***)")
    }
}

/// Estrutura que armazena dados criptografados e seu nonce
#[derive(Debug, Clone)]
pub struct EncryptedData {
    /// Dados criptografados
    pub ciphertext: Vec<u8>,
    /// Nonce usado na criptografia
    pub nonce: Vec<u8>,
}

/// Chave mestra embrulhada e o salt da derivação
#[derive(Debug, Clone)]
pub struct WrappedKey {
    pub data: EncryptedData,
    pub salt: Vec<u8>,
}

/// Criptografa dados usando AES-256-GCM
pub fn encrypt(data: &[u8], key: &EncryptionKey) -> Result<EncryptedData, CryptoError> {
    let aes_key = Key::<Aes256Gcm>::from_slice(key.as_bytes());
    let cipher = Aes256Gcm::new(aes_key);

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, data)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    Ok(EncryptedData {
        ciphertext,
        nonce: nonce.to_vec(),
    })
}

/// Descriptografa dados usando AES-256-GCM
pub fn decrypt(encrypted: &EncryptedData, key: &EncryptionKey) -> Result<Vec<u8>, CryptoError> {
    let aes_key = Key::<Aes256Gcm>::from_slice(key.as_bytes());
    let cipher = Aes256Gcm::new(aes_key);

    if encrypted.nonce.len() != NONCE_SIZE {
        return Err(CryptoError::InvalidData(format!(
            "Nonce inválido: esperado {} bytes, recebido {}",
            NONCE_SIZE,
            encrypted.nonce.len()
        )));
    }

    let nonce = Nonce::from_slice(&encrypted.nonce);

    cipher
        .decrypt(nonce, encrypted.ciphertext.as_ref())
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
}

/// Serializa em JSON e criptografa
pub fn encrypt_json<T: Serialize>(value: &T, key: &EncryptionKey) -> Result<EncryptedData, CryptoError> {
    let mut plaintext =
        serde_json::to_vec(value).map_err(|e| CryptoError::InvalidData(e.to_string()))?;
    let encrypted = encrypt(&plaintext, key);
    plaintext.zeroize();
    encrypted
}

/// Descriptografa e desserializa JSON
pub fn decrypt_json<T: DeserializeOwned>(
    encrypted: &EncryptedData,
    key: &EncryptionKey,
) -> Result<T, CryptoError> {
    let mut plaintext = decrypt(encrypted, key)?;
    let value = serde_json::from_slice(&plaintext).map_err(|e| CryptoError::InvalidData(e.to_string()));
    plaintext.zeroize();
    value
}

/// Deriva a chave de embrulho com Argon2id
fn derive_wrapping_key(password: &str, salt: &[u8]) -> Result<[u8; 32], CryptoError> {
    let mut wrapping_key = [0u8; 32];
    Argon2::default()
        .hash_password_into(password.as_bytes(), salt, &mut wrapping_key)
        .map_err(|e| CryptoError::InvalidConfiguration(e.to_string()))?;
    Ok(wrapping_key)
}

/// Criptografa uma chave usando ChaCha20-Poly1305 com chave derivada de senha
pub fn wrap_key(key: &EncryptionKey, password: &str) -> Result<WrappedKey, CryptoError> {
    let mut salt = vec![0u8; KDF_SALT_SIZE];
    RandOsRng.fill_bytes(&mut salt);

    let mut wrapping_key = derive_wrapping_key(password, &salt)?;
    let cipher = ChaCha20Poly1305::new(ChaChaKey::from_slice(&wrapping_key));
    wrapping_key.zeroize();

    let mut nonce = [0u8; NONCE_SIZE];
    RandOsRng.fill_bytes(&mut nonce);

    let ciphertext = cipher
        .encrypt(ChaChaNonce::from_slice(&nonce), key.as_bytes())
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    Ok(WrappedKey {
        data: EncryptedData {
            ciphertext,
            nonce: nonce.to_vec(),
        },
        salt,
    })
}

/// Descriptografa uma chave usando ChaCha20-Poly1305 com chave derivada de senha
pub fn unwrap_key(wrapped: &WrappedKey, password: &str) -> Result<EncryptionKey, CryptoError> {
    if wrapped.data.nonce.len() != NONCE_SIZE {
        return Err(CryptoError::InvalidData(format!(
            "Nonce inválido: esperado {} bytes, recebido {}",
            NONCE_SIZE,
            wrapped.data.nonce.len()
        )));
    }

    let mut wrapping_key = derive_wrapping_key(password, &wrapped.salt)?;
    let cipher = ChaCha20Poly1305::new(ChaChaKey::from_slice(&wrapping_key));
    wrapping_key.zeroize();

    let mut plaintext = cipher
        .decrypt(ChaChaNonce::from_slice(&wrapped.data.nonce), wrapped.data.ciphertext.as_ref())
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;

    let key = EncryptionKey::from_bytes(&plaintext);
    plaintext.zeroize();
    key
}

/// Carrega a chave mestra ativa ou cria uma nova na primeira execução
pub async fn load_or_create_master_key(pool: &SqlitePool, key_phrase: &str) -> Result<EncryptionKey> {
    if key_phrase.is_empty() {
        return Err(CryptoError::InvalidConfiguration(
            "Frase-senha da chave mestra não definida".to_string(),
        )
        .into());
    }

    let existing: Option<MasterKey> = sqlx::query_as(
        "SELECT * FROM master_keys WHERE active = 1 ORDER BY key_version DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await
    .context("Falha ao consultar chave mestra")?;

    if let Some(record) = existing {
        let wrapped = WrappedKey {
            data: EncryptedData {
                ciphertext: record.wrapped_key_ciphertext,
                nonce: record.wrapped_key_nonce,
            },
            salt: record.kdf_salt,
        };
        let key = unwrap_key(&wrapped, key_phrase).map_err(|e| {
            warn!("Não foi possível abrir a chave mestra versão {}", record.key_version);
            e
        })?;
        info!("Chave mestra versão {} carregada", record.key_version);
        return Ok(key);
    }

    let key = EncryptionKey::generate();
    let wrapped = wrap_key(&key, key_phrase)?;

    sqlx::query(
        "INSERT INTO master_keys (created_at, active, wrapped_key_ciphertext, wrapped_key_nonce, kdf_salt, key_version)
         VALUES (?, 1, ?, ?, ?, 1)",
    )
    .bind(Utc::now())
    .bind(&wrapped.data.ciphertext)
    .bind(&wrapped.data.nonce)
    .bind(&wrapped.salt)
    .execute(pool)
    .await
    .context("Falha ao gravar chave mestra")?;

    info!("Nova chave mestra criada");
    Ok(key)
}
