//! Per-delivery symmetric wrapper.
//!
//! Every delivery gets a fresh random AES-128 key and IV, used once in CBC
//! mode with PKCS#7 padding. The key and IV go to the recipient alongside the
//! vault handle; the ciphertext only leaves through the vault.

use crate::error::VaultError;
use aes::Aes128;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// AES-128 key length in bytes.
pub const KEY_LEN: usize = 16;

/// CBC initialization vector length in bytes.
pub const IV_LEN: usize = 16;

/// An artifact encrypted under its own one-time key.
///
/// Key and IV are wiped when the value is dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SealedArtifact {
    #[zeroize(skip)]
    pub ciphertext: Vec<u8>,
    pub key: [u8; KEY_LEN],
    pub iv: [u8; IV_LEN],
}

impl std::fmt::Debug for SealedArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SealedArtifact")
            .field("ciphertext_len", &self.ciphertext.len())
            .finish_non_exhaustive()
    }
}

/// Encrypt `plaintext` under a freshly generated key and IV.
pub fn seal(plaintext: &[u8]) -> SealedArtifact {
    let mut rng = rand::thread_rng();
    let mut key = [0u8; KEY_LEN];
    let mut iv = [0u8; IV_LEN];
    rng.fill_bytes(&mut key);
    rng.fill_bytes(&mut iv);

    let ciphertext = seal_with(plaintext, &key, &iv);
    SealedArtifact {
        ciphertext,
        key,
        iv,
    }
}

/// Encrypt `plaintext` under the given key and IV.
pub fn seal_with(plaintext: &[u8], key: &[u8; KEY_LEN], iv: &[u8; IV_LEN]) -> Vec<u8> {
    Aes128CbcEnc::new(&(*key).into(), &(*iv).into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext)
}

/// Decrypt a sealed artifact.
pub fn open(ciphertext: &[u8], key: &[u8], iv: &[u8]) -> Result<Vec<u8>, VaultError> {
    let key: &[u8; KEY_LEN] = key
        .try_into()
        .map_err(|_| VaultError::InvalidKeyMaterial(format!("key must be {KEY_LEN} bytes")))?;
    let iv: &[u8; IV_LEN] = iv
        .try_into()
        .map_err(|_| VaultError::InvalidKeyMaterial(format!("iv must be {IV_LEN} bytes")))?;

    Aes128CbcDec::new(&(*key).into(), &(*iv).into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| VaultError::DecryptionFailed)
}
