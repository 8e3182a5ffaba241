//! Decryption of the client's encrypted profile payload.
//!
//! The client ships its profile as AES-CBC ciphertext, keyed with the
//! per-session key the identity provider returned and a client-chosen
//! IV. All three arrive base64-encoded. There is no authentication
//! tag, so a wrong key shows up only as garbage padding.

use aes::cipher::{BlockDecryptMut, KeyIvInit, block_padding::NoPadding};
use base64::{Engine, engine::general_purpose::STANDARD};

use crate::SessionError;

/// AES block size in bytes, for every key length.
pub const BLOCK_SIZE: usize = 16;

/// Decrypts a base64 AES-CBC payload and strips its PKCS#7 padding.
///
/// The key length picks the cipher: 16, 24 or 32 bytes for AES-128,
/// AES-192 or AES-256.
///
/// # Errors
/// - [`SessionError::Decode`]: an input is not valid base64
/// - [`SessionError::Cipher`]: bad key/IV length, or a ciphertext that
///   is empty or not a multiple of [`BLOCK_SIZE`]
/// - [`SessionError::Padding`]: the padding is inconsistent
pub fn decrypt_payload(
    ciphertext_b64: &str,
    key_b64: &str,
    iv_b64: &str,
) -> Result<String, SessionError> {
    let ciphertext = decode_field("ciphertext", ciphertext_b64)?;
    let key = decode_field("key", key_b64)?;
    let iv = decode_field("iv", iv_b64)?;

    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(SessionError::Cipher(format!(
            "ciphertext length {} is not a positive multiple of the block size",
            ciphertext.len()
        )));
    }

    let mut plain = match key.len() {
        16 => cbc_decrypt::<aes::Aes128>(&key, &iv, &ciphertext)?,
        24 => cbc_decrypt::<aes::Aes192>(&key, &iv, &ciphertext)?,
        32 => cbc_decrypt::<aes::Aes256>(&key, &iv, &ciphertext)?,
        other => {
            return Err(SessionError::Cipher(format!(
                "unsupported key length {other}"
            )));
        }
    };

    let unpadded = unpad_pkcs7(&plain)?;
    plain.truncate(unpadded);

    String::from_utf8(plain)
        .map_err(|_| SessionError::Cipher("plaintext is not valid UTF-8".into()))
}

fn decode_field(field: &'static str, value: &str) -> Result<Vec<u8>, SessionError> {
    STANDARD
        .decode(value.trim())
        .map_err(|source| SessionError::Decode { field, source })
}

fn cbc_decrypt<C>(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, SessionError>
where
    C: BlockDecryptMut + aes::cipher::BlockCipher + aes::cipher::KeyInit,
{
    let decryptor = cbc::Decryptor::<C>::new_from_slices(key, iv)
        .map_err(|_| SessionError::Cipher(format!("iv must be {BLOCK_SIZE} bytes")))?;
    decryptor
        .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
        .map_err(|_| SessionError::Cipher("ciphertext is not block aligned".into()))
}

/// Returns the length of `data` with PKCS#7 padding removed.
///
/// The pad length N is the last byte; it must be in `1..=BLOCK_SIZE`,
/// no longer than the data, and every one of the last N bytes must equal N.
fn unpad_pkcs7(data: &[u8]) -> Result<usize, SessionError> {
    let Some(&last) = data.last() else {
        return Err(SessionError::Padding("no data to unpad".into()));
    };
    let n = last as usize;
    if n == 0 || n > BLOCK_SIZE || n > data.len() {
        return Err(SessionError::Padding(format!("pad length {n} out of range")));
    }
    let start = data.len() - n;
    if data[start..].iter().any(|&b| b != last) {
        return Err(SessionError::Padding("pad bytes are inconsistent".into()));
    }
    Ok(start)
}

#[cfg(test)]
mod tests {
    use aes::cipher::{BlockEncryptMut, block_padding::Pkcs7};
    use proptest::prelude::*;

    use super::*;

    const KEY: [u8; 16] = *b"0123456789abcdef";
    const IV: [u8; 16] = *b"fedcba9876543210";

    fn b64(bytes: &[u8]) -> String {
        STANDARD.encode(bytes)
    }

    fn encrypt(plain: &[u8], key: &[u8], iv: &[u8]) -> Vec<u8> {
        cbc::Encryptor::<aes::Aes128>::new_from_slices(key, iv)
            .unwrap()
            .encrypt_padded_vec_mut::<Pkcs7>(plain)
    }

    /// Encrypts with whichever AES variant the key length selects.
    fn encrypt_sized(plain: &[u8], key: &[u8], iv: &[u8]) -> Vec<u8> {
        match key.len() {
            16 => encrypt(plain, key, iv),
            24 => cbc::Encryptor::<aes::Aes192>::new_from_slices(key, iv)
                .unwrap()
                .encrypt_padded_vec_mut::<Pkcs7>(plain),
            _ => cbc::Encryptor::<aes::Aes256>::new_from_slices(key, iv)
                .unwrap()
                .encrypt_padded_vec_mut::<Pkcs7>(plain),
        }
    }

    fn aes_key() -> impl Strategy<Value = Vec<u8>> {
        prop_oneof![Just(16usize), Just(24), Just(32)]
            .prop_flat_map(|len| prop::collection::vec(any::<u8>(), len))
    }

    /// Encrypts a raw block-aligned buffer without adding padding, so
    /// tests can plant arbitrary trailing bytes.
    fn encrypt_raw(plain: &[u8]) -> Vec<u8> {
        cbc::Encryptor::<aes::Aes128>::new_from_slices(&KEY, &IV)
            .unwrap()
            .encrypt_padded_vec_mut::<NoPadding>(plain)
    }

    #[test]
    fn test_decrypt_round_trip_recovers_plaintext() {
        let profile = r#"{"nickName":"Ayla","gender":2,"city":"Hangzhou"}"#;
        let ct = encrypt(profile.as_bytes(), &KEY, &IV);

        let plain = decrypt_payload(&b64(&ct), &b64(&KEY), &b64(&IV)).unwrap();

        assert_eq!(plain, profile);
    }

    #[test]
    fn test_decrypt_block_aligned_plaintext_gets_full_pad_block() {
        let plain = "sixteen byte msg";
        let ct = encrypt(plain.as_bytes(), &KEY, &IV);
        assert_eq!(ct.len(), 32);

        assert_eq!(decrypt_payload(&b64(&ct), &b64(&KEY), &b64(&IV)).unwrap(), plain);
    }

    #[test]
    fn test_decrypt_aes256_key() {
        let key = [7u8; 32];
        let ct = cbc::Encryptor::<aes::Aes256>::new_from_slices(&key, &IV)
            .unwrap()
            .encrypt_padded_vec_mut::<Pkcs7>(b"wide key");

        let plain = decrypt_payload(&b64(&ct), &b64(&key), &b64(&IV)).unwrap();

        assert_eq!(plain, "wide key");
    }

    #[test]
    fn test_decrypt_invalid_base64_returns_decode_error() {
        let result = decrypt_payload("%%%", &b64(&KEY), &b64(&IV));
        assert!(matches!(
            result,
            Err(SessionError::Decode { field: "ciphertext", .. })
        ));

        let result = decrypt_payload(&b64(&[0u8; 16]), "not base64!", &b64(&IV));
        assert!(matches!(result, Err(SessionError::Decode { field: "key", .. })));
    }

    #[test]
    fn test_decrypt_unaligned_ciphertext_returns_cipher_error() {
        let result = decrypt_payload(&b64(&[0u8; 15]), &b64(&KEY), &b64(&IV));
        assert!(matches!(result, Err(SessionError::Cipher(_))));
    }

    #[test]
    fn test_decrypt_empty_ciphertext_returns_cipher_error() {
        let result = decrypt_payload("", &b64(&KEY), &b64(&IV));
        assert!(matches!(result, Err(SessionError::Cipher(_))));
    }

    #[test]
    fn test_decrypt_bad_key_length_returns_cipher_error() {
        let result = decrypt_payload(&b64(&[0u8; 16]), &b64(&[1u8; 10]), &b64(&IV));
        assert!(matches!(result, Err(SessionError::Cipher(_))));
    }

    #[test]
    fn test_decrypt_bad_iv_length_returns_cipher_error() {
        let result = decrypt_payload(&b64(&[0u8; 16]), &b64(&KEY), &b64(&[1u8; 8]));
        assert!(matches!(result, Err(SessionError::Cipher(_))));
    }

    #[test]
    fn test_decrypt_pad_length_over_block_size_returns_padding_error() {
        let mut block = [b'x'; 32];
        block[31] = 17;
        let ct = encrypt_raw(&block);

        let result = decrypt_payload(&b64(&ct), &b64(&KEY), &b64(&IV));

        assert!(matches!(result, Err(SessionError::Padding(_))));
    }

    #[test]
    fn test_decrypt_zero_pad_length_returns_padding_error() {
        let mut block = [b'x'; 16];
        block[15] = 0;
        let ct = encrypt_raw(&block);

        let result = decrypt_payload(&b64(&ct), &b64(&KEY), &b64(&IV));

        assert!(matches!(result, Err(SessionError::Padding(_))));
    }

    #[test]
    fn test_decrypt_wrong_key_is_not_silently_truncated() {
        let ct = encrypt(b"hello world", &KEY, &IV);
        let wrong = *b"ffffffffffffffff";

        // A wrong key yields random trailing bytes; whatever comes out
        // must never be a quietly truncated copy of the real plaintext.
        match decrypt_payload(&b64(&ct), &b64(&wrong), &b64(&IV)) {
            Ok(plain) => assert_ne!(plain, "hello world"),
            Err(e) => assert!(e.is_payload_error()),
        }
    }

    #[test]
    fn test_unpad_pkcs7_checks_every_pad_byte() {
        assert_eq!(unpad_pkcs7(&[b'a', 2, 2]).unwrap(), 1);
        assert!(matches!(unpad_pkcs7(&[b'a', 1, 2]), Err(SessionError::Padding(_))));
        assert!(matches!(unpad_pkcs7(&[3, 3]), Err(SessionError::Padding(_))));
        assert!(matches!(unpad_pkcs7(&[]), Err(SessionError::Padding(_))));
    }

    proptest! {
        #[test]
        fn test_decrypt_round_trips_any_plaintext_key_and_iv(
            plain in any::<String>(),
            key in aes_key(),
            iv in prop::array::uniform16(any::<u8>())
        ) {
            let ct = encrypt_sized(plain.as_bytes(), &key, &iv);
            let recovered = decrypt_payload(&b64(&ct), &b64(&key), &b64(&iv)).unwrap();
            prop_assert_eq!(recovered, plain);
        }
    }
}
