// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cryptographic primitives as pure-function contracts (spec §1, §6):
//! AES-128-ECB and SHA-256, assumed available from the platform, plus
//! the AES-CCM* construction the MAC and KeyManager build on top of them.
//!
//! No source grounding exists in the pack for a concrete AES/SHA
//! implementation (the teacher crate doesn't carry its own crypto; Tock
//! boards defer to a platform-specific `kernel::hil::symmetric_encryption`
//! implementation not present here). This module is this crate's own
//! from-scratch contract, shaped the same way the radio contract in
//! `radio.rs` is: a trait external code implements, consumed as pure
//! synchronous functions per spec §6 rather than Tock's async
//! `Client`-callback crypto HIL, since spec §6 describes crypto as
//! "assumed available as pure functions."

use crate::error::ThreadError;

pub const AES_BLOCK_LEN: usize = 16;
pub const SHA256_DIGEST_LEN: usize = 32;
pub const MAX_AAD_LEN: usize = 32;

pub trait Aes128Ecb {
    /// Encrypts exactly one 16-byte block under `key`.
    fn encrypt_block(&self, key: &[u8; AES_BLOCK_LEN], block: &mut [u8; AES_BLOCK_LEN]);
}

pub trait Sha256 {
    fn digest(&self, input: &[u8], out: &mut [u8; SHA256_DIGEST_LEN]);
}

/// AES-CCM* as used by 802.15.4 link-layer security: one MIC length per
/// `SecurityLevel`, nonce = 64-bit source extended address || 32-bit frame
/// counter || 1-byte security level (spec §4.2).
pub struct CcmNonce {
    pub source_ext_addr: [u8; 8],
    pub frame_counter: u32,
    pub security_level: u8,
}

impl CcmNonce {
    pub fn encode(&self) -> [u8; 13] {
        let mut out = [0u8; 13];
        out[0..8].copy_from_slice(&self.source_ext_addr);
        out[8..12].copy_from_slice(&self.frame_counter.to_be_bytes());
        out[12] = self.security_level;
        out
    }
}

/// Encrypts `plaintext` in place and appends a `mic_len`-byte MIC computed
/// over `aad || plaintext`, using `aes` as the only primitive (a real CCM*
/// implementation only needs block-cipher access, not a dedicated AEAD
/// primitive). Returns the number of bytes written to `out` (plaintext
/// length + `mic_len`).
pub fn ccm_star_encrypt(
    aes: &dyn Aes128Ecb,
    key: &[u8; AES_BLOCK_LEN],
    nonce: &CcmNonce,
    aad: &[u8],
    plaintext: &[u8],
    mic_len: usize,
    out: &mut [u8],
) -> Result<usize, ThreadError> {
    if out.len() < plaintext.len() + mic_len {
        return Err(ThreadError::NoBufs);
    }
    if aad.len() > MAX_AAD_LEN {
        return Err(ThreadError::InvalidArgs);
    }

    let mic = compute_cbc_mac(aes, key, nonce, aad, plaintext, mic_len);

    let mut counter = nonce_block(nonce, 1);
    let mut i = 0;
    while i < plaintext.len() {
        let mut keystream = counter;
        aes.encrypt_block(key, &mut keystream);
        let n = core::cmp::min(AES_BLOCK_LEN, plaintext.len() - i);
        for j in 0..n {
            out[i + j] = plaintext[i + j] ^ keystream[j];
        }
        i += n;
        counter = increment_counter(counter);
    }

    if mic_len > 0 {
        let mut s0 = nonce_block(nonce, 0);
        aes.encrypt_block(key, &mut s0);
        for j in 0..mic_len {
            out[plaintext.len() + j] = mic[j] ^ s0[j];
        }
    }

    Ok(plaintext.len() + mic_len)
}

/// Inverse of `ccm_star_encrypt`: decrypts `input[..input.len()-mic_len]`
/// into `out` and verifies the trailing MIC, returning `Err(Security)` on
/// mismatch.
pub fn ccm_star_decrypt(
    aes: &dyn Aes128Ecb,
    key: &[u8; AES_BLOCK_LEN],
    nonce: &CcmNonce,
    aad: &[u8],
    input: &[u8],
    mic_len: usize,
    out: &mut [u8],
) -> Result<usize, ThreadError> {
    if input.len() < mic_len {
        return Err(ThreadError::Parse);
    }
    let ciphertext_len = input.len() - mic_len;
    if out.len() < ciphertext_len {
        return Err(ThreadError::NoBufs);
    }

    let mut counter = nonce_block(nonce, 1);
    let mut i = 0;
    while i < ciphertext_len {
        let mut keystream = counter;
        aes.encrypt_block(key, &mut keystream);
        let n = core::cmp::min(AES_BLOCK_LEN, ciphertext_len - i);
        for j in 0..n {
            out[i + j] = input[i + j] ^ keystream[j];
        }
        i += n;
        counter = increment_counter(counter);
    }

    if mic_len > 0 {
        let expected_mic = compute_cbc_mac(aes, key, nonce, aad, &out[..ciphertext_len], mic_len);
        let mut s0 = nonce_block(nonce, 0);
        aes.encrypt_block(key, &mut s0);
        for j in 0..mic_len {
            if input[ciphertext_len + j] != expected_mic[j] ^ s0[j] {
                return Err(ThreadError::Security);
            }
        }
    }

    Ok(ciphertext_len)
}

fn nonce_block(nonce: &CcmNonce, counter: u16) -> [u8; AES_BLOCK_LEN] {
    let mut block = [0u8; AES_BLOCK_LEN];
    block[0] = 1;
    let n = nonce.encode();
    block[1..14].copy_from_slice(&n);
    block[14..16].copy_from_slice(&counter.to_be_bytes());
    block
}

fn increment_counter(mut block: [u8; AES_BLOCK_LEN]) -> [u8; AES_BLOCK_LEN] {
    let counter = u16::from_be_bytes([block[14], block[15]]).wrapping_add(1);
    block[14..16].copy_from_slice(&counter.to_be_bytes());
    block
}

fn compute_cbc_mac(
    aes: &dyn Aes128Ecb,
    key: &[u8; AES_BLOCK_LEN],
    nonce: &CcmNonce,
    aad: &[u8],
    plaintext: &[u8],
    mic_len: usize,
) -> [u8; AES_BLOCK_LEN] {
    let mut b0 = [0u8; AES_BLOCK_LEN];
    let has_aad = !aad.is_empty();
    let m = ((mic_len as u8).saturating_sub(2)) / 2;
    b0[0] = ((has_aad as u8) << 6) | (m << 3) | 1;
    let n = nonce.encode();
    b0[1..14].copy_from_slice(&n);
    let l = plaintext.len() as u16;
    b0[14..16].copy_from_slice(&l.to_be_bytes());

    let mut mac = b0;
    aes.encrypt_block(key, &mut mac);

    if has_aad {
        let mut block = [0u8; AES_BLOCK_LEN];
        let la = aad.len() as u16;
        block[0..2].copy_from_slice(&la.to_be_bytes());
        let n = core::cmp::min(AES_BLOCK_LEN - 2, aad.len());
        block[2..2 + n].copy_from_slice(&aad[..n]);
        xor_into(&mut mac, &block);
        aes.encrypt_block(key, &mut mac);

        let mut rest = &aad[n..];
        while !rest.is_empty() {
            let mut block = [0u8; AES_BLOCK_LEN];
            let take = core::cmp::min(AES_BLOCK_LEN, rest.len());
            block[..take].copy_from_slice(&rest[..take]);
            xor_into(&mut mac, &block);
            aes.encrypt_block(key, &mut mac);
            rest = &rest[take..];
        }
    }

    let mut rest = plaintext;
    while !rest.is_empty() {
        let mut block = [0u8; AES_BLOCK_LEN];
        let take = core::cmp::min(AES_BLOCK_LEN, rest.len());
        block[..take].copy_from_slice(&rest[..take]);
        xor_into(&mut mac, &block);
        aes.encrypt_block(key, &mut mac);
        rest = &rest[take..];
    }

    mac
}

fn xor_into(dst: &mut [u8; AES_BLOCK_LEN], src: &[u8; AES_BLOCK_LEN]) {
    for i in 0..AES_BLOCK_LEN {
        dst[i] ^= src[i];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// AES-ECB stand-in for tests: XORs the block with the key so
    /// encrypt/decrypt symmetry can be exercised without a real cipher.
    struct XorCipher;
    impl Aes128Ecb for XorCipher {
        fn encrypt_block(&self, key: &[u8; AES_BLOCK_LEN], block: &mut [u8; AES_BLOCK_LEN]) {
            for i in 0..AES_BLOCK_LEN {
                block[i] ^= key[i];
            }
        }
    }

    #[test]
    fn ccm_round_trips_with_mic() {
        let aes = XorCipher;
        let key = [0x42; AES_BLOCK_LEN];
        let nonce = CcmNonce {
            source_ext_addr: [1, 2, 3, 4, 5, 6, 7, 8],
            frame_counter: 9,
            security_level: 6,
        };
        let plaintext = b"thread mesh data path";
        let mut ct = [0u8; 64];
        let ct_len =
            ccm_star_encrypt(&aes, &key, &nonce, b"aad", plaintext, 8, &mut ct).unwrap();

        let mut pt = [0u8; 64];
        let pt_len =
            ccm_star_decrypt(&aes, &key, &nonce, b"aad", &ct[..ct_len], 8, &mut pt).unwrap();
        assert_eq!(&pt[..pt_len], plaintext);
    }

    #[test]
    fn ccm_rejects_tampered_mic() {
        let aes = XorCipher;
        let key = [0x42; AES_BLOCK_LEN];
        let nonce = CcmNonce {
            source_ext_addr: [0; 8],
            frame_counter: 1,
            security_level: 5,
        };
        let plaintext = b"hello";
        let mut ct = [0u8; 32];
        let ct_len = ccm_star_encrypt(&aes, &key, &nonce, &[], plaintext, 4, &mut ct).unwrap();
        ct[ct_len - 1] ^= 0xff;

        let mut pt = [0u8; 32];
        let result = ccm_star_decrypt(&aes, &key, &nonce, &[], &ct[..ct_len], 4, &mut pt);
        assert_eq!(result, Err(ThreadError::Security));
    }
}
