//! ARC4 stream cipher for legacy encrypted BLTE chunks
//!
//! Modern builds encrypt with Salsa20; a handful of old chunks still carry the
//! `A` cipher tag and are decoded here.

use crate::error::CryptoError;

/// ARC4 (RC4-compatible) keystream generator
pub struct Arc4Cipher {
    s: [u8; 256],
    i: u8,
    j: u8,
}

impl Arc4Cipher {
    /// Schedule a key of 1 to 256 bytes
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        if key.is_empty() || key.len() > 256 {
            return Err(CryptoError::InvalidKeySize {
                expected: 16,
                actual: key.len(),
            });
        }

        let mut s = [0u8; 256];
        for (slot, value) in s.iter_mut().zip(0u8..=255) {
            *slot = value;
        }

        let mut j: u8 = 0;
        for i in 0..256 {
            j = j.wrapping_add(s[i]).wrapping_add(key[i % key.len()]);
            s.swap(i, j as usize);
        }

        Ok(Self { s, i: 0, j: 0 })
    }

    fn next_byte(&mut self) -> u8 {
        self.i = self.i.wrapping_add(1);
        self.j = self.j.wrapping_add(self.s[self.i as usize]);
        self.s.swap(self.i as usize, self.j as usize);
        let index = self.s[self.i as usize].wrapping_add(self.s[self.j as usize]);
        self.s[index as usize]
    }

    /// XOR the keystream into `data`
    pub fn apply_keystream(&mut self, data: &mut [u8]) {
        for byte in data {
            *byte ^= self.next_byte();
        }
    }

    /// Decrypt a copy of `data`
    pub fn decrypt(&mut self, data: &[u8]) -> Vec<u8> {
        let mut out = data.to_vec();
        self.apply_keystream(&mut out);
        out
    }
}
