//! Salsa20 keystream for encrypted BLTE chunks
//!
//! CASC uses the 128-bit key form of Salsa20 (the "expand 16-byte k"
//! constants, key repeated in both key slots) with a 4 or 8 byte IV. The first
//! four IV bytes are XORed with the chunk index so every chunk of a file gets
//! its own keystream.

use crate::error::CryptoError;

const TAU: [u32; 4] = [0x6170_7865, 0x3120_646e, 0x7962_2d36, 0x6b20_6574];
const ROUNDS: usize = 20;

/// Salsa20 cipher state for one BLTE chunk
pub struct Salsa20Cipher {
    input: [u32; 16],
    block: [u8; 64],
    used: usize,
}

fn le_word(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

impl Salsa20Cipher {
    /// Create the cipher for `chunk_index` of a file
    pub fn new(key: &[u8; 16], iv: &[u8], chunk_index: usize) -> Result<Self, CryptoError> {
        if iv.len() != 4 && iv.len() != 8 {
            return Err(CryptoError::InvalidIvSize(iv.len()));
        }

        let mut nonce = [0u8; 8];
        nonce[..iv.len()].copy_from_slice(iv);
        #[allow(clippy::cast_possible_truncation)]
        let index = (chunk_index as u32).to_le_bytes();
        for (byte, mask) in nonce.iter_mut().zip(index) {
            *byte ^= mask;
        }

        let mut input = [0u32; 16];
        input[0] = TAU[0];
        input[5] = TAU[1];
        input[10] = TAU[2];
        input[15] = TAU[3];
        for i in 0..4 {
            let word = le_word(&key[i * 4..]);
            input[1 + i] = word;
            input[11 + i] = word;
        }
        input[6] = le_word(&nonce[0..]);
        input[7] = le_word(&nonce[4..]);

        Ok(Self {
            input,
            block: [0; 64],
            used: 64,
        })
    }

    fn quarter(x: &mut [u32; 16], a: usize, b: usize, c: usize, d: usize) {
        x[b] ^= x[a].wrapping_add(x[d]).rotate_left(7);
        x[c] ^= x[b].wrapping_add(x[a]).rotate_left(9);
        x[d] ^= x[c].wrapping_add(x[b]).rotate_left(13);
        x[a] ^= x[d].wrapping_add(x[c]).rotate_left(18);
    }

    fn refill(&mut self) {
        let mut x = self.input;
        for _ in 0..ROUNDS / 2 {
            Self::quarter(&mut x, 0, 4, 8, 12);
            Self::quarter(&mut x, 5, 9, 13, 1);
            Self::quarter(&mut x, 10, 14, 2, 6);
            Self::quarter(&mut x, 15, 3, 7, 11);

            Self::quarter(&mut x, 0, 1, 2, 3);
            Self::quarter(&mut x, 5, 6, 7, 4);
            Self::quarter(&mut x, 10, 11, 8, 9);
            Self::quarter(&mut x, 15, 12, 13, 14);
        }

        for (i, word) in x.iter().enumerate() {
            let mixed = word.wrapping_add(self.input[i]);
            self.block[i * 4..i * 4 + 4].copy_from_slice(&mixed.to_le_bytes());
        }

        self.input[8] = self.input[8].wrapping_add(1);
        if self.input[8] == 0 {
            self.input[9] = self.input[9].wrapping_add(1);
        }
        self.used = 0;
    }

    /// XOR the keystream into `data`
    pub fn apply_keystream(&mut self, data: &mut [u8]) {
        for byte in data {
            if self.used == 64 {
                self.refill();
            }
            *byte ^= self.block[self.used];
            self.used += 1;
        }
    }
}

/// Decrypt one chunk payload
pub fn decrypt_salsa20(
    data: &[u8],
    key: &[u8; 16],
    iv: &[u8],
    chunk_index: usize,
) -> Result<Vec<u8>, CryptoError> {
    let mut cipher = Salsa20Cipher::new(key, iv, chunk_index)?;
    let mut output = data.to_vec();
    cipher.apply_keystream(&mut output);
    Ok(output)
}

/// Encrypt one chunk payload (the keystream is symmetric)
pub fn encrypt_salsa20(
    data: &[u8],
    key: &[u8; 16],
    iv: &[u8],
    chunk_index: usize,
) -> Result<Vec<u8>, CryptoError> {
    decrypt_salsa20(data, key, iv, chunk_index)
}
