use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Read;

/// Block size asar uses when recording per-block hashes.
pub const INTEGRITY_BLOCK_SIZE: usize = 4 * 1024 * 1024;

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Integrity record stored next to every packed file in an asar header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Integrity {
    pub algorithm: String,
    pub hash: String,
    pub block_size: usize,
    pub blocks: Vec<String>,
}

/// Streaming hasher that tracks the whole-file digest and the digest of each
/// fixed-size block at the same time.
pub struct Sha256Blocks {
    whole: Sha256,
    block: Sha256,
    block_len: usize,
    blocks: Vec<String>,
}

impl Sha256Blocks {
    pub fn new() -> Self {
        Self {
            whole: Sha256::new(),
            block: Sha256::new(),
            block_len: 0,
            blocks: Vec::new(),
        }
    }

    pub fn update(&mut self, mut data: &[u8]) {
        self.whole.update(data);
        while !data.is_empty() {
            let room = INTEGRITY_BLOCK_SIZE - self.block_len;
            let take = room.min(data.len());
            self.block.update(&data[..take]);
            self.block_len += take;
            data = &data[take..];

            if self.block_len == INTEGRITY_BLOCK_SIZE {
                let full = std::mem::take(&mut self.block);
                self.blocks.push(hex::encode(full.finalize()));
                self.block_len = 0;
            }
        }
    }

    pub fn finish(mut self) -> Integrity {
        // asar always records at least one block, even for empty files.
        if self.block_len > 0 || self.blocks.is_empty() {
            self.blocks.push(hex::encode(self.block.finalize()));
        }

        Integrity {
            algorithm: "SHA256".to_string(),
            hash: hex::encode(self.whole.finalize()),
            block_size: INTEGRITY_BLOCK_SIZE,
            blocks: self.blocks,
        }
    }
}

impl Default for Sha256Blocks {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash everything readable from `reader`, returning the integrity record and
/// the number of bytes consumed.
pub fn integrity_of<R: Read>(mut reader: R) -> std::io::Result<(Integrity, u64)> {
    let mut hasher = Sha256Blocks::new();
    let mut buf = vec![0u8; 64 * 1024];
    let mut total = 0u64;

    loop {
        let read = reader.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
        total += read as u64;
    }

    Ok((hasher.finish(), total))
}
