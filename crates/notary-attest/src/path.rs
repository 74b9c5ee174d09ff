//! # Commitment Paths and Merkle Aggregation
//!
//! A commitment path is a short program over bytes. Starting from a
//! 32-byte document digest, each operation either concatenates a constant
//! (`append` / `prepend`) or hashes the current message (`sha256`). A
//! calendar hands back the path from a digest to its own commitment at
//! submission time, and later the path from that commitment to the
//! Merkle root committed in a block header.
//!
//! ## Aggregation
//!
//! Calendars aggregate many commitments into one binary Merkle tree.
//! Parent: `SHA256(left || right)`. An odd node at the end of a level is
//! promoted unchanged. The path for a leaf is, per level,
//! `append(sibling), sha256` when the leaf side is on the left and
//! `prepend(sibling), sha256` when it is on the right.
//!
//! ## Limits
//!
//! Paths come from outside the process, so evaluation is bounded:
//! at most [`MAX_OPS`] operations, [`MAX_ARG_LEN`] bytes per argument and
//! [`MAX_MESSAGE_LEN`] bytes of intermediate message.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ProofFormatError;

/// Maximum operations in one path.
pub const MAX_OPS: usize = 256;
/// Maximum length of an append/prepend argument.
pub const MAX_ARG_LEN: usize = 4096;
/// Maximum length of an intermediate message.
pub const MAX_MESSAGE_LEN: usize = 8192;

/// One step of a commitment path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "arg", rename_all = "lowercase")]
pub enum PathOp {
    /// `msg = msg || arg`
    Append(#[serde(with = "hex_bytes")] Vec<u8>),
    /// `msg = arg || msg`
    Prepend(#[serde(with = "hex_bytes")] Vec<u8>),
    /// `msg = SHA256(msg)`
    Sha256,
}

/// Evaluate `ops` starting from `start`.
pub fn evaluate(start: &[u8], ops: &[PathOp]) -> Result<Vec<u8>, ProofFormatError> {
    if ops.len() > MAX_OPS {
        return Err(ProofFormatError::PathTooLarge(format!(
            "{} operations (max {MAX_OPS})",
            ops.len()
        )));
    }
    let mut msg = start.to_vec();
    for op in ops {
        match op {
            PathOp::Append(arg) => {
                check_arg(arg)?;
                msg.extend_from_slice(arg);
            }
            PathOp::Prepend(arg) => {
                check_arg(arg)?;
                let mut next = Vec::with_capacity(arg.len() + msg.len());
                next.extend_from_slice(arg);
                next.extend_from_slice(&msg);
                msg = next;
            }
            PathOp::Sha256 => msg = sha256_raw(&msg).to_vec(),
        }
        if msg.len() > MAX_MESSAGE_LEN {
            return Err(ProofFormatError::PathTooLarge(format!(
                "intermediate message of {} bytes (max {MAX_MESSAGE_LEN})",
                msg.len()
            )));
        }
    }
    Ok(msg)
}

fn check_arg(arg: &[u8]) -> Result<(), ProofFormatError> {
    if arg.len() > MAX_ARG_LEN {
        return Err(ProofFormatError::PathTooLarge(format!(
            "argument of {} bytes (max {MAX_ARG_LEN})",
            arg.len()
        )));
    }
    Ok(())
}

fn sha256_raw(b: &[u8]) -> [u8; 32] {
    let hash = Sha256::digest(b);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hash);
    out
}

fn node_hash(left: &[u8], right: &[u8]) -> Vec<u8> {
    let mut input = Vec::with_capacity(left.len() + right.len());
    input.extend_from_slice(left);
    input.extend_from_slice(right);
    sha256_raw(&input).to_vec()
}

/// A binary Merkle tree over calendar commitments.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    /// `levels[0]` holds the leaves, the last level holds the root.
    levels: Vec<Vec<Vec<u8>>>,
}

impl MerkleTree {
    /// Build a tree over `leaves`. Returns `None` for an empty leaf set.
    pub fn build(leaves: Vec<Vec<u8>>) -> Option<Self> {
        if leaves.is_empty() {
            return None;
        }
        let mut levels = vec![leaves];
        while let Some(level) = levels.last().filter(|l| l.len() > 1) {
            let next: Vec<Vec<u8>> = level
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => node_hash(left, right),
                    [odd] => odd.clone(),
                    _ => Vec::new(),
                })
                .collect();
            levels.push(next);
        }
        Some(Self { levels })
    }

    /// The tree root.
    pub fn root(&self) -> &[u8] {
        self.levels
            .last()
            .and_then(|l| l.first())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Number of leaves.
    pub fn len(&self) -> usize {
        self.levels.first().map_or(0, Vec::len)
    }

    /// Whether the tree has no leaves. Always false for a built tree.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The path lifting leaf `index` to the root.
    pub fn path(&self, mut index: usize) -> Option<Vec<PathOp>> {
        if index >= self.len() {
            return None;
        }
        let mut ops = Vec::new();
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling = index ^ 1;
            if let Some(sib) = level.get(sibling) {
                if index % 2 == 0 {
                    ops.push(PathOp::Append(sib.clone()));
                } else {
                    ops.push(PathOp::Prepend(sib.clone()));
                }
                ops.push(PathOp::Sha256);
            }
            index /= 2;
        }
        Some(ops)
    }
}

pub(crate) mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}
