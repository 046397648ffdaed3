//! # Quorum Sortition
//!
//! Deterministic selection of quorum members from a registry, plus the
//! pairwise helpers the connectivity layer uses to decide who dials whom.
//!
//! ## Algorithm
//!
//! ```text
//! score(p)   = U256_le(sha256(seed || p.pro_tx_hash))
//! quorum     = sort all providers by (score, collateral) ascending, take size
//! ```
//!
//! Collateral outpoints are globally unique, so the order is total and every
//! node computes the same member list for the same registry and seed.

use super::llmq::LlmqType;
use super::record::ProviderRecord;
use super::registry::Registry;
use shared_types::{Hash, HashWriter, U256};
use std::collections::BTreeSet;

impl Registry {
    /// Sortition score of every provider, banned ones included.
    pub fn calculate_scores(&self, seed: &Hash) -> Vec<(U256, ProviderRecord)> {
        self.iter()
            .map(|record| {
                let digest = HashWriter::new()
                    .write(seed)
                    .write(&record.pro_tx_hash)
                    .finish();
                (U256::from_little_endian(&digest), record.clone())
            })
            .collect()
    }

    /// The first `size` providers by ascending score.
    pub fn calculate_quorum(&self, size: usize, seed: &Hash) -> Vec<ProviderRecord> {
        let mut scores = self.calculate_scores(seed);
        scores.sort_by(|(sa, a), (sb, b)| sa.cmp(sb).then_with(|| a.collateral.cmp(&b.collateral)));
        scores
            .into_iter()
            .take(size)
            .map(|(_, record)| record)
            .collect()
    }
}

/// Seed binding a quorum to its type and base block.
pub fn quorum_modifier(llmq_type: LlmqType, base_block_hash: &Hash) -> Hash {
    HashWriter::new()
        .write(&[llmq_type.as_u8()])
        .write(base_block_hash)
        .finish_double()
}

/// Which of two providers opens the outbound connection.
///
/// Picking `min(a, b)` would favour numerically low hashes, so each side is
/// scored with `sha256d(min || max || side)` and the lower score wins.
pub fn deterministic_outbound_connection(a: &Hash, b: &Hash) -> Hash {
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
    let score = |x: &Hash| {
        HashWriter::new()
            .write(lo)
            .write(hi)
            .write(x)
            .finish_double()
    };
    if score(a) < score(b) {
        *a
    } else {
        *b
    }
}

/// Peers `for_member` connects to in an all-connected quorum. With
/// `only_outbound`, only the peers it must dial itself.
pub fn quorum_connections(
    members: &[ProviderRecord],
    for_member: &Hash,
    only_outbound: bool,
) -> BTreeSet<Hash> {
    members
        .iter()
        .map(|m| m.pro_tx_hash)
        .filter(|hash| hash != for_member)
        .filter(|hash| {
            !only_outbound || deterministic_outbound_connection(for_member, hash) == *hash
        })
        .collect()
}

/// Ring neighbours of member `index`: `(index + 2^k) % n` for
/// `k in 0..max(2, floor(log2(n - 1)))`, skipping itself.
fn ring_outbound(members: &[ProviderRecord], index: usize) -> BTreeSet<Hash> {
    let n = members.len();
    let mut result = BTreeSet::new();
    if n < 2 {
        return result;
    }
    let own = members[index].pro_tx_hash;
    let mut gap: usize = 1;
    let mut gap_max = n - 1;
    let mut k = 0;
    loop {
        gap_max >>= 1;
        if gap_max == 0 && k > 1 {
            break;
        }
        let other = &members[(index + gap) % n];
        if other.pro_tx_hash != own {
            result.insert(other.pro_tx_hash);
        }
        gap <<= 1;
        k += 1;
    }
    result
}

/// Relay topology: each member connects to ring neighbours at power-of-two
/// distances. Without `only_outbound`, members whose ring reaches
/// `for_member` are included as well.
pub fn quorum_relay_members(
    members: &[ProviderRecord],
    for_member: &Hash,
    only_outbound: bool,
) -> BTreeSet<Hash> {
    let mut result = BTreeSet::new();
    for (i, member) in members.iter().enumerate() {
        if member.pro_tx_hash == *for_member {
            result.extend(ring_outbound(members, i));
        } else if !only_outbound && ring_outbound(members, i).contains(for_member) {
            result.insert(member.pro_tx_hash);
        }
    }
    result
}

/// Member indexes a non-member watches. `seed` is node-local randomness
/// supplied by the caller.
pub fn deterministic_watch_connections(
    seed: &Hash,
    llmq_type: LlmqType,
    base_block_hash: &Hash,
    member_count: usize,
    connection_count: usize,
) -> BTreeSet<usize> {
    let mut result = BTreeSet::new();
    if member_count == 0 {
        return result;
    }
    let mut rnd = *seed;
    for _ in 0..connection_count {
        rnd = HashWriter::new()
            .write(&rnd)
            .write(&[llmq_type.as_u8()])
            .write(base_block_hash)
            .finish_double();
        let mut word = [0u8; 8];
        word.copy_from_slice(&rnd[..8]);
        result.insert((u64::from_le_bytes(word) % member_count as u64) as usize);
    }
    result
}
