//! Proof-of-work for Montycoin
//!
//! A proof is valid against the previous block's proof when the SHA-256 of
//! the decimal text of `proof² - previous²` starts with `difficulty` zero
//! hex characters. The search walks proofs upward from 1, so for a given
//! previous proof and difficulty the result is always the smallest valid
//! proof.

use crate::crypto::sha256_hex;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub const DEFAULT_DIFFICULTY: usize = 4;

/// Longest possible prefix of a hex SHA-256 digest.
pub const MAX_DIFFICULTY: usize = 64;

/// Result of a proof search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    Found { proof: u64, attempts: u64 },
    Cancelled { attempts: u64 },
}

impl SearchOutcome {
    pub fn proof(&self) -> Option<u64> {
        match self {
            SearchOutcome::Found { proof, .. } => Some(*proof),
            SearchOutcome::Cancelled { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofOfWork {
    difficulty: usize,
}

impl Default for ProofOfWork {
    fn default() -> Self {
        Self::new(DEFAULT_DIFFICULTY)
    }
}

impl ProofOfWork {
    /// `difficulty` is clamped to `1..=MAX_DIFFICULTY`.
    pub fn new(difficulty: usize) -> Self {
        ProofOfWork {
            difficulty: difficulty.clamp(1, MAX_DIFFICULTY),
        }
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    /// Checks `proof` against the preceding block's proof.
    pub fn is_valid(&self, proof: u64, previous_proof: u64) -> bool {
        match work_input(proof, previous_proof) {
            Some(input) => {
                let digest = sha256_hex(input.as_bytes());
                digest.bytes().take(self.difficulty).all(|b| b == b'0')
            }
            // Squares beyond i128 cannot be rendered the way peers render them.
            None => false,
        }
    }

    /// Searches for the smallest valid proof, checking `cancel` on every attempt.
    pub fn search(&self, previous_proof: u64, cancel: &CancellationToken) -> SearchOutcome {
        self.run(previous_proof, cancel, None)
    }

    /// Like [`ProofOfWork::search`], but gives up once `budget` has elapsed.
    pub fn search_with_deadline(
        &self,
        previous_proof: u64,
        cancel: &CancellationToken,
        budget: Duration,
    ) -> SearchOutcome {
        self.run(previous_proof, cancel, Some(Instant::now() + budget))
    }

    fn run(
        &self,
        previous_proof: u64,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
    ) -> SearchOutcome {
        let started = Instant::now();
        let mut attempts = 0u64;
        let mut proof = 1u64;

        loop {
            if cancel.is_cancelled() || deadline.is_some_and(|d| Instant::now() >= d) {
                debug!(previous_proof, attempts, "proof search cancelled");
                return SearchOutcome::Cancelled { attempts };
            }

            attempts += 1;
            if self.is_valid(proof, previous_proof) {
                debug!(
                    previous_proof,
                    proof,
                    attempts,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "proof found"
                );
                return SearchOutcome::Found { proof, attempts };
            }

            proof = match proof.checked_add(1) {
                Some(next) => next,
                None => return SearchOutcome::Cancelled { attempts },
            };
        }
    }
}

/// Decimal text of `proof² - previous²`, or `None` on overflow.
fn work_input(proof: u64, previous_proof: u64) -> Option<String> {
    let p = i128::from(proof);
    let q = i128::from(previous_proof);
    let delta = p.checked_mul(p)?.checked_sub(q.checked_mul(q)?)?;
    Some(delta.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_input_matches_integer_text() {
        assert_eq!(work_input(3, 2).as_deref(), Some("5"));
        assert_eq!(work_input(1, 2).as_deref(), Some("-3"));
        assert_eq!(work_input(u64::MAX, 0), None);
    }

    #[test]
    fn test_search_finds_valid_minimal_proof() {
        let pow = ProofOfWork::new(2);
        let cancel = CancellationToken::new();

        for previous in [1u64, 7, 533, 45_293] {
            let proof = pow.search(previous, &cancel).proof().unwrap();
            assert!(pow.is_valid(proof, previous));
            assert!((1..proof).all(|p| !pow.is_valid(p, previous)));
        }
    }

    #[test]
    fn test_search_is_deterministic() {
        let pow = ProofOfWork::new(2);
        let cancel = CancellationToken::new();
        assert_eq!(pow.search(100, &cancel), pow.search(100, &cancel));
    }

    #[test]
    fn test_reference_difficulty_first_block() {
        // Proof of the first block mined on top of a genesis proof of 1.
        let pow = ProofOfWork::default();
        let cancel = CancellationToken::new();
        let proof = pow.search(1, &cancel).proof().unwrap();
        assert!(pow.is_valid(proof, 1));
        assert!(sha256_hex((proof as i128 * proof as i128 - 1).to_string().as_bytes()).starts_with("0000"));
    }

    #[test]
    fn test_cancelled_search_stops() {
        let pow = ProofOfWork::new(MAX_DIFFICULTY);
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(
            pow.search(1, &cancel),
            SearchOutcome::Cancelled { attempts: 0 }
        );
    }

    #[test]
    fn test_deadline_stops_search() {
        let pow = ProofOfWork::new(MAX_DIFFICULTY);
        let cancel = CancellationToken::new();
        let outcome = pow.search_with_deadline(1, &cancel, Duration::from_millis(20));
        assert!(matches!(outcome, SearchOutcome::Cancelled { .. }));
    }

    #[test]
    fn test_difficulty_is_clamped() {
        assert_eq!(ProofOfWork::new(0).difficulty(), 1);
        assert_eq!(ProofOfWork::new(100).difficulty(), MAX_DIFFICULTY);
    }
}
