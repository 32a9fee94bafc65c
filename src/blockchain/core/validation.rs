use super::chain::Block;
use crate::error::{ChainError, Result};
use crate::miner::ProofOfWork;

/// Verify hash links and proofs from the second block to the tip.
///
/// Returns the first violation found. A genesis-only chain is valid.
pub fn validate_chain(blocks: &[Block], pow: &ProofOfWork) -> Result<()> {
    if blocks.is_empty() {
        return Err(ChainError::EmptyChain);
    }

    for pair in blocks.windows(2) {
        let (previous, block) = (&pair[0], &pair[1]);

        let expected_hash = previous.hash()?;
        if block.previous_hash != expected_hash {
            return Err(ChainError::InvalidChain {
                index: block.index,
                reason: format!(
                    "previous_hash {} does not match digest {} of block {}",
                    block.previous_hash, expected_hash, previous.index
                ),
            });
        }

        if !pow.is_valid(block.proof, previous.proof) {
            return Err(ChainError::InvalidChain {
                index: block.index,
                reason: format!(
                    "proof {} is not valid against previous proof {}",
                    block.proof, previous.proof
                ),
            });
        }
    }

    Ok(())
}

pub fn is_chain_valid(blocks: &[Block], pow: &ProofOfWork) -> bool {
    validate_chain(blocks, pow).is_ok()
}
