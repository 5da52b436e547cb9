use dagcore_consensus_core::BlueWorkType;
use dagcore_math::Uint256;

/// Returns the expected number of hashes needed to solve a block with the given compact target `bits`.
/// Work above the width of [`BlueWorkType`] saturates at its maximum.
pub fn calc_work(bits: u32) -> BlueWorkType {
    let target = Uint256::from_compact_target_bits(bits);
    if target.is_zero() {
        return BlueWorkType::MAX;
    }
    // Source: https://github.com/bitcoin/bitcoin/blob/2e34374bf3e12b37b0c66824a6c998073cdfab01/src/chain.cpp#L131
    // We need to compute 2**256 / (bnTarget+1), but we can't represent 2**256
    // as it's too large for an arith_uint256. However, as 2**256 is at least as large
    // as bnTarget+1, it is equal to ((2**256 - bnTarget - 1) / (bnTarget+1)) + 1,
    // or ~bnTarget / (bnTarget+1) + 1.
    let res = (!target / (target + 1u64)) + 1u64;
    res.try_into().unwrap_or(BlueWorkType::MAX)
}
