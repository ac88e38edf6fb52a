use ergm_core::derive_substream_seed;

/// Derives the deterministic seed used for a specific chain.
pub fn chain_seed(master_seed: u64, chain_index: usize) -> u64 {
    derive_substream_seed(master_seed, chain_index as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_seeds_are_distinct_and_stable() {
        let seeds: Vec<u64> = (0..4).map(|chain| chain_seed(42, chain)).collect();
        assert_eq!(seeds, (0..4).map(|chain| chain_seed(42, chain)).collect::<Vec<_>>());
        for (i, a) in seeds.iter().enumerate() {
            for b in &seeds[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
