use rand::Rng;
use thiserror::Error;
use tracing::instrument;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SamplingError {
    #[error("Cannot draw from an empty range")]
    EmptyRange,
}

/// Draws an index uniformly from `[0, len)`.
///
/// The range is rebuilt on every call, so callers may pass a different `len`
/// each time without carrying distribution state around.
#[instrument(level = "trace", skip(rng))]
pub fn uniform_index(len: usize, rng: &mut impl Rng) -> Result<usize, SamplingError> {
    if len == 0 {
        return Err(SamplingError::EmptyRange);
    }
    Ok(rng.gen_range(0..len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn draws_stay_within_range_and_cover_it() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = [false; 5];
        for _ in 0..500 {
            let i = uniform_index(5, &mut rng).unwrap();
            assert!(i < 5);
            seen[i] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn single_element_range_always_yields_zero() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..20 {
            assert_eq!(uniform_index(1, &mut rng), Ok(0));
        }
    }

    #[test]
    fn empty_range_is_an_error() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(uniform_index(0, &mut rng), Err(SamplingError::EmptyRange));
    }
}
