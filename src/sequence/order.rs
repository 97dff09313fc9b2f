//! Randomized pose ordering with adjacency constraints.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

use crate::error::ConfigError;

/// True if any forbidden pair sits next to each other, in either order.
pub fn has_forbidden_neighbours(order: &[u32], forbidden: &[(u32, u32)]) -> bool {
    order.windows(2).any(|w| {
        forbidden
            .iter()
            .any(|&(a, b)| (w[0] == a && w[1] == b) || (w[0] == b && w[1] == a))
    })
}

/// Checks that the id set is usable before any shuffling happens.
pub fn validate(ids: &[u32], forbidden: &[(u32, u32)]) -> Result<(), ConfigError> {
    if ids.is_empty() {
        return Err(ConfigError::EmptyPoseSet);
    }

    let mut seen = HashSet::with_capacity(ids.len());
    for &id in ids {
        if !seen.insert(id) {
            return Err(ConfigError::DuplicatePoseId(id));
        }
    }

    for &(a, b) in forbidden {
        if let Some(&unknown) = [a, b].iter().find(|&&id| !seen.contains(&id)) {
            return Err(ConfigError::UnknownPairId { a, b, unknown });
        }
    }

    Ok(())
}

/// Uniformly shuffles `ids` until no forbidden pair is adjacent.
///
/// Rejection sampling: each attempt is an independent Fisher-Yates shuffle of
/// the full set, so accepted orders stay uniform over the valid ones. Gives
/// up with [`ConfigError::Unsatisfiable`] after `max_attempts` shuffles.
pub fn generate_order<R: Rng + ?Sized>(
    ids: &[u32],
    forbidden: &[(u32, u32)],
    max_attempts: usize,
    rng: &mut R,
) -> Result<Vec<u32>, ConfigError> {
    validate(ids, forbidden)?;
    if max_attempts == 0 {
        return Err(ConfigError::InvalidValue {
            field: "sequence.max_shuffle_attempts",
            value: "0".to_string(),
            reason: "at least one shuffle is required",
        });
    }

    let mut order = ids.to_vec();
    for _ in 0..max_attempts {
        order.shuffle(rng);
        if !has_forbidden_neighbours(&order, forbidden) {
            return Ok(order);
        }
    }

    Err(ConfigError::Unsatisfiable {
        attempts: max_attempts,
    })
}
