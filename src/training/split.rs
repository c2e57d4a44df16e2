use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Shuffled row indices for a train/validation split.
///
/// The validation side gets `ceil(n * fraction)` rows; both sides keep at
/// least one row. Returns `None` when `n < 2`.
pub fn train_validation_split(n: usize, fraction: f64, seed: u64) -> Option<(Vec<usize>, Vec<usize>)> {
    if n < 2 {
        return None;
    }
    let validation = ((n as f64 * fraction).ceil() as usize).clamp(1, n - 1);

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train = indices.split_off(validation);
    Some((train, indices))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_follow_the_fraction() {
        let (train, validation) = train_validation_split(10, 0.2, 42).unwrap();
        assert_eq!(validation.len(), 2);
        assert_eq!(train.len(), 8);

        let (train, validation) = train_validation_split(11, 0.2, 42).unwrap();
        assert_eq!(validation.len(), 3);
        assert_eq!(train.len(), 8);
    }

    #[test]
    fn every_row_lands_on_exactly_one_side() {
        let (mut train, validation) = train_validation_split(25, 0.3, 7).unwrap();
        train.extend(validation);
        train.sort_unstable();
        assert_eq!(train, (0..25).collect::<Vec<_>>());
    }

    #[test]
    fn same_seed_same_split() {
        assert_eq!(
            train_validation_split(50, 0.2, 1),
            train_validation_split(50, 0.2, 1)
        );
    }

    #[test]
    fn tiny_inputs() {
        assert_eq!(train_validation_split(1, 0.2, 0), None);
        let (train, validation) = train_validation_split(2, 0.9, 0).unwrap();
        assert_eq!((train.len(), validation.len()), (1, 1));
    }
}
