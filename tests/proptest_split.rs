use std::collections::BTreeSet;

use proptest::prelude::*;
use rand::{rngs::StdRng, SeedableRng};
use vocprep::split::split_category;

mod proptest_helpers;

proptest! {
    #![proptest_config(proptest_helpers::proptest_config())]

    #[test]
    fn split_sizes_follow_the_ratio(total in 0usize..300, ratio in 0.0f64..=1.0, seed in any::<u64>()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let (train, val) = split_category(proptest_helpers::pairs("cat", total), ratio, &mut rng);

        prop_assert_eq!(val.len(), (total as f64 * ratio).floor() as usize);
        prop_assert_eq!(train.len() + val.len(), total);
    }

    #[test]
    fn split_is_a_partition(total in 1usize..100, ratio in 0.0f64..=1.0, seed in any::<u64>()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let (train, val) = split_category(proptest_helpers::pairs("dog", total), ratio, &mut rng);

        let train_set: BTreeSet<_> = train.iter().map(|p| p.xml_path.clone()).collect();
        let val_set: BTreeSet<_> = val.iter().map(|p| p.xml_path.clone()).collect();
        prop_assert!(train_set.is_disjoint(&val_set));
        prop_assert_eq!(train_set.len() + val_set.len(), total);
    }

    #[test]
    fn split_is_reproducible_for_a_seed(total in 1usize..100, ratio in 0.0f64..=1.0, seed in any::<u64>()) {
        let a = split_category(proptest_helpers::pairs("cat", total), ratio, &mut StdRng::seed_from_u64(seed));
        let b = split_category(proptest_helpers::pairs("cat", total), ratio, &mut StdRng::seed_from_u64(seed));
        prop_assert_eq!(a, b);
    }
}
