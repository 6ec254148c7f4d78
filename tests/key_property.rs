//! Property tests for registration keys and variant enumeration

use std::collections::BTreeSet;

use cinnamon_core::{Configuration, Param, RegistrationKey};
use proptest::prelude::*;

fn tag_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z0-9_=.:-]{1,8}", 0..5)
}

proptest! {
    #[test]
    fn key_string_roundtrip(
        name in "[a-z][a-z0-9_-]{0,10}",
        namespace in "[a-z][a-z0-9_-]{0,6}",
        tags in tag_strategy(),
    ) {
        let key = RegistrationKey::new(name, namespace).with_tags(tags);
        let parsed = RegistrationKey::from_string(&key.to_string()).unwrap();
        prop_assert_eq!(&parsed, &key);
        prop_assert_eq!(parsed.to_string(), key.to_string());
    }

    #[test]
    fn tag_order_does_not_matter(name in "[a-z]{1,8}", tags in tag_strategy()) {
        let mut reversed = tags.clone();
        reversed.reverse();
        let forward = RegistrationKey::new(name.clone(), "testing").with_tags(tags);
        let backward = RegistrationKey::new(name, "testing").with_tags(reversed);
        prop_assert_eq!(&forward, &backward);
        prop_assert!(forward.partial_match(&backward));
    }

    #[test]
    fn subset_tags_match_both_ways(name in "[a-z]{1,8}", tags in tag_strategy(), keep in 0usize..5) {
        let full = RegistrationKey::new(name.clone(), "testing").with_tags(tags.clone());
        let subset = RegistrationKey::new(name, "testing")
            .with_tags(tags.into_iter().take(keep));
        prop_assert!(full.partial_match(&subset));
        prop_assert!(subset.partial_match(&full));
    }

    #[test]
    fn combination_count_is_product(
        sizes in prop::collection::vec(1usize..5, 1..5),
    ) {
        let mut config = Configuration::new("Grid");
        for (i, size) in sizes.iter().enumerate() {
            let variants: Vec<i64> = (0..*size as i64).collect();
            config
                .add(Param::new(format!("p{}", i)).value(0i64).variants(variants))
                .unwrap();
        }

        let combinations = config.variant_combinations();
        prop_assert_eq!(combinations.len(), sizes.iter().product::<usize>());

        let distinct: BTreeSet<String> = combinations
            .iter()
            .map(|c| format!("{:?}", c.iter().collect::<std::collections::BTreeMap<_, _>>()))
            .collect();
        prop_assert_eq!(distinct.len(), combinations.len());
    }
}
