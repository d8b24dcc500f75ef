#![allow(dead_code)]

use batch_runner::validation::{MAX_OPTION_VALUE, MIN_OPTION_VALUE};
use proptest::prelude::*;

/// Strategy for batch size / concurrency values the validator accepts
pub fn valid_option_strategy() -> impl Strategy<Value = i64> {
    MIN_OPTION_VALUE..=MAX_OPTION_VALUE
}

/// Strategy for values outside `[1, 1000]`
pub fn invalid_option_strategy() -> impl Strategy<Value = i64> {
    prop_oneof![i64::MIN..MIN_OPTION_VALUE, (MAX_OPTION_VALUE + 1)..=i64::MAX]
}

/// Strategy for distinct job id lists
pub fn job_ids_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::hash_set("[a-z0-9]{1,12}", 0..40).prop_map(|ids| ids.into_iter().collect())
}
