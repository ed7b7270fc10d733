use proptest::prelude::*;
use sdk::errors::{EngineError, GavelErrorExt};
use sdk::types::{RatingField, Ratings, MAX_RATING, MIN_RATING};

// Ratings inside the accepted range survive validation unchanged
proptest! {
    #[test]
    fn test_in_range_ratings_are_accepted(
        creativity in MIN_RATING..=MAX_RATING,
        execution in MIN_RATING..=MAX_RATING,
        usability in MIN_RATING..=MAX_RATING,
    ) {
        let ratings = Ratings::new(creativity, execution, usability).unwrap();
        prop_assert_eq!(i64::from(ratings.creativity), creativity);
        prop_assert_eq!(i64::from(ratings.execution), execution);
        prop_assert_eq!(i64::from(ratings.usability), usability);
    }
}

// Any single out-of-range value rejects the whole set, naming the field
proptest! {
    #[test]
    fn test_out_of_range_ratings_are_rejected(
        bad in prop_oneof![i64::MIN..MIN_RATING, (MAX_RATING + 1)..i64::MAX],
        position in 0usize..3,
    ) {
        let mut values = [5i64, 5, 5];
        values[position] = bad;

        match Ratings::new(values[0], values[1], values[2]) {
            Err(EngineError::RatingOutOfRange { field, value }) => {
                let expected = [RatingField::Creativity, RatingField::Execution, RatingField::Usability][position];
                prop_assert_eq!(field, expected);
                prop_assert_eq!(value, bad);
            }
            other => prop_assert!(false, "expected RatingOutOfRange, got {:?}", other),
        }
    }
}

// Clamping always lands inside the range
proptest! {
    #[test]
    fn test_clamped_ratings_are_in_range(
        creativity in any::<i64>(),
        execution in any::<i64>(),
        usability in any::<i64>(),
    ) {
        let r = Ratings::clamped(creativity, execution, usability);
        for v in [r.creativity, r.execution, r.usability] {
            prop_assert!((MIN_RATING..=MAX_RATING).contains(&i64::from(v)));
        }
    }
}

proptest! {
    #[test]
    fn test_error_user_hint_completeness(error_str in "\\PC*") {
        let errs = vec![
            EngineError::Config(error_str.clone()),
            EngineError::Database(error_str.clone()),
            EngineError::Validation(error_str.clone()),
            EngineError::Network(error_str.clone()),
            EngineError::DuplicateScore {
                judge_id: error_str.clone(),
                participant_id: error_str.clone(),
                round_index: 0,
            },
        ];

        for err in errs {
            let hint = err.user_hint();
            prop_assert!(!hint.is_empty());
            // Hints are static and never echo the raw cause
            if error_str.len() > 12 {
                prop_assert!(!hint.contains(error_str.as_str()));
            }
        }
    }
}
