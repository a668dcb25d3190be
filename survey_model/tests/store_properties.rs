use proptest::prelude::*;
use survey_model::{SurveyError, SurveyStore};

fn fresh_store() -> (tempfile::TempDir, SurveyStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = SurveyStore::new(dir.path());
    (dir, store)
}

proptest! {
    #[test]
    fn valid_points_always_append(
        lat in -90.0f64..=90.0,
        lon in -180.0f64..=180.0,
        elevation in -11_000.0f64..9_000.0,
    ) {
        let (_dir, mut store) = fresh_store();
        let id = store.create_survey().id().clone();
        let before = store.get(&id).unwrap().point_count();

        let index = store.append_point(&id, lat, lon, elevation).unwrap();

        prop_assert_eq!(index, before);
        prop_assert_eq!(store.get(&id).unwrap().point_count(), before + 1);
    }

    #[test]
    fn out_of_range_points_never_append(
        lat in prop_oneof![90.000_001f64..1_000.0, -1_000.0f64..-90.000_001],
        lon in -180.0f64..=180.0,
    ) {
        let (_dir, mut store) = fresh_store();
        let id = store.create_survey().id().clone();
        store.append_point(&id, 0.0, 0.0, 0.0).unwrap();

        let lat_err = store.append_point(&id, lat, lon, 1.0).unwrap_err();
        prop_assert!(matches!(lat_err, SurveyError::Validation(_)));

        let lon_err = store.append_point(&id, 0.0, lat * 2.0, 1.0).unwrap_err();
        prop_assert!(matches!(lon_err, SurveyError::Validation(_)));

        prop_assert_eq!(store.get(&id).unwrap().point_count(), 1);
    }

    #[test]
    fn persist_restore_preserves_order(
        points in proptest::collection::vec((-90.0f64..=90.0, -180.0f64..=180.0, -500.0f64..5_000.0), 1..20),
        notes in proptest::collection::vec((0usize..20, "[a-z ]{0,24}"), 0..10),
    ) {
        let (_dir, mut store) = fresh_store();
        let id = store.create_survey().id().clone();
        for (lat, lon, elevation) in &points {
            store.append_point(&id, *lat, *lon, *elevation).unwrap();
        }
        for (index, text) in &notes {
            let _ = store.append_description(&id, index % points.len(), text.clone());
        }

        let original = store.get(&id).unwrap().clone();
        store.persist(&id).unwrap();
        let restored = store.restore(&id).unwrap();

        prop_assert_eq!(restored, &original);
    }
}
