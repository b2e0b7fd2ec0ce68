use super::*;
use proptest::prelude::*;

#[test]
fn test_points_compare_by_content() {
    let a = DimensionSpacePoint::new([("language", "en_US"), ("market", "eu")]);
    let b = DimensionSpacePoint::new([("market", "eu"), ("language", "en_US")]);
    assert_eq!(a, b);

    let mut set = DimensionSpacePointSet::empty();
    set.insert(a);
    assert!(!set.insert(b));
    assert_eq!(set.len(), 1);
}

#[test]
fn test_point_display_is_ordered_by_dimension() {
    let point = DimensionSpacePoint::new([("market", "ch"), ("language", "de")]);
    assert_eq!(point.to_string(), "{language=de, market=ch}");
    assert_eq!(DimensionSpacePoint::empty().to_string(), "{}");
}

#[test]
fn test_point_serializes_as_object() {
    let point = DimensionSpacePoint::new([("language", "en_GB")]);
    let json = serde_json::to_string(&point).unwrap();
    assert_eq!(json, r#"{"language":"en_GB"}"#);

    let origin: OriginDimensionSpacePoint = serde_json::from_str(&json).unwrap();
    assert_eq!(origin.to_dimension_space_point(), point);
}

#[test]
fn test_direct_variant_in_dimension() {
    let a = DimensionSpacePoint::new([("language", "de"), ("market", "ch")]);
    let b = DimensionSpacePoint::new([("language", "gsw"), ("market", "ch")]);
    let c = DimensionSpacePoint::new([("language", "gsw"), ("market", "eu")]);

    assert!(a.is_direct_variant_in_dimension(&b, "language"));
    assert!(!a.is_direct_variant_in_dimension(&c, "language"));
    assert!(!a.is_direct_variant_in_dimension(&b, "market"));
}

#[test]
fn test_set_algebra() {
    let en = DimensionSpacePoint::new([("language", "en_US")]);
    let gb = DimensionSpacePoint::new([("language", "en_GB")]);
    let de = DimensionSpacePoint::new([("language", "de")]);

    let left = DimensionSpacePointSet::new([en.clone(), gb.clone()]);
    let right = DimensionSpacePointSet::new([gb.clone(), de.clone()]);

    assert_eq!(left.intersect(&right), DimensionSpacePointSet::single(gb.clone()));
    assert_eq!(left.difference(&right), DimensionSpacePointSet::single(en.clone()));
    assert_eq!(left.union(&right).len(), 3);
    assert!(DimensionSpacePointSet::single(gb).is_subset_of(&left));
}

fn arb_point() -> impl Strategy<Value = DimensionSpacePoint> {
    prop::collection::btree_map("[a-z]{1,4}", "[a-z_]{1,5}", 0..4).prop_map(DimensionSpacePoint::new)
}

proptest! {
    #[test]
    fn prop_point_json_is_stable(point in arb_point()) {
        let json = serde_json::to_string(&point).unwrap();
        let back: DimensionSpacePoint = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(serde_json::to_string(&back).unwrap(), json);
        prop_assert_eq!(back, point);
    }

    #[test]
    fn prop_with_coordinate_overrides_single_dimension(point in arb_point(), value in "[a-z]{1,3}") {
        let changed = point.with_coordinate("zz", &value);
        prop_assert_eq!(changed.coordinate("zz"), Some(value.as_str()));
        for (dimension, coordinate) in point.coordinates() {
            if dimension != "zz" {
                prop_assert_eq!(changed.coordinate(dimension), Some(coordinate.as_str()));
            }
        }
    }
}
