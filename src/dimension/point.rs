//! Coordinates in the dimension space.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// An ordered mapping from dimension id to one coordinate value.
///
/// Equality and hashing are by content. The empty point is the only point
/// of a repository configured without dimensions.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct DimensionSpacePoint(BTreeMap<String, String>);

impl DimensionSpacePoint {
    pub fn new<I, K, V>(coordinates: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            coordinates
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn coordinate(&self, dimension_id: &str) -> Option<&str> {
        self.0.get(dimension_id).map(String::as_str)
    }

    pub fn coordinates(&self) -> &BTreeMap<String, String> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a copy with one coordinate replaced (or added).
    pub fn with_coordinate(&self, dimension_id: &str, value: &str) -> Self {
        let mut coordinates = self.0.clone();
        coordinates.insert(dimension_id.to_string(), value.to_string());
        Self(coordinates)
    }

    /// True if both points use the same dimensions and differ at most in `dimension_id`.
    pub fn is_direct_variant_in_dimension(&self, other: &Self, dimension_id: &str) -> bool {
        if self.0.len() != other.0.len() || !self.0.contains_key(dimension_id) {
            return false;
        }
        self.0.iter().all(|(dimension, value)| {
            dimension == dimension_id || other.0.get(dimension) == Some(value)
        })
    }

    pub fn is_in(&self, set: &DimensionSpacePointSet) -> bool {
        set.contains(self)
    }
}

impl fmt::Display for DimensionSpacePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (dimension, value)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", dimension, value)?;
        }
        write!(f, "}}")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for DimensionSpacePoint {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self::new(iter)
    }
}

/// The point at which a node variant's content was authored.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct OriginDimensionSpacePoint(DimensionSpacePoint);

impl OriginDimensionSpacePoint {
    pub fn new<I, K, V>(coordinates: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(DimensionSpacePoint::new(coordinates))
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn to_dimension_space_point(&self) -> DimensionSpacePoint {
        self.0.clone()
    }

    pub fn as_dimension_space_point(&self) -> &DimensionSpacePoint {
        &self.0
    }
}

impl From<DimensionSpacePoint> for OriginDimensionSpacePoint {
    fn from(point: DimensionSpacePoint) -> Self {
        Self(point)
    }
}

impl From<&DimensionSpacePoint> for OriginDimensionSpacePoint {
    fn from(point: &DimensionSpacePoint) -> Self {
        Self(point.clone())
    }
}

impl fmt::Display for OriginDimensionSpacePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An ordered set of dimension space points.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DimensionSpacePointSet(BTreeSet<DimensionSpacePoint>);

impl DimensionSpacePointSet {
    pub fn new<I: IntoIterator<Item = DimensionSpacePoint>>(points: I) -> Self {
        Self(points.into_iter().collect())
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn single(point: DimensionSpacePoint) -> Self {
        Self::new([point])
    }

    pub fn contains(&self, point: &DimensionSpacePoint) -> bool {
        self.0.contains(point)
    }

    pub fn insert(&mut self, point: DimensionSpacePoint) -> bool {
        self.0.insert(point)
    }

    pub fn remove(&mut self, point: &DimensionSpacePoint) -> bool {
        self.0.remove(point)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DimensionSpacePoint> {
        self.0.iter()
    }

    pub fn union(&self, other: &Self) -> Self {
        Self(self.0.union(&other.0).cloned().collect())
    }

    pub fn intersect(&self, other: &Self) -> Self {
        Self(self.0.intersection(&other.0).cloned().collect())
    }

    pub fn difference(&self, other: &Self) -> Self {
        Self(self.0.difference(&other.0).cloned().collect())
    }

    pub fn is_subset_of(&self, other: &Self) -> bool {
        self.0.is_subset(&other.0)
    }
}

impl FromIterator<DimensionSpacePoint> for DimensionSpacePointSet {
    fn from_iter<T: IntoIterator<Item = DimensionSpacePoint>>(iter: T) -> Self {
        Self::new(iter)
    }
}

impl IntoIterator for DimensionSpacePointSet {
    type Item = DimensionSpacePoint;
    type IntoIter = std::collections::btree_set::IntoIter<DimensionSpacePoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a DimensionSpacePointSet {
    type Item = &'a DimensionSpacePoint;
    type IntoIter = std::collections::btree_set::Iter<'a, DimensionSpacePoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for DimensionSpacePointSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, point) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", point)?;
        }
        write!(f, "]")
    }
}
