//! The inter-dimensional variation graph.
//!
//! Every allowed dimension space point is a vertex. A point `g` generalizes a
//! point `s` if, in every dimension, `g`'s value equals or is an ancestor of
//! `s`'s value. Each relation carries a weight: the per-dimension depth
//! differences, normalized so that the dimension with highest priority
//! dominates. Queries return related points ordered by ascending weight; ties
//! are broken by the allowed-combination enumeration order.

use super::point::{DimensionSpacePoint, DimensionSpacePointSet};
use super::source::ContentDimensionSource;
use crate::domain::errors::ContentRepositoryError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How one point relates to another in the variation graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantType {
    Same,
    Specialization,
    Generalization,
    Peer,
}

#[derive(Debug, Clone)]
pub struct InterDimensionalVariationGraph {
    points: Vec<DimensionSpacePoint>,
    index: HashMap<DimensionSpacePoint, usize>,
    /// Per point: (weight, index) of every generalization, ascending.
    generalizations: Vec<Vec<(u64, usize)>>,
    /// Per point: (weight, index) of every specialization, ascending.
    specializations: Vec<Vec<(u64, usize)>>,
}

impl InterDimensionalVariationGraph {
    pub fn new(source: &ContentDimensionSource) -> Self {
        let points = source.allowed_combinations();
        let index: HashMap<DimensionSpacePoint, usize> = points
            .iter()
            .enumerate()
            .map(|(i, p)| (p.clone(), i))
            .collect();

        let base = u64::from(
            source
                .dimensions()
                .iter()
                .map(|d| d.max_depth())
                .max()
                .unwrap_or(0),
        ) + 1;
        let dimension_count = source.dimensions().len();

        let mut generalizations = vec![Vec::new(); points.len()];
        let mut specializations = vec![Vec::new(); points.len()];

        for (s, specialization) in points.iter().enumerate() {
            for (g, generalization) in points.iter().enumerate() {
                if s == g {
                    continue;
                }
                let mut weight = 0u64;
                let mut related = true;
                for (position, dimension) in source.dimensions().iter().enumerate() {
                    let (Some(general), Some(specific)) = (
                        generalization.coordinate(dimension.id()),
                        specialization.coordinate(dimension.id()),
                    ) else {
                        related = false;
                        break;
                    };
                    if !dimension.is_generalization_or_same(general, specific) {
                        related = false;
                        break;
                    }
                    let depth = |value: &str| dimension.value(value).map(|v| v.depth).unwrap_or(0);
                    let difference = u64::from(depth(specific) - depth(general));
                    let exponent = (dimension_count - 1 - position) as u32;
                    weight += difference * base.pow(exponent);
                }
                if related {
                    generalizations[s].push((weight, g));
                    specializations[g].push((weight, s));
                }
            }
        }
        for list in generalizations.iter_mut().chain(specializations.iter_mut()) {
            list.sort();
        }

        Self {
            points,
            index,
            generalizations,
            specializations,
        }
    }

    /// All allowed points in enumeration order.
    pub fn points(&self) -> &[DimensionSpacePoint] {
        &self.points
    }

    pub fn allowed_subspace(&self) -> DimensionSpacePointSet {
        self.points.iter().cloned().collect()
    }

    pub fn contains(&self, point: &DimensionSpacePoint) -> bool {
        self.index.contains_key(point)
    }

    pub fn require_allowed(&self, point: &DimensionSpacePoint) -> Result<(), ContentRepositoryError> {
        if self.contains(point) {
            Ok(())
        } else {
            Err(ContentRepositoryError::DimensionSpacePointNotFound {
                dimension_space_point: point.clone(),
            })
        }
    }

    /// Every generalization of `point`, closest first. Excludes `point`.
    pub fn generalizations(&self, point: &DimensionSpacePoint) -> Vec<&DimensionSpacePoint> {
        self.related(&self.generalizations, point)
    }

    /// Every specialization of `point`, closest first. Excludes `point`.
    pub fn specializations(&self, point: &DimensionSpacePoint) -> Vec<&DimensionSpacePoint> {
        self.related(&self.specializations, point)
    }

    /// Generalizations paired with their weight, closest first.
    pub fn weighted_generalizations(
        &self,
        point: &DimensionSpacePoint,
    ) -> Vec<(u64, &DimensionSpacePoint)> {
        match self.index.get(point) {
            Some(i) => self.generalizations[*i]
                .iter()
                .map(|(w, g)| (*w, &self.points[*g]))
                .collect(),
            None => Vec::new(),
        }
    }

    fn related<'a>(
        &'a self,
        relation: &'a [Vec<(u64, usize)>],
        point: &DimensionSpacePoint,
    ) -> Vec<&'a DimensionSpacePoint> {
        match self.index.get(point) {
            Some(i) => relation[*i].iter().map(|(_, j)| &self.points[*j]).collect(),
            None => Vec::new(),
        }
    }

    pub fn primary_generalization(&self, point: &DimensionSpacePoint) -> Option<&DimensionSpacePoint> {
        self.generalizations(point).into_iter().next()
    }

    /// Points without any generalization.
    pub fn root_generalizations(&self) -> Vec<&DimensionSpacePoint> {
        self.points
            .iter()
            .enumerate()
            .filter(|(i, _)| self.generalizations[*i].is_empty())
            .map(|(_, p)| p)
            .collect()
    }

    /// `origin` (optionally) plus all its specializations, minus `excluded`.
    pub fn specialization_set(
        &self,
        origin: &DimensionSpacePoint,
        include_origin: bool,
        excluded: &DimensionSpacePointSet,
    ) -> DimensionSpacePointSet {
        let mut set = DimensionSpacePointSet::empty();
        if include_origin && !excluded.contains(origin) {
            set.insert(origin.clone());
        }
        for specialization in self.specializations(origin) {
            if !excluded.contains(specialization) {
                set.insert(specialization.clone());
            }
        }
        set
    }

    /// Relation of `subject` to `object`.
    pub fn variant_type(
        &self,
        subject: &DimensionSpacePoint,
        object: &DimensionSpacePoint,
    ) -> VariantType {
        if subject == object {
            VariantType::Same
        } else if self.is_specialization_of(subject, object) {
            VariantType::Specialization
        } else if self.is_specialization_of(object, subject) {
            VariantType::Generalization
        } else {
            VariantType::Peer
        }
    }

    pub fn is_specialization_of(
        &self,
        specialization: &DimensionSpacePoint,
        generalization: &DimensionSpacePoint,
    ) -> bool {
        match (self.index.get(specialization), self.index.get(generalization)) {
            (Some(s), Some(g)) => self.generalizations[*s].iter().any(|(_, j)| j == g),
            _ => false,
        }
    }

    /// Walks the generalizations of `point` closest first and returns the
    /// first one whose `dimension_id` coordinate equals `required_value`.
    pub fn find_closest_generalization_matching_coordinate(
        &self,
        point: &DimensionSpacePoint,
        dimension_id: &str,
        required_value: &str,
    ) -> Option<&DimensionSpacePoint> {
        self.generalizations(point)
            .into_iter()
            .find(|g| g.coordinate(dimension_id) == Some(required_value))
    }
}

#[cfg(test)]
#[path = "tests/variation_graph_tests.rs"]
mod tests;
