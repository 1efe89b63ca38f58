use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::NAME_SEPARATOR;
use crate::error::{DoeError, Result};

/// A sampled parameter and its closed interval. Names follow `<Entity>_<Property>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterRange {
    pub name: String,
    pub lower: f64,
    pub upper: f64,
}

impl ParameterRange {
    pub fn new(name: impl Into<String>, lower: f64, upper: f64) -> Self {
        Self { name: name.into(), lower, upper }
    }

    /// Affine map from the unit interval onto `[lower, upper]`.
    pub fn scale(&self, u: f64) -> f64 {
        let value = self.lower + u * (self.upper - self.lower);
        // Guards the upper end against rounding in the affine map.
        value.clamp(self.lower, self.upper)
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// Ordered, name-unique collection of parameter ranges.
/// Insertion order is the column order of every derived matrix and table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSet {
    ranges: Vec<ParameterRange>,
    index: HashMap<String, usize>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ranges<I>(ranges: I) -> Result<Self>
    where
        I: IntoIterator<Item = ParameterRange>,
    {
        let mut set = Self::new();
        for range in ranges {
            set.push(range)?;
        }
        Ok(set)
    }

    /// Append a range, rejecting duplicates, inverted and non-finite bounds.
    pub fn push(&mut self, range: ParameterRange) -> Result<()> {
        if self.index.contains_key(&range.name) {
            return Err(DoeError::DuplicateParameter { name: range.name });
        }
        if !range.lower.is_finite() || !range.upper.is_finite() || range.lower > range.upper {
            return Err(DoeError::InvalidRange {
                name: range.name,
                lower: range.lower,
                upper: range.upper,
            });
        }
        self.index.insert(range.name.clone(), self.ranges.len());
        self.ranges.push(range);
        Ok(())
    }

    /// Builder-style `push` for literal parameter lists.
    pub fn with(mut self, name: &str, lower: f64, upper: f64) -> Result<Self> {
        self.push(ParameterRange::new(name, lower, upper))?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn get(&self, name: &str) -> Option<&ParameterRange> {
        self.index_of(name).map(|i| &self.ranges[i])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ParameterRange> {
        self.ranges.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.ranges.iter().map(|r| r.name.as_str())
    }
}

impl<'a> IntoIterator for &'a ParameterSet {
    type Item = &'a ParameterRange;
    type IntoIter = std::slice::Iter<'a, ParameterRange>;

    fn into_iter(self) -> Self::IntoIter {
        self.ranges.iter()
    }
}

/// Split a flattened name on its first separator: `Mat_E` -> (`Mat`, Some(`E`)),
/// `Piers_top_w` -> (`Piers`, Some(`top_w`)), `Mat` -> (`Mat`, None).
pub fn split_param_name(name: &str) -> (&str, Option<&str>) {
    match name.split_once(NAME_SEPARATOR) {
        Some((entity, property)) => (entity, Some(property)),
        None => (name, None),
    }
}

/// Inverse of [`split_param_name`] for names that carry a property.
pub fn join_param_name(entity: &str, property: &str) -> String {
    format!("{}{}{}", entity, NAME_SEPARATOR, property)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_on_first_separator_only() {
        assert_eq!(split_param_name("Mat_E"), ("Mat", Some("E")));
        assert_eq!(split_param_name("Piers_top_w"), ("Piers", Some("top_w")));
        assert_eq!(split_param_name("Mat"), ("Mat", None));
        assert_eq!(split_param_name("Mat_"), ("Mat", Some("")));
    }

    #[test]
    fn join_round_trips_split() {
        for name in ["Mat_E", "Damaged_Ehor", "Piers_top_w"] {
            let (entity, property) = split_param_name(name);
            assert_eq!(join_param_name(entity, property.unwrap()), name);
        }
    }

    #[test]
    fn set_preserves_insertion_order_and_rejects_duplicates() {
        let set = ParameterSet::new()
            .with("Mat_w", 10.0, 20.0)
            .and_then(|s| s.with("Mat_E", 1000.0, 5000.0))
            .unwrap();
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["Mat_w", "Mat_E"]);
        assert_eq!(set.index_of("Mat_E"), Some(1));

        let err = set.clone().with("Mat_w", 0.0, 1.0).unwrap_err();
        assert!(matches!(err, DoeError::DuplicateParameter { .. }));
    }

    #[test]
    fn inverted_or_infinite_ranges_are_rejected() {
        assert!(ParameterSet::new().with("A_x", 2.0, 1.0).is_err());
        assert!(ParameterSet::new().with("A_x", 0.0, f64::INFINITY).is_err());
        // Degenerate point ranges are allowed.
        assert!(ParameterSet::new().with("A_x", 1.0, 1.0).is_ok());
    }

    #[test]
    fn scale_maps_unit_interval_onto_range() {
        let r = ParameterRange::new("Mat_E", 1000.0, 5000.0);
        assert_eq!(r.scale(0.0), 1000.0);
        assert_eq!(r.scale(0.5), 3000.0);
        assert!(r.contains(r.scale(1.0 - 1e-16)));
    }
}
