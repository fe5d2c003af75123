//! Census figures derived from the grid, for display only.

use crate::model::GridDataElement;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use utoipa::ToSchema;

/// Occupancy counts for a grid.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Census {
    /// Filled locations that are part of the layout.
    pub filled: usize,
    /// Locations in the layout.
    pub total: usize,
    /// Filled locations per non-blank team name.
    pub teams: BTreeMap<String, usize>,
}

impl Census {
    pub fn compute(location_layout: &[String], grid_data: &[GridDataElement]) -> Self {
        let in_layout: HashSet<&str> = location_layout.iter().map(String::as_str).collect();

        let mut census = Census {
            total: in_layout.len(),
            ..Census::default()
        };

        for element in grid_data
            .iter()
            .filter(|e| e.is_filled() && in_layout.contains(e.location.as_str()))
        {
            census.filled += 1;
            let team = element.team.trim();
            if !team.is_empty() {
                *census.teams.entry(team.to_string()).or_insert(0) += 1;
            }
        }

        census
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient(location: &str, team: &str) -> GridDataElement {
        GridDataElement {
            last_name: "Doe".into(),
            team: team.into(),
            ..GridDataElement::blank("", location)
        }
    }

    #[test]
    fn counts_filled_slots_and_teams() {
        let layout: Vec<String> = ["1", "2", "3", "4"].iter().map(|s| s.to_string()).collect();
        let grid = vec![
            patient("1", "Red"),
            patient("2", " Red "),
            patient("3", ""),
            GridDataElement::blank("", "4"),
        ];

        let census = Census::compute(&layout, &grid);
        assert_eq!(census.total, 4);
        assert_eq!(census.filled, 3);
        assert_eq!(census.teams.get("Red"), Some(&2));
        assert_eq!(census.teams.len(), 1);
    }

    #[test]
    fn ignores_elements_outside_the_layout() {
        let layout = vec!["1".to_string()];
        let grid = vec![patient("1", "Blue"), patient("orphan", "Blue")];
        let census = Census::compute(&layout, &grid);
        assert_eq!(census.filled, 1);
        assert_eq!(census.teams.get("Blue"), Some(&1));
    }

    #[test]
    fn empty_grid_has_zero_counts() {
        assert_eq!(Census::compute(&[], &[]), Census::default());
    }
}
