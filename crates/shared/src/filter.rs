use serde::{Deserialize, Serialize};

use crate::models::{Category, RadiusKm};

/// User-selected filters for the nearby query.
///
/// Setters report whether the value actually changed; only a change counts
/// as a filter event downstream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    category: Category,
    radius: RadiusKm,
}

impl FilterState {
    pub fn new(category: Category, radius: RadiusKm) -> Self {
        Self { category, radius }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn radius(&self) -> RadiusKm {
        self.radius
    }

    pub fn set_category(&mut self, category: Category) -> bool {
        if self.category == category {
            return false;
        }
        self.category = category;
        true
    }

    pub fn set_radius(&mut self, radius: RadiusKm) -> bool {
        if self.radius == radius {
            return false;
        }
        self.radius = radius;
        true
    }
}
