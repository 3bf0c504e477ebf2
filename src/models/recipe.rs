// ABOUTME: Recipe and ingredient models consumed by the planner
// ABOUTME: Nutrition is precomputed upstream; the solver never derives it from ingredients
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Mealplanner Contributors

use serde::{Deserialize, Serialize};

use super::nutrition::Nutrition;

/// Normalize an ingredient or food name for matching.
///
/// Exclusion lists, liked-food lists, and scalable carb sources all match on
/// the normalized form.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// A single ingredient in a recipe.
///
/// `is_to_taste` items (salt, pepper, herbs) carry no nutritional weight but
/// still participate in exclusion matching: a user allergic to black pepper is
/// allergic to "to taste" black pepper too.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ingredient {
    /// Normalized ingredient name
    pub name: String,
    /// Quantity in `unit`; zero for "to taste" items
    pub quantity: f64,
    /// Unit label, e.g. `"g"`, `"ml"`, `"piece"`
    pub unit: String,
    /// True when the ingredient is "to taste" and excluded from nutrition
    #[serde(default)]
    pub is_to_taste: bool,
}

impl Ingredient {
    /// New ingredient with explicit quantity.
    #[must_use]
    pub fn new(name: impl Into<String>, quantity: f64, unit: impl Into<String>) -> Self {
        Self {
            name: normalize_name(&name.into()),
            quantity,
            unit: unit.into(),
            is_to_taste: false,
        }
    }

    /// New "to taste" ingredient with zero nutritional weight.
    #[must_use]
    pub fn to_taste(name: impl Into<String>) -> Self {
        Self {
            name: normalize_name(&name.into()),
            quantity: 0.0,
            unit: "to taste".into(),
            is_to_taste: true,
        }
    }
}

/// A recipe as consumed by the planner.
///
/// `nutrition` is computed upstream (ingredient parsing and nutrient lookup
/// are collaborator concerns). `primary_carb_contribution` is the nutrition
/// contributed by the recipe's main carbohydrate ingredient; together with
/// `primary_carb_source` it enables the optional downscaling variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    /// Unique id; ids order lexicographically for deterministic tie-breaking
    pub id: String,
    /// Display name
    pub name: String,
    /// Ingredient list
    pub ingredients: Vec<Ingredient>,
    /// Total cooking time in minutes
    pub cooking_time_minutes: u16,
    /// Precomputed nutrition for the whole recipe
    pub nutrition: Nutrition,
    /// Nutrition contributed by the primary carb ingredient, if identified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_carb_contribution: Option<Nutrition>,
    /// Normalized name of the primary carb ingredient, if identified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_carb_source: Option<String>,
}

impl Recipe {
    /// Create a recipe with the fields every pool entry needs.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        cooking_time_minutes: u16,
        nutrition: Nutrition,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ingredients: Vec::new(),
            cooking_time_minutes,
            nutrition,
            primary_carb_contribution: None,
            primary_carb_source: None,
        }
    }

    /// Add one ingredient.
    #[must_use]
    pub fn with_ingredient(mut self, ingredient: Ingredient) -> Self {
        self.ingredients.push(ingredient);
        self
    }

    /// Add several ingredients.
    #[must_use]
    pub fn with_ingredients(mut self, ingredients: Vec<Ingredient>) -> Self {
        self.ingredients.extend(ingredients);
        self
    }

    /// Declare the primary carbohydrate ingredient and its contribution.
    #[must_use]
    pub fn with_primary_carb(
        mut self,
        source: impl Into<String>,
        contribution: Nutrition,
    ) -> Self {
        self.primary_carb_source = Some(normalize_name(&source.into()));
        self.primary_carb_contribution = Some(contribution);
        self
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_normalized_on_construction() {
        let ing = Ingredient::new("  White Rice ", 120.0, "g");
        assert_eq!(ing.name, "white rice");
        assert!(!ing.is_to_taste);

        let seasoning = Ingredient::to_taste("Black Pepper");
        assert_eq!(seasoning.name, "black pepper");
        assert!(seasoning.is_to_taste);
        assert_eq!(seasoning.quantity, 0.0);
    }

    #[test]
    fn primary_carb_source_is_normalized() {
        let recipe = Recipe::new("bowl", "Bowl", 20, Nutrition::new(700.0, 30.0, 18.0, 95.0))
            .with_primary_carb(" White Rice ", Nutrition::new(300.0, 5.0, 1.0, 65.0));
        assert_eq!(recipe.primary_carb_source.as_deref(), Some("white rice"));
        assert!(recipe.primary_carb_contribution.is_some());
    }
}
