use crate::RecipeError;

use serde::{Deserialize, Serialize};

/// Diets the search endpoint understands, as `(value, label)` pairs.
pub const DIETS: &[(&str, &str)] = &[
    ("gluten free", "Gluten free"),
    ("ketogenic", "Ketogenic"),
    ("vegetarian", "Vegetarian"),
    ("lacto-vegetarian", "Lacto-vegetarian"),
    ("ovo-vegetarian", "Ovo-vegetarian"),
    ("vegan", "Vegan"),
    ("pescetarian", "Pescetarian"),
    ("paleo", "Paleo"),
    ("primal", "Primal"),
    ("low fodmap", "Low FODMAP"),
    ("whole30", "Whole30"),
];

/// One hit from an ingredient search.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeSummary {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub used_ingredient_count: u32,
    #[serde(default)]
    pub missed_ingredient_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_in_minutes: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub ready_in_minutes: Option<u32>,
    #[serde(default)]
    pub servings: Option<u32>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub extended_ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub nutrition: Option<Nutrition>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Ingredient {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub original: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Nutrition {
    #[serde(default)]
    pub nutrients: Vec<Nutrient>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Nutrient {
    pub name: String,
    pub amount: f64,
    pub unit: String,
}

/// Raw search form, as posted by the browser or given in the query string.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SearchForm {
    pub ingredients: Option<String>,
    pub diet: Option<String>,
    pub max_time: Option<String>,
}

/// A validated search.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchQuery {
    /// Comma separated, trimmed and lowercased, e.g. `chicken,rice`.
    pub ingredients: String,
    pub diet: Option<String>,
    pub max_time: Option<u32>,
}

impl SearchQuery {
    pub fn has_filters(&self) -> bool {
        self.diet.is_some() || self.max_time.is_some()
    }
}

fn non_blank(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl SearchForm {
    pub fn validate(&self) -> Result<SearchQuery, RecipeError> {
        let ingredients: Vec<String> = self
            .ingredients
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(|i| i.trim().to_lowercase())
            .filter(|i| !i.is_empty())
            .collect();
        if ingredients.is_empty() {
            return Err(RecipeError::Invalid(
                "Please enter at least one ingredient.".to_string(),
            ));
        }

        let diet = match non_blank(&self.diet) {
            None => None,
            Some(diet) => {
                let diet = diet.to_lowercase();
                if !DIETS.iter().any(|(value, _)| *value == diet) {
                    return Err(RecipeError::Invalid(format!("Unknown diet \"{diet}\".")));
                }
                Some(diet)
            }
        };

        let max_time = match non_blank(&self.max_time) {
            None => None,
            Some(minutes) => match minutes.parse::<u32>() {
                Ok(minutes) if minutes > 0 => Some(minutes),
                _ => {
                    return Err(RecipeError::Invalid(
                        "Max cook time must be a positive number of minutes.".to_string(),
                    ));
                }
            },
        };

        Ok(SearchQuery {
            ingredients: ingredients.join(","),
            diet,
            max_time,
        })
    }
}
