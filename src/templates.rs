use crate::*;

use askama::Template;
use regex::Regex;
use std::sync::OnceLock;

/// Nutrients shown on the detail page.
const NUTRIENTS_SHOWN: usize = 8;

pub struct RecipeCard {
    pub id: u64,
    pub title: String,
    pub image: String,
    pub used: u32,
    pub missed: u32,
    pub ready_in_minutes: u32,
    pub favorite: bool,
}

impl RecipeCard {
    pub fn from_summary(summary: &RecipeSummary, favorites: &FavoriteSet) -> Self {
        Self {
            id: summary.id,
            title: summary.title.clone(),
            image: summary.image.clone().unwrap_or_default(),
            used: summary.used_ingredient_count,
            missed: summary.missed_ingredient_count,
            ready_in_minutes: summary.ready_in_minutes.unwrap_or(0),
            favorite: favorites.contains(summary.id),
        }
    }

    pub fn from_recipe(recipe: &Recipe) -> Self {
        Self {
            id: recipe.id,
            title: recipe.title.clone(),
            image: recipe.image.clone().unwrap_or_default(),
            used: 0,
            missed: 0,
            ready_in_minutes: recipe.ready_in_minutes.unwrap_or(0),
            favorite: true,
        }
    }
}

pub struct DietOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub ingredients: String,
    pub max_time: String,
    pub diets: Vec<DietOption>,
    pub searched: bool,
    pub cards: Vec<RecipeCard>,
    pub error: String,
    pub recent: Vec<String>,
}

impl IndexTemplate {
    pub fn new(form: &SearchForm, session: &Session) -> Self {
        let diet = form.diet.as_deref().unwrap_or("").trim().to_lowercase();
        let diets = DIETS
            .iter()
            .map(|&(value, label)| DietOption {
                value,
                label,
                selected: value == diet,
            })
            .collect();
        Self {
            ingredients: form.ingredients.clone().unwrap_or_default(),
            max_time: form.max_time.clone().unwrap_or_default(),
            diets,
            searched: false,
            cards: Vec::new(),
            error: String::new(),
            recent: session.recent.iter().cloned().collect(),
        }
    }
}

pub struct NutrientView {
    pub name: String,
    pub amount: String,
}

#[derive(Default)]
pub struct RecipeView {
    pub id: u64,
    pub title: String,
    pub image: String,
    pub ready_in_minutes: u32,
    pub servings: u32,
    pub source_url: String,
    pub ingredients: Vec<String>,
    pub steps: Vec<String>,
    pub nutrients: Vec<NutrientView>,
    pub favorite: bool,
}

impl RecipeView {
    pub fn new(recipe: &Recipe, favorites: &FavoriteSet) -> Self {
        let nutrients = recipe
            .nutrition
            .as_ref()
            .map(|n| {
                n.nutrients
                    .iter()
                    .take(NUTRIENTS_SHOWN)
                    .map(|n| NutrientView {
                        name: n.name.clone(),
                        amount: format!("{:.1} {}", n.amount, n.unit),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self {
            id: recipe.id,
            title: recipe.title.clone(),
            image: recipe.image.clone().unwrap_or_default(),
            ready_in_minutes: recipe.ready_in_minutes.unwrap_or(0),
            servings: recipe.servings.unwrap_or(0),
            source_url: recipe.source_url.clone().unwrap_or_default(),
            ingredients: recipe
                .extended_ingredients
                .iter()
                .map(|i| i.original.clone())
                .collect(),
            steps: plain_paragraphs(recipe.instructions.as_deref().unwrap_or("")),
            nutrients,
            favorite: favorites.contains(recipe.id),
        }
    }
}

#[derive(Template)]
#[template(path = "recipe.html")]
pub struct RecipeTemplate {
    pub recipe: RecipeView,
    pub error: String,
}

impl RecipeTemplate {
    pub fn found(recipe: RecipeView) -> Self {
        Self {
            recipe,
            error: String::new(),
        }
    }

    pub fn failed(error: String) -> Self {
        Self {
            recipe: RecipeView::default(),
            error,
        }
    }
}

#[derive(Template)]
#[template(path = "favorites.html")]
pub struct FavoritesTemplate {
    pub cards: Vec<RecipeCard>,
    pub skipped: usize,
}

#[derive(Template)]
#[template(path = "shopping_list.html")]
pub struct ShoppingListTemplate {
    pub items: Vec<String>,
}

/// Renders `template` with `status`; a render failure becomes a bare 500.
pub fn page<T: Template>(status: StatusCode, template: T) -> response::Response {
    match template.render() {
        Ok(html) => (status, response::Html(html)).into_response(),
        Err(e) => {
            log::error!("{}", RecipeError::from(e));
            (StatusCode::INTERNAL_SERVER_ERROR, "500 Internal Server Error").into_response()
        }
    }
}

/// Matches a well-formed opening, closing or self-closing tag; a bare `<` is left as text.
const TAG_PATTERN: &str = r"</?([A-Za-z][A-Za-z0-9]*)[^<>]*>";

fn tag_regex() -> Option<&'static Regex> {
    static TAG: OnceLock<Option<Regex>> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(TAG_PATTERN).ok()).as_ref()
}

/// Reduces upstream instruction markup to plain-text steps.
pub fn plain_paragraphs(markup: &str) -> Vec<String> {
    let text = match tag_regex() {
        Some(tag) => tag.replace_all(markup, |caps: &regex::Captures| {
            // block-level tags separate steps
            match caps[1].to_ascii_lowercase().as_str() {
                "li" | "p" | "br" | "ol" | "ul" | "div" => "\n",
                _ => "",
            }
        }),
        None => markup.into(),
    };
    html_escape::decode_html_entities(&text)
        .replace('\u{a0}', " ")
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
