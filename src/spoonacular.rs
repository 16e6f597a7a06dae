use crate::*;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;

pub const DEFAULT_API_BASE: &str = "https://api.spoonacular.com";

/// Where recipes come from. Every call is one independent upstream request.
#[async_trait]
pub trait RecipeSource: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<RecipeSummary>, RecipeError>;
    async fn recipe(&self, id: u64) -> Result<Recipe, RecipeError>;
}

pub struct Spoonacular {
    client: Client,
    base: String,
    api_key: String,
    results: u32,
}

#[derive(Deserialize)]
struct ComplexSearch {
    #[serde(default)]
    results: Vec<RecipeSummary>,
}

impl Spoonacular {
    pub fn new(base: &str, api_key: String, results: u32) -> Result<Self, RecipeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(RecipeError::Unreachable)?;
        Ok(Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            api_key,
            results,
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, RecipeError> {
        let url = format!("{}{}", self.base, path);
        let response = self
            .client
            .get(&url)
            .query(&[("apiKey", self.api_key.as_str())])
            .query(params)
            .send()
            .await
            .map_err(RecipeError::Unreachable)?;
        let status = response.status();
        if !status.is_success() {
            return Err(RecipeError::Rejected(status));
        }
        response.json::<T>().await.map_err(|e| {
            if e.is_decode() {
                RecipeError::Malformed(e)
            } else {
                RecipeError::Unreachable(e)
            }
        })
    }
}

#[async_trait]
impl RecipeSource for Spoonacular {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<RecipeSummary>, RecipeError> {
        let number = self.results.to_string();
        if !query.has_filters() {
            let params = [
                ("ingredients", query.ingredients.clone()),
                ("number", number),
                ("ranking", "1".to_string()),
                ("ignorePantry", "true".to_string()),
            ];
            return self.get("/recipes/findByIngredients", &params).await;
        }

        // findByIngredients has no diet or time filters
        let mut params = vec![
            ("includeIngredients", query.ingredients.clone()),
            ("number", number),
            ("fillIngredients", "true".to_string()),
            ("addRecipeInformation", "true".to_string()),
            ("sort", "max-used-ingredients".to_string()),
        ];
        if let Some(diet) = &query.diet {
            params.push(("diet", diet.clone()));
        }
        if let Some(max_time) = query.max_time {
            params.push(("maxReadyTime", max_time.to_string()));
        }
        let found: ComplexSearch = self.get("/recipes/complexSearch", &params).await?;
        Ok(found.results)
    }

    async fn recipe(&self, id: u64) -> Result<Recipe, RecipeError> {
        let path = format!("/recipes/{id}/information");
        let params = [("includeNutrition", "true".to_string())];
        match self.get(&path, &params).await {
            Err(RecipeError::Rejected(StatusCode::NOT_FOUND)) => Err(RecipeError::NotFound(id)),
            result => result,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    use axum::{extract::Query, routing::get, Json, Router};
    use serde_json::json;

    async fn stub_upstream() -> String {
        async fn by_ingredients(Query(q): Query<HashMap<String, String>>) -> response::Response {
            if q.get("apiKey").map(String::as_str) != Some("test-key") {
                return StatusCode::UNAUTHORIZED.into_response();
            }
            assert_eq!(q.get("ingredients").map(String::as_str), Some("chicken,rice"));
            Json(json!([
                {"id": 1, "title": "Chicken Rice", "image": "https://img.example/1.jpg",
                 "usedIngredientCount": 2, "missedIngredientCount": 0, "likes": 3}
            ]))
            .into_response()
        }

        async fn complex(Query(q): Query<HashMap<String, String>>) -> response::Response {
            assert_eq!(q.get("diet").map(String::as_str), Some("vegan"));
            assert_eq!(q.get("maxReadyTime").map(String::as_str), Some("20"));
            Json(json!({"results": [
                {"id": 9, "title": "Tofu Bowl", "image": "https://img.example/9.jpg",
                 "readyInMinutes": 15, "usedIngredientCount": 1, "missedIngredientCount": 2}
            ], "totalResults": 1}))
            .into_response()
        }

        async fn information(Path(id): Path<u64>) -> response::Response {
            match id {
                1 => Json(json!({"id": 1, "title": "Chicken Rice", "readyInMinutes": 30,
                    "extendedIngredients": [{"id": 5, "original": "1 cup rice"}],
                    "nutrition": {"nutrients": [{"name": "Calories", "amount": 400.0, "unit": "kcal"}]}}))
                .into_response(),
                2 => StatusCode::NOT_FOUND.into_response(),
                3 => (StatusCode::OK, "<html>oops</html>").into_response(),
                _ => StatusCode::PAYMENT_REQUIRED.into_response(),
            }
        }

        let app = Router::new()
            .route("/recipes/findByIngredients", get(by_ingredients))
            .route("/recipes/complexSearch", get(complex))
            .route("/recipes/{id}/information", get(information));
        let listener = net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}/")
    }

    fn query(ingredients: &str) -> SearchQuery {
        SearchQuery {
            ingredients: ingredients.to_string(),
            diet: None,
            max_time: None,
        }
    }

    #[tokio::test]
    async fn search_by_ingredients() {
        let base = stub_upstream().await;
        let api = Spoonacular::new(&base, "test-key".to_string(), 12).unwrap();
        let found = api.search(&query("chicken,rice")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 1);
        assert_eq!(found[0].title, "Chicken Rice");
        assert_eq!(found[0].image.as_deref(), Some("https://img.example/1.jpg"));
        assert_eq!(found[0].used_ingredient_count, 2);
    }

    #[tokio::test]
    async fn filtered_search_uses_complex_search() {
        let base = stub_upstream().await;
        let api = Spoonacular::new(&base, "test-key".to_string(), 12).unwrap();
        let mut q = query("tofu");
        q.diet = Some("vegan".to_string());
        q.max_time = Some(20);
        let found = api.search(&q).await.unwrap();
        assert_eq!(found[0].id, 9);
        assert_eq!(found[0].ready_in_minutes, Some(15));
    }

    #[tokio::test]
    async fn wrong_key_is_rejected() {
        let base = stub_upstream().await;
        let api = Spoonacular::new(&base, "nope".to_string(), 12).unwrap();
        let err = api.search(&query("chicken,rice")).await.unwrap_err();
        assert!(matches!(err, RecipeError::Rejected(StatusCode::UNAUTHORIZED)));
    }

    #[tokio::test]
    async fn detail_error_taxonomy() {
        let base = stub_upstream().await;
        let api = Spoonacular::new(&base, "test-key".to_string(), 12).unwrap();

        let recipe = api.recipe(1).await.unwrap();
        assert_eq!(recipe.ready_in_minutes, Some(30));
        assert_eq!(recipe.nutrition.unwrap().nutrients[0].name, "Calories");

        assert!(matches!(api.recipe(2).await, Err(RecipeError::NotFound(2))));
        assert!(matches!(api.recipe(3).await, Err(RecipeError::Malformed(_))));
        assert!(matches!(
            api.recipe(4).await,
            Err(RecipeError::Rejected(StatusCode::PAYMENT_REQUIRED))
        ));
    }

    #[tokio::test]
    async fn unreachable_upstream() {
        let listener = net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let api = Spoonacular::new(&format!("http://{addr}"), "test-key".to_string(), 12).unwrap();
        assert!(matches!(api.recipe(1).await, Err(RecipeError::Unreachable(_))));
    }
}
