use crate::*;

use serde_json::json;

async fn get_recipe_by_id(source: &dyn RecipeSource, recipe_id: u64) -> response::Response {
    match source.recipe(recipe_id).await {
        Ok(recipe) => Json(recipe).into_response(),
        Err(RecipeError::NotFound(_)) => {
            log::info!("recipe {} not found", recipe_id);
            (StatusCode::NOT_FOUND, Json(json!({}))).into_response()
        }
        Err(e) => {
            log::warn!("recipe fetch failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({}))).into_response()
        }
    }
}

/// Recipe detail as JSON, used by the browser to rehydrate favorites.
pub async fn get_recipe(
    State(app_state): State<SharedAppState>,
    Path(recipe_id): Path<u64>,
) -> response::Response {
    get_recipe_by_id(app_state.source.as_ref(), recipe_id).await
}
