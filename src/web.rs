use crate::*;

use axum_extra::extract::cookie::CookieJar;

#[derive(Deserialize)]
pub struct ItemForm {
    #[serde(default)]
    item: String,
}

/// Runs a search for the index page and records it in session `id`.
/// Invalid input never reaches `source`.
pub async fn search(
    source: &dyn RecipeSource,
    sessions: &dyn SessionStore,
    id: &str,
    form: &SearchForm,
) -> (StatusCode, IndexTemplate) {
    let snapshot = sessions.get(id).await.unwrap_or_default();
    let mut page = IndexTemplate::new(form, &snapshot);
    page.searched = true;

    let query = match form.validate() {
        Ok(query) => query,
        Err(e) => {
            page.error = e.user_message();
            return (e.status(), page);
        }
    };

    log::info!("recipe search: {:?}", query);
    match source.search(&query).await {
        Ok(found) => {
            let ingredients = query.ingredients.clone();
            let session = sessions
                .update(id, edit(move |s| s.recent.record(&ingredients)))
                .await;
            page.recent = session.recent.iter().cloned().collect();
            page.cards = found
                .iter()
                .map(|summary| RecipeCard::from_summary(summary, &session.favorites))
                .collect();
            (StatusCode::OK, page)
        }
        Err(e) => {
            log::warn!("recipe search failed: {}", e);
            page.error = e.user_message();
            (e.status(), page)
        }
    }
}

pub async fn recipe_page(
    source: &dyn RecipeSource,
    favorites: &FavoriteSet,
    recipe_id: u64,
) -> (StatusCode, RecipeTemplate) {
    match source.recipe(recipe_id).await {
        Ok(recipe) => (
            StatusCode::OK,
            RecipeTemplate::found(RecipeView::new(&recipe, favorites)),
        ),
        Err(e) => {
            log::warn!("recipe fetch failed: {}", e);
            (e.status(), RecipeTemplate::failed(e.user_message()))
        }
    }
}

/// Resolves every favorite; ids that fail to resolve are skipped and counted.
pub async fn resolve_favorites(
    source: &dyn RecipeSource,
    favorites: &FavoriteSet,
) -> (Vec<Recipe>, usize) {
    let mut recipes = Vec::with_capacity(favorites.len());
    let mut skipped = 0;
    for id in favorites.ids() {
        match source.recipe(id).await {
            Ok(recipe) => recipes.push(recipe),
            Err(e) => {
                log::warn!("skipping favorite {}: {}", id, e);
                skipped += 1;
            }
        }
    }
    (recipes, skipped)
}

/// Path of `referer` when it points back into this site.
fn local_path(referer: &str, host: Option<&str>) -> Option<String> {
    let uri: http::Uri = referer.parse().ok()?;
    if let Some(authority) = uri.authority() {
        if host != Some(authority.as_str()) {
            return None;
        }
    }
    let path = uri.path_and_query()?.as_str();
    if !path.starts_with('/') || path.starts_with("//") || path.starts_with("/\\") {
        return None;
    }
    Some(path.to_string())
}

/// Redirects to the referring page of this site, otherwise to `fallback`.
fn back(headers: &HeaderMap, fallback: &str) -> response::Redirect {
    let host = headers
        .get(http::header::HOST)
        .and_then(|v| v.to_str().ok());
    let to = headers
        .get(http::header::REFERER)
        .and_then(|v| v.to_str().ok())
        .and_then(|referer| local_path(referer, host))
        .unwrap_or_else(|| fallback.to_string());
    response::Redirect::to(&to)
}

pub async fn index(
    State(app_state): State<SharedAppState>,
    jar: CookieJar,
    Query(form): Query<SearchForm>,
) -> response::Response {
    if form.ingredients.is_none() {
        let (jar, _, session) = checkout(app_state.sessions.as_ref(), jar).await;
        let template = IndexTemplate::new(&form, &session);
        return (jar, page(StatusCode::OK, template)).into_response();
    }
    let (jar, id) = session_id(jar);
    let (status, template) = search(
        app_state.source.as_ref(),
        app_state.sessions.as_ref(),
        &id,
        &form,
    )
    .await;
    (jar, page(status, template)).into_response()
}

pub async fn post_search(
    State(app_state): State<SharedAppState>,
    jar: CookieJar,
    Form(form): Form<SearchForm>,
) -> response::Response {
    let (jar, id) = session_id(jar);
    let (status, template) = search(
        app_state.source.as_ref(),
        app_state.sessions.as_ref(),
        &id,
        &form,
    )
    .await;
    (jar, page(status, template)).into_response()
}

pub async fn get_recipe(
    State(app_state): State<SharedAppState>,
    jar: CookieJar,
    Path(recipe_id): Path<u64>,
) -> response::Response {
    let (jar, _, session) = checkout(app_state.sessions.as_ref(), jar).await;
    let (status, template) =
        recipe_page(app_state.source.as_ref(), &session.favorites, recipe_id).await;
    (jar, page(status, template)).into_response()
}

pub async fn add_favorite(
    State(app_state): State<SharedAppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Path(recipe_id): Path<u64>,
) -> response::Response {
    let (jar, id) = session_id(jar);
    let change = edit(move |s| {
        if !s.favorites.add(recipe_id) {
            log::debug!("recipe {} already a favorite", recipe_id);
        }
    });
    app_state.sessions.update(&id, change).await;
    (jar, back(&headers, "/favorites")).into_response()
}

pub async fn remove_favorite(
    State(app_state): State<SharedAppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Path(recipe_id): Path<u64>,
) -> response::Response {
    let (jar, id) = session_id(jar);
    let change = edit(move |s| {
        if !s.favorites.remove(recipe_id) {
            log::debug!("recipe {} was not a favorite", recipe_id);
        }
    });
    app_state.sessions.update(&id, change).await;
    (jar, back(&headers, "/favorites")).into_response()
}

pub async fn favorites(State(app_state): State<SharedAppState>, jar: CookieJar) -> response::Response {
    let (jar, _, session) = checkout(app_state.sessions.as_ref(), jar).await;
    let (recipes, skipped) =
        resolve_favorites(app_state.source.as_ref(), &session.favorites).await;
    let template = FavoritesTemplate {
        cards: recipes.iter().map(RecipeCard::from_recipe).collect(),
        skipped,
    };
    (jar, page(StatusCode::OK, template)).into_response()
}

pub async fn shopping_list(
    State(app_state): State<SharedAppState>,
    jar: CookieJar,
) -> response::Response {
    let (jar, _, session) = checkout(app_state.sessions.as_ref(), jar).await;
    let template = ShoppingListTemplate {
        items: session.shopping.items().to_vec(),
    };
    (jar, page(StatusCode::OK, template)).into_response()
}

pub async fn add_item(
    State(app_state): State<SharedAppState>,
    jar: CookieJar,
    Form(form): Form<ItemForm>,
) -> response::Response {
    let (jar, id) = session_id(jar);
    let item = form.item;
    let change = edit(move |s| {
        if !s.shopping.add(&item) {
            log::debug!("ignoring blank shopping list item");
        }
    });
    app_state.sessions.update(&id, change).await;
    (jar, response::Redirect::to("/shopping-list")).into_response()
}

pub async fn remove_item(
    State(app_state): State<SharedAppState>,
    jar: CookieJar,
    Path(index): Path<usize>,
) -> response::Response {
    let (jar, id) = session_id(jar);
    let change = edit(move |s| {
        if s.shopping.remove(index).is_none() {
            log::debug!("no shopping list item at {}", index);
        }
    });
    app_state.sessions.update(&id, change).await;
    (jar, response::Redirect::to("/shopping-list")).into_response()
}

/// Appends every ingredient line of a recipe to the shopping list.
pub async fn add_recipe_items(
    State(app_state): State<SharedAppState>,
    jar: CookieJar,
    Path(recipe_id): Path<u64>,
) -> response::Response {
    let (jar, id) = session_id(jar);
    match app_state.source.recipe(recipe_id).await {
        Ok(recipe) => {
            let lines: Vec<String> = recipe
                .extended_ingredients
                .into_iter()
                .map(|i| i.original)
                .collect();
            let change = edit(move |s| {
                for line in &lines {
                    s.shopping.add(line);
                }
            });
            app_state.sessions.update(&id, change).await;
            (jar, response::Redirect::to("/shopping-list")).into_response()
        }
        Err(e) => {
            log::warn!("recipe fetch for shopping list failed: {}", e);
            let template = RecipeTemplate::failed(e.user_message());
            (jar, page(e.status(), template)).into_response()
        }
    }
}
