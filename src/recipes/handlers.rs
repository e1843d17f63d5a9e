use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use sqlx::PgPool;
use tracing::{instrument, warn};

use super::dto::{
    CreateAttrRequest, IngredientListQuery, IngredientResponse, RecipeDetail, RecipeImageResponse,
    RecipeListItem, RecipeListQuery, RecipePatchRequest, RecipeWriteRequest, TagResponse,
};
use super::repo::{self, Recipe};
use super::services;
use crate::auth::extractors::AuthUser;
use crate::error::ApiError;
use crate::media;
use crate::state::AppState;

const PRESIGN_TTL_SECS: u64 = 600;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tags", get(list_tags).post(create_tag))
        .route("/ingredients", get(list_ingredients).post(create_ingredient))
        .route("/recipe", get(list_recipes).post(create_recipe))
        .route(
            "/recipe/:id",
            get(get_recipe)
                .put(put_recipe)
                .patch(patch_recipe)
                .delete(delete_recipe),
        )
        .route(
            "/recipe/:id/upload-image",
            post(upload_image).layer(DefaultBodyLimit::max(10 * 1024 * 1024)),
        )
        .route("/recipe/:id/image", get(image_redirect))
}

// --- tags & ingredients ---

#[instrument(skip(state))]
pub async fn list_tags(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<TagResponse>>, ApiError> {
    let tags = repo::list_tags(&state.db, user_id).await?;
    Ok(Json(tags.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state, payload))]
pub async fn create_tag(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateAttrRequest>,
) -> Result<(StatusCode, Json<TagResponse>), ApiError> {
    services::check_name(&payload.name)?;
    let tag = repo::create_tag(&state.db, user_id, payload.name.trim()).await?;
    Ok((StatusCode::CREATED, Json(tag.into())))
}

#[instrument(skip(state))]
pub async fn list_ingredients(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<IngredientListQuery>,
) -> Result<Json<Vec<IngredientResponse>>, ApiError> {
    let assigned_only = services::parse_flag("assigned_only", query.assigned_only.as_deref())?;
    let ingredients = repo::list_ingredients(&state.db, user_id, assigned_only).await?;
    Ok(Json(ingredients.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state, payload))]
pub async fn create_ingredient(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateAttrRequest>,
) -> Result<(StatusCode, Json<IngredientResponse>), ApiError> {
    services::check_name(&payload.name)?;
    let ingredient = repo::create_ingredient(&state.db, user_id, payload.name.trim()).await?;
    Ok((StatusCode::CREATED, Json(ingredient.into())))
}

// --- recipes ---

async fn to_list_item(db: &PgPool, recipe: Recipe) -> Result<RecipeListItem, ApiError> {
    let tags = repo::linked_tag_ids(db, recipe.id).await?;
    let ingredients = repo::linked_ingredient_ids(db, recipe.id).await?;
    Ok(RecipeListItem {
        id: recipe.id,
        title: recipe.title,
        time_minutes: recipe.time_minutes,
        price: recipe.price,
        link: recipe.link,
        tags,
        ingredients,
    })
}

async fn to_detail(db: &PgPool, recipe: Recipe) -> Result<RecipeDetail, ApiError> {
    let tags = repo::linked_tags(db, recipe.id).await?;
    let ingredients = repo::linked_ingredients(db, recipe.id).await?;
    Ok(RecipeDetail {
        id: recipe.id,
        title: recipe.title,
        time_minutes: recipe.time_minutes,
        price: recipe.price,
        link: recipe.link,
        image: recipe.image,
        tags: tags.into_iter().map(Into::into).collect(),
        ingredients: ingredients.into_iter().map(Into::into).collect(),
    })
}

#[instrument(skip(state))]
pub async fn list_recipes(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<RecipeListQuery>,
) -> Result<Json<Vec<RecipeListItem>>, ApiError> {
    let tag_ids = services::parse_id_list("tags", query.tags.as_deref())?;
    let ingredient_ids = services::parse_id_list("ingredients", query.ingredients.as_deref())?;
    let recipes = repo::list_recipes(
        &state.db,
        user_id,
        tag_ids.as_deref(),
        ingredient_ids.as_deref(),
    )
    .await?;

    let mut items = Vec::with_capacity(recipes.len());
    for recipe in recipes {
        items.push(to_list_item(&state.db, recipe).await?);
    }
    Ok(Json(items))
}

#[instrument(skip(state, payload))]
pub async fn create_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<RecipeWriteRequest>,
) -> Result<(StatusCode, Json<RecipeListItem>), ApiError> {
    let recipe = services::create_recipe(&state.db, user_id, payload).await?;
    let item = to_list_item(&state.db, recipe).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

#[instrument(skip(state))]
pub async fn get_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<RecipeDetail>, ApiError> {
    let recipe = repo::find_recipe(&state.db, user_id, id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(to_detail(&state.db, recipe).await?))
}

#[instrument(skip(state, payload))]
pub async fn put_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<RecipeWriteRequest>,
) -> Result<Json<RecipeListItem>, ApiError> {
    let recipe = services::replace_recipe(&state.db, user_id, id, payload).await?;
    Ok(Json(to_list_item(&state.db, recipe).await?))
}

#[instrument(skip(state, payload))]
pub async fn patch_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<RecipePatchRequest>,
) -> Result<Json<RecipeListItem>, ApiError> {
    let recipe = services::patch_recipe(&state.db, user_id, id, payload).await?;
    Ok(Json(to_list_item(&state.db, recipe).await?))
}

#[instrument(skip(state))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if !repo::delete_recipe(&state.db, user_id, id).await? {
        return Err(ApiError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /recipe/:id/upload-image (multipart, field `image`)
#[instrument(skip(state, multipart))]
pub async fn upload_image(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Result<Json<RecipeImageResponse>, ApiError> {
    let recipe = repo::find_recipe(&state.db, user_id, id)
        .await?
        .ok_or(ApiError::NotFound)?;

    let mut upload = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("image") {
            let bytes = field
                .bytes()
                .await
                .map_err(|_| ApiError::field("image", "could not read the uploaded file"))?;
            upload = Some(bytes);
        }
    }
    let Some(bytes) = upload else {
        return Err(ApiError::field("image", "no file was submitted"));
    };

    let Some(format) = media::sniff_image(&bytes) else {
        return Err(ApiError::field(
            "image",
            "upload a valid image; the submitted file is not an image",
        ));
    };

    let key = media::recipe_image_key(format);
    state
        .storage
        .put_object(&key, bytes, format.content_type())
        .await?;

    if let Some(old) = &recipe.image {
        if let Err(e) = state.storage.delete_object(old).await {
            warn!(error = %e, key = %old, "failed to delete replaced image");
        }
    }

    repo::set_image(&state.db, recipe.id, &key).await?;
    Ok(Json(RecipeImageResponse {
        id: recipe.id,
        image: Some(key),
    }))
}

/// 302 to a presigned GET for the stored image.
#[instrument(skip(state))]
pub async fn image_redirect(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
) -> Result<Redirect, ApiError> {
    let recipe = repo::find_recipe(&state.db, user_id, id)
        .await?
        .ok_or(ApiError::NotFound)?;
    let key = recipe.image.ok_or(ApiError::NotFound)?;
    let url = state.storage.presign_get(&key, PRESIGN_TTL_SECS).await?;
    Ok(Redirect::temporary(&url))
}
