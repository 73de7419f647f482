//! Catalog route handlers.

use axum::{Json, extract::Multipart, extract::State};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bistro_core::FoodId;

use crate::db::{CatalogRepository, catalog::NewFoodItem};
use crate::error::{AppError, Result};
use crate::models::FoodItem;
use crate::routes::ApiMessage;
use crate::services::uploads;
use crate::state::AppState;

/// Catalog listing response.
#[derive(Debug, Serialize)]
pub struct FoodListResponse {
    pub success: bool,
    pub data: Vec<FoodItem>,
}

/// Remove-item request body.
#[derive(Debug, Deserialize)]
pub struct RemoveFoodRequest {
    pub id: FoodId,
}

/// Multipart fields collected from an add-item request.
#[derive(Default)]
struct AddFoodForm {
    name: Option<String>,
    description: Option<String>,
    price: Option<String>,
    category: Option<String>,
    image: Option<(String, Vec<u8>)>,
}

impl AddFoodForm {
    async fn from_multipart(mut multipart: Multipart) -> Result<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(format!("invalid multipart body: {e}")))?
        {
            let Some(name) = field.name().map(ToOwned::to_owned) else {
                continue;
            };

            match name.as_str() {
                "image" => {
                    let filename = field
                        .file_name()
                        .map_or_else(|| "image".to_owned(), ToOwned::to_owned);
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::BadRequest(format!("failed to read image: {e}")))?;
                    form.image = Some((filename, bytes.to_vec()));
                }
                other => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(format!("invalid field {other}: {e}")))?;
                    match other {
                        "name" => form.name = Some(text),
                        "description" => form.description = Some(text),
                        "price" => form.price = Some(text),
                        "category" => form.category = Some(text),
                        _ => {} // unknown fields are ignored
                    }
                }
            }
        }

        Ok(form)
    }

    fn validate(self) -> Result<ValidatedFood> {
        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| AppError::BadRequest("name is required".to_owned()))?;
        let category = self
            .category
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| AppError::BadRequest("category is required".to_owned()))?;
        let price = self
            .price
            .ok_or_else(|| AppError::BadRequest("price is required".to_owned()))?
            .parse::<Decimal>()
            .map_err(|e| AppError::BadRequest(format!("invalid price: {e}")))?;
        if price < Decimal::ZERO {
            return Err(AppError::BadRequest("price must not be negative".to_owned()));
        }
        let (filename, bytes) = self
            .image
            .filter(|(_, bytes)| !bytes.is_empty())
            .ok_or_else(|| AppError::BadRequest("image is required".to_owned()))?;

        Ok(ValidatedFood {
            name,
            description: self.description.unwrap_or_default(),
            price,
            category,
            filename,
            bytes,
        })
    }
}

/// A fully validated add-item submission, image not yet stored.
struct ValidatedFood {
    name: String,
    description: String,
    price: Decimal,
    category: String,
    filename: String,
    bytes: Vec<u8>,
}

/// Add a catalog item (multipart: name, description, price, category, image).
#[instrument(skip(state, multipart))]
pub async fn add(State(state): State<AppState>, multipart: Multipart) -> Result<Json<ApiMessage>> {
    let form = AddFoodForm::from_multipart(multipart).await?.validate()?;

    let image = uploads::store_image(&state.config().upload_dir, &form.filename, &form.bytes)
        .await
        .map_err(|e| AppError::Internal(format!("failed to store image: {e}")))?;

    let inserted = CatalogRepository::new(state.pool())
        .insert(NewFoodItem {
            name: form.name,
            description: form.description,
            price: form.price,
            category: form.category,
            image: image.clone(),
        })
        .await;

    let item = match inserted {
        Ok(item) => item,
        Err(err) => {
            // the stored file would be orphaned, remove it before failing
            uploads::remove_image(&state.config().upload_dir, &image).await;
            return Err(err.into());
        }
    };

    tracing::info!(food_id = %item.id, "catalog item added");

    Ok(Json(ApiMessage::ok("Food Added")))
}

/// List all catalog items.
#[instrument(skip(state))]
pub async fn list(State(state): State<AppState>) -> Result<Json<FoodListResponse>> {
    let data = CatalogRepository::new(state.pool()).list().await?;

    Ok(Json(FoodListResponse {
        success: true,
        data,
    }))
}

/// Remove a catalog item.
///
/// Historical order snapshots keep their copy of the item.
#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    Json(req): Json<RemoveFoodRequest>,
) -> Result<Json<ApiMessage>> {
    CatalogRepository::new(state.pool()).delete(req.id).await?;

    Ok(Json(ApiMessage::ok("Food Removed")))
}
