use shared::{
    domain::{Category, CategoryKey, Icon},
    error::{ApiError, ErrorCode},
    protocol::{CreateCategoryRequest, ServerEvent, UpdateCategoryRequest},
};
use storage::{NewCategory, Storage};
use tracing::info;

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
}

pub async fn list_categories(ctx: &ApiContext) -> Result<Vec<Category>, ApiError> {
    ctx.storage.list_categories().await.map_err(internal)
}

pub async fn create_category(
    ctx: &ApiContext,
    req: CreateCategoryRequest,
) -> Result<ServerEvent, ApiError> {
    validate_key(&req.key)?;
    let label = validate_label(&req.label)?;

    if ctx
        .storage
        .get_category(&req.key)
        .await
        .map_err(internal)?
        .is_some()
    {
        return Err(ApiError::new(
            ErrorCode::Conflict,
            format!("category '{}' already exists", req.key),
        ));
    }

    let icon = Icon::from_key(&req.icon);
    let category = ctx
        .storage
        .create_category(&NewCategory {
            key: req.key.as_str(),
            label,
            icon: icon.key(),
            is_system: req.is_system,
        })
        .await
        .map_err(internal)?;
    info!(key = %category.key, sort_order = category.sort_order, "category created");
    Ok(ServerEvent::CategoryCreated { category })
}

pub async fn update_category(
    ctx: &ApiContext,
    key: &CategoryKey,
    req: UpdateCategoryRequest,
) -> Result<ServerEvent, ApiError> {
    if req.is_empty() {
        return Err(ApiError::validation("update must set label or sort_order"));
    }
    let label = req.label.as_deref().map(validate_label).transpose()?;
    if let Some(sort_order) = req.sort_order {
        if sort_order < 0 {
            return Err(ApiError::validation("sort_order must not be negative"));
        }
    }

    let stored = ctx
        .storage
        .update_category(key, label, req.sort_order)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::not_found(format!("category '{key}' not found")))?;

    info!(%key, sort_order = stored.category.sort_order, "category updated");
    Ok(ServerEvent::CategoryUpdated {
        category: stored.category,
        updated_at: stored.updated_at,
    })
}

pub async fn delete_category(ctx: &ApiContext, key: &CategoryKey) -> Result<ServerEvent, ApiError> {
    let deleted = ctx.storage.delete_category(key).await.map_err(internal)?;
    if !deleted {
        return Err(ApiError::not_found(format!("category '{key}' not found")));
    }
    info!(%key, "category deleted");
    Ok(ServerEvent::CategoryDeleted { key: key.clone() })
}

fn validate_key(key: &CategoryKey) -> Result<(), ApiError> {
    let raw = key.as_str();
    if raw.is_empty() {
        return Err(ApiError::validation("category key must not be empty"));
    }
    if !raw
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        return Err(ApiError::validation(format!(
            "category key '{raw}' may only contain lowercase letters, digits, '-' or '_'"
        )));
    }
    Ok(())
}

fn validate_label(label: &str) -> Result<&str, ApiError> {
    let label = label.trim();
    if label.is_empty() {
        return Err(ApiError::validation("category label must not be empty"));
    }
    Ok(label)
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::new(ErrorCode::Internal, err.to_string())
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
