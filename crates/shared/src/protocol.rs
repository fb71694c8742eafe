use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    domain::{Category, CategoryKey},
    error::ApiError,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCategoryRequest {
    pub key: CategoryKey,
    pub label: String,
    pub icon: String,
    #[serde(default)]
    pub is_system: bool,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCategoryRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i64>,
}

impl UpdateCategoryRequest {
    pub fn sort_order(sort_order: i64) -> Self {
        Self {
            label: None,
            sort_order: Some(sort_order),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.label.is_none() && self.sort_order.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerEvent {
    CategoryCreated {
        category: Category,
    },
    CategoryUpdated {
        category: Category,
        updated_at: DateTime<Utc>,
    },
    CategoryDeleted {
        key: CategoryKey,
    },
    Error(ApiError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_order_update_omits_label() {
        let json = serde_json::to_string(&UpdateCategoryRequest::sort_order(3)).expect("json");
        assert_eq!(json, r#"{"sort_order":3}"#);
    }

    #[test]
    fn server_event_uses_type_and_payload_tags() {
        let event = ServerEvent::CategoryDeleted {
            key: CategoryKey::new("gifts"),
        };
        let json = serde_json::to_value(&event).expect("json");
        assert_eq!(json["type"], "category_deleted");
        assert_eq!(json["payload"]["key"], "gifts");
    }
}
