// src/models/template.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditTemplate {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Minimum pass percentage (0-100)
    #[schema(value_type = f64, example = 80.0)]
    pub pass_threshold: Decimal,
    pub requires_photos: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemplateCategory {
    pub id: Uuid,
    pub template_id: Uuid,
    pub name: String,
    pub position: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemplateItem {
    pub id: Uuid,
    pub template_id: Uuid,
    pub category_id: Uuid,
    pub label: String,
    pub description: Option<String>,
    pub position: i32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryWithItems {
    #[serde(flatten)]
    pub category: TemplateCategory,
    pub items: Vec<TemplateItem>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDetail {
    #[serde(flatten)]
    pub template: AuditTemplate,
    pub categories: Vec<CategoryWithItems>,
}

impl TemplateDetail {
    /// Groups flat item rows under their categories, keeping category order.
    pub fn assemble(template: AuditTemplate, categories: Vec<TemplateCategory>, items: Vec<TemplateItem>) -> Self {
        let categories = categories
            .into_iter()
            .map(|category| {
                let items = items
                    .iter()
                    .filter(|item| item.category_id == category.id)
                    .cloned()
                    .collect();
                CategoryWithItems { category, items }
            })
            .collect();
        TemplateDetail { template, categories }
    }
}

#[derive(Debug, Clone)]
pub struct NewTemplate {
    pub name: String,
    pub description: Option<String>,
    pub pass_threshold: Decimal,
    pub requires_photos: bool,
    pub categories: Vec<NewCategory>,
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub items: Vec<NewItem>,
}

#[derive(Debug, Clone)]
pub struct NewItem {
    pub label: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TemplateChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub pass_threshold: Option<Decimal>,
    pub requires_photos: Option<bool>,
    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assemble_groups_items_by_category() {
        let template_id = Uuid::new_v4();
        let template = AuditTemplate {
            id: template_id,
            organization_id: Uuid::new_v4(),
            name: "Kitchen".into(),
            description: None,
            pass_threshold: Decimal::from(80),
            requires_photos: false,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let (c1, c2) = (Uuid::new_v4(), Uuid::new_v4());
        let category = |id, name: &str, position| TemplateCategory { id, template_id, name: name.into(), position };
        let item = |category_id, label: &str| TemplateItem {
            id: Uuid::new_v4(),
            template_id,
            category_id,
            label: label.into(),
            description: None,
            position: 0,
        };

        let detail = TemplateDetail::assemble(
            template,
            vec![category(c1, "Hygiene", 0), category(c2, "Storage", 1)],
            vec![item(c2, "Fridge temp"), item(c1, "Hand wash"), item(c1, "Gloves")],
        );

        assert_eq!(detail.categories.len(), 2);
        assert_eq!(detail.categories[0].items.len(), 2);
        assert_eq!(detail.categories[1].items[0].label, "Fridge temp");
    }
}
