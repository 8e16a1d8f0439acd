use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use crate::database::entity::{ColumnValue, Entity, OwnedEntity, TemporalColumn};
use crate::tenant::TenantId;

/// Marketing page rendered on a tenant's domain. Section content is free-form JSON.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LandingPage {
    #[serde(default, skip_deserializing)]
    pub id: i64,
    #[serde(default, skip_deserializing)]
    pub user_id: i64,
    pub page_name: String,
    pub slug: String,
    #[serde(default = "default_template")]
    pub template: String,
    #[serde(default = "yes")]
    pub is_active: bool,
    pub domain_name: String,
    #[serde(default)]
    pub custom_scripts: Option<Value>,
    #[serde(default)]
    pub theme_colors: Option<Value>,
    #[serde(default)]
    pub company: Option<Value>,
    #[serde(default)]
    pub seo: Option<Value>,
    #[serde(default)]
    pub hero: Option<Value>,
    #[serde(default)]
    pub packages: Option<Value>,
    #[serde(default)]
    pub testimonials: Option<Value>,
    #[serde(default)]
    pub faqs: Option<Value>,
    #[serde(default)]
    pub custom_sections: Option<Value>,
    #[serde(default)]
    pub section_order: Option<Value>,
    #[serde(default)]
    pub views: i64,
    #[serde(default)]
    pub leads: i64,
    #[serde(default, skip_deserializing)]
    pub is_deleted: bool,
    #[serde(default, skip_deserializing)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_deserializing)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_template() -> String {
    "template-one".to_string()
}

fn yes() -> bool {
    true
}

impl Entity for LandingPage {
    const TABLE: &'static str = "landing_pages";
    const LABEL: &'static str = "Landing page";
    const SOFT_DELETE: bool = true;
    const TOUCHES_UPDATED_AT: bool = true;

    fn temporal_columns() -> &'static [(&'static str, TemporalColumn)] {
        &[("created_at", TemporalColumn::Timestamp), ("updated_at", TemporalColumn::Timestamp)]
    }

    fn columns(&self) -> Vec<(&'static str, ColumnValue)> {
        vec![
            ("user_id", self.user_id.into()),
            ("page_name", self.page_name.clone().into()),
            ("slug", self.slug.clone().into()),
            ("template", self.template.clone().into()),
            ("is_active", self.is_active.into()),
            ("domain_name", self.domain_name.clone().into()),
            ("custom_scripts", self.custom_scripts.clone().into()),
            ("theme_colors", self.theme_colors.clone().into()),
            ("company", self.company.clone().into()),
            ("seo", self.seo.clone().into()),
            ("hero", self.hero.clone().into()),
            ("packages", self.packages.clone().into()),
            ("testimonials", self.testimonials.clone().into()),
            ("faqs", self.faqs.clone().into()),
            ("custom_sections", self.custom_sections.clone().into()),
            ("section_order", self.section_order.clone().into()),
            ("views", self.views.into()),
            ("leads", self.leads.into()),
            ("is_deleted", self.is_deleted.into()),
        ]
    }

    fn owner_column() -> Option<&'static str> {
        Some("user_id")
    }

    fn as_owned_mut(&mut self) -> Option<&mut dyn OwnedEntity> {
        Some(self)
    }
}

impl OwnedEntity for LandingPage {
    fn owner_id(&self) -> Option<TenantId> {
        TenantId::from_raw(self.user_id)
    }

    fn set_owner_id(&mut self, tenant: TenantId) {
        self.user_id = tenant.get();
    }
}
