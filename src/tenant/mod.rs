pub mod data;

use crate::domain::models::{Criterion, EvaluationCategory, UserRole};
use serde::Serialize;
use std::collections::BTreeMap;

pub mod positions {
    pub const SITE_WORKER: &str = "Site Worker";
    pub const SITE_MANAGER: &str = "Site Manager";
    pub const SALES: &str = "Sales";
    pub const EXECUTIVE: &str = "Executive";
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CategorySet {
    Construction,
    Sales,
}

#[derive(Clone, Debug, Serialize)]
pub struct Department {
    pub id: String,
    pub name: String,
    pub description: String,
}

impl Department {
    fn new(id: &str, name: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Features {
    pub self_evaluation: bool,
    pub peer_evaluation: bool,
    pub goal_setting: bool,
    pub deadline_reminder: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct SampleUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub position: String,
    pub department: String,
    pub evaluator_id: Option<String>,
    #[serde(skip)]
    pub password: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct QualitativeTemplate {
    pub id: String,
    pub content: String,
    pub default_weight: u32,
    pub applicable_positions: Vec<String>,
}

impl QualitativeTemplate {
    fn applies_to(&self, position: &str) -> bool {
        self.applicable_positions
            .iter()
            .any(|p| p == position || p == "all")
    }
}

/// A configured company profile.
#[derive(Clone, Debug, Serialize)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub industry: String,
    /// IANA name or a fixed `UTC+09:00` style offset.
    pub timezone: String,
    pub category_set: CategorySet,
    pub positions: Vec<String>,
    pub roles: Vec<UserRole>,
    pub departments: Vec<Department>,
    pub features: Features,
    pub deadline_notice_days: Vec<i64>,
    pub approval_reminder_days: i64,
    pub sample_users: Vec<SampleUser>,
    pub default_goals: BTreeMap<String, Vec<String>>,
}

/// Read-only evaluation configuration for the selected tenant.
pub trait ConfigProvider: Send + Sync {
    fn current_tenant(&self) -> &Tenant;

    /// Categories that apply to `position`; every category of the tenant's
    /// set when no position is given.
    fn evaluation_categories(&self, position: Option<&str>) -> Vec<EvaluationCategory>;

    fn evaluation_criteria(&self, position: &str) -> &[Criterion];

    fn qualitative_criteria(&self) -> &[Criterion];

    fn qualitative_templates(&self, position: Option<&str>) -> Vec<QualitativeTemplate>;

    fn category(&self, id: &str) -> Option<EvaluationCategory>;

    /// Every category across all sets, for snapshots.
    fn all_categories(&self) -> Vec<EvaluationCategory>;

    /// Positions whose category weights do not add up to 100.
    fn category_weight_issues(&self) -> Vec<String>;
}

#[derive(Debug, thiserror::Error)]
#[error("unknown tenant '{0}'")]
pub struct UnknownTenant(pub String);

pub struct StaticConfig {
    tenant: Tenant,
}

impl StaticConfig {
    pub fn for_tenant(tenant_id: &str) -> Result<Self, UnknownTenant> {
        data::TENANTS
            .iter()
            .find(|tenant| tenant.id == tenant_id)
            .cloned()
            .map(|tenant| Self { tenant })
            .ok_or_else(|| UnknownTenant(tenant_id.to_string()))
    }

    fn category_set_for(&self, position: Option<&str>) -> &'static [EvaluationCategory] {
        let set = match position {
            Some(positions::SALES) => CategorySet::Sales,
            Some(_) => CategorySet::Construction,
            None => self.tenant.category_set,
        };
        match set {
            CategorySet::Construction => &data::CONSTRUCTION_CATEGORIES,
            CategorySet::Sales => &data::SALES_CATEGORIES,
        }
    }
}

impl ConfigProvider for StaticConfig {
    fn current_tenant(&self) -> &Tenant {
        &self.tenant
    }

    fn evaluation_categories(&self, position: Option<&str>) -> Vec<EvaluationCategory> {
        self.category_set_for(position)
            .iter()
            .filter(|category| position.map_or(true, |p| category.applies_to(p)))
            .cloned()
            .collect()
    }

    fn evaluation_criteria(&self, position: &str) -> &[Criterion] {
        if position == positions::SALES {
            &data::SALES_CRITERIA
        } else {
            &data::CONSTRUCTION_CRITERIA
        }
    }

    fn qualitative_criteria(&self) -> &[Criterion] {
        &data::QUALITATIVE_CRITERIA
    }

    fn qualitative_templates(&self, position: Option<&str>) -> Vec<QualitativeTemplate> {
        data::QUALITATIVE_TEMPLATES
            .iter()
            .filter(|template| position.map_or(true, |p| template.applies_to(p)))
            .cloned()
            .collect()
    }

    fn category(&self, id: &str) -> Option<EvaluationCategory> {
        data::CONSTRUCTION_CATEGORIES
            .iter()
            .chain(data::SALES_CATEGORIES.iter())
            .find(|category| category.id == id)
            .cloned()
    }

    fn all_categories(&self) -> Vec<EvaluationCategory> {
        data::CONSTRUCTION_CATEGORIES
            .iter()
            .chain(data::SALES_CATEGORIES.iter())
            .cloned()
            .collect()
    }

    fn category_weight_issues(&self) -> Vec<String> {
        self.tenant
            .positions
            .iter()
            .filter_map(|position| {
                let categories = self.evaluation_categories(Some(position));
                if categories.is_empty() {
                    return None;
                }
                let total: u32 = categories.iter().map(|c| c.weight).sum();
                (total != 100).then(|| {
                    format!("categories for '{position}' total {total}% instead of 100%")
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> StaticConfig {
        StaticConfig::for_tenant(data::DEFAULT_TENANT_ID).unwrap()
    }

    #[test]
    fn unknown_tenants_are_rejected() {
        assert!(StaticConfig::for_tenant("nowhere").is_err());
    }

    #[test]
    fn sales_uses_the_sales_set_and_scale() {
        let config = config();
        let categories = config.evaluation_categories(Some(positions::SALES));
        let ids: Vec<_> = categories.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["sales-performance", "sales-activities"]);
        assert_eq!(config.evaluation_criteria(positions::SALES)[0].value, 1);
    }

    #[test]
    fn construction_categories_filter_by_position() {
        let config = config();
        let worker = config.evaluation_categories(Some(positions::SITE_WORKER));
        let manager = config.evaluation_categories(Some(positions::SITE_MANAGER));
        assert_eq!(worker.len(), 5);
        assert_eq!(manager.len(), 6);
        assert!(manager.iter().any(|c| c.id == "construction-management"));
        assert!(config.evaluation_categories(Some(positions::EXECUTIVE)).is_empty());
        assert_eq!(config.evaluation_criteria(positions::SITE_WORKER)[0].value, 0);
    }

    #[test]
    fn weight_issues_flag_site_workers() {
        let issues = config().category_weight_issues();
        assert_eq!(issues.len(), 1, "{issues:?}");
        assert!(issues[0].contains("Site Worker") && issues[0].contains("75%"));
    }

    #[test]
    fn templates_and_lookup() {
        let config = config();
        let sales = config.qualitative_templates(Some(positions::SALES));
        assert!(sales.iter().all(|t| t.applies_to(positions::SALES)));
        assert_eq!(config.qualitative_templates(None).len(), 8);
        assert_eq!(config.category("floor").map(|c| c.id), None);
        assert_eq!(config.category("construction-floor").unwrap().weight, 15);
        assert_eq!(config.all_categories().len(), 8);
    }
}
