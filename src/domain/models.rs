use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Evaluator,
    Employee,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Evaluator => "evaluator",
            UserRole::Employee => "employee",
        }
    }

    pub fn permission_level(&self) -> u8 {
        match self {
            UserRole::Admin => 3,
            UserRole::Evaluator => 2,
            UserRole::Employee => 1,
        }
    }

    /// Admins hold every role and everybody holds `employee`.
    pub fn grants(&self, required: UserRole) -> bool {
        match (self, required) {
            (UserRole::Admin, _) => true,
            (_, UserRole::Employee) => true,
            (actual, required) => *actual == required,
        }
    }
}

impl TryFrom<&str> for UserRole {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "admin" => Ok(UserRole::Admin),
            "evaluator" => Ok(UserRole::Evaluator),
            "employee" => Ok(UserRole::Employee),
            _ => Err(()),
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub role: UserRole,
    pub position: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub evaluator_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EvaluationPeriod {
    pub id: String,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
    #[serde(default)]
    pub evaluation_deadline: Option<NaiveDate>,
    #[serde(default)]
    pub review_deadline: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Closed integer range a rating must fall into.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RatingScale {
    pub min: u8,
    pub max: u8,
}

impl RatingScale {
    pub const CONSTRUCTION: RatingScale = RatingScale { min: 0, max: 5 };
    pub const SALES: RatingScale = RatingScale { min: 1, max: 5 };
    pub const QUALITATIVE: RatingScale = RatingScale { min: 1, max: 5 };

    pub fn contains(&self, value: u8) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Criterion {
    pub value: u8,
    pub label: String,
    pub description: String,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    #[default]
    Rated,
    Target,
    Calculated,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CategoryItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub kind: ItemKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EvaluationCategory {
    pub id: String,
    pub name: String,
    pub weight: u32,
    pub items: Vec<CategoryItem>,
    pub position_types: Vec<String>,
    pub scale: RatingScale,
}

impl EvaluationCategory {
    pub fn applies_to(&self, position: &str) -> bool {
        self.position_types.iter().any(|p| p == position || p == "all")
    }

    pub fn has_item(&self, item_id: &str) -> bool {
        self.items.iter().any(|item| item.id == item_id)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct QuantitativeRating {
    #[serde(default)]
    pub self_rating: Option<u8>,
    #[serde(default)]
    pub evaluator_rating: Option<u8>,
    #[serde(default)]
    pub self_comment: String,
    #[serde(default)]
    pub evaluator_comment: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct QualitativeGoal {
    pub id: String,
    #[serde(default)]
    pub content: String,
    pub weight: u32,
    #[serde(default)]
    pub self_rating: Option<u8>,
    #[serde(default)]
    pub self_comment: String,
    #[serde(default)]
    pub evaluator_rating: Option<u8>,
    #[serde(default)]
    pub evaluator_comment: String,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStatus {
    #[default]
    NotStarted,
    Draft,
    Submitted,
    ApprovedByEvaluator,
    ApprovedByAdmin,
}

impl EvaluationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluationStatus::NotStarted => "not_started",
            EvaluationStatus::Draft => "draft",
            EvaluationStatus::Submitted => "submitted",
            EvaluationStatus::ApprovedByEvaluator => "approved_by_evaluator",
            EvaluationStatus::ApprovedByAdmin => "approved_by_admin",
        }
    }
}

impl fmt::Display for EvaluationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Evaluation {
    pub id: String,
    pub user_id: String,
    pub period_id: String,
    pub position: String,
    #[serde(default)]
    pub status: EvaluationStatus,
    #[serde(default)]
    pub quantitative: BTreeMap<String, QuantitativeRating>,
    #[serde(default)]
    pub qualitative: Vec<QualitativeGoal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub evaluator_approved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub admin_approved_at: Option<DateTime<Utc>>,
}

impl Evaluation {
    pub fn id_for(user_id: &str, period_id: &str) -> String {
        format!("eval-{user_id}-{period_id}")
    }

    /// Fresh, unsaved evaluation for a (user, period) pair.
    pub fn blank(user: &User, period_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: Self::id_for(&user.id, period_id),
            user_id: user.id.clone(),
            period_id: period_id.to_string(),
            position: user.position.clone(),
            status: EvaluationStatus::NotStarted,
            quantitative: BTreeMap::new(),
            qualitative: Vec::new(),
            created_at: now,
            updated_at: now,
            submitted_at: None,
            evaluator_approved_at: None,
            admin_approved_at: None,
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.status == EvaluationStatus::ApprovedByAdmin
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Setting {
    pub key: String,
    pub value: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Rater {
    #[serde(rename = "self")]
    SelfReview,
    Evaluator,
}
