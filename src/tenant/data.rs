//! Built-in tenant profiles, category sets and rating criteria.

use crate::domain::models::{
    CategoryItem, Criterion, EvaluationCategory, ItemKind, RatingScale, UserRole,
};
use crate::tenant::{
    positions, CategorySet, Department, Features, QualitativeTemplate, SampleUser, Tenant,
};
use once_cell::sync::Lazy;

pub const DEFAULT_TENANT_ID: &str = "construction-demo";

pub static TENANTS: Lazy<Vec<Tenant>> = Lazy::new(|| vec![construction_demo()]);

pub static CONSTRUCTION_CATEGORIES: Lazy<Vec<EvaluationCategory>> = Lazy::new(|| {
    let crew = [positions::SITE_WORKER, positions::SITE_MANAGER];
    vec![
        construction(
            "construction-cross-new",
            "Wallcovering (new build)",
            20,
            &crew,
            &[
                ("cross-prep-1", "Substrate preparation (putty)"),
                ("cross-prep-2", "Measuring and material ordering"),
                ("cross-install-1", "Plain heavy wallcovering"),
                ("cross-install-2", "Plain light wallcovering"),
                ("cross-install-3", "Patterned wallcovering"),
                ("cross-safety", "Safe use of tools and machines"),
                ("cross-prep-3", "Site preparation"),
            ],
        ),
        construction(
            "construction-cross-replace",
            "Wallcovering (replacement)",
            15,
            &crew,
            &[
                ("replace-prep-1", "Substrate preparation (putty)"),
                ("replace-prep-2", "Measuring and material ordering"),
                ("replace-install-1", "Plain heavy wallcovering"),
                ("replace-install-2", "Plain light wallcovering"),
                ("replace-install-3", "Patterned wallcovering"),
                ("replace-safety", "Safety management"),
                ("replace-prep-3", "Site preparation"),
            ],
        ),
        construction(
            "construction-floor",
            "Flooring",
            15,
            &crew,
            &[
                ("floor-prep", "Substrate preparation"),
                ("floor-measure", "Measuring and material ordering"),
                ("floor-cushion", "Cushion floor"),
                ("floor-long", "Sheet vinyl"),
                ("floor-carpet", "Carpet tiles"),
                ("floor-tile", "Floor tiles"),
                ("floor-baseboard", "Soft skirting"),
            ],
        ),
        construction(
            "construction-sheet",
            "Decorative film",
            15,
            &crew,
            &[
                ("sheet-prep", "Substrate preparation"),
                ("sheet-measure", "Measuring and material ordering"),
                ("sheet-dinoc", "Architectural film"),
                ("sheet-glass", "Glass film"),
            ],
        ),
        construction(
            "construction-misc",
            "General works",
            10,
            &crew,
            &[
                ("misc-electric", "Electrical fixtures"),
                ("misc-water", "Plumbing fixtures"),
                ("misc-wood", "Carpentry"),
                ("misc-blind", "Blinds and roller screens"),
                ("misc-repair", "Snagging and touch-ups"),
            ],
        ),
        {
            let mut management = construction(
                "construction-management",
                "Construction management",
                25,
                &[positions::SITE_MANAGER],
                &[
                    ("mgmt-drawing", "Shop drawings"),
                    ("mgmt-method", "Method planning"),
                    ("mgmt-electric-permit", "Power supply applications"),
                    ("mgmt-fire-permit", "Fire safety applications"),
                    ("mgmt-budget", "Site budget control"),
                    ("mgmt-safety-mgmt", "Safety management and paperwork"),
                    ("mgmt-estimate", "Estimates"),
                    ("mgmt-invoice", "Invoicing"),
                    ("mgmt-completion", "Completion documents"),
                    ("mgmt-client", "Client liaison"),
                    ("mgmt-expense", "Expense control"),
                    ("mgmt-schedule", "Scheduling"),
                    ("mgmt-material", "Material take-off and ordering"),
                    ("mgmt-quality", "Finish inspection"),
                    ("mgmt-order-check", "Reviewing crew order requests"),
                ],
            );
            management.items.push(CategoryItem {
                id: "mgmt-profit-rate".to_string(),
                name: "Profit margin (20% per project)".to_string(),
                kind: ItemKind::Calculated,
                target: Some(20),
                unit: Some("%".to_string()),
            });
            management.items.push(CategoryItem {
                id: "mgmt-project-count".to_string(),
                name: "Projects managed (30 per half)".to_string(),
                kind: ItemKind::Calculated,
                target: Some(30),
                unit: Some("projects".to_string()),
            });
            management
        },
    ]
});

pub static SALES_CATEGORIES: Lazy<Vec<EvaluationCategory>> = Lazy::new(|| {
    vec![
        EvaluationCategory {
            id: "sales-performance".to_string(),
            name: "Sales results".to_string(),
            weight: 70,
            items: vec![
                target_item("sales-revenue", "Gross profit", Some(5_000_000), "JPY"),
                target_item("sales-count", "Orders won", Some(20), "orders"),
                CategoryItem {
                    id: "sales-average".to_string(),
                    name: "Average order value".to_string(),
                    kind: ItemKind::Calculated,
                    target: None,
                    unit: Some("JPY".to_string()),
                },
            ],
            position_types: vec![positions::SALES.to_string()],
            scale: RatingScale::SALES,
        },
        EvaluationCategory {
            id: "sales-activities".to_string(),
            name: "Sales activities".to_string(),
            weight: 30,
            items: rated_items(&[
                ("sales-prospecting", "Prospecting new clients"),
                ("sales-proposal", "Proposals and presentations"),
                ("sales-negotiation", "Price negotiation"),
                ("sales-relationship", "Client relationships"),
                ("sales-follow-up", "After-sales follow-up"),
            ]),
            position_types: vec![positions::SALES.to_string()],
            scale: RatingScale::SALES,
        },
    ]
});

pub static CONSTRUCTION_CRITERIA: Lazy<Vec<Criterion>> = Lazy::new(|| {
    criteria(&[
        (0, "Level 0", "Cannot perform the work or not applicable"),
        (1, "Level 1", "Can assist others"),
        (2, "Level 2", "Can perform the work with guidance"),
        (3, "Level 3", "Can perform the work independently"),
        (4, "Level 4", "Can teach others"),
        (5, "Level 5", "Can run a whole site and lead several people"),
    ])
});

pub static SALES_CRITERIA: Lazy<Vec<Criterion>> = Lazy::new(|| {
    criteria(&[
        (1, "Level 1", "69% of target or less"),
        (2, "Level 2", "70% of target"),
        (3, "Level 3", "90% of target"),
        (4, "Level 4", "100% of target"),
        (5, "Level 5", "110% of target"),
    ])
});

pub static QUALITATIVE_CRITERIA: Lazy<Vec<Criterion>> = Lazy::new(|| {
    criteria(&[
        (1, "Level 1", "Not carried out at all"),
        (2, "Level 2", "Partly carried out"),
        (3, "Level 3", "Carried out but not beyond the goal"),
        (4, "Level 4", "Carried out"),
        (5, "Level 5", "Exceeded the goal"),
    ])
});

pub static QUALITATIVE_TEMPLATES: Lazy<Vec<QualitativeTemplate>> = Lazy::new(|| {
    use positions::{SALES, SITE_MANAGER, SITE_WORKER};
    vec![
        template("template-safety", "Raise safety awareness and prevent accidents", 25, &[SITE_WORKER, SITE_MANAGER]),
        template("template-quality", "Improve workmanship and technical skill", 25, &[SITE_WORKER, SITE_MANAGER]),
        template("template-efficiency", "Shorten schedules and work more efficiently", 20, &[SITE_WORKER, SITE_MANAGER]),
        template("template-communication", "Improve on-site communication and coordination", 15, &[SITE_WORKER, SITE_MANAGER, SALES]),
        template("template-customer-satisfaction", "Raise customer satisfaction", 15, &[SALES, SITE_MANAGER]),
        template("template-leadership", "Lead the crew and manage site safety", 20, &[SITE_MANAGER]),
        template("template-sales-expansion", "Win new clients and grow revenue", 30, &[SALES]),
        template("template-cost-management", "Control costs and improve margins", 15, &[SALES, SITE_MANAGER]),
    ]
});

fn construction(
    id: &str,
    name: &str,
    weight: u32,
    position_types: &[&str],
    items: &[(&str, &str)],
) -> EvaluationCategory {
    EvaluationCategory {
        id: id.to_string(),
        name: name.to_string(),
        weight,
        items: rated_items(items),
        position_types: position_types.iter().map(|p| p.to_string()).collect(),
        scale: RatingScale::CONSTRUCTION,
    }
}

fn rated_items(items: &[(&str, &str)]) -> Vec<CategoryItem> {
    items
        .iter()
        .map(|(id, name)| CategoryItem {
            id: id.to_string(),
            name: name.to_string(),
            kind: ItemKind::Rated,
            target: None,
            unit: None,
        })
        .collect()
}

fn target_item(id: &str, name: &str, target: Option<u64>, unit: &str) -> CategoryItem {
    CategoryItem {
        id: id.to_string(),
        name: name.to_string(),
        kind: ItemKind::Target,
        target,
        unit: Some(unit.to_string()),
    }
}

fn criteria(levels: &[(u8, &str, &str)]) -> Vec<Criterion> {
    levels
        .iter()
        .map(|(value, label, description)| Criterion {
            value: *value,
            label: label.to_string(),
            description: description.to_string(),
        })
        .collect()
}

fn template(id: &str, content: &str, weight: u32, applicable: &[&str]) -> QualitativeTemplate {
    QualitativeTemplate {
        id: id.to_string(),
        content: content.to_string(),
        default_weight: weight,
        applicable_positions: applicable.iter().map(|p| p.to_string()).collect(),
    }
}

fn sample_user(
    id: &str,
    name: &str,
    role: UserRole,
    position: &str,
    department: &str,
    evaluator_id: Option<&str>,
) -> SampleUser {
    SampleUser {
        id: id.to_string(),
        name: name.to_string(),
        email: format!("{id}@demo.com"),
        role,
        position: position.to_string(),
        department: department.to_string(),
        evaluator_id: evaluator_id.map(str::to_string),
        password: "demo123".to_string(),
    }
}

fn construction_demo() -> Tenant {
    use positions::{EXECUTIVE, SALES, SITE_MANAGER, SITE_WORKER};

    let goals = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();

    Tenant {
        id: DEFAULT_TENANT_ID.to_string(),
        name: "Deco Construction".to_string(),
        display_name: "Deco Construction Co., Ltd.".to_string(),
        description: "Interior finishing and renovation contractor".to_string(),
        industry: "construction".to_string(),
        timezone: "Asia/Tokyo".to_string(),
        category_set: CategorySet::Construction,
        positions: goals(&[SITE_WORKER, SITE_MANAGER, SALES, EXECUTIVE]),
        roles: vec![UserRole::Employee, UserRole::Evaluator, UserRole::Admin],
        departments: vec![
            Department::new("management", "Management", "Company management and strategy"),
            Department::new("construction", "Construction", "Site work and construction management"),
            Department::new("sales", "Sales", "Sales and client relations"),
            Department::new("admin", "Administration", "General affairs, accounting and HR"),
        ],
        features: Features {
            self_evaluation: true,
            peer_evaluation: false,
            goal_setting: true,
            deadline_reminder: true,
        },
        deadline_notice_days: vec![7, 3, 1],
        approval_reminder_days: 2,
        sample_users: vec![
            sample_user("admin", "Taro Kensetsu", UserRole::Admin, EXECUTIVE, "Management", None),
            sample_user("manager", "Hanako Genba", UserRole::Evaluator, SITE_MANAGER, "Construction", Some("admin")),
            sample_user("employee", "Jiro Sagyo", UserRole::Employee, SITE_WORKER, "Construction", Some("manager")),
            sample_user("sales1", "Saburo Eigyo", UserRole::Employee, SALES, "Sales", Some("admin")),
            sample_user("worker1", "Shiro Shokunin", UserRole::Employee, SITE_WORKER, "Construction", Some("manager")),
        ],
        default_goals: vec![
            (
                SITE_WORKER.to_string(),
                goals(&[
                    "Raise safety awareness and prevent accidents",
                    "Improve skills and consistent quality",
                    "Work more efficiently",
                    "Strengthen teamwork",
                    "Mentor juniors and pass on skills",
                ]),
            ),
            (
                SITE_MANAGER.to_string(),
                goals(&[
                    "Enforce site safety management",
                    "Improve construction quality control",
                    "Keep schedules and meet deadlines",
                    "Team management",
                    "Drive cost reduction",
                ]),
            ),
            (
                SALES.to_string(),
                goals(&[
                    "Hit the sales target",
                    "Win new clients",
                    "Sharpen proposals",
                    "Raise customer satisfaction",
                    "Strengthen after-sales follow-up",
                ]),
            ),
            (
                EXECUTIVE.to_string(),
                goals(&[
                    "Grow company results",
                    "Strengthen the organisation",
                    "Launch new business lines",
                    "Develop people",
                    "Build brand value",
                ]),
            ),
        ]
        .into_iter()
        .collect(),
    }
}
