use crate::domain::models::{Evaluation, EvaluationCategory, QualitativeGoal, QuantitativeRating, Rater};
use serde::Serialize;
use std::collections::BTreeMap;

fn pick(rating: &QuantitativeRating, rater: Rater) -> Option<u8> {
    match rater {
        Rater::SelfReview => rating.self_rating,
        Rater::Evaluator => rating.evaluator_rating,
    }
}

fn pick_goal(goal: &QualitativeGoal, rater: Rater) -> Option<u8> {
    match rater {
        Rater::SelfReview => goal.self_rating,
        Rater::Evaluator => goal.evaluator_rating,
    }
}

/// Mean of the rated items of one category; `None` when nothing is rated.
pub fn category_average(
    category: &EvaluationCategory,
    ratings: &BTreeMap<String, QuantitativeRating>,
    rater: Rater,
) -> Option<f64> {
    let values: Vec<f64> = category
        .items
        .iter()
        .filter_map(|item| ratings.get(&item.id))
        .filter_map(|rating| pick(rating, rater))
        .map(f64::from)
        .collect();

    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Weighted sum of category averages: `Σ weight/100 * average`.
///
/// Categories without a single rated item contribute 0.
pub fn compute_overall_score(
    evaluation: &Evaluation,
    categories: &[EvaluationCategory],
    rater: Rater,
) -> f64 {
    categories
        .iter()
        .filter_map(|category| {
            category_average(category, &evaluation.quantitative, rater)
                .map(|average| f64::from(category.weight) / 100.0 * average)
        })
        .sum()
}

/// `Σ weight/100 * rating` over the goals. Unrated goals contribute 0.
///
/// Only meaningful once the weights have been validated to total 100.
pub fn compute_qualitative_score(goals: &[QualitativeGoal], rater: Rater) -> f64 {
    goals
        .iter()
        .filter_map(|goal| pick_goal(goal, rater).map(|rating| (goal.weight, rating)))
        .map(|(weight, rating)| f64::from(weight) / 100.0 * f64::from(rating))
        .sum()
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategoryScore {
    pub category_id: String,
    pub weight: u32,
    pub self_average: Option<f64>,
    pub evaluator_average: Option<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScoreSummary {
    pub overall_self: f64,
    pub overall_evaluator: f64,
    pub qualitative_self: f64,
    pub qualitative_evaluator: f64,
    pub categories: Vec<CategoryScore>,
}

pub fn score_summary(evaluation: &Evaluation, categories: &[EvaluationCategory]) -> ScoreSummary {
    let per_category = categories
        .iter()
        .map(|category| CategoryScore {
            category_id: category.id.clone(),
            weight: category.weight,
            self_average: category_average(category, &evaluation.quantitative, Rater::SelfReview),
            evaluator_average: category_average(category, &evaluation.quantitative, Rater::Evaluator),
        })
        .collect();

    ScoreSummary {
        overall_self: compute_overall_score(evaluation, categories, Rater::SelfReview),
        overall_evaluator: compute_overall_score(evaluation, categories, Rater::Evaluator),
        qualitative_self: compute_qualitative_score(&evaluation.qualitative, Rater::SelfReview),
        qualitative_evaluator: compute_qualitative_score(&evaluation.qualitative, Rater::Evaluator),
        categories: per_category,
    }
}
