//! Return assessment and fee computation

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    config::BorrowingConfig,
    models::{DamageSeverity, ItemCondition},
};

/// What the assessment needs to know about a return
#[derive(Debug, Clone)]
pub struct ReturnAssessmentInput {
    pub intended_return_date: DateTime<Utc>,
    pub actual_return_date: DateTime<Utc>,
    pub condition_on_return: ItemCondition,
    pub damage_description: Option<String>,
    pub damage_severity: DamageSeverity,
}

/// Where an assessed return goes next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReturnRouting {
    /// Finalize now and credit the ledger
    AutoComplete,
    /// Park until an admin approves or rejects
    ManualReview,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ReturnAssessment {
    pub is_late: bool,
    pub late_days: i64,
    pub penalty_fee: Decimal,
    pub damage_fee: Decimal,
    pub total_fee: Decimal,
    pub routing: ReturnRouting,
}

/// Stateless fee calculator built from the configured schedule
#[derive(Debug, Clone)]
pub struct FeeEngine {
    schedule: BorrowingConfig,
}

impl FeeEngine {
    pub fn new(schedule: BorrowingConfig) -> Self {
        Self { schedule }
    }

    /// Whole days past the intended date, never negative
    pub fn late_days(intended: DateTime<Utc>, actual: DateTime<Utc>) -> i64 {
        (actual - intended).num_days().max(0)
    }

    /// Fixed fee for a severity. Unset moderate/severe fees are entered
    /// during review, so they assess as zero here.
    pub fn damage_fee(&self, severity: DamageSeverity) -> Decimal {
        match severity {
            DamageSeverity::None => Decimal::ZERO,
            DamageSeverity::Minor => self.schedule.minor_damage_fee,
            DamageSeverity::Moderate => self.schedule.moderate_damage_fee.unwrap_or(Decimal::ZERO),
            DamageSeverity::Severe => self.schedule.severe_damage_fee.unwrap_or(Decimal::ZERO),
        }
    }

    pub fn assess(&self, input: &ReturnAssessmentInput) -> ReturnAssessment {
        let late_days = Self::late_days(input.intended_return_date, input.actual_return_date);
        let penalty_fee = Decimal::from(late_days) * self.schedule.per_day_rate;
        let damage_fee = self.damage_fee(input.damage_severity);
        let routing = if input.damage_severity.requires_review() {
            ReturnRouting::ManualReview
        } else {
            ReturnRouting::AutoComplete
        };

        ReturnAssessment {
            is_late: late_days > 0,
            late_days,
            penalty_fee,
            damage_fee,
            total_fee: penalty_fee + damage_fee,
            routing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn engine() -> FeeEngine {
        FeeEngine::new(BorrowingConfig {
            per_day_rate: Decimal::new(50, 0),
            minor_damage_fee: Decimal::new(100, 0),
            moderate_damage_fee: Some(Decimal::new(500, 0)),
            severe_damage_fee: None,
        })
    }

    fn input(late_by: Duration, severity: DamageSeverity) -> ReturnAssessmentInput {
        let intended = "2024-05-10T17:00:00Z".parse::<DateTime<Utc>>().unwrap();
        ReturnAssessmentInput {
            intended_return_date: intended,
            actual_return_date: intended + late_by,
            condition_on_return: ItemCondition::Good,
            damage_description: None,
            damage_severity: severity,
        }
    }

    #[test]
    fn on_time_undamaged_return_is_free_and_automatic() {
        let assessment = engine().assess(&input(Duration::zero(), DamageSeverity::None));
        assert!(!assessment.is_late);
        assert_eq!(assessment.total_fee, Decimal::ZERO);
        assert_eq!(assessment.routing, ReturnRouting::AutoComplete);
    }

    #[test]
    fn early_return_is_not_late() {
        let assessment = engine().assess(&input(Duration::days(-2), DamageSeverity::None));
        assert_eq!(assessment.late_days, 0);
        assert!(!assessment.is_late);
    }

    #[test]
    fn partial_days_are_floored() {
        let assessment = engine().assess(&input(Duration::hours(71), DamageSeverity::None));
        assert_eq!(assessment.late_days, 2);
        assert_eq!(assessment.penalty_fee, Decimal::new(100, 0));
    }

    #[test]
    fn minor_damage_adds_fixed_fee_and_auto_completes() {
        let assessment = engine().assess(&input(Duration::days(1), DamageSeverity::Minor));
        assert_eq!(assessment.damage_fee, Decimal::new(100, 0));
        assert_eq!(assessment.total_fee, Decimal::new(150, 0));
        assert_eq!(assessment.routing, ReturnRouting::AutoComplete);
    }

    #[test]
    fn moderate_and_severe_go_to_review() {
        let moderate = engine().assess(&input(Duration::zero(), DamageSeverity::Moderate));
        assert_eq!(moderate.damage_fee, Decimal::new(500, 0));
        assert_eq!(moderate.routing, ReturnRouting::ManualReview);

        let severe = engine().assess(&input(Duration::zero(), DamageSeverity::Severe));
        assert_eq!(severe.damage_fee, Decimal::ZERO);
        assert_eq!(severe.routing, ReturnRouting::ManualReview);
    }
}
