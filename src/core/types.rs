use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::EngineError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSpec {
    pub goal_amount: Decimal,
    pub horizon_years: u32,
    pub annual_return_rate_percent: Decimal,
    #[serde(default)]
    pub annual_increase_rate_percent: Decimal,
    #[serde(default)]
    pub initial_lump_sum: Decimal,
}

impl GoalSpec {
    pub fn check_preconditions(&self) -> Result<(), EngineError> {
        if self.horizon_years == 0 {
            return Err(EngineError::InvalidInput(
                "horizon_years must be >= 1".to_string(),
            ));
        }
        if self.goal_amount <= Decimal::ZERO {
            return Err(EngineError::InvalidInput(
                "goal_amount must be > 0".to_string(),
            ));
        }
        non_negative("annual_return_rate_percent", self.annual_return_rate_percent)?;
        non_negative(
            "annual_increase_rate_percent",
            self.annual_increase_rate_percent,
        )?;
        non_negative("initial_lump_sum", self.initial_lump_sum)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearRecord {
    pub year: u32,
    pub contribution_amount: Decimal,
    pub total_contributed_this_year: Decimal,
    pub projected_value_at_year_end: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResult {
    pub required_monthly_contribution: Decimal,
    pub yearly_breakdown: Vec<YearRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistingPlan {
    pub goal_amount: Decimal,
    pub horizon_years: u32,
    pub annual_return_rate_percent: Decimal,
    #[serde(default)]
    pub annual_increase_rate_percent: Decimal,
    pub current_monthly_contribution: Decimal,
    #[serde(default)]
    pub accumulated_amount: Decimal,
}

impl ExistingPlan {
    pub fn check_preconditions(&self) -> Result<(), EngineError> {
        non_negative(
            "current_monthly_contribution",
            self.current_monthly_contribution,
        )?;
        non_negative("accumulated_amount", self.accumulated_amount)
    }

    pub fn goal_with_lump_sum(&self, lump_sum: Decimal) -> GoalSpec {
        GoalSpec {
            goal_amount: self.goal_amount,
            horizon_years: self.horizon_years,
            annual_return_rate_percent: self.annual_return_rate_percent,
            annual_increase_rate_percent: self.annual_increase_rate_percent,
            initial_lump_sum: lump_sum,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FutureValueParams {
    pub principal: Decimal,
    pub monthly_contribution: Decimal,
    pub years: u32,
    pub annual_return_rate_percent: Decimal,
    #[serde(default)]
    pub annual_increase_rate_percent: Decimal,
}

impl FutureValueParams {
    pub fn check_preconditions(&self) -> Result<(), EngineError> {
        if self.years == 0 {
            return Err(EngineError::InvalidInput("years must be >= 1".to_string()));
        }
        non_negative("principal", self.principal)?;
        non_negative("monthly_contribution", self.monthly_contribution)?;
        non_negative("annual_return_rate_percent", self.annual_return_rate_percent)?;
        non_negative(
            "annual_increase_rate_percent",
            self.annual_increase_rate_percent,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FutureValue {
    pub future_value: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LumpSumReprojection {
    pub new_monthly_contribution: Decimal,
    pub updated_accumulated_amount: Decimal,
}

pub(crate) fn non_negative(name: &str, value: Decimal) -> Result<(), EngineError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(EngineError::InvalidInput(format!("{name} must be >= 0")));
    }
    Ok(())
}
