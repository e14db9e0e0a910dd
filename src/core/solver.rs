use rust_decimal::Decimal;
use tracing::debug;

use super::engine::{FinalYear, level_schedule, lump_sum_future_value, stepped_schedule};
use super::error::EngineError;
use super::money::{checked_mul, checked_pow, monthly_rate, months_in, round_money};
use super::types::{
    ExistingPlan, GoalSpec, LumpSumReprojection, ProjectionResult, non_negative,
};

pub fn solve_required_contribution(spec: &GoalSpec) -> Result<ProjectionResult, EngineError> {
    spec.check_preconditions()?;

    let rate = monthly_rate(spec.annual_return_rate_percent);
    let lump_sum_fv = lump_sum_future_value(
        spec.initial_lump_sum,
        spec.annual_return_rate_percent,
        spec.horizon_years,
    )?;
    let remaining_goal = round_money((spec.goal_amount - lump_sum_fv).max(Decimal::ZERO));

    let base_payment = if remaining_goal.is_zero() {
        Decimal::ZERO
    } else {
        level_payment(remaining_goal, rate, months_in(spec.horizon_years)?)?
    };
    debug!(%lump_sum_fv, %remaining_goal, %base_payment, "solved level payment");

    if spec.annual_increase_rate_percent > Decimal::ZERO && base_payment > Decimal::ZERO {
        let first_pass = stepped_schedule(spec, base_payment, FinalYear::Simulated)?;
        // check_preconditions guarantees at least one year.
        let Some(final_value) = first_pass
            .last()
            .map(|record| record.projected_value_at_year_end)
        else {
            return Err(EngineError::InvalidInput("horizon_years must be >= 1".to_string()));
        };
        let adjustment = spec
            .goal_amount
            .checked_div(final_value)
            .ok_or(EngineError::Overflow("adjustment factor"))?;
        let corrected = round_money(checked_mul(base_payment, adjustment, "corrected payment")?);
        debug!(%final_value, %adjustment, %corrected, "rescaled stepped payment");

        let yearly_breakdown = stepped_schedule(spec, corrected, FinalYear::ForcedToGoal)?;
        return Ok(ProjectionResult {
            required_monthly_contribution: corrected,
            yearly_breakdown,
        });
    }

    Ok(ProjectionResult {
        required_monthly_contribution: base_payment,
        yearly_breakdown: level_schedule(spec, base_payment)?,
    })
}

fn level_payment(remaining: Decimal, rate: Decimal, months: u32) -> Result<Decimal, EngineError> {
    if rate.is_zero() {
        return Err(EngineError::InvalidInput(
            "annual_return_rate_percent rounds to a zero monthly rate".to_string(),
        ));
    }
    let growth = checked_pow(Decimal::ONE + rate, months, "level payment growth")?;
    let numerator = checked_mul(remaining, rate, "level payment")?;
    let payment = numerator
        .checked_div(growth - Decimal::ONE)
        .ok_or(EngineError::Overflow("level payment"))?;
    Ok(round_money(payment))
}

pub fn reproject_after_lump_sum(
    plan: &ExistingPlan,
    lump_sum_amount: Decimal,
) -> Result<LumpSumReprojection, EngineError> {
    plan.check_preconditions()?;
    non_negative("lump_sum_amount", lump_sum_amount)?;

    let updated_accumulated_amount = plan
        .accumulated_amount
        .checked_add(lump_sum_amount)
        .ok_or(EngineError::Overflow("accumulated amount"))?;
    let solved = solve_required_contribution(&plan.goal_with_lump_sum(updated_accumulated_amount))?;

    debug!(
        previous = %plan.current_monthly_contribution,
        new = %solved.required_monthly_contribution,
        "re-solved plan after lump sum"
    );
    Ok(LumpSumReprojection {
        new_monthly_contribution: solved.required_monthly_contribution,
        updated_accumulated_amount,
    })
}
