use rust_decimal::Decimal;
use tracing::trace;

use super::error::EngineError;
use super::money::{
    MONTHS_PER_YEAR, checked_add, checked_mul, checked_pow, level_growth_sum, monthly_rate,
    months_in, percent_factor, raw_monthly_rate, round_money,
};
use super::types::{FutureValue, FutureValueParams, GoalSpec, YearRecord};

// Contributions compound monthly at the 6-dp rate; the lump sum compounds annually.
pub fn annuity_future_value(
    monthly_contribution: Decimal,
    annual_rate_percent: Decimal,
    years: u32,
    initial_amount: Decimal,
) -> Result<Decimal, EngineError> {
    let factor = Decimal::ONE + monthly_rate(annual_rate_percent);
    let growth = level_growth_sum(factor, months_in(years)?, "contribution growth")?;
    level_value_at(monthly_contribution, growth, initial_amount, annual_rate_percent, years)
}

fn level_value_at(
    monthly_contribution: Decimal,
    growth: Decimal,
    initial_amount: Decimal,
    annual_rate_percent: Decimal,
    years: u32,
) -> Result<Decimal, EngineError> {
    let contributions_fv = round_money(checked_mul(
        monthly_contribution,
        growth,
        "contribution future value",
    )?);
    let lump_sum_fv = lump_sum_future_value(initial_amount, annual_rate_percent, years)?;

    Ok(round_money(checked_add(
        contributions_fv,
        lump_sum_fv,
        "annuity future value",
    )?))
}

pub(crate) fn lump_sum_future_value(
    amount: Decimal,
    annual_rate_percent: Decimal,
    years: u32,
) -> Result<Decimal, EngineError> {
    let growth = checked_pow(
        percent_factor(annual_rate_percent),
        years,
        "lump sum growth",
    )?;
    Ok(round_money(checked_mul(amount, growth, "lump sum future value")?))
}

pub fn project_future_value(params: &FutureValueParams) -> Result<FutureValue, EngineError> {
    params.check_preconditions()?;

    let factor = Decimal::ONE + raw_monthly_rate(params.annual_return_rate_percent);
    let step_up = percent_factor(params.annual_increase_rate_percent);
    let months = months_in(params.years)?;

    let principal_growth = checked_pow(factor, months, "principal growth")?;
    let principal_fv = checked_mul(params.principal, principal_growth, "principal future value")?;

    // Horner accumulation: after month i the stream holds sum(c_j * factor^(i - j)).
    let mut contribution = params.monthly_contribution;
    let mut stream = Decimal::ZERO;
    for month in 1..=months {
        if month > 1 && month % MONTHS_PER_YEAR == 1 {
            contribution = checked_mul(contribution, step_up, "stepped contribution")?;
        }
        stream = checked_mul(stream, factor, "contribution stream")?;
        stream = checked_add(stream, contribution, "contribution stream")?;
    }

    let total = checked_add(principal_fv, stream, "future value")?;
    Ok(FutureValue {
        future_value: round_money(total),
    })
}

pub(crate) fn level_schedule(
    spec: &GoalSpec,
    payment: Decimal,
) -> Result<Vec<YearRecord>, EngineError> {
    let yearly_payments = checked_mul(payment, Decimal::from(MONTHS_PER_YEAR), "yearly total")?;
    let month_factor = Decimal::ONE + monthly_rate(spec.annual_return_rate_percent);
    let year_growth = level_growth_sum(month_factor, MONTHS_PER_YEAR, "in-year growth")?;
    let year_shift = checked_pow(month_factor, MONTHS_PER_YEAR, "in-year growth")?;

    let mut records = Vec::with_capacity(spec.horizon_years as usize);
    // Unrounded sum of factor^k over every month elapsed so far.
    let mut growth = Decimal::ZERO;
    for year in 1..=spec.horizon_years {
        let projected = if year == spec.horizon_years {
            spec.goal_amount
        } else {
            growth = checked_add(
                checked_mul(growth, year_shift, "contribution growth")?,
                year_growth,
                "contribution growth",
            )?;
            level_value_at(
                payment,
                growth,
                spec.initial_lump_sum,
                spec.annual_return_rate_percent,
                year,
            )?
        };
        let total = if year == 1 {
            checked_add(yearly_payments, spec.initial_lump_sum, "yearly total")?
        } else {
            yearly_payments
        };

        records.push(YearRecord {
            year,
            contribution_amount: payment,
            total_contributed_this_year: round_money(total),
            projected_value_at_year_end: projected,
        });
    }
    Ok(records)
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum FinalYear {
    Simulated,
    ForcedToGoal,
}

// The running balance compounds once a year at the nominal rate before the
// year's contributions are added at their month-compounded year-end value.
pub(crate) fn stepped_schedule(
    spec: &GoalSpec,
    base_payment: Decimal,
    final_year: FinalYear,
) -> Result<Vec<YearRecord>, EngineError> {
    let annual_factor = percent_factor(spec.annual_return_rate_percent);
    let step_up = percent_factor(spec.annual_increase_rate_percent);
    let month_factor = Decimal::ONE + monthly_rate(spec.annual_return_rate_percent);
    let year_growth = level_growth_sum(month_factor, MONTHS_PER_YEAR, "in-year growth")?;

    let mut records = Vec::with_capacity(spec.horizon_years as usize);
    let mut running_value = spec.initial_lump_sum;
    let mut contribution = base_payment;

    for year in 1..=spec.horizon_years {
        let yearly_payments = round_money(checked_mul(
            contribution,
            Decimal::from(MONTHS_PER_YEAR),
            "yearly total",
        )?);

        running_value = round_money(checked_mul(running_value, annual_factor, "running value")?);
        let contributions_fv = checked_mul(contribution, year_growth, "in-year growth")?;
        running_value = round_money(checked_add(running_value, contributions_fv, "running value")?);

        if year == spec.horizon_years && final_year == FinalYear::ForcedToGoal {
            running_value = spec.goal_amount;
        }

        let total = if year == 1 {
            checked_add(yearly_payments, spec.initial_lump_sum, "yearly total")?
        } else {
            yearly_payments
        };

        trace!(year, %contribution, %running_value, "stepped schedule year");
        records.push(YearRecord {
            year,
            contribution_amount: round_money(contribution),
            total_contributed_this_year: round_money(total),
            projected_value_at_year_end: running_value,
        });

        contribution = round_money(checked_mul(contribution, step_up, "stepped contribution")?);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    fn dec(s: &str) -> Decimal {
        s.parse().expect("valid decimal literal")
    }

    fn spec(goal: &str, years: u32, rate: &str, increase: &str, lump: &str) -> GoalSpec {
        GoalSpec {
            goal_amount: dec(goal),
            horizon_years: years,
            annual_return_rate_percent: dec(rate),
            annual_increase_rate_percent: dec(increase),
            initial_lump_sum: dec(lump),
        }
    }

    #[test]
    fn annuity_future_value_compounds_contributions_monthly() {
        let value = annuity_future_value(dec("12244.45"), dec("12"), 1, Decimal::ZERO)
            .expect("finite value");
        assert_eq!(value, dec("155290.27"));
    }

    #[test]
    fn annuity_future_value_compounds_lump_sum_annually() {
        let value = annuity_future_value(Decimal::ZERO, dec("10"), 2, dec("1000"))
            .expect("finite value");
        assert_eq!(value, dec("1210.00"));
    }

    #[test]
    fn project_future_value_without_rate_sums_contributions() {
        let params = FutureValueParams {
            principal: dec("1000"),
            monthly_contribution: dec("100"),
            years: 2,
            annual_return_rate_percent: Decimal::ZERO,
            annual_increase_rate_percent: dec("10"),
        };
        let result = project_future_value(&params).expect("finite value");
        // 12 * 100 + 12 * 110 on top of the principal.
        assert_eq!(result.future_value, dec("3520.00"));
    }

    #[test]
    fn project_future_value_compounds_principal_monthly() {
        let params = FutureValueParams {
            principal: dec("100000"),
            monthly_contribution: Decimal::ZERO,
            years: 1,
            annual_return_rate_percent: dec("12"),
            annual_increase_rate_percent: Decimal::ZERO,
        };
        let result = project_future_value(&params).expect("finite value");
        // 1.01^12 rather than the 1.12 an annual convention would give.
        assert_eq!(result.future_value, dec("112682.50"));
    }

    #[test]
    fn project_future_value_compounds_each_contribution_from_its_month() {
        let params = FutureValueParams {
            principal: Decimal::ZERO,
            monthly_contribution: dec("1000"),
            years: 2,
            annual_return_rate_percent: dec("12"),
            annual_increase_rate_percent: dec("10"),
        };
        // sum over i of c_i * 1.01^(24 - i), with c_i = 1100 from month 13.
        let result = project_future_value(&params).expect("finite value");
        assert_eq!(result.future_value, dec("28241.72"));
    }

    #[test]
    fn project_future_value_combines_principal_and_stepped_contributions() {
        let params = FutureValueParams {
            principal: dec("100000"),
            monthly_contribution: dec("10000"),
            years: 5,
            annual_return_rate_percent: dec("12"),
            annual_increase_rate_percent: dec("10"),
        };
        let result = project_future_value(&params).expect("finite value");
        assert_eq!(result.future_value, dec("1156491.85"));

        let params = FutureValueParams {
            principal: dec("50000"),
            monthly_contribution: dec("2000"),
            years: 3,
            ..params
        };
        let result = project_future_value(&params).expect("finite value");
        assert_eq!(result.future_value, dec("165877.04"));
    }

    #[test]
    fn project_future_value_rejects_zero_years() {
        let params = FutureValueParams {
            principal: dec("1"),
            monthly_contribution: dec("1"),
            years: 0,
            annual_return_rate_percent: dec("5"),
            annual_increase_rate_percent: Decimal::ZERO,
        };
        assert!(matches!(
            project_future_value(&params),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn level_schedule_puts_lump_sum_in_first_year_total() {
        let records = level_schedule(&spec("1000000", 5, "12", "0", "200000"), dec("7928.67"))
            .expect("schedule");
        assert_eq!(records.len(), 5);
        assert_eq!(records[0].total_contributed_this_year, dec("295144.04"));
        assert_eq!(records[1].total_contributed_this_year, dec("95144.04"));
        assert_eq!(records[0].projected_value_at_year_end, dec("324555.38"));
        assert_eq!(records[4].projected_value_at_year_end, dec("1000000"));
    }

    #[test]
    fn level_schedule_interior_years_match_annuity_future_value() {
        let goal = spec("5000000", 40, "8", "0", "50000");
        let payment = dec("1234.56");
        let records = level_schedule(&goal, payment).expect("schedule");
        assert_eq!(records.len(), 40);
        for record in &records[..39] {
            let expected = annuity_future_value(
                payment,
                goal.annual_return_rate_percent,
                record.year,
                goal.initial_lump_sum,
            )
            .expect("finite value");
            assert_eq!(record.projected_value_at_year_end, expected, "year {}", record.year);
        }
        assert_eq!(records[39].projected_value_at_year_end, goal.goal_amount);
    }

    #[test]
    fn level_schedule_handles_long_horizons() {
        let records = level_schedule(&spec("1000000", 800, "0.5", "0", "0"), dec("10"))
            .expect("schedule");
        assert_eq!(records.len(), 800);
        assert_eq!(records[11].projected_value_at_year_end, dec("1483.79"));
    }

    #[test]
    fn stepped_schedule_simulated_pass_overshoots_goal() {
        let records = stepped_schedule(
            &spec("1000000", 5, "12", "10", "0"),
            dec("12244.45"),
            FinalYear::Simulated,
        )
        .expect("schedule");
        assert_eq!(records[4].projected_value_at_year_end, dec("1178899.58"));
        assert_eq!(records[1].contribution_amount, dec("13468.90"));
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(32))]

        #[test]
        fn prop_stepped_schedule_has_one_ascending_record_per_year(
            years in 1u32..40,
            rate_bp in 0u32..1500,
            increase_bp in 1u32..2000,
            payment in 1u32..50_000,
            lump in 0u32..500_000
        ) {
            let goal = spec("1000000", years, "0", "0", "0");
            let goal = GoalSpec {
                annual_return_rate_percent: Decimal::new(i64::from(rate_bp), 2),
                annual_increase_rate_percent: Decimal::new(i64::from(increase_bp), 2),
                initial_lump_sum: Decimal::from(lump),
                ..goal
            };
            let records = stepped_schedule(&goal, Decimal::from(payment), FinalYear::ForcedToGoal)
                .expect("schedule");

            prop_assert_eq!(records.len(), years as usize);
            for (index, record) in records.iter().enumerate() {
                prop_assert_eq!(record.year, index as u32 + 1);
                prop_assert!(record.contribution_amount > Decimal::ZERO);
                prop_assert!(!record.projected_value_at_year_end.is_sign_negative());
            }
            for pair in records.windows(2) {
                prop_assert!(pair[1].contribution_amount >= pair[0].contribution_amount);
            }
            prop_assert_eq!(records[records.len() - 1].projected_value_at_year_end, goal.goal_amount);
        }
    }
}
