use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::{
    EngineError, ExistingPlan, FutureValueParams, GoalSpec, LumpSumReprojection, YearRecord,
    calculate_progress, format_currency, project_future_value, reproject_after_lump_sum,
    solve_required_contribution,
};

const MAX_HORIZON_YEARS: u32 = 100;
const DEFAULT_PORT: u16 = 8080;

#[derive(Parser, Debug)]
#[command(
    name = "savings-planner",
    about = "Goal-based savings planner: required monthly contribution and yearly projection"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the JSON API over HTTP
    Serve {
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
    /// Solve the monthly contribution for a goal and print the schedule
    Solve(GoalArgs),
    /// Project the value of a contribution schedule forward
    FutureValue(FutureValueArgs),
    /// Re-solve an existing plan after a lump-sum top-up
    LumpSum(LumpSumArgs),
}

#[derive(Args, Debug, Clone)]
struct GoalArgs {
    #[arg(long, help = "Target amount to reach at the end of the horizon")]
    goal_amount: f64,
    #[arg(long, help = "Number of years to reach the goal")]
    horizon_years: u32,
    #[arg(long, help = "Expected annual return in percent, e.g. 12")]
    return_rate: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Annual step-up of the monthly contribution in percent"
    )]
    increase_rate: f64,
    #[arg(long, default_value_t = 0.0, help = "Amount invested up front")]
    lump_sum: f64,
}

#[derive(Args, Debug, Clone)]
struct FutureValueArgs {
    #[arg(long, default_value_t = 0.0)]
    principal: f64,
    #[arg(long)]
    monthly_contribution: f64,
    #[arg(long)]
    years: u32,
    #[arg(long, help = "Expected annual return in percent, e.g. 12")]
    return_rate: f64,
    #[arg(long, default_value_t = 0.0)]
    increase_rate: f64,
}

#[derive(Args, Debug, Clone)]
struct LumpSumArgs {
    #[command(flatten)]
    goal: GoalArgs,
    #[arg(long, help = "Monthly contribution currently being paid")]
    current_contribution: f64,
    #[arg(long, default_value_t = 0.0, help = "Amount invested in the plan so far")]
    accumulated_amount: f64,
    #[arg(long, help = "Top-up to add to the accumulated amount")]
    amount: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PlanPayload {
    #[serde(alias = "targetAmount")]
    goal_amount: Option<f64>,
    #[serde(alias = "timeline")]
    horizon_years: Option<u32>,
    #[serde(alias = "annualReturnRatePercent")]
    return_rate: Option<f64>,
    #[serde(alias = "sipIncrease", alias = "annualIncreaseRatePercent")]
    increase_rate: Option<f64>,
    #[serde(alias = "initialLumpsum")]
    initial_lump_sum: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct FutureValuePayload {
    principal: Option<f64>,
    #[serde(alias = "monthlyInvestment")]
    monthly_contribution: Option<f64>,
    years: Option<u32>,
    return_rate: Option<f64>,
    #[serde(alias = "sipIncrease")]
    increase_rate: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct LumpSumPayload {
    #[serde(flatten)]
    plan: PlanPayload,
    #[serde(alias = "currentSIP")]
    current_contribution: Option<f64>,
    accumulated_amount: Option<f64>,
    #[serde(alias = "lumpsumAmount")]
    amount: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProgressQuery {
    current: Option<f64>,
    target: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanResponse {
    required_monthly_contribution: Decimal,
    formatted_monthly_contribution: String,
    goal_amount: Decimal,
    formatted_goal_amount: String,
    yearly_breakdown: Vec<YearRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FutureValueResponse {
    future_value: Decimal,
    formatted_future_value: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProgressResponse {
    percent: u32,
    formatted_current: String,
    formatted_target: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub async fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Command::Serve { port } => run_http_server(port)
            .await
            .map_err(|e| format!("Server error: {e}")),
        Command::Solve(args) => {
            let spec = build_goal_spec(goal_payload_from_args(&args))?;
            print_json(&plan_response(&spec)?)
        }
        Command::FutureValue(args) => {
            let params = build_future_value_params(FutureValuePayload {
                principal: Some(args.principal),
                monthly_contribution: Some(args.monthly_contribution),
                years: Some(args.years),
                return_rate: Some(args.return_rate),
                increase_rate: Some(args.increase_rate),
            })?;
            print_json(&future_value_response(&params)?)
        }
        Command::LumpSum(args) => {
            let payload = LumpSumPayload {
                plan: goal_payload_from_args(&args.goal),
                current_contribution: Some(args.current_contribution),
                accumulated_amount: Some(args.accumulated_amount),
                amount: Some(args.amount),
            };
            let (plan, amount) = build_lump_sum_request(payload)?;
            print_json(&lump_sum_response(&plan, amount)?)
        }
    }
}

fn goal_payload_from_args(args: &GoalArgs) -> PlanPayload {
    PlanPayload {
        goal_amount: Some(args.goal_amount),
        horizon_years: Some(args.horizon_years),
        return_rate: Some(args.return_rate),
        increase_rate: Some(args.increase_rate),
        initial_lump_sum: Some(args.lump_sum),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let json =
        serde_json::to_string_pretty(value).map_err(|e| format!("Serialization error: {e}"))?;
    println!("{json}");
    Ok(())
}

fn to_decimal(name: &str, value: f64) -> Result<Decimal, String> {
    if !value.is_finite() {
        return Err(format!("{name} must be a finite number"));
    }
    Decimal::from_f64(value).ok_or_else(|| format!("{name} is out of range"))
}

fn required_non_negative(name: &str, value: Option<f64>) -> Result<Decimal, String> {
    let Some(value) = value else {
        return Err(format!("{name} is required"));
    };
    optional_non_negative(name, Some(value))
}

fn optional_non_negative(name: &str, value: Option<f64>) -> Result<Decimal, String> {
    let value = value.unwrap_or(0.0);
    if value < 0.0 {
        return Err(format!("{name} must be >= 0"));
    }
    to_decimal(name, value)
}

fn build_goal_spec(payload: PlanPayload) -> Result<GoalSpec, String> {
    let Some(goal_amount) = payload.goal_amount else {
        return Err("goalAmount is required".to_string());
    };
    if !goal_amount.is_finite() || goal_amount <= 0.0 {
        return Err("goalAmount must be > 0".to_string());
    }

    let Some(horizon_years) = payload.horizon_years else {
        return Err("horizonYears is required".to_string());
    };
    if !(1..=MAX_HORIZON_YEARS).contains(&horizon_years) {
        return Err(format!(
            "horizonYears must be between 1 and {MAX_HORIZON_YEARS}"
        ));
    }

    Ok(GoalSpec {
        goal_amount: to_decimal("goalAmount", goal_amount)?,
        horizon_years,
        annual_return_rate_percent: required_non_negative("returnRate", payload.return_rate)?,
        annual_increase_rate_percent: optional_non_negative(
            "increaseRate",
            payload.increase_rate,
        )?,
        initial_lump_sum: optional_non_negative("initialLumpSum", payload.initial_lump_sum)?,
    })
}

fn build_future_value_params(payload: FutureValuePayload) -> Result<FutureValueParams, String> {
    let Some(years) = payload.years else {
        return Err("years is required".to_string());
    };
    if !(1..=MAX_HORIZON_YEARS).contains(&years) {
        return Err(format!("years must be between 1 and {MAX_HORIZON_YEARS}"));
    }

    Ok(FutureValueParams {
        principal: optional_non_negative("principal", payload.principal)?,
        monthly_contribution: required_non_negative(
            "monthlyContribution",
            payload.monthly_contribution,
        )?,
        years,
        annual_return_rate_percent: required_non_negative("returnRate", payload.return_rate)?,
        annual_increase_rate_percent: optional_non_negative(
            "increaseRate",
            payload.increase_rate,
        )?,
    })
}

fn build_lump_sum_request(payload: LumpSumPayload) -> Result<(ExistingPlan, Decimal), String> {
    let spec = build_goal_spec(payload.plan)?;
    let plan = ExistingPlan {
        goal_amount: spec.goal_amount,
        horizon_years: spec.horizon_years,
        annual_return_rate_percent: spec.annual_return_rate_percent,
        annual_increase_rate_percent: spec.annual_increase_rate_percent,
        current_monthly_contribution: required_non_negative(
            "currentContribution",
            payload.current_contribution,
        )?,
        accumulated_amount: optional_non_negative("accumulatedAmount", payload.accumulated_amount)?,
    };
    let amount = required_non_negative("amount", payload.amount)?;
    if amount.is_zero() {
        return Err("amount must be > 0".to_string());
    }
    Ok((plan, amount))
}

fn engine_error_message(err: EngineError) -> String {
    match err {
        EngineError::InvalidInput(msg) => msg,
        EngineError::Overflow(what) => {
            format!("inputs are too large to project ({what} overflowed)")
        }
    }
}

fn plan_response(spec: &GoalSpec) -> Result<PlanResponse, String> {
    let result = solve_required_contribution(spec).map_err(engine_error_message)?;
    Ok(PlanResponse {
        formatted_monthly_contribution: format_currency(result.required_monthly_contribution),
        required_monthly_contribution: result.required_monthly_contribution,
        goal_amount: spec.goal_amount,
        formatted_goal_amount: format_currency(spec.goal_amount),
        yearly_breakdown: result.yearly_breakdown,
    })
}

fn future_value_response(params: &FutureValueParams) -> Result<FutureValueResponse, String> {
    let result = project_future_value(params).map_err(engine_error_message)?;
    Ok(FutureValueResponse {
        future_value: result.future_value,
        formatted_future_value: format_currency(result.future_value),
    })
}

fn lump_sum_response(plan: &ExistingPlan, amount: Decimal) -> Result<LumpSumReprojection, String> {
    reproject_after_lump_sum(plan, amount).map_err(engine_error_message)
}

fn progress_response(query: ProgressQuery) -> Result<ProgressResponse, String> {
    let current = optional_non_negative("current", query.current)?;
    let target = required_non_negative("target", query.target)?;
    Ok(ProgressResponse {
        percent: calculate_progress(current, target),
        formatted_current: format_currency(current),
        formatted_target: format_currency(target),
    })
}

pub fn router() -> Router {
    Router::new()
        .route("/api/plan", get(plan_get_handler).post(plan_post_handler))
        .route(
            "/api/future-value",
            get(future_value_get_handler).post(future_value_post_handler),
        )
        .route("/api/lump-sum", post(lump_sum_handler))
        .route("/api/progress", get(progress_handler))
        .fallback(not_found_handler)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "savings planner API listening");
    info!("local access: http://127.0.0.1:{port}/api/plan");

    axum::serve(listener, router()).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn plan_get_handler(Query(payload): Query<PlanPayload>) -> Response {
    plan_handler_impl(payload)
}

async fn plan_post_handler(Json(payload): Json<PlanPayload>) -> Response {
    plan_handler_impl(payload)
}

fn plan_handler_impl(payload: PlanPayload) -> Response {
    respond(build_goal_spec(payload).and_then(|spec| plan_response(&spec)))
}

async fn future_value_get_handler(Query(payload): Query<FutureValuePayload>) -> Response {
    future_value_handler_impl(payload)
}

async fn future_value_post_handler(Json(payload): Json<FutureValuePayload>) -> Response {
    future_value_handler_impl(payload)
}

fn future_value_handler_impl(payload: FutureValuePayload) -> Response {
    respond(build_future_value_params(payload).and_then(|params| future_value_response(&params)))
}

async fn lump_sum_handler(Json(payload): Json<LumpSumPayload>) -> Response {
    respond(
        build_lump_sum_request(payload).and_then(|(plan, amount)| lump_sum_response(&plan, amount)),
    )
}

async fn progress_handler(Query(query): Query<ProgressQuery>) -> Response {
    respond(progress_response(query))
}

fn respond<T: Serialize>(result: Result<T, String>) -> Response {
    match result {
        Ok(body) => json_response(StatusCode::OK, body),
        Err(msg) => {
            warn!(error = %msg, "rejected request");
            error_response(StatusCode::BAD_REQUEST, &msg)
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn goal_spec_from_json(json: &str) -> Result<GoalSpec, String> {
    let payload = serde_json::from_str::<PlanPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    build_goal_spec(payload)
}
