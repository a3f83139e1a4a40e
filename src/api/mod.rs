use axum::{
    Router,
    extract::{Json, Query},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Args, ValueEnum};
use serde::{Deserialize, Deserializer, Serialize, de};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::{
    AdjustmentSchedule, Category, CategoryVisibility, GoalSolveConfig, GoalSolveResult, GoalType,
    ScenarioComparison, SimulationParameters, SpendingAdjustment, TimeUnit,
    compare_with_baseline, solve_goal, to_annual, validate_adjustments,
};

const WEEKS_PER_YEAR: f64 = 52.0;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliIncomeFormat {
    Annual,
    Hourly,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliExpenseFormat {
    Annual,
    Monthly,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliGoalType {
    RequiredSavings,
    MaxExpenses,
}

impl From<CliGoalType> for GoalType {
    fn from(value: CliGoalType) -> Self {
        match value {
            CliGoalType::RequiredSavings => GoalType::RequiredSavings,
            CliGoalType::MaxExpenses => GoalType::MaxExpenses,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiIncomeFormat {
    Annual,
    Hourly,
}

impl From<ApiIncomeFormat> for CliIncomeFormat {
    fn from(value: ApiIncomeFormat) -> Self {
        match value {
            ApiIncomeFormat::Annual => CliIncomeFormat::Annual,
            ApiIncomeFormat::Hourly => CliIncomeFormat::Hourly,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiExpenseFormat {
    Annual,
    Monthly,
}

impl From<ApiExpenseFormat> for CliExpenseFormat {
    fn from(value: ApiExpenseFormat) -> Self {
        match value {
            ApiExpenseFormat::Annual => CliExpenseFormat::Annual,
            ApiExpenseFormat::Monthly => CliExpenseFormat::Monthly,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiGoalType {
    #[serde(alias = "requiredSavings", alias = "required_savings")]
    RequiredSavings,
    #[serde(alias = "maxExpenses", alias = "max_expenses")]
    MaxExpenses,
}

impl From<ApiGoalType> for CliGoalType {
    fn from(value: ApiGoalType) -> Self {
        match value {
            ApiGoalType::RequiredSavings => CliGoalType::RequiredSavings,
            ApiGoalType::MaxExpenses => CliGoalType::MaxExpenses,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ApiTimeUnit {
    Annual,
    Monthly,
    Once,
}

impl From<ApiTimeUnit> for TimeUnit {
    fn from(value: ApiTimeUnit) -> Self {
        match value {
            ApiTimeUnit::Annual => TimeUnit::Annual,
            ApiTimeUnit::Monthly => TimeUnit::Monthly,
            ApiTimeUnit::Once => TimeUnit::Once,
        }
    }
}

fn default_adjustment_format() -> ApiTimeUnit {
    ApiTimeUnit::Monthly
}

/// One extra spending entry as the web client stores it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiAdjustment {
    #[serde(default)]
    value: f64,
    #[serde(default = "default_adjustment_format")]
    format: ApiTimeUnit,
    #[serde(default, deserialize_with = "loose_count")]
    years: Option<u32>,
    #[serde(default)]
    pre_re: bool,
    #[serde(default)]
    disabled: bool,
    #[serde(default)]
    car: bool,
    #[serde(default)]
    bike: bool,
}

impl From<ApiAdjustment> for SpendingAdjustment {
    fn from(value: ApiAdjustment) -> Self {
        let category = if value.car {
            Some(Category::Car)
        } else if value.bike {
            Some(Category::Bike)
        } else {
            None
        };
        SpendingAdjustment {
            value: value.value,
            time_unit: value.format.into(),
            duration_years: value.years,
            pre_retirement_only: value.pre_re,
            disabled: value.disabled,
            category,
        }
    }
}

// POST bodies carry the list itself; query strings carry it JSON-encoded so a URL
// can be bookmarked.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ApiAdjustmentList {
    List(Vec<ApiAdjustment>),
    Encoded(String),
}

impl ApiAdjustmentList {
    fn into_entries(self) -> Result<Vec<ApiAdjustment>, String> {
        match self {
            ApiAdjustmentList::List(entries) => Ok(entries),
            ApiAdjustmentList::Encoded(raw) => parse_encoded_adjustments(Some(&raw)),
        }
    }
}

fn parse_encoded_adjustments(raw: Option<&str>) -> Result<Vec<ApiAdjustment>, String> {
    match raw.map(str::trim) {
        None | Some("") => Ok(Vec::new()),
        Some(raw) => serde_json::from_str::<Vec<ApiAdjustment>>(raw)
            .map_err(|e| format!("Invalid extraSpendings: {e}")),
    }
}

// The web client keeps form fields as typed text and writes toggles as `1`, so blank
// strings mean "not set" and flags accept 0/1 as well as booleans.
#[derive(Deserialize)]
#[serde(untagged)]
enum LooseFlag {
    Bool(bool),
    Number(u64),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LooseCount {
    Number(u32),
    Text(String),
}

fn loose_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    match Option::<LooseFlag>::deserialize(deserializer)? {
        None => Ok(None),
        Some(LooseFlag::Bool(v)) => Ok(Some(v)),
        Some(LooseFlag::Number(n)) => Ok(Some(n != 0)),
        Some(LooseFlag::Text(text)) => match text.trim() {
            "" => Ok(None),
            "1" | "true" => Ok(Some(true)),
            "0" | "false" => Ok(Some(false)),
            other => Err(de::Error::custom(format!(
                "expected true, false, 1 or 0, got {other:?}"
            ))),
        },
    }
}

fn loose_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    match Option::<LooseCount>::deserialize(deserializer)? {
        None => Ok(None),
        Some(LooseCount::Number(n)) => Ok(Some(n)),
        Some(LooseCount::Text(text)) => match text.trim() {
            "" => Ok(None),
            digits => digits.parse::<u32>().map(Some).map_err(|_| {
                de::Error::custom(format!("expected a whole number of years, got {digits:?}"))
            }),
        },
    }
}

#[derive(Args, Debug, Clone)]
pub struct Cli {
    #[arg(
        long,
        default_value_t = 40_000.0,
        help = "Income after taxes, in --income-format units"
    )]
    income: f64,

    #[arg(long, value_enum, default_value_t = CliIncomeFormat::Annual)]
    income_format: CliIncomeFormat,

    #[arg(
        long,
        default_value_t = 40.0,
        help = "Hours worked per week, used when --income-format=hourly"
    )]
    hours: f64,

    #[arg(long, default_value_t = 20_000.0, help = "Expenses in --expenses-format units")]
    expenses: f64,

    #[arg(long, value_enum, default_value_t = CliExpenseFormat::Annual)]
    expenses_format: CliExpenseFormat,

    #[arg(long, help = "Annual savings; defaults to income minus expenses")]
    annual_savings: Option<f64>,

    #[arg(long, default_value_t = 0.0, help = "Current investments balance")]
    balance: f64,

    #[arg(
        long,
        default_value_t = 7.0,
        help = "Annual return on investments in percent, after inflation"
    )]
    return_rate: f64,

    #[arg(long, default_value_t = 4.0, help = "Safe withdrawal rate in percent")]
    withdrawal_rate: f64,

    #[arg(long, help = "Fixed chart length in years; 0 picks it automatically")]
    chart_years: Option<u32>,

    #[arg(long, help = "Include adjustments tagged as car costs")]
    show_car: bool,

    #[arg(long, help = "Include adjustments tagged as bike costs")]
    show_bike: bool,

    #[arg(long, help = "Extra spendings as a JSON array")]
    extra_spendings: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct GoalArgs {
    #[arg(long, value_enum, default_value_t = CliGoalType::RequiredSavings)]
    goal: CliGoalType,

    #[arg(long, help = "Year, counted from today, by which FI should be reached")]
    target_year: u32,

    #[arg(long, default_value_t = 0.0)]
    search_min: f64,

    #[arg(long, default_value_t = 200_000.0)]
    search_max: f64,

    #[arg(long, default_value_t = 1.0)]
    tolerance: f64,

    #[arg(long, default_value_t = 60)]
    max_iterations: u32,
}

impl From<&GoalArgs> for GoalSolveConfig {
    fn from(value: &GoalArgs) -> Self {
        GoalSolveConfig {
            goal_type: value.goal.into(),
            target_fi_year: value.target_year,
            search_min: value.search_min,
            search_max: value.search_max,
            tolerance: value.tolerance,
            max_iterations: value.max_iterations,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ApiPayload {
    income: Option<f64>,
    income_format: Option<ApiIncomeFormat>,
    hours: Option<f64>,
    expenses: Option<f64>,
    expenses_format: Option<ApiExpenseFormat>,
    annual_savings: Option<f64>,
    savings: Option<f64>,
    #[serde(rename = "return")]
    return_rate: Option<f64>,
    withdrawal: Option<f64>,
    #[serde(deserialize_with = "loose_count")]
    chart_years: Option<u32>,
    #[serde(deserialize_with = "loose_flag")]
    show_car: Option<bool>,
    #[serde(deserialize_with = "loose_flag")]
    show_bike: Option<bool>,
    extra_spendings: Option<ApiAdjustmentList>,

    goal: Option<ApiGoalType>,
    target_year: Option<u32>,
    search_min: Option<f64>,
    search_max: Option<f64>,
    tolerance: Option<f64>,
    max_iterations: Option<u32>,
}

#[derive(Debug, Clone)]
struct ProjectionRequest {
    params: SimulationParameters,
    adjustments: Vec<SpendingAdjustment>,
    visibility: CategoryVisibility,
    summary: InputSummary,
}

impl ProjectionRequest {
    fn schedule(&self) -> AdjustmentSchedule {
        AdjustmentSchedule::from_adjustments(self.visibility.visible(&self.adjustments))
    }
}

#[derive(Debug)]
struct ApiRequest {
    projection: ProjectionRequest,
    goal: GoalArgs,
}

/// Annualized inputs as the projection sees them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct InputSummary {
    annual_income: f64,
    annual_expenses: f64,
    annual_savings: f64,
    savings_rate: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResponse {
    inputs: InputSummary,
    #[serde(flatten)]
    comparison: ScenarioComparison,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SolveResponse {
    inputs: InputSummary,
    #[serde(flatten)]
    result: GoalSolveResult,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_request(
    cli: Cli,
    entries: Vec<ApiAdjustment>,
) -> Result<ProjectionRequest, String> {
    if !cli.income.is_finite() || cli.income < 0.0 {
        return Err("--income must be a finite number >= 0".to_string());
    }
    if cli.income_format == CliIncomeFormat::Hourly && !(cli.hours.is_finite() && cli.hours > 0.0)
    {
        return Err("--hours must be > 0 when --income-format=hourly".to_string());
    }
    if !cli.expenses.is_finite() || cli.expenses < 0.0 {
        return Err("--expenses must be a finite number >= 0".to_string());
    }
    if cli.annual_savings.is_some_and(|v| !v.is_finite()) {
        return Err("--annual-savings must be a finite number".to_string());
    }

    let annual_income = match cli.income_format {
        CliIncomeFormat::Annual => cli.income,
        CliIncomeFormat::Hourly => cli.income * WEEKS_PER_YEAR * cli.hours,
    };
    let annual_expenses = match cli.expenses_format {
        CliExpenseFormat::Annual => to_annual(cli.expenses, TimeUnit::Annual),
        CliExpenseFormat::Monthly => to_annual(cli.expenses, TimeUnit::Monthly),
    };
    let annual_savings = cli
        .annual_savings
        .unwrap_or(annual_income - annual_expenses);
    let savings_rate = if annual_income > 0.0 {
        (annual_savings / annual_income * 100.0).max(0.0)
    } else {
        0.0
    };

    let params = SimulationParameters {
        starting_balance: cli.balance,
        annual_savings,
        annual_expenses,
        annual_return_rate: cli.return_rate / 100.0,
        withdrawal_rate: cli.withdrawal_rate / 100.0,
        horizon_override: cli.chart_years.filter(|&years| years > 0),
    };
    params.validate().map_err(|e| e.to_string())?;

    let adjustments: Vec<SpendingAdjustment> = entries.into_iter().map(Into::into).collect();
    validate_adjustments(&adjustments).map_err(|e| e.to_string())?;

    Ok(ProjectionRequest {
        params,
        adjustments,
        visibility: CategoryVisibility {
            show_car: cli.show_car,
            show_bike: cli.show_bike,
        },
        summary: InputSummary {
            annual_income,
            annual_expenses,
            annual_savings,
            savings_rate,
        },
    })
}

fn build_cli_request(cli: Cli) -> Result<ProjectionRequest, String> {
    let entries = parse_encoded_adjustments(cli.extra_spendings.as_deref())?;
    build_request(cli, entries)
}

fn build_project_response(request: &ProjectionRequest) -> ProjectResponse {
    ProjectResponse {
        inputs: request.summary,
        comparison: compare_with_baseline(&request.params, &request.schedule()),
    }
}

fn build_solve_response(
    request: &ProjectionRequest,
    goal: &GoalArgs,
) -> Result<SolveResponse, String> {
    let result = solve_goal(&request.params, &request.schedule(), goal.into())
        .map_err(|e| e.to_string())?;
    Ok(SolveResponse {
        inputs: request.summary,
        result,
    })
}

/// Projection and baseline comparison as pretty JSON, for the command line.
pub fn project_json(cli: Cli) -> Result<String, String> {
    let request = build_cli_request(cli)?;
    let response = build_project_response(&request);
    serde_json::to_string_pretty(&response).map_err(|e| e.to_string())
}

pub fn solve_json(cli: Cli, goal: GoalArgs) -> Result<String, String> {
    let request = build_cli_request(cli)?;
    let response = build_solve_response(&request, &goal)?;
    serde_json::to_string_pretty(&response).map_err(|e| e.to_string())
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .route(
            "/api/solve",
            get(solve_get_handler).post(solve_post_handler),
        )
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "FI projection API listening");
    info!("local access: http://127.0.0.1:{port}/api/project");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn project_get_handler(Query(payload): Query<ApiPayload>) -> Response {
    project_handler_impl(payload)
}

async fn project_post_handler(Json(payload): Json<ApiPayload>) -> Response {
    project_handler_impl(payload)
}

async fn solve_get_handler(Query(payload): Query<ApiPayload>) -> Response {
    solve_handler_impl(payload)
}

async fn solve_post_handler(Json(payload): Json<ApiPayload>) -> Response {
    solve_handler_impl(payload)
}

fn project_handler_impl(payload: ApiPayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return bad_request(&msg),
    };

    let response = build_project_response(&request.projection);
    info!(
        baseline_fi_year = ?response.comparison.baseline.fi_year,
        adjusted_fi_year = ?response.comparison.adjusted.fi_year,
        status = ?response.comparison.adjusted.status,
        "projection served"
    );
    json_response(StatusCode::OK, response)
}

fn solve_handler_impl(payload: ApiPayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return bad_request(&msg),
    };

    match build_solve_response(&request.projection, &request.goal) {
        Ok(response) => {
            info!(
                goal = ?response.result.goal_type,
                solved_value = ?response.result.solved_value,
                feasible = response.result.feasible,
                "goal solve served"
            );
            json_response(StatusCode::OK, response)
        }
        Err(msg) => bad_request(&msg),
    }
}

fn bad_request(msg: &str) -> Response {
    warn!(error = msg, "rejected request");
    error_response(StatusCode::BAD_REQUEST, msg)
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
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
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<ApiPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: ApiPayload) -> Result<ApiRequest, String> {
    let mut cli = default_cli_for_api();
    let mut goal = default_goal_for_api();

    if let Some(v) = payload.income {
        cli.income = v;
    }
    if let Some(v) = payload.income_format {
        cli.income_format = v.into();
    }
    if let Some(v) = payload.hours {
        cli.hours = v;
    }
    if let Some(v) = payload.expenses {
        cli.expenses = v;
    }
    if let Some(v) = payload.expenses_format {
        cli.expenses_format = v.into();
    }
    if payload.annual_savings.is_some() {
        cli.annual_savings = payload.annual_savings;
    }
    if let Some(v) = payload.savings {
        cli.balance = v;
    }
    if let Some(v) = payload.return_rate {
        cli.return_rate = v;
    }
    if let Some(v) = payload.withdrawal {
        cli.withdrawal_rate = v;
    }
    if payload.chart_years.is_some() {
        cli.chart_years = payload.chart_years;
    }
    if let Some(v) = payload.show_car {
        cli.show_car = v;
    }
    if let Some(v) = payload.show_bike {
        cli.show_bike = v;
    }

    if let Some(v) = payload.goal {
        goal.goal = v.into();
    }
    if let Some(v) = payload.target_year {
        goal.target_year = v;
    }
    if let Some(v) = payload.search_min {
        goal.search_min = v;
    }
    if let Some(v) = payload.search_max {
        goal.search_max = v;
    }
    if let Some(v) = payload.tolerance {
        goal.tolerance = v;
    }
    if let Some(v) = payload.max_iterations {
        goal.max_iterations = v;
    }

    let entries = match payload.extra_spendings {
        Some(list) => list.into_entries()?,
        None => Vec::new(),
    };
    let projection = build_request(cli, entries)?;

    Ok(ApiRequest { projection, goal })
}

fn default_cli_for_api() -> Cli {
    Cli {
        income: 40_000.0,
        income_format: CliIncomeFormat::Annual,
        hours: 40.0,
        expenses: 20_000.0,
        expenses_format: CliExpenseFormat::Annual,
        annual_savings: None,
        balance: 0.0,
        return_rate: 7.0,
        withdrawal_rate: 4.0,
        chart_years: None,
        show_car: false,
        show_bike: false,
        extra_spendings: None,
    }
}

fn default_goal_for_api() -> GoalArgs {
    GoalArgs {
        goal: CliGoalType::RequiredSavings,
        target_year: 20,
        search_min: 0.0,
        search_max: 200_000.0,
        tolerance: 1.0,
        max_iterations: 60,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FlowDirection, ProjectionStatus};
    use axum::http::Uri;
    use clap::Parser;
    use std::fs;
    use std::path::Path;

    const EPS: f64 = 1e-6;

    #[derive(Parser, Debug)]
    struct TestApp {
        #[command(flatten)]
        cli: Cli,
    }

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_cli() -> Cli {
        default_cli_for_api()
    }

    fn small_cli() -> Cli {
        let mut cli = sample_cli();
        cli.income = 2_000.0;
        cli.expenses = 1_000.0;
        cli.return_rate = 0.0;
        cli.withdrawal_rate = 10.0;
        cli
    }

    fn assert_golden_snapshot(path: &str, actual: &str) {
        let update = matches!(
            std::env::var("UPDATE_GOLDEN").as_deref(),
            Ok("1") | Ok("true") | Ok("TRUE")
        );
        let snapshot_path = Path::new(path);

        if update {
            if let Some(parent) = snapshot_path.parent() {
                fs::create_dir_all(parent).expect("failed to create snapshot directory");
            }
            fs::write(snapshot_path, actual).expect("failed to write golden snapshot");
            return;
        }

        let expected = fs::read_to_string(snapshot_path).unwrap_or_else(|_| {
            panic!("missing golden snapshot at {path}; run with UPDATE_GOLDEN=1 to generate")
        });
        assert_eq!(
            actual, expected,
            "snapshot mismatch for {path}; run with UPDATE_GOLDEN=1 to refresh if expected"
        );
    }

    #[test]
    fn cli_flags_parse_with_defaults() {
        let app = TestApp::try_parse_from([
            "fire-path",
            "--income",
            "60000",
            "--expenses-format",
            "monthly",
            "--expenses",
            "2000",
            "--show-car",
        ])
        .expect("flags should parse");

        let request = build_cli_request(app.cli).expect("valid request");
        assert_approx(request.summary.annual_income, 60_000.0);
        assert_approx(request.summary.annual_expenses, 24_000.0);
        assert_approx(request.summary.annual_savings, 36_000.0);
        assert_approx(request.params.annual_return_rate, 0.07);
        assert_approx(request.params.withdrawal_rate, 0.04);
        assert!(request.visibility.show_car);
        assert!(!request.visibility.show_bike);
        assert!(request.adjustments.is_empty());
    }

    #[test]
    fn build_request_converts_hourly_income() {
        let mut cli = sample_cli();
        cli.income = 25.0;
        cli.income_format = CliIncomeFormat::Hourly;
        cli.hours = 30.0;

        let request = build_cli_request(cli).expect("valid request");
        assert_approx(request.summary.annual_income, 39_000.0);
        assert_approx(request.params.annual_savings, 19_000.0);
        assert_approx(request.summary.savings_rate, 19_000.0 / 39_000.0 * 100.0);
    }

    #[test]
    fn build_request_prefers_explicit_savings() {
        let mut cli = sample_cli();
        cli.annual_savings = Some(5_000.0);

        let request = build_cli_request(cli).expect("valid request");
        assert_approx(request.params.annual_savings, 5_000.0);
        assert_approx(request.summary.savings_rate, 12.5);
    }

    #[test]
    fn savings_rate_is_clamped_at_zero() {
        let mut cli = sample_cli();
        cli.income = 10_000.0;

        let request = build_cli_request(cli).expect("valid request");
        assert_approx(request.params.annual_savings, -10_000.0);
        assert_approx(request.summary.savings_rate, 0.0);
    }

    #[test]
    fn zero_chart_years_means_automatic() {
        let mut cli = sample_cli();
        cli.chart_years = Some(0);
        let request = build_cli_request(cli).expect("valid request");
        assert_eq!(request.params.horizon_override, None);

        let mut cli = sample_cli();
        cli.chart_years = Some(25);
        let request = build_cli_request(cli).expect("valid request");
        assert_eq!(request.params.horizon_override, Some(25));
    }

    #[test]
    fn build_request_rejects_zero_hours_for_hourly_income() {
        let mut cli = sample_cli();
        cli.income_format = CliIncomeFormat::Hourly;
        cli.hours = 0.0;

        let err = build_cli_request(cli).expect_err("zero hours must be rejected");
        assert!(err.contains("--hours"));
    }

    #[test]
    fn build_request_rejects_negative_expenses() {
        let mut cli = sample_cli();
        cli.expenses = -1.0;

        let err = build_cli_request(cli).expect_err("negative expenses must be rejected");
        assert!(err.contains("--expenses"));
    }

    #[test]
    fn build_request_rejects_zero_withdrawal_rate() {
        let mut cli = sample_cli();
        cli.withdrawal_rate = 0.0;

        let err = build_cli_request(cli).expect_err("zero withdrawal rate must be rejected");
        assert!(err.contains("withdrawal rate"));
    }

    #[test]
    fn build_request_rejects_malformed_extra_spendings() {
        let mut cli = sample_cli();
        cli.extra_spendings = Some("[{\"value\": }".to_string());

        let err = build_cli_request(cli).expect_err("bad JSON must be rejected");
        assert!(err.starts_with("Invalid extraSpendings"));
    }

    #[test]
    fn api_request_from_json_parses_web_keys() {
        let request = api_request_from_json(
            r#"{
                "income": 3000,
                "incomeFormat": "annual",
                "expenses": 100,
                "expensesFormat": "monthly",
                "savings": 5000,
                "return": 5,
                "withdrawal": 3.5,
                "chartYears": 40,
                "showBike": true,
                "extraSpendings": [
                    {"value": 50, "format": "monthly", "years": 3, "preRe": true},
                    {"value": 900, "format": "once", "bike": true},
                    {"value": -20, "format": "annual", "disabled": true, "car": true}
                ],
                "goal": "max-expenses",
                "targetYear": 12
            }"#,
        )
        .expect("valid payload");

        let projection = &request.projection;
        assert_approx(projection.params.starting_balance, 5_000.0);
        assert_approx(projection.params.annual_expenses, 1_200.0);
        assert_approx(projection.params.annual_savings, 1_800.0);
        assert_approx(projection.params.annual_return_rate, 0.05);
        assert_approx(projection.params.withdrawal_rate, 0.035);
        assert_eq!(projection.params.horizon_override, Some(40));
        assert!(projection.visibility.show_bike);
        assert!(!projection.visibility.show_car);

        assert_eq!(projection.adjustments.len(), 3);
        let first = &projection.adjustments[0];
        assert_eq!(first.time_unit, TimeUnit::Monthly);
        assert_eq!(first.duration_years, Some(3));
        assert!(first.pre_retirement_only);
        assert_eq!(first.category, None);
        assert_eq!(projection.adjustments[1].category, Some(Category::Bike));
        assert_eq!(projection.adjustments[2].category, Some(Category::Car));
        assert!(projection.adjustments[2].disabled);

        let schedule = projection.schedule();
        assert_approx(schedule.recurring_at(0), 600.0);
        assert_approx(schedule.one_time_total(), 900.0);

        assert_eq!(request.goal.goal, CliGoalType::MaxExpenses);
        assert_eq!(request.goal.target_year, 12);
    }

    #[test]
    fn hidden_categories_are_left_out_of_the_schedule() {
        let request = api_request_from_json(
            r#"{"extraSpendings": [
                {"value": 100, "format": "annual", "car": true},
                {"value": 10, "format": "annual"}
            ]}"#,
        )
        .expect("valid payload");

        assert_approx(request.projection.schedule().recurring_at(0), 10.0);
    }

    #[test]
    fn query_string_accepts_encoded_extra_spendings() {
        let uri: Uri = "/api/project?income=50000&showCar=true&extraSpendings=%5B%7B%22value%22%3A300%2C%22format%22%3A%22monthly%22%2C%22car%22%3Atrue%7D%5D"
            .parse()
            .expect("valid uri");
        let Query(payload) = Query::<ApiPayload>::try_from_uri(&uri).expect("valid query");
        let request = api_request_from_payload(payload).expect("valid payload");

        let projection = &request.projection;
        assert_approx(projection.summary.annual_income, 50_000.0);
        assert_eq!(projection.adjustments.len(), 1);
        assert_eq!(projection.adjustments[0].category, Some(Category::Car));
        assert_approx(projection.schedule().recurring_at(0), 3_600.0);
    }

    #[test]
    fn query_string_accepts_numeric_toggles() {
        let uri: Uri = "/api/project?showCar=1&showBike=1&extraSpendings=%5B%7B%22value%22%3A100%2C%22format%22%3A%22annual%22%2C%22bike%22%3Atrue%7D%5D"
            .parse()
            .expect("valid uri");
        let Query(payload) = Query::<ApiPayload>::try_from_uri(&uri).expect("valid query");
        let request = api_request_from_payload(payload).expect("valid payload");

        assert!(request.projection.visibility.show_car);
        assert!(request.projection.visibility.show_bike);
        assert_approx(request.projection.schedule().recurring_at(0), 100.0);

        let uri: Uri = "/api/project?showCar=0&showBike=false".parse().expect("valid uri");
        let Query(payload) = Query::<ApiPayload>::try_from_uri(&uri).expect("valid query");
        let request = api_request_from_payload(payload).expect("valid payload");
        assert!(!request.projection.visibility.show_car);
        assert!(!request.projection.visibility.show_bike);
    }

    #[test]
    fn query_string_rejects_unknown_toggle_values() {
        let uri: Uri = "/api/project?showCar=yes".parse().expect("valid uri");
        assert!(Query::<ApiPayload>::try_from_uri(&uri).is_err());
    }

    #[test]
    fn blank_chart_years_means_automatic() {
        let uri: Uri = "/api/project?chartYears=&income=50000".parse().expect("valid uri");
        let Query(payload) = Query::<ApiPayload>::try_from_uri(&uri).expect("valid query");
        let request = api_request_from_payload(payload).expect("valid payload");
        assert_eq!(request.projection.params.horizon_override, None);

        let uri: Uri = "/api/project?chartYears=25".parse().expect("valid uri");
        let Query(payload) = Query::<ApiPayload>::try_from_uri(&uri).expect("valid query");
        let request = api_request_from_payload(payload).expect("valid payload");
        assert_eq!(request.projection.params.horizon_override, Some(25));
    }

    #[test]
    fn blank_adjustment_years_means_indefinite() {
        let request = api_request_from_json(
            r#"{"extraSpendings": [
                {"value": 10, "format": "annual", "years": ""},
                {"value": 20, "format": "annual", "years": "3"}
            ]}"#,
        )
        .expect("valid payload");

        let adjustments = &request.projection.adjustments;
        assert_eq!(adjustments[0].duration_years, None);
        assert_eq!(adjustments[1].duration_years, Some(3));
        assert_approx(request.projection.schedule().recurring_at(10), 10.0);
    }

    #[test]
    fn entry_tagged_car_and_bike_follows_the_car_toggle() {
        let request = api_request_from_json(
            r#"{"showCar": true, "extraSpendings": [
                {"value": 100, "format": "annual", "car": true, "bike": true}
            ]}"#,
        )
        .expect("valid payload");

        assert_eq!(request.projection.adjustments[0].category, Some(Category::Car));
        assert_approx(request.projection.schedule().recurring_at(0), 100.0);
    }

    #[test]
    fn adjustment_entries_default_to_monthly() {
        let request = api_request_from_json(r#"{"extraSpendings": [{"value": 10}]}"#)
            .expect("valid payload");

        assert_eq!(request.projection.adjustments[0].time_unit, TimeUnit::Monthly);
        assert_eq!(request.projection.adjustments[0].duration_years, None);
    }

    #[test]
    fn empty_encoded_extra_spendings_is_an_empty_list() {
        let request =
            api_request_from_json(r#"{"extraSpendings": ""}"#).expect("valid payload");
        assert!(request.projection.adjustments.is_empty());
    }

    #[test]
    fn project_response_serialization_contains_expected_fields() {
        let mut cli = small_cli();
        cli.extra_spendings = Some(r#"[{"value": 500, "format": "annual"}]"#.to_string());

        let request = build_cli_request(cli).expect("valid request");
        let response = build_project_response(&request);
        assert_eq!(response.comparison.baseline.fi_year, Some(10));
        assert_eq!(response.comparison.adjusted.fi_year, Some(30));
        assert_eq!(response.comparison.fi_year_delta, Some(20));
        assert_eq!(response.comparison.direction, FlowDirection::ExtraExpense);
        assert_eq!(
            response.comparison.adjusted.status,
            ProjectionStatus::Reached
        );

        let json = serde_json::to_string(&response).expect("response should serialize");
        assert!(json.contains("\"inputs\""));
        assert!(json.contains("\"savingsRate\""));
        assert!(json.contains("\"baseline\""));
        assert!(json.contains("\"adjusted\""));
        assert!(json.contains("\"fiYearDelta\""));
        assert!(json.contains("\"fiTarget\""));
        assert!(json.contains("\"direction\":\"extra-expense\""));
        assert!(json.contains("\"status\":\"reached\""));
    }

    #[test]
    fn solve_request_finds_required_savings() {
        let request = api_request_from_json(
            r#"{
                "income": 2000,
                "expenses": 1000,
                "return": 0,
                "withdrawal": 10,
                "goal": "required-savings",
                "targetYear": 10,
                "searchMax": 5000,
                "tolerance": 0.5
            }"#,
        )
        .expect("valid payload");

        let response =
            build_solve_response(&request.projection, &request.goal).expect("solvable goal");
        assert!(response.result.feasible);
        assert!(response.result.converged);
        let solved = response.result.solved_value.expect("solved value");
        assert!((solved - 1_000.0).abs() <= 0.5, "solved {solved}");
        assert_eq!(response.result.achieved_fi_year, Some(10));

        let json = serde_json::to_string(&response).expect("response should serialize");
        assert!(json.contains("\"goalType\":\"required-savings\""));
        assert!(json.contains("\"solvedValue\""));
        assert!(json.contains("\"iterations\""));
    }

    #[test]
    fn solve_request_rejects_empty_search_range() {
        let request = api_request_from_json(r#"{"searchMin": 10, "searchMax": 10}"#)
            .expect("valid payload");

        let err = build_solve_response(&request.projection, &request.goal)
            .expect_err("empty range must be rejected");
        assert!(err.contains("search_max"));
    }

    #[test]
    fn golden_snapshot_extra_expense_comparison_json() {
        let mut cli = small_cli();
        cli.extra_spendings = Some(r#"[{"value": 500, "format": "annual"}]"#.to_string());

        let request = build_cli_request(cli).expect("valid request");
        let response = build_project_response(&request);
        let json = format!(
            "{}\n",
            serde_json::to_string(&response).expect("response should serialize")
        );

        assert_golden_snapshot("tests/golden/extra_expense_comparison.json", &json);
    }
}
