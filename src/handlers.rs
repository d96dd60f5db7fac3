use crate::auth::{self, AccountMode, AccountOutcome, AccountRequest};
use crate::chart::{build_pie, render_svg, GREENS, QUALITATIVE};
use crate::errors::{AppError, AuthError, StoreError};
use crate::models::{
    CategoryRecord, LoginForm, ModeQuery, RecoverForm, SignUpForm, SliceResponse, UpdateForm,
    UpdateRequest, UpdateResponse,
};
use crate::session::Session;
use crate::state::AppState;
use crate::ui::{
    render_account, render_input, render_status, render_tracker, render_unavailable, Notice,
    View,
};
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Form, Json,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{error, info, warn};

const ACCOUNTS_UNAVAILABLE: &str = "Accounts are unavailable right now. Please try again later.";

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub async fn index(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<ModeQuery>,
) -> Response {
    if state.sessions.current(&jar).await.is_authenticated() {
        return Redirect::to(View::Status.path()).into_response();
    }
    let mode = AccountMode::parse(query.mode.as_deref());
    Html(render_account(mode, "", None)).into_response()
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let request = AccountRequest::Login {
        username: form.username.clone(),
        password: form.password,
    };
    match auth::submit(&state.credentials, request).await {
        Ok(outcome) => {
            let jar = state.sessions.end(jar).await;
            let session = Session::Anonymous.apply(&outcome);
            let cookie = state.sessions.begin(session).await;
            (jar.add(cookie), Redirect::to(View::Status.path())).into_response()
        }
        Err(err) => account_error(AccountMode::Login, &form.username, err),
    }
}

pub async fn signup(State(state): State<AppState>, Form(form): Form<SignUpForm>) -> Response {
    let recovery_key = Some(form.recovery_key).filter(|key| !key.is_empty());
    let request = AccountRequest::SignUp {
        username: form.username.clone(),
        password: form.password,
        recovery_key,
    };
    match auth::submit(&state.credentials, request).await {
        Ok(_) => {
            let notice = Notice::success("Account created! Please switch to Login.");
            Html(render_account(AccountMode::SignUp, "", Some(&notice))).into_response()
        }
        Err(err) => account_error(AccountMode::SignUp, &form.username, err),
    }
}

pub async fn recover(State(state): State<AppState>, Form(form): Form<RecoverForm>) -> Response {
    let request = AccountRequest::Recover {
        username: form.username.clone(),
        recovery_key: form.recovery_key,
    };
    match auth::submit(&state.credentials, request).await {
        Ok(AccountOutcome::Revealed { user, password }) => {
            let notice = Notice::success(format!("Your password is: {password}"));
            Html(render_account(AccountMode::Recover, &user, Some(&notice))).into_response()
        }
        Ok(other) => {
            error!("unexpected recovery outcome: {other:?}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Err(err) => account_error(AccountMode::Recover, &form.username, err),
    }
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    let session = state.sessions.current(&jar).await;
    if let Some(user) = session.user() {
        info!(user = %user, "logged out");
    }
    let jar = state.sessions.end(jar).await;
    (jar, Redirect::to("/"))
}

pub async fn status(State(state): State<AppState>, jar: CookieJar) -> Result<Response, Response> {
    let user = require_user(&state, &jar).await?;
    let records = state.categories.load().await.map_err(page_error)?;
    let chart = render_svg(&build_pie(&records), GREENS, 0.0, "Carbon Contribution by Category");
    Ok(Html(render_status(&user, &chart)).into_response())
}

pub async fn tracker(State(state): State<AppState>, jar: CookieJar) -> Result<Response, Response> {
    let user = require_user(&state, &jar).await?;
    let records = state.categories.load().await.map_err(page_error)?;
    let chart = render_svg(&build_pie(&records), QUALITATIVE, 0.4, "Distribution of Emissions");
    Ok(Html(render_tracker(&user, &chart)).into_response())
}

pub async fn input_form(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Response, Response> {
    let user = require_user(&state, &jar).await?;
    let records = state.categories.load().await.map_err(page_error)?;
    Ok(Html(render_input(&user, &records, None, None)).into_response())
}

pub async fn input_submit(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<UpdateForm>,
) -> Result<Response, Response> {
    let user = require_user(&state, &jar).await?;

    let value = match parse_value(&form.value) {
        Some(value) => value,
        None => {
            let records = state.categories.load().await.map_err(page_error)?;
            let notice = Notice::error("New Value must be a number of at least 0");
            let page = render_input(&user, &records, Some(&form.category), Some(&notice));
            return Ok((StatusCode::BAD_REQUEST, Html(page)).into_response());
        }
    };

    match state.categories.update(&form.category, value).await {
        Ok(record) => info!(
            user = %user,
            category = %record.category,
            value = record.value,
            "category updated"
        ),
        // The page still reports success for an unknown category.
        Err(StoreError::CategoryNotFound(name)) => {
            warn!(user = %user, category = %name, "update ignored: category not found")
        }
        Err(err) => return Err(page_error(err)),
    }

    let records = state.categories.load().await.map_err(page_error)?;
    let notice = Notice::success(format!(
        "Successfully updated {} in the Excel sheet!",
        form.category
    ));
    let page = render_input(&user, &records, Some(&form.category), Some(&notice));
    Ok(Html(page).into_response())
}

pub async fn export(State(state): State<AppState>, jar: CookieJar) -> Result<Response, AppError> {
    require_api_user(&state, &jar).await?;
    let bytes = state.categories.export().await?;
    Ok((
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"main_data.xlsx\"",
            ),
        ],
        bytes,
    )
        .into_response())
}

pub async fn list_categories(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<Vec<CategoryRecord>>, AppError> {
    require_api_user(&state, &jar).await?;
    Ok(Json(state.categories.load().await?))
}

pub async fn update_category(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<UpdateRequest>,
) -> Result<Json<UpdateResponse>, AppError> {
    let user = require_api_user(&state, &jar).await?;
    if !payload.value.is_finite() || payload.value < 0.0 {
        return Err(AppError::bad_request("value must be a number of at least 0"));
    }

    match state.categories.update(&payload.category, payload.value).await {
        Ok(record) => {
            info!(user = %user, category = %record.category, value = record.value, "category updated");
            Ok(Json(UpdateResponse {
                category: record.category,
                value: record.value,
                kind: Some(record.kind),
                updated: true,
            }))
        }
        Err(StoreError::CategoryNotFound(name)) => {
            warn!(user = %user, category = %name, "update ignored: category not found");
            Ok(Json(UpdateResponse {
                category: name,
                value: payload.value,
                kind: None,
                updated: false,
            }))
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn get_breakdown(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<Vec<SliceResponse>>, AppError> {
    require_api_user(&state, &jar).await?;
    let records = state.categories.load().await?;
    Ok(Json(build_pie(&records).to_response()))
}

async fn require_user(state: &AppState, jar: &CookieJar) -> Result<String, Response> {
    match state.sessions.current(jar).await {
        Session::Authenticated { user, .. } => Ok(user),
        Session::Anonymous => Err(Redirect::to("/").into_response()),
    }
}

async fn require_api_user(state: &AppState, jar: &CookieJar) -> Result<String, AppError> {
    state
        .sessions
        .current(jar)
        .await
        .user()
        .map(str::to_string)
        .ok_or_else(AppError::unauthorized)
}

fn account_error(mode: AccountMode, username: &str, err: AuthError) -> Response {
    let notice = match &err {
        AuthError::Store(store) => {
            error!("account flow failed: {store}");
            Notice::error(ACCOUNTS_UNAVAILABLE)
        }
        AuthError::DuplicateUser => Notice::warning(err.to_string()),
        _ => Notice::error(err.to_string()),
    };
    let page = render_account(mode, username.trim(), Some(&notice));
    (err.status(), Html(page)).into_response()
}

fn page_error(err: StoreError) -> Response {
    error!("dashboard data unavailable: {err}");
    let err = AppError::from(err);
    (err.status, Html(render_unavailable(&err.message))).into_response()
}

fn parse_value(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value >= 0.0)
}
