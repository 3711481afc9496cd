/// Account intake, worklist and update endpoints
use crate::{
    account::{normalize_time, AccountIntakeForm, AccountUpdateForm, UpdateOutcome, WorklistQuery},
    api::views::{AccountEditView, AccountFormView, ResultView, WorklistView},
    auth::CurrentSession,
    context::AppContext,
    crm,
    error::{PortalResult, ValidationFailure},
    record_store::field_str,
    session::flash::{self, Notice},
};
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use std::collections::HashMap;

const WORKLIST_PATH: &str = "/my_accounts";
const NEW_ACCOUNT_PATH: &str = "/account/new";

/// Build account routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route(NEW_ACCOUNT_PATH, get(new_account))
        .route("/account/create", post(create_account))
        .route(WORKLIST_PATH, get(my_accounts))
        .route("/account/edit/:id", get(edit_account))
        .route("/account/update/:id", post(update_account))
}

/// Intake form: sellable products and picklist options
async fn new_account(
    State(ctx): State<AppContext>,
    current: CurrentSession,
    jar: CookieJar,
) -> PortalResult<(CookieJar, Json<AccountFormView>)> {
    let products = ctx
        .catalog
        .products_for_company(&current.session.company_name)
        .await?;
    let picklists = ctx.catalog.intake_picklists().await?;

    let (jar, notices) = flash::take(jar);
    Ok((
        jar,
        Json(AccountFormView {
            notices,
            user: (&current.session).into(),
            products,
            picklists,
        }),
    ))
}

/// Submit the intake form
async fn create_account(
    State(ctx): State<AppContext>,
    current: CurrentSession,
    jar: CookieJar,
    Form(fields): Form<HashMap<String, String>>,
) -> Response {
    let form = AccountIntakeForm::new(fields);

    match ctx.intake.submit(&form, &current.session).await {
        Ok(result) => Json(ResultView {
            success: result.success(),
            message: result.message(),
            record_name: Some(result.record_name),
            user: (&current.session).into(),
        })
        .into_response(),
        Err(failure) => {
            let message = match failure {
                ValidationFailure::MissingRequiredFields => {
                    "Please fill in all required fields.".to_string()
                }
                other => other.to_string(),
            };
            let jar = flash::push(jar, Notice::error(message));
            (jar, Redirect::to(NEW_ACCOUNT_PATH)).into_response()
        }
    }
}

/// The agent's accounts, optionally narrowed by name keyword and status
async fn my_accounts(
    State(ctx): State<AppContext>,
    current: CurrentSession,
    jar: CookieJar,
    Query(query): Query<WorklistQuery>,
) -> PortalResult<(CookieJar, Json<WorklistView>)> {
    let result = ctx.worklist.list(&current.session.user_id, &query).await?;
    let status_options = ctx.catalog.status_options().await?;

    let (jar, notices) = flash::take(jar);
    Ok((
        jar,
        Json(WorklistView {
            notices,
            total: result.total_size,
            accounts: result.records,
            keyword: query.keyword().map(str::to_string),
            status: query.status().map(str::to_string),
            status_options,
        }),
    ))
}

/// Edit view for one of the agent's accounts
async fn edit_account(
    State(ctx): State<AppContext>,
    current: CurrentSession,
    jar: CookieJar,
    Path(id): Path<String>,
) -> PortalResult<(CookieJar, Json<AccountEditView>)> {
    let account = ctx
        .worklist
        .fetch_owned(&current.session.user_id, &id)
        .await?;
    let status_options = ctx.catalog.status_options().await?;

    let (jar, notices) = flash::take(jar);
    Ok((
        jar,
        Json(AccountEditView {
            notices,
            account,
            status_options,
        }),
    ))
}

/// Update status and log the call
async fn update_account(
    State(ctx): State<AppContext>,
    current: CurrentSession,
    jar: CookieJar,
    Path(id): Path<String>,
    Form(form): Form<AccountUpdateForm>,
) -> PortalResult<Response> {
    // Reject bad input before touching the record store
    if let Err(failure) = normalize_time(form.call_time.as_deref()) {
        let jar = flash::push(jar, Notice::error(failure.to_string()));
        let back = format!("/account/edit/{}", id);
        return Ok((jar, Redirect::to(&back)).into_response());
    }

    let account = ctx
        .worklist
        .fetch_owned(&current.session.user_id, &id)
        .await?;
    let record_name = field_str(&account, crm::account::NAME).map(str::to_string);

    let outcome = match ctx.updates.submit(&id, &form, ctx.today()).await {
        Ok(outcome) => outcome,
        Err(failure) => {
            let jar = flash::push(jar, Notice::error(failure.to_string()));
            let back = format!("/account/edit/{}", id);
            return Ok((jar, Redirect::to(&back)).into_response());
        }
    };

    let message = match outcome {
        UpdateOutcome::Completed { .. } => {
            let jar = flash::push(jar, Notice::info("Account updated and call logged."));
            return Ok((jar, Redirect::to(WORKLIST_PATH)).into_response());
        }
        UpdateOutcome::AccountNotUpdated(e) => format!("Account update failed: {}", e),
        UpdateOutcome::ActivityNotLogged(e) => {
            format!("Account updated, but the call log could not be saved: {}", e)
        }
    };

    Ok(Json(ResultView {
        success: false,
        message,
        record_name,
        user: (&current.session).into(),
    })
    .into_response())
}
