/// Menu and product catalog views
use crate::{
    api::views::{MenuView, ProductsView},
    auth::CurrentSession,
    context::AppContext,
    error::PortalResult,
    session::flash,
};
use axum::{extract::State, routing::get, Json, Router};
use axum_extra::extract::cookie::CookieJar;

/// Build menu routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/menu", get(menu))
        .route("/products", get(products))
}

async fn menu(current: CurrentSession, jar: CookieJar) -> (CookieJar, Json<MenuView>) {
    let (jar, notices) = flash::take(jar);
    (
        jar,
        Json(MenuView {
            notices,
            user: (&current.session).into(),
        }),
    )
}

/// Products the agent's company may sell
async fn products(
    State(ctx): State<AppContext>,
    current: CurrentSession,
    jar: CookieJar,
) -> PortalResult<(CookieJar, Json<ProductsView>)> {
    let company = current.session.company_name;
    let products = ctx.catalog.products_for_company(&company).await?;

    let (jar, notices) = flash::take(jar);
    Ok((
        jar,
        Json(ProductsView {
            notices,
            company,
            products,
        }),
    ))
}
