/// JSON view models handed to the presentation layer
use crate::{
    record_store::Record,
    session::{flash::Notice, Session},
};
use serde::Serialize;
use std::collections::BTreeMap;

/// Agent summary shown in page headers
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub display_name: String,
    pub company: String,
    pub external_login_id: Option<String>,
}

impl From<&Session> for UserView {
    fn from(session: &Session) -> Self {
        Self {
            display_name: session.display_name.clone(),
            company: session.company_name.clone(),
            external_login_id: session.external_login_id.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginView {
    pub notices: Vec<Notice>,
}

#[derive(Debug, Serialize)]
pub struct MenuView {
    pub notices: Vec<Notice>,
    pub user: UserView,
}

#[derive(Debug, Serialize)]
pub struct ProductsView {
    pub notices: Vec<Notice>,
    pub company: String,
    pub products: Vec<Record>,
}

#[derive(Debug, Serialize)]
pub struct AccountFormView {
    pub notices: Vec<Notice>,
    pub user: UserView,
    pub products: Vec<Record>,
    pub picklists: BTreeMap<String, Vec<String>>,
}

/// Outcome of a create or update submission
#[derive(Debug, Serialize)]
pub struct ResultView {
    pub success: bool,
    pub message: String,
    pub record_name: Option<String>,
    pub user: UserView,
}

#[derive(Debug, Serialize)]
pub struct WorklistView {
    pub notices: Vec<Notice>,
    pub accounts: Vec<Record>,
    pub total: u64,
    pub keyword: Option<String>,
    pub status: Option<String>,
    pub status_options: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct AccountEditView {
    pub notices: Vec<Notice>,
    pub account: Record,
    pub status_options: Vec<String>,
}
