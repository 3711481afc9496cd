/// Salesforce REST backend
use crate::{
    config::SalesforceConfig,
    error::{PortalError, PortalResult, RemoteError},
    record_store::{
        models::{ObjectSchema, QueryResult, QuerySpec, Record},
        soql, RecordStore,
    },
};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use std::time::Duration;
use tokio::sync::RwLock;

/// Cached OAuth session with the CRM
#[derive(Debug, Clone)]
struct AccessToken {
    access_token: String,
    instance_url: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    instance_url: String,
}

#[derive(Deserialize)]
struct TokenError {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
    #[serde(rename = "errorCode")]
    error_code: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryPage {
    total_size: u64,
    done: bool,
    #[serde(default)]
    next_records_url: Option<String>,
    records: Vec<Record>,
}

#[derive(Deserialize)]
struct CreateResponse {
    id: String,
}

/// Salesforce REST API client
pub struct SalesforceStore {
    http_client: reqwest::Client,
    config: SalesforceConfig,
    token: RwLock<Option<AccessToken>>,
}

impl SalesforceStore {
    /// Create a new client; authentication happens on first use
    pub fn new(config: SalesforceConfig) -> PortalResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("sales-portal/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PortalError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            config,
            token: RwLock::new(None),
        })
    }

    fn data_url(&self, token: &AccessToken, path: &str) -> String {
        format!(
            "{}/services/data/v{}/{}",
            token.instance_url.trim_end_matches('/'),
            self.config.api_version,
            path
        )
    }

    /// Return the cached token, logging in when there is none
    async fn token(&self) -> Result<AccessToken, RemoteError> {
        if let Some(token) = self.token.read().await.clone() {
            return Ok(token);
        }

        let mut slot = self.token.write().await;
        if let Some(token) = slot.clone() {
            return Ok(token);
        }

        let token = self.login().await?;
        *slot = Some(token.clone());
        Ok(token)
    }

    /// OAuth2 username-password flow
    async fn login(&self) -> Result<AccessToken, RemoteError> {
        let url = format!(
            "{}/services/oauth2/token",
            self.config.login_url.trim_end_matches('/')
        );
        let password = format!("{}{}", self.config.password, self.config.security_token);
        let params = [
            ("grant_type", "password"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("username", self.config.username.as_str()),
            ("password", password.as_str()),
        ];

        tracing::debug!("Authenticating to record store as {}", self.config.username);
        let response = self
            .http_client
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let message = match response.json::<TokenError>().await {
                Ok(err) => match err.error_description {
                    Some(desc) => format!("{}: {}", err.error, desc),
                    None => err.error,
                },
                Err(_) => format!("login failed with status {}", status),
            };
            tracing::error!("Record store login failed: {}", message);
            return Err(RemoteError::new(message));
        }

        let token: TokenResponse = self.decode(response, "login").await?;

        tracing::info!("Authenticated to record store at {}", token.instance_url);
        Ok(AccessToken {
            access_token: token.access_token,
            instance_url: token.instance_url,
        })
    }

    /// Send an authenticated request and map failures to `RemoteError`
    ///
    /// A rejected token is dropped so the next call logs in again; the
    /// current call still fails.
    async fn send(
        &self,
        build: impl FnOnce(&AccessToken) -> RequestBuilder,
    ) -> Result<Response, RemoteError> {
        let token = self.token().await?;
        let response = build(&token)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("Record store rejected access token, clearing cached session");
            *self.token.write().await = None;
        }

        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::new(describe_api_error(status, &body)))
    }

    fn transport_error(&self, e: reqwest::Error) -> RemoteError {
        if e.is_timeout() {
            RemoteError::new(format!(
                "Record store request timed out after {}s",
                self.config.timeout_secs
            ))
        } else {
            RemoteError::new(format!("Record store unreachable: {}", e))
        }
    }

    /// Read a JSON response body; `what` names the call in errors
    async fn decode<T: DeserializeOwned>(
        &self,
        response: Response,
        what: &str,
    ) -> Result<T, RemoteError> {
        response.json().await.map_err(|e| {
            if e.is_timeout() {
                self.transport_error(e)
            } else {
                RemoteError::new(format!("Invalid {} response: {}", what, e))
            }
        })
    }
}

/// Flatten the CRM's error array into one message
fn describe_api_error(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<Vec<ApiError>>(body) {
        Ok(errors) if !errors.is_empty() => errors
            .iter()
            .map(|e| format!("{}: {}", e.error_code, e.message))
            .collect::<Vec<_>>()
            .join("; "),
        _ if body.trim().is_empty() => format!("Record store returned {}", status),
        _ => format!("Record store returned {}: {}", status, body.trim()),
    }
}

fn strip_attributes(mut record: Record) -> Record {
    record.remove("attributes");
    record
}

fn check_path_segment(segment: &str) -> Result<(), RemoteError> {
    if !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        Ok(())
    } else {
        Err(RemoteError::new(format!("Invalid record reference: {:?}", segment)))
    }
}

#[async_trait]
impl RecordStore for SalesforceStore {
    async fn query(&self, spec: &QuerySpec) -> Result<QueryResult, RemoteError> {
        let soql = soql::render(spec).map_err(|e| RemoteError::new(e.to_string()))?;
        tracing::debug!("SOQL: {}", soql);

        let response = self
            .send(|token| {
                self.http_client
                    .get(self.data_url(token, "query"))
                    .query(&[("q", soql.as_str())])
            })
            .await?;
        let mut page: QueryPage = self.decode(response, "query").await?;

        let total_size = page.total_size;
        let mut records: Vec<Record> = page.records.drain(..).map(strip_attributes).collect();

        while !page.done {
            let Some(next) = page.next_records_url.take() else {
                break;
            };
            let response = self
                .send(|token| {
                    self.http_client.get(format!(
                        "{}{}",
                        token.instance_url.trim_end_matches('/'),
                        next
                    ))
                })
                .await?;
            page = self.decode(response, "query").await?;
            records.extend(page.records.drain(..).map(strip_attributes));
        }

        Ok(QueryResult {
            total_size,
            records,
        })
    }

    async fn describe(&self, object: &str) -> Result<ObjectSchema, RemoteError> {
        check_path_segment(object)?;
        let response = self
            .send(|token| {
                self.http_client
                    .get(self.data_url(token, &format!("sobjects/{}/describe", object)))
            })
            .await?;
        self.decode(response, "describe").await
    }

    async fn create(&self, object: &str, fields: &Record) -> Result<String, RemoteError> {
        check_path_segment(object)?;
        let response = self
            .send(|token| {
                self.http_client
                    .post(self.data_url(token, &format!("sobjects/{}", object)))
                    .json(fields)
            })
            .await?;
        let created: CreateResponse = self.decode(response, "create").await?;

        tracing::info!("Created {} {}", object, created.id);
        Ok(created.id)
    }

    async fn update(&self, object: &str, id: &str, fields: &Record) -> Result<(), RemoteError> {
        check_path_segment(object)?;
        check_path_segment(id)?;
        self.send(|token| {
            self.http_client
                .patch(self.data_url(token, &format!("sobjects/{}/{}", object, id)))
                .json(fields)
        })
        .await?;

        tracing::info!("Updated {} {}", object, id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Mock, ServerGuard};
    use serde_json::json;

    #[test]
    fn test_api_error_array_is_flattened() {
        let body = r#"[{"message":"Required fields are missing: [Name]","errorCode":"REQUIRED_FIELD_MISSING","fields":["Name"]}]"#;
        assert_eq!(
            describe_api_error(StatusCode::BAD_REQUEST, body),
            "REQUIRED_FIELD_MISSING: Required fields are missing: [Name]"
        );
    }

    #[test]
    fn test_non_json_error_keeps_body() {
        assert_eq!(
            describe_api_error(StatusCode::BAD_GATEWAY, "upstream down\n"),
            "Record store returned 502 Bad Gateway: upstream down"
        );
        assert_eq!(
            describe_api_error(StatusCode::SERVICE_UNAVAILABLE, ""),
            "Record store returned 503 Service Unavailable"
        );
    }

    #[test]
    fn test_path_segments_reject_traversal() {
        assert!(check_path_segment("001XX000003DHPh").is_ok());
        assert!(check_path_segment("CustomObject1__c").is_ok());
        assert!(check_path_segment("../limits").is_err());
        assert!(check_path_segment("").is_err());
    }

    #[test]
    fn test_strip_attributes() {
        let record: Record = serde_json::from_str(
            r#"{"attributes":{"type":"Account","url":"/x"},"Id":"001","Name":"Acme"}"#,
        )
        .unwrap();
        let stripped = strip_attributes(record);
        assert!(stripped.get("attributes").is_none());
        assert_eq!(stripped.len(), 2);
    }

    fn config(login_url: &str, timeout_secs: u64) -> SalesforceConfig {
        SalesforceConfig {
            login_url: login_url.to_string(),
            api_version: "59.0".to_string(),
            username: "api@example.com".to_string(),
            password: "pw".to_string(),
            security_token: "TOKEN".to_string(),
            client_id: "cid".to_string(),
            client_secret: "shh".to_string(),
            timeout_secs,
        }
    }

    /// Token endpoint expecting `hits` logins; the instance is the mock server itself
    async fn token_endpoint(server: &mut ServerGuard, hits: usize) -> Mock {
        let body = json!({
            "access_token": "tok-1",
            "instance_url": server.url(),
            "token_type": "Bearer"
        })
        .to_string();

        server
            .mock("POST", "/services/oauth2/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "password".into()),
                Matcher::UrlEncoded("username".into(), "api@example.com".into()),
                Matcher::UrlEncoded("password".into(), "pwTOKEN".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .expect(hits)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_query_follows_next_records_url() {
        let mut server = mockito::Server::new_async().await;
        let login = token_endpoint(&mut server, 1).await;
        let first = server
            .mock("GET", "/services/data/v59.0/query")
            .match_query(Matcher::UrlEncoded(
                "q".into(),
                "SELECT Id, Name FROM Account LIMIT 5".into(),
            ))
            .match_header("authorization", "Bearer tok-1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "totalSize": 3,
                    "done": false,
                    "nextRecordsUrl": "/services/data/v59.0/query/01gNEXT-2000",
                    "records": [
                        {"attributes": {"type": "Account"}, "Id": "001A", "Name": "One"},
                        {"attributes": {"type": "Account"}, "Id": "001B", "Name": "Two"}
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;
        let second = server
            .mock("GET", "/services/data/v59.0/query/01gNEXT-2000")
            .match_header("authorization", "Bearer tok-1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "totalSize": 3,
                    "done": true,
                    "records": [
                        {"attributes": {"type": "Account"}, "Id": "001C", "Name": "Three"}
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let store = SalesforceStore::new(config(&server.url(), 5)).unwrap();
        let spec = QuerySpec::select("Account", &["Id", "Name"]).limit(5);
        let result = store.query(&spec).await.unwrap();

        assert_eq!(result.total_size, 3);
        let names: Vec<_> = result
            .records
            .iter()
            .map(|r| r["Name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["One", "Two", "Three"]);
        assert!(result.records.iter().all(|r| r.get("attributes").is_none()));

        login.assert_async().await;
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_token_is_cached_between_calls() {
        let mut server = mockito::Server::new_async().await;
        let login = token_endpoint(&mut server, 1).await;
        let describe = server
            .mock("GET", "/services/data/v59.0/sobjects/Task/describe")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"name": "Task", "fields": []}).to_string())
            .expect(2)
            .create_async()
            .await;

        let store = SalesforceStore::new(config(&server.url(), 5)).unwrap();
        store.describe("Task").await.unwrap();
        store.describe("Task").await.unwrap();

        login.assert_async().await;
        describe.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejected_token_is_dropped_and_next_call_logs_in_again() {
        let mut server = mockito::Server::new_async().await;
        let login = token_endpoint(&mut server, 2).await;
        server
            .mock("GET", "/services/data/v59.0/sobjects/Account/describe")
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"message":"Session expired or invalid","errorCode":"INVALID_SESSION_ID"}]"#)
            .create_async()
            .await;
        server
            .mock("GET", "/services/data/v59.0/sobjects/Task/describe")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"name": "Task", "fields": []}).to_string())
            .create_async()
            .await;

        let store = SalesforceStore::new(config(&server.url(), 5)).unwrap();

        let err = store.describe("Account").await.unwrap_err();
        assert_eq!(err.message, "INVALID_SESSION_ID: Session expired or invalid");
        assert!(store.token.read().await.is_none());

        let schema = store.describe("Task").await.unwrap();
        assert_eq!(schema.name, "Task");
        login.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_surfaces_error_array_verbatim() {
        let mut server = mockito::Server::new_async().await;
        token_endpoint(&mut server, 1).await;
        server
            .mock("POST", "/services/data/v59.0/sobjects/Account")
            .match_body(Matcher::Json(json!({"Name": "Tanaka Shoten"})))
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{"message":"Required fields are missing: [Field72__c]","errorCode":"REQUIRED_FIELD_MISSING","fields":["Field72__c"]}]"#,
            )
            .create_async()
            .await;

        let store = SalesforceStore::new(config(&server.url(), 5)).unwrap();
        let fields: Record = serde_json::from_value(json!({"Name": "Tanaka Shoten"})).unwrap();
        let err = store.create("Account", &fields).await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "REQUIRED_FIELD_MISSING: Required fields are missing: [Field72__c]"
        );
    }

    #[tokio::test]
    async fn test_create_and_update_send_field_payloads() {
        let mut server = mockito::Server::new_async().await;
        token_endpoint(&mut server, 1).await;
        let create = server
            .mock("POST", "/services/data/v59.0/sobjects/Task")
            .match_header("authorization", "Bearer tok-1")
            .match_body(Matcher::Json(json!({"Subject": "Call", "WhatId": "001A"})))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"00T000000000001AAA","success":true,"errors":[]}"#)
            .create_async()
            .await;
        let update = server
            .mock("PATCH", "/services/data/v59.0/sobjects/Account/001A")
            .match_body(Matcher::Json(json!({"Status__c": "Contacted", "Memo__c": null})))
            .with_status(204)
            .create_async()
            .await;

        let store = SalesforceStore::new(config(&server.url(), 5)).unwrap();
        let task: Record = serde_json::from_value(json!({"Subject": "Call", "WhatId": "001A"})).unwrap();
        let changes: Record =
            serde_json::from_value(json!({"Status__c": "Contacted", "Memo__c": null})).unwrap();

        assert_eq!(store.create("Task", &task).await.unwrap(), "00T000000000001AAA");
        store.update("Account", "001A", &changes).await.unwrap();

        create.assert_async().await;
        update.assert_async().await;
    }

    #[tokio::test]
    async fn test_unanswered_request_reports_timeout() {
        // Accepts connections into the backlog but never responds
        let silent = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", silent.local_addr().unwrap());

        let store = SalesforceStore::new(config(&url, 1)).unwrap();
        let err = store.describe("Account").await.unwrap_err();

        assert_eq!(err.message, "Record store request timed out after 1s");
    }
}
