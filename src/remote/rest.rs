//! PostgREST-style HTTP gateway.
//!
//! Talks to `<base_url>/rest/v1/<table>` with the project API key and the
//! signed-in user's access token. Filters use the `column=eq.value` query
//! syntax. Every request carries a fixed timeout; expiry is a
//! [`GatewayError::Timeout`].

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use super::{
    CategoryRow, CategoryRowPatch, GatewayError, GatewayResult, RemoteGateway, TaskRow,
    TaskRowPatch,
};

const TASKS_TABLE: &str = "tasks";
const CATEGORIES_TABLE: &str = "categories";

/// Connection settings for [`RestGateway`]
#[derive(Debug, Clone)]
pub struct RestConfig {
    pub base_url: String,
    pub api_key: String,
    pub access_token: String,
    pub timeout: Duration,
}

pub struct RestGateway {
    http: Client,
    base_url: String,
    api_key: String,
    access_token: String,
}

impl RestGateway {
    pub fn new(config: RestConfig) -> GatewayResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("taskflow/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| GatewayError::Network(err.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            access_token: config.access_token,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(&self.access_token)
            .header("Prefer", "return=minimal")
    }

    fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> GatewayResult<Vec<T>> {
        tracing::debug!(table, "remote select");
        let request = self
            .authorized(self.http.get(self.table_url(table)))
            .query(query);
        let response = check_response(send(request)?)?;
        response
            .json::<Vec<T>>()
            .map_err(|err| GatewayError::Decode(err.to_string()))
    }

    fn execute(&self, request: RequestBuilder) -> GatewayResult<()> {
        check_response(send(self.authorized(request))?)?;
        Ok(())
    }
}

fn send(request: RequestBuilder) -> GatewayResult<Response> {
    request.send().map_err(map_transport_error)
}

fn map_transport_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout
    } else if err.is_decode() {
        GatewayError::Decode(err.to_string())
    } else {
        GatewayError::Network(err.to_string())
    }
}

/// Map non-success statuses to gateway errors.
///
/// 401/403 are authorization failures; anything else non-2xx carries the
/// response body as the server message.
pub fn check_response(response: Response) -> GatewayResult<Response> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(GatewayError::Unauthorized {
            status: status.as_u16(),
        });
    }
    if !status.is_success() {
        return Err(GatewayError::Server {
            status: status.as_u16(),
            message: response.text().unwrap_or_default(),
        });
    }
    Ok(response)
}

fn eq(value: &str) -> String {
    format!("eq.{value}")
}

impl RemoteGateway for RestGateway {
    fn select_tasks(&self, owner_id: &str) -> GatewayResult<Vec<TaskRow>> {
        self.select(
            TASKS_TABLE,
            &[
                ("select", "*".to_string()),
                ("user_id", eq(owner_id)),
                ("order", "order.asc".to_string()),
            ],
        )
    }

    fn select_categories(&self, owner_id: &str) -> GatewayResult<Vec<CategoryRow>> {
        self.select(
            CATEGORIES_TABLE,
            &[("select", "*".to_string()), ("user_id", eq(owner_id))],
        )
    }

    fn insert_task(&self, row: &TaskRow) -> GatewayResult<()> {
        tracing::debug!(id = %row.id, "remote insert task");
        self.execute(self.http.post(self.table_url(TASKS_TABLE)).json(row))
    }

    fn update_task(&self, id: &str, patch: &TaskRowPatch) -> GatewayResult<()> {
        tracing::debug!(id, "remote update task");
        self.execute(
            self.http
                .patch(self.table_url(TASKS_TABLE))
                .query(&[("id", eq(id))])
                .json(patch),
        )
    }

    fn delete_task(&self, id: &str) -> GatewayResult<()> {
        tracing::debug!(id, "remote delete task");
        self.execute(
            self.http
                .delete(self.table_url(TASKS_TABLE))
                .query(&[("id", eq(id))]),
        )
    }

    fn clear_category(&self, category_id: &str) -> GatewayResult<()> {
        tracing::debug!(category_id, "remote clear category on tasks");
        let patch = TaskRowPatch {
            category_id: Some(None),
            ..TaskRowPatch::default()
        };
        self.execute(
            self.http
                .patch(self.table_url(TASKS_TABLE))
                .query(&[("category_id", eq(category_id))])
                .json(&patch),
        )
    }

    fn insert_category(&self, row: &CategoryRow) -> GatewayResult<()> {
        tracing::debug!(id = %row.id, "remote insert category");
        self.execute(self.http.post(self.table_url(CATEGORIES_TABLE)).json(row))
    }

    fn update_category(&self, id: &str, patch: &CategoryRowPatch) -> GatewayResult<()> {
        tracing::debug!(id, "remote update category");
        self.execute(
            self.http
                .patch(self.table_url(CATEGORIES_TABLE))
                .query(&[("id", eq(id))])
                .json(patch),
        )
    }

    fn delete_category(&self, id: &str) -> GatewayResult<()> {
        tracing::debug!(id, "remote delete category");
        self.execute(
            self.http
                .delete(self.table_url(CATEGORIES_TABLE))
                .query(&[("id", eq(id))]),
        )
    }
}
