//! `InfluxDB` 1.x connection over the HTTP `/query` endpoint.

use super::{Connection, ConnectionFactory, ConnectionSettings, StoreError};
use crate::config::RetentionDuration;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::Value;

/// Body of a `/query` response.
#[derive(Debug, Default, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StatementResult {
    #[serde(default)]
    series: Vec<Series>,
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Series {
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl Series {
    fn column(&self, name: &str) -> Result<usize, StoreError> {
        self.columns
            .iter()
            .position(|column| column == name)
            .ok_or_else(|| StoreError::InvalidResponse(format!("missing column {name}")))
    }
}

/// Quotes an identifier for use in an `InfluxQL` statement.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
}

fn default_clause(default: bool) -> &'static str {
    if default {
        " DEFAULT"
    } else {
        ""
    }
}

fn create_policy_statement(
    name: &str,
    database: &str,
    duration: &RetentionDuration,
    default: bool,
) -> String {
    format!(
        "CREATE RETENTION POLICY {} ON {} DURATION {duration} REPLICATION 1{}",
        quote_ident(name),
        quote_ident(database),
        default_clause(default)
    )
}

fn alter_policy_statement(
    name: &str,
    database: &str,
    duration: &RetentionDuration,
    default: bool,
) -> String {
    format!(
        "ALTER RETENTION POLICY {} ON {} DURATION {duration}{}",
        quote_ident(name),
        quote_ident(database),
        default_clause(default)
    )
}

/// Turns a response body into the series of its single statement.
fn decode(body: &[u8]) -> Result<Vec<Series>, StoreError> {
    let response: QueryResponse = serde_json::from_slice(body)
        .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;

    if let Some(error) = response.error {
        return Err(StoreError::Query(error));
    }

    let result = response
        .results
        .into_iter()
        .next()
        .ok_or_else(|| StoreError::InvalidResponse("no statement result".to_string()))?;

    match result.error {
        Some(error) => Err(StoreError::Query(error)),
        None => Ok(result.series),
    }
}

fn database_names(series: &[Series]) -> Result<Vec<String>, StoreError> {
    let mut names = Vec::new();
    for serie in series {
        let column = serie.column("name")?;
        for row in &serie.values {
            if let Some(Value::String(name)) = row.get(column) {
                names.push(name.clone());
            }
        }
    }
    Ok(names)
}

fn default_policy_name(series: &[Series]) -> Result<Option<String>, StoreError> {
    for serie in series {
        let name_column = serie.column("name")?;
        let default_column = serie.column("default")?;
        for row in &serie.values {
            if let (Some(Value::String(name)), Some(Value::Bool(true))) =
                (row.get(name_column), row.get(default_column))
            {
                return Ok(Some(name.clone()));
            }
        }
    }
    Ok(None)
}

/// Opens [`InfluxConnection`] handles sharing one HTTP client.
#[derive(Debug, Clone)]
pub struct InfluxConnectionFactory {
    client: Client,
}

impl InfluxConnectionFactory {
    /// Creates a factory with a default HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new() -> Result<Self, StoreError> {
        let client = Client::builder()
            .user_agent(concat!("nmon2influxdb/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl ConnectionFactory for InfluxConnectionFactory {
    type Connection = InfluxConnection;

    fn connect(&self, settings: &ConnectionSettings) -> Result<InfluxConnection, StoreError> {
        Ok(InfluxConnection {
            client: self.client.clone(),
            query_url: format!("http://{}:{}/query", settings.host, settings.port),
            settings: settings.clone(),
        })
    }
}

/// `InfluxDB` handle scoped to one database.
#[derive(Debug, Clone)]
pub struct InfluxConnection {
    client: Client,
    query_url: String,
    settings: ConnectionSettings,
}

impl InfluxConnection {
    /// Builds the request carrying one statement. Credentials travel as
    /// basic auth, never in the URL.
    fn request(&self, statement: &str) -> RequestBuilder {
        self.client
            .post(&self.query_url)
            .query(&[("q", statement), ("db", self.settings.database.as_str())])
            .basic_auth(&self.settings.user, Some(&self.settings.password))
    }

    /// Runs one statement and returns the series it produced.
    async fn query(&self, statement: &str) -> Result<Vec<Series>, StoreError> {
        if self.settings.debug {
            tracing::debug!(url = %self.query_url, %statement, "Sending InfluxQL statement");
        }

        let response = self.request(statement).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if self.settings.debug {
            tracing::debug!(
                status = status.as_u16(),
                body = %String::from_utf8_lossy(&body),
                "Received InfluxDB response"
            );
        }

        if !status.is_success() {
            // InfluxDB reports rejected statements as a JSON error body
            return match decode(&body) {
                Err(StoreError::Query(error)) => Err(StoreError::Query(error)),
                _ => Err(StoreError::Status {
                    status: status.as_u16(),
                    body: String::from_utf8_lossy(&body).into_owned(),
                }),
            };
        }

        decode(&body)
    }
}

#[async_trait]
impl Connection for InfluxConnection {
    fn database(&self) -> &str {
        &self.settings.database
    }

    async fn exist_db(&self, name: &str) -> Result<bool, StoreError> {
        let series = self.query("SHOW DATABASES").await?;
        Ok(database_names(&series)?.iter().any(|db| db == name))
    }

    async fn create_db(&self, name: &str) -> Result<(), StoreError> {
        self.query(&format!("CREATE DATABASE {}", quote_ident(name)))
            .await
            .map(drop)
    }

    async fn default_retention_policy(&self) -> Result<String, StoreError> {
        let database = self.database();
        let series = self
            .query(&format!("SHOW RETENTION POLICIES ON {}", quote_ident(database)))
            .await?;
        default_policy_name(&series)?.ok_or_else(|| StoreError::NoDefaultPolicy(database.to_string()))
    }

    async fn set_retention_policy(
        &self,
        name: &str,
        duration: &str,
        default: bool,
    ) -> Result<(), StoreError> {
        let duration = RetentionDuration::parse(duration)?;
        self.query(&create_policy_statement(name, self.database(), &duration, default))
            .await
            .map(drop)
    }

    async fn update_retention_policy(
        &self,
        name: &str,
        duration: &str,
        default: bool,
    ) -> Result<(), StoreError> {
        let duration = RetentionDuration::parse(duration)?;
        self.query(&alter_policy_statement(name, self.database(), &duration, default))
            .await
            .map(drop)
    }
}
