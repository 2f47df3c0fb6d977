//! Optional columnar sink: click records inserted into ClickHouse over its
//! HTTP interface as `JSONEachRow`. Failures log and drop; the relational
//! record in Postgres is the source of truth.

use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

use crate::models::NewClick;

pub struct ClickHouseSink {
    client: Client,
    url: String,
    database: String,
    user: Option<String>,
    password: Option<String>,
}

impl ClickHouseSink {
    pub fn new(
        url: &str,
        database: &str,
        user: Option<String>,
        password: Option<String>,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .expect("failed to build ClickHouse HTTP client");
        Self {
            client,
            url: url.to_string(),
            database: database.to_string(),
            user,
            password,
        }
    }

    pub async fn insert_click(&self, record: &NewClick) -> Result<()> {
        let mut url = reqwest::Url::parse(&self.url).context("invalid ClickHouse URL")?;
        url.query_pairs_mut()
            .append_pair("database", &self.database)
            .append_pair(
                "query",
                "INSERT INTO clicks_analytics FORMAT JSONEachRow",
            );

        let mut request = self
            .client
            .post(url)
            .body(serde_json::to_string(record).context("click record serialization failed")?);
        if let Some(user) = &self.user {
            request = request.basic_auth(user, self.password.as_deref());
        }

        let response = request
            .send()
            .await
            .context("ClickHouse HTTP request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("ClickHouse error {status}: {body}");
        }
        Ok(())
    }
}
