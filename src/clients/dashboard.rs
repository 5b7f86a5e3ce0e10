use std::fmt::Write as _;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

use super::{
    ClientError, ContextProvider, DashboardConfig, SIDE_CHANNEL_TIMEOUT, http_client, status_error,
};

#[derive(Clone)]
pub struct DashboardClient {
    api_url: String,
    api_token: String,
    orders_limit: u32,
    threads_limit: u32,
    client: reqwest::Client,
}

/// Supplementary profile data for a sender.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserContext {
    #[serde(default)]
    pub user: Option<UserProfile>,
    #[serde(default)]
    pub stats: Option<UserStats>,
    #[serde(default)]
    pub orders: Vec<Order>,
    #[serde(default)]
    pub threads: Vec<Thread>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserStats {
    #[serde(default)]
    pub total_orders: i64,
    #[serde(default)]
    pub total_threads: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Order {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub total_price: Option<f64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub items: Vec<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Thread {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message_count: i64,
    #[serde(default)]
    pub updated_at: Option<String>,
}

const ORDERS_SHOWN: usize = 5;
const THREADS_SHOWN: usize = 3;

impl UserContext {
    /// Plain-text summary handed to the content generator.
    pub fn summary(&self) -> String {
        let mut out = String::from("=== USER CONTEXT DATA ===\n");

        if let Some(user) = &self.user {
            let _ = writeln!(out, "User Profile:");
            let _ = writeln!(out, "  Name: {}", or_na(user.name.as_deref()));
            let _ = writeln!(out, "  Email: {}", or_na(user.email.as_deref()));
            let _ = writeln!(out, "  User ID: {}", display_id(&user.id));
            let _ = writeln!(out, "  Account Created: {}", or_na(user.created_at.as_deref()));
            out.push('\n');
        }

        if let Some(stats) = &self.stats {
            let _ = writeln!(out, "User Statistics:");
            let _ = writeln!(out, "  Total Orders: {}", stats.total_orders);
            let _ = writeln!(out, "  Total Threads: {}", stats.total_threads);
            out.push('\n');
        }

        if !self.orders.is_empty() {
            let _ = writeln!(out, "Recent Orders ({} total):", self.orders.len());
            for order in self.orders.iter().take(ORDERS_SHOWN) {
                let _ = writeln!(out, "  - Order #{}", display_id(&order.id));
                let _ = writeln!(out, "    Status: {}", or_na(order.status.as_deref()));
                let _ = writeln!(out, "    Total: €{}", order.total_price.unwrap_or(0.0));
                let _ = writeln!(out, "    Created: {}", or_na(order.created_at.as_deref()));
                if !order.items.is_empty() {
                    let _ = writeln!(out, "    Items: {}", order.items.len());
                }
            }
            out.push('\n');
        }

        if !self.threads.is_empty() {
            let _ = writeln!(out, "Recent Message Threads ({} total):", self.threads.len());
            for thread in self.threads.iter().take(THREADS_SHOWN) {
                let _ = writeln!(out, "  - Thread #{}", display_id(&thread.id));
                let _ = writeln!(out, "    Subject: {}", or_na(thread.subject.as_deref()));
                let _ = writeln!(out, "    Status: {}", or_na(thread.status.as_deref()));
                let _ = writeln!(out, "    Messages: {}", thread.message_count);
                let _ = writeln!(out, "    Last Updated: {}", or_na(thread.updated_at.as_deref()));
            }
            out.push('\n');
        }

        out.push_str("=== END USER CONTEXT ===");
        out
    }
}

fn or_na(value: Option<&str>) -> &str {
    value.unwrap_or("N/A")
}

fn display_id(value: &Value) -> String {
    match value {
        Value::Null => "N/A".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl DashboardClient {
    pub fn new(config: &DashboardConfig) -> Self {
        Self {
            api_url: config.api_url.clone(),
            api_token: config.api_token.clone(),
            orders_limit: config.orders_limit,
            threads_limit: config.threads_limit,
            client: http_client(SIDE_CHANNEL_TIMEOUT),
        }
    }
}

#[async_trait]
impl ContextProvider for DashboardClient {
    async fn user_context(&self, email: &str) -> Result<Option<UserContext>, ClientError> {
        let response = self
            .client
            .get(&self.api_url)
            .header("Authorization", format!("Token {}", self.api_token))
            .query(&[
                ("email", email.to_string()),
                ("orders_limit", self.orders_limit.to_string()),
                ("threads_limit", self.threads_limit.to_string()),
            ])
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .json::<UserContext>()
                .await
                .map(Some)
                .map_err(|err| ClientError::Decode(format!("invalid user context: {err}"))),
            _ => Err(status_error(response).await),
        }
    }
}
