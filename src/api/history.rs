//! Read-only daily category counts.

use super::{check_status, default_client, AccessToken, ApiError};
use crate::classify::join_url;
use crate::mapper::Category;
use chrono::{Days, NaiveDate};
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Category counts for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCounts {
    pub date: NaiveDate,
    #[serde(default)]
    pub normal: u32,
    #[serde(default, rename = "kun")]
    pub turbid: u32,
    #[serde(default)]
    pub red: u32,
    #[serde(default)]
    pub green: u32,
    #[serde(default)]
    pub total: u32,
}

impl DailyCounts {
    /// Count for a category. Unknown results are not tallied by the service.
    pub fn count(&self, category: Category) -> u32 {
        match category {
            Category::Normal => self.normal,
            Category::Turbid => self.turbid,
            Category::Red => self.red,
            Category::Green => self.green,
            Category::Unknown => 0,
        }
    }
}

/// The two days shown beside the capture view.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HistorySnapshot {
    pub today: Option<DailyCounts>,
    pub yesterday: Option<DailyCounts>,
}

impl HistorySnapshot {
    /// Picks today's and yesterday's entries out of a history list.
    pub fn from_records(records: &[DailyCounts], today: NaiveDate) -> Self {
        let find = |date: NaiveDate| records.iter().find(|r| r.date == date).cloned();
        Self {
            today: find(today),
            yesterday: today.checked_sub_days(Days::new(1)).and_then(find),
        }
    }
}

/// Client for the history endpoint.
#[derive(Debug, Clone)]
pub struct HistoryClient {
    client: Client,
    base_url: String,
}

impl HistoryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(default_client(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Fetches recent daily counts, most recent first.
    pub async fn recent(&self, token: &AccessToken) -> Result<Vec<DailyCounts>, ApiError> {
        let response = self
            .client
            .get(join_url(&self.base_url, "/blood/"))
            .bearer_auth(token.secret())
            .send()
            .await?;
        let mut records = check_status(response)
            .await?
            .json::<Vec<DailyCounts>>()
            .await?;
        records.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(records)
    }
}
