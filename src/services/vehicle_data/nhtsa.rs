use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

use super::VehicleDataSource;

/// Client for the NHTSA vPIC vehicle API.
pub struct NhtsaClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct NhtsaResponse<T> {
    #[serde(rename = "Results", default)]
    results: Vec<T>,
}

#[derive(Deserialize)]
struct MakeResult {
    #[serde(rename = "MakeName")]
    make_name: Option<String>,
}

#[derive(Deserialize)]
struct ModelResult {
    #[serde(rename = "Model_Name")]
    model_name: Option<String>,
}

impl NhtsaClient {
    pub fn new(base_url: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build vehicle API client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Builds `{base}/{segments..}?format=json`, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> anyhow::Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url).context("invalid vehicle API url")?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("vehicle API url cannot take a path"))?
            .pop_if_empty()
            .extend(segments);
        url.query_pairs_mut().append_pair("format", "json");
        Ok(url)
    }

    async fn fetch<T: serde::de::DeserializeOwned>(
        &self,
        segments: &[&str],
    ) -> anyhow::Result<Vec<T>> {
        let url = self.endpoint(segments)?;

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .context("failed to call vehicle API")?
            .error_for_status()
            .context("vehicle API returned an error status")?;

        let data: NhtsaResponse<T> = resp
            .json()
            .await
            .context("failed to parse vehicle API response")?;

        Ok(data.results)
    }
}

#[async_trait]
impl VehicleDataSource for NhtsaClient {
    async fn makes(&self, vehicle_type: &str) -> anyhow::Result<Vec<String>> {
        let results: Vec<MakeResult> = self
            .fetch(&["GetMakesForVehicleType", vehicle_type])
            .await?;
        Ok(results.into_iter().filter_map(|r| r.make_name).collect())
    }

    async fn models(&self, make: &str, year: i32) -> anyhow::Result<Vec<String>> {
        let year = year.to_string();
        let results: Vec<ModelResult> = self
            .fetch(&["GetModelsForMakeYear", "make", make, "modelyear", &year])
            .await?;
        Ok(results.into_iter().filter_map(|r| r.model_name).collect())
    }
}
