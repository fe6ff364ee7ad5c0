//! Index constituent lists (S&P 500, Nasdaq 100, Dow Jones, Russell 2000).

use analysis_core::{AnalysisError, ConstituentFormat, ConstituentSource, IndexConfig, IndexConstituent};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

pub const INDEX_CONSTITUENTS_BASE_URL: &str = "https://yfiua.github.io/index-constituents";
pub const RUSSELL_2000_CSV_URL: &str =
    "https://raw.githubusercontent.com/ikoniaris/Russell2000/master/russell_2000_components.csv";

/// The four indices scanned by default
pub fn default_indices() -> Vec<IndexConfig> {
    vec![
        IndexConfig::new(
            "sp500",
            "S&P 500",
            &format!("{}/constituents-sp500.json", INDEX_CONSTITUENTS_BASE_URL),
            ConstituentFormat::Json,
        ),
        IndexConfig::new(
            "nasdaq100",
            "Nasdaq 100",
            &format!("{}/constituents-nasdaq100.json", INDEX_CONSTITUENTS_BASE_URL),
            ConstituentFormat::Json,
        ),
        IndexConfig::new(
            "dowjones",
            "Dow Jones",
            &format!("{}/constituents-dowjones.json", INDEX_CONSTITUENTS_BASE_URL),
            ConstituentFormat::Json,
        ),
        IndexConfig::new("russell2000", "Russell 2000", RUSSELL_2000_CSV_URL, ConstituentFormat::Csv),
    ]
}

/// Provider ticker punctuation: class shares use `-` (BRK.B -> BRK-B)
pub fn normalize_symbol(raw: &str) -> String {
    raw.trim().replace('.', "-")
}

#[derive(Debug, Deserialize)]
struct JsonConstituent {
    #[serde(rename = "Symbol")]
    symbol: String,
    #[serde(rename = "Name", default)]
    name: String,
}

/// Parse a JSON array of `{"Symbol", "Name"}` records
pub fn parse_json_constituents(body: &str) -> Result<Vec<IndexConstituent>, AnalysisError> {
    let raw: Vec<JsonConstituent> = serde_json::from_str(body)
        .map_err(|e| AnalysisError::InvalidData(format!("constituent JSON: {}", e)))?;

    Ok(raw
        .into_iter()
        .map(|c| IndexConstituent {
            symbol: normalize_symbol(&c.symbol),
            name: c.name.trim().to_string(),
        })
        .filter(|c| !c.symbol.is_empty())
        .collect())
}

/// Parse a delimited list: header row, then `ticker,name` where an unquoted
/// name may itself contain commas.
pub fn parse_csv_constituents(body: &str) -> Vec<IndexConstituent> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(body.trim().as_bytes());

    let mut constituents = Vec::new();
    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Skipping malformed constituent row: {}", e);
                continue;
            }
        };

        let symbol = normalize_symbol(record.get(0).unwrap_or(""));
        if symbol.is_empty() {
            continue;
        }
        let name = record.iter().skip(1).collect::<Vec<_>>().join(",");

        constituents.push(IndexConstituent {
            symbol,
            name: name.trim().to_string(),
        });
    }
    constituents
}

/// Fetches constituent lists over HTTP
#[derive(Clone)]
pub struct IndexListClient {
    client: Client,
}

impl IndexListClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client }
    }
}

impl Default for IndexListClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConstituentSource for IndexListClient {
    async fn fetch_constituents(&self, index: &IndexConfig) -> Result<Vec<IndexConstituent>, AnalysisError> {
        let response = self
            .client
            .get(&index.source)
            .send()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AnalysisError::ApiError(format!(
                "Failed to fetch {} constituents: HTTP {}",
                index.key,
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        let constituents = match index.format {
            ConstituentFormat::Json => parse_json_constituents(&body)?,
            ConstituentFormat::Csv => parse_csv_constituents(&body),
        };

        tracing::debug!("Fetched {} constituents for {}", constituents.len(), index.key);
        Ok(constituents)
    }
}
