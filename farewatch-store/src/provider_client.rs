use async_trait::async_trait;
use farewatch_core::model::{AlertCriteria, DateRange, FlightOption};
use farewatch_core::ports::{AwardAvailabilityProvider, BoxError, FlightSearchProvider};
use farewatch_core::provider::{AwardPage, AwardSearchQuery};
use std::time::Duration;
use tracing::debug;

use crate::app_config::ProviderConfig;

/// HTTP client for the award-availability provider's paginated search.
pub struct AwardApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AwardApiClient {
    pub fn new(cfg: &ProviderConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            http,
            base_url: cfg.award_base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
        })
    }
}

#[async_trait]
impl AwardAvailabilityProvider for AwardApiClient {
    async fn search(&self, query: &AwardSearchQuery) -> Result<AwardPage, BoxError> {
        let url = format!("{}/availability/search", self.base_url);
        debug!(
            origin = %query.origin_airport,
            destination = %query.destination_airport,
            skip = query.skip,
            "fetching award availability page"
        );
        let page = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(query)
            .send()
            .await?
            .error_for_status()?
            .json::<AwardPage>()
            .await?;
        Ok(page)
    }
}

/// HTTP client for the flight-option search used by the alert matcher.
pub struct FlightApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl FlightApiClient {
    pub fn new(cfg: &ProviderConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_url: cfg.flight_base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
        })
    }
}

#[async_trait]
impl FlightSearchProvider for FlightApiClient {
    async fn search(
        &self,
        origin: &str,
        destination: &str,
        date_range: &DateRange,
        criteria: &AlertCriteria,
    ) -> Result<Vec<FlightOption>, BoxError> {
        let mut params: Vec<(&str, String)> = vec![
            ("origin", origin.to_string()),
            ("destination", destination.to_string()),
            ("start_date", date_range.start.to_string()),
            ("end_date", date_range.end.to_string()),
        ];
        if let Some(cabin) = criteria.cabin {
            params.push(("cabin", cabin.as_str().to_string()));
        }
        if let Some(stops) = criteria.max_stops {
            params.push(("max_stops", stops.to_string()));
        }
        if let Some(airlines) = &criteria.airlines {
            params.push(("airlines", airlines.join(",")));
        }

        let url = format!("{}/flights/search", self.base_url);
        let options = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<FlightOption>>()
            .await?;
        Ok(options)
    }
}
