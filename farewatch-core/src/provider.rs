use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Page size requested from the award-availability provider.
pub const PAGE_TAKE: u32 = 1000;

/// Query sent to the award-availability provider. The provider's contract is
/// positional about field presence, so optional fields serialize as explicit
/// nulls rather than being dropped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AwardSearchQuery {
    pub origin_airport: String,
    pub destination_airport: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub cursor: Option<String>,
    pub take: u32,
    pub order_by: String,
    pub skip: i64,
    pub include_trips: bool,
    pub only_direct_flights: bool,
    pub carriers: Option<Vec<String>>,
    pub include_filtered: bool,
    pub sources: Option<Vec<String>>,
    pub minify_trips: Option<bool>,
    pub cabins: Option<Vec<String>>,
}

impl AwardSearchQuery {
    /// Exhaustive-capture query used by the pagination engine: cheapest
    /// mileage first, trips included, no carrier/source/cabin narrowing.
    pub fn exhaustive(
        origin: &str,
        destination: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        cursor: Option<String>,
        skip: i64,
    ) -> Self {
        Self {
            origin_airport: origin.to_string(),
            destination_airport: destination.to_string(),
            start_date,
            end_date,
            cursor,
            take: PAGE_TAKE,
            order_by: "lowest_mileage".to_string(),
            skip,
            include_trips: true,
            only_direct_flights: false,
            carriers: None,
            include_filtered: true,
            sources: None,
            minify_trips: None,
            cabins: None,
        }
    }
}

/// One page of the award-availability response.
#[derive(Debug, Clone, Deserialize)]
pub struct AwardPage {
    pub count: i64,
    #[serde(rename = "hasMore")]
    pub has_more: bool,
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub data: Vec<AwardAvailability>,
}

impl AwardPage {
    /// Flattens the nested per-availability trip lists into one stream.
    pub fn trips(&self) -> Vec<ProviderTrip> {
        self.data
            .iter()
            .filter_map(|a| a.trips.as_ref())
            .flatten()
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AwardAvailability {
    #[serde(rename = "AvailabilityTrips")]
    pub trips: Option<Vec<ProviderTrip>>,
}

/// Raw award trip as the provider ships it. Decoded strictly at the ingestion
/// boundary; unknown fields are retained so the full payload can be stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderTrip {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "OriginAirport")]
    pub origin_airport: String,
    #[serde(rename = "DestinationAirport")]
    pub destination_airport: String,
    #[serde(rename = "DepartsAt")]
    pub departs_at: String,
    #[serde(rename = "FlightNumbers", default)]
    pub flight_numbers: Option<String>,
    #[serde(rename = "Cabin", default)]
    pub cabin: Option<String>,
    #[serde(rename = "MileageCost", default)]
    pub mileage_cost: Option<i64>,
    #[serde(rename = "RemainingSeats", default)]
    pub remaining_seats: Option<i32>,
    #[serde(rename = "TotalTaxes", default)]
    pub total_taxes: Option<serde_json::Number>,
    #[serde(rename = "TaxesCurrency", default)]
    pub taxes_currency: Option<String>,
    #[serde(rename = "Source", default)]
    pub source: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
