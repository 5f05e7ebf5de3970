use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use farewatch_core::model::{CabinClass, TripRow};
use farewatch_core::ports::{BoxError, TripStore};
use farewatch_core::provider::ProviderTrip;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::warn;
use uuid::Uuid;

pub struct PgTripStore {
    pool: PgPool,
}

impl PgTripStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TripMapError {
    #[error("trip record has no external id")]
    MissingId,
    #[error("trip {0} has an incomplete route")]
    MissingRoute(String),
    #[error("trip {0} has unparseable departure date {1:?}")]
    BadDate(String, String),
    #[error("trip {0} has unknown cabin class {1:?}")]
    UnknownCabin(String, String),
    #[error("trip payload could not be re-encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Strict decode at the ingestion boundary: a provider trip either maps to a
/// complete row or is rejected with the specific defect. Missing optional
/// fields become nulls; numeric taxes are carried as their exact decimal
/// string so repeated ingests cannot drift.
pub fn map_trip(trip: &ProviderTrip) -> Result<TripRow, TripMapError> {
    if trip.id.trim().is_empty() {
        return Err(TripMapError::MissingId);
    }
    if trip.origin_airport.trim().is_empty() || trip.destination_airport.trim().is_empty() {
        return Err(TripMapError::MissingRoute(trip.id.clone()));
    }

    let date_part = trip.departs_at.get(..10).unwrap_or(&trip.departs_at);
    let travel_date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|_| TripMapError::BadDate(trip.id.clone(), trip.departs_at.clone()))?;

    let cabin = match trip.cabin.as_deref() {
        Some(s) => Some(
            CabinClass::from_alias(s)
                .ok_or_else(|| TripMapError::UnknownCabin(trip.id.clone(), s.to_string()))?,
        ),
        None => None,
    };

    Ok(TripRow {
        external_id: trip.id.clone(),
        origin: trip.origin_airport.clone(),
        destination: trip.destination_airport.clone(),
        travel_date,
        flight_numbers: trip.flight_numbers.clone(),
        cabin,
        mileage_cost: trip.mileage_cost,
        remaining_seats: trip.remaining_seats,
        total_taxes: trip.total_taxes.as_ref().map(|n| n.to_string()),
        taxes_currency: trip.taxes_currency.clone(),
        source: trip.source.clone(),
        raw: serde_json::to_value(trip)?,
    })
}

fn build_upsert<'a>(
    search_request_id: Uuid,
    rows: &'a [TripRow],
) -> QueryBuilder<'a, Postgres> {
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO availability_trips \
         (external_id, search_request_id, origin, destination, travel_date, flight_numbers, \
          cabin, mileage_cost, remaining_seats, total_taxes, taxes_currency, source, raw, \
          updated_at) ",
    );
    qb.push_values(rows, |mut b, row| {
        b.push_bind(&row.external_id)
            .push_bind(search_request_id)
            .push_bind(&row.origin)
            .push_bind(&row.destination)
            .push_bind(row.travel_date)
            .push_bind(row.flight_numbers.as_deref())
            .push_bind(row.cabin.map(|c| c.as_str()))
            .push_bind(row.mileage_cost)
            .push_bind(row.remaining_seats)
            .push_bind(row.total_taxes.as_deref())
            .push_bind(row.taxes_currency.as_deref())
            .push_bind(row.source.as_deref())
            .push_bind(&row.raw)
            .push_bind(Utc::now());
    });
    // Every column is overwritten on conflict; the latest fetch wins whole.
    qb.push(
        " ON CONFLICT (external_id) DO UPDATE SET \
         search_request_id = EXCLUDED.search_request_id, origin = EXCLUDED.origin, \
         destination = EXCLUDED.destination, travel_date = EXCLUDED.travel_date, \
         flight_numbers = EXCLUDED.flight_numbers, cabin = EXCLUDED.cabin, \
         mileage_cost = EXCLUDED.mileage_cost, remaining_seats = EXCLUDED.remaining_seats, \
         total_taxes = EXCLUDED.total_taxes, taxes_currency = EXCLUDED.taxes_currency, \
         source = EXCLUDED.source, raw = EXCLUDED.raw, updated_at = EXCLUDED.updated_at",
    );
    qb
}

#[async_trait]
impl TripStore for PgTripStore {
    async fn upsert(
        &self,
        search_request_id: Uuid,
        trips: &[ProviderTrip],
    ) -> Result<usize, BoxError> {
        let mut rows = Vec::with_capacity(trips.len());
        for trip in trips {
            match map_trip(trip) {
                Ok(row) => rows.push(row),
                Err(err) => warn!(trip_id = %trip.id, "skipping invalid trip record: {err}"),
            }
        }
        if rows.is_empty() {
            return Ok(0);
        }

        build_upsert(search_request_id, &rows)
            .build()
            .execute(&self.pool)
            .await?;
        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_trip(id: &str) -> ProviderTrip {
        ProviderTrip {
            id: id.to_string(),
            origin_airport: "SFO".to_string(),
            destination_airport: "NRT".to_string(),
            departs_at: "2025-10-15T08:30:00Z".to_string(),
            flight_numbers: Some("UA837".to_string()),
            cabin: Some("J".to_string()),
            mileage_cost: Some(80000),
            remaining_seats: Some(2),
            total_taxes: Some(serde_json::Number::from_f64(56.7).unwrap()),
            taxes_currency: Some("USD".to_string()),
            source: Some("united".to_string()),
            extra: serde_json::Map::new(),
        }
    }

    #[test]
    fn test_valid_trip_maps_completely() {
        let row = map_trip(&provider_trip("t-1")).unwrap();
        assert_eq!(row.external_id, "t-1");
        assert_eq!(
            row.travel_date,
            NaiveDate::from_ymd_opt(2025, 10, 15).unwrap()
        );
        assert_eq!(row.cabin, Some(CabinClass::Business));
        assert_eq!(row.total_taxes.as_deref(), Some("56.7"));
        assert_eq!(row.raw["ID"], "t-1");
    }

    #[test]
    fn test_integer_taxes_coerce_without_drift() {
        let mut trip = provider_trip("t-2");
        trip.total_taxes = Some(serde_json::Number::from(5600u32));
        let row = map_trip(&trip).unwrap();
        assert_eq!(row.total_taxes.as_deref(), Some("5600"));
    }

    #[test]
    fn test_missing_optionals_default_to_null() {
        let mut trip = provider_trip("t-3");
        trip.cabin = None;
        trip.flight_numbers = None;
        trip.total_taxes = None;
        let row = map_trip(&trip).unwrap();
        assert_eq!(row.cabin, None);
        assert_eq!(row.flight_numbers, None);
        assert_eq!(row.total_taxes, None);
    }

    #[test]
    fn test_invalid_records_are_rejected() {
        let mut no_id = provider_trip("");
        no_id.id = "  ".to_string();
        assert!(matches!(map_trip(&no_id), Err(TripMapError::MissingId)));

        let mut bad_date = provider_trip("t-4");
        bad_date.departs_at = "sometime soon".to_string();
        assert!(matches!(
            map_trip(&bad_date),
            Err(TripMapError::BadDate(_, _))
        ));

        let mut weird_cabin = provider_trip("t-5");
        weird_cabin.cabin = Some("suite".to_string());
        assert!(matches!(
            map_trip(&weird_cabin),
            Err(TripMapError::UnknownCabin(_, _))
        ));

        let mut no_route = provider_trip("t-6");
        no_route.origin_airport = String::new();
        assert!(matches!(
            map_trip(&no_route),
            Err(TripMapError::MissingRoute(_))
        ));
    }

    #[test]
    fn test_upsert_overwrites_every_column_on_conflict() {
        let rows = vec![map_trip(&provider_trip("t-1")).unwrap()];
        let qb = build_upsert(Uuid::new_v4(), &rows);
        let sql = qb.sql();
        assert!(sql.contains("ON CONFLICT (external_id) DO UPDATE SET"));
        for column in [
            "origin", "destination", "travel_date", "flight_numbers", "cabin", "mileage_cost",
            "remaining_seats", "total_taxes", "taxes_currency", "source", "raw", "updated_at",
        ] {
            assert!(
                sql.contains(&format!("{column} = EXCLUDED.{column}")),
                "missing overwrite for {column}"
            );
        }
    }
}
