use farewatch_core::model::{Alert, FlightOption};
use farewatch_core::ports::FlightSearchProvider;
use futures_util::future::join_all;
use tracing::warn;

/// Hard cap on flights reported per alert in one email.
pub const MAX_FLIGHTS_PER_ALERT: usize = 5;

#[derive(Debug, Clone)]
pub struct AlertMatches {
    pub alert: Alert,
    pub flights: Vec<FlightOption>,
}

/// Fetches candidate flights for each alert concurrently. One alert's
/// provider failure is logged and drops only that alert; alerts whose
/// filtered list comes back empty are excluded from the result.
pub async fn fetch_flights_for_alerts(
    provider: &dyn FlightSearchProvider,
    alerts: &[Alert],
    max_per_alert: usize,
) -> Vec<AlertMatches> {
    let lookups = alerts.iter().map(|alert| async move {
        match provider
            .search(
                &alert.origin,
                &alert.destination,
                &alert.criteria.date_range,
                &alert.criteria,
            )
            .await
        {
            Ok(mut flights) => {
                flights.truncate(max_per_alert);
                if let Some(max_price) = alert.criteria.max_price {
                    flights.retain(|f| f.price_amount <= max_price);
                }
                Some(AlertMatches {
                    alert: alert.clone(),
                    flights,
                })
            }
            Err(err) => {
                warn!(alert_id = %alert.id, "flight search failed, skipping alert: {err}");
                None
            }
        }
    });

    join_all(lookups)
        .await
        .into_iter()
        .flatten()
        .filter(|m| !m.flights.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sample_alert, sample_flight, FakeFlightProvider};

    #[tokio::test]
    async fn test_caps_flights_per_alert() {
        let alert = sample_alert("SFO", "NRT");
        let provider = FakeFlightProvider::with_flights(
            "SFO",
            (0..10).map(|i| sample_flight(100.0 + i as f64)).collect(),
        );

        let matches = fetch_flights_for_alerts(&provider, &[alert], MAX_FLIGHTS_PER_ALERT).await;
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].flights.len(), 5);
    }

    #[tokio::test]
    async fn test_max_price_filter_applies_after_cap() {
        let mut alert = sample_alert("SFO", "NRT");
        alert.criteria.max_price = Some(150.0);
        let provider = FakeFlightProvider::with_flights(
            "SFO",
            vec![
                sample_flight(100.0),
                sample_flight(200.0),
                sample_flight(120.0),
            ],
        );

        let matches = fetch_flights_for_alerts(&provider, &[alert], MAX_FLIGHTS_PER_ALERT).await;
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].flights.len(), 2);
        assert!(matches[0].flights.iter().all(|f| f.price_amount <= 150.0));
    }

    #[tokio::test]
    async fn test_empty_results_excluded() {
        let with_flights = sample_alert("SFO", "NRT");
        let without = sample_alert("LAX", "HND");
        let provider = FakeFlightProvider::with_flights("SFO", vec![sample_flight(90.0)]);

        let matches = fetch_flights_for_alerts(
            &provider,
            &[with_flights.clone(), without],
            MAX_FLIGHTS_PER_ALERT,
        )
        .await;
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].alert.id, with_flights.id);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_abort_others() {
        let ok_alert = sample_alert("SFO", "NRT");
        let failing = sample_alert("ERR", "NRT");
        let provider = FakeFlightProvider::with_flights("SFO", vec![sample_flight(90.0)]);

        let matches =
            fetch_flights_for_alerts(&provider, &[failing, ok_alert], MAX_FLIGHTS_PER_ALERT).await;
        assert_eq!(matches.len(), 1);
    }
}
