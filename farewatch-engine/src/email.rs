use crate::matcher::AlertMatches;

/// Builds the subject and plain-text body for one daily summary email
/// covering every alert that matched flights.
pub fn compose_summary(matches: &[AlertMatches]) -> (String, String) {
    let subject = if matches.len() == 1 {
        let m = &matches[0];
        format!(
            "FareWatch: fares found for {} to {}",
            m.alert.origin, m.alert.destination
        )
    } else {
        format!("FareWatch: fares found for {} of your alerts", matches.len())
    };

    let mut body = String::from("Here are today's matches for your fare alerts:\n");
    for m in matches {
        let range = &m.alert.criteria.date_range;
        body.push_str(&format!(
            "\n{} to {} ({} to {})\n",
            m.alert.origin, m.alert.destination, range.start, range.end
        ));
        for f in &m.flights {
            body.push_str(&format!(
                "  {} {} departs {} for {:.2} {} ({} seats left)\n",
                f.airline,
                f.flight_number,
                f.departure_time.format("%Y-%m-%d %H:%M UTC"),
                f.price_amount,
                f.price_currency,
                f.remaining_seats,
            ));
        }
    }
    body.push_str("\nManage your alerts any time from your FareWatch dashboard.\n");

    (subject, body)
}
