//! Flight search and booking (mock inventory)

use serde::{Deserialize, Serialize};
use tracing::info;

use super::dates;
use super::Confirmation;

const DEPARTURE_AIRPORT: &str = "New York (JFK)";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightOffer {
    pub id: String,
    pub departure: String,
    pub arrival: String,
    pub price: f64,
    pub departure_time: String,
}

/// Two fixed offers departing on the requested start date
pub fn search_flights(destination: &str, travel_dates: Option<&str>) -> Vec<FlightOffer> {
    info!("◆ searching flights to {}", destination);
    let start = dates::start_date_or_default(travel_dates).format("%Y-%m-%d");

    [("FL123", 450.00, "08:00:00"), ("FL456", 550.00, "11:00:00")]
        .into_iter()
        .map(|(id, price, time)| FlightOffer {
            id: id.to_string(),
            departure: DEPARTURE_AIRPORT.to_string(),
            arrival: destination.to_string(),
            price,
            departure_time: format!("{}T{}", start, time),
        })
        .collect()
}

pub fn book_flight(flight_id: &str) -> Confirmation {
    info!("◆ booking flight {}", flight_id);
    Confirmation::for_id(flight_id)
}
