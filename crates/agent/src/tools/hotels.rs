//! Hotel search and booking (mock inventory)

use serde::{Deserialize, Serialize};
use tracing::info;

use super::dates;
use super::Confirmation;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotelOffer {
    pub id: String,
    pub name: String,
    pub price_per_night: f64,
}

/// Two fixed offers. Dates are logged but do not filter anything.
pub fn search_hotels(destination: &str, travel_dates: Option<&str>) -> Vec<HotelOffer> {
    info!("◆ searching hotels in {}", destination);
    dates::resolve(travel_dates, "hotel search");

    [
        ("HOT789", "Grand Plaza Hotel", 250.00),
        ("HOT101", "City Center Inn", 180.00),
    ]
    .into_iter()
    .map(|(id, name, price_per_night)| HotelOffer {
        id: id.to_string(),
        name: name.to_string(),
        price_per_night,
    })
    .collect()
}

pub fn book_hotel(hotel_id: &str) -> Confirmation {
    info!("◆ booking hotel {}", hotel_id);
    Confirmation::for_id(hotel_id)
}
