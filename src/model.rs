use serde::Deserialize;

// ============================================================================
// REQUEST ENVELOPE
// ============================================================================

/// One entry of the `/generate` request body.
#[derive(Debug, Deserialize, Clone)]
pub struct RequestData {
    pub ticket: Ticket,
    pub user: User,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct User {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub adults: Vec<Adult>,
}

// ============================================================================
// ITINERARY
// ============================================================================

/// The itinerary record a ticket is rendered from.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Ticket {
    pub id: i64,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub currency: String,
    /// Legs of the trip, outbound first.
    #[serde(default)]
    pub itineraries: Vec<Leg>,
    #[serde(default)]
    pub airline: String,
    #[serde(default)]
    pub flight_class: String,
    #[serde(default)]
    pub start_city_name: String,
    #[serde(default)]
    pub start_country_name: String,
    #[serde(default)]
    pub final_city_name: String,
    #[serde(default)]
    pub final_country_name: String,
    #[serde(default)]
    pub qr_url: String,
}

/// One directional trip, possibly made of connecting segments.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Leg {
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub segments: Vec<Segment>,
    #[serde(default)]
    pub stops: u32,
}

/// A single non-stop flight.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Segment {
    #[serde(default)]
    pub departure_time: String,
    #[serde(default)]
    pub arrival_time: String,
    #[serde(default)]
    pub departure_airport: String,
    #[serde(default)]
    pub arrival_airport: String,
    #[serde(default)]
    pub carrier: String,
    #[serde(default)]
    pub carrier_name: String,
    #[serde(default)]
    pub carrier_logo: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub departure_city_name: String,
    #[serde(default)]
    pub departure_country_name: String,
    #[serde(default)]
    pub arrival_city_name: String,
    #[serde(default)]
    pub arrival_country_name: String,
    #[serde(default)]
    pub aircraft: Option<String>,
    #[serde(default)]
    pub distance: Option<String>,
    #[serde(default)]
    pub meals: Option<String>,
}

/// A passenger. Only the name is used by the layout.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Adult {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub birth_date: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub seria_passport: i64,
    #[serde(default)]
    pub number_passport: i64,
    #[serde(default)]
    pub nationality: String,
    #[serde(default)]
    pub validity_period: String,
}

impl Ticket {
    /// Segments of every leg, in travel order. Empty legs contribute nothing.
    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.itineraries.iter().flat_map(|leg| leg.segments.iter())
    }

    /// First segment of the first leg that has one.
    pub fn first_segment(&self) -> Option<&Segment> {
        self.segments().next()
    }

    /// Last segment of the last leg that has one.
    pub fn last_segment(&self) -> Option<&Segment> {
        self.itineraries
            .iter()
            .rev()
            .find_map(|leg| leg.segments.last())
    }

    pub fn origin(&self) -> String {
        place(&self.start_city_name, &self.start_country_name)
    }

    pub fn destination(&self) -> String {
        place(&self.final_city_name, &self.final_country_name)
    }
}

impl Segment {
    pub fn departure_place(&self) -> String {
        place(&self.departure_city_name, &self.departure_country_name)
    }

    pub fn arrival_place(&self) -> String {
        place(&self.arrival_city_name, &self.arrival_country_name)
    }
}

/// `"City, Country"`, skipping whichever part is blank.
fn place(city: &str, country: &str) -> String {
    [city.trim(), country.trim()]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(", ")
}

impl Adult {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Display value for an optional segment attribute.
pub fn or_not_available(value: Option<&str>) -> &str {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => "Not Available",
    }
}
