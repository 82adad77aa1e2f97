//! Simulated flight search.
//!
//! No booking backend is wired in; results are generated from a random source
//! that can be injected so tests are reproducible.

use std::fmt;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use wayfarer_core::tools::{
    enum_property, integer_property, object_schema, optional_str, required_str, string_property,
    Result, Tool, ToolError,
};

const AIRLINES: [&str; 8] = [
    "American Airlines",
    "Delta Air Lines",
    "United Airlines",
    "British Airways",
    "Lufthansa",
    "Air France",
    "Emirates",
    "Singapore Airlines",
];

const AIRCRAFT: [&str; 6] = [
    "Boeing 737",
    "Airbus A320",
    "Boeing 777",
    "Airbus A350",
    "Boeing 787",
    "Airbus A380",
];

/// Cabin class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CabinClass {
    Economy,
    Business,
    First,
}

impl CabinClass {
    fn parse(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "economy" => Ok(Self::Economy),
            "business" => Ok(Self::Business),
            "first" => Ok(Self::First),
            other => Err(ToolError::InvalidArguments(format!(
                "Unknown flight class: {}",
                other
            ))),
        }
    }

    fn price_multiplier(&self) -> f64 {
        match self {
            Self::Economy => 1.0,
            Self::Business => 3.0,
            Self::First => 5.0,
        }
    }
}

impl fmt::Display for CabinClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Economy => write!(f, "Economy"),
            Self::Business => write!(f, "Business"),
            Self::First => write!(f, "First"),
        }
    }
}

/// Validated search parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightQuery {
    pub origin: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub passengers: u32,
    pub class: CabinClass,
}

impl FlightQuery {
    /// Parse tool arguments.
    pub fn from_args(args: &Value) -> Result<Self> {
        let departure_date = parse_date(required_str(args, "departure_date")?)?;
        let return_date = optional_str(args, "return_date").map(parse_date).transpose()?;
        if let Some(ret) = return_date {
            if ret < departure_date {
                return Err(ToolError::InvalidArguments(
                    "Return date must not be before the departure date".to_string(),
                ));
            }
        }

        let passengers = match args.get("passengers").and_then(Value::as_u64) {
            None => 1,
            Some(0) => {
                return Err(ToolError::InvalidArguments(
                    "At least one passenger is required".to_string(),
                ))
            }
            Some(n) => n.min(9) as u32,
        };

        let class = optional_str(args, "class")
            .map(CabinClass::parse)
            .transpose()?
            .unwrap_or(CabinClass::Economy);

        Ok(Self {
            origin: required_str(args, "origin")?.to_string(),
            destination: required_str(args, "destination")?.to_string(),
            departure_date,
            return_date,
            passengers,
            class,
        })
    }

    pub fn is_round_trip(&self) -> bool {
        self.return_date.is_some()
    }
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        ToolError::InvalidArguments(format!("Invalid date '{}', expected YYYY-MM-DD", value))
    })
}

/// One generated itinerary leg.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightOption {
    pub airline: &'static str,
    pub aircraft: &'static str,
    pub departure_time: String,
    pub arrival_time: String,
    pub duration_minutes: u32,
    /// Per-person fare in whole dollars.
    pub price: u32,
    pub stops: u8,
}

impl FlightOption {
    fn duration(&self) -> String {
        format!("{}h {}m", self.duration_minutes / 60, self.duration_minutes % 60)
    }

    fn stops_label(&self) -> String {
        if self.stops == 0 {
            "Non-stop".to_string()
        } else {
            format!("{} stop(s)", self.stops)
        }
    }
}

/// Generate 3-5 options sorted by ascending price.
pub fn generate_flights<R: Rng + ?Sized>(rng: &mut R, class: CabinClass) -> Vec<FlightOption> {
    let count = rng.gen_range(3..=5);
    let mut flights: Vec<FlightOption> = (0..count).map(|_| generate_flight(rng, class)).collect();
    flights.sort_by_key(|f| f.price);
    flights
}

fn generate_flight<R: Rng + ?Sized>(rng: &mut R, class: CabinClass) -> FlightOption {
    let airline = AIRLINES[rng.gen_range(0..AIRLINES.len())];
    let aircraft = AIRCRAFT[rng.gen_range(0..AIRCRAFT.len())];
    let stops: u8 = if rng.gen_bool(0.6) { 0 } else { rng.gen_range(1..=2) };

    let departure_hour: u32 = rng.gen_range(4..=23);
    let departure_minute: u32 = if rng.gen_bool(0.5) { 0 } else { 30 };
    let duration_hours: u32 = rng.gen_range(2..=13) + u32::from(stops) * 2;
    let duration_minutes = duration_hours * 60 + rng.gen_range(0..60);

    let arrival_total = departure_hour * 60 + departure_minute + duration_minutes;
    let arrival_hour = (arrival_total / 60) % 24;
    let arrival_minute = arrival_total % 60;

    let mut price = f64::from(rng.gen_range(200u32..1000)) * class.price_multiplier();
    if stops > 0 {
        price *= 0.8;
    }

    FlightOption {
        airline,
        aircraft,
        departure_time: format!("{:02}:{:02}", departure_hour, departure_minute),
        arrival_time: format!("{:02}:{:02}", arrival_hour, arrival_minute),
        duration_minutes,
        price: price.floor() as u32,
        stops,
    }
}

/// Full result set for a query.
#[derive(Debug, Clone)]
pub struct FlightResults {
    pub query: FlightQuery,
    pub outbound: Vec<FlightOption>,
    pub inbound: Vec<FlightOption>,
}

impl FlightResults {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, query: FlightQuery) -> Self {
        let outbound = generate_flights(rng, query.class);
        let inbound = if query.is_round_trip() {
            generate_flights(rng, query.class)
        } else {
            Vec::new()
        };
        Self {
            query,
            outbound,
            inbound,
        }
    }
}

impl fmt::Display for FlightResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let q = &self.query;
        let trip = if q.is_round_trip() { "Round-trip" } else { "One-way" };

        write!(
            f,
            "✈️ **Flight Search Results**\n\n**{} from {} to {}**\n**Departure:** {}",
            trip, q.origin, q.destination, q.departure_date
        )?;
        if let Some(ret) = q.return_date {
            write!(f, "\n**Return:** {}", ret)?;
        }
        write!(
            f,
            "\n**Passengers:** {}\n**Class:** {}\n\n## Outbound Flights",
            q.passengers, q.class
        )?;

        for (i, flight) in self.outbound.iter().enumerate() {
            write!(
                f,
                "\n\n**Option {}:** {}\n🕐 **Departure:** {} from {}\n🕐 **Arrival:** {} at {}\n✈️ **Aircraft:** {}\n⏱️ **Duration:** {}\n💰 **Price:** ${} per person",
                i + 1,
                flight.airline,
                flight.departure_time,
                q.origin,
                flight.arrival_time,
                q.destination,
                flight.aircraft,
                flight.duration(),
                flight.price
            )?;
            if q.passengers > 1 {
                write!(f, " (${} total)", flight.price * q.passengers)?;
            }
            write!(f, "\n🔄 **Stops:** {}", flight.stops_label())?;
        }

        if !self.inbound.is_empty() {
            write!(f, "\n\n## Return Flights")?;
            for (i, flight) in self.inbound.iter().enumerate() {
                write!(
                    f,
                    "\n\n**Option {}:** {}\n🕐 **Departure:** {} from {}\n🕐 **Arrival:** {} at {}\n✈️ **Aircraft:** {}\n⏱️ **Duration:** {}\n💰 **Price:** Included in round-trip pricing\n🔄 **Stops:** {}",
                    i + 1,
                    flight.airline,
                    flight.departure_time,
                    q.destination,
                    flight.arrival_time,
                    q.origin,
                    flight.aircraft,
                    flight.duration(),
                    flight.stops_label()
                )?;
            }
        }

        write!(
            f,
            "\n\n## 💡 **Booking Tips:**\n\
             • Prices shown are estimates and may vary\n\
             • Book directly with airlines or use travel sites like Expedia, Kayak\n\
             • Consider flexible dates for better prices\n\
             • Check baggage policies and fees\n\
             • Arrive at airport 2-3 hours early for international flights\n\n\
             *Note: These are sample results. For real bookings, please check actual airline websites or travel booking platforms.*"
        )
    }
}

/// `search_flights` tool.
pub struct FlightSearchTool {
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl FlightSearchTool {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Use a specific random source.
    pub fn with_rng(rng: impl RngCore + Send + 'static) -> Self {
        Self {
            rng: Mutex::new(Box::new(rng)),
        }
    }

    /// Generate results for a parsed query.
    pub fn search(&self, query: FlightQuery) -> FlightResults {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        FlightResults::generate(&mut **rng, query)
    }
}

impl Default for FlightSearchTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for FlightSearchTool {
    fn name(&self) -> &str {
        "search_flights"
    }

    fn description(&self) -> &str {
        "Search for flights between destinations with pricing and schedule information"
    }

    fn parameters(&self) -> Value {
        object_schema(
            json!({
                "origin": string_property("Departure city or airport code (e.g., \"New York\", \"JFK\", \"London\")"),
                "destination": string_property("Arrival city or airport code (e.g., \"Paris\", \"CDG\", \"Tokyo\")"),
                "departure_date": string_property("Departure date in YYYY-MM-DD format"),
                "return_date": string_property("Return date in YYYY-MM-DD format (optional for one-way flights)"),
                "passengers": integer_property("Number of passengers (default: 1)", 1),
                "class": enum_property("Flight class preference (economy, business, first)", &["economy", "business", "first"])
            }),
            vec!["origin", "destination", "departure_date"],
        )
    }

    fn service_key(&self) -> &str {
        "flights"
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let query = FlightQuery::from_args(&args)?;
        let results = self.search(query);
        info!(
            category = "tools",
            tool = "flights",
            origin = %results.query.origin,
            destination = %results.query.destination,
            outbound = results.outbound.len(),
            inbound = results.inbound.len(),
            "Flight search generated"
        );
        Ok(results.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(return_date: Option<&str>) -> Value {
        let mut args = json!({
            "origin": "New York",
            "destination": "Paris",
            "departure_date": "2025-05-01"
        });
        if let Some(ret) = return_date {
            args["return_date"] = json!(ret);
        }
        args
    }

    fn assert_well_formed(flights: &[FlightOption]) {
        assert!((3..=5).contains(&flights.len()), "got {} flights", flights.len());
        assert!(flights.windows(2).all(|w| w[0].price <= w[1].price));
        for flight in flights {
            assert!(!flight.airline.is_empty());
            assert!(flight.stops <= 2);
            assert!(flight.duration_minutes >= 120);
        }
    }

    #[test]
    fn test_one_way_is_sorted_and_bounded() {
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let q = FlightQuery::from_args(&query(None)).unwrap();
            let results = FlightResults::generate(&mut rng, q);
            assert_well_formed(&results.outbound);
            assert!(results.inbound.is_empty());
            for flight in &results.outbound {
                assert!((160..1000).contains(&flight.price));
            }
        }
    }

    #[test]
    fn test_round_trip_has_return_flights() {
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let q = FlightQuery::from_args(&query(Some("2025-05-10"))).unwrap();
            let results = FlightResults::generate(&mut rng, q);
            assert_well_formed(&results.outbound);
            assert_well_formed(&results.inbound);
        }
    }

    #[test]
    fn test_first_class_costs_more() {
        let mut rng = StdRng::seed_from_u64(7);
        for flight in generate_flights(&mut rng, CabinClass::First) {
            assert!(flight.price >= 800);
        }
    }

    #[test]
    fn test_query_validation() {
        let mut args = query(Some("2025-04-01"));
        assert!(FlightQuery::from_args(&args).is_err());

        args = query(None);
        args["departure_date"] = json!("May 1st");
        assert!(FlightQuery::from_args(&args).is_err());

        args = query(None);
        args["class"] = json!("premium");
        assert!(FlightQuery::from_args(&args).is_err());

        args = query(None);
        args["class"] = json!("Business");
        args["passengers"] = json!(2);
        let q = FlightQuery::from_args(&args).unwrap();
        assert_eq!(q.class, CabinClass::Business);
        assert_eq!(q.passengers, 2);
    }

    #[tokio::test]
    async fn test_execute_renders_markdown() {
        let tool = FlightSearchTool::with_rng(StdRng::seed_from_u64(42));
        let text = tool.execute(query(Some("2025-05-10"))).await.unwrap();
        assert!(text.starts_with("✈️ **Flight Search Results**"));
        assert!(text.contains("**Round-trip from New York to Paris**"));
        assert!(text.contains("**Return:** 2025-05-10"));
        assert!(text.contains("## Return Flights"));
        assert!(text.contains("**Option 3:**"));
        assert!(text.contains("## 💡 **Booking Tips:**"));
    }
}
