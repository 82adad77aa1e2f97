//! Simulated hotel search.

use std::fmt;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use wayfarer_core::tools::{
    enum_property, integer_property, object_schema, optional_str, required_str, string_property,
    Result, Tool, ToolError,
};

/// Price tier requested by the traveller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BudgetRange {
    Budget,
    MidRange,
    Luxury,
}

struct TierCatalog {
    chains: &'static [&'static str],
    amenities: &'static [&'static str],
    room_types: &'static [&'static str],
    descriptions: &'static [&'static str],
    /// Rating bounds in tenths of a star.
    rating_tenths: (u8, u8),
    /// Nightly price bounds in dollars, upper exclusive.
    nightly_price: (u32, u32),
}

const BUDGET: TierCatalog = TierCatalog {
    chains: &["Holiday Inn Express", "Best Western", "Comfort Inn", "Ibis", "Premier Inn"],
    amenities: &[
        "Free WiFi",
        "Breakfast included",
        "Fitness center",
        "24-hour front desk",
        "Air conditioning",
    ],
    room_types: &["Standard Room", "Queen Room", "Double Room"],
    descriptions: &[
        "Clean and comfortable accommodations with essential amenities.",
        "Modern rooms designed for budget-conscious travelers.",
        "Simple, well-maintained hotel perfect for short stays.",
    ],
    rating_tenths: (30, 45),
    nightly_price: (40, 120),
};

const MID_RANGE: TierCatalog = TierCatalog {
    chains: &["Holiday Inn", "Marriott", "Hilton Garden Inn", "Courtyard", "Radisson"],
    amenities: &[
        "Free WiFi",
        "Restaurant",
        "Bar",
        "Fitness center",
        "Business center",
        "Pool",
        "Room service",
    ],
    room_types: &["Deluxe Room", "Executive Room", "Junior Suite"],
    descriptions: &[
        "Stylish hotel combining comfort with excellent service.",
        "Modern accommodations with business-friendly amenities.",
        "Well-appointed rooms in a convenient location.",
    ],
    rating_tenths: (35, 50),
    nightly_price: (80, 200),
};

const LUXURY: TierCatalog = TierCatalog {
    chains: &["Four Seasons", "Ritz-Carlton", "St. Regis", "Waldorf Astoria", "Park Hyatt"],
    amenities: &[
        "Concierge service",
        "Spa",
        "Fine dining restaurant",
        "Room service",
        "Butler service",
        "Pool",
        "Valet parking",
        "Premium WiFi",
    ],
    room_types: &["Executive Suite", "Premium Suite", "Presidential Suite"],
    descriptions: &[
        "Exceptional luxury with world-class service and amenities.",
        "Elegant accommodations offering the finest hospitality.",
        "Prestigious hotel known for impeccable service and style.",
    ],
    rating_tenths: (42, 50),
    nightly_price: (300, 800),
};

impl BudgetRange {
    fn parse(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "budget" => Ok(Self::Budget),
            "mid-range" | "midrange" | "mid" => Ok(Self::MidRange),
            "luxury" => Ok(Self::Luxury),
            other => Err(ToolError::InvalidArguments(format!(
                "Unknown budget range: {}",
                other
            ))),
        }
    }

    fn catalog(&self) -> &'static TierCatalog {
        match self {
            Self::Budget => &BUDGET,
            Self::MidRange => &MID_RANGE,
            Self::Luxury => &LUXURY,
        }
    }
}

impl fmt::Display for BudgetRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Budget => write!(f, "Budget"),
            Self::MidRange => write!(f, "Mid-range"),
            Self::Luxury => write!(f, "Luxury"),
        }
    }
}

/// Validated stay parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct StayQuery {
    pub location: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: u32,
    pub rooms: u32,
    pub budget: BudgetRange,
}

impl StayQuery {
    pub fn from_args(args: &Value) -> Result<Self> {
        let check_in = parse_date(required_str(args, "check_in")?)?;
        let check_out = parse_date(required_str(args, "check_out")?)?;
        if check_out <= check_in {
            return Err(ToolError::InvalidArguments(
                "Check-out must be after check-in".to_string(),
            ));
        }
        let budget = optional_str(args, "budget_range")
            .map(BudgetRange::parse)
            .transpose()?
            .unwrap_or(BudgetRange::MidRange);

        Ok(Self {
            location: required_str(args, "location")?.to_string(),
            check_in,
            check_out,
            guests: positive_count(args, "guests", 2),
            rooms: positive_count(args, "rooms", 1),
            budget,
        })
    }

    /// Whole nights between check-in and check-out, at least one.
    pub fn nights(&self) -> u32 {
        (self.check_out - self.check_in).num_days().max(1) as u32
    }
}

fn positive_count(args: &Value, key: &str, default: u32) -> u32 {
    args.get(key)
        .and_then(Value::as_u64)
        .filter(|n| *n > 0)
        .map_or(default, |n| n.min(20) as u32)
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        ToolError::InvalidArguments(format!("Invalid date '{}', expected YYYY-MM-DD", value))
    })
}

/// One generated hotel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotelOption {
    pub name: String,
    /// Rating in tenths of a star (45 = 4.5/5).
    pub rating_tenths: u8,
    pub reviews: u32,
    pub area: String,
    pub price_per_night: u32,
    pub total_price: u32,
    pub amenities: Vec<&'static str>,
    pub room_type: &'static str,
    pub description: &'static str,
}

impl HotelOption {
    pub fn rating(&self) -> f32 {
        f32::from(self.rating_tenths) / 10.0
    }
}

/// Generate 4-6 hotels for `query`, best rated first.
pub fn generate_hotels<R: Rng + ?Sized>(rng: &mut R, query: &StayQuery) -> Vec<HotelOption> {
    let catalog = query.budget.catalog();
    let location = &query.location;
    let areas = [
        format!("Downtown {}", location),
        format!("{} City Center", location),
        format!("{} Business District", location),
        format!("Historic {}", location),
        format!("{} Airport Area", location),
    ];
    let nights = query.nights();

    let count = rng.gen_range(4..=6);
    let mut hotels: Vec<HotelOption> = (0..count)
        .map(|_| {
            let (lo, hi) = catalog.rating_tenths;
            let (min_price, max_price) = catalog.nightly_price;
            let price_per_night = rng.gen_range(min_price..max_price);

            let amenity_count = rng.gen_range(4..=6).min(catalog.amenities.len());
            let amenities = catalog
                .amenities
                .choose_multiple(rng, amenity_count)
                .copied()
                .collect();

            HotelOption {
                name: format!("{} {}", pick(rng, catalog.chains), location),
                rating_tenths: rng.gen_range(lo..=hi),
                reviews: rng.gen_range(100..2100),
                area: areas[rng.gen_range(0..areas.len())].clone(),
                price_per_night,
                total_price: price_per_night * nights,
                amenities,
                room_type: pick(rng, catalog.room_types),
                description: pick(rng, catalog.descriptions),
            }
        })
        .collect();

    hotels.sort_by(|a, b| b.rating_tenths.cmp(&a.rating_tenths));
    hotels
}

fn pick<R: Rng + ?Sized>(rng: &mut R, items: &'static [&'static str]) -> &'static str {
    items[rng.gen_range(0..items.len())]
}

fn render(query: &StayQuery, hotels: &[HotelOption]) -> String {
    let nights = query.nights();
    let mut out = format!(
        "🏨 **Hotel Search Results for {}**\n\n**Check-in:** {}\n**Check-out:** {}\n**Duration:** {} night{}\n**Guests:** {} | **Rooms:** {}\n**Budget Range:** {}\n\n---",
        query.location,
        query.check_in,
        query.check_out,
        nights,
        if nights > 1 { "s" } else { "" },
        query.guests,
        query.rooms,
        query.budget
    );

    for (i, hotel) in hotels.iter().enumerate() {
        let amenities = hotel
            .amenities
            .iter()
            .map(|a| format!("• {}", a))
            .collect::<Vec<_>>()
            .join("\n");
        out.push_str(&format!(
            "\n\n## {}. **{}**\n⭐ **Rating:** {:.1}/5 ({} reviews)\n📍 **Location:** {}\n💰 **Price:** ${}/night • **Total: ${}**\n\n**Amenities:**\n{}\n\n**Room Type:** {}\n**Description:** {}",
            i + 1,
            hotel.name,
            hotel.rating(),
            hotel.reviews,
            hotel.area,
            hotel.price_per_night,
            hotel.total_price,
            amenities,
            hotel.room_type,
            hotel.description
        ));
    }

    out.push_str(
        "\n\n## 💡 **Booking Tips:**\n\
         • Prices may vary based on exact dates and availability\n\
         • Book directly with hotels for best rates and benefits\n\
         • Check cancellation policies before booking\n\
         • Consider location vs. price trade-offs\n\
         • Read recent reviews for current conditions\n\n\
         **Popular Booking Sites:**\n\
         • Booking.com, Hotels.com, Expedia\n\
         • Hotel direct websites for member rates\n\
         • Trivago for price comparison\n\n\
         *Note: These are sample results. For real bookings, please check actual hotel websites or booking platforms.*",
    );
    out
}

/// `search_hotels` tool.
pub struct HotelSearchTool {
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl HotelSearchTool {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Use a specific random source.
    pub fn with_rng(rng: impl RngCore + Send + 'static) -> Self {
        Self {
            rng: Mutex::new(Box::new(rng)),
        }
    }

    pub fn search(&self, query: &StayQuery) -> Vec<HotelOption> {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        generate_hotels(&mut **rng, query)
    }
}

impl Default for HotelSearchTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for HotelSearchTool {
    fn name(&self) -> &str {
        "search_hotels"
    }

    fn description(&self) -> &str {
        "Search for hotels and accommodations with pricing, ratings, and amenities"
    }

    fn parameters(&self) -> Value {
        object_schema(
            json!({
                "location": string_property("City or area to search for hotels (e.g., \"Paris\", \"Manhattan, New York\")"),
                "check_in": string_property("Check-in date in YYYY-MM-DD format"),
                "check_out": string_property("Check-out date in YYYY-MM-DD format"),
                "guests": integer_property("Number of guests (default: 2)", 2),
                "rooms": integer_property("Number of rooms (default: 1)", 1),
                "budget_range": enum_property("Budget preference", &["budget", "mid-range", "luxury"])
            }),
            vec!["location", "check_in", "check_out"],
        )
    }

    fn service_key(&self) -> &str {
        "hotels"
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let query = StayQuery::from_args(&args)?;
        let hotels = self.search(&query);
        info!(
            category = "tools",
            tool = "hotels",
            location = %query.location,
            nights = query.nights(),
            results = hotels.len(),
            "Hotel search generated"
        );
        Ok(render(&query, &hotels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(budget: &str) -> Value {
        json!({
            "location": "Rome",
            "check_in": "2025-06-01",
            "check_out": "2025-06-04",
            "budget_range": budget
        })
    }

    #[test]
    fn test_hotels_sorted_and_totals_consistent() {
        for budget in ["budget", "mid-range", "luxury"] {
            let query = StayQuery::from_args(&args(budget)).unwrap();
            assert_eq!(query.nights(), 3);
            for seed in 0..30 {
                let mut rng = StdRng::seed_from_u64(seed);
                let hotels = generate_hotels(&mut rng, &query);
                assert!((4..=6).contains(&hotels.len()));
                assert!(hotels
                    .windows(2)
                    .all(|w| w[0].rating_tenths >= w[1].rating_tenths));
                for hotel in &hotels {
                    assert_eq!(hotel.total_price, hotel.price_per_night * 3);
                    assert!((4..=6).contains(&hotel.amenities.len()));
                    assert!(hotel.name.ends_with("Rome"));
                    assert!(hotel.rating() <= 5.0);
                }
            }
        }
    }

    #[test]
    fn test_tier_ranges() {
        let query = StayQuery::from_args(&args("luxury")).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        for hotel in generate_hotels(&mut rng, &query) {
            assert!(hotel.rating_tenths >= 42);
            assert!((300..800).contains(&hotel.price_per_night));
        }

        let query = StayQuery::from_args(&args("budget")).unwrap();
        for hotel in generate_hotels(&mut rng, &query) {
            assert!((30..=45).contains(&hotel.rating_tenths));
            assert!((40..120).contains(&hotel.price_per_night));
        }
    }

    #[test]
    fn test_defaults_and_validation() {
        let query = StayQuery::from_args(&json!({
            "location": "Rome",
            "check_in": "2025-06-01",
            "check_out": "2025-06-02"
        }))
        .unwrap();
        assert_eq!(query.budget, BudgetRange::MidRange);
        assert_eq!(query.guests, 2);
        assert_eq!(query.rooms, 1);
        assert_eq!(query.nights(), 1);

        let backwards = json!({
            "location": "Rome",
            "check_in": "2025-06-05",
            "check_out": "2025-06-02"
        });
        assert!(StayQuery::from_args(&backwards).is_err());
        assert!(StayQuery::from_args(&args("glamping")).is_err());
    }

    #[tokio::test]
    async fn test_execute_renders_markdown() {
        let tool = HotelSearchTool::with_rng(StdRng::seed_from_u64(9));
        let text = tool.execute(args("mid-range")).await.unwrap();
        assert!(text.starts_with("🏨 **Hotel Search Results for Rome**"));
        assert!(text.contains("**Duration:** 3 nights"));
        assert!(text.contains("**Budget Range:** Mid-range"));
        assert!(text.contains("## 1. **"));
        assert!(text.contains("**Popular Booking Sites:**"));
    }
}
