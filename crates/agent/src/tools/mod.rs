//! Travel toolkit
//!
//! The catalogue is closed: five tools, each described by a [`ToolSpec`].
//! Oracle tool calls are validated against their `ToolSpec` and turned into a
//! typed [`ToolInvocation`] before anything runs.

pub mod calendar;
pub mod dates;
pub mod flights;
pub mod hotels;

pub use calendar::CalendarEventArgs;
pub use flights::FlightOffer;
pub use hotels::HotelOffer;

use concierge_calendar::EventScheduler;
use concierge_provider::{object_schema, Tool, ToolCall};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::ToolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ToolName {
    SearchFlights,
    BookFlight,
    SearchHotels,
    BookHotel,
    CreateCalendarEvent,
}

impl ToolName {
    pub const ALL: [ToolName; 5] = [
        ToolName::SearchFlights,
        ToolName::BookFlight,
        ToolName::SearchHotels,
        ToolName::BookHotel,
        ToolName::CreateCalendarEvent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::SearchFlights => "search_flights",
            ToolName::BookFlight => "book_flight",
            ToolName::SearchHotels => "search_hotels",
            ToolName::BookHotel => "book_hotel",
            ToolName::CreateCalendarEvent => "create_calendar_event",
        }
    }

    /// Exact match only
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One string parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
}

impl ParamSpec {
    const fn required(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            required: true,
        }
    }

    const fn optional(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            required: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: ToolName,
    pub description: &'static str,
    pub params: Vec<ParamSpec>,
}

const TRAVEL_DATES_DESC: &str = "Travel dates in the format 'YYYY-MM-DD to YYYY-MM-DD'";

impl ToolSpec {
    pub fn for_tool(name: ToolName) -> Self {
        let (description, params) = match name {
            ToolName::SearchFlights => (
                "Looks up and returns available flights for a given destination and optional dates.",
                vec![
                    ParamSpec::required("destination", "City or airport to fly to"),
                    ParamSpec::optional("travel_dates", TRAVEL_DATES_DESC),
                ],
            ),
            ToolName::BookFlight => (
                "Books a flight using its ID and returns a confirmation.",
                vec![ParamSpec::required("flight_id", "ID of a flight returned by search_flights")],
            ),
            ToolName::SearchHotels => (
                "Looks up and returns available hotels for a given destination and optional dates.",
                vec![
                    ParamSpec::required("destination", "City to stay in"),
                    ParamSpec::optional("travel_dates", TRAVEL_DATES_DESC),
                ],
            ),
            ToolName::BookHotel => (
                "Books a hotel room using its ID and returns a confirmation.",
                vec![ParamSpec::required("hotel_id", "ID of a hotel returned by search_hotels")],
            ),
            ToolName::CreateCalendarEvent => (
                "Creates an event in the user's Google Calendar.",
                vec![
                    ParamSpec::required("title", "The title of the calendar event"),
                    ParamSpec::required(
                        "start_time",
                        "Start time in ISO format, e.g. '2024-07-01T08:00:00'",
                    ),
                    ParamSpec::required("end_time", "End time in ISO format"),
                    ParamSpec::required("description", "A description or notes for the event"),
                ],
            ),
        };

        Self {
            name,
            description,
            params,
        }
    }

    /// JSON schema advertised to the oracle
    pub fn schema(&self) -> Value {
        object_schema(
            self.params
                .iter()
                .map(|p| (p.name.to_string(), p.description.to_string(), p.required))
                .collect(),
        )
    }

    pub fn to_provider_tool(&self) -> Tool {
        Tool::new(self.name.as_str(), self.description, self.schema())
    }

    /// Check arguments against the declared parameters, returning the string fields
    pub fn validate(&self, args: &Value) -> Result<BTreeMap<String, String>, ToolError> {
        let invalid = |reason: String| ToolError::InvalidArguments {
            tool: self.name.to_string(),
            reason,
        };

        let object = args
            .as_object()
            .ok_or_else(|| invalid(format!("expected a JSON object, got {}", args)))?;

        let mut fields = BTreeMap::new();
        for (key, value) in object {
            if !self.params.iter().any(|p| p.name == key) {
                return Err(invalid(format!("unexpected field '{}'", key)));
            }
            match value {
                Value::String(s) => {
                    fields.insert(key.clone(), s.clone());
                }
                // optional fields may be sent as explicit null
                Value::Null => {}
                other => {
                    return Err(invalid(format!("field '{}' must be a string, got {}", key, other)))
                }
            }
        }

        for param in self.params.iter().filter(|p| p.required) {
            if !fields.contains_key(param.name) {
                return Err(invalid(format!("missing required field '{}'", param.name)));
            }
        }

        Ok(fields)
    }
}

/// A validated tool call
#[derive(Debug, Clone, PartialEq)]
pub enum ToolInvocation {
    SearchFlights {
        destination: String,
        travel_dates: Option<String>,
    },
    BookFlight {
        flight_id: String,
    },
    SearchHotels {
        destination: String,
        travel_dates: Option<String>,
    },
    BookHotel {
        hotel_id: String,
    },
    CreateCalendarEvent(CalendarEventArgs),
}

impl ToolInvocation {
    pub fn tool(&self) -> ToolName {
        match self {
            ToolInvocation::SearchFlights { .. } => ToolName::SearchFlights,
            ToolInvocation::BookFlight { .. } => ToolName::BookFlight,
            ToolInvocation::SearchHotels { .. } => ToolName::SearchHotels,
            ToolInvocation::BookHotel { .. } => ToolName::BookHotel,
            ToolInvocation::CreateCalendarEvent(_) => ToolName::CreateCalendarEvent,
        }
    }

    fn from_fields(name: ToolName, mut fields: BTreeMap<String, String>) -> Result<Self, ToolError> {
        // presence of required fields is checked by ToolSpec::validate
        let mut take = |key: &str| fields.remove(key).unwrap_or_default();

        Ok(match name {
            ToolName::SearchFlights => ToolInvocation::SearchFlights {
                destination: take("destination"),
                travel_dates: Some(take("travel_dates")).filter(|s| !s.is_empty()),
            },
            ToolName::BookFlight => ToolInvocation::BookFlight {
                flight_id: take("flight_id"),
            },
            ToolName::SearchHotels => ToolInvocation::SearchHotels {
                destination: take("destination"),
                travel_dates: Some(take("travel_dates")).filter(|s| !s.is_empty()),
            },
            ToolName::BookHotel => ToolInvocation::BookHotel {
                hotel_id: take("hotel_id"),
            },
            ToolName::CreateCalendarEvent => {
                ToolInvocation::CreateCalendarEvent(CalendarEventArgs::new(
                    take("title"),
                    take("start_time"),
                    take("end_time"),
                    take("description"),
                )?)
            }
        })
    }
}

/// Result of running a tool, as fed back to the oracle
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Data(Value),
    Error(String),
}

impl ToolOutput {
    pub fn is_error(&self) -> bool {
        matches!(self, ToolOutput::Error(_))
    }

    pub fn render(&self) -> String {
        match self {
            ToolOutput::Data(Value::String(s)) => s.clone(),
            ToolOutput::Data(value) => value.to_string(),
            ToolOutput::Error(message) => message.clone(),
        }
    }

    fn data<T: Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => ToolOutput::Data(value),
            Err(e) => ToolOutput::Error(format!("Error: failed to encode tool result: {}", e)),
        }
    }
}

impl fmt::Display for ToolOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Booking confirmation shared by flights and hotels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Confirmation {
    pub status: String,
    pub confirmation_id: String,
}

impl Confirmation {
    pub fn for_id(id: &str) -> Self {
        Self {
            status: "success".to_string(),
            confirmation_id: format!("CONF-{}-BKD", id),
        }
    }
}

/// Tool catalogue plus what the tools need to run
pub struct ToolRegistry {
    specs: HashMap<ToolName, ToolSpec>,
    scheduler: Arc<dyn EventScheduler>,
}

impl ToolRegistry {
    pub fn new(scheduler: Arc<dyn EventScheduler>) -> Self {
        let specs = ToolName::ALL
            .into_iter()
            .map(|name| (name, ToolSpec::for_tool(name)))
            .collect();
        Self { specs, scheduler }
    }

    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        ToolName::parse(name).and_then(|n| self.specs.get(&n))
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<&'static str> {
        ToolName::ALL.iter().map(ToolName::as_str).collect()
    }

    /// Function definitions in catalogue order
    pub fn definitions(&self) -> Vec<Tool> {
        ToolName::ALL
            .iter()
            .filter_map(|name| self.specs.get(name))
            .map(ToolSpec::to_provider_tool)
            .collect()
    }

    pub fn validate(&self, call: &ToolCall) -> Result<ToolInvocation, ToolError> {
        let spec = self
            .get(&call.name)
            .ok_or_else(|| ToolError::UnknownTool(call.name.clone()))?;
        let fields = spec.validate(&call.arguments)?;
        ToolInvocation::from_fields(spec.name, fields)
    }

    /// Validate and run a call. Never fails; problems become [`ToolOutput::Error`].
    pub async fn execute(&self, call: &ToolCall) -> ToolOutput {
        match self.validate(call) {
            Ok(invocation) => self.invoke(invocation).await,
            Err(e) => {
                warn!("◆ rejected tool call {}: {}", call.name, e);
                let hint = match e {
                    ToolError::UnknownTool(_) => {
                        format!(" Available tools: {}.", self.names().join(", "))
                    }
                    ToolError::InvalidArguments { .. } => String::new(),
                };
                ToolOutput::Error(format!("Error: {}.{}", e, hint))
            }
        }
    }

    pub async fn invoke(&self, invocation: ToolInvocation) -> ToolOutput {
        info!("◆ running tool {}", invocation.tool());
        debug!("◆ invocation: {:?}", invocation);

        match invocation {
            ToolInvocation::SearchFlights {
                destination,
                travel_dates,
            } => ToolOutput::data(&flights::search_flights(
                &destination,
                travel_dates.as_deref(),
            )),
            ToolInvocation::BookFlight { flight_id } => {
                ToolOutput::data(&flights::book_flight(&flight_id))
            }
            ToolInvocation::SearchHotels {
                destination,
                travel_dates,
            } => ToolOutput::data(&hotels::search_hotels(
                &destination,
                travel_dates.as_deref(),
            )),
            ToolInvocation::BookHotel { hotel_id } => {
                ToolOutput::data(&hotels::book_hotel(&hotel_id))
            }
            ToolInvocation::CreateCalendarEvent(args) => {
                calendar::create_calendar_event(self.scheduler.as_ref(), args).await
            }
        }
    }
}
