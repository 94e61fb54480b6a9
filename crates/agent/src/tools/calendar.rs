//! Calendar event tool

use chrono::{DateTime, NaiveDateTime};
use concierge_calendar::{EventScheduler, NewEvent};
use serde_json::Value;
use tracing::{info, warn};

use super::ToolOutput;
use crate::ToolError;

/// Arguments of `create_calendar_event`, with both times checked
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEventArgs {
    pub title: String,
    pub start_time: String,
    pub end_time: String,
    pub description: String,
}

impl CalendarEventArgs {
    pub fn new(
        title: String,
        start_time: String,
        end_time: String,
        description: String,
    ) -> Result<Self, ToolError> {
        for (field, value) in [("start_time", &start_time), ("end_time", &end_time)] {
            if !is_iso_datetime(value) {
                return Err(ToolError::InvalidArguments {
                    tool: "create_calendar_event".to_string(),
                    reason: format!(
                        "{} must be an ISO-8601 date-time like 2024-07-01T08:00:00, got {:?}",
                        field, value
                    ),
                });
            }
        }

        Ok(Self {
            title,
            start_time,
            end_time,
            description,
        })
    }
}

impl From<CalendarEventArgs> for NewEvent {
    fn from(args: CalendarEventArgs) -> Self {
        NewEvent {
            title: args.title,
            description: args.description,
            start_time: args.start_time,
            end_time: args.end_time,
        }
    }
}

/// `YYYY-MM-DDTHH:MM:SS`, optionally with fractional seconds or an offset
pub fn is_iso_datetime(value: &str) -> bool {
    DateTime::parse_from_rfc3339(value).is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
}

/// Insert the event; failures come back as an error string, never a panic or `Err`
pub async fn create_calendar_event(
    scheduler: &dyn EventScheduler,
    args: CalendarEventArgs,
) -> ToolOutput {
    info!("◆ creating calendar event {:?}", args.title);

    match scheduler.create_event(args.into()).await {
        Ok(event) => {
            if let Some(link) = &event.html_link {
                info!("◆ event created: {}", link);
            }
            ToolOutput::Data(Value::String(format!(
                "Successfully created event with ID: {}",
                event.id
            )))
        }
        Err(e) => {
            warn!("◆ calendar event failed: {}", e);
            ToolOutput::Error(format!("Error creating event: {}", e))
        }
    }
}
