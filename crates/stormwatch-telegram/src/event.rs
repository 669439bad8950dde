//! Inbound conversation events and their button payloads.

use stormwatch_models::Sector;

use crate::session::ViewState;

const SECTOR_PREFIX: &str = "sector:";
const POINT_PREFIX: &str = "point:";

/// One user action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// `/start` command.
    Start,
    /// `/cancel` command.
    Cancel,
    SelectSector(Sector),
    SelectPoint(String),
    RequestTomorrow,
    RequestAlerts,
    CheckThunder,
    BackToPoints,
    BackToWeather,
    BackToMain,
}

impl Event {
    /// Decode a button payload. Unknown payloads yield `None`.
    pub fn from_payload(payload: &str) -> Option<Self> {
        if let Some(sector) = payload.strip_prefix(SECTOR_PREFIX) {
            return sector.parse().ok().map(Event::SelectSector);
        }
        if let Some(point) = payload.strip_prefix(POINT_PREFIX) {
            return (!point.is_empty()).then(|| Event::SelectPoint(point.to_string()));
        }

        match payload {
            "tomorrow_forecast" => Some(Event::RequestTomorrow),
            "weather_alerts" => Some(Event::RequestAlerts),
            "check_thunder" => Some(Event::CheckThunder),
            "back_to_points" => Some(Event::BackToPoints),
            "back_to_weather" => Some(Event::BackToWeather),
            "back_to_main" => Some(Event::BackToMain),
            _ => None,
        }
    }

    /// Button payload for this event. Commands have none.
    pub fn payload(&self) -> Option<String> {
        let payload = match self {
            Event::Start | Event::Cancel => return None,
            Event::SelectSector(sector) => format!("{SECTOR_PREFIX}{}", sector.as_str()),
            Event::SelectPoint(name) => format!("{POINT_PREFIX}{name}"),
            Event::RequestTomorrow => "tomorrow_forecast".to_string(),
            Event::RequestAlerts => "weather_alerts".to_string(),
            Event::CheckThunder => "check_thunder".to_string(),
            Event::BackToPoints => "back_to_points".to_string(),
            Event::BackToWeather => "back_to_weather".to_string(),
            Event::BackToMain => "back_to_main".to_string(),
        };
        Some(payload)
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Event::Start => "start",
            Event::Cancel => "cancel",
            Event::SelectSector(_) => "select_sector",
            Event::SelectPoint(_) => "select_point",
            Event::RequestTomorrow => "request_tomorrow",
            Event::RequestAlerts => "request_alerts",
            Event::CheckThunder => "check_thunder",
            Event::BackToPoints => "back_to_points",
            Event::BackToWeather => "back_to_weather",
            Event::BackToMain => "back_to_main",
        }
    }

    /// Whether the event is valid in `state` (`None`: no conversation).
    pub fn is_accepted_in(&self, state: Option<ViewState>) -> bool {
        match self {
            Event::Start | Event::Cancel | Event::BackToMain => true,
            Event::SelectSector(_) | Event::CheckThunder => {
                state == Some(ViewState::SelectingSector)
            }
            Event::SelectPoint(_) => state == Some(ViewState::SelectingPoint),
            Event::RequestTomorrow | Event::RequestAlerts => {
                state == Some(ViewState::ShowingWeather)
            }
            Event::BackToPoints | Event::BackToWeather => {
                state.is_some_and(|s| s.is_weather_view())
            }
        }
    }
}
