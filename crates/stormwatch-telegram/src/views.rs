//! View composition: message text plus inline keyboard.
//!
//! Views are plain data so the state machine can be driven without Telegram.
//! Text is Telegram HTML; every value that comes from the provider or the
//! registry goes through [`html_escape`].

use std::fmt::Write as _;

use stormwatch_models::{AlertRecord, ForecastDay, ForecastDocument, Registry, Sector};

use crate::event::Event;
use crate::session::ThunderStatus;

/// Placeholder for a value the provider left out.
const MISSING: &str = "N/A";

/// Alerts shown inline in the weather view.
const WEATHER_VIEW_ALERTS: usize = 3;

pub const LOADING_WEATHER: &str = "⏳ Loading weather data...";
pub const LOADING_TOMORROW: &str = "⏳ Loading tomorrow's forecast...";
pub const LOADING_ALERTS: &str = "⏳ Checking for dangerous weather...";
pub const LOADING_THUNDER: &str = "⏳ Checking for thunderstorms...";

pub const POINT_NOT_FOUND: &str = "❌ Point not found";
pub const NO_POINT_SELECTED: &str = "❌ No point selected";
pub const WEATHER_UNAVAILABLE: &str = "⚠️ Weather data is unavailable right now";
pub const TOMORROW_UNAVAILABLE: &str = "⚠️ Tomorrow's forecast is unavailable";
pub const GENERIC_ERROR: &str = "⚠️ Something went wrong. Back to the main menu.";

const SECTOR_PROMPT: &str = "🏔️ Choose a sector to view the weather:";
const POINT_PROMPT: &str = "📍 Choose a point to view the weather:";

/// One inline button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub payload: String,
}

impl Button {
    pub fn new(label: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            payload: payload.into(),
        }
    }

    /// Button bound to an event's payload.
    ///
    /// Commands have no payload; they map to an empty one.
    fn for_event(label: impl Into<String>, event: Event) -> Self {
        Self::new(label, event.payload().unwrap_or_default())
    }
}

/// A rendered reply: HTML text and rows of buttons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub text: String,
    pub keyboard: Vec<Vec<Button>>,
}

impl View {
    pub fn new(text: impl Into<String>, keyboard: Vec<Vec<Button>>) -> Self {
        Self {
            text: text.into(),
            keyboard,
        }
    }

    /// A view with no buttons.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(text, Vec::new())
    }

    /// Every payload on the keyboard, row by row.
    pub fn payloads(&self) -> impl Iterator<Item = &str> {
        self.keyboard
            .iter()
            .flatten()
            .map(|button| button.payload.as_str())
    }
}

/// Escape HTML special characters for Telegram.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn number(value: Option<f64>) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| v.to_string())
}

fn text_or_missing(value: &str) -> String {
    if value.is_empty() {
        MISSING.to_string()
    } else {
        html_escape(value)
    }
}

// Keyboards

pub fn main_menu() -> Vec<Vec<Button>> {
    let mut rows: Vec<Vec<Button>> = Sector::ALL_SECTORS
        .iter()
        .map(|&sector| vec![Button::for_event(sector.label(), Event::SelectSector(sector))])
        .collect();
    rows.push(vec![Button::for_event("⚡ Check thunderstorms", Event::CheckThunder)]);
    rows
}

pub fn points_menu(registry: &Registry) -> Vec<Vec<Button>> {
    let mut rows: Vec<Vec<Button>> = registry
        .names()
        .map(|name| vec![Button::for_event(name, Event::SelectPoint(name.to_string()))])
        .collect();
    rows.push(vec![Button::for_event("⬅️ Back", Event::BackToMain)]);
    rows
}

pub fn weather_details() -> Vec<Vec<Button>> {
    vec![
        vec![Button::for_event("Tomorrow's forecast", Event::RequestTomorrow)],
        vec![Button::for_event("Dangerous weather", Event::RequestAlerts)],
        vec![Button::for_event("⬅️ Back to points", Event::BackToPoints)],
        vec![Button::for_event("🏠 Main menu", Event::BackToMain)],
    ]
}

pub fn back_to_weather() -> Vec<Vec<Button>> {
    vec![
        vec![Button::for_event("⬅️ Back to weather", Event::BackToWeather)],
        vec![Button::for_event("🏠 Main menu", Event::BackToMain)],
    ]
}

pub fn thunder_check() -> Vec<Vec<Button>> {
    vec![
        vec![Button::for_event("🔄 Refresh", Event::CheckThunder)],
        vec![Button::for_event("🏠 Main menu", Event::BackToMain)],
    ]
}

pub fn main_only() -> Vec<Vec<Button>> {
    vec![vec![Button::for_event("🏠 Main menu", Event::BackToMain)]]
}

// Views

pub fn sector_menu() -> View {
    View::new(SECTOR_PROMPT, main_menu())
}

pub fn points(registry: &Registry) -> View {
    View::new(POINT_PROMPT, points_menu(registry))
}

/// Intermediate notice shown while a fetch is in flight.
pub fn loading(text: &str) -> View {
    View::text(text)
}

/// Current conditions, today's summary and the first few alerts.
pub fn weather(point: &str, document: &ForecastDocument, alerts: &[AlertRecord]) -> View {
    let mut text = format!("🌤️ <b>Weather for {}</b>\n", html_escape(point));

    match &document.current {
        Some(current) => {
            let _ = writeln!(
                text,
                "• <b>Now:</b> {}°C, {}",
                number(current.temp_c),
                text_or_missing(&current.condition.text)
            );
            let _ = writeln!(text, "• <b>Feels like:</b> {}°C", number(current.feelslike_c));
            let _ = writeln!(
                text,
                "• <b>Wind:</b> {} km/h, {}",
                number(current.wind_kph),
                text_or_missing(current.wind_dir.as_deref().unwrap_or_default())
            );
            let _ = writeln!(text, "• <b>Humidity:</b> {}%", number(current.humidity));
            let _ = write!(text, "• <b>Precipitation:</b> {} mm", number(current.precip_mm));
        }
        None => text.push_str("• Current conditions are not reported"),
    }

    if let Some(today) = document.day(0).and_then(|day| day.day.as_ref()) {
        let _ = write!(
            text,
            "\n\n📅 <b>Today:</b>\n• Max: {}°C\n• Min: {}°C\n• Chance of rain: {}%\n• UV index: {}",
            number(today.maxtemp_c),
            number(today.mintemp_c),
            number(today.daily_chance_of_rain),
            number(today.uv)
        );
    }

    if !alerts.is_empty() {
        text.push_str("\n\n⚠️ <b>Thunderstorms expected!</b>");
        for alert in alerts.iter().take(WEATHER_VIEW_ALERTS) {
            let _ = write!(
                text,
                "\n▫️ {} - {} ({}%)",
                alert.time_label(),
                html_escape(&alert.condition),
                alert.chance_of_thunder
            );
        }
    }

    View::new(text, weather_details())
}

/// Summary of the second forecast day.
pub fn tomorrow(point: &str, day: &ForecastDay) -> View {
    let mut text = format!(
        "📅 <b>Tomorrow ({}) for {}</b>\n",
        text_or_missing(&day.date),
        html_escape(point)
    );

    match &day.day {
        Some(summary) => {
            let _ = write!(
                text,
                "• Max: {}°C\n• Min: {}°C\n• Average: {}°C\n• Precipitation: {} mm\n\
                 • Chance of rain: {}%\n• UV index: {}\n• Conditions: {}",
                number(summary.maxtemp_c),
                number(summary.mintemp_c),
                number(summary.avgtemp_c),
                number(summary.totalprecip_mm),
                number(summary.daily_chance_of_rain),
                number(summary.uv),
                text_or_missing(&summary.condition.text)
            );
        }
        None => text.push_str("• No daily summary reported"),
    }

    View::new(text, back_to_weather())
}

/// Full danger-window list.
///
/// A provider advisory is reported on its own line and never folded into
/// the hourly list.
pub fn alerts(point: &str, alerts: &[AlertRecord], severe_advisory: bool, window_hours: u32) -> View {
    let point = html_escape(point);
    let mut text = if alerts.is_empty() {
        format!("✅ No dangerous weather expected at {point} in the next {window_hours} hours")
    } else {
        let mut text = format!("⚡️ <b>Dangerous weather at {point}:</b>\n");
        for alert in alerts {
            let _ = write!(
                text,
                "\n▫️ {}: {}\n  - Thunder chance: {}%\n  - Precipitation: {} mm/h\n  - Wind: {} km/h\n",
                alert.time_label(),
                html_escape(&alert.condition),
                alert.chance_of_thunder,
                alert.precip_mm,
                alert.wind_kph
            );
        }
        text
    };

    if severe_advisory {
        text.push_str("\n\n🛑 The provider has issued a thunderstorm advisory for this area");
    }

    View::new(text, back_to_weather())
}

/// Result of the quick thunder check.
pub fn thunder_status(reference: &str, status: ThunderStatus) -> View {
    let status = match status {
        ThunderStatus::Detected => "⛈️ Thunderstorms detected!",
        ThunderStatus::Clear => "🌤️ No thunderstorms",
    };
    View::new(
        format!("Thunderstorm status ({}): {status}", html_escape(reference)),
        thunder_check(),
    )
}

pub fn thunder_failed(reference: &str) -> View {
    View::new(
        format!("Thunderstorm status ({}): ⚠️ check failed", html_escape(reference)),
        thunder_check(),
    )
}

/// Soft failure: a notice above the main menu.
pub fn notice_with_sector_menu(notice: &str) -> View {
    View::new(format!("{notice}\n\n{SECTOR_PROMPT}"), main_menu())
}

/// Soft failure inside a weather view.
pub fn weather_notice(notice: &str) -> View {
    View::new(notice, back_to_weather())
}

/// Reply to a button from a menu that is no longer current.
pub fn stale_menu() -> View {
    View::new("⌛ This menu is no longer active.", main_only())
}

pub fn cancelled() -> View {
    View::text("❌ Conversation cancelled")
}

pub fn help() -> View {
    View::text(
        "<b>Stormwatch</b>\n\n\
         /start - open the main menu\n\
         /cancel - end the conversation\n\
         /help - show this message",
    )
}

/// Channel broadcast for one location with alerts.
pub fn broadcast_text(point: &str, alerts: &[AlertRecord]) -> String {
    let mut text = format!("⚡️ <b>Thunderstorm warning: {}</b>", html_escape(point));
    for alert in alerts {
        let _ = write!(
            text,
            "\n▫️ {} - {} ({}%), {} mm/h, wind {} km/h",
            alert.time_label(),
            html_escape(&alert.condition),
            alert.chance_of_thunder,
            alert.precip_mm,
            alert.wind_kph
        );
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use stormwatch_models::Location;

    fn alert(hour: u32) -> AlertRecord {
        AlertRecord {
            time: NaiveDate::from_ymd_opt(2024, 6, 1)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap(),
            condition: "Thundery outbreaks possible".to_string(),
            chance_of_thunder: 80,
            precip_mm: 2.5,
            wind_kph: 20.0,
        }
    }

    fn document() -> ForecastDocument {
        serde_json::from_value(serde_json::json!({
            "current": {
                "temp_c": 21.5,
                "condition": {"text": "Sunny <hot>", "code": 1000},
                "wind_kph": 10.0
            },
            "forecast": {"forecastday": [
                {"date": "2024-06-01", "day": {"maxtemp_c": 25.0, "uv": 6.0}},
                {"date": "2024-06-02", "day": {
                    "maxtemp_c": 23.0,
                    "mintemp_c": 12.0,
                    "condition": {"text": "Rain"}
                }}
            ]}
        }))
        .unwrap()
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<b>&</b>"), "&lt;b&gt;&amp;&lt;/b&gt;");
        assert_eq!(html_escape("Minsk"), "Minsk");
    }

    #[test]
    fn test_main_menu_payloads() {
        let view = sector_menu();
        let payloads: Vec<_> = view.payloads().collect();
        assert_eq!(
            payloads,
            vec!["sector:central", "sector:east", "sector:all", "check_thunder"]
        );
    }

    #[test]
    fn test_points_menu_ends_with_back() {
        let registry = Registry::new(vec![
            Location::new("Minsk", "53.9,27.5"),
            Location::new("Borisov", "54.2,28.5"),
        ])
        .unwrap();
        let payloads: Vec<_> = points(&registry).payloads().map(str::to_string).collect();
        assert_eq!(payloads, vec!["point:Minsk", "point:Borisov", "back_to_main"]);
    }

    #[test]
    fn test_weather_view_fields_and_placeholders() {
        let view = weather("Minsk", &document(), &[]);
        assert!(view.text.contains("21.5°C, Sunny &lt;hot&gt;"));
        assert!(view.text.contains("<b>Feels like:</b> N/A°C"));
        assert!(view.text.contains("Max: 25°C"));
        assert!(!view.text.contains("Thunderstorms expected"));
        assert_eq!(view.keyboard, weather_details());
    }

    #[test]
    fn test_weather_view_caps_alerts() {
        let alerts: Vec<_> = (13..18).map(alert).collect();
        let view = weather("Minsk", &document(), &alerts);
        assert_eq!(view.text.matches("▫️").count(), 3);
        assert!(view.text.contains("13:00 01.06 - Thundery outbreaks possible (80%)"));
    }

    #[test]
    fn test_tomorrow_view() {
        let document = document();
        let view = tomorrow("Gomel", document.day(1).unwrap());
        assert!(view.text.contains("Tomorrow (2024-06-02) for Gomel"));
        assert!(view.text.contains("Average: N/A°C"));
        assert!(view.text.contains("Conditions: Rain"));
        assert_eq!(view.keyboard, back_to_weather());
    }

    #[test]
    fn test_alerts_view_keeps_signals_apart() {
        let view = alerts("Minsk", &[], true, 3);
        assert!(view.text.contains("No dangerous weather expected at Minsk in the next 3 hours"));
        assert!(view.text.contains("advisory"));

        let view = alerts("Minsk", &[alert(14)], false, 3);
        assert!(view.text.contains("Thunder chance: 80%"));
        assert!(!view.text.contains("advisory"));
    }

    #[test]
    fn test_thunder_views() {
        let view = thunder_status("Minsk", ThunderStatus::Detected);
        assert!(view.text.contains("Thunderstorms detected"));
        assert_eq!(view.keyboard, thunder_check());
        assert!(thunder_failed("Minsk").text.contains("check failed"));
    }

    #[test]
    fn test_broadcast_text() {
        let text = broadcast_text("Mogilev", &[alert(15), alert(16)]);
        assert!(text.starts_with("⚡️ <b>Thunderstorm warning: Mogilev</b>"));
        assert_eq!(text.lines().count(), 3);
    }
}
