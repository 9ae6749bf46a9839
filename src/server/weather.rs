//! `GET /api/weather`: current conditions from OpenWeatherMap.

use super::{AppError, AppState};
use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// Returned when no API key is configured.
const DEMO_TEMPERATURE: f64 = 20.5;
const DEMO_ICON: &str = "01d";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherResponse {
    /// Degrees Celsius.
    pub temperature: f64,
    /// OpenWeatherMap icon code, e.g. `01d`.
    pub icon: String,
}

#[derive(Deserialize)]
struct OwmResponse {
    main: OwmMain,
    weather: Vec<OwmWeather>,
}

#[derive(Deserialize)]
struct OwmMain {
    temp: f64,
}

#[derive(Deserialize)]
struct OwmWeather {
    icon: String,
}

#[instrument(level = "info", skip_all, fields(city = %state.weather.city))]
pub async fn handle_weather(State(state): State<AppState>) -> Result<Json<WeatherResponse>, AppError> {
    let Some(api_key) = state.weather_api_key.as_deref() else {
        debug!("No weather API key; returning demo data");
        return Ok(Json(WeatherResponse {
            temperature: DEMO_TEMPERATURE,
            icon: DEMO_ICON.to_string(),
        }));
    };

    let url = format!("{}/weather", state.weather.api_base.trim_end_matches('/'));
    let response = state
        .http
        .get(url)
        .query(&[("q", state.weather.city.as_str()), ("appid", api_key), ("units", "metric")])
        .send()
        .await
        .map_err(|e| AppError::internal(format!("Error fetching weather data: {e}")))?;

    if !response.status().is_success() {
        warn!(status = response.status().as_u16(), "Weather API call failed");
        return Err(AppError::internal("Failed to fetch weather data"));
    }

    let data: OwmResponse = response
        .json()
        .await
        .map_err(|e| AppError::internal(format!("Error fetching weather data: {e}")))?;
    let icon = data
        .weather
        .into_iter()
        .next()
        .map(|w| w.icon)
        .ok_or_else(|| AppError::internal("Error fetching weather data: no conditions reported"))?;

    Ok(Json(WeatherResponse {
        temperature: data.main.temp,
        icon,
    }))
}
