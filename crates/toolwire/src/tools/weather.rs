use std::sync::Arc;

use reqwest::{Client, StatusCode};
use serde_json::Value;
use toolwire_core::tool::{
    Error as ToolError, SingleInput, Tool, ToolResult,
};

use super::{join_url, plain, request_failed};
use crate::config::WeatherSettings;

/// Fetches the current weather of a city from OpenWeatherMap.
pub struct WeatherTool {
    client: Client,
    settings: Arc<WeatherSettings>,
    parameter_schema: Value,
}

impl WeatherTool {
    /// Creates the tool.
    #[inline]
    pub fn new(client: Client, settings: WeatherSettings) -> Self {
        Self {
            client,
            settings: Arc::new(settings),
            parameter_schema: SingleInput::parameter_schema(
                "Name of the city, e.g. London.",
            ),
        }
    }
}

impl Tool for WeatherTool {
    type Input = SingleInput;

    fn name(&self) -> &str {
        "WeatherAPI"
    }

    fn description(&self) -> &str {
        "Fetches current weather for a given city using OpenWeatherMap"
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: SingleInput,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let client = self.client.clone();
        let settings = Arc::clone(&self.settings);
        async move { fetch_weather(&client, &settings, input.0.trim()).await }
    }
}

/// Fetches and formats the weather summary of `city`.
///
/// A non-200 answer is not an error: the body is returned as text so the
/// model can relay it.
pub async fn fetch_weather(
    client: &Client,
    settings: &WeatherSettings,
    city: &str,
) -> ToolResult {
    let resp = client
        .get(join_url(&settings.base_url, "/data/2.5/weather"))
        .query(&[
            ("q", city),
            ("appid", settings.api_key.as_str()),
            ("units", "metric"),
        ])
        .send()
        .await
        .map_err(request_failed)?;

    if resp.status() != StatusCode::OK {
        let body = resp.text().await.unwrap_or_default();
        debug!("weather lookup for {city} failed: {body}");
        return Ok(format!("Failed to retrieve weather data: {body}"));
    }

    let data: Value = resp.json().await.map_err(request_failed)?;
    format_weather(city, &data)
}

fn format_weather(city: &str, data: &Value) -> ToolResult {
    let field = |pointer: &str| {
        data.pointer(pointer)
            .filter(|v| !v.is_null())
            .map(plain)
            .ok_or_else(|| {
                ToolError::execution_error()
                    .with_reason(format!("weather data has no {pointer}"))
            })
    };

    Ok(format!(
        "Weather in {}\n\
         - Condition: {} ({})\n\
         - Temperature: {}°C (Feels like {}°C)\n\
         - Humidity: {}%\n\
         - Wind Speed: {} m/s",
        title_case(city),
        field("/weather/0/main")?,
        field("/weather/0/description")?,
        field("/main/temp")?,
        field("/main/feels_like")?,
        field("/main/humidity")?,
        field("/wind/speed")?,
    ))
}

/// Upper-cases the first letter of every word and lower-cases the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn settings(server: &MockServer) -> WeatherSettings {
        WeatherSettings {
            api_key: "weather-key".to_owned(),
            base_url: server.uri(),
        }
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("new york"), "New York");
        assert_eq!(title_case("sAN fRANCISCO"), "San Francisco");
        assert_eq!(title_case("st. john's"), "St. John'S");
    }

    #[tokio::test]
    async fn test_formats_summary() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("q", "paris"))
            .and(query_param("appid", "weather-key"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "weather": [{
                    "main": "Clouds",
                    "description": "broken clouds"
                }],
                "main": { "temp": 18.4, "feels_like": 17.9, "humidity": 72 },
                "wind": { "speed": 4.12 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let summary = fetch_weather(&Client::new(), &settings(&server), "paris")
            .await
            .unwrap();
        assert_eq!(
            summary,
            "Weather in Paris\n\
             - Condition: Clouds (broken clouds)\n\
             - Temperature: 18.4°C (Feels like 17.9°C)\n\
             - Humidity: 72%\n\
             - Wind Speed: 4.12 m/s"
        );
    }

    #[tokio::test]
    async fn test_non_200_is_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string(
                r#"{"cod":"404","message":"city not found"}"#,
            ))
            .mount(&server)
            .await;

        let result =
            fetch_weather(&Client::new(), &settings(&server), "Atlantis")
                .await
                .unwrap();
        assert!(result.starts_with("Failed to retrieve weather data"));
        assert!(result.contains("city not found"));
    }

    #[tokio::test]
    async fn test_missing_field_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "weather": [{ "main": "Rain", "description": "light rain" }]
            })))
            .mount(&server)
            .await;

        let tool = WeatherTool::new(Client::new(), settings(&server));
        let err = tool
            .execute(SingleInput("Oslo".to_owned()))
            .await
            .unwrap_err();
        assert!(err.reason().contains("/main/temp"));
    }
}
