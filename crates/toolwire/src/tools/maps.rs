//! Google Maps tools: directions, travel time and geocoding.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use reqwest::Client;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use toolwire_core::tool::{
    Error as ToolError, SingleInput, Tool, ToolResult, parameter_schema_of,
};

use super::{join_url, request_failed};
use crate::config::MapsSettings;

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

/// How the route is travelled.
#[derive(Clone, Copy, Debug, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    /// By car.
    #[default]
    Driving,
    /// On foot.
    Walking,
    /// By bike.
    Bicycling,
    /// By public transport.
    Transit,
}

impl TravelMode {
    #[inline]
    fn as_str(self) -> &'static str {
        match self {
            Self::Driving => "driving",
            Self::Walking => "walking",
            Self::Bicycling => "bicycling",
            Self::Transit => "transit",
        }
    }
}

/// Input of the route based tools.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct RouteInput {
    /// Starting place, an address or a city name.
    pub origin: String,
    /// Destination place, an address or a city name.
    pub destination: String,
    /// Travel mode, defaults to driving.
    #[serde(default)]
    pub mode: TravelMode,
}

#[derive(Deserialize)]
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    routes: Vec<Route>,
}

#[derive(Deserialize)]
struct Route {
    #[serde(default)]
    legs: Vec<Leg>,
}

#[derive(Deserialize)]
struct Leg {
    #[serde(default)]
    steps: Vec<Step>,
    duration: Option<TextValue>,
    duration_in_traffic: Option<TextValue>,
}

#[derive(Deserialize)]
struct Step {
    html_instructions: String,
}

#[derive(Deserialize)]
struct TextValue {
    text: String,
}

#[derive(Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Deserialize)]
struct GeocodeResult {
    formatted_address: String,
    geometry: Geometry,
}

#[derive(Deserialize)]
struct Geometry {
    location: Location,
}

#[derive(Deserialize)]
struct Location {
    lat: f64,
    lng: f64,
}

#[derive(Clone)]
struct MapsApi {
    client: Client,
    settings: Arc<MapsSettings>,
}

impl MapsApi {
    async fn route(
        &self,
        input: &RouteInput,
        departure_now: bool,
    ) -> Result<Leg, String> {
        let mut query = vec![
            ("origin", input.origin.as_str()),
            ("destination", input.destination.as_str()),
            ("mode", input.mode.as_str()),
            ("key", self.settings.api_key.as_str()),
        ];
        if departure_now {
            query.push(("departure_time", "now"));
        }

        let resp = self
            .client
            .get(join_url(&self.settings.base_url, "/maps/api/directions/json"))
            .query(&query)
            .send()
            .await
            .map_err(|err| err.to_string())?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(format!("HTTP {}: {body}", status.as_u16()));
        }

        let data: DirectionsResponse =
            resp.json().await.map_err(|err| err.to_string())?;
        if data.status != "OK" {
            return Err(match data.error_message {
                Some(message) => format!("{}: {message}", data.status),
                None => data.status,
            });
        }
        data.routes
            .into_iter()
            .next()
            .and_then(|route| route.legs.into_iter().next())
            .ok_or_else(|| "no route found".to_owned())
    }
}

/// Strips HTML tags from a direction step and collapses the whitespace.
fn strip_tags(html: &str) -> String {
    HTML_TAG
        .replace_all(html, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

macro_rules! maps_tool {
    ($ty:ident, $schema:expr) => {
        impl $ty {
            /// Creates the tool.
            pub fn new(client: Client, settings: MapsSettings) -> Self {
                Self {
                    api: MapsApi {
                        client,
                        settings: Arc::new(settings),
                    },
                    parameter_schema: $schema,
                }
            }
        }
    };
}

/// Turn-by-turn directions between two places.
pub struct DirectionsTool {
    api: MapsApi,
    parameter_schema: Value,
}

maps_tool!(
    DirectionsTool,
    parameter_schema_of::<RouteInput>()
);

impl Tool for DirectionsTool {
    type Input = RouteInput;

    fn name(&self) -> &str {
        "directions_tool"
    }

    fn description(&self) -> &str {
        "Get directions between two places using Google Maps \
         (modes: driving, walking, bicycling, transit)."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: RouteInput,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let api = self.api.clone();
        async move {
            let leg = match api.route(&input, false).await {
                Ok(leg) => leg,
                Err(reason) => {
                    return Ok(format!("Error fetching directions: {reason}"));
                }
            };
            Ok(leg
                .steps
                .iter()
                .map(|step| strip_tags(&step.html_instructions))
                .collect::<Vec<_>>()
                .join("\n"))
        }
    }
}

/// Estimated travel time between two places, with current traffic.
pub struct TravelTimeTool {
    api: MapsApi,
    parameter_schema: Value,
}

maps_tool!(
    TravelTimeTool,
    parameter_schema_of::<RouteInput>()
);

impl Tool for TravelTimeTool {
    type Input = RouteInput;

    fn name(&self) -> &str {
        "get_travel_time"
    }

    fn description(&self) -> &str {
        "Get travel time between two places using Google Maps \
         (modes: driving, walking, bicycling, transit)."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: RouteInput,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let api = self.api.clone();
        async move {
            let leg = api.route(&input, true).await.map_err(|reason| {
                ToolError::execution_error().with_reason(format!(
                    "Error fetching travel time: {reason}"
                ))
            })?;
            let duration =
                leg.duration_in_traffic.or(leg.duration).ok_or_else(|| {
                    ToolError::execution_error()
                        .with_reason("The route has no duration.")
                })?;
            Ok(format!("Estimated travel time: {}", duration.text))
        }
    }
}

/// Geocodes an address.
pub struct CoordinatesTool {
    api: MapsApi,
    parameter_schema: Value,
}

maps_tool!(
    CoordinatesTool,
    SingleInput::parameter_schema("The address or place name.")
);

impl Tool for CoordinatesTool {
    type Input = SingleInput;

    fn name(&self) -> &str {
        "get_coordinates"
    }

    fn description(&self) -> &str {
        "Get latitude and longitude of an address using Google Maps."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: SingleInput,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let api = self.api.clone();
        async move {
            let address = input.0.trim();
            let resp = api
                .client
                .get(join_url(
                    &api.settings.base_url,
                    "/maps/api/geocode/json",
                ))
                .query(&[
                    ("address", address),
                    ("key", api.settings.api_key.as_str()),
                ])
                .send()
                .await
                .map_err(request_failed)?
                .error_for_status()
                .map_err(request_failed)?;

            let data: GeocodeResponse =
                resp.json().await.map_err(request_failed)?;
            if data.status != "OK" && data.status != "ZERO_RESULTS" {
                let message = data.error_message.unwrap_or(data.status);
                return Err(ToolError::execution_error()
                    .with_reason(format!("Geocoding failed: {message}")));
            }
            let Some(first) = data.results.into_iter().next() else {
                return Err(ToolError::execution_error()
                    .with_reason(format!("No results found for {address}")));
            };
            let location = first.geometry.location;
            Ok(format!(
                "{}: {}, {}",
                first.formatted_address, location.lat, location.lng
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn settings(server: &MockServer) -> MapsSettings {
        MapsSettings {
            api_key: "maps-key".to_owned(),
            base_url: server.uri(),
        }
    }

    fn route_input() -> RouteInput {
        serde_json::from_value(json!({
            "origin": "New York",
            "destination": "Boston"
        }))
        .unwrap()
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(
            strip_tags("Turn <b>left</b> onto <b>Main St</b><div>Toll</div>"),
            "Turn left onto Main St Toll"
        );
    }

    #[test]
    fn test_mode_defaults_to_driving() {
        let input = route_input();
        assert!(matches!(input.mode, TravelMode::Driving));
    }

    #[tokio::test]
    async fn test_directions_steps() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/maps/api/directions/json"))
            .and(query_param("origin", "New York"))
            .and(query_param("mode", "driving"))
            .and(query_param("key", "maps-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "routes": [{ "legs": [{ "steps": [
                    { "html_instructions": "Head <b>north</b>" },
                    { "html_instructions": "Merge onto <b>I-95 N</b>" }
                ]}]}]
            })))
            .mount(&server)
            .await;

        let tool = DirectionsTool::new(Client::new(), settings(&server));
        let result = tool.execute(route_input()).await.unwrap();
        assert_eq!(result, "Head north\nMerge onto I-95 N");
    }

    #[tokio::test]
    async fn test_directions_failure_is_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "REQUEST_DENIED",
                "error_message": "The provided API key is invalid."
            })))
            .mount(&server)
            .await;

        let tool = DirectionsTool::new(Client::new(), settings(&server));
        let result = tool.execute(route_input()).await.unwrap();
        assert_eq!(
            result,
            "Error fetching directions: REQUEST_DENIED: \
             The provided API key is invalid."
        );
    }

    #[tokio::test]
    async fn test_travel_time_prefers_traffic() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("departure_time", "now"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "routes": [{ "legs": [{
                    "steps": [],
                    "duration": { "text": "3 hours 40 mins" },
                    "duration_in_traffic": { "text": "4 hours 5 mins" }
                }]}]
            })))
            .mount(&server)
            .await;

        let tool = TravelTimeTool::new(Client::new(), settings(&server));
        let result = tool.execute(route_input()).await.unwrap();
        assert_eq!(result, "Estimated travel time: 4 hours 5 mins");
    }

    #[tokio::test]
    async fn test_coordinates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/maps/api/geocode/json"))
            .and(query_param("address", "Boston"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "results": [{
                    "formatted_address": "Boston, MA, USA",
                    "geometry": { "location": { "lat": 42.36, "lng": -71.06 } }
                }]
            })))
            .mount(&server)
            .await;

        let tool = CoordinatesTool::new(Client::new(), settings(&server));
        let result = tool
            .execute(SingleInput("Boston".to_owned()))
            .await
            .unwrap();
        assert_eq!(result, "Boston, MA, USA: 42.36, -71.06");
    }
}
