// agent_tools/src/weather.rs

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::ToolError;
use crate::registry::Tool;

pub const WTTR_URL: &str = "https://wttr.in";

#[derive(Debug, Deserialize)]
pub struct WeatherArgs {
    #[serde(default)]
    pub city: String,
}

/// Current conditions for a city, via wttr.in's one-line format.
pub struct WeatherTool {
    client: Client,
    base_url: String,
    default_city: String,
}

impl WeatherTool {
    pub fn new(client: Client, default_city: &str) -> Self {
        Self {
            client,
            base_url: WTTR_URL.to_string(),
            default_city: default_city.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn resolve_city<'a>(&'a self, requested: &'a str) -> &'a str {
        let city = requested.trim();
        if city.is_empty() {
            &self.default_city
        } else {
            city
        }
    }

    fn request_url(&self, city: &str) -> Result<Url, ToolError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ToolError::NotConfigured(format!("bad weather endpoint: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ToolError::NotConfigured("weather endpoint cannot take a path".into()))?
            .pop_if_empty()
            .push(city);
        // `%C+%t`: condition text and temperature
        url.set_query(Some("format=%C+%t"));
        Ok(url)
    }
}

#[async_trait]
impl Tool for WeatherTool {
    type Args = WeatherArgs;

    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Returns the current weather conditions for a city."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "city": { "type": "string", "description": "City name, e.g. Paris" }
            },
            "required": ["city"]
        })
    }

    async fn call(&self, args: WeatherArgs) -> Result<String, ToolError> {
        let city = self.resolve_city(&args.city);
        let url = self.request_url(city)?;
        debug!("[WeatherTool] GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ToolError::FetchFailed(format!("error fetching weather data: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::UpstreamStatus {
                status: status.as_u16(),
                detail: format!("cannot fetch {} data", city),
            });
        }
        let conditions = response.text().await?;
        Ok(format!("Weather in {} is {}", city, conditions.trim()))
    }
}
