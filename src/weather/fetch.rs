use crate::weather::error::WeatherError;
use chrono::{DateTime, Utc};
use log::info;
use quick_xml::events::Event;
use quick_xml::Reader as XmlReader;
use std::collections::BTreeMap;
use std::future::Future;

/// Stored query returning simple weather observations for Finnish cities.
const STORED_QUERY_ID: &str = "fmi::observations::weather::cities::simple";

/// Helsinki Kaisaniemi, the one station the dataset is built against.
const HELSINKI_POS: &str = "60.17523 24.94459";

/// Temperature, 10-minute wind speed, sea-level pressure, 1-hour rainfall.
const TARGET_PARAMETERS: [&str; 4] = ["T", "WS_10MIN", "P_SEA", "R_1H"];

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// One weather observation at one timestamp.
///
/// `rain_1h` is `None` when the service reported NaN; FMI records 1-hour
/// rainfall only on the hour, so off-hour observations arrive without it.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherObservation {
    pub time: DateTime<Utc>,
    pub temperature: f64,
    pub wind_speed: f64,
    pub pressure_sea: f64,
    pub rain_1h: Option<f64>,
}

/// Source of weather observations for a time range. The production
/// implementation talks to FMI's WFS endpoint; tests substitute an in-memory
/// fake.
#[allow(async_fn_in_trait)]
pub trait WfsClient {
    /// Fetches observations with `start <= time <= stop`, ascending in time.
    fn fetch_range(
        &self,
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<WeatherObservation>, WeatherError>> + Send;
}

/// Client for FMI's open data WFS service.
///
/// Constructed with an optional API key; a missing key surfaces as a fetch
/// error rather than a construction error, so a pipeline can be built and
/// fail only when enrichment is actually attempted.
pub struct FmiClient {
    http: reqwest::Client,
    api_key: Option<String>,
}

impl FmiClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
        }
    }
}

impl WfsClient for FmiClient {
    async fn fetch_range(
        &self,
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
    ) -> Result<Vec<WeatherObservation>, WeatherError> {
        let api_key = self.api_key.as_deref().ok_or(WeatherError::MissingApiKey)?;
        let url = format!("http://data.fmi.fi/fmi-apikey/{api_key}/wfs");
        let response = self
            .http
            .get(&url)
            .query(&[
                ("request", "getFeature"),
                ("storedquery_id", STORED_QUERY_ID),
                ("starttime", &start.format(TIME_FORMAT).to_string()),
                ("endtime", &stop.format(TIME_FORMAT).to_string()),
            ])
            .send()
            .await
            .map_err(WeatherError::Request)?;
        let response = response.error_for_status().map_err(|e| {
            if let Some(status) = e.status() {
                WeatherError::HttpStatus { status, source: e }
            } else {
                WeatherError::Request(e)
            }
        })?;
        let body = response.text().await.map_err(WeatherError::Request)?;
        let observations = parse_feature_collection(&body)?;
        info!(
            "fetched {} weather observations for {} - {}",
            observations.len(),
            start,
            stop
        );
        Ok(observations)
    }
}

/// Accumulates the four target parameters for one timestamp.
#[derive(Debug, Default, Clone, Copy)]
struct PartialObservation {
    temperature: Option<f64>,
    wind_speed: Option<f64>,
    pressure_sea: Option<f64>,
    rain_1h: Option<f64>,
}

impl PartialObservation {
    fn set(&mut self, parameter: &str, value: f64) {
        let slot = match parameter {
            "T" => &mut self.temperature,
            "WS_10MIN" => &mut self.wind_speed,
            "P_SEA" => &mut self.pressure_sea,
            "R_1H" => &mut self.rain_1h,
            _ => return,
        };
        // First value wins; repeated features for a timestamp are ignored.
        if slot.is_none() {
            *slot = Some(value);
        }
    }

    fn complete(&self, time: DateTime<Utc>) -> Option<WeatherObservation> {
        Some(WeatherObservation {
            time,
            temperature: self.temperature?,
            wind_speed: self.wind_speed?,
            pressure_sea: self.pressure_sea?,
            // NaN is the service's way of saying "not measured right now".
            rain_1h: self.rain_1h.filter(|v| !v.is_nan()),
        })
    }
}

/// Parses a WFS feature collection into observations at the target
/// coordinate.
///
/// Each `BsWfsElement` carries one (position, time, parameter, value) tuple;
/// tuples are grouped by timestamp, and a timestamp only produces an
/// observation once all four target parameters have been seen for it.
/// Features at other coordinates and with other parameter names are skipped.
pub(crate) fn parse_feature_collection(
    xml: &str,
) -> Result<Vec<WeatherObservation>, WeatherError> {
    #[derive(PartialEq)]
    enum Field {
        Pos,
        Time,
        ParameterName,
        ParameterValue,
    }

    let mut reader = XmlReader::from_str(xml);
    reader.trim_text(true);

    let mut partials: BTreeMap<DateTime<Utc>, PartialObservation> = BTreeMap::new();
    let mut field: Option<Field> = None;
    let mut pos = String::new();
    let mut time = String::new();
    let mut parameter = String::new();
    let mut value = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                field = match e.local_name().as_ref() {
                    b"BsWfsElement" => {
                        pos.clear();
                        time.clear();
                        parameter.clear();
                        value.clear();
                        None
                    }
                    b"pos" => Some(Field::Pos),
                    b"Time" => Some(Field::Time),
                    b"ParameterName" => Some(Field::ParameterName),
                    b"ParameterValue" => Some(Field::ParameterValue),
                    _ => None,
                };
            }
            Event::Text(t) => {
                if let Some(field) = &field {
                    let text = t.unescape()?.into_owned();
                    match field {
                        Field::Pos => pos = text,
                        Field::Time => time = text,
                        Field::ParameterName => parameter = text,
                        Field::ParameterValue => value = text,
                    }
                }
            }
            Event::End(e) => {
                if e.local_name().as_ref() == b"BsWfsElement"
                    && pos.trim() == HELSINKI_POS
                    && TARGET_PARAMETERS.contains(&parameter.as_str())
                {
                    let stamp = DateTime::parse_from_rfc3339(&time)
                        .map_err(|e| {
                            WeatherError::MalformedFeature(format!("bad time '{time}': {e}"))
                        })?
                        .with_timezone(&Utc);
                    let parsed: f64 = value.parse().map_err(|e| {
                        WeatherError::MalformedFeature(format!("bad value '{value}': {e}"))
                    })?;
                    partials.entry(stamp).or_default().set(&parameter, parsed);
                }
                field = None;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(partials
        .into_iter()
        .filter_map(|(time, partial)| partial.complete(time))
        .collect())
}
