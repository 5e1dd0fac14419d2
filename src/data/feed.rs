//! Rate feeds: where observations come from
//!
//! The ECB publishes its reference rates as XML:
//!
//! ```xml
//! <gesmes:Envelope ...>
//!   <Cube>
//!     <Cube time="2024-01-02">
//!       <Cube currency="USD" rate="1.0956"/>
//!       ...
//! ```
//!
//! The daily document carries one dated cube, the 90-day document one per
//! business day. Parsing yields [`RawObservation`]s; normalization happens
//! in [`crate::observation`].

use crate::error::{FxError, Result};
use crate::observation::RawObservation;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

pub const ECB_DAILY_XML_URL: &str = "https://www.ecb.europa.eu/stats/eurofxref/eurofxref-daily.xml";
pub const ECB_90D_XML_URL: &str = "https://www.ecb.europa.eu/stats/eurofxref/eurofxref-hist-90d.xml";

/// Source of rate observations
pub trait RateFeed {
    /// Latest single-day snapshot
    fn fetch_daily(&self) -> Result<RawObservation>;

    /// Rolling window of recent days
    fn fetch_window(&self) -> Result<Vec<RawObservation>>;

    fn name(&self) -> &str;
}

/// Parse every dated cube in an ECB document.
///
/// Currency cubes that appear before any dated cube are collected into an
/// observation without a date, which normalization later rejects.
pub fn parse_ecb_xml(xml: &str) -> Result<Vec<RawObservation>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut observations: Vec<RawObservation> = Vec::new();
    let mut current: Option<usize> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() != b"Cube" {
                    continue;
                }
                let cube = read_cube(&e)?;
                if let Some(time) = cube.time {
                    observations.push(RawObservation {
                        date: Some(time),
                        rates: Vec::new(),
                    });
                    current = Some(observations.len() - 1);
                }
                if let (Some(currency), Some(rate)) = (cube.currency, cube.rate) {
                    let idx = match current {
                        Some(idx) => idx,
                        None => {
                            observations.push(RawObservation::default());
                            let idx = observations.len() - 1;
                            current = Some(idx);
                            idx
                        }
                    };
                    observations[idx].rates.push((currency, rate));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(FxError::Fetch(format!(
                    "malformed XML at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    Ok(observations)
}

/// Parse a daily document: the first dated cube
pub fn parse_ecb_daily(xml: &str) -> Result<RawObservation> {
    parse_ecb_xml(xml)?
        .into_iter()
        .find(|o| o.date.is_some())
        .ok_or_else(|| FxError::Fetch("no dated Cube element in daily document".to_string()))
}

#[derive(Default)]
struct Cube {
    time: Option<String>,
    currency: Option<String>,
    rate: Option<String>,
}

fn read_cube(e: &BytesStart<'_>) -> Result<Cube> {
    let mut cube = Cube::default();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| FxError::Fetch(format!("bad XML attribute: {}", e)))?;
        let value = attr
            .unescape_value()
            .map_err(|e| FxError::Fetch(format!("bad XML attribute value: {}", e)))?
            .into_owned();
        match attr.key.local_name().as_ref() {
            b"time" => cube.time = Some(value),
            b"currency" => cube.currency = Some(value),
            b"rate" => cube.rate = Some(value),
            _ => {}
        }
    }
    Ok(cube)
}

/// ECB reference-rate feed over HTTP
#[cfg(feature = "fetch")]
pub struct EcbFeed {
    client: reqwest::blocking::Client,
    daily_url: String,
    window_url: String,
}

#[cfg(feature = "fetch")]
impl EcbFeed {
    pub fn new(daily_url: impl Into<String>, window_url: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .user_agent(concat!("rusty-fxrates/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FxError::Fetch(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            daily_url: daily_url.into(),
            window_url: window_url.into(),
        })
    }

    fn get(&self, url: &str) -> Result<String> {
        log::info!("Fetching {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| FxError::Fetch(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(FxError::Fetch(format!(
                "{} returned {}",
                url,
                response.status()
            )));
        }

        response
            .text()
            .map_err(|e| FxError::Fetch(format!("Failed to read response: {}", e)))
    }
}

#[cfg(feature = "fetch")]
impl RateFeed for EcbFeed {
    fn fetch_daily(&self) -> Result<RawObservation> {
        parse_ecb_daily(&self.get(&self.daily_url)?)
    }

    fn fetch_window(&self) -> Result<Vec<RawObservation>> {
        let observations = parse_ecb_xml(&self.get(&self.window_url)?)?;
        log::info!("Fetched {} day(s)", observations.len());
        Ok(observations)
    }

    fn name(&self) -> &str {
        "ecb"
    }
}

/// Feed serving fixed observations, e.g. from a local XML file
#[derive(Debug, Clone, Default)]
pub struct StaticFeed {
    observations: Vec<RawObservation>,
}

impl StaticFeed {
    pub fn new(observations: Vec<RawObservation>) -> Self {
        Self { observations }
    }

    pub fn from_xml(xml: &str) -> Result<Self> {
        Ok(Self::new(parse_ecb_xml(xml)?))
    }
}

impl RateFeed for StaticFeed {
    /// The latest dated observation held
    fn fetch_daily(&self) -> Result<RawObservation> {
        self.observations
            .iter()
            .filter(|o| o.date.is_some())
            .max_by(|a, b| a.date.cmp(&b.date))
            .cloned()
            .ok_or_else(|| FxError::Fetch("no dated observation available".to_string()))
    }

    fn fetch_window(&self) -> Result<Vec<RawObservation>> {
        Ok(self.observations.clone())
    }

    fn name(&self) -> &str {
        "static"
    }
}
