// NASA NeoWs API Client
// Fetches the Near-Earth Object feed and validates it into typed summaries

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;

use crate::error::{NeoError, NeoResult};

pub const NEOWS_BASE_URL: &str = "https://api.nasa.gov/neo/rest/v1";

/// Mean Earth-Moon distance (km)
pub const LUNAR_DISTANCE_KM: f64 = 384_400.0;

/// Longest date range the feed endpoint accepts (days)
pub const MAX_FEED_SPAN_DAYS: i64 = 7;

// =============================================================================
// API RESPONSE TYPES (loosely typed, as served)
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct FeedResponse {
    pub element_count: Option<i64>,
    /// Objects stay untyped until validated one by one
    pub near_earth_objects: Option<BTreeMap<String, Vec<serde_json::Value>>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NeoObject {
    pub id: String,
    pub name: String,
    pub absolute_magnitude_h: Option<f64>,
    pub estimated_diameter: Option<EstimatedDiameter>,
    pub is_potentially_hazardous_asteroid: Option<bool>,
    pub close_approach_data: Option<Vec<CloseApproachData>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EstimatedDiameter {
    pub meters: Option<DiameterRange>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiameterRange {
    pub estimated_diameter_min: f64,
    pub estimated_diameter_max: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CloseApproachData {
    pub close_approach_date: Option<String>,
    pub relative_velocity: Option<RelativeVelocity>,
    pub miss_distance: Option<MissDistance>,
    pub orbiting_body: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelativeVelocity {
    pub kilometers_per_second: Option<String>,
    pub kilometers_per_hour: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MissDistance {
    pub kilometers: Option<String>,
}

// =============================================================================
// VALIDATED NEO DATA
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearEarthObjectSummary {
    pub id: String,
    pub name: String,
    pub absolute_magnitude_h: f64,
    pub diameter_min_m: f64,
    pub diameter_max_m: f64,
    pub is_potentially_hazardous: bool,
    /// Non-empty when produced by `parse_feed`; deserialized values may
    /// carry none
    pub close_approaches: Vec<CloseApproach>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloseApproach {
    pub date: NaiveDate,
    pub velocity_km_s: f64,
    pub velocity_km_h: Option<f64>,
    pub miss_distance_km: f64,
    pub orbiting_body: String,
}

impl CloseApproach {
    pub fn miss_distance_lunar(&self) -> f64 {
        self.miss_distance_km / LUNAR_DISTANCE_KM
    }
}

impl NearEarthObjectSummary {
    pub fn average_diameter_m(&self) -> f64 {
        (self.diameter_min_m + self.diameter_max_m) / 2.0
    }

    /// The approach listed first by the feed
    pub fn primary_approach(&self) -> Option<&CloseApproach> {
        self.close_approaches.first()
    }
}

fn parse_number(field: &str, value: Option<&String>) -> NeoResult<f64> {
    let raw = value.ok_or_else(|| NeoError::Parse(format!("missing {}", field)))?;
    let parsed: f64 = raw
        .trim()
        .parse()
        .map_err(|_| NeoError::Parse(format!("{} is not a number: {:?}", field, raw)))?;
    if !parsed.is_finite() || parsed < 0.0 {
        return Err(NeoError::Parse(format!("{} out of range: {}", field, parsed)));
    }
    Ok(parsed)
}

impl CloseApproachData {
    fn to_validated(&self) -> NeoResult<CloseApproach> {
        let date_str = self
            .close_approach_date
            .as_deref()
            .ok_or_else(|| NeoError::Parse("missing close_approach_date".to_string()))?;
        let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .map_err(|e| NeoError::Parse(format!("bad close_approach_date {:?}: {}", date_str, e)))?;

        let velocity = self.relative_velocity.as_ref();
        let velocity_km_s = parse_number(
            "kilometers_per_second",
            velocity.and_then(|v| v.kilometers_per_second.as_ref()),
        )?;
        let velocity_km_h = velocity
            .and_then(|v| v.kilometers_per_hour.as_ref())
            .and_then(|s| s.trim().parse::<f64>().ok());

        let miss_distance_km = parse_number(
            "miss_distance.kilometers",
            self.miss_distance.as_ref().and_then(|m| m.kilometers.as_ref()),
        )?;

        Ok(CloseApproach {
            date,
            velocity_km_s,
            velocity_km_h,
            miss_distance_km,
            orbiting_body: self
                .orbiting_body
                .clone()
                .unwrap_or_else(|| "Earth".to_string()),
        })
    }
}

impl NeoObject {
    /// Convert a feed entry into a summary, rejecting anything the
    /// presentation layer could not display.
    pub fn to_summary(&self) -> NeoResult<NearEarthObjectSummary> {
        let absolute_magnitude_h = self
            .absolute_magnitude_h
            .filter(|h| h.is_finite())
            .ok_or_else(|| NeoError::Parse(format!("{}: missing absolute magnitude", self.id)))?;

        let diameter = self
            .estimated_diameter
            .as_ref()
            .and_then(|d| d.meters.as_ref())
            .ok_or_else(|| NeoError::Parse(format!("{}: missing diameter in meters", self.id)))?;
        if !(diameter.estimated_diameter_min > 0.0
            && diameter.estimated_diameter_max >= diameter.estimated_diameter_min)
        {
            return Err(NeoError::Parse(format!(
                "{}: inconsistent diameter range {}..{}",
                self.id, diameter.estimated_diameter_min, diameter.estimated_diameter_max
            )));
        }

        let close_approaches = self
            .close_approach_data
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(CloseApproachData::to_validated)
            .collect::<NeoResult<Vec<_>>>()
            .map_err(|e| NeoError::Parse(format!("{}: {}", self.id, e)))?;
        if close_approaches.is_empty() {
            return Err(NeoError::Parse(format!("{}: no close approaches", self.id)));
        }

        Ok(NearEarthObjectSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            absolute_magnitude_h,
            diameter_min_m: diameter.estimated_diameter_min,
            diameter_max_m: diameter.estimated_diameter_max,
            is_potentially_hazardous: self.is_potentially_hazardous_asteroid.unwrap_or(false),
            close_approaches,
        })
    }
}

/// Validate a feed body. The body as a whole must have the feed shape;
/// individual objects that fail validation are dropped with a warning.
pub fn parse_feed(body: &str) -> NeoResult<Vec<NearEarthObjectSummary>> {
    let data: FeedResponse = serde_json::from_str(body)?;
    let neo_map = data
        .near_earth_objects
        .ok_or_else(|| NeoError::Parse("response has no near_earth_objects".to_string()))?;

    let mut asteroids = Vec::new();
    let mut skipped = 0usize;
    for (date, neos) in neo_map {
        for value in neos {
            let summary = serde_json::from_value::<NeoObject>(value)
                .map_err(NeoError::from)
                .and_then(|neo| neo.to_summary());
            match summary {
                Ok(summary) => asteroids.push(summary),
                Err(e) => {
                    skipped += 1;
                    tracing::warn!("Skipping malformed NEO on {}: {}", date, e);
                }
            }
        }
    }

    if let Some(count) = data.element_count {
        tracing::debug!(
            "Feed declared {} objects, accepted {}, skipped {}",
            count,
            asteroids.len(),
            skipped
        );
    }

    Ok(asteroids)
}

// =============================================================================
// TRACKER STATISTICS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub struct TrackerStats {
    pub tracked: usize,
    pub hazardous: usize,
}

impl TrackerStats {
    pub fn from_summaries(asteroids: &[NearEarthObjectSummary]) -> Self {
        Self {
            tracked: asteroids.len(),
            hazardous: asteroids
                .iter()
                .filter(|a| a.is_potentially_hazardous)
                .count(),
        }
    }
}

// =============================================================================
// API CLIENT
// =============================================================================

/// Anything that can produce today's NEO list
pub trait NeoFeedSource: Send + Sync + 'static {
    fn fetch_today(&self) -> impl Future<Output = NeoResult<Vec<NearEarthObjectSummary>>> + Send;
}

pub struct NeoWsClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl NeoWsClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, NEOWS_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn feed_url(&self) -> String {
        format!("{}/feed", self.base_url)
    }

    /// Fetch NEOs that approach Earth in a date range (inclusive)
    pub async fn fetch_feed(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> NeoResult<Vec<NearEarthObjectSummary>> {
        validate_range(start_date, end_date)?;

        let start = start_date.format("%Y-%m-%d").to_string();
        let end = end_date.format("%Y-%m-%d").to_string();
        tracing::debug!("Requesting NEO feed {}..{}", start, end);

        let response = self
            .client
            .get(self.feed_url())
            .query(&[
                ("start_date", start.as_str()),
                ("end_date", end.as_str()),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NeoError::Network(format!(
                "API returned status: {}",
                response.status()
            )));
        }

        let body = response.text().await?;

        let asteroids = parse_feed(&body)?;
        tracing::info!("Fetched {} near-Earth objects", asteroids.len());
        Ok(asteroids)
    }
}

impl NeoFeedSource for NeoWsClient {
    async fn fetch_today(&self) -> NeoResult<Vec<NearEarthObjectSummary>> {
        let today = feed_day(&Utc::now());
        self.fetch_feed(today, today).await
    }
}

/// Calendar day the feed is keyed by. NeoWs dates are UTC days, so a
/// local clock just before midnight west of Greenwich already asks for
/// tomorrow.
pub fn feed_day<Tz: TimeZone>(now: &DateTime<Tz>) -> NaiveDate {
    now.with_timezone(&Utc).date_naive()
}

pub fn validate_range(start_date: NaiveDate, end_date: NaiveDate) -> NeoResult<()> {
    let span = (end_date - start_date).num_days();
    if span < 0 {
        return Err(NeoError::Validation(format!(
            "end date {} is before start date {}",
            end_date, start_date
        )));
    }
    if span > MAX_FEED_SPAN_DAYS {
        return Err(NeoError::Validation(format!(
            "feed range is limited to {} days, got {}",
            MAX_FEED_SPAN_DAYS, span
        )));
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
