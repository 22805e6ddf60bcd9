// Dashboard - terminal presentation of tracker, impact report and orbit view

use parking_lot::RwLock;
use std::f64::consts::TAU;
use std::fmt::Write as _;
use std::io::Write;
use std::sync::Arc;

use crate::api_client::NearEarthObjectSummary;
use crate::error::{NeoError, NeoResult};
use crate::orbital_motion::{
    BodyPosition, DrawCommand, Rgba, Scene, ASTEROID_COLOR, ASTEROID_ORBIT_COLOR, DISPLAYED_ELEMENTS,
    EARTH_COLOR, EARTH_ORBIT_COLOR, SUN_COLOR, TRAIL_COLOR,
};
use crate::physics_engine::{
    recommend_strategies, DeflectionStrategy, ImpactParameters, ImpactResult, SizeCategory,
};
use crate::state_manager::{DrawingSurface, FeedStatus};

/// Cards listed under the tracker header
pub const MAX_CARDS: usize = 6;

pub const UNAVAILABLE_MESSAGE: &str = "Unable to load asteroid data";

// =============================================================================
// TRACKER
// =============================================================================

pub fn format_neo_card(neo: &NearEarthObjectSummary) -> String {
    let mut card = String::new();

    let _ = write!(card, "{}", neo.name);
    if neo.is_potentially_hazardous {
        card.push_str("  [HAZARDOUS]");
    }
    card.push('\n');
    match neo.primary_approach() {
        Some(approach) => {
            let _ = write!(
                card,
                "  Diameter {:.0}m | Velocity {:.1} km/s | Miss Distance {:.2} LD | Magnitude {:.1} H | Approach {}",
                neo.average_diameter_m(),
                approach.velocity_km_s,
                approach.miss_distance_lunar(),
                neo.absolute_magnitude_h,
                approach.date.format("%Y-%m-%d"),
            );
        }
        None => {
            let _ = write!(
                card,
                "  Diameter {:.0}m | Magnitude {:.1} H | Approach n/a",
                neo.average_diameter_m(),
                neo.absolute_magnitude_h,
            );
        }
    }
    card
}

pub fn format_tracker(status: &FeedStatus) -> String {
    let mut out = String::from("LIVE ASTEROID TRACKER\n");

    match status {
        FeedStatus::Loading => {
            out.push_str("Tracked Today: ... | Potentially Hazardous: ... | Monitoring Status: ACTIVE\n");
            out.push_str("Loading near-Earth objects...\n");
        }
        FeedStatus::Unavailable { .. } => {
            out.push_str(UNAVAILABLE_MESSAGE);
            out.push('\n');
        }
        FeedStatus::Ready {
            asteroids,
            fetched_at,
        } => {
            let stats = status.stats().unwrap_or_default();
            let _ = writeln!(
                out,
                "Tracked Today: {} | Potentially Hazardous: {} | Monitoring Status: ACTIVE",
                stats.tracked, stats.hazardous
            );
            let _ = writeln!(out, "Updated {}", fetched_at.format("%Y-%m-%d %H:%M:%S"));
            if asteroids.is_empty() {
                out.push_str("No near-Earth objects reported.\n");
            }
            for neo in asteroids.iter().take(MAX_CARDS) {
                out.push_str(&format_neo_card(neo));
                out.push('\n');
            }
        }
    }
    out
}

// =============================================================================
// IMPACT REPORT
// =============================================================================

pub fn format_impact_report(params: &ImpactParameters, result: &ImpactResult) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Asteroid Diameter {:.0}m | Impact Velocity {:.0} km/s | Impact Angle {:.0}°",
        params.diameter_m, params.velocity_km_s, params.impact_angle_deg
    );
    let _ = writeln!(out, "THREAT LEVEL: {}", result.threat_level);
    let _ = writeln!(out, "  Impact Energy    {:.2} MT", result.energy_megatons_tnt);
    let _ = writeln!(out, "  Crater Diameter  ~{:.0}m", result.crater_diameter_m);
    let _ = writeln!(out, "  Affected Radius  ~{:.1} km", result.affected_radius_km);

    let category = SizeCategory::from_diameter(params.diameter_m);
    let _ = writeln!(out, "{}: {}", category.title(), category.description());
    out
}

pub fn format_strategies(warning_years: Option<f64>) -> String {
    let strategies = match warning_years {
        Some(years) => recommend_strategies(years),
        None => DeflectionStrategy::ALL.to_vec(),
    };

    let mut out = String::from("PLANETARY DEFENSE STRATEGIES\n");
    if let Some(years) = warning_years {
        let _ = writeln!(out, "Warning time: {:.1} years", years);
    }
    for strategy in strategies {
        let _ = writeln!(out, "  [{}] {}", strategy.badge(), strategy.description());
    }
    out
}

pub fn format_orbital_elements() -> String {
    let mut out = String::from("ORBITAL ELEMENTS\n");
    for (label, value) in DISPLAYED_ELEMENTS {
        let _ = writeln!(out, "  {:<22}{}", label, value);
    }
    out
}

// =============================================================================
// ASCII DRAWING SURFACE
// =============================================================================

fn glyph_for(color: &Rgba) -> char {
    match *color {
        c if c == SUN_COLOR => '@',
        c if c == EARTH_COLOR => 'E',
        c if c == ASTEROID_COLOR => 'A',
        c if c == EARTH_ORBIT_COLOR => '.',
        c if c == ASTEROID_ORBIT_COLOR => ':',
        c if c == TRAIL_COLOR => '~',
        _ => '#',
    }
}

/// Character grid covering a canvas of `width` x `height` pixels
pub struct AsciiRaster {
    cols: usize,
    rows: usize,
    width: f64,
    height: f64,
    cells: Vec<char>,
}

impl AsciiRaster {
    pub fn new(cols: usize, rows: usize, width: f64, height: f64) -> NeoResult<Self> {
        if cols == 0 || rows == 0 || !(width > 0.0 && height > 0.0) {
            return Err(NeoError::Validation(format!(
                "raster needs a non-empty grid and canvas, got {}x{} over {}x{}",
                cols, rows, width, height
            )));
        }
        Ok(Self {
            cols,
            rows,
            width,
            height,
            cells: vec![' '; cols * rows],
        })
    }

    pub fn clear(&mut self) {
        self.cells.fill(' ');
    }

    fn cell_of(&self, p: &BodyPosition) -> Option<(usize, usize)> {
        let col = (p.x / self.width * self.cols as f64).floor();
        let row = (p.y / self.height * self.rows as f64).floor();
        if col < 0.0 || row < 0.0 || col >= self.cols as f64 || row >= self.rows as f64 {
            return None;
        }
        Some((col as usize, row as usize))
    }

    fn plot(&mut self, p: &BodyPosition, glyph: char) {
        if let Some((col, row)) = self.cell_of(p) {
            self.cells[row * self.cols + col] = glyph;
        }
    }

    /// Pixel size of one cell along its shorter side
    fn cell_pixels(&self) -> f64 {
        (self.width / self.cols as f64).min(self.height / self.rows as f64)
    }

    fn plot_curve<F>(&mut self, length: f64, glyph: char, point_at: F)
    where
        F: Fn(f64) -> BodyPosition,
    {
        let samples = ((length / self.cell_pixels()) * 2.0).ceil().max(8.0) as usize;
        for i in 0..samples {
            let p = point_at(i as f64 / samples as f64);
            self.plot(&p, glyph);
        }
    }

    /// Paths first, bodies on top so a glyph is never hidden by an orbit
    pub fn draw(&mut self, scene: &Scene) {
        let (bodies, paths): (Vec<&DrawCommand>, Vec<&DrawCommand>) = scene
            .commands
            .iter()
            .partition(|c| matches!(c, DrawCommand::Disc { .. }));
        for command in paths.into_iter().chain(bodies) {
            match command {
                DrawCommand::Disc {
                    center,
                    radius,
                    color,
                    ..
                } => {
                    let glyph = glyph_for(color);
                    let step = self.cell_pixels() / 2.0;
                    let mut dy = -radius;
                    while dy <= *radius {
                        let mut dx = -radius;
                        while dx <= *radius {
                            if dx * dx + dy * dy <= radius * radius {
                                self.plot(&BodyPosition::new(center.x + dx, center.y + dy), glyph);
                            }
                            dx += step;
                        }
                        dy += step;
                    }
                    self.plot(center, glyph);
                }
                DrawCommand::Ring {
                    center,
                    radius,
                    color,
                    ..
                } => {
                    let (c, r) = (*center, *radius);
                    self.plot_curve(TAU * r, glyph_for(color), |t| {
                        let angle = t * TAU;
                        BodyPosition::new(c.x + r * angle.cos(), c.y + r * angle.sin())
                    });
                }
                DrawCommand::Ellipse {
                    center,
                    semi_major,
                    semi_minor,
                    rotation,
                    color,
                    ..
                } => {
                    let (c, a, b) = (*center, *semi_major, *semi_minor);
                    let (sin_rot, cos_rot) = rotation.sin_cos();
                    self.plot_curve(TAU * a.max(b), glyph_for(color), |t| {
                        let angle = t * TAU;
                        BodyPosition::new(
                            c.x + angle.cos() * a * cos_rot - angle.sin() * b * sin_rot,
                            c.y + angle.cos() * a * sin_rot + angle.sin() * b * cos_rot,
                        )
                    });
                }
                DrawCommand::Polyline { points, color, .. } => {
                    let glyph = glyph_for(color);
                    for pair in points.windows(2) {
                        let (from, to) = (pair[0], pair[1]);
                        self.plot_curve(from.distance_to(&to), glyph, |t| {
                            BodyPosition::new(
                                from.x + (to.x - from.x) * t,
                                from.y + (to.y - from.y) * t,
                            )
                        });
                    }
                }
            }
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.cells
            .chunks(self.cols)
            .map(|row| row.iter().collect::<String>().trim_end().to_string())
            .collect()
    }
}

/// Drawing surface that redraws the orbit view (and optionally the
/// tracker) in place on a terminal-like writer.
pub struct TerminalSurface<W: Write + Send + 'static> {
    raster: AsciiRaster,
    out: W,
    feed: Option<Arc<RwLock<FeedStatus>>>,
}

impl<W: Write + Send + 'static> TerminalSurface<W> {
    pub fn new(raster: AsciiRaster, out: W) -> Self {
        Self {
            raster,
            out,
            feed: None,
        }
    }

    /// Print the tracker below each frame
    pub fn with_feed(mut self, feed: Arc<RwLock<FeedStatus>>) -> Self {
        self.feed = Some(feed);
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send + 'static> DrawingSurface for TerminalSurface<W> {
    fn draw(&mut self, scene: &Scene) -> NeoResult<()> {
        self.raster.clear();
        self.raster.draw(scene);

        let mut frame = String::from("\x1b[H\x1b[2J");
        let _ = writeln!(frame, "HELIOCENTRIC VIEW  step {}", scene.time_step);
        for line in self.raster.lines() {
            frame.push_str(&line);
            frame.push('\n');
        }
        if let Some(feed) = &self.feed {
            let tracker = format_tracker(&feed.read());
            frame.push('\n');
            frame.push_str(&tracker);
        }

        self.out
            .write_all(frame.as_bytes())
            .and_then(|_| self.out.flush())
            .map_err(|e| NeoError::Lifecycle(format!("terminal write failed: {}", e)))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_client::{parse_feed, tests::FEED_FIXTURE};
    use crate::orbital_motion::{build_scene, compute_frame, OrbitGeometry};
    use crate::physics_engine::compute_impact;

    #[test]
    fn test_card_formatting() {
        let asteroids = parse_feed(FEED_FIXTURE).unwrap();
        let card = format_neo_card(&asteroids[1]);

        assert!(card.starts_with("(2010 PK9)  [HAZARDOUS]"));
        assert!(card.contains("Diameter 206m"));
        assert!(card.contains("Velocity 17.1 km/s"));
        assert!(card.contains("Miss Distance 12.00 LD"));
        assert!(card.contains("Magnitude 21.7 H"));
        assert!(card.contains("Approach 2024-03-02"));

        assert!(!format_neo_card(&asteroids[0]).contains("HAZARDOUS"));
    }

    #[test]
    fn test_card_without_approach() {
        let neo: NearEarthObjectSummary = serde_json::from_str(
            r#"{
                "id": "7", "name": "(2019 QZ)", "absolute_magnitude_h": 24.5,
                "diameter_min_m": 20.0, "diameter_max_m": 40.0,
                "is_potentially_hazardous": false, "close_approaches": []
            }"#,
        )
        .unwrap();
        let card = format_neo_card(&neo);
        assert!(card.contains("(2019 QZ)"));
        assert!(card.contains("Diameter 30m"));
        assert!(card.contains("Approach n/a"));
        assert!(!card.contains("Miss Distance"));
    }

    #[test]
    fn test_tracker_states() {
        assert!(format_tracker(&FeedStatus::Loading).contains("Loading"));

        let unavailable = format_tracker(&FeedStatus::Unavailable {
            reason: "API returned status: 500".into(),
        });
        assert!(unavailable.contains(UNAVAILABLE_MESSAGE));

        let ready = format_tracker(&FeedStatus::from_result(parse_feed(FEED_FIXTURE)));
        assert!(ready.contains("Tracked Today: 2 | Potentially Hazardous: 1"));
        assert!(ready.contains("(2020 FA1)"));
    }

    #[test]
    fn test_tracker_caps_cards() {
        let mut asteroids = parse_feed(FEED_FIXTURE).unwrap();
        let template = asteroids[0].clone();
        asteroids = (0..10)
            .map(|i| NearEarthObjectSummary {
                id: i.to_string(),
                name: format!("NEO-{}", i),
                ..template.clone()
            })
            .collect();

        let text = format_tracker(&FeedStatus::from_result(Ok(asteroids)));
        assert!(text.contains("Tracked Today: 10"));
        assert!(text.contains("NEO-5"));
        assert!(!text.contains("NEO-6"));
    }

    #[test]
    fn test_impact_report() {
        let params = ImpactParameters::new(100.0, 20.0, 45.0);
        let result = compute_impact(&params).unwrap();
        let report = format_impact_report(&params, &result);

        assert!(report.contains("THREAT LEVEL: MODERATE"));
        assert!(report.contains("67.58 MT"));
        assert!(report.contains("~2000m"));
        assert!(report.contains("~5.0 km"));
        assert!(report.contains("Regional Catastrophe"));
    }

    #[test]
    fn test_strategy_listing() {
        let all = format_strategies(None);
        for strategy in DeflectionStrategy::ALL {
            assert!(all.contains(strategy.badge()));
        }
        let late = format_strategies(Some(2.0));
        assert!(late.contains("NUCLEAR DEFLECTION"));
        assert!(!late.contains("GRAVITY TRACTOR"));
    }

    #[test]
    fn test_orbital_elements_panel() {
        let panel = format_orbital_elements();
        assert!(panel.contains("687 days"));
        assert_eq!(panel.lines().count(), 1 + DISPLAYED_ELEMENTS.len());
    }

    #[test]
    fn test_raster_places_bodies() {
        let geometry = OrbitGeometry::for_canvas(600.0, 600.0).unwrap();
        let scene = build_scene(&compute_frame(0, &geometry), &geometry);
        let mut raster = AsciiRaster::new(60, 30, 600.0, 600.0).unwrap();
        raster.draw(&scene);
        let lines = raster.lines();

        assert_eq!(lines.len(), 30);
        // sun at the center cell, earth at (450, 300) on step 0
        assert_eq!(lines[15].chars().nth(30), Some('@'));
        assert_eq!(lines[15].chars().nth(45), Some('E'));
        assert!(lines.iter().any(|l| l.contains('A')));
        assert!(lines.iter().any(|l| l.contains(':')));
    }

    #[test]
    fn test_raster_rejects_empty_grid() {
        assert!(AsciiRaster::new(0, 10, 600.0, 600.0).is_err());
        assert!(AsciiRaster::new(10, 10, 0.0, 600.0).is_err());
    }

    #[test]
    fn test_terminal_surface_writes_frames() {
        let geometry = OrbitGeometry::for_canvas(600.0, 600.0).unwrap();
        let raster = AsciiRaster::new(40, 20, 600.0, 600.0).unwrap();
        let feed = Arc::new(RwLock::new(FeedStatus::Unavailable {
            reason: "offline".into(),
        }));
        let mut surface = TerminalSurface::new(raster, Vec::new()).with_feed(feed);

        let scene = build_scene(&compute_frame(7, &geometry), &geometry);
        surface.draw(&scene).unwrap();

        let text = String::from_utf8(surface.into_inner()).unwrap();
        assert!(text.contains("step 7"));
        assert!(text.contains(UNAVAILABLE_MESSAGE));
    }
}
