// Orbital Motion - decorative heliocentric animation
// Parametric Earth / asteroid positions and the draw list for one frame

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::error::{NeoError, NeoResult};

// =============================================================================
// ANIMATION CONSTANTS (reference canvas pixels, radians per time step)
// =============================================================================

/// Side of the square canvas the radii below are laid out for
pub const REFERENCE_CANVAS_SIZE: f64 = 600.0;

pub const EARTH_ORBIT_RADIUS: f64 = 150.0;
pub const EARTH_ANGULAR_RATE: f64 = 0.02;

pub const ASTEROID_SEMI_MAJOR_AXIS: f64 = 180.0;
pub const ASTEROID_SEMI_MINOR_AXIS: f64 = 120.0;
pub const ASTEROID_ORBIT_ROTATION: f64 = PI / 6.0;
pub const ASTEROID_ANGULAR_RATE: f64 = 0.035;

/// Number of points in the asteroid trail, newest first
pub const TRAIL_SAMPLES: usize = 20;
/// Angular spacing between trail points (rad)
pub const TRAIL_SPACING: f64 = 0.05;

pub const SUN_DRAW_RADIUS: f64 = 15.0;
pub const EARTH_DRAW_RADIUS: f64 = 10.0;
pub const ASTEROID_DRAW_RADIUS: f64 = 6.0;

// =============================================================================
// GEOMETRY
// =============================================================================

/// Position in canvas pixel space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct BodyPosition {
    pub x: f64,
    pub y: f64,
}

impl BodyPosition {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &BodyPosition) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Placement of the orbital system on a drawing surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OrbitGeometry {
    center: BodyPosition,
    scale: f64,
}

impl OrbitGeometry {
    pub fn new(center_x: f64, center_y: f64, scale: f64) -> NeoResult<Self> {
        if !center_x.is_finite() || !center_y.is_finite() {
            return Err(NeoError::Validation(format!(
                "orbit center must be finite, got ({}, {})",
                center_x, center_y
            )));
        }
        if !scale.is_finite() || scale <= 0.0 {
            return Err(NeoError::Validation(format!(
                "orbit scale must be a positive finite number, got {}",
                scale
            )));
        }
        Ok(Self {
            center: BodyPosition::new(center_x, center_y),
            scale,
        })
    }

    /// Centered on the canvas, scaled so the layout fits the shorter side
    pub fn for_canvas(width: f64, height: f64) -> NeoResult<Self> {
        if !(width > 0.0 && height > 0.0) {
            return Err(NeoError::Validation(format!(
                "canvas must have a positive size, got {}x{}",
                width, height
            )));
        }
        Self::new(
            width / 2.0,
            height / 2.0,
            width.min(height) / REFERENCE_CANVAS_SIZE,
        )
    }

    pub fn center(&self) -> BodyPosition {
        self.center
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn earth_orbit_radius(&self) -> f64 {
        EARTH_ORBIT_RADIUS * self.scale
    }

    pub fn semi_major_axis(&self) -> f64 {
        ASTEROID_SEMI_MAJOR_AXIS * self.scale
    }

    pub fn semi_minor_axis(&self) -> f64 {
        ASTEROID_SEMI_MINOR_AXIS * self.scale
    }
}

// =============================================================================
// POSITION FUNCTIONS
// =============================================================================

/// Earth on its circular orbit at a (possibly fractional) time step
pub fn earth_position(time: f64, geometry: &OrbitGeometry) -> BodyPosition {
    let angle = time * EARTH_ANGULAR_RATE;
    let r = geometry.earth_orbit_radius();
    let c = geometry.center();
    BodyPosition::new(c.x + angle.cos() * r, c.y + angle.sin() * r)
}

/// Point on the rotated asteroid ellipse at parametric angle `angle`
pub fn asteroid_at_angle(angle: f64, geometry: &OrbitGeometry) -> BodyPosition {
    let a = geometry.semi_major_axis();
    let b = geometry.semi_minor_axis();
    let (sin_rot, cos_rot) = ASTEROID_ORBIT_ROTATION.sin_cos();
    let c = geometry.center();

    BodyPosition::new(
        c.x + angle.cos() * a * cos_rot - angle.sin() * b * sin_rot,
        c.y + angle.cos() * a * sin_rot + angle.sin() * b * cos_rot,
    )
}

/// Asteroid at a (possibly fractional) time step
pub fn asteroid_position(time: f64, geometry: &OrbitGeometry) -> BodyPosition {
    asteroid_at_angle(time * ASTEROID_ANGULAR_RATE, geometry)
}

/// Trail behind the asteroid, newest point first. Recomputed from the
/// current angle every frame, never accumulated.
pub fn asteroid_trail(time: f64, geometry: &OrbitGeometry) -> Vec<BodyPosition> {
    let angle = time * ASTEROID_ANGULAR_RATE;
    (0..TRAIL_SAMPLES)
        .map(|i| asteroid_at_angle(angle - i as f64 * TRAIL_SPACING, geometry))
        .collect()
}

// =============================================================================
// FRAMES
// =============================================================================

/// Animation tick counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct OrbitalFrame {
    pub time_step: u64,
}

impl OrbitalFrame {
    pub fn next(&self) -> OrbitalFrame {
        OrbitalFrame {
            time_step: self.time_step + 1,
        }
    }
}

/// Everything needed to draw one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrbitalSnapshot {
    pub time_step: u64,
    pub earth: BodyPosition,
    pub asteroid: BodyPosition,
    pub trail: Vec<BodyPosition>,
}

pub fn compute_frame(time_step: u64, geometry: &OrbitGeometry) -> OrbitalSnapshot {
    let time = time_step as f64;
    OrbitalSnapshot {
        time_step,
        earth: earth_position(time, geometry),
        asteroid: asteroid_position(time, geometry),
        trail: asteroid_trail(time, geometry),
    }
}

/// Lazy, infinite sequence of frames, one per time step
#[derive(Debug, Clone)]
pub struct FrameSequence {
    geometry: OrbitGeometry,
    next: OrbitalFrame,
}

impl FrameSequence {
    pub fn new(geometry: OrbitGeometry) -> Self {
        Self::starting_at(geometry, 0)
    }

    pub fn starting_at(geometry: OrbitGeometry, time_step: u64) -> Self {
        Self {
            geometry,
            next: OrbitalFrame { time_step },
        }
    }

    pub fn restart(&mut self) {
        self.next = OrbitalFrame::default();
    }

    pub fn geometry(&self) -> &OrbitGeometry {
        &self.geometry
    }
}

impl Iterator for FrameSequence {
    type Item = OrbitalSnapshot;

    fn next(&mut self) -> Option<Self::Item> {
        let snapshot = compute_frame(self.next.time_step, &self.geometry);
        self.next = self.next.next();
        Some(snapshot)
    }
}

// =============================================================================
// SCENE (draw list)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

pub const SUN_COLOR: Rgba = Rgba::new(0xFD, 0xB8, 0x13, 1.0);
pub const EARTH_COLOR: Rgba = Rgba::new(0x3B, 0x82, 0xF6, 1.0);
pub const EARTH_ORBIT_COLOR: Rgba = Rgba::new(59, 130, 246, 0.3);
pub const ASTEROID_COLOR: Rgba = Rgba::new(0xEF, 0x44, 0x44, 1.0);
pub const ASTEROID_ORBIT_COLOR: Rgba = Rgba::new(239, 68, 68, 0.5);
pub const TRAIL_COLOR: Rgba = Rgba::new(239, 68, 68, 0.2);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DrawCommand {
    Disc {
        center: BodyPosition,
        radius: f64,
        color: Rgba,
        glow: f64,
    },
    Ring {
        center: BodyPosition,
        radius: f64,
        color: Rgba,
        line_width: f64,
    },
    Ellipse {
        center: BodyPosition,
        semi_major: f64,
        semi_minor: f64,
        rotation: f64,
        color: Rgba,
        line_width: f64,
    },
    Polyline {
        points: Vec<BodyPosition>,
        color: Rgba,
        line_width: f64,
    },
}

/// Draw list for one frame, back to front
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scene {
    pub time_step: u64,
    pub commands: Vec<DrawCommand>,
}

pub fn build_scene(snapshot: &OrbitalSnapshot, geometry: &OrbitGeometry) -> Scene {
    let center = geometry.center();
    let scale = geometry.scale();

    let commands = vec![
        DrawCommand::Disc {
            center,
            radius: SUN_DRAW_RADIUS * scale,
            color: SUN_COLOR,
            glow: 20.0,
        },
        DrawCommand::Ring {
            center,
            radius: geometry.earth_orbit_radius(),
            color: EARTH_ORBIT_COLOR,
            line_width: 2.0,
        },
        DrawCommand::Disc {
            center: snapshot.earth,
            radius: EARTH_DRAW_RADIUS * scale,
            color: EARTH_COLOR,
            glow: 10.0,
        },
        DrawCommand::Ellipse {
            center,
            semi_major: geometry.semi_major_axis(),
            semi_minor: geometry.semi_minor_axis(),
            rotation: ASTEROID_ORBIT_ROTATION,
            color: ASTEROID_ORBIT_COLOR,
            line_width: 2.0,
        },
        DrawCommand::Disc {
            center: snapshot.asteroid,
            radius: ASTEROID_DRAW_RADIUS * scale,
            color: ASTEROID_COLOR,
            glow: 15.0,
        },
        DrawCommand::Polyline {
            points: snapshot.trail.clone(),
            color: TRAIL_COLOR,
            line_width: 1.0,
        },
    ];

    Scene {
        time_step: snapshot.time_step,
        commands,
    }
}

/// Static orbital elements shown beside the animation. Display text
/// only, not derived from the position functions.
pub const DISPLAYED_ELEMENTS: [(&str, &str); 6] = [
    ("Semi-major Axis (a)", "1.52 AU"),
    ("Eccentricity (e)", "0.234"),
    ("Inclination (i)", "12.5°"),
    ("Orbital Period", "687 days"),
    ("Perihelion Distance", "1.16 AU"),
    ("Aphelion Distance", "1.88 AU"),
];

// =============================================================================
// TESTS
// =============================================================================
