// NEO Watch - Near-Earth Object tracker & impact scenario calculator
// Library root; the `neo-watch` binary wires these modules into a CLI

pub mod api_client;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod orbital_motion;
pub mod physics_engine;
pub mod state_manager;

pub use api_client::{NearEarthObjectSummary, NeoFeedSource, NeoWsClient};
pub use config::Config;
pub use error::{NeoError, NeoResult};
pub use orbital_motion::{compute_frame, BodyPosition, FrameSequence, OrbitGeometry};
pub use physics_engine::{compute_impact, ImpactParameters, ImpactResult, ThreatLevel};
pub use state_manager::{AppState, FeedPoller, FeedStatus, ImpactSimulator, OrbitAnimator};
