// State Manager - owned lifecycles for the watch station
// Impact simulator session, NEO feed poller and the orbital animation loop

use chrono::{DateTime, Local};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::api_client::{NearEarthObjectSummary, NeoFeedSource, TrackerStats};
use crate::config::Config;
use crate::error::{NeoError, NeoResult};
use crate::orbital_motion::{build_scene, FrameSequence, OrbitGeometry, Scene};
use crate::physics_engine::{
    compute_impact, ImpactParameters, ImpactResult, ANGLE_CONTROL, DIAMETER_CONTROL,
    VELOCITY_CONTROL,
};

// =============================================================================
// APPLICATION STATE
// =============================================================================

pub struct AppState {
    pub config: Config,
    pub feed: Arc<RwLock<FeedStatus>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            feed: Arc::new(RwLock::new(FeedStatus::Loading)),
        }
    }

    pub fn geometry(&self) -> NeoResult<OrbitGeometry> {
        OrbitGeometry::for_canvas(self.config.canvas_width, self.config.canvas_height)
    }
}

// =============================================================================
// IMPACT SIMULATOR SESSION
// =============================================================================

/// Current slider values plus the result of the last run. Any parameter
/// change drops the cached result until `run` is called again.
#[derive(Debug, Clone, Default)]
pub struct ImpactSimulator {
    params: ImpactParameters,
    result: Option<ImpactResult>,
}

impl ImpactSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parameters(&self) -> &ImpactParameters {
        &self.params
    }

    pub fn result(&self) -> Option<&ImpactResult> {
        self.result.as_ref()
    }

    pub fn has_run(&self) -> bool {
        self.result.is_some()
    }

    fn update(&mut self, params: ImpactParameters) {
        if params != self.params {
            self.params = params;
            self.result = None;
        }
    }

    /// Set diameter through its control; returns the snapped value
    pub fn set_diameter(&mut self, diameter_m: f64) -> NeoResult<f64> {
        let snapped = DIAMETER_CONTROL.snap(diameter_m)?;
        self.update(ImpactParameters {
            diameter_m: snapped,
            ..self.params
        });
        Ok(snapped)
    }

    pub fn set_velocity(&mut self, velocity_km_s: f64) -> NeoResult<f64> {
        let snapped = VELOCITY_CONTROL.snap(velocity_km_s)?;
        self.update(ImpactParameters {
            velocity_km_s: snapped,
            ..self.params
        });
        Ok(snapped)
    }

    pub fn set_angle(&mut self, impact_angle_deg: f64) -> NeoResult<f64> {
        let snapped = ANGLE_CONTROL.snap(impact_angle_deg)?;
        self.update(ImpactParameters {
            impact_angle_deg: snapped,
            ..self.params
        });
        Ok(snapped)
    }

    /// Set raw parameters, bypassing the controls
    pub fn set_parameters(&mut self, params: ImpactParameters) {
        self.update(params);
    }

    pub fn run(&mut self) -> NeoResult<ImpactResult> {
        let result = compute_impact(&self.params)?;
        tracing::info!(
            "Impact run: {:.0} m at {:.0} km/s -> {:.2} MT ({})",
            self.params.diameter_m,
            self.params.velocity_km_s,
            result.energy_megatons_tnt,
            result.threat_level
        );
        self.result = Some(result);
        Ok(result)
    }
}

// =============================================================================
// NEO FEED POLLING
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FeedStatus {
    Loading,
    Ready {
        asteroids: Vec<NearEarthObjectSummary>,
        fetched_at: DateTime<Local>,
    },
    Unavailable {
        reason: String,
    },
}

impl FeedStatus {
    pub fn from_result(result: NeoResult<Vec<NearEarthObjectSummary>>) -> Self {
        match result {
            Ok(asteroids) => FeedStatus::Ready {
                asteroids,
                fetched_at: Local::now(),
            },
            Err(e) => {
                if e.is_feed_error() {
                    tracing::warn!("NEO feed unavailable: {}", e);
                } else {
                    tracing::error!("NEO feed request rejected: {}", e);
                }
                FeedStatus::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    pub fn asteroids(&self) -> &[NearEarthObjectSummary] {
        match self {
            FeedStatus::Ready { asteroids, .. } => asteroids,
            _ => &[],
        }
    }

    pub fn stats(&self) -> Option<TrackerStats> {
        match self {
            FeedStatus::Ready { asteroids, .. } => Some(TrackerStats::from_summaries(asteroids)),
            _ => None,
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self, FeedStatus::Unavailable { .. })
    }
}

/// Fetch once and publish the outcome
pub async fn refresh_feed<S: NeoFeedSource>(source: &S, feed: &RwLock<FeedStatus>) {
    let status = FeedStatus::from_result(source.fetch_today().await);
    *feed.write() = status;
}

/// Background task re-polling the feed on a fixed interval. The first
/// fetch happens immediately.
pub struct FeedPoller {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl FeedPoller {
    pub fn start<S: NeoFeedSource>(
        source: Arc<S>,
        feed: Arc<RwLock<FeedStatus>>,
        interval: Duration,
    ) -> Self {
        let interval = interval.max(Duration::from_millis(1));
        let (shutdown, mut stop_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => {}
                }

                // An in-flight request is dropped on shutdown
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    _ = refresh_feed(source.as_ref(), &feed) => {}
                }
            }
            tracing::debug!("Feed poller stopped");
        });

        tracing::info!("Feed poller started, refresh every {:?}", interval);
        Self { shutdown, handle }
    }

    /// Cancel the timer and wait for the task to finish
    pub async fn stop(self) -> NeoResult<()> {
        let _ = self.shutdown.send(true);
        self.handle
            .await
            .map_err(|e| NeoError::Lifecycle(format!("feed poller task failed: {}", e)))
    }
}

// =============================================================================
// ORBITAL ANIMATION LOOP (runs in background thread)
// =============================================================================

/// Exclusive target of the animation loop
pub trait DrawingSurface: Send + 'static {
    fn draw(&mut self, scene: &Scene) -> NeoResult<()>;
}

/// Animation in its initial state; owns nothing that runs yet
pub struct OrbitAnimator {
    geometry: OrbitGeometry,
    frame_interval: Duration,
}

/// What a stopped animation hands back
#[derive(Debug)]
pub struct AnimationReport<S> {
    pub surface: S,
    pub frames_drawn: u64,
    pub last_error: Option<NeoError>,
}

/// A live animation loop. Stopping (or dropping) it ends the loop
/// between two frames.
pub struct RunningAnimation<S: DrawingSurface> {
    is_running: Arc<RwLock<bool>>,
    frames_drawn: Arc<AtomicU64>,
    handle: Option<thread::JoinHandle<AnimationReport<S>>>,
}

impl OrbitAnimator {
    pub fn new(geometry: OrbitGeometry, frame_interval: Duration) -> Self {
        Self {
            geometry,
            frame_interval,
        }
    }

    pub fn geometry(&self) -> &OrbitGeometry {
        &self.geometry
    }

    /// Hand the surface to a new render thread; frames start at step 0
    pub fn start<S: DrawingSurface>(&self, mut surface: S) -> NeoResult<RunningAnimation<S>> {
        let is_running = Arc::new(RwLock::new(true));
        let frames_drawn = Arc::new(AtomicU64::new(0));

        let running = is_running.clone();
        let drawn = frames_drawn.clone();
        let geometry = self.geometry;
        let frame_interval = self.frame_interval;

        let handle = thread::Builder::new()
            .name("orbit-animation".to_string())
            .spawn(move || {
                let mut frames = FrameSequence::new(geometry);
                let mut last_error = None;

                while *running.read() {
                    let start = Instant::now();

                    let Some(snapshot) = frames.next() else {
                        break;
                    };
                    let scene = build_scene(&snapshot, &geometry);
                    if let Err(e) = surface.draw(&scene) {
                        tracing::warn!("Drawing failed at step {}: {}", snapshot.time_step, e);
                        last_error = Some(e);
                        break;
                    }
                    drawn.fetch_add(1, Ordering::Release);

                    // Sleep to maintain frame rate; stop() unparks early
                    let elapsed = start.elapsed();
                    if elapsed < frame_interval {
                        thread::park_timeout(frame_interval - elapsed);
                    }
                }

                AnimationReport {
                    surface,
                    frames_drawn: drawn.load(Ordering::Acquire),
                    last_error,
                }
            })
            .map_err(|e| NeoError::Lifecycle(format!("failed to spawn render thread: {}", e)))?;

        tracing::debug!("Orbit animation started at {:?} per frame", frame_interval);
        Ok(RunningAnimation {
            is_running,
            frames_drawn,
            handle: Some(handle),
        })
    }
}

impl<S: DrawingSurface> RunningAnimation<S> {
    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn signal_stop(&self) {
        *self.is_running.write() = false;
        if let Some(handle) = &self.handle {
            handle.thread().unpark();
        }
    }

    /// End the loop and take the surface back
    pub fn stop(mut self) -> NeoResult<AnimationReport<S>> {
        self.signal_stop();
        let handle = self
            .handle
            .take()
            .ok_or_else(|| NeoError::Lifecycle("animation already stopped".to_string()))?;
        let report = handle
            .join()
            .map_err(|_| NeoError::Lifecycle("render thread panicked".to_string()))?;
        tracing::debug!("Orbit animation stopped after {} frames", report.frames_drawn);
        Ok(report)
    }
}

impl<S: DrawingSurface> Drop for RunningAnimation<S> {
    fn drop(&mut self) {
        self.signal_stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_client::{parse_feed, tests::FEED_FIXTURE};
    use crate::physics_engine::ThreatLevel;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_simulator_defaults_and_snapping() {
        let mut sim = ImpactSimulator::new();
        assert_eq!(*sim.parameters(), ImpactParameters::new(100.0, 20.0, 45.0));
        assert!(!sim.has_run());

        assert_eq!(sim.set_diameter(333.0).unwrap(), 330.0);
        assert_eq!(sim.set_velocity(100.0).unwrap(), 72.0);
        assert_eq!(sim.set_angle(-10.0).unwrap(), 0.0);
        assert!(sim.set_diameter(f64::NAN).is_err());
        assert_eq!(sim.parameters().diameter_m, 330.0);
    }

    #[test]
    fn test_simulator_cache_invalidation() {
        let mut sim = ImpactSimulator::new();
        let first = sim.run().unwrap();
        assert_eq!(first.threat_level, ThreatLevel::Moderate);
        assert_eq!(sim.result(), Some(&first));

        // same value keeps the cached run
        sim.set_velocity(20.0).unwrap();
        assert!(sim.has_run());

        sim.set_diameter(500.0).unwrap();
        assert!(sim.result().is_none());

        let second = sim.run().unwrap();
        assert!(second.energy_megatons_tnt > first.energy_megatons_tnt);
        assert_eq!(sim.result(), Some(&second));
    }

    #[test]
    fn test_simulator_rejects_invalid_raw_parameters() {
        let mut sim = ImpactSimulator::new();
        sim.run().unwrap();
        sim.set_parameters(ImpactParameters::new(-1.0, 20.0, 45.0));
        assert!(matches!(sim.run(), Err(NeoError::Validation(_))));
        assert!(sim.result().is_none());
    }

    #[test]
    fn test_feed_status_from_errors() {
        let status = FeedStatus::from_result(Err(NeoError::Parse("bad".into())));
        assert!(!status.is_available());
        assert!(status.asteroids().is_empty());
        assert!(status.stats().is_none());

        let ready = FeedStatus::from_result(parse_feed(FEED_FIXTURE));
        assert!(ready.is_available());
        assert_eq!(ready.stats().unwrap().hazardous, 1);

        // malformed body degrades to unavailable instead of failing
        let broken = FeedStatus::from_result(parse_feed("{\"links\": {}}"));
        assert!(matches!(broken, FeedStatus::Unavailable { .. }));
    }

    struct FixtureSource {
        calls: AtomicUsize,
        fail: bool,
    }

    impl FixtureSource {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }
    }

    impl NeoFeedSource for FixtureSource {
        async fn fetch_today(&self) -> NeoResult<Vec<NearEarthObjectSummary>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(NeoError::Network("API returned status: 503".into()))
            } else {
                parse_feed(FEED_FIXTURE)
            }
        }
    }

    async fn wait_until_loaded(feed: &RwLock<FeedStatus>) {
        for _ in 0..400 {
            if !matches!(*feed.read(), FeedStatus::Loading) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("feed never left the loading state");
    }

    #[tokio::test]
    async fn test_refresh_feed_once() {
        let source = FixtureSource::new(false);
        let feed = RwLock::new(FeedStatus::Loading);
        refresh_feed(source.as_ref(), &feed).await;
        assert_eq!(feed.read().asteroids().len(), 2);
    }

    #[tokio::test]
    async fn test_poller_publishes_and_stops() {
        let source = FixtureSource::new(false);
        let feed = Arc::new(RwLock::new(FeedStatus::Loading));

        let poller = FeedPoller::start(source.clone(), feed.clone(), Duration::from_millis(10));
        wait_until_loaded(&feed).await;
        assert_eq!(feed.read().stats(), Some(TrackerStats { tracked: 2, hazardous: 1 }));

        poller.stop().await.unwrap();
        let calls = source.calls.load(Ordering::SeqCst);
        assert!(calls >= 1);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), calls);
    }

    #[tokio::test]
    async fn test_poller_failure_is_unavailable() {
        let source = FixtureSource::new(true);
        let feed = Arc::new(RwLock::new(FeedStatus::Loading));

        let poller = FeedPoller::start(source, feed.clone(), Duration::from_secs(300));
        wait_until_loaded(&feed).await;
        match &*feed.read() {
            FeedStatus::Unavailable { reason } => assert!(reason.contains("503")),
            other => panic!("expected unavailable, got {:?}", other),
        }
        poller.stop().await.unwrap();
    }

    struct PanickingSource {
        entered: Arc<tokio::sync::Notify>,
    }

    impl NeoFeedSource for PanickingSource {
        async fn fetch_today(&self) -> NeoResult<Vec<NearEarthObjectSummary>> {
            self.entered.notify_one();
            panic!("source blew up")
        }
    }

    #[tokio::test]
    async fn test_poller_panic_is_lifecycle_error() {
        let entered = Arc::new(tokio::sync::Notify::new());
        let source = Arc::new(PanickingSource {
            entered: entered.clone(),
        });
        let feed = Arc::new(RwLock::new(FeedStatus::Loading));
        let poller = FeedPoller::start(source, feed.clone(), Duration::from_secs(300));

        entered.notified().await;
        let err = poller.stop().await.unwrap_err();
        assert!(matches!(err, NeoError::Lifecycle(_)), "{:?}", err);
        assert!(!err.is_feed_error());
        assert!(matches!(*feed.read(), FeedStatus::Loading));
    }

    #[test]
    fn test_rejected_request_is_unavailable() {
        let status = FeedStatus::from_result(Err(NeoError::Validation("span too long".into())));
        assert!(!status.is_available());
        assert!(status.stats().is_none());
    }

    #[derive(Default)]
    struct RecordingSurface {
        steps: Vec<u64>,
        fail_at: Option<u64>,
    }

    impl DrawingSurface for RecordingSurface {
        fn draw(&mut self, scene: &Scene) -> NeoResult<()> {
            if self.fail_at == Some(scene.time_step) {
                return Err(NeoError::Lifecycle("surface lost".into()));
            }
            self.steps.push(scene.time_step);
            Ok(())
        }
    }

    fn test_animator() -> OrbitAnimator {
        OrbitAnimator::new(
            OrbitGeometry::for_canvas(600.0, 600.0).unwrap(),
            Duration::from_millis(1),
        )
    }

    #[test]
    fn test_animation_frames_are_ordered() {
        let running = test_animator().start(RecordingSurface::default()).unwrap();
        thread::sleep(Duration::from_millis(50));
        assert!(running.is_running());

        let report = running.stop().unwrap();
        assert!(report.last_error.is_none());
        assert!(report.frames_drawn > 0);
        assert_eq!(report.frames_drawn as usize, report.surface.steps.len());
        for (i, step) in report.surface.steps.iter().enumerate() {
            assert_eq!(*step, i as u64);
        }
    }

    #[test]
    fn test_animation_restarts_from_zero() {
        let animator = test_animator();
        let first = animator.start(RecordingSurface::default()).unwrap();
        thread::sleep(Duration::from_millis(10));
        assert_eq!(first.stop().unwrap().surface.steps.first(), Some(&0));

        let second = animator.start(RecordingSurface::default()).unwrap();
        thread::sleep(Duration::from_millis(10));
        let report = second.stop().unwrap();
        assert_eq!(report.surface.steps.first(), Some(&0));
    }

    #[test]
    fn test_animation_stops_on_draw_error() {
        let surface = RecordingSurface {
            steps: Vec::new(),
            fail_at: Some(3),
        };
        let running = test_animator().start(surface).unwrap();
        thread::sleep(Duration::from_millis(50));

        let report = running.stop().unwrap();
        assert_eq!(report.frames_drawn, 3);
        assert_eq!(report.surface.steps, vec![0, 1, 2]);
        assert!(matches!(report.last_error, Some(NeoError::Lifecycle(_))));
    }

    struct CountingSurface(Arc<AtomicUsize>);

    impl DrawingSurface for CountingSurface {
        fn draw(&mut self, _scene: &Scene) -> NeoResult<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_drop_stops_animation() {
        let count = Arc::new(AtomicUsize::new(0));
        let running = test_animator()
            .start(CountingSurface(count.clone()))
            .unwrap();
        thread::sleep(Duration::from_millis(10));
        drop(running);

        let after_drop = count.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(count.load(Ordering::SeqCst), after_drop);
    }
}
