//! # Synthetic channel backend
//!
//! Stand-in for a native WMLES solver. Wall data follows the log law of
//! the wall at the wall model exchange height `h`:
//! $$
//! u = u_\tau \left( \frac{1}{\kappa} \ln \frac{h u_\tau}{\nu} + B \right),
//! \quad \frac{du}{dy} = \frac{u_\tau}{\kappa h},
//! \quad \tau_w = \rho u_\tau^2
//! $$
//! optionally perturbed by uniform random fluctuations that are redrawn
//! in every `run` call. Vertices of each marker are split evenly among
//! the ranks.
use super::{check_single_zone, FlowDriver, Initialize};
use crate::comm::Communication;
use crate::error::{DriverError, Result};
use crate::types::{LifecycleStage, MarkerId, MonitorStatus, TimeWindow};
use ndarray::Array1;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Input file of the synthetic backend
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    /// First time iteration
    #[serde(default)]
    pub start_iter: usize,
    /// Number of time iterations
    pub n_iter: usize,
    /// Monitor requests a stop at this time iteration
    #[serde(default)]
    pub stop_iter: Option<usize>,
    /// Friction velocity
    #[serde(default = "default_u_tau")]
    pub u_tau: f64,
    /// Kinematic viscosity
    #[serde(default = "default_nu")]
    pub nu: f64,
    /// Density
    #[serde(default = "default_rho")]
    pub rho: f64,
    /// Von Karman constant
    #[serde(default = "default_kappa")]
    pub kappa: f64,
    /// Log-law intercept
    #[serde(default = "default_intercept")]
    pub intercept: f64,
    /// Relative amplitude of the random fluctuations in `[0, 1)`, 0 disables them
    #[serde(default)]
    pub fluctuation: f64,
    /// Wall markers
    #[serde(rename = "marker")]
    pub markers: Vec<ChannelMarker>,
}

/// Wall marker of the synthetic channel
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelMarker {
    /// Marker tag
    pub name: String,
    /// Global number of vertices
    pub vertices: usize,
    /// Wall model exchange height
    #[serde(default = "default_exchange_height")]
    pub exchange_height: f64,
}

// Re_tau = 5200 for unit half height and friction velocity
fn default_u_tau() -> f64 {
    1.0
}
fn default_nu() -> f64 {
    1. / 5200.
}
fn default_rho() -> f64 {
    1.0
}
fn default_kappa() -> f64 {
    0.41
}
fn default_intercept() -> f64 {
    5.2
}
fn default_exchange_height() -> f64 {
    0.1
}

impl ChannelConfig {
    /// Parse from toml
    ///
    /// # Errors
    /// Malformed toml or invalid parameters
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let positive = [
            ("u_tau", self.u_tau),
            ("nu", self.nu),
            ("rho", self.rho),
            ("kappa", self.kappa),
        ];
        for (key, value) in positive.iter() {
            if !(*value > 0.) {
                return Err(DriverError::Config(format!(
                    "{} must be positive, got {}",
                    key, value
                )));
            }
        }
        // Below 1 the perturbed velocity keeps its sign
        if !(0. ..1.).contains(&self.fluctuation) {
            return Err(DriverError::Config(format!(
                "fluctuation must be in [0, 1), got {}",
                self.fluctuation
            )));
        }
        for marker in &self.markers {
            if !(marker.exchange_height > 0.) {
                return Err(DriverError::Config(format!(
                    "exchange_height of marker {:?} must be positive",
                    marker.name
                )));
            }
        }
        Ok(())
    }
}

/// Local part of a marker
#[derive(Debug, Clone)]
struct LocalMarker {
    name: String,
    height: f64,
    /// Relative fluctuation per local vertex
    fluct: Array1<f64>,
}

/// Log-law channel wall data
#[derive(Debug, Clone)]
pub struct SyntheticChannel {
    config: ChannelConfig,
    markers: Vec<LocalMarker>,
    current: Option<usize>,
}

/// Number of vertices of `n_global` owned by `rank`
fn local_count(n_global: usize, rank: usize, size: usize) -> usize {
    n_global / size + usize::from(rank < n_global % size)
}

impl SyntheticChannel {
    /// Build from a parsed config for one rank of `size`
    ///
    /// # Errors
    /// Invalid communicator
    pub fn new(config: ChannelConfig, rank: usize, size: usize) -> Result<Self> {
        if size == 0 || rank >= size {
            return Err(DriverError::Config(format!(
                "invalid communicator, rank {} of {}",
                rank, size
            )));
        }
        let markers = config
            .markers
            .iter()
            .map(|m| LocalMarker {
                name: m.name.clone(),
                height: m.exchange_height,
                fluct: Array1::zeros(local_count(m.vertices, rank, size)),
            })
            .collect();
        Ok(Self {
            config,
            markers,
            current: None,
        })
    }

    /// Time iterations of the run
    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.config.start_iter, self.config.n_iter)
    }

    /// Log-law velocity at wall distance `y`
    pub fn log_law_velocity(&self, y: f64) -> f64 {
        let c = &self.config;
        c.u_tau * ((y * c.u_tau / c.nu).ln() / c.kappa + c.intercept)
    }

    /// Log-law velocity gradient at wall distance `y`
    pub fn log_law_gradient(&self, y: f64) -> f64 {
        self.config.u_tau / (self.config.kappa * y)
    }

    /// Mean wall shear stress
    pub fn wall_shear_stress(&self) -> f64 {
        self.config.rho * self.config.u_tau.powi(2)
    }

    fn vertex(&self, marker: MarkerId, vertex: usize) -> Option<(f64, f64)> {
        let m = self.markers.get(marker.0)?;
        Some((m.height, *m.fluct.get(vertex)?))
    }

    fn redraw_fluctuations(&mut self) {
        use ndarray_rand::rand_distr::Uniform;
        use ndarray_rand::RandomExt;
        let c = self.config.fluctuation;
        if c > 0. {
            for m in &mut self.markers {
                m.fluct = Array1::random(m.fluct.len(), Uniform::new(-c, c));
            }
        }
    }

    fn current(&self, stage: LifecycleStage) -> Result<usize> {
        self.current.ok_or_else(|| {
            DriverError::solver(stage, self.config.start_iter, "called before preprocess")
        })
    }
}

impl FlowDriver for SyntheticChannel {
    fn all_boundary_marker_tags(&self) -> Vec<String> {
        self.markers.iter().map(|m| m.name.clone()).collect()
    }

    fn all_boundary_markers(&self) -> HashMap<String, usize> {
        self.markers
            .iter()
            .enumerate()
            .map(|(i, m)| (m.name.clone(), i))
            .collect()
    }

    fn number_vertices(&self, marker: MarkerId) -> usize {
        self.markers.get(marker.0).map_or(0, |m| m.fluct.len())
    }

    fn time_iter(&self) -> usize {
        self.config.start_iter
    }

    fn n_time_iter(&self) -> usize {
        self.config.n_iter
    }

    fn preprocess(&mut self, time_iter: usize) -> Result<()> {
        self.current = Some(time_iter);
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        self.current(LifecycleStage::Run)?;
        self.redraw_fluctuations();
        Ok(())
    }

    fn postprocess(&mut self) -> Result<()> {
        self.current(LifecycleStage::Postprocess)?;
        Ok(())
    }

    fn update(&mut self) -> Result<()> {
        self.current(LifecycleStage::Update)?;
        Ok(())
    }

    fn output(&mut self, time_iter: usize) -> Result<()> {
        self.current(LifecycleStage::Output)?;
        debug!("synthetic channel: no solver output at time iteration {}", time_iter);
        Ok(())
    }

    fn monitor(&mut self, time_iter: usize) -> Result<MonitorStatus> {
        self.current(LifecycleStage::Monitor)?;
        self.current = None;
        Ok(MonitorStatus::from(self.config.stop_iter == Some(time_iter)))
    }

    fn velocity_off_wall(&self, marker: MarkerId, vertex: usize, component: usize) -> f64 {
        match (component, self.vertex(marker, vertex)) {
            (0, Some((h, f))) => self.log_law_velocity(h) * (1. + f),
            (_, Some(_)) => 0.,
            (_, None) => f64::NAN,
        }
    }

    fn velocity_gradient_off_wall(
        &self,
        marker: MarkerId,
        vertex: usize,
        component: usize,
    ) -> f64 {
        match (component, self.vertex(marker, vertex)) {
            (0, Some((h, f))) => self.log_law_gradient(h) * (1. + f),
            (_, Some(_)) => 0.,
            (_, None) => f64::NAN,
        }
    }

    fn vertex_coordinate_y(&self, marker: MarkerId, vertex: usize) -> f64 {
        self.vertex(marker, vertex).map_or(f64::NAN, |(h, _)| h)
    }

    fn wall_shear_stress_wmles(&self, marker: MarkerId, vertex: usize) -> f64 {
        self.vertex(marker, vertex)
            .map_or(f64::NAN, |(_, f)| self.wall_shear_stress() * (1. + f).powi(2))
    }
}

impl Initialize for SyntheticChannel {
    fn initialize<C: Communication>(config_path: &Path, n_zone: usize, comm: &C) -> Result<Self> {
        check_single_zone(n_zone)?;
        let content = std::fs::read_to_string(config_path).map_err(|e| {
            DriverError::Config(format!("cannot read {:?}: {}", config_path, e))
        })?;
        let config = ChannelConfig::from_toml(&content)?;
        Self::new(config, comm.rank(), comm.size())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::step_lifecycle;

    const CHANNEL: &str = r#"
        n_iter = 5
        stop_iter = 3

        [[marker]]
        name = "lower"
        vertices = 10

        [[marker]]
        name = "upper"
        vertices = 7
        exchange_height = 0.2
    "#;

    fn approx_eq(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-10, "Large difference of values, got {} expected {}.", a, b);
    }

    #[test]
    fn test_defaults() {
        let config = ChannelConfig::from_toml(CHANNEL).unwrap();
        assert_eq!(config.start_iter, 0);
        approx_eq(config.nu, 1. / 5200.);
        approx_eq(config.markers[0].exchange_height, 0.1);
        assert_eq!(config.fluctuation, 0.);
    }

    #[test]
    fn test_invalid_config() {
        let bad = CHANNEL.replace("n_iter = 5", "n_iter = 5\nnu = -1.0");
        assert!(matches!(
            ChannelConfig::from_toml(&bad),
            Err(DriverError::Config(_))
        ));
        assert!(matches!(
            ChannelConfig::from_toml("n_iter = "),
            Err(DriverError::Toml(_))
        ));
    }

    #[test]
    fn test_fluctuation_range() {
        for value in ["inf", "nan", "-0.1", "1.0", "1e308"].iter() {
            let line = format!("n_iter = 5\nfluctuation = {}", value);
            let bad = CHANNEL.replace("n_iter = 5", &line);
            assert!(
                matches!(ChannelConfig::from_toml(&bad), Err(DriverError::Config(_))),
                "fluctuation = {} was accepted",
                value
            );
        }
        let ok = CHANNEL.replace("n_iter = 5", "n_iter = 5\nfluctuation = 0.99");
        let mut channel =
            SyntheticChannel::new(ChannelConfig::from_toml(&ok).unwrap(), 0, 1).unwrap();
        assert!(step_lifecycle(&mut channel, 0).is_ok());
    }

    #[test]
    fn test_output_outside_lifecycle() {
        let mut channel = SyntheticChannel::new(ChannelConfig::from_toml(CHANNEL).unwrap(), 0, 1)
            .unwrap();
        assert!(matches!(
            channel.output(0),
            Err(DriverError::Solver {
                stage: LifecycleStage::Output,
                ..
            })
        ));
        step_lifecycle(&mut channel, 0).unwrap();
        assert!(channel.output(1).is_err());
    }

    #[test]
    fn test_log_law_values() {
        let mut channel = SyntheticChannel::new(ChannelConfig::from_toml(CHANNEL).unwrap(), 0, 1)
            .unwrap();
        step_lifecycle(&mut channel, 0).unwrap();
        let lower = MarkerId(0);
        // y+ = 0.1 * 5200 = 520
        approx_eq(
            channel.velocity_off_wall(lower, 3, 0),
            520f64.ln() / 0.41 + 5.2,
        );
        approx_eq(channel.velocity_gradient_off_wall(lower, 3, 0), 1. / 0.041);
        approx_eq(channel.vertex_coordinate_y(MarkerId(1), 0), 0.2);
        approx_eq(channel.wall_shear_stress_wmles(lower, 9), 1.);
        assert_eq!(channel.velocity_off_wall(lower, 3, 1), 0.);
        assert!(channel.wall_shear_stress_wmles(lower, 10).is_nan());
    }

    #[test]
    fn test_partition() {
        let config = ChannelConfig::from_toml(CHANNEL).unwrap();
        let counts: Vec<usize> = (0..3)
            .map(|rank| {
                SyntheticChannel::new(config.clone(), rank, 3)
                    .unwrap()
                    .number_vertices(MarkerId(1))
            })
            .collect();
        assert_eq!(counts, vec![3, 2, 2]);
        assert!(SyntheticChannel::new(config, 3, 3).is_err());
    }

    #[test]
    fn test_monitor_stop() {
        let mut channel = SyntheticChannel::new(ChannelConfig::from_toml(CHANNEL).unwrap(), 0, 1)
            .unwrap();
        assert_eq!(step_lifecycle(&mut channel, 2).unwrap(), MonitorStatus::Continue);
        assert_eq!(step_lifecycle(&mut channel, 3).unwrap(), MonitorStatus::Stop);
        assert!(channel.run().is_err());
    }

    #[test]
    fn test_fluctuations_bounded() {
        let config = CHANNEL.replace("n_iter = 5", "n_iter = 5\nfluctuation = 0.1");
        let mut channel =
            SyntheticChannel::new(ChannelConfig::from_toml(&config).unwrap(), 0, 1).unwrap();
        step_lifecycle(&mut channel, 0).unwrap();
        let mean = channel.log_law_velocity(0.1);
        for j in 0..10 {
            let u = channel.velocity_off_wall(MarkerId(0), j, 0);
            assert!((u - mean).abs() <= 0.1 * mean);
        }
    }
}
