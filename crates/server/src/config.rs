use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub tick_rate: u32,
    pub unit_count: usize,
    pub patrol_radius: f32,
    pub patrol_points: usize,
    /// Pause between arriving and the next patrol order.
    pub idle_ms: u32,
    pub observers: Vec<SocketAddr>,
    pub run_for: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_rate: 20,
            unit_count: 8,
            patrol_radius: 20.0,
            patrol_points: 6,
            idle_ms: 1500,
            observers: Vec::new(),
            run_for: None,
        }
    }
}
