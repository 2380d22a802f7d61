use std::collections::{HashMap, VecDeque};
use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use glam::Vec3;

use movespline::{FixedTimestep, MessageSink, MovementFlags, UnitHandle, UnitRegistry};

use crate::config::ServerConfig;
use crate::events::ServerEvent;
use crate::simulation::{Patrol, PatrolStyle, patrol_route};

#[derive(Debug, Clone, Copy, Default)]
pub struct FanoutStats {
    pub packets: u64,
    pub datagrams_sent: u64,
    pub bytes_sent: u64,
    pub send_errors: u64,
}

/// Sends every encoded packet to a fixed list of UDP observers.
pub struct UdpFanout {
    socket: UdpSocket,
    observers: Vec<SocketAddr>,
    stats: FanoutStats,
    failures: Vec<(SocketAddr, String)>,
}

impl UdpFanout {
    pub fn bind(bind_addr: &str, observers: Vec<SocketAddr>) -> io::Result<Self> {
        let socket = UdpSocket::bind(bind_addr)?;
        Ok(Self {
            socket,
            observers,
            stats: FanoutStats::default(),
            failures: Vec::new(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn stats(&self) -> FanoutStats {
        self.stats
    }

    fn take_failures(&mut self) -> Vec<(SocketAddr, String)> {
        std::mem::take(&mut self.failures)
    }
}

impl MessageSink for UdpFanout {
    // Observers are external; the mover itself has no connection here.
    fn send_to_set(&mut self, mover: u64, payload: &[u8], _include_self: bool) {
        self.stats.packets += 1;
        for addr in &self.observers {
            match self.socket.send_to(payload, addr) {
                Ok(sent) => {
                    self.stats.datagrams_sent += 1;
                    self.stats.bytes_sent += sent as u64;
                }
                Err(e) => {
                    log::warn!("Dropped packet for {:#x} to {}: {}", mover, addr, e);
                    self.stats.send_errors += 1;
                    self.failures.push((*addr, e.to_string()));
                }
            }
        }
    }
}

pub struct SplineServer {
    fanout: UdpFanout,
    config: ServerConfig,
    registry: UnitRegistry,
    patrols: HashMap<UnitHandle, Patrol>,
    timestep: FixedTimestep,
    last_tick_time: Instant,
    running: Arc<AtomicBool>,
    start_time: Instant,
    pending_events: VecDeque<ServerEvent>,
}

impl SplineServer {
    pub fn new(bind_addr: &str, config: ServerConfig) -> io::Result<Self> {
        let fanout = UdpFanout::bind(bind_addr, config.observers.clone())?;

        Ok(Self {
            fanout,
            registry: UnitRegistry::new(),
            patrols: HashMap::new(),
            timestep: FixedTimestep::new(config.tick_rate),
            last_tick_time: Instant::now(),
            running: Arc::new(AtomicBool::new(true)),
            start_time: Instant::now(),
            pending_events: VecDeque::new(),
            config,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.fanout.local_addr()
    }

    pub fn running(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn registry(&self) -> &UnitRegistry {
        &self.registry
    }

    pub fn stats(&self) -> FanoutStats {
        self.fanout.stats()
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = ServerEvent> + '_ {
        self.pending_events.drain(..)
    }

    /// Spawns the configured units and sends each on its first leg.
    pub fn spawn_units(&mut self) {
        let spacing = self.config.patrol_radius * 3.0;
        for index in 0..self.config.unit_count {
            let style = PatrolStyle::for_index(index);
            let center = Vec3::new(spacing * (index / 3) as f32, spacing * (index % 3) as f32, 0.0);
            let route = patrol_route(
                center,
                self.config.patrol_radius,
                self.config.patrol_points,
                index as f32 * 0.7,
            );
            let mut patrol = Patrol::new(style, route);

            let handle = self.registry.spawn(patrol.start());
            let Some(unit) = self.registry.get_mut(handle) else {
                continue;
            };
            if style == PatrolStyle::Circuit {
                unit.movement_flags.insert(MovementFlags::CAN_FLY);
            }
            self.pending_events.push_back(ServerEvent::UnitSpawned {
                guid: handle.guid(),
                position: unit.position,
            });

            let event = match patrol.issue(unit, &mut self.fanout) {
                Some(duration_ms) => ServerEvent::SplineLaunched {
                    guid: handle.guid(),
                    duration_ms,
                },
                None => ServerEvent::OrderRejected {
                    guid: handle.guid(),
                },
            };
            self.pending_events.push_back(event);
            self.patrols.insert(handle, patrol);
        }
        self.collect_send_failures();
    }

    pub fn tick_once(&mut self) {
        let elapsed_ms = self.last_tick_time.elapsed().as_millis().min(u32::MAX as u128) as u32;
        // keep the sub-millisecond remainder for the next call
        self.last_tick_time += Duration::from_millis(u64::from(elapsed_ms));
        self.advance(elapsed_ms);

        if let Some(limit) = self.config.run_for {
            if self.uptime() >= limit {
                self.running.store(false, Ordering::SeqCst);
            }
        }
    }

    /// Runs every whole tick contained in `delta_ms`.
    pub fn advance(&mut self, delta_ms: u32) {
        self.timestep.accumulate(delta_ms);
        while self.timestep.consume_tick() {
            self.tick();
        }
        self.collect_send_failures();
    }

    fn tick(&mut self) {
        let step_ms = self.timestep.step_ms();

        for handle in self.registry.update(step_ms) {
            if let Some(unit) = self.registry.get(handle) {
                self.pending_events.push_back(ServerEvent::UnitArrived {
                    guid: handle.guid(),
                    position: unit.position,
                });
            }
            if let Some(patrol) = self.patrols.get_mut(&handle) {
                patrol.rest(self.config.idle_ms);
            }
        }

        for (handle, patrol) in self.patrols.iter_mut() {
            let Some(unit) = self.registry.get_mut(*handle) else {
                continue;
            };
            if unit.is_moving() || !patrol.countdown(step_ms) {
                continue;
            }
            let event = match patrol.issue(unit, &mut self.fanout) {
                Some(duration_ms) => ServerEvent::SplineLaunched {
                    guid: handle.guid(),
                    duration_ms,
                },
                None => ServerEvent::OrderRejected {
                    guid: handle.guid(),
                },
            };
            self.pending_events.push_back(event);
        }
    }

    /// Halts every moving unit so observers see them come to rest.
    pub fn shutdown(&mut self) {
        for unit in self.registry.units_mut() {
            if unit.is_moving() {
                unit.stop_moving(&mut self.fanout);
                self.pending_events.push_back(ServerEvent::UnitStopped {
                    guid: unit.guid,
                    position: unit.position,
                });
            }
        }
        self.collect_send_failures();
    }

    fn collect_send_failures(&mut self) {
        for (addr, message) in self.fanout.take_failures() {
            self.pending_events
                .push_back(ServerEvent::SendFailed { addr, message });
        }
    }
}
