mod config;
mod events;
mod server;
mod simulation;

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use config::ServerConfig;
use events::ServerEvent;
use server::SplineServer;

#[derive(Parser)]
#[command(name = "movespline-server")]
#[command(about = "Drives patrolling units and streams their spline packets to observers")]
struct Args {
    #[arg(short, long, default_value = "0.0.0.0:0")]
    bind: String,

    #[arg(short, long, help = "Observer address, may be repeated")]
    observer: Vec<SocketAddr>,

    #[arg(short, long, default_value_t = 20)]
    tick_rate: u32,

    #[arg(short, long, default_value_t = 8)]
    units: usize,

    #[arg(long, default_value_t = 20.0)]
    patrol_radius: f32,

    #[arg(long, default_value_t = 6)]
    patrol_points: usize,

    #[arg(long, default_value_t = 1500, help = "Rest between patrol legs in ms")]
    idle_ms: u32,

    #[arg(short, long, help = "Stop after this many seconds")]
    duration: Option<u64>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig {
        tick_rate: args.tick_rate,
        unit_count: args.units,
        patrol_radius: args.patrol_radius,
        patrol_points: args.patrol_points,
        idle_ms: args.idle_ms,
        observers: args.observer,
        run_for: args.duration.map(Duration::from_secs),
    };

    let mut server = SplineServer::new(&args.bind, config)
        .with_context(|| format!("failed to bind {}", args.bind))?;
    let local_addr = server.local_addr().context("socket has no local address")?;
    log::info!(
        "Server started on {} streaming to {} observers",
        local_addr,
        server.config().observers.len()
    );

    server.spawn_units();
    log::info!("Spawned {} patrolling units", server.registry().len());

    let running = server.running();
    while running.load(Ordering::SeqCst) {
        server.tick_once();
        for event in server.drain_events() {
            log_event(&event);
        }
        std::thread::sleep(Duration::from_millis(1));
    }

    server.shutdown();
    for event in server.drain_events() {
        log_event(&event);
    }

    let stats = server.stats();
    log::info!(
        "Server shutting down: {} packets, {} datagrams, {} bytes, {} send errors",
        stats.packets,
        stats.datagrams_sent,
        stats.bytes_sent,
        stats.send_errors
    );

    Ok(())
}

fn log_event(event: &ServerEvent) {
    match event {
        ServerEvent::UnitSpawned { guid, position } => {
            log::info!("Unit {:#x} spawned at {}", guid, position);
        }
        ServerEvent::SplineLaunched { guid, duration_ms } => {
            log::debug!("Unit {:#x} launched a {} ms spline", guid, duration_ms);
        }
        ServerEvent::OrderRejected { guid } => {
            log::warn!("Unit {:#x} rejected its patrol order", guid);
        }
        ServerEvent::UnitArrived { guid, position } => {
            log::debug!("Unit {:#x} arrived at {}", guid, position);
        }
        ServerEvent::UnitStopped { guid, position } => {
            log::info!("Unit {:#x} stopped at {}", guid, position);
        }
        ServerEvent::SendFailed { addr, message } => {
            log::error!("Send to {} failed: {}", addr, message);
        }
    }
}
