//! pulse: paced udp egress daemon.
//!
//! thin orchestration: init -> wire -> run

use log::{error, info};
use pulse_core::{Config, Producer, Refill};
use pulse_egress::device::UdpDevice;
use pulse_egress::EgressWorker;
use pulse_pool::{LockedPool, PoolKind, SwapPool};
use pulse_traits::{PacketPool, RawPacket};
use std::env;
use std::process;
use std::sync::Arc;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // init logger with nanosecond timestamps
    {
        use std::io::Write;
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .format(|buf, record| {
                let ts = buf.timestamp_nanos();
                writeln!(
                    buf,
                    "[{} {:5} {}:{}] {}",
                    ts,
                    record.level(),
                    record.module_path().unwrap_or(""),
                    record.line().unwrap_or(0),
                    record.args()
                )
            })
            .init();
    }

    let args: Vec<String> = env::args().collect();
    let config = match Config::parse(&args, |key| env::var(key).ok()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("[core] {}", e);
            process::exit(2);
        }
    };

    info!("[core] starting");
    info!("[core] target={} bind={}", config.target_addr, config.bind_addr);
    info!(
        "[core] pool={:?} packets={} payload={}",
        config.pool, config.packet_count, config.payload_size
    );
    info!("[core] cores: egress={:?}", config.allocation.egress);

    let device = match UdpDevice::<RawPacket>::bind(
        config.bind_addr,
        config.target_addr,
        config.port_id,
    ) {
        Ok(device) => Arc::new(device),
        Err(e) => {
            error!("[core] failed to bind udp device: {}", e);
            process::exit(1);
        }
    };

    let result = match config.pool {
        PoolKind::Locked => {
            let pool: LockedPool<u64, RawPacket> = LockedPool::with_capacity(config.packet_count);
            run(&config, device, Arc::new(pool)).await
        }
        PoolKind::Swap => run(&config, device, Arc::new(SwapPool::new())).await,
    };

    if let Err(e) = result {
        error!("[core] {}", e);
        process::exit(1);
    }
    info!("[core] done");
}

async fn run<P>(
    config: &Config,
    device: Arc<UdpDevice<RawPacket>>,
    pool: Arc<P>,
) -> Result<(), Box<dyn std::error::Error>>
where
    P: PacketPool<Packet = RawPacket> + Refill + 'static,
{
    let producer = Producer::spawn(
        Arc::clone(&pool),
        config.packet_count,
        config.payload_size,
        config.refresh_interval,
    )?;

    let worker = Arc::new(EgressWorker::with_defaults(
        device,
        pool,
        config.egress.clone(),
    )?);
    let handle = worker.spawn(config.worker_core())?;
    info!("[core] ready");

    // wait for ctrl+c
    tokio::signal::ctrl_c().await.ok();

    info!("[core] shutting down...");
    worker.stop();
    let clean = handle.join().unwrap_or(false);
    let refreshes = producer.stop();

    let stats = worker.stats();
    info!(
        "[core] cycles={} packets={} retries={} aborted={} faults={} refreshes={} clean={}",
        stats.cycles,
        stats.packets_sent,
        stats.retries,
        stats.aborted_cycles,
        stats.faults,
        refreshes,
        clean
    );
    Ok(())
}
