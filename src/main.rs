use clap::{Parser, Subcommand, ValueEnum};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};
use xdpgate::config::{self, Config};
use xdpgate::dataplane::{RedirectTable, MAX_QUEUES};
use xdpgate::shadow::{ConsumerRing, Pipeline};
use xdpgate::telemetry::{channel, init_logging, EventObserver, MetricsRegistry};
use xdpgate::{ControlPlane, DecisionEngine, PolicyStore, RedirectMode};

const RING_CAPACITY: usize = 4096;

#[derive(Parser)]
#[command(name = "xdpgate")]
#[command(about = "Early-ingress packet classifier with whitelist policies")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify live traffic in shadow mode
    Run {
        /// Path to config.toml
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,

        /// Interface to capture on (overrides classifier.interface)
        #[arg(short, long)]
        interface: Option<String>,
    },
    /// Validate config.toml
    Validate {
        /// Path to config.toml
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,
    },
    /// Print the verdict for a synthetic frame
    Check {
        /// Path to config.toml
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,

        /// Source address of the frame
        #[arg(long)]
        src: IpAddr,

        /// Destination port (ignored for ICMP)
        #[arg(long, default_value_t = 0)]
        dst_port: u16,

        #[arg(long, value_enum, default_value_t = Sample::Tcp)]
        protocol: Sample,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Sample {
    Tcp,
    Udp,
    Icmp,
    Icmpv6,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { config, interface } => cmd_run(&config, interface),
        Commands::Validate { config } => {
            init_logging(None);
            cmd_validate(&config)
        }
        Commands::Check {
            config,
            src,
            dst_port,
            protocol,
        } => {
            init_logging(None);
            cmd_check(&config, src, dst_port, protocol)
        }
    };

    if let Err(e) = result {
        eprintln!("[ERROR] {}", e);
        std::process::exit(1);
    }
}

fn load_validated(config_path: &PathBuf) -> Result<Config, String> {
    let cfg = config::load(config_path).map_err(|e| format!("Failed to parse config: {}", e))?;

    let validation = config::validate(&cfg);
    validation.print_diagnostics();

    if validation.has_errors() {
        return Err("Validation failed with errors".to_string());
    }
    Ok(cfg)
}

fn cmd_validate(config_path: &PathBuf) -> Result<(), String> {
    println!("[INFO] Validating {}...", config_path.display());
    load_validated(config_path)?;
    println!("[INFO] Configuration is valid");
    Ok(())
}

fn cmd_check(
    config_path: &PathBuf,
    src: IpAddr,
    dst_port: u16,
    protocol: Sample,
) -> Result<(), String> {
    let cfg = load_validated(config_path)?;

    let engine = DecisionEngine::new(Arc::new(PolicyStore::new()));
    let control: ControlPlane<()> =
        ControlPlane::new(Arc::new(engine), Arc::new(RedirectTable::new()));
    control.apply(&cfg).map_err(|e| e.to_string())?;

    let frame = sample_frame(src, dst_port, protocol)?;
    let verdict = control.engine().classify(&frame, 0);

    println!("{}", verdict);
    Ok(())
}

/// Build an Ethernet frame carrying one packet from `src`.
fn sample_frame(src: IpAddr, dst_port: u16, protocol: Sample) -> Result<Vec<u8>, String> {
    use xdpgate::protocol::ethernet::FrameBuilder;
    use xdpgate::protocol::ipv4::Ipv4Builder;
    use xdpgate::protocol::ipv6::Ipv6Builder;
    use xdpgate::protocol::tcp::TcpBuilder;
    use xdpgate::protocol::udp::UdpBuilder;
    use xdpgate::protocol::{ip_proto, EtherType};

    // Echo request, checksum left zero
    let echo = [8u8, 0, 0, 0, 0, 1, 0, 1];
    let echo_v6 = [128u8, 0, 0, 0, 0, 1, 0, 1];

    let (proto, transport) = match (protocol, src) {
        (Sample::Tcp, _) => (
            ip_proto::TCP,
            TcpBuilder::new().src_port(40000).dst_port(dst_port).build(),
        ),
        (Sample::Udp, _) => (
            ip_proto::UDP,
            UdpBuilder::new().src_port(40000).dst_port(dst_port).build(),
        ),
        (Sample::Icmp, IpAddr::V4(_)) => (ip_proto::ICMP, echo.to_vec()),
        (Sample::Icmpv6, IpAddr::V6(_)) => (ip_proto::ICMPV6, echo_v6.to_vec()),
        (Sample::Icmp, IpAddr::V6(_)) => return Err("icmp frame needs an IPv4 source".into()),
        (Sample::Icmpv6, IpAddr::V4(_)) => {
            return Err("icmpv6 frame needs an IPv6 source".into())
        }
    };

    let (ethertype, packet) = match src {
        IpAddr::V4(addr) => (
            EtherType::Ipv4,
            Ipv4Builder::new()
                .protocol(proto)
                .src_addr(addr)
                .dst_addr(Ipv4Addr::new(192, 0, 2, 1))
                .payload(&transport)
                .build(),
        ),
        IpAddr::V6(addr) => (
            EtherType::Ipv6,
            Ipv6Builder::new()
                .next_header(proto)
                .src_addr(addr)
                .dst_addr(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1))
                .payload(&transport)
                .build(),
        ),
    };

    Ok(FrameBuilder::new()
        .ethertype(ethertype as u16)
        .payload(&packet)
        .build())
}

fn cmd_run(config_path: &PathBuf, interface: Option<String>) -> Result<(), String> {
    use tokio::runtime::Runtime;
    use xdpgate::capture::AfPacketSocket;

    let cfg = load_validated(config_path)?;
    init_logging(Some(&cfg.logging));

    let iface_name = interface
        .or_else(|| cfg.classifier.interface.clone())
        .ok_or_else(|| "No interface configured (use --interface)".to_string())?;

    info!("Loading {}...", config_path.display());

    let (emitter, receiver) = channel(cfg.classifier.event_capacity);
    let metrics = Arc::new(MetricsRegistry::new());
    let engine = Arc::new(
        DecisionEngine::new(Arc::new(PolicyStore::new()))
            .with_events(Arc::new(emitter))
            .with_metrics(Arc::clone(&metrics)),
    );
    let redirects: Arc<RedirectTable<ConsumerRing>> = Arc::new(RedirectTable::new());
    let control = ControlPlane::new(Arc::clone(&engine), Arc::clone(&redirects));
    control.apply(&cfg).map_err(|e| e.to_string())?;

    let stop = Arc::new(AtomicBool::new(false));
    let mut workers: Vec<JoinHandle<()>> = Vec::new();

    // AF_PACKET reports every frame on queue 0
    let queue = match engine.redirect_mode() {
        RedirectMode::Fixed(queue) => queue,
        RedirectMode::ArrivalQueue => 0,
    };
    if queue as usize >= MAX_QUEUES {
        return Err(format!("Redirect queue {} out of range", queue));
    }
    let (ring, frames) = ConsumerRing::new(queue, RING_CAPACITY);
    control
        .set_redirect_target(queue, ring)
        .map_err(|e| e.to_string())?;
    workers.push(spawn_consumer(queue, frames, Arc::clone(&stop)));

    let observer = EventObserver::new(receiver);
    let observer_stop = Arc::clone(&stop);
    workers.push(std::thread::spawn(move || {
        let stats = observer.run(&observer_stop);
        debug!(
            rendered = stats.rendered,
            malformed = stats.malformed,
            lost = stats.lost,
            "Event observer stopped"
        );
    }));

    let rt = Runtime::new().map_err(|e| format!("Failed to create runtime: {}", e))?;
    let pipeline = Pipeline::new(Arc::clone(&engine), Arc::clone(&redirects));

    let served = rt.block_on(async {
        let mut socket = AfPacketSocket::bind(&iface_name)?;
        info!(interface = %iface_name, "Classifier running in shadow mode");

        xdpgate::shadow::serve(&mut socket, &pipeline, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    });

    stop.store(true, Ordering::Relaxed);
    // Drop the ring senders so consumers see a closed channel
    let _ = control.clear_redirect_target(queue);
    drop(pipeline);
    for worker in workers {
        let _ = worker.join();
    }

    for (name, value) in metrics.export() {
        info!("{} = {}", name, value);
    }

    let frames = served.map_err(|e| e.to_string())?;
    info!(frames, "Classifier stopped");
    Ok(())
}

/// Drain one consumer ring, standing in for a zero-copy socket reader.
fn spawn_consumer(
    queue: u32,
    frames: crossbeam_channel::Receiver<Vec<u8>>,
    stop: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let mut count = 0u64;
        let mut bytes = 0u64;

        while !stop.load(Ordering::Relaxed) {
            match frames.recv_timeout(Duration::from_millis(100)) {
                Ok(frame) => {
                    count += 1;
                    bytes += frame.len() as u64;
                }
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
            }
        }

        info!(queue, frames = count, bytes, "Consumer ring closed");
    })
}
