//! Pin device boot sequence: wires the panel driver, canvas engine,
//! plugin runtime, Wi-Fi provisioning FSM and OTA engine into a single
//! process and builds the HTTP surface over them. Every hardware-facing
//! trait (`PanelBus`, `WifiRadio`, `OtaTransport`, `UpdateSlots`) is
//! bound to its `Simulated*` implementation here; a real board port
//! swaps those constructors out without touching any other module.
//!
//! Split from `main.rs` so integration tests can build the router and
//! drive it over a loopback listener without spawning a subprocess.

mod clock_plugin;

use anyhow::{Context, Result};
use axum::Router;
use clap::Parser;
use pin_bus::SimulatedBus;
use pin_canvas::CanvasEngine;
use pin_config::{DeviceConfig, FileKvStore};
use pin_events::{Event, EventSourceRegistry, TickEventSource};
use pin_ota::{OtaEngine, SimulatedSlots, SimulatedTransport};
use pin_panel::{DisplayService, Panel};
use pin_plugin::{
    AllowList, EventBus, PluginCallbacks, PluginConfig, PluginContext, PluginMetadata, Registry, Supervisor,
    WidgetRegion,
};
use pin_wifi::{SimulatedRadio, WifiFsm};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Once};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

const FIRMWARE_VERSION: &str = env!("CARGO_PKG_VERSION");
const MANIFEST_URL: &str = "https://api.github.com/repos/pin-device/pin/releases/latest";
const DEVICE_NAME: &str = "pin-device";

/// CLI arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "pin", version, about = "Pin e-paper display device")]
pub struct Args {
    /// Optional configuration file path (overrides discovery of `pin.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Directory for persistent key/value storage (canvases, Wi-Fi credentials, settings).
    #[arg(long = "data-dir", default_value = "./pin-data")]
    pub data_dir: PathBuf,
    /// Address the HTTP surface binds to.
    #[arg(long = "bind", default_value = "0.0.0.0:8080")]
    pub bind: String,
}

pub struct AppStartup {
    log_guard: Option<WorkerGuard>,
}

impl Default for AppStartup {
    fn default() -> Self {
        Self::new()
    }
}

impl AppStartup {
    pub fn new() -> Self {
        Self { log_guard: None }
    }

    pub fn configure_logging(&mut self) -> Result<()> {
        let log_dir = Path::new(".");
        let log_path = log_dir.join("pin.log");
        if log_path.exists() {
            let _ = std::fs::remove_file(&log_path);
        }

        let file_appender = tracing_appender::rolling::never(log_dir, "pin.log");
        let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
        match tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(nb_writer)
            .try_init()
        {
            Ok(_) => self.log_guard = Some(guard),
            Err(_err) => {
                // Global tracing subscriber already installed (e.g. under test); drop guard.
            }
        }
        Ok(())
    }

    pub fn install_panic_hook() {
        static HOOK: Once = Once::new();
        HOOK.call_once(|| {
            let default_panic = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                tracing::error!(target: "runtime.panic", ?info, "panic");
                default_panic(info);
            }));
        });
    }
}

/// Registers the built-in clock plugin and drives it through
/// register → enable → initialize → running before handing it to the
/// worker loop, mirroring the sequence the plugin runtime's own tests use.
fn start_clock_plugin(
    registry: &Arc<Registry>,
    allowlist: &Arc<AllowList>,
    kv: &Arc<FileKvStore>,
    bus: &Arc<EventBus>,
) -> Result<()> {
    let name = clock_plugin::NAME;
    registry
        .register(
            PluginMetadata {
                name: name.to_string(),
                version: "1.0.0".to_string(),
                author: "pin".to_string(),
                description: "Shows the current time.".to_string(),
                homepage: String::new(),
                min_firmware_version: String::new(),
            },
            PluginConfig {
                auto_start: true,
                ..PluginConfig::default()
            },
            WidgetRegion { x: 0, y: 0, w: 96, h: 32 },
        )
        .context("registering clock plugin")?;
    registry.set_enabled(name, true).context("enabling clock plugin")?;
    registry
        .with_entry(name, |e| {
            e.runtime.mark_initialized().expect("loaded plugin can initialize");
            e.runtime.mark_running().expect("initialized plugin can run");
        })
        .context("marking clock plugin running")?;

    let host: Arc<dyn pin_plugin::HostApi> = Arc::new(pin_plugin::PluginHostHandle::new(
        name,
        registry.clone(),
        allowlist.clone(),
        kv.clone(),
        bus.clone(),
    ));

    let mut callbacks = clock_plugin::ClockPlugin::default();
    let region = registry.with_entry(name, |e| e.region).context("reading clock plugin region")?;
    let mut init_ctx = PluginContext::new(name.to_string(), region, host.as_ref());
    callbacks.init(&mut init_ctx).context("initializing clock plugin")?;

    pin_plugin::spawn_worker(registry.clone(), name.to_string(), Box::new(callbacks), host);
    Ok(())
}

fn load_device_config(args: &Args) -> DeviceConfig {
    match pin_config::load_from(args.config.clone()) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(target: "boot", error = %e, "failed to load device config, using defaults");
            DeviceConfig::default()
        }
    }
}

/// Drives the Wi-Fi FSM's `tick` once a second, off a [`TickEventSource`]
/// registered on an [`EventSourceRegistry`] the way every other async event
/// producer in this workspace would be registered. The FSM never reads the
/// wall clock itself, so this is the only place `now_ms` is sampled.
fn spawn_wifi_ticker<R, K>(wifi: Arc<Mutex<WifiFsm<R, K>>>)
where
    R: pin_wifi::WifiRadio + Send + 'static,
    K: pin_config::KvStore + Send + 'static,
{
    let (tx, mut rx) = tokio::sync::mpsc::channel(pin_events::EVENT_CHANNEL_CAP);
    let mut sources = EventSourceRegistry::new();
    sources.register(TickEventSource::new(std::time::Duration::from_secs(1)));
    sources.spawn_all(&tx);
    drop(tx);

    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let Event::Tick = event {
                let now = now_ms();
                let mut fsm = wifi.lock().expect("wifi fsm lock poisoned");
                if let Err(e) = fsm.tick(now) {
                    tracing::warn!(target: "wifi", error = %e, "tick failed");
                }
            }
        }
    });
}

fn now_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

fn device_mac() -> [u8; 6] {
    // No real radio is wired up in this simulated build; a board port
    // reads this from hardware instead of synthesizing it.
    [0x02, 0x00, 0x00, 0x00, 0x00, 0x01]
}

/// Wires every subsystem together and returns the finished router plus a
/// handle callers can use to request a graceful shutdown (the same
/// handle `/api/system/restart` and `/api/system/factory-reset` trigger
/// internally).
pub async fn build_app(args: &Args) -> Result<(Router, Arc<tokio::sync::Notify>)> {
    let config = load_device_config(args);

    std::fs::create_dir_all(&args.data_dir)
        .with_context(|| format!("creating data directory {}", args.data_dir.display()))?;
    let kv = Arc::new(FileKvStore::open(args.data_dir.clone()).context("opening key/value store")?);

    let panel = Panel::init(SimulatedBus::new()).context("initializing panel")?;
    let display = Arc::new(DisplayService::new(panel));

    let canvas = Arc::new(CanvasEngine::new(kv.clone()));

    let registry = Arc::new(Registry::new());
    let allowlist = Arc::new(AllowList::new(&["api.openweathermap.org", "worldtimeapi.org"]));
    let bus = Arc::new(EventBus::new());
    let registry_for_supervisor = registry.clone();
    let (_supervisor, _supervisor_handle) = Supervisor::spawn(registry_for_supervisor, |plugin, key| {
        tracing::debug!(target: "plugin.config", plugin, key, "config changed");
    });
    start_clock_plugin(&registry, &allowlist, &kv, &bus)?;

    let wifi_config = pin_wifi::WifiConfig {
        connect_timeout: std::time::Duration::from_secs(config.wifi.connect_timeout_secs),
        ..pin_wifi::WifiConfig::default()
    };
    let wifi = Arc::new(Mutex::new(WifiFsm::new(
        SimulatedRadio::new(device_mac()),
        kv.clone(),
        Box::new(pin_wifi::XorBase64Cipher::default()),
        wifi_config,
    )));
    spawn_wifi_ticker(wifi.clone());

    let ota_transport = Arc::new(SimulatedTransport::new());
    let ota_slots = Arc::new(SimulatedSlots::new(FIRMWARE_VERSION));
    let ota = Arc::new(OtaEngine::init(ota_transport, ota_slots).context("initializing OTA engine")?);

    let shutdown = Arc::new(tokio::sync::Notify::new());
    let shutdown_for_restart = shutdown.clone();
    let restart: Arc<dyn Fn(bool) + Send + Sync> = Arc::new(move |factory_reset: bool| {
        tracing::warn!(target: "boot", factory_reset, "restart requested, shutting down HTTP surface");
        shutdown_for_restart.notify_one();
    });

    let state = Arc::new(pin_http::AppState {
        display,
        canvas,
        plugins: registry,
        wifi,
        ota,
        settings_kv: kv,
        manifest_url: MANIFEST_URL.to_string(),
        device_name: DEVICE_NAME.to_string(),
        firmware_version: FIRMWARE_VERSION.to_string(),
        restart,
    });

    Ok((pin_http::build_router(state), shutdown))
}

pub async fn run(args: Args) -> Result<()> {
    info!(target: "boot", bind = %args.bind, data_dir = %args.data_dir.display(), "starting");

    let (app, shutdown) = build_app(&args).await?;

    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("binding {}", args.bind))?;
    info!(target: "boot", bind = %args.bind, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.notified().await })
        .await
        .context("serving HTTP surface")?;
    Ok(())
}
