//! The HTTP surface: one `axum::Router` wired to the domain engines.
//! Handlers stay thin — validation and persistence are the engines' job,
//! this layer only does extraction and error framing.

use crate::dto::{
    AddElementRequest, CanvasIdQuery, CanvasListResponse, CanvasSummaryDto, CheckUpdateResponse,
    CreateCanvasRequest, DisplayCanvasRequest, OkResponse, SetPluginEnabledRequest, StatusResponse,
    SystemStatus, WifiStatus,
};
use crate::error::ApiError;
use crate::image_sniff::detect_format;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use pin_bus::PanelBus;
use pin_canvas::CanvasEngine;
use pin_config::KvStore;
use pin_ota::{OtaEngine, OtaTransport, UpdateSlots};
use pin_panel::{DisplayService, RefreshMode};
use pin_plugin::{PluginSummary, Registry};
use pin_wifi::{WifiFsm, WifiRadio};
use std::sync::{Arc, Mutex};

pub struct AppState<B, K, R, T, S>
where
    B: PanelBus + Send,
    K: KvStore,
    R: WifiRadio,
    T: OtaTransport + 'static,
    S: UpdateSlots + 'static,
{
    pub display: Arc<DisplayService<B>>,
    pub canvas: Arc<CanvasEngine<K>>,
    pub plugins: Arc<Registry>,
    pub wifi: Arc<Mutex<WifiFsm<R, K>>>,
    pub ota: Arc<OtaEngine<T, S>>,
    /// Shares the same backing store `pin-canvas`/`pin-wifi` were
    /// constructed with (`K` is already an `Arc<...>` wrapper per
    /// `pin_config`'s blanket `KvStore` impl), under the `"settings"` key.
    pub settings_kv: K,
    pub manifest_url: String,
    pub device_name: String,
    pub firmware_version: String,
    /// Invoked for `/api/system/restart` (`false`) and
    /// `/api/system/factory-reset` (`true`); `pin-bin` wires this to the
    /// supervised-restart sequence. Defaults to a no-op in tests.
    pub restart: Arc<dyn Fn(bool) + Send + Sync>,
}

const SETTINGS_KEY: &str = "settings";

type SharedState<B, K, R, T, S> = Arc<AppState<B, K, R, T, S>>;

pub fn build_router<B, K, R, T, S>(state: SharedState<B, K, R, T, S>) -> Router
where
    B: PanelBus + Send + 'static,
    K: KvStore + 'static,
    R: WifiRadio + 'static,
    T: OtaTransport + 'static,
    S: UpdateSlots + 'static,
{
    Router::new()
        .route("/api/status", get(get_status::<B, K, R, T, S>))
        .route("/api/display/refresh", post(post_refresh::<B, K, R, T, S>))
        .route("/api/display/clear", post(post_clear::<B, K, R, T, S>))
        .route("/api/canvas", get(list_canvases::<B, K, R, T, S>).post(create_canvas::<B, K, R, T, S>))
        .route("/api/canvas/get", get(get_canvas::<B, K, R, T, S>))
        .route("/api/canvas/update", put(update_canvas::<B, K, R, T, S>))
        .route("/api/canvas/delete", delete(delete_canvas::<B, K, R, T, S>))
        .route("/api/canvas/display", post(display_canvas::<B, K, R, T, S>))
        .route("/api/canvas/element", post(add_element::<B, K, R, T, S>))
        .route("/api/images", post(upload_image::<B, K, R, T, S>))
        .route("/api/plugins", get(list_plugins::<B, K, R, T, S>))
        .route("/api/plugins/{name}", post(set_plugin_enabled::<B, K, R, T, S>))
        .route("/api/wifi/scan", get(wifi_scan::<B, K, R, T, S>))
        .route("/api/wifi/connect", post(wifi_connect::<B, K, R, T, S>))
        .route("/api/settings", get(get_settings::<B, K, R, T, S>).post(post_settings::<B, K, R, T, S>))
        .route("/api/system/restart", post(system_restart::<B, K, R, T, S>))
        .route("/api/system/factory-reset", post(system_factory_reset::<B, K, R, T, S>))
        .route("/api/system/check-update", get(system_check_update::<B, K, R, T, S>))
        .with_state(state)
}

async fn get_status<B, K, R, T, S>(State(state): State<SharedState<B, K, R, T, S>>) -> Json<StatusResponse>
where
    B: PanelBus + Send,
    K: KvStore,
    R: WifiRadio,
    T: OtaTransport,
    S: UpdateSlots,
{
    let wifi = state.wifi.lock().expect("wifi lock poisoned");
    let wifi_status = WifiStatus {
        connected: wifi.state() == pin_wifi::WifiFsmState::Connected,
        ssid: None,
        rssi: None,
    };
    Json(StatusResponse {
        firmware_version: state.firmware_version.clone(),
        device_name: state.device_name.clone(),
        battery_voltage: None,
        battery_percentage: None,
        wifi: wifi_status,
        system: SystemStatus::default(),
    })
}

async fn post_refresh<B, K, R, T, S>(State(state): State<SharedState<B, K, R, T, S>>) -> Result<StatusCode, ApiError>
where
    B: PanelBus + Send,
    K: KvStore,
    R: WifiRadio,
    T: OtaTransport,
    S: UpdateSlots,
{
    state.display.refresh(RefreshMode::Full).await?;
    Ok(StatusCode::OK)
}

async fn post_clear<B, K, R, T, S>(State(state): State<SharedState<B, K, R, T, S>>) -> Result<StatusCode, ApiError>
where
    B: PanelBus + Send,
    K: KvStore,
    R: WifiRadio,
    T: OtaTransport,
    S: UpdateSlots,
{
    state.display.clear(pin_panel::Color::White).await?;
    Ok(StatusCode::OK)
}

async fn list_canvases<B, K, R, T, S>(
    State(state): State<SharedState<B, K, R, T, S>>,
) -> Result<Json<CanvasListResponse>, ApiError>
where
    B: PanelBus + Send,
    K: KvStore,
    R: WifiRadio,
    T: OtaTransport,
    S: UpdateSlots,
{
    let ids = state.canvas.list().map_err(Into::<pin_events::PinError>::into)?;
    let mut canvases = Vec::with_capacity(ids.len());
    for id in &ids {
        let canvas = state.canvas.get(id).map_err(Into::<pin_events::PinError>::into)?;
        canvases.push(CanvasSummaryDto { id: canvas.id, name: canvas.name, modified_time: canvas.modified_time });
    }
    let total = canvases.len();
    Ok(Json(CanvasListResponse { canvases, total }))
}

async fn create_canvas<B, K, R, T, S>(
    State(state): State<SharedState<B, K, R, T, S>>,
    Json(req): Json<CreateCanvasRequest>,
) -> Result<StatusCode, ApiError>
where
    B: PanelBus + Send,
    K: KvStore,
    R: WifiRadio,
    T: OtaTransport,
    S: UpdateSlots,
{
    state.canvas.create(&req.id, &req.name).map_err(Into::<pin_events::PinError>::into)?;
    Ok(StatusCode::CREATED)
}

async fn get_canvas<B, K, R, T, S>(
    State(state): State<SharedState<B, K, R, T, S>>,
    Query(q): Query<CanvasIdQuery>,
) -> Result<String, ApiError>
where
    B: PanelBus + Send,
    K: KvStore,
    R: WifiRadio,
    T: OtaTransport,
    S: UpdateSlots,
{
    Ok(state.canvas.export_json(&q.id).map_err(Into::<pin_events::PinError>::into)?)
}

async fn update_canvas<B, K, R, T, S>(
    State(state): State<SharedState<B, K, R, T, S>>,
    body: String,
) -> Result<StatusCode, ApiError>
where
    B: PanelBus + Send,
    K: KvStore,
    R: WifiRadio,
    T: OtaTransport,
    S: UpdateSlots,
{
    let canvas = state.canvas.import_json(&body).map_err(Into::<pin_events::PinError>::into)?;
    state.canvas.update(&canvas).map_err(Into::<pin_events::PinError>::into)?;
    Ok(StatusCode::OK)
}

async fn delete_canvas<B, K, R, T, S>(
    State(state): State<SharedState<B, K, R, T, S>>,
    Query(q): Query<CanvasIdQuery>,
) -> Result<StatusCode, ApiError>
where
    B: PanelBus + Send,
    K: KvStore,
    R: WifiRadio,
    T: OtaTransport,
    S: UpdateSlots,
{
    state.canvas.delete(&q.id).map_err(Into::<pin_events::PinError>::into)?;
    Ok(StatusCode::OK)
}

async fn display_canvas<B, K, R, T, S>(
    State(state): State<SharedState<B, K, R, T, S>>,
    Json(req): Json<DisplayCanvasRequest>,
) -> Result<StatusCode, ApiError>
where
    B: PanelBus + Send,
    K: KvStore,
    R: WifiRadio,
    T: OtaTransport,
    S: UpdateSlots,
{
    state.canvas.display(&req.canvas_id, &state.display).await?;
    Ok(StatusCode::OK)
}

async fn add_element<B, K, R, T, S>(
    State(state): State<SharedState<B, K, R, T, S>>,
    Json(req): Json<AddElementRequest>,
) -> Result<StatusCode, ApiError>
where
    B: PanelBus + Send,
    K: KvStore,
    R: WifiRadio,
    T: OtaTransport,
    S: UpdateSlots,
{
    let element = pin_canvas::json::parse_element(req.element).map_err(Into::<pin_events::PinError>::into)?;
    state.canvas.add_element(&req.canvas_id, element).map_err(Into::<pin_events::PinError>::into)?;
    Ok(StatusCode::OK)
}

async fn upload_image<B, K, R, T, S>(
    State(state): State<SharedState<B, K, R, T, S>>,
    Query(q): Query<CanvasIdQuery>,
    body: axum::body::Bytes,
) -> Result<StatusCode, ApiError>
where
    B: PanelBus + Send,
    K: KvStore,
    R: WifiRadio,
    T: OtaTransport,
    S: UpdateSlots,
{
    let format = detect_format(&body)
        .ok_or_else(|| pin_events::PinError::InvalidArgument("unrecognized image format".to_string()))?;
    state.canvas.store_image(&q.id, &body, format).map_err(Into::<pin_events::PinError>::into)?;
    Ok(StatusCode::CREATED)
}

async fn list_plugins<B, K, R, T, S>(
    State(state): State<SharedState<B, K, R, T, S>>,
) -> Json<Vec<PluginSummary>>
where
    B: PanelBus + Send,
    K: KvStore,
    R: WifiRadio,
    T: OtaTransport,
    S: UpdateSlots,
{
    Json(state.plugins.list())
}

async fn set_plugin_enabled<B, K, R, T, S>(
    State(state): State<SharedState<B, K, R, T, S>>,
    Path(name): Path<String>,
    Json(req): Json<SetPluginEnabledRequest>,
) -> Result<Json<OkResponse>, ApiError>
where
    B: PanelBus + Send,
    K: KvStore,
    R: WifiRadio,
    T: OtaTransport,
    S: UpdateSlots,
{
    state.plugins.set_enabled(&name, req.enabled).map_err(Into::<pin_events::PinError>::into)?;
    Ok(Json(OkResponse::default()))
}

async fn wifi_scan<B, K, R, T, S>(
    State(state): State<SharedState<B, K, R, T, S>>,
) -> Result<Json<pin_wifi::portal::ScanResponse>, ApiError>
where
    B: PanelBus + Send,
    K: KvStore,
    R: WifiRadio,
    T: OtaTransport,
    S: UpdateSlots,
{
    let fsm = state.wifi.lock().expect("wifi lock poisoned");
    let response = pin_wifi::portal::handle_scan(&fsm).map_err(Into::<pin_events::PinError>::into)?;
    Ok(Json(response))
}

async fn wifi_connect<B, K, R, T, S>(
    State(state): State<SharedState<B, K, R, T, S>>,
    Json(req): Json<pin_wifi::portal::ConnectRequest>,
) -> Result<Json<pin_wifi::portal::ConnectResponse>, ApiError>
where
    B: PanelBus + Send,
    K: KvStore,
    R: WifiRadio,
    T: OtaTransport,
    S: UpdateSlots,
{
    let mut fsm = state.wifi.lock().expect("wifi lock poisoned");
    let response = pin_wifi::portal::handle_connect(&mut fsm, req).map_err(Into::<pin_events::PinError>::into)?;
    Ok(Json(response))
}

async fn get_settings<B, K, R, T, S>(
    State(state): State<SharedState<B, K, R, T, S>>,
) -> Result<String, ApiError>
where
    B: PanelBus + Send,
    K: KvStore,
    R: WifiRadio,
    T: OtaTransport,
    S: UpdateSlots,
{
    let blob = state.settings_kv.get_blob(SETTINGS_KEY).map_err(Into::<pin_events::PinError>::into)?;
    match blob {
        Some(bytes) => String::from_utf8(bytes)
            .map_err(|_| ApiError::from(pin_events::PinError::IntegrityFail("settings blob not utf8".to_string()))),
        None => Ok("{}".to_string()),
    }
}

async fn post_settings<B, K, R, T, S>(
    State(state): State<SharedState<B, K, R, T, S>>,
    body: String,
) -> Result<StatusCode, ApiError>
where
    B: PanelBus + Send,
    K: KvStore,
    R: WifiRadio,
    T: OtaTransport,
    S: UpdateSlots,
{
    let _: serde_json::Value = serde_json::from_str(&body)
        .map_err(|e| pin_events::PinError::InvalidArgument(format!("settings body: {e}")))?;
    state
        .settings_kv
        .set_blob(SETTINGS_KEY, body.as_bytes())
        .map_err(Into::<pin_events::PinError>::into)?;
    Ok(StatusCode::OK)
}

async fn system_restart<B, K, R, T, S>(
    State(state): State<SharedState<B, K, R, T, S>>,
) -> StatusCode
where
    B: PanelBus + Send,
    K: KvStore,
    R: WifiRadio,
    T: OtaTransport,
    S: UpdateSlots,
{
    (state.restart)(false);
    StatusCode::OK
}

async fn system_factory_reset<B, K, R, T, S>(
    State(state): State<SharedState<B, K, R, T, S>>,
) -> Result<StatusCode, ApiError>
where
    B: PanelBus + Send,
    K: KvStore,
    R: WifiRadio,
    T: OtaTransport,
    S: UpdateSlots,
{
    for key in state.settings_kv.keys_with_prefix("").map_err(Into::<pin_events::PinError>::into)? {
        state.settings_kv.erase(&key).map_err(Into::<pin_events::PinError>::into)?;
    }
    (state.restart)(true);
    Ok(StatusCode::OK)
}

async fn system_check_update<B, K, R, T, S>(
    State(state): State<SharedState<B, K, R, T, S>>,
) -> Result<Json<CheckUpdateResponse>, ApiError>
where
    B: PanelBus + Send,
    K: KvStore,
    R: WifiRadio,
    T: OtaTransport,
    S: UpdateSlots,
{
    state.ota.check_update(&state.manifest_url).map_err(Into::<pin_events::PinError>::into)?;
    let stats = state.ota.stats();
    Ok(Json(CheckUpdateResponse {
        update_available: stats.update_available,
        current_version: stats.current_version,
        available_update: stats.available_update,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::error_response;
    use pin_bus::SimulatedBus;
    use pin_config::MemoryKvStore;
    use pin_ota::{OtaEngine, SimulatedSlots, SimulatedTransport};
    use pin_panel::Panel;
    use pin_wifi::{SimulatedRadio, WifiConfig, WifiFsm, XorBase64Cipher};

    type TestState = SharedState<SimulatedBus, Arc<MemoryKvStore>, SimulatedRadio, SimulatedTransport, SimulatedSlots>;

    fn test_state_with_restart(restart: Arc<dyn Fn(bool) + Send + Sync>) -> TestState {
        let kv: Arc<MemoryKvStore> = Arc::new(MemoryKvStore::new());
        let panel = Panel::init(SimulatedBus::new()).unwrap();
        let display = Arc::new(DisplayService::new(panel));
        let canvas = Arc::new(CanvasEngine::new(kv.clone()));
        let plugins = Arc::new(Registry::new());
        let fsm = WifiFsm::new(
            SimulatedRadio::new([0; 6]),
            kv.clone(),
            Box::new(XorBase64Cipher::new(b"test-key".to_vec())),
            WifiConfig::default(),
        );
        let transport = Arc::new(SimulatedTransport::new());
        let slots = Arc::new(SimulatedSlots::new("1.0.0"));
        let ota = Arc::new(OtaEngine::init(transport, slots).unwrap());
        Arc::new(AppState {
            display,
            canvas,
            plugins,
            wifi: Arc::new(Mutex::new(fsm)),
            ota,
            settings_kv: kv,
            manifest_url: "https://example.invalid/manifest.json".to_string(),
            device_name: "pin-test".to_string(),
            firmware_version: "1.0.0".to_string(),
            restart,
        })
    }

    fn test_state() -> TestState {
        test_state_with_restart(Arc::new(|_factory_reset| {}))
    }

    #[tokio::test]
    async fn status_reports_firmware_version_and_disconnected_wifi() {
        let state = test_state();
        let Json(body) = get_status(State(state)).await;
        assert_eq!(body.firmware_version, "1.0.0");
        assert!(!body.wifi.connected);
    }

    #[tokio::test]
    async fn canvas_create_list_and_delete_round_trip() {
        let state = test_state();
        let status = create_canvas(
            State(state.clone()),
            Json(CreateCanvasRequest { id: "home".to_string(), name: "Home".to_string() }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);

        let Json(list) = list_canvases(State(state.clone())).await.unwrap();
        assert_eq!(list.total, 1);
        assert_eq!(list.canvases[0].id, "home");

        let status = delete_canvas(State(state), Query(CanvasIdQuery { id: "home".to_string() })).await.unwrap();
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn display_canvas_renders_and_runs_a_full_refresh() {
        let state = test_state();
        create_canvas(
            State(state.clone()),
            Json(CreateCanvasRequest { id: "home".to_string(), name: "Home".to_string() }),
        )
        .await
        .unwrap();

        let status = display_canvas(State(state.clone()), Json(DisplayCanvasRequest { canvas_id: "home".to_string() }))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::OK);
        let guard = state.display.acquire(pin_panel::timing::OperationClass::Draw).await.unwrap();
        assert_eq!(guard.panel.stats().full_refreshes, 1);
    }

    #[tokio::test]
    async fn get_canvas_missing_id_is_not_found() {
        let state = test_state();
        let err = get_canvas(State(state), Query(CanvasIdQuery { id: "missing".to_string() })).await.unwrap_err();
        assert_eq!(error_response(&err.0).0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn upload_image_rejects_unrecognized_signature() {
        let state = test_state();
        let err = upload_image(
            State(state),
            Query(CanvasIdQuery { id: "logo".to_string() }),
            axum::body::Bytes::from_static(&[0, 1, 2, 3]),
        )
        .await
        .unwrap_err();
        assert_eq!(error_response(&err.0).0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn upload_image_over_size_limit_reports_413() {
        let state = test_state();
        let mut body = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        body.resize(pin_canvas::MAX_IMAGE_BYTES + 1, 0);
        let err = upload_image(
            State(state),
            Query(CanvasIdQuery { id: "logo".to_string() }),
            axum::body::Bytes::from(body),
        )
        .await
        .unwrap_err();
        assert_eq!(error_response(&err.0).0, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn wifi_scan_sorts_by_descending_rssi() {
        let state = test_state();
        state.wifi.lock().unwrap().radio().set_scan_results(vec![
            pin_wifi::ScannedNetwork { ssid: "weak".to_string(), rssi: -80, auth: "wpa2".to_string(), channel: 6 },
            pin_wifi::ScannedNetwork { ssid: "strong".to_string(), rssi: -40, auth: "wpa2".to_string(), channel: 1 },
        ]);
        let Json(response) = wifi_scan(State(state)).await.unwrap();
        assert_eq!(response.networks[0].ssid, "strong");
    }

    #[tokio::test]
    async fn settings_round_trip_through_kv_store() {
        let state = test_state();
        let before = get_settings(State(state.clone())).await.unwrap();
        assert_eq!(before, "{}");

        let status = post_settings(State(state.clone()), r#"{"device_name":"desk"}"#.to_string()).await.unwrap();
        assert_eq!(status, StatusCode::OK);

        let after = get_settings(State(state)).await.unwrap();
        assert_eq!(after, r#"{"device_name":"desk"}"#);
    }

    #[tokio::test]
    async fn post_settings_rejects_invalid_json() {
        let state = test_state();
        let err = post_settings(State(state), "not json".to_string()).await.unwrap_err();
        assert_eq!(error_response(&err.0).0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn factory_reset_erases_settings_and_invokes_restart_hook() {
        use std::sync::atomic::{AtomicBool, Ordering};
        let called = Arc::new(AtomicBool::new(false));
        let flag = called.clone();
        let state = test_state_with_restart(Arc::new(move |factory_reset| {
            flag.store(factory_reset, Ordering::SeqCst);
        }));
        post_settings(State(state.clone()), r#"{"a":1}"#.to_string()).await.unwrap();

        let status = system_factory_reset(State(state.clone())).await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert!(called.load(Ordering::SeqCst));
        assert_eq!(get_settings(State(state)).await.unwrap(), "{}");
    }

    #[tokio::test]
    async fn check_update_without_a_reachable_manifest_surfaces_as_api_error() {
        let state = test_state();
        let err = system_check_update(State(state)).await.unwrap_err();
        assert_eq!(error_response(&err.0).0, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
