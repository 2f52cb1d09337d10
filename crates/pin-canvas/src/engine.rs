//! Scene persistence and deterministic rasterization. Canvases and images
//! live in the external [`KvStore`]; the engine caches nothing across calls.

use crate::error::CanvasError;
use crate::json;
use crate::types::{Canvas, Element, ImageFormat, ImageStoreEntry, MAX_ELEMENTS, MAX_IMAGE_BYTES};
use pin_bus::PanelBus;
use pin_config::KvStore;
use pin_panel::{DisplayService, Panel, RefreshMode};
use pin_events::PinError;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

const CANVAS_PREFIX: &str = "canvas:";
const IMAGE_PREFIX: &str = "image:";
const IMAGE_META_SUFFIX: &str = "_meta";

fn now_unix() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as u32
}

/// Serializes canvas mutations so two callers never interleave a
/// read-modify-write on the same canvas store. The lock is held only for
/// the duration of a single operation, never across an `.await`.
pub struct CanvasEngine<K: KvStore> {
    kv: K,
    mutation_lock: Mutex<()>,
}

impl<K: KvStore> CanvasEngine<K> {
    pub fn new(kv: K) -> Self {
        Self {
            kv,
            mutation_lock: Mutex::new(()),
        }
    }

    fn canvas_key(id: &str) -> String {
        format!("{CANVAS_PREFIX}{id}")
    }

    fn image_key(id: &str) -> String {
        format!("{IMAGE_PREFIX}{id}")
    }

    fn image_meta_key(id: &str) -> String {
        format!("{IMAGE_PREFIX}{id}{IMAGE_META_SUFFIX}")
    }

    fn load(&self, id: &str) -> Result<Canvas, CanvasError> {
        let blob = self
            .kv
            .get_blob(&Self::canvas_key(id))
            .map_err(|e| CanvasError::StorageFail(e.to_string()))?
            .ok_or_else(|| CanvasError::NotFound(id.to_string()))?;
        let json_str = String::from_utf8(blob)
            .map_err(|e| CanvasError::InvalidArgument(format!("corrupt canvas blob: {e}")))?;
        json::import(&json_str)
    }

    fn save(&self, canvas: &Canvas) -> Result<(), CanvasError> {
        let json_str = json::export(canvas)?;
        self.kv
            .set_blob(&Self::canvas_key(&canvas.id), json_str.as_bytes())
            .map_err(|e| CanvasError::StorageFail(e.to_string()))?;
        self.kv.commit().map_err(|e| CanvasError::StorageFail(e.to_string()))
    }

    pub fn create(&self, id: &str, name: &str) -> Result<Canvas, CanvasError> {
        let _guard = self.mutation_lock.lock().expect("canvas mutation lock poisoned");
        if self.kv.get_blob(&Self::canvas_key(id)).ok().flatten().is_some() {
            return Err(CanvasError::Duplicate(id.to_string()));
        }
        let canvas = Canvas::new(id, name, now_unix());
        self.save(&canvas)?;
        info!(target: "canvas", id, "canvas created");
        Ok(canvas)
    }

    pub fn delete(&self, id: &str) -> Result<(), CanvasError> {
        let _guard = self.mutation_lock.lock().expect("canvas mutation lock poisoned");
        self.kv
            .erase(&Self::canvas_key(id))
            .map_err(|e| CanvasError::StorageFail(e.to_string()))
    }

    pub fn get(&self, id: &str) -> Result<Canvas, CanvasError> {
        self.load(id)
    }

    pub fn update(&self, canvas: &Canvas) -> Result<(), CanvasError> {
        let _guard = self.mutation_lock.lock().expect("canvas mutation lock poisoned");
        let mut canvas = canvas.clone();
        canvas.modified_time = now_unix();
        self.save(&canvas)
    }

    pub fn list(&self) -> Result<Vec<String>, CanvasError> {
        let keys = self
            .kv
            .keys_with_prefix(CANVAS_PREFIX)
            .map_err(|e| CanvasError::StorageFail(e.to_string()))?;
        Ok(keys
            .into_iter()
            .map(|k| k.trim_start_matches(CANVAS_PREFIX).to_string())
            .collect())
    }

    pub fn add_element(&self, id: &str, element: Element) -> Result<(), CanvasError> {
        let _guard = self.mutation_lock.lock().expect("canvas mutation lock poisoned");
        let mut canvas = self.load(id)?;
        if canvas.elements.len() >= MAX_ELEMENTS {
            return Err(CanvasError::Full(canvas.elements.len()));
        }
        if canvas.elements.iter().any(|e| e.id == element.id) {
            return Err(CanvasError::Duplicate(element.id));
        }
        canvas.elements.push(element);
        canvas.modified_time = now_unix();
        self.save(&canvas)
    }

    pub fn update_element(&self, id: &str, element_id: &str, element: Element) -> Result<(), CanvasError> {
        let _guard = self.mutation_lock.lock().expect("canvas mutation lock poisoned");
        let mut canvas = self.load(id)?;
        let slot = canvas
            .elements
            .iter_mut()
            .find(|e| e.id == element_id)
            .ok_or_else(|| CanvasError::NotFound(element_id.to_string()))?;
        *slot = element;
        canvas.modified_time = now_unix();
        self.save(&canvas)
    }

    pub fn remove_element(&self, id: &str, element_id: &str) -> Result<(), CanvasError> {
        let _guard = self.mutation_lock.lock().expect("canvas mutation lock poisoned");
        let mut canvas = self.load(id)?;
        let before = canvas.elements.len();
        canvas.elements.retain(|e| e.id != element_id);
        if canvas.elements.len() == before {
            return Err(CanvasError::NotFound(element_id.to_string()));
        }
        canvas.modified_time = now_unix();
        self.save(&canvas)
    }

    pub fn store_image(&self, image_id: &str, bytes: &[u8], format: ImageFormat) -> Result<(), CanvasError> {
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(CanvasError::TooLarge(bytes.len()));
        }
        let meta = ImageStoreEntry {
            data: Vec::new(),
            format,
            size: bytes.len() as u32,
            stored_time: now_unix(),
        };
        let meta_json = serde_json::to_vec(&SerializableMeta::from(&meta))
            .map_err(|e| CanvasError::InvalidArgument(e.to_string()))?;
        self.kv
            .set_blob(&Self::image_key(image_id), bytes)
            .map_err(|e| CanvasError::StorageFail(e.to_string()))?;
        self.kv
            .set_blob(&Self::image_meta_key(image_id), &meta_json)
            .map_err(|e| CanvasError::StorageFail(e.to_string()))?;
        self.kv.commit().map_err(|e| CanvasError::StorageFail(e.to_string()))?;
        debug!(target: "canvas", image_id, bytes = bytes.len(), "image stored");
        Ok(())
    }

    pub fn delete_image(&self, image_id: &str) -> Result<(), CanvasError> {
        self.kv
            .erase(&Self::image_key(image_id))
            .and_then(|_| self.kv.erase(&Self::image_meta_key(image_id)))
            .map_err(|e| CanvasError::StorageFail(e.to_string()))
    }

    pub fn render<B: PanelBus>(&self, id: &str, panel: &mut Panel<B>) -> Result<(), CanvasError> {
        let canvas = self.load(id)?;
        crate::render::render(&canvas, panel);
        Ok(())
    }

    pub async fn display<B: PanelBus>(&self, id: &str, service: &DisplayService<B>) -> Result<(), PinError> {
        let canvas = self.load(id)?;
        {
            let guard = service
                .acquire(pin_panel::timing::OperationClass::Draw)
                .await?;
            let mut panel = guard.panel;
            crate::render::render(&canvas, &mut panel);
        }
        service.refresh(RefreshMode::Full).await?;
        Ok(())
    }

    pub fn export_json(&self, id: &str) -> Result<String, CanvasError> {
        let canvas = self.load(id)?;
        json::export(&canvas)
    }

    pub fn import_json(&self, json: &str) -> Result<Canvas, CanvasError> {
        json::import(json)
    }
}

#[derive(serde::Serialize)]
struct SerializableMeta {
    format: u8,
    size: u32,
    stored_time: u32,
}

impl From<&ImageStoreEntry> for SerializableMeta {
    fn from(e: &ImageStoreEntry) -> Self {
        Self {
            format: match e.format {
                ImageFormat::Bmp => 0,
                ImageFormat::Png => 1,
                ImageFormat::Jpg => 2,
            },
            size: e.size,
            stored_time: e.stored_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Bounds, ElementKind, ShapeKind};
    use pin_config::MemoryKvStore;
    use pin_panel::Color;

    fn engine() -> CanvasEngine<MemoryKvStore> {
        CanvasEngine::new(MemoryKvStore::new())
    }

    fn shape_element(id: &str) -> Element {
        Element {
            id: id.to_string(),
            bounds: Bounds { x: 0, y: 0, w: 10, h: 10 },
            z_index: 0,
            visible: true,
            kind: ElementKind::Shape {
                shape: ShapeKind::Rect,
                fill_color: Color::Black,
                border_color: Color::Black,
                border_width: 1,
                filled: true,
            },
        }
    }

    #[test]
    fn create_get_update_delete_round_trip() {
        let e = engine();
        let canvas = e.create("home", "Home").unwrap();
        assert_eq!(canvas.id, "home");
        let fetched = e.get("home").unwrap();
        assert_eq!(fetched.name, "Home");
        e.update(&fetched).unwrap();
        e.delete("home").unwrap();
        assert!(e.get("home").is_err());
    }

    #[test]
    fn create_duplicate_id_rejected() {
        let e = engine();
        e.create("home", "Home").unwrap();
        assert_eq!(e.create("home", "Again").unwrap_err(), CanvasError::Duplicate("home".to_string()));
    }

    #[test]
    fn add_element_enforces_uniqueness_and_limit() {
        let e = engine();
        e.create("home", "Home").unwrap();
        e.add_element("home", shape_element("a")).unwrap();
        assert_eq!(
            e.add_element("home", shape_element("a")).unwrap_err(),
            CanvasError::Duplicate("a".to_string())
        );
        for i in 1..MAX_ELEMENTS {
            e.add_element("home", shape_element(&format!("e{i}"))).unwrap();
        }
        match e.add_element("home", shape_element("overflow")) {
            Err(CanvasError::Full(n)) => assert_eq!(n, MAX_ELEMENTS),
            other => panic!("expected Full, got {other:?}"),
        }
    }

    #[test]
    fn update_and_remove_element() {
        let e = engine();
        e.create("home", "Home").unwrap();
        e.add_element("home", shape_element("a")).unwrap();
        let mut updated = shape_element("a");
        updated.visible = false;
        e.update_element("home", "a", updated).unwrap();
        let canvas = e.get("home").unwrap();
        assert!(!canvas.elements[0].visible);
        e.remove_element("home", "a").unwrap();
        assert!(e.get("home").unwrap().elements.is_empty());
    }

    #[test]
    fn store_image_rejects_oversize() {
        let e = engine();
        let bytes = vec![0u8; MAX_IMAGE_BYTES + 1];
        assert!(matches!(
            e.store_image("logo", &bytes, ImageFormat::Png),
            Err(CanvasError::TooLarge(_))
        ));
    }

    #[test]
    fn list_returns_created_canvases() {
        let e = engine();
        e.create("a", "A").unwrap();
        e.create("b", "B").unwrap();
        let mut ids = e.list().unwrap();
        ids.sort();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }
}
