//! The in-process pub/sub bus backing the host API's `emit`/`subscribe`
//! pair.

use std::collections::HashMap;
use std::sync::Mutex;

type Subscriber = Box<dyn Fn(&str) + Send + Sync>;

#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<HashMap<String, Vec<Subscriber>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, name: &str, callback: Subscriber) {
        self.subscribers
            .lock()
            .expect("bus lock poisoned")
            .entry(name.to_string())
            .or_default()
            .push(callback);
    }

    pub fn emit(&self, name: &str, payload: &str) {
        if let Some(subs) = self.subscribers.lock().expect("bus lock poisoned").get(name) {
            for sub in subs {
                sub(payload);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn subscriber_receives_emitted_payload() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        bus.subscribe("weather_updated", Box::new(move |payload| {
            seen_clone.lock().unwrap().push(payload.to_string());
        }));
        bus.emit("weather_updated", "72F");
        bus.emit("unrelated_topic", "ignored");
        assert_eq!(*seen.lock().unwrap(), vec!["72F".to_string()]);
    }
}
