//! Application-level event hub.
//!
//! The finalizer only ever emits [`AppEvent::ErrorDispatch`], but observers
//! register per event so more can be added without touching listeners.

use std::sync::{Arc, Mutex};

use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppEvent {
    /// An error was turned into a final response.
    ErrorDispatch,
}

impl AppEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppEvent::ErrorDispatch => "errorDispatch",
        }
    }
}

/// Payload of [`AppEvent::ErrorDispatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchEvent {
    pub method: String,
    pub url: String,
}

type Listener = Arc<dyn Fn(&DispatchEvent) + Send + Sync>;

#[derive(Default)]
pub struct App {
    listeners: Mutex<IndexMap<AppEvent, Vec<Listener>>>,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&self, event: AppEvent, listener: F)
    where
        F: Fn(&DispatchEvent) + Send + Sync + 'static,
    {
        let mut listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        listeners.entry(event).or_default().push(Arc::new(listener));
    }

    pub fn listener_count(&self, event: AppEvent) -> usize {
        let listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        listeners.get(&event).map_or(0, Vec::len)
    }

    /// Calls every listener of `event` in registration order.
    ///
    /// Returns whether any listener ran. Listeners are called outside the
    /// registry lock, so they may register further listeners.
    pub fn emit(&self, event: AppEvent, payload: &DispatchEvent) -> bool {
        let snapshot: Vec<Listener> = {
            let listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
            listeners.get(&event).cloned().unwrap_or_default()
        };

        tracing::trace!(event = event.as_str(), listeners = snapshot.len(), "emit");
        for listener in &snapshot {
            listener(payload);
        }
        !snapshot.is_empty()
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("error_dispatch_listeners", &self.listener_count(AppEvent::ErrorDispatch))
            .finish()
    }
}
