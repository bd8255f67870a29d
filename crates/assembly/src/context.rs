//! The explicit context every component receives.
//!
//! Store handles, the client scope, tunable windows and the link-rule
//! registry are built once per process and passed down. Nothing in the
//! engine reaches for ambient globals.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use arbor_config::AppConfig;
use arbor_core::event::{AssemblyEvent, EventBus};
use arbor_core::fragment::DEFAULT_CONFIDENCE;
use arbor_core::store::{DiagramStore, FragmentStore, Scope, Window};

use crate::links::LinkRegistry;

/// Windows and thresholds bounding one assembly run.
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblySettings {
    /// How far back fragment and diagram queries look
    pub recency: Duration,
    pub unassigned_limit: usize,
    pub partial_limit: usize,
    pub recent_diagram_limit: usize,
    /// Max age of an open diagram the secondary pass may extend
    pub extend_window: Duration,
    /// Assignments below this stay eligible for further diagrams
    pub partial_confidence_threshold: f64,
    pub default_confidence: f64,
}

impl Default for AssemblySettings {
    fn default() -> Self {
        Self {
            recency: Duration::days(7),
            unassigned_limit: 100,
            partial_limit: 50,
            recent_diagram_limit: 10,
            extend_window: Duration::days(1),
            partial_confidence_threshold: 0.9,
            default_confidence: DEFAULT_CONFIDENCE,
        }
    }
}

impl From<&AppConfig> for AssemblySettings {
    fn from(config: &AppConfig) -> Self {
        let w = &config.windows;
        Self {
            recency: Duration::days(i64::from(w.recency_days)),
            unassigned_limit: w.unassigned_limit,
            partial_limit: w.partial_limit,
            recent_diagram_limit: w.recent_diagram_limit,
            extend_window: Duration::hours(i64::from(w.extend_window_hours)),
            partial_confidence_threshold: w.partial_confidence_threshold,
            default_confidence: config.default_confidence,
        }
    }
}

/// Everything a run needs, constructed once and shared by reference.
pub struct AssemblyContext {
    pub fragments: Arc<dyn FragmentStore>,
    pub diagrams: Arc<dyn DiagramStore>,
    pub scope: Scope,
    pub settings: AssemblySettings,
    pub links: LinkRegistry,
    events: Option<Arc<EventBus>>,
}

impl AssemblyContext {
    pub fn new(fragments: Arc<dyn FragmentStore>, diagrams: Arc<dyn DiagramStore>, scope: Scope) -> Self {
        Self {
            fragments,
            diagrams,
            scope,
            settings: AssemblySettings::default(),
            links: LinkRegistry::with_defaults(),
            events: None,
        }
    }

    pub fn with_settings(mut self, settings: AssemblySettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_link_registry(mut self, links: LinkRegistry) -> Self {
        self.links = links;
        self
    }

    /// Attach an event bus; events are dropped when none is attached.
    pub fn with_events(mut self, bus: Arc<EventBus>) -> Self {
        self.events = Some(bus);
        self
    }

    pub(crate) fn publish(&self, event: AssemblyEvent) {
        if let Some(bus) = &self.events {
            bus.publish(event);
        }
    }

    pub fn unassigned_window(&self, now: DateTime<Utc>) -> Window {
        Window::trailing(now, self.settings.recency, self.settings.unassigned_limit)
    }

    pub fn partial_window(&self, now: DateTime<Utc>) -> Window {
        Window::trailing(now, self.settings.recency, self.settings.partial_limit)
    }

    pub fn diagram_window(&self, now: DateTime<Utc>) -> Window {
        Window::trailing(now, self.settings.recency, self.settings.recent_diagram_limit)
    }

    /// Open diagrams created after this instant may be extended.
    pub fn extend_since(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.settings.extend_window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_follow_config() {
        let mut config = AppConfig::default();
        config.windows.extend_window_hours = 6;
        config.windows.recency_days = 3;
        config.default_confidence = 0.5;

        let settings = AssemblySettings::from(&config);
        assert_eq!(settings.extend_window, Duration::hours(6));
        assert_eq!(settings.recency, Duration::days(3));
        assert_eq!(settings.default_confidence, 0.5);
    }

    #[test]
    fn windows_saturate_for_oversized_spans() {
        use arbor_store::InMemoryStore;

        let store = Arc::new(InMemoryStore::new());
        let settings = AssemblySettings {
            recency: Duration::days(200_000_000),
            extend_window: Duration::days(200_000_000),
            ..AssemblySettings::default()
        };
        let ctx = AssemblyContext::new(store.clone(), store, Scope::client(6))
            .with_settings(settings);
        let now = Utc::now();
        assert_eq!(ctx.unassigned_window(now).since, DateTime::<Utc>::MIN_UTC);
        assert_eq!(ctx.extend_since(now), DateTime::<Utc>::MIN_UTC);
    }

    #[test]
    fn default_settings_match_default_config() {
        assert_eq!(AssemblySettings::default(), AssemblySettings::from(&AppConfig::default()));
    }
}
