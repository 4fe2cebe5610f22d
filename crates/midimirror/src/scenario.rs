//! Scenario files: an initial object graph plus scripted changes.
//!
//! A scenario populates a `SimulatedSource` and then mutates it step by
//! step. Each step yields the notification a real MIDI subsystem would
//! send, unless it is marked `silent`, which models a missed callback that
//! only a later `setup-changed` can repair.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use midimirror_config::MirrorSettings;
use midimirror_core::{
    Category, EventLog, Handle, MidiObject, Mirror, MirrorEvent, NotificationPump, ObjectObserver,
    ParentRef, PropertySet, PropertyValue, SimulatedSource, SourceNotification, UniqueId, Wrapper,
};

use crate::error::CliError;

// ── File model ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,

    /// Objects present before the first reconciliation pass.
    #[serde(default)]
    pub objects: Vec<ObjectDef>,

    #[serde(default)]
    pub steps: Vec<Step>,
}

/// One object in the simulated graph.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObjectDef {
    /// Scenario-local name used by later steps.
    pub key: String,

    pub category: Category,

    pub unique_id: i32,

    #[serde(default)]
    pub properties: PropertySet,

    /// Key of the owning object.
    #[serde(default)]
    pub parent: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum Step {
    /// Create a new object under a fresh handle.
    Add {
        #[serde(flatten)]
        object: ObjectDef,
        #[serde(default)]
        silent: bool,
    },

    Remove {
        key: String,
        #[serde(default)]
        silent: bool,
    },

    SetProperty {
        key: String,
        name: String,
        value: PropertyValue,
        #[serde(default)]
        silent: bool,
    },

    /// Put a different object behind the handle previously used by `of`.
    ReuseHandle {
        of: String,
        #[serde(flatten)]
        object: ObjectDef,
        #[serde(default)]
        silent: bool,
    },

    SetupChanged,
}

impl Step {
    /// Short label for rendering.
    pub fn label(&self) -> String {
        match self {
            Self::Add { object, .. } => format!("add {}", object.key),
            Self::Remove { key, .. } => format!("remove {key}"),
            Self::SetProperty { key, name, .. } => format!("set-property {key}.{name}"),
            Self::ReuseHandle { of, object, .. } => format!("reuse-handle {of} -> {}", object.key),
            Self::SetupChanged => "setup-changed".into(),
        }
    }

    fn is_silent(&self) -> bool {
        match self {
            Self::Add { silent, .. }
            | Self::Remove { silent, .. }
            | Self::SetProperty { silent, .. }
            | Self::ReuseHandle { silent, .. } => *silent,
            Self::SetupChanged => false,
        }
    }
}

// ── Loading ─────────────────────────────────────────────────────────

impl Scenario {
    /// Read a scenario, choosing the parser by file extension.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let display = path.display().to_string();
        if !path.is_file() {
            return Err(CliError::ScenarioNotFound { path: display });
        }
        let text = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let parse_err = |reason: String| CliError::ScenarioParse {
            path: display.clone(),
            reason,
        };
        match ext.as_deref() {
            Some("toml") => toml::from_str(&text).map_err(|e| parse_err(e.to_string())),
            Some("yaml" | "yml") => serde_yaml::from_str(&text).map_err(|e| parse_err(e.to_string())),
            Some("json") => serde_json::from_str(&text).map_err(|e| parse_err(e.to_string())),
            _ => Err(CliError::ScenarioFormat { path: display }),
        }
    }
}

// ── Driving a simulated source ──────────────────────────────────────

/// Applies scenario objects and steps to a [`SimulatedSource`], tracking
/// which handle each key currently names.
pub struct ScenarioDriver {
    source: Arc<SimulatedSource>,
    handles: HashMap<String, ParentRef>,
}

impl ScenarioDriver {
    pub fn new(source: Arc<SimulatedSource>) -> Self {
        Self {
            source,
            handles: HashMap::new(),
        }
    }

    pub fn source(&self) -> &Arc<SimulatedSource> {
        &self.source
    }

    /// Handle currently bound to `key`.
    pub fn handle_of(&self, key: &str) -> Option<Handle> {
        self.handles.get(key).map(|r| r.handle)
    }

    /// Create the initial objects without emitting notifications.
    pub fn populate(&mut self, objects: &[ObjectDef]) -> Result<(), CliError> {
        for object in objects {
            let (parent, properties) = self.prepare(0, object)?;
            let handle = self.source.insert(
                object.category,
                UniqueId::new(object.unique_id),
                properties,
                parent,
            );
            self.bind(object, handle);
        }
        Ok(())
    }

    /// Apply step number `index` (1-based, for error messages). Returns
    /// the notification to deliver, if any.
    pub fn apply(
        &mut self,
        index: usize,
        step: &Step,
    ) -> Result<Option<SourceNotification>, CliError> {
        let notification = match step {
            Step::Add { object, .. } => {
                let (parent, properties) = self.prepare(index, object)?;
                let (handle, notification) = self.source.add(
                    object.category,
                    UniqueId::new(object.unique_id),
                    properties,
                    parent,
                );
                self.bind(object, handle);
                Some(notification)
            }
            Step::Remove { key, .. } => {
                let handle = self.lookup(index, key)?;
                self.handles.remove(key);
                self.source.remove(handle)
            }
            Step::SetProperty {
                key, name, value, ..
            } => {
                let handle = self.lookup(index, key)?;
                self.source.set_property(handle, name, value.clone())
            }
            Step::ReuseHandle { of, object, .. } => {
                let handle = self.lookup(index, of)?;
                let (parent, properties) = self.prepare(index, object)?;
                self.source.reuse_handle(
                    handle,
                    object.category,
                    UniqueId::new(object.unique_id),
                    properties,
                    parent,
                );
                self.handles.remove(of);
                self.bind(object, handle);
                // The removal of the previous occupant is never reported.
                Some(SourceNotification::Added {
                    handle,
                    category: object.category,
                    parent,
                })
            }
            Step::SetupChanged => Some(self.source.setup_changed()),
        };

        Ok(if step.is_silent() { None } else { notification })
    }

    fn lookup(&self, index: usize, key: &str) -> Result<Handle, CliError> {
        self.handle_of(key).ok_or_else(|| CliError::ScenarioStep {
            step: index,
            reason: format!("no live object with key '{key}'"),
        })
    }

    fn prepare(
        &self,
        index: usize,
        object: &ObjectDef,
    ) -> Result<(Option<ParentRef>, PropertySet), CliError> {
        let parent = match &object.parent {
            Some(key) => Some(*self.handles.get(key).ok_or_else(|| CliError::ScenarioStep {
                step: index,
                reason: format!("parent '{key}' of '{}' is not a live object", object.key),
            })?),
            None => None,
        };
        Ok((parent, object.properties.clone()))
    }

    fn bind(&mut self, object: &ObjectDef, handle: Handle) {
        self.handles.insert(
            object.key.clone(),
            ParentRef::new(handle, object.category),
        );
    }
}

// ── Replay ──────────────────────────────────────────────────────────

/// One wrapper reported to the observer, attributed to the step that
/// caused it. Step 0 is the initial full pass.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayEvent {
    pub step: usize,
    pub cause: String,
    pub kind: &'static str,
    pub category: Category,
    pub handle: Handle,
    pub unique_id: UniqueId,
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
}

/// Result of driving a scenario through a mirror.
#[derive(Debug)]
pub struct Replay {
    pub events: Vec<ReplayEvent>,
    pub mirror: Mirror,
    pub steps_applied: usize,
}

/// Populate a simulated source, mirror it, and feed every step's
/// notification through a [`NotificationPump`].
///
/// The pump is flushed after each step so observer events can be
/// attributed to the step that produced them.
pub async fn replay(
    scenario: &Scenario,
    settings: &MirrorSettings,
    initial_sync: bool,
    limit: Option<usize>,
) -> Result<Replay, CliError> {
    let source = Arc::new(SimulatedSource::new());
    let mut driver = ScenarioDriver::new(Arc::clone(&source));
    driver.populate(&scenario.objects)?;

    let mut mirror = settings.build_mirror(source);
    let log = Arc::new(EventLog::new());
    let observer: Arc<dyn ObjectObserver<MidiObject>> = log.clone();
    mirror.add_observer(&observer);

    let mut events = Vec::new();
    if initial_sync {
        mirror.refresh_all()?;
        record(&mut events, 0, "initial-sync", log.drain());
    }

    let pump = NotificationPump::spawn(mirror);
    let total = limit.map_or(scenario.steps.len(), |n| n.min(scenario.steps.len()));
    for (offset, step) in scenario.steps.iter().take(total).enumerate() {
        let index = offset + 1;
        match driver.apply(index, step)? {
            Some(notification) => {
                debug!(step = index, ?notification, "delivering");
                pump.send(notification)?;
            }
            None => debug!(step = index, "silent step"),
        }
        pump.flush().await?;
        record(&mut events, index, &step.label(), log.drain());
    }

    let mirror = pump.close().await?;
    Ok(Replay {
        events,
        mirror,
        steps_applied: total,
    })
}

fn record(
    out: &mut Vec<ReplayEvent>,
    step: usize,
    cause: &str,
    batch: Vec<MirrorEvent<MidiObject>>,
) {
    for event in batch {
        let property = match &event {
            MirrorEvent::PropertyChanged { property, .. } => Some(property.clone()),
            _ => None,
        };
        for object in event.objects() {
            out.push(ReplayEvent {
                step,
                cause: cause.to_owned(),
                kind: event.kind(),
                category: event.category(),
                handle: object.handle(),
                unique_id: object.unique_id(),
                name: object.label(),
                property: property.clone(),
            });
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use midimirror_core::{HandleSource, names};

    use super::*;

    const TOML: &str = r#"
        name = "studio"

        [[objects]]
        key = "synth"
        category = "device"
        unique_id = 100
        properties = { name = "Synth", manufacturer = "Acme" }

        [[objects]]
        key = "synth-port"
        category = "entity"
        unique_id = 101
        parent = "synth"

        [[steps]]
        op = "add"
        key = "out"
        category = "source"
        unique_id = 200
        parent = "synth-port"
        properties = { name = "Out 1" }

        [[steps]]
        op = "set-property"
        key = "out"
        name = "name"
        value = "Main Out"

        [[steps]]
        op = "remove"
        key = "out"
        silent = true

        [[steps]]
        op = "setup-changed"
    "#;

    #[test]
    fn parses_toml_scenario() {
        let scenario: Scenario = toml::from_str(TOML).unwrap();
        assert_eq!(scenario.name.as_deref(), Some("studio"));
        assert_eq!(scenario.objects.len(), 2);
        assert_eq!(scenario.steps.len(), 4);
        assert!(matches!(
            &scenario.steps[1],
            Step::SetProperty { value: PropertyValue::String(v), .. } if v == "Main Out"
        ));
    }

    #[test]
    fn driver_emits_notifications_and_honours_silent() {
        let scenario: Scenario = toml::from_str(TOML).unwrap();
        let mut driver = ScenarioDriver::new(Arc::new(SimulatedSource::new()));
        driver.populate(&scenario.objects).unwrap();

        let added = driver.apply(1, &scenario.steps[0]).unwrap().unwrap();
        let out = driver.handle_of("out").unwrap();
        assert!(matches!(
            added,
            SourceNotification::Added { category: Category::Source, parent: Some(p), .. }
                if p.category == Category::Entity
        ));

        driver.apply(2, &scenario.steps[1]).unwrap().unwrap();
        assert_eq!(
            driver.source().property(out, names::NAME).unwrap(),
            PropertyValue::from("Main Out")
        );

        assert!(driver.apply(3, &scenario.steps[2]).unwrap().is_none());
        assert!(driver.source().unique_id(out).is_err());
        assert!(driver.handle_of("out").is_none());
    }

    #[test]
    fn unknown_key_is_a_step_error() {
        let mut driver = ScenarioDriver::new(Arc::new(SimulatedSource::new()));
        let step = Step::Remove {
            key: "ghost".into(),
            silent: false,
        };
        let err = driver.apply(7, &step).unwrap_err();
        assert!(matches!(err, CliError::ScenarioStep { step: 7, .. }));
    }

    #[test]
    fn reuse_handle_keeps_handle_and_changes_identity() {
        let mut driver = ScenarioDriver::new(Arc::new(SimulatedSource::new()));
        let objects = vec![ObjectDef {
            key: "a".into(),
            category: Category::Destination,
            unique_id: 1,
            properties: PropertySet::new(),
            parent: None,
        }];
        driver.populate(&objects).unwrap();
        let handle = driver.handle_of("a").unwrap();

        let step = Step::ReuseHandle {
            of: "a".into(),
            object: ObjectDef {
                key: "b".into(),
                category: Category::Destination,
                unique_id: 2,
                properties: PropertySet::new(),
                parent: None,
            },
            silent: false,
        };
        let note = driver.apply(1, &step).unwrap().unwrap();
        assert_eq!(note.handle(), Some(handle));
        assert_eq!(driver.handle_of("b"), Some(handle));
        assert_eq!(driver.source().unique_id(handle).unwrap(), UniqueId::new(2));
    }

    #[test]
    fn load_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.txt");
        std::fs::write(&path, "").unwrap();
        assert!(matches!(
            Scenario::load(&path).unwrap_err(),
            CliError::ScenarioFormat { .. }
        ));
        assert!(matches!(
            Scenario::load(&dir.path().join("missing.toml")).unwrap_err(),
            CliError::ScenarioNotFound { .. }
        ));
    }

    #[tokio::test]
    async fn replay_attributes_events_to_steps() {
        let scenario: Scenario = toml::from_str(TOML).unwrap();
        let replay = replay(&scenario, &MirrorSettings::default(), true, None)
            .await
            .unwrap();

        let at = |step: usize| -> Vec<(&str, Category)> {
            replay
                .events
                .iter()
                .filter(|e| e.step == step)
                .map(|e| (e.kind, e.category))
                .collect()
        };
        assert_eq!(
            at(0),
            vec![("added", Category::Device), ("added", Category::Entity)]
        );
        assert_eq!(at(1), vec![("added", Category::Source)]);
        assert_eq!(at(2), vec![("changed", Category::Source)]);
        assert!(at(3).is_empty());
        assert_eq!(at(4), vec![("removed", Category::Source)]);

        assert_eq!(replay.steps_applied, 4);
        assert!(replay.mirror.list(Category::Source).unwrap().is_empty());
        assert_eq!(replay.mirror.len(), 2);
    }

    #[tokio::test]
    async fn replay_honours_step_limit_and_skipped_sync() {
        let scenario: Scenario = toml::from_str(TOML).unwrap();
        let replay = replay(&scenario, &MirrorSettings::default(), false, Some(1))
            .await
            .unwrap();

        assert_eq!(replay.steps_applied, 1);
        assert!(replay.events.iter().all(|e| e.step == 1));
        assert_eq!(replay.events.len(), 1);
        assert_eq!(replay.events[0].name.as_deref(), Some("Out 1"));
    }
}
