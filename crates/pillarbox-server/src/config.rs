use std::fs;
use std::time::Duration;

use anyhow::{bail, Result};
use pillarbox_core::engine::SimulatedMedia;
use pillarbox_core::{BridgeConfig, DuplicatePolicy, DEFAULT_EVENT_BUS_CAPACITY};
use pillarbox_models::channel::{ChannelNamespaces, DEFAULT_NAMESPACE, DEFAULT_VIEW_NAMESPACE};
use pillarbox_models::playback::{PositionEventName, VideoSize};
use pillarbox_ws::GatewaySettings;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub bridge: BridgeSection,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct BridgeSection {
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_view_namespace")]
    pub view_namespace: String,
    #[serde(default)]
    pub position_event: PositionEventName,
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
    #[serde(default = "default_true")]
    pub dispose_on_disconnect: bool,
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

impl Default for BridgeSection {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            view_namespace: default_view_namespace(),
            position_event: PositionEventName::default(),
            duplicate_policy: DuplicatePolicy::default(),
            dispose_on_disconnect: true,
            event_bus_capacity: default_event_bus_capacity(),
        }
    }
}

/// Parameters of the simulated engine.
#[derive(Debug, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default = "default_buffering_ms")]
    pub buffering_ms: u64,
    #[serde(default = "default_duration_ms")]
    pub default_duration_ms: u64,
    #[serde(default = "default_video_width")]
    pub video_width: u32,
    #[serde(default = "default_video_height")]
    pub video_height: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            buffering_ms: default_buffering_ms(),
            default_duration_ms: default_duration_ms(),
            video_width: default_video_width(),
            video_height: default_video_height(),
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub wire_trace: bool,
}

fn default_bind_address() -> String {
    "127.0.0.1:8090".into()
}
fn default_namespace() -> String {
    DEFAULT_NAMESPACE.into()
}
fn default_view_namespace() -> String {
    DEFAULT_VIEW_NAMESPACE.into()
}
fn default_true() -> bool {
    true
}
fn default_event_bus_capacity() -> usize {
    DEFAULT_EVENT_BUS_CAPACITY
}
fn default_buffering_ms() -> u64 {
    250
}
fn default_duration_ms() -> u64 {
    60_000
}
fn default_video_width() -> u32 {
    1920
}
fn default_video_height() -> u32 {
    1080
}

fn generate_config_template(config: &Config) -> String {
    format!(
        r#"# Pillarbox Bridge Configuration
# Generated automatically on first run. Edit as needed.

[server]
bind_address = "{bind_address}"

[bridge]
# Control channel name; sessions live on "<namespace>/<identifier>".
namespace = "{namespace}"
# View factory channel; standalone views live on "<view_namespace>/<view_id>".
view_namespace = "{view_namespace}"
# Name of the sampled position event: "current_position" or "position".
position_event = "{position_event}"
# initialize with a live identifier: "reject" or "replace".
duplicate_policy = "{duplicate_policy}"
dispose_on_disconnect = {dispose_on_disconnect}
event_bus_capacity = {event_bus_capacity}

[engine]
buffering_ms = {buffering_ms}
default_duration_ms = {default_duration_ms}
video_width = {video_width}
video_height = {video_height}

[logging]
# Log every channel frame on the "wire" target.
wire_trace = {wire_trace}
"#,
        bind_address = config.server.bind_address,
        namespace = config.bridge.namespace,
        view_namespace = config.bridge.view_namespace,
        position_event = config.bridge.position_event.as_str(),
        duplicate_policy = match config.bridge.duplicate_policy {
            DuplicatePolicy::Reject => "reject",
            DuplicatePolicy::Replace => "replace",
        },
        dispose_on_disconnect = config.bridge.dispose_on_disconnect,
        event_bus_capacity = config.bridge.event_bus_capacity,
        buffering_ms = config.engine.buffering_ms,
        default_duration_ms = config.engine.default_duration_ms,
        video_width = config.engine.video_width,
        video_height = config.engine.video_height,
        wire_trace = config.logging.wire_trace,
    )
}

// ── Config Loading ───────────────────────────────────────────────────────────

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let mut config = if std::path::Path::new(path).exists() {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            tracing::info!("Config file not found at '{}', generating defaults...", path);
            let config = Config::default();

            if let Some(parent) = std::path::Path::new(path).parent() {
                fs::create_dir_all(parent)?;
            }

            fs::write(path, generate_config_template(&config))?;
            tracing::info!("Generated default config at '{}'", path);
            config
        };

        config.apply_env_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Rejects channel namespaces that would shadow each other.
    pub fn validate(&self) -> Result<()> {
        let control = self.bridge.namespace.as_str();
        let view = self.bridge.view_namespace.as_str();
        if control.is_empty() || view.is_empty() {
            bail!("bridge.namespace and bridge.view_namespace must not be empty");
        }
        if control == view {
            bail!("bridge.namespace and bridge.view_namespace are both '{control}'");
        }
        for namespace in [control, view] {
            // "<a>/<integer>" would read as a session or view channel.
            if let Some((_, suffix)) = namespace.rsplit_once('/') {
                if suffix.parse::<i64>().is_ok() {
                    bail!("namespace '{namespace}' collides with a session or view channel name");
                }
            }
        }
        Ok(())
    }

    /// Applies `PILLARBOX_*` overrides read through `lookup`.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup("PILLARBOX_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = lookup("PILLARBOX_NAMESPACE") {
            self.bridge.namespace = value;
        }
        if let Some(value) = lookup("PILLARBOX_DUPLICATE_POLICY") {
            match value.trim().parse::<DuplicatePolicy>() {
                Ok(policy) => self.bridge.duplicate_policy = policy,
                Err(_) => {
                    tracing::warn!(
                        "Ignoring invalid PILLARBOX_DUPLICATE_POLICY value '{}'; expected reject or replace",
                        value
                    );
                }
            }
        }
        if let Some(value) = lookup("PILLARBOX_WIRE_TRACE") {
            if let Ok(parsed) = value.parse::<bool>() {
                self.logging.wire_trace = parsed;
            }
        }
    }

    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            namespaces: ChannelNamespaces {
                control: self.bridge.namespace.clone(),
                view: self.bridge.view_namespace.clone(),
            },
            position_event: self.bridge.position_event,
            duplicate_policy: self.bridge.duplicate_policy,
            event_bus_capacity: self.bridge.event_bus_capacity.max(1),
        }
    }

    pub fn gateway_settings(&self) -> GatewaySettings {
        GatewaySettings {
            dispose_on_disconnect: self.bridge.dispose_on_disconnect,
            wire_trace: self.logging.wire_trace,
        }
    }

    pub fn simulated_media(&self) -> SimulatedMedia {
        SimulatedMedia {
            buffering: Duration::from_millis(self.engine.buffering_ms),
            duration: Duration::from_millis(self.engine.default_duration_ms),
            video_size: VideoSize {
                height: self.engine.video_height,
                width: self.engine.video_width,
            },
        }
    }
}
