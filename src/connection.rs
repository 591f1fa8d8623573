//! Connection metadata capability
//!
//! Network and connection type are only known when the host exposes them.
//! The pipeline asks an injected provider once per run; a missing capability
//! shows up as empty strings in the result.

use crate::models::Config;
use std::{
    fs,
    path::{Path, PathBuf},
};

const UNKNOWN: &str = "unknown";

/// Connection metadata as reported by the host
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionInfo {
    /// Coarse effective type such as "4g", or "unknown"
    pub effective_type: Option<String>,
    /// Transport such as "wifi", "cellular" or "ethernet"
    pub transport: Option<String>,
}

impl ConnectionInfo {
    pub fn new(effective_type: Option<String>, transport: Option<String>) -> Self {
        Self {
            effective_type,
            transport,
        }
    }

    /// Present but unreported values read "unknown"
    pub fn network_type(&self) -> &str {
        self.effective_type.as_deref().unwrap_or(UNKNOWN)
    }

    pub fn connection_type(&self) -> &str {
        self.transport.as_deref().unwrap_or(UNKNOWN)
    }
}

pub trait ConnectionInfoProvider: Send + Sync {
    /// `None` when the capability is absent
    fn connection_info(&self) -> Option<ConnectionInfo>;
}

/// The capability is absent
#[derive(Debug, Clone, Copy, Default)]
pub struct Unavailable;

impl ConnectionInfoProvider for Unavailable {
    fn connection_info(&self) -> Option<ConnectionInfo> {
        None
    }
}

/// Values supplied up front, e.g. from the command line
#[derive(Debug, Clone, Default)]
pub struct StaticConnectionInfo {
    info: ConnectionInfo,
}

impl StaticConnectionInfo {
    pub fn new(network_type: Option<String>, connection_type: Option<String>) -> Self {
        Self {
            info: ConnectionInfo::new(network_type, connection_type),
        }
    }
}

impl ConnectionInfoProvider for StaticConnectionInfo {
    fn connection_info(&self) -> Option<ConnectionInfo> {
        Some(self.info.clone())
    }
}

/// Reads interface state from sysfs
///
/// Only physical links count: sysfs gives those a `device` entry, while
/// bridges, veth pairs and tunnels have none. Point-to-point modem links are
/// the exception and are kept. Among the links that are `up`, wifi beats
/// cellular beats ethernet. A readable directory with no such link reports
/// "unknown"; effective type is not observable this way and always reads
/// "unknown".
#[derive(Debug, Clone)]
pub struct SysfsConnectionInfo {
    root: PathBuf,
}

impl SysfsConnectionInfo {
    pub const DEFAULT_ROOT: &'static str = "/sys/class/net";

    pub fn new() -> Self {
        Self::with_root(Self::DEFAULT_ROOT)
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `None` when the directory cannot be read
    fn active_transport(&self) -> Option<Option<Transport>> {
        let entries = fs::read_dir(&self.root).ok()?;

        let best = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| (entry.file_name().to_string_lossy().into_owned(), entry.path()))
            .filter(|(name, dir)| name != "lo" && is_up(dir) && is_physical(name, dir))
            .map(|(name, dir)| Transport::classify(&name, &dir))
            .min();

        Some(best)
    }
}

impl Default for SysfsConnectionInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionInfoProvider for SysfsConnectionInfo {
    fn connection_info(&self) -> Option<ConnectionInfo> {
        let transport = self.active_transport()?;
        Some(ConnectionInfo::new(
            Some(UNKNOWN.to_string()),
            Some(transport.map_or(UNKNOWN, Transport::as_str).to_string()),
        ))
    }
}

/// Declaration order is preference order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Transport {
    Wifi,
    Cellular,
    Ethernet,
}

impl Transport {
    fn classify(name: &str, dir: &Path) -> Self {
        if dir.join("wireless").exists() || dir.join("phy80211").exists() {
            Transport::Wifi
        } else if is_cellular_name(name) {
            Transport::Cellular
        } else {
            Transport::Ethernet
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Transport::Wifi => "wifi",
            Transport::Cellular => "cellular",
            Transport::Ethernet => "ethernet",
        }
    }
}

fn is_cellular_name(name: &str) -> bool {
    ["wwan", "rmnet", "ppp"].iter().any(|prefix| name.starts_with(prefix))
}

fn is_up(dir: &Path) -> bool {
    fs::read_to_string(dir.join("operstate"))
        .map(|state| state.trim() == "up")
        .unwrap_or(false)
}

fn is_physical(name: &str, dir: &Path) -> bool {
    dir.join("device").exists() || is_cellular_name(name)
}

/// Pick the provider implied by configuration
///
/// Static values win, then host detection; `connection_info = false` turns
/// the capability off entirely.
pub fn provider_for(config: &Config) -> Box<dyn ConnectionInfoProvider> {
    if !config.connection_info {
        return Box::new(Unavailable);
    }

    if config.has_static_connection_info() {
        return Box::new(StaticConnectionInfo::new(
            config.network_type.clone(),
            config.connection_type.clone(),
        ));
    }

    host_provider()
}

#[cfg(target_os = "linux")]
fn host_provider() -> Box<dyn ConnectionInfoProvider> {
    Box::new(SysfsConnectionInfo::new())
}

#[cfg(not(target_os = "linux"))]
fn host_provider() -> Box<dyn ConnectionInfoProvider> {
    Box::new(Unavailable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn add_interface(root: &Path, name: &str, state: &str, wireless: bool) {
        let dir = add_virtual_interface(root, name, state);
        fs::create_dir_all(dir.join("device")).unwrap();
        if wireless {
            fs::create_dir_all(dir.join("wireless")).unwrap();
        }
    }

    fn add_virtual_interface(root: &Path, name: &str, state: &str) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("operstate"), format!("{}\n", state)).unwrap();
        dir
    }

    #[test]
    fn test_unavailable_reports_nothing() {
        assert_eq!(Unavailable.connection_info(), None);
    }

    #[test]
    fn test_static_values_pass_through() {
        let provider = StaticConnectionInfo::new(Some("4g".to_string()), None);
        let info = provider.connection_info().unwrap();
        assert_eq!(info.network_type(), "4g");
        assert_eq!(info.connection_type(), "unknown");
    }

    #[test]
    fn test_sysfs_detects_wifi() {
        let root = TempDir::new().unwrap();
        add_interface(root.path(), "lo", "unknown", false);
        add_interface(root.path(), "eth0", "down", false);
        add_interface(root.path(), "wlan0", "up", true);

        let info = SysfsConnectionInfo::with_root(root.path()).connection_info().unwrap();
        assert_eq!(info.connection_type(), "wifi");
        assert_eq!(info.network_type(), "unknown");
    }

    #[test]
    fn test_sysfs_classifies_cellular_and_ethernet() {
        let root = TempDir::new().unwrap();
        add_interface(root.path(), "wwan0", "up", false);
        let info = SysfsConnectionInfo::with_root(root.path()).connection_info().unwrap();
        assert_eq!(info.connection_type(), "cellular");

        let root = TempDir::new().unwrap();
        add_interface(root.path(), "enp3s0", "up", false);
        let info = SysfsConnectionInfo::with_root(root.path()).connection_info().unwrap();
        assert_eq!(info.connection_type(), "ethernet");
    }

    #[test]
    fn test_virtual_links_do_not_mask_wifi() {
        let root = TempDir::new().unwrap();
        add_virtual_interface(root.path(), "br-1a2b3c", "up");
        add_virtual_interface(root.path(), "docker0", "up");
        add_virtual_interface(root.path(), "veth9f8e7d", "up");
        add_interface(root.path(), "wlan0", "up", true);

        let info = SysfsConnectionInfo::with_root(root.path()).connection_info().unwrap();
        assert_eq!(info.connection_type(), "wifi");
    }

    #[test]
    fn test_wifi_preferred_over_wired_link() {
        let root = TempDir::new().unwrap();
        add_interface(root.path(), "enp3s0", "up", false);
        add_interface(root.path(), "wlp2s0", "up", true);

        let info = SysfsConnectionInfo::with_root(root.path()).connection_info().unwrap();
        assert_eq!(info.connection_type(), "wifi");
    }

    #[test]
    fn test_modem_link_without_device_entry_counts() {
        let root = TempDir::new().unwrap();
        add_virtual_interface(root.path(), "ppp0", "up");
        add_virtual_interface(root.path(), "tun0", "up");

        let info = SysfsConnectionInfo::with_root(root.path()).connection_info().unwrap();
        assert_eq!(info.connection_type(), "cellular");
    }

    #[test]
    fn test_sysfs_without_active_interface_reports_unknown() {
        let root = TempDir::new().unwrap();
        add_interface(root.path(), "eth0", "down", false);
        add_virtual_interface(root.path(), "virbr0", "up");

        let info = SysfsConnectionInfo::with_root(root.path()).connection_info().unwrap();
        assert_eq!(info.network_type(), "unknown");
        assert_eq!(info.connection_type(), "unknown");
    }

    #[test]
    fn test_unreadable_sysfs_is_absent() {
        let root = TempDir::new().unwrap();
        let missing = SysfsConnectionInfo::with_root(root.path().join("missing"));
        assert_eq!(missing.connection_info(), None);
    }

    #[test]
    fn test_provider_selection() {
        let config = Config {
            connection_info: false,
            network_type: Some("4g".to_string()),
            ..Config::default()
        };
        assert_eq!(provider_for(&config).connection_info(), None);

        let config = Config {
            network_type: Some("4g".to_string()),
            connection_type: Some("wifi".to_string()),
            ..Config::default()
        };
        let info = provider_for(&config).connection_info().unwrap();
        assert_eq!(info.network_type(), "4g");
        assert_eq!(info.connection_type(), "wifi");
    }
}
