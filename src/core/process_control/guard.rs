//! Critical-process protection table.
//!
//! A static, per-platform list of process names and path patterns whose
//! termination or suspension would destabilize the OS. Loaded once at
//! startup and read-only afterwards; the concrete name lists are
//! replaceable data, the critical/non-critical cutoff is the contract.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtectionLevel {
    None = 0,
    Low = 1,
    Medium = 2,
    High = 3,
    Critical = 4,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriticalProcessEntry {
    /// Exact process name, or a path prefix/suffix pattern
    pub pattern: String,
    pub level: ProtectionLevel,
}

impl CriticalProcessEntry {
    fn new(pattern: &str, level: ProtectionLevel) -> Self {
        Self {
            pattern: pattern.to_lowercase(),
            level,
        }
    }
}

pub struct CriticalProcessGuard {
    entries: Vec<CriticalProcessEntry>,
}

impl CriticalProcessGuard {
    /// Build the guard with the protection table for the current OS
    pub fn for_current_platform() -> Self {
        Self {
            entries: platform_table(),
        }
    }

    /// Build a guard from an explicit table (used by tests and embedders
    /// that ship their own lists)
    pub fn with_entries(entries: Vec<CriticalProcessEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|e| CriticalProcessEntry {
                pattern: e.pattern.to_lowercase(),
                level: e.level,
            })
            .collect();
        Self { entries }
    }

    /// Protection level for a process name or executable path.
    ///
    /// Exact name match wins over pattern fallback; within each pass the
    /// first matching entry wins; no match means `None`.
    pub fn protection_level(&self, name_or_path: &str) -> ProtectionLevel {
        let full = name_or_path.to_lowercase();
        let base = basename(&full);

        for entry in &self.entries {
            if entry.pattern == base || entry.pattern == full {
                return entry.level;
            }
        }

        for entry in &self.entries {
            if full.starts_with(&entry.pattern) || full.ends_with(&entry.pattern) {
                return entry.level;
            }
        }

        ProtectionLevel::None
    }

    pub fn is_critical(&self, name_or_path: &str) -> bool {
        self.protection_level(name_or_path) == ProtectionLevel::Critical
    }

    /// All entries at level Critical
    pub fn list_critical(&self) -> Vec<&CriticalProcessEntry> {
        self.entries
            .iter()
            .filter(|e| e.level == ProtectionLevel::Critical)
            .collect()
    }

    pub fn entries(&self) -> &[CriticalProcessEntry] {
        &self.entries
    }
}

fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

#[cfg(target_os = "linux")]
fn platform_table() -> Vec<CriticalProcessEntry> {
    use ProtectionLevel::*;
    vec![
        CriticalProcessEntry::new("systemd", Critical),
        CriticalProcessEntry::new("init", Critical),
        CriticalProcessEntry::new("kthreadd", Critical),
        CriticalProcessEntry::new("systemd-journald", Critical),
        CriticalProcessEntry::new("systemd-logind", Critical),
        CriticalProcessEntry::new("systemd-udevd", Critical),
        CriticalProcessEntry::new("dbus-daemon", High),
        CriticalProcessEntry::new("dbus-broker", High),
        CriticalProcessEntry::new("xorg", High),
        CriticalProcessEntry::new("xwayland", High),
        CriticalProcessEntry::new("sshd", High),
        CriticalProcessEntry::new("gnome-shell", Medium),
        CriticalProcessEntry::new("kwin_wayland", Medium),
        CriticalProcessEntry::new("networkmanager", Medium),
        CriticalProcessEntry::new("pipewire", Low),
        CriticalProcessEntry::new("/usr/lib/systemd/", Critical),
    ]
}

#[cfg(target_os = "macos")]
fn platform_table() -> Vec<CriticalProcessEntry> {
    use ProtectionLevel::*;
    vec![
        CriticalProcessEntry::new("launchd", Critical),
        CriticalProcessEntry::new("kernel_task", Critical),
        CriticalProcessEntry::new("windowserver", Critical),
        CriticalProcessEntry::new("loginwindow", High),
        CriticalProcessEntry::new("coreaudiod", High),
        CriticalProcessEntry::new("mds", Medium),
        CriticalProcessEntry::new("/system/library/", High),
    ]
}

#[cfg(target_os = "windows")]
fn platform_table() -> Vec<CriticalProcessEntry> {
    use ProtectionLevel::*;
    vec![
        CriticalProcessEntry::new("system", Critical),
        CriticalProcessEntry::new("registry", Critical),
        CriticalProcessEntry::new("smss.exe", Critical),
        CriticalProcessEntry::new("csrss.exe", Critical),
        CriticalProcessEntry::new("wininit.exe", Critical),
        CriticalProcessEntry::new("winlogon.exe", Critical),
        CriticalProcessEntry::new("services.exe", Critical),
        CriticalProcessEntry::new("lsass.exe", Critical),
        CriticalProcessEntry::new("svchost.exe", High),
        CriticalProcessEntry::new("dwm.exe", High),
        CriticalProcessEntry::new("explorer.exe", Medium),
    ]
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn platform_table() -> Vec<CriticalProcessEntry> {
    vec![
        CriticalProcessEntry::new("init", ProtectionLevel::Critical),
        CriticalProcessEntry::new("systemd", ProtectionLevel::Critical),
    ]
}
