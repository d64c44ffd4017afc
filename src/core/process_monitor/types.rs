use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single GPU-consuming process as reported by the platform provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpuProcess {
    pub pid: i32,
    pub name: String,
    pub gpu_usage_percent: f32,
    pub gpu_memory_mb: f64,
    #[serde(rename = "type")]
    pub process_type: GpuProcessType,
    pub command: String,
    pub status: ProcessStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<ProcessPriority>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GpuProcessType {
    Compute,
    Graphics,
    Both,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    #[default]
    Running,
    Suspended,
    Terminated,
    Error,
}

/// The six recognized scheduling priority levels.
///
/// This is the stable cross-platform contract; the mapping to nice values
/// or priority classes lives in the platform layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessPriority {
    Low,
    BelowNormal,
    Normal,
    AboveNormal,
    High,
    Realtime,
}

impl ProcessPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessPriority::Low => "low",
            ProcessPriority::BelowNormal => "below_normal",
            ProcessPriority::Normal => "normal",
            ProcessPriority::AboveNormal => "above_normal",
            ProcessPriority::High => "high",
            ProcessPriority::Realtime => "realtime",
        }
    }
}

impl FromStr for ProcessPriority {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(ProcessPriority::Low),
            "below_normal" => Ok(ProcessPriority::BelowNormal),
            "normal" => Ok(ProcessPriority::Normal),
            "above_normal" => Ok(ProcessPriority::AboveNormal),
            "high" => Ok(ProcessPriority::High),
            "realtime" => Ok(ProcessPriority::Realtime),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ProcessPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timestamped view of all GPU processes at one poll instant
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub processes: Vec<GpuProcess>,
    pub timestamp: i64, // Unix timestamp
    pub update_id: u64,
}

impl Snapshot {
    pub fn new(processes: Vec<GpuProcess>, update_id: u64) -> Self {
        Self {
            processes,
            timestamp: chrono::Utc::now().timestamp(),
            update_id,
        }
    }
}

/// Difference between two consecutive snapshots.
///
/// A pid appears in at most one of added/updated/removed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Delta {
    pub added: Vec<GpuProcess>,
    pub updated: Vec<GpuProcess>,
    pub removed: Vec<i32>,
    pub update_id: u64,
}

impl Delta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

/// Control operations accepted by the executor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlOperation {
    Kill,
    Suspend,
    Resume,
    Priority,
}

impl ControlOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlOperation::Kill => "kill",
            ControlOperation::Suspend => "suspend",
            ControlOperation::Resume => "resume",
            ControlOperation::Priority => "priority",
        }
    }
}

impl fmt::Display for ControlOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one control operation; never mutated after construction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlResult {
    pub pid: i32,
    pub success: bool,
    pub message: String,
    pub operation: ControlOperation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
}

impl ControlResult {
    pub fn ok(pid: i32, operation: ControlOperation, message: impl Into<String>) -> Self {
        Self {
            pid,
            success: true,
            message: message.into(),
            operation,
            priority: None,
        }
    }

    pub fn fail(pid: i32, operation: ControlOperation, message: impl Into<String>) -> Self {
        Self {
            pid,
            success: false,
            message: message.into(),
            operation,
            priority: None,
        }
    }

    pub fn with_priority(mut self, priority: ProcessPriority) -> Self {
        self.priority = Some(priority.as_str().to_string());
        self
    }
}

/// Per-pid results plus a summary for batch control operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchControlOutcome {
    pub results: Vec<ControlResult>,
    pub success_count: usize,
    pub failed_count: usize,
}

/// Threshold/type filter applied to a process listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessFilter {
    #[serde(default)]
    pub usage_threshold: f32,
    #[serde(default)]
    pub memory_threshold: f64,
    #[serde(default)]
    pub filter_type: Option<GpuProcessType>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ProcessFilter {
    fn default() -> Self {
        Self {
            usage_threshold: 0.0,
            memory_threshold: 0.0,
            filter_type: None,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    Usage,
    Memory,
    Name,
    Pid,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ProcessSort {
    #[serde(default)]
    pub field: SortField,
    #[serde(default)]
    pub order: SortOrder,
}

/// Filter/sort/paging parameters for a filtered process listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessQuery {
    #[serde(default)]
    pub filter: Option<ProcessFilter>,
    #[serde(default)]
    pub sort: Option<ProcessSort>,
    #[serde(default)]
    pub max_items: Option<usize>,
    #[serde(default)]
    pub offset: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilteredProcesses {
    pub processes: Vec<GpuProcess>,
    pub total_count: usize,
    pub filtered_count: usize,
    pub has_more: bool,
    pub query_time_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeltaResponse {
    pub delta: Option<Delta>,
    pub full_refresh: bool,
    pub total_count: usize,
    pub query_time_ms: f64,
}

/// Existence/controllability check for a single pid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessValidation {
    pub pid: i32,
    pub is_valid: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_name: Option<String>,
}
