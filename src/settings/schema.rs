//! Typed settings schema.
//!
//! The host hands every pass one immutable snapshot of the printer and
//! per-pass settings, deserialized from a TOML or JSON file. Fields of the
//! printer section without a `serde` default are required: a missing key is a
//! caller error surfaced at load time, never silently defaulted here. A
//! missing per-pass section simply leaves that pass disabled.

use serde::Deserialize;

/// Root settings file structure (matches TOML)
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SettingsFile {
    pub printer: PrinterSettings,
    #[serde(default)]
    pub passes: PassSettings,
}

/// Per-printer snapshot supplied by the host.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PrinterSettings {
    /// Number of extruders the machine has.
    pub extruder_count: u8,
    /// Regular layer height in mm.
    pub layer_height: f64,
    /// First-layer height in mm; seeds the Z tracker.
    pub initial_layer_height: f64,
    /// Nozzle diameter in mm.
    pub nozzle_diameter: f64,
    /// Whether retraction is enabled in the slicer profile.
    pub retraction_enabled: bool,
    /// Whether the slicer already emits its own Z-hops on retraction.
    #[serde(default)]
    pub retraction_hop_enabled: bool,
    /// Whether firmware retraction (G10/G11) is in use.
    #[serde(default)]
    pub firmware_retraction: bool,
    /// Z-hop speed in mm/s; emitted as F in mm/min.
    pub speed_z_hop: f64,
    /// Print sequence mode.
    pub print_sequence: PrintSequence,
    /// Prime tower geometry, when one is printed.
    #[serde(default)]
    pub prime_tower: Option<PrimeTowerSettings>,
}

/// Print sequence mode of the sliced plate.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PrintSequence {
    AllAtOnce,
    OneAtATime,
}

/// Prime tower geometry.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PrimeTowerSettings {
    /// Tower diameter in mm.
    pub size: f64,
    pub position_x: f64,
    pub position_y: f64,
}

/// One optional section per pass; an absent section disables the pass.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PassSettings {
    pub zhop_travel: Option<ZhopTravelSettings>,
    pub tool_macros: Option<ToolMacrosSettings>,
    pub insert_at_layer: Option<InsertAtLayerSettings>,
    pub search_replace: Option<SearchReplaceSettings>,
}

/// Settings for the Z-hop-on-travel pass.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ZhopTravelSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// First layer to process, 1-based as shown in the slicer preview.
    #[serde(default = "default_start_layer")]
    pub start_layer: i32,
    /// Last layer to process, 1-based; -1 means the top layer.
    #[serde(default = "default_end_layer")]
    pub end_layer: i32,
    /// Hop height in mm.
    pub hop_height: f64,
    /// Travel runs longer than this (mm) get a hop.
    pub min_travel_distance: f64,
    /// Also hop when the slicer already emits its own retraction hops.
    /// Explicit policy knob; the slicer-emitted and inserted hops compose
    /// but double the lift near retractions.
    #[serde(default)]
    pub hop_when_firmware_hops: bool,
}

/// Settings for the tool-change macro pass.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ToolMacrosSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// One entry per tool that gets macros.
    pub tools: Vec<ToolMacro>,
}

/// Macros for one tool. Empty lists mean no injection for that boundary.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ToolMacro {
    pub tool: u8,
    /// Lines injected immediately after the tool's first selection.
    #[serde(default)]
    pub first_use: Vec<String>,
    /// Lines injected at the closing boundary of the tool's usage span, when
    /// this tool is the last one used in the print.
    #[serde(default)]
    pub last_use: Vec<String>,
}

/// Settings for the insert-at-layer-change pass.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct InsertAtLayerSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub frequency: InsertFrequency,
    /// First layer to insert at, 1-based.
    #[serde(default = "default_start_layer")]
    pub start_layer: i32,
    /// Last layer to insert at, 1-based; -1 means the top layer.
    #[serde(default = "default_end_layer")]
    pub end_layer: i32,
    /// Target layer for a `once_only` insertion, 1-based.
    #[serde(default)]
    pub layer: Option<i32>,
    /// Comma-delimited G-code to insert; upper-cased on insertion.
    pub gcode: String,
}

/// How often the insert-at-layer-change pass fires.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InsertFrequency {
    OnceOnly,
    #[default]
    EveryLayer,
    #[serde(rename = "every_2nd")]
    Every2nd,
    #[serde(rename = "every_3rd")]
    Every3rd,
    #[serde(rename = "every_5th")]
    Every5th,
    #[serde(rename = "every_10th")]
    Every10th,
    #[serde(rename = "every_25th")]
    Every25th,
    #[serde(rename = "every_50th")]
    Every50th,
    #[serde(rename = "every_100th")]
    Every100th,
}

impl InsertFrequency {
    /// The layer step, or `None` for a single insertion.
    pub fn step(self) -> Option<i32> {
        match self {
            Self::OnceOnly => None,
            Self::EveryLayer => Some(1),
            Self::Every2nd => Some(2),
            Self::Every3rd => Some(3),
            Self::Every5th => Some(5),
            Self::Every10th => Some(10),
            Self::Every25th => Some(25),
            Self::Every50th => Some(50),
            Self::Every100th => Some(100),
        }
    }
}

/// Settings for the search-and-replace pass.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SearchReplaceSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub search: String,
    pub replace: String,
    /// Treat `search` as a regular expression instead of literal text.
    #[serde(default)]
    pub use_regex: bool,
    /// Replace only the first occurrence in the whole range.
    #[serde(default)]
    pub first_instance_only: bool,
    /// Leave the start sequence untouched.
    #[serde(default = "default_enabled")]
    pub ignore_start: bool,
    /// Leave the end sequence untouched.
    #[serde(default = "default_enabled")]
    pub ignore_end: bool,
}

fn default_enabled() -> bool {
    true
}

fn default_start_layer() -> i32 {
    1
}

fn default_end_layer() -> i32 {
    -1
}
