//! Publishing vision reports to a shared robot-state table

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use tracing::debug;

use crate::config::TableConfig;
use crate::error::Result;
use crate::processing::VisionReport;

/// A named key/value table of string fields owned by another subsystem.
///
/// Writes are blind and last-write-wins.
pub trait StateTable: Send + Sync {
    fn name(&self) -> &str;

    fn update(&self, key: &str, value: &str) -> Result<()>;

    fn get(&self, key: &str) -> Option<String>;

    /// `true` only for the literal string `"true"`
    fn get_bool(&self, key: &str) -> bool {
        self.get(key).map_or(false, |value| value == "true")
    }
}

/// In-process table.
#[derive(Debug, Default)]
pub struct MemoryTable {
    name: String,
    fields: RwLock<HashMap<String, String>>,
}

impl MemoryTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: RwLock::new(HashMap::new()),
        }
    }

    pub fn snapshot(&self) -> HashMap<String, String> {
        self.fields.read().clone()
    }
}

impl StateTable for MemoryTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn update(&self, key: &str, value: &str) -> Result<()> {
        self.fields.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Option<String> {
        self.fields.read().get(key).cloned()
    }
}

#[derive(Serialize)]
struct TableLine<'a> {
    table: &'a str,
    key: &'a str,
    value: &'a str,
}

/// Writes every update as one JSON line, for a bridge process that owns the
/// real table. Reads are served from the last values written.
pub struct JsonLineTable<W> {
    local: MemoryTable,
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLineTable<W> {
    pub fn new(name: impl Into<String>, out: W) -> Self {
        Self {
            local: MemoryTable::new(name),
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: Write + Send> StateTable for JsonLineTable<W> {
    fn name(&self) -> &str {
        self.local.name()
    }

    fn update(&self, key: &str, value: &str) -> Result<()> {
        let line = TableLine {
            table: self.local.name(),
            key,
            value,
        };
        {
            let mut out = self.out.lock();
            serde_json::to_writer(&mut *out, &line).map_err(std::io::Error::from)?;
            out.write_all(b"\n")?;
            out.flush()?;
        }
        self.local.update(key, value)
    }

    fn get(&self, key: &str) -> Option<String> {
        self.local.get(key)
    }
}

/// Writes [`VisionReport`]s under the configured field names.
#[derive(Clone)]
pub struct Publisher {
    table: Arc<dyn StateTable>,
    keys: TableConfig,
}

impl Publisher {
    pub fn new(table: Arc<dyn StateTable>, keys: TableConfig) -> Self {
        Self { table, keys }
    }

    pub fn table(&self) -> &Arc<dyn StateTable> {
        &self.table
    }

    /// `found` is always written; angle and distance only with a target.
    pub fn publish(&self, report: &VisionReport) -> Result<()> {
        let found = report.found && report.bearing_angle.is_some() && report.distance.is_some();
        self.table
            .update(&self.keys.found_key, if found { "true" } else { "false" })?;

        if let (true, Some(angle), Some(distance)) = (found, report.bearing_angle, report.distance) {
            self.table.update(&self.keys.angle_key, &angle.to_string())?;
            self.table.update(&self.keys.distance_key, &distance.to_string())?;
        }

        debug!("Published to {}: {:?}", self.table.name(), report);
        Ok(())
    }

    /// Current value of the `found` field as the table sees it
    pub fn found(&self) -> bool {
        self.table.get_bool(&self.keys.found_key)
    }
}
