use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOp {
    Create,
    Update,
    Delete,
    Restore,
}

impl std::fmt::Display for AuditOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            AuditOp::Create => "create",
            AuditOp::Update => "update",
            AuditOp::Delete => "delete",
            AuditOp::Restore => "restore",
        })
    }
}

/// One successful artifact mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub at: String,
    pub path: String,
    pub op: AuditOp,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
}

/// Receiver for audit records. Failures are logged by the store and never
/// fail the mutation that produced the record.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: &AuditRecord) -> anyhow::Result<()>;
}

/// Emits each record as a `tracing` event on the `vellum::audit` target.
#[derive(Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, record: &AuditRecord) -> anyhow::Result<()> {
        tracing::info!(
            target: "vellum::audit",
            path = %record.path,
            op = %record.op,
            size = record.size,
            "artifact mutated"
        );
        Ok(())
    }
}

/// Drops every record.
#[derive(Debug, Default)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(&self, _record: &AuditRecord) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Appends records to a JSONL file.
#[derive(Debug, Clone)]
pub struct JsonlAuditSink {
    path: PathBuf,
}

impl JsonlAuditSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AuditSink for JsonlAuditSink {
    fn record(&self, record: &AuditRecord) -> anyhow::Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

/// Read every record from an audit JSONL file. Empty if the file is absent.
pub fn read_audit_log(path: &std::path::Path) -> anyhow::Result<Vec<AuditRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)?;
    let mut records = Vec::new();
    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(line)?);
    }
    Ok(records)
}
