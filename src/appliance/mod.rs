// src/appliance/mod.rs

use std::future::Future;
use std::path::Path;

use serde::Serialize;

use crate::errors::Result;

pub mod client;
mod wire;

pub use client::AtdClient;

/// An authenticated session on the appliance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub version: String,
}

/// What the appliance knows about a freshly uploaded sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadResult {
    pub job_id: String,
    pub task_id: String,
    pub file: String,
    pub md5: String,
    pub size: u64,
    pub mime_type: String,
}

/// Progress of one analysis task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// Queued or analyzing, with the appliance's progress text.
    Running(String),
    Failed(String),
    Done,
}

/// Result of asking for the report of a job.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportStatus {
    Available(serde_json::Value),
    /// Not ready yet; ask again later.
    Pending(String),
    /// The appliance will never produce a report for this job.
    NotAvailable(String),
}

/// An analyzer (VM) profile a sample can be submitted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmProfile {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// The calls the submission workflow makes against an analysis appliance.
///
/// `AtdClient` talks to a real appliance over HTTP; tests substitute scripted
/// implementations.
pub trait Appliance: Send + Sync {
    /// Opens a session. Every other call except `disconnect` requires one.
    fn connect(&mut self, user: &str, password: &str) -> impl Future<Output = Result<Session>> + Send;

    fn heartbeat(&self) -> impl Future<Output = Result<serde_json::Value>> + Send;

    /// Uploads `path` for analysis under the given analyzer profile.
    fn upload_file(&self, path: &Path, profile: &str) -> impl Future<Output = Result<UploadResult>> + Send;

    fn check_status(&self, task_id: &str) -> impl Future<Output = Result<TaskStatus>> + Send;

    fn get_report(&self, job_id: &str) -> impl Future<Output = Result<ReportStatus>> + Send;

    fn list_profiles(&self) -> impl Future<Output = Result<Vec<VmProfile>>> + Send;

    /// Closes the session. Idempotent on the client side.
    fn disconnect(&mut self) -> impl Future<Output = Result<()>> + Send;
}
