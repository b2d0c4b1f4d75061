//! # CLI Command Implementations

use super::Backend;
use crate::api::{self, AppState};
use crate::device_config::{load_device_config, save_device_config};
use chrono::Utc;
use koza_core::{
    Actuator, AgentKind, AgentReport, DeviceConfig, KozaError, Session, StageSchedule,
    StageThresholds, StoredReport,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

// =============================================================================
// FILE LIMITS
// =============================================================================

/// Maximum size of an ingest or vision payload file (10 MB).
const MAX_INPUT_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Maximum number of reports in one ingest file.
const MAX_INGEST_REPORTS: usize = 10_000;

/// Device configuration written by `config-init` when `--config` is absent.
const DEFAULT_CONFIG_FILE: &str = "koza.toml";

/// Resolve and check an input file: it must exist, be a regular file and fit
/// within `MAX_INPUT_FILE_SIZE`.
fn read_input_file(path: &Path) -> Result<Vec<u8>, KozaError> {
    let canonical = path.canonicalize().map_err(|e| {
        KozaError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;
    if !canonical.is_file() {
        return Err(KozaError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    let metadata = std::fs::metadata(&canonical)
        .map_err(|e| KozaError::IoError(format!("Cannot read file metadata: {}", e)))?;
    if metadata.len() > MAX_INPUT_FILE_SIZE {
        return Err(KozaError::IoError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            MAX_INPUT_FILE_SIZE
        )));
    }

    std::fs::read(&canonical).map_err(|e| KozaError::IoError(format!("Read file: {}", e)))
}

fn read_json_file(path: &Path) -> Result<serde_json::Value, KozaError> {
    let contents = read_input_file(path)?;
    serde_json::from_slice(&contents)
        .map_err(|e| KozaError::DeserializationError(format!("{}: {}", path.display(), e)))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), KozaError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| KozaError::SerializationError(e.to_string()))?;
    println!("{}", rendered);
    Ok(())
}

// =============================================================================
// CONTEXT
// =============================================================================

/// Global flags shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    pub database: PathBuf,
    pub backend: Backend,
    pub config: Option<PathBuf>,
    pub json_mode: bool,
}

impl Context {
    /// Open the message log selected by `--backend`.
    pub fn open_session(&self) -> Result<Session, KozaError> {
        match self.backend {
            Backend::Redb => Session::with_redb(&self.database),
            Backend::Memory => Ok(Session::new()),
        }
    }

    /// The device configuration from `--config`, or the defaults.
    pub fn load_config(&self) -> Result<DeviceConfig, KozaError> {
        match &self.config {
            Some(path) => load_device_config(path),
            None => Ok(DeviceConfig::default()),
        }
    }
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(ctx: &Context, host: &str, port: u16) -> Result<(), KozaError> {
    let session = ctx.open_session()?;
    let config = ctx.load_config()?;

    println!("KozaTakip Orchestrator Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:     {}", host);
    println!("  Port:     {}", port);
    println!("  Backend:  {:?}", ctx.backend);
    println!("  Database: {}", ctx.database.display());
    match &ctx.config {
        Some(path) => println!("  Config:   {}", path.display()),
        None => println!("  Config:   built-in defaults (PUT /config is not persisted)"),
    }
    println!(
        "  Stage:    {}",
        config.effective_stage(Utc::now().timestamp_millis(), &StageSchedule::default())
    );
    println!();
    println!("Endpoints:");
    println!("  POST /messages              - Ingest an agent report");
    println!("  GET  /messages              - List reports");
    println!("  GET  /dashboard/snapshot    - Fused status");
    println!("  GET  /environment/stability - Stability score");
    println!("  POST /quality/score         - Score a vision payload");
    println!("  GET  /stage                 - Stage in force");
    println!("  GET  /config, PUT /config   - Device configuration");
    println!("  GET  /health                - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let state = AppState::with_config(session, config, ctx.config.clone());
    api::run_server(&format!("{}:{}", host, port), state).await
}

// =============================================================================
// SNAPSHOT COMMAND
// =============================================================================

fn describe(slot: Option<&StoredReport>) -> String {
    match slot {
        Some(stored) => format!(
            "{} (received {})",
            stored.report.timestamp(),
            stored.received_at.to_rfc3339()
        ),
        None => "-".to_string(),
    }
}

/// Show the fused dashboard status.
pub fn cmd_snapshot(ctx: &Context) -> Result<(), KozaError> {
    let session = ctx.open_session()?;
    let snapshot = session.dashboard_snapshot();

    if ctx.json_mode {
        return print_json(&snapshot);
    }

    let decision = &snapshot.orchestrator;
    println!("KozaTakip Dashboard");
    println!("===================");
    println!("Status:         {}", decision.overall_status);
    let approval = if decision.human_approval_required {
        "required"
    } else {
        "not required"
    };
    println!("Approval:       {}", approval);
    for reason in &decision.reason {
        println!("  - {}", reason);
    }
    println!();
    println!("Actions:");
    if decision.actions_required.is_empty() {
        println!("  (none)");
    }
    for action in &decision.actions_required {
        println!("  - {}", action);
    }
    println!();
    let plan = &snapshot.actuators;
    println!("Actuators:");
    if plan.any() {
        for actuator in Actuator::ALL.into_iter().filter(|a| a.planned_in(plan)) {
            println!("  - {} on", actuator);
        }
    } else {
        println!("  (none requested)");
    }
    println!();
    println!("Latest reports:");
    println!("  Environment:  {}", describe(snapshot.latest.environment.as_ref()));
    println!("  Vision:       {}", describe(snapshot.latest.vision.as_ref()));
    println!("  Predictive:   {}", describe(snapshot.latest.predictive.as_ref()));
    println!("  Quality:      {}", describe(snapshot.latest.quality.as_ref()));

    Ok(())
}

// =============================================================================
// MESSAGES COMMAND
// =============================================================================

/// List stored reports, newest first.
pub fn cmd_messages(ctx: &Context, agent: Option<&str>, limit: usize) -> Result<(), KozaError> {
    let agent = agent.map(str::parse::<AgentKind>).transpose()?;
    let session = ctx.open_session()?;
    let messages = session.messages(agent, limit)?;

    if ctx.json_mode {
        return print_json(&messages);
    }

    if messages.is_empty() {
        println!("No messages.");
    }
    for stored in &messages {
        println!(
            "{}  {:<14} {}",
            stored.received_at.to_rfc3339(),
            stored.agent().as_str(),
            stored.report.timestamp()
        );
    }
    Ok(())
}

// =============================================================================
// AUDIT COMMAND
// =============================================================================

/// List recorded actuator switches, newest first.
pub fn cmd_audit(ctx: &Context, actuator: Option<&str>, limit: usize) -> Result<(), KozaError> {
    let actuator = actuator.map(str::parse::<Actuator>).transpose()?;
    let session = ctx.open_session()?;
    let entries = session.actuator_audit(actuator, limit)?;

    if ctx.json_mode {
        return print_json(&entries);
    }

    if entries.is_empty() {
        println!("No actuator switches recorded.");
    }
    for entry in &entries {
        println!(
            "{}  {:<12} {:<7} {:<4} {}",
            entry.created_at.to_rfc3339(),
            entry.actuator().as_str(),
            entry.command.mode.as_str(),
            if entry.command.state { "on" } else { "off" },
            entry.client_ip.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

// =============================================================================
// INGEST COMMAND
// =============================================================================

/// Parse a file holding one report or an array of reports.
pub fn parse_reports(value: serde_json::Value) -> Result<Vec<AgentReport>, KozaError> {
    let values = match value {
        serde_json::Value::Array(values) => values,
        single => vec![single],
    };
    if values.len() > MAX_INGEST_REPORTS {
        return Err(KozaError::InvalidReport(format!(
            "Report count {} exceeds maximum allowed {}",
            values.len(),
            MAX_INGEST_REPORTS
        )));
    }

    values
        .into_iter()
        .enumerate()
        .map(|(i, v)| {
            serde_json::from_value(v)
                .map_err(|e| KozaError::InvalidReport(format!("report #{}: {}", i, e)))
        })
        .collect()
}

/// Ingest reports from a JSON file. Reports before an invalid one stay stored.
pub fn cmd_ingest(ctx: &Context, file: &Path) -> Result<(), KozaError> {
    tracing::info!("Ingesting from {}", file.display());

    let reports = parse_reports(read_json_file(file)?)?;
    if ctx.backend == Backend::Memory {
        tracing::warn!("memory backend: ingested reports are discarded on exit");
    }

    let mut session = ctx.open_session()?;
    let stored = session.ingest_all(reports)?;

    if ctx.json_mode {
        return print_json(&serde_json::json!({
            "ingested": stored.len(),
            "total": session.message_count(),
        }));
    }
    println!("Ingested {} report(s)", stored.len());
    Ok(())
}

// =============================================================================
// SCORING COMMANDS
// =============================================================================

/// Score the stability of the recent environment.
pub fn cmd_stability(ctx: &Context, limit: usize) -> Result<(), KozaError> {
    let session = ctx.open_session()?;
    let config = ctx.load_config()?;
    let now = Utc::now().timestamp_millis();
    let report = session.environment_stability(&config, now, limit);

    if ctx.json_mode {
        return print_json(&report);
    }

    let debug = &report.debug;
    println!("Environmental Stability");
    println!("=======================");
    println!("Stage:   {}", config.effective_stage(now, &StageSchedule::default()));
    println!("Score:   {}/100", report.score);
    println!();
    println!(
        "Samples: T={} H={} CO2={}",
        debug.samples.temperature, debug.samples.humidity, debug.samples.co2_ppm
    );
    println!(
        "Std:     T={:.2} H={:.2} CO2={:.1}",
        debug.std.temperature, debug.std.humidity, debug.std.co2_ppm
    );
    match debug.stage.in_range_ratio {
        Some(ratio) => println!("In band: {:.0}%", ratio * 100.0),
        None => println!("In band: n/a"),
    }
    Ok(())
}

/// Score a vision payload against the current stability.
pub fn cmd_quality(ctx: &Context, file: &Path) -> Result<(), KozaError> {
    let payload = read_json_file(file)?;
    let session = ctx.open_session()?;
    let config = ctx.load_config()?;
    let result = session.quality_score(
        &payload,
        &config,
        Utc::now().timestamp_millis(),
        koza_core::primitives::STABILITY_LOOKBACK,
    );

    if ctx.json_mode {
        return print_json(&result);
    }

    println!("Cocoon Quality");
    println!("==============");
    if result.applicable {
        println!("Score:          {}/100", result.quality_score);
        println!("Grade:          {}", result.grade);
        println!("Recommendation: {}", result.market_recommendation);
        println!(
            "Sub-scores:     size={} color={} homogeneity={:.1} env={}",
            result.size, result.color, result.homogeneity, result.env_stability
        );
    } else {
        println!("Score:          N/A");
    }
    println!();
    for reason in &result.reasons {
        println!("  - {}", reason);
    }
    Ok(())
}

// =============================================================================
// STAGE AND CONFIG COMMANDS
// =============================================================================

/// Show the stage currently in force.
pub fn cmd_stage(ctx: &Context) -> Result<(), KozaError> {
    let config = ctx.load_config()?;
    let schedule = StageSchedule::default();
    let now = Utc::now().timestamp_millis();
    let stage = config.effective_stage(now, &schedule);
    let targets = config.thresholds_for(&stage).map(StageThresholds::targets);
    let auto = &config.auto_stage;
    let progress = match (&auto.start_at, auto.enabled) {
        (Some(start_at), true) => Some(schedule.progress(&auto.start_stage, start_at, now)),
        _ => None,
    };

    if ctx.json_mode {
        return print_json(&serde_json::json!({
            "stage": stage,
            "targets": targets,
            "active_stage": config.active_stage,
            "auto_enabled": auto.enabled,
            "start_stage": auto.start_stage,
            "start_at": auto.start_at,
            "progress": progress,
        }));
    }

    println!("Stage:     {}", stage);
    if let Some(t) = targets {
        println!(
            "Targets:   {:.1} degC, {:.0}% RH, {:.0} ppm CO2",
            t.temperature, t.humidity, t.co2_ppm
        );
    }
    if !auto.enabled {
        println!("Mode:      manual");
        return Ok(());
    }
    println!("Mode:      auto (from {})", auto.start_stage);
    if let Some(p) = progress {
        match (p.elapsed_days, p.stage_days) {
            (Some(elapsed), Some(days)) => println!(
                "Progress:  day {} of {} in stage, {} day(s) since start",
                p.day_in_stage + 1,
                days,
                elapsed
            ),
            (Some(elapsed), None) => println!("Progress:  {} day(s) since start", elapsed),
            _ => println!("Progress:  start marker could not be parsed"),
        }
    }
    Ok(())
}

/// Write the default device configuration.
pub fn cmd_config_init(ctx: &Context, force: bool) -> Result<(), KozaError> {
    let path = ctx
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    if path.exists() && !force {
        return Err(KozaError::ConfigError(format!(
            "'{}' already exists (use --force to overwrite)",
            path.display()
        )));
    }

    save_device_config(&path, &DeviceConfig::default())?;
    println!("Wrote default device configuration to {}", path.display());
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
