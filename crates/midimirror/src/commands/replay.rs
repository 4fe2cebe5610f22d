//! `replay`: print every observer event a scenario produces.

use tabled::Tabled;

use crate::cli::ReplayArgs;
use crate::error::CliError;
use crate::output;
use crate::scenario::{self, ReplayEvent, Scenario};

use super::{Session, util};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct EventRow {
    #[tabled(rename = "Step")]
    step: usize,
    #[tabled(rename = "Cause")]
    cause: String,
    #[tabled(rename = "Event")]
    kind: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Handle")]
    handle: String,
    #[tabled(rename = "Unique ID")]
    unique_id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Property")]
    property: String,
}

impl EventRow {
    fn new(e: &ReplayEvent, color: bool) -> Self {
        Self {
            step: e.step,
            cause: e.cause.clone(),
            kind: output::paint_kind(e.kind, color),
            category: e.category.to_string(),
            handle: e.handle.to_string(),
            unique_id: e.unique_id.to_string(),
            name: util::opt_or_dash(e.name.as_deref()),
            property: util::opt_or_dash(e.property.as_deref()),
        }
    }
}

fn line(e: &ReplayEvent) -> String {
    let mut out = format!(
        "{}\t{}\t{}\t{}\t{}",
        e.step, e.kind, e.category, e.handle, e.unique_id
    );
    if let Some(property) = &e.property {
        out.push('\t');
        out.push_str(property);
    }
    out
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: ReplayArgs, session: &Session) -> Result<(), CliError> {
    let scenario = Scenario::load(&args.scenario)?;
    tracing::info!(
        scenario = scenario.name.as_deref().unwrap_or("unnamed"),
        steps = scenario.steps.len(),
        "replaying"
    );

    let result = scenario::replay(
        &scenario,
        &session.config.mirror,
        !args.no_initial_sync,
        None,
    )
    .await?;

    let color = output::should_color(session.color);
    let rendered = output::render_list(
        session.format,
        &result.events,
        |e| EventRow::new(e, color),
        line,
    )?;
    output::print_output(&rendered, session.quiet);

    let count = |kind: &str| result.events.iter().filter(|e| e.kind == kind).count();
    let summary = format!(
        "{} steps: {} {}, {} {}, {} {}; {} objects mirrored",
        result.steps_applied,
        count("added"),
        output::paint_kind("added", color),
        count("removed"),
        output::paint_kind("removed", color),
        count("changed"),
        output::paint_kind("changed", color),
        result.mirror.len(),
    );
    output::print_status(&output::paint_dim(&summary, color), session.quiet);
    Ok(())
}
