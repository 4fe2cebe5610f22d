//! `snapshot`: replay a scenario and print what the mirror holds afterwards.

use serde::Serialize;
use tabled::Tabled;

use midimirror_core::{Mirror, ObjectSummary};

use crate::cli::SnapshotArgs;
use crate::error::CliError;
use crate::output;
use crate::scenario::{self, Scenario};

use super::{Session, util};

#[derive(Tabled)]
struct ObjectRow {
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "Handle")]
    handle: String,
    #[tabled(rename = "Unique ID")]
    unique_id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Parent")]
    parent: String,
    #[tabled(rename = "Offline")]
    offline: String,
}

/// One cached object and its position in its category's list.
#[derive(Serialize)]
struct SnapshotEntry {
    position: usize,
    #[serde(flatten)]
    object: ObjectSummary,
}

fn row(e: &SnapshotEntry) -> ObjectRow {
    let s = &e.object;
    ObjectRow {
        category: s.category.to_string(),
        position: e.position,
        handle: s.handle.to_string(),
        unique_id: s.unique_id.to_string(),
        name: util::opt_or_dash(s.name.as_deref()),
        parent: util::parent_label(s.parent),
        offline: if s.offline { "yes".into() } else { String::new() },
    }
}

/// Cache contents in list order.
fn collect(mirror: &Mirror) -> Vec<SnapshotEntry> {
    mirror
        .categories()
        .into_iter()
        .filter_map(|category| mirror.list(category))
        .flat_map(|list| {
            list.cache()
                .iter()
                .enumerate()
                .map(|(position, object)| SnapshotEntry {
                    position,
                    object: object.summary(),
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

fn line(e: &SnapshotEntry) -> String {
    let s = &e.object;
    format!(
        "{}\t{}\t{}\t{}",
        s.category,
        s.handle,
        s.unique_id,
        s.name.as_deref().unwrap_or("")
    )
}

pub async fn handle(args: SnapshotArgs, session: &Session) -> Result<(), CliError> {
    let scenario = Scenario::load(&args.scenario)?;
    let result = scenario::replay(&scenario, &session.config.mirror, true, args.steps).await?;

    let entries = collect(&result.mirror);
    let color = output::should_color(session.color);
    let rendered = output::render_list(session.format, &entries, row, line)?;
    output::print_output(&rendered, session.quiet);

    let refreshed = result
        .mirror
        .last_full_refresh()
        .map_or_else(|| "never".into(), |t| t.format("%H:%M:%S%.3f").to_string());
    output::print_status(
        &output::paint_dim(
            &format!(
                "{} objects after {} steps (last full refresh {refreshed})",
                entries.len(),
                result.steps_applied
            ),
            color,
        ),
        session.quiet,
    );
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use midimirror_config::MirrorSettings;
    use midimirror_core::Category;

    use super::*;

    #[tokio::test]
    async fn entries_follow_list_order_with_positions() {
        let scenario: Scenario = toml::from_str(
            r#"
            [[objects]]
            key = "in"
            category = "source"
            unique_id = 1

            [[objects]]
            key = "dev"
            category = "device"
            unique_id = 2
            properties = { name = "Box" }

            [[objects]]
            key = "in2"
            category = "source"
            unique_id = 3
            "#,
        )
        .unwrap();
        let result = scenario::replay(&scenario, &MirrorSettings::default(), true, None)
            .await
            .unwrap();

        let entries = collect(&result.mirror);
        let order: Vec<(Category, usize)> = entries
            .iter()
            .map(|e| (e.object.category, e.position))
            .collect();
        assert_eq!(
            order,
            vec![
                (Category::Device, 0),
                (Category::Source, 0),
                (Category::Source, 1)
            ]
        );
        assert_eq!(line(&entries[0]), format!("device\t{}\t2\tBox", entries[0].object.handle));

        let json = serde_json::to_value(&entries[1]).unwrap();
        assert_eq!(json["position"], 0);
        assert_eq!(json["unique_id"], 1);
    }
}
