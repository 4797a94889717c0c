//! HTML rendering for the dashboard summary page.
//!
//! The template auto-escapes everything interpolated into it, including run
//! previews, which are model-produced text and must never reach the page raw.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use serde::Serialize;

use router::dashboard::{DashboardSnapshot, StatusSummary};

const DASHBOARD_TEMPLATE: &str = include_str!("templates/dashboard.html");

static ENGINE: LazyLock<Environment<'static>> = LazyLock::new(|| {
    let mut env = Environment::new();
    env.add_template("dashboard.html", DASHBOARD_TEMPLATE)
        .expect("dashboard template should be valid");
    env.add_filter("timestamp", format_timestamp);
    env
});

/// Named status bucket row for template iteration.
#[derive(Serialize)]
struct StatusRow<'a> {
    name: &'a str,
    info: &'a StatusSummary,
}

/// Render the summary snapshot as a standalone HTML page.
pub fn render_dashboard_html(snapshot: &DashboardSnapshot) -> Result<String> {
    let statuses = [
        StatusRow {
            name: "incoming",
            info: &snapshot.status.incoming,
        },
        StatusRow {
            name: "approved",
            info: &snapshot.status.approved,
        },
        StatusRow {
            name: "rejected",
            info: &snapshot.status.rejected,
        },
        StatusRow {
            name: "reports",
            info: &snapshot.status.reports,
        },
    ];
    let template = ENGINE
        .get_template("dashboard.html")
        .context("dashboard template missing")?;
    template
        .render(context! { summary => snapshot, statuses => statuses })
        .context("render dashboard html")
}

/// Unix seconds as a human-readable UTC timestamp.
fn format_timestamp(unix_secs: i64) -> String {
    chrono::DateTime::from_timestamp(unix_secs, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use router::config::RouterConfig;
    use router::dashboard;
    use router::reply::ReplyFile;
    use router::store::{RunStore, Status};

    fn snapshot_with_run(preview_content: &str) -> DashboardSnapshot {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = RunStore::new(temp.path());
        store
            .write_run(
                Status::Approved,
                "demo",
                "1700000000-abcdef1234",
                &[ReplyFile {
                    path: "hello.py".to_string(),
                    content: preview_content.to_string(),
                }],
            )
            .expect("write");
        dashboard::summary(&store, &RouterConfig::default(), "demo", 5).expect("summary")
    }

    #[test]
    fn renders_runs_and_models() {
        let page = render_dashboard_html(&snapshot_with_run("print('hello')")).expect("page");
        assert!(page.contains("Agent Router Command Center"));
        assert!(page.contains("1700000000-abcdef1234"));
        assert!(page.contains("qwen2.5-coder:7b-instruct"));
        assert!(page.contains("Approved runs"));
        assert!(page.contains("hello.py"));
    }

    #[test]
    fn escapes_model_produced_previews() {
        let page =
            render_dashboard_html(&snapshot_with_run("<script>alert('x')</script>")).expect("page");
        assert!(!page.contains("<script>alert"));
        assert!(page.contains("&lt;script&gt;"));
    }

    #[test]
    fn empty_buckets_render_a_placeholder() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = RunStore::new(temp.path());
        let snapshot =
            dashboard::summary(&store, &RouterConfig::default(), "demo", 5).expect("summary");
        let page = render_dashboard_html(&snapshot).expect("page");
        assert!(page.contains("No runs recorded yet."));
    }

    #[test]
    fn timestamps_format_as_utc() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00:00");
        assert_eq!(format_timestamp(1_700_000_000), "2023-11-14 22:13:20");
    }
}
