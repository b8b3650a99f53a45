pub mod check;
pub mod push;
pub mod serve;
pub mod watch;

use notify_host::modes::batch::BatchReport;
use serde_json::{Value, json};

/// Short per-account lines for stderr, one per failed account.
pub(crate) fn failure_notices(report: &BatchReport) -> Vec<String> {
    report
        .accounts
        .iter()
        .filter_map(|r| {
            r.failure()
                .map(|f| format!("{} failed ({:?}): {}", r.account_id, f.kind, f.message))
        })
        .collect()
}

pub(crate) fn report_json(report: &BatchReport) -> Value {
    json!({
        "totalUsers": report.accounts.len(),
        "successCount": report.success_count(),
        "newNotificationsCount": report.with_new_items().count(),
        "report": report,
    })
}
