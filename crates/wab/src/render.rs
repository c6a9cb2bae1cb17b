//! Terminal rendering of run events and reports.

use tokio::sync::mpsc;

use wab_core::{
    automation::{AutoSendReport, AutoSendStatus, DashboardStats, ScanReport},
    domain::Contact,
    orchestrator::{LogLevel, Progress, RunEvent, RunState},
    utils::{format_file_size, truncate_text},
};

const BAR_WIDTH: usize = 30;

/// Print events until every sender is dropped.
pub async fn run(mut rx: mpsc::UnboundedReceiver<RunEvent>) {
    while let Some(ev) = rx.recv().await {
        if let Some(line) = render_event(&ev) {
            println!("{line}");
        }
    }
}

pub fn render_event(ev: &RunEvent) -> Option<String> {
    match ev {
        RunEvent::Log(entry) => {
            let mark = match entry.level {
                LogLevel::Info => "·",
                LogLevel::Success => "✓",
                LogLevel::Error => "✗",
            };
            Some(format!("[{}] {mark} {}", entry.at, entry.text))
        }
        RunEvent::Progress(p) if p.total > 0 => Some(progress_bar(p)),
        RunEvent::State(RunState::Paused) => {
            Some("paused: enter `p` to resume, `s` to stop".to_string())
        }
        RunEvent::Waiting(d) if !d.is_zero() => {
            tracing::debug!("waiting {}s before next message", d.as_secs());
            None
        }
        RunEvent::Finished(s) => Some(format!(
            "{} sent, {} failed, {} total{}",
            s.sent,
            s.failed,
            s.total,
            if s.stopped { " (stopped)" } else { "" }
        )),
        _ => None,
    }
}

pub fn progress_bar(p: &Progress) -> String {
    let filled = ((p.fraction() * BAR_WIDTH as f64).round() as usize).min(BAR_WIDTH);
    format!(
        "[{}{}] {}/{}",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        p.processed(),
        p.total
    )
}

pub fn contacts_table(contacts: &[Contact]) -> String {
    if contacts.is_empty() {
        return "No contacts added yet".to_string();
    }

    let mut lines = vec![format!(
        "{:>4}  {:3}  {:<6} {:<12}  {:<24}  {}",
        "#", "sel", "cc", "number", "name", "status"
    )];
    for (i, c) in contacts.iter().enumerate() {
        lines.push(format!(
            "{:>4}  {:3}  {:<6} {:<12}  {:<24}  {}",
            i + 1,
            if c.selected { "[x]" } else { "[ ]" },
            c.country_code,
            c.local_number,
            truncate_text(&c.name, 21),
            c.status
        ));
    }
    let selected = contacts.iter().filter(|c| c.selected).count();
    lines.push(format!("{} contacts, {selected} selected", contacts.len()));
    lines.join("\n")
}

pub fn scan_report(r: &ScanReport) -> String {
    let s = &r.statistics;
    let mut lines = vec![
        format!("Folder: {}", r.attachments_folder),
        format!(
            "Contacts: {}  Files: {}  Matched: {}  Unmatched contacts: {}  Unmatched files: {}",
            s.total_contacts, s.total_files, s.matched, s.unmatched_contacts, s.unmatched_files
        ),
    ];

    if r.matches.is_empty() {
        lines.push("No matches found".to_string());
    } else {
        lines.push("Matches:".to_string());
        for m in &r.matches {
            lines.push(format!(
                "  {} ({}) -> {} [{}]",
                m.contact,
                m.phone,
                m.file,
                format_file_size(m.file_size)
            ));
        }
    }
    if !r.unmatched_contacts.is_empty() {
        lines.push("Unmatched contacts:".to_string());
        for c in &r.unmatched_contacts {
            lines.push(format!("  {} ({})", c.contact, c.phone));
        }
    }
    if !r.unmatched_files.is_empty() {
        lines.push("Unmatched files:".to_string());
        for f in &r.unmatched_files {
            lines.push(format!("  {f}"));
        }
    }
    lines.join("\n")
}

pub fn auto_send_report(r: &AutoSendReport) -> String {
    let s = &r.statistics;
    let mut lines = vec![
        r.message.clone(),
        format!(
            "Total: {}  Sent: {}  Failed: {}  No match: {}",
            s.total_contacts, s.sent, s.failed, s.no_match
        ),
    ];
    for res in &r.results {
        let status = match (res.status, &res.error) {
            (AutoSendStatus::Error, Some(e)) => format!("error: {e}"),
            (AutoSendStatus::Error, None) => "error: Unknown".to_string(),
            (st, _) => st.as_str().to_string(),
        };
        lines.push(format!(
            "  {} ({}) {} {}",
            res.contact,
            res.phone,
            res.file.as_deref().unwrap_or("-"),
            status
        ));
    }
    lines.join("\n")
}

pub fn statistics(stats: &DashboardStats) -> String {
    stats
        .iter()
        .map(|(k, v)| {
            let label = k.replace('_', " ");
            match v {
                serde_json::Value::String(s) => format!("{label}: {s}"),
                other => format!("{label}: {other}"),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wab_core::automation::{AutoSendResult, AutoSendStatistics, ScanMatch};
    use wab_core::orchestrator::{LogEntry, RunSummary};

    #[test]
    fn progress_bar_fills_proportionally() {
        let p = Progress {
            sent: 1,
            failed: 0,
            total: 2,
        };
        let bar = progress_bar(&p);
        assert!(bar.ends_with("] 1/2"));
        assert_eq!(bar.matches('#').count(), BAR_WIDTH / 2);
    }

    #[test]
    fn log_and_summary_lines() {
        let line = render_event(&RunEvent::Log(LogEntry {
            at: "10:00:00".to_string(),
            level: LogLevel::Error,
            text: "Failed: 919876543210 - nope".to_string(),
        }))
        .unwrap();
        assert_eq!(line, "[10:00:00] ✗ Failed: 919876543210 - nope");

        let line = render_event(&RunEvent::Finished(RunSummary {
            sent: 2,
            failed: 1,
            total: 5,
            stopped: true,
        }))
        .unwrap();
        assert_eq!(line, "2 sent, 1 failed, 5 total (stopped)");

        assert!(render_event(&RunEvent::State(RunState::Sending)).is_none());
    }

    #[test]
    fn contacts_table_marks_selection() {
        let mut a = Contact::new("919876543210", "Alice");
        a.selected = true;
        let out = contacts_table(&[a, Contact::new("919876543211", "")]);
        assert!(out.contains("[x]  91     9876543210    Alice"));
        assert!(out.ends_with("2 contacts, 1 selected"));
        assert_eq!(contacts_table(&[]), "No contacts added yet");
    }

    #[test]
    fn reports_render_sizes_and_errors() {
        let scan = ScanReport {
            matches: vec![ScanMatch {
                contact: "Alice".to_string(),
                phone: "1".to_string(),
                file: "alice.pdf".to_string(),
                file_size: 1536,
            }],
            ..Default::default()
        };
        assert!(scan_report(&scan).contains("alice.pdf [1.5 KB]"));

        let sent = AutoSendReport {
            message: "done".to_string(),
            statistics: AutoSendStatistics::default(),
            results: vec![AutoSendResult {
                contact: "B".to_string(),
                phone: "2".to_string(),
                file: None,
                status: AutoSendStatus::Error,
                error: None,
            }],
        };
        assert!(auto_send_report(&sent).ends_with("B (2) - error: Unknown"));
    }
}
