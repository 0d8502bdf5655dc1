//! Text rendering for CLI surfaces.
//!
//! Keeps command output bounded and readable; `--format json` bypasses this.

use crate::core::models::{Job, Project};
use crate::plugins::bootstrap::BootstrapSummary;
use crate::plugins::import::ImportReport;
use colored::Colorize;
use std::fmt::Write;

/// Collapse newlines/extra whitespace and bound length for terminal display.
pub fn compact_line(input: &str, max_chars: usize) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    let preview: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", preview)
    } else {
        preview
    }
}

pub fn render_projects(projects: &[Project]) -> String {
    if projects.is_empty() {
        return "No projects.".to_string();
    }
    let mut out = String::new();
    for p in projects {
        let _ = writeln!(
            out,
            "{}  {}:{}  {}",
            p.name.bold(),
            p.owner,
            p.group,
            p.path.dimmed()
        );
    }
    out
}

pub fn render_jobs(jobs: &[Job]) -> String {
    if jobs.is_empty() {
        return "No jobs.".to_string();
    }
    let mut out = String::new();
    for j in jobs {
        let title = j.title.as_deref().unwrap_or("");
        let _ = writeln!(
            out,
            "{}  [{}]  {}  {}",
            j.job_id.bold(),
            j.project,
            j.status,
            compact_line(title, 60)
        );
    }
    out
}

pub fn render_import(report: &ImportReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {} new job(s), {} new project(s)",
        "Imported".green().bold(),
        report.jobs.len(),
        report.new_projects
    );
    let _ = writeln!(
        out,
        "Already present: {} project(s), {} job(s); {} folder(s) without {}",
        report.duplicate_projects,
        report.duplicate_jobs,
        report.ignored_dirs,
        crate::core::manifest::MANIFEST_FILE_NAME
    );
    let names: Vec<&str> = report.projects.iter().map(|p| p.name.as_str()).collect();
    let _ = writeln!(out, "Projects: {}", compact_line(&names.join(", "), 200));
    if !report.failures.is_empty() {
        let _ = writeln!(out, "{} {}", "Failures:".red().bold(), report.failures.len());
        for f in &report.failures {
            let _ = writeln!(out, "  {}: {}", f.path.display(), compact_line(&f.message, 160));
        }
    }
    out
}

pub fn render_bootstrap(summary: &BootstrapSummary) -> String {
    format!(
        "{} roles [{}], user '{}' and '{}' (group '{}'), project '{}'\n{}",
        "Initialized:".green().bold(),
        summary.roles.join(", "),
        summary.admin_user,
        summary.host.username,
        summary.host.group,
        summary.default_project,
        "The admin password is 'admin'; change it.".yellow()
    )
}
