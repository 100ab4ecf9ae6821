//! CLI command definitions and terminal output.
//!
//! Uses clap derive macros for argument definitions. Status lines go to
//! stderr, the final confirmation to stdout.

pub mod args;

use colored::Colorize;

use rune::models::{Destination, ProvisioningRequest};
use rune::orchestrator::BootstrapReport;

/// Tell the operator the manifest lands in the default location.
pub fn print_default_destination_notice(destination: &Destination) {
    if let Destination::File(path) = destination {
        eprintln!(
            "{} no --output-file or --kube-config given; writing manifest to {}",
            "note:".yellow().bold(),
            path.display()
        );
    }
}

/// Render the success summary.
pub fn render_report(request: &ProvisioningRequest, report: &BootstrapReport) -> String {
    let access = if request.read_only { "read-only" } else { "read-write" };
    let mut lines = vec![format!(
        "{} bootstrapped {} on {}",
        "✔".green().bold(),
        report.repo.to_string().bold(),
        request.provider.label()
    )];
    if report.repository_created {
        lines.push(format!("  {}  created", "repository:".cyan()));
    }
    lines.push(format!("  {}     {}", "account:".cyan(), report.identity.login));
    lines.push(format!(
        "  {}  \"{}\" (id {}, {access})",
        "deploy key:".cyan(),
        request.deploy_key_title,
        report.deploy_key.id
    ));
    lines.push(format!(
        "  {}      {}/{} in {}",
        "secret:".cyan(),
        request.namespace,
        request.secret_name,
        report.destination
    ));
    lines.push(format!("  {}      {}", "fields:".cyan(), report.secret_fields.join(", ")));
    if let (true, Some(target)) = (report.pipeline_wired, &request.pipeline) {
        lines.push(format!("  {}    push listener on {}", "pipeline:".cyan(), target.cluster));
    }
    lines.join("\n")
}
