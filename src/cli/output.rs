use chainroot::pipeline::PlannedArtifact;
use chainroot::{Layout, RunReport};

pub(crate) fn print_run_summary(layout: &Layout, report: &RunReport) {
    println!("chainroot summary for {}", layout.domain);
    println!("- output root: {}", layout.output_root.display());
    for entry in report.entries() {
        println!(
            "- {}: {} ({})",
            entry.artifact,
            entry.outcome.as_str(),
            entry.path.display()
        );
    }
    println!("- trust bundle: {}", layout.server.bundle.display());
}

pub(crate) fn print_plan(layout: &Layout, planned: &[PlannedArtifact]) {
    println!("chainroot plan for {}", layout.domain);
    println!("- output root: {}", layout.output_root.display());
    for entry in planned {
        let status = if entry.exists { "present" } else { "create" };
        println!("- {}: {status} ({})", entry.artifact, entry.path.display());
    }
    let pending = planned.iter().filter(|entry| !entry.exists).count();
    println!("- pending: {pending}");
}
