use phpbridge_core::{BuildResult, BuildStatus, IncludePath, LintReport};

pub fn status_label(status: &BuildStatus) -> String {
    match status {
        BuildStatus::Success => "✅ Success".to_string(),
        BuildStatus::TestFailure => "❌ Test failures".to_string(),
        BuildStatus::RunnerError(reason) => format!("💥 Runner error ({reason})"),
    }
}

pub fn print_include_path(include_path: &IncludePath) {
    println!("📚 Include path ({} roots):", include_path.len());
    for (index, entry) in include_path.entries().iter().enumerate() {
        match &entry.file {
            Some(file) => println!("   {}. {} [{}]", index + 1, file.display(), entry.origin),
            None => println!("   {}. {} [{}]", index + 1, entry.root.display(), entry.origin),
        }
    }
    for shadow in include_path.shadowing() {
        println!(
            "   ⚠️  {} in {} shadows {}",
            shadow.relative.display(),
            shadow.winner.display(),
            shadow.shadowed.display()
        );
    }
}

pub fn print_build_result(result: &BuildResult) {
    if !result.stdout.is_empty() {
        print!("{}", result.stdout);
        if !result.stdout.ends_with('\n') {
            println!();
        }
    }
    println!("{}", status_label(&result.status));
    if result.invocations.is_empty() {
        println!("   No runner invocation");
        return;
    }
    println!(
        "   {} invocation(s) in {:.2}s",
        result.invocations.len(),
        result.elapsed.as_secs_f64()
    );
    if let Some(code) = result.exit_code {
        println!("   Exit code: {code}");
    }
    if let Some(capture) = &result.output_file {
        println!("   Output: {}", capture.display());
    }
    if let Some(report) = &result.report {
        println!("   Report: {}", report.display());
    }
}

pub fn print_lint_report(report: &LintReport) {
    for failure in &report.failures {
        println!("❌ {}", failure.file.display());
        println!("   {}", failure.message);
    }
    if report.is_clean() {
        println!("✅ {} files without syntax errors", report.checked);
    } else {
        println!(
            "❌ {} of {} files failed the syntax check",
            report.failures.len(),
            report.checked
        );
    }
}
