use phpbridge_core::RunnerInvocation;

/// Print a runner command line, then its parts
pub fn print_invocation(invocation: &RunnerInvocation) {
    println!("🚀 {}", invocation.to_shell_command());
    println!("   🔧 Command breakdown:");
    println!("      • program: {}", invocation.program().display());
    println!("      • profile: {}", invocation.profile());

    let args = invocation.args();
    let mut defines = Vec::new();
    let mut options = Vec::new();
    let mut positional = Vec::new();

    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        if arg == "-d" && i + 1 < args.len() {
            defines.push(args[i + 1].as_str());
            i += 1;
        } else if arg.starts_with("--") {
            if !arg.contains('=')
                && i + 1 < args.len()
                && !args[i + 1].starts_with('-')
                && takes_value(arg)
            {
                options.push(format!("{} {}", arg, args[i + 1]));
                i += 1;
            } else {
                options.push(arg.clone());
            }
        } else {
            positional.push(arg.as_str());
        }
        i += 1;
    }

    for define in defines {
        println!("      • define: {define}");
    }
    if let Some((bootstrap, targets)) = positional.split_first() {
        println!("      • bootstrap: {bootstrap}");
        for option in &options {
            println!("      • option: {option}");
        }
        for target in targets {
            println!("      • target: {target}");
        }
    }
    if let Some(dir) = invocation.working_dir() {
        println!("      • working dir: {}", dir.display());
    }
    for (key, value) in invocation.env_vars() {
        println!("      • env: {key}={value}");
    }
}

fn takes_value(flag: &str) -> bool {
    matches!(
        flag,
        "--log-xml"
            | "--log-junit"
            | "--configuration"
            | "--coverage-html"
            | "--coverage-clover"
            | "--filter"
            | "--group"
            | "--exclude-group"
            | "--bootstrap"
    )
}
