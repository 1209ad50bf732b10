use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // LPG_DATABASE_URL is left out on purpose: it can carry credentials
    const DISPLAY_ENVS: [&str; 8] = [
        "RUST_LOG",
        "LPG_DATABASE_MAX_CONNECTIONS",
        "LPG_REINIT_DATABASE",
        "LPG_ACCRUAL_SYSTEM_ADDRESS",
        "LPG_ACCRUAL_POLL_INTERVAL",
        "LPG_ACCRUAL_BATCH_SIZE",
        "LPG_ACCRUAL_ORDER_TIMEOUT",
        "LPG_ACCRUAL_WORKER_ENABLED",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
