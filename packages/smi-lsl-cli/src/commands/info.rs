use crate::cli::InfoArgs;
use crate::exit_codes;
use crate::output;
use serde::Serialize;
use smi_lsl::outlet::lsl_available;
use smi_lsl::sdk::ffi::{LIBRARY_ENV_VAR, LIBRARY_HOME_ENV_VAR};
use smi_lsl::sdk::{default_library_name, find_library, DEFAULT_LIBRARY_PATHS};

#[derive(Serialize)]
struct InfoOutput {
    cli_version: String,
    library_name: &'static str,
    library_path: Option<String>,
    library_found: bool,
    lsl_support: bool,
    platform: String,
    arch: String,
    search_paths: Vec<&'static str>,
}

pub fn execute(args: InfoArgs) -> i32 {
    let library_path = find_library(args.sdk_path.as_deref());

    let info = InfoOutput {
        cli_version: env!("CARGO_PKG_VERSION").to_string(),
        library_name: default_library_name(),
        library_path: library_path.as_ref().map(|p| p.display().to_string()),
        library_found: library_path.is_some(),
        lsl_support: lsl_available(),
        platform: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        search_paths: DEFAULT_LIBRARY_PATHS.to_vec(),
    };

    if args.json {
        if let Err(e) = output::emit_json(&info, None) {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    } else {
        println!("smi-lsl CLI v{}", info.cli_version);
        println!("Platform: {} ({})", info.platform, info.arch);
        println!();
        if let Some(ref path) = info.library_path {
            println!("iViewX SDK: {}", path);
        } else {
            println!("iViewX SDK: not found");
        }
        println!("Library name: {}", info.library_name);
        println!(
            "Search paths: ${}, ${}/bin, {}",
            LIBRARY_ENV_VAR,
            LIBRARY_HOME_ENV_VAR,
            info.search_paths.join(", ")
        );
        println!(
            "LSL support: {}",
            if info.lsl_support { "yes" } else { "no (json sink only)" }
        );
    }

    exit_codes::SUCCESS
}
