//! CLI smoke entry point.
//!
//! # Responsibility
//! - Load libraries through `nativeloader_core` from a JSON configuration.
//! - Keep output line-oriented so scripts can grep it.
//!
//! Usage: `nativeloader_cli <config.json> <origin> <library>...`
//! Set `NATIVELOADER_LOG_DIR` to an absolute path to enable file logging.

use nativeloader_core::{
    core_version, default_log_level, init_logging, HostBackend, LibraryRequest, LoaderConfig,
    NativeLoader,
};
use std::process::ExitCode;
use std::sync::Arc;

const USAGE: &str = "usage: nativeloader_cli <config.json> <origin> <library>...\n       nativeloader_cli --version";

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.first().map(String::as_str) == Some("--version") {
        println!("nativeloader_core version={}", core_version());
        return ExitCode::SUCCESS;
    }
    let [config_path, origin, libraries @ ..] = args.as_slice() else {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    };
    if libraries.is_empty() {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    }

    if let Ok(log_dir) = std::env::var("NATIVELOADER_LOG_DIR") {
        if let Err(err) = init_logging(default_log_level(), &log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    let loader = match LoaderConfig::from_path(config_path)
        .and_then(|config| NativeLoader::from_config(&config, Arc::new(HostBackend)))
    {
        Ok(loader) => loader,
        Err(err) => {
            eprintln!("event=config status=error error={err}");
            return ExitCode::from(2);
        }
    };

    let mut failures = 0usize;
    for library in libraries {
        match loader.load(&LibraryRequest::new(library.as_str(), origin.as_str())) {
            Ok(loaded) => println!(
                "event=load status=ok library={} namespace={} path={} handle={}",
                library,
                loaded.namespace,
                loaded.path.display(),
                loaded.handle
            ),
            Err(err) => {
                failures += 1;
                println!("event=load status=error library={library} error={err}");
            }
        }
    }

    if failures == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
