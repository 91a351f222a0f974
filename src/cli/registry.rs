//! Registry account command implementations (register, publish)

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use regex::Regex;

use super::{run_async, EXIT_ERROR, EXIT_SUCCESS};
use crate::deps::{
    AssumeYes, Confirm, Credentials, DependencyResolver, HttpRegistry, RegistryConfig,
    RegistryError, StdinConfirm,
};

const EMAIL_PATTERN: &str = r"^[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z0-9](?:[a-z0-9-]*[a-z0-9])?$";
const PACKAGE_ID_PATTERN: &str = r"^[a-zA-Z0-9]+$";
const VERSION_PATTERN: &str = r"^[a-zA-Z0-9.\-]+$";

fn matches(pattern: &str, value: &str) -> bool {
    Regex::new(pattern).map(|re| re.is_match(value)).unwrap_or(false)
}

fn is_valid_email(value: &str) -> bool {
    matches(EMAIL_PATTERN, value)
}

fn is_valid_package_id(value: &str) -> bool {
    matches(PACKAGE_ID_PATTERN, value)
}

fn is_valid_version(value: &str) -> bool {
    matches(VERSION_PATTERN, value)
}

fn is_present(value: &str) -> bool {
    !value.is_empty()
}

/// Ask until `valid` accepts the answer. `None` when stdin is closed.
fn prompt(label: &str, valid: fn(&str) -> bool) -> Option<String> {
    let stdin = std::io::stdin();
    let mut stderr = std::io::stderr();
    loop {
        let _ = write!(stderr, "{}: ", label);
        let _ = stderr.flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => return None,
            Ok(_) => {}
        }
        let answer = line.trim().to_string();
        if valid(&answer) {
            return Some(answer);
        }
        let _ = writeln!(stderr, "'{}' is not a valid value, try again", answer);
    }
}

fn required(label: &str, valid: fn(&str) -> bool) -> Result<String, ExitCode> {
    prompt(label, valid).ok_or_else(|| {
        eprintln!("Error: no input for {}", label.to_lowercase());
        ExitCode::from(EXIT_ERROR)
    })
}

fn report(result: Result<Result<(), RegistryError>, std::io::Error>, done: &str) -> ExitCode {
    match result {
        Ok(Ok(())) => {
            println!("{}", done);
            ExitCode::from(EXIT_SUCCESS)
        }
        Ok(Err(e)) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
        Err(e) => {
            eprintln!("Error: failed to start async runtime: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Run the register command
pub fn run_register() -> ExitCode {
    let registry = match HttpRegistry::new(&RegistryConfig::from_env()) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let answers = (|| {
        Ok::<_, ExitCode>((
            required("Username", is_present)?,
            required("Email", is_valid_email)?,
            required("Password", is_present)?,
        ))
    })();
    let (username, email, password) = match answers {
        Ok(a) => a,
        Err(code) => return code,
    };

    report(
        run_async(registry.register(&username, &email, &password)),
        &format!("Developer '{}' registered", username),
    )
}

/// Run the publish command
pub fn run_publish(
    source: Option<&Path>,
    package: Option<&str>,
    version: Option<&str>,
    yes: bool,
) -> ExitCode {
    let fields = (|| -> Result<(PathBuf, String, String), ExitCode> {
        let source = match source {
            Some(p) => p.to_path_buf(),
            None => PathBuf::from(required("Source file", is_present)?),
        };
        let package = match package {
            Some(p) if is_valid_package_id(p) => p.to_string(),
            Some(p) => {
                eprintln!("Error: invalid package id '{}' (letters and digits only)", p);
                return Err(ExitCode::from(EXIT_ERROR));
            }
            None => required("Package id", is_valid_package_id)?,
        };
        let version = match version {
            Some(v) if is_valid_version(v) => v.to_string(),
            Some(v) => {
                eprintln!("Error: invalid version '{}'", v);
                return Err(ExitCode::from(EXIT_ERROR));
            }
            None => required("Version", is_valid_version)?,
        };
        Ok((source, package, version))
    })();
    let (source_path, package, version) = match fields {
        Ok(f) => f,
        Err(code) => return code,
    };

    let source = match std::fs::read_to_string(&source_path) {
        Ok(s) => s,
        Err(source) => {
            eprintln!("Error: {}", RegistryError::Io { path: source_path, source });
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let registry = match HttpRegistry::new(&RegistryConfig::from_env()) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    let confirm: Box<dyn Confirm> = if yes { Box::new(AssumeYes) } else { Box::new(StdinConfirm) };
    let resolver = DependencyResolver::new(registry, confirm);

    match run_async(resolver.confirm_publish(&package, &version)) {
        Ok(Ok(true)) => {}
        Ok(Ok(false)) => {
            println!("Version {} of {} was left unchanged", version, package);
            return ExitCode::from(EXIT_SUCCESS);
        }
        Ok(Err(e)) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
        Err(e) => {
            eprintln!("Error: failed to start async runtime: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    }

    let credentials = match (|| {
        Ok::<_, ExitCode>(Credentials {
            username: required("Username", is_present)?,
            password: required("Password", is_present)?,
        })
    })() {
        Ok(c) => c,
        Err(code) => return code,
    };

    tracing::debug!(package = %package, version = %version, "publishing");
    report(
        run_async(resolver.registry().publish(&package, &version, &source, &credentials)),
        &format!("Version {} of {} published", version, package),
    )
}
