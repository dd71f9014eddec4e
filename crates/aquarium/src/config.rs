//! CLI configuration: thin wrapper around `aquarium_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` overrides (--address,
//! --timeout, --output, --color) on top of the selected profile.

use std::time::Duration;

use clap::ValueEnum;

use aquarium_core::{ControllerConfig, DeviceAddress};

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;

pub use aquarium_config::{
    Config, Profile, config_path, load_config, load_config_or_default, profile_address,
    profile_to_controller_config, save_config,
};

/// Everything a device-bound command needs to run.
#[derive(Debug)]
pub struct Resolved {
    pub profile_name: String,
    pub address: DeviceAddress,
    pub controller: ControllerConfig,
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.profile_name(global.profile.as_deref()).to_owned()
}

/// Output format: flag > env > `[defaults].output` > table.
pub fn output_format(global: &GlobalOpts, config: &Config) -> OutputFormat {
    global.output.unwrap_or_else(|| {
        OutputFormat::from_str(&config.defaults.output, true).unwrap_or(OutputFormat::Table)
    })
}

/// Color mode: flag > `[defaults].color` > auto.
pub fn color_mode(global: &GlobalOpts, config: &Config) -> ColorMode {
    global.color.unwrap_or_else(|| {
        ColorMode::from_str(&config.defaults.color, true).unwrap_or(ColorMode::Auto)
    })
}

/// Translate the selected profile + global flags into a device address and
/// `ControllerConfig`.
///
/// An explicitly named profile must exist. Without one, a missing default
/// profile is fine as long as `--address` supplies the device.
pub fn resolve(global: &GlobalOpts, config: &Config) -> Result<Resolved, CliError> {
    let profile_name = active_profile_name(global, config);

    let fallback = Profile::default();
    let profile = match config.profiles.get(&profile_name) {
        Some(profile) => profile,
        None if global.profile.is_some() => {
            let mut names: Vec<&str> = config.profiles.keys().map(String::as_str).collect();
            names.sort_unstable();
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: if names.is_empty() {
                    "(none)".into()
                } else {
                    names.join(", ")
                },
            });
        }
        None => &fallback,
    };

    // 1. Device address (flag > env > profile)
    let address = match global.address.as_deref() {
        Some(raw) => raw.parse::<DeviceAddress>().map_err(|e| CliError::Validation {
            field: "address".into(),
            reason: e.to_string(),
        })?,
        None => profile_address(profile, &profile_name)?,
    };

    // 2. Cadences, ports, pins from the profile
    let mut controller = profile_to_controller_config(profile, &config.defaults)?;

    // 3. Timeout override
    if let Some(secs) = global.timeout {
        controller.request_timeout = Some(Duration::from_secs(secs));
    }

    Ok(Resolved {
        profile_name,
        address,
        controller,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::Parser;

    use crate::cli::Cli;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["aquarium"];
        argv.extend_from_slice(args);
        argv.push("status");
        Cli::try_parse_from(argv).unwrap().global
    }

    fn sample() -> Config {
        aquarium_config::parse_config(
            r#"
default_profile = "tank"

[defaults]
output = "json-compact"
color = "never"

[profiles.tank]
address = "192.168.70.37"
timeout = 3

[profiles.nano]
address = "nano.local:8080"
websocket = false
"#,
        )
        .unwrap()
    }

    #[test]
    fn profile_values_apply() {
        let resolved = resolve(&global(&[]), &sample()).unwrap();
        assert_eq!(resolved.profile_name, "tank");
        assert_eq!(resolved.address.as_str(), "192.168.70.37");
        assert_eq!(resolved.controller.request_timeout, Some(Duration::from_secs(3)));
        assert!(resolved.controller.websocket_enabled);
    }

    #[test]
    fn flags_override_profile() {
        let g = global(&["--profile", "nano", "--address", "10.0.0.8", "--timeout", "9"]);
        let resolved = resolve(&g, &sample()).unwrap();
        assert_eq!(resolved.address.as_str(), "10.0.0.8");
        assert_eq!(resolved.controller.request_timeout, Some(Duration::from_secs(9)));
        assert!(!resolved.controller.websocket_enabled);
    }

    #[test]
    fn address_flag_works_without_profiles() {
        let g = global(&["--address", "10.0.0.8"]);
        let resolved = resolve(&g, &Config::default()).unwrap();
        assert_eq!(resolved.address.as_str(), "10.0.0.8");
        assert_eq!(resolved.controller.push_port, 81);
    }

    #[test]
    fn missing_address_and_unknown_profile() {
        let err = resolve(&global(&[]), &Config::default()).unwrap_err();
        assert!(matches!(err, CliError::NoAddress { .. }), "got: {err:?}");

        let err = resolve(&global(&["--profile", "reef"]), &sample()).unwrap_err();
        match err {
            CliError::ProfileNotFound { name, available } => {
                assert_eq!(name, "reef");
                assert_eq!(available, "nano, tank");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn output_and_color_fall_back_to_defaults() {
        let cfg = sample();
        assert_eq!(output_format(&global(&[]), &cfg), OutputFormat::JsonCompact);
        assert_eq!(output_format(&global(&["-o", "plain"]), &cfg), OutputFormat::Plain);
        assert_eq!(color_mode(&global(&[]), &cfg), ColorMode::Never);
        assert_eq!(color_mode(&global(&[]), &Config::default()), ColorMode::Auto);
    }
}
