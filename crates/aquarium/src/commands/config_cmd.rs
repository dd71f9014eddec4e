//! Config subcommand handlers.

use serde::Serialize;
use tabled::Tabled;

use aquarium_core::DeviceAddress;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output::{self, Output};

// ── Helpers ─────────────────────────────────────────────────────────

fn validate_address(raw: &str) -> Result<(), CliError> {
    raw.parse::<DeviceAddress>()
        .map(drop)
        .map_err(|e| CliError::Validation {
            field: "address".into(),
            reason: e.to_string(),
        })
}

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "")]
    active: &'static str,
    #[tabled(rename = "Profile")]
    name: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Push")]
    push: String,
    #[tabled(rename = "Poll")]
    poll: String,
}

impl ProfileRow {
    fn new(name: &str, profile: &Profile, cfg: &Config) -> Self {
        let push = match (profile.websocket, profile.push_port) {
            (Some(false), _) => "off".into(),
            (_, Some(port)) => format!(":{port}"),
            (_, None) => ":81".into(),
        };
        let poll_ms = profile
            .poll_interval_ms
            .unwrap_or(cfg.defaults.poll_interval_ms);
        Self {
            active: if cfg.default_profile.as_deref() == Some(name) { "*" } else { "" },
            name: name.to_owned(),
            address: profile.address.clone(),
            push,
            poll: if poll_ms == 0 {
                "off".into()
            } else {
                format!("{poll_ms} ms")
            },
        }
    }
}

#[derive(Serialize)]
struct ConfigView<'a> {
    path: String,
    #[serde(flatten)]
    config: &'a Config,
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts, out: &Output) -> Result<(), CliError> {
    match args.command {
        // ── Init ────────────────────────────────────────────────────
        ConfigCommand::Init {
            device,
            push_port,
            pull_only,
            force,
        } => {
            validate_address(&device)?;
            let mut cfg = config::load_config()?;
            let profile_name = config::active_profile_name(global, &cfg);

            if cfg.profiles.contains_key(&profile_name) && !force {
                return Err(CliError::ProfileExists { name: profile_name });
            }

            let profile = Profile {
                address: device,
                push_port,
                websocket: pull_only.then_some(false),
                ..Profile::default()
            };
            if cfg.profiles.is_empty() {
                cfg.default_profile = Some(profile_name.clone());
            }
            cfg.profiles.insert(profile_name.clone(), profile);

            let path = config::save_config(&cfg)?;
            out.note(&format!("✓ Profile '{profile_name}' written to {}", path.display()));
            out.note("  Test it: aquarium status");
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::load_config_or_default();
            let view = ConfigView {
                path: config::config_path().display().to_string(),
                config: &cfg,
            };
            let rendered = output::render_single(
                out.format,
                &view,
                |v| {
                    let mut names: Vec<&String> = v.config.profiles.keys().collect();
                    names.sort();
                    let rows: Vec<ProfileRow> = names
                        .into_iter()
                        .filter_map(|name| {
                            v.config
                                .profiles
                                .get(name)
                                .map(|p| ProfileRow::new(name, p, v.config))
                        })
                        .collect();
                    if rows.is_empty() {
                        format!("No profiles in {}", v.path)
                    } else {
                        output::render_table(&rows)
                    }
                },
                |v| {
                    let mut names: Vec<&str> =
                        v.config.profiles.keys().map(String::as_str).collect();
                    names.sort_unstable();
                    names.join("\n")
                },
            )?;
            out.print(&rendered);
            Ok(())
        }

        // ── Set address ─────────────────────────────────────────────
        ConfigCommand::SetAddress { new_address } => {
            validate_address(&new_address)?;
            let mut cfg = config::load_config()?;
            let profile_name = config::active_profile_name(global, &cfg);

            if cfg.profiles.is_empty() {
                cfg.default_profile = Some(profile_name.clone());
            }
            cfg.profiles.entry(profile_name.clone()).or_default().address = new_address.clone();

            let path = config::save_config(&cfg)?;
            out.note(&format!(
                "✓ Profile '{profile_name}' now targets {new_address} ({})",
                path.display()
            ));
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            out.print(&config::config_path().display().to_string());
            Ok(())
        }
    }
}
