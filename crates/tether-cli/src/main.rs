// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tether_common_core::{AppId, RepoSlug};
use tether_common_secret::SecretString;
use tether_config::{load_config, load_config_with_file, LogFormat, TetherConfig};
use tether_credentials::{App, Cipher, ManifestCredentials};
use tether_packages::{PackageKind, PackageService, PackageView, ReleaseChannel, TrustedDelivery};
use tracing::info;

mod engine;
mod host;
mod logging;

/// Tether - GitHub-backed updates for plugins and themes
#[derive(Parser, Debug)]
#[command(name = "tether", version, about, long_about = None)]
struct Args {
	/// Path to custom configuration file
	#[arg(short, long)]
	config: Option<PathBuf>,

	/// Log level (overrides config)
	#[arg(short, long)]
	log_level: Option<String>,

	/// Output logs as JSON (overrides config)
	#[arg(long)]
	json_logs: bool,

	/// JSON inventory of installed plugins and themes
	#[arg(long, env = "TETHER_INVENTORY", default_value = "tether-inventory.json")]
	inventory: PathBuf,

	/// Directory that receives installed archives
	#[arg(long, env = "TETHER_INSTALL_DIR", default_value = "tether-packages")]
	install_dir: PathBuf,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	#[command(flatten)]
	Engine(EngineCommand),
	/// Print a new base64 credential encryption key
	Keygen,
}

/// Commands that run against configured storage and GitHub.
#[derive(Subcommand, Debug)]
enum EngineCommand {
	/// List packages with their update status
	Packages {
		/// Output as JSON
		#[arg(long)]
		json: bool,
	},
	/// Refresh repository and release caches, then list packages
	Sync {
		/// Output as JSON
		#[arg(long)]
		json: bool,
	},
	/// Install a release of a package
	Install {
		/// Repository as owner/repo
		repo: RepoSlug,
		/// Release version or tag
		version: String,
		/// plugin or theme, when both use the repository
		#[arg(long)]
		kind: Option<PackageKind>,
	},
	/// Reinstall an older release of a package
	Rollback {
		/// Repository as owner/repo
		repo: RepoSlug,
		/// Release version or tag
		version: String,
		/// plugin or theme, when both use the repository
		#[arg(long)]
		kind: Option<PackageKind>,
	},
	/// Assign a repository to one App
	Assign {
		app_id: AppId,
		/// Repository as owner/repo
		repo: RepoSlug,
	},
	/// Choose the release channel a repository follows
	Channel {
		/// Repository as owner/repo
		repo: RepoSlug,
		/// stable, beta, alpha or develop
		channel: ReleaseChannel,
	},
	/// Manage connected GitHub Apps
	Apps {
		#[command(subcommand)]
		command: AppsCommand,
	},
	/// Apply a verified webhook delivery
	Event {
		/// Value of the X-GitHub-Event header
		event: String,
		/// App the delivery was addressed to
		app_id: AppId,
		/// Payload file, `-` for stdin
		#[arg(long, default_value = "-")]
		payload: PathBuf,
	},
}

#[derive(Subcommand, Debug)]
enum AppsCommand {
	/// List connected Apps
	List {
		/// Output as JSON
		#[arg(long)]
		json: bool,
	},
	/// Connect an App from its GitHub credentials
	Add {
		name: String,
		/// GitHub's numeric App id
		#[arg(long)]
		github_app_id: u64,
		/// App slug on GitHub
		#[arg(long, default_value = "")]
		slug: String,
		/// PEM private key file
		#[arg(long)]
		private_key: PathBuf,
		/// Installation id, when the App is already installed
		#[arg(long)]
		installation_id: Option<u64>,
	},
	/// Delete an App and purge its cached state
	Disconnect { app_id: AppId },
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();

	match args.command {
		Command::Keygen => {
			println!("{}", Cipher::generate_base64_key());
			Ok(())
		}
		Command::Engine(command) => {
			let config = load(args.config.as_deref(), args.log_level, args.json_logs)?;
			logging::init_tracing(&config.logging);

			let (service, handler) = engine::build(&config, &args.inventory, &args.install_dir).await?;
			let events = tokio::spawn(handler.run());

			let result = run(&service, command).await;

			// The handler drains queued events once the last sender is gone.
			drop(service);
			events.await.context("invalidation handler panicked")?;
			result
		}
	}
}

fn load(path: Option<&Path>, log_level: Option<String>, json_logs: bool) -> Result<TetherConfig> {
	let mut config = match path {
		Some(path) => load_config_with_file(path),
		None => load_config(),
	}
	.context("failed to load configuration")?;
	if let Some(level) = log_level {
		config.logging.level = level;
	}
	if json_logs {
		config.logging.format = LogFormat::Json;
	}
	Ok(config)
}

async fn run(service: &PackageService, command: EngineCommand) -> Result<()> {
	match command {
		EngineCommand::Packages { json } => print_packages(&service.list_packages().await?, json),
		EngineCommand::Sync { json } => print_packages(&service.sync().await?, json),
		EngineCommand::Install { repo, version, kind } => {
			print_json(&service.install(&repo, kind, &version).await?)
		}
		EngineCommand::Rollback { repo, version, kind } => {
			print_json(&service.rollback(&repo, kind, &version).await?)
		}
		EngineCommand::Assign { app_id, repo } => {
			let app = service.assign(&app_id, &repo).await?;
			println!("{repo} is now managed by {} ({})", app.name, app.id);
			Ok(())
		}
		EngineCommand::Channel { repo, channel } => {
			service.set_channel(&repo, channel).await?;
			println!("{repo} follows the {channel} channel");
			Ok(())
		}
		EngineCommand::Apps { command } => run_apps(service, command).await,
		EngineCommand::Event {
			event,
			app_id,
			payload,
		} => {
			let payload = read_payload(&payload)?;
			let parsed = service
				.on_event(&TrustedDelivery {
					event,
					payload,
					app_id,
				})
				.await?;
			info!(event = ?parsed, "Webhook event queued");
			Ok(())
		}
	}
}

async fn run_apps(service: &PackageService, command: AppsCommand) -> Result<()> {
	match command {
		AppsCommand::List { json } => {
			let apps = service.apps().await?;
			if json {
				return print_json(&apps);
			}
			for app in &apps {
				let repos: Vec<&str> = app.managed_repositories.iter().map(RepoSlug::as_str).collect();
				println!(
					"{:<38} {:<24} {:<12} installation={:<10} repos=[{}]",
					app.id.as_str(),
					app.name,
					app.status.to_string(),
					app.installation_id,
					repos.join(", ")
				);
			}
			Ok(())
		}
		AppsCommand::Add {
			name,
			github_app_id,
			slug,
			private_key,
			installation_id,
		} => {
			let pem = std::fs::read_to_string(&private_key)
				.with_context(|| format!("cannot read private key {}", private_key.display()))?;
			let app = connect_app(service, name, github_app_id, slug, pem, installation_id).await?;
			println!("{} ({}) is {}", app.name, app.id, app.status);
			Ok(())
		}
		AppsCommand::Disconnect { app_id } => {
			let app = service.disconnect_app(&app_id).await?;
			println!("{} ({}) disconnected", app.name, app.id);
			Ok(())
		}
	}
}

/// Walks a new App through pending, app_created and, given an installation
/// id, installed.
async fn connect_app(
	service: &PackageService,
	name: String,
	github_app_id: u64,
	slug: String,
	pem: String,
	installation_id: Option<u64>,
) -> Result<App> {
	let credentials = service.credentials();
	let pending = credentials.save(App::new(name)).await?;
	let mut app = credentials
		.record_manifest_credentials(
			&pending.id,
			ManifestCredentials {
				app_id: github_app_id,
				slug,
				name: None,
				private_key: SecretString::new(pem),
				webhook_secret: SecretString::empty(),
			},
		)
		.await?;
	if let Some(installation_id) = installation_id {
		app = credentials.mark_installed(&app.id, installation_id).await?;
	}
	Ok(app)
}

fn read_payload(path: &Path) -> Result<serde_json::Value> {
	let raw = if path.as_os_str() == "-" {
		let mut raw = String::new();
		std::io::stdin()
			.read_to_string(&mut raw)
			.context("cannot read payload from stdin")?;
		raw
	} else {
		std::fs::read_to_string(path).with_context(|| format!("cannot read payload {}", path.display()))?
	};
	serde_json::from_str(&raw).context("payload is not valid JSON")
}

fn print_packages(views: &[PackageView], json: bool) -> Result<()> {
	if json {
		return print_json(&views);
	}
	for view in views {
		let installed = if view.installed_version.is_empty() {
			"-"
		} else {
			view.installed_version.as_str()
		};
		println!(
			"{:<24} {:<6} {:<32} {:<12} {:<8} {:<14} {}",
			view.slug,
			view.kind.to_string(),
			view.repo.as_str(),
			installed,
			view.channel.to_string(),
			view.latest_version.as_deref().unwrap_or("-"),
			view.status
		);
	}
	Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
	println!("{}", serde_json::to_string_pretty(value)?);
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn keygen_is_its_own_command() {
		let args = Args::try_parse_from(["tether", "keygen"]).unwrap();
		assert!(matches!(args.command, Command::Keygen));
	}

	#[test]
	fn install_takes_an_optional_kind() {
		let args = Args::try_parse_from(["tether", "install", "acme/widget", "1.2.0", "--kind", "theme"]).unwrap();
		match args.command {
			Command::Engine(EngineCommand::Install { repo, version, kind }) => {
				assert_eq!(repo.as_str(), "acme/widget");
				assert_eq!(version, "1.2.0");
				assert_eq!(kind, Some(PackageKind::Theme));
			}
			other => panic!("unexpected command {other:?}"),
		}

		let args = Args::try_parse_from(["tether", "rollback", "acme/widget", "1.0.0"]).unwrap();
		assert!(matches!(
			args.command,
			Command::Engine(EngineCommand::Rollback { kind: None, .. })
		));
	}
}
