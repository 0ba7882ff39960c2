//! Wires CLI arguments and the loaded `coralpkg.conf` into a
//! [`coralpkg_core::Context`] and a [`coralpkg_planner::Planner`].

use crate::cli::Cli;
use crate::output::progress::CliProgressSink;
use anyhow::Result;
use coralpkg_config::Config;
use coralpkg_core::{Context, NullSignatureVerifier, NullSystemConfigTrigger};
use coralpkg_fetch::{FetchConfig, HttpFetcher, RetryConfig};
use coralpkg_planner::PlannerConfig;
use std::sync::Arc;
use std::time::Duration;

/// The package a system must always retain; removing it is refused
/// unless forced. No `coralpkg.conf` key carries this today, so it is a
/// fixed constant rather than sourced from configuration.
const BOOTSTRAP_PACKAGE: &str = "coral-base";

pub fn load_config(cli: &Cli) -> Result<Config> {
    if cli.config.exists() {
        Ok(coralpkg_config::load_with_env(&cli.config)?)
    } else {
        let mut config = Config::default();
        coralpkg_config::apply_env_overrides(&mut config);
        Ok(config)
    }
}

pub fn build_context(cli: &Cli, config: &Config) -> Result<Context> {
    let hidden = cli.quiet || !crate::output::is_tty();
    let progress = Arc::new(CliProgressSink::new(hidden));

    let fetch_config = FetchConfig {
        bandwidth_limit_kib_per_sec: config.general.bandwidth_limit,
        http_proxy: config.general.http_proxy.clone(),
        https_proxy: config.general.https_proxy.clone(),
        retry: RetryConfig::new(config.general.retry_attempts),
        connect_timeout: Duration::from_secs(10),
        read_timeout: Duration::from_secs(60),
        ..FetchConfig::default()
    };
    let fetcher = Arc::new(HttpFetcher::new(fetch_config)?);

    Ok(Context::new(
        cli.root.clone(),
        config.directories.cache_dir.clone(),
        fetcher,
        Arc::new(NullSignatureVerifier),
        Arc::new(NullSystemConfigTrigger),
        progress,
    ))
}

pub fn planner_config(cli: &Cli, config: &Config) -> PlannerConfig {
    PlannerConfig {
        distro_id: format!("{}-{}", config.general.distribution, config.general.distribution_release),
        arch: config.general.architecture.clone(),
        bootstrap_package: BOOTSTRAP_PACKAGE.to_string(),
        max_fetch_attempts: config.general.retry_attempts.max(1),
        ignore_check: cli.ignore_check || config.general.ignore_safety,
        ignore_file_conflicts: cli.ignore_file_conflicts,
        ignore_delta: config.general.ignore_delta,
    }
}
