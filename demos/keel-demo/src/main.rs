use std::process::ExitCode;

use health::{AuditLog, Cache, ConnectionPool, HealthCheck, Repository};
use keel_config::ParamOverrides;
use keel_di::EngineBuilder;

mod health;
mod logging;

fn main() -> ExitCode {
    logging::init_logging("info");

    match futures::executor::block_on(run()) {
        Ok(()) => {
            tracing::info!("Demo ended without error");
            ExitCode::SUCCESS
        }
        Err(error) => {
            tracing::error!("Demo ended with error: {error}");
            ExitCode::FAILURE
        }
    }
}

/// Prefix of the override variables, kept apart from `KEEL_LOG`
const OVERRIDE_PREFIX: &str = "KEEL_PARAM";

/// Builds the engine from `KEEL_PARAM_*` overrides, queries it once and shuts it down
async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let overrides = ParamOverrides::from_env(OVERRIDE_PREFIX)?;
    let audit = overrides.resolve("audit", &false)?;

    let mut builder = EngineBuilder::new()
        .register::<Repository>()
        .register::<Cache>()
        .register::<ConnectionPool>()
        .override_params(overrides.iter());
    if audit {
        builder = builder.add_instance(AuditLog);
    }

    let engine = builder.build().await?;
    tracing::debug!("{engine:?}");

    let repository = engine.require::<Repository>()?;
    tracing::info!("{}", repository.query("user:1"));

    for check in engine.stream::<dyn HealthCheck>() {
        match check.check() {
            Ok(()) => tracing::info!("{} is healthy", check.name()),
            Err(reason) => tracing::warn!("{} is unhealthy: {reason}", check.name()),
        }
    }

    engine.stop().await?;
    Ok(())
}
