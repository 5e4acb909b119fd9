//! Building the processor a server binary exposes.

use crate::config::ServiceConfig;
use crate::error::ServerError;
use ridl_codec::CodecRegistry;
use ridl_rpc::Processor;
use ridl_schema::Schema;
use std::sync::Arc;

/// Picks the configured service, or the only service of the schema.
pub fn select_service(schema: &Schema, name: Option<&str>) -> Result<String, ServerError> {
    match name {
        Some(name) => schema
            .get_service(name)
            .map(|s| s.name.clone())
            .ok_or_else(|| ServerError::NoService(format!("schema has no service '{}'", name))),
        None => match schema.services() {
            [only] => Ok(only.name.clone()),
            [] => Err(ServerError::NoService("schema declares no services".to_string())),
            _ => Err(ServerError::NoService(
                "schema declares several services; set RIDL_SERVICE".to_string(),
            )),
        },
    }
}

/// Loads the configured schema and builds a processor answering every
/// method with the zero value of its return type.
pub fn null_processor(config: &ServiceConfig) -> Result<Processor, ServerError> {
    let path = config
        .schema
        .as_ref()
        .ok_or_else(|| ServerError::NoService("no schema configured; set RIDL_SCHEMA".to_string()))?;
    let schema = Schema::from_file(path)?;
    let service = select_service(&schema, config.name.as_deref())?;
    let registry = Arc::new(CodecRegistry::compile(Arc::new(schema))?);
    let processor = Processor::null(registry, &service)?;
    tracing::info!(
        "Loaded {} from {} ({} methods)",
        service,
        path.display(),
        processor.methods().len()
    );
    Ok(processor)
}
