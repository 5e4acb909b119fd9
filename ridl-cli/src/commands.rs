//! Command execution.

use crate::Commands;
use colored::Colorize;
use ridl_client::{Client, ClientError, ConnectionConfig};
use ridl_codec::CodecRegistry;
use ridl_codegen::GenOptions;
use ridl_protocol::Bytes;
use ridl_rpc::{CallError, RpcError};
use ridl_schema::Schema;
use serde_json::Value;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

type CommandResult = Result<String, Box<dyn std::error::Error>>;

/// Executes a command and returns the formatted output.
pub async fn execute(schema_path: &Path, cmd: Commands) -> CommandResult {
    let schema = Schema::from_file(schema_path)?;

    match cmd {
        Commands::Check => Ok(check(&schema, schema_path)),

        Commands::Fingerprint { name, all } => fingerprint(&schema, name.as_deref(), all),

        Commands::Gen {
            out,
            module,
            no_skeleton,
        } => {
            let options = GenOptions {
                module,
                skeletons: !no_skeleton,
                ..Default::default()
            };
            generate(&schema, &out, &options)
        }

        Commands::Encode { name, value } => {
            let registry = CodecRegistry::compile(Arc::new(schema))?;
            encode(&registry, &name, &parse_json_arg(&value)?)
        }

        Commands::Decode { name, hex } => {
            let registry = CodecRegistry::compile(Arc::new(schema))?;
            decode(&registry, &name, &hex)
        }

        Commands::Call {
            server,
            service,
            timeout,
            method,
            args,
        } => {
            let service = ridl_server::select_service(&schema, service.as_deref())?;
            let registry = Arc::new(CodecRegistry::compile(Arc::new(schema))?);
            let args = args
                .iter()
                .map(|a| parse_json_arg(a))
                .collect::<Result<Vec<_>, _>>()?;
            let config = ConnectionConfig::new(server)
                .with_request_timeout(Duration::from_secs(timeout));
            call(registry, &service, config, &method, &args).await
        }
    }
}

fn check(schema: &Schema, path: &Path) -> String {
    let structs = schema.user_structs().filter(|s| !s.is_exception).count();
    let exceptions = schema.user_structs().filter(|s| s.is_exception).count();
    let methods: usize = schema.services().iter().map(|s| s.functions.len()).sum();

    let mut output = format!("{} {}\n", "OK".green(), path.display());
    if let Some(ns) = schema.namespace() {
        output.push_str(&format!("  {:<12} {}\n", "namespace", ns.cyan()));
    }
    for (label, count) in [
        ("enums", schema.enums().len()),
        ("typedefs", schema.typedefs().len()),
        ("constants", schema.consts().len()),
        ("structs", structs),
        ("exceptions", exceptions),
        ("services", schema.services().len()),
        ("methods", methods),
    ] {
        output.push_str(&format!("  {:<12} {}\n", label, count));
    }
    for service in schema.services() {
        match &service.extends {
            Some(parent) => output.push_str(&format!(
                "  {} {} extends {}\n",
                "service".dimmed(),
                service.name.cyan(),
                parent
            )),
            None => output.push_str(&format!(
                "  {} {}\n",
                "service".dimmed(),
                service.name.cyan()
            )),
        }
    }
    output.trim_end().to_string()
}

fn fingerprint(schema: &Schema, name: Option<&str>, all: bool) -> CommandResult {
    if let Some(name) = name {
        let def = schema
            .get_struct(name)
            .ok_or_else(|| format!("unknown struct '{}'", name))?;
        return Ok(def.fingerprint.clone());
    }

    let defs: Vec<_> = schema
        .structs()
        .iter()
        .filter(|s| all || !s.is_synthetic())
        .collect();
    if defs.is_empty() {
        return Ok("No structs declared".yellow().to_string());
    }
    let width = defs.iter().map(|s| s.name.len()).max().unwrap_or(0);
    Ok(defs
        .iter()
        .map(|s| format!("{:<width$}  {}", s.name, s.fingerprint, width = width))
        .collect::<Vec<_>>()
        .join("\n"))
}

fn generate(schema: &Schema, out: &Path, options: &GenOptions) -> CommandResult {
    let files = ridl_codegen::generate(schema, options)?;
    ridl_codegen::write_files(out, &files)?;

    let mut output = String::new();
    for file in &files {
        output.push_str(&format!(
            "{} {}\n",
            "Wrote".green(),
            out.join(&file.path).display()
        ));
    }
    Ok(output.trim_end().to_string())
}

fn encode(registry: &CodecRegistry, name: &str, json: &Value) -> CommandResult {
    let value = registry.struct_from_json(name, json)?;
    let bytes = registry.encode_struct(name, &value)?;
    Ok(hex::encode(bytes))
}

fn decode(registry: &CodecRegistry, name: &str, encoded: &str) -> CommandResult {
    let bytes = hex::decode(encoded.trim())?;
    let value = registry.decode_struct(name, Bytes::from(bytes))?;
    Ok(format_json(&registry.struct_to_json(name, &value)?))
}

async fn call(
    registry: Arc<CodecRegistry>,
    service: &str,
    config: ConnectionConfig,
    method: &str,
    args: &[Value],
) -> CommandResult {
    let server: SocketAddr = config.addr;
    let client = Client::new(config, registry.clone(), service)?;
    let desc = client
        .stub()
        .method(method)
        .cloned()
        .ok_or_else(|| RpcError::UnknownMethod {
            service: service.to_string(),
            method: method.to_string(),
        })?;
    if args.len() != desc.args.len() {
        return Err(RpcError::ArgumentCount {
            method: method.to_string(),
            expected: desc.args.len(),
            found: args.len(),
        }
        .into());
    }
    let values = desc
        .args
        .iter()
        .zip(args)
        .map(|(slot, json)| registry.from_json(&slot.ty, json))
        .collect::<Result<Vec<_>, _>>()?;

    client.connect().await.map_err(|e| {
        eprintln!("{}: {}", "Connection failed".red(), server);
        e
    })?;
    let result = client.call(method, &values).await;
    client.close().await?;

    match result {
        Ok(Some(value)) => Ok(format_json(&registry.to_json(&desc.return_type, &value)?)),
        Ok(None) if desc.oneway => Ok("Sent".green().to_string()),
        Ok(None) => Ok("OK".green().to_string()),
        Err(ClientError::Call(CallError::Declared {
            name, exception, ..
        })) => {
            let json = registry.struct_to_json(&name, &exception)?;
            Err(format!("{} {}", name.yellow(), format_json(&json)).into())
        }
        Err(e) => Err(e.into()),
    }
}

/// Parses a JSON argument (either inline JSON or @file.json).
fn parse_json_arg(arg: &str) -> Result<Value, Box<dyn std::error::Error>> {
    if let Some(path) = arg.strip_prefix('@') {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    } else {
        Ok(serde_json::from_str(arg)?)
    }
}

/// Formats JSON for display.
fn format_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ridl_rpc::Processor;
    use ridl_server::{Server, ServerConfig};
    use serde_json::json;

    const SCHEMA: &str = r#"
namespace: demo.geo
structs:
  - name: Point
    fields:
      - {id: 1, name: x, type: i32, requiredness: required}
      - {id: 2, name: y, type: i32, requiredness: required}
  - name: Pair
    fields:
      - {id: 1, name: left, type: i32, requiredness: required}
      - {id: 2, name: right, type: i32, requiredness: required}
exceptions:
  - name: TooFar
    fields: [{id: 1, name: limit, type: i32}]
services:
  - name: Geo
    functions:
      - name: dist
        returns: i32
        args:
          - {id: 1, name: a, type: Point}
          - {id: 2, name: b, type: Point}
        throws: [{id: 1, name: far, type: TooFar}]
      - {name: origin, returns: Point}
"#;

    fn schema() -> Schema {
        Schema::from_yaml_str(SCHEMA).unwrap()
    }

    fn registry() -> Arc<CodecRegistry> {
        Arc::new(CodecRegistry::compile(Arc::new(schema())).unwrap())
    }

    #[test]
    fn test_check_summary() {
        colored::control::set_override(false);
        let output = check(&schema(), Path::new("geo.yaml"));
        assert!(output.starts_with("OK geo.yaml"));
        assert!(output.contains("namespace    demo.geo"));
        assert!(output.contains("structs      2"));
        assert!(output.contains("exceptions   1"));
        assert!(output.contains("methods      2"));
    }

    #[test]
    fn test_fingerprint() {
        let schema = schema();
        let output = fingerprint(&schema, None, false).unwrap();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 3);

        // same wire shape, same fingerprint
        let point = fingerprint(&schema, Some("Point"), false).unwrap();
        let pair = fingerprint(&schema, Some("Pair"), false).unwrap();
        assert_eq!(point, pair);
        assert_eq!(point.len(), 64);

        let all = fingerprint(&schema, None, true).unwrap();
        assert!(all.contains("Geo_dist_args"));
        assert!(fingerprint(&schema, Some("Nope"), false).is_err());
    }

    #[test]
    fn test_encode_decode_hex() {
        let registry = registry();
        let encoded = encode(&registry, "Point", &json!({"x": 3, "y": 4})).unwrap();
        // i32 field 1 = 3, i32 field 2 = 4, stop
        assert_eq!(encoded, "080001000000030800020000000400");

        let decoded = decode(&registry, "Point", &encoded).unwrap();
        let value: Value = serde_json::from_str(&decoded).unwrap();
        assert_eq!(value, json!({"x": 3, "y": 4}));

        assert!(decode(&registry, "Point", "zz").is_err());
        assert!(encode(&registry, "Point", &json!({"x": 3})).is_err());
    }

    #[test]
    fn test_generate_writes_files() {
        colored::control::set_override(false);
        let dir = tempfile::tempdir().unwrap();
        let output = generate(&schema(), dir.path(), &GenOptions::default()).unwrap();
        assert!(output.contains("geo.rs"));
        assert!(dir.path().join("geo.rs").exists());
        assert!(dir.path().join("geo_server.skeleton.rs").exists());
    }

    #[test]
    fn test_parse_json_arg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arg.json");
        std::fs::write(&path, r#"{"x": 1}"#).unwrap();

        assert_eq!(
            parse_json_arg(&format!("@{}", path.display())).unwrap(),
            json!({"x": 1})
        );
        assert_eq!(parse_json_arg("[1, 2]").unwrap(), json!([1, 2]));
        assert!(parse_json_arg("{").is_err());
    }

    #[tokio::test]
    async fn test_call_null_service() {
        colored::control::set_override(false);
        let registry = registry();
        let processor = Processor::null(registry.clone(), "Geo").unwrap();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Arc::new(Server::new(ServerConfig::new(addr), Arc::new(processor)));
        tokio::spawn({
            let server = server.clone();
            async move { server.serve(listener).await }
        });
        for _ in 0..100 {
            if server.is_running() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let args = [json!({"x": 0, "y": 0}), json!({"x": 3, "y": 4})];
        let output = call(
            registry.clone(),
            "Geo",
            ConnectionConfig::new(addr),
            "dist",
            &args,
        )
        .await
        .unwrap();
        assert_eq!(output, "0");

        let output = call(registry.clone(), "Geo", ConnectionConfig::new(addr), "origin", &[])
            .await
            .unwrap();
        let origin: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(origin, json!({"x": 0, "y": 0}));

        let err = call(registry, "Geo", ConnectionConfig::new(addr), "dist", &args[..1])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("takes 2 argument(s), got 1"));

        server.shutdown();
    }
}
