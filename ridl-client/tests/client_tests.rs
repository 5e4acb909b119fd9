//! Client against a live server.

use ridl_client::{Client, ClientError, ConnectionConfig};
use ridl_codec::{CodecRegistry, StructValue, Value};
use ridl_protocol::ApplicationExceptionKind;
use ridl_rpc::{Processor, RpcError, ServiceError};
use ridl_schema::Schema;
use ridl_server::{Server, ServerConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

const SCHEMA: &str = r#"
structs:
  - name: Point
    fields:
      - {id: 1, name: x, type: i32, requiredness: required}
      - {id: 2, name: y, type: i32, requiredness: required}
exceptions:
  - name: TooFar
    fields: [{id: 1, name: limit, type: i32}]
services:
  - name: Base
    functions:
      - {name: ping}
  - name: Geo
    extends: Base
    functions:
      - name: dist
        returns: i32
        args:
          - {id: 1, name: a, type: Point}
          - {id: 2, name: b, type: Point}
        throws: [{id: 1, name: far, type: TooFar}]
      - {name: log, oneway: true, args: [{id: 1, name: line, type: string}]}
      - {name: slow, returns: i32}
      - {name: broken, returns: i32}
"#;

fn point(x: i32, y: i32) -> Value {
    StructValue::new("Point").with(1, x).with(2, y).into()
}

fn coords(v: &Value) -> (i32, i32) {
    let s = v.as_struct().unwrap();
    (
        s.get(1).and_then(Value::as_i32).unwrap(),
        s.get(2).and_then(Value::as_i32).unwrap(),
    )
}

struct Harness {
    server: Arc<Server>,
    addr: std::net::SocketAddr,
    registry: Arc<CodecRegistry>,
    logged: Arc<AtomicUsize>,
}

impl Harness {
    async fn client(&self, config: impl FnOnce(ConnectionConfig) -> ConnectionConfig) -> Client {
        let client = Client::new(
            config(ConnectionConfig::new(self.addr)),
            self.registry.clone(),
            "Geo",
        )
        .unwrap();
        client.connect().await.unwrap();
        client
    }
}

async fn start() -> Harness {
    let schema = Schema::from_yaml_str(SCHEMA).unwrap();
    let registry = Arc::new(CodecRegistry::compile(Arc::new(schema)).unwrap());
    let logged = Arc::new(AtomicUsize::new(0));
    let counter = logged.clone();

    let processor = Processor::builder(registry.clone(), "Geo")
        .unwrap()
        .handler("ping", |_| Ok(None))
        .handler("dist", |args| {
            let (ax, ay) = coords(&args[0]);
            let (bx, by) = coords(&args[1]);
            let d = (((bx - ax).pow(2) + (by - ay).pow(2)) as f64).sqrt() as i32;
            if d > 100 {
                return Err(ServiceError::from(StructValue::new("TooFar").with(1, 100)));
            }
            Ok(Some(Value::I32(d)))
        })
        .handler("log", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        })
        .handler("slow", |_| {
            std::thread::sleep(Duration::from_millis(500));
            Ok(Some(Value::I32(1)))
        })
        .handler("broken", |_| Err(ServiceError::other("disk on fire")))
        .build()
        .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = Arc::new(Server::new(
        ServerConfig::new(addr),
        Arc::new(processor),
    ));
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

    Harness {
        server,
        addr,
        registry,
        logged,
    }
}

#[tokio::test]
async fn test_call_returns_success() {
    let harness = start().await;
    let client = harness.client(|c| c).await;
    assert!(client.is_connected());

    let result = client.call("dist", &[point(0, 0), point(3, 4)]).await.unwrap();
    assert_eq!(result, Some(Value::I32(5)));

    // inherited void method
    assert_eq!(client.call("ping", &[]).await.unwrap(), None);
    harness.server.shutdown();
}

#[tokio::test]
async fn test_declared_exception() {
    let harness = start().await;
    let client = harness.client(|c| c).await;

    let err = client
        .call("dist", &[point(0, 0), point(300, 400)])
        .await
        .unwrap_err();
    let (name, exception) = err.call_error().and_then(|e| e.declared()).unwrap();
    assert_eq!(name, "TooFar");
    assert_eq!(exception.get(1), Some(&Value::I32(100)));

    // the connection survives a declared exception
    let result = client.call("dist", &[point(0, 0), point(0, 7)]).await.unwrap();
    assert_eq!(result, Some(Value::I32(7)));
}

#[tokio::test]
async fn test_handler_failure_is_internal_error() {
    let harness = start().await;
    let client = harness.client(|c| c).await;

    let err = client.call("broken", &[]).await.unwrap_err();
    let exception = err.call_error().and_then(|e| e.application()).unwrap();
    assert_eq!(exception.kind, ApplicationExceptionKind::InternalError);
    assert!(exception.message.contains("disk on fire"));
}

#[tokio::test]
async fn test_oneway_does_not_wait() {
    let harness = start().await;
    let client = harness.client(|c| c).await;

    assert_eq!(client.call("log", &[Value::from("a")]).await.unwrap(), None);
    assert_eq!(client.call("log", &[Value::from("b")]).await.unwrap(), None);

    // a later call is answered in order, after both oneway requests ran
    let result = client.call("dist", &[point(0, 0), point(0, 1)]).await.unwrap();
    assert_eq!(result, Some(Value::I32(1)));
    assert_eq!(harness.logged.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_unknown_method_is_rejected_locally() {
    let harness = start().await;
    let client = harness.client(|c| c).await;

    let err = client.call("teleport", &[]).await.unwrap_err();
    assert!(matches!(err, ClientError::Rpc(RpcError::UnknownMethod { .. })));

    let err = client.call("dist", &[point(0, 0)]).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Call(ridl_rpc::CallError::Rpc(RpcError::ArgumentCount { .. }))
    ));
    assert!(client.is_connected());
}

#[tokio::test]
async fn test_request_timeout_drops_connection() {
    let harness = start().await;
    let client = harness
        .client(|c| c.with_request_timeout(Duration::from_millis(100)))
        .await;

    let err = client.call("slow", &[]).await.unwrap_err();
    assert!(matches!(err, ClientError::Timeout));
    assert!(err.is_retryable());
    assert!(!client.is_connected());
    assert!(matches!(
        client.call("ping", &[]).await,
        Err(ClientError::NotConnected)
    ));

    client.connect().await.unwrap();
    assert_eq!(client.call("ping", &[]).await.unwrap(), None);
}

#[tokio::test]
async fn test_close_and_reconnect() {
    let harness = start().await;
    let client = harness.client(|c| c).await;

    client.close().await.unwrap();
    assert!(!client.is_connected());
    assert!(matches!(
        client.call("ping", &[]).await,
        Err(ClientError::NotConnected)
    ));

    client.connect().await.unwrap();
    let result = client.call("dist", &[point(1, 1), point(1, 1)]).await.unwrap();
    assert_eq!(result, Some(Value::I32(0)));
}

#[tokio::test]
async fn test_connect_refused() {
    // bind then drop to get a port with nothing listening
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let schema = Schema::from_yaml_str(SCHEMA).unwrap();
    let registry = Arc::new(CodecRegistry::compile(Arc::new(schema)).unwrap());
    let client = Client::new(ConnectionConfig::new(addr), registry, "Geo").unwrap();
    assert!(matches!(client.connect().await, Err(ClientError::Io(_))));
    assert!(!client.is_connected());
}
