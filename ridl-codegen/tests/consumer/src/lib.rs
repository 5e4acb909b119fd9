//! Bindings generated from `geo.yaml` by the build script, compiled as an
//! ordinary module so the emitted code is type-checked and exercised.

#[allow(
    dead_code,
    unused_imports,
    unused_mut,
    unused_variables,
    unreachable_patterns,
    clippy::all
)]
pub mod geo {
    include!(concat!(env!("OUT_DIR"), "/geo.rs"));
}

#[cfg(test)]
mod tests {
    use super::geo::*;
    use parking_lot::Mutex;
    use ridl_codec::{CodecRegistry, StructValue};
    use ridl_protocol::{
        ApplicationException, ApplicationExceptionKind, BinaryReader, BinaryWriter, Bytes,
        MessageHeader, MessageType, ProtocolError, ProtocolReader, ProtocolWriter,
    };
    use ridl_rpc::{Process, StubError};
    use ridl_schema::Schema;
    use std::sync::Arc;
    use std::time::Duration;

    const SCHEMA: &str = include_str!("../geo.yaml");

    struct Atlas {
        version: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Atlas {
        fn new(version: &'static str) -> Self {
            Self {
                version,
                log: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl BaseHandler for Atlas {
        fn ping(&self) -> Result<(), BasePingError> {
            Ok(())
        }

        fn version(&self) -> Result<String, BaseVersionError> {
            Ok(self.version.to_string())
        }
    }

    impl GeoHandler for Atlas {
        fn dist(&self, a: Point, b: Point) -> Result<i32, GeoDistError> {
            if a.x < 0 || b.x < 0 {
                return Err(GeoDistError::Other("negative coordinates".to_string()));
            }
            if a == b {
                return Err(Invalid {
                    reason: "same point".to_string(),
                }
                .into());
            }
            let d = f64::from((b.x - a.x).pow(2) + (b.y - a.y).pow(2)).sqrt() as i32;
            if d > 100 {
                return Err(TooFar { limit: 100 }.into());
            }
            Ok(d)
        }

        fn log(&self, line: String) -> Result<(), String> {
            self.log.lock().push(format!("{}:{}", self.version, line));
            Ok(())
        }

        fn touch(&self, p: Point) -> Result<(), GeoTouchError> {
            if p.x < 0 {
                return Err(GeoTouchError::Invalid(Invalid {
                    reason: "off the map".to_string(),
                }));
            }
            Ok(())
        }
    }

    fn pt(x: i32, y: i32) -> Point {
        Point { x, y }
    }

    /// In-memory transport from a generated client to a processor.
    fn exchange(processor: &dyn Process) -> impl FnOnce(Bytes) -> Result<Bytes, ProtocolError> + '_ {
        move |request| Ok(processor.process_message(request).unwrap().unwrap())
    }

    #[test]
    fn test_client_processor_round_trip() {
        let processor = GeoProcessor::new(Atlas::new("1.0"));
        let client = GeoClient::new();

        assert_eq!(client.dist(exchange(&processor), pt(0, 0), pt(3, 4)).unwrap(), 5);
        assert_eq!(client.version(exchange(&processor)).unwrap(), "1.0");
        client.ping(exchange(&processor)).unwrap();
        client.touch(exchange(&processor), pt(1, 1)).unwrap();
        assert_eq!(processor.service(), "Geo");
    }

    #[test]
    fn test_declared_exceptions() {
        let processor = GeoProcessor::new(Atlas::new("1.0"));
        let client = GeoClient::new();

        let err = client
            .dist(exchange(&processor), pt(0, 0), pt(300, 400))
            .unwrap_err();
        assert!(matches!(
            err,
            StubError::Declared(GeoDistError::Far(TooFar { limit: 100 }))
        ));

        let err = client.dist(exchange(&processor), pt(2, 2), pt(2, 2)).unwrap_err();
        match err {
            StubError::Declared(GeoDistError::Invalid(e)) => assert_eq!(e.reason, "same point"),
            other => panic!("unexpected error: {other:?}"),
        }

        // a void method can still raise
        let err = client.touch(exchange(&processor), pt(-1, 0)).unwrap_err();
        assert!(matches!(err, StubError::Declared(GeoTouchError::Invalid(_))));
    }

    #[test]
    fn test_undeclared_failure_is_internal_error() {
        let processor = GeoProcessor::new(Atlas::new("1.0"));
        let client = GeoClient::new();

        match client.dist(exchange(&processor), pt(-1, 0), pt(3, 4)) {
            Err(StubError::Application(e)) => {
                assert_eq!(e.kind, ApplicationExceptionKind::InternalError);
                assert!(e.message.contains("negative coordinates"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_method() {
        let processor = GeoProcessor::new(Atlas::new("1.0"));
        let mut w = BinaryWriter::new();
        w.write_message_begin(&MessageHeader::new("teleport", MessageType::Call, 9))
            .unwrap();
        w.write_struct_begin("teleport_args").unwrap();
        w.write_field_stop().unwrap();
        w.write_struct_end().unwrap();
        w.write_message_end().unwrap();

        let reply = processor
            .process_message(w.into_bytes().freeze())
            .unwrap()
            .unwrap();
        let mut reader = BinaryReader::new(reply);
        let header = reader.read_message_begin().unwrap();
        assert_eq!(header.message_type, MessageType::Exception);
        assert_eq!(header.seq_id, 9);
        let e = ApplicationException::read(&mut reader).unwrap();
        assert_eq!(e.kind, ApplicationExceptionKind::UnknownMethod);

        // the processor keeps serving
        let client = GeoClient::new();
        assert_eq!(client.dist(exchange(&processor), pt(0, 0), pt(0, 2)).unwrap(), 2);
    }

    #[test]
    fn test_reply_for_another_method() {
        let processor = GeoProcessor::new(Atlas::new("1.0"));
        let client = GeoClient::new();

        let mut w = BinaryWriter::new();
        client.send_ping(&mut w).unwrap();
        let reply = processor
            .process_message(w.into_bytes().freeze())
            .unwrap()
            .unwrap();
        match client.recv_version(&mut BinaryReader::new(reply)) {
            Err(StubError::Application(e)) => {
                assert_eq!(e.kind, ApplicationExceptionKind::WrongMethodName)
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_oneway_sends_without_reply() {
        let atlas = Atlas::new("1.0");
        let log = atlas.log.clone();
        let processor = GeoProcessor::new(atlas);
        let client = GeoClient::new();

        client
            .log(
                |request| {
                    assert!(processor.process_message(request).unwrap().is_none());
                    Ok(())
                },
                "hello".to_string(),
            )
            .unwrap();
        assert_eq!(*log.lock(), vec!["1.0:hello".to_string()]);
    }

    #[test]
    fn test_derived_client_shares_sequence_ids() {
        let client = GeoClient::new();
        let seq_of = |bytes: Bytes| {
            BinaryReader::new(bytes)
                .read_message_begin()
                .unwrap()
                .seq_id
        };

        let mut w = BinaryWriter::new();
        let first = client.send_ping(&mut w).unwrap();
        assert_eq!(seq_of(w.into_bytes().freeze()), first);

        let mut w = BinaryWriter::new();
        let second = client.send_dist(&mut w, pt(0, 0), pt(1, 1)).unwrap();
        assert_eq!(second, first + 1);

        let mut w = BinaryWriter::new();
        assert_eq!(client.parent().send_version(&mut w).unwrap(), second + 1);
    }

    #[test]
    fn test_multiface_returns_last_result() {
        let first = Arc::new(Atlas::new("1.0"));
        let second = Arc::new(Atlas::new("2.0"));
        let handler: Arc<dyn GeoHandler> = first.clone();
        let mut multi = GeoMultiface::new(vec![handler]);
        multi.add(second.clone());
        assert_eq!(multi.len(), 2);

        let processor = GeoProcessor::new(multi);
        let client = GeoClient::new();
        assert_eq!(client.version(exchange(&processor)).unwrap(), "2.0");
        assert_eq!(client.dist(exchange(&processor), pt(0, 0), pt(3, 4)).unwrap(), 5);

        client
            .log(
                |request| {
                    processor.process_message(request).unwrap();
                    Ok(())
                },
                "fan".to_string(),
            )
            .unwrap();
        assert_eq!(*first.log.lock(), vec!["1.0:fan".to_string()]);
        assert_eq!(*second.log.lock(), vec!["2.0:fan".to_string()]);

        let empty = GeoProcessor::new(GeoMultiface::default());
        match client.version(exchange(&empty)) {
            Err(StubError::Application(e)) => {
                assert_eq!(e.kind, ApplicationExceptionKind::InternalError);
                assert!(e.message.contains("no handlers"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_struct_codec_matches_dynamic_codec() {
        let shape = Shape::default();
        assert_eq!(shape.color, Color::BLUE);
        assert!(shape.tags.is_empty());
        assert_eq!(shape.label, None);

        let mut w = BinaryWriter::new();
        shape.write(&mut w).unwrap();
        let generated = w.into_bytes().freeze();

        let schema = Schema::from_yaml_str(SCHEMA).unwrap();
        let registry = CodecRegistry::compile(Arc::new(schema)).unwrap();
        let dynamic = registry
            .encode_struct("Shape", &StructValue::new("Shape").with(1, ""))
            .unwrap();
        assert_eq!(generated, dynamic);

        let labelled = Shape {
            name: "sq".to_string(),
            tags: vec!["a".to_string(), "b".to_string()],
            label: Some("corner".to_string()),
            ..Shape::default()
        };
        let mut w = BinaryWriter::new();
        labelled.write(&mut w).unwrap();
        let bytes = w.into_bytes().freeze();
        let decoded = registry.decode_struct("Shape", bytes.clone()).unwrap();
        assert_eq!(decoded.get(4).and_then(|v| v.as_str()), Some("corner"));
        assert_eq!(Shape::read(&mut BinaryReader::new(bytes)).unwrap(), labelled);
    }

    #[tokio::test]
    async fn test_round_trip_over_tcp() {
        use ridl_client::{Connection, ConnectionConfig};
        use ridl_server::{Server, ServerConfig};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let processor = Arc::new(GeoProcessor::new(Atlas::new("1.0")));
        let server = Arc::new(Server::new(ServerConfig::new(addr), processor));
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

        let conn = Connection::new(ConnectionConfig::new(addr));
        conn.connect().await.unwrap();
        let client = GeoClient::new();

        let mut w = BinaryWriter::new();
        client.send_dist(&mut w, pt(0, 0), pt(6, 8)).unwrap();
        let reply = conn.request(w.into_bytes().freeze()).await.unwrap();
        assert_eq!(client.recv_dist(&mut BinaryReader::new(reply)).unwrap(), 10);

        let mut w = BinaryWriter::new();
        client.send_dist(&mut w, pt(0, 0), pt(0, 500)).unwrap();
        let reply = conn.request(w.into_bytes().freeze()).await.unwrap();
        assert!(matches!(
            client.recv_dist(&mut BinaryReader::new(reply)),
            Err(StubError::Declared(GeoDistError::Far(_)))
        ));

        conn.close().await.unwrap();
        server.shutdown();
    }
}
