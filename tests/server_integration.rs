/*
 * server_integration.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * Integration tests for the server over real sockets: accept with timeout
 * semantics, request parsing, response marshalling, keep-alive style
 * sequential requests, and the streaming codecs layered over a request
 * body, all on the loopback interface.
 */

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use mostra::{
    Body, ByteSink, ByteSource, ChunkedWriter, Connection, ContentLengthFlag, Error, Headers,
    Multipart, Protocol, Request, Response, ResponseCode, Server, Socket,
};

fn localhost_server(timeout: i32) -> Server {
    Server::new("::1", 0, timeout).expect("bind on ::1")
}

async fn read_until_closed(stream: &mut TcpStream) -> Vec<u8> {
    let mut bytes = Vec::new();
    stream.read_to_end(&mut bytes).await.expect("read response");
    bytes
}

async fn drain_body<S: ByteSource>(body: &mut Body<'_, S>) -> Vec<u8> {
    let mut content = Vec::new();
    let mut buf = [0u8; 256];
    loop {
        let n = body.read(&mut buf).await.expect("body read");
        if n == 0 {
            break;
        }
        content.extend_from_slice(&buf[..n]);
    }
    content
}

#[tokio::test]
async fn serve_parses_request_and_writes_response() {
    let mut server = localhost_server(2);
    let port = server.port();
    assert_ne!(port, 0);

    let client = tokio::spawn(async move {
        let mut stream = TcpStream::connect(("::1", port)).await.unwrap();
        stream.write_all(b"GET / HTTP/1.0\r\n\r\n").await.unwrap();
        read_until_closed(&mut stream).await
    });

    let mut connection = server.serve().await.expect("serve");
    {
        let (request, _body) = Request::parse(&mut connection).await.expect("parse");
        assert_eq!(request.method(), "GET");
        assert!(request.path().is_empty());
        assert!(request.query_args().is_empty());
        assert!(request.headers().is_empty());
        assert_eq!(request.protocol(), Protocol::Http1_0);
        assert_eq!(request.content_length_flag(), ContentLengthFlag::No);
    }

    let mut headers = Headers::new();
    headers.append("Content-Length", "7");
    let mut response = Response::new(
        &mut connection,
        Protocol::Http1_0,
        &ResponseCode::new(200, "OK"),
        &headers,
    )
    .await
    .expect("response head");
    response.write(b"hello\r\n").await.unwrap();
    response.finish().await.unwrap();
    drop(connection);

    let bytes = client.await.unwrap();
    assert_eq!(
        bytes,
        b"HTTP/1.0 200 OK\r\nContent-Length: 7\r\n\r\nhello\r\n"
    );
}

#[tokio::test]
async fn serve_times_out_without_a_client() {
    let mut server = localhost_server(1);
    let err = server.serve().await.unwrap_err();
    assert!(matches!(err, Error::ConnectionTimeout));
    assert!(err.is_connection_interrupted());
}

#[tokio::test]
async fn zero_timeout_accept_does_not_block() {
    let mut server = localhost_server(0);
    let err = server.serve().await.unwrap_err();
    assert!(matches!(err, Error::ConnectionTimeout));
}

#[tokio::test]
async fn request_read_times_out_on_a_silent_client() {
    let mut server = localhost_server(1);
    let port = server.port();

    let client = tokio::spawn(async move {
        let stream = TcpStream::connect(("::1", port)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_secs(3)).await;
        drop(stream);
    });

    let mut connection = server.serve().await.expect("serve");
    let err = Request::parse(&mut connection).await.unwrap_err();
    assert!(matches!(err, Error::ConnectionTimeout));
    client.abort();
}

#[tokio::test]
async fn client_disconnect_is_reported() {
    let mut server = localhost_server(2);
    let port = server.port();

    let client = tokio::spawn(async move {
        let stream = TcpStream::connect(("::1", port)).await.unwrap();
        drop(stream);
    });

    let mut connection = server.serve().await.expect("serve");
    client.await.unwrap();
    let err = Request::parse(&mut connection).await.unwrap_err();
    assert!(matches!(err, Error::ClientDisconnected));
    assert!(err.is_connection_interrupted());
}

#[tokio::test]
async fn connection_reports_loopback_addresses() {
    let mut server = localhost_server(2);
    let port = server.port();
    assert_eq!(server.address(), "::1");

    let client = tokio::spawn(async move {
        let mut stream = TcpStream::connect(("::1", port)).await.unwrap();
        stream.write_all(b"GET / HTTP/1.0\r\n\r\n").await.unwrap();
        read_until_closed(&mut stream).await
    });

    let connection = server.serve().await.expect("serve");
    assert_eq!(connection.server_address(), "::1");
    assert_eq!(connection.server_port(), port);
    assert_eq!(connection.client_address(), "::1");
    assert_ne!(connection.client_port(), 0);
    drop(connection);
    client.await.unwrap();
}

#[tokio::test]
async fn sequential_requests_on_one_connection() {
    let mut server = localhost_server(2);
    let port = server.port();

    let client = tokio::spawn(async move {
        let mut stream = TcpStream::connect(("::1", port)).await.unwrap();
        stream
            .write_all(
                b"POST /first HTTP/1.1\r\nContent-Length: 3\r\n\r\nabc\
                  GET /second HTTP/1.1\r\n\r\n",
            )
            .await
            .unwrap();
        read_until_closed(&mut stream).await
    });

    let mut connection = server.serve().await.expect("serve");

    {
        let (request, mut body) = Request::parse(&mut connection).await.expect("first parse");
        assert_eq!(request.method(), "POST");
        assert_eq!(request.path(), ["first"]);
        assert_eq!(drain_body(&mut body).await, b"abc");
    }
    {
        let (request, _body) = Request::parse(&mut connection).await.expect("second parse");
        assert_eq!(request.method(), "GET");
        assert_eq!(request.path(), ["second"]);
    }

    let headers = Headers::from([("Content-Length", "2")]);
    let mut response = Response::new(
        &mut connection,
        Protocol::Http1_1,
        &ResponseCode::new(200, "OK"),
        &headers,
    )
    .await
    .expect("response head");
    response.write(b"ok").await.unwrap();
    response.finish().await.unwrap();
    drop(connection);

    let bytes = client.await.unwrap();
    assert!(bytes.starts_with(b"HTTP/1.1 200 OK\r\n"));
}

#[tokio::test]
async fn client_socket_speaks_to_server() {
    let mut server = localhost_server(2);
    let port = server.port();

    let served = tokio::spawn(async move {
        let mut connection = server.serve().await.expect("serve");
        let (request, mut body) = Request::parse(&mut connection).await.expect("parse");
        assert_eq!(request.method(), "PUT");
        assert_eq!(request.content_length_flag(), ContentLengthFlag::Yes);
        let content = drain_body(&mut body).await;
        drop(body);

        let headers = Headers::from([("Content-Length", "6")]);
        let mut response = Response::new(
            &mut connection,
            request.protocol(),
            &ResponseCode::new(200, "OK"),
            &headers,
        )
        .await
        .expect("response head");
        response.write(b"stored").await.unwrap();
        response.finish().await.unwrap();
        content
    });

    let socket = Socket::connect("::1", port, 0).await.expect("connect");
    assert_eq!(socket.remote_port(), port);
    let mut connection = Connection::new(socket, 2);
    connection
        .write(b"PUT /data HTTP/1.1\r\nContent-Length: 4\r\n\r\nwxyz")
        .await
        .unwrap();
    connection.flush().await.unwrap();

    let mut received = Vec::new();
    let mut buf = [0u8; 128];
    loop {
        match connection.read(&mut buf).await {
            Ok(n) => received.extend_from_slice(&buf[..n]),
            Err(Error::ClientDisconnected) => break,
            Err(e) => panic!("unexpected read failure: {}", e),
        }
    }
    assert_eq!(
        received,
        b"HTTP/1.1 200 OK\r\nContent-Length: 6\r\n\r\nstored"
    );
    assert_eq!(served.await.unwrap(), b"wxyz");
}

#[tokio::test]
async fn multipart_form_parsed_from_request_body() {
    let form = b"--AaB03x\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\nhello world\r\n--AaB03x\r\n\r\nfoo bar\r\n--AaB03x--";
    let request_head = format!(
        "POST /upload HTTP/1.1\r\nContent-Length: {}\r\nContent-Type: multipart/form-data; boundary=AaB03x\r\n\r\n",
        form.len()
    );

    let mut server = localhost_server(2);
    let port = server.port();

    let client = tokio::spawn(async move {
        let mut stream = TcpStream::connect(("::1", port)).await.unwrap();
        stream.write_all(request_head.as_bytes()).await.unwrap();
        stream.write_all(form).await.unwrap();
        read_until_closed(&mut stream).await
    });

    let mut connection = server.serve().await.expect("serve");
    {
        let (request, mut body) = Request::parse(&mut connection).await.expect("parse");
        assert_eq!(request.content_length_flag(), ContentLengthFlag::Yes);

        let mut multipart = Multipart::new(&mut body, "AaB03x").await.expect("multipart");
        let mut segment = multipart.next_segment().await.unwrap().expect("segment 1");
        assert_eq!(
            segment.headers().get_first("Content-Disposition"),
            Some("form-data; name=\"a\"")
        );
        let mut content = Vec::new();
        let mut buf = [0u8; 64];
        loop {
            let n = segment.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            content.extend_from_slice(&buf[..n]);
        }
        assert_eq!(content, b"hello world");
        drop(segment);

        let segment = multipart.next_segment().await.unwrap().expect("segment 2");
        assert!(segment.headers().is_empty());
        drop(segment);
        assert!(multipart.next_segment().await.unwrap().is_none());
    }

    let headers = Headers::from([("Content-Length", "2")]);
    let mut response = Response::new(
        &mut connection,
        Protocol::Http1_1,
        &ResponseCode::new(200, "OK"),
        &headers,
    )
    .await
    .unwrap();
    response.write(b"ok").await.unwrap();
    response.finish().await.unwrap();
    drop(connection);
    client.await.unwrap();
}

#[tokio::test]
async fn chunked_response_over_a_connection() {
    let mut server = localhost_server(2);
    let port = server.port();

    let client = tokio::spawn(async move {
        let mut stream = TcpStream::connect(("::1", port)).await.unwrap();
        stream.write_all(b"GET /stream HTTP/1.1\r\n\r\n").await.unwrap();
        read_until_closed(&mut stream).await
    });

    let mut connection = server.serve().await.expect("serve");
    {
        let (_request, _body) = Request::parse(&mut connection).await.expect("parse");
    }

    let headers = Headers::from([("Transfer-Encoding", "chunked")]);
    let mut writer = ChunkedWriter::with_response(
        &mut connection,
        Protocol::Http1_1,
        &ResponseCode::new(200, "OK"),
        &headers,
    )
    .await
    .expect("chunked response");
    writer.write_chunk(b"abc").await.unwrap();
    writer.write_chunk(b"de").await.unwrap();
    writer.finish().await.unwrap();
    drop(connection);

    let bytes = client.await.unwrap();
    assert_eq!(
        bytes,
        b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabc\r\n2\r\nde\r\n0\r\n\r\n"
    );
}
