use curlreq::http::headerparser::{HeaderParser, HeaderValue};
use curlreq::http::orderedheaders::{canonical_header_name, HeaderTable};

#[test]
fn test_header_table_insertion_order() {
    let mut headers = HeaderTable::new();

    headers.insert("Host", "example.com");
    headers.insert("connection", "keep-alive");
    headers.insert("user_agent", "curlreq/0.1");
    headers.insert("HTTP_ACCEPT", "*/*");

    assert_eq!(
        headers.as_list(),
        vec![
            "Host: example.com",
            "Connection: keep-alive",
            "User-Agent: curlreq/0.1",
            "Accept: */*",
        ]
    );
}

#[test]
fn test_header_table_update_preserves_order() {
    let mut headers = HeaderTable::new();

    headers.insert("A", "1");
    headers.insert("B", "2");
    headers.insert("C", "3");

    // Update B through a differently spelled name
    headers.insert("b", "22");

    assert_eq!(headers.as_list(), vec!["A: 1", "B: 22", "C: 3"]);
}

#[test]
fn test_header_table_removal() {
    let mut headers = HeaderTable::new();
    headers.insert("Accept", "text/html");
    headers.insert("Referer", "http://a.com/");

    headers.set_header("accept", None);

    assert_eq!(headers.as_list(), vec!["Referer: http://a.com/"]);
    assert_eq!(headers.get("Accept"), None);
}

#[test]
fn test_canonical_names() {
    assert_eq!(canonical_header_name("HTTP_ACCEPT_CHARSET"), "Accept-Charset");
    assert_eq!(canonical_header_name("accept_charset"), "Accept-Charset");
    assert_eq!(canonical_header_name("content-TYPE"), "Content-Type");
    assert_eq!(canonical_header_name("et"), "ET");
    assert_eq!(canonical_header_name("x_b2b_id"), "X-B2B-Id");
}

#[test]
fn test_parse_status_and_repeated_headers() {
    let block = HeaderParser::parse(&[
        "HTTP/1.1 404 Not Found",
        "Content-Type: text/html",
        "Set-Cookie: a=1",
        "Set-Cookie: b=2",
    ]);

    assert_eq!(block.http_version(), Some("1.1"));
    assert_eq!(block.first("Status-Code"), Some("404"));
    assert_eq!(block.status(), Some("404 Not Found"));
    assert_eq!(block.get("Content-Type"), Some(&HeaderValue::Single("text/html".into())));
    assert_eq!(
        block.get("Set-Cookie"),
        Some(&HeaderValue::Multiple(vec!["a=1".into(), "b=2".into()]))
    );
}

#[test]
fn test_parse_raw_block_with_interim_status() {
    let raw = "HTTP/1.1 100 Continue\r\n\r\nHTTP/1.1 201 Created\r\nLocation: /items/7\r\nX-Count: 1\r\nX-Count: 2\r\nX-Count: 3\r\n\r\n";
    let block = HeaderParser::parse_block(raw);

    assert_eq!(block.status_code(), Some(201));
    assert_eq!(block.status(), Some("201 Created"));
    assert_eq!(block.first("location"), Some("/items/7"));
    assert_eq!(
        block.get("X-Count").map(HeaderValue::values),
        Some(vec!["1", "2", "3"])
    );
}

#[test]
fn test_parse_ignores_garbage_and_synthetic_names() {
    let block = HeaderParser::parse(&[
        "HTTP/2 204",
        "not a header",
        "Status: 500 Lies",
        "X-Ok: yes",
    ]);

    assert_eq!(block.http_version(), Some("2"));
    assert_eq!(block.status(), Some("204"));
    assert_eq!(block.first("X-Ok"), Some("yes"));
    // Http-Version, Status-Code, Status, X-Ok
    assert_eq!(block.len(), 4);
}
