use curlreq::base::neterror::NetError;
use curlreq::client::Client;
use curlreq::http::multipart::{FormFields, PostBody};
use curlreq::http::redirect::RedirectResolver;
use curlreq::http::request::{Method, Request};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// `/login` sets a cookie and redirects to `/home`; `/home` echoes the
/// request's Cookie header; everything else redirects back to itself.
async fn spawn_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            if let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = [0u8; 4096];
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    let request = String::from_utf8_lossy(&buf[..n]).into_owned();

                    let response = if request.starts_with("POST /login") || request.starts_with("GET /login") {
                        "HTTP/1.1 302 Found\r\nSet-Cookie: sid=abc123; Path=/\r\nLocation: home\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string()
                    } else if request.contains(" /home ") {
                        let cookie = request
                            .lines()
                            .find_map(|l| l.strip_prefix("Cookie: "))
                            .unwrap_or("")
                            .to_string();
                        let method = request.split(' ').next().unwrap_or("").to_string();
                        let body = format!("{} {}", method, cookie);
                        format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        )
                    } else {
                        "HTTP/1.1 302 Found\r\nLocation: /loop\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string()
                    };
                    let _ = socket.write_all(response.as_bytes()).await;
                });
            }
        }
    });

    format!("http://{}", addr)
}

fn client(follow: bool) -> Client {
    Client::builder()
        .option("noProxy", "*")
        .unwrap()
        .follow_redirects(follow)
        .max_redirects(3)
        .build()
}

#[tokio::test]
async fn test_redirect_surfaces_as_bad_status() {
    let base = spawn_server().await;
    let request = Request::new(&format!("{}/login", base)).unwrap();

    let err = client(false).send_async(request).await.unwrap_err();
    assert_eq!(err.status_code(), Some(302));

    // The caller can follow by hand.
    let (request, response) = match &err {
        NetError::BadStatus { request, response } => (request, response),
        other => panic!("expected BadStatus, got {:?}", other),
    };
    let next = request.follow_redirect(response).unwrap();
    assert_eq!(next.url.as_str(), format!("{}/home", base));
    assert!(next.is_method(Method::Get));
}

#[tokio::test]
async fn test_follow_shares_cookie_jar() {
    let base = spawn_server().await;
    let mut request = Request::new(&format!("{}/login", base)).unwrap();
    request.set_post("user=me", FormFields::new());
    let jar = request.cookie_file().to_path_buf();

    let response = client(true).send_async(request).await.unwrap();

    // Followed as GET, with the cookie set by the redirecting response.
    assert_eq!(response.text(), "GET sid=abc123");
    // The original request owned the jar and removed it once dropped.
    assert!(!jar.exists());
}

#[tokio::test]
async fn test_redirect_loop_is_limited() {
    let base = spawn_server().await;
    let request = Request::new(&format!("{}/start", base)).unwrap();

    let err = client(true).send_async(request).await.unwrap_err();
    assert_eq!(err.status_code(), Some(302));
    assert_eq!(
        err.request().map(|r| r.url.path().to_string()),
        Some("/loop".to_string())
    );
}

#[test]
fn test_resolve_forms() {
    let cases = [
        ("http://a.com/x/y", "/z", "http://a.com/z"),
        ("http://a.com/x/y", "z", "http://a.com/x/z"),
        ("http://a.com:8080/x/y", "z", "http://a.com:8080/x/z"),
        ("https://a.com/x", "//cdn.a.com/img", "https://cdn.a.com/img"),
        ("http://a.com/x", "https://b.com/y?k=v", "https://b.com/y?k=v"),
    ];
    for (previous, location, expected) in cases {
        let resolved = RedirectResolver::resolve(previous, location).unwrap();
        assert_eq!(resolved.to_string(), expected, "{} + {}", previous, location);
    }
}

#[test]
fn test_resolve_without_fallback_host() {
    assert!(matches!(
        RedirectResolver::resolve("/x/y", "//nohost/path"),
        Err(NetError::InvalidUrl(_))
    ));
    assert!(matches!(
        RedirectResolver::resolve("x/y", "/z"),
        Err(NetError::InvalidUrl(_))
    ));
}

#[test]
fn test_cookie_jar_survives_derived_request() {
    let mut original = Request::new("http://a.com/x").unwrap();
    original.set_post(PostBody::from("a=1"), FormFields::new());
    let jar = original.cookie_file().to_path_buf();

    let mut derived = original.clone();
    derived.disclaim_cookie_file();
    derived.set_method(RedirectResolver::method_after(original.method));

    assert_eq!(derived.cookie_file(), jar);
    assert!(!derived.cookie_jar().is_owner());
    drop(derived);
    assert!(jar.exists());

    drop(original);
    assert!(!jar.exists());
}

#[test]
fn test_download_keeps_method() {
    assert_eq!(RedirectResolver::method_after(Method::Download), Method::Download);
    for method in [Method::Post, Method::Put, Method::Patch, Method::Delete, Method::Head] {
        assert_eq!(RedirectResolver::method_after(method), Method::Get);
    }
}
