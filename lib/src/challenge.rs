use bytes::{BufMut, Bytes, BytesMut};
use http::header::{
    HeaderValue, CACHE_CONTROL, CONNECTION, CONTENT_TYPE, PRAGMA, PROXY_AUTHENTICATE,
    X_FRAME_OPTIONS,
};
use http::{Response, StatusCode};


/// Build the 407 challenge response for the configured realm.
///
/// Issuing this response terminates processing of the current request; its
/// `Connection: close` asks the client to retry with credentials on a fresh
/// connection. No body is carried.
pub fn challenge(realm: &str) -> Response<()> {
    let mut response = Response::new(());
    *response.status_mut() = StatusCode::PROXY_AUTHENTICATION_REQUIRED;

    let authenticate = HeaderValue::from_str(&format!("Basic Realm=\"{}\"", realm))
        .unwrap_or_else(|_| HeaderValue::from_static("Basic Realm=\"proxy\""));

    let headers = response.headers_mut();
    headers.insert(PROXY_AUTHENTICATE, authenticate);
    headers.insert(CONNECTION, HeaderValue::from_static("close"));
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("no-cache, must-revalidate"),
    );
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    response
}

/// HTTP/1.1 wire serialization of a bodyless response head.
pub fn encode(response: &Response<()>) -> Bytes {
    let mut buffer = BytesMut::with_capacity(256);
    buffer.put_slice(
        format!(
            "HTTP/1.1 {} {}\r\n",
            response.status().as_u16(),
            response.status().canonical_reason().unwrap_or("")
        )
        .as_bytes(),
    );
    for (name, value) in response.headers() {
        buffer.put_slice(name.as_str().as_bytes());
        buffer.put_slice(b": ");
        buffer.put_slice(value.as_bytes());
        buffer.put_slice(b"\r\n");
    }
    buffer.put_slice(b"\r\n");
    buffer.freeze()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn challenge_carries_exact_headers_and_no_body() {
        let response = challenge("Test");
        assert_eq!(response.status(), StatusCode::PROXY_AUTHENTICATION_REQUIRED);
        let headers = response.headers();
        assert_eq!(headers.len(), 6);
        assert_eq!(headers[PROXY_AUTHENTICATE], "Basic Realm=\"Test\"");
        assert_eq!(headers[CONNECTION], "close");
        assert_eq!(headers[CACHE_CONTROL], "no-cache, must-revalidate");
        assert_eq!(headers[PRAGMA], "no-cache");
        assert_eq!(headers[X_FRAME_OPTIONS], "DENY");
        assert_eq!(headers[CONTENT_TYPE], "text/html; charset=utf-8");
    }

    #[test]
    fn encode_produces_http1_head() {
        let wire = encode(&challenge("Test"));
        let text = std::str::from_utf8(&wire).unwrap();
        assert!(text.starts_with("HTTP/1.1 407 Proxy Authentication Required\r\n"));
        assert!(text.contains("proxy-authenticate: Basic Realm=\"Test\"\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn unrepresentable_realm_falls_back() {
        let response = challenge("bad\r\nrealm");
        assert_eq!(
            response.headers()[PROXY_AUTHENTICATE],
            "Basic Realm=\"proxy\""
        );
    }
}
