use bytes::Bytes;

use crate::endpoint::Endpoint;

/// Rewrites a request's authority to target `endpoint`, leaving the
/// inbound request untouched and the path/query/headers bit-for-bit
/// identical.
///
/// A fresh `http::Request` is built rather than mutating the caller's
/// request in place, so the same logical request can be redirected at
/// each retry attempt without accumulating state.
pub fn direct(req: &http::Request<Bytes>, endpoint: &Endpoint, scheme: &str) -> http::Request<Bytes> {
    let mut parts = req.uri().clone().into_parts();
    parts.authority = Some(
        endpoint
            .authority()
            .parse()
            .expect("host:port pairs from a resolver are valid authorities"),
    );
    parts.scheme = Some(scheme.parse().expect("configured scheme is valid"));
    let uri = http::Uri::from_parts(parts).expect("rebuilt uri is well-formed");

    let mut builder = http::Request::builder().method(req.method().clone()).uri(uri);
    *builder.headers_mut().expect("builder has headers") = req.headers().clone();
    builder
        .body(req.body().clone())
        .expect("rebuilding a previously-valid request cannot fail")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_authority_and_preserves_path() {
        let req = http::Request::builder()
            .method("GET")
            .uri("http://svc.internal/foo?x=1")
            .body(Bytes::new())
            .unwrap();
        let endpoint = Endpoint::new("10.0.0.1", 8080);
        let rewritten = direct(&req, &endpoint, "http");
        assert_eq!(rewritten.uri().authority().unwrap().as_str(), "10.0.0.1:8080");
        assert_eq!(rewritten.uri().path_and_query().unwrap(), "/foo?x=1");
    }
}
