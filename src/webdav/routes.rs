use super::constants::*;
use http::Method;

/// 请求分派目标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Options,
    Unauthorized,
    Get,
    Put,
    Delete,
    Mkcol,
    Propfind,
    Proppatch,
    Move,
    Copy,
    MethodNotAllowed,
}

/// 由方法与认证结果决定处理器。OPTIONS 不需要认证，其余方法未认证时一律 401
pub fn route(method: &Method, authenticated: bool) -> Route {
    if *method == Method::OPTIONS {
        return Route::Options;
    }
    if !authenticated {
        return Route::Unauthorized;
    }
    match method.as_str() {
        "GET" => Route::Get,
        "PUT" => Route::Put,
        "DELETE" => Route::Delete,
        METHOD_MKCOL => Route::Mkcol,
        METHOD_PROPFIND => Route::Propfind,
        METHOD_PROPPATCH => Route::Proppatch,
        METHOD_MOVE => Route::Move,
        METHOD_COPY => Route::Copy,
        _ => Route::MethodNotAllowed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method(name: &str) -> Method {
        Method::from_bytes(name.as_bytes()).unwrap()
    }

    #[test]
    fn test_options_bypasses_auth() {
        assert_eq!(route(&Method::OPTIONS, false), Route::Options);
        assert_eq!(route(&Method::OPTIONS, true), Route::Options);
    }

    #[test]
    fn test_unauthenticated_short_circuits() {
        for name in ["GET", "PUT", "DELETE", "MKCOL", "PROPFIND", "PROPPATCH", "MOVE", "COPY"] {
            assert_eq!(route(&method(name), false), Route::Unauthorized, "{}", name);
        }
        // 未知方法同样先经过认证
        assert_eq!(route(&method("LOCK"), false), Route::Unauthorized);
    }

    #[test]
    fn test_dispatch_table() {
        assert_eq!(route(&Method::GET, true), Route::Get);
        assert_eq!(route(&Method::PUT, true), Route::Put);
        assert_eq!(route(&Method::DELETE, true), Route::Delete);
        assert_eq!(route(&method("MKCOL"), true), Route::Mkcol);
        assert_eq!(route(&method("PROPFIND"), true), Route::Propfind);
        assert_eq!(route(&method("PROPPATCH"), true), Route::Proppatch);
        assert_eq!(route(&method("MOVE"), true), Route::Move);
        assert_eq!(route(&method("COPY"), true), Route::Copy);
    }

    #[test]
    fn test_unsupported_methods() {
        for name in ["HEAD", "POST", "LOCK", "UNLOCK", "PATCH", "REPORT"] {
            assert_eq!(route(&method(name), true), Route::MethodNotAllowed, "{}", name);
        }
    }
}
