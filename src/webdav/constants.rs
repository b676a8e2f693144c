pub const METHOD_PROPFIND: &str = "PROPFIND";
pub const METHOD_PROPPATCH: &str = "PROPPATCH";
pub const METHOD_MKCOL: &str = "MKCOL";
pub const METHOD_MOVE: &str = "MOVE";
pub const METHOD_COPY: &str = "COPY";

pub const XML_HEADER: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>";
pub const XML_NS_DAV: &str = "<D:multistatus xmlns:D=\"DAV:\">";
pub const XML_MULTISTATUS_END: &str = "</D:multistatus>";
pub const XML_STATUS_OK: &str = "<D:status>HTTP/1.1 200 OK</D:status>";
pub const DAV_NAMESPACE: &[u8] = b"DAV:";

pub const HEADER_DAV: &str = "dav";
pub const HEADER_DEPTH: &str = "depth";
pub const HEADER_DESTINATION: &str = "destination";

pub const HEADER_DAV_VALUE: &str = "1,2";
pub const HEADER_ALLOW_VALUE: &str =
    "OPTIONS, GET, PUT, DELETE, MKCOL, PROPFIND, PROPPATCH, MOVE, COPY";
pub const CORS_ALLOW_ORIGIN: &str = "*";
pub const CORS_ALLOW_HEADERS: &str =
    "Authorization, Content-Type, Content-Length, Depth, Destination";
pub const CORS_EXPOSE_HEADERS: &str = "DAV";

pub const CONTENT_TYPE_XML: &str = "application/xml; charset=utf-8";
pub const CONTENT_TYPE_HTML: &str = "text/html; charset=utf-8";
pub const CONTENT_TYPE_TEXT: &str = "text/plain; charset=utf-8";

// PROPPATCH 只做确认，请求体超过该大小时按空请求处理
pub const PROPPATCH_BODY_LIMIT: usize = 64 * 1024;
