use super::WebDavHandler;
use super::constants::CONTENT_TYPE_HTML;
use super::types::{DavResponse, RequestContext, full_body, response};
use crate::error::Result;
use crate::storage::Resource;
use http::{HeaderValue, StatusCode, header};
use quick_xml::escape::escape;

impl WebDavHandler {
    /// 浏览器直接 GET 集合时返回的简易索引页
    pub(super) async fn render_listing(
        &self,
        ctx: &RequestContext,
        collection: &Resource,
    ) -> Result<DavResponse> {
        let children = self.storage.children(&collection.path).await?;
        let html = render_index(&ctx.raw_path, collection.path.is_root(), &children);
        let mut resp = response(StatusCode::OK, full_body(html));
        resp.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(CONTENT_TYPE_HTML),
        );
        Ok(resp)
    }
}

pub(super) fn render_index(raw_path: &str, is_root: bool, children: &[Resource]) -> String {
    let base = format!("{}/", raw_path.trim_end_matches('/'));
    let decoded = urlencoding::decode(&base)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| base.clone());
    let title = escape(decoded.as_str()).into_owned();

    let mut html = String::new();
    html.push_str("<!DOCTYPE html><html><head><meta charset=\"utf-8\">");
    html.push_str(&format!("<title>Index of {}</title></head><body>", title));
    html.push_str(&format!("<h1>Index of {}</h1><ul>", title));
    if !is_root {
        html.push_str(&format!(
            "<li><a href=\"{}\">../</a></li>",
            escape(parent_href(raw_path).as_str())
        ));
    }
    for child in children {
        let name = child.display_name();
        let suffix = if child.is_collection { "/" } else { "" };
        let href = format!("{}{}{}", base, urlencoding::encode(&name), suffix);
        html.push_str(&format!(
            "<li><a href=\"{}\">{}{}</a></li>",
            escape(href.as_str()),
            escape(name.as_str()),
            suffix
        ));
    }
    html.push_str("</ul></body></html>");
    html
}

/// 上一级集合的绝对路径，带结尾斜杠
fn parent_href(raw_path: &str) -> String {
    let trimmed = raw_path.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some((parent, _)) => format!("{}/", parent),
        None => "/".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageRoot;

    #[test]
    fn test_parent_href() {
        assert_eq!(parent_href("/a/b/"), "/a/");
        assert_eq!(parent_href("/a/b"), "/a/");
        assert_eq!(parent_href("/a"), "/");
        assert_eq!(parent_href("/a/"), "/");
    }

    #[tokio::test]
    async fn test_render_index() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("docs/photos")).unwrap();
        std::fs::write(dir.path().join("docs/a b.txt"), b"x").unwrap();
        let storage = StorageRoot::new(dir.path().to_path_buf());

        let root = storage.resolve("/").unwrap();
        let children = storage.children(&root).await.unwrap();
        let html = render_index("/", true, &children);
        assert!(!html.contains("../"));
        assert!(html.contains("<a href=\"/docs/\">docs/</a>"));

        let docs = storage.resolve("/docs").unwrap();
        let children = storage.children(&docs).await.unwrap();
        let html = render_index("/docs", false, &children);
        assert!(html.contains("<a href=\"/\">../</a>"));
        assert!(html.contains("<a href=\"/docs/a%20b.txt\">a b.txt</a>"));
        assert!(html.contains("<a href=\"/docs/photos/\">photos/</a>"));
    }
}
