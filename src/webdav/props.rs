use super::WebDavHandler;
use super::constants::*;
use super::types::{BoxError, DavResponse, Depth, RequestContext, full_body, response, within};
use crate::error::{DavError, Result};
use crate::storage::Resource;
use bytes::Bytes;
use http::{HeaderValue, StatusCode, header};
use http_body_util::{BodyExt, Limited};
use hyper::body::Body;
use quick_xml::NsReader;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use tracing::debug;

impl WebDavHandler {
    /// PROPFIND 只支持深度 0 和 1，不会递归列出孙级条目
    pub(super) async fn handle_propfind(&self, ctx: &RequestContext) -> Result<DavResponse> {
        if ctx.depth == Depth::Infinity {
            return Err(DavError::Forbidden("不支持 Depth: infinity".to_string()));
        }
        let path = self.storage.resolve(&ctx.raw_path)?;
        let resource = Resource::load(&path).await?;

        let mut xml = String::new();
        xml.push_str(XML_HEADER);
        xml.push_str(XML_NS_DAV);
        add_prop_response(&mut xml, &ctx.raw_path, &resource);
        if ctx.depth == Depth::One && resource.is_collection {
            for child in self.storage.children(&path).await? {
                let href = join_href(&ctx.raw_path, &urlencoding::encode(&child.display_name()));
                add_prop_response(&mut xml, &href, &child);
            }
        }
        xml.push_str(XML_MULTISTATUS_END);
        Ok(xml_response(StatusCode::MULTI_STATUS, xml))
    }

    /// PROPPATCH 不存储任何属性，只把请求中的属性逐一确认为 200 OK
    pub(super) async fn handle_proppatch<B>(
        &self,
        ctx: &RequestContext,
        body: B,
    ) -> Result<DavResponse>
    where
        B: Body<Data = Bytes> + Send,
        B::Error: Into<BoxError>,
    {
        self.storage.resolve(&ctx.raw_path)?;
        let collected = within(
            self.read_timeout,
            Limited::new(body, PROPPATCH_BODY_LIMIT).collect(),
        )
        .await;
        let props = match collected {
            Some(Ok(collected)) => parse_proppatch(&collected.to_bytes()),
            Some(Err(e)) => {
                debug!("PROPPATCH 请求体读取失败，按空请求处理: {}", e);
                Vec::new()
            }
            None => {
                debug!("PROPPATCH 请求体读取超时，按空请求处理");
                Vec::new()
            }
        };

        let mut xml = String::new();
        xml.push_str(XML_HEADER);
        xml.push_str(XML_NS_DAV);
        xml.push_str("<D:response>");
        xml.push_str(&format!("<D:href>{}</D:href>", escape(ctx.raw_path.as_str())));
        xml.push_str("<D:propstat><D:prop>");
        for prop in &props {
            xml.push_str(&prop.to_xml());
        }
        xml.push_str("</D:prop>");
        xml.push_str(XML_STATUS_OK);
        xml.push_str("</D:propstat></D:response>");
        xml.push_str(XML_MULTISTATUS_END);
        Ok(xml_response(StatusCode::OK, xml))
    }
}

fn xml_response(status: StatusCode, xml: String) -> DavResponse {
    let mut resp = response(status, full_body(xml));
    resp.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(CONTENT_TYPE_XML),
    );
    resp
}

/// 父路径与子项名之间恰好一个斜杠
pub(super) fn join_href(parent: &str, name: &str) -> String {
    format!("{}/{}", parent.trim_end_matches('/'), name)
}

pub(super) fn add_prop_response(xml: &mut String, href: &str, resource: &Resource) {
    xml.push_str("<D:response>");
    xml.push_str(&format!("<D:href>{}</D:href>", escape(href)));
    xml.push_str("<D:propstat>");
    xml.push_str("<D:prop>");
    xml.push_str(&format!(
        "<D:displayname>{}</D:displayname>",
        escape(resource.display_name().as_str())
    ));
    if let Some(modified) = resource.last_modified() {
        xml.push_str(&format!(
            "<D:getlastmodified>{}</D:getlastmodified>",
            modified
        ));
    }
    if resource.is_collection {
        xml.push_str("<D:resourcetype><D:collection/></D:resourcetype>");
    } else {
        xml.push_str("<D:resourcetype/>");
        if let Some(size) = resource.size {
            xml.push_str(&format!("<D:getcontentlength>{}</D:getcontentlength>", size));
        }
        if let Some(content_type) = &resource.content_type {
            xml.push_str(&format!(
                "<D:getcontenttype>{}</D:getcontenttype>",
                escape(content_type.as_str())
            ));
        }
    }
    xml.push_str("</D:prop>");
    xml.push_str(XML_STATUS_OK);
    xml.push_str("</D:propstat>");
    xml.push_str("</D:response>");
}

/// PROPPATCH 请求中出现的属性名
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct PropName {
    pub namespace: Option<String>,
    pub local: String,
}

impl PropName {
    fn to_xml(&self) -> String {
        match self.namespace.as_deref() {
            Some(ns) if ns.as_bytes() == DAV_NAMESPACE => format!("<D:{}/>", self.local),
            Some(ns) => format!("<X:{} xmlns:X=\"{}\"/>", self.local, escape(ns)),
            None => format!("<{} xmlns=\"\"/>", self.local),
        }
    }
}

/// 提取 set/remove 下各个 prop 元素的直接子元素；无法解析时返回已读到的部分
pub(super) fn parse_proppatch(body: &[u8]) -> Vec<PropName> {
    let Ok(text) = std::str::from_utf8(body) else {
        return Vec::new();
    };
    let mut reader = NsReader::from_str(text);
    let mut names = Vec::new();
    let mut depth = 0usize;
    // 当前所在 <D:prop> 的深度
    let mut prop_depth: Option<usize> = None;
    loop {
        match reader.read_resolved_event() {
            Ok((ns, Event::Start(e))) => {
                depth += 1;
                let local = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                let namespace = namespace_of(&ns);
                if prop_depth.is_none()
                    && local == "prop"
                    && namespace.as_deref().map(str::as_bytes) == Some(DAV_NAMESPACE)
                {
                    prop_depth = Some(depth);
                } else if prop_depth == Some(depth - 1) {
                    names.push(PropName { namespace, local });
                }
            }
            Ok((ns, Event::Empty(e))) => {
                if prop_depth == Some(depth) {
                    names.push(PropName {
                        namespace: namespace_of(&ns),
                        local: String::from_utf8_lossy(e.local_name().as_ref()).to_string(),
                    });
                }
            }
            Ok((_, Event::End(_))) => {
                if prop_depth == Some(depth) {
                    prop_depth = None;
                }
                depth = depth.saturating_sub(1);
            }
            Ok((_, Event::Eof)) => break,
            Err(e) => {
                debug!("PROPPATCH XML 解析失败: {}", e);
                break;
            }
            Ok(_) => {}
        }
    }
    names
}

fn namespace_of(ns: &ResolveResult<'_>) -> Option<String> {
    match ns {
        ResolveResult::Bound(Namespace(uri)) => Some(String::from_utf8_lossy(uri).to_string()),
        _ => None,
    }
}
