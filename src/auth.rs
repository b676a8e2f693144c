//! Basic 认证
//!
//! 凭据在服务启动时以只读快照形式注入，请求期间不会变化。
//! 比较为普通相等判断，限流与锁定由外部负责。

use base64::{Engine, prelude::BASE64_STANDARD};
use http::{HeaderMap, HeaderValue, header};
use tracing::warn;

const BASIC_PREFIX: &str = "Basic ";

/// 凭据快照
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub allow_anonymous: bool,
}

#[derive(Debug, Clone)]
pub struct BasicAuthenticator {
    credentials: Credentials,
    challenge: HeaderValue,
}

impl BasicAuthenticator {
    pub fn new(credentials: Credentials, realm: &str) -> Self {
        let challenge = HeaderValue::from_str(&format!("Basic realm=\"{}\"", realm))
            .unwrap_or_else(|_| HeaderValue::from_static("Basic realm=\"WebDAV\""));
        Self {
            credentials,
            challenge,
        }
    }

    /// 401 响应附带的 WWW-Authenticate 值
    pub fn challenge(&self) -> HeaderValue {
        self.challenge.clone()
    }

    /// 校验请求头中的 Basic 凭据
    pub fn authenticate(&self, headers: &HeaderMap) -> bool {
        if self.credentials.allow_anonymous {
            return true;
        }
        let Some(value) = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
        else {
            return false;
        };
        match decode_basic(value) {
            Some((user, pass)) => {
                let ok = user == self.credentials.username && pass == self.credentials.password;
                if !ok {
                    warn!("Basic 认证失败: user={}", user);
                }
                ok
            }
            None => {
                warn!("Authorization 头格式无效");
                false
            }
        }
    }
}

/// 解析 `Basic base64(user:pass)`，解码后必须恰好包含一个冒号
fn decode_basic(value: &str) -> Option<(String, String)> {
    let payload = value.strip_prefix(BASIC_PREFIX)?;
    let decoded = BASE64_STANDARD.decode(payload.trim()).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let mut parts = text.split(':');
    let user = parts.next()?;
    let pass = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    Some((user.to_string(), pass.to_string()))
}
