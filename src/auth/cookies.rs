use axum::http::{header, HeaderMap};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Signs cookie values with HMAC-SHA256 so the browser cannot forge a
/// session token or a flash message. Signed form is `value.hexmac`.
#[derive(Clone)]
pub struct CookieSigner {
    mac: HmacSha256,
}

impl CookieSigner {
    pub fn new(secret: &str) -> Self {
        // HMAC accepts keys of any length
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .expect("HMAC key of any length is valid");
        Self { mac }
    }

    pub fn sign(&self, value: &str) -> String {
        format!("{}.{}", value, self.tag(value))
    }

    /// Returns the original value if the signature checks out.
    pub fn verify<'a>(&self, signed: &'a str) -> Option<&'a str> {
        let (value, tag) = signed.rsplit_once('.')?;
        self.verify_tag(value, tag).then_some(value)
    }

    /// Hex MAC of `value` alone, for tokens that travel outside a cookie.
    pub fn tag(&self, value: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(value.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Constant-time check of a hex tag produced by [`CookieSigner::tag`].
    pub fn verify_tag(&self, value: &str, tag: &str) -> bool {
        let Ok(tag) = hex::decode(tag) else {
            return false;
        };
        let mut mac = self.mac.clone();
        mac.update(value.as_bytes());
        mac.verify_slice(&tag).is_ok()
    }
}

impl std::fmt::Debug for CookieSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CookieSigner(..)")
    }
}

/// `Set-Cookie` value. Without `max_age_secs` the cookie ends with the browser session.
pub fn build_cookie(name: &str, value: &str, max_age_secs: Option<u64>) -> String {
    let mut cookie = format!("{}={}; HttpOnly; SameSite=Lax; Path=/", name, value);
    if let Some(secs) = max_age_secs {
        cookie.push_str(&format!("; Max-Age={}", secs));
    }
    cookie
}

pub fn clear_cookie(name: &str) -> String {
    format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", name)
}

pub fn get_cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == name {
                Some(val)
            } else {
                None
            }
        })
}
