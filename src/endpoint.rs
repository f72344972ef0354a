use crate::error::{ChannelError, Result};
use url::Url;

/// Derive the real-time endpoint from the URL the hosting page was loaded from.
///
/// Secure pages get `wss://`, plain pages get `ws://`. Host and port are kept,
/// everything after the authority is dropped.
pub fn endpoint_for_page(page_url: &str) -> Result<Url> {
    let invalid = |reason: &str| ChannelError::Endpoint {
        url: page_url.to_string(),
        reason: reason.to_string(),
    };

    let page = Url::parse(page_url).map_err(|e| invalid(&e.to_string()))?;

    let scheme = match page.scheme() {
        "https" => "wss",
        "http" => "ws",
        other => return Err(invalid(&format!("unsupported scheme '{}'", other))),
    };

    let host = page.host_str().ok_or_else(|| invalid("missing host"))?;
    let authority = match page.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };

    Url::parse(&format!("{}://{}/", scheme, authority)).map_err(|e| invalid(&e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_page() {
        let url = endpoint_for_page("https://bank.example.com/accounts?tab=1#top").unwrap();
        assert_eq!(url.as_str(), "wss://bank.example.com/");
    }

    #[test]
    fn test_plain_page_keeps_port() {
        let url = endpoint_for_page("http://localhost:3000/").unwrap();
        assert_eq!(url.as_str(), "ws://localhost:3000/");

        let url = endpoint_for_page("http://127.0.0.1:8080").unwrap();
        assert_eq!(url.as_str(), "ws://127.0.0.1:8080/");
    }

    #[test]
    fn test_credentials_dropped() {
        let url = endpoint_for_page("https://user:pw@bank.example.com:8443/login").unwrap();
        assert_eq!(url.as_str(), "wss://bank.example.com:8443/");
    }

    #[test]
    fn test_rejected_pages() {
        assert!(matches!(
            endpoint_for_page("file:///tmp/index.html"),
            Err(ChannelError::Endpoint { .. })
        ));
        assert!(endpoint_for_page("ftp://bank.example.com").is_err());
        assert!(endpoint_for_page("not a url").is_err());
    }
}
