use url::Url;

pub fn normalize_url(input: &str) -> String {
    let trimmed = input.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

/// `http(s)://host/...` -> `ws(s)://host/.../v1/receive/<account>`
pub fn websocket_url(base_url: &str, account: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(&normalize_url(base_url))?;
    let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
    url.set_scheme(scheme)
        .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?;
    url.path_segments_mut()
        .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .extend(["v1", "receive", account]);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_adds_scheme_and_drops_trailing_slash() {
        assert_eq!(normalize_url(" signal:8080/ "), "http://signal:8080");
        assert_eq!(normalize_url("https://signal.example"), "https://signal.example");
    }

    #[test]
    fn websocket_url_switches_scheme() {
        let ws = websocket_url("http://127.0.0.1:8080", "+1000").unwrap();
        assert_eq!(ws.as_str(), "ws://127.0.0.1:8080/v1/receive/+1000");

        let wss = websocket_url("https://signal.example/proxy/", "+1000").unwrap();
        assert_eq!(wss.as_str(), "wss://signal.example/proxy/v1/receive/+1000");
    }
}
