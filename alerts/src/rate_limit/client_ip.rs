/// Header carrying the proxy chain, client first.
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Header carrying the client address set by a single reverse proxy.
pub const REAL_IP_HEADER: &str = "x-real-ip";

/// Identifier used when no client address header is present.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Derives the caller identifier from request headers.
///
/// `header` looks up a header value by lower-case name. The first comma-separated entry
/// of `x-forwarded-for` wins, then `x-real-ip`, then the literal `"unknown"`. Blank
/// values are treated as absent.
pub fn get_client_ip<'a, F>(header: F) -> String
where
    F: Fn(&str) -> Option<&'a str>,
{
    let forwarded = header(FORWARDED_FOR_HEADER)
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    if let Some(ip) = forwarded {
        return ip.to_owned();
    }

    header(REAL_IP_HEADER)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(UNKNOWN_CLIENT)
        .to_owned()
}
