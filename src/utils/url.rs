//! Output URL synthesis from node templates
//!
//! Nodes publish per-protocol output templates carrying two placeholders:
//! `$` for the stream or artifact identifier and `HOST` for the node's
//! hostname with the scheme stripped. Templates sometimes arrive as
//! array-shaped JSON fragments, so stray `[`, `]`, and `"` characters are
//! trimmed before substitution.

/// Strip `scheme://` from a host or URL
pub fn strip_scheme(host: &str) -> &str {
    host.split_once("://").map(|(_, rest)| rest).unwrap_or(host)
}

/// Substitute `$` and `HOST` into a node output template
pub fn synthesize_output_url(template: &str, identifier: &str, host: &str) -> String {
    let cleaned: String = template
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | '"'))
        .collect();
    cleaned
        .replace("HOST", strip_scheme(host))
        .replace('$', identifier)
}

/// Derive a WHEP endpoint from a MIST HTML URL when the node advertises no
/// explicit WHEP template: the last path segment becomes `webrtc/<stream>`
pub fn derive_whep_url(mist_html_url: &str, stream: &str) -> Option<String> {
    let (base, _last) = mist_html_url.rsplit_once('/')?;
    Some(format!("{base}/webrtc/{stream}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_both_placeholders() {
        let url = synthesize_output_url(
            "https://HOST/hls/$/index.m3u8",
            "live+foo",
            "https://edge-1.example.com",
        );
        assert_eq!(url, "https://edge-1.example.com/hls/live+foo/index.m3u8");
    }

    #[test]
    fn trims_array_shaped_templates() {
        let url = synthesize_output_url(
            "[\"https://HOST/view/$.html\"]",
            "live+foo",
            "edge-1.example.com",
        );
        assert_eq!(url, "https://edge-1.example.com/view/live+foo.html");
    }

    #[test]
    fn whep_derivation_replaces_last_segment() {
        let whep = derive_whep_url("https://edge-1.example.com/view/live+foo.html", "live+foo");
        assert_eq!(
            whep.as_deref(),
            Some("https://edge-1.example.com/view/webrtc/live+foo")
        );
    }

    #[test]
    fn scheme_stripping_handles_bare_hosts() {
        assert_eq!(strip_scheme("edge-1.example.com"), "edge-1.example.com");
        assert_eq!(strip_scheme("wss://edge-1.example.com"), "edge-1.example.com");
    }
}
