//! PDF detection heuristics for URLs and responses.
//!
//! Content-type headers from scraped hosts are unreliable, so any single
//! signal is enough for [`is_pdf_response`]. [`has_pdf_content_evidence`] is
//! the stricter check applied once the body is in hand: the loose `PDF` token
//! also turns up in HTML titles, so it never counts as content evidence.

use reqwest::header::{CONTENT_TYPE, HeaderMap};

/// PDF file signature.
pub const PDF_MAGIC: &[u8] = b"%PDF";

const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

/// How far into the payload the loose "PDF" token is searched for.
const SIGNATURE_WINDOW: usize = 100;

/// Path endings that name a PDF even when the URL carries more after them.
const PDF_SUFFIX_KEYWORDS: &[&str] = &["download.pdf", "manual.pdf", "datasheet.pdf", "guide.pdf"];

/// Returns true if the URL itself suggests a PDF.
///
/// # Examples
///
/// ```
/// use pdf_harvest::classify::looks_like_pdf;
///
/// assert!(looks_like_pdf("https://example.gov/report.PDF"));
/// assert!(looks_like_pdf("https://example.gov/files/a.pdf/view"));
/// assert!(!looks_like_pdf("https://example.gov/index.html"));
/// ```
#[must_use]
pub fn looks_like_pdf(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    if lower.ends_with(".pdf") {
        return true;
    }

    let path = url::Url::parse(&lower)
        .map(|parsed| parsed.path().to_string())
        .unwrap_or_else(|_| lower.clone());
    if path.contains(".pdf") {
        return true;
    }

    PDF_SUFFIX_KEYWORDS
        .iter()
        .any(|keyword| lower.split(['?', '#']).next().is_some_and(|head| head.ends_with(keyword)))
}

/// Returns true if the URL path ends with `.pdf` (query and fragment ignored).
#[must_use]
pub fn has_pdf_suffix(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    let path = url::Url::parse(&lower)
        .map(|parsed| parsed.path().to_string())
        .unwrap_or(lower);
    path.ends_with(".pdf")
}

/// Returns true if the content-type header mentions pdf.
#[must_use]
pub fn content_type_is_pdf(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.to_ascii_lowercase().contains("pdf"))
}

/// Returns true if the payload starts with `%PDF` or carries the token `PDF`
/// within its first 100 bytes.
#[must_use]
pub fn has_pdf_signature(payload: &[u8]) -> bool {
    if has_pdf_magic(payload) {
        return true;
    }
    let window = &payload[..payload.len().min(SIGNATURE_WINDOW)];
    window.windows(3).any(|chunk| chunk == b"PDF")
}

/// Returns true if the payload opens with `%PDF`, after an optional UTF-8
/// byte-order mark and leading whitespace.
#[must_use]
pub fn has_pdf_magic(payload: &[u8]) -> bool {
    let body = payload.strip_prefix(UTF8_BOM).unwrap_or(payload);
    let start = body
        .iter()
        .position(|byte| !byte.is_ascii_whitespace())
        .unwrap_or(body.len());
    body[start..].starts_with(PDF_MAGIC)
}

/// Lenient PDF decision: content-type, `.pdf` suffix, or payload signature.
///
/// `payload` may be empty (e.g. for a HEAD response).
#[must_use]
pub fn is_pdf_response(headers: &HeaderMap, payload: &[u8], url: &str) -> bool {
    content_type_is_pdf(headers) || has_pdf_suffix(url) || has_pdf_signature(payload)
}

/// Strict PDF decision for a fetched body: a `pdf` content type or the magic
/// prefix. Neither the URL nor a stray `PDF` token is evidence.
#[must_use]
pub fn has_pdf_content_evidence(headers: &HeaderMap, payload: &[u8]) -> bool {
    content_type_is_pdf(headers) || has_pdf_magic(payload)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers_with_type(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_looks_like_pdf_variants() {
        assert!(looks_like_pdf("https://a.gov/x.pdf"));
        assert!(looks_like_pdf("https://a.gov/X.PDF"));
        assert!(looks_like_pdf("https://a.gov/x.pdf?download=1"));
        assert!(looks_like_pdf("https://a.gov/docs/x.pdf/content"));
        assert!(!looks_like_pdf("https://a.gov/x.html"));
        assert!(!looks_like_pdf("https://a.gov/?q=x.pdfs"));
    }

    #[test]
    fn test_looks_like_pdf_unparseable_falls_back_to_text() {
        assert!(looks_like_pdf("files/report.pdf"));
        assert!(!looks_like_pdf("files/report"));
    }

    #[test]
    fn test_has_pdf_suffix_ignores_query() {
        assert!(has_pdf_suffix("https://a.gov/x.pdf?v=2"));
        assert!(!has_pdf_suffix("https://a.gov/x?file=a.pdf"));
    }

    #[test]
    fn test_signature_detection() {
        assert!(has_pdf_signature(b"%PDF-1.4\n..."));
        assert!(has_pdf_signature(b"\xef\xbb\xbf junk PDF header"));
        assert!(!has_pdf_signature(b"<!doctype html><html>"));
        assert!(!has_pdf_signature(b""));

        let mut late = vec![b' '; 150];
        late.extend_from_slice(b"PDF");
        assert!(!has_pdf_signature(&late));
    }

    #[test]
    fn test_is_pdf_response_any_signal_suffices() {
        let html = headers_with_type("text/html; charset=utf-8");
        let pdf = headers_with_type("application/pdf");

        assert!(is_pdf_response(&pdf, b"", "https://a.gov/doc"));
        assert!(is_pdf_response(&html, b"", "https://a.gov/doc.pdf"));
        assert!(is_pdf_response(&html, b"%PDF-1.7", "https://a.gov/doc"));
        assert!(!is_pdf_response(&html, b"<html>", "https://a.gov/doc"));
        assert!(!is_pdf_response(&HeaderMap::new(), b"", "https://a.gov/doc"));
    }

    #[test]
    fn test_magic_prefix_wins_regardless_of_content_type() {
        for content_type in ["text/html", "application/octet-stream", "image/png"] {
            let headers = headers_with_type(content_type);
            assert!(is_pdf_response(&headers, b"%PDF-1.5 rest", "https://a.gov/x"));
        }
    }

    #[test]
    fn test_magic_allows_bom_and_leading_whitespace() {
        assert!(has_pdf_magic(b"%PDF-1.7"));
        assert!(has_pdf_magic(b"\xef\xbb\xbf%PDF-1.4"));
        assert!(has_pdf_magic(b"\r\n  %PDF-1.5"));
        assert!(!has_pdf_magic(b"<html><title>PDF</title>"));
        assert!(!has_pdf_magic(b"   "));
    }

    #[test]
    fn test_pdf_token_in_html_title_is_not_content_evidence() {
        let html = headers_with_type("text/html; charset=utf-8");
        let page = b"<html><head><title>PDF Library - Login</title></head><body>Sign in</body></html>";
        assert!(has_pdf_signature(page));
        assert!(is_pdf_response(&html, page, "https://a.gov/manual"));
        assert!(!has_pdf_content_evidence(&html, page));
    }

    #[test]
    fn test_content_evidence_ignores_url() {
        let html = headers_with_type("text/html");
        assert!(!has_pdf_content_evidence(&html, b"<html>not a pdf</html>"));
        assert!(has_pdf_content_evidence(&html, b"%PDF-1.4"));
        assert!(has_pdf_content_evidence(&headers_with_type("Application/PDF"), b""));
    }
}
