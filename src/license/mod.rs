//! Conservative license acceptance.
//!
//! Decision order, first match wins:
//! 1. an `X-Robots-Tag` restriction (`noindex`, `noarchive`, `noai`, `nofollow`, `none`) rejects
//! 2. a permissive license phrase in the text preview accepts
//! 3. a public-sector domain suffix accepts unless the preview is restrictive
//! 4. restrictive language rejects
//! 5. anything else rejects

mod extract;

use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use reqwest::header::HeaderMap;
use tracing::{debug, instrument};

use crate::util::compile_static_regex;

pub use extract::{ExtractError, PdfTextExtractor, TextExtractor};

/// Header carrying indexing directives.
pub const ROBOTS_DIRECTIVE_HEADER: &str = "x-robots-tag";

/// Default number of pages read for the text preview.
pub const DEFAULT_PREVIEW_PAGES: usize = 3;

const RESTRICTIVE_DIRECTIVES: &[&str] = &["noindex", "noarchive", "noai", "nofollow", "none"];

/// Domain suffixes treated as public-sector publishers.
const PUBLIC_SUFFIXES: &[&str] = &[
    "gov", "mil", "int", "eu", "gov.uk", "gov.au", "gc.ca", "europa.eu",
];

static PERMISSIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(
        r"(?ix)
        creative\s+commons
        | \bcc[\s-]?by(?:[\s-](?:sa|nd|nc))*\b
        | \bcc0\b
        | public\s+domain
        | open\s+government\s+licen[cs]e
        | work\s+of\s+the\s+(?:u\.?s\.?|united\s+states)\s+(?:federal\s+)?government
        | not\s+subject\s+to\s+copyright
        ",
    )
});

static RESTRICTIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(
        r"(?ix)
        ©
        | \(c\)\s*(?:19|20)\d{2}
        | copyright\s*(?:©|\(c\))?\s*(?:19|20)\d{2}
        | all\s+rights\s+reserved
        | no\s+part\s+of\s+this\s+(?:publication|document|manual)\s+may\s+be\s+reproduced
        ",
    )
});

/// Why a document was accepted or rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseReason {
    ForbidsIndexing,
    PermissiveLicense,
    PublicTld,
    RestrictiveLanguage,
    NoPermissiveSignal,
}

impl LicenseReason {
    /// Manifest reason string.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ForbidsIndexing => "forbids indexing/AI",
            Self::PermissiveLicense => "permissive license detected",
            Self::PublicTld => "likely public TLD",
            Self::RestrictiveLanguage => "restrictive licensing language",
            Self::NoPermissiveSignal => "no permissive signal",
        }
    }
}

impl fmt::Display for LicenseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the license check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LicenseDecision {
    pub accept: bool,
    pub reason: LicenseReason,
}

impl LicenseDecision {
    fn accept(reason: LicenseReason) -> Self {
        Self {
            accept: true,
            reason,
        }
    }

    fn reject(reason: LicenseReason) -> Self {
        Self {
            accept: false,
            reason,
        }
    }
}

/// Returns true if any robots directive header forbids indexing or AI use.
#[must_use]
pub fn forbids_indexing(headers: &HeaderMap) -> bool {
    headers
        .get_all(ROBOTS_DIRECTIVE_HEADER)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split([',', ' ', ':', ';']))
        .map(|token| token.trim().to_ascii_lowercase())
        .any(|token| RESTRICTIVE_DIRECTIVES.contains(&token.as_str()))
}

/// Returns true if the domain ends in a public-sector suffix.
#[must_use]
pub fn is_public_domain_suffix(domain: &str) -> bool {
    let domain = domain.trim_end_matches('.').to_ascii_lowercase();
    PUBLIC_SUFFIXES.iter().any(|suffix| {
        domain == *suffix
            || domain
                .strip_suffix(suffix)
                .is_some_and(|head| head.ends_with('.'))
    })
}

#[must_use]
pub fn has_permissive_language(text: &str) -> bool {
    PERMISSIVE_RE.is_match(text)
}

#[must_use]
pub fn has_restrictive_language(text: &str) -> bool {
    RESTRICTIVE_RE.is_match(text)
}

/// Applies steps 2-5 of the decision order to an extracted preview.
#[must_use]
pub fn decide_from_text(preview: &str, domain: &str) -> LicenseDecision {
    if has_permissive_language(preview) {
        return LicenseDecision::accept(LicenseReason::PermissiveLicense);
    }
    let restrictive = has_restrictive_language(preview);
    if is_public_domain_suffix(domain) && !restrictive {
        return LicenseDecision::accept(LicenseReason::PublicTld);
    }
    if restrictive {
        return LicenseDecision::reject(LicenseReason::RestrictiveLanguage);
    }
    LicenseDecision::reject(LicenseReason::NoPermissiveSignal)
}

/// License heuristic over a pluggable text extractor.
#[derive(Clone)]
pub struct LicenseHeuristic {
    extractor: Arc<dyn TextExtractor>,
    page_limit: usize,
}

impl fmt::Debug for LicenseHeuristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LicenseHeuristic")
            .field("page_limit", &self.page_limit)
            .finish_non_exhaustive()
    }
}

impl LicenseHeuristic {
    #[must_use]
    pub fn new(extractor: Arc<dyn TextExtractor>, page_limit: usize) -> Self {
        Self {
            extractor,
            page_limit: page_limit.max(1),
        }
    }

    /// Heuristic backed by `pdf-extract`.
    #[must_use]
    pub fn with_pdf_extractor(page_limit: usize) -> Self {
        Self::new(Arc::new(PdfTextExtractor), page_limit)
    }

    /// Classifies a fetched document.
    ///
    /// Headers are checked before any text is extracted. An extraction
    /// failure yields an empty preview, which can only be accepted on a
    /// public-sector domain.
    #[instrument(skip(self, headers, payload), fields(bytes = payload.len()))]
    pub async fn classify(
        &self,
        url: &str,
        headers: &HeaderMap,
        payload: &[u8],
        domain: &str,
    ) -> LicenseDecision {
        if forbids_indexing(headers) {
            return LicenseDecision::reject(LicenseReason::ForbidsIndexing);
        }

        let preview = match self.extractor.extract_text(payload, self.page_limit).await {
            Ok(text) => text,
            Err(error) => {
                debug!(error = %error, "no text preview - deciding on domain alone");
                String::new()
            }
        };
        let decision = decide_from_text(&preview, domain);
        debug!(accept = decision.accept, reason = %decision.reason, "license decision");
        decision
    }
}
