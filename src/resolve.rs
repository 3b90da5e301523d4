//! Effective source/target language resolution.
//!
//! Callers may name both languages, one, or neither. Missing source
//! languages are detected; a missing target defaults to English unless the
//! source already is English, in which case the request is a passthrough.

use crate::detect::LanguageDetector;
use tracing::{info, warn};

/// Language assumed when detection fails and used as the default target.
pub const ENGLISH: &str = "en";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLanguages {
    pub source_lang: String,
    pub target_lang: String,
    /// No model call; the input text is echoed back.
    pub passthrough: bool,
}

/// How the source language was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceOrigin {
    Supplied,
    Detected,
    /// Detection failed and English was assumed.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub languages: ResolvedLanguages,
    pub source_origin: SourceOrigin,
}

/// Lowercase and trim a caller-supplied code; empty means absent.
fn normalize(lang: Option<&str>) -> Option<String> {
    lang.map(|l| l.trim().to_lowercase()).filter(|l| !l.is_empty())
}

/// Decide the effective languages for `text`.
///
/// Never fails: a detection failure falls back to English.
pub fn resolve(
    detector: &dyn LanguageDetector,
    text: &str,
    source_lang: Option<&str>,
    target_lang: Option<&str>,
) -> Resolution {
    let source_lang = normalize(source_lang);
    let target_lang = normalize(target_lang);

    // Both supplied: trusted verbatim, no detection
    if let (Some(source), Some(target)) = (&source_lang, &target_lang) {
        return Resolution {
            languages: ResolvedLanguages {
                source_lang: source.clone(),
                target_lang: target.clone(),
                passthrough: false,
            },
            source_origin: SourceOrigin::Supplied,
        };
    }

    let (source, source_origin) = match source_lang {
        Some(source) => (source, SourceOrigin::Supplied),
        None => match detector.detect(text) {
            Ok(detected) => {
                let detected = detected.to_lowercase();
                info!("Auto-detected source language: {}", detected);
                (detected, SourceOrigin::Detected)
            }
            Err(e) => {
                warn!(
                    "Language detection failed ({}); assuming source language '{}'",
                    e, ENGLISH
                );
                (ENGLISH.to_string(), SourceOrigin::Fallback)
            }
        },
    };

    let languages = match target_lang {
        Some(target) => ResolvedLanguages {
            source_lang: source,
            target_lang: target,
            passthrough: false,
        },
        None if source != ENGLISH => ResolvedLanguages {
            source_lang: source,
            target_lang: ENGLISH.to_string(),
            passthrough: false,
        },
        None => ResolvedLanguages {
            source_lang: ENGLISH.to_string(),
            target_lang: ENGLISH.to_string(),
            passthrough: true,
        },
    };

    Resolution {
        languages,
        source_origin,
    }
}
