//! Best-effort language detection.
//!
//! Detection is a hint for the resolver, never a hard dependency: every
//! failure is reported as a [`DetectionError`] and the caller decides what
//! to fall back to.
//!
//! The built-in [`HeuristicDetector`] classifies non-Latin scripts by
//! Unicode block and scores Latin-script text against small common-word
//! profiles kept in a process-wide registry.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetectionError {
    #[error("not enough letters to detect a language")]
    TooShort,

    #[error("no language stands out in the input")]
    Ambiguous,
}

/// Detects the language of a piece of text.
pub trait LanguageDetector: Send + Sync {
    /// Returns an ISO 639-1 code such as `"fr"`.
    fn detect(&self, text: &str) -> Result<String, DetectionError>;
}

/// Common-word profile for a Latin-script language.
#[derive(Debug, Clone)]
pub struct LanguageProfile {
    /// ISO 639-1 language code
    pub code: &'static str,

    /// English name of the language
    pub name: &'static str,

    /// Frequent short words used as evidence
    pub common_words: &'static [&'static str],
}

/// Registry of Latin-script profiles, built once on first use.
pub struct ProfileRegistry {
    profiles: Vec<LanguageProfile>,
    word_index: HashMap<&'static str, Vec<usize>>,
}

static PROFILES: OnceLock<ProfileRegistry> = OnceLock::new();

impl ProfileRegistry {
    pub fn get() -> &'static ProfileRegistry {
        PROFILES.get_or_init(|| {
            let profiles = default_profiles();
            let mut word_index: HashMap<&'static str, Vec<usize>> = HashMap::new();
            for (idx, profile) in profiles.iter().enumerate() {
                for word in profile.common_words {
                    word_index.entry(*word).or_default().push(idx);
                }
            }
            ProfileRegistry {
                profiles,
                word_index,
            }
        })
    }

    pub fn get_by_code(&self, code: &str) -> Option<&LanguageProfile> {
        self.profiles.iter().find(|p| p.code == code)
    }

    pub fn list_all(&self) -> Vec<&LanguageProfile> {
        self.profiles.iter().collect()
    }

    /// Score each profile by how many words of `words` it knows.
    fn score<'a>(&self, words: impl Iterator<Item = &'a str>) -> Vec<usize> {
        let mut scores = vec![0usize; self.profiles.len()];
        for word in words {
            if let Some(indices) = self.word_index.get(word) {
                for &idx in indices {
                    scores[idx] += 1;
                }
            }
        }
        scores
    }
}

fn default_profiles() -> Vec<LanguageProfile> {
    vec![
        LanguageProfile {
            code: "en",
            name: "English",
            common_words: &[
                "the", "and", "is", "are", "was", "to", "of", "in", "it", "you", "that", "this",
                "with", "for", "have", "hello", "there", "what", "how", "not", "be", "my", "we",
                "they", "he", "she", "on", "at", "from", "world", "thank", "thanks", "please",
                "good", "morning", "i", "a", "an", "do", "does", "will", "would", "your",
            ],
        },
        LanguageProfile {
            code: "fr",
            name: "French",
            common_words: &[
                "le", "les", "des", "du", "un", "une", "et", "est", "je", "tu", "vous", "nous",
                "il", "elle", "ils", "pas", "pour", "dans", "que", "qui", "sur", "avec", "ce",
                "cette", "bonjour", "merci", "monde", "au", "aux", "mais", "ou", "très", "bien",
                "suis", "sont", "c'est", "oui", "non", "votre", "mon", "ma",
            ],
        },
        LanguageProfile {
            code: "es",
            name: "Spanish",
            common_words: &[
                "el", "los", "las", "un", "una", "y", "es", "yo", "tú", "usted", "nosotros",
                "por", "para", "con", "que", "en", "del", "al", "hola", "gracias", "mundo",
                "pero", "muy", "bien", "está", "estoy", "son", "sí", "cómo", "qué", "mi",
                "buenos", "días", "su",
            ],
        },
        LanguageProfile {
            code: "de",
            name: "German",
            common_words: &[
                "der", "die", "das", "und", "ist", "ich", "du", "sie", "wir", "nicht", "ein",
                "eine", "mit", "für", "auf", "zu", "den", "dem", "hallo", "danke", "welt",
                "aber", "sehr", "gut", "bin", "sind", "ja", "nein", "wie", "was", "guten",
                "morgen", "mein",
            ],
        },
        LanguageProfile {
            code: "it",
            name: "Italian",
            common_words: &[
                "il", "lo", "gli", "la", "le", "e", "è", "io", "noi", "voi", "non", "per",
                "con", "che", "di", "del", "della", "ciao", "grazie", "mondo", "ma", "molto",
                "bene", "sono", "buongiorno", "come", "sì", "questo", "una",
            ],
        },
        LanguageProfile {
            code: "pt",
            name: "Portuguese",
            common_words: &[
                "o", "os", "as", "um", "uma", "e", "é", "eu", "você", "nós", "não", "para",
                "com", "que", "do", "da", "dos", "das", "olá", "obrigado", "obrigada", "mundo",
                "mas", "muito", "bem", "sou", "são", "sim", "como", "bom", "dia",
            ],
        },
        LanguageProfile {
            code: "nl",
            name: "Dutch",
            common_words: &[
                "de", "het", "een", "en", "is", "ik", "jij", "wij", "niet", "met", "voor",
                "op", "van", "dat", "hallo", "dank", "bedankt", "wereld", "maar", "heel",
                "goed", "ben", "zijn", "ja", "nee", "hoe", "wat", "goedemorgen",
            ],
        },
    ]
}

/// Minimum number of letters before any guess is attempted.
const MIN_LETTERS: usize = 2;

fn word_regex() -> &'static Regex {
    static WORDS: OnceLock<Regex> = OnceLock::new();
    WORDS.get_or_init(|| Regex::new(r"[\p{L}']+").expect("word pattern is valid"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Script {
    Latin,
    Kana,
    Hangul,
    Han,
    Cyrillic,
    Arabic,
    Greek,
    Hebrew,
    Devanagari,
    Thai,
}

impl Script {
    fn of(c: char) -> Option<Script> {
        match c {
            'A'..='Z' | 'a'..='z' | '\u{00C0}'..='\u{024F}' => Some(Script::Latin),
            '\u{3040}'..='\u{309F}' | '\u{30A0}'..='\u{30FF}' => Some(Script::Kana),
            '\u{AC00}'..='\u{D7AF}' | '\u{1100}'..='\u{11FF}' => Some(Script::Hangul),
            '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}' => Some(Script::Han),
            '\u{0400}'..='\u{04FF}' => Some(Script::Cyrillic),
            '\u{0600}'..='\u{06FF}' | '\u{0750}'..='\u{077F}' => Some(Script::Arabic),
            '\u{0370}'..='\u{03FF}' => Some(Script::Greek),
            '\u{0590}'..='\u{05FF}' => Some(Script::Hebrew),
            '\u{0900}'..='\u{097F}' => Some(Script::Devanagari),
            '\u{0E00}'..='\u{0E7F}' => Some(Script::Thai),
            _ => None,
        }
    }

    /// Language implied by a non-Latin script on its own.
    fn language(self) -> Option<&'static str> {
        match self {
            Script::Latin => None,
            Script::Kana => Some("ja"),
            Script::Hangul => Some("ko"),
            Script::Han => Some("zh"),
            Script::Cyrillic => Some("ru"),
            Script::Arabic => Some("ar"),
            Script::Greek => Some("el"),
            Script::Hebrew => Some("he"),
            Script::Devanagari => Some("hi"),
            Script::Thai => Some("th"),
        }
    }
}

/// Script-block and common-word detector.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicDetector;

impl HeuristicDetector {
    pub fn new() -> Self {
        Self
    }

    fn detect_latin(&self, text: &str) -> Result<String, DetectionError> {
        let registry = ProfileRegistry::get();
        let lowered = text.to_lowercase();
        let scores = registry.score(word_regex().find_iter(&lowered).map(|m| m.as_str()));

        let best = scores.iter().copied().max().unwrap_or(0);
        if best == 0 {
            return Err(DetectionError::Ambiguous);
        }

        let mut winners = scores
            .iter()
            .enumerate()
            .filter(|(_, score)| **score == best)
            .map(|(idx, _)| idx);

        match (winners.next(), winners.next()) {
            (Some(idx), None) => Ok(registry.profiles[idx].code.to_string()),
            _ => Err(DetectionError::Ambiguous),
        }
    }
}

impl LanguageDetector for HeuristicDetector {
    fn detect(&self, text: &str) -> Result<String, DetectionError> {
        let mut counts: HashMap<Script, usize> = HashMap::new();
        for script in text.chars().filter_map(Script::of) {
            *counts.entry(script).or_default() += 1;
        }

        let letters: usize = counts.values().sum();
        if letters < MIN_LETTERS {
            return Err(DetectionError::TooShort);
        }

        // Kana marks Japanese when kana and kanji together make up at least
        // half the letters, even when kanji outnumber the kana
        let kana = counts.get(&Script::Kana).copied().unwrap_or(0);
        let han = counts.get(&Script::Han).copied().unwrap_or(0);
        if kana > 0 && (kana + han) * 2 >= letters {
            return Ok("ja".to_string());
        }

        let dominant = counts
            .iter()
            .max_by_key(|(script, count)| (**count, **script == Script::Latin))
            .map(|(script, _)| *script)
            .ok_or(DetectionError::TooShort)?;

        match dominant.language() {
            Some(code) => Ok(code.to_string()),
            None => self.detect_latin(text),
        }
    }
}
