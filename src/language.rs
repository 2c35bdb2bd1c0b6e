//! The closed set of corpus languages a filter or tagger can be bound to.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Language {
    #[default]
    English,
    French,
    German,
    Italian,
    Russian,
    Spanish,
}

impl Language {
    pub const ALL: [Language; 6] = [
        Language::English,
        Language::French,
        Language::German,
        Language::Italian,
        Language::Russian,
        Language::Spanish,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::French => "French",
            Language::German => "German",
            Language::Italian => "Italian",
            Language::Russian => "Russian",
            Language::Spanish => "Spanish",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Language {
    type Err = String;

    /// Case-insensitive match on the language name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .into_iter()
            .find(|lang| lang.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let known: Vec<&str> = Language::ALL.iter().map(|l| l.name()).collect();
                format!("unknown language '{}' (expected one of: {})", s, known.join(", "))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("german".parse::<Language>(), Ok(Language::German));
        assert_eq!("RUSSIAN".parse::<Language>(), Ok(Language::Russian));
        assert_eq!(" Spanish ".parse::<Language>(), Ok(Language::Spanish));
    }

    #[test]
    fn rejects_unknown() {
        let err = "Klingon".parse::<Language>().unwrap_err();
        assert!(err.contains("Klingon"));
        assert!(err.contains("English"));
    }

    #[test]
    fn display_round_trips_through_name() {
        for lang in Language::ALL {
            assert_eq!(lang.to_string().parse::<Language>(), Ok(lang));
        }
    }

    #[test]
    fn defaults_to_english() {
        assert_eq!(Language::default(), Language::English);
    }
}
