//! Reply language heuristic
//!
//! Counts vocabulary hits per language over the lowercased text. Matching is
//! by substring, so short entries also hit inside longer words.

use chat_agent_core::Language;

const PORTUGUESE: &[&str] = &[
    "você", "voce", "vc", "tá", "tô", "né", "pra", "obrigado", "obrigada", "bom dia",
    "boa tarde", "boa noite", "como", "que", "isso", "isso", "aqui", "muito", "também", "mas",
    "não", "sim", "quero", "preciso", "ajuda", "por favor", "brigada", "brigado",
];

const SPANISH: &[&str] = &[
    "estás", "estoy", "qué", "cómo", "hola", "gracias", "buenos días", "buenas tardes",
    "buenas noches", "quiero", "necesito", "ayuda", "por favor", "también", "pero", "aquí",
    "mucho", "muy",
];

const ENGLISH: &[&str] = &[
    "you", "are", "how", "what", "hello", "hi", "thanks", "thank you", "good morning",
    "good afternoon", "good night", "want", "need", "help", "please", "also", "but", "here",
    "very", "much", "the", "is", "are",
];

fn score(text: &str, vocabulary: &[&str]) -> usize {
    vocabulary.iter().filter(|w| text.contains(*w)).count()
}

/// Pick the reply language; ties go to Portuguese, then Spanish
pub fn detect_language(text: &str) -> Language {
    let lower = text.to_lowercase();
    let pt = score(&lower, PORTUGUESE);
    let es = score(&lower, SPANISH);
    let en = score(&lower, ENGLISH);

    tracing::trace!(pt, es, en, "Language scores");

    if pt >= es && pt >= en {
        Language::Portuguese
    } else if es >= pt && es >= en {
        Language::Spanish
    } else {
        Language::English
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_english() {
        assert_eq!(detect_language("hello, how are you"), Language::English);
        assert_eq!(
            detect_language("Thank you, I need some help here please"),
            Language::English
        );
    }

    #[test]
    fn test_portuguese() {
        assert_eq!(detect_language("obrigada, tudo bem?"), Language::Portuguese);
        assert_eq!(
            detect_language("Você tá bem? Não sei o que fazer"),
            Language::Portuguese
        );
    }

    #[test]
    fn test_spanish() {
        assert_eq!(
            detect_language("Hola amor, ¿cómo estás? Muchas gracias"),
            Language::Spanish
        );
    }

    #[test]
    fn test_ties_prefer_portuguese() {
        assert_eq!(detect_language(""), Language::Portuguese);
        assert_eq!(detect_language("12345"), Language::Portuguese);
        // "por favor" counts for both pt and es
        assert_eq!(detect_language("por favor"), Language::Portuguese);

        assert_eq!(score("sim hello", PORTUGUESE), 1);
        assert_eq!(score("sim hello", ENGLISH), 1);
        assert_eq!(detect_language("Sim hello"), Language::Portuguese);
    }

    #[test]
    fn test_duplicate_entries_count_twice() {
        assert_eq!(score("isso", PORTUGUESE), 2);
        assert_eq!(score("are", ENGLISH), 2);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(detect_language("HELLO HOW ARE YOU"), Language::English);
    }
}
