//! Rule-based lexicon scorer tuned for security chatter.

use std::collections::HashMap;

use super::scores::{SentimentScorer, SentimentScores};

/// Booster words that raise intensity.
const BOOST_INCREMENT: f64 = 0.293;
/// Booster words that lower intensity.
const BOOST_DECREMENT: f64 = -0.293;
/// Emphasis for ALL CAPS words in otherwise mixed-case text.
const CAPS_INCREMENT: f64 = 0.733;
/// Valence multiplier after a negation.
const NEGATION_SCALAR: f64 = -0.74;
/// Added per exclamation mark (up to four).
const EXCLAMATION_INCREMENT: f64 = 0.292;
/// Added per question mark (two or three of them).
const QUESTION_INCREMENT: f64 = 0.18;
/// Normalization constant for the compound score.
const NORMALIZATION_ALPHA: f64 = 15.0;

const NEGATIONS: &[&str] = &[
    "not", "no", "never", "none", "nobody", "nothing", "neither", "nor", "nowhere", "cannot",
    "can't", "cant", "don't", "dont", "doesn't", "doesnt", "didn't", "didnt", "isn't", "isnt",
    "wasn't", "wasnt", "aren't", "arent", "weren't", "won't", "wont", "wouldn't", "shouldn't",
    "couldn't", "hasn't", "haven't", "hadn't", "without", "ain't",
];

const INTENSIFIERS: &[&str] = &[
    "absolutely", "completely", "critically", "deeply", "extremely", "fully", "heavily", "highly",
    "hugely", "incredibly", "massively", "most", "really", "seriously", "severely", "so", "super",
    "totally", "very", "way", "widely",
];

const DAMPENERS: &[&str] = &[
    "barely", "hardly", "kinda", "less", "marginally", "partly", "scarcely", "slightly",
    "somewhat",
];

/// Built-in valences. Security terms sit beside a general-purpose core.
const BASE_LEXICON: &[(&str, f64)] = &[
    // threats and incidents
    ("abuse", -3.2),
    ("attack", -2.1),
    ("attacked", -2.1),
    ("attacker", -2.0),
    ("attackers", -2.0),
    ("attacks", -2.1),
    ("backdoor", -2.5),
    ("botnet", -2.3),
    ("breach", -2.6),
    ("breached", -2.6),
    ("carding", -2.6),
    ("compromise", -2.2),
    ("compromised", -2.4),
    ("crash", -1.7),
    ("crime", -2.5),
    ("criminal", -2.6),
    ("damage", -2.2),
    ("danger", -2.4),
    ("dangerous", -2.1),
    ("ddos", -2.5),
    ("demanding", -0.9),
    ("destroy", -2.7),
    ("dump", -1.4),
    ("error", -1.7),
    ("exploit", -2.5),
    ("exploited", -2.5),
    ("exploits", -2.5),
    ("fail", -2.5),
    ("failed", -2.3),
    ("failure", -2.3),
    ("fraud", -2.8),
    ("hack", -1.8),
    ("hacked", -2.2),
    ("hacker", -1.9),
    ("hackers", -1.9),
    ("illegal", -2.6),
    ("infected", -2.3),
    ("infection", -2.0),
    ("keylogger", -2.4),
    ("leak", -2.0),
    ("leaked", -2.3),
    ("leaks", -2.0),
    ("malware", -2.8),
    ("outage", -1.8),
    ("phishing", -2.5),
    ("problem", -1.7),
    ("ransom", -2.5),
    ("ransomware", -3.0),
    ("risk", -1.1),
    ("risky", -1.5),
    ("rootkit", -2.6),
    ("scam", -2.7),
    ("scammer", -2.8),
    ("spyware", -2.6),
    ("steal", -2.4),
    ("stolen", -2.6),
    ("suspicious", -1.5),
    ("theft", -2.5),
    ("threat", -2.1),
    ("threats", -2.1),
    ("trojan", -2.4),
    ("victim", -2.4),
    ("victims", -2.4),
    ("virus", -2.3),
    ("vulnerabilities", -2.0),
    ("vulnerability", -2.0),
    ("vulnerable", -2.0),
    ("warning", -1.4),
    ("weapons", -1.9),
    ("zero-day", -2.0),
    // general negative
    ("angry", -2.3),
    ("bad", -2.5),
    ("fear", -2.2),
    ("hate", -2.7),
    ("horrible", -2.5),
    ("kill", -3.7),
    ("killed", -3.5),
    ("panic", -2.3),
    ("terrible", -2.5),
    ("worse", -2.1),
    ("worst", -3.1),
    ("wrong", -2.1),
    // defence and recovery
    ("antivirus", 1.0),
    ("authentication", 0.9),
    ("awareness", 1.0),
    ("clean", 1.7),
    ("defended", 1.3),
    ("encryption", 0.8),
    ("ensure", 1.6),
    ("ensured", 1.4),
    ("fix", 1.1),
    ("fixed", 1.1),
    ("legit", 1.6),
    ("patch", 0.8),
    ("patched", 1.3),
    ("protect", 1.6),
    ("protected", 1.9),
    ("protection", 1.3),
    ("protects", 1.3),
    ("reliable", 1.9),
    ("resilient", 1.6),
    ("safe", 1.9),
    ("safely", 2.2),
    ("safety", 1.8),
    ("secure", 1.4),
    ("secured", 1.4),
    ("security", 1.4),
    ("swiftly", 1.0),
    ("trust", 2.3),
    ("trusted", 2.1),
    ("verified", 1.5),
    // general positive
    ("best", 3.2),
    ("better", 1.9),
    ("excellent", 2.7),
    ("good", 1.9),
    ("great", 3.1),
    ("happy", 2.7),
    ("help", 1.7),
    ("helpful", 1.8),
    ("improve", 1.9),
    ("improved", 2.1),
    ("improvement", 2.0),
    ("lmao", 2.0),
    ("love", 3.2),
    ("strong", 2.3),
    ("succeed", 2.2),
    ("success", 2.7),
    ("successful", 2.8),
    ("thanks", 1.9),
    ("win", 2.8),
];

/// Lexicon and rule based scorer.
///
/// Word valences are adjusted for ALL CAPS emphasis, nearby boosters and
/// negations, a contrastive "but", and trailing `!`/`?` runs. The summed
/// valence is squashed into `compound`; the per-word polarity mass gives
/// the `neg`/`neu`/`pos` proportions.
#[derive(Debug, Clone)]
pub struct LexiconScorer {
    lexicon: HashMap<String, f64>,
}

impl Default for LexiconScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl LexiconScorer {
    /// Scorer with the built-in lexicon.
    #[must_use]
    pub fn new() -> Self {
        let lexicon = BASE_LEXICON
            .iter()
            .map(|(word, valence)| ((*word).to_string(), *valence))
            .collect();
        Self { lexicon }
    }

    /// Built-in lexicon with additional or replaced entries.
    #[must_use]
    pub fn with_overrides(overrides: &HashMap<String, f64>) -> Self {
        let mut scorer = Self::new();
        for (word, valence) in overrides {
            scorer.lexicon.insert(word.to_lowercase(), *valence);
        }
        scorer
    }

    /// Number of known words.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lexicon.len()
    }

    /// Whether the lexicon is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lexicon.is_empty()
    }

    fn word_valence(&self, tokens: &[&str], index: usize, caps_differ: bool) -> f64 {
        let token = tokens[index];
        let lower = token.to_lowercase();

        if booster_scalar(&lower).is_some() {
            return 0.0;
        }
        let Some(&base) = self.lexicon.get(&lower) else {
            return 0.0;
        };

        let mut valence = base;
        if caps_differ && is_shouting(token) {
            valence += CAPS_INCREMENT.copysign(base);
        }

        for distance in 1..=3usize {
            let Some(prev_index) = index.checked_sub(distance) else {
                break;
            };
            let prev = tokens[prev_index];
            if let Some(scalar) = booster_scalar(&prev.to_lowercase()) {
                let mut scalar = if base < 0.0 { -scalar } else { scalar };
                if caps_differ && is_shouting(prev) {
                    scalar += CAPS_INCREMENT.copysign(base);
                }
                let decay = match distance {
                    1 => 1.0,
                    2 => 0.95,
                    _ => 0.9,
                };
                valence += scalar * decay;
            }
        }

        let negated = (1..=3usize)
            .filter_map(|distance| index.checked_sub(distance))
            .any(|i| NEGATIONS.contains(&tokens[i].to_lowercase().as_str()));
        if negated {
            valence *= NEGATION_SCALAR;
        }

        valence
    }
}

impl SentimentScorer for LexiconScorer {
    fn score(&self, text: &str) -> SentimentScores {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return SentimentScores::default();
        }

        let caps_differ = {
            let shouting = tokens.iter().filter(|t| is_shouting(t)).count();
            shouting > 0 && shouting < tokens.len()
        };

        let mut valences: Vec<f64> = (0..tokens.len())
            .map(|i| self.word_valence(&tokens, i, caps_differ))
            .collect();

        if let Some(pivot) = tokens.iter().position(|t| t.eq_ignore_ascii_case("but")) {
            for (i, valence) in valences.iter_mut().enumerate() {
                if i < pivot {
                    *valence *= 0.5;
                } else if i > pivot {
                    *valence *= 1.5;
                }
            }
        }

        let emphasis = punctuation_emphasis(text);
        let mut sum: f64 = valences.iter().sum();
        if sum > 0.0 {
            sum += emphasis;
        } else if sum < 0.0 {
            sum -= emphasis;
        }
        let compound = normalize(sum);

        let mut pos_sum = 0.0;
        let mut neg_sum = 0.0;
        let mut neutral = 0.0;
        for valence in &valences {
            if *valence > 0.0 {
                pos_sum += valence + 1.0;
            } else if *valence < 0.0 {
                neg_sum += valence - 1.0;
            } else {
                neutral += 1.0;
            }
        }

        if pos_sum > neg_sum.abs() {
            pos_sum += emphasis;
        } else if pos_sum < neg_sum.abs() {
            neg_sum -= emphasis;
        }

        let total = pos_sum + neg_sum.abs() + neutral;
        if total <= 0.0 {
            return SentimentScores::default();
        }

        SentimentScores {
            neg: round_to(neg_sum.abs() / total, 3),
            neu: round_to(neutral / total, 3),
            pos: round_to(pos_sum / total, 3),
            compound: round_to(compound, 4),
        }
    }
}

/// Split on whitespace and strip surrounding punctuation; single characters
/// carry no sentiment and are dropped.
fn tokenize(text: &str) -> Vec<&str> {
    text.split_whitespace()
        .map(|word| word.trim_matches(|c: char| c.is_ascii_punctuation() && c != '-'))
        .map(|word| word.trim_matches('-'))
        .filter(|word| word.chars().count() > 1)
        .collect()
}

fn booster_scalar(lower: &str) -> Option<f64> {
    if INTENSIFIERS.contains(&lower) {
        Some(BOOST_INCREMENT)
    } else if DAMPENERS.contains(&lower) {
        Some(BOOST_DECREMENT)
    } else {
        None
    }
}

fn is_shouting(token: &str) -> bool {
    token.chars().any(char::is_alphabetic)
        && token
            .chars()
            .filter(|c| c.is_alphabetic())
            .all(char::is_uppercase)
}

fn punctuation_emphasis(text: &str) -> f64 {
    let exclamations = text.matches('!').count().min(4) as f64;
    let questions = text.matches('?').count();
    let question_emphasis = match questions {
        0 | 1 => 0.0,
        2 | 3 => questions as f64 * QUESTION_INCREMENT,
        _ => 0.96,
    };
    exclamations * EXCLAMATION_INCREMENT + question_emphasis
}

fn normalize(sum: f64) -> f64 {
    (sum / (sum * sum + NORMALIZATION_ALPHA).sqrt()).clamp(-1.0, 1.0)
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(text: &str) -> SentimentScores {
        LexiconScorer::new().score(text)
    }

    #[test]
    fn test_empty_and_neutral_text() {
        assert_eq!(score(""), SentimentScores::default());
        assert_eq!(score("   "), SentimentScores::default());

        let neutral = score("the meeting is on tuesday");
        assert_eq!(neutral.compound, 0.0);
        assert_eq!(neutral.neu, 1.0);
    }

    #[test]
    fn test_threat_text_is_negative() {
        let scores =
            score("The vulnerability in the firewall allowed a hacker to breach the system.");
        assert!(scores.compound < -0.5, "{scores:?}");
        assert!(scores.neg > scores.pos);
    }

    #[test]
    fn test_defensive_text_is_positive() {
        let scores = score("The company's encryption techniques ensured data safety.");
        assert!(scores.compound > 0.1, "{scores:?}");
        assert_eq!(scores.neg, 0.0);
    }

    #[test]
    fn test_proportions_sum_to_one() {
        let scores = score("Malware was detected but the antivirus swiftly removed it.");
        let total = scores.neg + scores.neu + scores.pos;
        assert!((total - 1.0).abs() < 0.01, "{scores:?}");
        assert!((-1.0..=1.0).contains(&scores.compound));
    }

    #[test]
    fn test_negation_flips_polarity() {
        assert!(score("the server is secure").compound > 0.0);
        assert!(score("the server is not secure").compound < 0.0);
    }

    #[test]
    fn test_boosters_caps_and_exclamations_intensify() {
        let plain = score("this is a breach").compound;
        let boosted = score("this is a very serious breach").compound;
        let shouted = score("this is a BREACH").compound;
        let exclaimed = score("this is a breach!!!").compound;

        assert!(boosted < plain);
        assert!(shouted < plain);
        assert!(exclaimed < plain);
    }

    #[test]
    fn test_but_shifts_weight_to_second_clause() {
        let scores = score("the patch was good but the exploit is still working");
        assert!(scores.compound < 0.0, "{scores:?}");
    }

    #[test]
    fn test_overrides_replace_and_extend() {
        let mut overrides = HashMap::new();
        overrides.insert("Fullz".to_string(), -3.0);
        overrides.insert("patch".to_string(), -1.0);

        let scorer = LexiconScorer::with_overrides(&overrides);
        assert_eq!(scorer.len(), LexiconScorer::new().len() + 1);
        assert!(scorer.score("selling fullz").compound < 0.0);
        assert!(scorer.score("new patch").compound < 0.0);
    }

    #[test]
    fn test_flagged_threshold() {
        let scores = score("ransomware");
        assert_eq!(scores.neg, 1.0);
        assert!(scores.is_flagged());
        assert!(!score("great news").is_flagged());
    }
}
