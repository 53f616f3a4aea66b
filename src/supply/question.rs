use std::fmt;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    /// Normalizes a wire difficulty token. Unrecognized tokens map to `Hard`;
    /// upstream occasionally grows new labels and a question that is merely
    /// mislabeled is still worth serving.
    pub fn from_wire_token(token: &str) -> Self {
        match token {
            "easy" => Difficulty::Easy,
            "medium" => Difficulty::Medium,
            _ => Difficulty::Hard,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully decoded trivia question. Immutable once built; discarded after it
/// has been served.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct QuestionRecord {
    pub category: String,
    pub difficulty: Difficulty,
    pub prompt: String,
    pub correct_answer: String,
    pub incorrect_answers: Vec<String>,
}
