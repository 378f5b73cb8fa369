//! Operator questions asked in the middle of an operation

/// Yes/no questions to the person running the installer
#[async_trait::async_trait]
pub trait Confirm: Send {
    /// Ask `question`; an empty answer selects `default`.
    ///
    /// Timeouts, end of input and unrecognized answers count as "no".
    async fn confirm(&mut self, question: &str, default: bool) -> bool;
}

/// Interpret a yes/no answer
pub fn parse_answer(answer: &str, default: bool) -> Option<bool> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "" => Some(default),
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// Fixed answers, consumed in order; used where no terminal is attached
#[derive(Debug, Default)]
pub struct ScriptedConfirm {
    answers: std::collections::VecDeque<bool>,
    pub asked: Vec<String>,
}

impl ScriptedConfirm {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            asked: Vec::new(),
        }
    }
}

#[async_trait::async_trait]
impl Confirm for ScriptedConfirm {
    async fn confirm(&mut self, question: &str, _default: bool) -> bool {
        self.asked.push(question.to_string());
        self.answers.pop_front().unwrap_or(false)
    }
}
