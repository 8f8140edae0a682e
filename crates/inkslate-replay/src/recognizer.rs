//! Recognizer stand-in that replays canned answers.

use inkslate_core::{BoxFuture, RecognitionError, Recognizer, StrokeBatch};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Answers batches in order from a fixed list. Once the list runs out the
/// recognizer reports itself unavailable.
#[derive(Debug, Default)]
pub struct ScriptedRecognizer {
    answers: Mutex<VecDeque<Option<String>>>,
}

impl ScriptedRecognizer {
    pub fn new(answers: impl IntoIterator<Item = Option<String>>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
        }
    }

    pub fn remaining(&self) -> usize {
        self.answers.lock().map(|a| a.len()).unwrap_or(0)
    }
}

impl Recognizer for ScriptedRecognizer {
    fn recognize(&self, batch: StrokeBatch) -> BoxFuture<'static, Result<Option<String>, RecognitionError>> {
        let answer = match self.answers.lock() {
            Ok(mut answers) => answers.pop_front().ok_or(RecognitionError::Unavailable),
            Err(_) => Err(RecognitionError::Failed("answer queue poisoned".to_string())),
        };
        log::debug!("Recognizing {} traces -> {:?}", batch.traces.len(), answer);
        Box::pin(std::future::ready(answer))
    }
}
