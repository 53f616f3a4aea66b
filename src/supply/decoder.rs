use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use log::warn;
use serde::Deserialize;
use std::string::FromUtf8Error;
use thiserror::Error;

use crate::supply::question::{Difficulty, QuestionRecord};

/// A question as returned by the remote source, every text field base64
/// encoded (the source is always queried with `encode=base64` so that HTML
/// entities never reach us).
#[derive(Clone, Debug, Deserialize)]
pub struct WireQuestion {
    pub category: String,
    pub difficulty: String,
    pub question: String,
    pub correct_answer: String,
    #[serde(default)]
    pub incorrect_answers: Vec<String>,
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("field is not valid base64")]
    Base64(#[from] base64::DecodeError),
    #[error("field is not valid utf-8")]
    Utf8(#[from] FromUtf8Error),
}

fn decode_field(field: &str) -> Result<String, DecodeError> {
    Ok(String::from_utf8(B64.decode(field)?)?)
}

/// Turns a wire record into a normalized `QuestionRecord`. Pure; malformed
/// base64 or non-UTF-8 payloads are the only failure modes.
pub fn decode(wire: &WireQuestion) -> Result<QuestionRecord, DecodeError> {
    let correct_answer = decode_field(&wire.correct_answer)?;
    let incorrect_answers = wire
        .incorrect_answers
        .iter()
        .map(|answer| decode_field(answer))
        .filter(|answer| match answer {
            Ok(answer) => *answer != correct_answer,
            Err(_) => true,
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(QuestionRecord {
        category: decode_field(&wire.category)?,
        difficulty: Difficulty::from_wire_token(&decode_field(&wire.difficulty)?),
        prompt: decode_field(&wire.question)?,
        correct_answer,
        incorrect_answers,
    })
}

/// Decodes a batch, dropping records that fail to decode. A single mangled
/// record must not cost us the rest of the batch.
pub fn decode_batch(batch: &[WireQuestion]) -> Vec<QuestionRecord> {
    batch
        .iter()
        .filter_map(|wire| match decode(wire) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Dropping malformed question record: {}", e);
                None
            }
        })
        .collect()
}
