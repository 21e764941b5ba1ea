use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request payload for marking a queue entry played
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct MarkPlayedRequest {
    #[validate(range(min = 0, max = 10000, message = "Score must be between 0 and 10000"))]
    pub score: Option<i64>,
}
