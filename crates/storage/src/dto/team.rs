use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request payload for founding a team
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateTeamRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Name must be between 1 and 100 characters"
    ))]
    pub name: String,

    #[validate(range(
        min = 2,
        max = 4,
        message = "Team size must be between 2 and 4 members"
    ))]
    pub max_members: i64,
}
