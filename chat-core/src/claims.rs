use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AssistError, Result};
use crate::profile::{Claim, UserProfile, PENDING_STATUS};

pub const WHAT_FOR_QUESTION: &str =
    "I can help you with creating a claim. What are you making the claim for?";
pub const CLAIM_TYPE_QUESTION: &str = "What type of claim do you want?";
pub const AMOUNT_QUESTION: &str = "Please enter the total requested amount.";
pub const CLAIM_CREATED_REPLY: &str = "Claim created successfully!";

/// Multi-turn claim creation dialogue.
///
/// Slots are filled one per user turn in fixed order. The state is an
/// explicit tagged variant carrying the partially filled draft, so no
/// field-presence inference is needed to know where the dialogue stands.
/// Answers are stored verbatim; the amount is not parsed as a number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ClaimDialogue {
    #[default]
    Idle,
    AwaitingWhatFor,
    AwaitingClaimType {
        what_for: String,
    },
    AwaitingAmount {
        what_for: String,
        claim_type: String,
    },
}

impl ClaimDialogue {
    pub fn is_active(&self) -> bool {
        !matches!(self, ClaimDialogue::Idle)
    }

    /// Enter the dialogue from `Idle`. The triggering message only opens the
    /// dialogue; its text is not stored as an answer.
    pub fn begin(&mut self) -> &'static str {
        *self = ClaimDialogue::AwaitingWhatFor;
        WHAT_FOR_QUESTION
    }

    fn question(&self) -> Option<&'static str> {
        match self {
            ClaimDialogue::Idle => None,
            ClaimDialogue::AwaitingWhatFor => Some(WHAT_FOR_QUESTION),
            ClaimDialogue::AwaitingClaimType { .. } => Some(CLAIM_TYPE_QUESTION),
            ClaimDialogue::AwaitingAmount { .. } => Some(AMOUNT_QUESTION),
        }
    }

    /// Consume one user turn: store it into the next open slot and return the
    /// follow-up question. A blank turn re-asks the current question without
    /// transitioning. Filling the amount finalizes the claim onto the profile
    /// and resets the dialogue to `Idle`.
    pub fn advance(&mut self, input: &str, profile: &mut UserProfile) -> Result<String> {
        let input = input.trim();
        if input.is_empty() {
            return self
                .question()
                .map(str::to_string)
                .ok_or_else(|| AssistError::Dialogue("claim dialogue is not active".to_string()));
        }

        match std::mem::take(self) {
            ClaimDialogue::Idle => {
                Err(AssistError::Dialogue("claim dialogue is not active".to_string()))
            }
            ClaimDialogue::AwaitingWhatFor => {
                *self = ClaimDialogue::AwaitingClaimType {
                    what_for: input.to_string(),
                };
                Ok(CLAIM_TYPE_QUESTION.to_string())
            }
            ClaimDialogue::AwaitingClaimType { what_for } => {
                *self = ClaimDialogue::AwaitingAmount {
                    what_for,
                    claim_type: input.to_string(),
                };
                Ok(AMOUNT_QUESTION.to_string())
            }
            ClaimDialogue::AwaitingAmount {
                what_for,
                claim_type,
            } => {
                let Some(policy_id) = profile.policies.first().map(|p| p.id) else {
                    // Keep the draft so the dialogue can resume once fixed.
                    *self = ClaimDialogue::AwaitingAmount {
                        what_for,
                        claim_type,
                    };
                    return Err(AssistError::Profile(
                        "profile has no policy to attach the claim to".to_string(),
                    ));
                };

                let claim = Claim {
                    id: profile.claims.len() as u64 + 1,
                    policy_id,
                    amount_claimed: input.to_string(),
                    is_opd_claim: 1,
                    status: PENDING_STATUS.to_string(),
                };
                info!(
                    claim_id = claim.id,
                    policy_id,
                    what_for = %what_for,
                    claim_type = %claim_type,
                    amount = %claim.amount_claimed,
                    "claim finalized"
                );
                profile.claims.push(claim);
                Ok(CLAIM_CREATED_REPLY.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_dialogue_appends_one_claim_and_returns_idle() {
        let mut profile = UserProfile::sample();
        let mut dialogue = ClaimDialogue::default();
        let claims_before = profile.claims.len();

        assert!(!dialogue.is_active());
        assert_eq!(dialogue.begin(), WHAT_FOR_QUESTION);
        assert!(dialogue.is_active());

        assert_eq!(
            dialogue.advance("medical bill", &mut profile).unwrap(),
            CLAIM_TYPE_QUESTION
        );
        assert_eq!(dialogue.advance("OPD", &mut profile).unwrap(), AMOUNT_QUESTION);
        assert_eq!(
            dialogue.advance("500", &mut profile).unwrap(),
            CLAIM_CREATED_REPLY
        );

        assert!(!dialogue.is_active());
        assert_eq!(profile.claims.len(), claims_before + 1);
        let claim = profile.claims.last().unwrap();
        assert_eq!(claim.amount_claimed, "500");
        assert_eq!(claim.id, claims_before as u64 + 1);
        assert_eq!(claim.policy_id, profile.policies[0].id);
        assert_eq!(claim.status, PENDING_STATUS);
    }

    #[test]
    fn blank_input_reasks_current_question() {
        let mut profile = UserProfile::sample();
        let mut dialogue = ClaimDialogue::default();
        dialogue.begin();
        dialogue.advance("medical bill", &mut profile).unwrap();

        assert_eq!(
            dialogue.advance("   ", &mut profile).unwrap(),
            CLAIM_TYPE_QUESTION
        );
        // Still waiting on the same slot.
        assert_eq!(
            dialogue,
            ClaimDialogue::AwaitingClaimType {
                what_for: "medical bill".to_string()
            }
        );
    }

    #[test]
    fn answers_are_stored_verbatim_without_validation() {
        let mut profile = UserProfile::sample();
        let mut dialogue = ClaimDialogue::default();
        dialogue.begin();
        dialogue.advance("broken arm", &mut profile).unwrap();
        dialogue.advance("IPD", &mut profile).unwrap();
        dialogue.advance("not a number", &mut profile).unwrap();

        assert_eq!(profile.claims.last().unwrap().amount_claimed, "not a number");
    }

    #[test]
    fn finalizing_without_policy_fails_and_keeps_draft() {
        let mut profile = UserProfile::sample();
        profile.policies.clear();
        let mut dialogue = ClaimDialogue::default();
        dialogue.begin();
        dialogue.advance("medical bill", &mut profile).unwrap();
        dialogue.advance("OPD", &mut profile).unwrap();

        let err = dialogue.advance("500", &mut profile).unwrap_err();
        assert!(matches!(err, AssistError::Profile(_)));
        assert!(dialogue.is_active());
        assert_eq!(profile.claims.len(), UserProfile::sample().claims.len());
    }

    #[test]
    fn advance_while_idle_is_an_error() {
        let mut profile = UserProfile::sample();
        let mut dialogue = ClaimDialogue::default();
        assert!(dialogue.advance("hello", &mut profile).is_err());
    }
}
