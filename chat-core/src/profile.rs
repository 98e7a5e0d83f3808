use serde::{Deserialize, Serialize};

/// Initial status of every newly created claim.
pub const PENDING_STATUS: &str = "Pending For Checker";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub id: u64,
    pub start_date: String,
    pub expiry_date: String,
    pub available_limit: i64,
    pub policy_type_id: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dependent {
    pub id: u64,
    pub name: String,
    pub date_of_birth: String,
    pub relationship_master_id: u32,
}

/// A finalized reimbursement request attached to a policy.
///
/// `amount_claimed` is kept as the raw text the user entered; no numeric
/// validation is performed at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    pub id: u64,
    pub policy_id: u64,
    pub amount_claimed: String,
    pub is_opd_claim: u8,
    pub status: String,
}

/// The insured member's record: identity, policies, dependents and claims.
/// Mutated only by claim finalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: u64,
    pub cnic: String,
    pub name: String,
    pub contact_no: String,
    pub email: String,
    pub designation: String,
    pub date_of_birth: String,
    pub policies: Vec<Policy>,
    pub dependents: Vec<Dependent>,
    pub claims: Vec<Claim>,
}

impl UserProfile {
    /// Seed profile used for new sessions until a real member lookup exists.
    pub fn sample() -> Self {
        Self {
            id: 87157,
            cnic: "4240135849851".to_string(),
            name: "Arham Raza".to_string(),
            contact_no: "0312-1758206".to_string(),
            email: "null".to_string(),
            designation: "Orderbooker".to_string(),
            date_of_birth: "1992-01-17".to_string(),
            policies: vec![
                Policy {
                    id: 268140,
                    start_date: "2024-06-01".to_string(),
                    expiry_date: "2025-05-31".to_string(),
                    available_limit: 24000,
                    policy_type_id: 1,
                },
                Policy {
                    id: 268141,
                    start_date: "2024-06-01".to_string(),
                    expiry_date: "2025-05-31".to_string(),
                    available_limit: 300000,
                    policy_type_id: 2,
                },
            ],
            dependents: vec![Dependent {
                id: 221198,
                name: "SHAZIA WAHID".to_string(),
                date_of_birth: "1988-03-24".to_string(),
                relationship_master_id: 5,
            }],
            claims: vec![Claim {
                id: 43462490,
                policy_id: 268140,
                amount_claimed: "1000".to_string(),
                is_opd_claim: 1,
                status: PENDING_STATUS.to_string(),
            }],
        }
    }

    /// Serialized profile block included in every generation prompt.
    pub fn prompt_context(&self) -> String {
        format!(
            "User Info: Name: {}, Contact No: {}, Designation: {}, Policies: {}, Dependents: {}, Claims: {}",
            self.name,
            self.contact_no,
            self.designation,
            serde_json::to_string(&self.policies).unwrap_or_default(),
            serde_json::to_string(&self.dependents).unwrap_or_default(),
            serde_json::to_string(&self.claims).unwrap_or_default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_context_includes_identity_and_collections() {
        let profile = UserProfile::sample();
        let context = profile.prompt_context();
        assert!(context.contains("Arham Raza"));
        assert!(context.contains("268140"));
        assert!(context.contains(PENDING_STATUS));
    }
}
