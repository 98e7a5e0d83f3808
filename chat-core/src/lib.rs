pub mod capability;
pub mod claims;
pub mod error;
pub mod history;
pub mod index;
pub mod orchestrator;
pub mod profile;
pub mod session;

// Re-export commonly used types
pub use capability::{Embedder, Generator, VectorIndex};
pub use claims::ClaimDialogue;
pub use error::{AssistError, Result};
pub use history::{ContextWindow, ConversationTurn, Speaker, TokenEstimator, WordCountEstimator};
pub use index::{DocumentChunk, DocumentIndex, InMemoryVectorIndex};
pub use orchestrator::{Assistant, AssistantConfig};
pub use profile::{Claim, Dependent, Policy, UserProfile};
pub use session::{InMemorySessionStorage, Session, SessionState, SessionStorage};

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    struct TestGenerator {
        responses: Mutex<VecDeque<String>>,
    }

    #[async_trait]
    impl Generator for TestGenerator {
        async fn generate(&self, _prompt: &str, _image: Option<&[u8]>) -> Result<String> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| AssistError::Generation("script exhausted".to_string()))
        }
    }

    struct TestEmbedder;

    #[async_trait]
    impl Embedder for TestEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(vec![text.len() as f32, 1.0])
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    fn generator(responses: &[&str]) -> Arc<TestGenerator> {
        Arc::new(TestGenerator {
            responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
        })
    }

    /// Full conversation through the public surface: a grounded question
    /// followed by a complete claim dialogue, with the session persisted
    /// between turns the way the service does it.
    #[tokio::test]
    async fn question_then_claim_over_persisted_session() {
        let backend = Arc::new(InMemoryVectorIndex::new());
        let index = DocumentIndex::new(backend, Arc::new(TestEmbedder), "docs");
        index.ensure_collection().await.unwrap();
        index
            .ingest_pages(vec!["Office hours are 9 to 5, Monday to Friday.".to_string()])
            .await
            .unwrap();

        let assistant = Assistant::new(
            generator(&["false", "We are **open** 9 to 5.", "true"]),
            index,
        );
        let storage = InMemorySessionStorage::new();
        storage
            .save(Session::new("s1", UserProfile::sample()))
            .await
            .unwrap();

        // Turn 1: general question, answered from retrieval + generation.
        let mut session = storage.get("s1").await.unwrap().unwrap();
        let reply = assistant
            .respond(&mut session.state, "What are your office hours?", None)
            .await
            .unwrap();
        assert_eq!(reply, "We are open 9 to 5.");
        assert_eq!(session.state.window.len(), 2);
        storage.save(session).await.unwrap();

        // Turn 2: claim intent opens the dialogue.
        let mut session = storage.get("s1").await.unwrap().unwrap();
        let reply = assistant
            .respond(&mut session.state, "I need to make a claim", None)
            .await
            .unwrap();
        assert_eq!(reply, claims::WHAT_FOR_QUESTION);
        storage.save(session).await.unwrap();

        // Turns 3-5: slot filling, no generator involvement.
        for (input, expected) in [
            ("medical bill", claims::CLAIM_TYPE_QUESTION),
            ("OPD", claims::AMOUNT_QUESTION),
            ("500", claims::CLAIM_CREATED_REPLY),
        ] {
            let mut session = storage.get("s1").await.unwrap().unwrap();
            let reply = assistant
                .respond(&mut session.state, input, None)
                .await
                .unwrap();
            assert_eq!(reply, expected);
            storage.save(session).await.unwrap();
        }

        let session = storage.get("s1").await.unwrap().unwrap();
        assert!(!session.state.claim.is_active());
        assert_eq!(session.state.profile.claims.len(), 2);
        assert_eq!(session.state.profile.claims[1].amount_claimed, "500");
        // The claim dialogue leaves the conversation window untouched.
        assert_eq!(session.state.window.len(), 2);
    }
}
