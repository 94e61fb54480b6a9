//! Mock Provider Tests
//!
//! The planning loop depends only on the `Provider` trait; these check it
//! mocks cleanly and that the timeout wrapper leaves fast calls alone.

use async_trait::async_trait;
use concierge_provider::{
    chat_with_timeout, ChatParams, ChatResponse, Decision, Message, Provider, ProviderError,
};
use mockall::mock;
use std::time::Duration;

mock! {
    pub Provider {}

    #[async_trait]
    impl Provider for Provider {
        async fn chat(&self, params: ChatParams) -> Result<ChatResponse, ProviderError>;
        fn default_model(&self) -> String;
        fn is_configured(&self) -> bool;
    }
}

#[tokio::test]
async fn test_timeout_wrapper_passes_through_fast_answer() {
    let mut mock = MockProvider::new();
    mock.expect_chat()
        .times(1)
        .withf(|params| params.messages.len() == 1 && params.messages[0].role == "user")
        .returning(|_| Ok(ChatResponse::text("Bonjour!")));

    let params = ChatParams {
        messages: vec![Message::user("Hello")],
        ..ChatParams::default()
    };
    let response = chat_with_timeout(&mock, params, Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(response.decision(), Decision::FinalAnswer("Bonjour!".to_string()));
}

#[tokio::test]
async fn test_timeout_wrapper_passes_through_errors() {
    let mut mock = MockProvider::new();
    mock.expect_chat()
        .times(1)
        .returning(|_| Err(ProviderError::RateLimited));

    let result = chat_with_timeout(&mock, ChatParams::default(), Duration::from_secs(5)).await;
    assert!(matches!(result, Err(ProviderError::RateLimited)));
}

#[tokio::test]
async fn test_provider_as_trait_object() {
    let mut mock = MockProvider::new();
    mock.expect_is_configured().returning(|| true);
    mock.expect_chat()
        .times(1)
        .returning(|_| Ok(ChatResponse::text("ok")));

    let provider: Box<dyn Provider> = Box::new(mock);
    assert!(provider.is_configured());
    let response = chat_with_timeout(provider.as_ref(), ChatParams::default(), Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(response.content.as_deref(), Some("ok"));
}
