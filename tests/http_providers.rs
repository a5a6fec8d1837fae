//! Wire-format tests for the HTTP embedding providers and the chat
//! generator, against a mock server with no live services involved.

use httpmock::prelude::*;
use serde_json::json;

use learnbase::config::{EmbeddingConfig, LlmConfig};
use learnbase::embedding::{Embedder, OllamaEmbedder, OpenAiEmbedder};
use learnbase::generate::{ChatGenerator, Generator};

fn embedding_config(url: &str) -> EmbeddingConfig {
    EmbeddingConfig {
        provider: "ollama".to_string(),
        model: Some("nomic-embed-text".to_string()),
        dims: Some(3),
        url: Some(url.to_string()),
        api_key_env: None,
        max_retries: 2,
        timeout_secs: 5,
    }
}

#[tokio::test]
async fn test_ollama_embed_parses_vectors() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/embed");
            then.status(200)
                .json_body(json!({ "embeddings": [[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]] }));
        })
        .await;

    let embedder = OllamaEmbedder::new(&embedding_config(&server.base_url())).unwrap();
    assert_eq!(embedder.dims(), 3);

    let vectors = embedder
        .embed(&["one".to_string(), "two".to_string()])
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(vectors.len(), 2);
    assert_eq!(vectors[0], vec![0.1, 0.2, 0.3]);
    assert_eq!(vectors[1], vec![0.4, 0.5, 0.6]);
}

#[tokio::test]
async fn test_ollama_embed_malformed_response_is_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/embed");
            then.status(200).json_body(json!({ "unexpected": true }));
        })
        .await;

    let embedder = OllamaEmbedder::new(&embedding_config(&server.base_url())).unwrap();
    let err = embedder.embed(&["one".to_string()]).await.unwrap_err();
    assert!(err.to_string().contains("embedding failed"));
}

#[tokio::test]
async fn test_ollama_embed_client_error_fails_without_retry() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/embed");
            then.status(404).body("no such model");
        })
        .await;

    let embedder = OllamaEmbedder::new(&embedding_config(&server.base_url())).unwrap();
    let err = embedder.embed(&["one".to_string()]).await.unwrap_err();
    assert!(err.to_string().contains("404"));
    // 4xx other than 429 must not be retried.
    mock.assert_hits_async(1).await;
}

#[tokio::test]
async fn test_openai_embed_parses_data_array() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/embeddings")
                .header("authorization", "Bearer test-key");
            then.status(200).json_body(json!({
                "data": [
                    { "index": 0, "embedding": [1.0, 0.0, 0.0] }
                ]
            }));
        })
        .await;

    std::env::set_var("LEARNBASE_TEST_OPENAI_KEY", "test-key");
    let config = EmbeddingConfig {
        provider: "openai".to_string(),
        model: Some("text-embedding-3-small".to_string()),
        dims: Some(3),
        url: Some(server.base_url()),
        api_key_env: Some("LEARNBASE_TEST_OPENAI_KEY".to_string()),
        max_retries: 0,
        timeout_secs: 5,
    };

    let embedder = OpenAiEmbedder::new(&config).unwrap();
    let vectors = embedder.embed(&["hello".to_string()]).await.unwrap();
    assert_eq!(vectors, vec![vec![1.0, 0.0, 0.0]]);
}

#[tokio::test]
async fn test_chat_generator_extracts_message_content() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).json_body(json!({
                "choices": [
                    { "message": { "role": "assistant", "content": "  The answer text.  " } }
                ]
            }));
        })
        .await;

    let config = LlmConfig {
        provider: "ollama".to_string(),
        model: Some("llama3".to_string()),
        url: Some(format!("{}/v1", server.base_url())),
        api_key_env: None,
        max_tokens: 100,
        temperature: 0.7,
        timeout_secs: 5,
    };

    let generator = ChatGenerator::new(&config).unwrap();
    let answer = generator.complete("question").await.unwrap();
    assert_eq!(answer, "The answer text.");
}

#[tokio::test]
async fn test_chat_generator_malformed_response_is_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).json_body(json!({ "choices": [] }));
        })
        .await;

    let config = LlmConfig {
        provider: "ollama".to_string(),
        model: Some("llama3".to_string()),
        url: Some(format!("{}/v1", server.base_url())),
        api_key_env: None,
        max_tokens: 100,
        temperature: 0.7,
        timeout_secs: 5,
    };

    let generator = ChatGenerator::new(&config).unwrap();
    let err = generator.complete("question").await.unwrap_err();
    assert!(err.to_string().contains("generation failed"));
}
