//! OpenAI-style chat-completions transport shared by both adapters.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ImageRef;
use super::prompt::OCR_PROMPT;
use crate::error::ProviderError;

/// A fully resolved chat-completions endpoint.
#[derive(Debug, Clone)]
pub(crate) struct ChatEndpoint {
    /// Provider label used in error messages.
    pub provider: &'static str,
    pub url: String,
    pub bearer: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
    /// Vision detail hint (`"high"`), if the provider supports it.
    pub detail: Option<&'static str>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: [ContentPart<'a>; 2],
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl<'a> },
}

#[derive(Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<&'a str>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

fn request_body<'a>(endpoint: &'a ChatEndpoint, image: &'a ImageRef) -> ChatRequest<'a> {
    ChatRequest {
        model: &endpoint.model,
        messages: [ChatMessage {
            role: "user",
            content: [
                ContentPart::Text { text: OCR_PROMPT },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image.as_str(),
                        detail: endpoint.detail,
                    },
                },
            ],
        }],
        max_tokens: endpoint.max_tokens,
        temperature: endpoint.temperature,
    }
}

/// Send one OCR request and return the first choice's text.
///
/// The whole exchange (connect, send, read body) runs under the endpoint's
/// deadline; on expiry the future is dropped, which aborts the request.
pub(crate) async fn complete(
    client: &reqwest::Client,
    endpoint: &ChatEndpoint,
    image: &ImageRef,
) -> Result<String, ProviderError> {
    let provider = endpoint.provider;
    let body = request_body(endpoint, image);

    let exchange = async {
        let mut request = client.post(&endpoint.url).json(&body);
        if let Some(key) = &endpoint.bearer {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|source| ProviderError::Network { provider, source })?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|source| ProviderError::Network { provider, source })?;
        Ok::<_, ProviderError>((status, text))
    };

    debug!("POST {} (model {})", endpoint.url, endpoint.model);

    let (status, text) = tokio::time::timeout(endpoint.timeout, exchange)
        .await
        .map_err(|_| ProviderError::Timeout {
            provider,
            after: endpoint.timeout,
        })??;

    interpret(provider, status, &text)
}

/// Turn a status code and body into message content or a typed failure.
fn interpret(provider: &'static str, status: u16, body: &str) -> Result<String, ProviderError> {
    if !(200..300).contains(&status) {
        return Err(ProviderError::Status {
            provider,
            status,
            body: body.to_string(),
        });
    }

    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|source| ProviderError::Malformed { provider, source })?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(ProviderError::EmptyResponse { provider })
}

#[cfg(test)]
pub(crate) mod test_server {
    //! Minimal HTTP/1.1 responder for exercising adapter failure modes.

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// How the fake endpoint behaves for every connection.
    #[derive(Clone)]
    pub enum Reply {
        Respond { status: u16, body: String },
        Stall,
    }

    /// Bind on an ephemeral port and serve `reply` forever; returns the base URL.
    pub async fn serve(reply: Reply) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let reply = reply.clone();
                tokio::spawn(handle(stream, reply));
            }
        });

        format!("http://{}", addr)
    }

    async fn handle(mut stream: TcpStream, reply: Reply) {
        read_request(&mut stream).await;

        match reply {
            Reply::Respond { status, body } => {
                let response = format!(
                    "HTTP/1.1 {} Test\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
            Reply::Stall => {
                tokio::time::sleep(std::time::Duration::from_secs(30)).await;
            }
        }
    }

    async fn read_request(stream: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        let header_end = loop {
            let Ok(n) = stream.read(&mut chunk).await else { return };
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
        let content_length = headers
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);

        while buf.len() < header_end + content_length {
            let Ok(n) = stream.read(&mut chunk).await else { return };
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn endpoint(url: String, timeout: Duration) -> ChatEndpoint {
        ChatEndpoint {
            provider: "test",
            url,
            bearer: None,
            model: "test-model".to_string(),
            max_tokens: 4096,
            temperature: 0.1,
            timeout,
            detail: Some("high"),
        }
    }

    #[test]
    fn test_request_body_shape() {
        let ep = endpoint("http://unused".to_string(), Duration::from_secs(1));
        let image = ImageRef::parse("https://img.example/r.jpeg");
        let json = serde_json::to_value(request_body(&ep, &image)).unwrap();

        assert_eq!(json["model"], "test-model");
        assert_eq!(json["max_tokens"], 4096);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"][0]["type"], "text");
        assert_eq!(json["messages"][0]["content"][1]["type"], "image_url");
        assert_eq!(
            json["messages"][0]["content"][1]["image_url"]["url"],
            "https://img.example/r.jpeg"
        );
        assert_eq!(json["messages"][0]["content"][1]["image_url"]["detail"], "high");
    }

    #[test]
    fn test_interpret_success() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": "{\"company\": \"X\"}"}}]}"#;
        assert_eq!(interpret("test", 200, body).unwrap(), r#"{"company": "X"}"#);
    }

    #[test]
    fn test_interpret_failures_are_distinct() {
        assert!(matches!(
            interpret("test", 503, "overloaded"),
            Err(ProviderError::Status { status: 503, ref body, .. }) if body == "overloaded"
        ));
        assert!(matches!(
            interpret("test", 200, r#"{"choices": []}"#),
            Err(ProviderError::EmptyResponse { .. })
        ));
        assert!(matches!(
            interpret("test", 200, r#"{"choices": [{"message": {"content": "  "}}]}"#),
            Err(ProviderError::EmptyResponse { .. })
        ));
        assert!(matches!(
            interpret("test", 200, "<html>gateway</html>"),
            Err(ProviderError::Malformed { .. })
        ));
    }

    #[tokio::test]
    async fn test_complete_against_server() {
        let body = r#"{"choices": [{"message": {"content": "hello"}}]}"#.to_string();
        let base = test_server::serve(test_server::Reply::Respond { status: 200, body }).await;
        let ep = endpoint(format!("{}/v1/chat/completions", base), Duration::from_secs(5));

        let text = complete(&reqwest::Client::new(), &ep, &ImageRef::parse("data:image/jpeg;base64,AA"))
            .await
            .unwrap();
        assert_eq!(text, "hello");
    }

    #[tokio::test]
    async fn test_complete_status_error_keeps_body() {
        let base = test_server::serve(test_server::Reply::Respond {
            status: 500,
            body: "model crashed".to_string(),
        })
        .await;
        let ep = endpoint(format!("{}/v1/chat/completions", base), Duration::from_secs(5));

        let err = complete(&reqwest::Client::new(), &ep, &ImageRef::parse("https://x/y.jpeg"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "test API error 500: model crashed");
    }

    #[tokio::test]
    async fn test_complete_times_out() {
        let base = test_server::serve(test_server::Reply::Stall).await;
        let ep = endpoint(format!("{}/v1/chat/completions", base), Duration::from_millis(100));

        let err = complete(&reqwest::Client::new(), &ep, &ImageRef::parse("https://x/y.jpeg"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Timeout { .. }));
        assert_eq!(err.to_string(), "test request timed out after 100ms");
    }

    #[tokio::test]
    async fn test_complete_network_error() {
        // Bind and drop to get a port nothing listens on.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let ep = endpoint(
            format!("http://127.0.0.1:{}/v1/chat/completions", port),
            Duration::from_secs(5),
        );

        let err = complete(&reqwest::Client::new(), &ep, &ImageRef::parse("https://x/y.jpeg"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Network { .. }));
    }
}
