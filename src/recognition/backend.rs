use super::error::BridgeError;
use super::proto::{StreamingRequest, StreamingResponse, RECOGNIZE_STREAMING_PATH};
use futures::stream::{BoxStream, StreamExt};
use std::time::Duration;
use tokio_stream::wrappers::ReceiverStream;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::metadata::{Ascii, MetadataValue};
use tonic::transport::{ClientTlsConfig, Endpoint};
use tracing::{debug, info};

/// Requests flowing to the recognizer, in send order
pub type RequestStream = ReceiverStream<StreamingRequest>;

/// Raw responses flowing back from the recognizer
pub type ResponseStream = BoxStream<'static, Result<StreamingResponse, tonic::Status>>;

/// Streaming speech recognizer
///
/// Implementations:
/// - `SpeechKitRecognizer`: SpeechKit STT v3 over TLS gRPC
/// - scripted in-process recognizers in tests
#[async_trait::async_trait]
pub trait RecognizerBackend: Send + Sync {
    /// Start one bidirectional recognition call
    ///
    /// The call consumes `requests` until it ends; dropping the returned
    /// stream cancels the call and releases its transport.
    async fn start(&self, requests: RequestStream, credential: &str) -> Result<ResponseStream, BridgeError>;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// SpeechKit STT v3 streaming recognizer
///
/// Opens a fresh TLS channel for every call, so sessions never share a
/// connection.
pub struct SpeechKitRecognizer {
    endpoint: String,
    connect_timeout: Duration,
}

impl SpeechKitRecognizer {
    pub fn new(endpoint: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            connect_timeout,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl RecognizerBackend for SpeechKitRecognizer {
    async fn start(&self, requests: RequestStream, credential: &str) -> Result<ResponseStream, BridgeError> {
        let authorization: MetadataValue<Ascii> = format!("Api-Key {}", credential)
            .parse()
            .map_err(|_| BridgeError::Connection("credential is not a valid header value".to_string()))?;

        debug!("Connecting to recognizer at {}", self.endpoint);

        let channel = Endpoint::from_shared(self.endpoint.clone())?
            .tls_config(ClientTlsConfig::new().with_webpki_roots())?
            .connect_timeout(self.connect_timeout)
            .connect()
            .await?;

        let mut grpc = tonic::client::Grpc::new(channel);
        grpc.ready()
            .await
            .map_err(|e| BridgeError::Connection(format!("recognizer channel not ready: {}", e)))?;

        let mut request = tonic::Request::new(requests);
        request.metadata_mut().insert("authorization", authorization);

        let path = PathAndQuery::from_static(RECOGNIZE_STREAMING_PATH);
        let codec: ProstCodec<StreamingRequest, StreamingResponse> = ProstCodec::default();

        let response = grpc
            .streaming(request, path, codec)
            .await
            .map_err(|status| BridgeError::rejected(&status))?;

        info!("Recognition stream established with {}", self.endpoint);

        Ok(response.into_inner().boxed())
    }

    fn name(&self) -> &str {
        "speechkit"
    }
}
