//! WebSocket listener for Knocki events

use futures::{SinkExt, StreamExt};
use knocki_core::{Event, USER_AGENT};
use std::sync::atomic::Ordering;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header, HeaderValue};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, trace};

use crate::client::{ClientInner, KnockiClient};
use crate::error::{KnockiError, KnockiResult};

/// Consumes any stop request and clears the listening flag when the
/// listener exits, however it exits
struct ListeningGuard<'a>(&'a ClientInner);

impl Drop for ListeningGuard<'_> {
    fn drop(&mut self) {
        self.0.shutdown.send_replace(false);
        self.0.listening.store(false, Ordering::SeqCst);
    }
}

impl KnockiClient {
    /// Connect to the WebSocket and dispatch events until the connection
    /// closes or [`close`](Self::close) is called
    ///
    /// Messages that do not decode as an [`Event`] are skipped. A
    /// [`close`](Self::close) issued before the listener gets to run stops
    /// it before it connects.
    pub async fn start_websocket(&self) -> KnockiResult<()> {
        let token = self.token().ok_or(KnockiError::NotAuthenticated)?;

        if self.inner.listening.swap(true, Ordering::SeqCst) {
            return Err(KnockiError::ListenerAlreadyRunning);
        }
        let _guard = ListeningGuard(&self.inner);

        let mut shutdown = self.inner.shutdown.subscribe();
        if *shutdown.borrow_and_update() {
            info!("Knocki websocket closed before it started");
            return Ok(());
        }

        let mut request = self.inner.websocket_url.as_str().into_client_request()?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
            KnockiError::InvalidConfig("token contains characters not valid in a header".into())
        })?;
        request.headers_mut().insert(header::AUTHORIZATION, bearer);
        request
            .headers_mut()
            .insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));

        let (stream, _) = timeout(self.inner.request_timeout, connect_async(request))
            .await
            .map_err(|_| KnockiError::Timeout)??;
        info!(url = %self.inner.websocket_url, "Connected to Knocki websocket");

        let (mut write, mut read) = stream.split();

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow_and_update() {
                        info!("Closing Knocki websocket");
                        // The peer may already be gone
                        let _ = write.send(Message::Close(None)).await;
                        return Ok(());
                    }
                }
                message = read.next() => match message {
                    Some(Ok(Message::Text(text))) => self.handle_message(&text),
                    Some(Ok(Message::Close(frame))) => {
                        info!(?frame, "Knocki closed the websocket");
                        return Ok(());
                    }
                    Some(Ok(other)) => trace!(?other, "Ignoring websocket frame"),
                    Some(Err(e)) => return Err(e.into()),
                    None => {
                        info!("Knocki websocket stream ended");
                        return Ok(());
                    }
                },
            }
        }
    }

    /// Stop the WebSocket listener
    ///
    /// With no listener running, the request is kept until the next
    /// [`start_websocket`](Self::start_websocket) picks it up, so a listener
    /// spawned just before `close` still stops.
    pub fn close(&self) {
        self.inner.shutdown.send_replace(true);
    }

    /// True while a listener holds the connection
    pub fn is_listening(&self) -> bool {
        self.inner.listening.load(Ordering::SeqCst)
    }

    fn handle_message(&self, text: &str) {
        match serde_json::from_str::<Event>(text) {
            Ok(event) => self.inner.bus.fire(event),
            Err(e) => debug!(error = %e, "Ignoring undecodable websocket message"),
        }
    }
}
